use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use courier_backend::{CacheError, CacheResult, DeleteStatus, KeyedCache};
use courier_core::{CacheKey, Raw};
use sha2::{Digest, Sha256};
use smol_str::SmolStr;
use tracing::{debug, trace, warn};

use crate::DiskCacheError;

/// Capacity used when none is configured: 100 MiB.
pub const DEFAULT_CAPACITY: u64 = 100 * 1024 * 1024;

const TEMP_PREFIX: &str = ".tmp";

/// One file of a [`DiskCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskEntry {
    /// Name of the file inside the cache directory.
    pub file_name: String,
    /// Size in bytes.
    pub size: u64,
    /// Last read or write.
    pub last_access: DateTime<Utc>,
}

/// Disk-based cache that stores one file per key.
///
/// Use this when cache data must survive restarts. Reads always touch the
/// filesystem, so [`get_fast_path`](KeyedCache::get_fast_path) returns `None`;
/// put a [`MemoryCache`] in front with [`Tiered`] to get a fast path.
///
/// ```no_run
/// use courier_disk::DiskCache;
///
/// // Defaults: OS cache directory, 100 MiB
/// let cache = DiskCache::builder().build()?;
///
/// let cache = DiskCache::builder()
///     .path("/var/cache/myapp")
///     .capacity(10 * 1024 * 1024)
///     .build()?;
/// # Ok::<(), courier_disk::DiskCacheError>(())
/// ```
///
/// Cloning is cheap. Clones share the directory and the size accounting.
///
/// [`MemoryCache`]: https://docs.rs/courier-moka
/// [`Tiered`]: courier_backend::Tiered
#[derive(Debug, Clone)]
pub struct DiskCache {
    inner: Arc<Inner>,
    label: SmolStr,
}

#[derive(Debug)]
struct Inner {
    dir: PathBuf,
    // Held for the whole of every filesystem operation, which keeps the
    // running size equal to the sum of file sizes.
    state: Mutex<State>,
}

#[derive(Debug)]
struct State {
    size: u64,
    capacity: u64,
}

impl DiskCache {
    /// Starts building a new cache.
    pub fn builder() -> DiskCacheBuilder {
        DiskCacheBuilder::default()
    }

    /// Directory used when no path is configured.
    pub fn default_location() -> Option<PathBuf> {
        dirs_next::cache_dir().map(|dir| dir.join("courier").join("disk-cache"))
    }

    /// The cache directory.
    pub fn path(&self) -> &Path {
        &self.inner.dir
    }

    /// Total size of all cached files in bytes.
    pub fn size(&self) -> u64 {
        self.inner.lock().size
    }

    /// Configured capacity in bytes.
    pub fn capacity(&self) -> u64 {
        self.inner.lock().capacity
    }

    /// Changes the capacity, evicting files if the cache is now over it.
    pub async fn set_capacity(&self, capacity: u64) -> Result<(), DiskCacheError> {
        let inner = self.inner.clone();
        blocking(move || {
            let mut state = inner.lock();
            state.capacity = capacity;
            inner.enforce_capacity(&mut state);
            Ok(())
        })
        .await
    }

    /// Lists cached files, least recently accessed first.
    pub async fn entries(&self) -> Result<Vec<DiskEntry>, DiskCacheError> {
        let inner = self.inner.clone();
        blocking(move || {
            let _state = inner.lock();
            let entries = inner
                .scan()?
                .into_iter()
                .map(|file| DiskEntry {
                    file_name: file.name,
                    size: file.size,
                    last_access: DateTime::<Utc>::from(file.modified),
                })
                .collect();
            Ok(entries)
        })
        .await
    }

    /// File name a key is stored under.
    ///
    /// The hex digest of the key's string form, with anything that is not
    /// ASCII alphanumeric stripped.
    pub fn file_name(key: &CacheKey) -> String {
        let digest = Sha256::digest(key.to_string().as_bytes());
        hex::encode(digest)
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect()
    }
}

async fn blocking<T, F>(f: F) -> Result<T, DiskCacheError>
where
    F: FnOnce() -> Result<T, DiskCacheError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|error| DiskCacheError::Io(io::Error::other(error)))?
}

struct ScannedFile {
    name: String,
    path: PathBuf,
    size: u64,
    modified: SystemTime,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cache files sorted by ascending modification time.
    fn scan(&self) -> io::Result<Vec<ScannedFile>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let metadata = match entry.metadata() {
                Ok(metadata) if metadata.is_file() => metadata,
                Ok(_) => continue,
                // Removed concurrently by another process.
                Err(error) if error.kind() == io::ErrorKind::NotFound => continue,
                Err(error) => return Err(error),
            };
            files.push(ScannedFile {
                name,
                path: entry.path(),
                size: metadata.len(),
                modified: metadata.modified()?,
            });
        }
        files.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.name.cmp(&b.name)));
        Ok(files)
    }

    fn recalculate_size(&self, state: &mut State) -> io::Result<()> {
        state.size = self.scan()?.iter().map(|file| file.size).sum();
        Ok(())
    }

    fn enforce_capacity(&self, state: &mut State) {
        if state.size <= state.capacity {
            return;
        }
        let files = match self.scan() {
            Ok(files) => files,
            Err(error) => {
                warn!(%error, dir = %self.dir.display(), "disk cache scan failed");
                return;
            }
        };
        for file in files {
            if state.size <= state.capacity {
                break;
            }
            match fs::remove_file(&file.path) {
                Ok(()) => {
                    state.size = state.size.saturating_sub(file.size);
                    debug!(file = %file.name, size = file.size, "evicted disk cache entry");
                }
                Err(error) if error.kind() == io::ErrorKind::NotFound => {}
                Err(error) => warn!(%error, file = %file.name, "disk cache eviction failed"),
            }
        }
    }

    fn write(&self, name: &str, data: &[u8]) -> io::Result<()> {
        let mut state = self.lock();
        let path = self.dir.join(name);
        let previous = file_size(&path)?;

        let mut temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&self.dir)?;
        temp.write_all(data)?;
        let file = temp.persist(&path).map_err(|error| error.error)?;
        file.set_modified(SystemTime::now())?;

        let size = data.len() as u64;
        state.size = state.size.saturating_sub(previous) + size;
        if size > previous {
            self.enforce_capacity(&mut state);
        }
        Ok(())
    }

    fn read(&self, name: &str) -> io::Result<Option<Vec<u8>>> {
        let _state = self.lock();
        let path = self.dir.join(name);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error),
        };
        if let Err(error) = touch(&path) {
            trace!(%error, file = name, "failed to refresh access time");
        }
        Ok(Some(data))
    }

    fn remove(&self, name: &str) -> io::Result<DeleteStatus> {
        let mut state = self.lock();
        let path = self.dir.join(name);
        let size = file_size(&path)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                state.size = state.size.saturating_sub(size);
                Ok(DeleteStatus::Deleted(1))
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(DeleteStatus::Missing),
            Err(error) => Err(error),
        }
    }

    fn clear(&self) -> io::Result<()> {
        let mut state = self.lock();
        for file in self.scan()? {
            match fs::remove_file(&file.path) {
                Ok(()) => {}
                Err(error) if error.kind() == io::ErrorKind::NotFound => {}
                Err(error) => return Err(error),
            }
        }
        self.recalculate_size(&mut state)
    }
}

fn file_size(path: &Path) -> io::Result<u64> {
    match fs::metadata(path) {
        Ok(metadata) => Ok(metadata.len()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(0),
        Err(error) => Err(error),
    }
}

fn touch(path: &Path) -> io::Result<()> {
    File::options()
        .write(true)
        .open(path)?
        .set_modified(SystemTime::now())
}

/// Builder for [`DiskCache`].
#[derive(Debug, Clone)]
pub struct DiskCacheBuilder {
    path: Option<PathBuf>,
    capacity: u64,
    label: SmolStr,
}

impl Default for DiskCacheBuilder {
    fn default() -> Self {
        Self {
            path: None,
            capacity: DEFAULT_CAPACITY,
            label: SmolStr::new_static("disk"),
        }
    }
}

impl DiskCacheBuilder {
    /// Directory holding the cache files. Created if missing.
    ///
    /// Default: [`DiskCache::default_location`].
    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Maximum total size of the cache files in bytes.
    ///
    /// Default: [`DEFAULT_CAPACITY`].
    pub fn capacity(mut self, bytes: u64) -> Self {
        self.capacity = bytes;
        self
    }

    /// Identifies this cache in logs and metrics.
    pub fn label(mut self, label: impl Into<SmolStr>) -> Self {
        self.label = label.into();
        self
    }

    /// Opens the cache.
    ///
    /// Creates the directory, measures what is already stored in it and
    /// evicts files if the existing content exceeds the capacity.
    pub fn build(self) -> Result<DiskCache, DiskCacheError> {
        let dir = match self.path {
            Some(path) => path,
            None => DiskCache::default_location().ok_or_else(|| {
                DiskCacheError::InvalidConfig("no cache directory on this platform".into())
            })?,
        };
        if dir.exists() && !dir.is_dir() {
            return Err(DiskCacheError::InvalidConfig(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
        fs::create_dir_all(&dir)?;

        let inner = Inner {
            dir,
            state: Mutex::new(State {
                size: 0,
                capacity: self.capacity,
            }),
        };
        {
            let mut state = inner.lock();
            inner.recalculate_size(&mut state)?;
            inner.enforce_capacity(&mut state);
        }

        Ok(DiskCache {
            inner: Arc::new(inner),
            label: self.label,
        })
    }
}

fn io_error(error: DiskCacheError) -> CacheError {
    CacheError::connection(error)
}

#[async_trait]
impl KeyedCache<CacheKey, Raw> for DiskCache {
    async fn put(&self, value: Raw, key: &CacheKey) -> CacheResult<()> {
        let inner = self.inner.clone();
        let name = DiskCache::file_name(key);
        trace!(%key, file = %name, bytes = value.len(), "disk cache put");
        blocking(move || Ok(inner.write(&name, &value)?))
            .await
            .map_err(io_error)
    }

    async fn get(&self, key: &CacheKey) -> CacheResult<Option<Raw>> {
        let inner = self.inner.clone();
        let name = DiskCache::file_name(key);
        let data = blocking(move || Ok(inner.read(&name)?))
            .await
            .map_err(io_error)?;
        trace!(%key, hit = data.is_some(), "disk cache get");
        Ok(data.map(Bytes::from))
    }

    fn get_fast_path(&self, _key: &CacheKey) -> CacheResult<Option<Raw>> {
        Ok(None)
    }

    async fn remove(&self, key: &CacheKey) -> CacheResult<DeleteStatus> {
        let inner = self.inner.clone();
        let name = DiskCache::file_name(key);
        blocking(move || Ok(inner.remove(&name)?))
            .await
            .map_err(io_error)
    }

    async fn remove_all(&self) -> CacheResult<()> {
        let inner = self.inner.clone();
        blocking(move || Ok(inner.clear()?)).await.map_err(io_error)
    }

    fn name(&self) -> &str {
        &self.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open(dir: &TempDir) -> DiskCache {
        DiskCache::builder().path(dir.path()).build().unwrap()
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir);
        let key = CacheKey::from("users:42");

        cache.put(Bytes::from_static(b"ada"), &key).await.unwrap();

        let value = cache.get(&key).await.unwrap();
        assert_eq!(value.as_deref(), Some(&b"ada"[..]));
        assert_eq!(cache.size(), 3);
    }

    #[tokio::test]
    async fn test_file_name_is_hex_digest() {
        let name = DiskCache::file_name(&CacheKey::from("a/b?c=d e"));
        assert_eq!(name.len(), 64);
        assert!(name.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(name, DiskCache::file_name(&CacheKey::from("a/b?c=d")));
    }

    #[tokio::test]
    async fn test_overwrite_adjusts_size() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir);
        let key = CacheKey::from("k");

        cache.put(Bytes::from(vec![0; 100]), &key).await.unwrap();
        cache.put(Bytes::from(vec![0; 40]), &key).await.unwrap();

        assert_eq!(cache.size(), 40);
        assert_eq!(cache.entries().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir);
        let key = CacheKey::from("delete-key");

        cache.put(Bytes::from_static(b"v"), &key).await.unwrap();
        assert_eq!(cache.remove(&key).await.unwrap(), DeleteStatus::Deleted(1));
        assert_eq!(cache.remove(&key).await.unwrap(), DeleteStatus::Missing);
        assert!(cache.get(&key).await.unwrap().is_none());
        assert_eq!(cache.size(), 0);
    }

    #[tokio::test]
    async fn test_remove_all_empties_directory() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir);
        for key in ["a", "b", "c"] {
            cache
                .put(Bytes::from_static(b"value"), &CacheKey::from(key))
                .await
                .unwrap();
        }

        cache.remove_all().await.unwrap();

        assert_eq!(cache.size(), 0);
        assert!(cache.entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fast_path_never_touches_disk() {
        let dir = TempDir::new().unwrap();
        let cache = open(&dir);
        let key = CacheKey::from("k");
        cache.put(Bytes::from_static(b"v"), &key).await.unwrap();
        let before = cache.entries().await.unwrap();

        assert!(cache.get_fast_path(&key).unwrap().is_none());

        assert_eq!(cache.entries().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_clone_shares_accounting() {
        let dir = TempDir::new().unwrap();
        let first = open(&dir);
        let second = first.clone();

        first
            .put(Bytes::from_static(b"shared"), &CacheKey::from("k"))
            .await
            .unwrap();

        assert_eq!(second.size(), 6);
    }

    #[test]
    fn test_path_must_be_a_directory() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("plain-file");
        fs::write(&file, b"x").unwrap();

        let error = DiskCache::builder().path(&file).build().unwrap_err();
        assert!(matches!(error, DiskCacheError::InvalidConfig(_)));
    }
}
