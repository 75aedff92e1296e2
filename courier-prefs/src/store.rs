//! Durable homes for preference domains.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use courier_backend::format::{Format, FormatExt, JsonFormat};
use courier_core::Raw;
use dashmap::DashMap;
use smol_str::SmolStr;

use crate::PreferenceError;

/// Contents of one preference domain.
pub type Domain = BTreeMap<String, Raw>;

/// A store of named preference domains.
///
/// Domains are always read and written whole.
#[async_trait]
pub trait PreferenceStore: Send + Sync + 'static {
    /// Loads a domain, or `None` if it was never saved.
    async fn load_domain(&self, domain: &str) -> Result<Option<Domain>, PreferenceError>;

    /// Replaces a domain with `data`.
    async fn save_domain(&self, domain: &str, data: &Domain) -> Result<(), PreferenceError>;

    /// Deletes a domain. Deleting a missing domain succeeds.
    async fn remove_domain(&self, domain: &str) -> Result<(), PreferenceError>;
}

#[async_trait]
impl<S: PreferenceStore> PreferenceStore for Arc<S> {
    async fn load_domain(&self, domain: &str) -> Result<Option<Domain>, PreferenceError> {
        self.as_ref().load_domain(domain).await
    }

    async fn save_domain(&self, domain: &str, data: &Domain) -> Result<(), PreferenceError> {
        self.as_ref().save_domain(domain, data).await
    }

    async fn remove_domain(&self, domain: &str) -> Result<(), PreferenceError> {
        self.as_ref().remove_domain(domain).await
    }
}

/// Stores each domain as one file in a directory.
///
/// Files are named after the domain and written through a temporary file
/// that is renamed into place, so a crash never leaves a torn domain.
#[derive(Debug, Clone)]
pub struct FilePreferenceStore {
    dir: PathBuf,
    format: Box<dyn Format>,
}

impl FilePreferenceStore {
    /// Uses `dir`, creating it if needed. Domains are encoded as JSON.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, PreferenceError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            format: Box::new(JsonFormat),
        })
    }

    /// Uses the platform preference directory.
    pub fn default_location() -> Result<Self, PreferenceError> {
        let dir = dirs_next::config_dir()
            .map(|dir| dir.join("courier"))
            .ok_or_else(|| {
                PreferenceError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    "no preference directory on this platform",
                ))
            })?;
        Self::new(dir)
    }

    /// Encodes domains with `format`.
    pub fn with_format<F: Format + 'static>(mut self, format: F) -> Self {
        self.format = Box::new(format);
        self
    }

    /// The directory holding the domain files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn domain_path(&self, domain: &str) -> Result<PathBuf, PreferenceError> {
        let valid = !domain.is_empty()
            && !domain.starts_with('.')
            && domain
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'));
        if !valid {
            return Err(PreferenceError::InvalidDomain(domain.to_string()));
        }
        Ok(self.dir.join(format!("{domain}.prefs")))
    }
}

async fn blocking<T, F>(f: F) -> Result<T, PreferenceError>
where
    F: FnOnce() -> Result<T, PreferenceError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|error| PreferenceError::Io(io::Error::other(error)))?
}

#[async_trait]
impl PreferenceStore for FilePreferenceStore {
    async fn load_domain(&self, domain: &str) -> Result<Option<Domain>, PreferenceError> {
        let path = self.domain_path(domain)?;
        let format = self.format.clone();
        blocking(move || {
            let data = match fs::read(&path) {
                Ok(data) => data,
                Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
                Err(error) => return Err(error.into()),
            };
            Ok(Some(format.deserialize(&data)?))
        })
        .await
    }

    async fn save_domain(&self, domain: &str, data: &Domain) -> Result<(), PreferenceError> {
        let path = self.domain_path(domain)?;
        let dir = self.dir.clone();
        let encoded = self.format.serialize(data)?;
        blocking(move || {
            let mut temp = tempfile::Builder::new().prefix(".tmp").tempfile_in(&dir)?;
            temp.write_all(&encoded)?;
            temp.persist(&path).map_err(|error| error.error)?;
            Ok(())
        })
        .await
    }

    async fn remove_domain(&self, domain: &str) -> Result<(), PreferenceError> {
        let path = self.domain_path(domain)?;
        blocking(move || match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        })
        .await
    }
}

/// Keeps domains in process memory.
///
/// Clones share the same domains.
#[derive(Debug, Clone, Default)]
pub struct MemoryPreferenceStore {
    domains: Arc<DashMap<SmolStr, Domain>>,
    saves: Arc<AtomicUsize>,
}

impl MemoryPreferenceStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `domain` is currently persisted.
    pub fn contains_domain(&self, domain: &str) -> bool {
        self.domains.contains_key(domain)
    }

    /// Number of `save_domain` calls so far.
    pub fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn load_domain(&self, domain: &str) -> Result<Option<Domain>, PreferenceError> {
        Ok(self.domains.get(domain).map(|entry| entry.value().clone()))
    }

    async fn save_domain(&self, domain: &str, data: &Domain) -> Result<(), PreferenceError> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.domains.insert(SmolStr::new(domain), data.clone());
        Ok(())
    }

    async fn remove_domain(&self, domain: &str) -> Result<(), PreferenceError> {
        self.domains.remove(domain);
        Ok(())
    }
}
