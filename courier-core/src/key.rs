//! Cache key types.
//!
//! Cache keys have three components:
//!
//! 1. **Prefix** - Optional namespace separating cache domains that share a backend
//! 2. **Version** - Numeric version for invalidating a whole domain at once
//! 3. **Parts** - List of key-value pairs identifying the entry
//!
//! When rendered to a string, keys follow `{prefix}:v{version}:key1=value1&key2`.
//! The prefix is omitted if empty and the version is omitted if zero.
//!
//! ```
//! use courier_core::{CacheKey, KeyPart};
//!
//! let key = CacheKey::new("api", 1, vec![KeyPart::new("id", Some("42"))]);
//! assert_eq!(key.to_string(), "api:v1:id=42");
//!
//! let key = CacheKey::from("settings");
//! assert_eq!(key.to_string(), "settings");
//!
//! let key = key.with_prefix("profile");
//! assert_eq!(key.to_string(), "profile:settings");
//! ```

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
struct CacheKeyInner {
    parts: Vec<KeyPart>,
    version: u32,
    prefix: SmolStr,
}

/// A cache key identifying a cached entry.
///
/// `CacheKey` wraps its data in [`Arc`], so cloning only bumps a reference
/// count. Keys are passed by value into spawned persistence tasks often.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "CacheKeyInner", into = "CacheKeyInner")]
pub struct CacheKey {
    inner: Arc<CacheKeyInner>,
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner == other.inner
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.hash(state);
    }
}

impl From<CacheKeyInner> for CacheKey {
    fn from(inner: CacheKeyInner) -> Self {
        CacheKey {
            inner: Arc::new(inner),
        }
    }
}

impl From<CacheKey> for CacheKeyInner {
    fn from(key: CacheKey) -> Self {
        Arc::try_unwrap(key.inner).unwrap_or_else(|arc| (*arc).clone())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.inner.prefix.is_empty() {
            write!(f, "{}:", self.inner.prefix)?;
        }
        if self.inner.version > 0 {
            write!(f, "v{}:", self.inner.version)?;
        }
        for (i, part) in self.inner.parts.iter().enumerate() {
            if i > 0 {
                write!(f, "&")?;
            }
            write!(f, "{}", part)?;
        }
        Ok(())
    }
}

impl CacheKey {
    /// Creates a new cache key with the given components.
    pub fn new(prefix: impl Into<SmolStr>, version: u32, parts: Vec<KeyPart>) -> Self {
        CacheKeyInner {
            parts,
            version,
            prefix: prefix.into(),
        }
        .into()
    }

    /// Creates a key with a single key-value part, no prefix and version 0.
    pub fn from_pair(key: &str, value: &str) -> Self {
        Self::new(SmolStr::default(), 0, vec![KeyPart::new(key, Some(value))])
    }

    /// Creates a key from a slice of key-value pairs, no prefix and version 0.
    pub fn from_slice(parts: &[(&str, Option<&str>)]) -> Self {
        let parts = parts
            .iter()
            .map(|(key, value)| KeyPart::new(key, *value))
            .collect();
        Self::new(SmolStr::default(), 0, parts)
    }

    /// Returns a copy of this key placed under `prefix`.
    ///
    /// An existing prefix is kept as the inner segment: `outer:inner`.
    pub fn with_prefix(&self, prefix: &str) -> Self {
        let prefix = if self.inner.prefix.is_empty() {
            SmolStr::new(prefix)
        } else {
            SmolStr::from(format!("{}:{}", prefix, self.inner.prefix))
        };
        Self::new(prefix, self.inner.version, self.inner.parts.clone())
    }

    /// Returns an iterator over the key parts.
    pub fn parts(&self) -> impl Iterator<Item = &KeyPart> {
        self.inner.parts.iter()
    }

    /// Returns the cache key version number.
    pub fn version(&self) -> u32 {
        self.inner.version
    }

    /// Returns the cache key prefix.
    pub fn prefix(&self) -> &str {
        &self.inner.prefix
    }
}

impl From<&str> for CacheKey {
    fn from(value: &str) -> Self {
        Self::new(SmolStr::default(), 0, vec![KeyPart::new(value, None::<&str>)])
    }
}

impl From<String> for CacheKey {
    fn from(value: String) -> Self {
        CacheKey::from(value.as_str())
    }
}

/// A single component of a cache key.
///
/// ```
/// use courier_core::KeyPart;
///
/// let method = KeyPart::new("method", Some("GET"));
/// assert_eq!(method.to_string(), "method=GET");
///
/// let flag = KeyPart::new("cached", None::<&str>);
/// assert_eq!(flag.value(), None);
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct KeyPart {
    key: SmolStr,
    value: Option<SmolStr>,
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key)?;
        if let Some(ref value) = self.value {
            write!(f, "={}", value)?;
        }
        Ok(())
    }
}

impl KeyPart {
    /// Creates a new key part.
    pub fn new<K: AsRef<str>, V: AsRef<str>>(key: K, value: Option<V>) -> Self {
        KeyPart {
            key: SmolStr::new(key),
            value: value.map(SmolStr::new),
        }
    }

    /// Returns the key name.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Returns the optional value.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

/// Types that can be addressed in a string-keyed cache.
///
/// Implemented by requests that are persisted through a
/// `CodingCache` or a durable backend.
pub trait ToCacheKey {
    /// Renders this value as a cache key.
    fn to_cache_key(&self) -> CacheKey;
}

impl ToCacheKey for CacheKey {
    fn to_cache_key(&self) -> CacheKey {
        self.clone()
    }
}

impl ToCacheKey for str {
    fn to_cache_key(&self) -> CacheKey {
        CacheKey::from(self)
    }
}

impl ToCacheKey for String {
    fn to_cache_key(&self) -> CacheKey {
        CacheKey::from(self.as_str())
    }
}

impl<T: ToCacheKey + ?Sized> ToCacheKey for &T {
    fn to_cache_key(&self) -> CacheKey {
        (**self).to_cache_key()
    }
}
