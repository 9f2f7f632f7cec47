//! Cache key composition.

use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// A cache key: an ordered tuple of strings.
///
/// Equality is structural, so `["user", "7"]` built in two places is the same
/// key. The serialized form is the compact JSON array, which is also what
/// snapshots use as map keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(Vec<String>);

impl CacheKey {
    /// Create a key from its parts.
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    /// Create a single-part key (e.g. a URL).
    pub fn single(part: impl Into<String>) -> Self {
        Self(vec![part.into()])
    }

    /// Get the key parts.
    pub fn parts(&self) -> &[String] {
        &self.0
    }

    /// Serialized form (`["user","7"]`).
    pub fn serialized(&self) -> String {
        let quoted: Vec<String> = self
            .0
            .iter()
            .map(|part| serde_json::Value::String(part.clone()).to_string())
            .collect();
        format!("[{}]", quoted.join(","))
    }

    /// Parse a key from its serialized form.
    pub fn parse(serialized: &str) -> Result<Self, CacheError> {
        serde_json::from_str::<Vec<String>>(serialized)
            .map(Self)
            .map_err(|e| CacheError::InvalidKey(format!("{}: {}", serialized, e)))
    }

    /// Check whether the serialized form contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.serialized().contains(needle)
    }

    /// Check whether this key starts with the given parts.
    pub fn starts_with(&self, prefix: &[&str]) -> bool {
        self.0.len() >= prefix.len() && self.0.iter().zip(prefix).all(|(a, b)| a == b)
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.serialized())
    }
}

impl From<&str> for CacheKey {
    fn from(value: &str) -> Self {
        Self::single(value)
    }
}

impl From<String> for CacheKey {
    fn from(value: String) -> Self {
        Self::single(value)
    }
}

/// Build a [`CacheKey`] from displayable parts.
///
/// ```
/// use pagewire_cache::{cache_key, CacheKey};
///
/// let key = cache_key!("user", 7);
/// assert_eq!(key, CacheKey::new(["user", "7"]));
/// ```
#[macro_export]
macro_rules! cache_key {
    ($($part:expr),+ $(,)?) => {
        $crate::CacheKey::new([$($part.to_string()),+])
    };
}
