//! Partition identity.

/// Name of a cache partition: the configured prefix followed by the cache name.
///
/// Computed once when a route is compiled and never recomputed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derive the key from a prefix and a cache name.
    pub fn new(prefix: &str, name: &str) -> Self {
        let mut key = String::with_capacity(prefix.len() + name.len());
        key.push_str(prefix);
        key.push_str(name);
        Self(key)
    }

    /// Get the key string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<CacheKey> for String {
    fn from(key: CacheKey) -> Self {
        key.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_and_name_concatenate() {
        let key = CacheKey::new("sw-", "default");
        assert_eq!(key.as_str(), "sw-default");
        assert_eq!(key.to_string(), "sw-default");
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(CacheKey::new("a", "b"), CacheKey::new("a", "b"));
        assert_ne!(CacheKey::new("a", "b"), CacheKey::new("ab", "c"));
    }
}
