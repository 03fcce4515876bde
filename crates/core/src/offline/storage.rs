use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;

use super::{CacheError, Response};

/// Named cache generations of keyed responses.
pub trait CacheStorage: Send + Sync + 'static {
    /// Cached response for `key` in generation `cache`.
    fn lookup(&self, cache: &str, key: &str) -> Result<Option<Response>, CacheError>;
    /// Store (or overwrite) `key` in generation `cache`, creating the generation if needed.
    fn store(&self, cache: &str, key: &str, response: &Response) -> Result<(), CacheError>;
    /// Names of every generation present.
    fn cache_names(&self) -> Result<Vec<String>, CacheError>;
    /// Drop a whole generation. Returns whether it existed.
    fn delete_cache(&self, cache: &str) -> Result<bool, CacheError>;
}

/// Process-local cache storage.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    caches: RwLock<BTreeMap<String, HashMap<String, Response>>>,
}

impl MemoryCacheStorage {
    /// Empty storage.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStorage for MemoryCacheStorage {
    fn lookup(&self, cache: &str, key: &str) -> Result<Option<Response>, CacheError> {
        Ok(self
            .caches
            .read()
            .get(cache)
            .and_then(|entries| entries.get(key))
            .cloned())
    }

    fn store(&self, cache: &str, key: &str, response: &Response) -> Result<(), CacheError> {
        self.caches
            .write()
            .entry(cache.to_string())
            .or_default()
            .insert(key.to_string(), response.clone());
        Ok(())
    }

    fn cache_names(&self) -> Result<Vec<String>, CacheError> {
        Ok(self.caches.read().keys().cloned().collect())
    }

    fn delete_cache(&self, cache: &str) -> Result<bool, CacheError> {
        Ok(self.caches.write().remove(cache).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generations_are_isolated() -> Result<(), CacheError> {
        let storage = MemoryCacheStorage::new();
        storage.store("v1", "/", &Response::ok("text/html", "old"))?;
        storage.store("v2", "/", &Response::ok("text/html", "new"))?;

        assert_eq!(storage.lookup("v1", "/")?.unwrap().body, b"old");
        assert_eq!(storage.lookup("v2", "/")?.unwrap().body, b"new");
        assert_eq!(storage.lookup("v2", "/missing")?, None);
        assert_eq!(storage.cache_names()?, vec!["v1", "v2"]);

        assert!(storage.delete_cache("v1")?);
        assert!(!storage.delete_cache("v1")?);
        assert_eq!(storage.lookup("v1", "/")?, None);
        Ok(())
    }
}
