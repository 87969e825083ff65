use super::{CacheStore, StoreError, VirtualFileSet};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Process-local store; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pointers: Mutex<HashMap<String, String>>,
    deps: Mutex<HashMap<String, VirtualFileSet>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pointer entries.
    #[must_use]
    pub fn pointer_count(&self) -> usize {
        lock(&self.pointers).len()
    }

    /// Number of dependency-set entries.
    #[must_use]
    pub fn deps_count(&self) -> usize {
        lock(&self.deps).len()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CacheStore for MemoryStore {
    fn get_pointer(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(lock(&self.pointers).get(key).cloned())
    }

    fn put_pointer(&self, key: &str, value: &str) -> Result<(), StoreError> {
        lock(&self.pointers).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete_pointer(&self, key: &str) -> Result<bool, StoreError> {
        Ok(lock(&self.pointers).remove(key).is_some())
    }

    fn get_deps(&self, key: &str) -> Result<Option<VirtualFileSet>, StoreError> {
        Ok(lock(&self.deps).get(key).cloned())
    }

    fn put_deps(&self, key: &str, files: &VirtualFileSet) -> Result<(), StoreError> {
        lock(&self.deps).insert(key.to_string(), files.clone());
        Ok(())
    }

    fn delete_deps(&self, key: &str) -> Result<bool, StoreError> {
        Ok(lock(&self.deps).remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let store = MemoryStore::new();
        store.put_pointer("a@1.0.0", "a@1.0.0").unwrap();
        assert_eq!(store.pointer_count(), 1);
        assert_eq!(store.deps_count(), 0);
        store.put_deps("a@1.0.0", &VirtualFileSet::new()).unwrap();
        assert_eq!(store.deps_count(), 1);
    }
}
