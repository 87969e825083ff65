//! Persistent two-keyspace cache for resolved declaration sets.
//!
//! Keyspace 1 (pointers) maps `name@version` to the canonical
//! `name@version` string; keyspace 2 (dependency sets) maps the same key to
//! the resolved virtual file set. The two are kept paired through
//! [`CacheStore::put_resolved`] and [`CacheStore::delete_resolved`].

mod disk;
mod memory;

pub use disk::DiskStore;
pub use memory::MemoryStore;

use std::collections::BTreeMap;
use std::io;
use thiserror::Error;

/// Virtual path -> file content, ordered by path.
pub type VirtualFileSet = BTreeMap<String, String>;

/// Cache store failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cache I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("corrupt cache entry for {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Storage for version pointers and dependency sets.
///
/// Every operation replaces or removes a whole entry; there is no
/// multi-key transaction.
pub trait CacheStore: Send + Sync {
    /// Read the pointer stored under `key`.
    ///
    /// # Errors
    /// Returns an error if the backing storage fails.
    fn get_pointer(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Write the pointer under `key`.
    ///
    /// # Errors
    /// Returns an error if the backing storage fails.
    fn put_pointer(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove the pointer under `key`, returning whether one existed.
    ///
    /// # Errors
    /// Returns an error if the backing storage fails.
    fn delete_pointer(&self, key: &str) -> Result<bool, StoreError>;

    /// Read the dependency set stored under `key`.
    ///
    /// # Errors
    /// Returns an error if the backing storage fails.
    fn get_deps(&self, key: &str) -> Result<Option<VirtualFileSet>, StoreError>;

    /// Write the dependency set under `key`.
    ///
    /// # Errors
    /// Returns an error if the backing storage fails.
    fn put_deps(&self, key: &str, files: &VirtualFileSet) -> Result<(), StoreError>;

    /// Remove the dependency set under `key`, returning whether one existed.
    ///
    /// # Errors
    /// Returns an error if the backing storage fails.
    fn delete_deps(&self, key: &str) -> Result<bool, StoreError>;

    /// Record a successful resolution: dependency set first, then pointer.
    ///
    /// # Errors
    /// Returns an error if either write fails.
    fn put_resolved(&self, key: &str, canonical: &str, files: &VirtualFileSet) -> Result<(), StoreError> {
        self.put_deps(key, files)?;
        self.put_pointer(key, canonical)
    }

    /// Remove both entries for `key`, pointer first.
    ///
    /// Returns the dependency set that was stored, if any.
    ///
    /// # Errors
    /// Returns an error if a read or delete fails.
    fn delete_resolved(&self, key: &str) -> Result<Option<VirtualFileSet>, StoreError> {
        let previous = self.get_deps(key)?;
        self.delete_pointer(key)?;
        self.delete_deps(key)?;
        Ok(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vfs(paths: &[&str]) -> VirtualFileSet {
        paths
            .iter()
            .map(|p| ((*p).to_string(), format!("// {p}")))
            .collect()
    }

    fn exercise(store: &dyn CacheStore) {
        let key = "left-pad@1.3.0";
        assert_eq!(store.get_pointer(key).unwrap(), None);
        assert_eq!(store.get_deps(key).unwrap(), None);

        let files = vfs(&["/node_modules/left-pad/index.d.ts", "/node_modules/left-pad/package.json"]);
        store.put_resolved(key, key, &files).unwrap();
        assert_eq!(store.get_pointer(key).unwrap().as_deref(), Some(key));
        assert_eq!(store.get_deps(key).unwrap(), Some(files.clone()));

        // Other versions are independent
        assert_eq!(store.get_pointer("left-pad@1.2.0").unwrap(), None);

        let removed = store.delete_resolved(key).unwrap();
        assert_eq!(removed, Some(files));
        assert_eq!(store.get_pointer(key).unwrap(), None);
        assert_eq!(store.get_deps(key).unwrap(), None);

        assert_eq!(store.delete_resolved(key).unwrap(), None);
        assert!(!store.delete_pointer(key).unwrap());
    }

    #[test]
    fn test_memory_store_pairing() {
        exercise(&MemoryStore::new());
    }

    #[test]
    fn test_disk_store_pairing() {
        let dir = tempfile::tempdir().unwrap();
        exercise(&DiskStore::open(dir.path()).unwrap());
    }
}
