//! On-disk store: one JSON file per entry, named by the BLAKE3 hash of the key.
//!
//! ```text
//! <root>/pointers/<hash>.json   {"schema_version":1,"key":"react@18.2.0","value":"react@18.2.0"}
//! <root>/deps/<hash>.json       {"schema_version":1,"key":"react@18.2.0","files":{...}}
//! ```

use super::{CacheStore, StoreError, VirtualFileSet};
use crate::version::SCHEMA_VERSION;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use typefetch_util::fs::{atomic_write, read_if_exists, remove_if_exists};
use typefetch_util::hash::key_file_stem;

#[derive(Debug, Serialize, Deserialize)]
struct PointerRecord {
    schema_version: u32,
    key: String,
    value: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct DepsRecord {
    schema_version: u32,
    key: String,
    files: VirtualFileSet,
}

trait Keyed {
    fn schema_version(&self) -> u32;
    fn key(&self) -> &str;
}

impl Keyed for PointerRecord {
    fn schema_version(&self) -> u32 {
        self.schema_version
    }
    fn key(&self) -> &str {
        &self.key
    }
}

impl Keyed for DepsRecord {
    fn schema_version(&self) -> u32 {
        self.schema_version
    }
    fn key(&self) -> &str {
        &self.key
    }
}

/// Filesystem-backed [`CacheStore`].
#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    /// Open (creating if needed) a store rooted at `root`.
    ///
    /// # Errors
    /// Returns an error if the directories cannot be created.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(root.join("pointers"))?;
        fs::create_dir_all(root.join("deps"))?;
        Ok(Self { root })
    }

    fn pointer_path(&self, key: &str) -> PathBuf {
        self.root
            .join("pointers")
            .join(format!("{}.json", key_file_stem(key)))
    }

    fn deps_path(&self, key: &str) -> PathBuf {
        self.root
            .join("deps")
            .join(format!("{}.json", key_file_stem(key)))
    }

    fn read<T: DeserializeOwned + Keyed>(path: &Path, key: &str) -> Result<Option<T>, StoreError> {
        let Some(bytes) = read_if_exists(path)? else {
            return Ok(None);
        };
        let record: T = serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
            key: key.to_string(),
            source,
        })?;
        if record.schema_version() != SCHEMA_VERSION || record.key() != key {
            debug!(key = %key, path = %path.display(), "ignoring stale cache entry");
            return Ok(None);
        }
        Ok(Some(record))
    }

    fn write<T: Serialize>(path: &Path, key: &str, record: &T) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(record).map_err(|source| StoreError::Corrupt {
            key: key.to_string(),
            source,
        })?;
        atomic_write(path, &bytes)?;
        Ok(())
    }
}

impl CacheStore for DiskStore {
    fn get_pointer(&self, key: &str) -> Result<Option<String>, StoreError> {
        let record: Option<PointerRecord> = Self::read(&self.pointer_path(key), key)?;
        Ok(record.map(|r| r.value))
    }

    fn put_pointer(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let record = PointerRecord {
            schema_version: SCHEMA_VERSION,
            key: key.to_string(),
            value: value.to_string(),
        };
        Self::write(&self.pointer_path(key), key, &record)
    }

    fn delete_pointer(&self, key: &str) -> Result<bool, StoreError> {
        Ok(remove_if_exists(&self.pointer_path(key))?)
    }

    fn get_deps(&self, key: &str) -> Result<Option<VirtualFileSet>, StoreError> {
        let record: Option<DepsRecord> = Self::read(&self.deps_path(key), key)?;
        Ok(record.map(|r| r.files))
    }

    fn put_deps(&self, key: &str, files: &VirtualFileSet) -> Result<(), StoreError> {
        let record = DepsRecord {
            schema_version: SCHEMA_VERSION,
            key: key.to_string(),
            files: files.clone(),
        };
        Self::write(&self.deps_path(key), key, &record)
    }

    fn delete_deps(&self, key: &str) -> Result<bool, StoreError> {
        Ok(remove_if_exists(&self.deps_path(key))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_survives_reopen() {
        let dir = tempdir().unwrap();
        let key = "@scope/name@2.0.0";
        {
            let store = DiskStore::open(dir.path()).unwrap();
            let mut files = VirtualFileSet::new();
            files.insert(
                "/node_modules/scope__name/index.d.ts".to_string(),
                "export {};".to_string(),
            );
            store.put_resolved(key, key, &files).unwrap();
        }

        let store = DiskStore::open(dir.path()).unwrap();
        assert_eq!(store.get_pointer(key).unwrap().as_deref(), Some(key));
        let files = store.get_deps(key).unwrap().unwrap();
        assert!(files.contains_key("/node_modules/scope__name/index.d.ts"));
    }

    #[test]
    fn test_corrupt_entry_reports_error() {
        let dir = tempdir().unwrap();
        let store = DiskStore::open(dir.path()).unwrap();
        fs::write(store.pointer_path("a@1.0.0"), b"not json").unwrap();
        let err = store.get_pointer("a@1.0.0").unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn test_schema_mismatch_is_absent() {
        let dir = tempdir().unwrap();
        let store = DiskStore::open(dir.path()).unwrap();
        let stale = serde_json::json!({
            "schema_version": SCHEMA_VERSION + 1,
            "key": "a@1.0.0",
            "value": "a@1.0.0"
        });
        fs::write(store.pointer_path("a@1.0.0"), stale.to_string()).unwrap();
        assert_eq!(store.get_pointer("a@1.0.0").unwrap(), None);
    }

    #[test]
    fn test_layout() {
        let dir = tempdir().unwrap();
        let store = DiskStore::open(dir.path()).unwrap();
        store.put_pointer("a@1.0.0", "a@1.0.0").unwrap();
        let expected = dir
            .path()
            .join("pointers")
            .join(format!("{}.json", key_file_stem("a@1.0.0")));
        assert!(expected.exists());
        assert!(dir.path().join("deps").is_dir());
    }
}
