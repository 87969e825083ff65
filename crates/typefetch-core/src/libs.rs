//! Caller-facing operations over one resolver and one cache store.

use crate::cache::{CacheStore, DiskStore, StoreError, VirtualFileSet};
use crate::config::Config;
use crate::error::Error;
use crate::pkg::{canonical_module_name, module_key, Fetcher, HttpFetcher, ResolveError};
use crate::resolver::Resolver;
use std::sync::Arc;
use tracing::info;

/// Result of [`TypeLibs::fetch_libs`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedLibs {
    pub module_name: String,
    pub version: String,
    pub vfs: VirtualFileSet,
}

/// Result of [`TypeLibs::get_cached_module`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedModule {
    pub module_name: String,
    pub version: String,
    pub vfs: VirtualFileSet,
    pub not_cached: bool,
}

/// Declaration library service.
#[derive(Debug, Clone)]
pub struct TypeLibs {
    resolver: Resolver,
}

impl TypeLibs {
    /// Build the service over an explicit fetcher and store.
    #[must_use]
    pub fn new(fetcher: Arc<dyn Fetcher>, store: Arc<dyn CacheStore>) -> Self {
        Self {
            resolver: Resolver::new(fetcher, store),
        }
    }

    /// Build the service from configuration: HTTP fetcher, on-disk store.
    ///
    /// # Errors
    /// Returns an error if a configured URL is invalid or the store
    /// directory cannot be created.
    pub fn open(config: &Config) -> Result<Self, Error> {
        let fetcher = HttpFetcher::from_config(config)?;
        let dir = config.store_dir();
        let store = DiskStore::open(&dir).map_err(|e| match e {
            StoreError::Io(source) => Error::CacheDir { path: dir.clone(), source },
            other => Error::Store(other),
        })?;
        Ok(Self::new(Arc::new(fetcher), Arc::new(store)))
    }

    fn store(&self) -> &dyn CacheStore {
        self.resolver.store().as_ref()
    }

    /// Whether `name@version` has a pointer naming exactly itself.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub fn is_already_exist(&self, name: &str, version: &str) -> Result<bool, StoreError> {
        let key = key_for(name, version);
        Ok(self
            .store()
            .get_pointer(&key)?
            .is_some_and(|stored| stored.eq_ignore_ascii_case(&key)))
    }

    /// Resolve and cache `name@version`.
    ///
    /// # Errors
    /// Returns the resolution error for the requested module.
    pub async fn fetch_libs(&self, name: &str, version: &str) -> Result<FetchedLibs, ResolveError> {
        let resolved = self.resolver.resolve(name, version).await?;
        info!(
            module = %resolved.module_name,
            version = %resolved.version,
            files = resolved.files.len(),
            "fetched declaration libs"
        );
        Ok(FetchedLibs {
            module_name: resolved.module_name,
            version: resolved.version,
            vfs: resolved.files,
        })
    }

    /// Look up the cached file set for `name@version` without resolving.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub fn get_cached_module(&self, name: &str, version: &str) -> Result<CachedModule, StoreError> {
        let module_name = canonical_module_name(name);
        let files = self.store().get_deps(&module_key(&module_name, version))?;
        Ok(CachedModule {
            module_name,
            version: version.to_string(),
            not_cached: files.is_none(),
            vfs: files.unwrap_or_default(),
        })
    }

    /// Virtual paths cached for `name@version`; empty when absent.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub fn get_module_dependencies_path(&self, name: &str, version: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .store()
            .get_deps(&key_for(name, version))?
            .map(|files| files.into_keys().collect())
            .unwrap_or_default())
    }

    /// Drop both cache entries for `name@version`, returning the paths they held.
    ///
    /// # Errors
    /// Returns an error if the store cannot be updated.
    pub fn remove_libs(&self, name: &str, version: &str) -> Result<Vec<String>, StoreError> {
        let key = key_for(name, version);
        let removed = self.store().delete_resolved(&key)?;
        if removed.is_some() {
            info!(key = %key, "removed declaration libs");
        }
        Ok(removed.map(|files| files.into_keys().collect()).unwrap_or_default())
    }
}

fn key_for(name: &str, version: &str) -> String {
    module_key(&canonical_module_name(name), version)
}
