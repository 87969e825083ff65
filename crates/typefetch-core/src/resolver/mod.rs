//! Recursive declaration resolver.
//!
//! Starting from one `(name, version)` request, lists the package's files,
//! downloads its declaration files (or those of its `@types` companion),
//! scans them for further module references and follows those concurrently
//! until the whole closure has been collected into one virtual file set.

use crate::cache::{CacheStore, VirtualFileSet};
use crate::imports::scan_declaration_imports;
use crate::pkg::{
    canonical_module_name, dt_name, is_valid_module_name, module_key, resolve_version,
    types_package_name, FileTree, Fetcher, ResolveError, VersionRef, LATEST,
};
use futures::future::{join, try_join_all, BoxFuture, FutureExt};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

/// Outcome of a successful top-level resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedModule {
    /// Normalized module name.
    pub module_name: String,
    /// Concrete version the request resolved to.
    pub version: String,
    /// Every declaration file collected, keyed by virtual path.
    pub files: VirtualFileSet,
}

/// State shared by every branch of one top-level resolution.
#[derive(Debug, Default)]
struct Pass {
    files: Mutex<VirtualFileSet>,
    visited: Mutex<HashSet<String>>,
    /// `(canonical name, concrete version)` of the depth-0 module once known.
    root: Mutex<Option<(String, String)>>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Pass {
    /// Mark `key` visited; false if it already was.
    fn mark(&self, key: String) -> bool {
        lock(&self.visited).insert(key)
    }

    fn insert(&self, path: String, content: String) {
        lock(&self.files).insert(path, content);
    }

    fn set_root(&self, name: String, version: String) {
        *lock(&self.root) = Some((name, version));
    }

    fn root(&self) -> Option<(String, String)> {
        lock(&self.root).clone()
    }

    fn take_files(&self) -> VirtualFileSet {
        std::mem::take(&mut *lock(&self.files))
    }
}

/// Where a module's declaration files come from.
struct Source {
    name: String,
    version: String,
    /// Virtual directory the files are placed under.
    prefix: String,
    tree: FileTree,
}

/// Recursive resolver over a fetcher and a cache store.
#[derive(Clone)]
pub struct Resolver {
    fetcher: Arc<dyn Fetcher>,
    store: Arc<dyn CacheStore>,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver").finish_non_exhaustive()
    }
}

impl Resolver {
    /// Create a resolver.
    #[must_use]
    pub fn new(fetcher: Arc<dyn Fetcher>, store: Arc<dyn CacheStore>) -> Self {
        Self { fetcher, store }
    }

    /// The cache store this resolver writes to.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Resolve `name@version` and every declaration it transitively needs.
    ///
    /// On success the file set is cached under `canonical@concrete`. On
    /// failure any entries written for this request are removed before the
    /// error is returned.
    ///
    /// # Errors
    /// Validation, version and tree errors for the requested module itself;
    /// failures of transitive references are logged and skipped.
    pub async fn resolve(&self, name: &str, version: &str) -> Result<ResolvedModule, ResolveError> {
        let version = if version.is_empty() { LATEST } else { version };
        let pass = Pass::default();

        let outcome = self
            .visit(&pass, name.to_string(), version.to_string(), 0)
            .await
            .and_then(|()| self.finish(name, version, &pass));

        if let Err(err) = &outcome {
            debug!(module = %name, version = %version, code = err.code(), "resolution failed, rolling back");
            self.rollback(name, version, &pass);
        }
        outcome
    }

    fn finish(&self, name: &str, version: &str, pass: &Pass) -> Result<ResolvedModule, ResolveError> {
        // A successful depth-0 visit always records the root
        let (module_name, version) = pass
            .root()
            .unwrap_or_else(|| (canonical_module_name(name), version.to_string()));
        let files = pass.take_files();
        let key = module_key(&module_name, &version);
        self.store.put_resolved(&key, &key, &files)?;
        debug!(key = %key, files = files.len(), "cached resolved module");
        Ok(ResolvedModule {
            module_name,
            version,
            files,
        })
    }

    /// Delete whatever this request may have written.
    fn rollback(&self, name: &str, version: &str, pass: &Pass) {
        let canonical = if is_valid_module_name(name) {
            canonical_module_name(name)
        } else {
            name.to_string()
        };
        let mut keys = vec![module_key(&canonical, version)];
        if let Some((root_name, root_version)) = pass.root() {
            let eager = module_key(&root_name, &root_version);
            if !keys.contains(&eager) {
                keys.push(eager);
            }
        }
        for key in keys {
            if let Err(e) = self.store.delete_resolved(&key) {
                warn!(key = %key, error = %e, "failed to roll back cache entry");
            }
        }
    }

    fn visit<'a>(
        &'a self,
        pass: &'a Pass,
        name: String,
        version: String,
        depth: usize,
    ) -> BoxFuture<'a, Result<(), ResolveError>> {
        async move {
            if !is_valid_module_name(&name) {
                return skip_or_fail(depth, ResolveError::invalid_name(&name));
            }
            let Some(reference) = VersionRef::classify(&version) else {
                return skip_or_fail(depth, ResolveError::invalid_version(&name, &version));
            };

            let canonical = canonical_module_name(&name);
            if !pass.mark(module_key(&canonical, &version)) {
                debug!(module = %canonical, version = %version, "already visited");
                return Ok(());
            }
            debug!(module = %canonical, version = %version, depth, "visiting");

            let tree = match self.locate_tree(&canonical, &version, &reference).await {
                Ok(tree) => tree,
                Err(e) => return skip_or_fail(depth, e),
            };
            if tree.version != version && !pass.mark(module_key(&canonical, &tree.version)) && depth > 0 {
                debug!(module = %canonical, version = %tree.version, "already visited");
                return Ok(());
            }

            if depth == 0 {
                let key = module_key(&canonical, &tree.version);
                pass.set_root(canonical.clone(), tree.version.clone());
                self.store.put_pointer(&key, &key)?;
            }

            let source = match self.select_source(&canonical, &version, &reference, tree).await {
                Ok(source) => source,
                Err(e) => return skip_or_fail(depth, e),
            };

            let downloads = source
                .tree
                .declaration_paths()
                .map(|path| self.download(pass, &source, path.to_string(), depth))
                .collect::<Vec<_>>();
            let (results, ()) = join(try_join_all(downloads), self.download_manifest(pass, &source)).await;
            results?;
            Ok(())
        }
        .boxed()
    }

    /// Resolve the version reference and list the tree at that version.
    async fn locate_tree(
        &self,
        name: &str,
        version: &str,
        reference: &VersionRef,
    ) -> Result<FileTree, ResolveError> {
        let concrete = match resolve_version(self.fetcher.as_ref(), name, version).await {
            Ok(concrete) => concrete,
            Err(ResolveError::TagNotFound { available, .. }) if matches!(reference, VersionRef::Tag(_)) => {
                return Err(ResolveError::InvalidVersion {
                    name: name.to_string(),
                    version: version.to_string(),
                    available: Some(available),
                });
            }
            // A package the registry does not know is a missing tree, not a lookup failure
            Err(ResolveError::TagLookupFailed { source, .. }) if source.is_not_found() => {
                return Err(ResolveError::TreeFetchFailed {
                    name: name.to_string(),
                    version: version.to_string(),
                    source,
                });
            }
            Err(e) => return Err(e),
        };

        self.fetcher
            .file_tree(name, &concrete)
            .await
            .map_err(|source| ResolveError::TreeFetchFailed {
                name: name.to_string(),
                version: concrete,
                source,
            })
    }

    /// Own tree if it ships declarations, otherwise the `@types` companion.
    async fn select_source(
        &self,
        canonical: &str,
        version: &str,
        reference: &VersionRef,
        tree: FileTree,
    ) -> Result<Source, ResolveError> {
        let flat = dt_name(canonical);
        if tree.has_declarations() {
            return Ok(Source {
                name: canonical.to_string(),
                version: tree.version.clone(),
                prefix: format!("/node_modules/{flat}"),
                tree,
            });
        }

        let companion = types_package_name(canonical);
        debug!(module = %canonical, companion = %companion, "no bundled declarations, using companion");
        let tree = self.locate_tree(&companion, version, reference).await?;
        Ok(Source {
            name: companion,
            version: tree.version.clone(),
            prefix: format!("/node_modules/@types/{flat}"),
            tree,
        })
    }

    /// Download one declaration file and follow its references.
    async fn download(
        &self,
        pass: &Pass,
        source: &Source,
        path: String,
        depth: usize,
    ) -> Result<(), ResolveError> {
        let content = match self.fetcher.file(&source.name, &source.version, &path).await {
            Ok(content) => content,
            Err(e) => {
                let err = ResolveError::FileDownloadFailed {
                    path: format!("{}@{}{path}", source.name, source.version),
                    source: e,
                };
                warn!(code = err.code(), error = %err, "skipping declaration file");
                return Ok(());
            }
        };

        let references = scan_declaration_imports(&content);
        pass.insert(virtual_path(&source.prefix, &path), content);

        let children = references
            .into_iter()
            .filter_map(|r| r.version.map(|v| (r.module, v)))
            .map(|(module, version)| self.visit(pass, module, version, depth + 1))
            .collect::<Vec<_>>();
        try_join_all(children).await?;
        Ok(())
    }

    async fn download_manifest(&self, pass: &Pass, source: &Source) {
        match self.fetcher.file(&source.name, &source.version, "/package.json").await {
            Ok(content) => pass.insert(format!("{}/package.json", source.prefix), content),
            Err(e) => {
                warn!(module = %source.name, version = %source.version, error = %e, "failed to fetch package.json");
            }
        }
    }
}

/// Fatal at the top level, logged and skipped below it.
fn skip_or_fail(depth: usize, err: ResolveError) -> Result<(), ResolveError> {
    if depth == 0 {
        return Err(err);
    }
    debug!(depth, code = err.code(), error = %err, "skipping dependency");
    Ok(())
}

fn virtual_path(prefix: &str, path: &str) -> String {
    if path.starts_with('/') {
        format!("{prefix}{path}")
    } else {
        format!("{prefix}/{path}")
    }
}
