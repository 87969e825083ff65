//! In-memory [`Fetcher`] for tests.

use super::error::FetchError;
use super::fetch::{FileTree, Fetcher, TreeFile};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
struct Package {
    tags: BTreeMap<String, String>,
    /// `None` content: listed in the tree but fails to download.
    versions: HashMap<String, BTreeMap<String, Option<String>>>,
}

/// Fetcher serving fixed packages and counting every call.
///
/// Unknown packages, versions and files answer `FetchError::NotFound`.
#[derive(Debug, Default)]
pub struct MockFetcher {
    packages: HashMap<String, Package>,
    dist_tag_calls: AtomicUsize,
    tree_calls: AtomicUsize,
    file_calls: AtomicUsize,
}

impl MockFetcher {
    /// Create an empty fetcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a package with the given dist-tags.
    #[must_use]
    pub fn with_package(mut self, name: &str, tags: &[(&str, &str)]) -> Self {
        let pkg = self.packages.entry(name.to_string()).or_default();
        for (tag, version) in tags {
            pkg.tags.insert((*tag).to_string(), (*version).to_string());
        }
        self
    }

    /// Publish files for `name@version`, creating the package if needed.
    #[must_use]
    pub fn with_files(mut self, name: &str, version: &str, files: &[(&str, &str)]) -> Self {
        let pkg = self.packages.entry(name.to_string()).or_default();
        let tree = pkg.versions.entry(version.to_string()).or_default();
        for (path, content) in files {
            tree.insert((*path).to_string(), Some((*content).to_string()));
        }
        self
    }

    /// List `path` in the tree of `name@version` but fail every download of it.
    #[must_use]
    pub fn with_unavailable_file(mut self, name: &str, version: &str, path: &str) -> Self {
        let pkg = self.packages.entry(name.to_string()).or_default();
        pkg.versions
            .entry(version.to_string())
            .or_default()
            .insert(path.to_string(), None);
        self
    }

    /// Number of dist-tag lookups served.
    #[must_use]
    pub fn dist_tag_calls(&self) -> usize {
        self.dist_tag_calls.load(Ordering::SeqCst)
    }

    /// Number of file listings served.
    #[must_use]
    pub fn tree_calls(&self) -> usize {
        self.tree_calls.load(Ordering::SeqCst)
    }

    /// Number of file downloads served.
    #[must_use]
    pub fn file_calls(&self) -> usize {
        self.file_calls.load(Ordering::SeqCst)
    }

    /// Total calls of any kind.
    #[must_use]
    pub fn total_calls(&self) -> usize {
        self.dist_tag_calls() + self.tree_calls() + self.file_calls()
    }

    fn files_of(&self, name: &str, version: &str) -> Option<&BTreeMap<String, Option<String>>> {
        self.packages.get(name)?.versions.get(version)
    }
}

fn not_found(what: String) -> FetchError {
    FetchError::NotFound { url: what }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn dist_tags(&self, name: &str) -> Result<BTreeMap<String, String>, FetchError> {
        self.dist_tag_calls.fetch_add(1, Ordering::SeqCst);
        self.packages
            .get(name)
            .map(|p| p.tags.clone())
            .ok_or_else(|| not_found(format!("mock://registry/{name}")))
    }

    async fn file_tree(&self, name: &str, version: &str) -> Result<FileTree, FetchError> {
        self.tree_calls.fetch_add(1, Ordering::SeqCst);
        let files = self
            .files_of(name, version)
            .ok_or_else(|| not_found(format!("mock://data/{name}@{version}")))?;
        Ok(FileTree {
            module_name: name.to_string(),
            version: version.to_string(),
            files: files
                .keys()
                .map(|path| TreeFile { name: path.clone() })
                .collect(),
        })
    }

    async fn file(&self, name: &str, version: &str, path: &str) -> Result<String, FetchError> {
        self.file_calls.fetch_add(1, Ordering::SeqCst);
        let url = format!("mock://cdn/{name}@{version}{path}");
        match self.files_of(name, version).and_then(|files| files.get(path)) {
            Some(Some(content)) => Ok(content.clone()),
            Some(None) => Err(FetchError::Status { url, status: 503 }),
            None => Err(not_found(url)),
        }
    }
}
