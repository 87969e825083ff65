//! Fetch adapter seam.
//!
//! The resolver only ever talks to a [`Fetcher`]; [`HttpFetcher`] backs it
//! with the npm registry (dist-tags) and jsDelivr (listings and contents).

use super::cdn::CdnClient;
use super::error::FetchError;
use super::registry::RegistryClient;
use crate::config::Config;
use crate::imports::is_declaration_file;
use async_trait::async_trait;
use reqwest::Client;
use std::collections::BTreeMap;
use std::time::Duration;

/// Listing of a module@version's published files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTree {
    pub module_name: String,
    pub version: String,
    pub files: Vec<TreeFile>,
}

/// One entry of a [`FileTree`]; `name` is a path starting with `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeFile {
    pub name: String,
}

impl FileTree {
    /// Paths of every declaration file in the tree, in listing order.
    pub fn declaration_paths(&self) -> impl Iterator<Item = &str> {
        self.files
            .iter()
            .map(|f| f.name.as_str())
            .filter(|name| is_declaration_file(name))
    }

    /// Whether the tree ships at least one declaration file.
    #[must_use]
    pub fn has_declarations(&self) -> bool {
        self.declaration_paths().next().is_some()
    }
}

/// Remote source of dist-tags, file listings and file contents.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Published dist-tags (`tag -> version`) of a package.
    async fn dist_tags(&self, name: &str) -> Result<BTreeMap<String, String>, FetchError>;

    /// File listing of `name@version`; `version` is always concrete.
    async fn file_tree(&self, name: &str, version: &str) -> Result<FileTree, FetchError>;

    /// Content of one file of `name@version`.
    async fn file(&self, name: &str, version: &str, path: &str) -> Result<String, FetchError>;
}

/// [`Fetcher`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    registry: RegistryClient,
    cdn: CdnClient,
}

impl HttpFetcher {
    /// Build a fetcher from explicit base URLs.
    ///
    /// # Errors
    /// Returns an error if a URL is invalid or the HTTP client cannot be created.
    pub fn new(registry_url: &str, data_api_url: &str, cdn_url: &str) -> Result<Self, FetchError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("typefetch/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            registry: RegistryClient::new(registry_url, http.clone())?,
            cdn: CdnClient::new(data_api_url, cdn_url, http)?,
        })
    }

    /// Build a fetcher from configuration.
    ///
    /// # Errors
    /// Returns an error if a configured URL is invalid.
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        Self::new(&config.registry_url, &config.data_api_url, &config.cdn_url)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn dist_tags(&self, name: &str) -> Result<BTreeMap<String, String>, FetchError> {
        self.registry.fetch_dist_tags(name).await
    }

    async fn file_tree(&self, name: &str, version: &str) -> Result<FileTree, FetchError> {
        let listing = self.cdn.fetch_listing(name, version).await?;
        Ok(FileTree {
            module_name: name.to_string(),
            version: version.to_string(),
            files: listing
                .files
                .into_iter()
                .map(|f| TreeFile { name: f.name })
                .collect(),
        })
    }

    async fn file(&self, name: &str, version: &str, path: &str) -> Result<String, FetchError> {
        self.cdn.fetch_file(name, version, path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(paths: &[&str]) -> FileTree {
        FileTree {
            module_name: "m".to_string(),
            version: "1.0.0".to_string(),
            files: paths
                .iter()
                .map(|p| TreeFile {
                    name: (*p).to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_declaration_paths_filter() {
        let t = tree(&[
            "/index.js",
            "/index.d.ts",
            "/package.json",
            "/esm/index.d.mts",
            "/cjs/index.d.cts",
            "/README.md",
        ]);
        let decls: Vec<_> = t.declaration_paths().collect();
        assert_eq!(decls, vec!["/index.d.ts", "/esm/index.d.mts", "/cjs/index.d.cts"]);
        assert!(t.has_declarations());
    }

    #[test]
    fn test_tree_without_declarations() {
        let t = tree(&["/index.js", "/package.json"]);
        assert!(!t.has_declarations());
    }

    #[test]
    fn test_http_fetcher_rejects_bad_url() {
        let err = HttpFetcher::new("::nope::", "https://a.test", "https://b.test").unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }
}
