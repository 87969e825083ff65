//! Fetch and resolution error types.

use crate::cache::StoreError;
use thiserror::Error;

/// Resolution error codes, reported verbatim in RPC error responses.
pub mod codes {
    pub const LIBS_INVALID_MODULE_NAME: &str = "LIBS_INVALID_MODULE_NAME";
    pub const LIBS_INVALID_VERSION: &str = "LIBS_INVALID_VERSION";
    pub const LIBS_TAG_LOOKUP_FAILED: &str = "LIBS_TAG_LOOKUP_FAILED";
    pub const LIBS_TAG_NOT_FOUND: &str = "LIBS_TAG_NOT_FOUND";
    pub const LIBS_TREE_FETCH_FAILED: &str = "LIBS_TREE_FETCH_FAILED";
    pub const LIBS_FILE_DOWNLOAD_FAILED: &str = "LIBS_FILE_DOWNLOAD_FAILED";
    pub const LIBS_CACHE_ERROR: &str = "LIBS_CACHE_ERROR";
}

/// Failure talking to the registry, data API or CDN.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("not found: {url}")]
    NotFound { url: String },

    #[error("server returned status {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

impl FetchError {
    /// Whether the remote reported the resource as missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Failure resolving a module's declaration files.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid module name '{name}'")]
    InvalidModuleName { name: String },

    #[error("invalid version '{version}' for {name}{}", available_suffix(.available.as_deref()))]
    InvalidVersion {
        name: String,
        version: String,
        available: Option<String>,
    },

    #[error("failed to look up tag '{tag}' for {name}: {source}")]
    TagLookupFailed {
        name: String,
        tag: String,
        #[source]
        source: FetchError,
    },

    #[error("tag '{tag}' not found for {name} (available: {available})")]
    TagNotFound {
        name: String,
        tag: String,
        available: String,
    },

    #[error("failed to list files of {name}@{version}: {source}")]
    TreeFetchFailed {
        name: String,
        version: String,
        #[source]
        source: FetchError,
    },

    #[error("failed to download {path}: {source}")]
    FileDownloadFailed {
        path: String,
        #[source]
        source: FetchError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn available_suffix(available: Option<&str>) -> String {
    match available {
        Some(tags) if !tags.is_empty() => format!(" (available tags: {tags})"),
        _ => String::new(),
    }
}

impl ResolveError {
    /// Stable error code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidModuleName { .. } => codes::LIBS_INVALID_MODULE_NAME,
            Self::InvalidVersion { .. } => codes::LIBS_INVALID_VERSION,
            Self::TagLookupFailed { .. } => codes::LIBS_TAG_LOOKUP_FAILED,
            Self::TagNotFound { .. } => codes::LIBS_TAG_NOT_FOUND,
            Self::TreeFetchFailed { .. } => codes::LIBS_TREE_FETCH_FAILED,
            Self::FileDownloadFailed { .. } => codes::LIBS_FILE_DOWNLOAD_FAILED,
            Self::Store(_) => codes::LIBS_CACHE_ERROR,
        }
    }

    pub(crate) fn invalid_name(name: &str) -> Self {
        Self::InvalidModuleName {
            name: name.to_string(),
        }
    }

    pub(crate) fn invalid_version(name: &str, version: &str) -> Self {
        Self::InvalidVersion {
            name: name.to_string(),
            version: version.to_string(),
            available: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_uppercase() {
        let all_codes = [
            codes::LIBS_INVALID_MODULE_NAME,
            codes::LIBS_INVALID_VERSION,
            codes::LIBS_TAG_LOOKUP_FAILED,
            codes::LIBS_TAG_NOT_FOUND,
            codes::LIBS_TREE_FETCH_FAILED,
            codes::LIBS_FILE_DOWNLOAD_FAILED,
            codes::LIBS_CACHE_ERROR,
        ];

        for code in all_codes {
            assert!(
                code.chars().all(|c| c.is_uppercase() || c == '_'),
                "Error code '{code}' should be SCREAMING_SNAKE_CASE"
            );
        }
    }

    #[test]
    fn test_invalid_version_lists_tags() {
        let err = ResolveError::InvalidVersion {
            name: "react".to_string(),
            version: "nope".to_string(),
            available: Some("latest: 18.2.0, next: 19.0.0".to_string()),
        };
        assert_eq!(err.code(), codes::LIBS_INVALID_VERSION);
        let msg = err.to_string();
        assert!(msg.contains("nope"));
        assert!(msg.contains("next: 19.0.0"));
    }

    #[test]
    fn test_invalid_version_without_tags() {
        let err = ResolveError::invalid_version("react", "1.2");
        assert_eq!(err.to_string(), "invalid version '1.2' for react");
    }

    #[test]
    fn test_tree_fetch_failed_keeps_source() {
        let err = ResolveError::TreeFetchFailed {
            name: "left-pad".to_string(),
            version: "9.9.9".to_string(),
            source: FetchError::Status {
                url: "https://example.test".to_string(),
                status: 500,
            },
        };
        assert_eq!(err.code(), codes::LIBS_TREE_FETCH_FAILED);
        assert!(err.to_string().contains("500"));
    }
}
