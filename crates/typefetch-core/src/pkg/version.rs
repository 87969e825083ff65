//! Version reference resolution.

use super::error::ResolveError;
use super::fetch::Fetcher;
use super::registry::format_tags;
use super::spec::{looks_like_version, LATEST};
use tracing::debug;

/// Turn a version reference into a concrete version string.
///
/// Empty means `latest`. References shaped like a version (`1.2.3`, `18.0`)
/// pass through without touching the registry; anything else is looked up
/// in the package's dist-tags.
///
/// # Errors
/// `TagLookupFailed` if the registry cannot be queried (its source is
/// `NotFound` when the package does not exist), `TagNotFound` if the tag is
/// not published.
pub async fn resolve_version(
    fetcher: &dyn Fetcher,
    name: &str,
    reference: &str,
) -> Result<String, ResolveError> {
    let tag = if reference.is_empty() { LATEST } else { reference };

    if looks_like_version(tag) {
        return Ok(tag.to_string());
    }

    let tags = fetcher
        .dist_tags(name)
        .await
        .map_err(|source| ResolveError::TagLookupFailed {
            name: name.to_string(),
            tag: tag.to_string(),
            source,
        })?;

    match tags.get(tag) {
        Some(version) => {
            debug!(module = %name, tag = %tag, version = %version, "resolved dist-tag");
            Ok(version.clone())
        }
        None => Err(ResolveError::TagNotFound {
            name: name.to_string(),
            tag: tag.to_string(),
            available: format_tags(&tags),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pkg::mock::MockFetcher;

    fn fetcher() -> MockFetcher {
        MockFetcher::new().with_package("react", &[("latest", "18.2.0"), ("next", "19.0.0")])
    }

    #[tokio::test]
    async fn test_empty_reference_is_latest() {
        let f = fetcher();
        assert_eq!(resolve_version(&f, "react", "").await.unwrap(), "18.2.0");
    }

    #[tokio::test]
    async fn test_version_shaped_passes_through() {
        let f = fetcher();
        assert_eq!(resolve_version(&f, "react", "17.0.2").await.unwrap(), "17.0.2");
        assert_eq!(resolve_version(&f, "react", "18.0").await.unwrap(), "18.0");
        assert_eq!(f.dist_tag_calls(), 0);
    }

    #[tokio::test]
    async fn test_tag_lookup() {
        let f = fetcher();
        assert_eq!(resolve_version(&f, "react", "next").await.unwrap(), "19.0.0");
        assert_eq!(f.dist_tag_calls(), 1);
    }

    #[tokio::test]
    async fn test_tag_not_found_lists_tags() {
        let f = fetcher();
        let err = resolve_version(&f, "react", "canary").await.unwrap_err();
        match err {
            ResolveError::TagNotFound { available, .. } => {
                assert_eq!(available, "latest: 18.2.0, next: 19.0.0");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_package_keeps_not_found_source() {
        let f = fetcher();
        let err = resolve_version(&f, "does-not-exist", "latest").await.unwrap_err();
        assert!(matches!(err, ResolveError::TagLookupFailed { ref source, .. } if source.is_not_found()));
    }
}
