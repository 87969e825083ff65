//! npm registry client.
//!
//! Only the dist-tag map is read; resolution never walks the full version list.

use super::error::FetchError;
use reqwest::Client;
use std::collections::BTreeMap;
use url::Url;

/// Default npm registry URL.
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org/";

/// Environment variable to override registry URL.
pub const REGISTRY_ENV: &str = "TYPEFETCH_NPM_REGISTRY";

/// Accept header selecting the abbreviated ("corgi") packument.
pub const ABBREVIATED_ACCEPT: &str = "application/vnd.npm.install-v1+json";

/// Registry client for fetching dist-tags.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    base_url: Url,
    http: Client,
}

impl RegistryClient {
    /// Create a new registry client with the given base URL.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid.
    pub fn new(base_url: &str, http: Client) -> Result<Self, FetchError> {
        let base_url = parse_base_url(base_url)?;
        Ok(Self { base_url, http })
    }

    /// Get the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Fetch the dist-tag map (`tag -> version`) for a package.
    ///
    /// # Errors
    /// Returns an error if the request fails or the package is not found.
    pub async fn fetch_dist_tags(&self, name: &str) -> Result<BTreeMap<String, String>, FetchError> {
        let url = self
            .base_url
            .join(&encode_name(name))
            .map_err(|e| FetchError::InvalidUrl(format!("{name}: {e}")))?;

        let response = self
            .http
            .get(url.as_str())
            .header(reqwest::header::ACCEPT, ABBREVIATED_ACCEPT)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound {
                url: url.to_string(),
            });
        }

        if !response.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let body = response.text().await?;
        let packument: serde_json::Value = serde_json::from_str(&body)?;
        Ok(dist_tags(&packument))
    }
}

/// Parse a base URL, making sure relative joins append rather than replace.
pub(crate) fn parse_base_url(raw: &str) -> Result<Url, FetchError> {
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&normalized).map_err(|e| FetchError::InvalidUrl(format!("{raw}: {e}")))
}

/// URL-encode a package name for the registry (`@scope/name` -> `@scope%2Fname`).
#[must_use]
pub fn encode_name(name: &str) -> String {
    if name.starts_with('@') {
        name.replace('/', "%2F")
    } else {
        name.to_string()
    }
}

/// Extract the `dist-tags` map from a packument.
#[must_use]
pub fn dist_tags(packument: &serde_json::Value) -> BTreeMap<String, String> {
    packument
        .get("dist-tags")
        .and_then(|v| v.as_object())
        .map(|obj| {
            obj.iter()
                .filter_map(|(tag, v)| v.as_str().map(|s| (tag.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

/// Render published tags as `tag: version` pairs joined by `, `.
#[must_use]
pub fn format_tags(tags: &BTreeMap<String, String>) -> String {
    tags.iter()
        .map(|(tag, version)| format!("{tag}: {version}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_scoped_name() {
        assert_eq!(encode_name("@types/node"), "@types%2Fnode");
        assert_eq!(encode_name("react"), "react");
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let url = parse_base_url("http://127.0.0.1:4873").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:4873/");
        assert_eq!(
            url.join("left-pad").unwrap().as_str(),
            "http://127.0.0.1:4873/left-pad"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let err = RegistryClient::new("not a url", Client::new()).unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl(_)));
    }

    #[test]
    fn test_dist_tags_extraction() {
        let packument = serde_json::json!({
            "name": "react",
            "dist-tags": { "latest": "18.2.0", "next": "19.0.0-rc.1", "bogus": 3 }
        });
        let tags = dist_tags(&packument);
        assert_eq!(tags.len(), 2);
        assert_eq!(tags.get("latest").map(String::as_str), Some("18.2.0"));
        assert_eq!(tags.get("next").map(String::as_str), Some("19.0.0-rc.1"));
    }

    #[test]
    fn test_dist_tags_missing() {
        let tags = dist_tags(&serde_json::json!({ "name": "x" }));
        assert!(tags.is_empty());
    }

    #[test]
    fn test_format_tags() {
        let mut tags = BTreeMap::new();
        tags.insert("latest".to_string(), "1.0.0".to_string());
        tags.insert("beta".to_string(), "2.0.0-beta.1".to_string());
        assert_eq!(format_tags(&tags), "beta: 2.0.0-beta.1, latest: 1.0.0");
    }
}
