//! jsDelivr data API and CDN client.

use super::error::FetchError;
use super::registry::parse_base_url;
use reqwest::{Client, Response};
use serde::Deserialize;
use url::Url;

/// Default jsDelivr data API URL (file listings).
pub const DEFAULT_DATA_API: &str = "https://data.jsdelivr.com/";

/// Default jsDelivr CDN URL (file contents).
pub const DEFAULT_CDN: &str = "https://cdn.jsdelivr.net/";

/// Environment variable to override the data API URL.
pub const DATA_API_ENV: &str = "TYPEFETCH_DATA_API";

/// Environment variable to override the CDN URL.
pub const CDN_ENV: &str = "TYPEFETCH_CDN";

/// Flat listing returned by `/v1/package/npm/<name>@<version>/flat`.
#[derive(Debug, Clone, Deserialize)]
pub struct FlatListing {
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub files: Vec<FlatFile>,
}

/// One file in a flat listing.
#[derive(Debug, Clone, Deserialize)]
pub struct FlatFile {
    pub name: String,
}

/// Client for package file listings and file contents.
#[derive(Debug, Clone)]
pub struct CdnClient {
    data_api: Url,
    cdn: Url,
    http: Client,
}

impl CdnClient {
    /// Create a client over the given data API and CDN base URLs.
    ///
    /// # Errors
    /// Returns an error if either URL is invalid.
    pub fn new(data_api: &str, cdn: &str, http: Client) -> Result<Self, FetchError> {
        Ok(Self {
            data_api: parse_base_url(data_api)?,
            cdn: parse_base_url(cdn)?,
            http,
        })
    }

    /// List the published files of `name@version`.
    ///
    /// # Errors
    /// Returns an error if the request fails or the listing is malformed.
    pub async fn fetch_listing(&self, name: &str, version: &str) -> Result<FlatListing, FetchError> {
        let url = join(&self.data_api, &format!("v1/package/npm/{name}@{version}/flat"))?;
        let body = checked(self.http.get(url.as_str()).send().await?, &url)?
            .text()
            .await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Download one file of `name@version`; `path` starts with `/`.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    pub async fn fetch_file(&self, name: &str, version: &str, path: &str) -> Result<String, FetchError> {
        let url = join(&self.cdn, &format!("npm/{name}@{version}{path}"))?;
        let text = checked(self.http.get(url.as_str()).send().await?, &url)?
            .text()
            .await?;
        Ok(text)
    }
}

fn join(base: &Url, rel: &str) -> Result<Url, FetchError> {
    base.join(rel)
        .map_err(|e| FetchError::InvalidUrl(format!("{rel}: {e}")))
}

fn checked(response: Response, url: &Url) -> Result<Response, FetchError> {
    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(FetchError::NotFound {
            url: url.to_string(),
        });
    }
    if !status.is_success() {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_parses_jsdelivr_shape() {
        let body = r#"{
            "default": "/index.min.js",
            "files": [
                {"name": "/index.d.ts", "hash": "abc", "time": "2020-01-01T00:00:00.000Z", "size": 120},
                {"name": "/package.json", "hash": "def", "time": "2020-01-01T00:00:00.000Z", "size": 640}
            ]
        }"#;
        let listing: FlatListing = serde_json::from_str(body).unwrap();
        assert_eq!(listing.default.as_deref(), Some("/index.min.js"));
        assert_eq!(listing.files.len(), 2);
        assert_eq!(listing.files[0].name, "/index.d.ts");
    }

    #[test]
    fn test_listing_tolerates_missing_fields() {
        let listing: FlatListing = serde_json::from_str("{}").unwrap();
        assert!(listing.default.is_none());
        assert!(listing.files.is_empty());
    }

    #[test]
    fn test_urls_keep_scope() {
        let base = parse_base_url("https://cdn.example.test").unwrap();
        let url = join(&base, "npm/@scope/name@1.0.0/index.d.ts").unwrap();
        assert_eq!(
            url.as_str(),
            "https://cdn.example.test/npm/@scope/name@1.0.0/index.d.ts"
        );
    }
}
