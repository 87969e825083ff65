use crate::paths;
use crate::pkg::cdn::{CDN_ENV, DATA_API_ENV, DEFAULT_CDN, DEFAULT_DATA_API};
use crate::pkg::registry::{DEFAULT_REGISTRY, REGISTRY_ENV};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Runtime configuration shared by the CLI and the daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Whether to emit JSON logs.
    pub json_logs: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,

    /// Channel (dev, nightly, stable) - affects cache paths.
    pub channel: Channel,

    /// npm registry base URL used for dist-tag lookups.
    pub registry_url: String,

    /// jsDelivr data API base URL used for file listings.
    pub data_api_url: String,

    /// jsDelivr CDN base URL used for raw file downloads.
    pub cdn_url: String,

    /// Explicit cache store directory; the channel default is used if unset.
    pub cache_dir: Option<PathBuf>,
}

/// Release channel for cache/data directory namespacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    #[default]
    Stable,
    Nightly,
    Dev,
}

impl Channel {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stable => "stable",
            Self::Nightly => "nightly",
            Self::Dev => "dev",
        }
    }

    /// Parse a channel name, falling back to stable for anything unknown.
    #[must_use]
    pub fn parse(channel: &str) -> Self {
        match channel.to_lowercase().as_str() {
            "dev" => Self::Dev,
            "nightly" => Self::Nightly,
            _ => Self::Stable,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            json_logs: false,
            verbosity: 0,
            channel: Channel::default(),
            registry_url: DEFAULT_REGISTRY.to_string(),
            data_api_url: DEFAULT_DATA_API.to_string(),
            cdn_url: DEFAULT_CDN.to_string(),
            cache_dir: None,
        }
    }
}

impl Config {
    /// Build a config from defaults overridden by environment variables.
    ///
    /// Honors `TYPEFETCH_NPM_REGISTRY`, `TYPEFETCH_DATA_API`, `TYPEFETCH_CDN`
    /// and `TYPEFETCH_CACHE_DIR`.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var(REGISTRY_ENV) {
            config.registry_url = url;
        }
        if let Ok(url) = std::env::var(DATA_API_ENV) {
            config.data_api_url = url;
        }
        if let Ok(url) = std::env::var(CDN_ENV) {
            config.cdn_url = url;
        }
        if let Ok(dir) = std::env::var(paths::CACHE_DIR_ENV) {
            if !dir.is_empty() {
                config.cache_dir = Some(PathBuf::from(dir));
            }
        }

        config
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }

    /// Set channel.
    #[must_use]
    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = channel;
        self
    }

    /// Set an explicit cache store directory.
    #[must_use]
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Directory holding the persistent declaration cache.
    #[must_use]
    pub fn store_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| paths::libs_cache_dir(self.channel))
    }
}
