//! Shared daemon state.

use std::sync::Arc;
use typefetch_core::{Config, TypeLibs};

/// State shared by every connection handler.
#[derive(Debug, Clone)]
pub struct DaemonState {
    /// Declaration library service (resolver + persistent cache).
    pub libs: Arc<TypeLibs>,
}

impl DaemonState {
    #[must_use]
    pub fn new(libs: TypeLibs) -> Self {
        Self {
            libs: Arc::new(libs),
        }
    }

    /// State backed by the HTTP fetcher and on-disk cache from `config`.
    ///
    /// # Errors
    /// Returns an error if the fetcher or cache store cannot be set up.
    pub fn from_config(config: &Config) -> Result<Self, typefetch_core::Error> {
        Ok(Self::new(TypeLibs::open(config)?))
    }
}
