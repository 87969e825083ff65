//! Package metadata: module references, version resolution and the fetch
//! adapters for the npm registry and jsDelivr.

pub mod cdn;
pub mod error;
pub mod fetch;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod registry;
pub mod spec;
pub mod version;

pub use error::{codes, FetchError, ResolveError};
pub use fetch::{FileTree, Fetcher, HttpFetcher, TreeFile};
#[cfg(any(test, feature = "test-util"))]
pub use mock::MockFetcher;
pub use spec::{
    canonical_module_name, dt_name, is_valid_module_name, module_key, types_package_name,
    VersionRef, LATEST,
};
pub use version::resolve_version;
