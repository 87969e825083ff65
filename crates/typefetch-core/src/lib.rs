#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::return_self_not_must_use)]

//! Core of typefetch.
//!
//! Resolves a package's TypeScript declaration files (and everything they
//! reference) from the npm registry and jsDelivr, and keeps the results in
//! a persistent two-keyspace cache.

pub mod cache;
pub mod config;
pub mod error;
pub mod imports;
pub mod libs;
pub mod paths;
pub mod pkg;
pub mod resolver;
pub mod version;

pub use cache::{CacheStore, DiskStore, MemoryStore, StoreError, VirtualFileSet};
pub use config::{Channel, Config};
pub use error::Error;
pub use imports::{scan_declaration_imports, DeclarationImport};
pub use libs::{CachedModule, FetchedLibs, TypeLibs};
pub use pkg::{Fetcher, FetchError, HttpFetcher, ResolveError};
pub use resolver::{ResolvedModule, Resolver};
pub use version::VERSION;
