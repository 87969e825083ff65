#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

//! Long-running daemon for typefetch.
//!
//! The daemon keeps one resolver and cache store alive so editors and the
//! CLI can request declaration libraries without blocking on resolution.
//!
//! ## IPC Protocol
//! Communication uses length-prefixed JSON frames over Unix domain sockets (Unix)
//! or named pipes (Windows). See `typefetch-proto` for message types.

pub mod ipc;
mod server;
pub mod state;

pub use server::{run_server, DaemonConfig};
pub use state::DaemonState;

use typefetch_core::pkg::codes as libs_codes;
use typefetch_core::{ResolveError, StoreError};
use typefetch_proto::{codes, FrameResponse, Request, Response, PROTO_SCHEMA_VERSION};
use tracing::{debug, warn};

fn version_mismatch(client_proto_version: u32) -> Option<Response> {
    (client_proto_version != PROTO_SCHEMA_VERSION).then(|| {
        Response::error(
            codes::PROTO_VERSION_MISMATCH,
            format!(
                "Protocol version mismatch: client={client_proto_version}, server={PROTO_SCHEMA_VERSION}"
            ),
        )
    })
}

/// Whether a request needs network access and must go through
/// [`handle_request_async`].
pub fn is_async_request(request: &Request) -> bool {
    matches!(request, Request::FetchLibs { .. })
}

/// Handle a request that only touches the cache.
///
/// Returns a tuple of (response, `should_shutdown` flag).
#[must_use]
pub fn handle_request(
    request: &Request,
    client_proto_version: u32,
    state: &DaemonState,
) -> (Response, bool) {
    if let Some(mismatch) = version_mismatch(client_proto_version) {
        return (mismatch, false);
    }

    let libs = &state.libs;
    let response = match request {
        Request::Ping { nonce } => Response::pong(*nonce),
        Request::Shutdown => return (Response::ShutdownAck, true),
        Request::IsAlreadyExist { module_name, version } => libs
            .is_already_exist(module_name, version)
            .map_or_else(store_error, |exists| Response::AlreadyExist { exists }),
        Request::GetCachedModule { module_name, version } => libs
            .get_cached_module(module_name, version)
            .map_or_else(store_error, |cached| Response::CachedModule {
                module_name: cached.module_name,
                version: cached.version,
                vfs: cached.vfs,
                not_cached: cached.not_cached,
            }),
        Request::RemoveLibs { module_name, version } => libs
            .remove_libs(module_name, version)
            .map_or_else(store_error, |paths| Response::RemovedLibs { paths }),
        Request::GetModuleDependenciesPath { module_name, version } => libs
            .get_module_dependencies_path(module_name, version)
            .map_or_else(store_error, |paths| Response::DependencyPaths { paths }),
        Request::FetchLibs { .. } => Response::error(
            codes::INTERNAL_ERROR,
            "fetch_libs must be handled asynchronously",
        ),
    };
    (response, false)
}

/// Handle any request, resolving over the network when needed.
///
/// Returns a tuple of (response, `should_shutdown` flag).
pub async fn handle_request_async(
    request: &Request,
    client_proto_version: u32,
    state: &DaemonState,
) -> (Response, bool) {
    let Request::FetchLibs { module_name, version } = request else {
        return handle_request(request, client_proto_version, state);
    };
    if let Some(mismatch) = version_mismatch(client_proto_version) {
        return (mismatch, false);
    }

    let response = match state.libs.fetch_libs(module_name, version).await {
        Ok(fetched) => Response::Libs {
            module_name: fetched.module_name,
            version: fetched.version,
            vfs: fetched.vfs,
        },
        Err(e) => resolve_error(&e),
    };
    (response, false)
}

fn resolve_error(err: &ResolveError) -> Response {
    debug!(code = err.code(), error = %err, "fetch_libs failed");
    Response::error(err.code(), err.to_string())
}

fn store_error(err: StoreError) -> Response {
    warn!(error = %err, "cache store failure");
    Response::error(libs_codes::LIBS_CACHE_ERROR, err.to_string())
}

/// Create a response frame.
#[must_use]
pub fn make_response_frame(response: Response) -> FrameResponse {
    FrameResponse::new(typefetch_core::VERSION, response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use typefetch_core::pkg::MockFetcher;
    use typefetch_core::{MemoryStore, TypeLibs};

    fn state() -> DaemonState {
        let fetcher = MockFetcher::new()
            .with_package("left-pad", &[("latest", "1.3.0")])
            .with_files(
                "left-pad",
                "1.3.0",
                &[("/index.d.ts", "export = leftPad;"), ("/package.json", "{}")],
            );
        DaemonState::new(TypeLibs::new(Arc::new(fetcher), Arc::new(MemoryStore::new())))
    }

    fn req(kind: fn(String, String) -> Request, name: &str, version: &str) -> Request {
        kind(name.to_string(), version.to_string())
    }

    fn fetch(module_name: String, version: String) -> Request {
        Request::FetchLibs { module_name, version }
    }

    fn exists(module_name: String, version: String) -> Request {
        Request::IsAlreadyExist { module_name, version }
    }

    fn cached(module_name: String, version: String) -> Request {
        Request::GetCachedModule { module_name, version }
    }

    fn remove(module_name: String, version: String) -> Request {
        Request::RemoveLibs { module_name, version }
    }

    fn paths(module_name: String, version: String) -> Request {
        Request::GetModuleDependenciesPath { module_name, version }
    }

    #[test]
    fn test_handle_ping() {
        let (resp, shutdown) =
            handle_request(&Request::Ping { nonce: 42 }, PROTO_SCHEMA_VERSION, &state());
        assert!(!shutdown);
        match resp {
            Response::Pong { nonce, .. } => assert_eq!(nonce, 42),
            _ => panic!("Expected Pong"),
        }
    }

    #[test]
    fn test_handle_shutdown() {
        let (resp, shutdown) = handle_request(&Request::Shutdown, PROTO_SCHEMA_VERSION, &state());
        assert!(shutdown);
        assert_eq!(resp, Response::ShutdownAck);
    }

    #[tokio::test]
    async fn test_proto_version_mismatch() {
        let state = state();
        for request in [Request::Ping { nonce: 1 }, req(fetch, "left-pad", "latest")] {
            let (resp, shutdown) = handle_request_async(&request, 999, &state).await;
            assert!(!shutdown);
            match resp {
                Response::Error { code, .. } => assert_eq!(code, codes::PROTO_VERSION_MISMATCH),
                other => panic!("Expected Error, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_fetch_then_query() {
        let state = state();
        let (resp, _) =
            handle_request_async(&req(fetch, "left-pad", "latest"), PROTO_SCHEMA_VERSION, &state).await;
        let Response::Libs { module_name, version, vfs } = resp else {
            panic!("Expected Libs, got {resp:?}");
        };
        assert_eq!(module_name, "left-pad");
        assert_eq!(version, "1.3.0");
        assert!(vfs.contains_key("/node_modules/left-pad/index.d.ts"));

        let (resp, _) = handle_request(&req(exists, "left-pad", "1.3.0"), PROTO_SCHEMA_VERSION, &state);
        assert_eq!(resp, Response::AlreadyExist { exists: true });

        let (resp, _) = handle_request(&req(paths, "left-pad", "1.3.0"), PROTO_SCHEMA_VERSION, &state);
        assert_eq!(
            resp,
            Response::DependencyPaths {
                paths: vec![
                    "/node_modules/left-pad/index.d.ts".to_string(),
                    "/node_modules/left-pad/package.json".to_string(),
                ]
            }
        );

        let (resp, _) = handle_request(&req(remove, "left-pad", "1.3.0"), PROTO_SCHEMA_VERSION, &state);
        assert!(matches!(resp, Response::RemovedLibs { ref paths } if paths.len() == 2));

        let (resp, _) = handle_request(&req(cached, "left-pad", "1.3.0"), PROTO_SCHEMA_VERSION, &state);
        match resp {
            Response::CachedModule { not_cached, vfs, .. } => {
                assert!(not_cached);
                assert!(vfs.is_empty());
            }
            other => panic!("Expected CachedModule, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_errors_carry_codes() {
        let state = state();
        let cases = [
            (".hidden", "latest", libs_codes::LIBS_INVALID_MODULE_NAME),
            ("pkg with space", "latest", libs_codes::LIBS_INVALID_MODULE_NAME),
            ("left-pad", "not-a-version", libs_codes::LIBS_INVALID_VERSION),
            ("left-pad", "9.9.9", libs_codes::LIBS_TREE_FETCH_FAILED),
            ("unknown-pkg", "latest", libs_codes::LIBS_TREE_FETCH_FAILED),
        ];
        for (name, version, expected) in cases {
            let (resp, _) =
                handle_request_async(&req(fetch, name, version), PROTO_SCHEMA_VERSION, &state).await;
            match resp {
                Response::Error { code, .. } => assert_eq!(code, expected, "{name}@{version}"),
                other => panic!("Expected Error for {name}@{version}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_cache_failure_uses_resolver_code() {
        let resp = store_error(StoreError::Io(std::io::Error::other("disk gone")));
        let expected = ResolveError::Store(StoreError::Io(std::io::Error::other("disk gone"))).code();
        assert!(matches!(resp, Response::Error { ref code, .. } if code == expected));
    }

    #[test]
    fn test_sync_handler_refuses_fetch() {
        let (resp, _) = handle_request(&req(fetch, "left-pad", "latest"), PROTO_SCHEMA_VERSION, &state());
        assert!(matches!(resp, Response::Error { ref code, .. } if code == codes::INTERNAL_ERROR));
        assert!(is_async_request(&req(fetch, "left-pad", "latest")));
        assert!(!is_async_request(&Request::Shutdown));
    }
}
