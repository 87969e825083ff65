//! The five declaration-library operations, through the daemon or in-process.

use crate::client;
use miette::{miette, IntoDiagnostic, Result};
use tracing::debug;
use typefetch_core::pkg::VersionRef;
use typefetch_core::{paths, Config};
use typefetch_daemon::{handle_request_async, DaemonState};
use typefetch_proto::{Request, Response, PROTO_SCHEMA_VERSION};

/// Operation requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibsOp {
    Fetch { refresh: bool },
    Exists,
    Cached,
    Paths,
    Remove,
}

impl LibsOp {
    fn request(self, module_name: &str, version: &str) -> Request {
        let module_name = module_name.to_string();
        let version = version.to_string();
        match self {
            Self::Fetch { .. } => Request::FetchLibs { module_name, version },
            Self::Exists => Request::IsAlreadyExist { module_name, version },
            Self::Cached => Request::GetCachedModule { module_name, version },
            Self::Paths => Request::GetModuleDependenciesPath { module_name, version },
            Self::Remove => Request::RemoveLibs { module_name, version },
        }
    }
}

/// Where requests are served.
enum Backend {
    Local(DaemonState),
    Daemon(String),
}

impl Backend {
    fn new(config: &Config, local: bool) -> Result<Self> {
        if local {
            Ok(Self::Local(DaemonState::from_config(config).into_diagnostic()?))
        } else {
            Ok(Self::Daemon(paths::ipc_endpoint(config.channel)))
        }
    }

    async fn call(&self, request: Request) -> Result<Response> {
        match self {
            Self::Local(state) => Ok(handle_request_async(&request, PROTO_SCHEMA_VERSION, state).await.0),
            Self::Daemon(endpoint) => client::send(endpoint, request)
                .await
                .map(|frame| frame.response)
                .map_err(|e| {
                    miette!("daemon not running ({e}); start it with `typefetch daemon` or pass --local")
                }),
        }
    }
}

/// Run one libs operation and print its result.
pub fn run(config: &Config, op: LibsOp, name: &str, version: &str, local: bool, json: bool) -> Result<()> {
    let backend = Backend::new(config, local)?;
    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    let response = runtime.block_on(execute(&backend, op, name, version))?;

    let failed = matches!(response, Response::Error { .. });
    if json {
        println!("{}", serde_json::to_string_pretty(&response).into_diagnostic()?);
    } else {
        print_human(&response, name, version);
    }

    if failed {
        std::process::exit(1);
    }
    Ok(())
}

async fn execute(backend: &Backend, op: LibsOp, name: &str, version: &str) -> Result<Response> {
    // Exact versions never change once cached
    if op == (LibsOp::Fetch { refresh: false }) && matches!(VersionRef::classify(version), Some(VersionRef::Exact(_))) {
        if let Response::CachedModule {
            module_name,
            version,
            vfs,
            not_cached: false,
        } = backend.call(LibsOp::Cached.request(name, version)).await?
        {
            debug!(module = %module_name, version = %version, "served from cache");
            return Ok(Response::Libs {
                module_name,
                version,
                vfs,
            });
        }
    }

    backend.call(op.request(name, version)).await
}

fn print_human(response: &Response, name: &str, version: &str) {
    match response {
        Response::Libs {
            module_name,
            version,
            vfs,
        } => {
            println!("{module_name}@{version}: {} files", vfs.len());
            for path in vfs.keys() {
                println!("  {path}");
            }
        }
        Response::AlreadyExist { exists } => {
            let state = if *exists { "cached" } else { "not cached" };
            println!("{name}@{version} is {state}");
        }
        Response::CachedModule {
            module_name,
            version,
            not_cached: true,
            ..
        } => println!("{module_name}@{version} is not cached"),
        Response::CachedModule {
            module_name,
            version,
            vfs,
            ..
        } => {
            println!("{module_name}@{version}: {} cached files", vfs.len());
            for path in vfs.keys() {
                println!("  {path}");
            }
        }
        Response::DependencyPaths { paths } => {
            for path in paths {
                println!("{path}");
            }
        }
        Response::RemovedLibs { paths } if paths.is_empty() => {
            println!("{name}@{version} was not cached");
        }
        Response::RemovedLibs { paths } => {
            println!("removed {} files", paths.len());
            for path in paths {
                println!("  {path}");
            }
        }
        Response::Error { code, message } => eprintln!("error: {code}: {message}"),
        other => eprintln!("error: unexpected response: {other:?}"),
    }
}
