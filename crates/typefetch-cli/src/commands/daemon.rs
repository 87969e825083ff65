use miette::{IntoDiagnostic, Result};
use std::io::Write;
use std::sync::Arc;
use typefetch_core::{paths, Config};
use typefetch_daemon::{run_server, DaemonConfig, DaemonState};

/// Start the daemon in the foreground.
pub fn run(config: &Config) -> Result<()> {
    paths::ensure_ipc_dir(config.channel).into_diagnostic()?;

    let state = Arc::new(DaemonState::from_config(config).into_diagnostic()?);
    let daemon_config = DaemonConfig {
        endpoint: paths::ipc_endpoint(config.channel),
    };

    eprintln!(
        "daemon listening at {} (cache: {})",
        daemon_config.endpoint,
        config.store_dir().display()
    );
    std::io::stderr().flush().into_diagnostic()?;

    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    runtime.block_on(async { run_server(daemon_config, state).await.into_diagnostic() })
}
