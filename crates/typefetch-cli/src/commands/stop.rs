use crate::client;
use miette::{IntoDiagnostic, Result};
use typefetch_core::config::Channel;
use typefetch_core::paths;
use typefetch_proto::{Request, Response};

/// Stop the running daemon by sending a Shutdown request.
pub fn run(channel: Channel, json: bool) -> Result<()> {
    let endpoint = paths::ipc_endpoint(channel);

    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    let result = runtime.block_on(client::send(&endpoint, Request::Shutdown));

    let (ok, error) = match result {
        Ok(frame) if frame.response == Response::ShutdownAck => (true, None),
        Ok(_) => (false, Some("unexpected response from daemon".to_string())),
        Err(e) => (false, Some(format!("daemon not running ({e})"))),
    };

    if json {
        let value = serde_json::json!({ "ok": ok, "error": error });
        println!("{}", serde_json::to_string_pretty(&value).into_diagnostic()?);
    } else if let Some(error) = &error {
        eprintln!("error: {error}");
    } else {
        eprintln!("daemon stopped");
    }

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
