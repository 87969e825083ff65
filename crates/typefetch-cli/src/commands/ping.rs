use crate::client;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use typefetch_core::config::Channel;
use typefetch_core::paths;
use typefetch_proto::{Request, Response};

/// Ping response for JSON output.
#[derive(Serialize)]
struct PingResult {
    ok: bool,
    nonce: u64,
    server_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    server_time_unix_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl PingResult {
    fn failed(nonce: u64, server_version: String, error: String) -> Self {
        Self {
            ok: false,
            nonce,
            server_version,
            server_time_unix_ms: None,
            error: Some(error),
        }
    }
}

/// Connect to the daemon and send a ping request.
#[allow(clippy::cast_possible_truncation)]
pub fn run(channel: Channel, json: bool) -> Result<()> {
    let endpoint = paths::ipc_endpoint(channel);

    // Truncation is fine for a nonce
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);

    let runtime = tokio::runtime::Runtime::new().into_diagnostic()?;
    let result = match runtime.block_on(client::send(&endpoint, Request::Ping { nonce })) {
        Ok(frame) => match frame.response {
            Response::Pong {
                nonce: got,
                server_time_unix_ms,
            } if got == nonce => PingResult {
                ok: true,
                nonce,
                server_version: frame.hello.server_version,
                server_time_unix_ms,
                error: None,
            },
            Response::Pong { nonce: got, .. } => PingResult::failed(
                got,
                frame.hello.server_version,
                format!("Nonce mismatch: expected {nonce}, got {got}"),
            ),
            Response::Error { code, message } => {
                PingResult::failed(nonce, frame.hello.server_version, format!("{code}: {message}"))
            }
            _ => PingResult::failed(
                nonce,
                frame.hello.server_version,
                "Unexpected response type".to_string(),
            ),
        },
        Err(e) => PingResult::failed(nonce, String::new(), format!("Failed to connect: {e}")),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result).into_diagnostic()?);
    } else if result.ok {
        println!("pong");
    } else if result.server_version.is_empty() {
        eprintln!("error: daemon not running");
        eprintln!("hint: start with `typefetch daemon`");
    } else if let Some(error) = &result.error {
        eprintln!("error: {error}");
    }

    if !result.ok {
        std::process::exit(1);
    }
    Ok(())
}
