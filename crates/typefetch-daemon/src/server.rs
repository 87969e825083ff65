//! Daemon server implementation.

use crate::ipc::{cleanup_socket, IpcListener, IpcStream};
use crate::state::DaemonState;
use crate::{handle_request, handle_request_async, is_async_request, make_response_frame};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, error, info, warn};
use typefetch_proto::{codes, decode_frame, encode_frame, frame_len, Frame, Response};

/// Daemon configuration.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// IPC endpoint (socket path on Unix, pipe name on Windows).
    pub endpoint: String,
}

/// Run the daemon server until a shutdown request arrives.
///
/// # Errors
/// Returns an error if the endpoint cannot be bound.
pub async fn run_server(config: DaemonConfig, state: Arc<DaemonState>) -> io::Result<()> {
    cleanup_socket(&config.endpoint)?;

    let listener = IpcListener::bind(&config.endpoint)?;
    info!(endpoint = %config.endpoint, "daemon listening");

    let shutdown = Arc::new(AtomicBool::new(false));

    loop {
        if shutdown.load(Ordering::Relaxed) {
            info!("shutdown requested, exiting");
            break;
        }

        // Bounded wait so the shutdown flag is observed
        match tokio::time::timeout(Duration::from_secs(1), listener.accept()).await {
            Ok(Ok(stream)) => {
                debug!("accepted connection");
                let shutdown_flag = shutdown.clone();
                let daemon_state = state.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, shutdown_flag, daemon_state).await {
                        warn!(error = %e, "connection handler error");
                    }
                });
            }
            Ok(Err(e)) => error!(error = %e, "accept failed"),
            Err(_) => {}
        }
    }

    let _ = cleanup_socket(&config.endpoint);
    Ok(())
}

async fn respond(stream: &mut IpcStream, response: Response) -> io::Result<()> {
    let encoded = encode_frame(&make_response_frame(response))?;
    stream.write_all(&encoded).await?;
    stream.flush().await
}

/// Handle a single request/response exchange.
async fn handle_connection(
    mut stream: IpcStream,
    shutdown: Arc<AtomicBool>,
    state: Arc<DaemonState>,
) -> io::Result<()> {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await?;
    let len = match frame_len(len_buf) {
        Ok(len) => len,
        Err(e) => {
            warn!(error = %e, "rejecting frame");
            return respond(&mut stream, Response::error(codes::INVALID_REQUEST, e.to_string())).await;
        }
    };

    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf).await?;

    let frame: Frame = match decode_frame(&buf) {
        Ok(f) => f,
        Err(e) => {
            warn!(error = %e, "invalid frame");
            return respond(
                &mut stream,
                Response::error(codes::INVALID_REQUEST, format!("invalid frame: {e}")),
            )
            .await;
        }
    };

    debug!(
        client_version = %frame.hello.client_version,
        proto_version = frame.hello.proto_schema_version,
        request = frame.request.kind(),
        "handling request"
    );

    let proto_version = frame.hello.proto_schema_version;
    let (response, should_shutdown) = if is_async_request(&frame.request) {
        handle_request_async(&frame.request, proto_version, &state).await
    } else {
        handle_request(&frame.request, proto_version, &state)
    };

    respond(&mut stream, response).await?;

    if should_shutdown {
        shutdown.store(true, Ordering::Relaxed);
    }

    Ok(())
}
