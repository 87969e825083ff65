//! Named pipe transport.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::windows::named_pipe::{
    ClientOptions, NamedPipeClient, NamedPipeServer, ServerOptions,
};
use tokio::sync::Mutex;
use typefetch_core::paths::normalize_pipe_endpoint;

const MAX_INSTANCES: usize = 64;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const BUSY_RETRY_DELAY: Duration = Duration::from_millis(50);
const ERROR_PIPE_BUSY: i32 = 231;

/// Named pipe listener; always keeps one server instance waiting.
#[derive(Debug)]
pub struct IpcListener {
    endpoint: String,
    pending: Mutex<Option<NamedPipeServer>>,
}

impl IpcListener {
    /// Create the first pipe instance for `endpoint`.
    ///
    /// # Errors
    /// Returns an error if the pipe cannot be created.
    pub fn bind(endpoint: &str) -> io::Result<Self> {
        let endpoint = normalize_pipe_endpoint(endpoint);
        let server = ServerOptions::new()
            .first_pipe_instance(true)
            .max_instances(MAX_INSTANCES)
            .create(&endpoint)?;
        Ok(Self {
            endpoint,
            pending: Mutex::new(Some(server)),
        })
    }

    /// Wait for a client, then queue a fresh instance for the next one.
    ///
    /// # Errors
    /// Returns an error if connecting or creating the next instance fails.
    pub async fn accept(&self) -> io::Result<IpcStream> {
        let mut pending = self.pending.lock().await;
        let server = match pending.take() {
            Some(server) => server,
            None => ServerOptions::new()
                .max_instances(MAX_INSTANCES)
                .create(&self.endpoint)?,
        };
        server.connect().await?;
        *pending = Some(
            ServerOptions::new()
                .max_instances(MAX_INSTANCES)
                .create(&self.endpoint)?,
        );
        Ok(IpcStream::Server(server))
    }
}

/// Either end of a named pipe connection.
#[derive(Debug)]
pub enum IpcStream {
    Server(NamedPipeServer),
    Client(NamedPipeClient),
}

impl IpcStream {
    /// Connect to a daemon, retrying while every pipe instance is busy.
    ///
    /// # Errors
    /// Returns an error if the pipe does not exist or the connect times out.
    pub async fn connect(endpoint: &str) -> io::Result<Self> {
        let endpoint = normalize_pipe_endpoint(endpoint);
        let attempt = async {
            loop {
                match ClientOptions::new().open(&endpoint) {
                    Ok(client) => return Ok(Self::Client(client)),
                    Err(e) if e.raw_os_error() == Some(ERROR_PIPE_BUSY) => {
                        tokio::time::sleep(BUSY_RETRY_DELAY).await;
                    }
                    Err(e) => return Err(e),
                }
            }
        };
        tokio::time::timeout(CONNECT_TIMEOUT, attempt)
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "timed out connecting to daemon"))?
    }
}

impl AsyncRead for IpcStream {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Server(s) => Pin::new(s).poll_read(cx, buf),
            Self::Client(c) => Pin::new(c).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for IpcStream {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Self::Server(s) => Pin::new(s).poll_write(cx, buf),
            Self::Client(c) => Pin::new(c).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Server(s) => Pin::new(s).poll_flush(cx),
            Self::Client(c) => Pin::new(c).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Self::Server(s) => Pin::new(s).poll_shutdown(cx),
            Self::Client(c) => Pin::new(c).poll_shutdown(cx),
        }
    }
}
