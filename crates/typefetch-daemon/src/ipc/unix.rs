use std::io;
use std::path::Path;
use tokio::net::UnixListener;

/// Client or accepted connection.
pub type IpcStream = tokio::net::UnixStream;

/// Unix domain socket listener.
#[derive(Debug)]
pub struct IpcListener {
    inner: UnixListener,
}

impl IpcListener {
    /// Bind to `path`, creating its parent directory.
    ///
    /// # Errors
    /// Returns an error if binding fails.
    pub fn bind(path: &str) -> io::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self {
            inner: UnixListener::bind(path)?,
        })
    }

    /// Accept a new connection.
    ///
    /// # Errors
    /// Returns an error if accepting fails.
    pub async fn accept(&self) -> io::Result<IpcStream> {
        let (stream, _addr) = self.inner.accept().await?;
        Ok(stream)
    }
}
