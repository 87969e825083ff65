//! IPC transport for daemon communication.
//!
//! - Unix: Unix domain sockets via tokio
//! - Windows: named pipes via tokio

#[cfg(unix)]
mod unix;

#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use unix::{IpcListener, IpcStream};

#[cfg(windows)]
pub use windows::{IpcListener, IpcStream};

use std::io;

/// Remove a stale socket file left by a previous daemon (Unix only).
///
/// # Errors
/// Returns an error if the file exists but cannot be removed.
pub fn cleanup_socket(endpoint: &str) -> io::Result<()> {
    #[cfg(unix)]
    {
        typefetch_util::fs::remove_if_exists(std::path::Path::new(endpoint))?;
    }

    #[cfg(windows)]
    {
        let _ = endpoint;
    }

    Ok(())
}
