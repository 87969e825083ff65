use crate::config::Channel;
use crate::version::SCHEMA_VERSION;
use std::path::PathBuf;

/// Environment variable to override the declaration cache directory.
pub const CACHE_DIR_ENV: &str = "TYPEFETCH_CACHE_DIR";

/// Environment variable to override the IPC endpoint (for testing).
pub const IPC_ENDPOINT_ENV: &str = "TYPEFETCH_IPC_ENDPOINT";

/// Get the cache directory for typefetch.
///
/// Uses platform-appropriate locations with versioning:
/// - Linux: `$XDG_CACHE_HOME/typefetch/v{N}/{channel}` or `~/.cache/typefetch/v{N}/{channel}`
/// - macOS: `~/Library/Caches/typefetch/v{N}/{channel}`
/// - Windows: `%LOCALAPPDATA%\typefetch\v{N}\{channel}`
#[must_use]
pub fn cache_dir(channel: Channel) -> PathBuf {
    let base = dirs_next::cache_dir().map_or_else(
        || {
            dirs_next::home_dir().map_or_else(
                || PathBuf::from(".typefetch-cache"),
                |p| p.join(".cache").join("typefetch"),
            )
        },
        |p| p.join("typefetch"),
    );

    base.join(format!("v{SCHEMA_VERSION}"))
        .join(channel.as_str())
}

/// Directory of the persistent declaration cache (pointers + dependency sets).
#[must_use]
pub fn libs_cache_dir(channel: Channel) -> PathBuf {
    cache_dir(channel).join("typelibs")
}

/// Get the data directory for typefetch (IPC socket lives here on Unix).
///
/// - Linux: `$XDG_DATA_HOME/typefetch/v{N}/{channel}` or `~/.local/share/typefetch/v{N}/{channel}`
/// - macOS: `~/Library/Application Support/typefetch/v{N}/{channel}`
/// - Windows: `%LOCALAPPDATA%\typefetch\v{N}\{channel}`
#[must_use]
pub fn data_dir(channel: Channel) -> PathBuf {
    let base = dirs_next::data_dir().map_or_else(
        || {
            dirs_next::home_dir().map_or_else(
                || PathBuf::from(".typefetch-data"),
                |p| p.join(".local").join("share").join("typefetch"),
            )
        },
        |p| p.join("typefetch"),
    );

    base.join(format!("v{SCHEMA_VERSION}"))
        .join(channel.as_str())
}

/// Prefix for Windows named pipes.
#[cfg(windows)]
pub const PIPE_PREFIX: &str = r"\\.\pipe\";

/// Normalize a Windows named pipe endpoint.
#[must_use]
#[cfg(windows)]
pub fn normalize_pipe_endpoint(endpoint: &str) -> String {
    if endpoint.starts_with(PIPE_PREFIX) {
        endpoint.to_string()
    } else {
        format!("{}{}", PIPE_PREFIX, endpoint)
    }
}

/// Get the IPC endpoint path/name for daemon communication.
///
/// Respects `TYPEFETCH_IPC_ENDPOINT` for testing. On Windows a short name is
/// normalized to include the `\\.\pipe\` prefix.
///
/// Platform-specific defaults:
/// - Unix: `{data_dir}/ipc/typefetch.sock`
/// - Windows: `\\.\pipe\typefetch-{channel}-v{N}`
#[must_use]
pub fn ipc_endpoint(channel: Channel) -> String {
    if let Ok(endpoint) = std::env::var(IPC_ENDPOINT_ENV) {
        #[cfg(windows)]
        {
            return normalize_pipe_endpoint(&endpoint);
        }
        #[cfg(not(windows))]
        {
            return endpoint;
        }
    }

    #[cfg(windows)]
    {
        format!(
            r"\\.\pipe\typefetch-{}-v{}",
            channel.as_str(),
            SCHEMA_VERSION
        )
    }

    #[cfg(not(windows))]
    {
        let dir = data_dir(channel).join("ipc");
        dir.join("typefetch.sock").to_string_lossy().into_owned()
    }
}

/// Ensure the IPC socket directory exists (Unix only).
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn ensure_ipc_dir(channel: Channel) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let dir = data_dir(channel).join("ipc");
        std::fs::create_dir_all(dir)?;
    }
    #[cfg(not(unix))]
    {
        let _ = channel;
    }
    Ok(())
}
