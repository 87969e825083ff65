#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Protocol types for typefetch IPC/RPC communication.
//!
//! This crate defines the request/response types used between the CLI (or
//! an editor integration) and the daemon.
//!
//! ## Wire format
//! Messages use length-prefixed JSON:
//! - 4-byte little-endian u32 length prefix
//! - JSON payload bytes

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io;

/// Protocol schema version. Bump when changing message format.
pub const PROTO_SCHEMA_VERSION: u32 = 1;

/// Transport-level error codes carried by [`Response::Error`].
///
/// Declaration library failures carry `LIBS_*` codes owned by
/// `typefetch_core::pkg::codes`.
pub mod codes {
    pub const PROTO_VERSION_MISMATCH: &str = "PROTO_VERSION_MISMATCH";
    pub const INVALID_REQUEST: &str = "INVALID_REQUEST";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Virtual path -> declaration file content.
pub type Vfs = BTreeMap<String, String>;

/// Client hello message sent at connection start.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientHello {
    pub proto_schema_version: u32,
    pub client_version: String,
}

impl ClientHello {
    #[must_use]
    pub fn new(client_version: impl Into<String>) -> Self {
        Self {
            proto_schema_version: PROTO_SCHEMA_VERSION,
            client_version: client_version.into(),
        }
    }
}

/// Server hello message sent in response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerHello {
    pub proto_schema_version: u32,
    pub server_version: String,
}

impl ServerHello {
    #[must_use]
    pub fn new(server_version: impl Into<String>) -> Self {
        Self {
            proto_schema_version: PROTO_SCHEMA_VERSION,
            server_version: server_version.into(),
        }
    }
}

/// A request from client to daemon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Ping the daemon to check if it's alive.
    Ping {
        /// Nonce for request/response matching.
        nonce: u64,
    },

    /// Request daemon shutdown.
    Shutdown,

    /// Is `module_name@version` cached under exactly that key?
    IsAlreadyExist { module_name: String, version: String },

    /// Resolve, download and cache a module's declaration files.
    FetchLibs { module_name: String, version: String },

    /// Read a cached declaration set without resolving.
    GetCachedModule { module_name: String, version: String },

    /// Drop a cached declaration set.
    RemoveLibs { module_name: String, version: String },

    /// List the virtual paths of a cached declaration set.
    GetModuleDependenciesPath { module_name: String, version: String },
}

impl Request {
    /// Operation name, for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Ping { .. } => "ping",
            Self::Shutdown => "shutdown",
            Self::IsAlreadyExist { .. } => "is_already_exist",
            Self::FetchLibs { .. } => "fetch_libs",
            Self::GetCachedModule { .. } => "get_cached_module",
            Self::RemoveLibs { .. } => "remove_libs",
            Self::GetModuleDependenciesPath { .. } => "get_module_dependencies_path",
        }
    }
}

/// A response from daemon to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Response to ping.
    Pong {
        nonce: u64,
        /// Server time (milliseconds since Unix epoch).
        server_time_unix_ms: Option<u64>,
    },

    /// Acknowledgment of shutdown request.
    ShutdownAck,

    /// Error response.
    Error { code: String, message: String },

    AlreadyExist { exists: bool },

    /// Declaration files of a freshly resolved module.
    Libs {
        module_name: String,
        /// Concrete version the request resolved to.
        version: String,
        vfs: Vfs,
    },

    CachedModule {
        module_name: String,
        version: String,
        vfs: Vfs,
        /// True when nothing is cached for the key; `vfs` is then empty.
        not_cached: bool,
    },

    /// Paths that were cached before removal.
    RemovedLibs { paths: Vec<String> },

    DependencyPaths { paths: Vec<String> },
}

impl Response {
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn pong(nonce: u64) -> Self {
        // Milliseconds since epoch fit in u64
        let server_time_unix_ms = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .ok()
            .map(|d| d.as_millis() as u64);

        Self::Pong {
            nonce,
            server_time_unix_ms,
        }
    }

    #[must_use]
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Client request frame (hello + request).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub hello: ClientHello,
    pub request: Request,
}

impl Frame {
    #[must_use]
    pub fn new(client_version: impl Into<String>, request: Request) -> Self {
        Self {
            hello: ClientHello::new(client_version),
            request,
        }
    }
}

/// Server response frame (hello + response).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameResponse {
    pub hello: ServerHello,
    pub response: Response,
}

impl FrameResponse {
    #[must_use]
    pub fn new(server_version: impl Into<String>, response: Response) -> Self {
        Self {
            hello: ServerHello::new(server_version),
            response,
        }
    }
}

/// Maximum frame size (64 MiB); large declaration sets travel in one frame.
pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

/// Encode a frame to bytes with length prefix.
///
/// Format: 4-byte little-endian length + JSON bytes
///
/// # Errors
/// Returns an error if serialization fails or the frame is too large.
pub fn encode_frame<T: Serialize>(frame: &T) -> io::Result<Vec<u8>> {
    let json =
        serde_json::to_vec(frame).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    if json.len() > MAX_FRAME_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame too large: {} bytes", json.len()),
        ));
    }
    let len = u32::try_from(json.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "frame too large"))?;

    let mut buf = Vec::with_capacity(4 + json.len());
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(&json);

    Ok(buf)
}

/// Decode a frame from bytes (without length prefix).
///
/// # Errors
/// Returns an error if deserialization fails.
pub fn decode_frame<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> io::Result<T> {
    serde_json::from_slice(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Validate a length prefix read off the wire.
///
/// # Errors
/// Returns an error if the announced payload exceeds [`MAX_FRAME_SIZE`].
pub fn frame_len(prefix: [u8; 4]) -> io::Result<usize> {
    let len = u32::from_le_bytes(prefix) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("frame too large: {len} bytes"),
        ));
    }
    Ok(len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proto_schema_version_is_stable() {
        assert_eq!(PROTO_SCHEMA_VERSION, 1);
    }

    #[test]
    fn test_client_hello_serialization() {
        let hello = ClientHello::new("0.1.0");
        let json = serde_json::to_string(&hello).unwrap();
        assert!(json.contains("proto_schema_version"));
        assert!(json.contains("0.1.0"));
    }

    #[test]
    fn test_request_wire_names() {
        let req = Request::FetchLibs {
            module_name: "react".to_string(),
            version: "latest".to_string(),
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["type"], "fetch_libs");
        assert_eq!(value["module_name"], "react");
        assert_eq!(value["version"], "latest");

        let req = Request::GetModuleDependenciesPath {
            module_name: "react".to_string(),
            version: "18.2.0".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap()["type"],
            "get_module_dependencies_path"
        );
    }

    #[test]
    fn test_request_from_editor_json() {
        let json = r#"{"type":"is_already_exist","module_name":"@scope/name","version":"2.0.0"}"#;
        let req: Request = serde_json::from_str(json).unwrap();
        assert_eq!(
            req,
            Request::IsAlreadyExist {
                module_name: "@scope/name".to_string(),
                version: "2.0.0".to_string(),
            }
        );
        assert_eq!(req.kind(), "is_already_exist");
    }

    #[test]
    fn test_libs_response_vfs_is_object() {
        let mut vfs = Vfs::new();
        vfs.insert(
            "/node_modules/left-pad/index.d.ts".to_string(),
            "export = leftPad;".to_string(),
        );
        let resp = Response::Libs {
            module_name: "left-pad".to_string(),
            version: "1.3.0".to_string(),
            vfs,
        };
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["type"], "libs");
        assert_eq!(
            value["vfs"]["/node_modules/left-pad/index.d.ts"],
            "export = leftPad;"
        );
    }

    #[test]
    fn test_cached_module_flag() {
        let resp = Response::CachedModule {
            module_name: "x".to_string(),
            version: "1.0.0".to_string(),
            vfs: Vfs::new(),
            not_cached: true,
        };
        let value = serde_json::to_value(&resp).unwrap();
        assert_eq!(value["type"], "cached_module");
        assert_eq!(value["not_cached"], true);
    }

    #[test]
    fn test_response_pong_serialization() {
        let resp = Response::pong(12345);
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("pong"));
        assert!(json.contains("12345"));
    }

    #[test]
    fn test_frame_roundtrip() {
        let frame = Frame::new(
            "0.1.0",
            Request::RemoveLibs {
                module_name: "react".to_string(),
                version: "18.2.0".to_string(),
            },
        );

        let encoded = encode_frame(&frame).unwrap();
        let len = frame_len([encoded[0], encoded[1], encoded[2], encoded[3]]).unwrap();
        assert_eq!(len, encoded.len() - 4);

        let decoded: Frame = decode_frame(&encoded[4..]).unwrap();
        assert_eq!(decoded.hello.proto_schema_version, PROTO_SCHEMA_VERSION);
        assert_eq!(decoded.hello.client_version, "0.1.0");
        assert_eq!(decoded.request, frame.request);
    }

    #[test]
    fn test_oversized_prefix_rejected() {
        let prefix = u32::try_from(MAX_FRAME_SIZE + 1).unwrap().to_le_bytes();
        let err = frame_len(prefix).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_error_codes_are_uppercase() {
        let error_codes = [
            codes::PROTO_VERSION_MISMATCH,
            codes::INVALID_REQUEST,
            codes::INTERNAL_ERROR,
        ];

        for code in error_codes {
            assert!(
                code.chars().all(|c| c.is_uppercase() || c == '_'),
                "Error code '{code}' should be SCREAMING_SNAKE_CASE"
            );
        }
    }
}
