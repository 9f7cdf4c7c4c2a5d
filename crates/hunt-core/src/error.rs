//! Error types for the hunt bridge

use thiserror::Error;

/// Result type for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Bridge error types
///
/// Soft timeouts on an established session are not errors; they are
/// reported as data by the session layer.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Well-known port exchange with the daemon failed
    #[error("Resolution error: {0}")]
    Resolution(String),

    /// Malformed or short join handshake
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Hard I/O failure on an established session
    #[error("Session error: {0}")]
    Session(String),

    /// No session registered under this identifier
    #[error("{0}: no such player")]
    UnknownSession(String),

    /// Request parameters failed validation
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// Statistics fetch failed
    #[error("Stats error: {0}")]
    Stats(String),

    /// Keepalive publish or topic setup failed
    #[error("Keepalive error: {0}")]
    Keepalive(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// RPC transport error
    #[error("Transport error: {0}")]
    Transport(String),

    /// Invalid or missing configuration
    #[error("Config error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Serialization(err.to_string())
    }
}

impl BridgeError {
    /// RPC error code reported to callers
    pub fn code(&self) -> i32 {
        match self {
            BridgeError::UnknownSession(_) => error_codes::UNKNOWN_SESSION,
            BridgeError::Protocol(_) => error_codes::PROTOCOL_ERROR,
            BridgeError::Session(_) => error_codes::SESSION_ERROR,
            BridgeError::Stats(_) => error_codes::STATS_UNAVAILABLE,
            BridgeError::InvalidParams(_) | BridgeError::Serialization(_) => {
                error_codes::INVALID_PARAMS
            }
            _ => error_codes::INTERNAL_ERROR,
        }
    }
}

/// JSON-RPC error codes for the bridge
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;

    pub const UNKNOWN_SESSION: i32 = -32000;
    pub const PROTOCOL_ERROR: i32 = -32001;
    pub const SESSION_ERROR: i32 = -32002;
    pub const STATS_UNAVAILABLE: i32 = -32003;
}
