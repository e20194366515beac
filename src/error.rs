//! Error types for the bridge.

use thiserror::Error;

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Bridge errors.
#[derive(Error, Debug)]
pub enum Error {
    /// JSON-RPC protocol error.
    #[error("JSON-RPC error: {code} - {message}")]
    JsonRpc {
        /// Error code.
        code: i32,
        /// Error message.
        message: String,
    },

    /// Tool not found in the catalog.
    #[error("Unknown tool: {0}")]
    ToolNotFound(String),

    /// Invalid or missing parameters.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// Browser could not be launched or the page could not be created.
    #[error("browser session unavailable: {0}")]
    SessionUnavailable(String),

    /// No element matched the given selector.
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// Browser engine (CDP) error.
    #[error("browser error: {0}")]
    Browser(String),

    /// Timed out waiting for a page condition.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<chromiumoxide::error::CdpError> for Error {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Error::Browser(err.to_string())
    }
}

impl Error {
    /// Get the JSON-RPC error code for this error.
    pub fn code(&self) -> i32 {
        match self {
            Error::JsonRpc { code, .. } => *code,
            Error::ToolNotFound(_) => codes::METHOD_NOT_FOUND,
            Error::InvalidParams(_) => codes::INVALID_PARAMS,
            Error::Serialization(_) => codes::PARSE_ERROR,
            Error::SessionUnavailable(_)
            | Error::ElementNotFound(_)
            | Error::Browser(_)
            | Error::Timeout(_) => -32000,
            Error::Io(_) => -32002,
            Error::Config(_) | Error::Internal(_) => codes::INTERNAL_ERROR,
        }
    }
}

/// Standard JSON-RPC error codes.
pub mod codes {
    /// Parse error.
    pub const PARSE_ERROR: i32 = -32700;
    /// Invalid request.
    pub const INVALID_REQUEST: i32 = -32600;
    /// Method not found.
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid params.
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal error.
    pub const INTERNAL_ERROR: i32 = -32603;
}
