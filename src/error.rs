//! Error types for the MCP dispatcher.
//!
//! Every internal step returns [`Result`]; conversion to a JSON-RPC error
//! object happens once, at the dispatcher boundary, via [`Error::to_jsonrpc`].

use thiserror::Error;

use crate::mcp::protocol::{error_codes, JsonRpcError};

/// Result type alias for dispatcher operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the dispatcher.
#[derive(Error, Debug)]
pub enum Error {
    // ===== Protocol Errors =====
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // ===== Routing Errors =====
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    // ===== Registration Errors =====
    #[error("Duplicate registration: {0}")]
    DuplicateName(String),

    // ===== Execution Errors =====
    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("Timeout: operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    // ===== I/O Errors =====
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // ===== Internal Errors =====
    #[error("HTTP server error: {0}")]
    HttpServer(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// JSON-RPC error code for this error.
    pub fn code(&self) -> i32 {
        match self {
            Self::Parse(_) => error_codes::PARSE_ERROR,
            Self::InvalidRequest(_) => error_codes::INVALID_REQUEST,
            Self::MethodNotFound(_) => error_codes::METHOD_NOT_FOUND,
            Self::MissingParameter(_)
            | Self::InvalidParams(_)
            | Self::ToolNotFound(_)
            | Self::ResourceNotFound(_)
            | Self::FileNotFound(_) => error_codes::INVALID_PARAMS,
            _ => error_codes::INTERNAL_ERROR,
        }
    }

    /// Whether this is a routing error the caller can fix (unknown method,
    /// tool, resource or bad params), as opposed to a server-side failure.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.code(),
            error_codes::INVALID_REQUEST | error_codes::METHOD_NOT_FOUND | error_codes::INVALID_PARAMS
        )
    }

    /// Convert into the wire error object.
    pub fn to_jsonrpc(&self) -> JsonRpcError {
        JsonRpcError {
            code: self.code(),
            message: self.to_string(),
            data: None,
        }
    }
}
