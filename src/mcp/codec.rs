//! Wire encoding shared by every transport.
//!
//! All adapters decode and encode through this module so that the same
//! logical exchange yields the same response body on stdio, HTTP and
//! WebSocket. Only framing differs.

use serde_json::Value;
use thiserror::Error;

use crate::error::Result;
use crate::mcp::protocol::{error_codes, JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId};

/// Why an inbound frame could not be turned into a request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// Not valid JSON.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Valid JSON, but not a request object.
    #[error("Invalid request: {message}")]
    Invalid {
        id: Option<RequestId>,
        message: String,
    },
}

impl DecodeError {
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_))
    }

    pub fn code(&self) -> i32 {
        match self {
            Self::Parse(_) => error_codes::PARSE_ERROR,
            Self::Invalid { .. } => error_codes::INVALID_REQUEST,
        }
    }

    /// Error response for the frame. The id is `null` unless one could be
    /// read from an otherwise invalid request.
    pub fn into_response(self) -> JsonRpcResponse {
        let code = self.code();
        let message = self.to_string();
        let id = match self {
            Self::Parse(_) => None,
            Self::Invalid { id, .. } => id,
        };
        JsonRpcResponse::failure(id, JsonRpcError::new(code, message))
    }
}

/// Decode one wire message into a request.
pub fn decode_request(text: &str) -> std::result::Result<JsonRpcRequest, DecodeError> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| DecodeError::Parse(e.to_string()))?;

    let id = match &value {
        Value::Object(map) => map
            .get("id")
            .and_then(|id| serde_json::from_value::<RequestId>(id.clone()).ok()),
        Value::Array(_) => {
            return Err(DecodeError::Invalid {
                id: None,
                message: "batch requests are not supported".to_string(),
            })
        }
        _ => {
            return Err(DecodeError::Invalid {
                id: None,
                message: "expected a JSON object".to_string(),
            })
        }
    };

    let mut request: JsonRpcRequest = serde_json::from_value(value)
        .map_err(|e| DecodeError::Invalid {
            id: id.clone(),
            message: e.to_string(),
        })?;

    match &request.params {
        Some(Value::Null) => request.params = None,
        Some(Value::Object(_)) | Some(Value::Array(_)) | None => {}
        Some(_) => {
            return Err(DecodeError::Invalid {
                id,
                message: "params must be an object or array".to_string(),
            })
        }
    }

    Ok(request)
}

/// Decode a raw frame. Bytes that are not UTF-8 are a parse error.
pub fn decode_request_bytes(raw: &[u8]) -> std::result::Result<JsonRpcRequest, DecodeError> {
    let text = std::str::from_utf8(raw).map_err(|e| DecodeError::Parse(e.to_string()))?;
    decode_request(text)
}

/// Adapter-level response shaping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseOptions {
    /// Coerce numeric ids to strings, for clients that reject numbers.
    pub stringify_ids: bool,
}

impl ResponseOptions {
    pub fn apply(&self, mut response: JsonRpcResponse) -> JsonRpcResponse {
        if self.stringify_ids {
            if let Some(RequestId::Number(n)) = &response.id {
                response.id = Some(RequestId::String(n.to_string()));
            }
        }
        response
    }
}

/// Encode a response as a single JSON document (no trailing newline).
pub fn encode_response(response: &JsonRpcResponse, options: ResponseOptions) -> Result<String> {
    let response = options.apply(response.clone());
    Ok(serde_json::to_string(&response)?)
}

/// Decode a response previously produced by [`encode_response`].
pub fn decode_response(text: &str) -> Result<JsonRpcResponse> {
    Ok(serde_json::from_str(text)?)
}
