// Normalized API error shared by the HTTP client and the stores

use serde::Deserialize;
use thiserror::Error;

/// Error codes synthesized on the client side
pub mod codes {
    pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
    pub const INVALID_RESPONSE_TYPE: &str = "INVALID_RESPONSE_TYPE";
    pub const JSON_PARSE_ERROR: &str = "JSON_PARSE_ERROR";
    pub const UNKNOWN_ERROR: &str = "UNKNOWN_ERROR";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const CANCELLED: &str = "CANCELLED";
}

/// Where an error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transport failure, no response received
    Network,
    /// Success status with a non-JSON body
    InvalidResponseType,
    /// Body claimed to be JSON but did not parse
    JsonParse,
    /// Non-2xx response from the backend
    Api,
    /// Input rejected before any request was made
    Validation,
    /// The caller's cancel token fired first
    Cancelled,
    Unknown,
}

/// Every failure surfaced by the client has this shape
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ApiError {
    pub message: String,
    /// HTTP status, or 0 when no response was received
    pub status_code: u16,
    pub code: String,
    pub details: Option<serde_json::Value>,
}

/// Backend error envelope: `{ok: false, error: {code, message, details?}}`
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(message: impl Into<String>, status_code: u16, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status_code,
            code: code.into(),
            details: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(message, 0, codes::NETWORK_ERROR)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(message, 0, codes::VALIDATION_ERROR)
    }

    pub fn cancelled() -> Self {
        Self::new("Request cancelled", 0, codes::CANCELLED)
    }

    pub fn unknown() -> Self {
        Self::new("An unknown error occurred", 0, codes::UNKNOWN_ERROR)
    }

    /// Build from a parsed backend envelope
    pub(crate) fn from_envelope(status_code: u16, envelope: ErrorEnvelope) -> Self {
        Self {
            message: envelope.error.message,
            status_code,
            code: envelope.error.code,
            details: envelope.error.details,
        }
    }

    /// Fallback for error responses without an envelope
    pub(crate) fn from_status(status: reqwest::StatusCode) -> Self {
        let message = status.canonical_reason().unwrap_or("An error occurred");
        Self::new(message, status.as_u16(), status.as_u16().to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self.code.as_str() {
            codes::NETWORK_ERROR => ErrorKind::Network,
            codes::INVALID_RESPONSE_TYPE => ErrorKind::InvalidResponseType,
            codes::JSON_PARSE_ERROR => ErrorKind::JsonParse,
            codes::VALIDATION_ERROR => ErrorKind::Validation,
            codes::CANCELLED => ErrorKind::Cancelled,
            codes::UNKNOWN_ERROR => ErrorKind::Unknown,
            _ => ErrorKind::Api,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind() == ErrorKind::Cancelled
    }
}
