//! # Error Types
//!
//! This module defines the error type used throughout the nelko library.
//!
//! Errors fall into three groups:
//!
//! - **Caller input** (`UnsupportedQuery`, `InvalidOpcode`, `InvalidGeometry`,
//!   `CopiesOutOfRange`, `UnsupportedCommand`, `InvalidLabel`, `InvalidState`):
//!   detected before any I/O, never retried
//! - **Response** (`MalformedResponse`, `IncompleteResponse`, `Timeout`,
//!   `Cancelled`): the session stays usable
//! - **Transport** (`Transport`, `Io`): fatal for the connection

use std::time::Duration;

use thiserror::Error;

use crate::session::SessionState;

/// Main error type for nelko operations
#[derive(Debug, Error)]
pub enum NelkoError {
    /// Query token the device does not answer
    #[error("Unsupported query: {0:?}")]
    UnsupportedQuery(String),

    /// Escape opcode outside the supported set (`!o`, `!?`)
    #[error("Invalid escape opcode: 0x{0:02X}")]
    InvalidOpcode(u8),

    /// Bitmap data length does not match its declared dimensions
    #[error("Invalid bitmap geometry: expected {expected} bytes, got {actual}")]
    InvalidGeometry { expected: usize, actual: usize },

    /// Print jobs need at least one copy
    #[error("Copies out of range: {0}")]
    CopiesOutOfRange(u32),

    /// Statement outside the device's TSPL2 subset
    #[error("Unsupported command: {0}")]
    UnsupportedCommand(String),

    /// Label geometry or density out of range
    #[error("Invalid label: {0}")]
    InvalidLabel(String),

    /// Operation called in the wrong session state
    #[error("Invalid session state: expected {expected:?}, was {actual:?}")]
    InvalidState {
        expected: SessionState,
        actual: SessionState,
    },

    /// Response bytes that match no known reply shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// More bytes are needed before the response can be decoded
    #[error("Incomplete response: {received} of {expected} bytes")]
    IncompleteResponse { received: usize, expected: usize },

    /// No complete response within the configured timeout
    #[error("Timed out after {0:?} waiting for response")]
    Timeout(Duration),

    /// The wait for a response was aborted through a `CancelHandle`
    #[error("Request cancelled")]
    Cancelled,

    /// Transport-level errors (connection, device setup)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Image loading or conversion error
    #[error("Image error: {0}")]
    Image(String),

    /// Firmware check HTTP error
    #[error("HTTP error: {0}")]
    Http(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NelkoError {
    /// Build a `MalformedResponse` carrying a hex rendering of the offending bytes.
    pub fn malformed(reason: &str, raw: &[u8]) -> Self {
        NelkoError::MalformedResponse(format!("{} ({})", reason, hex::encode(raw)))
    }

    /// Whether this error ends the connection.
    pub fn is_transport(&self) -> bool {
        matches!(self, NelkoError::Transport(_) | NelkoError::Io(_))
    }

    /// Whether reading more bytes may turn this error into a result.
    pub fn is_retryable(&self) -> bool {
        matches!(self, NelkoError::IncompleteResponse { .. })
    }
}

impl From<reqwest::Error> for NelkoError {
    fn from(e: reqwest::Error) -> Self {
        NelkoError::Http(e.to_string())
    }
}

impl From<image::ImageError> for NelkoError {
    fn from(e: image::ImageError) -> Self {
        NelkoError::Image(e.to_string())
    }
}
