//! Error types for transgate
//!
//! Provides a unified error type for every `send_command` call. Nothing here is
//! fatal to the process: each error is scoped to the single call that produced it.

use std::time::Duration;

use thiserror::Error;

use crate::protocol::{Response, STATUS_ERROR};

/// Result type alias using GatewayError
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Unified error type for gateway operations
#[derive(Debug, Error)]
pub enum GatewayError {
    // -------------------------------------------------------------------------
    // Input Errors
    // -------------------------------------------------------------------------
    #[error("Invalid command. Valid commands: {allowed}")]
    WhitelistRejected { command: String, allowed: String },

    #[error("Invalid command input: {0}")]
    BadInput(String),

    // -------------------------------------------------------------------------
    // Connection Errors
    // -------------------------------------------------------------------------
    #[error("Failed to connect to {addr} after {attempts} attempts: {source}")]
    DialFailed {
        addr: String,
        attempts: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Write failed: {0}")]
    WriteFailed(#[source] std::io::Error),

    #[error("Deadline of {0:?} exceeded waiting for the backend")]
    Timeout(Duration),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Unexpected greeting: {0:?}")]
    GreetingMismatch(String),

    #[error("Response truncated: {0}")]
    ResponseTruncated(String),

    #[error("Malformed response: {0}")]
    DecodeMalformed(String),

    // -------------------------------------------------------------------------
    // Backend-Reported Errors
    // -------------------------------------------------------------------------
    #[error("{}", .response.error().unwrap_or("command does not exist"))]
    CommandNotFound { response: Box<Response> },

    #[error("{message}")]
    DatabaseError {
        message: String,
        response: Box<Response>,
    },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl GatewayError {
    /// The normalized response carried by backend-reported errors
    pub fn response(&self) -> Option<&Response> {
        match self {
            GatewayError::CommandNotFound { response }
            | GatewayError::DatabaseError { response, .. } => Some(response),
            _ => None,
        }
    }

    /// Convert into the response presented alongside this error.
    ///
    /// Backend-reported errors hand back their normalized response. Every other
    /// failure becomes an empty response with the generic error status and the
    /// error text in its `error` field.
    pub fn into_response(self) -> Response {
        match self {
            GatewayError::CommandNotFound { response }
            | GatewayError::DatabaseError { response, .. } => *response,
            other => {
                let mut response = Response::default();
                response.set_status(STATUS_ERROR);
                response.set_error(other.to_string());
                response
            }
        }
    }

    /// True when the failure was reported by the backend itself rather than
    /// by the connection or the framing
    pub fn is_backend_reported(&self) -> bool {
        matches!(
            self,
            GatewayError::CommandNotFound { .. } | GatewayError::DatabaseError { .. }
        )
    }
}
