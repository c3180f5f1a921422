//! Domain error types
//!
//! This module defines error types for domain validation failures and the
//! typed error contract for calls against the downstream system.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid member code (the source system's stable identifier)
    #[error("Invalid member code: {0}")]
    InvalidMemberCode(String),

    /// Invalid remote ID format
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// Invalid content hash format (expected SHA-256 hex)
    #[error("Invalid hash format: {0}")]
    InvalidHash(String),

    /// Invalid state transition attempt
    #[error("Invalid state transition from {from} to {to}")]
    InvalidState {
        /// The current state
        from: String,
        /// The attempted target state
        to: String,
    },

    /// ID parsing error
    #[error("Invalid ID format: {0}")]
    InvalidId(String),
}

/// Error returned by calls against the downstream system.
///
/// The reconciliation driver branches on status classes, so the taxonomy
/// is explicit rather than sniffed out of error strings:
/// - `Status` covers every non-2xx HTTP response,
/// - `Network`/`Timeout` cover failures below the HTTP layer,
/// - `UnrecognizedShape` covers list responses whose envelope matched
///   none of the known nesting shapes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The downstream system answered with a non-2xx status
    #[error("Remote call failed with status {status}: {details}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body or reason phrase
        details: String,
    },

    /// A network-level failure before any HTTP status was received
    #[error("Network error: {0}")]
    Network(String),

    /// The fixed request timeout elapsed
    #[error("Request timed out")]
    Timeout,

    /// A list response matched none of the known envelope shapes
    #[error("Unrecognized response shape: {0}")]
    UnrecognizedShape(String),
}

impl RemoteError {
    /// True for server-side trouble (5xx), the only class that is retried
    pub fn is_server_error(&self) -> bool {
        matches!(self, RemoteError::Status { status, .. } if *status >= 500)
    }

    /// True when the remote entity no longer exists (404)
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::Status { status: 404, .. })
    }

    /// True for a create that collided with a pre-existing entity:
    /// HTTP 409, or a 400 whose payload indicates the entity already exists
    pub fn is_conflict(&self) -> bool {
        match self {
            RemoteError::Status { status: 409, .. } => true,
            RemoteError::Status {
                status: 400,
                details,
            } => details.to_lowercase().contains("already exists"),
            _ => false,
        }
    }
}
