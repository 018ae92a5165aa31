//! Error types for hs2arrow-rs.
//!
//! This module defines domain-specific error types organized by functional area.

use std::fmt;
use thiserror::Error;

/// Message used when the server reports a failure without text.
pub const DEFAULT_ERROR_MESSAGE: &str = "Execution failed!";

/// Error code used when the server reports a failure without a code.
pub const DEFAULT_ERROR_CODE: i32 = -1;

/// SQL state used when the server reports a failure without one.
pub const DEFAULT_SQL_STATE: &str = "unknown SQL_STATE";

/// Top-level error type encompassing all possible errors.
#[derive(Error, Debug)]
pub enum HiveError {
    /// Connection and configuration errors
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Query usage errors
    #[error(transparent)]
    Query(#[from] QueryError),

    /// Failure reported by the server in a status block
    #[error(transparent)]
    Server(#[from] ServerError),

    /// Data conversion errors
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// Transport protocol errors
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors related to connection configuration and session lifecycle.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// Invalid connection parameters
    #[error("Invalid connection parameter '{parameter}': {message}")]
    InvalidParameter { parameter: String, message: String },

    /// Connection string parsing error
    #[error("Failed to parse connection string: {0}")]
    ParseError(String),

    /// Unrecognised transport kind
    #[error("Unrecognised transport type '{0}'")]
    UnknownTransport(String),

    /// SASL transport selected without credentials
    #[error("transport is set to sasl, but no SASL parameters were supplied")]
    MissingSaslParams,

    /// Unsupported SASL mechanism
    #[error("Unsupported SASL mechanism '{0}'")]
    UnsupportedMechanism(String),

    /// Hive version token not present in the protocol table
    #[error("Invalid Hive version '{0}'")]
    InvalidVersion(String),

    /// An operation requiring a session was called without one
    #[error("No open session")]
    NoSession,
}

/// Errors related to query execution and operation tracking.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Operation is not in a state that allows the request
    #[error("Can't perform fetch on a query in state: {0}")]
    InvalidState(String),

    /// Handle triple is missing one of its parts
    #[error("Invalid handles: missing {0}")]
    InvalidHandle(&'static str),

    /// Stored handle triple could not be decoded
    #[error("Malformed handles: {0}")]
    MalformedHandle(String),

    /// Fetch orientation not declared by the protocol
    #[error("Invalid orientation: {0:?}")]
    InvalidOrientation(String),

    /// Execute response did not carry an operation handle
    #[error("Result set not available: {0}")]
    NoResultSet(String),
}

/// Structured failure translated from a non-success status block.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (error code: {error_code}, SQL state: {sql_state})")]
pub struct ServerError {
    /// Server error message
    pub message: String,
    /// Numeric error code
    pub error_code: i32,
    /// SQL state
    pub sql_state: String,
}

impl ServerError {
    /// Build a server error, filling absent parts with the protocol defaults.
    pub fn new(message: Option<String>, error_code: Option<i32>, sql_state: Option<String>) -> Self {
        Self {
            message: message.unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string()),
            error_code: error_code.unwrap_or(DEFAULT_ERROR_CODE),
            sql_state: sql_state.unwrap_or_else(|| DEFAULT_SQL_STATE.to_string()),
        }
    }
}

/// Errors related to result decoding and conversion.
#[derive(Error, Debug)]
pub enum ConversionError {
    /// Schema mismatch
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Invalid data format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    /// Value does not fit the column's type
    #[error("Failed to convert value at row {row}, column {column}: {message}")]
    ValueConversionFailed {
        row: usize,
        column: usize,
        message: String,
    },

    /// Arrow error
    #[error("Arrow error: {0}")]
    ArrowError(String),
}

/// Errors related to the transport and RPC framing.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Network I/O error
    #[error("Network I/O error: {0}")]
    IoError(String),

    /// Socket operation timed out
    #[error("Socket timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Transport used before being opened
    #[error("Transport is not open")]
    NotOpen,

    /// HTTP carrier error
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// SASL negotiation failure
    #[error("SASL negotiation failed: {0}")]
    SaslError(String),

    /// Protocol error
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// Application exception raised by the service
    #[error("Application exception ({kind}): {message}")]
    ApplicationException { kind: i32, message: String },

    /// Message deserialization error
    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}

/// Error classification used by callers deciding how to react.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Misconfiguration detected before any network I/O
    Configuration,
    /// API misuse, such as fetching from an unfinished operation
    Usage,
    /// Failure reported by the server
    Server,
    /// Network or framing failure
    Transport,
    /// Result decoding failure
    Conversion,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Configuration => write!(f, "CONFIGURATION"),
            ErrorKind::Usage => write!(f, "USAGE"),
            ErrorKind::Server => write!(f, "SERVER"),
            ErrorKind::Transport => write!(f, "TRANSPORT"),
            ErrorKind::Conversion => write!(f, "CONVERSION"),
        }
    }
}

impl HiveError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            HiveError::Connection(e) => e.kind(),
            HiveError::Query(e) => e.kind(),
            HiveError::Server(_) => ErrorKind::Server,
            HiveError::Conversion(_) => ErrorKind::Conversion,
            HiveError::Transport(_) => ErrorKind::Transport,
        }
    }

    /// Whether this is an I/O-layer failure of the carrier.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            HiveError::Transport(
                TransportError::IoError(_)
                    | TransportError::Timeout { .. }
                    | TransportError::NotOpen
                    | TransportError::HttpError(_)
            )
        )
    }

    /// The server failure, if this error carries one.
    pub fn server_error(&self) -> Option<&ServerError> {
        match self {
            HiveError::Server(e) => Some(e),
            _ => None,
        }
    }
}

impl ConnectionError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConnectionError::NoSession => ErrorKind::Usage,
            _ => ErrorKind::Configuration,
        }
    }
}

impl QueryError {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::InvalidHandle(_)
            | QueryError::MalformedHandle(_)
            | QueryError::InvalidOrientation(_) => ErrorKind::Configuration,
            QueryError::NoResultSet(_) => ErrorKind::Server,
            QueryError::InvalidState(_) => ErrorKind::Usage,
        }
    }
}

// Conversions from external error types
impl From<arrow::error::ArrowError> for ConversionError {
    fn from(err: arrow::error::ArrowError) -> Self {
        ConversionError::ArrowError(err.to_string())
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::IoError(err.to_string())
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::HttpError(err.to_string())
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        QueryError::MalformedHandle(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_defaults() {
        let err = ServerError::new(None, None, None);
        assert_eq!(err.message, "Execution failed!");
        assert_eq!(err.error_code, -1);
        assert_eq!(err.sql_state, "unknown SQL_STATE");
    }

    #[test]
    fn test_server_error_display() {
        let err = ServerError::new(Some("x".to_string()), Some(5), Some("S1".to_string()));
        let text = err.to_string();
        assert!(text.contains("x"));
        assert!(text.contains("5"));
        assert!(text.contains("S1"));
    }

    #[test]
    fn test_error_kind_mapping() {
        let err = HiveError::Connection(ConnectionError::MissingSaslParams);
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let err = HiveError::Query(QueryError::InvalidState("running".to_string()));
        assert_eq!(err.kind(), ErrorKind::Usage);

        let err = HiveError::Query(QueryError::InvalidHandle("guid"));
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let err = HiveError::Server(ServerError::new(None, None, None));
        assert_eq!(err.kind(), ErrorKind::Server);
    }

    #[test]
    fn test_is_io() {
        let err = HiveError::Transport(TransportError::IoError("broken pipe".to_string()));
        assert!(err.is_io());

        let err = HiveError::Transport(TransportError::Timeout { timeout_ms: 10 });
        assert!(err.is_io());

        let err = HiveError::Transport(TransportError::ProtocolError("bad".to_string()));
        assert!(!err.is_io());

        let err = HiveError::Server(ServerError::new(None, None, None));
        assert!(!err.is_io());
    }

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::Configuration.to_string(), "CONFIGURATION");
        assert_eq!(ErrorKind::Transport.to_string(), "TRANSPORT");
    }

    #[test]
    fn test_invalid_state_message() {
        let err = QueryError::InvalidState("running".to_string());
        assert_eq!(err.to_string(), "Can't perform fetch on a query in state: running");
    }
}
