//! Error types for the remotepad daemon.

use std::path::PathBuf;

use thiserror::Error;

use crate::registry::ControlKind;

/// Main error type for the daemon.
///
/// Every variant here is fatal to the process: descriptor I/O failures leave
/// the advertised state out of sync with reality, and bind failures leave the
/// daemon unreachable. Recoverable per-line rejections use
/// [`ProtocolErrorKind`] instead and never surface through this type.
#[derive(Error, Debug)]
pub enum DaemonError {
    /// Configuration-related errors.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Socket bind/accept errors.
    #[error("Socket error: {message}")]
    Socket { message: String },

    /// Descriptor file I/O errors.
    #[error("Descriptor error at {path}: {source}")]
    Descriptor {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons a protocol line is rejected.
///
/// Rejections are logged and the offending line discarded; the connection
/// stays open and no state is mutated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolErrorKind {
    #[error("line does not conform to KEY=VALUE format")]
    Malformed,

    #[error("no control matches key '{key}'")]
    UnknownKey { key: String },

    #[error("value contains possible markup injection")]
    MarkupInjection,

    #[error("value is in the wrong format for {kind}")]
    BadValue { kind: ControlKind },
}

/// Result type alias for daemon operations.
pub type DaemonResult<T> = Result<T, DaemonError>;
