//! Error types for the remotepad daemon.

mod types;

pub use types::{DaemonError, DaemonResult, ProtocolErrorKind};
