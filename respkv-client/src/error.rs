//! # Client Errors
//!
//! Purpose: Classify every failure the client can surface so callers branch
//! on the failure class instead of matching on messages.
//!
//! ## Design Principles
//! 1. **Typed Taxonomy**: Transport, protocol, pool and input failures are
//!    distinct variants.
//! 2. **Connection Health**: `is_connection_fatal` is the single rule deciding
//!    whether a leased connection must be evicted.
//! 3. **Verbatim Server Text**: Store error replies keep their original message.

use std::time::Duration;

use thiserror::Error;

/// Result type for the sync client.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the sync client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or IO failure while reading/writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// RESP2 framing error or a reply of the wrong type.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Store returned an error reply; the message is kept verbatim.
    #[error("{0}")]
    Server(String),

    /// No connection became available within the borrow timeout.
    #[error("connection pool exhausted after waiting {waited:?}")]
    PoolExhausted { waited: Duration },

    /// The pool was shut down.
    #[error("connection pool is closed")]
    PoolClosed,

    /// Caller passed arguments the command cannot accept.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// Address could not be resolved into a socket address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Configuration values are inconsistent.
    #[error("invalid config: {0}")]
    Config(String),
}

/// Coarse failure class of a [`ClientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Protocol,
    PoolExhausted,
    InputError,
    Configuration,
}

impl ClientError {
    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        ClientError::Protocol(message.into())
    }

    /// Returns the failure class.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Io(_) => ErrorKind::Transport,
            ClientError::Protocol(_) | ClientError::Server(_) => ErrorKind::Protocol,
            ClientError::PoolExhausted { .. } | ClientError::PoolClosed => ErrorKind::PoolExhausted,
            ClientError::InvalidInput(_) => ErrorKind::InputError,
            ClientError::InvalidAddress(_) | ClientError::Config(_) => ErrorKind::Configuration,
        }
    }

    /// True when the connection that produced this error must not be reused.
    pub fn is_connection_fatal(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transport | ErrorKind::Protocol)
    }
}
