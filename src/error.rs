//! Error types for termhub.

use thiserror::Error;

use crate::session::SessionId;

/// Main error type for termhub operations.
#[derive(Error, Debug)]
pub enum TermhubError {
    /// Text could not be parsed (session id, principal, ...).
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// An argument was out of range, e.g. a non-positive timeout.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A session with the given id is already registered.
    #[error("duplicate session id: {0}")]
    DuplicateId(SessionId),

    /// A factory returned a session with a different id than the one it was given.
    #[error("session factory returned id {actual} but was given {expected}")]
    IdentityMismatch {
        expected: SessionId,
        actual: SessionId,
    },

    /// Session with the given id was not found.
    #[error("terminal {0} not found")]
    NotFound(SessionId),

    /// A session produced through a filtered registry belongs to another principal.
    #[error("{action} session belongs to different user")]
    ForeignOwner { action: &'static str },

    /// The session has been closed.
    #[error("terminal {0} is closed")]
    TerminalClosed(SessionId),

    /// The embedding does not support the requested operation. Fatal to a shell run.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// An ordinary evaluation failure.
    #[error("{0}")]
    Evaluation(String),

    /// A result value could not be converted to text.
    #[error("{0}")]
    Conversion(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal lock was poisoned.
    #[error("internal lock poisoned")]
    LockPoisoned,
}

impl TermhubError {
    /// Whether this error must abort a running shell instead of being reported.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TermhubError::Unsupported(_))
    }
}

/// Convenience Result type for termhub operations.
pub type Result<T> = std::result::Result<T, TermhubError>;
