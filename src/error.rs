//! Error types for hybrid WebSocket clients.
//!
//! Both backends report local contract violations and backend faults through
//! the same [`Error`] type. Negative status codes returned across the foreign
//! boundary are translated with [`ErrorKind::from_status`].
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use hybrid_websocket::{Result, WebSocket};
//!
//! fn greet(ws: &dyn WebSocket) -> Result<()> {
//!     ws.send_text("hello")?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Classes
//!
//! | Class | Kinds |
//! |-------|-------|
//! | Invalid state | `AlreadyConnectedOrConnecting`, `NotConnected`, `AlreadyClosing`, `AlreadyClosed`, `NotOpen` |
//! | Invalid argument | `InvalidCloseArgument` |
//! | Unexpected | `InstanceNotFound`, `Unknown`, wrapped backend faults |
//!
//! # Status Codes
//!
//! | Status | Kind |
//! |--------|------|
//! | -1 | [`ErrorKind::InstanceNotFound`] |
//! | -2 | [`ErrorKind::AlreadyConnectedOrConnecting`] |
//! | -3 | [`ErrorKind::NotConnected`] |
//! | -4 | [`ErrorKind::AlreadyClosing`] |
//! | -5 | [`ErrorKind::AlreadyClosed`] |
//! | -6 | [`ErrorKind::NotOpen`] |
//! | -7 | [`ErrorKind::InvalidCloseArgument`] |
//! | other | [`ErrorKind::Unknown`] |

// ============================================================================
// Imports
// ============================================================================

use std::error::Error as StdError;
use std::fmt;
use std::result::Result as StdResult;

use thiserror::Error;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

/// Boxed lower-level cause carried by an [`enum@Error`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

// ============================================================================
// ErrorKind
// ============================================================================

/// Failure taxonomy shared by both backends.
///
/// Each kind maps to one negative status code of the foreign interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The handle does not name a live instance.
    InstanceNotFound,
    /// `connect` while already connecting, open or closing.
    AlreadyConnectedOrConnecting,
    /// The instance has no underlying connection.
    NotConnected,
    /// `close` while a close handshake is in progress.
    AlreadyClosing,
    /// `close` after the connection has closed.
    AlreadyClosed,
    /// `send` while the connection is not open.
    NotOpen,
    /// Close code may not be sent, or the reason is too long.
    InvalidCloseArgument,
    /// Any status the taxonomy does not recognize.
    Unknown,
}

impl ErrorKind {
    /// Translates a backend status code into a kind.
    ///
    /// Total: unrecognized values map to [`ErrorKind::Unknown`].
    #[must_use]
    pub const fn from_status(status: i32) -> Self {
        match status {
            -1 => Self::InstanceNotFound,
            -2 => Self::AlreadyConnectedOrConnecting,
            -3 => Self::NotConnected,
            -4 => Self::AlreadyClosing,
            -5 => Self::AlreadyClosed,
            -6 => Self::NotOpen,
            -7 => Self::InvalidCloseArgument,
            _ => Self::Unknown,
        }
    }

    /// Returns the status code for this kind, if it has one.
    #[must_use]
    pub const fn status(self) -> Option<i32> {
        match self {
            Self::InstanceNotFound => Some(-1),
            Self::AlreadyConnectedOrConnecting => Some(-2),
            Self::NotConnected => Some(-3),
            Self::AlreadyClosing => Some(-4),
            Self::AlreadyClosed => Some(-5),
            Self::NotOpen => Some(-6),
            Self::InvalidCloseArgument => Some(-7),
            Self::Unknown => None,
        }
    }

    /// Returns the human-readable message for this kind.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::InstanceNotFound => "WebSocket instance not found.",
            Self::AlreadyConnectedOrConnecting => {
                "WebSocket is already connected or in connecting state."
            }
            Self::NotConnected => "WebSocket is not connected.",
            Self::AlreadyClosing => "WebSocket is already closing.",
            Self::AlreadyClosed => "WebSocket is already closed.",
            Self::NotOpen => "WebSocket is not in open state.",
            Self::InvalidCloseArgument => {
                "Cannot close WebSocket. An invalid code was specified or reason is too long."
            }
            Self::Unknown => "Unknown error.",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// The variant is the error class; [`Error::kind`] gives the precise kind.
#[derive(Error, Debug)]
pub enum Error {
    /// Operation not allowed in the current connection state.
    #[error("{message}")]
    InvalidState {
        /// Precise failure kind.
        kind: ErrorKind,
        /// Description of the failure.
        message: String,
        /// Lower-level cause, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// Bad arguments passed to an operation.
    #[error("{message}")]
    InvalidArgument {
        /// Precise failure kind.
        kind: ErrorKind,
        /// Description of the failure.
        message: String,
        /// Lower-level cause, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// Failure not expected by the contract, probably corrupted state or a
    /// backend fault.
    #[error("{message}")]
    Unexpected {
        /// Precise failure kind.
        kind: ErrorKind,
        /// Description of the failure.
        message: String,
        /// Lower-level cause, if any.
        #[source]
        source: Option<BoxError>,
    },
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates the error for a kind, using the kind's message.
    #[must_use]
    pub fn from_kind(kind: ErrorKind) -> Self {
        Self::with_message(kind, kind.message(), None)
    }

    /// Creates the error for a negative backend status.
    #[inline]
    #[must_use]
    pub fn from_status(status: i32) -> Self {
        Self::from_kind(ErrorKind::from_status(status))
    }

    /// Creates an error of the given kind with a custom message and cause.
    ///
    /// The class is derived from the kind.
    #[must_use]
    pub fn with_message(
        kind: ErrorKind,
        message: impl Into<String>,
        source: Option<BoxError>,
    ) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::AlreadyConnectedOrConnecting
            | ErrorKind::NotConnected
            | ErrorKind::AlreadyClosing
            | ErrorKind::AlreadyClosed
            | ErrorKind::NotOpen => Self::InvalidState {
                kind,
                message,
                source,
            },
            ErrorKind::InvalidCloseArgument => Self::InvalidArgument {
                kind,
                message,
                source,
            },
            ErrorKind::InstanceNotFound | ErrorKind::Unknown => Self::Unexpected {
                kind,
                message,
                source,
            },
        }
    }

    /// Creates an unexpected error without a cause.
    #[inline]
    #[must_use]
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::with_message(ErrorKind::Unknown, message, None)
    }

    /// Creates an unexpected error wrapping a lower-level cause.
    #[inline]
    #[must_use]
    pub fn wrap(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::with_message(ErrorKind::Unknown, message, Some(source.into()))
    }

    /// Converts a backend status into a result.
    ///
    /// Non-negative statuses are returned unchanged.
    #[inline]
    pub fn check_status(status: i32) -> Result<i32> {
        if status < 0 {
            Err(Self::from_status(status))
        } else {
            Ok(status)
        }
    }
}

// ============================================================================
// Error Accessors
// ============================================================================

impl Error {
    /// Returns the precise failure kind.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidState { kind, .. }
            | Self::InvalidArgument { kind, .. }
            | Self::Unexpected { kind, .. } => *kind,
        }
    }

    /// Returns `true` if this is a wrong-state error.
    #[inline]
    #[must_use]
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState { .. })
    }

    /// Returns `true` if this is a bad-argument error.
    #[inline]
    #[must_use]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }

    /// Returns `true` if this is an unexpected error.
    #[inline]
    #[must_use]
    pub fn is_unexpected(&self) -> bool {
        matches!(self, Self::Unexpected { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use std::io::{Error as IoError, ErrorKind as IoErrorKind};

    #[test]
    fn test_known_statuses() {
        let expected = [
            (-1, ErrorKind::InstanceNotFound),
            (-2, ErrorKind::AlreadyConnectedOrConnecting),
            (-3, ErrorKind::NotConnected),
            (-4, ErrorKind::AlreadyClosing),
            (-5, ErrorKind::AlreadyClosed),
            (-6, ErrorKind::NotOpen),
            (-7, ErrorKind::InvalidCloseArgument),
        ];
        for (status, kind) in expected {
            assert_eq!(ErrorKind::from_status(status), kind);
            assert_eq!(kind.status(), Some(status));
        }
    }

    #[test]
    fn test_unknown_status() {
        assert_eq!(ErrorKind::from_status(-8), ErrorKind::Unknown);
        assert_eq!(ErrorKind::from_status(i32::MIN), ErrorKind::Unknown);
        assert_eq!(ErrorKind::Unknown.status(), None);
    }

    #[test]
    fn test_error_display() {
        let err = Error::from_status(-6);
        assert_eq!(err.to_string(), "WebSocket is not in open state.");
        assert_eq!(err.kind(), ErrorKind::NotOpen);
    }

    #[test]
    fn test_error_classes() {
        assert!(Error::from_kind(ErrorKind::AlreadyClosing).is_invalid_state());
        assert!(Error::from_kind(ErrorKind::InvalidCloseArgument).is_invalid_argument());
        assert!(Error::from_kind(ErrorKind::InstanceNotFound).is_unexpected());
        assert!(Error::from_status(-42).is_unexpected());
    }

    #[test]
    fn test_wrap_keeps_source() {
        let io_err = IoError::new(IoErrorKind::ConnectionRefused, "refused");
        let err = Error::wrap("Failed to connect.", io_err);

        assert_eq!(err.kind(), ErrorKind::Unknown);
        assert_eq!(err.to_string(), "Failed to connect.");
        let source = StdError::source(&err).expect("source");
        assert_eq!(source.to_string(), "refused");
    }

    #[test]
    fn test_check_status() {
        assert_eq!(Error::check_status(0).ok(), Some(0));
        assert_eq!(Error::check_status(7).ok(), Some(7));
        let err = Error::check_status(-5).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyClosed);
    }

    proptest! {
        #[test]
        fn prop_status_translation_is_total(status in any::<i32>()) {
            let kind = ErrorKind::from_status(status);
            if (-7..=-1).contains(&status) {
                prop_assert_eq!(kind.status(), Some(status));
            } else {
                prop_assert_eq!(kind, ErrorKind::Unknown);
            }
            prop_assert!(!Error::from_status(status).to_string().is_empty());
        }
    }
}
