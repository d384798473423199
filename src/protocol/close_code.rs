//! Close status codes.
//!
//! Codes arrive from the remote peer, so parsing is lenient: any integer
//! outside the known set becomes [`CloseCode::Undefined`].

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorKind, Result};

// ============================================================================
// Constants
// ============================================================================

/// Longest close reason, in UTF-8 bytes, that fits a close frame.
///
/// Control frame payloads are capped at 125 bytes, two of which hold the code.
pub const MAX_CLOSE_REASON_BYTES: usize = 123;

// ============================================================================
// CloseCode
// ============================================================================

/// WebSocket close status code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum CloseCode {
    /// Sentinel for "no code parsed yet". Never reported as a close cause.
    NotSet = 0,
    /// Normal closure.
    #[default]
    Normal = 1000,
    /// Endpoint going away.
    Away = 1001,
    /// Protocol error.
    ProtocolError = 1002,
    /// Received data of an unacceptable type.
    UnsupportedData = 1003,
    /// Reserved code, also used for every unrecognized value.
    Undefined = 1004,
    /// No status code was present.
    NoStatus = 1005,
    /// Connection dropped without a close frame.
    Abnormal = 1006,
    /// Message data inconsistent with its type.
    InvalidData = 1007,
    /// Message violates endpoint policy.
    PolicyViolation = 1008,
    /// Message too big to process.
    TooBig = 1009,
    /// Client expected an extension the server did not negotiate.
    MandatoryExtension = 1010,
    /// Server hit an unexpected condition.
    ServerError = 1011,
    /// TLS handshake failed.
    TlsHandshakeFailure = 1015,
}

impl CloseCode {
    /// Parses an integer close code.
    ///
    /// Total: the sentinel `0`, negative values and anything outside the
    /// known set parse to [`CloseCode::Undefined`].
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            1000 => Self::Normal,
            1001 => Self::Away,
            1002 => Self::ProtocolError,
            1003 => Self::UnsupportedData,
            1005 => Self::NoStatus,
            1006 => Self::Abnormal,
            1007 => Self::InvalidData,
            1008 => Self::PolicyViolation,
            1009 => Self::TooBig,
            1010 => Self::MandatoryExtension,
            1011 => Self::ServerError,
            1015 => Self::TlsHandshakeFailure,
            _ => Self::Undefined,
        }
    }

    /// Returns the numeric code.
    #[inline]
    #[must_use]
    pub const fn code(self) -> u16 {
        self as u16
    }

    /// Returns `true` if an endpoint may put this code in a close frame.
    ///
    /// Reserved codes only describe locally observed conditions.
    #[must_use]
    pub const fn is_sendable(self) -> bool {
        !matches!(
            self,
            Self::NotSet
                | Self::Undefined
                | Self::NoStatus
                | Self::Abnormal
                | Self::TlsHandshakeFailure
        )
    }

    /// Validates arguments for an outgoing close.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::InvalidCloseArgument`] if the code is reserved or the
    /// reason exceeds [`MAX_CLOSE_REASON_BYTES`].
    pub fn validate_close(self, reason: Option<&str>) -> Result<()> {
        let reason_len = reason.map_or(0, str::len);
        if !self.is_sendable() || reason_len > MAX_CLOSE_REASON_BYTES {
            return Err(Error::from_kind(ErrorKind::InvalidCloseArgument));
        }
        Ok(())
    }
}

impl From<i32> for CloseCode {
    fn from(code: i32) -> Self {
        Self::from_code(code)
    }
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> Self {
        Self::from_code(i32::from(code))
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.code()
    }
}

impl fmt::Display for CloseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

// ============================================================================
// Tests
// ============================================================================
