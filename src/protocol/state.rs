//! Connection state machine.
//!
//! ```text
//!            connect()         opened          close()          closed
//!   Closed ───────────► Connecting ────► Open ────────► Closing ───────► Closed
//!     ▲                     │                                              │
//!     └─────────────────────┴──────────────── closed ◄─────────────────────┘
//! ```
//!
//! Guards are evaluated against the current state on every call; callers
//! must not assume monotonic progress because remote signals interleave with
//! local requests.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::{Error, ErrorKind, Result};

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of a client instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Handshake in progress.
    Connecting,
    /// Ready to send and receive.
    Open,
    /// Close requested, waiting for the closed signal.
    Closing,
    /// Not connected. Also the initial state.
    #[default]
    Closed,
}

impl ConnectionState {
    /// Maps a ready-state integer to a state.
    ///
    /// `0..=3` map in order; anything else is treated as terminated.
    #[must_use]
    pub const fn from_ready_state(value: i32) -> Self {
        match value {
            0 => Self::Connecting,
            1 => Self::Open,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }

    /// Returns the ready-state integer.
    #[inline]
    #[must_use]
    pub const fn ready_state(self) -> u8 {
        match self {
            Self::Connecting => 0,
            Self::Open => 1,
            Self::Closing => 2,
            Self::Closed => 3,
        }
    }

    /// Checks that `connect()` is legal.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::AlreadyConnectedOrConnecting`] unless the state is `Closed`.
    pub fn ensure_can_connect(self) -> Result<()> {
        match self {
            Self::Closed => Ok(()),
            Self::Connecting | Self::Open | Self::Closing => {
                Err(Error::from_kind(ErrorKind::AlreadyConnectedOrConnecting))
            }
        }
    }

    /// Checks that `send()` is legal.
    ///
    /// # Errors
    ///
    /// [`ErrorKind::NotOpen`] unless the state is `Open`.
    pub fn ensure_can_send(self) -> Result<()> {
        match self {
            Self::Open => Ok(()),
            _ => Err(Error::from_kind(ErrorKind::NotOpen)),
        }
    }

    /// Checks that `close()` is legal.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::AlreadyClosing`] in `Closing`
    /// - [`ErrorKind::AlreadyClosed`] in `Closed`
    pub fn ensure_can_close(self) -> Result<()> {
        match self {
            Self::Connecting | Self::Open => Ok(()),
            Self::Closing => Err(Error::from_kind(ErrorKind::AlreadyClosing)),
            Self::Closed => Err(Error::from_kind(ErrorKind::AlreadyClosed)),
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

// ============================================================================
// StateCell
// ============================================================================

/// Atomic holder for a [`ConnectionState`].
///
/// Shared between the API caller and the I/O task; all guarded transitions
/// are compare-and-swap so a racing signal cannot be overwritten.
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    /// Creates a cell in the initial `Closed` state.
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(ConnectionState::Closed.ready_state()))
    }

    /// Returns the current state.
    #[inline]
    pub(crate) fn load(&self) -> ConnectionState {
        ConnectionState::from_ready_state(i32::from(self.0.load(Ordering::SeqCst)))
    }

    /// Unconditionally sets the state.
    #[inline]
    pub(crate) fn store(&self, state: ConnectionState) {
        self.0.store(state.ready_state(), Ordering::SeqCst);
    }

    /// Moves `from → to` if the state is still `from`.
    #[inline]
    pub(crate) fn transition(&self, from: ConnectionState, to: ConnectionState) -> bool {
        self.0
            .compare_exchange(
                from.ready_state(),
                to.ready_state(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// `Closed → Connecting`, or the connect guard error.
    pub(crate) fn begin_connect(&self) -> Result<()> {
        loop {
            if self.transition(ConnectionState::Closed, ConnectionState::Connecting) {
                return Ok(());
            }
            // Retry only if a closed signal landed between the swap and the load.
            self.load().ensure_can_connect()?;
        }
    }

    /// `Connecting | Open → Closing`, or the close guard error.
    ///
    /// Returns the state the close was requested from.
    pub(crate) fn begin_close(&self) -> Result<ConnectionState> {
        loop {
            let current = self.load();
            current.ensure_can_close()?;
            if self.transition(current, ConnectionState::Closing) {
                return Ok(current);
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_ready_state_mapping() {
        assert_eq!(ConnectionState::from_ready_state(0), ConnectionState::Connecting);
        assert_eq!(ConnectionState::from_ready_state(1), ConnectionState::Open);
        assert_eq!(ConnectionState::from_ready_state(2), ConnectionState::Closing);
        assert_eq!(ConnectionState::from_ready_state(3), ConnectionState::Closed);
        assert_eq!(ConnectionState::from_ready_state(4), ConnectionState::Closed);
        assert_eq!(ConnectionState::from_ready_state(-1), ConnectionState::Closed);
    }

    #[test]
    fn test_connect_guard() {
        assert!(ConnectionState::Closed.ensure_can_connect().is_ok());
        for state in [
            ConnectionState::Connecting,
            ConnectionState::Open,
            ConnectionState::Closing,
        ] {
            let err = state.ensure_can_connect().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::AlreadyConnectedOrConnecting);
        }
    }

    #[test]
    fn test_send_guard() {
        assert!(ConnectionState::Open.ensure_can_send().is_ok());
        for state in [
            ConnectionState::Connecting,
            ConnectionState::Closing,
            ConnectionState::Closed,
        ] {
            assert_eq!(state.ensure_can_send().unwrap_err().kind(), ErrorKind::NotOpen);
        }
    }

    #[test]
    fn test_close_guard() {
        assert!(ConnectionState::Open.ensure_can_close().is_ok());
        assert!(ConnectionState::Connecting.ensure_can_close().is_ok());
        assert_eq!(
            ConnectionState::Closing.ensure_can_close().unwrap_err().kind(),
            ErrorKind::AlreadyClosing
        );
        assert_eq!(
            ConnectionState::Closed.ensure_can_close().unwrap_err().kind(),
            ErrorKind::AlreadyClosed
        );
    }

    #[test]
    fn test_cell_starts_closed() {
        assert_eq!(StateCell::new().load(), ConnectionState::Closed);
    }

    #[test]
    fn test_cell_connect_then_close() {
        let cell = StateCell::new();
        assert_ok!(cell.begin_connect());
        assert_eq!(cell.load(), ConnectionState::Connecting);

        let err = assert_err!(cell.begin_connect());
        assert_eq!(err.kind(), ErrorKind::AlreadyConnectedOrConnecting);

        assert!(cell.transition(ConnectionState::Connecting, ConnectionState::Open));
        assert_eq!(cell.begin_close().expect("close"), ConnectionState::Open);
        assert_eq!(cell.load(), ConnectionState::Closing);

        let err = cell.begin_close().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyClosing);

        cell.store(ConnectionState::Closed);
        let err = cell.begin_close().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyClosed);
    }

    #[test]
    fn test_transition_rejects_stale_from() {
        let cell = StateCell::new();
        assert!(!cell.transition(ConnectionState::Connecting, ConnectionState::Open));
        assert_eq!(cell.load(), ConnectionState::Closed);
    }
}
