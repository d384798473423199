//! Client contract shared by both backends.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`WebSocket`] | Operations every backend implements |
//! | [`SocketEvents`] | Open/message/error/close subscriber lists |
//! | [`BackendKind`] | Which backend an instance runs on |
//! | [`NativeSocket`] | In-process backend over tokio-tungstenite |
//!
//! The bridge backend lives in [`crate::bridge`].

// ============================================================================
// Submodules
// ============================================================================

/// Event subscriber lists.
pub mod events;

/// Native backend adapter.
#[cfg(not(target_arch = "wasm32"))]
pub mod native;

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::identifiers::SubscriptionId;
use crate::protocol::{CloseCode, ConnectionState};

// ============================================================================
// Re-exports
// ============================================================================

pub use events::SocketEvents;
#[cfg(not(target_arch = "wasm32"))]
pub use native::NativeSocket;

// ============================================================================
// BackendKind
// ============================================================================

/// Backend an instance runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackendKind {
    /// Socket owned by this process.
    Native,
    /// Socket owned by the host, reached through a foreign bridge.
    Bridge,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => f.write_str("native"),
            Self::Bridge => f.write_str("bridge"),
        }
    }
}

// ============================================================================
// WebSocket
// ============================================================================

/// WebSocket client contract.
///
/// Every call is a non-blocking request: it validates the current state,
/// hands work to the backend and returns. Completion is reported through
/// [`SocketEvents`]; failures detected before handing off are returned
/// synchronously.
pub trait WebSocket: Send + Sync {
    /// Opens the connection.
    ///
    /// # Errors
    ///
    /// - `AlreadyConnectedOrConnecting` unless the state is `Closed`
    /// - unexpected error if the backend rejects the request
    fn connect(&self) -> Result<()>;

    /// Requests a close handshake with a status code and optional reason.
    ///
    /// The state becomes `Closing`; `Closed` follows with the close event.
    ///
    /// # Errors
    ///
    /// - `AlreadyClosing` / `AlreadyClosed` when a close already happened
    /// - `InvalidCloseArgument` for a reserved code or a reason over 123 bytes
    fn close(&self, code: CloseCode, reason: Option<&str>) -> Result<()>;

    /// Sends a binary message.
    ///
    /// # Errors
    ///
    /// `NotOpen` unless the state is `Open`. Nothing is queued.
    fn send(&self, data: &[u8]) -> Result<()>;

    /// Sends a text message.
    ///
    /// # Errors
    ///
    /// `NotOpen` unless the state is `Open`. Nothing is queued.
    fn send_text(&self, text: &str) -> Result<()>;

    /// Returns the current state. Never fails.
    fn state(&self) -> ConnectionState;

    /// Returns `true` once open or message activity was seen, until the
    /// next close.
    fn is_alive(&self) -> bool;

    /// Returns the subscriber lists.
    fn events(&self) -> &SocketEvents;

    /// Returns the backend this instance runs on.
    fn backend(&self) -> BackendKind;

    /// Closes with [`CloseCode::Normal`] and no reason.
    fn close_normal(&self) -> Result<()> {
        self.close(CloseCode::Normal, None)
    }
}

// ============================================================================
// Subscription shortcuts
// ============================================================================

impl dyn WebSocket {
    /// Subscribes to the open event.
    pub fn on_open(&self, handler: impl Fn() + Send + Sync + 'static) -> SubscriptionId {
        self.events().on_open(handler)
    }

    /// Subscribes to received messages.
    pub fn on_message(&self, handler: impl Fn(&[u8]) + Send + Sync + 'static) -> SubscriptionId {
        self.events().on_message(handler)
    }

    /// Subscribes to error reports.
    pub fn on_error(&self, handler: impl Fn(&str) + Send + Sync + 'static) -> SubscriptionId {
        self.events().on_error(handler)
    }

    /// Subscribes to the close event.
    pub fn on_close(&self, handler: impl Fn(CloseCode) + Send + Sync + 'static) -> SubscriptionId {
        self.events().on_close(handler)
    }

    /// Removes a subscription.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events().unsubscribe(id)
    }
}
