//! Native WebSocket transport layer.
//!
//! Runs the tokio-tungstenite client that backs [`crate::NativeSocket`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐   ConnectionCommand   ┌──────────────────┐        ┌────────┐
//! │  NativeSocket   │──────────────────────►│  event loop task │◄──────►│  peer  │
//! │  (caller)       │◄──────────────────────│  (tokio)         │   ws   │        │
//! └─────────────────┘    TransportEvent     └──────────────────┘        └────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Connection::spawn` - Start the handshake on a runtime
//! 2. `TransportEvent::Open` - Handshake completed
//! 3. `send_text` / `send_binary` / `close` - Queue commands
//! 4. `TransportEvent::Closed` - Stream finished, task exits

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and event loop.
pub(crate) mod connection;

// ============================================================================
// Re-exports
// ============================================================================

pub(crate) use connection::{ConnectParams, Connection, EventSink, TransportEvent};
