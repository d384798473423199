//! WebSocket protocol values shared by both backends.
//!
//! This module defines the values that cross backend boundaries: close codes
//! reported by the remote peer and the connection ready state.
//!
//! # Wire Values
//!
//! | Type | Representation |
//! |------|----------------|
//! | [`CloseCode`] | RFC 6455 status code (`u16`) |
//! | [`ConnectionState`] | Ready state integer (`0..=3`) |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `close_code` | Close status codes and lenient parsing |
//! | `state` | Connection lifecycle and transition guards |

// ============================================================================
// Submodules
// ============================================================================

/// Close status codes.
pub mod close_code;

/// Connection state machine.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use close_code::{CloseCode, MAX_CLOSE_REASON_BYTES};
pub use state::ConnectionState;
