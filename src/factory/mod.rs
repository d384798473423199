//! Client factory module.
//!
//! Chooses the backend for the environment and hands out
//! [`WebSocket`](crate::WebSocket) clients.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`WebSocketFactory`] | Creates clients on the selected backend |
//! | [`FactoryBuilder`] | Fluent configuration builder |
//! | [`NativeOptions`] | Handshake and stream options for native clients |
//! | [`Environment`] | Native or sandboxed build target |
//!
//! # Backend Selection
//!
//! | Configuration | Backend |
//! |---------------|---------|
//! | explicit bridge | [`BridgeSocket`](crate::BridgeSocket) over that bridge |
//! | `wasm32` | [`BridgeSocket`](crate::BridgeSocket) over the host JS library |
//! | otherwise | [`NativeSocket`](crate::NativeSocket) |

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder pattern for factory configuration.
pub mod builder;

/// Core factory implementation.
pub mod core;

/// Native client options.
#[cfg(not(target_arch = "wasm32"))]
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::FactoryBuilder;
pub use core::{Environment, WebSocketFactory};
#[cfg(not(target_arch = "wasm32"))]
pub use options::NativeOptions;
