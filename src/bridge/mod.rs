//! Bridge backend: sockets owned by a host, reached through handles.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ForeignBridge`] | Outbound handle-keyed calls into the host |
//! | [`BridgeHooks`] | Inbound callback table the host stores once |
//! | [`InstanceRegistry`] | Routes callbacks to live instances |
//! | [`BridgeSocket`] | [`WebSocket`](crate::WebSocket) over a bridge |
//! | `JsLibBridge` | Default bridge on `wasm32` |
//!
//! # Callback Flow
//!
//! ```text
//! host socket ──► BridgeHooks ──► InstanceRegistry::global() ──► SocketEvents
//!                 (extern "C")     (Handle → instance)            (handlers)
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Foreign interface and callback hooks.
pub mod ffi;

/// Handle-keyed instance registry.
pub mod registry;

/// Bridge backend adapter.
pub mod socket;

/// Host JS library imports.
#[cfg(target_arch = "wasm32")]
pub mod jslib;

#[cfg(test)]
pub(crate) mod mock;

// ============================================================================
// Re-exports
// ============================================================================

pub use ffi::{BridgeHooks, CloseHook, ErrorHook, ForeignBridge, MessageHook, OpenHook};
#[cfg(target_arch = "wasm32")]
pub use jslib::JsLibBridge;
pub use registry::InstanceRegistry;
pub use socket::BridgeSocket;
