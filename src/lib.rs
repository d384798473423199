//! Hybrid WebSocket - one client API for native and sandboxed targets.
//!
//! This library provides a single WebSocket client contract that runs on
//! real OS sockets natively and on host-owned sockets reached through a
//! handle-based foreign bridge (e.g. `wasm32` inside a browser page).
//!
//! # Architecture
//!
//! - **Native backend**: [`NativeSocket`] drives tokio-tungstenite on a
//!   background tokio task
//! - **Bridge backend**: [`BridgeSocket`] forwards every call through a
//!   [`ForeignBridge`]; host callbacks are routed back by handle through the
//!   process-wide [`InstanceRegistry`]
//!
//! Key design principles:
//!
//! - Calls are non-blocking requests; outcomes arrive as events
//! - Contract violations are reported synchronously with a typed [`Error`]
//! - Only the [`WebSocketFactory`] decides which backend is used
//!
//! # Quick Start
//!
//! ```no_run
//! use hybrid_websocket::{CloseCode, Result};
//!
//! fn main() -> Result<()> {
//!     let ws = hybrid_websocket::create("wss://echo.example.com")?;
//!
//!     ws.on_open(|| println!("connected"));
//!     ws.on_message(|data| println!("received {} bytes", data.len()));
//!     ws.on_close(|code| println!("closed: {code}"));
//!
//!     ws.connect()?;
//!     // ... once open:
//!     ws.send_text("hello")?;
//!     ws.close(CloseCode::Normal, Some("done"))?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`WebSocket`] contract, events, native backend |
//! | [`bridge`] | Foreign bridge, registry, bridge backend |
//! | [`factory`] | Backend selection and configuration |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe handle and subscription IDs |
//! | [`protocol`] | Close codes and connection state |
//!
//! # Features
//!
//! - `native-tls`: `wss://` through the platform TLS stack
//! - `rustls`: `wss://` through rustls with webpki roots

// ============================================================================
// Modules
// ============================================================================

/// Foreign bridge backend.
///
/// Use [`WebSocketFactory::with_bridge()`] to route clients through a custom
/// bridge.
pub mod bridge;

/// Client contract and the native backend.
pub mod client;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Client factory and configuration.
///
/// Use [`WebSocketFactory::builder()`] to create a configured factory.
pub mod factory;

/// Type-safe identifiers.
pub mod identifiers;

/// WebSocket protocol values.
pub mod protocol;

/// tokio-tungstenite transport for the native backend.
#[cfg(not(target_arch = "wasm32"))]
mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Bridge types
#[cfg(target_arch = "wasm32")]
pub use bridge::JsLibBridge;
pub use bridge::{BridgeHooks, BridgeSocket, ForeignBridge, InstanceRegistry};

// Client types
#[cfg(not(target_arch = "wasm32"))]
pub use client::NativeSocket;
pub use client::{BackendKind, SocketEvents, WebSocket};

// Factory types
#[cfg(not(target_arch = "wasm32"))]
pub use factory::NativeOptions;
pub use factory::{Environment, FactoryBuilder, WebSocketFactory};

// Error types
pub use error::{Error, ErrorKind, Result};

// Identifier types
pub use identifiers::{Handle, SubscriptionId};

// Protocol types
pub use protocol::{CloseCode, ConnectionState, MAX_CLOSE_REASON_BYTES};

// ============================================================================
// Entry Point
// ============================================================================

/// Creates a client for `url` on the environment's default backend.
///
/// Shorthand for `WebSocketFactory::new().create(url)`. Does not connect.
///
/// # Errors
///
/// See [`WebSocketFactory::create`].
pub fn create(url: &str) -> Result<Box<dyn WebSocket>> {
    WebSocketFactory::new().create(url)
}
