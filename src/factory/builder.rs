//! Builder pattern for factory configuration.
//!
//! Provides a fluent API for configuring and creating [`WebSocketFactory`]
//! instances.
//!
//! # Example
//!
//! ```no_run
//! use hybrid_websocket::WebSocketFactory;
//!
//! # fn example() -> hybrid_websocket::Result<()> {
//! let factory = WebSocketFactory::builder()
//!     .protocol("chat")
//!     .header("Authorization", "Bearer token")
//!     .build()?;
//! let ws = factory.create("wss://example.com/socket")?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::bridge::ForeignBridge;
use crate::error::Result;

use super::core::{Backend, WebSocketFactory};
#[cfg(not(target_arch = "wasm32"))]
use super::options::NativeOptions;
#[cfg(not(target_arch = "wasm32"))]
use tokio::runtime::Handle as RuntimeHandle;

// ============================================================================
// FactoryBuilder
// ============================================================================

/// Builder for configuring a [`WebSocketFactory`].
///
/// Use [`WebSocketFactory::builder()`] to create a new builder. Without a
/// bridge the factory uses the environment's default backend.
#[derive(Default, Clone)]
pub struct FactoryBuilder {
    /// Options for native clients.
    #[cfg(not(target_arch = "wasm32"))]
    native: NativeOptions,
    /// Bridge that overrides the environment default.
    bridge: Option<Arc<dyn ForeignBridge>>,
}

impl fmt::Debug for FactoryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("FactoryBuilder");
        #[cfg(not(target_arch = "wasm32"))]
        debug.field("native", &self.native);
        debug.field("bridge", &self.bridge.is_some()).finish()
    }
}

// ============================================================================
// FactoryBuilder Implementation
// ============================================================================

impl FactoryBuilder {
    /// Creates a new builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes every client through `bridge`, whatever the environment.
    ///
    /// Native options are ignored when a bridge is set.
    #[inline]
    #[must_use]
    pub fn bridge(mut self, bridge: Arc<dyn ForeignBridge>) -> Self {
        self.bridge = Some(bridge);
        self
    }

    /// Builds the factory.
    ///
    /// # Errors
    ///
    /// Unexpected error if a configured header, origin or sub-protocol is not
    /// valid header content.
    pub fn build(self) -> Result<WebSocketFactory> {
        if let Some(bridge) = self.bridge {
            debug!("Factory configured with explicit bridge");
            return Ok(WebSocketFactory::from_backend(Backend::Bridge(bridge)));
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            self.native.validate()?;
            Ok(WebSocketFactory::from_backend(Backend::Native(self.native)))
        }

        #[cfg(target_arch = "wasm32")]
        {
            Ok(WebSocketFactory::new())
        }
    }
}

// ============================================================================
// Native Options
// ============================================================================

#[cfg(not(target_arch = "wasm32"))]
impl FactoryBuilder {
    /// Replaces the native options wholesale.
    #[inline]
    #[must_use]
    pub fn native_options(mut self, options: NativeOptions) -> Self {
        self.native = options;
        self
    }

    /// Adds a handshake header.
    #[inline]
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.native = self.native.with_header(name, value);
        self
    }

    /// Adds a requested sub-protocol.
    #[inline]
    #[must_use]
    pub fn protocol(mut self, protocol: impl Into<String>) -> Self {
        self.native = self.native.with_protocol(protocol);
        self
    }

    /// Sets the `Origin` header.
    #[inline]
    #[must_use]
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.native = self.native.with_origin(origin);
        self
    }

    /// Runs connection tasks on `runtime`.
    #[inline]
    #[must_use]
    pub fn runtime(mut self, runtime: RuntimeHandle) -> Self {
        self.native = self.native.with_runtime(runtime);
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
