//! WebSocket factory implementation.
//!
//! The factory is the only place that decides which backend an instance
//! runs on.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
#[cfg(any(target_arch = "wasm32", test))]
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::bridge::{BridgeSocket, ForeignBridge};
use crate::client::{BackendKind, WebSocket};
use crate::error::Result;

#[cfg(not(target_arch = "wasm32"))]
use crate::client::NativeSocket;
#[cfg(not(target_arch = "wasm32"))]
use crate::factory::options::NativeOptions;

use super::builder::FactoryBuilder;

// ============================================================================
// Environment
// ============================================================================

/// Execution environment the crate was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Environment {
    /// Real OS sockets and threads.
    Native,
    /// Sandboxed host that owns the sockets, e.g. `wasm32` in a page.
    Sandboxed,
}

impl Environment {
    /// Returns the environment of the current build target.
    #[inline]
    #[must_use]
    pub const fn detect() -> Self {
        if cfg!(target_arch = "wasm32") {
            Self::Sandboxed
        } else {
            Self::Native
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => f.write_str("native"),
            Self::Sandboxed => f.write_str("sandboxed"),
        }
    }
}

// ============================================================================
// Backend
// ============================================================================

/// Default bridge for sandboxed builds.
///
/// One allocation per process: the registry binds to a single bridge by
/// identity, so every default factory must hand out the same `Arc`.
#[cfg(target_arch = "wasm32")]
static PLATFORM_BRIDGE: LazyLock<Arc<dyn ForeignBridge>> =
    LazyLock::new(|| Arc::new(crate::bridge::JsLibBridge));

/// Backend selected for new instances.
#[derive(Clone)]
pub(crate) enum Backend {
    /// In-process sockets with the given options.
    #[cfg(not(target_arch = "wasm32"))]
    Native(NativeOptions),
    /// Host sockets through a bridge.
    Bridge(Arc<dyn ForeignBridge>),
}

impl Backend {
    /// Backend for the current build target.
    fn platform_default() -> Self {
        #[cfg(target_arch = "wasm32")]
        {
            Self::shared_bridge(&PLATFORM_BRIDGE)
        }
        #[cfg(not(target_arch = "wasm32"))]
        {
            Self::Native(NativeOptions::default())
        }
    }

    /// Bridge backend over a process-wide bridge.
    #[cfg(any(target_arch = "wasm32", test))]
    fn shared_bridge(bridge: &'static LazyLock<Arc<dyn ForeignBridge>>) -> Self {
        Self::Bridge(Arc::clone(LazyLock::force(bridge)))
    }

    fn kind(&self) -> BackendKind {
        match self {
            #[cfg(not(target_arch = "wasm32"))]
            Self::Native(_) => BackendKind::Native,
            Self::Bridge(_) => BackendKind::Bridge,
        }
    }
}

// ============================================================================
// WebSocketFactory
// ============================================================================

/// Creates [`WebSocket`] clients on the backend for the environment.
///
/// # Example
///
/// ```no_run
/// use hybrid_websocket::WebSocketFactory;
///
/// # fn example() -> hybrid_websocket::Result<()> {
/// let factory = WebSocketFactory::new();
/// let ws = factory.create("ws://127.0.0.1:9001")?;
/// ws.on_open(|| println!("open"));
/// ws.connect()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct WebSocketFactory {
    backend: Backend,
}

impl fmt::Debug for WebSocketFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocketFactory")
            .field("backend", &self.backend.kind())
            .finish()
    }
}

impl Default for WebSocketFactory {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// WebSocketFactory - Constructors
// ============================================================================

impl WebSocketFactory {
    /// Creates a factory for the detected environment.
    #[must_use]
    pub fn new() -> Self {
        Self::from_backend(Backend::platform_default())
    }

    /// Creates a factory that allocates every client through `bridge`.
    #[must_use]
    pub fn with_bridge(bridge: Arc<dyn ForeignBridge>) -> Self {
        Self::from_backend(Backend::Bridge(bridge))
    }

    /// Creates a factory configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> FactoryBuilder {
        FactoryBuilder::new()
    }

    pub(crate) fn from_backend(backend: Backend) -> Self {
        Self { backend }
    }
}

// ============================================================================
// WebSocketFactory - Public API
// ============================================================================

impl WebSocketFactory {
    /// Returns the backend new clients run on.
    #[inline]
    #[must_use]
    pub fn backend(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Returns the environment new clients target.
    #[inline]
    #[must_use]
    pub fn environment(&self) -> Environment {
        match self.backend.kind() {
            BackendKind::Native => Environment::Native,
            BackendKind::Bridge => Environment::Sandboxed,
        }
    }

    /// Creates a client for `url`. Does not connect.
    ///
    /// # Errors
    ///
    /// - native: unexpected error if the URL or options are invalid
    /// - bridge: the typed error for a negative allocation status, or an
    ///   unexpected error if the URL contains a NUL byte
    pub fn create(&self, url: &str) -> Result<Box<dyn WebSocket>> {
        debug!(url, backend = %self.backend.kind(), "Creating WebSocket client");

        match &self.backend {
            #[cfg(not(target_arch = "wasm32"))]
            Backend::Native(options) => Ok(Box::new(NativeSocket::new(url, options.clone())?)),
            Backend::Bridge(bridge) => Ok(Box::new(BridgeSocket::create(url, Arc::clone(bridge))?)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
