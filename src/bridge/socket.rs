//! Bridge backend adapter.
//!
//! [`BridgeSocket`] drives a socket owned by the host through a
//! [`ForeignBridge`]. The host is authoritative for the connection state:
//! every operation reads it first, applies the same guards as the native
//! backend, then forwards the call and checks the returned status.

// ============================================================================
// Imports
// ============================================================================

use std::ffi::CString;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, trace, warn};

use crate::bridge::ffi::ForeignBridge;
use crate::bridge::registry::InstanceRegistry;
use crate::client::{BackendKind, SocketEvents, WebSocket};
use crate::error::{Error, Result};
use crate::identifiers::Handle;
use crate::protocol::{CloseCode, ConnectionState};

// ============================================================================
// BridgeShared
// ============================================================================

/// Per-handle state reachable from host callbacks.
pub(crate) struct BridgeShared {
    handle: Handle,
    alive: AtomicBool,
    events: SocketEvents,
}

impl BridgeShared {
    pub(crate) fn new(handle: Handle) -> Self {
        Self {
            handle,
            alive: AtomicBool::new(false),
            events: SocketEvents::new(),
        }
    }

    #[inline]
    pub(crate) fn handle(&self) -> Handle {
        self.handle
    }

    #[inline]
    pub(crate) fn events(&self) -> &SocketEvents {
        &self.events
    }

    #[inline]
    pub(crate) fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    pub(crate) fn handle_open(&self) {
        debug!(handle = %self.handle, "Opened");
        self.alive.store(true, Ordering::SeqCst);
        self.events.emit_open();
    }

    pub(crate) fn handle_message(&self, data: &[u8]) {
        trace!(handle = %self.handle, len = data.len(), "Message received");
        self.alive.store(true, Ordering::SeqCst);
        self.events.emit_message(data);
    }

    pub(crate) fn handle_error(&self, message: &str) {
        debug!(handle = %self.handle, error = message, "Error reported");
        self.events.emit_error(message);
    }

    pub(crate) fn handle_close(&self, code: i32) {
        let code = CloseCode::from_code(code);
        debug!(handle = %self.handle, %code, "Closed");
        self.alive.store(false, Ordering::SeqCst);
        self.events.emit_close(code);
    }
}

// ============================================================================
// BridgeSocket
// ============================================================================

/// WebSocket client whose socket lives on the other side of a
/// [`ForeignBridge`].
///
/// Dropping the socket unregisters its handle, then frees the host socket.
pub struct BridgeSocket {
    shared: Arc<BridgeShared>,
    bridge: Arc<dyn ForeignBridge>,
    registry: Arc<InstanceRegistry>,
}

impl fmt::Debug for BridgeSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeSocket")
            .field("handle", &self.shared.handle)
            .field("events", &self.shared.events)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// BridgeSocket - Constructor
// ============================================================================

impl BridgeSocket {
    /// Allocates a host socket for `url` and registers it.
    ///
    /// Installs the registry hooks on `bridge` first if needed. Does not
    /// connect.
    ///
    /// # Errors
    ///
    /// - the typed error for a negative allocation status
    /// - unexpected error if `url` contains a NUL byte, the registry is bound
    ///   to another bridge, or the handle is already registered
    pub fn create(url: &str, bridge: Arc<dyn ForeignBridge>) -> Result<Self> {
        let registry = Arc::clone(InstanceRegistry::global());
        registry.initialize(&bridge)?;

        let url = CString::new(url).map_err(|e| Error::wrap("Failed to create WebSocket client.", e))?;
        let handle = Handle::new(Error::check_status(bridge.allocate(&url))?);

        let shared = Arc::new(BridgeShared::new(handle));
        if let Err(e) = registry.register(Arc::clone(&shared)) {
            bridge.free(handle);
            return Err(e);
        }

        debug!(%handle, "Bridge socket created");

        Ok(Self {
            shared,
            bridge,
            registry,
        })
    }

    /// Returns the host handle.
    #[inline]
    #[must_use]
    pub fn handle(&self) -> Handle {
        self.shared.handle
    }

    /// Returns the host state, surfacing a negative status as an error.
    ///
    /// # Errors
    ///
    /// The typed error for the status, e.g. `InstanceNotFound`.
    pub fn try_state(&self) -> Result<ConnectionState> {
        let raw = Error::check_status(self.bridge.get_state(self.handle()))?;
        Ok(ConnectionState::from_ready_state(raw))
    }
}

// ============================================================================
// BridgeSocket - WebSocket
// ============================================================================

impl WebSocket for BridgeSocket {
    fn connect(&self) -> Result<()> {
        self.try_state()?.ensure_can_connect()?;
        Error::check_status(self.bridge.connect(self.handle()))?;
        debug!(handle = %self.handle(), "Connect requested");
        Ok(())
    }

    fn close(&self, code: CloseCode, reason: Option<&str>) -> Result<()> {
        self.try_state()?.ensure_can_close()?;
        code.validate_close(reason)?;

        let reason = reason
            .map(CString::new)
            .transpose()
            .map_err(|e| Error::wrap("Failed to close the connection.", e))?;

        Error::check_status(
            self.bridge
                .close(self.handle(), code.code(), reason.as_deref()),
        )?;
        debug!(handle = %self.handle(), %code, "Close requested");
        Ok(())
    }

    fn send(&self, data: &[u8]) -> Result<()> {
        self.try_state()?.ensure_can_send()?;
        Error::check_status(self.bridge.send(self.handle(), data))?;
        trace!(handle = %self.handle(), len = data.len(), "Binary message sent");
        Ok(())
    }

    fn send_text(&self, text: &str) -> Result<()> {
        self.try_state()?.ensure_can_send()?;
        let text_c = CString::new(text).map_err(|e| Error::wrap("Failed to send message.", e))?;
        Error::check_status(self.bridge.send_text(self.handle(), &text_c))?;
        trace!(handle = %self.handle(), len = text.len(), "Text message sent");
        Ok(())
    }

    fn state(&self) -> ConnectionState {
        let raw = self.bridge.get_state(self.handle());
        if !(0..=3).contains(&raw) {
            warn!(handle = %self.handle(), state = raw, "Unexpected host state, treating as closed");
        }
        ConnectionState::from_ready_state(raw)
    }

    fn is_alive(&self) -> bool {
        self.shared.is_alive()
    }

    fn events(&self) -> &SocketEvents {
        self.shared.events()
    }

    fn backend(&self) -> BackendKind {
        BackendKind::Bridge
    }
}

impl Drop for BridgeSocket {
    fn drop(&mut self) {
        let handle = self.handle();
        self.registry.unregister(handle);
        self.bridge.free(handle);
        debug!(%handle, "Bridge socket freed");
    }
}

// ============================================================================
// Tests
// ============================================================================
