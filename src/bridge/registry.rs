//! Process-wide instance registry for the bridge backend.
//!
//! Maps foreign handles to live [`BridgeSocket`](crate::bridge::BridgeSocket)
//! state so host callbacks can be routed to the right subscribers.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │            InstanceRegistry              │
//! │  ┌────────────────────────────────────┐  │
//! │  │ Handle=1 → BridgeShared            │  │
//! │  │ Handle=2 → BridgeShared            │  │
//! │  │ Handle=3 → BridgeShared            │  │
//! │  └────────────────────────────────────┘  │
//! └──────────────────────────────────────────┘
//!        ▲ register / unregister       ▲ dispatch_*
//!    BridgeSocket                 host callbacks
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::{Arc, LazyLock, OnceLock};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::bridge::ffi::{BridgeHooks, ForeignBridge};
use crate::bridge::socket::BridgeShared;
use crate::error::{Error, Result};
use crate::identifiers::Handle;

// ============================================================================
// Global
// ============================================================================

/// The registry host callbacks are routed through.
static GLOBAL: LazyLock<Arc<InstanceRegistry>> =
    LazyLock::new(|| Arc::new(InstanceRegistry::new()));

// ============================================================================
// InstanceRegistry
// ============================================================================

/// Handle-keyed table of live bridge instances.
///
/// Thread-safe. Dispatch clones the entry out of the lock before invoking
/// handlers, so handlers may create or drop sockets.
pub struct InstanceRegistry {
    /// Live instances by handle.
    instances: RwLock<FxHashMap<Handle, Arc<BridgeShared>>>,

    /// Bridge whose hooks were installed.
    bridge: OnceLock<Arc<dyn ForeignBridge>>,
}

impl std::fmt::Debug for InstanceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstanceRegistry")
            .field("instances", &self.len())
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

// ============================================================================
// InstanceRegistry - Constructor
// ============================================================================

impl InstanceRegistry {
    fn new() -> Self {
        Self {
            instances: RwLock::new(FxHashMap::default()),
            bridge: OnceLock::new(),
        }
    }

    /// Returns the process-wide registry.
    #[inline]
    #[must_use]
    pub fn global() -> &'static Arc<Self> {
        LazyLock::force(&GLOBAL)
    }

    /// Installs the registry hooks on `bridge`, once.
    ///
    /// Repeated calls with the same bridge are no-ops.
    ///
    /// # Errors
    ///
    /// Unexpected error if a different bridge was installed earlier.
    pub fn initialize(&self, bridge: &Arc<dyn ForeignBridge>) -> Result<()> {
        let installed = self.bridge.get_or_init(|| {
            bridge.install_hooks(BridgeHooks::registry());
            debug!("Bridge hooks installed");
            Arc::clone(bridge)
        });

        if same_bridge(installed, bridge) {
            Ok(())
        } else {
            Err(Error::unexpected(
                "Instance registry is already bound to a different bridge.",
            ))
        }
    }

    /// Returns `true` once hooks were installed.
    #[inline]
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.bridge.get().is_some()
    }
}

// ============================================================================
// InstanceRegistry - Membership
// ============================================================================

impl InstanceRegistry {
    /// Adds an instance under its handle.
    ///
    /// # Errors
    ///
    /// Unexpected error if the handle is already registered.
    pub(crate) fn register(&self, shared: Arc<BridgeShared>) -> Result<()> {
        let handle = shared.handle();
        let mut instances = self.instances.write();

        if instances.contains_key(&handle) {
            return Err(Error::unexpected(format!(
                "Handle {handle} is already registered."
            )));
        }

        instances.insert(handle, shared);
        debug!(%handle, count = instances.len(), "Instance registered");
        Ok(())
    }

    /// Removes an instance. Returns `false` if the handle was absent.
    pub(crate) fn unregister(&self, handle: Handle) -> bool {
        let removed = self.instances.write().remove(&handle).is_some();
        if removed {
            debug!(%handle, "Instance unregistered");
        }
        removed
    }

    /// Returns the instance for `handle`.
    pub(crate) fn lookup(&self, handle: Handle) -> Option<Arc<BridgeShared>> {
        self.instances.read().get(&handle).cloned()
    }

    /// Returns `true` if `handle` names a live instance.
    #[inline]
    #[must_use]
    pub fn contains(&self, handle: Handle) -> bool {
        self.instances.read().contains_key(&handle)
    }

    /// Returns the number of live instances.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.read().len()
    }

    /// Returns `true` if no instance is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.read().is_empty()
    }
}

// ============================================================================
// InstanceRegistry - Dispatch
// ============================================================================

impl InstanceRegistry {
    /// Routes an open callback.
    pub fn dispatch_open(&self, handle: Handle) {
        match self.lookup(handle) {
            Some(shared) => shared.handle_open(),
            None => trace!(%handle, "Open for unknown handle dropped"),
        }
    }

    /// Routes a message callback.
    pub fn dispatch_message(&self, handle: Handle, data: &[u8]) {
        match self.lookup(handle) {
            Some(shared) => shared.handle_message(data),
            None => trace!(%handle, len = data.len(), "Message for unknown handle dropped"),
        }
    }

    /// Routes an error callback.
    pub fn dispatch_error(&self, handle: Handle, message: &str) {
        match self.lookup(handle) {
            Some(shared) => shared.handle_error(message),
            None => trace!(%handle, "Error for unknown handle dropped"),
        }
    }

    /// Routes a close callback.
    pub fn dispatch_close(&self, handle: Handle, code: i32) {
        match self.lookup(handle) {
            Some(shared) => shared.handle_close(code),
            None => trace!(%handle, code, "Close for unknown handle dropped"),
        }
    }
}

/// Compares bridges by data pointer.
fn same_bridge(a: &Arc<dyn ForeignBridge>, b: &Arc<dyn ForeignBridge>) -> bool {
    std::ptr::eq(Arc::as_ptr(a).cast::<()>(), Arc::as_ptr(b).cast::<()>())
}

// ============================================================================
// Tests
// ============================================================================
