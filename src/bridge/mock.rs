//! In-process stand-in for the host JS library.
//!
//! Keeps a ready state per handle, answers with the same statuses as the
//! host, records outbound calls, and injects host events through the
//! installed hooks. One instance is shared by every test because the
//! process-wide registry binds to a single bridge.

// ============================================================================
// Imports
// ============================================================================

use std::ffi::{CStr, CString};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::bridge::ffi::{BridgeHooks, ForeignBridge};
use crate::bridge::registry::InstanceRegistry;
use crate::bridge::socket::BridgeSocket;
use crate::identifiers::Handle;

// ============================================================================
// Constants
// ============================================================================

const CONNECTING: i32 = 0;
const OPEN: i32 = 1;
const CLOSING: i32 = 2;
const CLOSED: i32 = 3;

static MOCK: LazyLock<Arc<MockBridge>> = LazyLock::new(|| Arc::new(MockBridge::default()));

// ============================================================================
// Types
// ============================================================================

/// Outbound call observed by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MockCall {
    Connect,
    Send(Vec<u8>),
    SendText(String),
    Close { code: u16, reason: Option<String> },
}

#[derive(Debug)]
struct MockInstance {
    state: i32,
    calls: Vec<MockCall>,
}

/// Host emulation.
#[derive(Debug)]
pub(crate) struct MockBridge {
    next_handle: AtomicI32,
    instances: Mutex<FxHashMap<Handle, MockInstance>>,
    /// Freed handles, with whether they were still registered at that point.
    freed: Mutex<FxHashMap<Handle, bool>>,
    failing_urls: Mutex<FxHashMap<String, i32>>,
    hooks: Mutex<Option<BridgeHooks>>,
}

impl Default for MockBridge {
    fn default() -> Self {
        Self {
            next_handle: AtomicI32::new(1),
            instances: Mutex::new(FxHashMap::default()),
            freed: Mutex::new(FxHashMap::default()),
            failing_urls: Mutex::new(FxHashMap::default()),
            hooks: Mutex::new(None),
        }
    }
}

// ============================================================================
// MockBridge - Test API
// ============================================================================

impl MockBridge {
    /// Returns the shared mock.
    pub(crate) fn global() -> &'static Arc<Self> {
        LazyLock::force(&MOCK)
    }

    /// Returns the shared mock as a bridge.
    pub(crate) fn shared() -> Arc<dyn ForeignBridge> {
        Arc::clone(Self::global()) as Arc<dyn ForeignBridge>
    }

    /// Creates a socket on the shared mock.
    pub(crate) fn socket(url: &str) -> BridgeSocket {
        BridgeSocket::create(url, Self::shared()).expect("mock socket")
    }

    /// Makes allocation of `url` fail with `status`.
    pub(crate) fn fail_url(&self, url: &str, status: i32) {
        self.failing_urls.lock().insert(url.to_string(), status);
    }

    /// Returns the outbound calls recorded for `handle`.
    pub(crate) fn calls(&self, handle: Handle) -> Vec<MockCall> {
        self.instances
            .lock()
            .get(&handle)
            .map(|instance| instance.calls.clone())
            .unwrap_or_default()
    }

    pub(crate) fn is_freed(&self, handle: Handle) -> bool {
        self.freed.lock().contains_key(&handle)
    }

    pub(crate) fn was_unregistered_before_free(&self, handle: Handle) -> bool {
        self.freed.lock().get(&handle) == Some(&false)
    }

    /// Drops the host side of `handle` without telling the client.
    pub(crate) fn forget(&self, handle: Handle) {
        self.instances.lock().remove(&handle);
    }

    pub(crate) fn fire_open(&self, handle: Handle) {
        self.set_state(handle, OPEN);
        (self.hooks().on_open)(handle.as_raw());
    }

    pub(crate) fn fire_message(&self, handle: Handle, data: &[u8]) {
        let len = i32::try_from(data.len()).expect("message fits i32");
        // SAFETY: `data` is valid for `len` bytes for the whole call.
        unsafe { (self.hooks().on_message)(handle.as_raw(), data.as_ptr(), len) };
    }

    pub(crate) fn fire_error(&self, handle: Handle, message: &str) {
        let message = CString::new(message).expect("no interior NUL");
        // SAFETY: `message` is NUL-terminated and outlives the call.
        unsafe { (self.hooks().on_error)(handle.as_raw(), message.as_ptr()) };
    }

    pub(crate) fn fire_remote_close(&self, handle: Handle, code: i32) {
        self.set_state(handle, CLOSED);
        (self.hooks().on_close)(handle.as_raw(), code);
    }

    fn hooks(&self) -> BridgeHooks {
        self.hooks.lock().expect("hooks installed")
    }

    fn set_state(&self, handle: Handle, state: i32) {
        if let Some(instance) = self.instances.lock().get_mut(&handle) {
            instance.state = state;
        }
    }

    /// Runs `op` on the instance, or returns `-1` for an unknown handle.
    fn with_instance(&self, handle: Handle, op: impl FnOnce(&mut MockInstance) -> i32) -> i32 {
        match self.instances.lock().get_mut(&handle) {
            Some(instance) => op(instance),
            None => -1,
        }
    }
}

// ============================================================================
// MockBridge - ForeignBridge
// ============================================================================

impl ForeignBridge for MockBridge {
    fn allocate(&self, url: &CStr) -> i32 {
        let url = url.to_string_lossy();
        if let Some(status) = self.failing_urls.lock().get(url.as_ref()) {
            return *status;
        }

        let raw = self.next_handle.fetch_add(1, Ordering::SeqCst);
        self.instances.lock().insert(
            Handle::new(raw),
            MockInstance {
                state: CLOSED,
                calls: Vec::new(),
            },
        );
        raw
    }

    fn free(&self, handle: Handle) {
        let registered = InstanceRegistry::global().contains(handle);
        self.freed.lock().insert(handle, registered);
        self.set_state(handle, CLOSED);
    }

    fn connect(&self, handle: Handle) -> i32 {
        self.with_instance(handle, |instance| {
            if instance.state != CLOSED {
                return -2;
            }
            instance.state = CONNECTING;
            instance.calls.push(MockCall::Connect);
            0
        })
    }

    fn close(&self, handle: Handle, code: u16, reason: Option<&CStr>) -> i32 {
        self.with_instance(handle, |instance| match instance.state {
            CLOSING => -4,
            CLOSED => -5,
            _ => {
                instance.state = CLOSING;
                instance.calls.push(MockCall::Close {
                    code,
                    reason: reason.map(|r| r.to_string_lossy().into_owned()),
                });
                0
            }
        })
    }

    fn send(&self, handle: Handle, data: &[u8]) -> i32 {
        self.with_instance(handle, |instance| {
            if instance.state != OPEN {
                return -6;
            }
            instance.calls.push(MockCall::Send(data.to_vec()));
            0
        })
    }

    fn send_text(&self, handle: Handle, text: &CStr) -> i32 {
        self.with_instance(handle, |instance| {
            if instance.state != OPEN {
                return -6;
            }
            instance
                .calls
                .push(MockCall::SendText(text.to_string_lossy().into_owned()));
            0
        })
    }

    fn get_state(&self, handle: Handle) -> i32 {
        self.with_instance(handle, |instance| instance.state)
    }

    fn install_hooks(&self, hooks: BridgeHooks) {
        *self.hooks.lock() = Some(hooks);
    }
}
