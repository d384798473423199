//! Foreign interface of the bridge backend.
//!
//! Outbound calls go through [`ForeignBridge`]. Inbound callbacks arrive
//! through the four function pointers in [`BridgeHooks`], which the host
//! stores once and calls with the instance handle.
//!
//! # Status Convention
//!
//! Every fallible outbound call returns an `i32`: zero or a positive value on
//! success, a negative status from [`ErrorKind::from_status`] on failure.
//!
//! [`ErrorKind::from_status`]: crate::ErrorKind::from_status

// ============================================================================
// Imports
// ============================================================================

use std::ffi::{CStr, c_char};
use std::panic::{self, AssertUnwindSafe};

use tracing::{error, trace};

use crate::bridge::registry::InstanceRegistry;
use crate::identifiers::Handle;

// ============================================================================
// Hook Types
// ============================================================================

/// Called when the host socket opens: `(handle)`.
pub type OpenHook = extern "C" fn(i32);

/// Called for each received message: `(handle, data, len)`.
///
/// `data` is only valid for the duration of the call.
pub type MessageHook = unsafe extern "C" fn(i32, *const u8, i32);

/// Called for each error report: `(handle, message)`.
///
/// `message` is a NUL-terminated string valid for the duration of the call.
pub type ErrorHook = unsafe extern "C" fn(i32, *const c_char);

/// Called when the host socket closes: `(handle, close_code)`.
pub type CloseHook = extern "C" fn(i32, i32);

/// Callback table handed to the host once.
#[derive(Debug, Clone, Copy)]
pub struct BridgeHooks {
    /// Open callback.
    pub on_open: OpenHook,
    /// Message callback.
    pub on_message: MessageHook,
    /// Error callback.
    pub on_error: ErrorHook,
    /// Close callback.
    pub on_close: CloseHook,
}

impl BridgeHooks {
    /// Hooks that route every callback through [`InstanceRegistry::global`].
    #[must_use]
    pub fn registry() -> Self {
        Self {
            on_open: open_hook,
            on_message: message_hook,
            on_error: error_hook,
            on_close: close_hook,
        }
    }
}

// ============================================================================
// ForeignBridge
// ============================================================================

/// Handle-keyed interface to a socket owned by the host.
///
/// Implementations forward to the host unchanged; all contract checks happen
/// in [`BridgeSocket`](crate::bridge::BridgeSocket).
pub trait ForeignBridge: Send + Sync {
    /// Creates a host socket for `url`. Returns the new handle or a status.
    fn allocate(&self, url: &CStr) -> i32;

    /// Releases a host socket, closing it if still connected.
    fn free(&self, handle: Handle);

    /// Starts connecting.
    fn connect(&self, handle: Handle) -> i32;

    /// Starts the close handshake.
    fn close(&self, handle: Handle, code: u16, reason: Option<&CStr>) -> i32;

    /// Sends a binary message.
    fn send(&self, handle: Handle, data: &[u8]) -> i32;

    /// Sends a text message.
    fn send_text(&self, handle: Handle, text: &CStr) -> i32;

    /// Returns the ready-state integer or a status.
    fn get_state(&self, handle: Handle) -> i32;

    /// Stores the callback table. Called once per process.
    fn install_hooks(&self, hooks: BridgeHooks);
}

// ============================================================================
// Hooks
// ============================================================================

/// Runs a dispatch, keeping handler panics on this side of the boundary.
fn guarded(hook: &'static str, handle: i32, dispatch: impl FnOnce()) {
    if panic::catch_unwind(AssertUnwindSafe(dispatch)).is_err() {
        error!(handle, hook, "Event handler panicked");
    }
}

extern "C" fn open_hook(handle: i32) {
    guarded("open", handle, || {
        InstanceRegistry::global().dispatch_open(Handle::new(handle));
    });
}

/// # Safety
///
/// `data` must be null or point to `len` readable bytes.
unsafe extern "C" fn message_hook(handle: i32, data: *const u8, len: i32) {
    if data.is_null() {
        trace!(handle, "Null message payload dropped");
        return;
    }

    let len = usize::try_from(len).unwrap_or(0);
    // SAFETY: the host passes a buffer of `len` bytes that outlives this call.
    let payload = unsafe { std::slice::from_raw_parts(data, len) }.to_vec();

    guarded("message", handle, || {
        InstanceRegistry::global().dispatch_message(Handle::new(handle), &payload);
    });
}

/// # Safety
///
/// `message` must be null or point to a NUL-terminated string.
unsafe extern "C" fn error_hook(handle: i32, message: *const c_char) {
    let message = if message.is_null() {
        String::new()
    } else {
        // SAFETY: the host passes a NUL-terminated string that outlives this call.
        unsafe { CStr::from_ptr(message) }
            .to_string_lossy()
            .into_owned()
    };

    guarded("error", handle, || {
        InstanceRegistry::global().dispatch_error(Handle::new(handle), &message);
    });
}

extern "C" fn close_hook(handle: i32, code: i32) {
    guarded("close", handle, || {
        InstanceRegistry::global().dispatch_close(Handle::new(handle), code);
    });
}

// ============================================================================
// Tests
// ============================================================================
