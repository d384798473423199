//! Default bridge for `wasm32` builds.
//!
//! Binds the `WebSocket*` functions the host page's JS library exports into
//! the `env` import module.

// ============================================================================
// Imports
// ============================================================================

use std::ffi::{CStr, c_char};

use crate::bridge::ffi::{BridgeHooks, CloseHook, ErrorHook, ForeignBridge, MessageHook, OpenHook};
use crate::identifiers::Handle;

// ============================================================================
// Host Imports
// ============================================================================

#[link(wasm_import_module = "env")]
unsafe extern "C" {
    fn WebSocketAllocate(url: *const c_char) -> i32;
    fn WebSocketFree(instance: i32);
    fn WebSocketConnect(instance: i32) -> i32;
    fn WebSocketClose(instance: i32, code: i32, reason: *const c_char) -> i32;
    fn WebSocketSend(instance: i32, data: *const u8, len: i32) -> i32;
    fn WebSocketSendStr(instance: i32, text: *const c_char) -> i32;
    fn WebSocketGetState(instance: i32) -> i32;
    fn WebSocketSetOnOpen(callback: OpenHook);
    fn WebSocketSetOnMessage(callback: MessageHook);
    fn WebSocketSetOnError(callback: ErrorHook);
    fn WebSocketSetOnClose(callback: CloseHook);
}

/// Status for a payload the host length type cannot describe.
const PAYLOAD_TOO_LARGE: i32 = -8;

// ============================================================================
// JsLibBridge
// ============================================================================

/// [`ForeignBridge`] over the host page's JS library.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsLibBridge;

impl ForeignBridge for JsLibBridge {
    fn allocate(&self, url: &CStr) -> i32 {
        // SAFETY: `url` is NUL-terminated; the host copies it before returning.
        unsafe { WebSocketAllocate(url.as_ptr()) }
    }

    fn free(&self, handle: Handle) {
        // SAFETY: plain integer argument.
        unsafe { WebSocketFree(handle.as_raw()) }
    }

    fn connect(&self, handle: Handle) -> i32 {
        // SAFETY: plain integer argument.
        unsafe { WebSocketConnect(handle.as_raw()) }
    }

    fn close(&self, handle: Handle, code: u16, reason: Option<&CStr>) -> i32 {
        let reason = reason.map_or(std::ptr::null(), CStr::as_ptr);
        // SAFETY: `reason` is null or NUL-terminated and outlives the call.
        unsafe { WebSocketClose(handle.as_raw(), i32::from(code), reason) }
    }

    fn send(&self, handle: Handle, data: &[u8]) -> i32 {
        let Ok(len) = i32::try_from(data.len()) else {
            return PAYLOAD_TOO_LARGE;
        };
        // SAFETY: `data` is valid for `len` bytes; the host copies it.
        unsafe { WebSocketSend(handle.as_raw(), data.as_ptr(), len) }
    }

    fn send_text(&self, handle: Handle, text: &CStr) -> i32 {
        // SAFETY: `text` is NUL-terminated; the host copies it.
        unsafe { WebSocketSendStr(handle.as_raw(), text.as_ptr()) }
    }

    fn get_state(&self, handle: Handle) -> i32 {
        // SAFETY: plain integer argument.
        unsafe { WebSocketGetState(handle.as_raw()) }
    }

    fn install_hooks(&self, hooks: BridgeHooks) {
        // SAFETY: the hooks are `'static` functions with the host's signatures.
        unsafe {
            WebSocketSetOnOpen(hooks.on_open);
            WebSocketSetOnMessage(hooks.on_message);
            WebSocketSetOnError(hooks.on_error);
            WebSocketSetOnClose(hooks.on_close);
        }
    }
}
