//! Per-instance event subscriber lists.
//!
//! Each event keeps an ordered list of handlers. Dispatch snapshots the list
//! and calls handlers outside the lock, in registration order, so a handler
//! may subscribe or unsubscribe (itself included) without deadlocking. Such
//! changes apply from the next dispatch on.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;

use crate::identifiers::SubscriptionId;
use crate::protocol::CloseCode;

// ============================================================================
// Types
// ============================================================================

/// Handler for the open event.
pub type OpenHandler = dyn Fn() + Send + Sync;

/// Handler for received messages. Receives the raw payload bytes.
pub type MessageHandler = dyn Fn(&[u8]) + Send + Sync;

/// Handler for error reports.
pub type ErrorHandler = dyn Fn(&str) + Send + Sync;

/// Handler for the close event.
pub type CloseHandler = dyn Fn(CloseCode) + Send + Sync;

// ============================================================================
// HandlerList
// ============================================================================

/// Ordered list of handlers for one event.
struct HandlerList<F: ?Sized> {
    entries: Mutex<Vec<(SubscriptionId, Arc<F>)>>,
}

impl<F: ?Sized> HandlerList<F> {
    fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    fn add(&self, handler: Arc<F>) -> SubscriptionId {
        let id = SubscriptionId::next();
        self.entries.lock().push((id, handler));
        id
    }

    fn remove(&self, id: SubscriptionId) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    fn snapshot(&self) -> Vec<Arc<F>> {
        self.entries
            .lock()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect()
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }

    fn clear(&self) {
        self.entries.lock().clear();
    }
}

// ============================================================================
// SocketEvents
// ============================================================================

/// The four subscribable events of a client instance.
///
/// # Example
///
/// ```ignore
/// let id = ws.events().on_message(|bytes| println!("{} bytes", bytes.len()));
/// ws.events().unsubscribe(id);
/// ```
pub struct SocketEvents {
    open: HandlerList<OpenHandler>,
    message: HandlerList<MessageHandler>,
    error: HandlerList<ErrorHandler>,
    close: HandlerList<CloseHandler>,
}

impl Default for SocketEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SocketEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketEvents")
            .field("open", &self.open.len())
            .field("message", &self.message.len())
            .field("error", &self.error.len())
            .field("close", &self.close.len())
            .finish()
    }
}

// ============================================================================
// SocketEvents - Subscription
// ============================================================================

impl SocketEvents {
    /// Creates empty subscriber lists.
    #[must_use]
    pub fn new() -> Self {
        Self {
            open: HandlerList::new(),
            message: HandlerList::new(),
            error: HandlerList::new(),
            close: HandlerList::new(),
        }
    }

    /// Subscribes to the open event.
    pub fn on_open(&self, handler: impl Fn() + Send + Sync + 'static) -> SubscriptionId {
        self.open.add(Arc::new(handler))
    }

    /// Subscribes to received messages.
    pub fn on_message(&self, handler: impl Fn(&[u8]) + Send + Sync + 'static) -> SubscriptionId {
        self.message.add(Arc::new(handler))
    }

    /// Subscribes to error reports.
    pub fn on_error(&self, handler: impl Fn(&str) + Send + Sync + 'static) -> SubscriptionId {
        self.error.add(Arc::new(handler))
    }

    /// Subscribes to the close event.
    pub fn on_close(&self, handler: impl Fn(CloseCode) + Send + Sync + 'static) -> SubscriptionId {
        self.close.add(Arc::new(handler))
    }

    /// Removes a subscription from whichever event holds it.
    ///
    /// Returns `false` if the ID is unknown or was already removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.open.remove(id)
            || self.message.remove(id)
            || self.error.remove(id)
            || self.close.remove(id)
    }

    /// Removes every subscription.
    pub fn clear(&self) {
        self.open.clear();
        self.message.clear();
        self.error.clear();
        self.close.clear();
    }

    /// Returns the total number of subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.open.len() + self.message.len() + self.error.len() + self.close.len()
    }
}

// ============================================================================
// SocketEvents - Dispatch
// ============================================================================

impl SocketEvents {
    pub(crate) fn emit_open(&self) {
        for handler in self.open.snapshot() {
            handler();
        }
    }

    pub(crate) fn emit_message(&self, data: &[u8]) {
        for handler in self.message.snapshot() {
            handler(data);
        }
    }

    pub(crate) fn emit_error(&self, message: &str) {
        for handler in self.error.snapshot() {
            handler(message);
        }
    }

    pub(crate) fn emit_close(&self, code: CloseCode) {
        for handler in self.close.snapshot() {
            handler(code);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
