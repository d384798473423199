//! Native backend adapter.
//!
//! [`NativeSocket`] runs the client in-process over
//! [`transport::Connection`](crate::transport) and mirrors the connection
//! state locally so every contract check happens before work is handed to the
//! I/O task.
//!
//! # Example
//!
//! ```no_run
//! use hybrid_websocket::{NativeOptions, NativeSocket, WebSocket};
//!
//! # fn example() -> hybrid_websocket::Result<()> {
//! let ws = NativeSocket::new("ws://127.0.0.1:9001", NativeOptions::new())?;
//! ws.events().on_message(|data| println!("{} bytes", data.len()));
//! ws.connect()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tokio::runtime::{Builder as RuntimeBuilder, Handle as RuntimeHandle, Runtime};
use tracing::debug;
use url::Url;

use crate::client::{BackendKind, SocketEvents, WebSocket};
use crate::error::{Error, Result};
use crate::factory::NativeOptions;
use crate::protocol::state::StateCell;
use crate::protocol::{CloseCode, ConnectionState};
use crate::transport::{ConnectParams, Connection, EventSink, TransportEvent};

// ============================================================================
// Constants
// ============================================================================

/// Message for construction failures.
const CREATE_FAILED: &str = "Failed to create WebSocket client.";

/// Message for connect failures after the state check.
const CONNECT_FAILED: &str = "Failed to connect.";

/// Worker threads of the fallback runtime.
const FALLBACK_WORKERS: usize = 2;

/// Process-wide runtime used when no ambient runtime exists.
static FALLBACK_RUNTIME: OnceLock<Runtime> = OnceLock::new();

// ============================================================================
// NativeShared
// ============================================================================

/// State shared between the socket and its I/O task.
struct NativeShared {
    state: StateCell,
    alive: AtomicBool,
    /// Set once the owning socket is dropped; later events are discarded.
    detached: AtomicBool,
    events: SocketEvents,
}

impl NativeShared {
    /// Translates a transport event into the contract.
    fn handle_event(&self, event: TransportEvent) {
        if self.detached.load(Ordering::SeqCst) {
            return;
        }

        match event {
            TransportEvent::Open => {
                if self
                    .state
                    .transition(ConnectionState::Connecting, ConnectionState::Open)
                {
                    self.alive.store(true, Ordering::SeqCst);
                    self.events.emit_open();
                } else {
                    debug!("Open suppressed, close already requested");
                }
            }

            TransportEvent::Message(data) => {
                if data.is_empty() {
                    return;
                }
                self.alive.store(true, Ordering::SeqCst);
                self.events.emit_message(&data);
            }

            TransportEvent::Error(message) => {
                self.events.emit_error(&message);
            }

            TransportEvent::Closed { code } => {
                self.state.store(ConnectionState::Closed);
                self.alive.store(false, Ordering::SeqCst);
                self.events.emit_close(CloseCode::from(code));
            }
        }
    }
}

// ============================================================================
// NativeSocket
// ============================================================================

/// WebSocket client running in this process.
///
/// Events are delivered on the runtime's worker threads.
pub struct NativeSocket {
    /// Validated `ws://` or `wss://` URL.
    url: Url,
    /// Handshake settings, reapplied on every connect.
    options: NativeOptions,
    /// Runtime that runs connection tasks.
    runtime: RuntimeHandle,
    /// State shared with the I/O task.
    shared: Arc<NativeShared>,
    /// Current connection attempt, if any.
    connection: Mutex<Option<Connection>>,
}

impl fmt::Debug for NativeSocket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeSocket")
            .field("url", &self.url.as_str())
            .field("state", &self.shared.state.load())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// NativeSocket - Constructor
// ============================================================================

impl NativeSocket {
    /// Creates a client for `url` without connecting.
    ///
    /// # Errors
    ///
    /// Unexpected error wrapping the cause if the URL is invalid, its scheme is
    /// not `ws`/`wss`, the handshake request cannot be built, or no runtime is
    /// available.
    pub fn new(url: &str, options: NativeOptions) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| Error::wrap(CREATE_FAILED, e))?;

        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(Error::wrap(
                CREATE_FAILED,
                format!("unsupported scheme: {}", url.scheme()),
            ));
        }

        options
            .to_request(&url)
            .map_err(|e| Error::wrap(CREATE_FAILED, e))?;

        let runtime = resolve_runtime(options.runtime.as_ref())?;

        debug!(url = %url, "Native socket created");

        Ok(Self {
            url,
            options,
            runtime,
            shared: Arc::new(NativeShared {
                state: StateCell::new(),
                alive: AtomicBool::new(false),
                detached: AtomicBool::new(false),
                events: SocketEvents::new(),
            }),
            connection: Mutex::new(None),
        })
    }

    /// Returns the URL this client connects to.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }
}

// ============================================================================
// NativeSocket - Internals
// ============================================================================

impl NativeSocket {
    fn event_sink(&self) -> EventSink {
        let shared = Arc::clone(&self.shared);
        Arc::new(move |event| shared.handle_event(event))
    }

    /// Runs `op` on the current connection.
    ///
    /// A failure means the I/O task is gone, so the mirrored state is reset.
    fn with_connection(
        &self,
        connection: Option<&Connection>,
        failure: &'static str,
        op: impl FnOnce(&Connection) -> Result<()>,
    ) -> Result<()> {
        let result = match connection {
            Some(connection) => op(connection),
            None => Err(Error::wrap(failure, "no active connection")),
        };

        if result.is_err() {
            self.shared.state.store(ConnectionState::Closed);
            self.shared.alive.store(false, Ordering::SeqCst);
        }
        result
    }
}

// ============================================================================
// NativeSocket - WebSocket
// ============================================================================

impl WebSocket for NativeSocket {
    fn connect(&self) -> Result<()> {
        let mut slot = self.connection.lock();
        self.shared.state.begin_connect()?;

        let request = match self.options.to_request(&self.url) {
            Ok(request) => request,
            Err(e) => {
                self.shared.state.store(ConnectionState::Closed);
                return Err(Error::wrap(CONNECT_FAILED, e));
            }
        };

        let params = ConnectParams {
            request,
            config: self.options.stream_config(),
            disable_nagle: self.options.nodelay,
        };

        *slot = Some(Connection::spawn(&self.runtime, params, self.event_sink()));

        debug!(url = %self.url, "Connect requested");
        Ok(())
    }

    fn close(&self, code: CloseCode, reason: Option<&str>) -> Result<()> {
        let slot = self.connection.lock();

        self.shared.state.load().ensure_can_close()?;
        code.validate_close(reason)?;
        let from = self.shared.state.begin_close()?;

        debug!(url = %self.url, %code, from = %from, "Close requested");

        let reason = reason.unwrap_or_default().to_string();
        self.with_connection(
            slot.as_ref(),
            "Failed to close the connection.",
            |connection| connection.close(code.code(), reason),
        )
    }

    fn send(&self, data: &[u8]) -> Result<()> {
        self.shared.state.load().ensure_can_send()?;

        let slot = self.connection.lock();
        self.with_connection(slot.as_ref(), "Failed to send message.", |connection| {
            connection.send_binary(data.to_vec())
        })
    }

    fn send_text(&self, text: &str) -> Result<()> {
        self.shared.state.load().ensure_can_send()?;

        let slot = self.connection.lock();
        self.with_connection(slot.as_ref(), "Failed to send message.", |connection| {
            connection.send_text(text.to_string())
        })
    }

    fn state(&self) -> ConnectionState {
        self.shared.state.load()
    }

    fn is_alive(&self) -> bool {
        self.shared.alive.load(Ordering::SeqCst)
    }

    fn events(&self) -> &SocketEvents {
        &self.shared.events
    }

    fn backend(&self) -> BackendKind {
        BackendKind::Native
    }
}

impl Drop for NativeSocket {
    fn drop(&mut self) {
        self.shared.detached.store(true, Ordering::SeqCst);
        // Dropping the connection closes the command channel and ends the task.
        if self.connection.get_mut().take().is_some() {
            debug!(url = %self.url, "Native socket dropped, connection detached");
        }
    }
}

// ============================================================================
// Runtime Selection
// ============================================================================

/// Picks the runtime for connection tasks.
///
/// Order: explicit handle, ambient runtime, process-wide fallback.
fn resolve_runtime(explicit: Option<&RuntimeHandle>) -> Result<RuntimeHandle> {
    if let Some(handle) = explicit {
        return Ok(handle.clone());
    }
    if let Ok(handle) = RuntimeHandle::try_current() {
        return Ok(handle);
    }
    fallback_runtime()
}

fn fallback_runtime() -> Result<RuntimeHandle> {
    if let Some(runtime) = FALLBACK_RUNTIME.get() {
        return Ok(runtime.handle().clone());
    }

    let runtime = RuntimeBuilder::new_multi_thread()
        .worker_threads(FALLBACK_WORKERS)
        .thread_name("hybrid-ws-io")
        .enable_all()
        .build()
        .map_err(|e| Error::wrap(CREATE_FAILED, e))?;

    debug!(workers = FALLBACK_WORKERS, "Fallback runtime started");

    // Another thread may have won the race; its runtime is kept.
    let _ = FALLBACK_RUNTIME.set(runtime);
    FALLBACK_RUNTIME
        .get()
        .map(|runtime| runtime.handle().clone())
        .ok_or_else(|| Error::unexpected(CREATE_FAILED))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use tokio::net::TcpListener;
    use tokio::sync::mpsc::{self, UnboundedReceiver};
    use tokio::time::timeout;
    use tokio_tungstenite::tungstenite::Message;
    use tokio_tungstenite::tungstenite::protocol::CloseFrame;
    use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;

    use crate::error::ErrorKind;

    const WAIT: Duration = Duration::from_secs(5);

    #[derive(Debug, PartialEq, Eq)]
    enum Seen {
        Open,
        Message(Vec<u8>),
        Error,
        Close(CloseCode),
    }

    fn observe(ws: &NativeSocket) -> UnboundedReceiver<Seen> {
        let (tx, rx) = mpsc::unbounded_channel();
        let events = ws.events();

        let open_tx = tx.clone();
        events.on_open(move || {
            let _ = open_tx.send(Seen::Open);
        });
        let message_tx = tx.clone();
        events.on_message(move |data| {
            let _ = message_tx.send(Seen::Message(data.to_vec()));
        });
        let error_tx = tx.clone();
        events.on_error(move |_| {
            let _ = error_tx.send(Seen::Error);
        });
        events.on_close(move |code| {
            let _ = tx.send(Seen::Close(code));
        });

        rx
    }

    async fn next(rx: &mut UnboundedReceiver<Seen>) -> Seen {
        timeout(WAIT, rx.recv())
            .await
            .expect("event in time")
            .expect("handlers alive")
    }

    async fn echo_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                        return;
                    };
                    while let Some(Ok(msg)) = ws.next().await {
                        if (msg.is_text() || msg.is_binary()) && ws.send(msg).await.is_err() {
                            break;
                        }
                    }
                });
            }
        });
        format!("ws://127.0.0.1:{port}")
    }

    /// Server that closes every connection with `code` right after the handshake.
    async fn closing_server(code: u16) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                        return;
                    };
                    let frame = CloseFrame {
                        code: WsCloseCode::from(code),
                        reason: "".into(),
                    };
                    let _ = ws.send(Message::Close(Some(frame))).await;
                    while let Some(Ok(_)) = ws.next().await {}
                });
            }
        });
        format!("ws://127.0.0.1:{port}")
    }

    /// Listener that accepts TCP but never answers the handshake.
    async fn silent_server() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();
        (listener, format!("ws://127.0.0.1:{port}"))
    }

    #[test]
    fn test_new_rejects_invalid_url() {
        let err = NativeSocket::new("not a url", NativeOptions::new()).unwrap_err();
        assert!(err.is_unexpected());
        assert_eq!(err.to_string(), CREATE_FAILED);
    }

    #[test]
    fn test_new_rejects_http_scheme() {
        let err = NativeSocket::new("http://example.com", NativeOptions::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unknown);
    }

    #[test]
    fn test_new_without_ambient_runtime_uses_fallback() {
        let ws = NativeSocket::new("ws://127.0.0.1:1", NativeOptions::new()).expect("create");
        assert_eq!(ws.state(), ConnectionState::Closed);
        assert!(!ws.is_alive());
        assert_eq!(ws.backend(), BackendKind::Native);
    }

    #[tokio::test]
    async fn test_calls_before_connect() {
        let ws = NativeSocket::new("ws://127.0.0.1:1", NativeOptions::new()).expect("create");

        assert_eq!(ws.send(&[1, 2, 3]).unwrap_err().kind(), ErrorKind::NotOpen);
        assert_eq!(ws.send_text("hi").unwrap_err().kind(), ErrorKind::NotOpen);
        assert_eq!(ws.close_normal().unwrap_err().kind(), ErrorKind::AlreadyClosed);
        assert_eq!(ws.state(), ConnectionState::Closed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_roundtrip_against_echo_server() {
        let url = echo_server().await;
        let ws = NativeSocket::new(&url, NativeOptions::new().with_nodelay()).expect("create");
        let mut rx = observe(&ws);

        ws.connect().expect("connect");
        assert_eq!(next(&mut rx).await, Seen::Open);
        assert_eq!(ws.state(), ConnectionState::Open);
        assert!(ws.is_alive());

        ws.send(&[1, 2, 3]).expect("send binary");
        assert_eq!(next(&mut rx).await, Seen::Message(vec![1, 2, 3]));

        ws.send_text("hello").expect("send text");
        assert_eq!(next(&mut rx).await, Seen::Message(b"hello".to_vec()));

        ws.close(CloseCode::Normal, Some("bye")).expect("close");
        // The local peer may already have answered.
        assert!(matches!(
            ws.state(),
            ConnectionState::Closing | ConnectionState::Closed
        ));
        assert!(matches!(
            ws.close_normal().unwrap_err().kind(),
            ErrorKind::AlreadyClosing | ErrorKind::AlreadyClosed
        ));

        assert_eq!(next(&mut rx).await, Seen::Close(CloseCode::Normal));
        assert_eq!(ws.state(), ConnectionState::Closed);
        assert!(!ws.is_alive());
        assert_eq!(ws.close_normal().unwrap_err().kind(), ErrorKind::AlreadyClosed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_connect_while_open_is_rejected() {
        let url = echo_server().await;
        let ws = NativeSocket::new(&url, NativeOptions::new()).expect("create");
        let mut rx = observe(&ws);

        ws.connect().expect("connect");
        assert_eq!(next(&mut rx).await, Seen::Open);

        let err = ws.connect().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyConnectedOrConnecting);
        assert!(err.is_invalid_state());
        assert_eq!(ws.state(), ConnectionState::Open);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_reconnect_after_close() -> anyhow::Result<()> {
        let url = echo_server().await;
        let ws = NativeSocket::new(&url, NativeOptions::new())?;
        let mut rx = observe(&ws);

        ws.connect()?;
        assert_eq!(next(&mut rx).await, Seen::Open);
        ws.close_normal()?;
        assert_eq!(next(&mut rx).await, Seen::Close(CloseCode::Normal));

        ws.connect()?;
        assert_eq!(next(&mut rx).await, Seen::Open);
        ws.send_text("again")?;
        assert_eq!(next(&mut rx).await, Seen::Message(b"again".to_vec()));
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_calls_while_connecting() {
        let (_listener, url) = silent_server().await;
        let ws = NativeSocket::new(&url, NativeOptions::new()).expect("create");

        ws.connect().expect("connect");
        assert_eq!(ws.state(), ConnectionState::Connecting);

        assert_eq!(ws.send(b"x").unwrap_err().kind(), ErrorKind::NotOpen);
        assert_eq!(
            ws.connect().unwrap_err().kind(),
            ErrorKind::AlreadyConnectedOrConnecting
        );

        ws.close_normal().expect("close while connecting");
        assert_eq!(ws.state(), ConnectionState::Closing);

        assert_eq!(ws.send(b"late").unwrap_err().kind(), ErrorKind::NotOpen);
        assert_eq!(ws.send_text("late").unwrap_err().kind(), ErrorKind::NotOpen);
        assert_eq!(ws.state(), ConnectionState::Closing);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_invalid_close_arguments() {
        let url = echo_server().await;
        let ws = NativeSocket::new(&url, NativeOptions::new()).expect("create");
        let mut rx = observe(&ws);

        ws.connect().expect("connect");
        assert_eq!(next(&mut rx).await, Seen::Open);

        let err = ws.close(CloseCode::Abnormal, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCloseArgument);

        let long_reason = "r".repeat(124);
        let err = ws.close(CloseCode::Normal, Some(&long_reason)).unwrap_err();
        assert!(err.is_invalid_argument());

        assert_eq!(ws.state(), ConnectionState::Open);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_refused_connection() {
        let (listener, url) = silent_server().await;
        drop(listener);

        let ws = NativeSocket::new(&url, NativeOptions::new()).expect("create");
        let mut rx = observe(&ws);

        ws.connect().expect("connect request accepted");
        assert_eq!(next(&mut rx).await, Seen::Error);
        assert_eq!(next(&mut rx).await, Seen::Close(CloseCode::Abnormal));
        assert_eq!(ws.state(), ConnectionState::Closed);
        assert!(!ws.is_alive());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_unknown_remote_close_code_is_undefined() {
        let url = closing_server(4242).await;
        let ws = NativeSocket::new(&url, NativeOptions::new()).expect("create");
        let mut rx = observe(&ws);

        ws.connect().expect("connect");
        assert_eq!(next(&mut rx).await, Seen::Open);
        assert_eq!(next(&mut rx).await, Seen::Close(CloseCode::Undefined));
        assert_eq!(ws.state(), ConnectionState::Closed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_remote_going_away() {
        let url = closing_server(1001).await;
        let ws = NativeSocket::new(&url, NativeOptions::new()).expect("create");
        let mut rx = observe(&ws);

        ws.connect().expect("connect");
        assert_eq!(next(&mut rx).await, Seen::Open);
        assert_eq!(next(&mut rx).await, Seen::Close(CloseCode::Away));
    }

    #[test]
    fn test_empty_message_is_ignored() {
        let shared = NativeShared {
            state: StateCell::new(),
            alive: AtomicBool::new(false),
            detached: AtomicBool::new(false),
            events: SocketEvents::new(),
        };
        let hits = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&hits);
        shared.events.on_message(move |_| flag.store(true, Ordering::SeqCst));

        shared.handle_event(TransportEvent::Message(Vec::new()));
        assert!(!hits.load(Ordering::SeqCst));
        assert!(!shared.alive.load(Ordering::SeqCst));

        shared.handle_event(TransportEvent::Message(vec![7]));
        assert!(hits.load(Ordering::SeqCst));
        assert!(shared.alive.load(Ordering::SeqCst));
    }

    #[test]
    fn test_detached_socket_discards_events() {
        let shared = NativeShared {
            state: StateCell::new(),
            alive: AtomicBool::new(false),
            detached: AtomicBool::new(true),
            events: SocketEvents::new(),
        };
        let hits = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&hits);
        shared.events.on_close(move |_| flag.store(true, Ordering::SeqCst));

        shared.handle_event(TransportEvent::Closed { code: 1000 });
        assert!(!hits.load(Ordering::SeqCst));
    }
}
