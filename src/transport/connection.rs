//! WebSocket connection and event loop.
//!
//! Drives one tokio-tungstenite client stream on a background task and
//! reports what happens on it through an [`EventSink`].
//!
//! # Event Loop
//!
//! The connection spawns a tokio task that handles:
//!
//! - The client handshake
//! - Incoming frames from the peer (text, binary, close)
//! - Outgoing commands from the API (send, close)
//! - Exactly one terminal [`TransportEvent::Closed`] per connection attempt

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::runtime::Handle as RuntimeHandle;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode as WsCloseCode;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, WebSocketConfig};
use tracing::{debug, error, trace, warn};

use crate::error::{Error, Result};
use crate::protocol::CloseCode;

// ============================================================================
// Types
// ============================================================================

/// Something that happened on the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TransportEvent {
    /// Handshake completed.
    Open,
    /// Text or binary payload received.
    Message(Vec<u8>),
    /// Handshake or I/O failure.
    Error(String),
    /// Stream finished. Always the last event.
    Closed {
        /// Peer close code, `NoStatus` or `Abnormal`.
        code: u16,
    },
}

/// Event callback, invoked on the I/O task.
pub(crate) type EventSink = Arc<dyn Fn(TransportEvent) + Send + Sync>;

/// Handshake and framing settings for one connection attempt.
pub(crate) struct ConnectParams {
    /// Client handshake request.
    pub request: Request,
    /// Stream limits.
    pub config: Option<WebSocketConfig>,
    /// Disables Nagle's algorithm on the TCP socket.
    pub disable_nagle: bool,
}

// ============================================================================
// ConnectionCommand
// ============================================================================

/// Internal commands for the event loop.
#[derive(Debug)]
enum ConnectionCommand {
    /// Send a binary frame.
    Binary(Vec<u8>),
    /// Send a text frame.
    Text(String),
    /// Start the close handshake.
    Close { code: u16, reason: String },
}

// ============================================================================
// Connection
// ============================================================================

/// Client side of one WebSocket connection attempt.
///
/// Dropping the connection detaches it: the event loop closes the stream and
/// exits without reporting further events.
pub(crate) struct Connection {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
}

impl Connection {
    /// Spawns the handshake and event loop on `runtime`.
    ///
    /// Returns immediately; the outcome arrives through `sink`.
    pub(crate) fn spawn(runtime: &RuntimeHandle, params: ConnectParams, sink: EventSink) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        runtime.spawn(Self::run_event_loop(params, command_rx, sink));

        Self { command_tx }
    }

    /// Queues a binary frame.
    ///
    /// # Errors
    ///
    /// Unexpected error if the event loop has stopped.
    pub(crate) fn send_binary(&self, data: Vec<u8>) -> Result<()> {
        self.command(ConnectionCommand::Binary(data), "Failed to send message.")
    }

    /// Queues a text frame.
    ///
    /// # Errors
    ///
    /// Unexpected error if the event loop has stopped.
    pub(crate) fn send_text(&self, text: String) -> Result<()> {
        self.command(ConnectionCommand::Text(text), "Failed to send message.")
    }

    /// Queues the close handshake.
    ///
    /// # Errors
    ///
    /// Unexpected error if the event loop has stopped.
    pub(crate) fn close(&self, code: u16, reason: String) -> Result<()> {
        self.command(
            ConnectionCommand::Close { code, reason },
            "Failed to close the connection.",
        )
    }

    fn command(&self, command: ConnectionCommand, failure: &'static str) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|_| Error::wrap(failure, "connection task has stopped"))
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop(
        params: ConnectParams,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        sink: EventSink,
    ) {
        let uri = params.request.uri().to_string();
        debug!(url = %uri, "Connecting");

        let connected = tokio_tungstenite::connect_async_with_config(
            params.request,
            params.config,
            params.disable_nagle,
        )
        .await;

        let ws_stream = match connected {
            Ok((stream, response)) => {
                debug!(url = %uri, status = %response.status(), "Handshake completed");
                stream
            }
            Err(e) => {
                warn!(url = %uri, error = %e, "Handshake failed");
                sink(TransportEvent::Error(e.to_string()));
                sink(TransportEvent::Closed {
                    code: CloseCode::Abnormal.code(),
                });
                return;
            }
        };

        sink(TransportEvent::Open);

        let (mut ws_write, mut ws_read) = ws_stream.split();
        let mut close_code: Option<u16> = None;
        let mut closing = false;

        loop {
            tokio::select! {
                // Incoming frames from the peer
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            trace!(len = text.len(), "Text frame received");
                            if !text.is_empty() {
                                sink(TransportEvent::Message(text.as_bytes().to_vec()));
                            }
                        }

                        Some(Ok(Message::Binary(data))) => {
                            trace!(len = data.len(), "Binary frame received");
                            if !data.is_empty() {
                                sink(TransportEvent::Message(data.to_vec()));
                            }
                        }

                        Some(Ok(Message::Close(frame))) => {
                            let code = frame
                                .map_or(CloseCode::NoStatus.code(), |f| u16::from(f.code));
                            debug!(code, "Close frame received");
                            close_code = Some(code);
                        }

                        Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) | None => {
                            debug!("WebSocket stream ended");
                            break;
                        }

                        Some(Err(e)) => {
                            error!(error = %e, "WebSocket error");
                            sink(TransportEvent::Error(e.to_string()));
                            break;
                        }

                        // Ping/Pong are answered by tungstenite
                        Some(Ok(_)) => {}
                    }
                }

                // Commands from the API
                command = command_rx.recv(), if !closing => {
                    match command {
                        Some(ConnectionCommand::Binary(data)) => {
                            if let Err(e) = ws_write.send(Message::Binary(data.into())).await {
                                warn!(error = %e, "Failed to send binary frame");
                                sink(TransportEvent::Error(e.to_string()));
                            }
                        }

                        Some(ConnectionCommand::Text(text)) => {
                            if let Err(e) = ws_write.send(Message::Text(text.into())).await {
                                warn!(error = %e, "Failed to send text frame");
                                sink(TransportEvent::Error(e.to_string()));
                            }
                        }

                        Some(ConnectionCommand::Close { code, reason }) => {
                            debug!(code, "Close requested");
                            closing = true;
                            let frame = CloseFrame {
                                code: WsCloseCode::from(code),
                                reason: reason.into(),
                            };
                            if let Err(e) = ws_write.send(Message::Close(Some(frame))).await {
                                warn!(error = %e, "Failed to send close frame");
                                sink(TransportEvent::Error(e.to_string()));
                                break;
                            }
                        }

                        None => {
                            debug!("Connection detached, closing stream");
                            let _ = ws_write.close().await;
                            return;
                        }
                    }
                }
            }
        }

        let code = close_code.unwrap_or(CloseCode::Abnormal.code());
        sink(TransportEvent::Closed { code });

        debug!(code, "Event loop terminated");
    }
}

// ============================================================================
// Tests
// ============================================================================
