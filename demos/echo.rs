//! Echo round-trip through the default backend.
//!
//! Demonstrates:
//! - Creating a client with the crate-level `create`
//! - Subscribing to open, message, error and close events
//! - Sending from the open handler and closing from the message handler
//!
//! Starts a local echo server unless a URL is given.
//!
//! Usage:
//!   cargo run --example echo
//!   cargo run --example echo -- ws://127.0.0.1:9001
//!   cargo run --example echo -- --debug

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use hybrid_websocket::{CloseCode, Result, WebSocket};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

const GREETING: &str = "Hello from hybrid-websocket!";

const DEADLINE: Duration = Duration::from_secs(10);

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let debug = args.iter().any(|a| a == "--debug");
    init_logging(debug);

    let url = match args.iter().find(|a| !a.starts_with("--")) {
        Some(url) => url.clone(),
        None => spawn_echo_server().await,
    };

    if let Err(e) = run(&url).await {
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(url: &str) -> Result<()> {
    println!("=== Echo: {url} ===\n");

    let ws: Arc<dyn WebSocket> = Arc::from(hybrid_websocket::create(url)?);
    let (done_tx, mut done_rx) = mpsc::unbounded_channel();

    let handle = Arc::downgrade(&ws);
    ws.on_open(move || {
        let Some(ws) = handle.upgrade() else { return };
        println!("[open] state: {}", ws.state());
        if let Err(e) = ws.send(GREETING.as_bytes()) {
            eprintln!("[open] send failed: {e}");
        }
    });

    let handle = Arc::downgrade(&ws);
    ws.on_message(move |data| {
        println!("[message] {}", String::from_utf8_lossy(data));
        if let Some(ws) = handle.upgrade()
            && let Err(e) = ws.close(CloseCode::Normal, Some("done"))
        {
            eprintln!("[message] close failed: {e}");
        }
    });

    ws.on_error(|message| println!("[error] {message}"));

    ws.on_close(move |code| {
        println!("[close] {code}");
        let _ = done_tx.send(code);
    });

    ws.connect()?;

    match tokio::time::timeout(DEADLINE, done_rx.recv()).await {
        Ok(Some(code)) => println!("\nFinished with {code}"),
        _ => println!("\nNo close within {DEADLINE:?}"),
    }

    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

fn init_logging(debug: bool) {
    let filter = if debug {
        "hybrid_websocket=debug"
    } else {
        "hybrid_websocket=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

/// Starts an echo server on a random local port and returns its URL.
async fn spawn_echo_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind echo server");
    let port = listener.local_addr().expect("local addr").port();

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
