//! Native backend configuration.
//!
//! Controls the client handshake and the stream limits used by
//! [`NativeSocket`](crate::NativeSocket).
//!
//! # Example
//!
//! ```ignore
//! use hybrid_websocket::NativeOptions;
//!
//! let options = NativeOptions::new()
//!     .with_protocol("chat")
//!     .with_header("Authorization", "Bearer token")
//!     .with_max_message_size(1 << 20);
//! ```

// ============================================================================
// Imports
// ============================================================================

use tokio::runtime::Handle as RuntimeHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::{HeaderMap, HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Sub-protocol negotiation header.
const PROTOCOL_HEADER: &str = "Sec-WebSocket-Protocol";

/// Origin header.
const ORIGIN_HEADER: &str = "Origin";

// ============================================================================
// NativeOptions
// ============================================================================

/// Native backend configuration options.
#[derive(Debug, Clone, Default)]
pub struct NativeOptions {
    /// Extra handshake headers, in insertion order.
    pub headers: Vec<(String, String)>,

    /// Requested sub-protocols.
    pub protocols: Vec<String>,

    /// `Origin` header value.
    pub origin: Option<String>,

    /// Largest accepted message, in bytes. `None` keeps the library default.
    pub max_message_size: Option<usize>,

    /// Largest accepted frame, in bytes. `None` keeps the library default.
    pub max_frame_size: Option<usize>,

    /// Disable Nagle's algorithm on the TCP socket.
    pub nodelay: bool,

    /// Runtime that runs the connection task. Defaults to the ambient runtime.
    pub runtime: Option<RuntimeHandle>,
}

// ============================================================================
// Constructors
// ============================================================================

impl NativeOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl NativeOptions {
    /// Adds a handshake header.
    #[inline]
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Adds a requested sub-protocol.
    #[inline]
    #[must_use]
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocols.push(protocol.into());
        self
    }

    /// Adds multiple requested sub-protocols.
    #[inline]
    #[must_use]
    pub fn with_protocols(mut self, protocols: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.protocols.extend(protocols.into_iter().map(Into::into));
        self
    }

    /// Sets the `Origin` header.
    #[inline]
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Sets the largest accepted message size.
    #[inline]
    #[must_use]
    pub fn with_max_message_size(mut self, bytes: usize) -> Self {
        self.max_message_size = Some(bytes);
        self
    }

    /// Sets the largest accepted frame size.
    #[inline]
    #[must_use]
    pub fn with_max_frame_size(mut self, bytes: usize) -> Self {
        self.max_frame_size = Some(bytes);
        self
    }

    /// Disables Nagle's algorithm.
    #[inline]
    #[must_use]
    pub fn with_nodelay(mut self) -> Self {
        self.nodelay = true;
        self
    }

    /// Runs connection tasks on the given runtime.
    #[inline]
    #[must_use]
    pub fn with_runtime(mut self, runtime: RuntimeHandle) -> Self {
        self.runtime = Some(runtime);
        self
    }
}

// ============================================================================
// Conversion Methods
// ============================================================================

impl NativeOptions {
    /// Checks that every header, the origin and the sub-protocols are valid
    /// HTTP header content.
    ///
    /// # Errors
    ///
    /// Unexpected error naming the first invalid entry.
    pub(crate) fn validate(&self) -> Result<()> {
        self.apply_headers(&mut HeaderMap::new())
    }

    /// Builds the client handshake request for `url`.
    ///
    /// # Errors
    ///
    /// Unexpected error if the URL or a header cannot form a valid request.
    pub(crate) fn to_request(&self, url: &Url) -> Result<Request> {
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| Error::wrap("Invalid WebSocket request.", e))?;

        self.apply_headers(request.headers_mut())?;
        Ok(request)
    }

    fn apply_headers(&self, headers: &mut HeaderMap) -> Result<()> {
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::wrap(format!("Invalid header name: {name}"), e))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::wrap(format!("Invalid value for header {name}"), e))?;
            headers.append(name, value);
        }

        if let Some(origin) = &self.origin {
            let value = HeaderValue::from_str(origin)
                .map_err(|e| Error::wrap("Invalid origin.", e))?;
            headers.insert(ORIGIN_HEADER, value);
        }

        if !self.protocols.is_empty() {
            let value = HeaderValue::from_str(&self.protocols.join(", "))
                .map_err(|e| Error::wrap("Invalid sub-protocol list.", e))?;
            headers.insert(PROTOCOL_HEADER, value);
        }

        Ok(())
    }

    /// Returns the stream limits, or `None` for library defaults.
    pub(crate) fn stream_config(&self) -> Option<WebSocketConfig> {
        if self.max_message_size.is_none() && self.max_frame_size.is_none() {
            return None;
        }

        let mut config = WebSocketConfig::default();
        if self.max_message_size.is_some() {
            config.max_message_size = self.max_message_size;
        }
        if self.max_frame_size.is_some() {
            config.max_frame_size = self.max_frame_size;
        }
        Some(config)
    }
}

// ============================================================================
// Tests
// ============================================================================
