//! Realtime channel to the session server.
//!
//! Provides the wire protocol and a platform-agnostic, poll-based WebSocket
//! interface. Socket callbacks or background threads queue events which the
//! session client drains with [`Transport::poll_events`].

mod memory;
pub mod protocol;

#[cfg(not(target_arch = "wasm32"))]
mod native;

#[cfg(target_arch = "wasm32")]
mod wasm;

pub use memory::MemoryTransport;
pub use protocol::{CanvasUpdate, ClientMessage, Envelope, ServerMessage};

#[cfg(not(target_arch = "wasm32"))]
pub use native::NativeWebSocket;

#[cfg(target_arch = "wasm32")]
pub use wasm::WasmWebSocket;

use thiserror::Error;

/// Transport errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Already connected")]
    AlreadyConnected,
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Connection failed: {0}")]
    Connect(String),
    #[error("Not connected")]
    NotConnected,
    #[error("Send failed: {0}")]
    Send(String),
}

/// Socket state as last observed through [`Transport::poll_events`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketState {
    Disconnected,
    Connecting,
    Open,
    Error,
}

/// Events produced by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The socket finished its handshake.
    Open,
    /// A text frame arrived.
    Message(String),
    /// The server closed the connection.
    Closed { reason: String },
    /// The connection failed.
    Error { message: String },
}

impl SocketState {
    /// State after observing `event`.
    fn after(self, event: &TransportEvent) -> Self {
        match event {
            TransportEvent::Open => SocketState::Open,
            TransportEvent::Closed { .. } => SocketState::Disconnected,
            TransportEvent::Error { .. } => SocketState::Error,
            TransportEvent::Message(_) => self,
        }
    }
}

/// Duplex text channel used by the session client.
pub trait Transport {
    /// Start connecting to `url`. Completion is reported as [`TransportEvent::Open`].
    fn connect(&mut self, url: &str) -> Result<(), TransportError>;

    /// Queue a text frame.
    fn send(&mut self, text: &str) -> Result<(), TransportError>;

    /// Drain events received since the last call (non-blocking).
    fn poll_events(&mut self) -> Vec<TransportEvent>;

    fn state(&self) -> SocketState;

    fn is_open(&self) -> bool {
        self.state() == SocketState::Open
    }

    /// Close the connection. Safe to call when not connected.
    fn close(&mut self);
}

/// Platform-specific WebSocket type.
#[cfg(target_arch = "wasm32")]
pub type PlatformWebSocket = WasmWebSocket;

#[cfg(not(target_arch = "wasm32"))]
pub type PlatformWebSocket = NativeWebSocket;
