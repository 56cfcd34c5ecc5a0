//! In-memory transport.

use super::{SocketState, Transport, TransportError, TransportEvent};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

#[derive(Debug)]
struct Channel {
    state: SocketState,
    url: Option<String>,
    connects: usize,
    refuse: Option<String>,
    incoming: VecDeque<TransportEvent>,
    sent: Vec<String>,
}

impl Default for Channel {
    fn default() -> Self {
        Self {
            state: SocketState::Disconnected,
            url: None,
            connects: 0,
            refuse: None,
            incoming: VecDeque::new(),
            sent: Vec::new(),
        }
    }
}

/// In-memory transport for testing and offline use.
///
/// Clones share the same channel, so a test can keep a handle after moving
/// the transport into a client and play the server side through it.
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    channel: Rc<RefCell<Channel>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the handshake completion.
    pub fn open(&self) {
        self.push(TransportEvent::Open);
    }

    /// Queue an inbound text frame.
    pub fn deliver(&self, text: impl Into<String>) {
        self.push(TransportEvent::Message(text.into()));
    }

    /// Queue a server-side close.
    pub fn server_close(&self, reason: impl Into<String>) {
        self.push(TransportEvent::Closed {
            reason: reason.into(),
        });
    }

    /// Queue a connection failure.
    pub fn fail(&self, message: impl Into<String>) {
        self.push(TransportEvent::Error {
            message: message.into(),
        });
    }

    /// Make subsequent `connect` calls fail with `message`.
    pub fn refuse_connections(&self, message: impl Into<String>) {
        self.channel.borrow_mut().refuse = Some(message.into());
    }

    fn push(&self, event: TransportEvent) {
        self.channel.borrow_mut().incoming.push_back(event);
    }

    /// Frames sent so far.
    pub fn sent(&self) -> Vec<String> {
        self.channel.borrow().sent.clone()
    }

    /// URL of the most recent `connect`.
    pub fn url(&self) -> Option<String> {
        self.channel.borrow().url.clone()
    }

    /// Number of successful `connect` calls.
    pub fn connects(&self) -> usize {
        self.channel.borrow().connects
    }
}

impl Transport for MemoryTransport {
    fn connect(&mut self, url: &str) -> Result<(), TransportError> {
        let mut channel = self.channel.borrow_mut();
        if let Some(message) = &channel.refuse {
            return Err(TransportError::Connect(message.clone()));
        }
        if matches!(channel.state, SocketState::Connecting | SocketState::Open) {
            return Err(TransportError::AlreadyConnected);
        }
        channel.state = SocketState::Connecting;
        channel.url = Some(url.to_string());
        channel.connects += 1;
        Ok(())
    }

    fn send(&mut self, text: &str) -> Result<(), TransportError> {
        let mut channel = self.channel.borrow_mut();
        if channel.state != SocketState::Open {
            return Err(TransportError::NotConnected);
        }
        channel.sent.push(text.to_string());
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<TransportEvent> {
        let mut channel = self.channel.borrow_mut();
        let events: Vec<TransportEvent> = channel.incoming.drain(..).collect();
        for event in &events {
            channel.state = channel.state.after(event);
        }
        events
    }

    fn state(&self) -> SocketState {
        self.channel.borrow().state
    }

    fn close(&mut self) {
        let mut channel = self.channel.borrow_mut();
        channel.state = SocketState::Disconnected;
        channel.incoming.clear();
    }
}
