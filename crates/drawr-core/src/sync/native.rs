//! WebSocket transport for native platforms.

use super::{SocketState, Transport, TransportError, TransportEvent};
use std::net::TcpStream;
use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket, connect};
use url::Url;

/// Commands sent to the WebSocket thread.
enum WsCommand {
    Send(String),
    Close,
}

/// WebSocket client for native platforms.
///
/// Uses a background thread for non-blocking operation.
pub struct NativeWebSocket {
    state: SocketState,
    /// Channel to send commands to the WebSocket thread.
    cmd_tx: Option<Sender<WsCommand>>,
    /// Channel to receive events from the WebSocket thread.
    event_rx: Option<Receiver<TransportEvent>>,
    /// Handle to the WebSocket thread.
    _thread: Option<JoinHandle<()>>,
}

impl NativeWebSocket {
    /// Create a new disconnected WebSocket client.
    pub fn new() -> Self {
        Self {
            state: SocketState::Disconnected,
            cmd_tx: None,
            event_rx: None,
            _thread: None,
        }
    }

    fn release(&mut self) {
        self.cmd_tx = None;
        self.event_rx = None;
        self._thread = None;
    }
}

impl Default for NativeWebSocket {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for NativeWebSocket {
    fn drop(&mut self) {
        self.close();
    }
}

impl Transport for NativeWebSocket {
    fn connect(&mut self, url: &str) -> Result<(), TransportError> {
        if self.cmd_tx.is_some() {
            return Err(TransportError::AlreadyConnected);
        }

        let parsed = Url::parse(url).map_err(|e| TransportError::InvalidUrl(e.to_string()))?;
        if parsed.scheme() != "ws" && parsed.scheme() != "wss" {
            return Err(TransportError::InvalidUrl(format!(
                "unsupported scheme {}",
                parsed.scheme()
            )));
        }

        self.state = SocketState::Connecting;

        let (cmd_tx, cmd_rx) = channel::<WsCommand>();
        let (event_tx, event_rx) = channel::<TransportEvent>();
        let url = url.to_string();

        let handle = thread::Builder::new()
            .name("drawr-websocket".to_string())
            .spawn(move || {
                log::info!("WebSocket thread: connecting to {url}");
                match connect(url.as_str()) {
                    Ok((socket, response)) => {
                        log::info!("WebSocket connected, status: {}", response.status());
                        let _ = event_tx.send(TransportEvent::Open);
                        if let Some(event) = run_socket(socket, &cmd_rx, &event_tx) {
                            let _ = event_tx.send(event);
                        }
                        log::info!("WebSocket thread exiting");
                    }
                    Err(e) => {
                        log::error!("WebSocket connection failed: {e}");
                        let _ = event_tx.send(TransportEvent::Error {
                            message: format!("Connection failed: {e}"),
                        });
                    }
                }
            })
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        self.cmd_tx = Some(cmd_tx);
        self.event_rx = Some(event_rx);
        self._thread = Some(handle);

        Ok(())
    }

    fn send(&mut self, text: &str) -> Result<(), TransportError> {
        match &self.cmd_tx {
            Some(tx) => tx
                .send(WsCommand::Send(text.to_string()))
                .map_err(|e| TransportError::Send(e.to_string())),
            None => Err(TransportError::NotConnected),
        }
    }

    fn poll_events(&mut self) -> Vec<TransportEvent> {
        let mut events = Vec::new();
        if let Some(rx) = &self.event_rx {
            while let Ok(event) = rx.try_recv() {
                self.state = self.state.after(&event);
                events.push(event);
            }
        }
        // The socket thread has exited; allow a fresh connect.
        let ended = events.iter().any(|event| {
            matches!(
                event,
                TransportEvent::Closed { .. } | TransportEvent::Error { .. }
            )
        });
        if ended {
            self.release();
        }
        events
    }

    fn state(&self) -> SocketState {
        self.state
    }

    fn close(&mut self) {
        if let Some(tx) = self.cmd_tx.take() {
            let _ = tx.send(WsCommand::Close);
        }
        self.release();
        self.state = SocketState::Disconnected;
    }
}

/// Pump commands and frames until the socket ends.
///
/// Returns the event describing why the connection ended, or `None` when it
/// was closed locally.
fn run_socket(
    mut socket: WebSocket<MaybeTlsStream<TcpStream>>,
    commands: &Receiver<WsCommand>,
    events: &Sender<TransportEvent>,
) -> Option<TransportEvent> {
    // Short read timeout so commands are serviced between reads.
    match socket.get_mut() {
        MaybeTlsStream::Plain(tcp) => {
            let _ = tcp.set_read_timeout(Some(Duration::from_millis(50)));
            let _ = tcp.set_write_timeout(Some(Duration::from_secs(5)));
        }
        #[allow(unreachable_patterns)]
        _ => log::debug!("TLS or other stream - using default timeout handling"),
    }

    loop {
        match commands.try_recv() {
            Ok(WsCommand::Send(text)) => {
                log::debug!("WebSocket sending: {}", preview(&text));
                if let Err(e) = socket.send(Message::Text(text)) {
                    log::error!("WebSocket send error: {e}");
                    return Some(TransportEvent::Error {
                        message: format!("Send failed: {e}"),
                    });
                }
            }
            Ok(WsCommand::Close) | Err(TryRecvError::Disconnected) => {
                log::info!("WebSocket close requested");
                let _ = socket.close(None);
                return None;
            }
            Err(TryRecvError::Empty) => {}
        }

        match socket.read() {
            Ok(Message::Text(text)) => {
                log::debug!("WebSocket received: {}", preview(&text));
                if events.send(TransportEvent::Message(text)).is_err() {
                    let _ = socket.close(None);
                    return None;
                }
            }
            Ok(Message::Ping(data)) => {
                let _ = socket.send(Message::Pong(data));
            }
            Ok(Message::Close(frame)) => {
                let reason = frame.map(|f| f.reason.to_string()).unwrap_or_default();
                log::info!("WebSocket received close frame: {reason:?}");
                return Some(TransportEvent::Closed { reason });
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(ref e))
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(tungstenite::Error::ConnectionClosed) => {
                return Some(TransportEvent::Closed {
                    reason: String::new(),
                });
            }
            Err(e) => {
                log::error!("WebSocket read error: {e}");
                return Some(TransportEvent::Error {
                    message: e.to_string(),
                });
            }
        }
    }
}

fn preview(text: &str) -> &str {
    match text.char_indices().nth(100) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
