//! Session client: negotiation, connection lifecycle and stroke exchange.
//!
//! A session is created or joined with an HTTP GET, then a WebSocket is
//! opened for the realtime channel. Inbound frames are decoded into
//! [`ClientEvent`]s when the owner calls [`SessionClient::poll`].

mod api;

pub use api::{BoxFuture, HttpResponse, HttpSessionApi, MemorySessionApi, SessionApi};

use crate::config::ClientConfig;
use crate::events::{Emitter, Event, SubscriptionId};
use crate::stroke::StrokePoint;
use crate::sync::{ClientMessage, ServerMessage, Transport, TransportError, TransportEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use thiserror::Error;
use url::Url;

/// Session client errors.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Session server rejected the request with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Server unreachable: {0}")]
    Unreachable(String),
    #[error("Invalid session payload: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}

/// Result type for session client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// A session participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "UserRepr")]
pub struct User {
    pub name: String,
}

/// Servers list users either as bare names or as objects.
#[derive(Deserialize)]
#[serde(untagged)]
enum UserRepr {
    Name(String),
    Object { name: String },
}

impl From<UserRepr> for User {
    fn from(repr: UserRepr) -> Self {
        match repr {
            UserRepr::Name(name) | UserRepr::Object { name } => User { name },
        }
    }
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Session returned by negotiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    #[serde(default)]
    pub users: Vec<User>,
}

/// Connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session negotiated.
    Idle,
    /// Session negotiated, socket handshake pending.
    Negotiating,
    Connected,
    /// The socket failed.
    Disconnected,
    /// Closed by either side.
    Closed,
}

/// Outcome of [`SessionClient::send_canvas_update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// One envelope carrying `points` points went out.
    Sent { points: usize },
    /// The socket is not open; the batch waits in the outbox.
    Buffered { pending: usize },
}

/// Events published by a [`SessionClient`].
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    WebSocketOpen,
    WebSocketError { message: String },
    ServerClosed { reason: String },
    NewUser(Value),
    UpdateCanvas {
        username: Option<String>,
        points: Vec<StrokePoint>,
    },
    ServerDown(Value),
    NewPeer(Value),
    SessionAcknowledged(Value),
    /// An inbound frame could not be decoded.
    ProtocolError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientEventKind {
    WebSocketOpen,
    WebSocketError,
    ServerClosed,
    NewUser,
    UpdateCanvas,
    ServerDown,
    NewPeer,
    SessionAcknowledged,
    ProtocolError,
}

impl Event for ClientEvent {
    type Kind = ClientEventKind;

    fn kind(&self) -> ClientEventKind {
        match self {
            ClientEvent::WebSocketOpen => ClientEventKind::WebSocketOpen,
            ClientEvent::WebSocketError { .. } => ClientEventKind::WebSocketError,
            ClientEvent::ServerClosed { .. } => ClientEventKind::ServerClosed,
            ClientEvent::NewUser(_) => ClientEventKind::NewUser,
            ClientEvent::UpdateCanvas { .. } => ClientEventKind::UpdateCanvas,
            ClientEvent::ServerDown(_) => ClientEventKind::ServerDown,
            ClientEvent::NewPeer(_) => ClientEventKind::NewPeer,
            ClientEvent::SessionAcknowledged(_) => ClientEventKind::SessionAcknowledged,
            ClientEvent::ProtocolError { .. } => ClientEventKind::ProtocolError,
        }
    }
}

/// Client for one whiteboard session.
pub struct SessionClient<A: SessionApi, T: Transport> {
    user: User,
    config: ClientConfig,
    api: A,
    transport: T,
    state: SessionState,
    session: Option<Session>,
    outbox: VecDeque<Vec<StrokePoint>>,
    events: Emitter<ClientEvent>,
}

impl<A: SessionApi, T: Transport> SessionClient<A, T> {
    pub fn new(username: impl Into<String>, config: ClientConfig, api: A, transport: T) -> Self {
        Self {
            user: User::new(username),
            config,
            api,
            transport,
            state: SessionState::Idle,
            session: None,
            outbox: VecDeque::new(),
            events: Emitter::new(),
        }
    }

    // --- Negotiation -------------------------------------------------------

    /// Create a session named `name` and connect to it.
    ///
    /// Resolves with the new session id once the socket has been created;
    /// the client becomes `Connected` when [`poll`](Self::poll) sees it open.
    pub async fn new_session(&mut self, name: &str) -> ClientResult<String> {
        let mut url = self.config.http_url(&["session", "new"])?;
        url.query_pairs_mut().append_pair("name", name);
        self.negotiate(url).await
    }

    /// Join the existing session `session_id` and connect to it.
    pub async fn join_session(&mut self, session_id: &str) -> ClientResult<String> {
        let url = self.config.http_url(&["session", session_id])?;
        self.negotiate(url).await
    }

    async fn negotiate(&mut self, url: Url) -> ClientResult<String> {
        log::info!("Negotiating session at {url}");
        let session = match self.request_session(&url).await {
            Ok(session) => session,
            Err(e) => {
                log::warn!("Session negotiation failed: {e}");
                return Err(e);
            }
        };

        let id = session.id.clone();
        log::info!("Session {id} has {} users", session.users.len());
        self.transport.close();
        self.session = Some(session);
        self.state = SessionState::Negotiating;

        if let Err(e) = self.open_socket(&id) {
            log::error!("Failed to open session socket: {e}");
            self.session = None;
            self.state = SessionState::Idle;
            return Err(e);
        }
        Ok(id)
    }

    async fn request_session(&self, url: &Url) -> ClientResult<Session> {
        let response = self.api.get(url.as_str()).await?;
        if !response.is_ok() {
            return Err(ClientError::Rejected {
                status: response.status,
                body: response.body,
            });
        }
        Ok(serde_json::from_str(&response.body)?)
    }

    fn open_socket(&mut self, session_id: &str) -> ClientResult<()> {
        let url = self.config.ws_url(&["session", session_id, "ws"])?;
        self.transport.connect(url.as_str())?;
        Ok(())
    }

    // --- Realtime ----------------------------------------------------------

    /// Dispatch everything the transport received since the last call.
    /// Returns the number of transport events handled.
    pub fn poll(&mut self) -> usize {
        let events = self.transport.poll_events();
        let count = events.len();
        for event in events {
            self.dispatch(event);
        }
        count
    }

    fn dispatch(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Open => {
                log::info!("Session socket open");
                self.state = SessionState::Connected;
                self.events.emit(&ClientEvent::WebSocketOpen);
            }
            TransportEvent::Message(text) => self.handle_message(&text),
            TransportEvent::Error { message } => {
                log::error!("Session socket error: {message}");
                self.state = SessionState::Disconnected;
                self.events.emit(&ClientEvent::WebSocketError { message });
            }
            TransportEvent::Closed { reason } => {
                log::info!("Session socket closed by server: {reason:?}");
                self.transport.close();
                self.state = SessionState::Closed;
                self.events.emit(&ClientEvent::ServerClosed { reason });
            }
        }
    }

    /// Decode one inbound frame and publish the matching event.
    pub fn handle_message(&mut self, text: &str) {
        let message = match ServerMessage::decode(text) {
            Ok(Some(message)) => message,
            Ok(None) => return,
            Err(e) => {
                log::warn!("Failed to parse server message: {e}");
                self.events.emit(&ClientEvent::ProtocolError {
                    message: e.to_string(),
                });
                return;
            }
        };

        let event = match message {
            ServerMessage::NewUser(data) => {
                if let (Some(session), Ok(user)) =
                    (&mut self.session, serde_json::from_value::<User>(data.clone()))
                {
                    session.users.push(user);
                }
                ClientEvent::NewUser(data)
            }
            ServerMessage::UpdateCanvas { username, points } => {
                log::debug!("Received {} points from {username:?}", points.len());
                ClientEvent::UpdateCanvas { username, points }
            }
            ServerMessage::ServerDown(data) => {
                log::warn!("Session server going down");
                ClientEvent::ServerDown(data)
            }
            ServerMessage::NewPeer(data) => ClientEvent::NewPeer(data),
            ServerMessage::AckSession(data) => {
                if let (Some(session), Ok(users)) = (
                    &mut self.session,
                    serde_json::from_value::<Vec<User>>(data["users"].clone()),
                ) {
                    session.users = users;
                }
                ClientEvent::SessionAcknowledged(data)
            }
        };
        self.events.emit(&event);
    }

    /// Send local points, merged after anything still waiting in the outbox.
    ///
    /// While the socket is not open the batch is queued instead.
    pub fn send_canvas_update(&mut self, batch: Vec<StrokePoint>) -> ClientResult<SendOutcome> {
        if !self.transport.is_open() {
            self.outbox.push_back(batch);
            log::debug!("Socket not open, {} batches pending", self.outbox.len());
            return Ok(SendOutcome::Buffered {
                pending: self.outbox.len(),
            });
        }
        let mut points: Vec<StrokePoint> = self.outbox.drain(..).flatten().collect();
        points.extend(batch);
        self.send_points(points)
    }

    /// Send the outbox on its own. Returns `None` when there is nothing to
    /// send or the socket is not open.
    pub fn flush_pending(&mut self) -> ClientResult<Option<SendOutcome>> {
        if self.outbox.is_empty() || !self.transport.is_open() {
            return Ok(None);
        }
        let points: Vec<StrokePoint> = self.outbox.drain(..).flatten().collect();
        self.send_points(points).map(Some)
    }

    fn send_points(&mut self, points: Vec<StrokePoint>) -> ClientResult<SendOutcome> {
        let session_id = self.session_id().unwrap_or_default();
        let text = ClientMessage::update_canvas(&self.user.name, session_id, &points)
            .and_then(|message| message.to_json());
        let sent = text
            .map_err(ClientError::from)
            .and_then(|text| self.transport.send(&text).map_err(ClientError::from));
        match sent {
            Ok(()) => Ok(SendOutcome::Sent {
                points: points.len(),
            }),
            Err(e) => {
                log::error!("Failed to send canvas update: {e}");
                self.outbox.push_front(points);
                Err(e)
            }
        }
    }

    /// Close the socket on purpose.
    pub fn close(&mut self) {
        log::info!("Closing session client");
        self.transport.close();
        self.state = SessionState::Closed;
    }

    // --- Accessors ---------------------------------------------------------

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session.as_ref().map(|session| session.id.as_str())
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Participants of the current session.
    pub fn users(&self) -> &[User] {
        self.session
            .as_ref()
            .map(|session| session.users.as_slice())
            .unwrap_or_default()
    }

    pub fn username(&self) -> &str {
        &self.user.name
    }

    /// Number of batches waiting for the socket.
    pub fn pending_len(&self) -> usize {
        self.outbox.len()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn subscribe<F>(&mut self, kind: ClientEventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&ClientEvent) + 'static,
    {
        self.events.subscribe(kind, handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }
}
