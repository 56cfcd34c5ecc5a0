//! Drawr Core Library
//!
//! Platform-agnostic stroke model, drawing surface and session client for the
//! Drawr collaborative whiteboard.

pub mod config;
pub mod events;
pub mod host;
pub mod session;
pub mod stroke;
pub mod stroke_log;
pub mod surface;
pub mod sync;

pub use config::{ClientConfig, SurfaceConfig};
pub use events::{Emitter, Event, SubscriptionId};
pub use host::{CanvasHost, HeadlessHost, HostEvent, PointerButton, RecordingTarget, RenderTarget};
pub use session::{
    ClientError, ClientEvent, ClientEventKind, ClientResult, HttpSessionApi, MemorySessionApi,
    SendOutcome, Session, SessionApi, SessionClient, SessionState, User,
};
pub use stroke::{Origin, StrokePoint, StrokeStyle, StrokeWidth, StyleUpdate, Tool, WidthPreset};
pub use stroke_log::StrokeLog;
pub use surface::{DrawingSurface, SurfaceError, SurfaceEvent, SurfaceEventKind, SurfaceResult};
pub use sync::{MemoryTransport, PlatformWebSocket, SocketState, Transport, TransportError, TransportEvent};
