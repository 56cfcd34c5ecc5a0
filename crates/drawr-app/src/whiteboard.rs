//! Wiring between a drawing surface and a session client.

use drawr_core::{
    CanvasHost, ClientEvent, ClientEventKind, ClientResult, DrawingSurface, SendOutcome,
    SessionApi, SessionClient, StrokePoint, SurfaceEvent, SurfaceEventKind, Transport,
};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

type BatchQueue = Rc<RefCell<VecDeque<Vec<StrokePoint>>>>;

/// Work done by one [`Whiteboard::pump`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStats {
    pub input_events: usize,
    pub transport_events: usize,
    pub remote_batches: usize,
    pub sent_batches: usize,
    pub buffered_batches: usize,
}

/// A collaborative whiteboard: local strokes go to the session, remote
/// strokes come back onto the surface.
pub struct Whiteboard<H: CanvasHost, A: SessionApi, T: Transport> {
    surface: DrawingSurface<H>,
    client: SessionClient<A, T>,
    outgoing: BatchQueue,
    incoming: BatchQueue,
    reopened: Rc<Cell<bool>>,
}

impl<H: CanvasHost, A: SessionApi, T: Transport> Whiteboard<H, A, T> {
    pub fn new(mut surface: DrawingSurface<H>, mut client: SessionClient<A, T>) -> Self {
        let outgoing = BatchQueue::default();
        let incoming = BatchQueue::default();
        let reopened = Rc::new(Cell::new(false));

        let queue = outgoing.clone();
        surface.subscribe(SurfaceEventKind::NewClick, move |event| {
            if let SurfaceEvent::NewClick(batch) = event {
                queue.borrow_mut().push_back(batch.clone());
            }
        });

        let queue = incoming.clone();
        client.subscribe(ClientEventKind::UpdateCanvas, move |event| {
            if let ClientEvent::UpdateCanvas { points, .. } = event {
                queue.borrow_mut().push_back(points.clone());
            }
        });

        let flag = reopened.clone();
        client.subscribe(ClientEventKind::WebSocketOpen, move |_| flag.set(true));

        Self {
            surface,
            client,
            outgoing,
            incoming,
            reopened,
        }
    }

    pub async fn new_session(&mut self, name: &str) -> ClientResult<String> {
        self.client.new_session(name).await
    }

    pub async fn join_session(&mut self, session_id: &str) -> ClientResult<String> {
        self.client.join_session(session_id).await
    }

    /// Run one cooperative step: host input, socket traffic, then the
    /// exchange of stroke batches in both directions.
    pub fn pump(&mut self) -> PumpStats {
        let mut stats = PumpStats {
            input_events: self.surface.pump(),
            transport_events: self.client.poll(),
            ..PumpStats::default()
        };

        let remote: Vec<Vec<StrokePoint>> = self.incoming.borrow_mut().drain(..).collect();
        stats.remote_batches = remote.len();
        for points in remote {
            self.surface.ingest_remote(points);
        }

        if self.reopened.replace(false) {
            match self.client.flush_pending() {
                Ok(Some(_)) => stats.sent_batches += 1,
                Ok(None) => {}
                Err(e) => log::warn!("Failed to flush pending strokes: {e}"),
            }
        }

        let local: Vec<Vec<StrokePoint>> = self.outgoing.borrow_mut().drain(..).collect();
        for batch in local {
            match self.client.send_canvas_update(batch) {
                Ok(SendOutcome::Sent { .. }) => stats.sent_batches += 1,
                Ok(SendOutcome::Buffered { .. }) => stats.buffered_batches += 1,
                Err(e) => log::warn!("Failed to send strokes: {e}"),
            }
        }

        stats
    }

    pub fn surface(&self) -> &DrawingSurface<H> {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut DrawingSurface<H> {
        &mut self.surface
    }

    pub fn client(&self) -> &SessionClient<A, T> {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut SessionClient<A, T> {
        &mut self.client
    }
}
