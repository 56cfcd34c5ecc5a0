//! Drawing surface: pointer capture, incremental rendering and history.

use crate::config::SurfaceConfig;
use crate::events::{Emitter, Event, SubscriptionId};
use crate::host::{CanvasHost, HostEvent, PointerButton, RenderTarget};
use crate::stroke::{Origin, StrokePoint, StrokeStyle, StyleUpdate, parse_colour};
use crate::stroke_log::StrokeLog;
use kurbo::{Affine, Point, Size};
use peniko::Color;
use thiserror::Error;

/// Highest accepted zoom level; level 10 would collapse the scale to zero.
pub const MAX_ZOOM: i32 = 9;

/// Scale reduction per zoom level.
pub const ZOOM_STEP: f64 = 0.1;

/// Drawing surface errors.
#[derive(Debug, Error, PartialEq)]
pub enum SurfaceError {
    #[error("Invalid zoom level: {0} (must be zero or greater)")]
    InvalidZoom(i32),
    #[error("Zoom level {level} is out of range (maximum {max})")]
    ZoomOutOfRange { level: i32, max: i32 },
    #[error("Host error: {0}")]
    Host(String),
}

/// Result type for surface operations.
pub type SurfaceResult<T> = Result<T, SurfaceError>;

/// Events published by a [`DrawingSurface`].
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    /// A batch of local points ready to be sent to peers.
    NewClick(Vec<StrokePoint>),
    /// A render pass finished.
    Redrawn { hard: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEventKind {
    NewClick,
    Redrawn,
}

impl Event for SurfaceEvent {
    type Kind = SurfaceEventKind;

    fn kind(&self) -> SurfaceEventKind {
        match self {
            SurfaceEvent::NewClick(_) => SurfaceEventKind::NewClick,
            SurfaceEvent::Redrawn { .. } => SurfaceEventKind::Redrawn,
        }
    }
}

/// Freehand drawing surface backed by a [`CanvasHost`].
pub struct DrawingSurface<H: CanvasHost> {
    host: H,
    target: H::Target,
    size: Size,
    log: StrokeLog,
    zoom: i32,
    scale_x: f64,
    scale_y: f64,
    painting: bool,
    style: StrokeStyle,
    background: String,
    events: Emitter<SurfaceEvent>,
}

impl<H: CanvasHost> DrawingSurface<H> {
    /// Create a surface sized to the host container and paint the background.
    pub fn new(mut host: H, config: SurfaceConfig) -> SurfaceResult<Self> {
        let size = host.container_size();
        let target = host.create_surface(size)?;
        let mut style = config.style;
        // Re-apply so an eraser default picks up the configured background.
        style.apply(StyleUpdate::default(), &config.background);

        let mut surface = Self {
            host,
            target,
            size,
            log: StrokeLog::new(),
            zoom: 0,
            scale_x: 1.0,
            scale_y: 1.0,
            painting: false,
            style,
            background: config.background,
            events: Emitter::new(),
        };
        surface.redraw(true);
        Ok(surface)
    }

    // --- Stroke capture ----------------------------------------------------

    /// Start a new segment at canvas pixel position `(x, y)`.
    ///
    /// Ignored while a stroke is already in progress.
    pub fn begin_stroke(&mut self, x: f64, y: f64) {
        if self.painting {
            return;
        }
        self.painting = true;
        let point = self.capture(x, y, false);
        let index = self.log.len();
        self.log.push_boundary(index);
        self.log.push(point);
        self.redraw(false);
    }

    /// Continue the current segment. Ignored unless a stroke is in progress.
    pub fn extend_stroke(&mut self, x: f64, y: f64) {
        if !self.painting {
            return;
        }
        let point = self.capture(x, y, true);
        self.log.push(point);
        self.redraw(false);
        self.emit_batch();
    }

    /// Finish the current segment and flush unsent local points.
    pub fn end_stroke(&mut self) {
        self.painting = false;
        self.emit_batch();
    }

    /// Append points received from a peer and draw them.
    pub fn ingest_remote(&mut self, points: impl IntoIterator<Item = StrokePoint>) {
        let start = self.log.extend(points.into_iter().map(|mut point| {
            point.origin = Origin::Remote;
            point
        }));
        log::debug!("Ingested {} remote points", self.log.len() - start);
        self.redraw(false);
    }

    fn capture(&self, x: f64, y: f64, dragging: bool) -> StrokePoint {
        StrokePoint::new(x / self.scale_x, y / self.scale_y, dragging, self.style.clone())
    }

    fn emit_batch(&mut self) {
        if let Some(batch) = self.log.take_outbound_batch() {
            self.events.emit(&SurfaceEvent::NewClick(batch));
        }
    }

    // --- View --------------------------------------------------------------

    /// Set the zoom level; each level shrinks the drawing by 10%.
    pub fn set_zoom(&mut self, level: i32) -> SurfaceResult<()> {
        if level < 0 {
            return Err(SurfaceError::InvalidZoom(level));
        }
        if level > MAX_ZOOM {
            return Err(SurfaceError::ZoomOutOfRange {
                level,
                max: MAX_ZOOM,
            });
        }
        self.zoom = level;
        let scale = 1.0 - f64::from(level) * ZOOM_STEP;
        self.scale_x = scale;
        self.scale_y = scale;
        self.redraw(true);
        Ok(())
    }

    pub fn zoom(&self) -> i32 {
        self.zoom
    }

    /// Current `(x, y)` scale factors.
    pub fn scale(&self) -> (f64, f64) {
        (self.scale_x, self.scale_y)
    }

    /// Adopt a new container size and repaint.
    pub fn resize(&mut self, size: Size) {
        self.size = size;
        self.redraw(true);
    }

    pub fn size(&self) -> Size {
        self.size
    }

    // --- History -----------------------------------------------------------

    /// Remove the most recent segment. No-op when there is nothing to undo.
    pub fn undo(&mut self) {
        if self.log.undo() {
            self.redraw(true);
        }
    }

    /// Restore the most recently undone segment.
    pub fn redo(&mut self) {
        if self.log.redo() {
            self.redraw(true);
        }
    }

    /// Clear all strokes and history and reset the zoom.
    pub fn reset(&mut self) {
        self.log.clear();
        self.painting = false;
        self.zoom = 0;
        self.scale_x = 1.0;
        self.scale_y = 1.0;
        self.redraw(true);
    }

    // --- Style -------------------------------------------------------------

    /// Merge a partial style into the style used for new points.
    pub fn update_style(&mut self, update: StyleUpdate) {
        self.style.apply(update, &self.background);
    }

    pub fn style(&self) -> &StrokeStyle {
        &self.style
    }

    pub fn background(&self) -> &str {
        &self.background
    }

    // --- Accessors ---------------------------------------------------------

    /// Copy of every stroke point.
    pub fn strokes(&self) -> Vec<StrokePoint> {
        self.log.points().to_vec()
    }

    pub fn stroke_log(&self) -> &StrokeLog {
        &self.log
    }

    pub fn is_painting(&self) -> bool {
        self.painting
    }

    pub fn target(&self) -> &H::Target {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut H::Target {
        &mut self.target
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn subscribe<F>(&mut self, kind: SurfaceEventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&SurfaceEvent) + 'static,
    {
        self.events.subscribe(kind, handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    // --- Input -------------------------------------------------------------

    /// Translate one host event into stroke operations.
    pub fn handle_event(&mut self, event: HostEvent) {
        match event {
            HostEvent::PointerDown {
                position,
                button,
                touches,
            } => {
                if touches > 1 {
                    log::debug!("Ignoring multi-touch press ({touches} touches)");
                    return;
                }
                if button != PointerButton::Primary {
                    return;
                }
                self.begin_stroke(position.x, position.y);
            }
            HostEvent::PointerMove { position, touches } => {
                if touches > 1 {
                    return;
                }
                self.extend_stroke(position.x, position.y);
            }
            HostEvent::PointerUp { .. } => self.end_stroke(),
            HostEvent::Resize { size } => self.resize(size),
        }
    }

    /// Process all input queued by the host. Returns the number of events.
    pub fn pump(&mut self) -> usize {
        let events = self.host.poll_events();
        let count = events.len();
        for event in events {
            self.handle_event(event);
        }
        count
    }

    // --- Rendering ---------------------------------------------------------

    /// Draw unrendered points; a hard pass clears and replays everything.
    fn redraw(&mut self, hard: bool) {
        if hard {
            self.target.clear(self.size, parse_colour(&self.background));
            self.target
                .set_transform(Affine::scale_non_uniform(self.scale_x, self.scale_y));
            self.log.reset_render_cursor();
        }

        for index in self.log.unrendered() {
            let Some(point) = self.log.get(index) else {
                continue;
            };
            let to = point.position();
            let from = self
                .log
                .render_predecessor(index)
                .and_then(|previous| self.log.get(previous))
                .map(StrokePoint::position)
                .unwrap_or(Point::new(to.x - 1.0, to.y));
            let colour: Color = point.style.color();
            self.target
                .draw_segment(from, to, colour, point.style.width.pixels());
        }
        self.log.mark_rendered();
        self.events.emit(&SurfaceEvent::Redrawn { hard });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{DrawCommand, HeadlessHost, RecordingTarget};
    use crate::stroke::{BACKGROUND_COLOUR, Tool, WidthPreset};
    use std::cell::RefCell;
    use std::rc::Rc;

    type TestSurface = DrawingSurface<HeadlessHost<RecordingTarget>>;

    fn surface() -> TestSurface {
        DrawingSurface::new(
            HeadlessHost::new(Size::new(800.0, 600.0)),
            SurfaceConfig::default(),
        )
        .unwrap()
    }

    fn collect_batches(surface: &mut TestSurface) -> Rc<RefCell<Vec<Vec<StrokePoint>>>> {
        let batches = Rc::new(RefCell::new(Vec::new()));
        let sink = batches.clone();
        surface.subscribe(SurfaceEventKind::NewClick, move |event| {
            if let SurfaceEvent::NewClick(batch) = event {
                sink.borrow_mut().push(batch.clone());
            }
        });
        batches
    }

    fn remote_point(x: f64, y: f64, dragging: bool) -> StrokePoint {
        StrokePoint::new(x, y, dragging, StrokeStyle::default())
    }

    #[test]
    fn test_new_surface_paints_background() {
        let surface = surface();
        let target = surface.target();
        assert_eq!(target.clear_count(), 1);
        assert_eq!(target.last_transform(), Some(Affine::IDENTITY));
        assert!(target.segments().is_empty());
    }

    #[test]
    fn test_simple_stroke_emits_one_batch() {
        let mut surface = surface();
        let batches = collect_batches(&mut surface);

        surface.begin_stroke(10.0, 10.0);
        surface.extend_stroke(20.0, 20.0);
        surface.end_stroke();

        let strokes = surface.strokes();
        assert_eq!(strokes.len(), 2);
        assert!(!strokes[0].dragging);
        assert!(strokes[1].dragging);

        let batches = batches.borrow();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 2);
        assert!(batches[0][0].is_segment_start);
        assert!(batches[0].iter().all(StrokePoint::is_local));
    }

    #[test]
    fn test_click_without_movement_emits_start_point() {
        let mut surface = surface();
        let batches = collect_batches(&mut surface);

        surface.begin_stroke(5.0, 5.0);
        surface.end_stroke();

        let batches = batches.borrow();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 1);
        assert!(!batches[0][0].dragging);
    }

    #[test]
    fn test_render_draws_dot_then_segment() {
        let mut surface = surface();
        surface.begin_stroke(10.0, 10.0);
        surface.extend_stroke(20.0, 30.0);

        let segments = surface.target().segments();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].0, Point::new(9.0, 10.0));
        assert_eq!(segments[0].1, Point::new(10.0, 10.0));
        assert_eq!(segments[1].0, Point::new(10.0, 10.0));
        assert_eq!(segments[1].1, Point::new(20.0, 30.0));
        assert_eq!(segments[1].2, 10.0);
    }

    #[test]
    fn test_extend_without_begin_is_ignored() {
        let mut surface = surface();
        surface.extend_stroke(1.0, 1.0);
        assert!(surface.strokes().is_empty());
    }

    #[test]
    fn test_reentrant_begin_is_ignored() {
        let mut surface = surface();
        surface.begin_stroke(1.0, 1.0);
        surface.begin_stroke(2.0, 2.0);
        assert_eq!(surface.strokes().len(), 1);
        assert!(surface.is_painting());
    }

    #[test]
    fn test_remote_points_do_not_break_local_line() {
        let mut surface = surface();
        surface.begin_stroke(1.0, 1.0);
        surface.extend_stroke(2.0, 2.0);
        surface.ingest_remote(vec![remote_point(100.0, 100.0, false)]);
        surface.extend_stroke(3.0, 3.0);

        let strokes = surface.strokes();
        assert_eq!(strokes[2].origin, Origin::Remote);
        let last = surface.target().segments().pop().unwrap();
        assert_eq!(last.0, Point::new(2.0, 2.0));
        assert_eq!(last.1, Point::new(3.0, 3.0));

        // Same connectivity after a full replay.
        surface.set_zoom(0).unwrap();
        let last = surface.target().segments().pop().unwrap();
        assert_eq!(last.0, Point::new(2.0, 2.0));
    }

    #[test]
    fn test_ingest_forces_remote_origin() {
        let mut surface = surface();
        let mut point = remote_point(4.0, 4.0, false);
        point.origin = Origin::Local;
        surface.ingest_remote(vec![point]);
        assert!(surface.strokes()[0].is_remote());
    }

    #[test]
    fn test_remote_drag_joins_previous_entry() {
        let mut surface = surface();
        surface.ingest_remote(vec![
            remote_point(1.0, 1.0, false),
            remote_point(5.0, 5.0, true),
        ]);
        let last = surface.target().segments().pop().unwrap();
        assert_eq!(last.0, Point::new(1.0, 1.0));
        assert_eq!(last.1, Point::new(5.0, 5.0));
    }

    #[test]
    fn test_zoom_scales() {
        let mut surface = surface();
        for level in 0..=MAX_ZOOM {
            surface.set_zoom(level).unwrap();
            let (sx, sy) = surface.scale();
            let expected = 1.0 - 0.1 * f64::from(level);
            assert!((sx - expected).abs() < 1e-12);
            assert_eq!(sx, sy);
        }
        assert_eq!(surface.set_zoom(-1), Err(SurfaceError::InvalidZoom(-1)));
        assert_eq!(
            surface.set_zoom(10),
            Err(SurfaceError::ZoomOutOfRange { level: 10, max: 9 })
        );
        assert_eq!(surface.zoom(), MAX_ZOOM);
    }

    #[test]
    fn test_zoom_divides_captured_coordinates() {
        let mut surface = surface();
        surface.set_zoom(5).unwrap();
        surface.begin_stroke(50.0, 25.0);
        let point = &surface.strokes()[0];
        assert!((point.x - 100.0).abs() < 1e-9);
        assert!((point.y - 50.0).abs() < 1e-9);

        let transform = surface.target().last_transform().unwrap();
        let scaled = transform * point.position();
        assert!((scaled.x - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_undo_redo_restores_log() {
        let mut surface = surface();
        surface.begin_stroke(1.0, 1.0);
        surface.extend_stroke(2.0, 2.0);
        surface.end_stroke();
        surface.begin_stroke(10.0, 10.0);
        surface.extend_stroke(11.0, 11.0);
        surface.end_stroke();
        let before = surface.strokes();

        surface.undo();
        assert_eq!(surface.strokes().len(), 2);
        surface.redo();
        assert_eq!(surface.strokes(), before);

        surface.undo();
        surface.undo();
        assert!(surface.strokes().is_empty());
        // Extra undo is a no-op.
        surface.undo();
        assert!(surface.strokes().is_empty());
    }

    #[test]
    fn test_redo_does_not_resend_stroke() {
        let mut surface = surface();
        let batches = collect_batches(&mut surface);

        surface.begin_stroke(1.0, 1.0);
        surface.extend_stroke(2.0, 2.0);
        surface.extend_stroke(3.0, 3.0);
        surface.end_stroke();
        let sent = batches.borrow().len();

        surface.undo();
        surface.redo();
        // A pointer-up with no stroke in progress, e.g. the pointer leaving the canvas.
        surface.end_stroke();

        assert_eq!(batches.borrow().len(), sent);
        assert_eq!(surface.strokes().len(), 3);
    }

    #[test]
    fn test_undo_repaints_from_scratch() {
        let mut surface = surface();
        surface.begin_stroke(1.0, 1.0);
        surface.end_stroke();
        surface.target_mut().take();

        surface.undo();
        let target = surface.target();
        assert_eq!(target.clear_count(), 1);
        assert!(target.segments().is_empty());
    }

    #[test]
    fn test_eraser_uses_background() {
        let mut surface = surface();
        surface.update_style(StyleUpdate::default().tool(Tool::Eraser).colour("#ff0000"));
        surface.begin_stroke(1.0, 1.0);
        let point = &surface.strokes()[0];
        assert_eq!(point.style.colour, BACKGROUND_COLOUR);
        assert_eq!(point.style.tool, Tool::Eraser);

        let white = parse_colour(BACKGROUND_COLOUR).to_rgba8();
        let drew_white = surface.target().commands().iter().any(|command| {
            matches!(command, DrawCommand::Segment { colour, .. } if *colour == white)
        });
        assert!(drew_white);
    }

    #[test]
    fn test_style_applies_to_new_points_only() {
        let mut surface = surface();
        surface.begin_stroke(1.0, 1.0);
        surface.end_stroke();
        surface.update_style(StyleUpdate::default().width(WidthPreset::Small));
        surface.begin_stroke(2.0, 2.0);

        let strokes = surface.strokes();
        assert_eq!(strokes[0].style.width.pixels(), 10.0);
        assert_eq!(strokes[1].style.width.pixels(), 2.0);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut surface = surface();
        surface.set_zoom(3).unwrap();
        surface.begin_stroke(1.0, 1.0);
        surface.end_stroke();
        surface.reset();

        assert!(surface.strokes().is_empty());
        assert_eq!(surface.zoom(), 0);
        assert!(!surface.stroke_log().can_undo());
    }

    #[test]
    fn test_pump_ignores_secondary_and_multitouch() {
        let mut surface = surface();
        let host = surface.host_mut();
        host.push_event(HostEvent::PointerDown {
            position: Point::new(1.0, 1.0),
            button: PointerButton::Secondary,
            touches: 1,
        });
        host.push_event(HostEvent::PointerDown {
            position: Point::new(1.0, 1.0),
            button: PointerButton::Primary,
            touches: 2,
        });
        assert_eq!(surface.pump(), 2);
        assert!(surface.strokes().is_empty());
    }

    #[test]
    fn test_pump_drives_a_gesture() {
        let mut surface = surface();
        let batches = collect_batches(&mut surface);
        let host = surface.host_mut();
        host.push_event(HostEvent::PointerDown {
            position: Point::new(1.0, 1.0),
            button: PointerButton::Primary,
            touches: 1,
        });
        host.push_event(HostEvent::PointerMove {
            position: Point::new(2.0, 2.0),
            touches: 1,
        });
        host.push_event(HostEvent::PointerMove {
            position: Point::new(3.0, 3.0),
            touches: 1,
        });
        host.push_event(HostEvent::PointerUp {
            position: Point::new(3.0, 3.0),
        });
        surface.pump();

        assert_eq!(surface.strokes().len(), 3);
        assert!(!surface.is_painting());
        let batches = batches.borrow();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].len(), 2);
        assert_eq!(batches[1][0].x, 2.0);
    }

    #[test]
    fn test_resize_event_repaints() {
        let mut surface = surface();
        let size = Size::new(1024.0, 768.0);
        surface.host_mut().push_event(HostEvent::Resize { size });
        surface.pump();

        assert_eq!(surface.size(), size);
        assert_eq!(surface.target().clear_count(), 2);
    }

    #[test]
    fn test_redrawn_event_reports_pass_kind() {
        let mut surface = surface();
        let passes = Rc::new(RefCell::new(Vec::new()));
        let sink = passes.clone();
        surface.subscribe(SurfaceEventKind::Redrawn, move |event| {
            if let SurfaceEvent::Redrawn { hard } = event {
                sink.borrow_mut().push(*hard);
            }
        });

        surface.begin_stroke(1.0, 1.0);
        surface.set_zoom(1).unwrap();
        assert_eq!(*passes.borrow(), vec![false, true]);
    }
}
