//! Host capabilities a drawing surface needs from its platform.
//!
//! A host supplies the container size, creates the render target and
//! collects pointer input. The surface never touches platform APIs directly.

mod headless;

pub use headless::{DrawCommand, HeadlessHost, RecordingTarget};

use crate::surface::SurfaceResult;
use kurbo::{Affine, Point, Size};
use peniko::Color;

/// Mouse button of a pointer press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// Input delivered by a host, in canvas pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HostEvent {
    PointerDown {
        position: Point,
        button: PointerButton,
        /// Number of active touch points (1 for a mouse).
        touches: usize,
    },
    PointerMove {
        position: Point,
        touches: usize,
    },
    PointerUp {
        position: Point,
    },
    Resize {
        size: Size,
    },
}

/// Something strokes can be drawn onto.
pub trait RenderTarget {
    /// Clear the whole target to `background`.
    fn clear(&mut self, size: Size, background: Color);

    /// Set the transform applied to subsequent segments.
    fn set_transform(&mut self, transform: Affine);

    /// Draw a round-capped line segment.
    fn draw_segment(&mut self, from: Point, to: Point, colour: Color, width: f64);
}

/// Platform integration for a drawing surface.
pub trait CanvasHost {
    type Target: RenderTarget;

    /// Current size of the element hosting the canvas.
    fn container_size(&self) -> Size;

    /// Create a render target sized to `size`.
    fn create_surface(&mut self, size: Size) -> SurfaceResult<Self::Target>;

    /// Drain input collected since the last call.
    fn poll_events(&mut self) -> Vec<HostEvent>;
}
