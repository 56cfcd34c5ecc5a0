//! Vello-backed render target.

use drawr_core::RenderTarget;
use kurbo::{Affine, Cap, Join, Line, Point, Rect, Shape, Size, Stroke};
use peniko::{Color, Fill};
use vello::Scene;

/// Builds a Vello scene from surface render calls.
///
/// Segments accumulate until the next clear, so the scene always mirrors
/// what a 2D canvas would show.
pub struct SceneTarget {
    scene: Scene,
    transform: Affine,
    segments: usize,
    /// Union of drawn segment bounds in device space.
    bounds: Option<Rect>,
}

impl SceneTarget {
    pub fn new() -> Self {
        Self {
            scene: Scene::new(),
            transform: Affine::IDENTITY,
            segments: 0,
            bounds: None,
        }
    }

    /// Get the built scene for rendering.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Take ownership of the scene (resets internal scene).
    pub fn take_scene(&mut self) -> Scene {
        self.segments = 0;
        self.bounds = None;
        std::mem::take(&mut self.scene)
    }

    /// Segments drawn since the last clear.
    pub fn segment_count(&self) -> usize {
        self.segments
    }

    /// Device-space bounds of everything drawn since the last clear.
    pub fn content_bounds(&self) -> Option<Rect> {
        self.bounds
    }

    pub fn transform(&self) -> Affine {
        self.transform
    }
}

impl Default for SceneTarget {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderTarget for SceneTarget {
    fn clear(&mut self, size: Size, background: Color) {
        self.scene.reset();
        self.segments = 0;
        self.bounds = None;
        let rect = Rect::from_origin_size(Point::ZERO, size);
        self.scene
            .fill(Fill::NonZero, Affine::IDENTITY, background, None, &rect);
    }

    fn set_transform(&mut self, transform: Affine) {
        self.transform = transform;
    }

    fn draw_segment(&mut self, from: Point, to: Point, colour: Color, width: f64) {
        let line = Line::new(from, to);
        let stroke = Stroke::new(width)
            .with_caps(Cap::Round)
            .with_join(Join::Round);
        self.scene
            .stroke(&stroke, self.transform, colour, None, &line);

        let half = width / 2.0;
        let drawn = self.transform.transform_rect_bbox(line.bounding_box().inflate(half, half));
        self.bounds = Some(match self.bounds {
            Some(bounds) => bounds.union(drawn),
            None => drawn,
        });
        self.segments += 1;
    }
}
