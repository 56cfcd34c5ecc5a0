//! Headless host for tests and windowless use.

use super::{CanvasHost, HostEvent, RenderTarget};
use crate::surface::SurfaceResult;
use kurbo::{Affine, Point, Size};
use peniko::Color;
use peniko::color::Rgba8;
use std::collections::VecDeque;
use std::marker::PhantomData;

/// A recorded render call. Colours are kept as 8-bit RGBA.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawCommand {
    Clear { size: Size, background: Rgba8 },
    Transform(Affine),
    Segment {
        from: Point,
        to: Point,
        colour: Rgba8,
        width: f64,
    },
}

/// Render target that records every call.
#[derive(Debug, Clone, Default)]
pub struct RecordingTarget {
    commands: Vec<DrawCommand>,
}

impl RecordingTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Take the recorded commands, leaving the recording empty.
    pub fn take(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Recorded segments as `(from, to, width)`.
    pub fn segments(&self) -> Vec<(Point, Point, f64)> {
        self.commands
            .iter()
            .filter_map(|command| match *command {
                DrawCommand::Segment { from, to, width, .. } => Some((from, to, width)),
                _ => None,
            })
            .collect()
    }

    pub fn clear_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, DrawCommand::Clear { .. }))
            .count()
    }

    pub fn last_transform(&self) -> Option<Affine> {
        self.commands.iter().rev().find_map(|command| match *command {
            DrawCommand::Transform(transform) => Some(transform),
            _ => None,
        })
    }
}

impl RenderTarget for RecordingTarget {
    fn clear(&mut self, size: Size, background: Color) {
        self.commands.push(DrawCommand::Clear {
            size,
            background: background.to_rgba8(),
        });
    }

    fn set_transform(&mut self, transform: Affine) {
        self.commands.push(DrawCommand::Transform(transform));
    }

    fn draw_segment(&mut self, from: Point, to: Point, colour: Color, width: f64) {
        self.commands.push(DrawCommand::Segment {
            from,
            to,
            colour: colour.to_rgba8(),
            width,
        });
    }
}

/// Host with a fixed container size and a scripted input queue.
///
/// The target type defaults to [`RecordingTarget`]; any `Default` target
/// works, which lets GPU-backed targets run without a window.
#[derive(Debug)]
pub struct HeadlessHost<T = RecordingTarget> {
    size: Size,
    pending: VecDeque<HostEvent>,
    _target: PhantomData<T>,
}

impl<T> HeadlessHost<T> {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            pending: VecDeque::new(),
            _target: PhantomData,
        }
    }

    /// Queue input for the next [`CanvasHost::poll_events`].
    pub fn push_event(&mut self, event: HostEvent) {
        if let HostEvent::Resize { size } = event {
            self.size = size;
        }
        self.pending.push_back(event);
    }
}

impl<T: RenderTarget + Default> CanvasHost for HeadlessHost<T> {
    type Target = T;

    fn container_size(&self) -> Size {
        self.size
    }

    fn create_surface(&mut self, _size: Size) -> SurfaceResult<T> {
        Ok(T::default())
    }

    fn poll_events(&mut self) -> Vec<HostEvent> {
        self.pending.drain(..).collect()
    }
}
