//! Append-only stroke history with undo/redo and render bookkeeping.

use crate::stroke::{Origin, StrokePoint};
use std::ops::Range;

/// Ordered record of every stroke point on a surface.
///
/// Besides the points themselves the log tracks how far rendering has
/// progressed, the undo boundaries (indices of segment starts), the redo
/// slices removed by undo, and how far local points have been handed out as
/// outbound batches.
#[derive(Debug, Clone, Default)]
pub struct StrokeLog {
    points: Vec<StrokePoint>,
    last_rendered: usize,
    undo_stack: Vec<usize>,
    redo_stack: Vec<RedoSlice>,
    last_emitted: Option<usize>,
}

/// Points removed by an undo.
#[derive(Debug, Clone)]
struct RedoSlice {
    points: Vec<StrokePoint>,
    /// Leading points that had already been handed out as batches.
    emitted: usize,
}

impl StrokeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[StrokePoint] {
        &self.points
    }

    pub fn get(&self, index: usize) -> Option<&StrokePoint> {
        self.points.get(index)
    }

    /// Append a point and return its index.
    pub fn push(&mut self, point: StrokePoint) -> usize {
        self.points.push(point);
        self.points.len() - 1
    }

    /// Append several points and return the index of the first one.
    pub fn extend(&mut self, points: impl IntoIterator<Item = StrokePoint>) -> usize {
        let start = self.points.len();
        self.points.extend(points);
        start
    }

    /// Remove everything, including history.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    // --- Rendering ---------------------------------------------------------

    pub fn last_rendered(&self) -> usize {
        self.last_rendered
    }

    /// Indices not yet drawn.
    pub fn unrendered(&self) -> Range<usize> {
        self.last_rendered.min(self.points.len())..self.points.len()
    }

    pub fn mark_rendered(&mut self) {
        self.last_rendered = self.points.len();
    }

    /// Force the next pass to replay the whole log.
    pub fn reset_render_cursor(&mut self) {
        self.last_rendered = 0;
    }

    /// Index of the point that `index` is drawn from, or `None` for a dot.
    ///
    /// Remote dragging points join the entry right before them. Local dragging
    /// points join the nearest earlier local point, so remote points spliced
    /// into the log mid-gesture do not break the local line.
    pub fn render_predecessor(&self, index: usize) -> Option<usize> {
        let point = self.points.get(index)?;
        if index == 0 || point.starts_segment() {
            return None;
        }
        match point.origin {
            Origin::Remote => Some(index - 1),
            Origin::Local => self.last_local_before(index),
        }
    }

    fn last_local_before(&self, index: usize) -> Option<usize> {
        self.points[..index.min(self.points.len())]
            .iter()
            .rposition(StrokePoint::is_local)
    }

    // --- Undo / redo -------------------------------------------------------

    /// Record the start of a new segment at `index` and drop redo history.
    pub fn push_boundary(&mut self, index: usize) {
        self.undo_stack.push(index);
        self.redo_stack.clear();
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Remove everything from the newest boundary onwards.
    ///
    /// Returns `false` when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(boundary) = self.undo_stack.pop() else {
            return false;
        };
        let start = boundary.min(self.points.len());
        let removed = self.points.split_off(start);
        let emitted = self
            .last_emitted
            .map_or(0, |emitted| (emitted + 1).saturating_sub(start))
            .min(removed.len());
        self.redo_stack.push(RedoSlice {
            points: removed,
            emitted,
        });
        if self.last_emitted.is_some_and(|emitted| emitted >= self.points.len()) {
            self.last_emitted = self.points.len().checked_sub(1);
        }
        true
    }

    /// Re-append the most recently undone slice.
    ///
    /// Points that were emitted before the undo stay emitted, so peers are
    /// not sent them twice. Returns `false` when there is nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Some(slice) = self.redo_stack.pop() else {
            return false;
        };
        let start = self.points.len();
        self.undo_stack.push(start);
        self.points.extend(slice.points);
        if slice.emitted > 0 {
            let frontier = start + slice.emitted - 1;
            self.last_emitted = Some(self.last_emitted.map_or(frontier, |e| e.max(frontier)));
        }
        true
    }

    // --- Outbound batching ---------------------------------------------------

    fn is_emitted(&self, index: usize) -> bool {
        self.last_emitted.is_some_and(|emitted| index <= emitted)
    }

    /// Collect the local points not yet handed to listeners.
    ///
    /// Walks back from the newest local point over local dragging
    /// predecessors. The walk ends at a segment start or an already emitted
    /// point, which is included as the anchor so a peer can join the line.
    /// The first point of the batch carries `is_segment_start`.
    pub fn take_outbound_batch(&mut self) -> Option<Vec<StrokePoint>> {
        let newest = self.points.iter().rposition(StrokePoint::is_local)?;
        if self.is_emitted(newest) {
            return None;
        }

        let mut indices = vec![newest];
        let mut cursor = newest;
        while self.points[cursor].dragging {
            let Some(previous) = self.last_local_before(cursor) else {
                break;
            };
            indices.push(previous);
            if !self.points[previous].dragging || self.is_emitted(previous) {
                break;
            }
            cursor = previous;
        }

        self.last_emitted = Some(newest);
        let mut batch: Vec<StrokePoint> = indices
            .into_iter()
            .rev()
            .map(|index| self.points[index].clone())
            .collect();
        if let Some(first) = batch.first_mut() {
            first.is_segment_start = true;
        }
        Some(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stroke::StrokeStyle;

    fn local(x: f64, dragging: bool) -> StrokePoint {
        StrokePoint::new(x, x, dragging, StrokeStyle::default())
    }

    fn remote(x: f64, dragging: bool) -> StrokePoint {
        let mut point = local(x, dragging);
        point.origin = Origin::Remote;
        point
    }

    #[test]
    fn test_predecessor_skips_remote_points() {
        let mut log = StrokeLog::new();
        log.push(local(1.0, false));
        log.push(local(2.0, true));
        log.push(remote(50.0, true));
        log.push(local(3.0, true));

        assert_eq!(log.render_predecessor(0), None);
        assert_eq!(log.render_predecessor(1), Some(0));
        assert_eq!(log.render_predecessor(2), Some(1));
        assert_eq!(log.render_predecessor(3), Some(1));
    }

    #[test]
    fn test_local_drag_without_local_predecessor_is_a_dot() {
        let mut log = StrokeLog::new();
        log.push(remote(1.0, false));
        log.push(local(2.0, true));
        assert_eq!(log.render_predecessor(1), None);
    }

    #[test]
    fn test_segment_start_flag_draws_dot() {
        let mut log = StrokeLog::new();
        log.push(remote(1.0, false));
        let mut anchor = remote(2.0, true);
        anchor.is_segment_start = true;
        log.push(anchor);
        assert_eq!(log.render_predecessor(1), None);
    }

    #[test]
    fn test_render_cursor() {
        let mut log = StrokeLog::new();
        log.push(local(1.0, false));
        log.push(local(2.0, true));
        assert_eq!(log.unrendered(), 0..2);
        log.mark_rendered();
        assert!(log.unrendered().is_empty());
        log.push(local(3.0, true));
        assert_eq!(log.unrendered(), 2..3);
        log.reset_render_cursor();
        assert_eq!(log.unrendered(), 0..3);
    }

    #[test]
    fn test_undo_redo_roundtrip() {
        let mut log = StrokeLog::new();
        log.push_boundary(0);
        log.push(local(1.0, false));
        log.push(local(2.0, true));
        log.push_boundary(2);
        log.push(local(3.0, false));
        log.push(local(4.0, true));
        let before = log.points().to_vec();

        assert!(log.undo());
        assert_eq!(log.len(), 2);
        assert!(log.redo());
        assert_eq!(log.points(), before.as_slice());

        // Boundary at index 0 is undoable too.
        assert!(log.undo());
        assert!(log.undo());
        assert!(log.is_empty());
        assert!(!log.undo());
    }

    #[test]
    fn test_new_boundary_clears_redo() {
        let mut log = StrokeLog::new();
        log.push_boundary(0);
        log.push(local(1.0, false));
        assert!(log.undo());
        assert!(log.can_redo());
        log.push_boundary(0);
        assert!(!log.can_redo());
        assert!(!log.redo());
    }

    #[test]
    fn test_batch_includes_anchor() {
        let mut log = StrokeLog::new();
        log.push(local(1.0, false));
        log.push(local(2.0, true));

        let batch = log.take_outbound_batch().unwrap();
        assert_eq!(batch.len(), 2);
        assert!(batch[0].is_segment_start);
        assert!(!batch[0].dragging);
        assert!(!batch[1].is_segment_start);
        assert!(log.take_outbound_batch().is_none());

        log.push(local(3.0, true));
        let batch = log.take_outbound_batch().unwrap();
        assert_eq!(batch.iter().map(|p| p.x).collect::<Vec<_>>(), vec![2.0, 3.0]);
        assert!(batch[0].is_segment_start);
        // The log itself is never tagged.
        assert!(!log.get(1).unwrap().is_segment_start);
    }

    #[test]
    fn test_batch_skips_remote_points() {
        let mut log = StrokeLog::new();
        log.push(local(1.0, false));
        log.push(local(2.0, true));
        log.take_outbound_batch();
        log.push(remote(90.0, true));
        log.push(local(3.0, true));

        let batch = log.take_outbound_batch().unwrap();
        assert_eq!(batch.iter().map(|p| p.x).collect::<Vec<_>>(), vec![2.0, 3.0]);
        assert!(batch.iter().all(StrokePoint::is_local));
    }

    #[test]
    fn test_single_click_batch() {
        let mut log = StrokeLog::new();
        log.push(local(5.0, false));
        let batch = log.take_outbound_batch().unwrap();
        assert_eq!(batch.len(), 1);
        assert!(batch[0].is_segment_start);
    }

    #[test]
    fn test_undo_rewinds_emission_frontier() {
        let mut log = StrokeLog::new();
        log.push_boundary(0);
        log.push(local(1.0, false));
        log.take_outbound_batch();
        assert!(log.undo());

        log.push_boundary(0);
        log.push(local(2.0, false));
        let batch = log.take_outbound_batch().unwrap();
        assert_eq!(batch[0].x, 2.0);
    }

    #[test]
    fn test_redo_keeps_emitted_points_emitted() {
        let mut log = StrokeLog::new();
        log.push_boundary(0);
        log.push(local(1.0, false));
        log.push(local(2.0, true));
        log.push(local(3.0, true));
        assert_eq!(log.take_outbound_batch().unwrap().len(), 3);

        assert!(log.undo());
        assert!(log.redo());
        assert!(log.take_outbound_batch().is_none());

        // Further drawing anchors on the redone stroke as usual.
        log.push(local(4.0, true));
        let batch = log.take_outbound_batch().unwrap();
        assert_eq!(batch.iter().map(|p| p.x).collect::<Vec<_>>(), vec![3.0, 4.0]);
    }

    #[test]
    fn test_redo_of_unsent_points_still_emits_them() {
        let mut log = StrokeLog::new();
        log.push_boundary(0);
        log.push(local(1.0, false));
        log.take_outbound_batch();
        log.push_boundary(1);
        log.push(local(2.0, false));

        assert!(log.undo());
        assert!(log.redo());
        let batch = log.take_outbound_batch().unwrap();
        assert_eq!(batch.iter().map(|p| p.x).collect::<Vec<_>>(), vec![2.0]);
    }
}
