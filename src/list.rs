//! Recording and replaying display lists.
//!
//! A [`DisplayListBuilder`] is an append-only recorder: operations go in
//! strictly in call order and are never reordered or removed. `freeze`
//! consumes the builder and produces an immutable, cheaply shareable
//! [`DisplayList`]; because freezing takes the builder by value, appending
//! after freeze is impossible by construction rather than a runtime error.

use std::sync::Arc;

use kurbo::{Point, Rect, Vec2};

use crate::{
    core::Rgba8,
    error::EncoreResult,
    op::{
        BlendMode, DrawOp, FilterMode, PointMode, RasterImage, SrcRectConstraint, TextBlob,
        VertexMesh,
    },
    path::DrawPath,
    render::DrawTarget,
};

/// Append-only recorder of [`DrawOp`]s.
#[derive(Clone, Debug, Default)]
pub struct DisplayListBuilder {
    ops: Vec<DrawOp>,
    bounds: Option<Rect>,
}

impl DisplayListBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ops: Vec::with_capacity(capacity),
            bounds: None,
        }
    }

    /// Appends `op` and unions its bounds into the running aggregate.
    ///
    /// Never fails: degenerate geometry is accepted and simply contributes
    /// empty bounds.
    pub fn push(&mut self, op: DrawOp) {
        if let Some(b) = op.bounds() {
            self.bounds = Some(match self.bounds {
                Some(acc) => acc.union(b),
                None => b,
            });
        }
        self.ops.push(op);
    }

    pub fn line(&mut self, p0: Point, p1: Point, color: Rgba8, stroke_width: f64) {
        self.push(DrawOp::Line {
            p0,
            p1,
            color,
            stroke_width,
        });
    }

    pub fn rect(&mut self, rect: Rect, color: Rgba8) {
        self.push(DrawOp::Rect { rect, color });
    }

    pub fn oval(&mut self, rect: Rect, color: Rgba8) {
        self.push(DrawOp::Oval { rect, color });
    }

    pub fn circle(&mut self, center: Point, radius: f64, color: Rgba8) {
        self.push(DrawOp::Circle {
            center,
            radius,
            color,
        });
    }

    pub fn round_rect(&mut self, rect: Rect, radii: [Vec2; 4], color: Rgba8) {
        self.push(DrawOp::RoundRect { rect, radii, color });
    }

    pub fn arc(
        &mut self,
        oval: Rect,
        start_deg: f64,
        sweep_deg: f64,
        use_center: bool,
        color: Rgba8,
    ) {
        self.push(DrawOp::Arc {
            oval,
            start_deg,
            sweep_deg,
            use_center,
            color,
        });
    }

    pub fn path(&mut self, path: Arc<DrawPath>, color: Rgba8) {
        self.push(DrawOp::Path { path, color });
    }

    pub fn points(&mut self, mode: PointMode, points: Arc<[Point]>, color: Rgba8) {
        self.push(DrawOp::Points {
            mode,
            points,
            color,
        });
    }

    pub fn vertices(&mut self, mesh: Arc<VertexMesh>, blend: BlendMode) {
        self.push(DrawOp::Vertices { mesh, blend });
    }

    pub fn image(&mut self, image: Arc<RasterImage>, dst: Point, filter: FilterMode) {
        self.push(DrawOp::Image { image, dst, filter });
    }

    pub fn image_rect(
        &mut self,
        image: Arc<RasterImage>,
        src: Rect,
        dst: Rect,
        filter: FilterMode,
        constraint: SrcRectConstraint,
    ) {
        self.push(DrawOp::ImageRect {
            image,
            src,
            dst,
            filter,
            constraint,
        });
    }

    pub fn image_nine(
        &mut self,
        image: Arc<RasterImage>,
        center: Rect,
        dst: Rect,
        filter: FilterMode,
    ) {
        self.push(DrawOp::ImageNine {
            image,
            center,
            dst,
            filter,
        });
    }

    pub fn text_blob(&mut self, blob: Arc<TextBlob>, origin: Point) {
        self.push(DrawOp::TextBlob { blob, origin });
    }

    pub fn shadow(
        &mut self,
        path: Arc<DrawPath>,
        color: Rgba8,
        elevation: f64,
        transparent_occluder: bool,
        device_pixel_ratio: f64,
    ) {
        self.push(DrawOp::Shadow {
            path,
            color,
            elevation,
            transparent_occluder,
            device_pixel_ratio,
        });
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Aggregate bounds recorded so far; `None` until a bounded op is pushed.
    pub fn current_bounds(&self) -> Option<Rect> {
        self.bounds
    }

    /// Freezes the recording into an immutable [`DisplayList`].
    ///
    /// The move is the whole point: the accumulated op vector transfers into
    /// the shared list without copying, and this builder ceases to exist, so
    /// "append after freeze" cannot be written.
    pub fn freeze(self) -> DisplayList {
        DisplayList {
            ops: self.ops.into(),
            bounds: self.bounds,
        }
    }
}

/// A frozen, shareable, replayable sequence of drawing operations.
///
/// Cloning shares the underlying storage. The list is `Send + Sync`; replaying
/// it concurrently from multiple threads against *independent* targets is
/// safe. It performs no synchronization of any target: two threads must not
/// replay into the same destination without external locking.
#[derive(Clone, Debug)]
pub struct DisplayList {
    ops: Arc<[DrawOp]>,
    bounds: Option<Rect>,
}

impl DisplayList {
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Union of every contained operation's bounds; the degenerate zero rect
    /// for an empty (or all-empty-geometry) list.
    pub fn bounds(&self) -> Rect {
        self.bounds.unwrap_or(Rect::ZERO)
    }

    /// Replays every operation, strictly in recorded order, into `target`.
    ///
    /// This is a pure read of the list. Content that falls outside the target
    /// is clipped by ordinary rasterization; that is not an error. A backend
    /// failure aborts the replay at the failing operation; there is no
    /// partial-success bookkeeping.
    pub fn render_to(&self, target: &mut dyn DrawTarget) -> EncoreResult<()> {
        tracing::trace!(ops = self.len(), "replaying display list");
        for op in self.ops.iter() {
            target.draw_op(op)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freeze_preserves_order_and_count() {
        let mut b = DisplayListBuilder::new();
        b.rect(Rect::new(0.0, 0.0, 1.0, 1.0), Rgba8::RED);
        b.circle(Point::new(5.0, 5.0), 1.0, Rgba8::GREEN);
        b.line(Point::ZERO, Point::new(9.0, 9.0), Rgba8::BLUE, 1.0);
        let list = b.freeze();
        assert_eq!(list.len(), 3);
        let kinds: Vec<_> = list.ops().iter().map(DrawOp::kind_name).collect();
        assert_eq!(kinds, ["Rect", "Circle", "Line"]);
    }

    #[test]
    fn aggregate_bounds_equal_union_of_recomputed_op_bounds() {
        let mut b = DisplayListBuilder::new();
        b.rect(Rect::new(10.0, 10.0, 20.0, 20.0), Rgba8::RED);
        b.circle(Point::new(0.0, 0.0), 4.0, Rgba8::GREEN);
        b.oval(Rect::new(-3.0, 5.0, 8.0, 30.0), Rgba8::BLUE);
        let list = b.freeze();

        let expected = list
            .ops()
            .iter()
            .filter_map(DrawOp::bounds)
            .reduce(|a, b| a.union(b))
            .unwrap();
        assert_eq!(list.bounds(), expected);
    }

    #[test]
    fn empty_list_has_degenerate_bounds() {
        let list = DisplayListBuilder::new().freeze();
        assert!(list.is_empty());
        assert_eq!(list.bounds(), Rect::ZERO);
    }

    #[test]
    fn empty_geometry_contributes_nothing_to_bounds() {
        let mut b = DisplayListBuilder::new();
        b.path(Arc::new(DrawPath::new()), Rgba8::RED);
        b.rect(Rect::new(1.0, 1.0, 2.0, 2.0), Rgba8::RED);
        let list = b.freeze();
        assert_eq!(list.bounds(), Rect::new(1.0, 1.0, 2.0, 2.0));
    }

    #[test]
    fn clones_share_storage() {
        let mut b = DisplayListBuilder::new();
        b.rect(Rect::new(0.0, 0.0, 1.0, 1.0), Rgba8::RED);
        let a = b.freeze();
        let c = a.clone();
        assert!(std::ptr::eq(a.ops().as_ptr(), c.ops().as_ptr()));
    }

    #[test]
    fn display_list_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<DisplayList>();
    }
}
