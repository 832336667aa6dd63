//! Path data recorded into display lists.
//!
//! [`kurbo::BezPath`] has no conic (rational quadratic) segment, and conics are
//! one of the four edge primitives the workload generators need to isolate. So
//! the recorded path type keeps its own element list with an explicit conic
//! verb, and lowers to a `BezPath` only when a backend asks for one.

use kurbo::{BezPath, Point, Rect};

/// The four segment primitives that can connect two on-curve points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum PathVerb {
    Line,
    Quad,
    Conic,
    Cubic,
}

impl PathVerb {
    pub const ALL: [PathVerb; 4] = [
        PathVerb::Line,
        PathVerb::Quad,
        PathVerb::Conic,
        PathVerb::Cubic,
    ];

    /// Stable tag used in snapshot file names.
    pub fn label(self) -> &'static str {
        match self {
            PathVerb::Line => "Lines",
            PathVerb::Quad => "Quads",
            PathVerb::Conic => "Conics",
            PathVerb::Cubic => "Cubics",
        }
    }
}

/// One element of a [`DrawPath`].
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum PathEl {
    MoveTo(Point),
    LineTo(Point),
    QuadTo(Point, Point),
    /// Rational quadratic: control point plus weight.
    ConicTo(Point, Point, f64),
    CubicTo(Point, Point, Point),
    Close,
}

/// A multi-contour path built from [`PathEl`]s.
///
/// Immutable once recorded into an operation; builders construct it, wrap it in
/// an `Arc`, and hand it off.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DrawPath {
    els: Vec<PathEl>,
}

impl DrawPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elements(&self) -> &[PathEl] {
        &self.els
    }

    pub fn is_empty(&self) -> bool {
        self.els.is_empty()
    }

    pub fn move_to(&mut self, p: impl Into<Point>) {
        self.els.push(PathEl::MoveTo(p.into()));
    }

    pub fn line_to(&mut self, p: impl Into<Point>) {
        self.els.push(PathEl::LineTo(p.into()));
    }

    pub fn quad_to(&mut self, ctrl: impl Into<Point>, end: impl Into<Point>) {
        self.els.push(PathEl::QuadTo(ctrl.into(), end.into()));
    }

    pub fn conic_to(&mut self, ctrl: impl Into<Point>, end: impl Into<Point>, weight: f64) {
        self.els.push(PathEl::ConicTo(ctrl.into(), end.into(), weight));
    }

    pub fn cubic_to(
        &mut self,
        c1: impl Into<Point>,
        c2: impl Into<Point>,
        end: impl Into<Point>,
    ) {
        self.els.push(PathEl::CubicTo(c1.into(), c2.into(), end.into()));
    }

    pub fn close(&mut self) {
        self.els.push(PathEl::Close);
    }

    /// Number of drawn segments (MoveTo and Close are bookkeeping, not
    /// segments).
    pub fn segment_count(&self) -> usize {
        self.els
            .iter()
            .filter(|el| {
                matches!(
                    el,
                    PathEl::LineTo(_)
                        | PathEl::QuadTo(..)
                        | PathEl::ConicTo(..)
                        | PathEl::CubicTo(..)
                )
            })
            .count()
    }

    /// Every control point in the path, on-curve and off-curve alike.
    pub fn control_points(&self) -> impl Iterator<Item = Point> + '_ {
        self.els.iter().flat_map(|el| {
            let pts: [Option<Point>; 3] = match *el {
                PathEl::MoveTo(p) | PathEl::LineTo(p) => [Some(p), None, None],
                PathEl::QuadTo(c, p) => [Some(c), Some(p), None],
                PathEl::ConicTo(c, p, _) => [Some(c), Some(p), None],
                PathEl::CubicTo(c1, c2, p) => [Some(c1), Some(c2), Some(p)],
                PathEl::Close => [None, None, None],
            };
            pts.into_iter().flatten()
        })
    }

    /// Axis-aligned envelope of the control points, `None` for an empty path.
    ///
    /// This is a control-point bound, not a tight curve bound: it always
    /// contains the rendered geometry and is cheap to maintain incrementally.
    pub fn control_bounds(&self) -> Option<Rect> {
        let mut pts = self.control_points();
        let first = pts.next()?;
        let mut bounds = Rect::from_points(first, first);
        for p in pts {
            bounds = bounds.union_pt(p);
        }
        Some(bounds)
    }

    /// Lowers to a [`BezPath`] a rasterizer can consume.
    ///
    /// Conics are approximated by quadratics: two rounds of midpoint
    /// subdivision, then each sub-conic's control point is reused as a plain
    /// quadratic control point. Fixed depth keeps the lowering deterministic
    /// across platforms.
    pub fn to_bez_path(&self) -> BezPath {
        let mut out = BezPath::new();
        let mut start = Point::ZERO;
        let mut current = Point::ZERO;
        for &el in &self.els {
            match el {
                PathEl::MoveTo(p) => {
                    out.move_to(p);
                    start = p;
                    current = p;
                }
                PathEl::LineTo(p) => {
                    out.line_to(p);
                    current = p;
                }
                PathEl::QuadTo(c, p) => {
                    out.quad_to(c, p);
                    current = p;
                }
                PathEl::ConicTo(c, p, w) => {
                    for (qc, qp) in conic_to_quads(current, c, p, w) {
                        out.quad_to(qc, qp);
                    }
                    current = p;
                }
                PathEl::CubicTo(c1, c2, p) => {
                    out.curve_to(c1, c2, p);
                    current = p;
                }
                PathEl::Close => {
                    out.close_path();
                    current = start;
                }
            }
        }
        out
    }
}

const CONIC_SUBDIVISIONS: u32 = 2;

/// Splits a conic into `2^CONIC_SUBDIVISIONS` quadratics via repeated midpoint
/// subdivision of the rational curve.
fn conic_to_quads(p0: Point, ctrl: Point, p2: Point, weight: f64) -> Vec<(Point, Point)> {
    // A non-positive or unit weight degenerates to a plain quadratic.
    if !(weight.is_finite() && weight > 0.0) || (weight - 1.0).abs() < 1e-12 {
        return vec![(ctrl, p2)];
    }
    let mut quads = Vec::with_capacity(1 << CONIC_SUBDIVISIONS);
    subdivide_conic(p0, ctrl, p2, weight, CONIC_SUBDIVISIONS, &mut quads);
    quads
}

fn subdivide_conic(
    p0: Point,
    ctrl: Point,
    p2: Point,
    weight: f64,
    depth: u32,
    out: &mut Vec<(Point, Point)>,
) {
    if depth == 0 {
        out.push((ctrl, p2));
        return;
    }
    // Split the rational quadratic at t = 1/2. In homogeneous coordinates the
    // curve is ((p0,1), (w*ctrl,w), (p2,1)); de Casteljau at the midpoint and
    // re-projecting gives the two halves below, each with weight
    // sqrt((1+w)/2).
    let denom = 1.0 + weight;
    let q1 = Point::new(
        (p0.x + weight * ctrl.x) / denom,
        (p0.y + weight * ctrl.y) / denom,
    );
    let r1 = Point::new(
        (weight * ctrl.x + p2.x) / denom,
        (weight * ctrl.y + p2.y) / denom,
    );
    let mid = Point::new(
        (p0.x + 2.0 * weight * ctrl.x + p2.x) / (2.0 * denom),
        (p0.y + 2.0 * weight * ctrl.y + p2.y) / (2.0 * denom),
    );
    let half_weight = (denom / 2.0).sqrt();
    subdivide_conic(p0, q1, mid, half_weight, depth - 1, out);
    subdivide_conic(mid, r1, p2, half_weight, depth - 1, out);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> DrawPath {
        let mut p = DrawPath::new();
        p.move_to((0.0, 0.0));
        p.line_to((10.0, 0.0));
        p.line_to((10.0, 10.0));
        p.line_to((0.0, 10.0));
        p.close();
        p
    }

    #[test]
    fn segment_count_ignores_moves_and_closes() {
        assert_eq!(square().segment_count(), 4);
        assert_eq!(DrawPath::new().segment_count(), 0);
    }

    #[test]
    fn control_bounds_covers_off_curve_points() {
        let mut p = DrawPath::new();
        p.move_to((0.0, 0.0));
        p.quad_to((5.0, 20.0), (10.0, 0.0));
        let b = p.control_bounds().unwrap();
        assert_eq!(b, Rect::new(0.0, 0.0, 10.0, 20.0));
    }

    #[test]
    fn empty_path_has_no_bounds() {
        assert!(DrawPath::new().control_bounds().is_none());
    }

    #[test]
    fn conic_lowering_emits_four_quads() {
        let mut p = DrawPath::new();
        p.move_to((0.0, 0.0));
        p.conic_to((5.0, 10.0), (10.0, 0.0), 3.7);
        let bez = p.to_bez_path();
        // MoveTo + 4 QuadTo elements.
        assert_eq!(bez.elements().len(), 5);
    }

    #[test]
    fn conic_lowering_stays_inside_control_envelope() {
        let p0 = Point::new(0.0, 0.0);
        let c = Point::new(5.0, 10.0);
        let p2 = Point::new(10.0, 0.0);
        let envelope = Rect::from_points(p0, p2).union_pt(c);
        for (qc, qp) in conic_to_quads(p0, c, p2, 3.7) {
            assert!(envelope.contains(qc), "control {qc:?} escaped {envelope:?}");
            assert!(envelope.contains(qp), "endpoint {qp:?} escaped {envelope:?}");
        }
    }

    #[test]
    fn conic_midpoint_matches_rational_formula() {
        let p0 = Point::new(0.0, 0.0);
        let c = Point::new(5.0, 10.0);
        let p2 = Point::new(10.0, 0.0);
        let w = 3.7;
        let quads = conic_to_quads(p0, c, p2, w);
        // After the first split both halves meet at the rational midpoint.
        let expected = Point::new(
            (p0.x + 2.0 * w * c.x + p2.x) / (2.0 + 2.0 * w),
            (p0.y + 2.0 * w * c.y + p2.y) / (2.0 + 2.0 * w),
        );
        let meeting = quads[1].1;
        assert!((meeting.x - expected.x).abs() < 1e-9);
        assert!((meeting.y - expected.y).abs() < 1e-9);
    }

    #[test]
    fn unit_weight_conic_is_a_plain_quad() {
        let quads = conic_to_quads(
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(2.0, 0.0),
            1.0,
        );
        assert_eq!(quads.len(), 1);
    }
}
