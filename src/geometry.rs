//! Deterministic geometry generators for display-list workloads.
//!
//! All functions here are pure: the same inputs always produce the same point
//! sequences, which is what makes replayed output checkable analytically and
//! byte-comparable across runs and backends.

use std::f64::consts::PI;

use kurbo::Point;

use crate::{
    core::Rgba8,
    op::{VertexMesh, VertexMode},
    path::{DrawPath, PathVerb},
};

/// `n` points equally spaced along the circumference of the circle with the
/// given `center` and `radius`, starting at angle 0 and stepping by `2π/n`.
///
/// `n == 0` yields an empty vector; callers that need a polygon must guard.
pub fn polygon_points(n: usize, center: Point, radius: f64) -> Vec<Point> {
    let mut points = Vec::with_capacity(n);
    for i in 0..n {
        let angle = (2.0 * PI / n as f64) * i as f64;
        points.push(Point::new(
            center.x + radius * angle.cos(),
            center.y + radius * angle.sin(),
        ));
    }
    points
}

/// Appends a closed regular polygon contour with straight edges.
pub fn append_lines_contour(path: &mut DrawPath, sides: usize, center: Point, radius: f64) {
    let points = polygon_points(sides, center, radius);
    let Some(&first) = points.first() else {
        return;
    };
    path.move_to(first);
    for &p in &points[1..] {
        path.line_to(p);
    }
    path.line_to(first);
    path.close();
}

/// Appends a closed contour whose edges are quadratics. Control points sit on
/// a circle of 0.8× the radius, at the angular midpoint of each edge.
pub fn append_quads_contour(path: &mut DrawPath, sides: usize, center: Point, radius: f64) {
    let points = polygon_points(sides, center, radius);
    let controls = polygon_points(sides * 2, center, radius * 0.8);
    let Some(&first) = points.first() else {
        return;
    };
    path.move_to(first);
    for i in 1..sides {
        path.quad_to(controls[2 * i - 1], points[i]);
    }
    path.quad_to(controls[2 * sides - 1], first);
    path.close();
}

/// Conic weight used for the conic-edged polygon contours.
pub const CONIC_WEIGHT: f64 = 3.7;

/// Appends a closed contour whose edges are conics with weight
/// [`CONIC_WEIGHT`] and the same control placement as [`append_quads_contour`].
pub fn append_conics_contour(path: &mut DrawPath, sides: usize, center: Point, radius: f64) {
    let points = polygon_points(sides, center, radius);
    let controls = polygon_points(sides * 2, center, radius * 0.8);
    let Some(&first) = points.first() else {
        return;
    };
    path.move_to(first);
    for i in 1..sides {
        path.conic_to(controls[2 * i - 1], points[i], CONIC_WEIGHT);
    }
    path.conic_to(controls[2 * sides - 1], first, CONIC_WEIGHT);
    path.close();
}

/// Appends a closed contour whose edges are cubics: the first control point on
/// a circle of 0.8× the radius at the first third of each edge's angular span,
/// the second on 1.2× at the second third.
pub fn append_cubics_contour(path: &mut DrawPath, sides: usize, center: Point, radius: f64) {
    let points = polygon_points(sides, center, radius);
    let inner = polygon_points(sides * 3, center, radius * 0.8);
    let outer = polygon_points(sides * 3, center, radius * 1.2);
    let Some(&first) = points.first() else {
        return;
    };
    path.move_to(first);
    for i in 1..sides {
        path.cubic_to(inner[3 * i - 2], outer[3 * i - 1], points[i]);
    }
    path.cubic_to(inner[3 * sides - 2], outer[3 * sides - 1], first);
    path.close();
}

/// A single closed polygon contour using the chosen edge verb.
pub fn polygon_path(verb: PathVerb, sides: usize, center: Point, radius: f64) -> DrawPath {
    let mut path = DrawPath::new();
    append_polygon_contour(&mut path, verb, sides, center, radius);
    path
}

fn append_polygon_contour(
    path: &mut DrawPath,
    verb: PathVerb,
    sides: usize,
    center: Point,
    radius: f64,
) {
    match verb {
        PathVerb::Line => append_lines_contour(path, sides, center, radius),
        PathVerb::Quad => append_quads_contour(path, sides, center, radius),
        PathVerb::Conic => append_conics_contour(path, sides, center, radius),
        PathVerb::Cubic => append_cubics_contour(path, sides, center, radius),
    }
}

/// `count` polygon contours of the chosen verb, centered on `count` points
/// evenly spaced around a circle of `radius / 2` about `center`.
///
/// Total segment count scales exactly linearly with `count`, independent of
/// the other parameters, which is the basis for complexity-vs-size measurement.
pub fn multiply_path(
    verb: PathVerb,
    center: Point,
    sides: usize,
    count: usize,
    radius: f64,
) -> DrawPath {
    let mut path = DrawPath::new();
    for p in polygon_points(count, center, radius / 2.0) {
        append_polygon_contour(&mut path, verb, sides, p, radius);
    }
    path
}

/// A colored triangle mesh approximating a disc: roughly `vertex_count / 2`
/// vertices on the circumference, with the disc center woven in according to
/// the topology. Colors cycle through a small fixed palette to exercise
/// per-vertex color handling; the exact assignment is policy, not contract.
pub fn disc_vertices(
    center: Point,
    radius: f64,
    vertex_count: usize,
    mode: VertexMode,
) -> VertexMesh {
    let outer_count = vertex_count / 2;
    let outer = polygon_points(outer_count, center, radius);

    let mut positions = Vec::new();
    let mut colors = Vec::new();
    if outer.is_empty() {
        return VertexMesh::new(mode, positions, colors)
            .expect("empty mesh is structurally valid");
    }

    match mode {
        VertexMode::TriangleFan => {
            // C, O_0, O_1, ..., O_{n-1}, O_0: the fan closes by repeating
            // the first rim vertex.
            positions.push(center);
            colors.push(Rgba8::CYAN);
            for i in 0..=outer.len() {
                positions.push(outer[i % outer.len()]);
                colors.push(match i % 3 {
                    0 => Rgba8::RED,
                    1 => Rgba8::GREEN,
                    _ => Rgba8::BLUE,
                });
            }
        }
        VertexMode::Triangles => {
            // O_i, O_{i+1}, C for every rim edge.
            for i in 0..outer_count {
                positions.push(outer[i % outer.len()]);
                colors.push(Rgba8::RED);
                positions.push(outer[(i + 1) % outer.len()]);
                colors.push(Rgba8::GREEN);
                positions.push(center);
                colors.push(Rgba8::BLUE);
            }
        }
        VertexMode::TriangleStrip => {
            // O_0, O_1, C, O_2, O_3, C, ...: the center re-enters the strip
            // after every second rim vertex.
            for i in 0..=outer_count {
                positions.push(outer[i % outer.len()]);
                colors.push(if i % 2 == 1 { Rgba8::RED } else { Rgba8::GREEN });
                if i % 2 == 1 {
                    positions.push(center);
                    colors.push(Rgba8::BLUE);
                }
            }
        }
    }

    VertexMesh::new(mode, positions, colors).expect("generator emits one color per vertex")
}

const SCATTER_DX: [f64; 6] = [10.0, 6.3, 15.0, 3.5, 22.6, 4.7];
const SCATTER_DY: [f64; 6] = [9.3, -5.4, 8.5, -12.0, 19.2, -19.6];

/// `count` points walked from the origin using fixed offset tables chosen to
/// look scattered, wrapping back into `[0, width) × [0, height)` whenever the
/// accumulated position leaves it.
pub fn scatter_points(count: usize, width: f64, height: f64) -> Vec<Point> {
    let mut points = Vec::with_capacity(count);
    let mut current = Point::ZERO;
    for i in 0..count {
        points.push(current);
        current.x += SCATTER_DX[i % SCATTER_DX.len()];
        current.y += SCATTER_DY[i % SCATTER_DY.len()];
        if current.x > width {
            current.x -= width;
            current.y += 25.0;
        }
        if current.y > height {
            current.y -= height;
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn polygon_points_lie_on_the_circle_with_even_spacing() {
        let center = Point::new(3.0, -2.0);
        let radius = 7.5;
        for n in [3usize, 4, 5, 20] {
            let pts = polygon_points(n, center, radius);
            assert_eq!(pts.len(), n);
            for (i, p) in pts.iter().enumerate() {
                let d = center.distance(*p);
                assert!((d - radius).abs() < 1e-6, "n={n} i={i} dist={d}");
            }
            // Consecutive angular spacing is exactly 2π/n.
            for i in 1..n {
                let a0 = (pts[i - 1].y - center.y).atan2(pts[i - 1].x - center.x);
                let a1 = (pts[i].y - center.y).atan2(pts[i].x - center.x);
                let mut step = a1 - a0;
                if step < 0.0 {
                    step += 2.0 * PI;
                }
                assert!((step - 2.0 * PI / n as f64).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn square_polygon_hits_the_axes() {
        let pts = polygon_points(4, Point::ZERO, 10.0);
        let expected = [
            Point::new(10.0, 0.0),
            Point::new(0.0, 10.0),
            Point::new(-10.0, 0.0),
            Point::new(0.0, -10.0),
        ];
        for (p, e) in pts.iter().zip(expected) {
            assert!((p.x - e.x).abs() < EPS && (p.y - e.y).abs() < EPS, "{p:?} != {e:?}");
        }
    }

    #[test]
    fn polygon_points_zero_is_empty() {
        assert!(polygon_points(0, Point::ZERO, 1.0).is_empty());
    }

    #[test]
    fn contour_generators_agree_on_vertices_and_segment_count() {
        let center = Point::new(100.0, 100.0);
        for verb in PathVerb::ALL {
            let path = polygon_path(verb, 20, center, 50.0);
            assert_eq!(path.segment_count(), 20, "{verb:?}");
        }
    }

    #[test]
    fn multiply_path_scales_segment_count_linearly() {
        let center = Point::new(512.0, 512.0);
        for verb in PathVerb::ALL {
            let single = polygon_path(verb, 20, center, 256.0).segment_count();
            for count in [1usize, 2, 5, 9] {
                let multi = multiply_path(verb, center, 20, count, 256.0);
                assert_eq!(multi.segment_count(), count * single, "{verb:?} x{count}");
            }
        }
    }

    #[test]
    fn disc_vertices_counts_per_topology() {
        let c = Point::new(0.0, 0.0);
        // 50 requested -> 25 rim vertices.
        let fan = disc_vertices(c, 10.0, 50, VertexMode::TriangleFan);
        assert_eq!(fan.vertex_count(), 1 + 25 + 1);

        let list = disc_vertices(c, 10.0, 50, VertexMode::Triangles);
        assert_eq!(list.vertex_count(), 25 * 3);
        assert_eq!(list.triangle_count(), 25);

        let strip = disc_vertices(c, 10.0, 50, VertexMode::TriangleStrip);
        // 26 rim samples plus a center after each odd one.
        assert_eq!(strip.vertex_count(), 26 + 13);
    }

    #[test]
    fn disc_vertices_rim_lies_on_the_circle() {
        let c = Point::new(5.0, 5.0);
        let mesh = disc_vertices(c, 20.0, 50, VertexMode::Triangles);
        for p in mesh.positions() {
            let d = c.distance(*p);
            assert!(d < 1e-6 || (d - 20.0).abs() < 1e-6);
        }
    }

    #[test]
    fn scatter_points_stay_reasonably_bounded() {
        let pts = scatter_points(10_000, 1024.0, 1024.0);
        assert_eq!(pts.len(), 10_000);
        for p in &pts {
            // One wrap step can overshoot by at most one delta plus the +25
            // y-adjustment before the next wrap pulls it back.
            assert!(p.x <= 1024.0 + 25.0 && p.y <= 1024.0 + 50.0, "{p:?}");
            assert!(p.x >= -25.0 && p.y >= -25.0, "{p:?}");
        }
    }

    #[test]
    fn scatter_points_are_deterministic() {
        assert_eq!(
            scatter_points(500, 256.0, 256.0),
            scatter_points(500, 256.0, 256.0)
        );
    }
}
