//! The closed set of drawing operations a display list can record.
//!
//! Every variant carries its full parameter payload at the moment of
//! recording. Compound payloads (paths, meshes, images, text blobs) are shared
//! by `Arc` and immutable after construction, so a recorded operation can
//! never be changed retroactively by its producer. Each variant also knows how
//! to compute its own bounding rectangle; no operation depends on another's
//! bounds.

use std::sync::Arc;

use kurbo::{BezPath, Point, Rect, Vec2};

use crate::{
    core::Rgba8,
    error::{EncoreError, EncoreResult},
    path::DrawPath,
};

/// How a `Points` operation interprets its point list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum PointMode {
    /// Each point is drawn on its own.
    Points,
    /// Consecutive pairs form independent segments.
    Lines,
    /// The whole list forms one open polyline.
    Polygon,
}

impl PointMode {
    pub const ALL: [PointMode; 3] = [PointMode::Points, PointMode::Lines, PointMode::Polygon];

    pub fn label(self) -> &'static str {
        match self {
            PointMode::Points => "Points",
            PointMode::Lines => "Lines",
            PointMode::Polygon => "Polygon",
        }
    }
}

/// Triangle topology of a [`VertexMesh`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum VertexMode {
    Triangles,
    TriangleStrip,
    TriangleFan,
}

impl VertexMode {
    pub const ALL: [VertexMode; 3] = [
        VertexMode::Triangles,
        VertexMode::TriangleStrip,
        VertexMode::TriangleFan,
    ];

    pub fn label(self) -> &'static str {
        match self {
            VertexMode::Triangles => "Triangles",
            VertexMode::TriangleStrip => "TriangleStrip",
            VertexMode::TriangleFan => "TriangleFan",
        }
    }
}

/// Compositing rule for an operation against what is already on the surface.
///
/// `Src` is replace semantics: it is honored exactly for opaque colors (where
/// it coincides with `SrcOver`) and approximated by `SrcOver` otherwise.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum BlendMode {
    #[default]
    SrcOver,
    Src,
}

impl BlendMode {
    pub fn label(self) -> &'static str {
        match self {
            BlendMode::SrcOver => "SrcOver",
            BlendMode::Src => "Src",
        }
    }
}

/// Sampling filter for image operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FilterMode {
    Nearest,
    Linear,
}

impl FilterMode {
    pub fn label(self) -> &'static str {
        match self {
            FilterMode::Nearest => "Nearest",
            FilterMode::Linear => "Linear",
        }
    }
}

/// Whether an `ImageRect` sample may read texels outside its source rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum SrcRectConstraint {
    Strict,
    Fast,
}

impl SrcRectConstraint {
    pub fn label(self) -> &'static str {
        match self {
            SrcRectConstraint::Strict => "Strict",
            SrcRectConstraint::Fast => "Fast",
        }
    }
}

/// A colored triangle mesh.
#[derive(Clone, Debug, PartialEq)]
pub struct VertexMesh {
    mode: VertexMode,
    positions: Vec<Point>,
    colors: Vec<Rgba8>,
}

impl VertexMesh {
    /// A mesh needs one color per position.
    pub fn new(mode: VertexMode, positions: Vec<Point>, colors: Vec<Rgba8>) -> EncoreResult<Self> {
        if positions.len() != colors.len() {
            return Err(EncoreError::validation(format!(
                "vertex mesh has {} positions but {} colors",
                positions.len(),
                colors.len()
            )));
        }
        Ok(Self {
            mode,
            positions,
            colors,
        })
    }

    pub fn mode(&self) -> VertexMode {
        self.mode
    }

    pub fn positions(&self) -> &[Point] {
        &self.positions
    }

    pub fn colors(&self) -> &[Rgba8] {
        &self.colors
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        let n = self.positions.len();
        match self.mode {
            VertexMode::Triangles => n / 3,
            VertexMode::TriangleStrip | VertexMode::TriangleFan => n.saturating_sub(2),
        }
    }

    /// Vertex-index triples in draw order, resolving the topology.
    pub fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        let n = self.positions.len();
        let mode = self.mode;
        (0..self.triangle_count()).map(move |i| match mode {
            VertexMode::Triangles => [3 * i, 3 * i + 1, 3 * i + 2],
            VertexMode::TriangleStrip => [i, i + 1, i + 2],
            VertexMode::TriangleFan => [0, i + 1, i + 2],
        })
        .filter(move |idx| idx[2] < n)
    }

    pub fn bounds(&self) -> Option<Rect> {
        envelope(self.positions.iter().copied())
    }
}

/// An immutable premultiplied-RGBA8 pixel buffer used as an image source.
#[derive(Clone, PartialEq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    rgba8_premul: Vec<u8>,
}

impl std::fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.rgba8_premul.len())
            .finish()
    }
}

impl RasterImage {
    pub fn new(width: u32, height: u32, rgba8_premul: Vec<u8>) -> EncoreResult<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(4))
            .ok_or_else(|| EncoreError::validation("image size overflow"))?;
        if rgba8_premul.len() != expected {
            return Err(EncoreError::validation(format!(
                "image buffer is {} bytes, expected {expected} for {width}x{height}",
                rgba8_premul.len()
            )));
        }
        Ok(Self {
            width,
            height,
            rgba8_premul,
        })
    }

    /// A solid-color image, the cheapest possible source.
    pub fn solid(width: u32, height: u32, color: Rgba8) -> Self {
        let px = color.premultiplied();
        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..(width as usize * height as usize) {
            data.extend_from_slice(&px);
        }
        Self {
            width,
            height,
            rgba8_premul: data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn rgba8_premul(&self) -> &[u8] {
        &self.rgba8_premul
    }
}

/// Font file bytes plus the face index within a collection.
#[derive(Clone)]
pub struct FontBytes {
    pub data: Arc<Vec<u8>>,
    pub index: u32,
}

impl FontBytes {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data: Arc::new(data),
            index: 0,
        }
    }
}

impl std::fmt::Debug for FontBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontBytes")
            .field("len", &self.data.len())
            .field("index", &self.index)
            .finish()
    }
}

/// One positioned glyph within a [`TextBlob`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Glyph {
    pub id: u32,
    pub x: f32,
    pub y: f32,
}

/// Shaped, positioned text ready for replay. Built once (see
/// [`crate::text::shape_blob`]); backends only rasterize.
#[derive(Clone, Debug)]
pub struct TextBlob {
    pub font: FontBytes,
    pub font_size: f32,
    pub glyphs: Vec<Glyph>,
    pub color: Rgba8,
    /// Layout extents in blob-local coordinates.
    pub bounds: Rect,
}

impl TextBlob {
    pub fn glyph_count(&self) -> usize {
        self.glyphs.len()
    }
}

/// A recorded drawing operation.
#[derive(Clone, Debug)]
pub enum DrawOp {
    Line {
        p0: Point,
        p1: Point,
        color: Rgba8,
        stroke_width: f64,
    },
    Rect {
        rect: Rect,
        color: Rgba8,
    },
    Oval {
        rect: Rect,
        color: Rgba8,
    },
    Circle {
        center: Point,
        radius: f64,
        color: Rgba8,
    },
    RoundRect {
        rect: Rect,
        /// Corner radii: top-left, top-right, bottom-right, bottom-left.
        radii: [Vec2; 4],
        color: Rgba8,
    },
    Arc {
        /// Bounding oval of the full circle the arc lies on.
        oval: Rect,
        start_deg: f64,
        sweep_deg: f64,
        use_center: bool,
        color: Rgba8,
    },
    Path {
        path: Arc<DrawPath>,
        color: Rgba8,
    },
    Points {
        mode: PointMode,
        points: Arc<[Point]>,
        color: Rgba8,
    },
    Vertices {
        mesh: Arc<VertexMesh>,
        blend: BlendMode,
    },
    Image {
        image: Arc<RasterImage>,
        dst: Point,
        filter: FilterMode,
    },
    ImageRect {
        image: Arc<RasterImage>,
        src: Rect,
        dst: Rect,
        filter: FilterMode,
        constraint: SrcRectConstraint,
    },
    ImageNine {
        image: Arc<RasterImage>,
        /// Center patch of the nine-patch grid, in image pixels.
        center: Rect,
        dst: Rect,
        filter: FilterMode,
    },
    TextBlob {
        blob: Arc<TextBlob>,
        origin: Point,
    },
    Shadow {
        path: Arc<DrawPath>,
        color: Rgba8,
        elevation: f64,
        transparent_occluder: bool,
        device_pixel_ratio: f64,
    },
}

impl DrawOp {
    /// Stable PascalCase tag for this operation kind, used in snapshot file
    /// names.
    pub fn kind_name(&self) -> &'static str {
        match self {
            DrawOp::Line { .. } => "Line",
            DrawOp::Rect { .. } => "Rect",
            DrawOp::Oval { .. } => "Oval",
            DrawOp::Circle { .. } => "Circle",
            DrawOp::RoundRect { .. } => "RoundRect",
            DrawOp::Arc { .. } => "Arc",
            DrawOp::Path { .. } => "Path",
            DrawOp::Points { .. } => "Points",
            DrawOp::Vertices { .. } => "Vertices",
            DrawOp::Image { .. } => "Image",
            DrawOp::ImageRect { .. } => "ImageRect",
            DrawOp::ImageNine { .. } => "ImageNine",
            DrawOp::TextBlob { .. } => "TextBlob",
            DrawOp::Shadow { .. } => "Shadow",
        }
    }

    /// The operation's own bounding rectangle, computed solely from its
    /// parameters. `None` only for genuinely empty geometry (an empty path or
    /// point list); degenerate-but-located geometry still reports its
    /// (zero-area) position.
    pub fn bounds(&self) -> Option<Rect> {
        match self {
            DrawOp::Line { p0, p1, .. } => Some(Rect::from_points(*p0, *p1)),
            DrawOp::Rect { rect, .. }
            | DrawOp::Oval { rect, .. }
            | DrawOp::RoundRect { rect, .. } => Some(rect.abs()),
            DrawOp::Circle { center, radius, .. } => {
                let r = radius.abs();
                Some(Rect::new(
                    center.x - r,
                    center.y - r,
                    center.x + r,
                    center.y + r,
                ))
            }
            DrawOp::Arc { oval, .. } => Some(oval.abs()),
            DrawOp::Path { path, .. } => path.control_bounds(),
            DrawOp::Points { points, .. } => envelope(points.iter().copied()),
            DrawOp::Vertices { mesh, .. } => mesh.bounds(),
            DrawOp::Image { image, dst, filter: _ } => Some(Rect::from_origin_size(
                *dst,
                (f64::from(image.width()), f64::from(image.height())),
            )),
            DrawOp::ImageRect { dst, .. } | DrawOp::ImageNine { dst, .. } => Some(dst.abs()),
            DrawOp::TextBlob { blob, origin } => Some(blob.bounds + origin.to_vec2()),
            DrawOp::Shadow {
                path,
                elevation,
                device_pixel_ratio,
                ..
            } => {
                let spread = (elevation * device_pixel_ratio).abs();
                path.control_bounds().map(|b| b.inflate(spread, spread))
            }
        }
    }
}

fn envelope(points: impl Iterator<Item = Point>) -> Option<Rect> {
    let mut points = points;
    let first = points.next()?;
    let mut bounds = Rect::from_points(first, first);
    for p in points {
        bounds = bounds.union_pt(p);
    }
    Some(bounds)
}

/// Lowers a rounded rect to a cubic path, one kappa-scaled cubic per corner.
///
/// Radii are clamped to the rect's half extents; elliptical (x != y) radii are
/// supported, which is why this does not go through [`kurbo::RoundedRect`].
pub fn rounded_rect_path(rect: Rect, radii: [Vec2; 4]) -> BezPath {
    const KAPPA: f64 = 0.552_284_749_830_793_4;
    let rect = rect.abs();
    let half_w = rect.width() / 2.0;
    let half_h = rect.height() / 2.0;
    let clamp = |r: Vec2| Vec2::new(r.x.abs().min(half_w), r.y.abs().min(half_h));
    let [tl, tr, br, bl] = [clamp(radii[0]), clamp(radii[1]), clamp(radii[2]), clamp(radii[3])];

    let (x0, y0, x1, y1) = (rect.x0, rect.y0, rect.x1, rect.y1);
    let mut p = BezPath::new();
    p.move_to((x0 + tl.x, y0));
    p.line_to((x1 - tr.x, y0));
    p.curve_to(
        (x1 - tr.x * (1.0 - KAPPA), y0),
        (x1, y0 + tr.y * (1.0 - KAPPA)),
        (x1, y0 + tr.y),
    );
    p.line_to((x1, y1 - br.y));
    p.curve_to(
        (x1, y1 - br.y * (1.0 - KAPPA)),
        (x1 - br.x * (1.0 - KAPPA), y1),
        (x1 - br.x, y1),
    );
    p.line_to((x0 + bl.x, y1));
    p.curve_to(
        (x0 + bl.x * (1.0 - KAPPA), y1),
        (x0, y1 - bl.y * (1.0 - KAPPA)),
        (x0, y1 - bl.y),
    );
    p.line_to((x0, y0 + tl.y));
    p.curve_to(
        (x0, y0 + tl.y * (1.0 - KAPPA)),
        (x0 + tl.x * (1.0 - KAPPA), y0),
        (x0 + tl.x, y0),
    );
    p.close_path();
    p
}

/// Lowers an arc operation to a fillable path.
///
/// With `use_center` the path is a pie wedge (center, chord to arc start, arc,
/// close); without, the arc is closed by its chord.
pub fn arc_path(oval: Rect, start_deg: f64, sweep_deg: f64, use_center: bool) -> BezPath {
    let oval = oval.abs();
    let center = oval.center();
    let radii = Vec2::new(oval.width() / 2.0, oval.height() / 2.0);
    let start = start_deg.to_radians();
    let sweep = sweep_deg.to_radians();
    let arc = kurbo::Arc {
        center,
        radii,
        start_angle: start,
        sweep_angle: sweep,
        x_rotation: 0.0,
    };
    let start_pt = Point::new(
        center.x + radii.x * start.cos(),
        center.y + radii.y * start.sin(),
    );

    let mut path = BezPath::new();
    if use_center {
        path.move_to(center);
        path.line_to(start_pt);
    } else {
        path.move_to(start_pt);
    }
    for el in arc.append_iter(0.1) {
        path.push(el);
    }
    path.close_path();
    path
}

#[cfg(test)]
mod tests {
    use kurbo::Shape;

    use super::*;

    #[test]
    fn circle_bounds_are_center_plus_minus_radius() {
        let op = DrawOp::Circle {
            center: Point::new(10.0, 20.0),
            radius: 5.0,
            color: Rgba8::BLACK,
        };
        assert_eq!(op.bounds(), Some(Rect::new(5.0, 15.0, 15.0, 25.0)));
    }

    #[test]
    fn zero_area_rect_still_reports_its_position() {
        let op = DrawOp::Rect {
            rect: Rect::new(3.0, 4.0, 3.0, 4.0),
            color: Rgba8::BLACK,
        };
        assert_eq!(op.bounds(), Some(Rect::new(3.0, 4.0, 3.0, 4.0)));
    }

    #[test]
    fn empty_path_op_has_no_bounds() {
        let op = DrawOp::Path {
            path: Arc::new(DrawPath::new()),
            color: Rgba8::BLACK,
        };
        assert_eq!(op.bounds(), None);
    }

    #[test]
    fn shadow_bounds_inflate_by_elevation_times_dpr() {
        let mut path = DrawPath::new();
        path.move_to((10.0, 10.0));
        path.line_to((20.0, 10.0));
        path.line_to((20.0, 20.0));
        path.close();
        let op = DrawOp::Shadow {
            path: Arc::new(path),
            color: Rgba8::BLACK,
            elevation: 4.0,
            transparent_occluder: false,
            device_pixel_ratio: 2.0,
        };
        assert_eq!(op.bounds(), Some(Rect::new(2.0, 2.0, 28.0, 28.0)));
    }

    #[test]
    fn image_bounds_use_destination_and_pixel_size() {
        let img = Arc::new(RasterImage::solid(8, 4, Rgba8::RED));
        let op = DrawOp::Image {
            image: img,
            dst: Point::new(100.0, 200.0),
            filter: FilterMode::Nearest,
        };
        assert_eq!(op.bounds(), Some(Rect::new(100.0, 200.0, 108.0, 204.0)));
    }

    #[test]
    fn mesh_requires_matching_color_count() {
        let err = VertexMesh::new(
            VertexMode::Triangles,
            vec![Point::ZERO, Point::new(1.0, 0.0), Point::new(0.0, 1.0)],
            vec![Rgba8::RED],
        );
        assert!(err.is_err());
    }

    #[test]
    fn triangle_topologies_resolve_expected_counts() {
        let pts = |n: usize| (0..n).map(|i| Point::new(i as f64, 0.0)).collect::<Vec<_>>();
        let colors = |n: usize| vec![Rgba8::RED; n];

        let list = VertexMesh::new(VertexMode::Triangles, pts(9), colors(9)).unwrap();
        assert_eq!(list.triangles().count(), 3);

        let strip = VertexMesh::new(VertexMode::TriangleStrip, pts(7), colors(7)).unwrap();
        assert_eq!(strip.triangles().count(), 5);

        let fan = VertexMesh::new(VertexMode::TriangleFan, pts(7), colors(7)).unwrap();
        assert_eq!(fan.triangles().count(), 5);
        assert!(fan.triangles().all(|t| t[0] == 0));
    }

    #[test]
    fn mutating_a_caller_side_payload_cannot_change_a_recorded_op() {
        let shared = Arc::new(RasterImage::solid(2, 2, Rgba8::RED));
        let op = DrawOp::Image {
            image: Arc::clone(&shared),
            dst: Point::ZERO,
            filter: FilterMode::Nearest,
        };
        // The caller rebuilds "its" image; the recorded op still sees red.
        let _rebuilt = RasterImage::solid(2, 2, Rgba8::BLUE);
        let DrawOp::Image { image, .. } = &op else {
            unreachable!()
        };
        assert_eq!(image.rgba8_premul()[0..4], Rgba8::RED.premultiplied());
    }

    #[test]
    fn rounded_rect_path_clamps_oversized_radii() {
        let p = rounded_rect_path(
            Rect::new(0.0, 0.0, 10.0, 10.0),
            [Vec2::new(50.0, 50.0); 4],
        );
        let b = p.bounding_box();
        assert!(b.x0 >= -1e-9 && b.y0 >= -1e-9);
        assert!(b.x1 <= 10.0 + 1e-9 && b.y1 <= 10.0 + 1e-9);
    }
}
