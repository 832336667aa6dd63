//! Benchmark workload builders.
//!
//! Each builder records exactly one display list representing a fixed,
//! parametrized workload. Recording happens up front so a harness can time
//! only the replay + submit loop, which is the backend-dependent quantity of
//! interest. Iteration counts are fixed constants chosen to land replay times
//! in a measurable range; the size parameter scales the geometry (or the op
//! count where that is the interesting axis).

use std::sync::Arc;

use kurbo::{Point, Rect, Vec2};

use crate::{
    core::Rgba8,
    error::{EncoreError, EncoreResult},
    geometry::{disc_vertices, multiply_path, polygon_path, polygon_points, scatter_points},
    list::{DisplayList, DisplayListBuilder},
    op::{BlendMode, FilterMode, FontBytes, PointMode, RasterImage, SrcRectConstraint, VertexMode},
    path::PathVerb,
    render::CanvasProvider,
    snapshot::snapshot_filename,
    text::{shape_blob, tile_blob},
};

pub const LINES_TO_DRAW: usize = 10_000;
pub const RECTS_TO_DRAW: usize = 5_000;
pub const OVALS_TO_DRAW: usize = 1_000;
pub const CIRCLES_TO_DRAW: usize = 5_000;
pub const ROUND_RECTS_TO_DRAW: usize = 5_000;
pub const ARC_SWEEP_SETS_TO_DRAW: usize = 1_000;
pub const IMAGES_TO_DRAW: usize = 500;
pub const FIXED_CANVAS_SIZE: u32 = 1024;

/// Half the recorded primitives land on non-integral positions on purpose, so
/// backends pay their real anti-aliasing cost.
const STEP: f64 = 0.5;

const INK: Rgba8 = Rgba8::BLACK;

/// Wraps a sliding rect back to the zero edge of the axis it overran, keeping
/// its size, so every recorded primitive (and the aggregate bounds) stays
/// within the canvas.
fn wrap_rect(rect: Rect, canvas: f64) -> Rect {
    let mut r = rect;
    if r.x1 > canvas {
        r = Rect::new(0.0, r.y0, r.width(), r.y1);
    }
    if r.y1 > canvas {
        r = Rect::new(r.x0, 0.0, r.x1, r.height());
    }
    r
}

/// A recorded workload: the frozen list plus the metadata a harness needs to
/// size the destination and name its snapshot.
#[derive(Clone, Debug)]
pub struct Workload {
    pub kind: &'static str,
    pub variant: Option<String>,
    pub size_param: u64,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub list: DisplayList,
    /// Scenario-specific complexity counter (segments, vertices, points,
    /// glyphs) where one exists.
    pub complexity: Option<u64>,
}

impl Workload {
    pub fn snapshot_name(&self, backend: &str) -> String {
        snapshot_filename(backend, self.kind, self.variant.as_deref(), self.size_param)
    }
}

/// Corner-radius flavor of the rounded-rect workload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoundRectShape {
    Simple,
    NinePatch,
    Complex,
}

impl RoundRectShape {
    pub const ALL: [RoundRectShape; 3] = [
        RoundRectShape::Simple,
        RoundRectShape::NinePatch,
        RoundRectShape::Complex,
    ];

    pub fn label(self) -> &'static str {
        match self {
            RoundRectShape::Simple => "Simple",
            RoundRectShape::NinePatch => "NinePatch",
            RoundRectShape::Complex => "Complex",
        }
    }

    fn base_radii(self) -> [Vec2; 4] {
        match self {
            RoundRectShape::Simple => [Vec2::new(5.0, 5.0); 4],
            RoundRectShape::NinePatch => [
                Vec2::new(5.0, 2.0),
                Vec2::new(3.0, 2.0),
                Vec2::new(3.0, 4.0),
                Vec2::new(5.0, 4.0),
            ],
            RoundRectShape::Complex => [
                Vec2::new(5.0, 4.0),
                Vec2::new(4.0, 5.0),
                Vec2::new(3.0, 6.0),
                Vec2::new(2.0, 7.0),
            ],
        }
    }
}

/// How image workloads hand their source image to the recorder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageHandles {
    /// A fresh `Arc` per operation: every draw misses backend caches, the
    /// cost measured is the upload.
    Upload,
    /// One shared `Arc`: after the first draw the backend serves its cache.
    Texture,
}

impl ImageHandles {
    pub const ALL: [ImageHandles; 2] = [ImageHandles::Upload, ImageHandles::Texture];

    pub fn label(self) -> &'static str {
        match self {
            ImageHandles::Upload => "Upload",
            ImageHandles::Texture => "Texture",
        }
    }
}

/// External inputs some scenarios need: a provider for offscreen source
/// images, and font bytes for text.
pub struct ScenarioCtx<'a> {
    pub provider: &'a mut dyn CanvasProvider,
    pub font: Option<FontBytes>,
}

/// Draws diagonal lines sweeping left-to-right on top and right-to-left on
/// the bottom; the replayed image is an hourglass.
pub fn lines(length: u64) -> Workload {
    let mut b = DisplayListBuilder::with_capacity(LINES_TO_DRAW);
    let l = length as f64;
    for i in 0..LINES_TO_DRAW {
        let x = (i as f64) % l;
        b.line(Point::new(x, 0.0), Point::new(l - x, l), INK, 1.0);
    }
    Workload {
        kind: "Line",
        variant: None,
        size_param: length,
        canvas_width: length as u32,
        canvas_height: length as u32,
        list: b.freeze(),
        complexity: Some(LINES_TO_DRAW as u64),
    }
}

/// Square rects of side `length`, each offset by half a device unit from the
/// previous and wrapped at a canvas twice the rect size.
pub fn rects(length: u64) -> Workload {
    let canvas = (length * 2) as f64;
    let mut rect = Rect::new(0.0, 0.0, length as f64, length as f64);
    let mut b = DisplayListBuilder::with_capacity(RECTS_TO_DRAW);
    for _ in 0..RECTS_TO_DRAW {
        b.rect(rect, INK);
        rect = wrap_rect(rect + Vec2::new(STEP, STEP), canvas);
    }
    Workload {
        kind: "Rect",
        variant: None,
        size_param: length,
        canvas_width: (length * 2) as u32,
        canvas_height: (length * 2) as u32,
        list: b.freeze(),
        complexity: Some(RECTS_TO_DRAW as u64),
    }
}

/// Ovals with a 3:2 aspect ratio, wrapped like [`rects`].
pub fn ovals(length: u64) -> Workload {
    let canvas = (length * 2) as f64;
    let mut rect = Rect::new(0.0, 0.0, length as f64 * 1.5, length as f64);
    let mut b = DisplayListBuilder::with_capacity(OVALS_TO_DRAW);
    for _ in 0..OVALS_TO_DRAW {
        b.oval(rect, INK);
        rect = wrap_rect(rect + Vec2::new(STEP, STEP), canvas);
    }
    Workload {
        kind: "Oval",
        variant: None,
        size_param: length,
        canvas_width: (length * 2) as u32,
        canvas_height: (length * 2) as u32,
        list: b.freeze(),
        complexity: Some(OVALS_TO_DRAW as u64),
    }
}

/// Circles of radius `length / 2` walking across the canvas; the center
/// resets to the radius on each axis independently when it would spill.
pub fn circles(length: u64) -> Workload {
    let canvas = (length * 2) as f64;
    let radius = length as f64 / 2.0;
    let mut center = Point::new(radius, radius);
    let mut b = DisplayListBuilder::with_capacity(CIRCLES_TO_DRAW);
    for _ in 0..CIRCLES_TO_DRAW {
        b.circle(center, radius, INK);
        center += Vec2::new(STEP, STEP);
        if center.x + radius > canvas {
            center.x = radius;
        }
        if center.y + radius > canvas {
            center.y = radius;
        }
    }
    Workload {
        kind: "Circle",
        variant: None,
        size_param: length,
        canvas_width: (length * 2) as u32,
        canvas_height: (length * 2) as u32,
        list: b.freeze(),
        complexity: Some(CIRCLES_TO_DRAW as u64),
    }
}

/// Rounded rects with the chosen corner flavor, radii scaled by
/// `length / 16`, wrapped like [`rects`].
pub fn round_rects(shape: RoundRectShape, length: u64) -> Workload {
    let canvas = (length * 2) as f64;
    let multiplier = length as f64 / 16.0;
    let radii = shape.base_radii().map(|r| r * multiplier);
    let mut rect = Rect::new(0.0, 0.0, length as f64, length as f64);
    let mut b = DisplayListBuilder::with_capacity(ROUND_RECTS_TO_DRAW);
    for _ in 0..ROUND_RECTS_TO_DRAW {
        b.round_rect(rect, radii, INK);
        rect = wrap_rect(rect + Vec2::new(STEP, STEP), canvas);
    }
    Workload {
        kind: "RoundRect",
        variant: Some(shape.label().to_string()),
        size_param: length,
        canvas_width: (length * 2) as u32,
        canvas_height: (length * 2) as u32,
        list: b.freeze(),
        complexity: Some(ROUND_RECTS_TO_DRAW as u64),
    }
}

/// Arc sweeps that mostly circumnavigate the circle, advancing the start
/// angle a little past each sweep's end.
pub fn arcs(length: u64) -> Workload {
    const SWEEPS: [f64; 9] = [5.5, -10.0, 42.0, 71.7, 90.0, 37.5, 17.9, 32.0, 379.4];

    let canvas = (length * 2) as f64;
    let mut bounds = Rect::new(0.0, 0.0, length as f64, length as f64);
    let mut start = 0.0f64;
    let mut b = DisplayListBuilder::with_capacity(ARC_SWEEP_SETS_TO_DRAW * SWEEPS.len());
    for _ in 0..ARC_SWEEP_SETS_TO_DRAW {
        for sweep in SWEEPS {
            b.arc(bounds, start, sweep, false, INK);
            start += sweep + 5.0;
        }
        bounds = wrap_rect(bounds + Vec2::new(STEP, STEP), canvas);
    }
    Workload {
        kind: "Arc",
        variant: None,
        size_param: length,
        canvas_width: (length * 2) as u32,
        canvas_height: (length * 2) as u32,
        list: b.freeze(),
        complexity: Some((ARC_SWEEP_SETS_TO_DRAW * SWEEPS.len()) as u64),
    }
}

/// One path op containing `count` overlapping 20-sided polygons of the chosen
/// verb, so replay cost can be read against verb count.
pub fn paths(verb: PathVerb, count: u64) -> Workload {
    let length = FIXED_CANVAS_SIZE;
    let center = Point::new(f64::from(length) / 2.0, f64::from(length) / 2.0);
    let radius = f64::from(length) * 0.25;
    let path = multiply_path(verb, center, 20, count as usize, radius);
    let segments = path.segment_count() as u64;

    let mut b = DisplayListBuilder::new();
    b.path(Arc::new(path), INK);
    Workload {
        kind: "Path",
        variant: Some(verb.label().to_string()),
        size_param: count,
        canvas_width: length,
        canvas_height: length,
        list: b.freeze(),
        complexity: Some(segments),
    }
}

/// `disc_count` colored vertex discs (50 vertices each) centered on points
/// around an inner circle, recorded with replace-style blending.
pub fn vertices(mode: VertexMode, disc_count: u64) -> Workload {
    let length = FIXED_CANVAS_SIZE;
    let center = Point::new(f64::from(length) / 2.0, f64::from(length) / 2.0);
    let radius = f64::from(length) / 4.0;

    let mut total_vertices = 0u64;
    let mut b = DisplayListBuilder::with_capacity(disc_count as usize);
    for p in polygon_points(disc_count as usize, center, radius / 4.0) {
        let mesh = disc_vertices(p, radius, 50, mode);
        total_vertices += mesh.vertex_count() as u64;
        b.vertices(Arc::new(mesh), BlendMode::Src);
    }
    Workload {
        kind: "Vertices",
        variant: Some(mode.label().to_string()),
        size_param: disc_count,
        canvas_width: length,
        canvas_height: length,
        list: b.freeze(),
        complexity: Some(total_vertices),
    }
}

/// A single points op over the scattered point field.
pub fn points(mode: PointMode, count: u64) -> Workload {
    let length = FIXED_CANVAS_SIZE;
    let pts = scatter_points(count as usize, f64::from(length), f64::from(length));
    let mut b = DisplayListBuilder::new();
    b.points(mode, pts.into(), INK);
    Workload {
        kind: "Points",
        variant: Some(mode.label().to_string()),
        size_param: count,
        canvas_width: length,
        canvas_height: length,
        list: b.freeze(),
        complexity: Some(count),
    }
}

fn image_handle(
    base: &Arc<RasterImage>,
    handles: ImageHandles,
) -> Arc<RasterImage> {
    match handles {
        // A structurally identical but distinct allocation per op.
        ImageHandles::Upload => Arc::new(RasterImage::clone(base)),
        ImageHandles::Texture => Arc::clone(base),
    }
}

/// Synthesizes the source image for image workloads: a solid blue bitmap for
/// `Upload`, or an offscreen-rendered red surface snapshot for `Texture`,
/// matching how uploaded vs. texture-backed sources differ in practice.
fn source_image(
    handles: ImageHandles,
    size: u64,
    provider: &mut dyn CanvasProvider,
) -> EncoreResult<Arc<RasterImage>> {
    match handles {
        ImageHandles::Upload => Ok(Arc::new(RasterImage::solid(
            size as u32,
            size as u32,
            Rgba8::BLUE,
        ))),
        ImageHandles::Texture => {
            let mut off = provider.make_offscreen_surface(size as u32, size as u32)?;
            off.draw_op(&crate::op::DrawOp::Rect {
                rect: Rect::new(0.0, 0.0, size as f64, size as f64),
                color: Rgba8::RED,
            })?;
            off.to_image()
        }
    }
}

/// Bitmaps drawn at slowly sliding offsets, wrapped to the canvas.
pub fn images(
    handles: ImageHandles,
    size: u64,
    provider: &mut dyn CanvasProvider,
) -> EncoreResult<Workload> {
    let canvas = (size * 2) as f64;
    let base = source_image(handles, size, provider)?;
    let mut dst = Point::new(0.0, 0.0);
    let mut b = DisplayListBuilder::with_capacity(IMAGES_TO_DRAW);
    for _ in 0..IMAGES_TO_DRAW {
        b.image(image_handle(&base, handles), dst, FilterMode::Nearest);
        dst += Vec2::new(STEP, STEP);
        if dst.x + size as f64 > canvas {
            dst.x = 0.0;
        }
        if dst.y + size as f64 > canvas {
            dst.y = 0.0;
        }
    }
    Ok(Workload {
        kind: "Image",
        variant: Some(handles.label().to_string()),
        size_param: size,
        canvas_width: (size * 2) as u32,
        canvas_height: (size * 2) as u32,
        list: b.freeze(),
        complexity: Some(IMAGES_TO_DRAW as u64),
    })
}

/// The center quarter of each bitmap drawn shrunk to 75% of the bitmap size.
pub fn image_rects(
    handles: ImageHandles,
    constraint: SrcRectConstraint,
    size: u64,
    provider: &mut dyn CanvasProvider,
) -> EncoreResult<Workload> {
    let canvas = (size * 2) as f64;
    let s = size as f64;
    let base = source_image(handles, size, provider)?;
    let src = Rect::new(s / 4.0, s / 4.0, s * 3.0 / 4.0, s * 3.0 / 4.0);
    let mut dst = Rect::new(0.0, 0.0, s * 0.75, s * 0.75);
    let mut b = DisplayListBuilder::with_capacity(IMAGES_TO_DRAW);
    for _ in 0..IMAGES_TO_DRAW {
        b.image_rect(
            image_handle(&base, handles),
            src,
            dst,
            FilterMode::Linear,
            constraint,
        );
        dst = dst + Vec2::new(STEP, STEP);
        if dst.x1 > canvas {
            dst = Rect::new(0.0, dst.y0, dst.width(), dst.y0 + dst.height());
        }
        if dst.y1 > canvas {
            dst = Rect::new(dst.x0, 0.0, dst.x0 + dst.width(), dst.height());
        }
    }
    Ok(Workload {
        kind: "ImageRect",
        variant: Some(format!("{}-{}", handles.label(), constraint.label())),
        size_param: size,
        canvas_width: (size * 2) as u32,
        canvas_height: (size * 2) as u32,
        list: b.freeze(),
        complexity: Some(IMAGES_TO_DRAW as u64),
    })
}

/// Nine-patch stretches of each bitmap, center patch = middle quarter.
pub fn image_nines(
    handles: ImageHandles,
    filter: FilterMode,
    size: u64,
    provider: &mut dyn CanvasProvider,
) -> EncoreResult<Workload> {
    let canvas = (size * 2) as f64;
    let s = size as f64;
    let base = source_image(handles, size, provider)?;
    let center = Rect::new(s / 4.0, s / 4.0, s * 3.0 / 4.0, s * 3.0 / 4.0);
    let mut dst = Rect::new(0.0, 0.0, s * 0.75, s * 0.75);
    let mut b = DisplayListBuilder::with_capacity(IMAGES_TO_DRAW);
    for _ in 0..IMAGES_TO_DRAW {
        b.image_nine(image_handle(&base, handles), center, dst, filter);
        dst = dst + Vec2::new(STEP, STEP);
        if dst.x1 > canvas {
            dst = Rect::new(0.0, dst.y0, dst.width(), dst.y0 + dst.height());
        }
        if dst.y1 > canvas {
            dst = Rect::new(dst.x0, 0.0, dst.x0 + dst.width(), dst.height());
        }
    }
    Ok(Workload {
        kind: "ImageNine",
        variant: Some(format!("{}-{}", handles.label(), filter.label())),
        size_param: size,
        canvas_width: (size * 2) as u32,
        canvas_height: (size * 2) as u32,
        list: b.freeze(),
        complexity: Some(IMAGES_TO_DRAW as u64),
    })
}

/// The glyph-run fragment every text workload tiles.
pub const TEXT_FRAGMENT: &str = "This text has exactly 32 glyphs.";

/// `runs` copies of a 32-glyph fragment, advancing left to right and wrapping
/// at the canvas in both axes.
pub fn text_blobs(runs: u64, font: FontBytes) -> EncoreResult<Workload> {
    let length = FIXED_CANVAS_SIZE;
    let fragment = shape_blob(TEXT_FRAGMENT, font, 16.0, None, INK)?;
    if fragment.bounds.width() <= 0.0 || fragment.bounds.height() <= 0.0 {
        return Err(EncoreError::validation(
            "shaped text fragment has empty bounds",
        ));
    }
    let columns = (f64::from(length) / fragment.bounds.width()).floor().max(1.0) as usize;
    let rows = (f64::from(length) / fragment.bounds.height()).floor().max(1.0) as usize;
    let blob = tile_blob(&fragment, runs as usize, columns, rows);
    let glyphs = blob.glyph_count() as u64;

    let mut b = DisplayListBuilder::new();
    b.text_blob(Arc::new(blob), Point::ZERO);
    Ok(Workload {
        kind: "TextBlob",
        variant: None,
        size_param: glyphs,
        canvas_width: length,
        canvas_height: length,
        list: b.freeze(),
        complexity: Some(glyphs),
    })
}

/// A shadow cast by a 10-sided polygon occluder of the chosen verb.
pub fn shadows(verb: PathVerb, elevation: u64, transparent_occluder: bool) -> Workload {
    let length = FIXED_CANVAS_SIZE;
    let center = Point::new(f64::from(length) / 2.0, f64::from(length) / 2.0);
    let radius = f64::from(length) * 0.25;
    let path = polygon_path(verb, 10, center, radius);

    let mut b = DisplayListBuilder::new();
    // Device pixel ratio is pinned at 1: it only ever scales elevation, and
    // elevation is already the swept parameter.
    b.shadow(
        Arc::new(path),
        Rgba8::BLUE,
        elevation as f64,
        transparent_occluder,
        1.0,
    );
    Workload {
        kind: "Shadow",
        variant: Some(format!(
            "{}-{}",
            verb.label(),
            if transparent_occluder {
                "Transparent"
            } else {
                "Opaque"
            }
        )),
        size_param: elevation,
        canvas_width: length,
        canvas_height: length,
        list: b.freeze(),
        complexity: None,
    }
}

/// Every runnable scenario, named for CLI/bench selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScenarioId {
    Lines,
    Rects,
    Ovals,
    Circles,
    RoundRects(RoundRectShape),
    Arcs,
    Paths(PathVerb),
    Vertices(VertexMode),
    Points(PointMode),
    Images(ImageHandles),
    ImageRects(ImageHandles, SrcRectConstraint),
    ImageNines(ImageHandles, FilterMode),
    TextBlobs,
    Shadows(PathVerb, bool),
}

impl ScenarioId {
    pub fn all() -> Vec<ScenarioId> {
        let mut out = vec![
            ScenarioId::Lines,
            ScenarioId::Rects,
            ScenarioId::Ovals,
            ScenarioId::Circles,
        ];
        out.extend(RoundRectShape::ALL.map(ScenarioId::RoundRects));
        out.push(ScenarioId::Arcs);
        out.extend(PathVerb::ALL.map(ScenarioId::Paths));
        out.extend(VertexMode::ALL.map(ScenarioId::Vertices));
        out.extend(PointMode::ALL.map(ScenarioId::Points));
        out.extend(ImageHandles::ALL.map(ScenarioId::Images));
        for handles in ImageHandles::ALL {
            for constraint in [SrcRectConstraint::Strict, SrcRectConstraint::Fast] {
                out.push(ScenarioId::ImageRects(handles, constraint));
            }
        }
        for handles in ImageHandles::ALL {
            for filter in [FilterMode::Nearest, FilterMode::Linear] {
                out.push(ScenarioId::ImageNines(handles, filter));
            }
        }
        out.push(ScenarioId::TextBlobs);
        for verb in PathVerb::ALL {
            for transparent in [false, true] {
                out.push(ScenarioId::Shadows(verb, transparent));
            }
        }
        out
    }

    pub fn name(&self) -> String {
        fn low(s: &str) -> String {
            s.to_ascii_lowercase()
        }
        match self {
            ScenarioId::Lines => "lines".into(),
            ScenarioId::Rects => "rects".into(),
            ScenarioId::Ovals => "ovals".into(),
            ScenarioId::Circles => "circles".into(),
            ScenarioId::RoundRects(shape) => format!("rrects-{}", low(shape.label())),
            ScenarioId::Arcs => "arcs".into(),
            ScenarioId::Paths(verb) => format!("paths-{}", low(verb.label())),
            ScenarioId::Vertices(mode) => format!("vertices-{}", low(mode.label())),
            ScenarioId::Points(mode) => format!("points-{}", low(mode.label())),
            ScenarioId::Images(handles) => format!("images-{}", low(handles.label())),
            ScenarioId::ImageRects(handles, constraint) => {
                format!("imagerects-{}-{}", low(handles.label()), low(constraint.label()))
            }
            ScenarioId::ImageNines(handles, filter) => {
                format!("imagenines-{}-{}", low(handles.label()), low(filter.label()))
            }
            ScenarioId::TextBlobs => "textblobs".into(),
            ScenarioId::Shadows(verb, transparent) => format!(
                "shadows-{}-{}",
                low(verb.label()),
                if *transparent { "transparent" } else { "opaque" }
            ),
        }
    }

    pub fn parse(name: &str) -> Option<ScenarioId> {
        Self::all().into_iter().find(|s| s.name() == name)
    }

    /// A size that completes quickly while still exercising the workload.
    pub fn default_size(&self) -> u64 {
        match self {
            ScenarioId::Lines
            | ScenarioId::Rects
            | ScenarioId::Ovals
            | ScenarioId::Circles
            | ScenarioId::RoundRects(_)
            | ScenarioId::Arcs => 64,
            ScenarioId::Paths(_) => 8,
            ScenarioId::Vertices(_) => 16,
            ScenarioId::Points(_) => 4096,
            ScenarioId::Images(_) | ScenarioId::ImageRects(..) | ScenarioId::ImageNines(..) => 64,
            ScenarioId::TextBlobs => 16,
            ScenarioId::Shadows(..) => 4,
        }
    }

    #[tracing::instrument(skip(ctx), fields(scenario = %self.name()))]
    pub fn build(&self, size: u64, ctx: &mut ScenarioCtx<'_>) -> EncoreResult<Workload> {
        match *self {
            ScenarioId::Lines => Ok(lines(size)),
            ScenarioId::Rects => Ok(rects(size)),
            ScenarioId::Ovals => Ok(ovals(size)),
            ScenarioId::Circles => Ok(circles(size)),
            ScenarioId::RoundRects(shape) => Ok(round_rects(shape, size)),
            ScenarioId::Arcs => Ok(arcs(size)),
            ScenarioId::Paths(verb) => Ok(paths(verb, size)),
            ScenarioId::Vertices(mode) => Ok(vertices(mode, size)),
            ScenarioId::Points(mode) => Ok(points(mode, size)),
            ScenarioId::Images(handles) => images(handles, size, ctx.provider),
            ScenarioId::ImageRects(handles, constraint) => {
                image_rects(handles, constraint, size, ctx.provider)
            }
            ScenarioId::ImageNines(handles, filter) => {
                image_nines(handles, filter, size, ctx.provider)
            }
            ScenarioId::TextBlobs => {
                let font = ctx.font.clone().ok_or_else(|| {
                    EncoreError::validation("textblobs scenario needs font bytes (--font)")
                })?;
                text_blobs(size, font)
            }
            ScenarioId::Shadows(verb, transparent) => Ok(shadows(verb, size, transparent)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rects_workload_stays_within_twice_the_side_length() {
        let length = 32u64;
        let w = rects(length);
        assert_eq!(w.list.len(), RECTS_TO_DRAW);
        let bounds = w.list.bounds();
        let canvas = (length * 2) as f64;
        assert!(bounds.x0 >= 0.0 && bounds.y0 >= 0.0);
        assert!(bounds.x1 <= canvas && bounds.y1 <= canvas, "{bounds:?}");
    }

    #[test]
    fn lines_workload_spans_the_canvas() {
        let w = lines(64);
        assert_eq!(w.list.len(), LINES_TO_DRAW);
        assert_eq!(w.list.bounds(), Rect::new(0.0, 0.0, 64.0, 64.0));
    }

    #[test]
    fn paths_complexity_scales_with_count() {
        for verb in PathVerb::ALL {
            let one = paths(verb, 1).complexity.unwrap();
            let five = paths(verb, 5).complexity.unwrap();
            assert_eq!(five, 5 * one, "{verb:?}");
        }
    }

    #[test]
    fn scenario_names_round_trip() {
        for id in ScenarioId::all() {
            assert_eq!(ScenarioId::parse(&id.name()), Some(id), "{}", id.name());
        }
    }

    #[test]
    fn snapshot_names_follow_the_contract() {
        let w = paths(PathVerb::Quad, 8);
        assert_eq!(w.snapshot_name("software"), "software-Path-Quads-8.png");
        let w = rects(64);
        assert_eq!(w.snapshot_name("software"), "software-Rect-64.png");
    }

    #[test]
    fn vertices_workload_counts_all_discs() {
        let w = vertices(VertexMode::Triangles, 4);
        assert_eq!(w.list.len(), 4);
        // 50 requested vertices -> 25 triangles of 3 vertices per disc.
        assert_eq!(w.complexity, Some(4 * 75));
    }

    #[test]
    fn shadow_workload_names_verb_and_occluder() {
        let w = shadows(PathVerb::Cubic, 4, true);
        assert_eq!(
            w.snapshot_name("software"),
            "software-Shadow-Cubics-Transparent-4.png"
        );
    }
}
