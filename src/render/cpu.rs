//! Software backend built on `vello_cpu`.
//!
//! Each surface owns a pixmap plus a lazily created render context. Draw calls
//! encode into the context; submission rasterizes everything encoded since the
//! previous submit onto the pixmap. The context lives in `vello_cpu`'s own
//! kurbo types, so geometry is converted at the boundary.

use std::{path::Path, sync::Arc};

use kurbo::{Affine, BezPath, Point, Rect, Shape};

use crate::{
    blur,
    core::{FrameRgba8, Rgba8},
    error::{EncoreError, EncoreResult},
    op::{DrawOp, FilterMode, FontBytes, PointMode, RasterImage, arc_path, rounded_rect_path},
    render::{
        CanvasProvider, DrawTarget, PayloadCache, RenderSettings, effective_src, mean_color,
        nine_patch_cells, validate_surface_size,
    },
    snapshot,
};

pub struct CpuProvider {
    settings: RenderSettings,
    surface: Option<CpuSurface>,
}

impl CpuProvider {
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            settings,
            surface: None,
        }
    }
}

impl CanvasProvider for CpuProvider {
    fn initialize_surface(&mut self, width: u32, height: u32) -> EncoreResult<()> {
        validate_surface_size(width, height)?;
        self.surface = Some(CpuSurface::new(width, height, self.settings.clear_rgba)?);
        Ok(())
    }

    fn surface(&mut self) -> EncoreResult<&mut dyn DrawTarget> {
        match self.surface.as_mut() {
            Some(s) => Ok(s),
            None => Err(EncoreError::validation(
                "surface not initialized (call initialize_surface first)",
            )),
        }
    }

    fn make_offscreen_surface(
        &mut self,
        width: u32,
        height: u32,
    ) -> EncoreResult<Box<dyn DrawTarget>> {
        validate_surface_size(width, height)?;
        Ok(Box::new(CpuSurface::new(width, height, None)?))
    }

    fn flush_and_submit(&mut self, _sync: bool) -> EncoreResult<()> {
        // The software rasterizer is synchronous; submit always completes
        // before returning.
        if let Some(s) = self.surface.as_mut() {
            s.submit();
        }
        Ok(())
    }

    fn snapshot(&mut self, path: &Path) -> EncoreResult<()> {
        let frame = self.surface()?.read_pixels()?;
        snapshot::write_png(path, &frame)
    }

    fn backend_name(&self) -> &'static str {
        "software"
    }
}

pub struct CpuSurface {
    width: u32,
    height: u32,
    pixmap: vello_cpu::Pixmap,
    ctx: Option<vello_cpu::RenderContext>,
    images: PayloadCache<RasterImage, Arc<vello_cpu::Pixmap>>,
    fonts: PayloadCache<Vec<u8>, vello_cpu::peniko::FontData>,
}

impl CpuSurface {
    fn new(width: u32, height: u32, clear_rgba: Option<[u8; 4]>) -> EncoreResult<Self> {
        let (w16, h16) = dims_u16(width, height)?;
        let mut pixmap = vello_cpu::Pixmap::new(w16, h16);
        let premul = clear_rgba
            .map(|[r, g, b, a]| Rgba8::new(r, g, b, a).premultiplied())
            .unwrap_or([0, 0, 0, 0]);
        clear_pixmap(&mut pixmap, premul);
        Ok(Self {
            width,
            height,
            pixmap,
            ctx: None,
            images: PayloadCache::new(),
            fonts: PayloadCache::new(),
        })
    }

    fn ctx(&mut self) -> EncoreResult<&mut vello_cpu::RenderContext> {
        if self.ctx.is_none() {
            let (w16, h16) = dims_u16(self.width, self.height)?;
            self.ctx = Some(vello_cpu::RenderContext::new(w16, h16));
        }
        Ok(self.ctx.as_mut().expect("context just created"))
    }

    /// Rasterizes everything encoded since the last submit onto the pixmap.
    fn submit(&mut self) {
        if let Some(mut ctx) = self.ctx.take() {
            tracing::debug!(width = self.width, height = self.height, "cpu submit");
            ctx.flush();
            ctx.render_to_pixmap(&mut self.pixmap);
        }
    }

    fn image_pixmap(&mut self, image: &Arc<RasterImage>) -> EncoreResult<Arc<vello_cpu::Pixmap>> {
        self.images.get_or_insert_with(image, |img| {
            Ok(Arc::new(premul_bytes_to_pixmap(
                img.rgba8_premul(),
                img.width(),
                img.height(),
            )?))
        })
    }

    fn image_paint(
        &mut self,
        image: &Arc<RasterImage>,
        filter: FilterMode,
    ) -> EncoreResult<vello_cpu::Image> {
        let pixmap = self.image_pixmap(image)?;
        Ok(vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(pixmap),
            sampler: sampler_for(filter),
        })
    }

    fn font_data(&mut self, font: &FontBytes) -> EncoreResult<vello_cpu::peniko::FontData> {
        let index = font.index;
        self.fonts.get_or_insert_with(&font.data, |bytes| {
            Ok(vello_cpu::peniko::FontData::new(
                vello_cpu::peniko::Blob::from(bytes.clone()),
                index,
            ))
        })
    }
}

impl DrawTarget for CpuSurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn draw_op(&mut self, op: &DrawOp) -> EncoreResult<()> {
        match op {
            DrawOp::Line {
                p0,
                p1,
                color,
                stroke_width,
            } => {
                let (p0, p1, color, width) = (*p0, *p1, *color, *stroke_width);
                let ctx = self.ctx()?;
                reset(ctx);
                ctx.set_paint(color_to_cpu(color));
                ctx.set_stroke(vello_cpu::kurbo::Stroke::new(width));
                let mut path = vello_cpu::kurbo::BezPath::new();
                path.move_to(point_to_cpu(p0));
                path.line_to(point_to_cpu(p1));
                ctx.stroke_path(&path);
            }
            DrawOp::Rect { rect, color } => {
                let (rect, color) = (*rect, *color);
                let ctx = self.ctx()?;
                reset(ctx);
                ctx.set_paint(color_to_cpu(color));
                ctx.fill_rect(&rect_to_cpu(rect));
            }
            DrawOp::Oval { rect, color } => {
                let bez = kurbo::Ellipse::from_rect(*rect).to_path(0.1);
                self.fill_bez(&bez, *color)?;
            }
            DrawOp::Circle {
                center,
                radius,
                color,
            } => {
                let bez = kurbo::Circle::new(*center, radius.abs()).to_path(0.1);
                self.fill_bez(&bez, *color)?;
            }
            DrawOp::RoundRect { rect, radii, color } => {
                let bez = rounded_rect_path(*rect, *radii);
                self.fill_bez(&bez, *color)?;
            }
            DrawOp::Arc {
                oval,
                start_deg,
                sweep_deg,
                use_center,
                color,
            } => {
                let bez = arc_path(*oval, *start_deg, *sweep_deg, *use_center);
                self.fill_bez(&bez, *color)?;
            }
            DrawOp::Path { path, color } => {
                let bez = path.to_bez_path();
                self.fill_bez(&bez, *color)?;
            }
            DrawOp::Points {
                mode,
                points,
                color,
            } => {
                let (mode, color) = (*mode, *color);
                let points: Vec<Point> = points.iter().copied().collect();
                let ctx = self.ctx()?;
                reset(ctx);
                ctx.set_paint(color_to_cpu(color));
                match mode {
                    PointMode::Points => {
                        for p in &points {
                            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
                                p.x - 0.5,
                                p.y - 0.5,
                                p.x + 0.5,
                                p.y + 0.5,
                            ));
                        }
                    }
                    PointMode::Lines => {
                        let mut path = vello_cpu::kurbo::BezPath::new();
                        for pair in points.chunks_exact(2) {
                            path.move_to(point_to_cpu(pair[0]));
                            path.line_to(point_to_cpu(pair[1]));
                        }
                        ctx.set_stroke(vello_cpu::kurbo::Stroke::new(1.0));
                        ctx.stroke_path(&path);
                    }
                    PointMode::Polygon => {
                        let mut path = vello_cpu::kurbo::BezPath::new();
                        let mut iter = points.iter();
                        if let Some(first) = iter.next() {
                            path.move_to(point_to_cpu(*first));
                            for p in iter {
                                path.line_to(point_to_cpu(*p));
                            }
                            ctx.set_stroke(vello_cpu::kurbo::Stroke::new(1.0));
                            ctx.stroke_path(&path);
                        }
                    }
                }
            }
            DrawOp::Vertices { mesh, blend: _ } => {
                // Per-triangle flat shading: the mean of the three corner
                // colors. `Src` blend coincides with `SrcOver` for the opaque
                // palette the generators emit; translucent `Src` falls back
                // to `SrcOver`.
                let positions = mesh.positions().to_vec();
                let colors = mesh.colors().to_vec();
                let tris: Vec<[usize; 3]> = mesh.triangles().collect();
                let ctx = self.ctx()?;
                reset(ctx);
                for [a, b, c] in tris {
                    ctx.set_paint(color_to_cpu(mean_color(colors[a], colors[b], colors[c])));
                    let mut tri = vello_cpu::kurbo::BezPath::new();
                    tri.move_to(point_to_cpu(positions[a]));
                    tri.line_to(point_to_cpu(positions[b]));
                    tri.line_to(point_to_cpu(positions[c]));
                    tri.close_path();
                    ctx.fill_path(&tri);
                }
            }
            DrawOp::Image { image, dst, filter } => {
                let paint = self.image_paint(image, *filter)?;
                let (w, h) = (f64::from(image.width()), f64::from(image.height()));
                let dst = *dst;
                let ctx = self.ctx()?;
                reset(ctx);
                ctx.set_transform(affine_to_cpu(Affine::translate((dst.x, dst.y))));
                ctx.set_paint(paint);
                ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, w, h));
            }
            DrawOp::ImageRect {
                image,
                src,
                dst,
                filter,
                constraint,
            } => {
                let src = effective_src(*src, *filter, *constraint);
                let paint = self.image_paint(image, *filter)?;
                self.fill_mapped_image(paint, src, *dst)?;
            }
            DrawOp::ImageNine {
                image,
                center,
                dst,
                filter,
            } => {
                let (iw, ih) = (f64::from(image.width()), f64::from(image.height()));
                let cells = nine_patch_cells(iw, ih, *center, *dst);
                let paint = self.image_paint(image, *filter)?;
                for (src, dst) in cells {
                    self.fill_mapped_image(paint.clone(), src, dst)?;
                }
            }
            DrawOp::TextBlob { blob, origin } => {
                let font = self.font_data(&blob.font)?;
                let origin = *origin;
                let color = blob.color;
                let size = blob.font_size;
                let glyphs: Vec<vello_cpu::Glyph> = blob
                    .glyphs
                    .iter()
                    .map(|g| vello_cpu::Glyph {
                        id: g.id,
                        x: g.x,
                        y: g.y,
                    })
                    .collect();
                let ctx = self.ctx()?;
                reset(ctx);
                ctx.set_transform(affine_to_cpu(Affine::translate((origin.x, origin.y))));
                ctx.set_paint(color_to_cpu(color));
                ctx.glyph_run(&font)
                    .font_size(size)
                    .fill_glyphs(glyphs.into_iter());
            }
            DrawOp::Shadow {
                path,
                color,
                elevation,
                transparent_occluder,
                device_pixel_ratio,
            } => {
                self.draw_shadow(
                    path.to_bez_path(),
                    *color,
                    *elevation,
                    *transparent_occluder,
                    *device_pixel_ratio,
                    op.bounds(),
                )?;
            }
        }
        Ok(())
    }

    fn read_pixels(&mut self) -> EncoreResult<FrameRgba8> {
        self.submit();
        Ok(FrameRgba8 {
            width: self.width,
            height: self.height,
            data: self.pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        })
    }

    fn to_image(&mut self) -> EncoreResult<Arc<RasterImage>> {
        self.submit();
        Ok(Arc::new(RasterImage::new(
            self.width,
            self.height,
            self.pixmap.data_as_u8_slice().to_vec(),
        )?))
    }
}

impl CpuSurface {
    fn fill_bez(&mut self, bez: &BezPath, color: Rgba8) -> EncoreResult<()> {
        let ctx = self.ctx()?;
        reset(ctx);
        ctx.set_paint(color_to_cpu(color));
        ctx.fill_path(&bezpath_to_cpu(bez));
        Ok(())
    }

    /// Fills `dst` with the image paint, transformed so `src` (in image
    /// pixels) lands exactly on `dst` (in canvas units).
    fn fill_mapped_image(
        &mut self,
        paint: vello_cpu::Image,
        src: Rect,
        dst: Rect,
    ) -> EncoreResult<()> {
        let src = src.abs();
        let dst = dst.abs();
        if src.width() <= 0.0 || src.height() <= 0.0 || dst.width() <= 0.0 || dst.height() <= 0.0 {
            return Ok(());
        }
        let map = Affine::translate((dst.x0, dst.y0))
            * Affine::scale_non_uniform(dst.width() / src.width(), dst.height() / src.height())
            * Affine::translate((-src.x0, -src.y0));
        let ctx = self.ctx()?;
        reset(ctx);
        ctx.set_transform(affine_to_cpu(map));
        ctx.set_paint(paint);
        ctx.fill_rect(&rect_to_cpu(src));
        Ok(())
    }

    fn draw_shadow(
        &mut self,
        occluder: BezPath,
        color: Rgba8,
        elevation: f64,
        transparent_occluder: bool,
        device_pixel_ratio: f64,
        bounds: Option<Rect>,
    ) -> EncoreResult<()> {
        let Some(bounds) = bounds else {
            return Ok(());
        };
        let spread = (elevation * device_pixel_ratio).abs();
        let sigma = spread * 0.25;
        let radius = (sigma * 2.0).ceil() as u32;
        let offset_y = spread * 0.5;

        let w = bounds.width().ceil().max(1.0) as u32;
        let h = bounds.height().ceil().max(1.0) as u32;
        let (w16, h16) = dims_u16(w, h)?;

        // Rasterize the occluder silhouette alone, in bounds-local
        // coordinates, then blur and composite the result as an image so it
        // keeps its place in the op order.
        let alpha = if transparent_occluder { 0.45 } else { 0.25 };
        let mut scratch = vello_cpu::RenderContext::new(w16, h16);
        scratch.set_transform(affine_to_cpu(Affine::translate((-bounds.x0, -bounds.y0))));
        scratch.set_paint(color_to_cpu(color.scale_alpha(alpha)));
        scratch.fill_path(&bezpath_to_cpu(&occluder));
        scratch.flush();
        let mut silhouette = vello_cpu::Pixmap::new(w16, h16);
        scratch.render_to_pixmap(&mut silhouette);

        let blurred = blur::blur_rgba8_premul(
            silhouette.data_as_u8_slice(),
            u32::from(w16),
            u32::from(h16),
            radius,
            sigma.max(f64::EPSILON),
        )?;
        let pixmap = premul_bytes_to_pixmap(&blurred, u32::from(w16), u32::from(h16))?;
        let paint = vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: sampler_for(FilterMode::Nearest),
        };

        let ctx = self.ctx()?;
        reset(ctx);
        ctx.set_transform(affine_to_cpu(Affine::translate((
            bounds.x0,
            bounds.y0 + offset_y,
        ))));
        ctx.set_paint(paint);
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(w16),
            f64::from(h16),
        ));
        Ok(())
    }
}

fn reset(ctx: &mut vello_cpu::RenderContext) {
    ctx.set_transform(vello_cpu::kurbo::Affine::IDENTITY);
    ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
}

fn sampler_for(filter: FilterMode) -> vello_cpu::peniko::ImageSampler {
    vello_cpu::peniko::ImageSampler {
        quality: match filter {
            FilterMode::Nearest => vello_cpu::peniko::ImageQuality::Low,
            FilterMode::Linear => vello_cpu::peniko::ImageQuality::Medium,
        },
        ..Default::default()
    }
}

fn dims_u16(width: u32, height: u32) -> EncoreResult<(u16, u16)> {
    let w: u16 = width
        .try_into()
        .map_err(|_| EncoreError::validation("surface width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| EncoreError::validation("surface height exceeds u16"))?;
    Ok((w, h))
}

fn clear_pixmap(pixmap: &mut vello_cpu::Pixmap, rgba: [u8; 4]) {
    for px in pixmap.data_as_u8_slice_mut().chunks_exact_mut(4) {
        px.copy_from_slice(&rgba);
    }
}

fn color_to_cpu(c: Rgba8) -> vello_cpu::peniko::Color {
    vello_cpu::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a)
}

fn point_to_cpu(p: Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

fn rect_to_cpu(r: Rect) -> vello_cpu::kurbo::Rect {
    vello_cpu::kurbo::Rect::new(r.x0, r.y0, r.x1, r.y1)
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point_to_cpu(p1), point_to_cpu(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to(point_to_cpu(p1), point_to_cpu(p2), point_to_cpu(p3));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

fn premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> EncoreResult<vello_cpu::Pixmap> {
    let (w, h) = dims_u16(width, height)?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(EncoreError::render("image byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dims_reject_oversized_surfaces() {
        assert!(dims_u16(1, 1).is_ok());
        assert!(dims_u16(u32::from(u16::MAX), 1).is_ok());
        assert!(dims_u16(u32::from(u16::MAX) + 1, 1).is_err());
    }

    #[test]
    fn clear_pixmap_floods_every_pixel() {
        let mut pixmap = vello_cpu::Pixmap::new(3, 2);
        clear_pixmap(&mut pixmap, [1, 2, 3, 4]);
        for px in pixmap.data_as_u8_slice().chunks_exact(4) {
            assert_eq!(px, [1, 2, 3, 4]);
        }
    }
}
