//! GPU backend built on `vello` + `wgpu`.
//!
//! Draw calls encode into a `vello::Scene`; submission renders the scene to a
//! private texture and, for readback, copies it through a row-padded staging
//! buffer. One device/queue/renderer triple is shared by the main surface and
//! any offscreen surfaces.
//!
//! Backend quality notes: shadows are drawn as offset silhouettes (no blur
//! pass here), and `Strict` source-rect sampling uses the same half-texel
//! inset approximation as the software backend.

use std::{
    path::Path,
    sync::{Arc, Mutex},
};

use kurbo::{Affine, BezPath, Rect, Shape};

use crate::{
    core::{FrameRgba8, Rgba8},
    error::{EncoreError, EncoreResult},
    op::{DrawOp, FontBytes, PointMode, RasterImage, arc_path, rounded_rect_path},
    render::{
        CanvasProvider, DrawTarget, PayloadCache, RenderSettings, effective_src, mean_color,
        nine_patch_cells, validate_surface_size,
    },
    snapshot,
};

struct GpuContext {
    device: vello::wgpu::Device,
    queue: vello::wgpu::Queue,
    renderer: Mutex<vello::Renderer>,
}

impl GpuContext {
    fn new() -> EncoreResult<Self> {
        let instance = vello::wgpu::Instance::new(&vello::wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(
            &vello::wgpu::RequestAdapterOptions {
                power_preference: vello::wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            },
        ))
        .map_err(|e| match e {
            vello::wgpu::RequestAdapterError::NotFound { .. } => {
                EncoreError::render("no gpu adapter available")
            }
            other => EncoreError::render(format!("wgpu request_adapter failed: {other:?}")),
        })?;

        let (device, queue) =
            pollster::block_on(adapter.request_device(&vello::wgpu::DeviceDescriptor {
                label: None,
                required_features: vello::wgpu::Features::empty(),
                required_limits: vello::wgpu::Limits::default(),
                experimental_features: vello::wgpu::ExperimentalFeatures::default(),
                memory_hints: vello::wgpu::MemoryHints::Performance,
                trace: vello::wgpu::Trace::Off,
            }))
            .map_err(|e| EncoreError::render(format!("wgpu request_device failed: {e:?}")))?;

        let renderer = vello::Renderer::new(&device, vello::RendererOptions::default())
            .map_err(|e| EncoreError::render(format!("vello renderer init failed: {e:?}")))?;

        Ok(Self {
            device,
            queue,
            renderer: Mutex::new(renderer),
        })
    }
}

pub struct GpuProvider {
    settings: RenderSettings,
    ctx: Arc<GpuContext>,
    surface: Option<GpuSurface>,
}

impl GpuProvider {
    /// Fails with "no gpu adapter available" where no usable GPU exists, so
    /// callers (and tests) can skip gracefully.
    pub fn new(settings: RenderSettings) -> EncoreResult<Self> {
        Ok(Self {
            settings,
            ctx: Arc::new(GpuContext::new()?),
            surface: None,
        })
    }
}

impl CanvasProvider for GpuProvider {
    fn initialize_surface(&mut self, width: u32, height: u32) -> EncoreResult<()> {
        validate_surface_size(width, height)?;
        self.surface = Some(GpuSurface::new(
            Arc::clone(&self.ctx),
            width,
            height,
            self.settings.clear_rgba,
        )?);
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
        Ok(Box::new(GpuSurface::new(
            Arc::clone(&self.ctx),
            width,
            height,
            None,
        )?))
    }

    fn flush_and_submit(&mut self, sync: bool) -> EncoreResult<()> {
        if let Some(s) = self.surface.as_mut() {
            s.submit()?;
        }
        if sync {
            self.ctx
                .device
                .poll(vello::wgpu::PollType::wait_indefinitely())
                .map_err(|e| EncoreError::render(format!("wgpu poll failed: {e:?}")))?;
        }
        Ok(())
    }

    fn snapshot(&mut self, path: &Path) -> EncoreResult<()> {
        let frame = self.surface()?.read_pixels()?;
        snapshot::write_png(path, &frame)
    }

    fn backend_name(&self) -> &'static str {
        "gpu"
    }
}

struct GpuSurface {
    ctx: Arc<GpuContext>,
    width: u32,
    height: u32,
    texture: vello::wgpu::Texture,
    view: vello::wgpu::TextureView,
    scene: vello::Scene,
    pending: bool,
    clear_rgba: Option<[u8; 4]>,
    images: PayloadCache<RasterImage, vello::peniko::ImageData>,
    fonts: PayloadCache<Vec<u8>, vello::peniko::FontData>,
}

impl GpuSurface {
    fn new(
        ctx: Arc<GpuContext>,
        width: u32,
        height: u32,
        clear_rgba: Option<[u8; 4]>,
    ) -> EncoreResult<Self> {
        let texture = ctx.device.create_texture(&vello::wgpu::TextureDescriptor {
            label: Some("encore_surface"),
            size: vello::wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: vello::wgpu::TextureDimension::D2,
            format: vello::wgpu::TextureFormat::Rgba8Unorm,
            usage: vello::wgpu::TextureUsages::STORAGE_BINDING
                | vello::wgpu::TextureUsages::TEXTURE_BINDING
                | vello::wgpu::TextureUsages::RENDER_ATTACHMENT
                | vello::wgpu::TextureUsages::COPY_SRC
                | vello::wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&vello::wgpu::TextureViewDescriptor::default());
        let mut surface = Self {
            ctx,
            width,
            height,
            texture,
            view,
            scene: vello::Scene::new(),
            pending: false,
            clear_rgba,
            images: PayloadCache::new(),
            fonts: PayloadCache::new(),
        };
        // Establish the clear color even if nothing is ever drawn.
        surface.pending = true;
        surface.submit()?;
        Ok(surface)
    }

    fn base_color(&self) -> vello::peniko::Color {
        match self.clear_rgba {
            Some([r, g, b, a]) => vello::peniko::Color::from_rgba8(r, g, b, a),
            None => vello::peniko::Color::from_rgba8(0, 0, 0, 0),
        }
    }

    /// Renders ops encoded since the last submit over the clear color, then
    /// resets the scene. Replay re-encodes the full list each iteration, so
    /// every submit carries the complete frame.
    fn submit(&mut self) -> EncoreResult<()> {
        if !self.pending {
            return Ok(());
        }
        tracing::debug!(width = self.width, height = self.height, "gpu submit");
        let mut renderer = self
            .ctx
            .renderer
            .lock()
            .map_err(|_| EncoreError::render("gpu renderer lock poisoned"))?;
        renderer
            .render_to_texture(
                &self.ctx.device,
                &self.ctx.queue,
                &self.scene,
                &self.view,
                &vello::RenderParams {
                    base_color: self.base_color(),
                    width: self.width,
                    height: self.height,
                    antialiasing_method: vello::AaConfig::Area,
                },
            )
            .map_err(|e| EncoreError::render(format!("vello render failed: {e:?}")))?;
        self.scene.reset();
        self.pending = false;
        Ok(())
    }

    fn image_data(&mut self, image: &Arc<RasterImage>) -> EncoreResult<vello::peniko::ImageData> {
        self.images.get_or_insert_with(image, |img| {
            Ok(vello::peniko::ImageData {
                data: vello::peniko::Blob::from(img.rgba8_premul().to_vec()),
                format: vello::peniko::ImageFormat::Rgba8,
                alpha_type: vello::peniko::ImageAlphaType::AlphaPremultiplied,
                width: img.width(),
                height: img.height(),
            })
        })
    }

    fn font_data(&mut self, font: &FontBytes) -> EncoreResult<vello::peniko::FontData> {
        let index = font.index;
        self.fonts.get_or_insert_with(&font.data, |bytes| {
            Ok(vello::peniko::FontData::new(
                vello::peniko::Blob::from(bytes.clone()),
                index,
            ))
        })
    }

    fn fill(&mut self, shape: &impl Shape, color: Rgba8) {
        self.scene.fill(
            vello::peniko::Fill::NonZero,
            Affine::IDENTITY,
            color_to_gpu(color),
            None,
            shape,
        );
        self.pending = true;
    }

    fn stroke(&mut self, shape: &impl Shape, color: Rgba8, width: f64) {
        self.scene.stroke(
            &kurbo::Stroke::new(width),
            Affine::IDENTITY,
            color_to_gpu(color),
            None,
            shape,
        );
        self.pending = true;
    }

    /// Draws `image` so that `src` (image pixels) maps exactly onto `dst`
    /// (canvas units), clipped to `dst`.
    fn draw_image_mapped(
        &mut self,
        image: vello::peniko::ImageData,
        src: Rect,
        dst: Rect,
    ) {
        let src = src.abs();
        let dst = dst.abs();
        if src.width() <= 0.0 || src.height() <= 0.0 || dst.width() <= 0.0 || dst.height() <= 0.0 {
            return;
        }
        let map = Affine::translate((dst.x0, dst.y0))
            * Affine::scale_non_uniform(dst.width() / src.width(), dst.height() / src.height())
            * Affine::translate((-src.x0, -src.y0));
        self.scene.push_layer(
            vello::peniko::Fill::NonZero,
            vello::peniko::BlendMode::default(),
            1.0,
            Affine::IDENTITY,
            &dst,
        );
        self.scene.draw_image(&image, map);
        self.scene.pop_layer();
        self.pending = true;
    }
}

impl DrawTarget for GpuSurface {
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
                self.stroke(&kurbo::Line::new(*p0, *p1), *color, *stroke_width);
            }
            DrawOp::Rect { rect, color } => self.fill(&rect.abs(), *color),
            DrawOp::Oval { rect, color } => {
                self.fill(&kurbo::Ellipse::from_rect(*rect), *color);
            }
            DrawOp::Circle {
                center,
                radius,
                color,
            } => {
                self.fill(&kurbo::Circle::new(*center, radius.abs()), *color);
            }
            DrawOp::RoundRect { rect, radii, color } => {
                self.fill(&rounded_rect_path(*rect, *radii), *color);
            }
            DrawOp::Arc {
                oval,
                start_deg,
                sweep_deg,
                use_center,
                color,
            } => {
                self.fill(&arc_path(*oval, *start_deg, *sweep_deg, *use_center), *color);
            }
            DrawOp::Path { path, color } => self.fill(&path.to_bez_path(), *color),
            DrawOp::Points {
                mode,
                points,
                color,
            } => match mode {
                PointMode::Points => {
                    for p in points.iter() {
                        self.fill(
                            &Rect::new(p.x - 0.5, p.y - 0.5, p.x + 0.5, p.y + 0.5),
                            *color,
                        );
                    }
                }
                PointMode::Lines => {
                    let mut path = BezPath::new();
                    for pair in points.chunks_exact(2) {
                        path.move_to(pair[0]);
                        path.line_to(pair[1]);
                    }
                    self.stroke(&path, *color, 1.0);
                }
                PointMode::Polygon => {
                    let mut iter = points.iter();
                    if let Some(first) = iter.next() {
                        let mut path = BezPath::new();
                        path.move_to(*first);
                        for p in iter {
                            path.line_to(*p);
                        }
                        self.stroke(&path, *color, 1.0);
                    }
                }
            },
            DrawOp::Vertices { mesh, blend: _ } => {
                let positions = mesh.positions();
                let colors = mesh.colors();
                let tris: Vec<[usize; 3]> = mesh.triangles().collect();
                for [a, b, c] in tris {
                    let mut tri = BezPath::new();
                    tri.move_to(positions[a]);
                    tri.line_to(positions[b]);
                    tri.line_to(positions[c]);
                    tri.close_path();
                    let color = mean_color(colors[a], colors[b], colors[c]);
                    self.fill(&tri, color);
                }
            }
            DrawOp::Image {
                image,
                dst,
                filter: _,
            } => {
                // `draw_image` samples with vello's default quality; the
                // per-op filter only distinguishes backends that expose it.
                let data = self.image_data(image)?;
                self.scene
                    .draw_image(&data, Affine::translate((dst.x, dst.y)));
                self.pending = true;
            }
            DrawOp::ImageRect {
                image,
                src,
                dst,
                filter,
                constraint,
            } => {
                let src = effective_src(*src, *filter, *constraint);
                let data = self.image_data(image)?;
                self.draw_image_mapped(data, src, *dst);
            }
            DrawOp::ImageNine {
                image,
                center,
                dst,
                filter: _,
            } => {
                let (iw, ih) = (f64::from(image.width()), f64::from(image.height()));
                let data = self.image_data(image)?;
                for (src, dst) in nine_patch_cells(iw, ih, *center, *dst) {
                    self.draw_image_mapped(data.clone(), src, dst);
                }
            }
            DrawOp::TextBlob { blob, origin } => {
                let font = self.font_data(&blob.font)?;
                self.scene
                    .draw_glyphs(&font)
                    .transform(Affine::translate((origin.x, origin.y)))
                    .font_size(blob.font_size)
                    .brush(color_to_gpu(blob.color))
                    .draw(
                        vello::peniko::Fill::NonZero,
                        blob.glyphs.iter().map(|g| vello::Glyph {
                            id: g.id,
                            x: g.x,
                            y: g.y,
                        }),
                    );
                self.pending = true;
            }
            DrawOp::Shadow {
                path,
                color,
                elevation,
                transparent_occluder,
                device_pixel_ratio,
            } => {
                let spread = (elevation * device_pixel_ratio).abs();
                let alpha = if *transparent_occluder { 0.45 } else { 0.25 };
                let bez = path.to_bez_path();
                self.scene.fill(
                    vello::peniko::Fill::NonZero,
                    Affine::translate((0.0, spread * 0.5)),
                    color_to_gpu(color.scale_alpha(alpha)),
                    None,
                    &bez,
                );
                self.pending = true;
            }
        }
        Ok(())
    }

    fn read_pixels(&mut self) -> EncoreResult<FrameRgba8> {
        self.submit()?;

        let bytes_per_row_unpadded = self
            .width
            .checked_mul(4)
            .ok_or_else(|| EncoreError::render("render target width overflow"))?;
        let bytes_per_row = align_to(
            bytes_per_row_unpadded,
            vello::wgpu::COPY_BYTES_PER_ROW_ALIGNMENT,
        );
        let buffer_size = (u64::from(bytes_per_row))
            .checked_mul(u64::from(self.height))
            .ok_or_else(|| EncoreError::render("readback buffer size overflow"))?;

        let readback = self
            .ctx
            .device
            .create_buffer(&vello::wgpu::BufferDescriptor {
                label: Some("encore_readback"),
                size: buffer_size,
                usage: vello::wgpu::BufferUsages::MAP_READ | vello::wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });

        let mut encoder =
            self.ctx
                .device
                .create_command_encoder(&vello::wgpu::CommandEncoderDescriptor {
                    label: Some("encore_readback_encoder"),
                });
        encoder.copy_texture_to_buffer(
            vello::wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: vello::wgpu::Origin3d::ZERO,
                aspect: vello::wgpu::TextureAspect::All,
            },
            vello::wgpu::TexelCopyBufferInfo {
                buffer: &readback,
                layout: vello::wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            vello::wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        self.ctx.queue.submit(Some(encoder.finish()));

        let buffer_slice = readback.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(vello::wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        self.ctx
            .device
            .poll(vello::wgpu::PollType::wait_indefinitely())
            .map_err(|e| EncoreError::render(format!("wgpu poll failed: {e:?}")))?;
        rx.recv()
            .map_err(|_| EncoreError::render("readback channel closed"))?
            .map_err(|e| EncoreError::render(format!("readback map failed: {e:?}")))?;

        let mapped = buffer_slice.get_mapped_range();
        let row_bytes = self.width as usize * 4;
        let padded_row_bytes = bytes_per_row as usize;
        let mut out = Vec::with_capacity(row_bytes * self.height as usize);
        for row in 0..self.height as usize {
            let start = row * padded_row_bytes;
            out.extend_from_slice(&mapped[start..start + row_bytes]);
        }
        drop(mapped);
        readback.unmap();

        Ok(FrameRgba8 {
            width: self.width,
            height: self.height,
            data: out,
            premultiplied: true,
        })
    }

    fn to_image(&mut self) -> EncoreResult<Arc<RasterImage>> {
        let frame = self.read_pixels()?;
        Ok(Arc::new(RasterImage::new(
            frame.width,
            frame.height,
            frame.data,
        )?))
    }
}

fn align_to(value: u32, alignment: u32) -> u32 {
    let mask = alignment - 1;
    (value + mask) & !mask
}

fn color_to_gpu(c: Rgba8) -> vello::peniko::Color {
    vello::peniko::Color::from_rgba8(c.r, c.g, c.b, c.a)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_to_rounds_up_to_the_alignment() {
        assert_eq!(align_to(1, 256), 256);
        assert_eq!(align_to(256, 256), 256);
        assert_eq!(align_to(257, 256), 512);
    }
}
