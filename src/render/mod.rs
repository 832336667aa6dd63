//! Destination surfaces and the providers that own them.
//!
//! A [`crate::DisplayList`] knows nothing about pixels; it replays into a
//! [`DrawTarget`]. Concrete targets are owned by a [`CanvasProvider`], which
//! also handles offscreen allocation, submission, and snapshot export. Two
//! providers exist: a software one built on `vello_cpu` (always available) and
//! a GPU one built on `vello`/`wgpu` behind the `gpu` feature.

use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, Weak},
};

use kurbo::Rect;

use crate::{
    core::{FrameRgba8, Rgba8},
    error::{EncoreError, EncoreResult},
    op::{DrawOp, FilterMode, RasterImage, SrcRectConstraint},
};

pub mod cpu;
#[cfg(feature = "gpu")]
#[cfg_attr(docsrs, doc(cfg(feature = "gpu")))]
pub mod gpu;
pub mod parallel;

/// Something a display list can be replayed into.
///
/// Draw calls are buffered; they become pixels when the owning provider's
/// `flush_and_submit` runs (or implicitly on `read_pixels`/`to_image`).
pub trait DrawTarget {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Issues one operation. Content outside the target is clipped silently;
    /// only a genuinely broken backend state is an error.
    fn draw_op(&mut self, op: &DrawOp) -> EncoreResult<()>;

    /// Current contents as premultiplied RGBA8, rasterizing any buffered ops
    /// first.
    fn read_pixels(&mut self) -> EncoreResult<FrameRgba8>;

    /// Snapshots current contents into a shareable source image.
    fn to_image(&mut self) -> EncoreResult<Arc<RasterImage>>;
}

/// Owner of a concrete destination surface plus offscreen scratch surfaces.
pub trait CanvasProvider {
    /// Allocates a destination of exactly the requested pixel size, replacing
    /// any prior one. A zero dimension is a programmer error and fails fast.
    fn initialize_surface(&mut self, width: u32, height: u32) -> EncoreResult<()>;

    /// The current destination, for use with
    /// [`DisplayList::render_to`](crate::DisplayList::render_to).
    fn surface(&mut self) -> EncoreResult<&mut dyn DrawTarget>;

    /// An independent surface used to synthesize source images without
    /// disturbing the main destination.
    fn make_offscreen_surface(&mut self, width: u32, height: u32)
    -> EncoreResult<Box<dyn DrawTarget>>;

    /// Forces backend-deferred work to complete. With `sync` the call blocks
    /// until rasterization is done, which is required before timing or snapshotting;
    /// otherwise measured latency reflects only command submission.
    fn flush_and_submit(&mut self, sync: bool) -> EncoreResult<()>;

    /// Encodes the current destination contents to a PNG at `path`.
    fn snapshot(&mut self, path: &Path) -> EncoreResult<()>;

    /// Stable identifier distinguishing results across backend
    /// implementations.
    fn backend_name(&self) -> &'static str;
}

/// Which backend a provider should be built on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    Cpu,
    #[cfg(feature = "gpu")]
    #[cfg_attr(docsrs, doc(cfg(feature = "gpu")))]
    Gpu,
}

#[derive(Clone, Debug, Default)]
pub struct RenderSettings {
    /// Straight-alpha color the main surface is cleared to at allocation;
    /// `None` clears to transparent.
    pub clear_rgba: Option<[u8; 4]>,
}

pub fn create_provider(
    kind: BackendKind,
    settings: &RenderSettings,
) -> EncoreResult<Box<dyn CanvasProvider>> {
    match kind {
        BackendKind::Cpu => Ok(Box::new(cpu::CpuProvider::new(settings.clone()))),
        #[cfg(feature = "gpu")]
        BackendKind::Gpu => Ok(Box::new(gpu::GpuProvider::new(settings.clone())?)),
    }
}

/// Backend-side cache of converted payloads, keyed by the `Arc` identity of
/// the source object.
///
/// Holding a `Weak` alongside each entry makes address reuse safe: if the
/// original payload was dropped, the upgrade fails (or yields a different
/// allocation) and the stale entry is replaced instead of served.
pub(crate) struct PayloadCache<K, V> {
    entries: HashMap<usize, (Weak<K>, V)>,
}

impl<K, V: Clone> PayloadCache<K, V> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    pub fn get_or_insert_with(
        &mut self,
        key: &Arc<K>,
        make: impl FnOnce(&K) -> EncoreResult<V>,
    ) -> EncoreResult<V> {
        let addr = Arc::as_ptr(key) as usize;
        if let Some((weak, value)) = self.entries.get(&addr)
            && let Some(live) = weak.upgrade()
            && Arc::ptr_eq(&live, key)
        {
            return Ok(value.clone());
        }
        let value = make(key)?;
        self.entries
            .insert(addr, (Arc::downgrade(key), value.clone()));
        Ok(value)
    }
}

pub(crate) fn validate_surface_size(width: u32, height: u32) -> EncoreResult<()> {
    if width == 0 || height == 0 {
        return Err(EncoreError::validation(format!(
            "surface size must be nonzero, got {width}x{height}"
        )));
    }
    Ok(())
}

/// Strict sampling cannot read outside the source rect; with linear filtering
/// that is approximated by insetting the sample window half a texel.
pub(crate) fn effective_src(src: Rect, filter: FilterMode, constraint: SrcRectConstraint) -> Rect {
    match (constraint, filter) {
        (SrcRectConstraint::Strict, FilterMode::Linear) => src.abs().inflate(-0.5, -0.5),
        _ => src,
    }
}

/// Splits a nine-patch draw into up to nine (src, dst) cell pairs: corners at
/// natural size, edges stretched along one axis, center stretched in both.
pub(crate) fn nine_patch_cells(iw: f64, ih: f64, center: Rect, dst: Rect) -> Vec<(Rect, Rect)> {
    let center = center.abs();
    let dst = dst.abs();
    let cx0 = center.x0.clamp(0.0, iw);
    let cx1 = center.x1.clamp(cx0, iw);
    let cy0 = center.y0.clamp(0.0, ih);
    let cy1 = center.y1.clamp(cy0, ih);

    let left = cx0;
    let right = iw - cx1;
    let top = cy0;
    let bottom = ih - cy1;

    // Corners shrink proportionally when the destination is too small for
    // them at natural size.
    let x_scale = (dst.width() / (left + right)).min(1.0);
    let y_scale = (dst.height() / (top + bottom)).min(1.0);
    let (left_d, right_d) = (left * x_scale, right * x_scale);
    let (top_d, bottom_d) = (top * y_scale, bottom * y_scale);

    let src_x = [0.0, cx0, cx1, iw];
    let src_y = [0.0, cy0, cy1, ih];
    let dst_x = [dst.x0, dst.x0 + left_d, dst.x1 - right_d, dst.x1];
    let dst_y = [dst.y0, dst.y0 + top_d, dst.y1 - bottom_d, dst.y1];

    let mut cells = Vec::with_capacity(9);
    for row in 0..3 {
        for col in 0..3 {
            let src = Rect::new(src_x[col], src_y[row], src_x[col + 1], src_y[row + 1]);
            let dst = Rect::new(dst_x[col], dst_y[row], dst_x[col + 1], dst_y[row + 1]);
            if src.width() > 0.0 && src.height() > 0.0 && dst.width() > 0.0 && dst.height() > 0.0 {
                cells.push((src, dst));
            }
        }
    }
    cells
}

/// Flat-shade color for a triangle: the mean of its corner colors.
pub(crate) fn mean_color(a: Rgba8, b: Rgba8, c: Rgba8) -> Rgba8 {
    let avg =
        |x: u8, y: u8, z: u8| -> u8 { ((u16::from(x) + u16::from(y) + u16::from(z)) / 3) as u8 };
    Rgba8::new(
        avg(a.r, b.r, c.r),
        avg(a.g, b.g, c.g),
        avg(a.b, b.b, c.b),
        avg(a.a, b.a, c.a),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_cache_hits_on_same_arc() {
        let mut cache: PayloadCache<u32, u32> = PayloadCache::new();
        let key = Arc::new(7u32);
        let mut builds = 0;
        for _ in 0..3 {
            let v = cache
                .get_or_insert_with(&key, |k| {
                    builds += 1;
                    Ok(*k * 2)
                })
                .unwrap();
            assert_eq!(v, 14);
        }
        assert_eq!(builds, 1);
    }

    #[test]
    fn payload_cache_rebuilds_after_source_drop() {
        let mut cache: PayloadCache<u32, u32> = PayloadCache::new();
        let key = Arc::new(1u32);
        cache.get_or_insert_with(&key, |_| Ok(10)).unwrap();
        drop(key);

        // A new Arc may or may not reuse the address; either way the weak
        // check forces a rebuild rather than serving the old value blindly.
        let key2 = Arc::new(2u32);
        let v = cache.get_or_insert_with(&key2, |k| Ok(*k * 10)).unwrap();
        assert_eq!(v, 20);
    }

    #[test]
    fn zero_surface_size_fails_fast() {
        assert!(validate_surface_size(0, 10).is_err());
        assert!(validate_surface_size(10, 0).is_err());
        assert!(validate_surface_size(1, 1).is_ok());
    }

    #[test]
    fn nine_patch_has_nine_cells_for_a_roomy_destination() {
        let cells = nine_patch_cells(
            64.0,
            64.0,
            Rect::new(16.0, 16.0, 48.0, 48.0),
            Rect::new(0.0, 0.0, 128.0, 128.0),
        );
        assert_eq!(cells.len(), 9);
        // Corners keep their natural size.
        let (src, dst) = cells[0];
        assert_eq!(src, Rect::new(0.0, 0.0, 16.0, 16.0));
        assert_eq!(dst, Rect::new(0.0, 0.0, 16.0, 16.0));
        // The center stretches.
        let (src, dst) = cells[4];
        assert_eq!(src, Rect::new(16.0, 16.0, 48.0, 48.0));
        assert_eq!(dst, Rect::new(16.0, 16.0, 112.0, 112.0));
    }

    #[test]
    fn nine_patch_shrinks_corners_when_destination_is_tiny() {
        let cells = nine_patch_cells(
            64.0,
            64.0,
            Rect::new(16.0, 16.0, 48.0, 48.0),
            Rect::new(0.0, 0.0, 16.0, 16.0),
        );
        for (_, dst) in cells {
            assert!(dst.width() <= 16.0 && dst.height() <= 16.0);
        }
    }

    #[test]
    fn strict_linear_sampling_insets_half_a_texel() {
        let src = Rect::new(4.0, 4.0, 12.0, 12.0);
        assert_eq!(
            effective_src(src, FilterMode::Linear, SrcRectConstraint::Strict),
            Rect::new(4.5, 4.5, 11.5, 11.5)
        );
        assert_eq!(
            effective_src(src, FilterMode::Nearest, SrcRectConstraint::Strict),
            src
        );
        assert_eq!(effective_src(src, FilterMode::Linear, SrcRectConstraint::Fast), src);
    }

    #[test]
    fn mean_color_averages_channels() {
        let m = mean_color(Rgba8::RED, Rgba8::GREEN, Rgba8::BLUE);
        assert_eq!((m.r, m.g, m.b, m.a), (85, 85, 85, 255));
    }
}
