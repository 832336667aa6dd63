//! Text blob construction.
//!
//! Shaping happens exactly once, at blob build time: Parley turns (font bytes,
//! string, size) into positioned glyphs, and the resulting [`TextBlob`] is a
//! flat, backend-agnostic glyph list. Backends never shape; they only
//! rasterize glyph ids at recorded positions.

use kurbo::Rect;

use crate::{
    core::Rgba8,
    error::{EncoreError, EncoreResult},
    op::{FontBytes, Glyph, TextBlob},
};

/// Brush carried through Parley styling; the blob keeps a single color, so the
/// brush only needs to exist.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct BlobBrush;

/// Shapes `text` with the given font into a [`TextBlob`].
///
/// `max_width_px` enables line breaking; `None` lays out a single line.
pub fn shape_blob(
    text: &str,
    font: FontBytes,
    size_px: f32,
    max_width_px: Option<f32>,
    color: Rgba8,
) -> EncoreResult<TextBlob> {
    if !size_px.is_finite() || size_px <= 0.0 {
        return Err(EncoreError::validation("text size_px must be finite and > 0"));
    }

    let mut font_ctx = parley::FontContext::default();
    let mut layout_ctx: parley::LayoutContext<BlobBrush> = parley::LayoutContext::new();

    let families = font_ctx
        .collection
        .register_fonts(parley::fontique::Blob::from(font.data.as_ref().clone()), None);
    let family_id = families
        .first()
        .map(|(id, _)| *id)
        .ok_or_else(|| EncoreError::validation("no font families registered from font bytes"))?;
    let family_name = font_ctx
        .collection
        .family_name(family_id)
        .ok_or_else(|| EncoreError::validation("registered font family has no name"))?
        .to_string();

    let mut builder = layout_ctx.ranged_builder(&mut font_ctx, text, 1.0, true);
    builder.push_default(parley::style::StyleProperty::FontStack(
        parley::style::FontStack::Source(std::borrow::Cow::Owned(family_name)),
    ));
    builder.push_default(parley::style::StyleProperty::FontSize(size_px));

    let mut layout: parley::Layout<BlobBrush> = builder.build(text);
    if let Some(w) = max_width_px {
        layout.break_all_lines(Some(w));
        layout.align(
            Some(w),
            parley::Alignment::Start,
            parley::AlignmentOptions::default(),
        );
    } else {
        layout.break_all_lines(None);
    }

    let mut glyphs = Vec::new();
    for line in layout.lines() {
        for item in line.items() {
            let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                continue;
            };
            glyphs.extend(run.glyphs().map(|g| Glyph {
                id: g.id,
                x: g.x,
                y: g.y,
            }));
        }
    }

    Ok(TextBlob {
        font,
        font_size: size_px,
        glyphs,
        color,
        bounds: Rect::new(
            0.0,
            0.0,
            f64::from(layout.width()),
            f64::from(layout.height()),
        ),
    })
}

/// Replicates a shaped blob `copies` times on a grid, advancing left to right
/// and wrapping in both axes at the given cell counts. Re-shaping is not
/// needed: glyph positions are translated copies of the original run.
pub fn tile_blob(blob: &TextBlob, copies: usize, columns: usize, rows: usize) -> TextBlob {
    let columns = columns.max(1);
    let rows = rows.max(1);
    let cell_w = blob.bounds.width() as f32;
    let cell_h = blob.bounds.height() as f32;

    let mut glyphs = Vec::with_capacity(blob.glyphs.len() * copies);
    let mut bounds = Rect::ZERO;
    for run in 0..copies {
        let col = run % columns;
        let row = (run / columns) % rows;
        let dx = col as f32 * cell_w;
        let dy = (row as f32 + 1.0) * cell_h;
        glyphs.extend(blob.glyphs.iter().map(|g| Glyph {
            id: g.id,
            x: g.x + dx,
            y: g.y + dy,
        }));
        bounds = bounds.union(
            blob.bounds + kurbo::Vec2::new(f64::from(dx), f64::from(dy)),
        );
    }

    TextBlob {
        font: blob.font.clone(),
        font_size: blob.font_size,
        glyphs,
        color: blob.color,
        bounds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic_blob() -> TextBlob {
        TextBlob {
            font: FontBytes::new(vec![0u8; 4]),
            font_size: 16.0,
            glyphs: vec![
                Glyph { id: 1, x: 0.0, y: 12.0 },
                Glyph { id: 2, x: 8.0, y: 12.0 },
            ],
            color: Rgba8::BLACK,
            bounds: Rect::new(0.0, 0.0, 16.0, 16.0),
        }
    }

    #[test]
    fn shape_rejects_nonpositive_size() {
        let font = FontBytes::new(vec![0u8; 4]);
        assert!(shape_blob("hi", font.clone(), 0.0, None, Rgba8::BLACK).is_err());
        assert!(shape_blob("hi", font, f32::NAN, None, Rgba8::BLACK).is_err());
    }

    #[test]
    fn tile_blob_multiplies_glyphs_and_offsets_columns() {
        let blob = synthetic_blob();
        let tiled = tile_blob(&blob, 3, 2, 4);
        assert_eq!(tiled.glyph_count(), 6);
        // Second copy sits one cell to the right, third wraps to the next row.
        assert_eq!(tiled.glyphs[2].x, blob.glyphs[0].x + 16.0);
        assert_eq!(tiled.glyphs[4].x, blob.glyphs[0].x);
        assert_eq!(tiled.glyphs[4].y, blob.glyphs[0].y + 32.0);
    }

    #[test]
    fn tile_blob_bounds_cover_all_copies() {
        let blob = synthetic_blob();
        let tiled = tile_blob(&blob, 4, 2, 4);
        assert!(tiled.bounds.width() >= 32.0 - 1e-9);
        assert!(tiled.bounds.height() >= 48.0 - 1e-9);
    }
}
