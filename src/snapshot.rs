//! Snapshot export: deterministic file names plus PNG encoding of read-back
//! frames.

use std::path::Path;

use crate::{core::FrameRgba8, error::{EncoreError, EncoreResult}};

/// Builds the canonical snapshot file name:
/// `{backend}-{kind}[-{variant}]-{size}.png`.
///
/// The same backend/scenario/parameter combination always maps to the same
/// name, which is what makes visual-diff tooling across backends possible.
pub fn snapshot_filename(backend: &str, kind: &str, variant: Option<&str>, size: u64) -> String {
    match variant {
        Some(v) => format!("{backend}-{kind}-{v}-{size}.png"),
        None => format!("{backend}-{kind}-{size}.png"),
    }
}

/// Encodes `frame` to a PNG at `path`, un-premultiplying if needed.
pub fn write_png(path: &Path, frame: &FrameRgba8) -> EncoreResult<()> {
    if frame.data.len() != frame.expected_len() {
        return Err(EncoreError::snapshot(format!(
            "frame buffer is {} bytes, expected {} for {}x{}",
            frame.data.len(),
            frame.expected_len(),
            frame.width,
            frame.height
        )));
    }

    let data = if frame.premultiplied {
        unpremultiply(&frame.data)
    } else {
        frame.data.clone()
    };

    let img = image::RgbaImage::from_raw(frame.width, frame.height, data)
        .ok_or_else(|| EncoreError::snapshot("frame dimensions do not match buffer"))?;
    img.save(path)
        .map_err(|e| EncoreError::snapshot(format!("write '{}': {e}", path.display())))
}

fn unpremultiply(premul: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(premul.len());
    for px in premul.chunks_exact(4) {
        let a = px[3];
        if a == 0 || a == 255 {
            out.extend_from_slice(px);
        } else {
            let un = |c: u8| -> u8 {
                ((u32::from(c) * 255 + u32::from(a) / 2) / u32::from(a)).min(255) as u8
            };
            out.extend_from_slice(&[un(px[0]), un(px[1]), un(px[2]), a]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_with_and_without_variant() {
        assert_eq!(
            snapshot_filename("software", "Rect", None, 64),
            "software-Rect-64.png"
        );
        assert_eq!(
            snapshot_filename("software", "Path", Some("Quads"), 8),
            "software-Path-Quads-8.png"
        );
    }

    #[test]
    fn unpremultiply_round_trips_opaque_and_transparent() {
        let premul = [10, 20, 30, 255, 0, 0, 0, 0];
        assert_eq!(unpremultiply(&premul), premul);
    }

    #[test]
    fn unpremultiply_recovers_half_alpha() {
        // 128/255 alpha, channel premultiplied from 200.
        let premul = [100, 100, 100, 128];
        let out = unpremultiply(&premul);
        assert_eq!(out[3], 128);
        assert!((i32::from(out[0]) - 199).abs() <= 1);
    }

    #[test]
    fn mismatched_frame_is_rejected() {
        let frame = FrameRgba8 {
            width: 2,
            height: 2,
            data: vec![0; 3],
            premultiplied: true,
        };
        let err = write_png(Path::new("/tmp/never-written.png"), &frame);
        assert!(err.is_err());
    }
}
