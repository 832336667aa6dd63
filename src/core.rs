//! Shared primitive types: colors and read-back frames.
//!
//! Geometry comes straight from [`kurbo`]; the crate re-exports the handful of
//! types that appear in the public API so callers don't need a direct kurbo
//! dependency for simple use.

pub use kurbo::{Affine, Point, Rect, Vec2};

/// Straight-alpha RGBA color, 8 bits per channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    pub const TRANSPARENT: Rgba8 = Rgba8::new(0, 0, 0, 0);
    pub const BLACK: Rgba8 = Rgba8::new(0, 0, 0, 255);
    pub const WHITE: Rgba8 = Rgba8::new(255, 255, 255, 255);
    pub const RED: Rgba8 = Rgba8::new(255, 0, 0, 255);
    pub const GREEN: Rgba8 = Rgba8::new(0, 255, 0, 255);
    pub const BLUE: Rgba8 = Rgba8::new(0, 0, 255, 255);
    pub const CYAN: Rgba8 = Rgba8::new(0, 255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub fn is_opaque(self) -> bool {
        self.a == 255
    }

    /// Returns a copy with the alpha channel scaled by `factor` (clamped to 0..=1).
    pub fn scale_alpha(self, factor: f64) -> Self {
        let a = (f64::from(self.a) * factor.clamp(0.0, 1.0)).round() as u8;
        Self { a, ..self }
    }

    /// Premultiplied representation, matching the byte layout of the raster
    /// surfaces this crate renders into.
    pub fn premultiplied(self) -> [u8; 4] {
        let af = u16::from(self.a) + 1;
        let premul = |c: u8| -> u8 { ((u16::from(c) * af) >> 8) as u8 };
        [premul(self.r), premul(self.g), premul(self.b), self.a]
    }
}

/// A frame of pixels read back from a surface.
#[derive(Clone, Debug)]
pub struct FrameRgba8 {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub premultiplied: bool,
}

impl FrameRgba8 {
    /// Byte length expected for the stated dimensions.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn premultiply_is_identity_for_opaque() {
        let c = Rgba8::opaque(12, 200, 90);
        assert_eq!(c.premultiplied(), [12, 200, 90, 255]);
    }

    #[test]
    fn premultiply_zero_alpha_is_zero() {
        let c = Rgba8::new(255, 255, 255, 0);
        assert_eq!(c.premultiplied(), [0, 0, 0, 0]);
    }

    #[test]
    fn scale_alpha_clamps() {
        assert_eq!(Rgba8::WHITE.scale_alpha(2.0).a, 255);
        assert_eq!(Rgba8::WHITE.scale_alpha(-1.0).a, 0);
        assert_eq!(Rgba8::WHITE.scale_alpha(0.5).a, 128);
    }
}
