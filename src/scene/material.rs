use glam::Vec3;

use crate::render::{RenderTargetId, TextureId};

/// A sampled image a material can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureRef {
    Texture(TextureId),
    RenderTarget(RenderTargetId),
}

/// Lighting model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shading {
    /// Ambient plus directional Lambert.
    #[default]
    Lit,
    /// Colour and map only.
    Unlit,
}

/// Surface description of one primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// Linear RGB.
    pub color: Vec3,
    pub opacity: f32,
    /// Alpha-blended and drawn after opaque primitives.
    pub transparent: bool,
    pub map: Option<TextureRef>,
    pub shading: Shading,
    pub depth_test: bool,
    pub depth_write: bool,
}

impl Default for Material {
    fn default() -> Self {
        Self::lit(Vec3::ONE)
    }
}

impl Material {
    #[must_use]
    pub fn lit(color: Vec3) -> Self {
        Self {
            color,
            opacity: 1.0,
            transparent: false,
            map: None,
            shading: Shading::Lit,
            depth_test: true,
            depth_write: true,
        }
    }

    #[must_use]
    pub fn unlit(color: Vec3) -> Self {
        Self {
            shading: Shading::Unlit,
            ..Self::lit(color)
        }
    }

    #[must_use]
    pub fn with_map(mut self, map: TextureRef) -> Self {
        self.map = Some(map);
        self
    }

    #[must_use]
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self.transparent = true;
        self
    }

    /// Whether this primitive goes in the blended pass.
    #[inline]
    #[must_use]
    pub fn is_blended(&self) -> bool {
        self.transparent || self.opacity < 1.0
    }
}

/// Replaces every material during a render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OverrideMaterial {
    /// Writes black with alpha `(1 - depth) * darkness`; no depth test or write.
    DepthDarkness { darkness: f32 },
}

/// Converts a packed `0xRRGGBB` sRGB colour to linear RGB.
#[must_use]
pub fn srgb_hex(hex: u32) -> Vec3 {
    let channel = |shift: u32| srgb_to_linear(((hex >> shift) & 0xff) as f32 / 255.0);
    Vec3::new(channel(16), channel(8), channel(0))
}

#[must_use]
pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn srgb_hex_extremes() {
        assert_eq!(srgb_hex(0xffffff), Vec3::ONE);
        assert_eq!(srgb_hex(0x000000), Vec3::ZERO);
    }

    #[test]
    fn mid_grey_is_darker_in_linear() {
        let grey = srgb_hex(0x666666);
        assert!((grey.x - 0.1329).abs() < 1e-3, "got {grey}");
        assert_eq!(grey.x, grey.z);
    }
}
