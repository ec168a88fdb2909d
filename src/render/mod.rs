//! Render Backend Abstraction
//!
//! Everything the viewer core asks of the GPU goes through [`RenderBackend`].
//!
//! # Overview
//!
//! - [`RenderBackend`]: the trait seam. Implemented by the wgpu
//!   [`GpuRenderer`](crate::renderer::GpuRenderer) and by
//!   [`RecordingBackend`], which keeps no GPU state and records every call.
//! - Resource handles ([`GpuMeshId`], [`TextureId`], [`RenderTargetId`]) are
//!   slot-map keys minted by the backend; the scene stores only handles.
//! - [`RenderTrigger`]: the shared "draw another frame" flag.
//!
//! Rendering is expressed in the same terms the viewer uses: set a render
//! target, draw a scene subtree from a camera, draw one blur pass.

pub mod recording;
pub mod trigger;

use glam::Affine3A;
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

use crate::assets::image::DecodedImage;
use crate::errors::Result;
use crate::scene::{Camera, GeometryData, NodeHandle, Scene};
use crate::shadow::BlurMaterial;

pub use recording::{BackendCall, DrawRecord, RecordingBackend, RecordingLog, RenderRecord};
pub use trigger::RenderTrigger;

new_key_type! {
    /// Uploaded vertex/index buffers.
    pub struct GpuMeshId;
    /// Uploaded sampled texture.
    pub struct TextureId;
    /// Offscreen colour target that can also be sampled.
    pub struct RenderTargetId;
}

// ============================================================================
// Texture upload settings
// ============================================================================

/// Colour space of uploaded texel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorSpace {
    #[default]
    Srgb,
    Linear,
}

/// How an image is turned into a GPU texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureSettings {
    pub color_space: ColorSpace,
    pub flip_y: bool,
    /// Requested anisotropy; clamped to what the backend supports.
    pub anisotropy: u16,
    pub generate_mipmaps: bool,
}

impl TextureSettings {
    /// Screen textures: sRGB, unflipped, maximum anisotropy, no mipmaps.
    #[must_use]
    pub fn screen(max_anisotropy: u16) -> Self {
        Self {
            color_space: ColorSpace::Srgb,
            flip_y: false,
            anisotropy: max_anisotropy.max(1),
            generate_mipmaps: false,
        }
    }
}

impl Default for TextureSettings {
    fn default() -> Self {
        Self::screen(1)
    }
}

// ============================================================================
// Blur
// ============================================================================

/// Direction of one separable blur pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlurAxis {
    Horizontal,
    Vertical,
}

/// Denominator turning a blur amount into a per-tap texel step.
pub const BLUR_STEP_DIVISOR: f32 = 256.0;

/// One directional blur from `source` into `destination`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlurPass {
    /// Direction and kernel weights.
    pub material: BlurMaterial,
    /// Blur amount; the kernel samples every `radius / 256` in UV space.
    pub radius: f32,
    pub source: RenderTargetId,
    pub destination: RenderTargetId,
}

impl BlurPass {
    #[inline]
    #[must_use]
    pub fn axis(&self) -> BlurAxis {
        self.material.axis
    }

    /// Spacing between kernel taps, in UV units.
    #[inline]
    #[must_use]
    pub fn step(&self) -> f32 {
        self.radius / BLUR_STEP_DIVISOR
    }
}

/// The quad a blur pass is rasterised through.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlurPlane {
    pub geometry: GpuMeshId,
    pub world: Affine3A,
}

// ============================================================================
// Backend trait
// ============================================================================

/// GPU operations the viewer core issues.
///
/// Handles returned by one backend are meaningless to another. Calls made
/// after [`dispose`](Self::dispose) are ignored.
pub trait RenderBackend {
    /// Drawable size in physical pixels.
    fn size(&self) -> (u32, u32);

    fn resize(&mut self, width: u32, height: u32, scale_factor: f32);

    /// Largest anisotropy level the sampler hardware accepts.
    fn max_anisotropy(&self) -> u16;

    fn create_render_target(&mut self, label: &str, width: u32, height: u32) -> RenderTargetId;

    fn dispose_render_target(&mut self, target: RenderTargetId);

    fn upload_geometry(&mut self, label: &str, geometry: &GeometryData) -> GpuMeshId;

    fn dispose_geometry(&mut self, mesh: GpuMeshId);

    fn upload_texture(
        &mut self,
        label: &str,
        image: &DecodedImage,
        settings: &TextureSettings,
    ) -> Result<TextureId>;

    fn dispose_texture(&mut self, texture: TextureId);

    /// Selects where the next draw lands; `None` is the presentable surface.
    fn set_render_target(&mut self, target: Option<RenderTargetId>);

    /// Draws the subtree under `root` from `camera` into the current target.
    ///
    /// Honours the scene's background and override material.
    fn render(&mut self, scene: &Scene, root: NodeHandle, camera: &Camera);

    /// Draws `plane` with a directional blur of `pass.source` into the
    /// current target.
    fn render_blur(&mut self, plane: &BlurPlane, camera: &Camera, pass: &BlurPass);

    /// Releases the rendering context. Idempotent.
    fn dispose(&mut self);

    fn is_disposed(&self) -> bool;
}
