//! Renderer Settings
//!
//! Configuration consumed once by [`GpuRenderer::new`](super::GpuRenderer::new).
//!
//! ```rust,ignore
//! use vitrine::renderer::RendererSettings;
//!
//! let settings = RendererSettings {
//!     vsync: false,
//!     power_preference: wgpu::PowerPreference::LowPower,
//!     ..Default::default()
//! };
//! ```

/// Global configuration for renderer initialization.
///
/// | Field              | Description                          | Default            |
/// |--------------------|--------------------------------------|--------------------|
/// | `vsync`            | Vertical sync enabled                | `true`             |
/// | `power_preference` | GPU adapter selection strategy       | `LowPower`         |
/// | `clear_color`      | Surface clear colour                 | White (1,1,1,1)    |
/// | `required_features`| Required wgpu features               | Empty              |
/// | `required_limits`  | Required wgpu limits                 | Default            |
/// | `depth_format`     | Depth buffer texture format          | `Depth32Float`     |
/// | `max_anisotropy`   | Upper bound for sampler anisotropy   | 16                 |
#[derive(Debug, Clone)]
pub struct RendererSettings {
    /// Enable vertical synchronization (VSync).
    pub vsync: bool,

    /// GPU adapter selection preference.
    pub power_preference: wgpu::PowerPreference,

    /// Clear colour of the presentable surface.
    ///
    /// Overridden by the scene background when one is set.
    pub clear_color: wgpu::Color,

    /// Required wgpu features that must be supported by the adapter.
    pub required_features: wgpu::Features,

    /// Required wgpu limits (max buffer sizes, binding counts, etc.).
    pub required_limits: wgpu::Limits,

    /// Depth buffer format shared by the surface and every render target.
    pub depth_format: wgpu::TextureFormat,

    /// Largest anisotropic filtering level handed to samplers (1..=16).
    pub max_anisotropy: u16,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            vsync: true,
            power_preference: wgpu::PowerPreference::LowPower,
            clear_color: wgpu::Color::WHITE,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            depth_format: wgpu::TextureFormat::Depth32Float,
            max_anisotropy: 16,
        }
    }
}

impl RendererSettings {
    /// Present mode implied by `vsync`.
    #[inline]
    #[must_use]
    pub fn present_mode(&self) -> wgpu::PresentMode {
        if self.vsync {
            wgpu::PresentMode::AutoVsync
        } else {
            wgpu::PresentMode::AutoNoVsync
        }
    }

    /// `max_anisotropy` clamped to what wgpu samplers accept.
    #[inline]
    #[must_use]
    pub fn anisotropy_limit(&self) -> u16 {
        self.max_anisotropy.clamp(1, 16)
    }
}
