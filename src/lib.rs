//! # Vitrine
//!
//! A real-time 3D model viewer built on wgpu: product models sit on a soft
//! contact shadow, tilt toward the pointer on damped springs, and stream
//! their screen textures in two stages (placeholder first, full resolution
//! after).
//!
//! # Overview
//!
//! - [`viewer`]: [`Viewer`], the lifecycle owner and frame loop
//! - [`scene`]: scene graph, camera, lights and the [`SceneManager`]
//! - [`shadow`]: contact shadow capture and two-axis blur
//! - [`device`]: per-model load state machine and entrance animations
//! - [`motion`]: springs, tweens and the animation ticker
//! - [`viewport`]: pointer, visibility and reduced-motion gating
//! - [`assets`]: async fetching, glTF and image decoding, `srcset` parsing
//! - [`render`]: the [`RenderBackend`] seam and a recording backend
//! - [`renderer`]: the wgpu [`GpuRenderer`](renderer::GpuRenderer)
//! - [`app`]: a winit window host (feature `winit`)
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use vitrine::prelude::*;
//!
//! let config = ViewerConfig::from_json(r#"{ "models": [{ "url": "phone.glb" }] }"#)?;
//! let mut viewer = Viewer::mount(RecordingBackend::new(800, 600), config)?;
//! viewer.wait_for_loads(std::time::Duration::from_secs(5));
//! viewer.update(std::time::Duration::from_millis(16));
//! ```

pub mod assets;
pub mod config;
pub mod device;
pub mod errors;
pub mod motion;
pub mod render;
pub mod renderer;
pub mod scene;
pub mod shadow;
pub mod utils;
pub mod viewer;
pub mod viewport;

#[cfg(feature = "winit")]
pub mod app;

pub use config::ViewerConfig;
pub use device::{AssetDescriptor, Device, DeviceId, DeviceState, EntranceKind, EntranceState};
pub use errors::{Result, VitrineError};
pub use render::{RecordingBackend, RenderBackend, RenderTrigger};
pub use scene::SceneManager;
pub use viewer::Viewer;
pub use viewport::ViewportController;

#[cfg(feature = "winit")]
pub use app::App;

pub mod prelude {
    pub use crate::assets::{AssetFetcher, AssetReader, MemoryFetcher};
    pub use crate::config::ViewerConfig;
    pub use crate::device::{AssetDescriptor, DeviceState, EntranceKind, EntranceState, TextureDescriptor};
    pub use crate::errors::{Result, VitrineError};
    pub use crate::render::{RecordingBackend, RenderBackend};
    pub use crate::renderer::{GpuRenderer, RendererSettings};
    pub use crate::viewer::Viewer;
}
