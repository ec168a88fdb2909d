//! Recording backend
//!
//! A [`RenderBackend`] with no GPU behind it. Handles are real slot-map keys
//! so lifetimes can be checked, and every call lands in a shared
//! [`RecordingLog`] that outlives the backend. Used for headless runs and
//! throughout the test suite.

use std::sync::Arc;

use glam::{Mat4, Vec3};
use parking_lot::Mutex;
use slotmap::SlotMap;

use super::{
    BlurPass, BlurPlane, GpuMeshId, RenderBackend, RenderTargetId, TextureId, TextureSettings,
};
use crate::assets::image::DecodedImage;
use crate::errors::{Result, VitrineError};
use crate::scene::{Camera, GeometryData, NodeHandle, OverrideMaterial, Scene, TextureRef};

/// One primitive as it was drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub name: String,
    pub world: Mat4,
    pub geometry: GpuMeshId,
    pub color: Vec3,
    pub opacity: f32,
    pub map: Option<TextureRef>,
    pub blended: bool,
}

/// One `render` call.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRecord {
    pub target: Option<RenderTargetId>,
    pub override_material: Option<OverrideMaterial>,
    pub background: Option<[f32; 4]>,
    pub view_projection: Mat4,
    pub lights: usize,
    pub draws: Vec<DrawRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Resize {
        width: u32,
        height: u32,
    },
    CreateRenderTarget {
        id: RenderTargetId,
        label: String,
        width: u32,
        height: u32,
    },
    DisposeRenderTarget(RenderTargetId),
    UploadGeometry {
        id: GpuMeshId,
        label: String,
        vertices: usize,
        indices: usize,
    },
    DisposeGeometry(GpuMeshId),
    UploadTexture {
        id: TextureId,
        label: String,
        width: u32,
        height: u32,
        settings: TextureSettings,
    },
    DisposeTexture(TextureId),
    SetRenderTarget(Option<RenderTargetId>),
    Render(RenderRecord),
    Blur {
        target: Option<RenderTargetId>,
        pass: BlurPass,
    },
    Dispose,
}

/// Shared, cloneable call log.
#[derive(Debug, Clone, Default)]
pub struct RecordingLog(Arc<Mutex<Vec<BackendCall>>>);

impl RecordingLog {
    fn push(&self, call: BackendCall) {
        self.0.lock().push(call);
    }

    /// Snapshot of every call so far.
    #[must_use]
    pub fn calls(&self) -> Vec<BackendCall> {
        self.0.lock().clone()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    #[must_use]
    pub fn renders(&self) -> Vec<RenderRecord> {
        self.0
            .lock()
            .iter()
            .filter_map(|c| match c {
                BackendCall::Render(r) => Some(r.clone()),
                _ => None,
            })
            .collect()
    }

    /// Blur passes with the target each was drawn into.
    #[must_use]
    pub fn blur_passes(&self) -> Vec<(Option<RenderTargetId>, BlurPass)> {
        self.0
            .lock()
            .iter()
            .filter_map(|c| match c {
                BackendCall::Blur { target, pass } => Some((*target, *pass)),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn count(&self, predicate: impl Fn(&BackendCall) -> bool) -> usize {
        self.0.lock().iter().filter(|c| predicate(c)).count()
    }
}

pub struct RecordingBackend {
    width: u32,
    height: u32,
    max_anisotropy: u16,
    meshes: SlotMap<GpuMeshId, usize>,
    textures: SlotMap<TextureId, (u32, u32)>,
    targets: SlotMap<RenderTargetId, (u32, u32)>,
    current_target: Option<RenderTargetId>,
    failing_textures: Vec<String>,
    invalid_disposals: usize,
    log: RecordingLog,
    disposed: bool,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

impl RecordingBackend {
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            max_anisotropy: 16,
            meshes: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            targets: SlotMap::with_key(),
            current_target: None,
            failing_textures: Vec::new(),
            invalid_disposals: 0,
            log: RecordingLog::default(),
            disposed: false,
        }
    }

    /// Handle to the call log; stays valid after the backend is dropped.
    #[must_use]
    pub fn log(&self) -> RecordingLog {
        self.log.clone()
    }

    /// Makes uploads whose label contains `pattern` fail.
    pub fn fail_textures_matching(&mut self, pattern: impl Into<String>) {
        self.failing_textures.push(pattern.into());
    }

    #[must_use]
    pub fn live_meshes(&self) -> usize {
        self.meshes.len()
    }

    #[must_use]
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    #[must_use]
    pub fn live_render_targets(&self) -> usize {
        self.targets.len()
    }

    #[must_use]
    pub fn is_live_texture(&self, id: TextureId) -> bool {
        self.textures.contains_key(id)
    }

    /// Disposals of handles that were unknown or already released.
    #[must_use]
    pub fn invalid_disposals(&self) -> usize {
        self.invalid_disposals
    }

    #[must_use]
    pub fn current_target(&self) -> Option<RenderTargetId> {
        self.current_target
    }

    fn record(&self, call: BackendCall) {
        if !self.disposed {
            self.log.push(call);
        }
    }

    fn invalid(&mut self, what: &str) {
        log::warn!("Dispose of unknown {what}");
        self.invalid_disposals += 1;
    }
}

impl RenderBackend for RecordingBackend {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32, _scale_factor: f32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.record(BackendCall::Resize {
            width: self.width,
            height: self.height,
        });
    }

    fn max_anisotropy(&self) -> u16 {
        self.max_anisotropy
    }

    fn create_render_target(&mut self, label: &str, width: u32, height: u32) -> RenderTargetId {
        let id = self.targets.insert((width, height));
        self.record(BackendCall::CreateRenderTarget {
            id,
            label: label.to_owned(),
            width,
            height,
        });
        id
    }

    fn dispose_render_target(&mut self, target: RenderTargetId) {
        if self.targets.remove(target).is_none() {
            return self.invalid("render target");
        }
        self.record(BackendCall::DisposeRenderTarget(target));
    }

    fn upload_geometry(&mut self, label: &str, geometry: &GeometryData) -> GpuMeshId {
        let id = self.meshes.insert(geometry.vertex_count());
        self.record(BackendCall::UploadGeometry {
            id,
            label: label.to_owned(),
            vertices: geometry.vertex_count(),
            indices: geometry.index_count(),
        });
        id
    }

    fn dispose_geometry(&mut self, mesh: GpuMeshId) {
        if self.meshes.remove(mesh).is_none() {
            return self.invalid("geometry");
        }
        self.record(BackendCall::DisposeGeometry(mesh));
    }

    fn upload_texture(&mut self, label: &str, image: &DecodedImage, settings: &TextureSettings) -> Result<TextureId> {
        if self.disposed {
            return Err(VitrineError::UninitializedPipeline);
        }
        if self.failing_textures.iter().any(|p| label.contains(p.as_str())) {
            return Err(VitrineError::UnsupportedTexture(format!("'{label}' rejected by the backend")));
        }
        let settings = TextureSettings {
            anisotropy: settings.anisotropy.clamp(1, self.max_anisotropy),
            ..*settings
        };
        let id = self.textures.insert((image.width, image.height));
        self.record(BackendCall::UploadTexture {
            id,
            label: label.to_owned(),
            width: image.width,
            height: image.height,
            settings,
        });
        Ok(id)
    }

    fn dispose_texture(&mut self, texture: TextureId) {
        if self.textures.remove(texture).is_none() {
            return self.invalid("texture");
        }
        self.record(BackendCall::DisposeTexture(texture));
    }

    fn set_render_target(&mut self, target: Option<RenderTargetId>) {
        self.current_target = target;
        self.record(BackendCall::SetRenderTarget(target));
    }

    fn render(&mut self, scene: &Scene, root: NodeHandle, camera: &Camera) {
        if self.disposed {
            return;
        }
        let draws = scene
            .collect_draws(root)
            .into_iter()
            .map(|item| {
                let material = &item.primitive.material;
                DrawRecord {
                    name: item.name.to_owned(),
                    world: Mat4::from(item.world),
                    geometry: item.primitive.geometry,
                    color: material.color,
                    opacity: material.opacity,
                    map: material.map,
                    blended: material.is_blended(),
                }
            })
            .collect();
        self.record(BackendCall::Render(RenderRecord {
            target: self.current_target,
            override_material: scene.override_material,
            background: scene.background,
            view_projection: camera.view_projection(),
            lights: scene.lights.len(),
            draws,
        }));
    }

    fn render_blur(&mut self, _plane: &BlurPlane, _camera: &Camera, pass: &BlurPass) {
        self.record(BackendCall::Blur {
            target: self.current_target,
            pass: *pass,
        });
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.record(BackendCall::Dispose);
        self.disposed = true;
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}
