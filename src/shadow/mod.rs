//! Contact Shadow Pipeline
//!
//! Soft ground shadows from a single fixed overhead orthographic camera.
//!
//! # Overview
//!
//! ```text
//!  model group ──depth-darkness──▶ raw target
//!  raw ──H blur──▶ scratch ──V blur──▶ raw      (amount)
//!  raw ──H blur──▶ scratch ──V blur──▶ raw      (amount × 0.4)
//!  raw ──sampled by──▶ shadow plane (main pass)
//! ```
//!
//! The shadow group sits just behind the models, rotated so the shadow
//! camera looks through them. Its shadow plane samples the raw target and is
//! drawn by the main pass with every other mesh; the blur plane shares the
//! plane geometry and is only ever rasterised by the blur passes.

pub mod blur;

use std::f32::consts::{FRAC_PI_2, PI};

use glam::{Affine3A, Vec3};
use serde::{Deserialize, Serialize};

use crate::errors::{Result, VitrineError};
use crate::render::{BlurPass, BlurPlane, GpuMeshId, RenderBackend, RenderTargetId};
use crate::scene::{
    Camera, GeometryData, Material, Mesh, Node, NodeHandle, OverrideMaterial, Scene, TextureRef,
    Transform,
};

pub use blur::{BLUR_KERNEL, BlurMaterial, BlurMaterials, blur_schedule};

/// Offset of the fill plane below the shadow plane.
const FILL_PLANE_OFFSET: f32 = -0.000_01;

/// Shadow pipeline parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShadowSettings {
    /// Edge length of both square render targets, in texels.
    pub resolution: u32,
    pub plane_width: f32,
    pub plane_height: f32,
    /// Depth range of the shadow camera (its far plane).
    pub camera_height: f32,
    pub opacity: f32,
    pub darkness: f32,
    /// Blur amount of the first iteration.
    pub blur: f32,
    /// Second iteration amount as a fraction of the first.
    pub second_blur_ratio: f32,
    /// Position of the shadow group.
    pub offset: [f32; 3],
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            resolution: 512,
            plane_width: 8.0,
            plane_height: 8.0,
            camera_height: 1.5,
            opacity: 0.8,
            darkness: 3.0,
            blur: 5.0,
            second_blur_ratio: 0.4,
            offset: [0.0, 0.0, -0.8],
        }
    }
}

/// The raw and scratch render targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShadowSurfaces {
    pub raw: RenderTargetId,
    pub blur: RenderTargetId,
}

pub struct ShadowPipeline {
    settings: ShadowSettings,
    surfaces: Option<ShadowSurfaces>,
    plane_geometry: GpuMeshId,
    group: NodeHandle,
    shadow_plane: NodeHandle,
    fill_plane: NodeHandle,
    camera: Camera,
    blur_materials: Option<BlurMaterials>,
}

impl ShadowPipeline {
    /// Allocates both render targets, uploads the shared plane geometry and
    /// adds the shadow group to `scene`.
    ///
    /// Blur materials are created separately by
    /// [`create_blur_materials`](Self::create_blur_materials); until then
    /// [`render`](Self::render) is a no-op.
    pub fn new(backend: &mut dyn RenderBackend, scene: &mut Scene, settings: ShadowSettings) -> Self {
        let size = settings.resolution.max(1);
        let surfaces = ShadowSurfaces {
            raw: backend.create_render_target("Shadow Raw", size, size),
            blur: backend.create_render_target("Shadow Blur", size, size),
        };

        let plane = GeometryData::plane(settings.plane_width, settings.plane_height).rotated_x(FRAC_PI_2);
        let plane_geometry = backend.upload_geometry("Shadow Plane", &plane);

        let mut group_transform = Transform::from_position(Vec3::from(settings.offset));
        group_transform.rotate_x(FRAC_PI_2);
        let group = scene.add_node(Node::new("Shadow Group").with_transform(group_transform));

        let shadow_material = Material::unlit(Vec3::ONE)
            .with_map(TextureRef::RenderTarget(surfaces.raw))
            .with_opacity(settings.opacity);
        let mut shadow_transform = Transform::new();
        shadow_transform.scale.y = -1.0;
        let shadow_plane = scene.add_to_parent(
            Node::new("Shadow Plane")
                .with_transform(shadow_transform)
                .with_mesh(Mesh::single(plane_geometry, Material {
                    depth_write: false,
                    ..shadow_material
                })),
            group,
        );

        let mut fill_transform = Transform::from_position(Vec3::new(0.0, FILL_PLANE_OFFSET, 0.0));
        fill_transform.rotate_x(PI);
        let fill_plane = scene.add_to_parent(
            Node::new("Fill Plane")
                .with_transform(fill_transform)
                .with_mesh(Mesh::single(plane_geometry, Material::unlit(Vec3::ONE).with_opacity(0.0))),
            group,
        );

        let camera = Camera::orthographic(
            settings.plane_width * 0.5,
            settings.plane_height * 0.5,
            0.0,
            settings.camera_height,
        );

        log::debug!("Shadow pipeline allocated {size}x{size} targets");

        Self {
            settings,
            surfaces: Some(surfaces),
            plane_geometry,
            group,
            shadow_plane,
            fill_plane,
            camera,
            blur_materials: None,
        }
    }

    /// Final activation step: the horizontal and vertical blur materials.
    pub fn create_blur_materials(&mut self) {
        self.blur_materials = Some(BlurMaterials::default());
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &ShadowSettings {
        &self.settings
    }

    #[inline]
    #[must_use]
    pub fn surfaces(&self) -> Option<ShadowSurfaces> {
        self.surfaces
    }

    #[inline]
    #[must_use]
    pub fn blur_materials(&self) -> Option<&BlurMaterials> {
        self.blur_materials.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn group(&self) -> NodeHandle {
        self.group
    }

    #[inline]
    #[must_use]
    pub fn shadow_plane(&self) -> NodeHandle {
        self.shadow_plane
    }

    #[inline]
    #[must_use]
    pub fn fill_plane(&self) -> NodeHandle {
        self.fill_plane
    }

    #[inline]
    #[must_use]
    pub fn plane_geometry(&self) -> GpuMeshId {
        self.plane_geometry
    }

    /// `true` once targets and blur materials both exist.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.surfaces.is_some() && self.blur_materials.is_some()
    }

    /// Blur passes in execution order; empty until ready.
    #[must_use]
    pub fn blur_schedule(&self) -> Vec<BlurPass> {
        match (self.surfaces, &self.blur_materials) {
            (Some(surfaces), Some(materials)) => blur_schedule(
                materials,
                surfaces.raw,
                surfaces.blur,
                self.settings.blur,
                self.settings.second_blur_ratio,
            )
            .to_vec(),
            _ => Vec::new(),
        }
    }

    /// Shadow camera placed inside the shadow group.
    #[must_use]
    pub fn camera(&self, scene: &Scene) -> Camera {
        let mut camera = self.camera;
        camera.set_world(scene.world_matrix(self.group) * Affine3A::from_rotation_x(FRAC_PI_2));
        camera
    }

    /// Renders the shadow texture for the current pose of `casters`.
    ///
    /// Leaves the scene's background and override material as it found them
    /// and the backend targeting the surface.
    pub fn render(&self, backend: &mut dyn RenderBackend, scene: &mut Scene, casters: NodeHandle) -> Result<()> {
        let Some(surfaces) = self.surfaces else {
            return Err(VitrineError::UninitializedPipeline);
        };
        if self.blur_materials.is_none() || backend.is_disposed() || !scene.contains(casters) {
            return Err(VitrineError::UninitializedPipeline);
        }

        let camera = self.camera(scene);
        let plane = BlurPlane {
            geometry: self.plane_geometry,
            world: scene.world_matrix(self.group),
        };

        let background = scene.background.take();
        scene.override_material = Some(OverrideMaterial::DepthDarkness {
            darkness: self.settings.darkness,
        });
        backend.set_render_target(Some(surfaces.raw));
        backend.render(scene, casters, &camera);
        scene.override_material = None;

        for pass in self.blur_schedule() {
            backend.set_render_target(Some(pass.destination));
            backend.render_blur(&plane, &camera, &pass);
        }

        backend.set_render_target(None);
        scene.background = background;
        Ok(())
    }

    /// Releases both render targets. The plane geometry is released with the
    /// scene that references it.
    pub fn dispose(&mut self, backend: &mut dyn RenderBackend) {
        if let Some(surfaces) = self.surfaces.take() {
            backend.dispose_render_target(surfaces.raw);
            backend.dispose_render_target(surfaces.blur);
        }
        self.blur_materials = None;
    }
}
