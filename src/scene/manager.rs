//! Scene Manager
//!
//! The viewer's stage: perspective camera, model group, light rig and the
//! contact shadow pipeline, with a single [`SceneManager::render_frame`]
//! entry point.

use glam::{Vec3, Vec3Swizzles};

use crate::config::ViewerConfig;
use crate::motion::{Axis, RotationSprings};
use crate::render::RenderBackend;
use crate::scene::{Camera, LightSet, Node, NodeHandle, Scene};
use crate::shadow::ShadowPipeline;

const CAMERA_NEAR: f32 = 0.1;
const CAMERA_FAR: f32 = 100.0;

pub struct SceneManager {
    scene: Scene,
    camera: Camera,
    model_group: NodeHandle,
    lights: LightSet,
    shadow: ShadowPipeline,
    scale: f32,
    frames_rendered: u64,
}

impl SceneManager {
    /// Activation in order: camera, scene, lights, shadow surfaces, blur
    /// materials.
    pub fn new(backend: &mut dyn RenderBackend, config: &ViewerConfig) -> Self {
        let (width, height) = backend.size();
        let mut camera = Camera::perspective(config.fov, aspect_ratio(width, height), CAMERA_NEAR, CAMERA_FAR);
        camera.set_position(config.camera_position());

        let mut scene = Scene::new();
        let model_group = scene.add_node(Node::new("Models"));
        if let Some(group) = scene.get_node_mut(model_group) {
            group.transform.scale = Vec3::splat(config.scale);
        }

        let lights = LightSet::new(config.light_intensities());
        scene.lights = lights.to_vec();

        let mut shadow = ShadowPipeline::new(backend, &mut scene, config.shadow);
        shadow.create_blur_materials();

        log::info!(
            "Scene ready: camera at {}, fov {}°, {} lights",
            camera.position(),
            config.fov,
            scene.lights.len()
        );

        Self {
            scene,
            camera,
            model_group,
            lights,
            shadow,
            scale: config.scale,
            frames_rendered: 0,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    #[inline]
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    #[inline]
    #[must_use]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    #[inline]
    #[must_use]
    pub fn model_group(&self) -> NodeHandle {
        self.model_group
    }

    #[inline]
    #[must_use]
    pub fn lights(&self) -> &LightSet {
        &self.lights
    }

    #[inline]
    #[must_use]
    pub fn shadow(&self) -> &ShadowPipeline {
        &self.shadow
    }

    #[inline]
    #[must_use]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    #[inline]
    #[must_use]
    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    // ========================================================================
    // Frame
    // ========================================================================

    /// Applies spring rotation, renders the shadow texture, then draws the
    /// scene. Returns `false` if skipped because setup is incomplete.
    pub fn render_frame(&mut self, backend: &mut dyn RenderBackend, springs: &RotationSprings) -> bool {
        if backend.is_disposed() {
            return false;
        }

        let pitch = springs.value(Axis::Pitch);
        let yaw = springs.value(Axis::Yaw);
        if let Some(group) = self.scene.get_node_mut(self.model_group) {
            group.transform.set_rotation_euler(pitch, yaw, 0.0);
        }

        if let Err(err) = self.shadow.render(backend, &mut self.scene, self.model_group) {
            log::trace!("Frame skipped: {err}");
            return false;
        }

        backend.render(&self.scene, self.scene.root(), &self.camera);
        self.frames_rendered += 1;
        true
    }

    /// Uniformly scales the model group and redraws.
    pub fn set_scale(&mut self, backend: &mut dyn RenderBackend, springs: &RotationSprings, scale: f32) -> bool {
        self.scale = scale;
        if let Some(group) = self.scene.get_node_mut(self.model_group) {
            group.transform.scale = Vec3::splat(scale);
        }
        self.render_frame(backend, springs)
    }

    /// Moves the camera along Z and redraws.
    pub fn set_camera_distance(
        &mut self,
        backend: &mut dyn RenderBackend,
        springs: &RotationSprings,
        distance: f32,
    ) -> bool {
        let position = self.camera.position();
        self.camera.set_position(position.xy().extend(distance));
        self.render_frame(backend, springs)
    }

    /// Resizes the drawable and updates the projection. Does not draw.
    pub fn resize(&mut self, backend: &mut dyn RenderBackend, width: u32, height: u32, scale_factor: f32) {
        backend.resize(width, height, scale_factor);
        let (w, h) = backend.size();
        self.camera.set_aspect(aspect_ratio(w, h));
    }

    /// Detaches the light rig from the scene.
    pub fn remove_lights(&mut self) {
        self.scene.lights.clear();
    }

    /// Deactivation: render targets, lights, then every scene resource.
    pub fn teardown(&mut self, backend: &mut dyn RenderBackend) {
        self.shadow.dispose(backend);
        self.remove_lights();

        let resources = self.scene.resources();
        let root = self.scene.root();
        let children: Vec<_> = self
            .scene
            .get_node(root)
            .map(|n| n.children().to_vec())
            .unwrap_or_default();
        for child in children {
            self.scene.remove_node(child);
        }
        log::debug!(
            "Disposing {} geometries and {} textures",
            resources.meshes.len(),
            resources.textures.len()
        );
        resources.dispose(backend);
    }
}

fn aspect_ratio(width: u32, height: u32) -> f32 {
    if height == 0 {
        1.0
    } else {
        width as f32 / height as f32
    }
}
