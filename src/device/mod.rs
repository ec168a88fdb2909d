//! Device Pipeline
//!
//! One [`Device`] per loadable model. It walks two tracks:
//!
//! ```text
//! geometry:  Unloaded ─▶ GeometryLoading ─▶ GeometryReady ─▶ PlaceholderApplied ─▶ FullResApplied
//!               │                 │
//!               └─▶ Skipped       └─▶ Failed
//! entrance:  Pending ─▶ Animating ─▶ Settled
//! ```
//!
//! The entrance track runs alongside the full-resolution fetch, so the two
//! are kept apart; [`Device::transitions`] records the geometry track.
//!
//! Devices never do I/O themselves. The viewer feeds them [`LoadEvent`]
//! results on the render thread through a [`DeviceContext`], and the device
//! tells the viewer what to fetch next.
//!
//! [`LoadEvent`]: crate::assets::LoadEvent

pub mod descriptor;
pub mod entrance;
pub mod overlay;

use std::sync::Arc;
use std::time::Duration;

use glam::Vec3;
use slotmap::new_key_type;

use crate::assets::{DecodedImage, GeometryPayload, ModelData};
use crate::errors::{Result, VitrineError};
use crate::motion::{AnimatedProperty, AnimationTag, AnimationTarget, Ticker, Tween};
use crate::render::{RenderBackend, RenderTrigger, TextureId, TextureSettings};
use crate::scene::{
    Material, Mesh, Node, NodeHandle, Primitive, ResourceSet, Scene, TextureRef, Transform, srgb_hex,
};

pub use descriptor::{AssetDescriptor, EntranceKind, Position, TextureDescriptor};
pub use entrance::{EntrancePlan, HINGE_PART, entrance_delay};
pub use overlay::{CancellationToken, FADE_DURATION, OVERLAY_NAME, OVERLAY_OFFSET, PlaceholderOverlay};

new_key_type! {
    /// Handle to a device owned by a viewer.
    pub struct DeviceId;
}

/// Colour every model material is tinted with.
pub const MODEL_TINT: u32 = 0x66_66_66;
/// Sub-mesh that receives the screen texture.
pub const SCREEN_PART: &str = "Screen";

/// Geometry/texture track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceState {
    Unloaded,
    GeometryLoading,
    GeometryReady,
    PlaceholderApplied,
    FullResApplied,
    /// No source URL; terminal.
    Skipped,
    /// Geometry or placeholder failed; terminal.
    Failed,
}

/// Entrance animation track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntranceState {
    Pending,
    Animating,
    Settled,
}

/// What the viewer should fetch after [`Device::begin_loading`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadRequest {
    /// Already loading or done.
    None,
    /// Nothing to load; the device is now [`DeviceState::Skipped`].
    Skip,
    Geometry {
        model: String,
        placeholder: Option<String>,
    },
}

/// Scene state a device mutates, lent by the viewer for one call.
pub struct DeviceContext<'a> {
    pub scene: &'a mut Scene,
    pub model_group: NodeHandle,
    pub backend: &'a mut dyn RenderBackend,
    pub ticker: &'a mut Ticker,
    pub trigger: &'a RenderTrigger,
    pub reduced_motion: bool,
    pub show_delay: Duration,
}

pub struct Device {
    id: DeviceId,
    index: usize,
    descriptor: AssetDescriptor,
    state: DeviceState,
    entrance: EntranceState,
    transitions: Vec<DeviceState>,
    root: Option<NodeHandle>,
    screen: Option<NodeHandle>,
    overlay: Option<PlaceholderOverlay>,
    full_res: Option<TextureId>,
    entrance_started: Option<Duration>,
    ready_reported: bool,
}

impl std::fmt::Debug for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("id", &self.id)
            .field("index", &self.index)
            .field("url", &self.descriptor.url)
            .field("state", &self.state)
            .field("entrance", &self.entrance)
            .finish_non_exhaustive()
    }
}

impl Device {
    #[must_use]
    pub fn new(id: DeviceId, index: usize, descriptor: AssetDescriptor) -> Self {
        Self {
            id,
            index,
            descriptor,
            state: DeviceState::Unloaded,
            entrance: EntranceState::Pending,
            transitions: vec![DeviceState::Unloaded],
            root: None,
            screen: None,
            overlay: None,
            full_res: None,
            entrance_started: None,
            ready_reported: false,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn id(&self) -> DeviceId {
        self.id
    }

    /// Sequence index used for entrance staggering.
    #[inline]
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    #[inline]
    #[must_use]
    pub fn descriptor(&self) -> &AssetDescriptor {
        &self.descriptor
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> DeviceState {
        self.state
    }

    #[inline]
    #[must_use]
    pub fn entrance(&self) -> EntranceState {
        self.entrance
    }

    /// Every geometry-track state entered, in order.
    #[inline]
    #[must_use]
    pub fn transitions(&self) -> &[DeviceState] {
        &self.transitions
    }

    /// Wrapper node holding the instantiated model.
    #[inline]
    #[must_use]
    pub fn root(&self) -> Option<NodeHandle> {
        self.root
    }

    #[inline]
    #[must_use]
    pub fn screen(&self) -> Option<NodeHandle> {
        self.screen
    }

    #[inline]
    #[must_use]
    pub fn overlay(&self) -> Option<&PlaceholderOverlay> {
        self.overlay.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn full_res_texture(&self) -> Option<TextureId> {
        self.full_res
    }

    /// Ticker time at which the entrance delay elapsed.
    #[inline]
    #[must_use]
    pub fn entrance_started_at(&self) -> Option<Duration> {
        self.entrance_started
    }

    /// Reached a state where the initial load is over, good or bad.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        matches!(
            self.state,
            DeviceState::GeometryReady
                | DeviceState::PlaceholderApplied
                | DeviceState::FullResApplied
                | DeviceState::Skipped
                | DeviceState::Failed
        )
    }

    /// Returns `true` exactly once, the first time the device is loaded.
    pub(crate) fn take_ready(&mut self) -> bool {
        if self.ready_reported || !self.is_loaded() {
            return false;
        }
        self.ready_reported = true;
        true
    }

    fn transition(&mut self, next: DeviceState) {
        log::debug!("Device {} ({:?}): {:?} -> {:?}", self.index, self.id, self.state, next);
        self.state = next;
        self.transitions.push(next);
    }

    fn label(&self) -> &str {
        self.descriptor.source().unwrap_or("device")
    }

    // ========================================================================
    // Geometry track
    // ========================================================================

    /// Unloaded → GeometryLoading (or Skipped without a source URL).
    pub fn begin_loading(&mut self) -> LoadRequest {
        if self.state != DeviceState::Unloaded {
            return LoadRequest::None;
        }
        let Some(model) = self.descriptor.source().map(str::to_owned) else {
            log::warn!("Device {}: {}; skipping", self.index, VitrineError::MissingSource);
            self.transition(DeviceState::Skipped);
            self.entrance = EntranceState::Settled;
            return LoadRequest::Skip;
        };
        let placeholder = self.descriptor.placeholder_uri().map(str::to_owned);
        self.transition(DeviceState::GeometryLoading);
        LoadRequest::Geometry { model, placeholder }
    }

    /// Applies the geometry/placeholder result.
    ///
    /// On success the model joins the scene, the placeholder overlay is built,
    /// the entrance starts, and the full-resolution URL to fetch (if any) is
    /// returned.
    pub fn on_geometry_loaded(
        &mut self,
        result: Result<GeometryPayload>,
        cx: &mut DeviceContext<'_>,
        drawable_width: u32,
    ) -> Option<String> {
        if self.state != DeviceState::GeometryLoading {
            log::debug!("Device {}: ignoring geometry in state {:?}", self.index, self.state);
            return None;
        }

        let payload = match result {
            Ok(payload) => payload,
            Err(err) => {
                log::error!("Device {}: failed to load '{}': {err}", self.index, self.label());
                self.transition(DeviceState::Failed);
                self.entrance = EntranceState::Settled;
                cx.trigger.request();
                return None;
            }
        };

        let root = self.instantiate(&payload.model, cx);
        self.root = Some(root);
        self.screen = cx.scene.find_by_name(root, SCREEN_PART);
        self.transition(DeviceState::GeometryReady);

        if let Some(placeholder) = payload.placeholder.as_deref() {
            self.apply_placeholder(placeholder, cx);
        }

        self.start_entrance(cx);
        cx.trigger.request();

        let texture = self.descriptor.texture.as_ref()?;
        if self.screen.is_none() {
            log::warn!("Device {}: no '{SCREEN_PART}' mesh; screen texture ignored", self.index);
            return None;
        }
        texture.full_res_uri(drawable_width, 1.0)
    }

    fn instantiate(&self, model: &ModelData, cx: &mut DeviceContext<'_>) -> NodeHandle {
        let label = self.label().to_owned();
        let tint = srgb_hex(MODEL_TINT);
        let settings = TextureSettings::screen(cx.backend.max_anisotropy());

        let wrapper = Node::new(label.clone()).with_transform(Transform::from_position(self.descriptor.position.into()));
        let root = cx.scene.add_to_parent(wrapper, cx.model_group);

        let mut textures: Vec<Option<TextureId>> = vec![None; model.textures.len()];
        let mut stack: Vec<(usize, NodeHandle)> = model.roots.iter().rev().map(|&i| (i, root)).collect();

        while let Some((index, parent)) = stack.pop() {
            let Some(source) = model.nodes.get(index) else {
                continue;
            };
            let mut node = Node::new(source.name.clone()).with_transform(Transform {
                position: source.translation,
                rotation: source.rotation,
                scale: source.scale,
            });

            if !source.primitives.is_empty() {
                let mut mesh = Mesh::default();
                for (p, primitive) in source.primitives.iter().enumerate() {
                    let geometry = cx
                        .backend
                        .upload_geometry(&format!("{label}#{}#{p}", source.name), &primitive.geometry);
                    let mut material = Material::lit(tint);
                    if let Some(tex) = primitive.base_color_texture {
                        material.map = upload_embedded(model, tex, &mut textures, cx.backend, &settings)
                            .map(TextureRef::Texture);
                    }
                    mesh.primitives.push(Primitive { geometry, material });
                }
                node.mesh = Some(mesh);
            }

            let handle = cx.scene.add_to_parent(node, parent);
            stack.extend(source.children.iter().rev().map(|&c| (c, handle)));
        }

        root
    }

    /// GeometryReady → PlaceholderApplied: clone the screen as an overlay.
    fn apply_placeholder(&mut self, image: &DecodedImage, cx: &mut DeviceContext<'_>) {
        let Some(screen) = self.screen else {
            log::debug!("Device {}: placeholder without a '{SCREEN_PART}' mesh", self.index);
            return;
        };
        let Some((mut overlay, parent)) = cx
            .scene
            .get_node(screen)
            .map(|n| (n.detached_clone(), n.parent().unwrap_or(screen)))
        else {
            return;
        };

        let settings = TextureSettings::screen(cx.backend.max_anisotropy());
        let texture = match cx.backend.upload_texture(&image.label, image, &settings) {
            Ok(texture) => texture,
            Err(err) => {
                log::error!("Device {}: placeholder upload failed: {err}", self.index);
                return;
            }
        };

        overlay.name = OVERLAY_NAME.to_owned();
        overlay.transform.position.z += OVERLAY_OFFSET;
        if let Some(mesh) = &mut overlay.mesh {
            for material in mesh.materials_mut() {
                material.color = Vec3::ONE;
                material.map = Some(TextureRef::Texture(texture));
                material.transparent = true;
                material.opacity = 1.0;
            }
        }

        let node = cx.scene.add_to_parent(overlay, parent);
        self.overlay = Some(PlaceholderOverlay::new(node, texture));
        self.transition(DeviceState::PlaceholderApplied);
    }

    /// PlaceholderApplied (or GeometryReady) → FullResApplied.
    pub fn on_full_res_loaded(&mut self, result: Result<Arc<DecodedImage>>, cx: &mut DeviceContext<'_>) {
        let applicable = matches!(
            self.state,
            DeviceState::GeometryReady | DeviceState::PlaceholderApplied
        );
        if !applicable || self.full_res.is_some() {
            log::debug!("Device {}: ignoring full-res texture in state {:?}", self.index, self.state);
            return;
        }

        let applied = result.and_then(|image| self.apply_full_res(&image, cx));
        if let Err(err) = applied {
            log::error!("Device {}: full-resolution texture failed: {err}", self.index);
            self.hide_overlay(cx);
        }
        cx.trigger.request();
    }

    fn apply_full_res(&mut self, image: &DecodedImage, cx: &mut DeviceContext<'_>) -> Result<()> {
        let screen = self.screen.ok_or(VitrineError::UninitializedPipeline)?;
        let settings = TextureSettings::screen(cx.backend.max_anisotropy());
        let texture = cx.backend.upload_texture(&image.label, image, &settings)?;

        let mut replaced = ResourceSet::default();
        if let Some(mesh) = cx.scene.get_node_mut(screen).and_then(|n| n.mesh.as_mut()) {
            for material in mesh.materials_mut() {
                if let Some(TextureRef::Texture(old)) = material.map {
                    replaced.textures.insert(old);
                }
                material.color = Vec3::ONE;
                material.map = Some(TextureRef::Texture(texture));
                material.transparent = true;
            }
        }
        replaced.subtract(&cx.scene.resources());
        replaced.dispose(cx.backend);

        self.full_res = Some(texture);
        self.transition(DeviceState::FullResApplied);

        if let Some(overlay) = &self.overlay {
            let from = cx.scene.get_node(overlay.node).and_then(Node::opacity).unwrap_or(1.0);
            cx.ticker.schedule(
                self.id,
                AnimationTag::OverlayFade,
                AnimationTarget::new(overlay.node, AnimatedProperty::Opacity),
                Tween::new(from, 0.0, FADE_DURATION),
                Duration::ZERO,
            );
        }
        Ok(())
    }

    /// Forces the overlay fully transparent; the fallback on failure.
    fn hide_overlay(&mut self, cx: &mut DeviceContext<'_>) {
        if let Some(overlay) = &self.overlay
            && let Some(node) = cx.scene.get_node_mut(overlay.node)
        {
            node.set_opacity(0.0);
        }
    }

    /// Removes the overlay after its fade. Only the first call acts.
    fn discard_overlay(&mut self, cx: &mut DeviceContext<'_>) {
        let Some(overlay) = self.overlay.take() else {
            return;
        };
        if !overlay.token.cancel() {
            return;
        }
        let removed = cx.scene.remove_node(overlay.node);
        let mut resources = ResourceSet::from_nodes(&removed);
        resources.textures.insert(overlay.texture);
        resources.subtract(&cx.scene.resources());
        resources.dispose(cx.backend);
        log::debug!("Device {}: placeholder overlay removed", self.index);
        cx.trigger.request();
    }

    // ========================================================================
    // Entrance track
    // ========================================================================

    fn start_entrance(&mut self, cx: &mut DeviceContext<'_>) {
        if self.entrance != EntranceState::Pending {
            return;
        }
        let Some(root) = self.root else {
            return;
        };
        let rest_y = self.descriptor.position.y;

        if cx.reduced_motion {
            self.entrance = EntranceState::Settled;
            return;
        }

        let hinge = cx.scene.find_by_name(root, HINGE_PART);
        let Some(plan) = entrance::plan(
            self.descriptor.animation,
            self.index,
            cx.show_delay,
            root,
            rest_y,
            hinge,
        ) else {
            if self.descriptor.animation == EntranceKind::HingeOpen {
                log::warn!("Device {}: no '{HINGE_PART}' part; hinge entrance skipped", self.index);
            }
            self.entrance = EntranceState::Settled;
            return;
        };

        plan.target.apply(cx.scene, plan.initial);
        cx.ticker
            .schedule(self.id, AnimationTag::Entrance, plan.target, plan.spring, plan.delay);
        self.entrance = EntranceState::Animating;
    }

    /// Records when a scheduled animation left its delay.
    pub fn on_animation_started(&mut self, tag: AnimationTag, at: Duration) {
        if tag == AnimationTag::Entrance {
            log::debug!("Device {}: entrance started at {at:?}", self.index);
            self.entrance_started = Some(at);
        }
    }

    /// Routes a finished ticker animation.
    pub fn on_animation_complete(&mut self, tag: AnimationTag, cx: &mut DeviceContext<'_>) {
        match tag {
            AnimationTag::Entrance => {
                self.entrance = EntranceState::Settled;
                log::debug!("Device {}: entrance settled", self.index);
            }
            AnimationTag::OverlayFade => self.discard_overlay(cx),
        }
    }

    // ========================================================================
    // Teardown
    // ========================================================================

    /// Cancels animations, detaches the model and releases what only it
    /// referenced.
    pub fn teardown(&mut self, scene: &mut Scene, backend: &mut dyn RenderBackend, ticker: &mut Ticker) {
        ticker.cancel_owner(self.id);
        let overlay_texture = self.overlay.take().and_then(|o| o.token.cancel().then_some(o.texture));

        let Some(root) = self.root.take() else {
            return;
        };
        let removed = scene.remove_node(root);
        let mut resources = ResourceSet::from_nodes(&removed);
        resources.textures.extend(overlay_texture);
        resources.subtract(&scene.resources());
        resources.dispose(backend);
        self.screen = None;
        self.full_res = None;
    }

    /// Cancels pending work without touching the scene; used when the whole
    /// scene is disposed at once.
    pub(crate) fn cancel(&mut self) {
        if let Some(overlay) = self.overlay.take() {
            overlay.token.cancel();
        }
        self.root = None;
        self.screen = None;
    }
}

fn upload_embedded(
    model: &ModelData,
    index: usize,
    cache: &mut [Option<TextureId>],
    backend: &mut dyn RenderBackend,
    settings: &TextureSettings,
) -> Option<TextureId> {
    if let Some(Some(id)) = cache.get(index) {
        return Some(*id);
    }
    let image = model.textures.get(index)?;
    match backend.upload_texture(&image.label, image, settings) {
        Ok(id) => {
            if let Some(slot) = cache.get_mut(index) {
                *slot = Some(id);
            }
            Some(id)
        }
        Err(err) => {
            log::warn!("Skipping embedded texture '{}': {err}", image.label);
            None
        }
    }
}
