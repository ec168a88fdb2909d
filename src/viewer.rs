//! Viewer Lifecycle
//!
//! [`Viewer`] owns everything one mounted viewer allocates and is the only
//! thing an embedding application talks to.
//!
//! # Lifecycle
//!
//! ```text
//! mount:    renderer ─▶ camera ─▶ scene ─▶ lights ─▶ shadow surfaces ─▶ blur materials
//! unmount:  render targets ─▶ lights ─▶ scene resources ─▶ renderer ─▶ spring listeners
//! ```
//!
//! # Frame loop
//!
//! Call [`Viewer::update`] once per display frame. It applies finished
//! loads, advances the animation ticker and the rotation springs, and draws
//! a frame only if something requested one through the [`RenderTrigger`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use slotmap::SlotMap;

use crate::assets::{AssetFetcher, AssetLoader, AssetReader, LoadEvent};
use crate::config::ViewerConfig;
use crate::device::{AssetDescriptor, Device, DeviceContext, DeviceId, LoadRequest};
use crate::errors::{Result, VitrineError};
use crate::motion::{ListenerKey, RotationSprings, Ticker};
use crate::render::{RenderBackend, RenderTrigger};
use crate::scene::{Scene, SceneManager};
use crate::viewport::ViewportController;

/// Called once per device when its initial load is over.
pub type ReadyCallback = Box<dyn FnMut(DeviceId, &Device)>;

pub struct Viewer<B: RenderBackend + 'static> {
    backend: B,
    stage: SceneManager,
    springs: RotationSprings,
    spring_listener: Option<ListenerKey>,
    viewport: ViewportController,
    ticker: Ticker,
    devices: SlotMap<DeviceId, Device>,
    order: Vec<DeviceId>,
    loader: AssetLoader,
    trigger: RenderTrigger,
    config: ViewerConfig,
    on_ready: Option<ReadyCallback>,
    /// Devices that became ready while no callback was registered.
    ready_queue: Vec<DeviceId>,
    torn_down: bool,
}

impl<B: RenderBackend + 'static> Viewer<B> {
    /// Mounts a viewer reading assets from the working directory (or URLs).
    pub fn mount(backend: B, config: ViewerConfig) -> Result<Self> {
        Self::mount_with_fetcher(backend, config, Arc::new(AssetReader::default()))
    }

    /// Mounts a viewer on an already-created rendering context.
    pub fn mount_with_fetcher(mut backend: B, config: ViewerConfig, fetcher: Arc<dyn AssetFetcher>) -> Result<Self> {
        if backend.is_disposed() {
            return Err(VitrineError::UninitializedPipeline);
        }

        let loader = AssetLoader::new(fetcher)?;
        let stage = SceneManager::new(&mut backend, &config);

        let trigger = RenderTrigger::new();
        let mut springs = RotationSprings::default();
        let listener_trigger = trigger.clone();
        let spring_listener = springs.on_change(move |_| listener_trigger.request());

        let (width, height) = backend.size();
        let viewport = ViewportController::new(width, height, config.reduced_motion);

        let mut viewer = Self {
            backend,
            stage,
            springs,
            spring_listener: Some(spring_listener),
            viewport,
            ticker: Ticker::new(),
            devices: SlotMap::with_key(),
            order: Vec::new(),
            loader,
            trigger,
            config,
            on_ready: None,
            ready_queue: Vec::new(),
            torn_down: false,
        };

        for descriptor in viewer.config.models.clone() {
            viewer.add_device(descriptor);
        }
        if viewer.config.show {
            viewer.start_loading();
        }
        viewer.trigger.request();

        log::info!("Viewer mounted with {} device(s)", viewer.order.len());
        Ok(viewer)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[inline]
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    #[inline]
    #[must_use]
    pub fn stage(&self) -> &SceneManager {
        &self.stage
    }

    #[inline]
    #[must_use]
    pub fn scene(&self) -> &Scene {
        self.stage.scene()
    }

    #[inline]
    #[must_use]
    pub fn springs(&self) -> &RotationSprings {
        &self.springs
    }

    #[inline]
    #[must_use]
    pub fn viewport(&self) -> &ViewportController {
        &self.viewport
    }

    #[inline]
    #[must_use]
    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// Devices in descriptor order.
    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.order.iter().filter_map(|id| self.devices.get(*id))
    }

    #[inline]
    #[must_use]
    pub fn device_ids(&self) -> &[DeviceId] {
        &self.order
    }

    #[inline]
    #[must_use]
    pub fn device(&self, id: DeviceId) -> Option<&Device> {
        self.devices.get(id)
    }

    /// A handle external code can use to request a frame.
    #[must_use]
    pub fn render_trigger(&self) -> RenderTrigger {
        self.trigger.clone()
    }

    /// True once every device reached GeometryReady, Skipped or Failed.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.devices().all(Device::is_loaded)
    }

    /// Loads still running in the background.
    #[must_use]
    pub fn pending_loads(&self) -> usize {
        self.loader.in_flight()
    }

    #[inline]
    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    // ========================================================================
    // Inputs
    // ========================================================================

    /// Registers the per-device ready callback.
    ///
    /// Devices that were already ready (e.g. skipped during mount) are
    /// reported right away, so every device is reported exactly once.
    pub fn on_device_ready(&mut self, callback: impl FnMut(DeviceId, &Device) + 'static) {
        self.on_ready = Some(Box::new(callback));
        self.flush_ready();
    }

    /// The "viewer should load" gate.
    pub fn set_show(&mut self, show: bool) {
        self.config.show = show;
        if show {
            self.start_loading();
        }
    }

    pub fn set_reduced_motion(&mut self, reduced_motion: bool) {
        self.config.reduced_motion = reduced_motion;
        self.viewport.set_reduced_motion(reduced_motion);
    }

    /// Container visibility as a fraction in `[0, 1]`.
    pub fn set_visibility_ratio(&mut self, ratio: f32) {
        self.viewport.set_visibility_ratio(ratio);
    }

    /// Pointer position in drawable pixels, sampled at `now`.
    pub fn pointer_moved(&mut self, x: f32, y: f32, now: Instant) -> bool {
        if self.torn_down {
            return false;
        }
        self.viewport.pointer_moved(x, y, now, &mut self.springs)
    }

    /// Resizes renderer and camera, then draws immediately.
    pub fn resize(&mut self, width: u32, height: u32, scale_factor: f32) {
        if self.torn_down {
            return;
        }
        self.stage.resize(&mut self.backend, width, height, scale_factor);
        let (w, h) = self.backend.size();
        self.viewport.resize(w, h);
        self.render_frame();
    }

    pub fn set_scale(&mut self, scale: f32) {
        if self.torn_down {
            return;
        }
        self.config.scale = scale;
        self.stage.set_scale(&mut self.backend, &self.springs, scale);
    }

    pub fn set_camera_distance(&mut self, distance: f32) {
        if self.torn_down {
            return;
        }
        self.config.camera_distance = Some(distance);
        self.stage.set_camera_distance(&mut self.backend, &self.springs, distance);
    }

    /// Replaces the descriptor list.
    ///
    /// Devices whose descriptor is unchanged are kept as they are; removed
    /// ones are torn down, new ones start loading if the gate is on.
    pub fn set_models(&mut self, models: Vec<AssetDescriptor>) {
        if self.torn_down {
            return;
        }
        let mut remaining = std::mem::take(&mut self.order);
        let mut next = Vec::with_capacity(models.len());

        for (index, descriptor) in models.iter().enumerate() {
            let reused = remaining.iter().position(|id| {
                self.devices
                    .get(*id)
                    .is_some_and(|d| d.descriptor() == descriptor && d.index() == index)
            });
            match reused {
                Some(pos) => next.push(remaining.remove(pos)),
                None => {
                    let id = self.devices.insert_with_key(|id| Device::new(id, index, descriptor.clone()));
                    next.push(id);
                }
            }
        }

        for id in remaining {
            if let Some(mut device) = self.devices.remove(id) {
                log::debug!("Removing device {}", device.index());
                device.teardown(self.stage.scene_mut(), &mut self.backend, &mut self.ticker);
            }
        }

        self.order = next;
        self.config.models = models;
        if self.config.show {
            self.start_loading();
        }
        self.trigger.request();
    }

    // ========================================================================
    // Frame loop
    // ========================================================================

    /// Applies loads, advances animations by `dt` and draws if requested.
    ///
    /// Returns `true` if a frame was drawn.
    pub fn update(&mut self, dt: Duration) -> bool {
        if self.torn_down {
            return false;
        }
        self.pump_loads();

        let report = self.ticker.advance(dt, self.stage.scene_mut());
        if report.changed() {
            self.trigger.request();
        }
        for start in &report.started {
            if let Some(device) = self.devices.get_mut(start.owner) {
                device.on_animation_started(start.tag, start.at);
            }
        }
        for done in report.completed {
            self.with_device(done.owner, |device, cx| device.on_animation_complete(done.tag, cx));
        }

        self.springs.advance(dt);

        if self.trigger.take() {
            return self.render_frame();
        }
        false
    }

    /// Draws one frame now, regardless of the trigger.
    pub fn render_frame(&mut self) -> bool {
        if self.torn_down {
            return false;
        }
        self.stage.render_frame(&mut self.backend, &self.springs)
    }

    /// Applies every finished load without blocking.
    pub fn pump_loads(&mut self) -> usize {
        let mut applied = 0;
        while let Some(event) = self.loader.try_recv() {
            self.apply_load(event);
            applied += 1;
        }
        applied
    }

    /// Blocks until no loads are in flight (including follow-up full-res
    /// loads) or `timeout` passes. Returns `true` if everything settled.
    pub fn wait_for_loads(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.pump_loads();
            if self.loader.in_flight() == 0 {
                // Loads finishing between the pump and the check sent first.
                if self.pump_loads() == 0 {
                    return true;
                }
                continue;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            if let Some(event) = self.loader.recv_timeout(remaining.min(Duration::from_millis(10))) {
                self.apply_load(event);
            }
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn add_device(&mut self, descriptor: AssetDescriptor) -> DeviceId {
        let index = self.order.len();
        let id = self.devices.insert_with_key(|id| Device::new(id, index, descriptor));
        self.order.push(id);
        id
    }

    fn start_loading(&mut self) {
        for &id in &self.order {
            let Some(device) = self.devices.get_mut(id) else {
                continue;
            };
            match device.begin_loading() {
                LoadRequest::None => {}
                LoadRequest::Skip => {
                    if device.take_ready() {
                        self.ready_queue.push(id);
                    }
                }
                LoadRequest::Geometry { model, placeholder } => {
                    self.loader.request_geometry(id, model, placeholder);
                }
            }
        }
        self.flush_ready();
    }

    fn apply_load(&mut self, event: LoadEvent) {
        let id = event.device();
        let drawable_width = self.backend.size().0;
        let mut full_res = None;

        let handled = self.with_device(id, |device, cx| match event {
            LoadEvent::Geometry { result, .. } => {
                full_res = device.on_geometry_loaded(result, cx, drawable_width);
            }
            LoadEvent::FullRes { result, .. } => device.on_full_res_loaded(result, cx),
        });
        if !handled {
            log::debug!("Dropping load result for removed device {id:?}");
            return;
        }

        if let Some(uri) = full_res {
            self.loader.request_full_res(id, uri);
        }

        if let Some(device) = self.devices.get_mut(id)
            && device.take_ready()
        {
            log::info!("Device {} ready ({:?})", device.index(), device.state());
            self.ready_queue.push(id);
        }
        self.flush_ready();
    }

    /// Reports queued ready devices, if a callback is registered.
    fn flush_ready(&mut self) {
        let Some(callback) = &mut self.on_ready else {
            return;
        };
        for id in self.ready_queue.drain(..) {
            if let Some(device) = self.devices.get(id) {
                callback(id, device);
            }
        }
    }

    /// Runs `f` with the device and a context over the scene.
    fn with_device(&mut self, id: DeviceId, f: impl FnOnce(&mut Device, &mut DeviceContext<'_>)) -> bool {
        let Some(device) = self.devices.get_mut(id) else {
            return false;
        };
        let model_group = self.stage.model_group();
        let mut cx = DeviceContext {
            scene: self.stage.scene_mut(),
            model_group,
            backend: &mut self.backend,
            ticker: &mut self.ticker,
            trigger: &self.trigger,
            reduced_motion: self.config.reduced_motion,
            show_delay: self.config.show_delay(),
        };
        f(device, &mut cx);
        true
    }

    /// Deactivation; idempotent. Also run on drop.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        self.loader.shutdown();
        for device in self.devices.values_mut() {
            self.ticker.cancel_owner(device.id());
            device.cancel();
        }

        self.stage.teardown(&mut self.backend);
        self.backend.dispose();

        if let Some(key) = self.spring_listener.take() {
            self.springs.unsubscribe(key);
        }
        self.springs.unsubscribe_all();

        log::info!("Viewer unmounted");
    }

    /// Tears the viewer down and drops it.
    pub fn unmount(mut self) {
        self.teardown();
    }
}

impl<B: RenderBackend + 'static> Drop for Viewer<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}
