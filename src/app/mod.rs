//! Winit Application Shell
//!
//! Hosts one [`Viewer`] in a native window.
//!
//! # Overview
//!
//! - [`App`]: builder for configuring and launching the window
//! - `AppRunner`: internal event loop handler
//!
//! Window events map onto viewer inputs: resizes resize, cursor motion feeds
//! the rotation springs, occlusion toggles visibility, and every redraw
//! advances the frame loop.
//!
//! ```rust,ignore
//! use vitrine::app::App;
//! use vitrine::config::ViewerConfig;
//!
//! fn main() -> vitrine::errors::Result<()> {
//!     let config = ViewerConfig::load("models.json")?;
//!     App::new(config).with_title("Showcase").run()
//! }
//! ```

use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
pub use winit::window::{Window, WindowId};

use crate::assets::{AssetFetcher, AssetReader};
use crate::config::ViewerConfig;
use crate::errors::Result;
use crate::renderer::{GpuRenderer, RendererSettings};
use crate::utils::Timer;
use crate::viewer::Viewer;

/// Application builder for configuring and launching a viewer window.
pub struct App {
    title: String,
    config: ViewerConfig,
    render_settings: RendererSettings,
    fetcher: Option<Arc<dyn AssetFetcher>>,
}

impl App {
    #[must_use]
    pub fn new(config: ViewerConfig) -> Self {
        let title = config.alt.clone().unwrap_or_else(|| "Vitrine".into());
        Self {
            title,
            config,
            render_settings: RendererSettings::default(),
            fetcher: None,
        }
    }

    /// Sets the window title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    #[must_use]
    pub fn with_settings(mut self, settings: RendererSettings) -> Self {
        self.render_settings = settings;
        self
    }

    /// Where asset URLs are resolved; the working directory by default.
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: Arc<dyn AssetFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Runs the event loop until the window closes.
    pub fn run(self) -> Result<()> {
        let event_loop = EventLoop::new()?;
        event_loop.set_control_flow(ControlFlow::Poll);

        let fetcher = self.fetcher.unwrap_or_else(|| Arc::new(AssetReader::default()));
        let mut runner = AppRunner::new(self.title, self.config, self.render_settings, fetcher);
        event_loop.run_app(&mut runner)?;
        Ok(())
    }
}

/// Internal application runner that implements winit's `ApplicationHandler`.
struct AppRunner {
    title: String,
    config: ViewerConfig,
    render_settings: RendererSettings,
    fetcher: Arc<dyn AssetFetcher>,

    window: Option<Arc<Window>>,
    viewer: Option<Viewer<GpuRenderer>>,

    timer: Timer,
}

impl AppRunner {
    fn new(
        title: String,
        config: ViewerConfig,
        render_settings: RendererSettings,
        fetcher: Arc<dyn AssetFetcher>,
    ) -> Self {
        Self {
            title,
            config,
            render_settings,
            fetcher,
            window: None,
            viewer: None,
            timer: Timer::new(),
        }
    }

    fn mount(&mut self, window: Arc<Window>) -> Result<Viewer<GpuRenderer>> {
        let size = window.inner_size();
        let renderer = pollster::block_on(GpuRenderer::new(
            window.clone(),
            size.width.max(1),
            size.height.max(1),
            self.render_settings.clone(),
        ))?;
        let mut viewer = Viewer::mount_with_fetcher(renderer, self.config.clone(), self.fetcher.clone())?;
        viewer.resize(size.width.max(1), size.height.max(1), window.scale_factor() as f32);
        viewer.on_device_ready(|_, device| {
            log::info!("Model {} ready: {:?}", device.index(), device.state());
        });
        Ok(viewer)
    }

    fn frame(&mut self) {
        self.timer.tick();
        if let Some(viewer) = &mut self.viewer {
            viewer.update(self.timer.delta);
        }
    }
}

impl ApplicationHandler for AppRunner {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attributes = Window::default_attributes()
            .with_title(&self.title)
            .with_inner_size(winit::dpi::LogicalSize::new(1280.0, 720.0));

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };
        self.window = Some(window.clone());

        log::info!("Initializing Renderer Backend...");
        match self.mount(window) {
            Ok(viewer) => self.viewer = Some(viewer),
            Err(e) => {
                log::error!("Fatal Renderer Error: {e}");
                event_loop.exit();
                return;
            }
        }
        self.timer = Timer::new();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let (Some(window), Some(viewer)) = (&self.window, &mut self.viewer) else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                viewer.teardown();
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                viewer.resize(size.width, size.height, window.scale_factor() as f32);
            }
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                let size = window.inner_size();
                viewer.resize(size.width, size.height, scale_factor as f32);
            }
            WindowEvent::CursorMoved { position, .. } => {
                viewer.pointer_moved(position.x as f32, position.y as f32, Instant::now());
            }
            WindowEvent::Occluded(occluded) => {
                viewer.set_visibility_ratio(if occluded { 0.0 } else { 1.0 });
            }
            WindowEvent::RedrawRequested => {
                self.frame();
                if let Some(w) = &self.window {
                    w.request_redraw();
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if self.viewer.is_some()
            && let Some(window) = &self.window
        {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(mut viewer) = self.viewer.take() {
            viewer.teardown();
        }
    }
}
