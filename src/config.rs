//! Viewer Configuration
//!
//! Everything an embedding application can set on a viewer, deserializable
//! from camelCase JSON. Missing fields take their defaults.
//!
//! ```json
//! {
//!   "models": [
//!     { "url": "laptop.glb", "animation": "hinge-open",
//!       "texture": { "src": "screen.webp", "placeholder": "screen-lq.webp" } }
//!   ],
//!   "showDelay": 200,
//!   "cameraDistance": 9
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::device::{AssetDescriptor, Position};
use crate::errors::Result;
use crate::scene::LightIntensities;
use crate::shadow::ShadowSettings;

pub const DEFAULT_FOV: f32 = 36.0;
pub const DEFAULT_CAMERA_POSITION: Position = Position::new(0.0, 0.0, 8.0);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewerConfig {
    pub models: Vec<AssetDescriptor>,
    /// Load gate; nothing is fetched until this is on.
    pub show: bool,
    /// Extra entrance delay in milliseconds.
    pub show_delay: u64,
    pub camera_position: Position,
    /// Overrides the camera's z.
    pub camera_distance: Option<f32>,
    /// Vertical field of view in degrees; fixed once mounted.
    pub fov: f32,
    pub ambient_light_intensity: Option<f32>,
    /// Key light intensity; the fill light follows it.
    pub directional_light_intensity: Option<f32>,
    /// Explicit fill intensity, breaking the key coupling.
    pub fill_light_intensity: Option<f32>,
    pub scale: f32,
    pub reduced_motion: bool,
    pub shadow: ShadowSettings,
    /// Accessible label for the rendered canvas.
    pub alt: Option<String>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            models: Vec::new(),
            show: true,
            show_delay: 0,
            camera_position: DEFAULT_CAMERA_POSITION,
            camera_distance: None,
            fov: DEFAULT_FOV,
            ambient_light_intensity: None,
            directional_light_intensity: None,
            fill_light_intensity: None,
            scale: 1.0,
            reduced_motion: false,
            shadow: ShadowSettings::default(),
            alt: None,
        }
    }
}

impl ViewerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    #[must_use]
    pub fn with_models(mut self, models: Vec<AssetDescriptor>) -> Self {
        self.models = models;
        self
    }

    #[inline]
    #[must_use]
    pub fn show_delay(&self) -> Duration {
        Duration::from_millis(self.show_delay)
    }

    /// Camera position with `camera_distance` applied.
    #[must_use]
    pub fn camera_position(&self) -> Vec3 {
        let mut position = Vec3::from(self.camera_position);
        if let Some(distance) = self.camera_distance {
            position.z = distance;
        }
        position
    }

    #[must_use]
    pub fn light_intensities(&self) -> LightIntensities {
        LightIntensities {
            ambient: self.ambient_light_intensity,
            key: self.directional_light_intensity,
            fill: self.fill_light_intensity,
        }
    }
}
