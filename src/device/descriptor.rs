use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::assets::srcset;

/// A point in model-group space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl From<Position> for Vec3 {
    fn from(p: Position) -> Self {
        Vec3::new(p.x, p.y, p.z)
    }
}

impl From<Vec3> for Position {
    fn from(v: Vec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

/// How a device enters the scene once its geometry is ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntranceKind {
    #[default]
    None,
    /// Rise one unit from below on a spring.
    SpringUp,
    /// Swing the `Frame` part from 90° closed to open.
    HingeOpen,
}

/// Screen texture sources of a device.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextureDescriptor {
    /// Full-resolution image.
    pub src: Option<String>,
    /// Responsive candidates (`url 640w, url 1280w` or `url 1x, url 2x`).
    pub src_set: Option<String>,
    /// Low-resolution image shown while the full one streams in.
    pub placeholder: Option<String>,
}

impl TextureDescriptor {
    /// Full-resolution URL for a drawable `width` pixels wide.
    #[must_use]
    pub fn full_res_uri(&self, width: u32, pixel_ratio: f32) -> Option<String> {
        if let Some(set) = self.src_set.as_deref()
            && let Some(url) = srcset::resolve(set, width, pixel_ratio)
        {
            return Some(url);
        }
        non_empty(self.src.as_deref()).map(str::to_owned)
    }

    #[must_use]
    pub fn placeholder_uri(&self) -> Option<&str> {
        non_empty(self.placeholder.as_deref())
    }
}

/// One loadable model as supplied by the embedding application.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssetDescriptor {
    /// glTF/GLB source.
    pub url: Option<String>,
    pub texture: Option<TextureDescriptor>,
    /// Resting position inside the model group.
    pub position: Position,
    pub animation: EntranceKind,
}

impl AssetDescriptor {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_texture(mut self, texture: TextureDescriptor) -> Self {
        self.texture = Some(texture);
        self
    }

    #[must_use]
    pub fn with_position(mut self, x: f32, y: f32, z: f32) -> Self {
        self.position = Position::new(x, y, z);
        self
    }

    #[must_use]
    pub fn with_animation(mut self, animation: EntranceKind) -> Self {
        self.animation = animation;
        self
    }

    /// Model URL, if one is set and non-blank.
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        non_empty(self.url.as_deref())
    }

    #[must_use]
    pub fn placeholder_uri(&self) -> Option<&str> {
        self.texture.as_ref().and_then(TextureDescriptor::placeholder_uri)
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}
