use glam::Vec3;

/// Key light position, in front of the models and to the right.
pub const KEY_LIGHT_POSITION: Vec3 = Vec3::new(0.5, 0.0, 0.866);
/// Fill light position.
pub const FILL_LIGHT_POSITION: Vec3 = Vec3::new(-6.0, 2.0, 2.0);

pub const DEFAULT_AMBIENT_INTENSITY: f32 = 1.2;
pub const DEFAULT_KEY_INTENSITY: f32 = 1.1;
/// Fill intensity as a fraction of key intensity.
pub const FILL_RATIO: f32 = 0.8 / 1.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Ambient,
    /// Shines from `position` toward the origin.
    Directional { position: Vec3 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub color: Vec3,
    pub intensity: f32,
    pub kind: LightKind,
}

impl Light {
    #[must_use]
    pub fn ambient(intensity: f32) -> Self {
        Self {
            color: Vec3::ONE,
            intensity,
            kind: LightKind::Ambient,
        }
    }

    #[must_use]
    pub fn directional(intensity: f32, position: Vec3) -> Self {
        Self {
            color: Vec3::ONE,
            intensity,
            kind: LightKind::Directional { position },
        }
    }

    /// Unit vector pointing from the surface toward the light.
    #[must_use]
    pub fn direction(&self) -> Option<Vec3> {
        match self.kind {
            LightKind::Ambient => None,
            LightKind::Directional { position } => Some(position.normalize_or_zero()),
        }
    }
}

/// Intensity overrides for the light rig.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LightIntensities {
    pub ambient: Option<f32>,
    pub key: Option<f32>,
    /// Explicit fill override; otherwise derived from key.
    pub fill: Option<f32>,
}

/// Ambient, key and fill lights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSet {
    pub ambient: Light,
    pub key: Light,
    pub fill: Light,
}

impl LightSet {
    /// Builds the rig; fill follows key unless explicitly overridden.
    #[must_use]
    pub fn new(intensities: LightIntensities) -> Self {
        let ambient = intensities.ambient.unwrap_or(DEFAULT_AMBIENT_INTENSITY);
        let key = intensities.key.unwrap_or(DEFAULT_KEY_INTENSITY);
        let fill = intensities.fill.unwrap_or(key * FILL_RATIO);
        Self {
            ambient: Light::ambient(ambient),
            key: Light::directional(key, KEY_LIGHT_POSITION),
            fill: Light::directional(fill, FILL_LIGHT_POSITION),
        }
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<Light> {
        vec![self.ambient, self.key, self.fill]
    }
}

impl Default for LightSet {
    fn default() -> Self {
        Self::new(LightIntensities::default())
    }
}
