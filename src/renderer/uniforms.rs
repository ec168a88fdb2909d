//! GPU uniform layouts.
//!
//! Every struct here mirrors a WGSL struct in `shaders/`; field order and
//! padding must stay in sync with them.

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use glam::{Affine3A, Mat4, Vec3};

use crate::render::BlurPass;
use crate::scene::{Light, LightKind, Material, Shading};

/// Directional lights the mesh shader evaluates.
pub const MAX_DIRECTIONAL_LIGHTS: usize = 2;

/// Stride of one object slot in the dynamic uniform buffer.
pub const OBJECT_UNIFORM_STRIDE: u64 = 256;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct DrawFlags: u32 {
        const LIT     = 1 << 0;
        const HAS_MAP = 1 << 1;
    }
}

/// Group 0: camera and lights.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    pub view_projection: [[f32; 4]; 4],
    /// rgb = summed ambient radiance.
    pub ambient: [f32; 4],
    /// xyz = direction toward the light.
    pub light_directions: [[f32; 4]; MAX_DIRECTIONAL_LIGHTS],
    /// rgb = colour × intensity.
    pub light_colors: [[f32; 4]; MAX_DIRECTIONAL_LIGHTS],
    /// x = depth darkness, y = directional light count.
    pub params: [f32; 4],
}

impl FrameUniforms {
    #[must_use]
    pub fn new(view_projection: Mat4, lights: &[Light], darkness: f32) -> Self {
        let mut uniforms = Self {
            view_projection: view_projection.to_cols_array_2d(),
            ambient: [0.0; 4],
            light_directions: [[0.0; 4]; MAX_DIRECTIONAL_LIGHTS],
            light_colors: [[0.0; 4]; MAX_DIRECTIONAL_LIGHTS],
            params: [darkness, 0.0, 0.0, 0.0],
        };

        let mut ambient = Vec3::ZERO;
        let mut directional = 0;
        for light in lights {
            let radiance = light.color * light.intensity;
            match light.kind {
                LightKind::Ambient => ambient += radiance,
                LightKind::Directional { .. } => {
                    if directional == MAX_DIRECTIONAL_LIGHTS {
                        log::debug!("Ignoring directional light beyond {MAX_DIRECTIONAL_LIGHTS}");
                        continue;
                    }
                    let dir = light.direction().unwrap_or(Vec3::Z);
                    uniforms.light_directions[directional] = dir.extend(0.0).to_array();
                    uniforms.light_colors[directional] = radiance.extend(0.0).to_array();
                    directional += 1;
                }
            }
        }
        uniforms.ambient = ambient.extend(1.0).to_array();
        uniforms.params[1] = directional as f32;
        uniforms
    }
}

/// Group 1: per-draw transform and material constants.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ObjectUniforms {
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    /// rgb = linear colour, a = opacity.
    pub color: [f32; 4],
    /// x = [`DrawFlags`] bits.
    pub flags: [u32; 4],
}

impl ObjectUniforms {
    #[must_use]
    pub fn new(world: Affine3A, material: &Material) -> Self {
        let model = Mat4::from(world);
        let normal_matrix = model.inverse().transpose();

        let mut flags = DrawFlags::empty();
        if material.shading == Shading::Lit {
            flags |= DrawFlags::LIT;
        }
        if material.map.is_some() {
            flags |= DrawFlags::HAS_MAP;
        }

        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: normal_matrix.to_cols_array_2d(),
            color: material.color.extend(material.opacity).to_array(),
            flags: [flags.bits(), 0, 0, 0],
        }
    }
}

/// Group 3 of the blur pipeline.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct BlurUniforms {
    /// xy = unit UV direction, z = tap spacing.
    pub direction: [f32; 4],
    /// Kernel weights 0..=3.
    pub weights: [f32; 4],
    /// x = kernel weight 4.
    pub weights_tail: [f32; 4],
}

impl BlurUniforms {
    #[must_use]
    pub fn new(pass: &BlurPass) -> Self {
        let [dx, dy] = pass.material.direction();
        let [k0, k1, k2, k3, k4] = pass.material.kernel;
        Self {
            direction: [dx, dy, pass.step(), 0.0],
            weights: [k0, k1, k2, k3],
            weights_tail: [k4, 0.0, 0.0, 0.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{LightSet, TextureRef};

    #[test]
    fn uniform_sizes_match_wgsl() {
        assert_eq!(std::mem::size_of::<FrameUniforms>(), 160);
        assert_eq!(std::mem::size_of::<ObjectUniforms>(), 160);
        assert_eq!(std::mem::size_of::<BlurUniforms>(), 48);
        assert!(std::mem::size_of::<ObjectUniforms>() as u64 <= OBJECT_UNIFORM_STRIDE);
    }

    #[test]
    fn frame_uniforms_sum_ambient_and_pack_directionals() {
        let lights = LightSet::default().to_vec();
        let frame = FrameUniforms::new(Mat4::IDENTITY, &lights, 3.0);
        assert!((frame.ambient[0] - 1.2).abs() < 1e-6);
        assert_eq!(frame.params[0], 3.0);
        assert_eq!(frame.params[1], 2.0);
        let len = Vec3::from_slice(&frame.light_directions[0][..3]).length();
        assert!((len - 1.0).abs() < 1e-5, "light direction should be normalised");
    }

    #[test]
    fn no_lights_is_black() {
        let frame = FrameUniforms::new(Mat4::IDENTITY, &[], 0.0);
        assert_eq!(frame.ambient[..3], [0.0; 3]);
        assert_eq!(frame.params[1], 0.0);
    }

    #[test]
    fn object_flags_follow_material() {
        let unlit = Material::unlit(Vec3::ONE);
        assert_eq!(ObjectUniforms::new(Affine3A::IDENTITY, &unlit).flags[0], 0);

        let mut lit = Material::lit(Vec3::ONE).with_opacity(0.5);
        lit.map = Some(TextureRef::Texture(Default::default()));
        let object = ObjectUniforms::new(Affine3A::IDENTITY, &lit);
        assert_eq!(object.flags[0], (DrawFlags::LIT | DrawFlags::HAS_MAP).bits());
        assert_eq!(object.color[3], 0.5);
    }

    #[test]
    fn blur_uniforms_come_from_the_pass_material() {
        use crate::render::{BlurAxis, RenderTargetId};
        use crate::shadow::BlurMaterial;

        let kernel = [0.2, 0.2, 0.1, 0.1, 0.0];
        let pass = BlurPass {
            material: BlurMaterial::new(BlurAxis::Vertical).with_kernel(kernel),
            radius: 2.56,
            source: RenderTargetId::default(),
            destination: RenderTargetId::default(),
        };
        let uniforms = BlurUniforms::new(&pass);
        assert_eq!(uniforms.direction[..2], [0.0, 1.0]);
        assert!((uniforms.direction[2] - 0.01).abs() < 1e-7);
        assert_eq!(uniforms.weights, [0.2, 0.2, 0.1, 0.1]);
        assert_eq!(uniforms.weights_tail[0], 0.0);
    }
}
