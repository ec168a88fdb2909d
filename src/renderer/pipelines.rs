//! Pipeline Cache
//!
//! Owns the bind group layouts shared by every draw and builds render
//! pipelines lazily, keyed by colour format and draw variant.
//!
//! | Group | Contents                          | Used by          |
//! |-------|-----------------------------------|------------------|
//! | 0     | [`FrameUniforms`]                 | all              |
//! | 1     | [`ObjectUniforms`] (dynamic)      | all              |
//! | 2     | colour texture + sampler          | all              |
//! | 3     | [`BlurUniforms`]                  | blur             |
//!
//! [`FrameUniforms`]: super::uniforms::FrameUniforms
//! [`ObjectUniforms`]: super::uniforms::ObjectUniforms
//! [`BlurUniforms`]: super::uniforms::BlurUniforms

use std::num::NonZeroU64;

use rustc_hash::FxHashMap;

use crate::renderer::uniforms::{BlurUniforms, ObjectUniforms};
use crate::scene::Vertex;

const COMMON_WGSL: &str = include_str!("shaders/common.wgsl");
const MESH_WGSL: &str = include_str!("shaders/mesh.wgsl");
const DEPTH_WGSL: &str = include_str!("shaders/depth.wgsl");
const BLUR_WGSL: &str = include_str!("shaders/blur.wgsl");

/// Which shader and fixed-function state a draw needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    Mesh {
        blended: bool,
        depth_test: bool,
        depth_write: bool,
    },
    /// Depth-darkness override used by the shadow capture.
    DepthDarkness,
    /// Directional blur; no depth attachment.
    Blur,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub format: wgpu::TextureFormat,
    pub kind: PipelineKind,
}

pub struct Pipelines {
    pub frame_layout: wgpu::BindGroupLayout,
    pub object_layout: wgpu::BindGroupLayout,
    pub material_layout: wgpu::BindGroupLayout,
    pub blur_layout: wgpu::BindGroupLayout,

    scene_pipeline_layout: wgpu::PipelineLayout,
    blur_pipeline_layout: wgpu::PipelineLayout,

    mesh_shader: wgpu::ShaderModule,
    depth_shader: wgpu::ShaderModule,
    blur_shader: wgpu::ShaderModule,

    depth_format: wgpu::TextureFormat,
    cache: FxHashMap<PipelineKey, wgpu::RenderPipeline>,
}

impl Pipelines {
    pub fn new(device: &wgpu::Device, depth_format: wgpu::TextureFormat) -> Self {
        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame Uniforms Layout"),
            entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX_FRAGMENT, false, None)],
        });
        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Object Uniforms Layout"),
            entries: &[uniform_entry(
                0,
                wgpu::ShaderStages::VERTEX_FRAGMENT,
                true,
                NonZeroU64::new(std::mem::size_of::<ObjectUniforms>() as u64),
            )],
        });
        let material_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material Texture Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let blur_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Blur Uniforms Layout"),
            entries: &[uniform_entry(
                0,
                wgpu::ShaderStages::FRAGMENT,
                false,
                NonZeroU64::new(std::mem::size_of::<BlurUniforms>() as u64),
            )],
        });

        let scene_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[Some(&frame_layout), Some(&object_layout), Some(&material_layout)],
            immediate_size: 0,
        });
        let blur_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Blur Pipeline Layout"),
            bind_group_layouts: &[Some(&frame_layout), Some(&object_layout), Some(&material_layout), Some(&blur_layout)],
            immediate_size: 0,
        });

        let mesh_shader = create_shader(device, "Mesh Shader", MESH_WGSL);
        let depth_shader = create_shader(device, "Depth Darkness Shader", DEPTH_WGSL);
        let blur_shader = create_shader(device, "Blur Shader", BLUR_WGSL);

        Self {
            frame_layout,
            object_layout,
            material_layout,
            blur_layout,
            scene_pipeline_layout,
            blur_pipeline_layout,
            mesh_shader,
            depth_shader,
            blur_shader,
            depth_format,
            cache: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn get(&self, key: &PipelineKey) -> Option<&wgpu::RenderPipeline> {
        self.cache.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Builds the pipeline for `key` if it is not cached yet.
    pub fn ensure(&mut self, device: &wgpu::Device, key: PipelineKey) {
        if self.cache.contains_key(&key) {
            return;
        }
        log::debug!("Creating pipeline {key:?}");
        let pipeline = self.build(device, key);
        self.cache.insert(key, pipeline);
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    fn build(&self, device: &wgpu::Device, key: PipelineKey) -> wgpu::RenderPipeline {
        let (label, shader, layout, blend, depth_stencil) = match key.kind {
            PipelineKind::Mesh {
                blended,
                depth_test,
                depth_write,
            } => (
                if blended { "Mesh Pipeline (Blended)" } else { "Mesh Pipeline" },
                &self.mesh_shader,
                &self.scene_pipeline_layout,
                if blended {
                    wgpu::BlendState::ALPHA_BLENDING
                } else {
                    wgpu::BlendState::REPLACE
                },
                Some(self.depth_state(depth_test, depth_write)),
            ),
            PipelineKind::DepthDarkness => (
                "Depth Darkness Pipeline",
                &self.depth_shader,
                &self.scene_pipeline_layout,
                wgpu::BlendState::REPLACE,
                Some(self.depth_state(false, false)),
            ),
            PipelineKind::Blur => (
                "Blur Pipeline",
                &self.blur_shader,
                &self.blur_pipeline_layout,
                wgpu::BlendState::REPLACE,
                None,
            ),
        };

        let vertex_attributes = wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3, 2 => Float32x2];
        let vertex_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &vertex_attributes,
        };

        device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(layout),
            vertex: wgpu::VertexState {
                module: shader,
                entry_point: Some("vs_main"),
                buffers: &[vertex_layout],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: key.format,
                    blend: Some(blend),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            // Models are authored with mixed winding; draw both faces.
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        })
    }

    fn depth_state(&self, depth_test: bool, depth_write: bool) -> wgpu::DepthStencilState {
        wgpu::DepthStencilState {
            format: self.depth_format,
            depth_write_enabled: Some(depth_write),
            depth_compare: if depth_test {
                Some(wgpu::CompareFunction::LessEqual)
            } else {
                Some(wgpu::CompareFunction::Always)
            },
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }
    }
}

fn create_shader(device: &wgpu::Device, label: &str, body: &str) -> wgpu::ShaderModule {
    let source = format!("{COMMON_WGSL}\n{body}");
    device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(source.into()),
    })
}

fn uniform_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    has_dynamic_offset: bool,
    min_binding_size: Option<NonZeroU64>,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset,
            min_binding_size,
        },
        count: None,
    }
}
