//! wgpu Renderer
//!
//! [`GpuRenderer`] is the [`RenderBackend`] that actually draws.
//!
//! # Overview
//!
//! - [`context`]: device, queue, surface and surface depth buffer
//! - [`pipelines`]: bind group layouts and the lazily built pipeline cache
//! - [`uniforms`]: `Pod` mirrors of the WGSL uniform blocks
//! - [`settings`]: [`RendererSettings`]
//!
//! Each `render` or `render_blur` call records one command encoder and
//! submits it immediately, so uniform buffers can be rewritten between calls
//! of the same frame. Drawing into the surface presents it.

pub mod context;
pub mod pipelines;
pub mod settings;
pub mod uniforms;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use slotmap::SlotMap;
use wgpu::util::DeviceExt;

use crate::assets::image::DecodedImage;
use crate::errors::{Result, VitrineError};
use crate::render::{
    BlurPass, BlurPlane, ColorSpace, GpuMeshId, RenderBackend, RenderTargetId, TextureId, TextureSettings,
};
use crate::scene::{Camera, GeometryData, Material, NodeHandle, OverrideMaterial, Scene, TextureRef};

pub use context::WgpuContext;
pub use pipelines::{PipelineKey, PipelineKind, Pipelines};
pub use settings::RendererSettings;
pub use uniforms::{BlurUniforms, DrawFlags, FrameUniforms, ObjectUniforms, OBJECT_UNIFORM_STRIDE};

/// Colour format of offscreen render targets.
pub const RENDER_TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

const INITIAL_OBJECT_SLOTS: u64 = 64;

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

struct GpuTexture {
    _texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

struct GpuRenderTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    bind_group: wgpu::BindGroup,
}

/// Where the current pass draws.
enum FrameTarget {
    Surface {
        frame: wgpu::SurfaceTexture,
        view: wgpu::TextureView,
    },
    Offscreen(RenderTargetId),
}

pub struct GpuRenderer {
    context: WgpuContext,
    settings: RendererSettings,
    pipelines: Pipelines,

    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    object_buffer: wgpu::Buffer,
    object_bind_group: wgpu::BindGroup,
    object_slots: u64,
    blur_buffer: wgpu::Buffer,
    blur_bind_group: wgpu::BindGroup,

    target_sampler: wgpu::Sampler,
    default_texture: GpuTexture,

    meshes: SlotMap<GpuMeshId, GpuMesh>,
    textures: SlotMap<TextureId, GpuTexture>,
    targets: SlotMap<RenderTargetId, GpuRenderTarget>,
    current_target: Option<RenderTargetId>,

    scale_factor: f32,
    disposed: bool,
}

impl GpuRenderer {
    /// Creates the GPU context for `window` and all shared resources.
    pub async fn new<W>(window: W, width: u32, height: u32, settings: RendererSettings) -> Result<Self>
    where
        W: HasWindowHandle + HasDisplayHandle + Send + Sync + 'static,
    {
        let context = WgpuContext::new(window, &settings, width, height).await?;
        let device = &context.device;

        let pipelines = Pipelines::new(device, context.depth_format);

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniforms"),
            size: std::mem::size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame BindGroup"),
            layout: &pipelines.frame_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        let (object_buffer, object_bind_group) = create_object_buffer(device, &pipelines, INITIAL_OBJECT_SLOTS);

        let blur_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Blur Uniforms"),
            size: std::mem::size_of::<BlurUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let blur_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Blur BindGroup"),
            layout: &pipelines.blur_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: blur_buffer.as_entire_binding(),
            }],
        });

        let target_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Render Target Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let white = DecodedImage::solid("Default White", [255, 255, 255, 255]);
        let default_texture = create_texture(&context, &pipelines, &white, &TextureSettings::default())?;

        log::info!(
            "GPU renderer ready: {}x{} ({:?})",
            context.config.width,
            context.config.height,
            context.color_format()
        );

        Ok(Self {
            context,
            settings,
            pipelines,
            frame_buffer,
            frame_bind_group,
            object_buffer,
            object_bind_group,
            object_slots: INITIAL_OBJECT_SLOTS,
            blur_buffer,
            blur_bind_group,
            target_sampler,
            default_texture,
            meshes: SlotMap::with_key(),
            textures: SlotMap::with_key(),
            targets: SlotMap::with_key(),
            current_target: None,
            scale_factor: 1.0,
            disposed: false,
        })
    }

    #[inline]
    #[must_use]
    pub fn context(&self) -> &WgpuContext {
        &self.context
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    #[inline]
    #[must_use]
    pub fn scale_factor(&self) -> f32 {
        self.scale_factor
    }

    // ========================================================================
    // Frame helpers
    // ========================================================================

    fn write_objects(&mut self, objects: &[ObjectUniforms]) {
        let needed = objects.len() as u64;
        if needed > self.object_slots {
            let slots = needed.next_power_of_two();
            log::debug!("Growing object uniform buffer to {slots} slots");
            let (buffer, bind_group) = create_object_buffer(&self.context.device, &self.pipelines, slots);
            self.object_buffer = buffer;
            self.object_bind_group = bind_group;
            self.object_slots = slots;
        }

        let stride = OBJECT_UNIFORM_STRIDE as usize;
        let mut staging = vec![0u8; objects.len() * stride];
        for (slot, object) in staging.chunks_exact_mut(stride).zip(objects) {
            let bytes = bytemuck::bytes_of(object);
            slot[..bytes.len()].copy_from_slice(bytes);
        }
        if !staging.is_empty() {
            self.context.queue.write_buffer(&self.object_buffer, 0, &staging);
        }
    }

    fn begin_target(&self) -> Option<FrameTarget> {
        if let Some(id) = self.current_target {
            if self.targets.contains_key(id) {
                return Some(FrameTarget::Offscreen(id));
            }
            log::warn!("Render target {id:?} no longer exists");
            return None;
        }

        let frame = match self.context.surface.get_current_texture() {
            wgpu::CurrentSurfaceTexture::Success(frame) | wgpu::CurrentSurfaceTexture::Suboptimal(frame) => frame,
            wgpu::CurrentSurfaceTexture::Lost | wgpu::CurrentSurfaceTexture::Outdated => {
                self.context.reconfigure();
                return None;
            }
            e => {
                log::error!("Render error: {e:?}");
                return None;
            }
        };
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
        Some(FrameTarget::Surface { frame, view })
    }

    fn target_format(&self, target: &FrameTarget) -> wgpu::TextureFormat {
        match target {
            FrameTarget::Surface { .. } => self.context.color_format(),
            FrameTarget::Offscreen(_) => RENDER_TARGET_FORMAT,
        }
    }

    /// Colour and depth views of `target`.
    fn target_views<'a>(&'a self, target: &'a FrameTarget) -> Option<(&'a wgpu::TextureView, &'a wgpu::TextureView)> {
        match target {
            FrameTarget::Surface { view, .. } => Some((view, &self.context.depth_texture_view)),
            FrameTarget::Offscreen(id) => self.targets.get(*id).map(|t| (&t.view, &t.depth_view)),
        }
    }

    fn material_bind_group(&self, map: Option<TextureRef>) -> &wgpu::BindGroup {
        let bind_group = match map {
            Some(TextureRef::Texture(id)) => self.textures.get(id).map(|t| &t.bind_group),
            Some(TextureRef::RenderTarget(id)) => self.targets.get(id).map(|t| &t.bind_group),
            None => None,
        };
        bind_group.unwrap_or(&self.default_texture.bind_group)
    }

    fn clear_color(&self, scene: &Scene, target: &FrameTarget) -> wgpu::Color {
        if let Some([r, g, b, a]) = scene.background {
            return wgpu::Color {
                r: f64::from(r),
                g: f64::from(g),
                b: f64::from(b),
                a: f64::from(a),
            };
        }
        match target {
            FrameTarget::Surface { .. } => self.settings.clear_color,
            FrameTarget::Offscreen(_) => wgpu::Color::TRANSPARENT,
        }
    }
}

fn pipeline_kind(material: &Material, override_material: Option<OverrideMaterial>) -> PipelineKind {
    match override_material {
        Some(OverrideMaterial::DepthDarkness { .. }) => PipelineKind::DepthDarkness,
        None => PipelineKind::Mesh {
            blended: material.is_blended(),
            depth_test: material.depth_test,
            depth_write: material.depth_write,
        },
    }
}

fn create_object_buffer(device: &wgpu::Device, pipelines: &Pipelines, slots: u64) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Object Uniforms"),
        size: slots * OBJECT_UNIFORM_STRIDE,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Object BindGroup"),
        layout: &pipelines.object_layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: wgpu::BufferSize::new(std::mem::size_of::<ObjectUniforms>() as u64),
            }),
        }],
    });
    (buffer, bind_group)
}

/// Halves `image` repeatedly down to 1×1.
fn mip_chain(image: &DecodedImage) -> Result<Vec<DecodedImage>> {
    let mut current = image::RgbaImage::from_raw(image.width, image.height, image.pixels.clone())
        .ok_or_else(|| VitrineError::ImageDecode(format!("'{}': pixel buffer size mismatch", image.label)))?;
    let mut levels = Vec::new();
    while current.width() > 1 || current.height() > 1 {
        let w = (current.width() / 2).max(1);
        let h = (current.height() / 2).max(1);
        current = image::imageops::resize(&current, w, h, image::imageops::FilterType::Triangle);
        levels.push(DecodedImage::from_rgba8(&image.label, w, h, current.as_raw().clone())?);
    }
    Ok(levels)
}

fn create_texture(
    context: &WgpuContext,
    pipelines: &Pipelines,
    image: &DecodedImage,
    settings: &TextureSettings,
) -> Result<GpuTexture> {
    if image.width == 0 || image.height == 0 {
        return Err(VitrineError::UnsupportedTexture(format!("'{}' is empty", image.label)));
    }
    let max = context.device.limits().max_texture_dimension_2d;
    if image.width > max || image.height > max {
        return Err(VitrineError::UnsupportedTexture(format!(
            "'{}' is {}x{}, limit is {max}",
            image.label, image.width, image.height
        )));
    }

    let flipped;
    let base = if settings.flip_y {
        flipped = image.flipped_y();
        &flipped
    } else {
        image
    };
    let mut levels = vec![base.clone()];
    if settings.generate_mipmaps {
        levels.extend(mip_chain(base)?);
    }

    let format = match settings.color_space {
        ColorSpace::Srgb => wgpu::TextureFormat::Rgba8UnormSrgb,
        ColorSpace::Linear => wgpu::TextureFormat::Rgba8Unorm,
    };
    let texture = context.device.create_texture(&wgpu::TextureDescriptor {
        label: Some(&image.label),
        size: wgpu::Extent3d {
            width: base.width,
            height: base.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: levels.len() as u32,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    for (level, data) in levels.iter().enumerate() {
        context.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: level as u32,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &data.pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * data.width),
                rows_per_image: Some(data.height),
            },
            wgpu::Extent3d {
                width: data.width,
                height: data.height,
                depth_or_array_layers: 1,
            },
        );
    }

    let sampler = context.device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("Material Sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        // Anisotropy above 1 requires linear filtering on every axis.
        mipmap_filter: wgpu::MipmapFilterMode::Linear,
        anisotropy_clamp: settings.anisotropy.clamp(1, 16),
        ..Default::default()
    });

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = context.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Material BindGroup"),
        layout: &pipelines.material_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&sampler),
            },
        ],
    });

    Ok(GpuTexture {
        _texture: texture,
        bind_group,
    })
}

impl RenderBackend for GpuRenderer {
    fn size(&self) -> (u32, u32) {
        self.context.size()
    }

    fn resize(&mut self, width: u32, height: u32, scale_factor: f32) {
        if self.disposed {
            return;
        }
        self.scale_factor = scale_factor;
        self.context.resize(width, height);
    }

    fn max_anisotropy(&self) -> u16 {
        self.settings.anisotropy_limit()
    }

    fn create_render_target(&mut self, label: &str, width: u32, height: u32) -> RenderTargetId {
        let device = &self.context.device;
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: RENDER_TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let depth_view = WgpuContext::create_depth_texture(device, width, height, self.context.depth_format);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.pipelines.material_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.target_sampler),
                },
            ],
        });

        self.targets.insert(GpuRenderTarget {
            _texture: texture,
            view,
            depth_view,
            bind_group,
        })
    }

    fn dispose_render_target(&mut self, target: RenderTargetId) {
        if self.targets.remove(target).is_none() {
            log::warn!("Dispose of unknown render target {target:?}");
        }
        if self.current_target == Some(target) {
            self.current_target = None;
        }
    }

    fn upload_geometry(&mut self, label: &str, geometry: &GeometryData) -> GpuMeshId {
        let device = &self.context.device;
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&geometry.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(&geometry.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        self.meshes.insert(GpuMesh {
            vertex_buffer,
            index_buffer,
            index_count: geometry.index_count() as u32,
        })
    }

    fn dispose_geometry(&mut self, mesh: GpuMeshId) {
        if self.meshes.remove(mesh).is_none() {
            log::warn!("Dispose of unknown geometry {mesh:?}");
        }
    }

    fn upload_texture(&mut self, label: &str, image: &DecodedImage, settings: &TextureSettings) -> Result<TextureId> {
        if self.disposed {
            return Err(VitrineError::UninitializedPipeline);
        }
        let settings = TextureSettings {
            anisotropy: settings.anisotropy.clamp(1, self.max_anisotropy()),
            ..*settings
        };
        let texture = create_texture(&self.context, &self.pipelines, image, &settings)?;
        log::debug!("Uploaded texture '{label}' ({}x{})", image.width, image.height);
        Ok(self.textures.insert(texture))
    }

    fn dispose_texture(&mut self, texture: TextureId) {
        if self.textures.remove(texture).is_none() {
            log::warn!("Dispose of unknown texture {texture:?}");
        }
    }

    fn set_render_target(&mut self, target: Option<RenderTargetId>) {
        self.current_target = target;
    }

    fn render(&mut self, scene: &Scene, root: NodeHandle, camera: &Camera) {
        if self.disposed {
            return;
        }
        let draws = scene.collect_draws(root);
        let darkness = match scene.override_material {
            Some(OverrideMaterial::DepthDarkness { darkness }) => darkness,
            None => 0.0,
        };

        let frame = FrameUniforms::new(camera.view_projection(), &scene.lights, darkness);
        self.context
            .queue
            .write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&frame));

        let objects: Vec<ObjectUniforms> = draws
            .iter()
            .map(|item| ObjectUniforms::new(item.world, &item.primitive.material))
            .collect();
        self.write_objects(&objects);

        let Some(target) = self.begin_target() else {
            return;
        };
        let format = self.target_format(&target);
        let keys: Vec<PipelineKey> = draws
            .iter()
            .map(|item| PipelineKey {
                format,
                kind: pipeline_kind(&item.primitive.material, scene.override_material),
            })
            .collect();
        for key in &keys {
            self.pipelines.ensure(&self.context.device, *key);
        }

        let clear = self.clear_color(scene, &target);
        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Scene Encoder"),
            });

        if let Some((view, depth_view)) = self.target_views(&target) {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            pass.set_bind_group(0, &self.frame_bind_group, &[]);
            for (slot, (item, key)) in draws.iter().zip(&keys).enumerate() {
                let Some(mesh) = self.meshes.get(item.primitive.geometry) else {
                    continue;
                };
                let Some(pipeline) = self.pipelines.get(key) else {
                    continue;
                };
                if mesh.index_count == 0 {
                    continue;
                }
                let offset = (slot as u64 * OBJECT_UNIFORM_STRIDE) as u32;
                pass.set_pipeline(pipeline);
                pass.set_bind_group(1, &self.object_bind_group, &[offset]);
                pass.set_bind_group(2, self.material_bind_group(item.primitive.material.map), &[]);
                pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }

        self.context.queue.submit(Some(encoder.finish()));
        if let FrameTarget::Surface { frame, .. } = target {
            frame.present();
        }
    }

    fn render_blur(&mut self, plane: &BlurPlane, camera: &Camera, pass: &BlurPass) {
        if self.disposed {
            return;
        }
        if self.current_target == Some(pass.source) {
            log::warn!("Blur source and destination are the same target; skipped");
            return;
        }
        let Some(mesh) = self.meshes.get(plane.geometry) else {
            return;
        };
        if mesh.index_count == 0 {
            return;
        }

        let frame = FrameUniforms::new(camera.view_projection(), &[], 0.0);
        let queue = &self.context.queue;
        queue.write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&frame));
        queue.write_buffer(&self.blur_buffer, 0, bytemuck::bytes_of(&BlurUniforms::new(pass)));
        let material = Material::unlit(glam::Vec3::ONE).with_map(TextureRef::RenderTarget(pass.source));
        let object = ObjectUniforms::new(plane.world, &material);
        queue.write_buffer(&self.object_buffer, 0, bytemuck::bytes_of(&object));

        let Some(target) = self.begin_target() else {
            return;
        };
        let key = PipelineKey {
            format: self.target_format(&target),
            kind: PipelineKind::Blur,
        };
        self.pipelines.ensure(&self.context.device, key);

        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Blur Encoder"),
            });

        if let (Some((view, _)), Some(pipeline), Some(mesh)) = (
            self.target_views(&target),
            self.pipelines.get(&key),
            self.meshes.get(plane.geometry),
        ) {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Blur Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                ..Default::default()
            });
            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
            render_pass.set_bind_group(1, &self.object_bind_group, &[0]);
            render_pass.set_bind_group(2, self.material_bind_group(Some(TextureRef::RenderTarget(pass.source))), &[]);
            render_pass.set_bind_group(3, &self.blur_bind_group, &[]);
            render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }

        self.context.queue.submit(Some(encoder.finish()));
        if let FrameTarget::Surface { frame, .. } = target {
            frame.present();
        }
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.current_target = None;
        self.meshes.clear();
        self.textures.clear();
        self.targets.clear();
        self.pipelines.clear();
        log::info!("GPU renderer disposed");
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}
