//! glTF model decoding
//!
//! Turns a `.glb` / `.gltf` byte slice into a backend-neutral
//! [`ModelData`]: the node hierarchy with TRS transforms, per-primitive
//! geometry and embedded base-colour textures. Runs off the render thread;
//! nothing here touches the GPU.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use glam::{Quat, Vec3, Vec4};
use rustc_hash::FxHashMap;

use super::image::DecodedImage;
use crate::errors::{Result, VitrineError};
use crate::scene::{GeometryData, Vertex};

/// One primitive of a model node.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPrimitive {
    pub geometry: GeometryData,
    /// Linear RGBA base colour factor.
    pub base_color: Vec4,
    /// Index into [`ModelData::textures`].
    pub base_color_texture: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelNode {
    pub name: String,
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub primitives: Vec<ModelPrimitive>,
    /// Indices into [`ModelData::nodes`].
    pub children: Vec<usize>,
}

impl ModelNode {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            primitives: Vec::new(),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_primitive(mut self, geometry: GeometryData, base_color_texture: Option<usize>) -> Self {
        self.primitives.push(ModelPrimitive {
            geometry,
            base_color: Vec4::ONE,
            base_color_texture,
        });
        self
    }
}

/// A decoded model, ready to be instantiated into a scene.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelData {
    pub nodes: Vec<ModelNode>,
    /// Top-level nodes of the default scene.
    pub roots: Vec<usize>,
    pub textures: Vec<Arc<DecodedImage>>,
}

impl ModelData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a node; `parent = None` makes it a root.
    pub fn add_node(&mut self, node: ModelNode, parent: Option<usize>) -> usize {
        let index = self.nodes.len();
        self.nodes.push(node);
        match parent.and_then(|p| self.nodes.get_mut(p)) {
            Some(p) => p.children.push(index),
            None => self.roots.push(index),
        }
        index
    }

    pub fn add_texture(&mut self, image: DecodedImage) -> usize {
        self.textures.push(Arc::new(image));
        self.textures.len() - 1
    }

    /// Index of the first node called `name`.
    #[must_use]
    pub fn find_node(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.name == name)
    }

    // ========================================================================
    // glTF import
    // ========================================================================

    /// Decodes a binary or self-contained glTF asset.
    pub fn from_gltf_slice(label: &str, bytes: &[u8]) -> Result<Self> {
        Self::from_gltf_with_resources(label, bytes, &FxHashMap::default())
    }

    /// Decodes a glTF asset whose external buffers and images were fetched
    /// beforehand; `resources` is keyed by the URI exactly as the document
    /// writes it.
    ///
    /// A missing buffer fails the model. Images that are missing or in an
    /// unsupported format are dropped and the primitives using them render
    /// untextured.
    pub fn from_gltf_with_resources(label: &str, bytes: &[u8], resources: &FxHashMap<String, Vec<u8>>) -> Result<Self> {
        let gltf::Gltf { document, mut blob } = gltf::Gltf::from_slice(bytes)?;

        let mut buffers = Vec::new();
        for buffer in document.buffers() {
            let data = match buffer.source() {
                gltf::buffer::Source::Uri(uri) if is_external(uri) => {
                    let bytes = resources
                        .get(uri)
                        .ok_or_else(|| VitrineError::Gltf(format!("'{label}': buffer '{uri}' was not fetched")))?;
                    if bytes.len() < buffer.length() {
                        return Err(VitrineError::Gltf(format!(
                            "'{label}': buffer '{uri}' holds {} bytes, expected {}",
                            bytes.len(),
                            buffer.length()
                        )));
                    }
                    gltf::buffer::Data(bytes.clone())
                }
                source => gltf::buffer::Data::from_source_and_blob(source, None, &mut blob)?,
            };
            buffers.push(data);
        }

        let mut model = Self::new();
        let mut image_slots = Vec::new();
        for image in document.images() {
            let image_label = format!("{label}#image{}", image.index());
            let decoded = match image.source() {
                gltf::image::Source::Uri { uri, .. } => decode_uri_image(&image_label, uri, resources),
                gltf::image::Source::View { view, .. } => {
                    let start = view.offset();
                    buffers
                        .get(view.buffer().index())
                        .and_then(|data| data.get(start..start + view.length()))
                        .ok_or_else(|| VitrineError::Gltf(format!("'{image_label}': view out of range")))
                        .and_then(|bytes| DecodedImage::decode(image_label.clone(), bytes))
                }
            };
            let slot = match decoded {
                Ok(image) => Some(model.add_texture(image)),
                Err(err) => {
                    log::warn!("Dropping texture {image_label}: {err}");
                    None
                }
            };
            image_slots.push(slot);
        }

        let scene = document
            .default_scene()
            .or_else(|| document.scenes().next())
            .ok_or_else(|| VitrineError::Gltf(format!("'{label}' contains no scene")))?;

        // Node indices are remapped so the arena holds only reachable nodes.
        let mut stack: Vec<(gltf::Node, Option<usize>)> = scene.nodes().map(|n| (n, None)).collect();
        stack.reverse();
        while let Some((node, parent)) = stack.pop() {
            let index = model.add_node(read_node(&node, &buffers, &image_slots), parent);
            let children: Vec<_> = node.children().collect();
            stack.extend(children.into_iter().rev().map(|c| (c, Some(index))));
        }

        log::debug!(
            "Decoded '{label}': {} nodes, {} textures",
            model.nodes.len(),
            model.textures.len()
        );
        Ok(model)
    }
}

/// URIs a glTF document points at outside itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalRefs {
    pub buffers: Vec<String>,
    pub images: Vec<String>,
}

impl ExternalRefs {
    /// Reads the document (not the binary payload) and lists its external
    /// buffer and image URIs, without duplicates.
    pub fn scan(bytes: &[u8]) -> Result<Self> {
        let gltf = gltf::Gltf::from_slice_without_validation(bytes)?;
        let mut refs = Self::default();
        for buffer in gltf.buffers() {
            if let gltf::buffer::Source::Uri(uri) = buffer.source()
                && is_external(uri)
                && !refs.buffers.iter().any(|u| u == uri)
            {
                refs.buffers.push(uri.to_owned());
            }
        }
        for image in gltf.images() {
            if let gltf::image::Source::Uri { uri, .. } = image.source()
                && is_external(uri)
                && !refs.images.iter().any(|u| u == uri)
            {
                refs.images.push(uri.to_owned());
            }
        }
        Ok(refs)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty() && self.images.is_empty()
    }
}

#[inline]
fn is_external(uri: &str) -> bool {
    !uri.starts_with("data:")
}

fn decode_uri_image(label: &str, uri: &str, resources: &FxHashMap<String, Vec<u8>>) -> Result<DecodedImage> {
    if let Some(rest) = uri.strip_prefix("data:") {
        let encoded = rest.split_once(";base64,").map_or(rest, |(_, payload)| payload);
        let bytes = STANDARD.decode(encoded)?;
        return DecodedImage::decode(label, &bytes);
    }
    let bytes = resources
        .get(uri)
        .ok_or_else(|| VitrineError::fetch(uri, "not fetched"))?;
    DecodedImage::decode(label, bytes)
}

fn read_node(node: &gltf::Node, buffers: &[gltf::buffer::Data], image_slots: &[Option<usize>]) -> ModelNode {
    let name = node
        .name()
        .map_or_else(|| format!("Node_{}", node.index()), str::to_owned);
    let (t, r, s) = node.transform().decomposed();

    let mut primitives = Vec::new();
    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                log::warn!("Skipping non-triangle primitive in '{name}'");
                continue;
            }
            if let Some(p) = read_primitive(&primitive, buffers, image_slots) {
                primitives.push(p);
            }
        }
    }

    ModelNode {
        name,
        translation: Vec3::from_array(t),
        rotation: Quat::from_array(r),
        scale: Vec3::from_array(s),
        primitives,
        children: Vec::new(),
    }
}

fn read_primitive(
    primitive: &gltf::Primitive,
    buffers: &[gltf::buffer::Data],
    image_slots: &[Option<usize>],
) -> Option<ModelPrimitive> {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| &d.0[..]));

    let positions: Vec<[f32; 3]> = reader.read_positions()?.collect();
    if positions.is_empty() {
        return None;
    }
    let normals: Vec<[f32; 3]> = reader
        .read_normals()
        .map_or_else(|| vec![[0.0, 0.0, 1.0]; positions.len()], Iterator::collect);
    let uvs: Vec<[f32; 2]> = reader
        .read_tex_coords(0)
        .map_or_else(|| vec![[0.0, 0.0]; positions.len()], |r| r.into_f32().collect());

    let vertices = positions
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            Vertex::new(
                p,
                normals.get(i).copied().unwrap_or([0.0, 0.0, 1.0]),
                uvs.get(i).copied().unwrap_or([0.0, 0.0]),
            )
        })
        .collect();
    let indices = reader.read_indices().map_or_else(
        || (0..positions.len() as u32).collect(),
        |iter| iter.into_u32().collect(),
    );

    let pbr = primitive.material().pbr_metallic_roughness();
    Some(ModelPrimitive {
        geometry: GeometryData::new(vertices, indices),
        base_color: Vec4::from_array(pbr.base_color_factor()),
        base_color_texture: pbr
            .base_color_texture()
            .and_then(|info| image_slots.get(info.texture().source().index()).copied().flatten()),
    })
}
