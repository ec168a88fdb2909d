//! Shared fixtures: tiny self-contained glTF models, PNG screens and a
//! pre-populated in-memory fetcher.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::json;

use vitrine::assets::MemoryFetcher;
use vitrine::device::{AssetDescriptor, EntranceKind, TextureDescriptor};
use vitrine::render::RecordingBackend;
use vitrine::{Viewer, ViewerConfig};

pub const FRAME: Duration = Duration::from_millis(16);
pub const LOAD_TIMEOUT: Duration = Duration::from_secs(10);

pub const PHONE: &str = "phone.gltf";
pub const LAPTOP: &str = "laptop.gltf";
pub const BARE: &str = "bare.gltf";
pub const PLACEHOLDER: &str = "screen-lq.png";
pub const FULL_RES: &str = "screen-full.png";
pub const BROKEN: &str = "broken.gltf";

/// Which named parts a generated model contains.
#[derive(Debug, Clone, Copy)]
pub struct Parts {
    pub screen: bool,
    pub frame: bool,
}

/// Builds a glTF document with one triangle mesh shared by `Body`, and
/// optionally a `Frame` and `Screen` under it. Buffers are embedded as data
/// URIs.
pub fn gltf_model(parts: Parts) -> Vec<u8> {
    let buffer = triangle_buffer();
    let uri = format!("data:application/octet-stream;base64,{}", STANDARD.encode(&buffer));

    let mut nodes = vec![json!({ "name": "Body", "mesh": 0, "children": [] })];
    let mut children = Vec::new();
    if parts.frame {
        children.push(nodes.len());
        nodes.push(json!({ "name": "Frame", "mesh": 0 }));
    }
    if parts.screen {
        children.push(nodes.len());
        nodes.push(json!({ "name": "Screen", "mesh": 0, "translation": [0.0, 0.0, 0.01] }));
    }
    nodes[0]["children"] = json!(children);

    let document = json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": nodes,
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1 }] }],
        "accessors": [
            {
                "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
            },
            { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
        ],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 6 }
        ],
        "buffers": [{ "byteLength": buffer.len(), "uri": uri }]
    });
    serde_json::to_vec(&document).expect("glTF JSON")
}

/// Three `f32` positions followed by three `u16` indices (42 bytes).
pub fn triangle_buffer() -> Vec<u8> {
    let mut buffer = Vec::new();
    for v in [[0.0_f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
        for c in v {
            buffer.extend_from_slice(&c.to_le_bytes());
        }
    }
    for i in [0_u16, 1, 2] {
        buffer.extend_from_slice(&i.to_le_bytes());
    }
    buffer
}

/// A single textured `Body` whose buffer and base-colour image live at
/// `buffer_uri` and `image_uri` (plain relative paths or data URIs).
pub fn textured_gltf(buffer_uri: &str, image_uri: &str) -> Vec<u8> {
    let document = json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "name": "Body", "mesh": 0 }],
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1, "material": 0 }] }],
        "materials": [{ "pbrMetallicRoughness": { "baseColorTexture": { "index": 0 } } }],
        "textures": [{ "source": 0 }],
        "images": [{ "uri": image_uri }],
        "accessors": [
            {
                "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
            },
            { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
        ],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 6 }
        ],
        "buffers": [{ "byteLength": 42, "uri": buffer_uri }]
    });
    serde_json::to_vec(&document).expect("glTF JSON")
}

/// A single textured `Body` whose base-colour image is stored in the same
/// embedded buffer as the geometry, after it.
pub fn gltf_with_view_image(image: &[u8]) -> Vec<u8> {
    let mut buffer = triangle_buffer();
    buffer.resize(44, 0);
    buffer.extend_from_slice(image);
    let document = json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "name": "Body", "mesh": 0 }],
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1, "material": 0 }] }],
        "materials": [{ "pbrMetallicRoughness": { "baseColorTexture": { "index": 0 } } }],
        "textures": [{ "source": 0 }],
        "images": [{ "bufferView": 2, "mimeType": "image/png" }],
        "accessors": [
            {
                "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
            },
            { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
        ],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 6 },
            { "buffer": 0, "byteOffset": 44, "byteLength": image.len() }
        ],
        "buffers": [{ "byteLength": buffer.len(), "uri": data_uri("application/octet-stream", &buffer) }]
    });
    serde_json::to_vec(&document).expect("glTF JSON")
}

/// Wraps `bytes` in a base64 data URI.
pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// A solid-colour PNG.
pub fn png(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("PNG encoding");
    bytes
}

/// Fetcher serving every fixture above.
pub fn fetcher() -> MemoryFetcher {
    let full = Parts {
        screen: true,
        frame: true,
    };
    MemoryFetcher::new()
        .with(PHONE, gltf_model(full))
        .with(LAPTOP, gltf_model(full))
        .with(
            BARE,
            gltf_model(Parts {
                screen: false,
                frame: false,
            }),
        )
        .with(BROKEN, b"{ not gltf".to_vec())
        .with(PLACEHOLDER, png(4, 4, [40, 40, 40, 255]))
        .with(FULL_RES, png(16, 16, [200, 220, 240, 255]))
}

pub fn screen_texture() -> TextureDescriptor {
    TextureDescriptor {
        src: Some(FULL_RES.to_owned()),
        src_set: None,
        placeholder: Some(PLACEHOLDER.to_owned()),
    }
}

pub fn phone() -> AssetDescriptor {
    AssetDescriptor::new(PHONE)
        .with_texture(screen_texture())
        .with_animation(EntranceKind::SpringUp)
}

pub fn laptop() -> AssetDescriptor {
    AssetDescriptor::new(LAPTOP)
        .with_texture(screen_texture())
        .with_animation(EntranceKind::HingeOpen)
        .with_position(1.5, 0.0, 0.0)
}

pub fn mount(config: ViewerConfig) -> Viewer<RecordingBackend> {
    mount_with(RecordingBackend::new(800, 600), config, fetcher())
}

/// Routes `log` output to the test harness; `RUST_LOG=debug` shows device transitions.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn mount_with(backend: RecordingBackend, config: ViewerConfig, fetcher: MemoryFetcher) -> Viewer<RecordingBackend> {
    init_logging();
    Viewer::mount_with_fetcher(backend, config, Arc::new(fetcher)).expect("mount")
}

/// Mounts, waits for every load and returns the viewer.
pub fn mount_loaded(config: ViewerConfig) -> Viewer<RecordingBackend> {
    let mut viewer = mount(config);
    assert!(viewer.wait_for_loads(LOAD_TIMEOUT), "loads did not settle");
    viewer
}

/// Steps the viewer `frames` times at 16 ms.
pub fn run_frames(viewer: &mut Viewer<RecordingBackend>, frames: usize) {
    for _ in 0..frames {
        viewer.update(FRAME);
    }
}

/// Deterministic pseudo-random sequence for sampling inputs.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    /// Uniform in `[0, 1)`.
    pub fn next_f32(&mut self) -> f32 {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        ((self.0 >> 40) as f32) / (1u64 << 24) as f32
    }
}
