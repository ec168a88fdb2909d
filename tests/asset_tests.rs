//! Asset Tests
//!
//! Tests for:
//! - glTF decoding into ModelData (hierarchy, names, geometry)
//! - Multi-file glTF resolution and unusable embedded images
//! - Image decoding and srcset selection
//! - Byte sources (MemoryFetcher, AssetReader)
//! - AssetLoader delivery and liveness
//! - Instantiating decoded models with embedded textures
//! - ViewerConfig JSON parsing

mod common;

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use pollster::block_on;
use slotmap::SlotMap;

use rustc_hash::FxHashMap;

use vitrine::assets::{
    AssetFetcher, AssetLoader, AssetReader, DecodedImage, ExternalRefs, GeometryPayload, LoadEvent, MemoryFetcher,
    ModelData, ModelNode, resolve_relative,
};
use vitrine::device::{
    AssetDescriptor, Device, DeviceContext, DeviceId, DeviceState, EntranceKind, LoadRequest, TextureDescriptor,
};
use vitrine::motion::Ticker;
use vitrine::render::recording::BackendCall;
use vitrine::render::{RecordingBackend, RenderTrigger};
use vitrine::scene::{GeometryData, Node, Scene, TextureRef};
use vitrine::{ViewerConfig, VitrineError};

use common::{
    FULL_RES, Parts, data_uri, gltf_model, gltf_with_view_image, png, textured_gltf, triangle_buffer,
};

fn device_id() -> DeviceId {
    let mut ids: SlotMap<DeviceId, ()> = SlotMap::with_key();
    ids.insert(())
}

// ============================================================================
// glTF Decoding
// ============================================================================

#[test]
fn gltf_hierarchy_and_names_survive_decoding() {
    let bytes = gltf_model(Parts {
        screen: true,
        frame: true,
    });
    let model = ModelData::from_gltf_slice("phone", &bytes).expect("decode");

    assert_eq!(model.roots.len(), 1);
    let body = &model.nodes[model.roots[0]];
    assert_eq!(body.name, "Body");
    assert_eq!(body.children.len(), 2);

    let screen = model.find_node("Screen").expect("screen");
    assert!((model.nodes[screen].translation.z - 0.01).abs() < 1e-6);
    assert!(model.find_node("Frame").is_some());
    assert!(model.find_node("Hinge").is_none());

    let primitive = &body.primitives[0];
    assert_eq!(primitive.geometry.vertex_count(), 3);
    assert_eq!(primitive.geometry.index_count(), 3);
    assert_eq!(primitive.base_color_texture, None);
    assert!(model.textures.is_empty());
}

#[test]
fn gltf_without_normals_gets_default_normals() {
    let bytes = gltf_model(Parts {
        screen: false,
        frame: false,
    });
    let model = ModelData::from_gltf_slice("bare", &bytes).expect("decode");
    let vertex = model.nodes[0].primitives[0].geometry.vertices[0];
    assert_eq!(vertex.normal, [0.0, 0.0, 1.0]);
}

#[test]
fn malformed_gltf_is_an_error() {
    let err = ModelData::from_gltf_slice("broken", b"{ nope").unwrap_err();
    assert!(matches!(err, VitrineError::Gltf(_)), "got {err:?}");
}

#[test]
fn model_builder_links_children() {
    let mut model = ModelData::new();
    let root = model.add_node(ModelNode::new("Root"), None);
    let child = model.add_node(ModelNode::new("Child"), Some(root));
    assert_eq!(model.roots, [root]);
    assert_eq!(model.nodes[root].children, [child]);
    assert_eq!(model.find_node("Child"), Some(child));
}

// ============================================================================
// Multi-file glTF
// ============================================================================

fn load_geometry(fetcher: MemoryFetcher, uri: &str) -> vitrine::Result<GeometryPayload> {
    let loader = AssetLoader::new(Arc::new(fetcher)).expect("loader");
    loader.request_geometry(device_id(), uri.to_owned(), None);
    match loader.recv_timeout(common::LOAD_TIMEOUT).expect("event") {
        LoadEvent::Geometry { result, .. } => result,
        LoadEvent::FullRes { .. } => panic!("expected a geometry event"),
    }
}

#[test]
fn relative_uris_resolve_against_the_document() {
    assert_eq!(resolve_relative("models/desk.gltf", "desk.bin"), "models/desk.bin");
    assert_eq!(resolve_relative("desk.gltf", "tex/wood.png"), "tex/wood.png");
    assert_eq!(
        resolve_relative("https://cdn.example/m/desk.gltf", "desk.bin"),
        "https://cdn.example/m/desk.bin"
    );
    assert_eq!(resolve_relative("models/desk.gltf", "/shared/desk.bin"), "/shared/desk.bin");
    assert_eq!(
        resolve_relative("models/desk.gltf", "https://other.example/a.bin"),
        "https://other.example/a.bin"
    );
}

#[test]
fn external_refs_skip_data_uris() {
    let external = textured_gltf("desk.bin", "wood.png");
    let refs = ExternalRefs::scan(&external).expect("scan");
    assert_eq!(refs.buffers, ["desk.bin"]);
    assert_eq!(refs.images, ["wood.png"]);

    let embedded = gltf_model(Parts {
        screen: true,
        frame: false,
    });
    assert!(ExternalRefs::scan(&embedded).expect("scan").is_empty());
}

#[test]
fn multi_file_gltf_loads_buffer_and_image_beside_it() {
    let fetcher = MemoryFetcher::new()
        .with("models/desk.gltf", textured_gltf("desk.bin", "wood.png"))
        .with("models/desk.bin", triangle_buffer())
        .with("models/wood.png", png(2, 2, [120, 80, 40, 255]));

    let payload = load_geometry(fetcher, "models/desk.gltf").expect("payload");
    let model = &payload.model;
    assert_eq!(model.textures.len(), 1);
    assert_eq!(model.textures[0].width, 2);
    let primitive = &model.nodes[model.roots[0]].primitives[0];
    assert_eq!(primitive.geometry.vertex_count(), 3);
    assert_eq!(primitive.base_color_texture, Some(0));
}

#[test]
fn multi_file_gltf_without_its_buffer_fails() {
    let fetcher = MemoryFetcher::new()
        .with("models/desk.gltf", textured_gltf("desk.bin", "wood.png"))
        .with("models/wood.png", png(2, 2, [120, 80, 40, 255]));
    let err = load_geometry(fetcher, "models/desk.gltf").unwrap_err();
    assert!(matches!(err, VitrineError::AssetFetch { ref uri, .. } if uri == "models/desk.bin"), "got {err:?}");
}

#[test]
fn multi_file_gltf_without_its_image_renders_untextured() {
    let fetcher = MemoryFetcher::new()
        .with("models/desk.gltf", textured_gltf("desk.bin", "wood.png"))
        .with("models/desk.bin", triangle_buffer());
    let payload = load_geometry(fetcher, "models/desk.gltf").expect("payload");
    assert!(payload.model.textures.is_empty());
    assert_eq!(payload.model.nodes[0].primitives[0].base_color_texture, None);
}

#[test]
fn resources_are_keyed_by_the_uri_as_written() {
    let mut resources = FxHashMap::default();
    resources.insert("desk.bin".to_owned(), triangle_buffer());
    let model = ModelData::from_gltf_with_resources("desk", &textured_gltf("desk.bin", "wood.png"), &resources)
        .expect("decode");
    assert_eq!(model.nodes.len(), 1);
    assert!(model.textures.is_empty(), "image was never fetched");

    let short = FxHashMap::from_iter([("desk.bin".to_owned(), vec![0_u8; 8])]);
    let err = ModelData::from_gltf_with_resources("desk", &textured_gltf("desk.bin", "wood.png"), &short).unwrap_err();
    assert!(matches!(err, VitrineError::Gltf(_)), "got {err:?}");
}

#[test]
fn sixteen_bit_data_uri_image_is_converted_to_rgba8() {
    let deep = image::ImageBuffer::<image::Rgba<u16>, Vec<u16>>::from_pixel(2, 2, image::Rgba([65535, 0, 0, 65535]));
    let mut png16 = Vec::new();
    image::DynamicImage::ImageRgba16(deep)
        .write_to(&mut Cursor::new(&mut png16), image::ImageFormat::Png)
        .expect("PNG encoding");

    let bytes = textured_gltf(
        &data_uri("application/octet-stream", &triangle_buffer()),
        &data_uri("image/png", &png16),
    );
    let model = ModelData::from_gltf_slice("deep", &bytes).expect("decode");
    assert_eq!(model.textures.len(), 1);
    assert_eq!(&model.textures[0].pixels[..4], &[255, 0, 0, 255]);
    assert_eq!(model.nodes[0].primitives[0].base_color_texture, Some(0));
}

#[test]
fn buffer_view_image_is_decoded() {
    let model = ModelData::from_gltf_slice("packed", &gltf_with_view_image(&png(3, 3, [1, 2, 3, 255])))
        .expect("decode");
    assert_eq!(model.textures.len(), 1);
    assert_eq!((model.textures[0].width, model.textures[0].height), (3, 3));
    assert_eq!(model.nodes[0].primitives[0].base_color_texture, Some(0));
}

#[test]
fn undecodable_embedded_image_is_dropped_not_fatal() {
    let model = ModelData::from_gltf_slice("odd", &gltf_with_view_image(b"GIF89a not supported here"))
        .expect("model still decodes");
    assert!(model.textures.is_empty());
    let primitive = &model.nodes[0].primitives[0];
    assert_eq!(primitive.base_color_texture, None);
    assert_eq!(primitive.geometry.vertex_count(), 3);
}

// ============================================================================
// Images
// ============================================================================

#[test]
fn png_decodes_to_rgba8() {
    let image = DecodedImage::decode("screen.png", &png(3, 2, [10, 20, 30, 255])).expect("decode");
    assert_eq!((image.width, image.height), (3, 2));
    assert_eq!(image.pixels.len(), 3 * 2 * 4);
    assert_eq!(&image.pixels[..4], &[10, 20, 30, 255]);
    assert_eq!(image.label, "screen.png");
}

#[test]
fn solid_image_is_one_pixel() {
    let image = DecodedImage::solid("white", [255; 4]);
    assert_eq!((image.width, image.height), (1, 1));
    assert_eq!(image.pixels, [255; 4]);
}

#[test]
fn texture_descriptor_prefers_src_set_over_src() {
    let texture = TextureDescriptor {
        src: Some("plain.png".to_owned()),
        src_set: Some("a.png 1x, b.png 2x".to_owned()),
        placeholder: Some("  ".to_owned()),
    };
    assert_eq!(texture.full_res_uri(800, 2.0).as_deref(), Some("b.png"));
    assert_eq!(texture.placeholder_uri(), None, "blank placeholder counts as none");

    let unusable = TextureDescriptor {
        src_set: Some(" , ".to_owned()),
        ..texture
    };
    assert_eq!(unusable.full_res_uri(800, 1.0).as_deref(), Some("plain.png"));
}

// ============================================================================
// Byte Sources
// ============================================================================

#[test]
fn memory_fetcher_serves_registered_bytes() {
    let fetcher = MemoryFetcher::new().with("a.bin", vec![1_u8, 2, 3]);
    assert!(fetcher.contains("a.bin"));
    assert_eq!(block_on(fetcher.fetch("a.bin")).expect("fetch"), [1, 2, 3]);

    let err = block_on(fetcher.fetch("b.bin")).unwrap_err();
    assert!(matches!(err, VitrineError::AssetFetch { ref uri, .. } if uri == "b.bin"));

    assert!(fetcher.remove("a.bin"));
    assert!(!fetcher.contains("a.bin"));
}

#[test]
fn asset_reader_resolves_relative_to_directory() {
    let dir = std::env::temp_dir().join(format!("vitrine-assets-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("temp dir");
    std::fs::write(dir.join("model.gltf"), b"bytes").expect("write");

    let reader = AssetReader::from_directory(&dir);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime");
    let bytes = runtime.block_on(reader.fetch("model.gltf")).expect("read");
    assert_eq!(bytes, b"bytes");
    assert!(runtime.block_on(reader.fetch("missing.gltf")).is_err());

    let from_file = AssetReader::from_directory(dir.join("model.gltf"));
    assert_eq!(runtime.block_on(from_file.fetch("model.gltf")).expect("read"), b"bytes");

    std::fs::remove_dir_all(&dir).ok();
}

// ============================================================================
// Loader
// ============================================================================

#[test]
fn loader_delivers_geometry_with_placeholder() {
    common::init_logging();
    let fetcher = common::fetcher();
    let loader = AssetLoader::new(Arc::new(fetcher)).expect("loader");
    let id = device_id();
    loader.request_geometry(id, common::PHONE.to_owned(), Some(common::PLACEHOLDER.to_owned()));

    let event = loader.recv_timeout(common::LOAD_TIMEOUT).expect("event");
    assert_eq!(event.device(), id);
    let LoadEvent::Geometry { result, .. } = event else {
        panic!("expected a geometry event");
    };
    let payload = result.expect("payload");
    assert!(payload.model.find_node("Screen").is_some());
    assert_eq!(payload.placeholder.expect("placeholder").width, 4);
}

#[test]
fn loader_reports_missing_full_res() {
    let loader = AssetLoader::new(Arc::new(MemoryFetcher::new())).expect("loader");
    loader.request_full_res(device_id(), FULL_RES.to_owned());
    let event = loader.recv_timeout(common::LOAD_TIMEOUT).expect("event");
    assert!(matches!(event, LoadEvent::FullRes { result: Err(_), .. }));
}

#[test]
fn loader_shares_one_runtime() {
    let first = AssetLoader::new(Arc::new(MemoryFetcher::new()));
    let second = AssetLoader::new(Arc::new(MemoryFetcher::new()));
    assert!(first.is_ok() && second.is_ok());
    assert!(VitrineError::RuntimeStartFailed("no threads".to_owned()).is_fatal());
}

#[test]
fn revoked_loader_discards_results() {
    let loader = AssetLoader::new(Arc::new(common::fetcher())).expect("loader");
    loader.request_full_res(device_id(), FULL_RES.to_owned());
    loader.shutdown();
    assert!(!loader.liveness().is_alive());

    let deadline = std::time::Instant::now() + common::LOAD_TIMEOUT;
    while loader.in_flight() > 0 && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(loader.in_flight(), 0);
    assert!(loader.try_recv().is_none(), "finished load was discarded");
}

// ============================================================================
// Instantiation
// ============================================================================

#[test]
fn embedded_textures_are_uploaded_once_and_shared() {
    let mut model = ModelData::new();
    let texture = model.add_texture(DecodedImage::solid("albedo", [255, 0, 0, 255]));
    let plane = GeometryData::plane(1.0, 1.0);
    let body = model.add_node(
        ModelNode::new("Body")
            .with_primitive(plane.clone(), Some(texture))
            .with_primitive(plane.clone(), Some(texture)),
        None,
    );
    model.add_node(ModelNode::new("Screen").with_primitive(plane, None), Some(body));

    let mut backend = RecordingBackend::new(640, 480);
    let log = backend.log();
    let mut scene = Scene::new();
    let group = scene.add_node(Node::new("Models"));
    let mut ticker = Ticker::new();
    let trigger = RenderTrigger::new();
    let mut device = Device::new(
        device_id(),
        0,
        AssetDescriptor::new("inline.glb").with_animation(EntranceKind::SpringUp),
    );
    assert!(matches!(device.begin_loading(), LoadRequest::Geometry { .. }));

    let mut cx = DeviceContext {
        scene: &mut scene,
        model_group: group,
        backend: &mut backend,
        ticker: &mut ticker,
        trigger: &trigger,
        reduced_motion: false,
        show_delay: Duration::ZERO,
    };
    let payload = GeometryPayload {
        model: Arc::new(model),
        placeholder: None,
    };
    let full_res = device.on_geometry_loaded(Ok(payload), &mut cx, 640);
    assert_eq!(full_res, None, "no texture descriptor");
    assert_eq!(device.state(), DeviceState::GeometryReady);
    assert!(trigger.is_pending());

    let uploads = log.count(|c| matches!(c, BackendCall::UploadTexture { label, .. } if label == "albedo"));
    assert_eq!(uploads, 1);
    assert_eq!(log.count(|c| matches!(c, BackendCall::UploadGeometry { .. })), 3);

    let root = device.root().expect("root");
    let body = scene.find_by_name(root, "Body").expect("body");
    let mesh = scene.get_node(body).and_then(|n| n.mesh.as_ref()).expect("mesh");
    let maps: Vec<_> = mesh.primitives.iter().map(|p| p.material.map).collect();
    assert!(matches!(maps[0], Some(TextureRef::Texture(_))));
    assert_eq!(maps[0], maps[1], "one upload shared by both primitives");
    assert!(ticker.len() == 1, "entrance scheduled");
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn config_parses_camel_case_json() {
    let config = ViewerConfig::from_json(
        r#"{
            "models": [
                {
                    "url": "laptop.glb",
                    "animation": "hinge-open",
                    "position": { "x": 1.0, "y": -0.5 },
                    "texture": { "src": "full.webp", "srcSet": "a.webp 640w", "placeholder": "lq.webp" }
                },
                { "url": "phone.glb", "animation": "spring-up" }
            ],
            "showDelay": 250,
            "cameraDistance": 9,
            "directionalLightIntensity": 2.2,
            "reducedMotion": true
        }"#,
    )
    .expect("config");

    assert_eq!(config.models.len(), 2);
    let laptop = &config.models[0];
    assert_eq!(laptop.animation, EntranceKind::HingeOpen);
    assert_eq!(laptop.position.x, 1.0);
    assert_eq!(laptop.position.z, 0.0);
    let texture = laptop.texture.as_ref().expect("texture");
    assert_eq!(texture.src_set.as_deref(), Some("a.webp 640w"));
    assert_eq!(config.models[1].animation, EntranceKind::SpringUp);

    assert_eq!(config.show_delay(), Duration::from_millis(250));
    assert_eq!(config.camera_position().z, 9.0);
    assert_eq!(config.light_intensities().key, Some(2.2));
    assert!(config.reduced_motion);
    assert!(config.show, "show defaults to on");
    assert_eq!(config.scale, 1.0);
}

#[test]
fn config_rejects_invalid_json() {
    assert!(ViewerConfig::from_json("{ models: ").is_err());
    assert!(ViewerConfig::from_json(r#"{ "models": [{ "animation": "cartwheel" }] }"#).is_err());
}
