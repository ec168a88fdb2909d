//! Scene Graph Tests
//!
//! Tests for:
//! - Light rig defaults and fill coupling
//! - Node hierarchy (add, attach, remove, lookup, world matrices)
//! - Draw collection order and visibility
//! - Resource sets and SceneManager teardown

use glam::Vec3;

use vitrine::ViewerConfig;
use vitrine::assets::DecodedImage;
use vitrine::render::{RecordingBackend, RenderBackend, TextureSettings};
use vitrine::scene::light::{DEFAULT_AMBIENT_INTENSITY, DEFAULT_KEY_INTENSITY, FILL_RATIO};
use vitrine::scene::{
    GeometryData, LightIntensities, LightSet, Material, Mesh, Node, ResourceSet, Scene, SceneManager, TextureRef,
    Transform,
};

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-5
}

// ============================================================================
// Lights
// ============================================================================

#[test]
fn default_rig_intensities() {
    let lights = LightSet::default();
    assert!(approx(lights.ambient.intensity, DEFAULT_AMBIENT_INTENSITY));
    assert!(approx(lights.key.intensity, DEFAULT_KEY_INTENSITY));
    assert!(approx(lights.fill.intensity, 0.8), "fill {}", lights.fill.intensity);
    assert_eq!(lights.ambient.direction(), None);
    assert_eq!(lights.to_vec().len(), 3);
}

#[test]
fn fill_follows_key_unless_overridden() {
    let coupled = LightSet::new(LightIntensities {
        key: Some(2.2),
        ..LightIntensities::default()
    });
    assert!(approx(coupled.fill.intensity, 2.2 * FILL_RATIO));
    assert!(approx(coupled.fill.intensity, 1.6));

    let explicit = LightSet::new(LightIntensities {
        key: Some(2.2),
        fill: Some(0.3),
        ..LightIntensities::default()
    });
    assert!(approx(explicit.fill.intensity, 0.3));
    assert!(approx(explicit.key.intensity, 2.2));
}

#[test]
fn ambient_override_leaves_fill_coupled() {
    let lights = LightSet::new(LightIntensities {
        ambient: Some(0.4),
        ..LightIntensities::default()
    });
    assert!(approx(lights.ambient.intensity, 0.4));
    assert!(approx(lights.fill.intensity, DEFAULT_KEY_INTENSITY * FILL_RATIO));
}

#[test]
fn directional_lights_point_from_their_position() {
    let lights = LightSet::default();
    let direction = lights.key.direction().expect("directional");
    assert!(approx(direction.length(), 1.0));
    assert!(direction.z > 0.0, "key light sits in front of the models");
}

// ============================================================================
// Hierarchy
// ============================================================================

#[test]
fn remove_node_takes_whole_subtree() {
    let mut scene = Scene::new();
    let group = scene.add_node(Node::new("Group"));
    let child = scene.add_to_parent(Node::new("Child"), group);
    let grandchild = scene.add_to_parent(Node::new("Grandchild"), child);
    let sibling = scene.add_node(Node::new("Sibling"));
    assert_eq!(scene.node_count(), 5);

    let removed = scene.remove_node(group);
    assert_eq!(removed.len(), 3);
    assert!(!scene.contains(child) && !scene.contains(grandchild));
    assert!(scene.contains(sibling));
    let root = scene.get_node(scene.root()).expect("root");
    assert_eq!(root.children(), [sibling]);

    assert!(scene.remove_node(scene.root()).is_empty(), "root is permanent");
}

#[test]
fn attach_moves_between_parents() {
    let mut scene = Scene::new();
    let a = scene.add_node(Node::new("A"));
    let b = scene.add_node(Node::new("B"));
    let child = scene.add_to_parent(Node::new("Child"), a);

    scene.attach(child, b);
    assert!(scene.get_node(a).expect("a").children().is_empty());
    assert_eq!(scene.get_node(b).expect("b").children(), [child]);
    assert_eq!(scene.get_node(child).expect("child").parent(), Some(b));

    scene.attach(b, b);
    assert_eq!(scene.get_node(b).expect("b").parent(), Some(scene.root()));
}

#[test]
fn add_to_missing_parent_falls_back_to_root() {
    let mut scene = Scene::new();
    let gone = scene.add_node(Node::new("Gone"));
    scene.remove_node(gone);
    let orphan = scene.add_to_parent(Node::new("Orphan"), gone);
    assert_eq!(scene.get_node(orphan).expect("orphan").parent(), Some(scene.root()));
}

#[test]
fn find_by_name_searches_depth_first_from_start() {
    let mut scene = Scene::new();
    let first = scene.add_node(Node::new("Device"));
    let second = scene.add_node(Node::new("Device"));
    let screen_a = scene.add_to_parent(Node::new("Screen"), first);
    let screen_b = scene.add_to_parent(Node::new("Screen"), second);

    assert_eq!(scene.find_by_name(scene.root(), "Screen"), Some(screen_a));
    assert_eq!(scene.find_by_name(second, "Screen"), Some(screen_b));
    assert_eq!(scene.find_by_name(first, "Missing"), None);
}

#[test]
fn world_matrix_composes_parent_transforms() {
    let mut scene = Scene::new();
    let mut parent_transform = Transform::from_position(Vec3::new(1.0, 0.0, 0.0));
    parent_transform.scale = Vec3::splat(2.0);
    let parent = scene.add_node(Node::new("Parent").with_transform(parent_transform));
    let child = scene.add_to_parent(
        Node::new("Child").with_transform(Transform::from_position(Vec3::new(0.0, 1.0, 0.0))),
        parent,
    );

    let origin = scene.world_matrix(child).transform_point3(Vec3::ZERO);
    assert!(origin.abs_diff_eq(Vec3::new(1.0, 2.0, 0.0), 1e-6), "{origin}");
}

// ============================================================================
// Draw Collection
// ============================================================================

fn mesh_node(backend: &mut RecordingBackend, name: &str, material: Material) -> Node {
    let geometry = backend.upload_geometry(name, &GeometryData::plane(1.0, 1.0));
    Node::new(name).with_mesh(Mesh::single(geometry, material))
}

#[test]
fn opaque_draws_come_before_blended() {
    let mut backend = RecordingBackend::new(100, 100);
    let mut scene = Scene::new();
    scene.add_node(mesh_node(&mut backend, "Glass", Material::unlit(Vec3::ONE).with_opacity(0.5)));
    scene.add_node(mesh_node(&mut backend, "Body", Material::lit(Vec3::ONE)));
    scene.add_node(mesh_node(&mut backend, "Frame", Material::lit(Vec3::ONE)));

    let names: Vec<_> = scene.collect_draws(scene.root()).iter().map(|d| d.name).collect();
    assert_eq!(names, ["Body", "Frame", "Glass"]);
}

#[test]
fn hidden_nodes_skip_their_subtree() {
    let mut backend = RecordingBackend::new(100, 100);
    let mut scene = Scene::new();
    let parent = scene.add_node(mesh_node(&mut backend, "Parent", Material::default()));
    scene.add_to_parent(mesh_node(&mut backend, "Child", Material::default()), parent);
    assert_eq!(scene.collect_draws(scene.root()).len(), 2);

    scene.get_node_mut(parent).expect("parent").visible = false;
    assert!(scene.collect_draws(scene.root()).is_empty());
}

#[test]
fn subtree_draws_inherit_ancestor_transforms() {
    let mut backend = RecordingBackend::new(100, 100);
    let mut scene = Scene::new();
    let group = scene.add_node(Node::new("Group").with_transform(Transform::from_position(Vec3::Y)));
    let child = scene.add_to_parent(mesh_node(&mut backend, "Child", Material::default()), group);

    let draws = scene.collect_draws(group);
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].node, child);
    let translation = draws[0].world.translation;
    assert!(approx(translation.y, 1.0), "world {translation}");
}

// ============================================================================
// Resources
// ============================================================================

#[test]
fn resource_set_dedups_and_skips_render_targets() {
    let mut backend = RecordingBackend::new(100, 100);
    let target = backend.create_render_target("target", 8, 8);
    let texture = backend
        .upload_texture(
            "tex",
            &DecodedImage::solid("tex", [0; 4]),
            &TextureSettings::default(),
        )
        .expect("upload");
    let geometry = backend.upload_geometry("shared", &GeometryData::plane(1.0, 1.0));

    let mut scene = Scene::new();
    for name in ["A", "B"] {
        scene.add_node(Node::new(name).with_mesh(Mesh::single(
            geometry,
            Material::default().with_map(TextureRef::Texture(texture)),
        )));
    }
    scene.add_node(Node::new("C").with_mesh(Mesh::single(
        geometry,
        Material::default().with_map(TextureRef::RenderTarget(target)),
    )));

    let resources = scene.resources();
    assert_eq!(resources.meshes.len(), 1);
    assert_eq!(resources.textures.len(), 1);

    resources.dispose(&mut backend);
    assert_eq!(backend.live_meshes(), 0);
    assert_eq!(backend.live_textures(), 0);
    assert_eq!(backend.live_render_targets(), 1, "render targets belong to their creator");
}

#[test]
fn subtract_keeps_shared_handles_alive() {
    let mut backend = RecordingBackend::new(100, 100);
    let shared = backend.upload_geometry("shared", &GeometryData::plane(1.0, 1.0));
    let own = backend.upload_geometry("own", &GeometryData::plane(1.0, 1.0));

    let leaving = [
        Node::new("Leaving").with_mesh(Mesh::single(shared, Material::default())),
        Node::new("Own").with_mesh(Mesh::single(own, Material::default())),
    ];
    let staying = [Node::new("Staying").with_mesh(Mesh::single(shared, Material::default()))];

    let mut released = ResourceSet::from_nodes(&leaving);
    released.subtract(&ResourceSet::from_nodes(&staying));
    assert_eq!(released.meshes.len(), 1);
    assert!(released.meshes.contains(&own));

    released.subtract(&ResourceSet::from_nodes(&leaving));
    assert!(released.is_empty());
}

// ============================================================================
// SceneManager
// ============================================================================

#[test]
fn manager_builds_camera_group_lights_and_shadow() {
    let mut backend = RecordingBackend::new(800, 600);
    let config = ViewerConfig {
        camera_distance: Some(10.0),
        scale: 0.5,
        ..ViewerConfig::default()
    };
    let manager = SceneManager::new(&mut backend, &config);

    let camera = manager.camera().position();
    assert!(camera.abs_diff_eq(Vec3::new(0.0, 0.0, 10.0), 1e-5), "{camera}");
    assert!(approx(manager.camera().aspect().expect("perspective"), 800.0 / 600.0));
    assert_eq!(manager.scene().lights.len(), 3);
    assert!(manager.shadow().is_ready());

    let group = manager.scene().get_node(manager.model_group()).expect("group");
    assert_eq!(group.name, "Models");
    assert_eq!(group.transform.scale, Vec3::splat(0.5));
    assert_eq!(manager.frames_rendered(), 0);
}

#[test]
fn manager_teardown_empties_scene_and_backend() {
    let mut backend = RecordingBackend::new(800, 600);
    let mut manager = SceneManager::new(&mut backend, &ViewerConfig::default());
    let group = manager.model_group();
    let geometry = backend.upload_geometry("model", &GeometryData::plane(1.0, 1.0));
    manager
        .scene_mut()
        .add_to_parent(Node::new("Model").with_mesh(Mesh::single(geometry, Material::default())), group);

    manager.teardown(&mut backend);

    assert_eq!(manager.scene().node_count(), 1, "only the root remains");
    assert!(manager.scene().lights.is_empty());
    assert_eq!(backend.live_meshes(), 0);
    assert_eq!(backend.live_render_targets(), 0);
    assert_eq!(backend.invalid_disposals(), 0);
}

#[test]
fn manager_renders_only_after_setup_and_counts_frames() {
    let mut backend = RecordingBackend::new(800, 600);
    let springs = vitrine::motion::RotationSprings::default();
    let mut manager = SceneManager::new(&mut backend, &ViewerConfig::default());

    assert!(manager.render_frame(&mut backend, &springs));
    assert!(manager.render_frame(&mut backend, &springs));
    assert_eq!(manager.frames_rendered(), 2);

    backend.dispose();
    assert!(!manager.render_frame(&mut backend, &springs));
    assert_eq!(manager.frames_rendered(), 2);
}
