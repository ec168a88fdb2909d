//! Contact Shadow Tests
//!
//! Tests for:
//! - Per-frame pass order (depth capture, two blur iterations, main pass)
//! - Blur ping-pong between the raw and scratch targets
//! - Depth capture limited to the model group
//! - Activation gating and disposal

mod common;

use vitrine::ViewerConfig;
use vitrine::render::recording::BackendCall;
use vitrine::render::{BlurAxis, RecordingBackend, RenderBackend};
use vitrine::scene::{OverrideMaterial, Scene, TextureRef};
use vitrine::shadow::{BLUR_KERNEL, ShadowPipeline, ShadowSettings};

use common::{mount, mount_loaded, phone};

fn empty_config() -> ViewerConfig {
    ViewerConfig::default()
}

// ============================================================================
// Frame Structure
// ============================================================================

#[test]
fn frame_runs_depth_blur_then_main_pass() {
    let mut viewer = mount(empty_config());
    let log = viewer.backend().log();
    let surfaces = viewer.stage().shadow().surfaces().expect("surfaces");
    log.clear();

    assert!(viewer.render_frame());
    let calls = log.calls();

    let expected_targets = [
        Some(surfaces.raw),
        Some(surfaces.blur),
        Some(surfaces.raw),
        Some(surfaces.blur),
        Some(surfaces.raw),
        None,
    ];
    let targets: Vec<_> = calls
        .iter()
        .filter_map(|c| match c {
            BackendCall::SetRenderTarget(t) => Some(*t),
            _ => None,
        })
        .collect();
    assert_eq!(targets, expected_targets);

    let renders = log.renders();
    assert_eq!(renders.len(), 2, "one depth capture and one main pass");
    assert_eq!(renders[0].target, Some(surfaces.raw));
    assert_eq!(
        renders[0].override_material,
        Some(OverrideMaterial::DepthDarkness { darkness: 3.0 })
    );
    assert_eq!(renders[1].target, None);
    assert_eq!(renders[1].override_material, None, "override is cleared before the main pass");

    let first_blur = calls
        .iter()
        .position(|c| matches!(c, BackendCall::Blur { .. }))
        .expect("blur");
    let main = calls
        .iter()
        .rposition(|c| matches!(c, BackendCall::Render(_)))
        .expect("main pass");
    let depth = calls
        .iter()
        .position(|c| matches!(c, BackendCall::Render(_)))
        .expect("depth pass");
    assert!(depth < first_blur && first_blur < main);
}

#[test]
fn blur_ping_pongs_twice_with_decreasing_amount() {
    let mut viewer = mount(empty_config());
    let log = viewer.backend().log();
    let surfaces = viewer.stage().shadow().surfaces().expect("surfaces");
    log.clear();
    viewer.render_frame();

    let passes = log.blur_passes();
    assert_eq!(passes.len(), 4);

    let expected = [
        (BlurAxis::Horizontal, 5.0, surfaces.raw, surfaces.blur),
        (BlurAxis::Vertical, 5.0, surfaces.blur, surfaces.raw),
        (BlurAxis::Horizontal, 2.0, surfaces.raw, surfaces.blur),
        (BlurAxis::Vertical, 2.0, surfaces.blur, surfaces.raw),
    ];
    for ((target, pass), (axis, radius, source, destination)) in passes.iter().zip(expected) {
        assert_eq!(pass.axis(), axis);
        assert_eq!(pass.material.kernel, BLUR_KERNEL);
        assert!((pass.radius - radius).abs() < 1e-6, "radius {} != {radius}", pass.radius);
        assert_eq!(pass.source, source);
        assert_eq!(pass.destination, destination);
        assert_eq!(*target, Some(destination), "drawn into its destination");
        assert_ne!(pass.source, pass.destination, "never reads the target it writes");
    }
    assert!((passes[0].1.step() - 5.0 / 256.0).abs() < 1e-7);
}

#[test]
fn custom_blur_settings_flow_into_schedule() {
    let config = ViewerConfig {
        shadow: ShadowSettings {
            blur: 3.0,
            second_blur_ratio: 0.5,
            ..ShadowSettings::default()
        },
        ..ViewerConfig::default()
    };
    let viewer = mount(config);
    let radii: Vec<f32> = viewer
        .stage()
        .shadow()
        .blur_schedule()
        .iter()
        .map(|p| p.radius)
        .collect();
    assert_eq!(radii, [3.0, 3.0, 1.5, 1.5]);
}

// ============================================================================
// Depth Capture Contents
// ============================================================================

#[test]
fn depth_capture_only_draws_models() {
    let mut viewer = mount_loaded(empty_config().with_models(vec![phone()]));
    let log = viewer.backend().log();
    log.clear();
    viewer.render_frame();

    let renders = log.renders();
    let depth = &renders[0];
    assert!(!depth.draws.is_empty(), "the phone casts a shadow");
    assert!(
        depth
            .draws
            .iter()
            .all(|d| d.name != "Shadow Plane" && d.name != "Fill Plane"),
        "shadow planes must not shadow themselves"
    );
    assert!(depth.draws.iter().any(|d| d.name == "Screen"));

    let main = &renders[1];
    assert!(main.draws.iter().any(|d| d.name == "Shadow Plane"));
    assert!(main.draws.iter().any(|d| d.name == "Screen"));
}

#[test]
fn shadow_plane_samples_raw_target() {
    let mut viewer = mount(empty_config());
    let log = viewer.backend().log();
    let raw = viewer.stage().shadow().surfaces().expect("surfaces").raw;
    viewer.render_frame();

    let main = log.renders().pop().expect("main pass");
    let plane = main
        .draws
        .iter()
        .find(|d| d.name == "Shadow Plane")
        .expect("shadow plane drawn");
    assert_eq!(plane.map, Some(TextureRef::RenderTarget(raw)));
    assert!((plane.opacity - 0.8).abs() < 1e-6);

    let fill = main.draws.iter().find(|d| d.name == "Fill Plane").expect("fill plane drawn");
    assert_eq!(fill.opacity, 0.0, "fill plane is invisible");
    assert_eq!(fill.geometry, plane.geometry, "planes share one geometry");
}

#[test]
fn repeated_frames_are_identical() {
    let mut viewer = mount_loaded(empty_config().with_models(vec![phone()]));
    common::run_frames(&mut viewer, 600);
    let log = viewer.backend().log();
    log.clear();

    viewer.render_frame();
    let first = log.calls();
    log.clear();
    viewer.render_frame();
    let second = log.calls();
    assert_eq!(first, second, "no state leaks between frames");
}

// ============================================================================
// Activation and Disposal
// ============================================================================

#[test]
fn render_is_noop_before_blur_materials_exist() {
    let mut backend = RecordingBackend::new(256, 256);
    let log = backend.log();
    let mut scene = Scene::new();
    let pipeline = ShadowPipeline::new(&mut backend, &mut scene, ShadowSettings::default());
    log.clear();

    assert!(!pipeline.is_ready());
    assert!(pipeline.blur_schedule().is_empty());
    let root = scene.root();
    assert!(pipeline.render(&mut backend, &mut scene, root).is_err());
    assert!(log.is_empty(), "nothing reaches the backend: {:?}", log.calls());
}

#[test]
fn render_leaves_scene_state_untouched() {
    let mut backend = RecordingBackend::new(256, 256);
    let mut scene = Scene::new();
    scene.background = Some([0.1, 0.2, 0.3, 1.0]);
    let mut pipeline = ShadowPipeline::new(&mut backend, &mut scene, ShadowSettings::default());
    pipeline.create_blur_materials();

    let root = scene.root();
    pipeline.render(&mut backend, &mut scene, root).expect("render");
    assert_eq!(scene.background, Some([0.1, 0.2, 0.3, 1.0]));
    assert_eq!(scene.override_material, None);
    assert_eq!(backend.current_target(), None);

    let depth = backend.log().renders().remove(0);
    assert_eq!(depth.background, None, "capture clears against transparency");
}

#[test]
fn targets_are_square_at_configured_resolution() {
    let mut backend = RecordingBackend::new(800, 600);
    let log = backend.log();
    let mut scene = Scene::new();
    let _pipeline = ShadowPipeline::new(
        &mut backend,
        &mut scene,
        ShadowSettings {
            resolution: 256,
            ..ShadowSettings::default()
        },
    );
    let sizes: Vec<_> = log
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            BackendCall::CreateRenderTarget { width, height, .. } => Some((width, height)),
            _ => None,
        })
        .collect();
    assert_eq!(sizes, [(256, 256), (256, 256)]);
}

#[test]
fn dispose_releases_both_targets_once() {
    let mut backend = RecordingBackend::new(256, 256);
    let mut scene = Scene::new();
    let mut pipeline = ShadowPipeline::new(&mut backend, &mut scene, ShadowSettings::default());
    pipeline.create_blur_materials();
    assert_eq!(backend.live_render_targets(), 2);

    pipeline.dispose(&mut backend);
    pipeline.dispose(&mut backend);
    assert_eq!(backend.live_render_targets(), 0);
    assert_eq!(backend.invalid_disposals(), 0);
    assert!(pipeline.surfaces().is_none());
    let root = scene.root();
    assert!(pipeline.render(&mut backend, &mut scene, root).is_err());
    assert!(!backend.is_disposed());
}
