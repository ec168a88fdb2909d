//! Scene graph
//!
//! A deliberately small scene graph: exactly what the viewer draws.
//! - Node: hierarchy, transform and an optional mesh
//! - Transform: local position, rotation, scale
//! - Scene: node arena, lights, background and override material
//! - Camera / Light: projection and the three-light rig
//! - SceneManager: the viewer's stage (camera, model group, shadow, lights)

pub mod camera;
pub mod geometry;
pub mod light;
pub mod manager;
pub mod material;
pub mod node;
pub mod scene;
pub mod transform;

pub use camera::{Camera, Projection};
pub use geometry::{GeometryData, Vertex};
pub use light::{Light, LightIntensities, LightKind, LightSet};
pub use manager::SceneManager;
pub use material::{Material, OverrideMaterial, Shading, TextureRef, srgb_hex};
pub use node::{Mesh, Node, Primitive};
pub use scene::{DrawItem, ResourceSet, Scene};
pub use transform::Transform;

use slotmap::new_key_type;

new_key_type! {
    /// Handle to a node in a [`Scene`].
    pub struct NodeHandle;
}
