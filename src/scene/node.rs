use smallvec::SmallVec;

use crate::render::GpuMeshId;
use crate::scene::NodeHandle;
use crate::scene::material::Material;
use crate::scene::transform::Transform;

/// One drawable piece of a mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    pub geometry: GpuMeshId,
    pub material: Material,
}

/// Primitives drawn with a node's world transform.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mesh {
    pub primitives: SmallVec<[Primitive; 1]>,
}

impl Mesh {
    #[must_use]
    pub fn single(geometry: GpuMeshId, material: Material) -> Self {
        let mut primitives = SmallVec::new();
        primitives.push(Primitive { geometry, material });
        Self { primitives }
    }

    pub fn materials_mut(&mut self) -> impl Iterator<Item = &mut Material> {
        self.primitives.iter_mut().map(|p| &mut p.material)
    }
}

/// A scene graph node.
///
/// Hierarchy links are maintained by [`Scene`](crate::scene::Scene); use its
/// `attach`/`detach` rather than editing `parent`/`children` directly.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub(crate) parent: Option<NodeHandle>,
    pub(crate) children: Vec<NodeHandle>,
    pub transform: Transform,
    pub mesh: Option<Mesh>,
    /// Hidden nodes skip their whole subtree.
    pub visible: bool,
}

impl Default for Node {
    fn default() -> Self {
        Self::new("")
    }
}

impl Node {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            children: Vec::new(),
            transform: Transform::new(),
            mesh: None,
            visible: true,
        }
    }

    #[must_use]
    pub fn with_mesh(mut self, mesh: Mesh) -> Self {
        self.mesh = Some(mesh);
        self
    }

    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    /// Sets opacity on every material; no-op without a mesh.
    pub fn set_opacity(&mut self, opacity: f32) {
        if let Some(mesh) = &mut self.mesh {
            for material in mesh.materials_mut() {
                material.opacity = opacity;
            }
        }
    }

    /// Opacity of the first material, if any.
    #[must_use]
    pub fn opacity(&self) -> Option<f32> {
        self.mesh
            .as_ref()
            .and_then(|mesh| mesh.primitives.first())
            .map(|p| p.material.opacity)
    }

    /// Copies name, transform and mesh without hierarchy links.
    #[must_use]
    pub fn detached_clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            parent: None,
            children: Vec::new(),
            transform: self.transform,
            mesh: self.mesh.clone(),
            visible: self.visible,
        }
    }
}
