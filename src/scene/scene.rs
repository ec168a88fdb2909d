use glam::Affine3A;
use rustc_hash::FxHashSet;
use slotmap::SlotMap;

use crate::render::{GpuMeshId, RenderBackend, TextureId};
use crate::scene::NodeHandle;
use crate::scene::light::Light;
use crate::scene::material::{OverrideMaterial, TextureRef};
use crate::scene::node::{Node, Primitive};

/// Node arena plus the per-scene render state.
///
/// The scene always has a root node; everything else hangs below it.
pub struct Scene {
    nodes: SlotMap<NodeHandle, Node>,
    root: NodeHandle,
    /// Clear colour (linear RGBA); `None` clears to transparent.
    pub background: Option<[f32; 4]>,
    /// When set, replaces every material for the next render.
    pub override_material: Option<OverrideMaterial>,
    pub lights: Vec<Light>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::new("Scene"));
        Self {
            nodes,
            root,
            background: None,
            override_material: None,
            lights: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> NodeHandle {
        self.root
    }

    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // ========================================================================
    // Hierarchy
    // ========================================================================

    /// Adds a node under the root.
    pub fn add_node(&mut self, node: Node) -> NodeHandle {
        self.add_to_parent(node, self.root)
    }

    /// Adds a node under `parent`; falls back to the root if `parent` is gone.
    pub fn add_to_parent(&mut self, mut child: Node, parent: NodeHandle) -> NodeHandle {
        let parent = if self.nodes.contains_key(parent) {
            parent
        } else {
            log::warn!("Parent node not found; adding '{}' under the root", child.name);
            self.root
        };
        child.parent = Some(parent);
        child.children.clear();
        let handle = self.nodes.insert(child);
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(handle);
        }
        handle
    }

    /// Moves `child` under `parent`.
    pub fn attach(&mut self, child: NodeHandle, parent: NodeHandle) {
        if child == parent || child == self.root {
            log::warn!("Refusing to attach node to itself or re-parent the root");
            return;
        }
        if !self.nodes.contains_key(parent) || !self.nodes.contains_key(child) {
            log::error!("Node not found during attach");
            return;
        }
        self.unlink(child);
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(child);
        }
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = Some(parent);
        }
    }

    fn unlink(&mut self, child: NodeHandle) {
        let old_parent = self.nodes.get(child).and_then(|n| n.parent);
        if let Some(p) = old_parent
            && let Some(n) = self.nodes.get_mut(p)
            && let Some(i) = n.children.iter().position(|&x| x == child)
        {
            n.children.remove(i);
        }
    }

    /// Removes `handle` and its whole subtree, returning the removed nodes.
    ///
    /// The root itself cannot be removed.
    pub fn remove_node(&mut self, handle: NodeHandle) -> Vec<Node> {
        if handle == self.root || !self.nodes.contains_key(handle) {
            return Vec::new();
        }
        self.unlink(handle);

        let mut removed = Vec::new();
        let mut stack = vec![handle];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(current) {
                stack.extend(node.children.iter().copied());
                removed.push(node);
            }
        }
        removed
    }

    #[inline]
    #[must_use]
    pub fn get_node(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(handle)
    }

    #[inline]
    pub fn get_node_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        self.nodes.get_mut(handle)
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, handle: NodeHandle) -> bool {
        self.nodes.contains_key(handle)
    }

    /// Depth-first search for the first node called `name` under `from`.
    #[must_use]
    pub fn find_by_name(&self, from: NodeHandle, name: &str) -> Option<NodeHandle> {
        let mut stack = vec![from];
        while let Some(current) = stack.pop() {
            let node = self.nodes.get(current)?;
            if node.name == name {
                return Some(current);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        None
    }

    /// Composes local transforms from the root down to `handle`.
    #[must_use]
    pub fn world_matrix(&self, handle: NodeHandle) -> Affine3A {
        let mut matrix = Affine3A::IDENTITY;
        let mut current = Some(handle);
        while let Some(h) = current {
            let Some(node) = self.nodes.get(h) else {
                break;
            };
            matrix = node.transform.local_matrix() * matrix;
            current = node.parent;
        }
        matrix
    }

    // ========================================================================
    // Rendering support
    // ========================================================================

    /// Visible primitives under `root`: opaque first, then blended, each in
    /// traversal order.
    #[must_use]
    pub fn collect_draws(&self, root: NodeHandle) -> Vec<DrawItem<'_>> {
        let mut opaque = Vec::new();
        let mut blended = Vec::new();
        let parent_world = self
            .nodes
            .get(root)
            .and_then(|n| n.parent)
            .map_or(Affine3A::IDENTITY, |p| self.world_matrix(p));

        let mut stack = vec![(root, parent_world)];
        while let Some((handle, parent)) = stack.pop() {
            let Some(node) = self.nodes.get(handle) else {
                continue;
            };
            if !node.visible {
                continue;
            }
            let world = parent * node.transform.local_matrix();
            if let Some(mesh) = &node.mesh {
                for primitive in &mesh.primitives {
                    let item = DrawItem {
                        node: handle,
                        name: &node.name,
                        world,
                        primitive,
                    };
                    if primitive.material.is_blended() {
                        blended.push(item);
                    } else {
                        opaque.push(item);
                    }
                }
            }
            stack.extend(node.children.iter().rev().map(|&c| (c, world)));
        }

        opaque.extend(blended);
        opaque
    }

    /// GPU resources referenced by every node in the scene.
    #[must_use]
    pub fn resources(&self) -> ResourceSet {
        ResourceSet::from_nodes(self.nodes.values())
    }
}

/// One primitive ready to draw.
#[derive(Debug, Clone, Copy)]
pub struct DrawItem<'a> {
    pub node: NodeHandle,
    pub name: &'a str,
    pub world: Affine3A,
    pub primitive: &'a Primitive,
}

/// De-duplicated geometry and texture handles.
///
/// Render targets are excluded; they belong to whoever created them.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResourceSet {
    pub meshes: FxHashSet<GpuMeshId>,
    pub textures: FxHashSet<TextureId>,
}

impl ResourceSet {
    pub fn from_nodes<'a>(nodes: impl IntoIterator<Item = &'a Node>) -> Self {
        let mut set = Self::default();
        for node in nodes {
            let Some(mesh) = &node.mesh else {
                continue;
            };
            for primitive in &mesh.primitives {
                set.meshes.insert(primitive.geometry);
                if let Some(TextureRef::Texture(texture)) = primitive.material.map {
                    set.textures.insert(texture);
                }
            }
        }
        set
    }

    /// Drops handles still referenced by `keep`.
    pub fn subtract(&mut self, keep: &ResourceSet) {
        self.meshes.retain(|m| !keep.meshes.contains(m));
        self.textures.retain(|t| !keep.textures.contains(t));
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty() && self.textures.is_empty()
    }

    /// Releases every handle on `backend`.
    pub fn dispose(self, backend: &mut dyn RenderBackend) {
        for mesh in self.meshes {
            backend.dispose_geometry(mesh);
        }
        for texture in self.textures {
            backend.dispose_texture(texture);
        }
    }
}
