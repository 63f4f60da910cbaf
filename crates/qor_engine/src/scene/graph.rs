//! Scene arena and tree operations
//!
//! World transforms are pulled lazily: every local mutation calls
//! [`Scene::pend`], which dirties the node and its descendants, and the next
//! [`Scene::world`] read recomputes `parent.world * local` down the chain.
//! A clean node always has clean ancestors, so pending stops at the first
//! node that is already dirty.

use slotmap::SlotMap;

use crate::foundation::bounds::AABB;
use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
use crate::render::pass::Pass;
use crate::scene::node::Node;
use crate::scene::{EachFlags, NodeId, RemoveFlags, Space};

/// Per-tick behavior attached to a node.
///
/// Receives the scene, the node it is attached to and the tick length in
/// seconds. It may move, detach or destroy its own node.
pub type Behavior = Box<dyn FnMut(&mut Scene, NodeId, f32)>;

/// Owner of every node
#[derive(Default)]
pub struct Scene {
    nodes: SlotMap<NodeId, Node>,
}

impl Scene {
    /// Create an empty scene
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a node as a new root
    pub fn insert(&mut self, node: Node) -> NodeId {
        self.nodes.insert(node)
    }

    /// Insert a node and attach it under `parent`
    pub fn insert_child(&mut self, parent: NodeId, node: Node) -> NodeId {
        let id = self.insert(node);
        self.add(parent, id);
        id
    }

    /// Look up a node
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Look up a node mutably.
    ///
    /// Transform and box changes must go through the scene so caches are
    /// pended; the fields exposed on `Node` are safe to edit directly.
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// True while the node exists
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the scene holds no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Parent of a node
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id)?.parent
    }

    /// Children of a node in render order
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map_or(&[], |n| n.children.as_slice())
    }

    // ------------------------------------------------------------------
    // Ownership
    // ------------------------------------------------------------------

    /// Attach `child` under `parent`.
    ///
    /// # Panics
    ///
    /// If either id is stale, if `child` already has a parent, if
    /// `child == parent`, or if `child` is an ancestor of `parent`.
    /// Nothing is modified when a check fails.
    pub fn add(&mut self, parent: NodeId, child: NodeId) {
        assert_ne!(parent, child, "cannot add a node to itself");
        assert!(self.contains(parent), "parent node does not exist");
        assert!(
            self.nodes[child].parent.is_none(),
            "node already has a parent; detach it first"
        );
        assert!(
            !self.is_ancestor(child, parent),
            "cannot add an ancestor as a child"
        );

        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);

        let layer = self.nodes[parent].layer;
        self.set_layer(child, layer);
        self.pend(child);

        self.nodes[parent].on_add.emit(&(parent, child));
    }

    /// Detach `node` if it is a child of `parent` (or anywhere below it with
    /// `SEARCH_SUBNODES`). The detached node becomes a caller-owned root.
    pub fn remove(&mut self, parent: NodeId, node: NodeId, flags: RemoveFlags) -> bool {
        let Some(p) = self.nodes.get(parent) else {
            return false;
        };

        if p.children.contains(&node) {
            self.unlink(parent, node);
            return true;
        }

        if flags.contains(RemoveFlags::SEARCH_SUBNODES) {
            let children = p.children.clone();
            return children
                .into_iter()
                .any(|c| self.remove(c, node, flags));
        }

        false
    }

    /// Destroy every child of a node (and their subtrees)
    pub fn remove_all(&mut self, id: NodeId) {
        let children = self.nodes.get_mut(id).map(|n| std::mem::take(&mut n.children));
        for child in children.unwrap_or_default() {
            if let Some(c) = self.nodes.get_mut(child) {
                c.parent = None;
            }
            self.destroy(child);
        }
    }

    /// Detach from the parent, if any
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.parent(id) {
            self.unlink(parent, id);
        }
    }

    /// Detach a node and drop it together with its subtree
    pub fn destroy(&mut self, id: NodeId) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.detach(id);
        for n in self.subtree(id) {
            self.nodes.remove(n);
        }
        true
    }

    fn unlink(&mut self, parent: NodeId, child: NodeId) {
        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.retain(|c| *c != child);
        }
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = None;
        }
        self.pend(child);
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// `n` if it lives anywhere below `root`
    pub fn find(&self, root: NodeId, n: NodeId) -> Option<NodeId> {
        self.is_ancestor(root, n).then_some(n)
    }

    /// True if `ancestor` appears in the parent chain of `node`
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.parent(p);
        }
        false
    }

    /// Ancestor chain, nearest first
    pub fn parents(&self, id: NodeId, include_self: bool) -> Vec<NodeId> {
        let mut chain = Vec::new();
        if include_self && self.contains(id) {
            chain.push(id);
        }
        let mut current = self.parent(id);
        while let Some(p) = current {
            chain.push(p);
            current = self.parent(p);
        }
        chain
    }

    /// Topmost ancestor (the node itself for a root)
    pub fn root_of(&self, id: NodeId) -> NodeId {
        self.parents(id, true).last().copied().unwrap_or(id)
    }

    /// Node and all descendants in pre-order
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            let Some(node) = self.nodes.get(n) else {
                continue;
            };
            out.push(n);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// Apply `f` to a node and/or its descendants.
    ///
    /// The visit list is taken up front, so `f` may freely edit node fields.
    pub fn each(&mut self, id: NodeId, flags: EachFlags, mut f: impl FnMut(NodeId, &mut Node)) {
        let ids: Vec<NodeId> = if flags.contains(EachFlags::RECURSIVE) {
            self.subtree(id)
        } else {
            let mut ids = vec![id];
            ids.extend_from_slice(self.children(id));
            ids
        };

        let skip = usize::from(!flags.contains(EachFlags::INCLUDE_SELF));
        for n in ids.into_iter().skip(skip) {
            if let Some(node) = self.nodes.get_mut(n) {
                f(n, node);
            }
        }
    }

    // ------------------------------------------------------------------
    // Callbacks
    // ------------------------------------------------------------------

    /// Attach a per-tick behavior, run before the node's own logic
    pub fn on_tick(&mut self, id: NodeId, behavior: impl FnMut(&mut Scene, NodeId, f32) + 'static) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.behaviors.push(Box::new(behavior));
        }
    }

    /// Call `f(parent, child)` after each successful `add` onto this node
    pub fn on_add(&mut self, id: NodeId, mut f: impl FnMut(NodeId, NodeId) + 'static) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.on_add.connect(move |&(parent, child)| f(parent, child));
        }
    }

    /// Set the layer tag of a whole subtree
    pub fn set_layer(&mut self, id: NodeId, layer: u32) {
        self.each(id, EachFlags::default(), |_, node| node.layer = layer);
    }

    // ------------------------------------------------------------------
    // Transforms
    // ------------------------------------------------------------------

    /// Mark the world transform and box of a node and its descendants stale
    pub fn pend(&self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            let Some(node) = self.nodes.get(n) else {
                continue;
            };
            if node.world.is_dirty() {
                node.world_box.pend();
                continue;
            }
            node.world.pend();
            node.world_box.pend();
            stack.extend_from_slice(&node.children);
        }
    }

    /// Cached world transform
    pub fn world(&self, id: NodeId) -> Mat4 {
        let Some(node) = self.nodes.get(id) else {
            return Mat4::identity();
        };
        node.world.get(|| match node.parent {
            Some(parent) => self.world(parent) * node.local,
            None => node.local,
        })
    }

    /// Transform in the given space: local for `Local`/`Parent`, world for `World`
    pub fn matrix(&self, id: NodeId, space: Space) -> Mat4 {
        match space {
            Space::World => self.world(id),
            Space::Local | Space::Parent => self.nodes.get(id).map_or_else(Mat4::identity, |n| n.local),
        }
    }

    /// Force the world transform to be computed now
    pub fn cache_transform(&self, id: NodeId) {
        self.world(id);
    }

    /// Cached world bounding box
    pub fn world_box(&self, id: NodeId) -> AABB {
        let Some(node) = self.nodes.get(id) else {
            return AABB::zero();
        };
        node.world_box.get(|| {
            if node.bounds.is_zero() || node.bounds.is_full() {
                node.bounds
            } else {
                node.bounds.transformed(&self.world(id))
            }
        })
    }

    /// Replace the local transform
    pub fn set_transform(&mut self, id: NodeId, local: Mat4) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.local = local;
            self.pend(id);
        }
    }

    /// Replace the local bounding box
    pub fn set_box(&mut self, id: NodeId, bounds: AABB) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.bounds = bounds;
            node.world_box.pend();
        }
    }

    /// Position in parent or world space
    ///
    /// # Panics
    ///
    /// For `Space::Local`, where the position is always the origin.
    pub fn position(&self, id: NodeId, space: Space) -> Vec3 {
        assert_ne!(space, Space::Local, "local position is always the origin; use Space::Parent");
        self.matrix(id, space).translation()
    }

    /// Set the translation of the local transform
    ///
    /// # Panics
    ///
    /// Unless `space` is `Space::Parent`.
    pub fn set_position(&mut self, id: NodeId, v: Vec3, space: Space) {
        assert_eq!(space, Space::Parent, "positions can only be set in parent space");
        self.mutate(id, |m| m.set_translation(v));
    }

    /// Translate by `v`; `Local` moves along the node's own axes
    ///
    /// # Panics
    ///
    /// For `Space::World`; convert with [`Scene::from_world`] first.
    pub fn move_by(&mut self, id: NodeId, v: Vec3, space: Space) {
        assert_ne!(space, Space::World, "cannot move in world space; convert with from_world");
        self.mutate(id, |m| match space {
            Space::Local => {
                let delta = m.orientation() * v;
                m.translate(delta);
            }
            _ => m.translate(v),
        });
    }

    /// Rotate by `angle` radians about `axis`.
    ///
    /// `Local` post-multiplies (spin in place), `Parent` pre-multiplies
    /// (orbit the parent origin).
    ///
    /// # Panics
    ///
    /// For `Space::World`.
    pub fn rotate(&mut self, id: NodeId, angle: f32, axis: &Vec3, space: Space) {
        assert_ne!(space, Space::World, "cannot rotate in world space");
        let r = Mat4::rotation_axis(angle, axis);
        self.mutate(id, |m| match space {
            Space::Local => *m *= r,
            _ => *m = r * *m,
        });
    }

    /// Scale along the local axes
    pub fn scale(&mut self, id: NodeId, f: Vec3) {
        self.mutate(id, |m| m.scale_local(f));
    }

    /// Replace the scale of each local axis
    pub fn rescale(&mut self, id: NodeId, f: Vec3) {
        self.mutate(id, |m| m.rescale(f));
    }

    fn mutate(&mut self, id: NodeId, f: impl FnOnce(&mut Mat4)) {
        if let Some(node) = self.nodes.get_mut(id) {
            f(&mut node.local);
            self.pend(id);
        }
    }

    /// Flatten hierarchy while keeping the world transform.
    ///
    /// `Parent` folds the parent's transform into this node and re-parents it
    /// to the grandparent. `World` repeats that until the node sits directly
    /// under its root. Collapsing a root, or a node already under the root,
    /// logs a warning and does nothing.
    pub fn collapse(&mut self, id: NodeId, space: Space) {
        match space {
            Space::Parent => {
                let Some(parent) = self.parent(id) else {
                    log::warn!("attempt to collapse root node");
                    return;
                };
                let Some(grandparent) = self.parent(parent) else {
                    log::warn!("node already collapsed");
                    return;
                };
                let combined = self.nodes[parent].local * self.nodes[id].local;
                self.unlink(parent, id);
                self.nodes[id].local = combined;
                self.add(grandparent, id);
            }
            Space::World => {
                if self.parent(id).is_none() {
                    log::warn!("node already collapsed");
                    return;
                }
                while self.parent(id).and_then(|p| self.parent(p)).is_some() {
                    self.collapse(id, Space::Parent);
                }
            }
            Space::Local => log::warn!("collapsing a node to local space has no effect"),
        }
    }

    /// Transform a point from local (`Local`) or parent (`Parent`) space to
    /// world space, composing ancestors nearest first.
    ///
    /// # Panics
    ///
    /// For `Space::World`.
    pub fn to_world(&self, id: NodeId, point: Vec3, space: Space) -> Vec3 {
        assert_ne!(space, Space::World, "point is already in world space");
        self.parents(id, space == Space::Local)
            .into_iter()
            .fold(point, |p, n| self.nodes[n].local.transform_vec3(&p))
    }

    /// Inverse of [`Scene::to_world`], undoing ancestors farthest first.
    ///
    /// # Panics
    ///
    /// For `Space::World`.
    pub fn from_world(&self, id: NodeId, point: Vec3, space: Space) -> Vec3 {
        assert_ne!(space, Space::World, "point is already in world space");
        self.parents(id, space == Space::Local)
            .into_iter()
            .rev()
            .fold(point, |p, n| {
                let inverse = self.nodes[n].local.try_inverse().unwrap_or_else(Mat4::identity);
                inverse.transform_vec3(&p)
            })
    }

    // ------------------------------------------------------------------
    // Per-frame walks
    // ------------------------------------------------------------------

    /// Run one tick for a subtree: behaviors, variant logic, velocity
    /// integration, then the children.
    ///
    /// Children are visited from a copy of the child list taken before the
    /// loop, so a child may detach or destroy itself (or a sibling) safely.
    pub fn logic(&mut self, id: NodeId, dt: f32) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };

        let mut behaviors = std::mem::take(&mut node.behaviors);
        for behavior in &mut behaviors {
            behavior(self, id, dt);
            if !self.contains(id) {
                return;
            }
        }
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        // keep behaviors attached while running
        behaviors.append(&mut node.behaviors);
        node.behaviors = behaviors;

        if let Some(hooks) = node.kind.hooks_mut() {
            hooks.logic_self(dt);
        }

        self.integrate(id, dt);

        let children = self.nodes.get(id).map(|n| n.children.clone()).unwrap_or_default();
        for child in children {
            self.logic(child, dt);
        }
    }

    /// Euler step: `v += a*dt`, then move by `v*dt` in the velocity space
    fn integrate(&mut self, id: NodeId, dt: f32) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        if node.velocity == Vec3::zeros() && node.acceleration == Vec3::zeros() {
            return;
        }

        node.velocity += node.acceleration * dt;
        let step = node.velocity * dt;
        let space = node.velocity_space;
        let parent = node.parent;

        match space {
            Space::World => {
                let to_parent = parent
                    .and_then(|p| self.world(p).try_inverse())
                    .unwrap_or_else(Mat4::identity);
                self.move_by(id, to_parent.transform_vector(&step), Space::Parent);
            }
            _ => self.move_by(id, step, space),
        }
    }

    /// Render a subtree into a pass.
    ///
    /// An invisible node suppresses itself and its descendants. A node that
    /// is visible but not self-visible skips only its own `*_self` hooks.
    pub fn render(&self, id: NodeId, pass: &mut Pass<'_>) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        if !node.visible {
            return;
        }

        let hooks = node.kind.hooks();
        hooks.before_render(node, pass);

        if node.self_visible {
            pass.matrix(&self.world(id));
            hooks.before_render_self(node, pass);
            hooks.render_self(node, pass);
            hooks.after_render_self(node, pass);
        }

        if pass.recursive() {
            for child in &node.children {
                self.render(*child, pass);
            }
        }

        hooks.after_render(node, pass);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::cell::RefCell;
    use std::panic::{catch_unwind, AssertUnwindSafe};
    use std::rc::Rc;

    fn translated(x: f32, y: f32, z: f32) -> Node {
        Node::new().with_transform(Mat4::new_translation(&Vec3::new(x, y, z)))
    }

    fn chain() -> (Scene, NodeId, NodeId, NodeId) {
        let mut scene = Scene::new();
        let root = scene.insert(translated(1.0, 0.0, 0.0));
        let mid = scene.insert_child(root, translated(0.0, 2.0, 0.0));
        let leaf = scene.insert_child(mid, translated(0.0, 0.0, 3.0));
        (scene, root, mid, leaf)
    }

    #[test]
    fn test_world_is_parent_world_times_local() {
        let (mut scene, root, mid, leaf) = chain();
        assert_relative_eq!(scene.position(leaf, Space::World), Vec3::new(1.0, 2.0, 3.0));

        scene.rotate(mid, std::f32::consts::FRAC_PI_2, &Vec3::y(), Space::Local);
        scene.move_by(root, Vec3::new(0.0, 0.0, -1.0), Space::Parent);

        let expected = scene.world(mid) * *scene.get(leaf).unwrap().local();
        assert_relative_eq!(scene.world(leaf), expected, epsilon = 1e-5);
        assert_relative_eq!(scene.position(leaf, Space::World), Vec3::new(4.0, 2.0, -1.0), epsilon = 1e-5);
    }

    #[test]
    fn test_pend_reaches_clean_descendants() {
        let (mut scene, root, _, leaf) = chain();
        scene.cache_transform(leaf);
        assert!(!scene.get(leaf).unwrap().world.is_dirty());

        scene.set_position(root, Vec3::new(10.0, 0.0, 0.0), Space::Parent);
        assert!(scene.get(leaf).unwrap().world.is_dirty());
        assert_relative_eq!(scene.position(leaf, Space::World), Vec3::new(10.0, 2.0, 3.0));
    }

    #[test]
    fn test_add_remove_readd() {
        let mut scene = Scene::new();
        let parent = scene.insert(Node::new());
        let child = scene.insert(translated(0.0, 1.0, 0.0));

        scene.add(parent, child);
        assert_eq!(scene.parent(child), Some(parent));

        assert!(scene.remove(parent, child, RemoveFlags::empty()));
        assert_eq!(scene.parent(child), None);
        assert!(scene.children(parent).is_empty());
        assert!(scene.parents(child, false).is_empty());

        scene.add(parent, child);
        assert_eq!(scene.children(parent), &[child]);
    }

    #[test]
    fn test_add_parented_node_panics_without_mutation() {
        let mut scene = Scene::new();
        let a = scene.insert(Node::new());
        let b = scene.insert(Node::new());
        let child = scene.insert_child(a, Node::new());

        let result = catch_unwind(AssertUnwindSafe(|| scene.add(b, child)));
        assert!(result.is_err());
        assert_eq!(scene.children(a), &[child]);
        assert!(scene.children(b).is_empty());
        assert_eq!(scene.parent(child), Some(a));
    }

    #[test]
    #[should_panic(expected = "itself")]
    fn test_add_to_self_panics() {
        let mut scene = Scene::new();
        let a = scene.insert(Node::new());
        scene.add(a, a);
    }

    #[test]
    #[should_panic(expected = "ancestor")]
    fn test_add_ancestor_panics() {
        let (mut scene, root, _, leaf) = chain();
        scene.add(leaf, root);
    }

    #[test]
    fn test_remove_searches_subnodes() {
        let (mut scene, root, mid, leaf) = chain();
        assert!(!scene.remove(root, leaf, RemoveFlags::empty()));
        assert!(scene.remove(root, leaf, RemoveFlags::SEARCH_SUBNODES));
        assert!(scene.children(mid).is_empty());
        assert!(scene.contains(leaf));
    }

    #[test]
    fn test_destroy_drops_subtree() {
        let (mut scene, root, mid, leaf) = chain();
        assert!(scene.destroy(mid));
        assert!(!scene.contains(mid));
        assert!(!scene.contains(leaf));
        assert!(scene.children(root).is_empty());
        assert!(!scene.destroy(mid));
    }

    #[test]
    fn test_to_world_from_world_roundtrip() {
        let (mut scene, _, mid, leaf) = chain();
        scene.rotate(mid, 0.7, &Vec3::new(1.0, 1.0, 0.0), Space::Local);
        scene.scale(leaf, Vec3::new(2.0, 0.5, 1.0));

        let p = Vec3::new(0.3, -4.0, 2.5);
        for space in [Space::Local, Space::Parent] {
            let back = scene.to_world(leaf, scene.from_world(leaf, p, space), space);
            assert_relative_eq!(back, p, epsilon = 1e-4);
        }

        let origin = scene.to_world(leaf, Vec3::zeros(), Space::Local);
        assert_relative_eq!(origin, scene.position(leaf, Space::World), epsilon = 1e-5);
    }

    #[test]
    fn test_collapse_parent_keeps_world() {
        let (mut scene, root, mid, leaf) = chain();
        scene.rotate(mid, 0.4, &Vec3::z(), Space::Parent);
        let before = scene.world(leaf);

        scene.collapse(leaf, Space::Parent);
        assert_eq!(scene.parent(leaf), Some(root));
        assert_eq!(scene.parents(leaf, false).len(), 1);
        assert_relative_eq!(scene.world(leaf), before, epsilon = 1e-5);

        // already directly under the root
        scene.collapse(leaf, Space::Parent);
        assert_eq!(scene.parent(leaf), Some(root));
    }

    #[test]
    fn test_collapse_root_is_noop() {
        let (mut scene, root, _, _) = chain();
        scene.collapse(root, Space::Parent);
        assert_eq!(scene.parent(root), None);
    }

    #[test]
    fn test_velocity_integration_is_euler() {
        let mut scene = Scene::new();
        let n = scene.insert(Node::new());
        scene.get_mut(n).unwrap().acceleration = Vec3::new(0.0, -10.0, 0.0);

        scene.logic(n, 0.1);
        assert_relative_eq!(scene.position(n, Space::Parent).y, -0.1, epsilon = 1e-6);
        scene.logic(n, 0.1);

        let node = scene.get(n).unwrap();
        assert_relative_eq!(node.velocity, Vec3::new(0.0, -2.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(scene.position(n, Space::Parent).y, -0.3, epsilon = 1e-6);
    }

    #[test]
    fn test_behavior_may_destroy_self() {
        let mut scene = Scene::new();
        let root = scene.insert(Node::new());
        let doomed = scene.insert_child(root, Node::new());
        let survivor = scene.insert_child(root, Node::new());

        scene.on_tick(doomed, |scene, id, _| {
            scene.destroy(id);
        });
        let ticks = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&ticks);
        scene.on_tick(survivor, move |_, _, _| *counter.borrow_mut() += 1);

        scene.logic(root, 0.016);
        scene.logic(root, 0.016);

        assert!(!scene.contains(doomed));
        assert_eq!(scene.children(root), &[survivor]);
        assert_eq!(*ticks.borrow(), 2);
    }

    #[test]
    fn test_on_add_and_layer_propagation() {
        let mut scene = Scene::new();
        let parent = scene.insert(Node::new());
        scene.get_mut(parent).unwrap().layer = 3;

        let added = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&added);
        scene.on_add(parent, move |p, c| log.borrow_mut().push((p, c)));

        let child = scene.insert(Node::new());
        let grandchild = scene.insert_child(child, Node::new());
        scene.add(parent, child);

        assert_eq!(*added.borrow(), vec![(parent, child)]);
        assert_eq!(scene.get(grandchild).unwrap().layer(), 3);
    }

    #[test]
    fn test_each_flags() {
        let (mut scene, root, mid, leaf) = chain();
        let sibling = scene.insert_child(root, Node::new());

        let mut seen = Vec::new();
        scene.each(root, EachFlags::RECURSIVE, |id, _| seen.push(id));
        assert_eq!(seen, vec![mid, leaf, sibling]);

        seen.clear();
        scene.each(root, EachFlags::INCLUDE_SELF, |id, _| seen.push(id));
        assert_eq!(seen, vec![root, mid, sibling]);
    }

    #[test]
    fn test_world_box_follows_transform() {
        let mut scene = Scene::new();
        let parent = scene.insert(translated(5.0, 0.0, 0.0));
        let unit = AABB::new(Vec3::repeat(-1.0), Vec3::repeat(1.0));
        let child = scene.insert_child(parent, Node::new().with_box(unit));

        assert_relative_eq!(scene.world_box(child).min, Vec3::new(4.0, -1.0, -1.0));

        scene.move_by(parent, Vec3::new(0.0, 1.0, 0.0), Space::Parent);
        assert_relative_eq!(scene.world_box(child).max, Vec3::new(6.0, 2.0, 1.0));

        scene.set_box(child, AABB::full());
        assert!(scene.world_box(child).is_full());
    }

    #[test]
    fn test_local_move_follows_orientation() {
        let mut scene = Scene::new();
        let n = scene.insert(Node::new());
        scene.rotate(n, std::f32::consts::FRAC_PI_2, &Vec3::y(), Space::Local);
        scene.move_by(n, Vec3::new(0.0, 0.0, -1.0), Space::Local);
        assert_relative_eq!(scene.position(n, Space::Parent), Vec3::new(-1.0, 0.0, 0.0), epsilon = 1e-5);
    }
}
