//! Visibility and collision partitioning
//!
//! A [`Partitioner`] answers two per-frame questions: which nodes and lights
//! should be drawn (`partition`, before rendering) and which registered
//! objects touch (`logic`, once per tick). [`BasicPartitioner`] flattens the
//! tree and tests collision pairs exhaustively; a spatial implementation can
//! replace it behind the same trait.

use std::collections::HashMap;

use crate::foundation::bounds::Frustum;
use crate::foundation::time::Stopwatch;
use crate::scene::collision::{CollisionCallbacks, OverlapTest, Subscription, WorldBoxOverlap};
use crate::scene::{NodeId, Scene};

/// Visibility and collision queries over a scene
pub trait Partitioner {
    /// Rebuild the visible node and light lists from `root`
    fn partition(&mut self, scene: &Scene, root: NodeId);

    /// Nodes to draw this frame, in tree order
    fn visible_nodes(&self) -> &[NodeId];

    /// Light nodes found by the last `partition`
    fn visible_lights(&self) -> &[NodeId];

    /// Nodes lit by `light`
    fn visible_nodes_from(&self, light: NodeId) -> &[NodeId];

    /// Camera used for culling
    fn camera(&self) -> Option<NodeId>;

    /// Set the culling camera
    fn set_camera(&mut self, camera: Option<NodeId>);

    /// Culling volume for the next `partition`; `None` disables culling
    fn set_frustum(&mut self, frustum: Option<Frustum>);

    /// Advance collision tracking and fire events
    fn logic(&mut self, scene: &Scene, dt: f32);

    /// Subscribe to collisions between two specific nodes
    fn on_collision(&mut self, a: NodeId, b: NodeId, callbacks: CollisionCallbacks);

    /// Subscribe to collisions between a node and any object of a type
    fn on_collision_with_type(&mut self, a: NodeId, object_type: u32, callbacks: CollisionCallbacks);

    /// Subscribe to collisions between any objects of two types
    fn on_collision_between_types(&mut self, type_a: u32, type_b: u32, callbacks: CollisionCallbacks);

    /// Add a node to a collision type
    fn register_object(&mut self, node: NodeId, object_type: u32);

    /// Remove a node from one type, or from every type when `None`
    fn deregister_object(&mut self, node: NodeId, object_type: Option<u32>);

    /// Registered objects currently overlapping `node`
    fn get_collisions_for(&mut self, scene: &Scene, node: NodeId) -> Vec<NodeId>;

    /// Objects of `object_type` currently overlapping `node`
    fn get_collisions_for_type(&mut self, scene: &Scene, node: NodeId, object_type: u32) -> Vec<NodeId>;

    /// Objects of `type_b` currently overlapping any object of `type_a`
    fn get_collisions_between(&mut self, scene: &Scene, type_a: u32, type_b: u32) -> Vec<NodeId>;

    /// Drop visibility lists and every subscription
    fn clear(&mut self);

    /// True with no visible nodes, lights or subscriptions
    fn is_empty(&self) -> bool;

    /// True when any collision subscription exists
    fn has_collisions(&self) -> bool;
}

/// Whole-tree partitioner with exhaustive pair tests
pub struct BasicPartitioner {
    nodes: Vec<NodeId>,
    lights: Vec<NodeId>,
    camera: Option<NodeId>,
    frustum: Option<Frustum>,

    objects: HashMap<u32, Vec<NodeId>>,
    object_pairs: Vec<Subscription<NodeId, NodeId>>,
    typed_pairs: Vec<Subscription<NodeId, u32>>,
    intertype_pairs: Vec<Subscription<u32, u32>>,

    overlap: Box<dyn OverlapTest>,
}

impl Default for BasicPartitioner {
    fn default() -> Self {
        Self::new()
    }
}

impl BasicPartitioner {
    /// Partitioner using world-box overlap
    pub fn new() -> Self {
        Self::with_overlap_test(WorldBoxOverlap)
    }

    /// Partitioner with a custom overlap predicate
    pub fn with_overlap_test(overlap: impl OverlapTest + 'static) -> Self {
        Self {
            nodes: Vec::new(),
            lights: Vec::new(),
            camera: None,
            frustum: None,
            objects: HashMap::new(),
            object_pairs: Vec::new(),
            typed_pairs: Vec::new(),
            intertype_pairs: Vec::new(),
            overlap: Box::new(overlap),
        }
    }

    fn collect(&mut self, scene: &Scene, id: NodeId) {
        let Some(node) = scene.get(id) else {
            return;
        };
        if !node.visible {
            return;
        }

        if node.self_visible {
            let world_box = scene.world_box(id);
            let culled = self
                .frustum
                .as_ref()
                .is_some_and(|f| world_box.is_finite() && !f.intersects_aabb(&world_box));
            if !culled {
                self.nodes.push(id);
            }
            if node.is_light() {
                self.lights.push(id);
            }
        }

        for child in node.children() {
            self.collect(scene, *child);
        }
    }

    /// Drop expired members from every type
    fn sweep(&mut self, scene: &Scene) {
        for members in self.objects.values_mut() {
            members.retain(|n| scene.contains(*n));
        }
    }

    fn members(&self, object_type: u32) -> &[NodeId] {
        self.objects.get(&object_type).map_or(&[], Vec::as_slice)
    }
}

impl Partitioner for BasicPartitioner {
    fn partition(&mut self, scene: &Scene, root: NodeId) {
        let watch = Stopwatch::start_new();
        self.nodes.clear();
        self.lights.clear();
        self.collect(scene, root);
        log::trace!(
            "partitioned {} nodes, {} lights in {:.3} ms",
            self.nodes.len(),
            self.lights.len(),
            watch.elapsed_millis()
        );
    }

    fn visible_nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    fn visible_lights(&self) -> &[NodeId] {
        &self.lights
    }

    fn visible_nodes_from(&self, _light: NodeId) -> &[NodeId] {
        &self.nodes
    }

    fn camera(&self) -> Option<NodeId> {
        self.camera
    }

    fn set_camera(&mut self, camera: Option<NodeId>) {
        self.camera = camera;
    }

    fn set_frustum(&mut self, frustum: Option<Frustum>) {
        self.frustum = frustum;
    }

    fn logic(&mut self, scene: &Scene, _dt: f32) {
        self.sweep(scene);

        let before = self.object_pairs.len() + self.typed_pairs.len();
        self.object_pairs.retain(|s| scene.contains(s.a) && scene.contains(s.b));
        self.typed_pairs.retain(|s| scene.contains(s.a));
        let dropped = before - self.object_pairs.len() - self.typed_pairs.len();
        if dropped > 0 {
            log::debug!("dropped {dropped} collision subscriptions for destroyed nodes");
        }

        let overlap = self.overlap.as_ref();
        let test = |a: NodeId, b: NodeId| overlap.overlaps(scene, a, b);

        for sub in &mut self.object_pairs {
            let pair = (sub.a, sub.b);
            sub.update([pair], test);
        }

        for sub in &mut self.typed_pairs {
            let a = sub.a;
            let members = self.objects.get(&sub.b).map_or(&[][..], Vec::as_slice);
            let pairs: Vec<_> = members.iter().filter(|m| **m != a).map(|m| (a, *m)).collect();
            sub.update(pairs, test);
        }

        for sub in &mut self.intertype_pairs {
            let left = self.objects.get(&sub.a).map_or(&[][..], Vec::as_slice);
            let right = self.objects.get(&sub.b).map_or(&[][..], Vec::as_slice);
            let same = sub.a == sub.b;
            let mut pairs = Vec::new();
            for (i, a) in left.iter().enumerate() {
                // one entry per unordered pair within a single type
                let start = if same { i + 1 } else { 0 };
                pairs.extend(right[start.min(right.len())..].iter().filter(|b| *b != a).map(|b| (*a, *b)));
            }
            sub.update(pairs, test);
        }
    }

    fn on_collision(&mut self, a: NodeId, b: NodeId, callbacks: CollisionCallbacks) {
        self.object_pairs.push(Subscription::new(a, b, callbacks));
    }

    fn on_collision_with_type(&mut self, a: NodeId, object_type: u32, callbacks: CollisionCallbacks) {
        self.typed_pairs.push(Subscription::new(a, object_type, callbacks));
    }

    fn on_collision_between_types(&mut self, type_a: u32, type_b: u32, callbacks: CollisionCallbacks) {
        self.intertype_pairs.push(Subscription::new(type_a, type_b, callbacks));
    }

    fn register_object(&mut self, node: NodeId, object_type: u32) {
        let members = self.objects.entry(object_type).or_default();
        if !members.contains(&node) {
            members.push(node);
        }
    }

    fn deregister_object(&mut self, node: NodeId, object_type: Option<u32>) {
        match object_type {
            Some(t) => {
                if let Some(members) = self.objects.get_mut(&t) {
                    members.retain(|n| *n != node);
                }
            }
            None => {
                for members in self.objects.values_mut() {
                    members.retain(|n| *n != node);
                }
            }
        }
    }

    fn get_collisions_for(&mut self, scene: &Scene, node: NodeId) -> Vec<NodeId> {
        self.sweep(scene);
        let mut hits: Vec<NodeId> = Vec::new();
        for members in self.objects.values() {
            for m in members {
                if *m != node && !hits.contains(m) && self.overlap.overlaps(scene, node, *m) {
                    hits.push(*m);
                }
            }
        }
        hits
    }

    fn get_collisions_for_type(&mut self, scene: &Scene, node: NodeId, object_type: u32) -> Vec<NodeId> {
        self.sweep(scene);
        self.members(object_type)
            .iter()
            .copied()
            .filter(|m| *m != node && self.overlap.overlaps(scene, node, *m))
            .collect()
    }

    fn get_collisions_between(&mut self, scene: &Scene, type_a: u32, type_b: u32) -> Vec<NodeId> {
        self.sweep(scene);
        let left = self.members(type_a);
        self.members(type_b)
            .iter()
            .copied()
            .filter(|b| left.iter().any(|a| a != b && self.overlap.overlaps(scene, *a, *b)))
            .collect()
    }

    fn clear(&mut self) {
        self.object_pairs.clear();
        self.typed_pairs.clear();
        self.intertype_pairs.clear();
        self.nodes.clear();
        self.lights.clear();
    }

    fn is_empty(&self) -> bool {
        self.nodes.is_empty()
            && self.lights.is_empty()
            && self.object_pairs.is_empty()
            && self.typed_pairs.is_empty()
            && self.intertype_pairs.is_empty()
    }

    fn has_collisions(&self) -> bool {
        !self.object_pairs.is_empty() || !self.typed_pairs.is_empty() || !self.intertype_pairs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::bounds::AABB;
    use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
    use crate::scene::{Light, Node, Space};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn boxed(x: f32) -> Node {
        Node::new()
            .with_box(AABB::from_center_extents(Vec3::zeros(), Vec3::repeat(0.5)))
            .with_transform(Mat4::new_translation(&Vec3::new(x, 0.0, 0.0)))
    }

    #[test]
    fn test_partition_respects_visibility() {
        let mut scene = Scene::new();
        let root = scene.insert(Node::new());
        let hidden = scene.insert_child(root, Node::new());
        let under_hidden = scene.insert_child(hidden, Node::new());
        let shy = scene.insert_child(root, Node::new());
        let under_shy = scene.insert_child(shy, Node::new());
        let light = scene.insert_child(root, Node::light(Light::default()));

        scene.get_mut(hidden).unwrap().visible = false;
        scene.get_mut(shy).unwrap().self_visible = false;

        let mut partitioner = BasicPartitioner::new();
        partitioner.partition(&scene, root);

        assert_eq!(partitioner.visible_nodes(), &[root, under_shy, light]);
        assert_eq!(partitioner.visible_lights(), &[light]);
        assert!(!partitioner.visible_nodes().contains(&under_hidden));
        assert_eq!(partitioner.visible_nodes_from(light), partitioner.visible_nodes());
    }

    #[test]
    fn test_frustum_rejects_finite_boxes_outside() {
        let mut scene = Scene::new();
        let root = scene.insert(Node::new());
        let inside = scene.insert_child(root, boxed(1.0));
        let outside = scene.insert_child(root, boxed(50.0));

        let mut partitioner = BasicPartitioner::new();
        partitioner.set_frustum(Some(Frustum::from_matrix(&Mat4::ortho(-5.0, 5.0, -5.0, 5.0, -5.0, 5.0))));
        partitioner.partition(&scene, root);

        // the root has no box, so it is never culled
        assert_eq!(partitioner.visible_nodes(), &[root, inside]);
        assert!(!partitioner.visible_nodes().contains(&outside));
    }

    #[test]
    fn test_object_pair_events_over_ticks() {
        let mut scene = Scene::new();
        let a = scene.insert(boxed(0.0));
        let b = scene.insert(boxed(5.0));

        let events = Rc::new(RefCell::new(Vec::new()));
        let push = |tag: &'static str| {
            let events = Rc::clone(&events);
            move |_: NodeId, _: NodeId| events.borrow_mut().push(tag)
        };

        let mut partitioner = BasicPartitioner::new();
        partitioner.on_collision(
            a,
            b,
            CollisionCallbacks::new()
                .with_enter(push("enter"))
                .with_collision(push("collision"))
                .with_leave(push("leave"))
                .with_no_collision(push("no_collision")),
        );
        assert!(partitioner.has_collisions());

        partitioner.logic(&scene, 0.016);
        scene.set_position(b, Vec3::new(0.5, 0.0, 0.0), Space::Parent);
        partitioner.logic(&scene, 0.016);
        partitioner.logic(&scene, 0.016);
        scene.set_position(b, Vec3::new(5.0, 0.0, 0.0), Space::Parent);
        partitioner.logic(&scene, 0.016);

        assert_eq!(
            *events.borrow(),
            vec!["no_collision", "collision", "enter", "collision", "no_collision", "leave"]
        );
    }

    #[test]
    fn test_expired_subscriptions_are_dropped() {
        let mut scene = Scene::new();
        let a = scene.insert(boxed(0.0));
        let b = scene.insert(boxed(0.0));

        let hits = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&hits);
        let mut partitioner = BasicPartitioner::new();
        partitioner.on_collision(a, b, CollisionCallbacks::new().with_collision(move |_, _| *counter.borrow_mut() += 1));

        partitioner.logic(&scene, 0.016);
        scene.destroy(b);
        partitioner.logic(&scene, 0.016);

        assert_eq!(*hits.borrow(), 1);
        assert!(!partitioner.has_collisions());
    }

    #[test]
    fn test_type_subscriptions_and_queries() {
        let mut scene = Scene::new();
        let player = scene.insert(boxed(0.0));
        let near = scene.insert(boxed(0.5));
        let far = scene.insert(boxed(9.0));
        let other = scene.insert(boxed(0.2));

        const ENEMY: u32 = 1;
        const PICKUP: u32 = 2;

        let mut partitioner = BasicPartitioner::new();
        partitioner.register_object(near, ENEMY);
        partitioner.register_object(far, ENEMY);
        partitioner.register_object(other, PICKUP);
        partitioner.register_object(player, PICKUP);

        let entered = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&entered);
        partitioner.on_collision_with_type(
            player,
            ENEMY,
            CollisionCallbacks::new().with_enter(move |a, b| sink.borrow_mut().push((a, b))),
        );
        partitioner.logic(&scene, 0.016);
        assert_eq!(*entered.borrow(), vec![(player, near)]);

        assert_eq!(partitioner.get_collisions_for_type(&scene, player, ENEMY), vec![near]);
        let mut all = partitioner.get_collisions_for(&scene, player);
        all.sort();
        let mut expected = vec![near, other];
        expected.sort();
        assert_eq!(all, expected);

        let mut between = partitioner.get_collisions_between(&scene, PICKUP, ENEMY);
        between.sort();
        assert_eq!(between, vec![near]);

        scene.destroy(near);
        assert!(partitioner.get_collisions_for_type(&scene, player, ENEMY).is_empty());

        partitioner.deregister_object(other, None);
        assert!(partitioner.get_collisions_for(&scene, player).is_empty());
    }

    #[test]
    fn test_same_type_pairs_counted_once() {
        let mut scene = Scene::new();
        let a = scene.insert(boxed(0.0));
        let b = scene.insert(boxed(0.3));

        let count = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&count);
        let mut partitioner = BasicPartitioner::new();
        partitioner.register_object(a, 3);
        partitioner.register_object(b, 3);
        partitioner.on_collision_between_types(3, 3, CollisionCallbacks::new().with_enter(move |_, _| *counter.borrow_mut() += 1));

        partitioner.logic(&scene, 0.016);
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn test_clear_empties_everything() {
        let mut scene = Scene::new();
        let root = scene.insert(Node::new());
        let mut partitioner = BasicPartitioner::new();
        partitioner.partition(&scene, root);
        partitioner.on_collision_between_types(0, 1, CollisionCallbacks::new());
        assert!(!partitioner.is_empty());

        partitioner.clear();
        assert!(partitioner.is_empty());
        assert!(!partitioner.has_collisions());
    }
}
