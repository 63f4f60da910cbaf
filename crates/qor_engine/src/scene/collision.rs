//! Collision subscriptions
//!
//! Bookkeeping for the partitioner's collision events. The geometric test
//! itself is pluggable through [`OverlapTest`]; this module only tracks, per
//! node pair, whether the pair overlapped on the previous tick and turns
//! that into the four event channels.

use std::collections::HashMap;
use std::fmt;

use crate::scene::{NodeId, Scene};

/// Collision event handler, called with `(subject, partner)`
pub type CollisionCallback = Box<dyn FnMut(NodeId, NodeId)>;

/// Geometric overlap predicate
pub trait OverlapTest {
    /// True when both nodes exist and overlap
    fn overlaps(&self, scene: &Scene, a: NodeId, b: NodeId) -> bool;
}

/// Overlap of the cached world bounding boxes
#[derive(Debug, Clone, Copy, Default)]
pub struct WorldBoxOverlap;

impl OverlapTest for WorldBoxOverlap {
    fn overlaps(&self, scene: &Scene, a: NodeId, b: NodeId) -> bool {
        scene.contains(a) && scene.contains(b) && scene.world_box(a).intersects(&scene.world_box(b))
    }
}

/// Optional handlers for the four collision channels
#[derive(Default)]
pub struct CollisionCallbacks {
    /// Every tick the pair overlaps
    pub on_collision: Option<CollisionCallback>,
    /// Every tick the pair does not overlap
    pub on_no_collision: Option<CollisionCallback>,
    /// The tick the overlap begins
    pub on_enter: Option<CollisionCallback>,
    /// The tick the overlap ends
    pub on_leave: Option<CollisionCallback>,
}

impl CollisionCallbacks {
    /// No handlers
    pub fn new() -> Self {
        Self::default()
    }

    /// Handler for ticks with overlap
    pub fn with_collision(mut self, f: impl FnMut(NodeId, NodeId) + 'static) -> Self {
        self.on_collision = Some(Box::new(f));
        self
    }

    /// Handler for ticks without overlap
    pub fn with_no_collision(mut self, f: impl FnMut(NodeId, NodeId) + 'static) -> Self {
        self.on_no_collision = Some(Box::new(f));
        self
    }

    /// Handler for the first tick of an overlap
    pub fn with_enter(mut self, f: impl FnMut(NodeId, NodeId) + 'static) -> Self {
        self.on_enter = Some(Box::new(f));
        self
    }

    /// Handler for the first tick after an overlap
    pub fn with_leave(mut self, f: impl FnMut(NodeId, NodeId) + 'static) -> Self {
        self.on_leave = Some(Box::new(f));
        self
    }

    fn dispatch(&mut self, a: NodeId, b: NodeId, now: bool, before: bool) {
        let fire = |slot: &mut Option<CollisionCallback>| {
            if let Some(f) = slot {
                f(a, b);
            }
        };
        if now {
            fire(&mut self.on_collision);
            if !before {
                fire(&mut self.on_enter);
            }
        } else {
            fire(&mut self.on_no_collision);
            if before {
                fire(&mut self.on_leave);
            }
        }
    }
}

impl fmt::Debug for CollisionCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollisionCallbacks")
            .field("on_collision", &self.on_collision.is_some())
            .field("on_no_collision", &self.on_no_collision.is_some())
            .field("on_enter", &self.on_enter.is_some())
            .field("on_leave", &self.on_leave.is_some())
            .finish()
    }
}

/// A subscription's callbacks plus previous-tick overlap per pair
#[derive(Debug)]
pub(crate) struct Subscription<A, B> {
    pub(crate) a: A,
    pub(crate) b: B,
    callbacks: CollisionCallbacks,
    previous: HashMap<(NodeId, NodeId), bool>,
}

impl<A, B> Subscription<A, B> {
    pub(crate) fn new(a: A, b: B, callbacks: CollisionCallbacks) -> Self {
        Self {
            a,
            b,
            callbacks,
            previous: HashMap::new(),
        }
    }

    /// Test every pair this tick and fire edge and level events.
    ///
    /// Pairs that no longer exist are forgotten without a leave event.
    pub(crate) fn update(&mut self, pairs: impl IntoIterator<Item = (NodeId, NodeId)>, mut test: impl FnMut(NodeId, NodeId) -> bool) {
        let mut current = HashMap::with_capacity(self.previous.len());
        for (a, b) in pairs {
            let now = test(a, b);
            let before = self.previous.get(&(a, b)).copied().unwrap_or(false);
            self.callbacks.dispatch(a, b, now, before);
            current.insert((a, b), now);
        }
        self.previous = current;
    }

    #[cfg(test)]
    pub(crate) fn tracked(&self) -> usize {
        self.previous.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::bounds::AABB;
    use crate::foundation::math::Vec3;
    use crate::scene::{Node, Space};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn unit_box() -> AABB {
        AABB::from_center_extents(Vec3::zeros(), Vec3::repeat(0.5))
    }

    #[test]
    fn test_world_box_overlap_follows_transform() {
        let mut scene = Scene::new();
        let a = scene.insert(Node::new().with_box(unit_box()));
        let b = scene.insert(Node::new().with_box(unit_box()));
        assert!(WorldBoxOverlap.overlaps(&scene, a, b));

        scene.set_position(b, Vec3::new(3.0, 0.0, 0.0), Space::Parent);
        assert!(!WorldBoxOverlap.overlaps(&scene, a, b));

        scene.destroy(b);
        assert!(!WorldBoxOverlap.overlaps(&scene, a, b));
    }

    #[test]
    fn test_edges_fire_once() {
        let mut scene = Scene::new();
        let a = scene.insert(Node::new());
        let b = scene.insert(Node::new());

        let events = Rc::new(RefCell::new(Vec::new()));
        let push = |tag: &'static str| {
            let events = Rc::clone(&events);
            move |_: NodeId, _: NodeId| events.borrow_mut().push(tag)
        };
        let callbacks = CollisionCallbacks::new()
            .with_enter(push("enter"))
            .with_leave(push("leave"))
            .with_collision(push("col"))
            .with_no_collision(push("none"));

        let mut sub = Subscription::new(a, b, callbacks);
        for overlap in [false, true, true, false] {
            sub.update([(a, b)], |_, _| overlap);
        }
        assert_eq!(*events.borrow(), vec!["none", "col", "enter", "col", "none", "leave"]);
        assert_eq!(sub.tracked(), 1);
    }
}
