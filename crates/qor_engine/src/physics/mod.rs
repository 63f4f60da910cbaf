//! # Physics Bridge
//!
//! Keeps scene nodes and `rapier3d` rigid bodies in step.
//!
//! - `generate` walks a subtree and creates one body per node that asks for
//!   physics, baking the node's composed transform into the body pose and
//!   its scale into the collider dimensions
//! - `logic` advances the simulation in fixed steps, releases bodies whose
//!   node was destroyed, then writes body poses back into the nodes
//! - `sync` copies body poses into non-static nodes; the body is the
//!   authority for those nodes from then on
//!
//! Each body and collider stores its node's id as user data, which is how
//! ray hits are mapped back to nodes.

mod shapes;

use std::fmt;

use bitflags::bitflags;
use nalgebra::Translation3;
use rapier3d::control::KinematicCharacterController;
use rapier3d::prelude::{
    BroadPhase, CCDSolver, ColliderBuilder, ColliderHandle, ColliderSet, ImpulseJointSet, IntegrationParameters, IslandManager,
    Isometry, MultibodyJointSet, NarrowPhase, PhysicsPipeline, QueryFilter, QueryPipeline, Ray, RigidBodyBuilder,
    RigidBodyHandle, RigidBodySet,
};
use slotmap::{Key, KeyData};

use crate::core::config::PhysicsConfig;
use crate::foundation::math::{Mat4, Mat4Ext, Transform, Vec3};
use crate::foundation::signal::Signal;
use crate::foundation::time::Stopwatch;
use crate::scene::{NodeId, PhysicsKind, PhysicsShape, Scene};

bitflags! {
    /// Options for [`Physics::generate`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct GenerateFlags: u32 {
        /// Also generate bodies for descendants
        const RECURSIVE = 1 << 0;
    }
}

bitflags! {
    /// Options for [`Physics::sync`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SyncFlags: u32 {
        /// Also sync descendants
        const RECURSIVE = 1 << 0;
    }
}

/// A ray intersection mapped back to its node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Node owning the hit collider
    pub node: NodeId,
    /// World-space hit point
    pub point: Vec3,
    /// Surface normal at the hit
    pub normal: Vec3,
    /// Distance from the ray start
    pub distance: f32,
}

fn user_data(id: NodeId) -> u128 {
    u128::from(id.data().as_ffi())
}

fn node_of(data: u128) -> Option<NodeId> {
    u64::try_from(data).ok().map(|ffi| NodeId::from(KeyData::from_ffi(ffi)))
}

/// Split an affine transform into a rigid pose and a scale
fn pose_and_scale(matrix: &Mat4) -> (Isometry<f32>, Vec3) {
    let t = Transform::from_matrix(matrix);
    (Isometry::from_parts(Translation3::from(t.position), t.rotation), t.scale)
}

/// Simulation world and the node/body mapping
pub struct Physics {
    pipeline: PhysicsPipeline,
    gravity: Vec3,
    integration: IntegrationParameters,
    islands: IslandManager,
    broad_phase: BroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd: CCDSolver,
    queries: QueryPipeline,
    character: KinematicCharacterController,

    max_substeps: u32,
    accumulator: f32,
    root: Option<NodeId>,
    on_generate: Signal<()>,
}

impl fmt::Debug for Physics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Physics")
            .field("gravity", &self.gravity)
            .field("fixed_step", &self.integration.dt)
            .field("bodies", &self.bodies.len())
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl Physics {
    /// Create an empty world
    pub fn new(config: &PhysicsConfig) -> Self {
        let [x, y, z] = config.gravity;
        log::info!(
            "physics world: gravity ({x}, {y}, {z}), step {:.4}s, {} substeps",
            config.fixed_step,
            config.max_substeps
        );
        Self {
            pipeline: PhysicsPipeline::new(),
            gravity: Vec3::new(x, y, z),
            integration: IntegrationParameters {
                dt: config.fixed_step,
                ..IntegrationParameters::default()
            },
            islands: IslandManager::new(),
            broad_phase: BroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
            queries: QueryPipeline::new(),
            character: KinematicCharacterController::default(),
            max_substeps: config.max_substeps.max(1),
            accumulator: 0.0,
            root: None,
            on_generate: Signal::new(),
        }
    }

    /// Subtree synced by `logic`
    pub fn set_root(&mut self, root: Option<NodeId>) {
        self.root = root;
    }

    /// Subtree synced by `logic`
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// World gravity
    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    /// Change world gravity
    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = gravity;
    }

    /// Number of live bodies
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Run `callback` once after the next root-level `generate`
    pub fn on_generate(&mut self, mut callback: impl FnMut() + 'static) {
        self.on_generate.connect(move |_: &()| callback());
    }

    // ------------------------------------------------------------------
    // Generation
    // ------------------------------------------------------------------

    /// Create bodies for `id` (and its subtree with `RECURSIVE`).
    ///
    /// The walk starts from the parent's world transform. Nodes that ask for
    /// a shape they cannot provide are skipped. A node that already has a
    /// body gets a fresh one.
    pub fn generate(&mut self, scene: &mut Scene, id: NodeId, flags: GenerateFlags) {
        if !scene.contains(id) {
            return;
        }
        let watch = Stopwatch::start_new();
        let base = scene.parent(id).map_or_else(Mat4::identity, |p| scene.world(p));
        self.generate_node(scene, id, flags, base);

        log::debug!(
            "physics generated, {} bodies ({:.2} ms)",
            self.bodies.len(),
            watch.elapsed_millis()
        );
        self.on_generate.emit(&());
        self.on_generate.clear();
    }

    fn generate_node(&mut self, scene: &mut Scene, id: NodeId, flags: GenerateFlags, parent: Mat4) {
        let Some(node) = scene.get(id) else {
            return;
        };
        let transform = parent * node.local();
        let (kind, shape) = (node.physics, node.physics_shape);

        match (kind, shape) {
            (PhysicsKind::None, _) => {}
            (PhysicsKind::Static, PhysicsShape::Mesh) => self.generate_tree(scene, id, &transform),
            (PhysicsKind::Actor, _) => self.generate_actor(scene, id, &transform),
            _ => self.generate_generic(scene, id, &transform),
        }

        if flags.contains(GenerateFlags::RECURSIVE) {
            for child in scene.children(id).to_vec() {
                self.generate_node(scene, child, flags, transform);
            }
        }
    }

    /// Static triangle mesh from the node's own render geometry
    fn generate_tree(&mut self, scene: &mut Scene, id: NodeId, transform: &Mat4) {
        let (pose, scale) = pose_and_scale(transform);
        let Some(builder) = scene.get(id).and_then(|n| shapes::trimesh(n, &scale)) else {
            log::debug!("node {id:?} has no geometry for a mesh collider; skipped");
            return;
        };

        self.reset_body(scene, id);
        let body = RigidBodyBuilder::fixed().position(pose).user_data(user_data(id));
        self.attach(scene, id, body, builder);
    }

    /// Box, capsule, cylinder or hull body; claims the whole subtree
    fn generate_generic(&mut self, scene: &mut Scene, id: NodeId, transform: &Mat4) {
        let (pose, scale) = pose_and_scale(transform);
        let Some(builder) = shapes::generic(scene, id, &scale) else {
            log::debug!("node {id:?} cannot provide its collision shape; skipped");
            return;
        };

        for n in scene.subtree(id).into_iter().skip(1) {
            self.reset_body(scene, n);
            if let Some(node) = scene.get_mut(n) {
                node.physics = PhysicsKind::None;
            }
        }

        let Some(node) = scene.get(id) else {
            return;
        };
        let body = match node.physics {
            PhysicsKind::Dynamic => RigidBodyBuilder::dynamic(),
            PhysicsKind::Kinematic => RigidBodyBuilder::kinematic_position_based(),
            _ => RigidBodyBuilder::fixed(),
        };
        let mut body = body.position(pose).user_data(user_data(id));
        if !node.inertia {
            body = body.lock_rotations();
        }

        self.reset_body(scene, id);
        self.attach(scene, id, body, builder);
    }

    /// Kinematic capsule with locked rotations, moved by `move_actor`
    fn generate_actor(&mut self, scene: &mut Scene, id: NodeId, transform: &Mat4) {
        let (pose, scale) = pose_and_scale(transform);
        let Some(builder) = scene.get(id).map(|n| shapes::actor(n, &scale)) else {
            return;
        };
        let body = RigidBodyBuilder::kinematic_position_based()
            .position(pose)
            .lock_rotations()
            .user_data(user_data(id));

        self.reset_body(scene, id);
        self.attach(scene, id, body, builder);
    }

    fn attach(&mut self, scene: &mut Scene, id: NodeId, body: RigidBodyBuilder, collider: ColliderBuilder) {
        let Some(node) = scene.get_mut(id) else {
            return;
        };
        let mut collider = collider.user_data(user_data(id));
        if node.mass > 0.0 {
            collider = collider.mass(node.mass);
        }
        if node.friction >= 0.0 {
            collider = collider.friction(node.friction);
        }

        let handle = self.bodies.insert(body);
        self.colliders.insert_with_parent(collider, handle, &mut self.bodies);
        node.body = Some(handle);
        log::trace!("body {handle:?} for node {id:?} ({:?})", node.physics);
    }

    /// Release a node's body and colliders
    pub fn reset_body(&mut self, scene: &mut Scene, id: NodeId) {
        if let Some(handle) = scene.get_mut(id).and_then(|n| n.body.take()) {
            self.remove_body(handle);
        }
    }

    fn remove_body(&mut self, handle: RigidBodyHandle) {
        self.bodies.remove(
            handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    // ------------------------------------------------------------------
    // Simulation
    // ------------------------------------------------------------------

    /// Advance by `dt` seconds in fixed steps, then sync the root subtree.
    ///
    /// At most `max_substeps` steps run per call; time beyond that budget is
    /// dropped.
    pub fn logic(&mut self, scene: &mut Scene, dt: f32) {
        self.sweep(scene);
        self.push_kinematic(scene);

        let step = self.integration.dt;
        self.accumulator += dt;
        let mut steps = 0;
        while self.accumulator >= step && steps < self.max_substeps {
            self.step();
            self.accumulator -= step;
            steps += 1;
        }
        if self.accumulator >= step {
            log::debug!("physics fell behind; dropping {:.3}s", self.accumulator);
            self.accumulator = 0.0;
        }

        if let Some(root) = self.root.filter(|r| scene.contains(*r)) {
            self.sync(scene, root, SyncFlags::RECURSIVE);
        }
    }

    fn step(&mut self) {
        self.pipeline.step(
            &self.gravity,
            &self.integration,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            Some(&mut self.queries),
            &(),
            &(),
        );
    }

    /// Remove bodies whose node no longer exists
    fn sweep(&mut self, scene: &Scene) {
        let stale: Vec<RigidBodyHandle> = self
            .bodies
            .iter()
            .filter(|(_, body)| node_of(body.user_data).map_or(true, |n| !scene.contains(n)))
            .map(|(handle, _)| handle)
            .collect();
        if !stale.is_empty() {
            log::debug!("releasing {} bodies of destroyed nodes", stale.len());
        }
        for handle in stale {
            self.remove_body(handle);
        }
    }

    /// Kinematic bodies follow their nodes
    fn push_kinematic(&mut self, scene: &Scene) {
        for (_, body) in self.bodies.iter_mut() {
            let Some(id) = node_of(body.user_data) else {
                continue;
            };
            if scene.get(id).map(|n| n.physics) != Some(PhysicsKind::Kinematic) {
                continue;
            }
            let (pose, _) = pose_and_scale(&scene.world(id));
            body.set_next_kinematic_position(pose);
        }
    }

    /// Copy body poses into non-static nodes, keeping each node's scale.
    ///
    /// Kinematic bodies report the pose queued for the next step, so a node
    /// moved since the last step keeps its new pose.
    pub fn sync(&self, scene: &mut Scene, id: NodeId, flags: SyncFlags) {
        let targets = if flags.contains(SyncFlags::RECURSIVE) {
            scene.subtree(id)
        } else {
            vec![id]
        };
        for n in targets {
            self.sync_node(scene, n);
        }
    }

    fn sync_node(&self, scene: &mut Scene, id: NodeId) {
        let Some(node) = scene.get(id) else {
            return;
        };
        if !node.physics.is_synced() {
            return;
        }
        let Some(body) = node.body.and_then(|h| self.bodies.get(h)) else {
            return;
        };

        let pose = if body.is_kinematic() {
            body.next_position()
        } else {
            body.position()
        };
        let scale = scene.world(id).scale_factors();
        let world = pose.to_homogeneous() * Mat4::new_nonuniform_scaling(&scale);
        let to_parent = scene
            .parent(id)
            .and_then(|p| scene.world(p).try_inverse())
            .unwrap_or_else(Mat4::identity);
        scene.set_transform(id, to_parent * world);
    }

    /// Move an actor by `desired` (world space), sliding along obstacles.
    ///
    /// The move is applied to the body on the next step. Returns whether the
    /// actor ended up on the ground.
    pub fn move_actor(&mut self, scene: &Scene, id: NodeId, desired: Vec3, dt: f32) -> bool {
        let Some(handle) = scene.get(id).filter(|n| n.physics == PhysicsKind::Actor).and_then(|n| n.body) else {
            return false;
        };
        let Some(body) = self.bodies.get(handle) else {
            return false;
        };
        let Some(collider) = body.colliders().first().and_then(|c| self.colliders.get(*c)) else {
            return false;
        };

        let position = *body.position();
        let movement = self.character.move_shape(
            dt,
            &self.bodies,
            &self.colliders,
            &self.queries,
            collider.shape(),
            &position,
            desired,
            QueryFilter::default().exclude_rigid_body(handle),
            |_| {},
        );

        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_next_kinematic_translation(position.translation.vector + movement.translation);
        }
        movement.grounded
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Nearest hit on the segment `start..end`, as of the last step
    pub fn first_hit(&self, start: Vec3, end: Vec3) -> Option<RayHit> {
        let (ray, length) = Self::segment(start, end)?;
        let (collider, hit) = self.queries.cast_ray_and_get_normal(
            &self.bodies,
            &self.colliders,
            &ray,
            1.0,
            true,
            QueryFilter::default(),
        )?;
        self.ray_hit(&ray, length, collider, hit.toi, hit.normal)
    }

    /// Every hit on the segment `start..end`, nearest first
    pub fn hits(&self, start: Vec3, end: Vec3) -> Vec<RayHit> {
        let Some((ray, length)) = Self::segment(start, end) else {
            return Vec::new();
        };
        let mut hits = Vec::new();
        self.queries.intersections_with_ray(
            &self.bodies,
            &self.colliders,
            &ray,
            1.0,
            true,
            QueryFilter::default(),
            |collider, hit| {
                hits.extend(self.ray_hit(&ray, length, collider, hit.toi, hit.normal));
                true
            },
        );
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    fn segment(start: Vec3, end: Vec3) -> Option<(Ray, f32)> {
        let direction = end - start;
        let length = direction.norm();
        (length > f32::EPSILON).then(|| (Ray::new(start.into(), direction), length))
    }

    fn ray_hit(&self, ray: &Ray, length: f32, collider: ColliderHandle, toi: f32, normal: Vec3) -> Option<RayHit> {
        let node = node_of(self.colliders.get(collider)?.user_data)?;
        Some(RayHit {
            node,
            point: ray.point_at(toi).coords,
            normal,
            distance: toi * length,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::bounds::AABB;
    use crate::scene::{Mesh, MeshGeometry, Node, Space};
    use approx::assert_relative_eq;
    use std::cell::Cell;
    use std::rc::Rc;

    fn physics() -> Physics {
        Physics::new(&PhysicsConfig::default())
    }

    fn floor(scene: &mut Scene) -> NodeId {
        let node = Node::mesh(Mesh::new(MeshGeometry::quad(2.0)))
            .with_physics(PhysicsKind::Static, PhysicsShape::Mesh)
            .with_transform(Mat4::new_scaling(4.0));
        scene.insert(node)
    }

    #[test]
    fn test_static_mesh_becomes_trimesh() {
        let mut scene = Scene::new();
        let floor = floor(&mut scene);
        let mut physics = physics();

        physics.generate(&mut scene, floor, GenerateFlags::RECURSIVE);
        assert_eq!(physics.body_count(), 1);

        let handle = scene.get(floor).unwrap().body().unwrap();
        let collider = physics.bodies[handle].colliders()[0];
        let trimesh = physics.colliders[collider].shape().as_trimesh().unwrap();
        assert_eq!(trimesh.indices().len(), 2);
        // scale is baked into the vertices
        assert_relative_eq!(trimesh.vertices()[0].x, -4.0);

        physics.generate(&mut scene, floor, GenerateFlags::RECURSIVE);
        assert_eq!(physics.body_count(), 1);
    }

    #[test]
    fn test_nodes_without_shape_are_skipped() {
        let mut scene = Scene::new();
        let root = scene.insert(Node::new());
        scene.insert_child(root, Node::new().with_physics(PhysicsKind::Static, PhysicsShape::Mesh));
        scene.insert_child(root, Node::new().with_physics(PhysicsKind::Dynamic, PhysicsShape::Hull));
        scene.insert_child(root, Node::new().with_physics(PhysicsKind::Dynamic, PhysicsShape::Box));

        let mut physics = physics();
        physics.generate(&mut scene, root, GenerateFlags::RECURSIVE);
        assert_eq!(physics.body_count(), 0);
    }

    #[test]
    fn test_dynamic_body_falls_and_syncs() {
        let mut scene = Scene::new();
        let root = scene.insert(Node::new());
        let crate_node = scene.insert_child(
            root,
            Node::new()
                .with_box(AABB::from_center_extents(Vec3::zeros(), Vec3::repeat(0.5)))
                .with_physics(PhysicsKind::Dynamic, PhysicsShape::Box)
                .with_mass(2.0),
        );
        scene.set_position(crate_node, Vec3::new(0.0, 10.0, 0.0), Space::Parent);

        let mut physics = physics();
        physics.set_root(Some(root));
        physics.generate(&mut scene, root, GenerateFlags::RECURSIVE);
        physics.logic(&mut scene, 0.5);

        let y = scene.position(crate_node, Space::World).y;
        assert!(y < 10.0, "body should fall, got {y}");
        assert!(y > 9.0, "substep budget caps the step, got {y}");
    }

    #[test]
    fn test_kinematic_move_survives_short_frames() {
        let mut scene = Scene::new();
        let root = scene.insert(Node::new());
        let platform = scene.insert_child(
            root,
            Node::new()
                .with_box(AABB::from_center_extents(Vec3::zeros(), Vec3::repeat(0.5)))
                .with_physics(PhysicsKind::Kinematic, PhysicsShape::Box),
        );

        let mut physics = physics();
        physics.set_root(Some(root));
        physics.generate(&mut scene, root, GenerateFlags::RECURSIVE);

        scene.move_by(platform, Vec3::new(1.0, 0.0, 0.0), Space::Parent);
        for _ in 0..3 {
            physics.logic(&mut scene, 1.0 / 144.0);
            assert_relative_eq!(scene.position(platform, Space::World).x, 1.0, epsilon = 1e-5);
        }

        // the pushed pose reaches the body once a step runs
        physics.logic(&mut scene, 1.0 / 60.0);
        let handle = scene.get(platform).unwrap().body().unwrap();
        assert_relative_eq!(physics.bodies[handle].translation().x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(scene.position(platform, Space::World).x, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_static_bodies_are_not_synced() {
        let mut scene = Scene::new();
        let root = scene.insert(Node::new());
        let wall = scene.insert_child(
            root,
            Node::new()
                .with_box(AABB::from_center_extents(Vec3::zeros(), Vec3::repeat(0.5)))
                .with_physics(PhysicsKind::Static, PhysicsShape::Box),
        );

        let mut physics = physics();
        physics.set_root(Some(root));
        physics.generate(&mut scene, root, GenerateFlags::RECURSIVE);

        scene.set_position(wall, Vec3::new(0.0, 3.0, 0.0), Space::Parent);
        physics.logic(&mut scene, 0.1);
        assert_relative_eq!(scene.position(wall, Space::World), Vec3::new(0.0, 3.0, 0.0));

        let handle = scene.get(wall).unwrap().body().unwrap();
        assert_relative_eq!(physics.bodies[handle].translation().y, 0.0);
    }

    #[test]
    fn test_sync_without_recursion_touches_one_node() {
        let mut scene = Scene::new();
        let root = scene.insert(Node::new());
        let bounds = AABB::from_center_extents(Vec3::zeros(), Vec3::repeat(0.5));
        let a = scene.insert_child(
            root,
            Node::new().with_box(bounds).with_physics(PhysicsKind::Dynamic, PhysicsShape::Box),
        );
        let b = scene.insert_child(
            root,
            Node::new().with_box(bounds).with_physics(PhysicsKind::Dynamic, PhysicsShape::Box),
        );
        scene.set_position(b, Vec3::new(5.0, 0.0, 0.0), Space::Parent);

        let mut physics = physics();
        physics.generate(&mut scene, root, GenerateFlags::RECURSIVE);
        for _ in 0..10 {
            physics.step();
        }

        physics.sync(&mut scene, a, SyncFlags::empty());
        assert!(scene.position(a, Space::World).y < 0.0);
        assert_relative_eq!(scene.position(b, Space::World), Vec3::new(5.0, 0.0, 0.0));

        physics.sync(&mut scene, root, SyncFlags::RECURSIVE);
        assert!(scene.position(b, Space::World).y < 0.0);
    }

    #[test]
    fn test_composite_releases_claimed_bodies() {
        let mut scene = Scene::new();
        let parent = scene.insert(
            Node::mesh(Mesh::new(MeshGeometry::cuboid(Vec3::repeat(1.0))))
                .with_physics(PhysicsKind::Dynamic, PhysicsShape::Hull),
        );
        let child = scene.insert_child(
            parent,
            Node::mesh(Mesh::new(MeshGeometry::cuboid(Vec3::repeat(0.5))))
                .with_physics(PhysicsKind::Dynamic, PhysicsShape::Box),
        );

        let mut physics = physics();
        physics.generate(&mut scene, child, GenerateFlags::empty());
        assert_eq!(physics.body_count(), 1);

        physics.generate(&mut scene, parent, GenerateFlags::RECURSIVE);
        assert_eq!(physics.body_count(), 1);
        assert!(scene.get(child).unwrap().body().is_none());
        assert!(scene.get(parent).unwrap().body().is_some());
    }

    #[test]
    fn test_generic_body_claims_subtree() {
        let mut scene = Scene::new();
        let parent = scene.insert(
            Node::mesh(Mesh::new(MeshGeometry::cuboid(Vec3::repeat(1.0))))
                .with_physics(PhysicsKind::Dynamic, PhysicsShape::Hull),
        );
        let child = scene.insert_child(
            parent,
            Node::mesh(Mesh::new(MeshGeometry::cuboid(Vec3::repeat(0.5))))
                .with_physics(PhysicsKind::Dynamic, PhysicsShape::Box),
        );

        let mut physics = physics();
        physics.generate(&mut scene, parent, GenerateFlags::RECURSIVE);
        assert_eq!(physics.body_count(), 1);
        assert_eq!(scene.get(child).unwrap().physics, PhysicsKind::None);
    }

    #[test]
    fn test_on_generate_fires_once() {
        let mut scene = Scene::new();
        let floor = floor(&mut scene);
        let mut physics = physics();

        let count = Rc::new(Cell::new(0));
        let counter = Rc::clone(&count);
        physics.on_generate(move || counter.set(counter.get() + 1));

        physics.generate(&mut scene, floor, GenerateFlags::empty());
        physics.generate(&mut scene, floor, GenerateFlags::empty());
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_ray_hits_map_to_nodes() {
        let mut scene = Scene::new();
        let floor = floor(&mut scene);
        let mut physics = physics();
        physics.generate(&mut scene, floor, GenerateFlags::RECURSIVE);
        physics.logic(&mut scene, 1.0 / 60.0);

        let hit = physics.first_hit(Vec3::new(1.0, 5.0, 1.0), Vec3::new(1.0, -5.0, 1.0)).unwrap();
        assert_eq!(hit.node, floor);
        assert_relative_eq!(hit.point, Vec3::new(1.0, 0.0, 1.0), epsilon = 1e-4);
        assert_relative_eq!(hit.distance, 5.0, epsilon = 1e-4);
        assert_relative_eq!(hit.normal.y.abs(), 1.0, epsilon = 1e-4);

        assert_eq!(physics.hits(Vec3::new(1.0, 5.0, 1.0), Vec3::new(1.0, -5.0, 1.0)).len(), 1);
        assert!(physics.first_hit(Vec3::new(9.0, 5.0, 0.0), Vec3::new(9.0, -5.0, 0.0)).is_none());
        assert!(physics.hits(Vec3::zeros(), Vec3::zeros()).is_empty());
    }

    #[test]
    fn test_destroyed_nodes_release_bodies() {
        let mut scene = Scene::new();
        let floor = floor(&mut scene);
        let mut physics = physics();
        physics.generate(&mut scene, floor, GenerateFlags::empty());
        assert_eq!(physics.body_count(), 1);

        scene.destroy(floor);
        physics.logic(&mut scene, 0.0);
        assert_eq!(physics.body_count(), 0);
    }

    #[test]
    fn test_actor_is_kinematic_capsule() {
        let mut scene = Scene::new();
        let actor = scene.insert(
            Node::new()
                .with_box(AABB::from_center_extents(Vec3::zeros(), Vec3::new(0.4, 1.0, 0.4)))
                .with_physics(PhysicsKind::Actor, PhysicsShape::Capsule),
        );
        let mut physics = physics();
        physics.generate(&mut scene, actor, GenerateFlags::empty());

        let handle = scene.get(actor).unwrap().body().unwrap();
        assert!(physics.bodies[handle].is_kinematic());
        let collider = physics.bodies[handle].colliders()[0];
        assert!(physics.colliders[collider].shape().as_capsule().is_some());
    }

    #[test]
    fn test_gravity_accessors() {
        let mut physics = physics();
        assert_relative_eq!(physics.gravity(), Vec3::new(0.0, -9.8, 0.0));
        physics.set_gravity(Vec3::zeros());
        assert_eq!(physics.gravity(), Vec3::zeros());
    }
}
