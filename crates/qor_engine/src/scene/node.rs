//! Scene node data
//!
//! A [`Node`] carries everything that belongs to one entity: local transform,
//! cached world transform and box, visibility, physics metadata and its
//! variant payload. Operations that need the rest of the tree (parenting,
//! world-space queries, rendering) live on [`Scene`](super::Scene).

use std::fmt;

use rapier3d::dynamics::RigidBodyHandle;

use crate::foundation::bounds::AABB;
use crate::foundation::cached::Cached;
use crate::foundation::math::{Mat4, Vec3};
use crate::foundation::signal::Signal;
use crate::render::pass::Pass;
use crate::scene::camera::Camera;
use crate::scene::graph::Behavior;
use crate::scene::light::Light;
use crate::scene::mesh::Mesh;
use crate::scene::{NodeId, Space};

/// How the physics bridge represents a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PhysicsKind {
    /// Not simulated
    #[default]
    None,
    /// Fixed collider; transform baked at generation time
    Static,
    /// Simulated rigid body
    Dynamic,
    /// Moved by the application, pushes dynamic bodies
    Kinematic,
    /// Character controller capsule
    Actor,
}

impl PhysicsKind {
    /// True for kinds whose transform is driven by the simulation
    pub fn is_synced(self) -> bool {
        matches!(self, Self::Dynamic | Self::Kinematic | Self::Actor)
    }
}

/// Collision shape requested for a physics node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PhysicsShape {
    /// Triangle mesh from render geometry (static only)
    #[default]
    Mesh,
    /// Convex hull of the vertices
    Hull,
    /// Cuboid from the local box
    Box,
    /// Y-aligned capsule fitted to the local box
    Capsule,
    /// Y-aligned cylinder fitted to the local box
    Cylinder,
}

/// Per-variant render and logic hooks.
///
/// Render hooks run in the order `before_render`, `before_render_self`,
/// `render_self`, `after_render_self`, children, `after_render`. The three
/// `*_self` hooks are skipped when the node is not self-visible.
#[allow(unused_variables)]
pub trait NodeHooks {
    /// Before anything else for this subtree
    fn before_render(&self, node: &Node, pass: &mut Pass<'_>) {}

    /// Before drawing this node
    fn before_render_self(&self, node: &Node, pass: &mut Pass<'_>) {}

    /// Draw this node; the pass matrix is already the node's world transform
    fn render_self(&self, node: &Node, pass: &mut Pass<'_>) {}

    /// After drawing this node
    fn after_render_self(&self, node: &Node, pass: &mut Pass<'_>) {}

    /// After the children have rendered
    fn after_render(&self, node: &Node, pass: &mut Pass<'_>) {}

    /// Per-tick variant logic, run after the node's behaviors
    fn logic_self(&mut self, dt: f32) {}
}

struct NoHooks;

impl NodeHooks for NoHooks {}

/// Node variant payload
#[derive(Default)]
pub enum NodeKind {
    /// Grouping node with no payload
    #[default]
    Empty,
    /// Renderable mesh
    Mesh(Mesh),
    /// Viewpoint used by the pipeline
    Camera(Camera),
    /// Light source collected by the partitioner
    Light(Light),
    /// Application-defined hooks
    Custom(Box<dyn NodeHooks>),
}

impl NodeKind {
    /// Hooks for this variant
    pub fn hooks(&self) -> &dyn NodeHooks {
        match self {
            Self::Empty => &NoHooks,
            Self::Mesh(mesh) => mesh,
            Self::Camera(camera) => camera,
            Self::Light(light) => light,
            Self::Custom(hooks) => hooks.as_ref(),
        }
    }

    /// Mutable hooks for this variant
    pub fn hooks_mut(&mut self) -> Option<&mut dyn NodeHooks> {
        let hooks: &mut dyn NodeHooks = match self {
            Self::Empty => return None,
            Self::Mesh(mesh) => mesh,
            Self::Camera(camera) => camera,
            Self::Light(light) => light,
            Self::Custom(hooks) => hooks.as_mut(),
        };
        Some(hooks)
    }
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Empty"),
            Self::Mesh(mesh) => f.debug_tuple("Mesh").field(mesh).finish(),
            Self::Camera(camera) => f.debug_tuple("Camera").field(camera).finish(),
            Self::Light(light) => f.debug_tuple("Light").field(light).finish(),
            Self::Custom(_) => write!(f, "Custom"),
        }
    }
}

/// Scene-graph entity
pub struct Node {
    /// Debug name
    pub name: String,
    /// Variant payload and hooks
    pub kind: NodeKind,

    /// Subtree visibility; hides this node and all descendants
    pub visible: bool,
    /// Self visibility; skips only this node's own render hooks
    pub self_visible: bool,

    /// Physics representation
    pub physics: PhysicsKind,
    /// Collision shape
    pub physics_shape: PhysicsShape,
    /// Body mass; zero lets the physics library derive it
    pub mass: f32,
    /// Surface friction; negative keeps the library default
    pub friction: f32,
    /// When false the body's rotations are locked
    pub inertia: bool,

    /// Integrated each tick when nonzero
    pub velocity: Vec3,
    /// Integrated into velocity each tick when nonzero
    pub acceleration: Vec3,
    /// Frame in which velocity moves the node (`Local` or `Parent`)
    pub velocity_space: Space,

    /// Attached configuration document
    pub config: Option<serde_json::Value>,

    pub(crate) local: Mat4,
    pub(crate) world: Cached<Mat4>,
    pub(crate) bounds: AABB,
    pub(crate) world_box: Cached<AABB>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) layer: u32,
    pub(crate) body: Option<RigidBodyHandle>,
    pub(crate) behaviors: Vec<Behavior>,
    pub(crate) on_add: Signal<(NodeId, NodeId)>,
}

impl Default for Node {
    fn default() -> Self {
        Self::new()
    }
}

impl Node {
    /// Create an empty node with an identity transform and no geometry
    pub fn new() -> Self {
        Self {
            name: String::new(),
            kind: NodeKind::Empty,
            visible: true,
            self_visible: true,
            physics: PhysicsKind::None,
            physics_shape: PhysicsShape::default(),
            mass: 0.0,
            friction: -1.0,
            inertia: true,
            velocity: Vec3::zeros(),
            acceleration: Vec3::zeros(),
            velocity_space: Space::Parent,
            config: None,
            local: Mat4::identity(),
            world: Cached::dirty(Mat4::identity()),
            bounds: AABB::zero(),
            world_box: Cached::dirty(AABB::zero()),
            parent: None,
            children: Vec::new(),
            layer: 0,
            body: None,
            behaviors: Vec::new(),
            on_add: Signal::new(),
        }
    }

    /// Mesh node; the local box is taken from the geometry
    pub fn mesh(mesh: Mesh) -> Self {
        let bounds = mesh.geometry().bounds();
        Self::new().with_kind(NodeKind::Mesh(mesh)).with_box(bounds)
    }

    /// Camera node
    pub fn camera(camera: Camera) -> Self {
        Self::new().with_kind(NodeKind::Camera(camera))
    }

    /// Light node
    pub fn light(light: Light) -> Self {
        Self::new().with_kind(NodeKind::Light(light))
    }

    /// Node driven by application hooks
    pub fn custom(hooks: impl NodeHooks + 'static) -> Self {
        Self::new().with_kind(NodeKind::Custom(Box::new(hooks)))
    }

    /// Set the debug name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the variant payload
    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the local transform
    pub fn with_transform(mut self, local: Mat4) -> Self {
        self.local = local;
        self
    }

    /// Set the local bounding box
    pub fn with_box(mut self, bounds: AABB) -> Self {
        self.bounds = bounds;
        self
    }

    /// Set the physics kind and shape
    pub fn with_physics(mut self, kind: PhysicsKind, shape: PhysicsShape) -> Self {
        self.physics = kind;
        self.physics_shape = shape;
        self
    }

    /// Set the body mass
    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    /// Attach a configuration document
    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = Some(config);
        self
    }

    /// Local transform
    pub fn local(&self) -> &Mat4 {
        &self.local
    }

    /// Local bounding box
    pub fn local_box(&self) -> &AABB {
        &self.bounds
    }

    /// Parent back-reference
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in render order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Layer tag shared by a whole attached subtree
    pub fn layer(&self) -> u32 {
        self.layer
    }

    /// Handle of the rigid body created by the physics bridge
    pub fn body(&self) -> Option<RigidBodyHandle> {
        self.body
    }

    /// True when this node is a light
    pub fn is_light(&self) -> bool {
        matches!(self.kind, NodeKind::Light(_))
    }

    /// Mesh payload, if any
    pub fn as_mesh(&self) -> Option<&Mesh> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    /// Camera payload, if any
    pub fn as_camera(&self) -> Option<&Camera> {
        match &self.kind {
            NodeKind::Camera(camera) => Some(camera),
            _ => None,
        }
    }

    /// Look up a string field in the attached configuration document
    pub fn config_str(&self, key: &str) -> Option<&str> {
        self.config.as_ref()?.get(key)?.as_str()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("parent", &self.parent)
            .field("children", &self.children.len())
            .field("physics", &self.physics)
            .finish_non_exhaustive()
    }
}
