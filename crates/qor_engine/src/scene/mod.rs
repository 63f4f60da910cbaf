//! # Scene Graph
//!
//! Hierarchical node tree with lazily cached world transforms and bounding
//! boxes. Nodes live in a generational arena owned by [`Scene`]; a [`NodeId`]
//! is the non-owning handle used for parent links and by the pipeline,
//! partitioner and physics bridge. A destroyed node's id simply stops
//! resolving, so holders never need to be told.
//!
//! ## Ownership
//!
//! A node is owned by its parent's child list. Parentless nodes are roots
//! owned by the caller. `Scene::remove` and `Scene::detach` turn a child back
//! into a root; `Scene::destroy` drops a node and its whole subtree.

pub mod node;
pub mod graph;
pub mod mesh;
pub mod camera;
pub mod light;
pub mod partitioner;
pub mod collision;

pub use camera::Camera;
pub use collision::{CollisionCallback, CollisionCallbacks, OverlapTest, WorldBoxOverlap};
pub use graph::{Behavior, Scene};
pub use light::{Light, LightType};
pub use mesh::{Mesh, MeshGeometry};
pub use node::{Node, NodeHooks, NodeKind, PhysicsKind, PhysicsShape};
pub use partitioner::{BasicPartitioner, Partitioner};

use bitflags::bitflags;

slotmap::new_key_type! {
    /// Handle to a node in a [`Scene`]
    pub struct NodeId;
}

/// Coordinate frame for transform operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Space {
    /// Relative to the node's own orientation
    Local,
    /// Relative to the parent's frame
    #[default]
    Parent,
    /// Fully composed back to the root
    World,
}

bitflags! {
    /// Options for [`Scene::remove`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RemoveFlags: u32 {
        /// Search the whole subtree, not only direct children
        const SEARCH_SUBNODES = 1 << 0;
    }
}

bitflags! {
    /// Options for [`Scene::each`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EachFlags: u32 {
        /// Visit the starting node
        const INCLUDE_SELF = 1 << 0;
        /// Visit all descendants instead of direct children only
        const RECURSIVE = 1 << 1;
    }
}

impl Default for EachFlags {
    fn default() -> Self {
        Self::INCLUDE_SELF | Self::RECURSIVE
    }
}
