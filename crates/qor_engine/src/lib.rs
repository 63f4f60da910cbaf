//! # Qor Engine
//!
//! Runtime core of a small 3D/2D game engine.
//!
//! ## Features
//!
//! - **Scene Graph**: arena-owned node tree with lazily cached world
//!   transforms and bounding boxes
//! - **Render Pipeline**: two-pass render state machine over an abstract
//!   graphics backend, with a task queue for off-thread graphics work
//! - **Partitioning**: visibility sets and edge-triggered collision events
//! - **Physics**: `rapier3d` bodies generated from scene nodes and synced back
//! - **Assets**: OBJ models, PNG textures and JSON node documents
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use qor_engine::prelude::*;
//!
//! struct MyApp;
//!
//! impl Application for MyApp {
//!     fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError> {
//!         let ship = engine.spawn_model("ship.obj")?;
//!         engine.physics.generate(&mut engine.scene, ship, GenerateFlags::RECURSIVE);
//!         Ok(())
//!     }
//!
//!     fn update(&mut self, engine: &mut Engine, delta_time: f32) -> Result<(), AppError> {
//!         if engine.delta_time() > 1.0 {
//!             engine.quit();
//!         }
//!         Ok(())
//!     }
//!
//!     fn cleanup(&mut self, engine: &mut Engine) {}
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::load_from_file("engine.toml")?;
//!     let mut engine = Engine::new(config, Box::new(HeadlessBackend::new()))?;
//!     engine.run(&mut MyApp)?;
//!     Ok(())
//! }
//! ```

#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc, clippy::must_use_candidate)]

pub mod core;
pub mod config;
pub mod foundation;
pub mod scene;
pub mod render;
pub mod physics;
pub mod assets;

mod application;
mod engine;

pub use application::{AppError, Application};
pub use engine::{Engine, EngineError};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        AppError, Application,
        Engine, EngineError,
        assets::{AssetError, Texture},
        config::Config,
        core::config::{AssetConfig, EngineConfig, PhysicsConfig, PipelineConfig},
        foundation::{
            bounds::AABB,
            math::{Mat4, Mat4Ext, Quat, Transform, Vec2, Vec3},
            time::{Stopwatch, Timer},
        },
        physics::{GenerateFlags, Physics, RayHit, SyncFlags},
        render::{GraphicsBackend, HeadlessBackend, Pass, PassType, Pipeline},
        scene::{
            BasicPartitioner, Camera, CollisionCallbacks, Light, Mesh, MeshGeometry, Node, NodeHooks, NodeId,
            NodeKind, Partitioner, PhysicsKind, PhysicsShape, Scene, Space,
        },
    };
}
