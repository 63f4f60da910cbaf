//! Frame driver
//!
//! One [`Engine::frame`] runs the subsystems strictly in order: scene logic,
//! physics step and sync, partitioning, rendering. Nothing else mutates the
//! scene while a frame is in progress.

use std::path::Path;

use crate::application::Application;
use crate::assets::{obj_loader, AssetError, AssetPaths};
use crate::core::config::{ConfigError, EngineConfig};
use crate::foundation::logging;
use crate::foundation::time::Timer;
use crate::physics::Physics;
use crate::render::{GraphicsBackend, Pipeline, RenderError};
use crate::scene::{Node, NodeId, Scene};
use thiserror::Error;

/// Main engine struct
///
/// Owns the scene and every subsystem that works on it.
pub struct Engine {
    /// Scene graph
    pub scene: Scene,

    /// Physics bridge
    pub physics: Physics,

    /// Render pipeline (also owns the partitioner)
    pub pipeline: Pipeline,

    root: NodeId,
    assets: AssetPaths,
    timer: Timer,
    config: EngineConfig,
    running: bool,
}

impl Engine {
    /// Create an engine, loading the pipeline shaders from
    /// `config.pipeline.shader_dir`.
    ///
    /// Also installs the logger at `config.logging.level`.
    pub fn new(config: EngineConfig, backend: Box<dyn GraphicsBackend>) -> Result<Self, EngineError> {
        logging::init(&config.logging.level);
        config.validate()?;

        log::info!("Initializing engine...");
        let pipeline = Pipeline::from_config(backend, config.pipeline.clone())?;
        Ok(Self::with_pipeline(config, pipeline))
    }

    /// Create an engine around an existing pipeline
    pub fn with_pipeline(config: EngineConfig, mut pipeline: Pipeline) -> Self {
        let mut scene = Scene::new();
        let root = scene.insert(Node::new().with_name("root"));

        let mut physics = Physics::new(&config.physics);
        physics.set_root(Some(root));
        pipeline.set_root(Some(root));

        Self {
            scene,
            physics,
            pipeline,
            root,
            assets: AssetPaths::new(&config.assets),
            timer: Timer::new(),
            config,
            running: true,
        }
    }

    /// Run frames until the application or the engine stops the loop
    pub fn run<T: Application>(&mut self, app: &mut T) -> Result<(), EngineError> {
        app.initialize(self)
            .map_err(|e| EngineError::Application(format!("App initialization: {e}")))?;

        log::info!("Starting main loop...");
        self.running = true;
        let result = self.run_loop(app);

        app.cleanup(self);
        log::info!(
            "Engine shutdown complete ({} frames, {:.1} fps average)",
            self.timer.frame_count(),
            self.timer.average_fps()
        );
        result
    }

    fn run_loop<T: Application>(&mut self, app: &mut T) -> Result<(), EngineError> {
        while self.running {
            let delta_time = self.timer.tick();
            app.update(self, delta_time)
                .map_err(|e| EngineError::Application(format!("App update: {e}")))?;
            if self.running {
                self.frame(delta_time);
            }
        }
        Ok(())
    }

    /// Advance and draw one frame
    pub fn frame(&mut self, delta_time: f32) {
        self.scene.logic(self.root, delta_time);
        self.physics.logic(&mut self.scene, delta_time);

        let frustum = if self.config.pipeline.frustum_culling {
            self.pipeline.frustum(&self.scene)
        } else {
            None
        };
        let partitioner = self.pipeline.partitioner_mut();
        partitioner.logic(&self.scene, delta_time);
        partitioner.set_frustum(frustum);
        partitioner.partition(&self.scene, self.root);

        self.pipeline.render(&self.scene);
    }

    /// Load an OBJ model from the asset directory and attach it under the root
    pub fn spawn_model(&mut self, name: impl AsRef<Path>) -> Result<NodeId, AssetError> {
        let path = self.assets.resolve(name);
        let model = obj_loader::load_composite(&mut self.scene, path)?;
        self.scene.add(self.root, model);
        Ok(model)
    }

    /// Use `camera` for rendering and culling
    pub fn set_camera(&mut self, camera: Option<NodeId>) {
        self.pipeline.set_camera(camera);
    }

    /// Request engine shutdown
    pub fn quit(&mut self) {
        log::info!("Engine shutdown requested");
        self.running = false;
    }

    /// True until `quit` is called
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Scene root; everything the engine ticks, simulates and draws hangs
    /// below it
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Asset path resolution
    pub fn assets(&self) -> &AssetPaths {
        &self.assets
    }

    /// Configuration the engine was created with
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get the current frame delta time
    pub fn delta_time(&self) -> f32 {
        self.timer.delta_time()
    }
}

/// Engine errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Subsystem failed to start
    #[error("Initialization failed: {0}")]
    InitializationFailed(String),

    /// Rendering error
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Asset loading error
    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Application error
    #[error("Application error: {0}")]
    Application(String),
}
