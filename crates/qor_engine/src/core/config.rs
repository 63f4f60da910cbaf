//! # Unified Configuration System
//!
//! Every subsystem reads its settings from one section of [`EngineConfig`]:
//!
//! - **Logging**: default filter handed to `env_logger`
//! - **Physics**: gravity, fixed step and substep budget
//! - **Pipeline**: clear colour, projection, shader location, viewport
//! - **Assets**: base directory for meshes, textures and node documents
//!
//! All sections implement `Default` and deserialize with `#[serde(default)]`,
//! so a config file only needs to list the values it changes.

use serde::{Deserialize, Serialize};

pub use crate::config::{Config, ConfigError};

/// # Logging Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `env_logger` filter, overridden by `RUST_LOG`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// # Physics Configuration
///
/// The bridge always advances the simulation in `fixed_step` increments and
/// never more than `max_substeps` of them per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// World gravity
    pub gravity: [f32; 3],
    /// Nominal simulation step in seconds
    pub fixed_step: f32,
    /// Maximum simulation steps per `logic` call
    pub max_substeps: u32,
}

impl PhysicsConfig {
    /// Create the default physics configuration
    pub fn new() -> Self {
        Self {
            gravity: [0.0, -9.8, 0.0],
            fixed_step: 1.0 / 60.0,
            max_substeps: 7,
        }
    }

    /// Set gravity
    pub fn with_gravity(mut self, x: f32, y: f32, z: f32) -> Self {
        self.gravity = [x, y, z];
        self
    }

    /// Set the fixed step in seconds
    pub fn with_fixed_step(mut self, step: f32) -> Self {
        self.fixed_step = step;
        self
    }

    /// Set the substep budget
    pub fn with_max_substeps(mut self, substeps: u32) -> Self {
        self.max_substeps = substeps;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fixed_step > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "physics.fixed_step must be positive, got {}",
                self.fixed_step
            )));
        }
        if self.max_substeps == 0 {
            return Err(ConfigError::Invalid(
                "physics.max_substeps must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Pipeline Configuration
///
/// Projection and presentation settings for the render pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Clear colour (RGBA)
    pub background: [f32; 4],
    /// Use an orthographic projection over the viewport instead of perspective
    pub ortho: bool,
    /// Default vertical field of view in degrees, used when the camera has none
    pub fov: f32,
    /// Near clip plane for perspective projection
    pub near: f32,
    /// Far clip plane for perspective projection
    pub far: f32,
    /// Directory holding `<name>.vp` / `<name>.fp` shader sources
    pub shader_dir: String,
    /// Shader name for the base pass
    pub base_shader: String,
    /// Shader name for the blended pass
    pub normal_shader: String,
    /// Viewport size in pixels
    pub viewport: [u32; 2],
    /// Hand the camera frustum to the partitioner each frame
    pub frustum_culling: bool,
}

impl PipelineConfig {
    /// Create the default pipeline configuration
    pub fn new() -> Self {
        Self {
            background: [0.0, 0.0, 0.0, 1.0],
            ortho: false,
            fov: 80.0,
            near: 0.01,
            far: 1000.0,
            shader_dir: "shaders".to_string(),
            base_shader: "base".to_string(),
            normal_shader: "normal".to_string(),
            viewport: [1024, 768],
            frustum_culling: false,
        }
    }

    /// Set the clear colour
    pub fn with_background(mut self, r: f32, g: f32, b: f32, a: f32) -> Self {
        self.background = [r, g, b, a];
        self
    }

    /// Use an orthographic projection
    pub fn with_ortho(mut self, ortho: bool) -> Self {
        self.ortho = ortho;
        self
    }

    /// Set the viewport size
    pub fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport = [width, height];
        self
    }

    /// Set the shader directory
    pub fn with_shader_dir(mut self, dir: impl Into<String>) -> Self {
        self.shader_dir = dir.into();
        self
    }

    /// Enable frustum culling
    pub fn with_frustum_culling(mut self, enabled: bool) -> Self {
        self.frustum_culling = enabled;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.viewport[0] == 0 || self.viewport[1] == 0 {
            return Err(ConfigError::Invalid(format!(
                "pipeline.viewport must be non-zero, got {:?}",
                self.viewport
            )));
        }
        if !(self.near > 0.0 && self.far > self.near) {
            return Err(ConfigError::Invalid(format!(
                "pipeline clip planes must satisfy 0 < near < far, got {} / {}",
                self.near, self.far
            )));
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Asset Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Base directory for assets
    pub assets_dir: String,
}

impl AssetConfig {
    /// Create a new asset configuration
    pub fn new() -> Self {
        Self {
            assets_dir: "resources".to_string(),
        }
    }

    /// Set assets directory
    pub fn with_assets_dir(mut self, dir: impl Into<String>) -> Self {
        self.assets_dir = dir.into();
        self
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Engine Configuration
///
/// Top-level configuration that encompasses all engine subsystems.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Logging section
    pub logging: LoggingConfig,
    /// Physics section
    pub physics: PhysicsConfig,
    /// Pipeline section
    pub pipeline: PipelineConfig,
    /// Asset section
    pub assets: AssetConfig,
}

impl EngineConfig {
    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.logging.level = level.into();
        self
    }

    /// Replace the physics section
    pub fn with_physics(mut self, physics: PhysicsConfig) -> Self {
        self.physics = physics;
        self
    }

    /// Replace the pipeline section
    pub fn with_pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Replace the asset section
    pub fn with_assets(mut self, assets: AssetConfig) -> Self {
        self.assets = assets;
        self
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.physics.validate()?;
        self.pipeline.validate()?;
        Ok(())
    }
}

impl Config for EngineConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.physics.max_substeps, 7);
        assert_eq!(config.physics.gravity, [0.0, -9.8, 0.0]);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let config = EngineConfig::default()
            .with_physics(PhysicsConfig::new().with_fixed_step(0.0));
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = EngineConfig::default()
            .with_pipeline(PipelineConfig::new().with_viewport(0, 600));
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            [logging]
            level = "debug"

            [pipeline]
            ortho = true
            "#,
        )
        .unwrap();

        assert_eq!(config.logging.level, "debug");
        assert!(config.pipeline.ortho);
        assert_eq!(config.pipeline.viewport, [1024, 768]);
        assert_eq!(config.physics, PhysicsConfig::default());
    }

    #[test]
    fn test_save_and_load_ron() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.ron");

        let config = EngineConfig::default()
            .with_log_level("warn")
            .with_physics(PhysicsConfig::new().with_gravity(0.0, -1.0, 0.0));
        config.save_to_file(&path).unwrap();

        let loaded = EngineConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_unknown_extension() {
        let result = EngineConfig::load_from_file("engine.yaml");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }
}
