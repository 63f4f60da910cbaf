//! # Core Engine Module
//!
//! Shared configuration types used by every subsystem.

pub mod config;

pub use config::{
    AssetConfig,
    Config,
    ConfigError,
    EngineConfig,
    LoggingConfig,
    PhysicsConfig,
    PipelineConfig,
};
