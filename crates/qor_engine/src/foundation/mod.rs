//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Math types and operations
//! - Bounding volumes and frustum culling
//! - Lazily recomputed cached values
//! - Callback signals
//! - Time management
//! - Logging utilities

pub mod math;
pub mod bounds;
pub mod cached;
pub mod signal;
pub mod time;
pub mod logging;
