//! Camera node payload
//!
//! The camera's position and orientation are its node's world transform;
//! the pipeline builds the view matrix as the inverse of that transform.

use crate::foundation::math::utils::deg_to_rad;
use crate::scene::node::NodeHooks;

/// Viewpoint used by the pipeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Vertical field of view in degrees (perspective projection only)
    pub fov: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self { fov: 80.0 }
    }
}

impl Camera {
    /// Camera with the given vertical field of view in degrees
    pub fn with_fov(fov: f32) -> Self {
        Self { fov }
    }

    /// Field of view in radians
    pub fn fov_radians(&self) -> f32 {
        deg_to_rad(self.fov)
    }
}

impl NodeHooks for Camera {}
