//! Light node payload
//!
//! Position and direction come from the owning node's world transform (the
//! light shines down its local -Z axis).

use crate::foundation::math::Vec3;
use crate::scene::node::NodeHooks;

/// Light types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LightType {
    /// Directional light (like sunlight)
    Directional,
    /// Point light (like a lightbulb)
    #[default]
    Point,
    /// Spot light (like a flashlight)
    Spot,
}

/// Light source
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    /// Light type
    pub light_type: LightType,
    /// Light color
    pub color: Vec3,
    /// Light intensity
    pub intensity: f32,
    /// Light range (for point/spot lights)
    pub range: f32,
    /// Outer cone angle for spot lights (in radians)
    pub cone_angle: f32,
}

impl Default for Light {
    fn default() -> Self {
        Self::point(Vec3::new(1.0, 1.0, 1.0), 1.0, 10.0)
    }
}

impl Light {
    /// Create a directional light
    pub fn directional(color: Vec3, intensity: f32) -> Self {
        Self {
            light_type: LightType::Directional,
            color,
            intensity,
            range: f32::INFINITY,
            cone_angle: 0.0,
        }
    }

    /// Create a point light
    pub fn point(color: Vec3, intensity: f32, range: f32) -> Self {
        Self {
            light_type: LightType::Point,
            color,
            intensity,
            range,
            cone_angle: 0.0,
        }
    }

    /// Create a spot light
    pub fn spot(color: Vec3, intensity: f32, range: f32, cone_angle: f32) -> Self {
        Self {
            light_type: LightType::Spot,
            color,
            intensity,
            range,
            cone_angle,
        }
    }
}

impl NodeHooks for Light {}
