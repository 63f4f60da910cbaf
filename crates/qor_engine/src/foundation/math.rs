//! Math utilities and types
//!
//! Provides the nalgebra aliases used across the engine plus the handful of
//! affine-matrix helpers the scene graph needs (translation, orientation and
//! scale access on a column-major `Mat4`).

pub use nalgebra::{
    Vector2, Vector3, Vector4,
    Matrix3, Matrix4,
    Quaternion,
    Unit,
};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Below this a scale factor or determinant is treated as degenerate
pub const EPSILON: f32 = 1.0e-6;

/// Transform representing position, rotation, and scale
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Convert to a transformation matrix
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Decompose an affine matrix into translation, rotation and scale.
    ///
    /// Shear is discarded. A degenerate (zero) scale axis keeps a unit column
    /// so the rotation stays well defined.
    pub fn from_matrix(matrix: &Mat4) -> Self {
        let position = matrix.translation();
        let scale = matrix.scale_factors();

        let safe = |s: f32| if s.abs() < EPSILON { 1.0 } else { s };
        let rotation_matrix = Mat3::from_columns(&[
            matrix.fixed_view::<3, 1>(0, 0) / safe(scale.x),
            matrix.fixed_view::<3, 1>(0, 1) / safe(scale.y),
            matrix.fixed_view::<3, 1>(0, 2) / safe(scale.z),
        ]);
        let rotation = Quat::from_matrix(&rotation_matrix);

        Self {
            position,
            rotation,
            scale,
        }
    }
}

/// Math utility functions
pub mod utils {
    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees.to_radians()
    }
}

/// Extension trait for Mat4 with the affine helpers used by scene nodes
pub trait Mat4Ext {
    /// Translation column
    fn translation(&self) -> Vec3;

    /// Overwrite the translation column
    fn set_translation(&mut self, v: Vec3);

    /// Add to the translation column (parent-space move)
    fn translate(&mut self, v: Vec3);

    /// Upper 3x3 block (rotation and scale)
    fn orientation(&self) -> Mat3;

    /// Length of each basis column
    fn scale_factors(&self) -> Vec3;

    /// Scale along the local axes (`m * S`)
    fn scale_local(&mut self, f: Vec3);

    /// Replace the scale of each local axis while keeping orientation
    fn rescale(&mut self, f: Vec3);

    /// Transform a point (w = 1)
    fn transform_vec3(&self, p: &Vec3) -> Vec3;

    /// Rotation matrix about an arbitrary axis, angle in radians
    fn rotation_axis(angle: f32, axis: &Vec3) -> Mat4;

    /// OpenGL-style orthographic projection
    fn ortho(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4;

    /// OpenGL-style perspective projection, `fov_y` in radians
    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn translation(&self) -> Vec3 {
        Vec3::new(self.m14, self.m24, self.m34)
    }

    fn set_translation(&mut self, v: Vec3) {
        self.m14 = v.x;
        self.m24 = v.y;
        self.m34 = v.z;
    }

    fn translate(&mut self, v: Vec3) {
        self.m14 += v.x;
        self.m24 += v.y;
        self.m34 += v.z;
    }

    fn orientation(&self) -> Mat3 {
        self.fixed_view::<3, 3>(0, 0).into_owned()
    }

    fn scale_factors(&self) -> Vec3 {
        Vec3::new(
            self.fixed_view::<3, 1>(0, 0).norm(),
            self.fixed_view::<3, 1>(0, 1).norm(),
            self.fixed_view::<3, 1>(0, 2).norm(),
        )
    }

    fn scale_local(&mut self, f: Vec3) {
        for (i, factor) in f.iter().enumerate() {
            let mut column = self.fixed_view_mut::<3, 1>(0, i);
            column *= *factor;
        }
    }

    fn rescale(&mut self, f: Vec3) {
        let current = self.scale_factors();
        for i in 0..3 {
            if current[i] < EPSILON {
                continue;
            }
            let mut column = self.fixed_view_mut::<3, 1>(0, i);
            column *= f[i] / current[i];
        }
    }

    fn transform_vec3(&self, p: &Vec3) -> Vec3 {
        self.transform_point(&Point3::from(*p)).coords
    }

    fn rotation_axis(angle: f32, axis: &Vec3) -> Mat4 {
        match Unit::try_new(*axis, EPSILON) {
            Some(axis) => Mat4::from_axis_angle(&axis, angle),
            None => Mat4::identity(),
        }
    }

    fn ortho(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Mat4 {
        Mat4::new_orthographic(left, right, bottom, top, near, far)
    }

    fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
        Mat4::new_perspective(aspect, fov_y, near, far)
    }
}
