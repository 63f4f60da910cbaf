//! Graphics API abstraction
//!
//! [`GraphicsBackend`] mirrors the small slice of an OpenGL-style API the
//! pipeline uses. Object handles are opaque `u32` names; `0` means "none"
//! and binding it unbinds.

use crate::foundation::math::Mat4;
use crate::render::RenderResult;

/// Shader program object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ProgramHandle(pub u32);

/// Buffer object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BufferHandle(pub u32);

/// Texture object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextureHandle(pub u32);

/// Vertex array object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct VertexArrayHandle(pub u32);

/// Resolved uniform location within a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UniformLocation(pub i32);

impl BufferHandle {
    /// Unbinds when bound
    pub const NONE: Self = Self(0);
}

impl TextureHandle {
    /// Unbinds when bound
    pub const NONE: Self = Self(0);
}

/// Buffer binding point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Vertex attribute data
    Array,
    /// Triangle indices
    ElementArray,
}

/// Graphics API consumed by the pipeline.
///
/// Implementations are driven from exactly one thread, the one that owns
/// the context; see [`GraphicsTaskQueue`](crate::render::GraphicsTaskQueue).
pub trait GraphicsBackend {
    /// Compile and link a program
    fn create_program(&mut self, name: &str, vertex: &str, fragment: &str) -> RenderResult<ProgramHandle>;

    /// Uniform location, `None` if the program has no such uniform
    fn uniform_location(&mut self, program: ProgramHandle, name: &str) -> Option<UniformLocation>;

    /// Attribute index, `None` if the program has no such attribute
    fn attribute_location(&mut self, program: ProgramHandle, name: &str) -> Option<u32>;

    /// Make a program current
    fn use_program(&mut self, program: ProgramHandle);

    /// Upload a 4x4 matrix uniform to the current program
    fn uniform_mat4(&mut self, location: UniformLocation, value: &Mat4);

    /// Upload an integer uniform to the current program
    fn uniform_int(&mut self, location: UniformLocation, value: i32);

    /// Enable a vertex attribute index
    fn enable_attribute(&mut self, index: u32);

    /// Disable a vertex attribute index
    fn disable_attribute(&mut self, index: u32);

    /// Select the active texture unit
    fn active_texture(&mut self, slot: u32);

    /// Bind a 2D texture to the active unit
    fn bind_texture(&mut self, texture: TextureHandle);

    /// Upload tightly packed RGBA8 pixels
    fn create_texture(&mut self, width: u32, height: u32, rgba: &[u8]) -> TextureHandle;

    /// Create a vertex array object
    fn create_vertex_array(&mut self) -> VertexArrayHandle;

    /// Bind a vertex array object
    fn bind_vertex_array(&mut self, vertex_array: VertexArrayHandle);

    /// Create a buffer holding `data`, leaving it bound to `target`
    fn create_buffer(&mut self, target: BufferTarget, data: &[u8]) -> BufferHandle;

    /// Bind a buffer
    fn bind_buffer(&mut self, target: BufferTarget, buffer: BufferHandle);

    /// Point an attribute index at tightly packed floats in the bound array buffer
    fn vertex_attribute_pointer(&mut self, index: u32, components: u32);

    /// Draw indexed triangles from the bound element buffer
    fn draw_elements(&mut self, index_count: u32);

    /// Clear colour and depth
    fn clear(&mut self, color: [f32; 4]);

    /// Toggle alpha blending
    fn set_blend(&mut self, enabled: bool);

    /// Toggle depth testing
    fn set_depth_test(&mut self, enabled: bool);

    /// Release a program
    fn delete_program(&mut self, program: ProgramHandle);

    /// Release a texture
    fn delete_texture(&mut self, texture: TextureHandle);

    /// Release a vertex array
    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle);

    /// Release a buffer
    fn delete_buffer(&mut self, buffer: BufferHandle);
}
