//! Recording backend
//!
//! [`HeadlessBackend`] implements [`GraphicsBackend`] without a GPU: every
//! call is appended to a shared [`CommandLog`] and object names are handed
//! out from a counter. Used by tests and by tools that run the frame loop
//! without a window.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::foundation::math::Mat4;
use crate::render::backend::{
    BufferHandle, BufferTarget, GraphicsBackend, ProgramHandle, TextureHandle, UniformLocation,
    VertexArrayHandle,
};
use crate::render::{RenderError, RenderResult};

/// One recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub enum GraphicsCommand {
    /// `create_program`
    CreateProgram(String, ProgramHandle),
    /// `use_program`
    UseProgram(ProgramHandle),
    /// `uniform_mat4`
    UniformMat4(UniformLocation, Mat4),
    /// `uniform_int`
    UniformInt(UniformLocation, i32),
    /// `enable_attribute`
    EnableAttribute(u32),
    /// `disable_attribute`
    DisableAttribute(u32),
    /// `active_texture`
    ActiveTexture(u32),
    /// `bind_texture`
    BindTexture(TextureHandle),
    /// `create_texture`
    CreateTexture(TextureHandle, u32, u32),
    /// `create_vertex_array`
    CreateVertexArray(VertexArrayHandle),
    /// `bind_vertex_array`
    BindVertexArray(VertexArrayHandle),
    /// `create_buffer`, with the byte length
    CreateBuffer(BufferTarget, BufferHandle, usize),
    /// `bind_buffer`
    BindBuffer(BufferTarget, BufferHandle),
    /// `vertex_attribute_pointer`
    AttributePointer(u32, u32),
    /// `draw_elements`
    DrawElements(u32),
    /// `clear`
    Clear([f32; 4]),
    /// `set_blend`
    Blend(bool),
    /// `set_depth_test`
    DepthTest(bool),
    /// `delete_program`
    DeleteProgram(ProgramHandle),
    /// `delete_texture`
    DeleteTexture(TextureHandle),
    /// `delete_vertex_array`
    DeleteVertexArray(VertexArrayHandle),
    /// `delete_buffer`
    DeleteBuffer(BufferHandle),
}

/// Shared view of the commands a [`HeadlessBackend`] has recorded
#[derive(Debug, Clone, Default)]
pub struct CommandLog(Arc<Mutex<Vec<GraphicsCommand>>>);

impl CommandLog {
    /// Copy of every recorded command
    pub fn commands(&self) -> Vec<GraphicsCommand> {
        self.0.lock().clone()
    }

    /// Forget recorded commands
    pub fn clear(&self) {
        self.0.lock().clear();
    }

    /// Number of commands matching a predicate
    pub fn count(&self, pred: impl Fn(&GraphicsCommand) -> bool) -> usize {
        self.0.lock().iter().filter(|c| pred(c)).count()
    }

    /// Number of `draw_elements` calls
    pub fn draw_calls(&self) -> usize {
        self.count(|c| matches!(c, GraphicsCommand::DrawElements(_)))
    }

    fn push(&self, command: GraphicsCommand) {
        self.0.lock().push(command);
    }
}

/// Backend that records instead of drawing
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    log: CommandLog,
    next_name: u32,
    missing: HashSet<String>,
    failing_programs: HashSet<String>,
    uniforms: Vec<String>,
}

impl HeadlessBackend {
    /// Backend where every uniform and attribute resolves
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend programs lack the named uniform or attribute
    pub fn without(mut self, name: impl Into<String>) -> Self {
        self.missing.insert(name.into());
        self
    }

    /// Make `create_program` fail for the named shader
    pub fn failing_program(mut self, name: impl Into<String>) -> Self {
        self.failing_programs.insert(name.into());
        self
    }

    /// Handle to the command log
    pub fn log(&self) -> CommandLog {
        self.log.clone()
    }

    fn name(&mut self) -> u32 {
        self.next_name += 1;
        self.next_name
    }
}

impl GraphicsBackend for HeadlessBackend {
    fn create_program(&mut self, name: &str, _vertex: &str, _fragment: &str) -> RenderResult<ProgramHandle> {
        if self.failing_programs.contains(name) {
            return Err(RenderError::Shader {
                name: name.to_string(),
                message: "link failed".to_string(),
            });
        }
        let program = ProgramHandle(self.name());
        self.log.push(GraphicsCommand::CreateProgram(name.to_string(), program));
        Ok(program)
    }

    fn uniform_location(&mut self, _program: ProgramHandle, name: &str) -> Option<UniformLocation> {
        if self.missing.contains(name) {
            return None;
        }
        let index = match self.uniforms.iter().position(|u| u == name) {
            Some(index) => index,
            None => {
                self.uniforms.push(name.to_string());
                self.uniforms.len() - 1
            }
        };
        i32::try_from(index).ok().map(UniformLocation)
    }

    fn attribute_location(&mut self, _program: ProgramHandle, name: &str) -> Option<u32> {
        if self.missing.contains(name) {
            return None;
        }
        crate::render::AttributeFlags::NAMES
            .iter()
            .position(|n| *n == name)
            .and_then(|i| u32::try_from(i).ok())
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.log.push(GraphicsCommand::UseProgram(program));
    }

    fn uniform_mat4(&mut self, location: UniformLocation, value: &Mat4) {
        self.log.push(GraphicsCommand::UniformMat4(location, *value));
    }

    fn uniform_int(&mut self, location: UniformLocation, value: i32) {
        self.log.push(GraphicsCommand::UniformInt(location, value));
    }

    fn enable_attribute(&mut self, index: u32) {
        self.log.push(GraphicsCommand::EnableAttribute(index));
    }

    fn disable_attribute(&mut self, index: u32) {
        self.log.push(GraphicsCommand::DisableAttribute(index));
    }

    fn active_texture(&mut self, slot: u32) {
        self.log.push(GraphicsCommand::ActiveTexture(slot));
    }

    fn bind_texture(&mut self, texture: TextureHandle) {
        self.log.push(GraphicsCommand::BindTexture(texture));
    }

    fn create_texture(&mut self, width: u32, height: u32, _rgba: &[u8]) -> TextureHandle {
        let texture = TextureHandle(self.name());
        self.log.push(GraphicsCommand::CreateTexture(texture, width, height));
        texture
    }

    fn create_vertex_array(&mut self) -> VertexArrayHandle {
        let vertex_array = VertexArrayHandle(self.name());
        self.log.push(GraphicsCommand::CreateVertexArray(vertex_array));
        vertex_array
    }

    fn bind_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        self.log.push(GraphicsCommand::BindVertexArray(vertex_array));
    }

    fn create_buffer(&mut self, target: BufferTarget, data: &[u8]) -> BufferHandle {
        let buffer = BufferHandle(self.name());
        self.log.push(GraphicsCommand::CreateBuffer(target, buffer, data.len()));
        buffer
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: BufferHandle) {
        self.log.push(GraphicsCommand::BindBuffer(target, buffer));
    }

    fn vertex_attribute_pointer(&mut self, index: u32, components: u32) {
        self.log.push(GraphicsCommand::AttributePointer(index, components));
    }

    fn draw_elements(&mut self, index_count: u32) {
        self.log.push(GraphicsCommand::DrawElements(index_count));
    }

    fn clear(&mut self, color: [f32; 4]) {
        self.log.push(GraphicsCommand::Clear(color));
    }

    fn set_blend(&mut self, enabled: bool) {
        self.log.push(GraphicsCommand::Blend(enabled));
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.log.push(GraphicsCommand::DepthTest(enabled));
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        self.log.push(GraphicsCommand::DeleteProgram(program));
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        self.log.push(GraphicsCommand::DeleteTexture(texture));
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        self.log.push(GraphicsCommand::DeleteVertexArray(vertex_array));
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        self.log.push(GraphicsCommand::DeleteBuffer(buffer));
    }
}
