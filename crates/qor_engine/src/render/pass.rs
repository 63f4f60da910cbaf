//! Render pass context
//!
//! A [`Pass`] lives for one walk of the scene graph. Node hooks receive it
//! and issue draw state through it; everything is forwarded to the owning
//! [`Pipeline`].

use std::sync::Arc;

use crate::foundation::math::Mat4;
use crate::render::backend::{BufferHandle, BufferTarget, GraphicsBackend, TextureHandle, VertexArrayHandle};
use crate::render::pipeline::Pipeline;
use crate::render::task_queue::GraphicsTaskQueue;
use crate::render::{AttributeFlags, PassFlags, PassType};
use crate::scene::partitioner::Partitioner;
use crate::scene::NodeId;

/// One traversal of the scene graph
pub struct Pass<'a> {
    pipeline: &'a mut Pipeline,
    flags: PassFlags,
}

impl<'a> Pass<'a> {
    /// Start a pass over the given pipeline
    pub fn new(pipeline: &'a mut Pipeline, flags: PassFlags) -> Self {
        Self { pipeline, flags }
    }

    /// Current flags
    pub fn flags(&self) -> PassFlags {
        self.flags
    }

    /// Replace the flags (between walks)
    pub fn set_flags(&mut self, flags: PassFlags) {
        self.flags = flags;
    }

    /// Children are rendered after their parent
    pub fn recursive(&self) -> bool {
        self.flags.contains(PassFlags::RECURSIVE)
    }

    /// This is the opaque base pass
    pub fn base(&self) -> bool {
        self.flags.contains(PassFlags::BASE)
    }

    /// Owning pipeline
    pub fn pipeline(&self) -> &Pipeline {
        self.pipeline
    }

    /// Owning pipeline, mutably
    pub fn pipeline_mut(&mut self) -> &mut Pipeline {
        self.pipeline
    }

    /// Graphics API, for creating GPU objects during render
    pub fn backend(&mut self) -> &mut dyn GraphicsBackend {
        self.pipeline.backend_mut()
    }

    /// Queue used to release GPU objects from any thread
    pub fn tasks(&self) -> Arc<GraphicsTaskQueue> {
        self.pipeline.tasks()
    }

    /// Active partitioner
    pub fn partitioner(&self) -> &dyn Partitioner {
        self.pipeline.partitioner()
    }

    /// Active camera
    pub fn camera(&self) -> Option<NodeId> {
        self.pipeline.camera()
    }

    /// Active shader slot
    pub fn pass_type(&self) -> Option<PassType> {
        self.pipeline.slot()
    }

    /// Set the model matrix for the next draw
    pub fn matrix(&mut self, model: &Mat4) {
        self.pipeline.matrix(model);
    }

    /// Bind a texture to a slot
    pub fn texture(&mut self, texture: TextureHandle, slot: u32) {
        self.pipeline.texture(texture, slot);
    }

    /// Unbind the textures in the slot mask
    pub fn texture_slots(&mut self, slot_flags: u32, max_slots: u32) {
        self.pipeline.texture_slots(slot_flags, max_slots);
    }

    /// Bind a vertex array
    pub fn vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        self.pipeline.backend_mut().bind_vertex_array(vertex_array);
    }

    /// Bind an array buffer
    pub fn vertex_buffer(&mut self, buffer: BufferHandle) {
        self.pipeline.backend_mut().bind_buffer(BufferTarget::Array, buffer);
    }

    /// Bind an element buffer
    pub fn element_buffer(&mut self, buffer: BufferHandle) {
        self.pipeline.backend_mut().bind_buffer(BufferTarget::ElementArray, buffer);
    }

    /// Switch shader slot
    pub fn shader(&mut self, slot: PassType) {
        self.pipeline.shader(slot);
    }

    /// Request a vertex attribute layout; returns what the shader supports
    pub fn layout(&mut self, attrs: AttributeFlags) -> AttributeFlags {
        self.pipeline.layout(attrs)
    }

    /// Draw indexed triangles
    pub fn draw_elements(&mut self, index_count: u32) {
        self.pipeline.draw_elements(index_count);
    }
}
