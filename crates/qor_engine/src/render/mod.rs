//! # Rendering System
//!
//! Per-frame render state machine over an abstract, GL-like graphics API.
//!
//! ## Architecture
//!
//! - **GraphicsBackend**: the graphics API as a trait; `HeadlessBackend`
//!   records commands instead of drawing
//! - **GraphicsTaskQueue**: hands graphics work from other threads to the
//!   thread that owns the context
//! - **Pipeline**: shaders per pass type, matrix stack, attribute layout and
//!   texture slots; `Pipeline::render` is the per-frame entry point
//! - **Pass**: one walk of the scene graph, forwarding draw state to the
//!   pipeline
//!
//! Every backend call happens on the handler thread. Work that originates
//! elsewhere (for example GPU buffers released when a mesh is dropped on a
//! loader thread) is queued and runs at the start of the next frame.

pub mod backend;
pub mod headless;
pub mod task_queue;
pub mod shader;
pub mod pass;
pub mod pipeline;

pub use backend::{
    BufferHandle, BufferTarget, GraphicsBackend, ProgramHandle, TextureHandle, UniformLocation,
    VertexArrayHandle,
};
pub use headless::{CommandLog, GraphicsCommand, HeadlessBackend};
pub use pass::Pass;
pub use pipeline::Pipeline;
pub use shader::{PipelineShader, ShaderSource};
pub use task_queue::{GraphicsTaskQueue, TaskError};

use bitflags::bitflags;

use crate::assets::AssetError;

/// Shader slot, one program per pass type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassType {
    /// Opaque pass, blending off
    Base = 0,
    /// Blended pass
    Normal = 1,
}

impl PassType {
    /// Number of shader slots
    pub const COUNT: usize = 2;

    /// Slot index
    pub fn index(self) -> usize {
        self as usize
    }
}

bitflags! {
    /// Flags carried by a [`Pass`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PassFlags: u32 {
        /// Descend into children
        const RECURSIVE = 1 << 0;
        /// First (opaque) pass of the frame
        const BASE = 1 << 1;
    }
}

bitflags! {
    /// Vertex attributes; bit `i` is attribute index `i`
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct AttributeFlags: u32 {
        /// `VertexPosition`, 3 floats
        const POSITION = 1 << 0;
        /// `VertexWrap` (texture coordinates), 2 floats
        const WRAP = 1 << 1;
        /// `VertexNormal`, 3 floats
        const NORMAL = 1 << 2;
    }
}

impl AttributeFlags {
    /// Number of attribute indices managed by the pipeline
    pub const MAX: u32 = 3;

    /// Shader attribute names, by index
    pub const NAMES: [&'static str; 3] = ["VertexPosition", "VertexWrap", "VertexNormal"];
}

/// Rendering errors
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    /// Shader compilation or linking failed
    #[error("Shader error in {name}: {message}")]
    Shader {
        /// Shader name
        name: String,
        /// Compiler or linker log
        message: String,
    },

    /// Resource creation failed
    #[error("Resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// Backend-specific error occurred
    #[error("Backend error: {0}")]
    BackendError(String),

    /// Shader or texture file could not be loaded
    #[error(transparent)]
    Asset(#[from] AssetError),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;
