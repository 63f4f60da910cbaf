//! Shader programs and their resolved locations
//!
//! Uniform and attribute locations are resolved once when a program is
//! loaded; per-draw uploads only use the cached values.

use std::path::Path;

use crate::assets::AssetError;
use crate::render::backend::{GraphicsBackend, ProgramHandle, UniformLocation};
use crate::render::{AttributeFlags, RenderResult};

/// Texture sampler uniforms, by slot
pub const TEXTURE_UNIFORMS: [&str; 5] = [
    "Texture",
    "TextureNrm",
    "TextureDisp",
    "TextureSpec",
    "TextureOcc",
];

/// Vertex and fragment source for one program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    /// Program name (file stem)
    pub name: String,
    /// Vertex shader text
    pub vertex: String,
    /// Fragment shader text
    pub fragment: String,
}

impl ShaderSource {
    /// Source from strings
    pub fn new(name: impl Into<String>, vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            vertex: vertex.into(),
            fragment: fragment.into(),
        }
    }

    /// Read `<dir>/<name>.vp` and `<dir>/<name>.fp`
    pub fn load(dir: impl AsRef<Path>, name: &str) -> Result<Self, AssetError> {
        let dir = dir.as_ref();
        let read = |ext: &str| {
            let path = dir.join(format!("{name}.{ext}"));
            std::fs::read_to_string(&path).map_err(|source| AssetError::Read { path, source })
        };
        Ok(Self::new(name, read("vp")?, read("fp")?))
    }
}

/// A loaded program with its cached uniform and attribute locations
#[derive(Debug, Clone)]
pub struct PipelineShader {
    /// Program object
    pub program: ProgramHandle,
    /// `ModelViewProjection`
    pub model_view_projection: Option<UniformLocation>,
    /// `ModelView`
    pub model_view: Option<UniformLocation>,
    /// `NormalMatrix`
    pub normal: Option<UniformLocation>,
    /// Sampler uniforms for slots `0..textures.len()`
    pub textures: Vec<UniformLocation>,
    /// Attribute indices by attribute bit
    pub attributes: [Option<u32>; 3],
    /// Attributes the program declares
    pub supported: AttributeFlags,
    /// Attributes currently enabled for this program
    pub layout: AttributeFlags,
}

impl PipelineShader {
    /// Compile a program and resolve its locations.
    ///
    /// Missing matrix uniforms are tolerated (the upload is skipped). Texture
    /// uniforms are resolved in slot order up to the first missing one. A
    /// missing attribute is logged and left out of `supported`.
    pub fn load(backend: &mut dyn GraphicsBackend, source: &ShaderSource) -> RenderResult<Self> {
        let program = backend.create_program(&source.name, &source.vertex, &source.fragment)?;

        let textures = TEXTURE_UNIFORMS
            .iter()
            .map_while(|name| backend.uniform_location(program, name))
            .collect();

        let mut attributes = [None; 3];
        let mut supported = AttributeFlags::empty();
        for (i, name) in AttributeFlags::NAMES.iter().enumerate() {
            match backend.attribute_location(program, name) {
                Some(index) => {
                    attributes[i] = Some(index);
                    supported |= AttributeFlags::from_bits_truncate(1 << i);
                }
                None => log::warn!("shader {}: missing attribute {}", source.name, name),
            }
        }

        log::debug!("loaded shader {} (attributes {:?})", source.name, supported);

        Ok(Self {
            program,
            model_view_projection: backend.uniform_location(program, "ModelViewProjection"),
            model_view: backend.uniform_location(program, "ModelView"),
            normal: backend.uniform_location(program, "NormalMatrix"),
            textures,
            attributes,
            supported,
            layout: AttributeFlags::empty(),
        })
    }
}
