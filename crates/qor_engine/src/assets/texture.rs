//! Image textures
//!
//! Pixels are decoded to RGBA8 on load and kept on the CPU. The GPU copy is
//! created the first time the texture is bound during a pass and released
//! through the graphics task queue when the texture is dropped.

use std::cell::OnceCell;
use std::path::Path;
use std::sync::Arc;

use crate::assets::{expect_extension, AssetError};
use crate::render::backend::TextureHandle;
use crate::render::pass::Pass;
use crate::render::task_queue::GraphicsTaskQueue;

#[derive(Debug)]
struct GpuTexture {
    handle: TextureHandle,
    tasks: Arc<GraphicsTaskQueue>,
}

impl Drop for GpuTexture {
    fn drop(&mut self) {
        let handle = self.handle;
        self.tasks.enqueue(move |backend| backend.delete_texture(handle));
    }
}

/// RGBA8 image with a lazily created GPU copy
#[derive(Debug)]
pub struct Texture {
    name: String,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    gpu: OnceCell<GpuTexture>,
}

impl Texture {
    /// Texture from raw RGBA8 pixels
    ///
    /// # Panics
    ///
    /// If `pixels` is not `width * height * 4` bytes long.
    pub fn from_rgba(name: impl Into<String>, width: u32, height: u32, pixels: Vec<u8>) -> Self {
        assert_eq!(
            pixels.len(),
            width as usize * height as usize * 4,
            "pixel buffer does not match {width}x{height} RGBA"
        );
        Self {
            name: name.into(),
            width,
            height,
            pixels,
            gpu: OnceCell::new(),
        }
    }

    /// Single-colour texture
    pub fn solid(name: impl Into<String>, width: u32, height: u32, color: [u8; 4]) -> Self {
        let pixels = color.repeat(width as usize * height as usize);
        Self::from_rgba(name, width, height, pixels)
    }

    /// Decode a PNG file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = path.as_ref();
        expect_extension(path, &["png"])?;

        let image = image::open(path).map_err(|e| match e {
            image::ImageError::IoError(source) => AssetError::Read {
                path: path.to_path_buf(),
                source,
            },
            other => AssetError::unsupported(path, other.to_string()),
        })?;
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();

        log::debug!("loaded texture {} ({}x{})", path.display(), width, height);

        let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        Ok(Self::from_rgba(name, width, height, rgba.into_raw()))
    }

    /// Name (file stem when loaded from disk)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }

    /// RGBA8 pixel data
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// GPU handle, once uploaded
    pub fn handle(&self) -> Option<TextureHandle> {
        self.gpu.get().map(|g| g.handle)
    }

    /// Bind to a texture slot, uploading on first use
    pub fn bind(&self, pass: &mut Pass<'_>, slot: u32) {
        let gpu = self.gpu.get_or_init(|| {
            let tasks = pass.tasks();
            let handle = pass.backend().create_texture(self.width, self.height, &self.pixels);
            log::trace!("uploaded texture {}", self.name);
            GpuTexture { handle, tasks }
        });
        pass.texture(gpu.handle, slot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::PipelineConfig;
    use crate::render::headless::{GraphicsCommand, HeadlessBackend};
    use crate::render::{PassFlags, PassType, Pipeline, ShaderSource};

    #[test]
    fn test_solid_texture_layout() {
        let texture = Texture::solid("red", 2, 3, [255, 0, 0, 255]);
        assert_eq!(texture.pixels().len(), 2 * 3 * 4);
        assert_eq!(&texture.pixels()[4..8], &[255, 0, 0, 255]);
        assert!(texture.handle().is_none());
    }

    #[test]
    fn test_load_png_and_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checker.png");
        image::RgbaImage::from_pixel(4, 2, image::Rgba([1, 2, 3, 4])).save(&path).unwrap();

        let texture = Texture::load(&path).unwrap();
        assert_eq!((texture.width(), texture.height()), (4, 2));
        assert_eq!(texture.name(), "checker");
        assert_eq!(&texture.pixels()[..4], &[1, 2, 3, 4]);

        assert!(matches!(
            Texture::load(dir.path().join("missing.png")),
            Err(AssetError::Read { .. })
        ));
        assert!(matches!(
            Texture::load(dir.path().join("image.tga")),
            Err(AssetError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_bind_uploads_once_and_sets_sampler() {
        let backend = HeadlessBackend::new();
        let log = backend.log();
        let sources = [ShaderSource::new("base", "", ""), ShaderSource::new("normal", "", "")];
        let mut pipeline = Pipeline::new(Box::new(backend), PipelineConfig::default(), sources).unwrap();
        let texture = Texture::solid("white", 1, 1, [255; 4]);

        {
            let mut pass = Pass::new(&mut pipeline, PassFlags::BASE);
            pass.shader(PassType::Base);
            texture.bind(&mut pass, 0);
            texture.bind(&mut pass, 1);
        }

        let handle = texture.handle().unwrap();
        assert_eq!(log.count(|c| matches!(c, GraphicsCommand::CreateTexture(..))), 1);
        assert_eq!(log.count(|c| *c == GraphicsCommand::BindTexture(handle)), 2);
        assert_eq!(log.count(|c| matches!(c, GraphicsCommand::UniformInt(_, 1))), 1);

        drop(texture);
        assert_eq!(pipeline.tasks().pending(), 1);
    }
}
