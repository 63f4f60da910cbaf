//! # Render Pipeline
//!
//! Per-window renderer state: the shader program for each [`PassType`], the
//! matrix stack, the enabled attribute layout and the texture slots.
//!
//! ## Frame
//!
//! [`Pipeline::render`] drains the graphics task queue, then walks the scene
//! twice from the root:
//!
//! 1. base pass: depth test on, blending off, `BASE` shader
//! 2. blended pass: blending on, `NORMAL` shader
//!
//! If the root or camera node no longer exists the frame is skipped.
//!
//! ## Per draw
//!
//! `matrix(model)` derives `model_view = view * model`,
//! `normal = transpose(inverse(model_view))` and
//! `model_view_projection = projection * model_view`, and uploads all three
//! to the active program through locations cached at load time.

use std::sync::Arc;

use crate::core::config::PipelineConfig;
use crate::foundation::bounds::Frustum;
use crate::foundation::math::{Mat4, Mat4Ext};
use crate::render::backend::{GraphicsBackend, TextureHandle};
use crate::render::pass::Pass;
use crate::render::shader::{PipelineShader, ShaderSource};
use crate::render::task_queue::GraphicsTaskQueue;
use crate::render::{AttributeFlags, PassFlags, PassType, RenderResult};
use crate::scene::partitioner::{BasicPartitioner, Partitioner};
use crate::scene::{NodeId, Scene};

/// Texture units reset on teardown
const MAX_TEXTURE_SLOTS: u32 = 8;

/// Orthographic depth range
const ORTHO_DEPTH: f32 = 100.0;

/// Renderer state for one window
pub struct Pipeline {
    backend: Box<dyn GraphicsBackend>,
    tasks: Arc<GraphicsTaskQueue>,
    partitioner: Box<dyn Partitioner>,
    shaders: Vec<PipelineShader>,
    active: Option<PassType>,

    root: Option<NodeId>,
    camera: Option<NodeId>,
    config: PipelineConfig,

    projection: Mat4,
    view: Mat4,
    model_view: Mat4,
    normal: Mat4,
    model_view_projection: Mat4,

    draw_calls: usize,
}

impl Pipeline {
    /// Create a pipeline, loading one program per [`PassType`] from
    /// `sources` (base first).
    ///
    /// The calling thread becomes the graphics handler thread.
    pub fn new(
        mut backend: Box<dyn GraphicsBackend>,
        config: PipelineConfig,
        sources: [ShaderSource; PassType::COUNT],
    ) -> RenderResult<Self> {
        let mut shaders = Vec::with_capacity(PassType::COUNT);
        for source in &sources {
            match PipelineShader::load(backend.as_mut(), source) {
                Ok(shader) => shaders.push(shader),
                Err(e) => {
                    log::error!("failed to load shader {}: {}", source.name, e);
                    return Err(e);
                }
            }
        }

        backend.set_depth_test(true);

        log::info!(
            "render pipeline ready ({}x{}, {})",
            config.viewport[0],
            config.viewport[1],
            if config.ortho { "orthographic" } else { "perspective" }
        );

        let mut pipeline = Self {
            backend,
            tasks: Arc::new(GraphicsTaskQueue::new()),
            partitioner: Box::new(BasicPartitioner::new()),
            shaders,
            active: None,
            root: None,
            camera: None,
            config,
            projection: Mat4::identity(),
            view: Mat4::identity(),
            model_view: Mat4::identity(),
            normal: Mat4::identity(),
            model_view_projection: Mat4::identity(),
            draw_calls: 0,
        };
        pipeline.projection = pipeline.projection_for(None);
        Ok(pipeline)
    }

    /// Create a pipeline with shaders read from `config.shader_dir`
    pub fn from_config(backend: Box<dyn GraphicsBackend>, config: PipelineConfig) -> RenderResult<Self> {
        let base = ShaderSource::load(&config.shader_dir, &config.base_shader)?;
        let normal = ShaderSource::load(&config.shader_dir, &config.normal_shader)?;
        Self::new(backend, config, [base, normal])
    }

    // ------------------------------------------------------------------
    // Frame
    // ------------------------------------------------------------------

    /// Render one frame of the scene under the configured root and camera
    pub fn render(&mut self, scene: &Scene) {
        self.tasks.drain(self.backend.as_mut());
        self.draw_calls = 0;

        let (Some(root), Some(camera)) = (self.root, self.camera) else {
            return;
        };
        if !scene.contains(root) || !scene.contains(camera) {
            return;
        }

        self.view = scene.world(camera).try_inverse().unwrap_or_else(Mat4::identity);
        self.projection = self.projection_for(scene.get(camera).and_then(|n| n.as_camera()).map(|c| c.fov_radians()));

        self.backend.clear(self.config.background);
        self.backend.set_depth_test(true);
        self.backend.set_blend(false);

        let mut pass = Pass::new(self, PassFlags::RECURSIVE | PassFlags::BASE);
        pass.shader(PassType::Base);
        scene.render(root, &mut pass);

        pass.pipeline_mut().backend.set_blend(true);
        pass.set_flags(pass.flags() - PassFlags::BASE);
        pass.shader(PassType::Normal);
        scene.render(root, &mut pass);

        log::trace!("frame rendered with {} draw calls", self.draw_calls);
    }

    /// Culling frustum of the active camera
    pub fn frustum(&self, scene: &Scene) -> Option<Frustum> {
        let camera = self.camera.filter(|c| scene.contains(*c))?;
        let fov = scene.get(camera).and_then(|n| n.as_camera()).map(|c| c.fov_radians());
        let view = scene.world(camera).try_inverse()?;
        Some(Frustum::from_matrix(&(self.projection_for(fov) * view)))
    }

    fn projection_for(&self, camera_fov: Option<f32>) -> Mat4 {
        #[allow(clippy::cast_precision_loss)]
        let (w, h) = (self.config.viewport[0] as f32, self.config.viewport[1] as f32);
        if self.config.ortho {
            Mat4::ortho(0.0, w, 0.0, h, -ORTHO_DEPTH, ORTHO_DEPTH)
        } else {
            let fov = camera_fov.unwrap_or_else(|| self.config.fov.to_radians());
            Mat4::perspective(fov, w / h.max(1.0), self.config.near, self.config.far)
        }
    }

    // ------------------------------------------------------------------
    // State transitions (called through `Pass`)
    // ------------------------------------------------------------------

    /// Make the program for `slot` current; no-op if it already is
    pub fn shader(&mut self, slot: PassType) {
        if self.active == Some(slot) {
            return;
        }
        self.backend.use_program(self.shaders[slot.index()].program);
        self.active = Some(slot);
    }

    /// Derive and upload the matrix set for a model transform
    pub fn matrix(&mut self, model: &Mat4) {
        self.model_view = self.view * model;
        self.normal = self
            .model_view
            .try_inverse()
            .map_or_else(Mat4::identity, |inverse| inverse.transpose());
        self.model_view_projection = self.projection * self.model_view;

        let Some(shader) = self.active.map(|slot| &self.shaders[slot.index()]) else {
            return;
        };
        if let Some(location) = shader.model_view_projection {
            self.backend.uniform_mat4(location, &self.model_view_projection);
        }
        if let Some(location) = shader.model_view {
            self.backend.uniform_mat4(location, &self.model_view);
        }
        if let Some(location) = shader.normal {
            self.backend.uniform_mat4(location, &self.normal);
        }
    }

    /// Bind a texture to a slot and point the slot's sampler at it
    pub fn texture(&mut self, texture: TextureHandle, slot: u32) {
        self.backend.active_texture(slot);
        self.backend.bind_texture(texture);

        let sampler = self
            .active
            .and_then(|s| self.shaders[s.index()].textures.get(slot as usize).copied());
        if let (Some(location), Ok(unit)) = (sampler, i32::try_from(slot)) {
            self.backend.uniform_int(location, unit);
        }
    }

    /// Unbind every slot whose bit is set in `slot_flags`, up to `max_slots`
    pub fn texture_slots(&mut self, slot_flags: u32, max_slots: u32) {
        debug_assert!(max_slots > 0);
        for slot in (0..max_slots.min(32)).filter(|i| slot_flags & (1 << i) != 0) {
            self.backend.active_texture(slot);
            self.backend.bind_texture(TextureHandle::NONE);
        }
        self.backend.active_texture(0);
    }

    /// Enable exactly the requested attributes the active shader supports
    /// and disable every other index. Returns the enabled set.
    pub fn layout(&mut self, attrs: AttributeFlags) -> AttributeFlags {
        let supported = self
            .active
            .map_or(AttributeFlags::empty(), |s| self.shaders[s.index()].supported);
        let attrs = attrs & supported;

        for i in 0..AttributeFlags::MAX {
            if attrs.bits() & (1 << i) != 0 {
                self.backend.enable_attribute(i);
            } else {
                self.backend.disable_attribute(i);
            }
        }

        if let Some(slot) = self.active {
            self.shaders[slot.index()].layout = attrs;
        }
        attrs
    }

    /// Issue an indexed draw
    pub fn draw_elements(&mut self, index_count: u32) {
        self.backend.draw_elements(index_count);
        self.draw_calls += 1;
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Node the frame is rendered from
    pub fn set_root(&mut self, root: Option<NodeId>) {
        self.root = root;
    }

    /// Root node
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Camera node; also handed to the partitioner
    pub fn set_camera(&mut self, camera: Option<NodeId>) {
        self.camera = camera;
        self.partitioner.set_camera(camera);
    }

    /// Camera node
    pub fn camera(&self) -> Option<NodeId> {
        self.camera
    }

    /// Switch between orthographic and perspective projection
    pub fn set_ortho(&mut self, ortho: bool) {
        self.config.ortho = ortho;
        self.projection = self.projection_for(None);
    }

    /// Update the viewport after a window resize
    pub fn resize(&mut self, width: u32, height: u32) {
        self.config.viewport = [width.max(1), height.max(1)];
        self.projection = self.projection_for(None);
    }

    /// Viewport size in pixels
    pub fn viewport(&self) -> [u32; 2] {
        self.config.viewport
    }

    /// Replace the partitioner
    pub fn set_partitioner(&mut self, mut partitioner: Box<dyn Partitioner>) {
        partitioner.set_camera(self.camera);
        self.partitioner = partitioner;
    }

    /// Active partitioner
    pub fn partitioner(&self) -> &dyn Partitioner {
        self.partitioner.as_ref()
    }

    /// Active partitioner, mutably
    pub fn partitioner_mut(&mut self) -> &mut dyn Partitioner {
        self.partitioner.as_mut()
    }

    /// Graphics API
    pub fn backend_mut(&mut self) -> &mut dyn GraphicsBackend {
        self.backend.as_mut()
    }

    /// Graphics task queue
    pub fn tasks(&self) -> Arc<GraphicsTaskQueue> {
        Arc::clone(&self.tasks)
    }

    /// Active shader slot
    pub fn slot(&self) -> Option<PassType> {
        self.active
    }

    /// Loaded program for a slot
    pub fn program(&self, slot: PassType) -> &PipelineShader {
        &self.shaders[slot.index()]
    }

    /// Draw calls issued by the last `render`
    pub fn draw_calls(&self) -> usize {
        self.draw_calls
    }

    /// Projection matrix
    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection
    }

    /// View matrix of the last frame
    pub fn view_matrix(&self) -> &Mat4 {
        &self.view
    }

    /// Model-view matrix of the last draw
    pub fn model_view_matrix(&self) -> &Mat4 {
        &self.model_view
    }

    /// Normal matrix of the last draw
    pub fn normal_matrix(&self) -> &Mat4 {
        &self.normal
    }

    /// Model-view-projection matrix of the last draw
    pub fn model_view_projection_matrix(&self) -> &Mat4 {
        &self.model_view_projection
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if !self.tasks.is_handler() {
            log::warn!("render pipeline dropped off the graphics thread; skipping teardown");
            return;
        }
        self.tasks.drain(self.backend.as_mut());
        self.layout(AttributeFlags::empty());
        self.texture_slots(!0, MAX_TEXTURE_SLOTS);
        for shader in &self.shaders {
            self.backend.delete_program(shader.program);
        }
        log::debug!("render pipeline torn down");
    }
}
