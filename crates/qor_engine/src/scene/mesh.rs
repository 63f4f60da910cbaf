//! Mesh node payload
//!
//! CPU-side geometry plus a lazily created GPU copy. The first render
//! uploads a vertex array with one buffer per attribute and an index buffer;
//! later renders only bind and draw. Dropping the GPU copy queues the release
//! of its objects on the graphics task queue; they are freed at the start of
//! the next frame.

use std::cell::OnceCell;
use std::rc::Rc;
use std::sync::Arc;

use crate::assets::texture::Texture;
use crate::foundation::bounds::AABB;
use crate::foundation::math::{Vec2, Vec3};
use crate::render::backend::{BufferHandle, BufferTarget, VertexArrayHandle};
use crate::render::pass::Pass;
use crate::render::task_queue::GraphicsTaskQueue;
use crate::render::AttributeFlags;
use crate::scene::node::{Node, NodeHooks};

/// Indexed triangle geometry
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshGeometry {
    /// Vertex positions
    pub vertices: Vec<Vec3>,
    /// Texture coordinates; empty or one per vertex
    pub wrap: Vec<Vec2>,
    /// Normals; empty or one per vertex
    pub normals: Vec<Vec3>,
    /// Triangles as vertex indices
    pub faces: Vec<[u32; 3]>,
}

impl MeshGeometry {
    /// Geometry from positions and triangles only
    pub fn new(vertices: Vec<Vec3>, faces: Vec<[u32; 3]>) -> Self {
        Self {
            vertices,
            faces,
            ..Self::default()
        }
    }

    /// Attach texture coordinates
    pub fn with_wrap(mut self, wrap: Vec<Vec2>) -> Self {
        debug_assert_eq!(wrap.len(), self.vertices.len());
        self.wrap = wrap;
        self
    }

    /// Attach normals
    pub fn with_normals(mut self, normals: Vec<Vec3>) -> Self {
        debug_assert_eq!(normals.len(), self.vertices.len());
        self.normals = normals;
        self
    }

    /// Unit quad in the XZ plane facing +Y, centred on the origin
    pub fn quad(size: f32) -> Self {
        let h = size * 0.5;
        Self::new(
            vec![
                Vec3::new(-h, 0.0, -h),
                Vec3::new(-h, 0.0, h),
                Vec3::new(h, 0.0, h),
                Vec3::new(h, 0.0, -h),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
        .with_wrap(vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 0.0),
        ])
        .with_normals(vec![Vec3::y(); 4])
    }

    /// Axis-aligned box centred on the origin
    pub fn cuboid(half: Vec3) -> Self {
        let corners = AABB::from_center_extents(Vec3::zeros(), half).corners();
        #[rustfmt::skip]
        let faces = vec![
            [0, 2, 1], [1, 2, 3], // -z
            [4, 5, 6], [5, 7, 6], // +z
            [0, 1, 4], [1, 5, 4], // -y
            [2, 6, 3], [3, 6, 7], // +y
            [0, 4, 2], [2, 4, 6], // -x
            [1, 3, 5], [3, 7, 5], // +x
        ];
        Self::new(corners.to_vec(), faces)
    }

    /// Every triangle's vertices in order, three per face
    pub fn ordered_verts(&self) -> Vec<Vec3> {
        self.faces
            .iter()
            .flat_map(|face| face.iter().map(|i| self.vertices[*i as usize]))
            .collect()
    }

    /// Local bounding box; zero when there are no vertices
    pub fn bounds(&self) -> AABB {
        AABB::from_points(self.vertices.iter())
    }

    /// True when there is nothing to draw
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty() || self.faces.is_empty()
    }

    /// Number of indices in the element buffer
    pub fn index_count(&self) -> u32 {
        u32::try_from(self.faces.len() * 3).unwrap_or(u32::MAX)
    }

    /// Attributes this geometry can feed
    pub fn attributes(&self) -> AttributeFlags {
        let mut attrs = AttributeFlags::POSITION;
        if !self.wrap.is_empty() {
            attrs |= AttributeFlags::WRAP;
        }
        if !self.normals.is_empty() {
            attrs |= AttributeFlags::NORMAL;
        }
        attrs
    }
}

/// GPU copy of a geometry
#[derive(Debug)]
struct GpuMesh {
    vertex_array: VertexArrayHandle,
    buffers: Vec<BufferHandle>,
    indices: BufferHandle,
    index_count: u32,
    attributes: AttributeFlags,
    tasks: Arc<GraphicsTaskQueue>,
}

impl GpuMesh {
    fn upload(pass: &mut Pass<'_>, geometry: &MeshGeometry) -> Self {
        let tasks = pass.tasks();
        let backend = pass.backend();

        let vertex_array = backend.create_vertex_array();
        backend.bind_vertex_array(vertex_array);

        let positions: Vec<f32> = geometry.vertices.iter().flat_map(|v| [v.x, v.y, v.z]).collect();
        let wrap: Vec<f32> = geometry.wrap.iter().flat_map(|w| [w.x, w.y]).collect();
        let normals: Vec<f32> = geometry.normals.iter().flat_map(|n| [n.x, n.y, n.z]).collect();

        let mut buffers = Vec::with_capacity(3);
        for (index, components, data) in [(0, 3, &positions), (1, 2, &wrap), (2, 3, &normals)] {
            if data.is_empty() {
                continue;
            }
            let buffer = backend.create_buffer(BufferTarget::Array, bytemuck::cast_slice(data));
            backend.bind_buffer(BufferTarget::Array, buffer);
            backend.vertex_attribute_pointer(index, components);
            buffers.push(buffer);
        }

        let indices = backend.create_buffer(BufferTarget::ElementArray, bytemuck::cast_slice(&geometry.faces));
        backend.bind_vertex_array(VertexArrayHandle(0));

        log::debug!(
            "uploaded mesh: {} vertices, {} triangles",
            geometry.vertices.len(),
            geometry.faces.len()
        );

        Self {
            vertex_array,
            buffers,
            indices,
            index_count: geometry.index_count(),
            attributes: geometry.attributes(),
            tasks,
        }
    }
}

impl Drop for GpuMesh {
    fn drop(&mut self) {
        let vertex_array = self.vertex_array;
        let mut buffers = std::mem::take(&mut self.buffers);
        buffers.push(self.indices);
        self.tasks.enqueue(move |backend| {
            for buffer in buffers {
                backend.delete_buffer(buffer);
            }
            backend.delete_vertex_array(vertex_array);
        });
    }
}

/// Renderable geometry with an optional skin texture
#[derive(Debug, Default)]
pub struct Mesh {
    geometry: Rc<MeshGeometry>,
    skin: Option<Rc<Texture>>,
    gpu: OnceCell<GpuMesh>,
}

impl Mesh {
    /// Mesh owning its geometry
    pub fn new(geometry: MeshGeometry) -> Self {
        Self::from_shared(Rc::new(geometry))
    }

    /// Mesh sharing geometry with other meshes
    pub fn from_shared(geometry: Rc<MeshGeometry>) -> Self {
        Self {
            geometry,
            skin: None,
            gpu: OnceCell::new(),
        }
    }

    /// Texture bound to slot 0 while drawing
    pub fn with_skin(mut self, skin: Rc<Texture>) -> Self {
        self.skin = Some(skin);
        self
    }

    /// CPU-side geometry
    pub fn geometry(&self) -> &MeshGeometry {
        &self.geometry
    }

    /// Shared handle to the geometry
    pub fn shared_geometry(&self) -> Rc<MeshGeometry> {
        Rc::clone(&self.geometry)
    }

    /// Skin texture
    pub fn skin(&self) -> Option<&Rc<Texture>> {
        self.skin.as_ref()
    }

    /// True once the GPU copy exists
    pub fn is_uploaded(&self) -> bool {
        self.gpu.get().is_some()
    }
}

impl NodeHooks for Mesh {
    fn render_self(&self, _node: &Node, pass: &mut Pass<'_>) {
        if self.geometry.is_empty() {
            return;
        }
        let gpu = self.gpu.get_or_init(|| GpuMesh::upload(pass, &self.geometry));

        pass.vertex_array(gpu.vertex_array);
        pass.layout(gpu.attributes);
        if let Some(skin) = &self.skin {
            skin.bind(pass, 0);
        }
        pass.element_buffer(gpu.indices);
        pass.draw_elements(gpu.index_count);
    }
}
