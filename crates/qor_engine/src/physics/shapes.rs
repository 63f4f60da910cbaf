//! Collider construction from node geometry.
//!
//! Shapes are built in body space: the node's world scale is baked into the
//! vertices and dimensions because rigid-body poses cannot carry scale.

use rapier3d::prelude::{ColliderBuilder, Point};

use crate::foundation::bounds::AABB;
use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
use crate::scene::{Node, NodeId, PhysicsShape, Scene};

const ACTOR_RADIUS: f32 = 0.5;
const ACTOR_HALF_HEIGHT: f32 = 0.5;

fn scaled(v: &Vec3, scale: &Vec3) -> Point<f32> {
    Point::from(v.component_mul(scale))
}

/// Triangle mesh with every face of a mesh node, vertex by vertex
pub(super) fn trimesh(node: &Node, scale: &Vec3) -> Option<ColliderBuilder> {
    let geometry = node.as_mesh()?.geometry();
    if geometry.is_empty() {
        return None;
    }
    let vertices: Vec<_> = geometry.ordered_verts().iter().map(|v| scaled(v, scale)).collect();
    let count = u32::try_from(vertices.len()).ok()?;
    let indices = (0..count / 3).map(|t| [3 * t, 3 * t + 1, 3 * t + 2]).collect();
    Some(ColliderBuilder::trimesh(vertices, indices))
}

/// Primitive or hull shape for a generic body
pub(super) fn generic(scene: &Scene, id: NodeId, scale: &Vec3) -> Option<ColliderBuilder> {
    let node = scene.get(id)?;
    match node.physics_shape {
        PhysicsShape::Mesh | PhysicsShape::Hull => hull(scene, id, scale),
        PhysicsShape::Box => from_box(node.local_box(), scale, |half| {
            ColliderBuilder::cuboid(half.x, half.y, half.z)
        }),
        PhysicsShape::Capsule => from_box(node.local_box(), scale, |half| {
            let radius = half.x.max(half.z);
            ColliderBuilder::capsule_y((half.y - radius).max(0.0), radius)
        }),
        PhysicsShape::Cylinder => from_box(node.local_box(), scale, |half| {
            ColliderBuilder::cylinder(half.y, half.x.max(half.z))
        }),
    }
}

/// Capsule fitted to the node's box, or a default one when it has none
pub(super) fn actor(node: &Node, scale: &Vec3) -> ColliderBuilder {
    from_box(node.local_box(), scale, |half| {
        let radius = half.x.max(half.z);
        ColliderBuilder::capsule_y((half.y - radius).max(0.0), radius)
    })
    .unwrap_or_else(|| ColliderBuilder::capsule_y(ACTOR_HALF_HEIGHT, ACTOR_RADIUS))
}

fn from_box(bounds: &AABB, scale: &Vec3, build: impl FnOnce(Vec3) -> ColliderBuilder) -> Option<ColliderBuilder> {
    if !bounds.is_finite() {
        return None;
    }
    let half = bounds.extents().component_mul(scale).abs();
    if half.min() <= 0.0 {
        return None;
    }
    Some(build(half).translation(bounds.center().component_mul(scale)))
}

/// Convex hull over the node's own vertices and those of its mesh descendants
fn hull(scene: &Scene, id: NodeId, scale: &Vec3) -> Option<ColliderBuilder> {
    let to_local = scene.world(id).try_inverse().unwrap_or_else(Mat4::identity);

    let mut points = Vec::new();
    for n in scene.subtree(id) {
        let Some(mesh) = scene.get(n).and_then(Node::as_mesh) else {
            continue;
        };
        let relative = to_local * scene.world(n);
        points.extend(
            mesh.geometry()
                .vertices
                .iter()
                .map(|v| scaled(&relative.transform_vec3(v), scale)),
        );
    }

    if points.len() < 4 {
        return None;
    }
    ColliderBuilder::convex_hull(&points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Mesh, MeshGeometry};
    use approx::assert_relative_eq;

    #[test]
    fn test_box_shape_scales_and_centers() {
        let node = Node::new()
            .with_box(AABB::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(2.0, 4.0, 2.0)))
            .with_physics(crate::scene::PhysicsKind::Dynamic, PhysicsShape::Box);
        let mut scene = Scene::new();
        let id = scene.insert(node);

        let collider = generic(&scene, id, &Vec3::repeat(2.0)).unwrap().build();
        let cuboid = collider.shape().as_cuboid().unwrap();
        assert_relative_eq!(cuboid.half_extents, Vec3::new(2.0, 4.0, 2.0));
        assert_relative_eq!(collider.position().translation.vector, Vec3::new(2.0, 4.0, 2.0));
    }

    #[test]
    fn test_hull_merges_children() {
        let mut scene = Scene::new();
        let parent = scene.insert(Node::mesh(Mesh::new(MeshGeometry::cuboid(Vec3::repeat(1.0)))));
        let child = scene.insert_child(parent, Node::mesh(Mesh::new(MeshGeometry::cuboid(Vec3::repeat(1.0)))));
        scene.set_transform(child, Mat4::new_translation(&Vec3::new(0.0, 5.0, 0.0)));

        let collider = hull(&scene, parent, &Vec3::repeat(1.0)).unwrap().build();
        let aabb = collider.shape().compute_local_aabb();
        assert_relative_eq!(aabb.maxs.y, 6.0, epsilon = 1e-5);
        assert_relative_eq!(aabb.mins.y, -1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_empty_sources_give_no_shape() {
        let empty = Node::mesh(Mesh::new(MeshGeometry::default()));
        assert!(trimesh(&empty, &Vec3::repeat(1.0)).is_none());
        assert!(trimesh(&Node::new(), &Vec3::repeat(1.0)).is_none());

        let fallback = actor(&Node::new(), &Vec3::repeat(1.0)).build();
        let capsule = fallback.shape().as_capsule().unwrap();
        assert_relative_eq!(capsule.radius, ACTOR_RADIUS);
    }
}
