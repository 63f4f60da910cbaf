//! OBJ model ingestion
//!
//! A file is split into units, one per `object:material` combination (a new
//! `o` or `usemtl` line starts a new unit). Each unit becomes one indexed
//! [`MeshGeometry`] in which every distinct `v/vt/vn` tuple is one vertex.
//! Polygons with more than three corners are fan-triangulated.

use std::collections::HashMap;
use std::path::Path;

use crate::assets::{expect_extension, AssetError};
use crate::foundation::bounds::AABB;
use crate::foundation::math::{Vec2, Vec3};
use crate::scene::{Mesh, MeshGeometry, Node, NodeId, Scene};

/// One `object:material` section of an OBJ file
#[derive(Debug, Clone, PartialEq)]
pub struct ObjUnit {
    /// Object name (`o`), empty before the first `o` line
    pub object: String,
    /// Material name (`usemtl`)
    pub material: Option<String>,
    /// Indexed geometry
    pub geometry: MeshGeometry,
}

impl ObjUnit {
    /// `object:material`
    pub fn name(&self) -> String {
        format!("{}:{}", self.object, self.material.as_deref().unwrap_or_default())
    }
}

/// Parsed OBJ file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjFile {
    /// Material libraries named by `mtllib`
    pub material_libs: Vec<String>,
    /// Units with at least one face, in file order
    pub units: Vec<ObjUnit>,
}

type VertexKey = (usize, Option<usize>, Option<usize>);

#[derive(Default)]
struct UnitBuilder {
    object: String,
    material: Option<String>,
    lookup: HashMap<VertexKey, u32>,
    geometry: MeshGeometry,
    has_wrap: bool,
    has_normals: bool,
}

impl UnitBuilder {
    fn new(object: String, material: Option<String>) -> Self {
        Self {
            object,
            material,
            ..Self::default()
        }
    }

    fn vertex(&mut self, key: VertexKey, positions: &[Vec3], wrap: &[Vec2], normals: &[Vec3]) -> u32 {
        if let Some(index) = self.lookup.get(&key) {
            return *index;
        }
        let index = u32::try_from(self.geometry.vertices.len()).unwrap_or(u32::MAX);
        self.geometry.vertices.push(positions[key.0]);
        self.geometry.wrap.push(key.1.map_or_else(Vec2::zeros, |i| wrap[i]));
        self.geometry.normals.push(key.2.map_or_else(Vec3::zeros, |i| normals[i]));
        self.has_wrap |= key.1.is_some();
        self.has_normals |= key.2.is_some();
        self.lookup.insert(key, index);
        index
    }

    fn finish(mut self) -> Option<ObjUnit> {
        if self.geometry.faces.is_empty() {
            return None;
        }
        if !self.has_wrap {
            self.geometry.wrap.clear();
        }
        if !self.has_normals {
            self.geometry.normals.clear();
        }
        Some(ObjUnit {
            object: self.object,
            material: self.material,
            geometry: self.geometry,
        })
    }
}

fn parse_floats<const N: usize>(path: &Path, line: usize, args: &[&str]) -> Result<[f32; N], AssetError> {
    let mut out = [0.0; N];
    for (i, slot) in out.iter_mut().enumerate() {
        let token = args.get(i).ok_or_else(|| parse_error(path, line, format!("expected {N} numbers")))?;
        *slot = token
            .parse()
            .map_err(|_| parse_error(path, line, format!("invalid number {token:?}")))?;
    }
    Ok(out)
}

fn parse_error(path: &Path, line: usize, message: impl Into<String>) -> AssetError {
    AssetError::Parse {
        path: path.to_path_buf(),
        line,
        message: message.into(),
    }
}

/// Resolve a 1-based (or negative, relative) OBJ index against `len` items
fn resolve_index(path: &Path, line: usize, token: &str, len: usize) -> Result<usize, AssetError> {
    let raw: i64 = token
        .parse()
        .map_err(|_| parse_error(path, line, format!("invalid index {token:?}")))?;
    let len_i = i64::try_from(len).unwrap_or(i64::MAX);
    let resolved = if raw < 0 { len_i + raw } else { raw - 1 };
    if (0..len_i).contains(&resolved) {
        usize::try_from(resolved).map_err(|_| parse_error(path, line, "index out of range"))
    } else {
        Err(parse_error(path, line, format!("index {raw} out of range (have {len})")))
    }
}

/// Parse OBJ text; `path` is only used for error reporting
pub fn parse(path: &Path, text: &str) -> Result<ObjFile, AssetError> {
    let mut positions: Vec<Vec3> = Vec::new();
    let mut wrap: Vec<Vec2> = Vec::new();
    let mut normals: Vec<Vec3> = Vec::new();

    let mut file = ObjFile::default();
    let mut unit = UnitBuilder::default();
    let mut warned_polygon = false;

    for (n, raw) in text.lines().enumerate() {
        let line = n + 1;
        let mut tokens = raw.split_whitespace();
        let Some(keyword) = tokens.next() else {
            continue;
        };
        let args: Vec<&str> = tokens.collect();

        match keyword {
            "v" => {
                let [x, y, z] = parse_floats::<3>(path, line, &args)?;
                positions.push(Vec3::new(x, y, z));
            }
            "vt" => {
                let [u, v] = parse_floats::<2>(path, line, &args)?;
                wrap.push(Vec2::new(u, v));
            }
            "vn" => {
                let [x, y, z] = parse_floats::<3>(path, line, &args)?;
                normals.push(Vec3::new(x, y, z));
            }
            "o" => {
                let object = args.join(" ");
                let material = unit.material.clone();
                if let Some(done) = std::mem::replace(&mut unit, UnitBuilder::new(object, material)).finish() {
                    file.units.push(done);
                }
            }
            "usemtl" => {
                let material = Some(args.join(" "));
                let object = unit.object.clone();
                if let Some(done) = std::mem::replace(&mut unit, UnitBuilder::new(object, material)).finish() {
                    file.units.push(done);
                }
            }
            "mtllib" => file.material_libs.extend(args.iter().map(|s| (*s).to_string())),
            "f" => {
                if args.len() < 3 {
                    return Err(parse_error(path, line, "face needs at least 3 vertices"));
                }
                if args.len() > 3 && !warned_polygon {
                    log::warn!("{}:{}: non-triangle face, triangulating", path.display(), line);
                    warned_polygon = true;
                }

                let mut corners = Vec::with_capacity(args.len());
                for corner in &args {
                    let mut parts = corner.split('/');
                    let v = resolve_index(path, line, parts.next().unwrap_or_default(), positions.len())?;
                    let vt = match parts.next() {
                        Some(t) if !t.is_empty() => Some(resolve_index(path, line, t, wrap.len())?),
                        _ => None,
                    };
                    let vn = match parts.next() {
                        Some(t) if !t.is_empty() => Some(resolve_index(path, line, t, normals.len())?),
                        _ => None,
                    };
                    corners.push(unit.vertex((v, vt, vn), &positions, &wrap, &normals));
                }

                for i in 1..corners.len() - 1 {
                    unit.geometry.faces.push([corners[0], corners[i], corners[i + 1]]);
                }
            }
            _ => {}
        }
    }

    if let Some(done) = unit.finish() {
        file.units.push(done);
    }
    Ok(file)
}

/// Read and parse an `.obj` file
pub fn load(path: impl AsRef<Path>) -> Result<ObjFile, AssetError> {
    let path = path.as_ref();
    expect_extension(path, &["obj"])?;
    let text = std::fs::read_to_string(path).map_err(|source| AssetError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file = parse(path, &text)?;
    log::debug!("loaded {} ({} units)", path.display(), file.units.len());
    Ok(file)
}

/// Names of the `object:material` units in a file
pub fn decompose(path: impl AsRef<Path>) -> Result<Vec<String>, AssetError> {
    Ok(load(path)?.units.iter().map(ObjUnit::name).collect())
}

/// Load a file as a composite node with one mesh child per unit.
///
/// The returned root is caller-owned; its box is the union of its children's.
pub fn load_composite(scene: &mut Scene, path: impl AsRef<Path>) -> Result<NodeId, AssetError> {
    let path = path.as_ref();
    let file = load(path)?;

    let name = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    let root = scene.insert(Node::new().with_name(name));

    let mut bounds = AABB::zero();
    for unit in file.units {
        let unit_name = unit.name();
        bounds = bounds.union(&unit.geometry.bounds());
        scene.insert_child(root, Node::mesh(Mesh::new(unit.geometry)).with_name(unit_name));
    }
    scene.set_box(root, bounds);
    Ok(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const CUBE_FACE: &str = "\
mtllib ship.mtl
o Hull
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn 0 0 1
usemtl Metal
f 1/1/1 2/2/1 3/3/1
f 1/1/1 3/3/1 4/4/1
o Fin
usemtl Paint
f 1 2 3 4
";

    fn obj_path() -> PathBuf {
        PathBuf::from("ship.obj")
    }

    #[test]
    fn test_units_and_dedup() {
        let file = parse(&obj_path(), CUBE_FACE).unwrap();
        assert_eq!(file.material_libs, vec!["ship.mtl".to_string()]);

        let names: Vec<_> = file.units.iter().map(ObjUnit::name).collect();
        assert_eq!(names, vec!["Hull:Metal", "Fin:Paint"]);

        let hull = &file.units[0].geometry;
        assert_eq!(hull.vertices.len(), 4);
        assert_eq!(hull.faces, vec![[0, 1, 2], [0, 2, 3]]);
        assert_eq!(hull.wrap.len(), 4);
        assert_eq!(hull.normals[0], Vec3::z());
    }

    #[test]
    fn test_polygon_fan_without_attributes() {
        let file = parse(&obj_path(), CUBE_FACE).unwrap();
        let fin = &file.units[1].geometry;
        assert_eq!(fin.faces.len(), 2);
        assert!(fin.wrap.is_empty());
        assert!(fin.normals.is_empty());
    }

    #[test]
    fn test_negative_indices() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf -3 -2 -1\n";
        let file = parse(&obj_path(), text).unwrap();
        assert_eq!(file.units[0].geometry.faces, vec![[0, 1, 2]]);
        assert_eq!(file.units[0].name(), ":");
    }

    #[test]
    fn test_parse_errors_carry_line() {
        let err = parse(&obj_path(), "v 0 0 0\nv 0 zero 0\n").unwrap_err();
        assert!(matches!(err, AssetError::Parse { line: 2, .. }));

        let err = parse(&obj_path(), "v 0 0 0\nf 1 2 3\n").unwrap_err();
        assert!(matches!(err, AssetError::Parse { line: 2, .. }));
        assert!(err.to_string().starts_with("ship.obj:2:"));
    }

    #[test]
    fn test_composite_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ship.obj");
        std::fs::write(&path, CUBE_FACE).unwrap();

        assert_eq!(decompose(&path).unwrap(), vec!["Hull:Metal", "Fin:Paint"]);

        let mut scene = Scene::new();
        let root = load_composite(&mut scene, &path).unwrap();
        let node = scene.get(root).unwrap();
        assert_eq!(node.name, "ship");
        assert_eq!(node.children().len(), 2);
        assert!(scene.get(node.children()[0]).unwrap().as_mesh().is_some());
        assert_eq!(node.local_box().max, Vec3::new(1.0, 1.0, 0.0));

        assert!(matches!(load(dir.path().join("nope.obj")), Err(AssetError::Read { .. })));
        assert!(matches!(load(dir.path().join("ship.fbx")), Err(AssetError::Unsupported { .. })));
    }
}
