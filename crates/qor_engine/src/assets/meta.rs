//! Node configuration documents
//!
//! A node may carry a free-form JSON document (spawn parameters, gameplay
//! tags). Documents are read from `.json` files next to the model they
//! describe.

use std::path::Path;

use crate::assets::{expect_extension, AssetError};
use crate::scene::{NodeId, Scene};

/// Read a JSON document
pub fn load_document(path: impl AsRef<Path>) -> Result<serde_json::Value, AssetError> {
    let path = path.as_ref();
    expect_extension(path, &["json"])?;
    let text = std::fs::read_to_string(path).map_err(|source| AssetError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|e| AssetError::Parse {
        path: path.to_path_buf(),
        line: e.line(),
        message: e.to_string(),
    })
}

/// Read a JSON document and attach it to a node.
///
/// Returns `Ok(false)` when the node no longer exists.
pub fn attach_document(scene: &mut Scene, id: NodeId, path: impl AsRef<Path>) -> Result<bool, AssetError> {
    let document = load_document(path)?;
    Ok(scene.get_mut(id).map(|node| node.config = Some(document)).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Node;

    #[test]
    fn test_attach_and_query() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("crate.json");
        std::fs::write(&path, r#"{ "spawn": "enemy", "health": 3 }"#).unwrap();

        let mut scene = Scene::new();
        let id = scene.insert(Node::new());
        assert!(attach_document(&mut scene, id, &path).unwrap());

        let node = scene.get(id).unwrap();
        assert_eq!(node.config_str("spawn"), Some("enemy"));
        assert_eq!(node.config_str("health"), None);

        scene.destroy(id);
        assert!(!attach_document(&mut scene, id, &path).unwrap());
    }

    #[test]
    fn test_parse_error_reports_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{\n  \"a\": 1,\n  oops\n}").unwrap();

        let err = load_document(&path).unwrap_err();
        assert!(matches!(err, AssetError::Parse { line: 3, .. }));
    }
}
