//! Asset ingestion
//!
//! Loaders turn files into engine objects: OBJ models into mesh nodes,
//! images into [`Texture`]s, JSON documents into node configuration. All of
//! them report failures as [`AssetError`] carrying the offending path.

pub mod obj_loader;
pub mod texture;
pub mod meta;

pub use obj_loader::{ObjFile, ObjUnit};
pub use texture::Texture;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::config::AssetConfig;

/// Asset loading errors
#[derive(Error, Debug)]
pub enum AssetError {
    /// File could not be read
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        /// File that failed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// File contents are malformed
    #[error("{}:{line}: {message}", .path.display())]
    Parse {
        /// File that failed
        path: PathBuf,
        /// 1-based line, 0 when unknown
        line: usize,
        /// What was wrong
        message: String,
    },

    /// File type or contents not handled by this loader
    #[error("unsupported asset {}: {reason}", .path.display())]
    Unsupported {
        /// File that failed
        path: PathBuf,
        /// Why it was rejected
        reason: String,
    },
}

impl AssetError {
    /// Path of the asset that failed
    pub fn path(&self) -> &Path {
        match self {
            Self::Read { path, .. } | Self::Parse { path, .. } | Self::Unsupported { path, .. } => path,
        }
    }

    pub(crate) fn unsupported(path: &Path, reason: impl Into<String>) -> Self {
        Self::Unsupported {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

/// Check a path's extension before loading, case-insensitively
pub(crate) fn expect_extension(path: &Path, expected: &[&str]) -> Result<(), AssetError> {
    let ext = path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase);
    match ext {
        Some(ext) if expected.contains(&ext.as_str()) => Ok(()),
        _ => Err(AssetError::unsupported(path, format!("expected one of {expected:?}"))),
    }
}

/// Resolves asset names against the configured asset directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPaths {
    root: PathBuf,
}

impl AssetPaths {
    /// Paths rooted at `config.assets_dir`
    pub fn new(config: &AssetConfig) -> Self {
        Self {
            root: PathBuf::from(&config.assets_dir),
        }
    }

    /// Asset directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of a named asset; absolute names are kept as they are
    pub fn resolve(&self, name: impl AsRef<Path>) -> PathBuf {
        let name = name.as_ref();
        if name.is_absolute() {
            name.to_path_buf()
        } else {
            self.root.join(name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_relative_and_absolute() {
        let paths = AssetPaths::new(&AssetConfig::default());
        assert_eq!(paths.resolve("ship.obj"), Path::new("resources").join("ship.obj"));

        let absolute = std::env::temp_dir().join("ship.obj");
        assert_eq!(paths.resolve(&absolute), absolute);
    }

    #[test]
    fn test_extension_check() {
        assert!(expect_extension(Path::new("a/B.OBJ"), &["obj"]).is_ok());
        let err = expect_extension(Path::new("a/b.fbx"), &["obj"]).unwrap_err();
        assert!(matches!(err, AssetError::Unsupported { .. }));
        assert_eq!(err.path(), Path::new("a/b.fbx"));
    }
}
