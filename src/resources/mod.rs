use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use thiserror::Error;

use crate::{
    animation::AnimationClip,
    data_structures::skeleton::{Skeleton, SkeletonError},
};

/**
 * This module contains all logic for loading meshes, skeletons and clips from external files.
 *
 * Everything here is CPU-side data; turning a model into something drawable is the
 * job of a `CommandRecorder`.
 */
pub mod animation;
pub mod mesh;

pub use mesh::{MeshData, Vertex};

/// Setup-time asset failures. Recoverable: the caller decides whether to
/// abort or substitute a fallback.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset '{0}' not found")]
    NotFound(String),
    #[error("asset '{name}' could not be read: {reason}")]
    Corrupt { name: String, reason: String },
    #[error("asset '{0}' has an unsupported format")]
    Unsupported(String),
    #[error("model '{0}' has no skeleton")]
    MissingSkeleton(String),
    #[error("model '{model}' has no animation named '{clip}'")]
    MissingAnimation { model: String, clip: String },
    #[error("model '{0}' contains no meshes")]
    EmptyModel(String),
    #[error("skeleton of '{name}' is invalid")]
    Skeleton {
        name: String,
        #[source]
        source: SkeletonError,
    },
}

impl AssetError {
    pub(crate) fn corrupt(name: &str, reason: impl ToString) -> Self {
        AssetError::Corrupt {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Everything loaded from one model file.
#[derive(Clone, Debug)]
pub struct ModelAsset {
    pub name: String,
    pub meshes: Vec<MeshData>,
    pub skeleton: Option<Skeleton>,
    pub clips: Vec<Arc<AnimationClip>>,
}

impl ModelAsset {
    /// A fresh skeleton instance in its rest pose.
    pub fn skeleton(&self) -> Result<Skeleton, AssetError> {
        self.skeleton
            .clone()
            .ok_or_else(|| AssetError::MissingSkeleton(self.name.clone()))
    }

    pub fn clip(&self, name: &str) -> Result<Arc<AnimationClip>, AssetError> {
        self.clips
            .iter()
            .find(|c| c.name == name)
            .cloned()
            .ok_or_else(|| AssetError::MissingAnimation {
                model: self.name.clone(),
                clip: name.to_string(),
            })
    }

    pub fn ensure_meshes(&self) -> Result<(), AssetError> {
        if self.meshes.is_empty() {
            Err(AssetError::EmptyModel(self.name.clone()))
        } else {
            Ok(())
        }
    }

    pub fn is_skinned(&self) -> bool {
        self.skeleton.is_some()
    }
}

/// Load a model by name.
pub trait AssetSource {
    fn load_model(&self, name: &str) -> Result<ModelAsset, AssetError>;
}

/// Reads models from a directory on disk. `.obj` goes through tobj,
/// `.gltf`/`.glb` through gltf.
#[derive(Clone, Debug)]
pub struct FileAssets {
    root: PathBuf,
}

impl FileAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn load_binary(&self, file_name: &str) -> Result<Vec<u8>, AssetError> {
        let path = self.root.join(file_name);
        std::fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AssetError::NotFound(file_name.to_string()),
            _ => AssetError::corrupt(file_name, e),
        })
    }
}

impl Default for FileAssets {
    fn default() -> Self {
        Self::new("assets")
    }
}

impl AssetSource for FileAssets {
    fn load_model(&self, name: &str) -> Result<ModelAsset, AssetError> {
        let extension = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let model = match extension.as_deref() {
            Some("obj") => mesh::parse_obj(name, &self.load_binary(name)?)?,
            Some("gltf") | Some("glb") => {
                let base = Path::new(name).parent().unwrap_or(Path::new(""));
                animation::parse_gltf(name, &self.load_binary(name)?, |uri| {
                    self.load_binary(&base.join(uri).to_string_lossy())
                })?
            }
            _ => return Err(AssetError::Unsupported(name.to_string())),
        };
        log::info!(
            "loaded '{}': {} meshes, {} joints, {} clips",
            name,
            model.meshes.len(),
            model.skeleton.as_ref().map_or(0, Skeleton::joint_count),
            model.clips.len()
        );
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE: &str = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0 0 1\nf 1//1 2//1 3//1\n";

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("pawn-ngin-{}-{}", tag, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn missing_file_is_not_found() {
        let assets = FileAssets::new(scratch_dir("missing"));
        let err = assets.load_model("nope.obj").unwrap_err();
        assert!(matches!(err, AssetError::NotFound(name) if name == "nope.obj"));
    }

    #[test]
    fn unknown_extension_is_unsupported() {
        let assets = FileAssets::new(scratch_dir("unsupported"));
        assert!(matches!(
            assets.load_model("snake.t3dm"),
            Err(AssetError::Unsupported(_))
        ));
    }

    #[test]
    fn loads_obj_from_disk() {
        let dir = scratch_dir("obj");
        std::fs::write(dir.join("tri.obj"), TRIANGLE).unwrap();
        let model = FileAssets::new(&dir).load_model("tri.obj").unwrap();
        assert_eq!(model.meshes.len(), 1);
        assert!(!model.is_skinned());
        assert!(matches!(model.skeleton(), Err(AssetError::MissingSkeleton(_))));
        assert!(matches!(
            model.clip("Snake_Idle"),
            Err(AssetError::MissingAnimation { .. })
        ));
    }
}
