//! CPU-side asset decoding.
//!
//! Everything here is plain data: image decode, glTF extraction,
//! equirect-to-cube reprojection and mip building happen on the loader
//! thread; the renderer only uploads the results.

pub mod environment;
pub mod gem;
pub mod mesh;

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised while decoding asset files.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to load glTF file '{0}': {1}")]
    GltfLoadFailed(PathBuf, String),

    #[error("mesh '{0}' has no triangle data")]
    EmptyMesh(PathBuf),

    #[error("failed to load image '{0}': {1}")]
    ImageLoadFailed(PathBuf, String),

    #[error("cube faces have mismatched sizes: {0}x{0} vs {1}x{1}")]
    FaceSizeMismatch(u32, u32),

    #[error("cube face '{0}' is not square ({1}x{2})")]
    FaceNotSquare(PathBuf, u32, u32),
}

/// The six cube face stems, in wgpu layer order (+X -X +Y -Y +Z -Z).
pub const FACE_STEMS: [&str; 6] = ["posx", "negx", "posy", "negy", "posz", "negz"];

const IMAGE_EXTS: [&str; 4] = ["png", "bmp", "jpg", "jpeg"];
const RADIANCE_EXTS: [&str; 2] = ["hdr", "exr"];
const MESH_EXTS: [&str; 2] = ["glb", "gltf"];

/// Resolves asset files inside one directory.
///
/// Resolution is by convention, not manifest: the first file matching
/// each role wins. All roles are optional.
pub struct AssetPaths {
    dir: PathBuf,
}

impl AssetPaths {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// First `.hdr`/`.exr` file in the directory.
    pub fn radiance(&self) -> Option<PathBuf> {
        self.first_with_ext(&RADIANCE_EXTS)
    }

    /// First `.glb`/`.gltf` file in the directory.
    pub fn mesh(&self) -> Option<PathBuf> {
        self.first_with_ext(&MESH_EXTS)
    }

    /// The six face bitmaps, if every one of them exists.
    pub fn cube_faces(&self) -> Option<[PathBuf; 6]> {
        let mut faces: Vec<PathBuf> = Vec::with_capacity(6);
        for stem in FACE_STEMS {
            faces.push(self.face_path(stem)?);
        }
        faces.try_into().ok()
    }

    fn face_path(&self, stem: &str) -> Option<PathBuf> {
        for ext in IMAGE_EXTS {
            let candidate = self.dir.join(format!("{stem}.{ext}"));
            if candidate.exists() {
                return Some(candidate);
            }
        }
        None
    }

    fn first_with_ext(&self, exts: &[&str]) -> Option<PathBuf> {
        let mut entries: Vec<PathBuf> = std::fs::read_dir(&self.dir)
            .ok()?
            .flatten()
            .map(|e| e.path())
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| exts.contains(&e.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        entries.sort();
        entries.into_iter().next()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn face_stems_match_wgpu_layer_order() {
        assert_eq!(FACE_STEMS[0], "posx");
        assert_eq!(FACE_STEMS[5], "negz");
    }

    #[test]
    fn missing_dir_resolves_nothing() {
        let paths = AssetPaths::new("/nonexistent/gemview-test");
        assert!(paths.radiance().is_none());
        assert!(paths.mesh().is_none());
        assert!(paths.cube_faces().is_none());
    }
}
