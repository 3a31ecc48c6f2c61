//! Background asset loader.
//!
//! Decoding images, reprojecting the environment and building the BVH
//! are the slow parts of startup; they run on one worker thread while
//! the UI stays responsive. The app polls non-blockingly each frame.

use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver};
use std::thread::{self, JoinHandle};

use crate::assets::environment::{CubeMap, EquirectImage, FALLBACK_SKY_SIZE, REPROJECT_SIZE};
use crate::assets::mesh::{MeshData, GEM_LIFT, GEM_RADIUS};
use crate::assets::{gem, AssetPaths};
use crate::bvh::GpuSceneData;

/// What the loader produces: display-ready mesh, its acceleration
/// structure and the environment, plus human-readable notes about any
/// substitutions that happened along the way.
pub struct LoadedScene {
    pub mesh: MeshData,
    pub scene: GpuSceneData,
    pub cube: CubeMap,
    pub notes: Vec<String>,
}

pub struct LoadRequest {
    pub assets_dir: PathBuf,
    pub mesh_path: Option<PathBuf>,
}

/// Handle to the one-shot loader thread.
pub struct LoaderHandle {
    rx: Receiver<LoadedScene>,
    handle: Option<JoinHandle<()>>,
}

impl LoaderHandle {
    /// Spawn the loader for the given request.
    pub fn spawn(request: LoadRequest) -> Self {
        let (tx, rx) = channel();
        let handle = thread::spawn(move || {
            let scene = load_scene(request);
            // UI may already be gone; nothing to do then
            let _ = tx.send(scene);
        });
        Self {
            rx,
            handle: Some(handle),
        }
    }

    /// Check for the finished scene (non-blocking).
    pub fn try_recv(&self) -> Option<LoadedScene> {
        self.rx.try_recv().ok()
    }
}

impl Drop for LoaderHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[tracing::instrument(skip_all)]
fn load_scene(request: LoadRequest) -> LoadedScene {
    let paths = AssetPaths::new(&request.assets_dir);
    let mut notes = Vec::new();

    // Gem mesh: explicit path, then assets dir, then procedural fallback
    let mesh_path = request.mesh_path.or_else(|| paths.mesh());
    let mut mesh = match &mesh_path {
        Some(path) => match MeshData::load_gltf(path) {
            Ok(mesh) => mesh,
            Err(e) => {
                log::warn!("mesh load failed: {e}");
                notes.push(format!("{e}; using procedural gem"));
                gem::brilliant()
            }
        },
        None => {
            notes.push("no mesh file found; using procedural gem".into());
            gem::brilliant()
        }
    };
    mesh.apply_display_transform(GEM_RADIUS, GEM_LIFT);

    let scene = GpuSceneData::from_mesh(&mesh);
    log::info!(
        "gem ready: {} triangles, {} BVH nodes",
        scene.tri_count,
        scene.node_count
    );

    // Environment: explicit faces win, then reprojected radiance map,
    // then the gradient sky
    let cube = if let Some(faces) = paths.cube_faces() {
        match CubeMap::from_faces(&faces) {
            Ok(cube) => cube,
            Err(e) => {
                log::warn!("cube faces failed: {e}");
                notes.push(format!("{e}; using gradient sky"));
                CubeMap::gradient_sky(FALLBACK_SKY_SIZE)
            }
        }
    } else if let Some(radiance) = paths.radiance() {
        match EquirectImage::load(&radiance) {
            Ok(equirect) => CubeMap::from_equirect(&equirect, REPROJECT_SIZE),
            Err(e) => {
                log::warn!("radiance map failed: {e}");
                notes.push(format!("{e}; using gradient sky"));
                CubeMap::gradient_sky(FALLBACK_SKY_SIZE)
            }
        }
    } else {
        notes.push("no environment found; using gradient sky".into());
        CubeMap::gradient_sky(FALLBACK_SKY_SIZE)
    };

    LoadedScene {
        mesh,
        scene,
        cube,
        notes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_dir_falls_back_everywhere() {
        let handle = LoaderHandle::spawn(LoadRequest {
            assets_dir: PathBuf::from("/nonexistent/gemview-assets"),
            mesh_path: None,
        });
        // Block on the result via the thread join, then drain
        let scene = handle
            .rx
            .recv_timeout(std::time::Duration::from_secs(30))
            .expect("loader must complete");
        assert!(scene.scene.tri_count > 0);
        assert!(scene.cube.mip_count() > 1);
        assert_eq!(scene.notes.len(), 2);
    }
}
