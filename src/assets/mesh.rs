//! Gem mesh loading and load-time transforms.
//!
//! The mesh is read once from glTF, scaled and lifted into its display
//! pose, and never mutated again. The BVH consumes a non-indexed copy
//! produced by [`MeshData::to_triangles`].

use std::path::Path;

use glam::Vec3;

use super::AssetError;
use crate::bvh::Triangle;

/// Bounding radius the loaded gem is normalized to.
pub const GEM_RADIUS: f32 = 40.0;
/// Vertical lift applied after normalization.
pub const GEM_LIFT: f32 = 5.0;

/// Indexed triangle mesh with per-vertex normals.
#[derive(Debug, Clone)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Load the first mesh primitive with positions from a glTF file.
    ///
    /// Missing normals are synthesized (area-weighted vertex normals);
    /// missing indices mean the positions are already a triangle soup.
    pub fn load_gltf(path: &Path) -> Result<Self, AssetError> {
        if !path.exists() {
            return Err(AssetError::NotFound(path.to_path_buf()));
        }
        let (document, buffers, _images) = gltf::import(path)
            .map_err(|e| AssetError::GltfLoadFailed(path.to_path_buf(), e.to_string()))?;

        for mesh in document.meshes() {
            for primitive in mesh.primitives() {
                let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

                let positions: Vec<[f32; 3]> = match reader.read_positions() {
                    Some(iter) => iter.collect(),
                    None => continue,
                };
                if positions.is_empty() {
                    continue;
                }

                let indices: Vec<u32> = reader
                    .read_indices()
                    .map(|idx| idx.into_u32().collect())
                    .unwrap_or_else(|| (0..positions.len() as u32).collect());

                let normals: Vec<[f32; 3]> = reader
                    .read_normals()
                    .map(|iter| iter.collect())
                    .unwrap_or_default();

                let mut data = Self {
                    positions,
                    normals,
                    indices,
                };
                if data.normals.len() != data.positions.len() {
                    data.normals = compute_vertex_normals(&data.positions, &data.indices);
                }
                log::debug!(
                    "loaded mesh '{}': {} vertices, {} triangles",
                    path.display(),
                    data.positions.len(),
                    data.triangle_count()
                );
                return Ok(data);
            }
        }

        Err(AssetError::EmptyMesh(path.to_path_buf()))
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Bounding radius around the origin-centered bounding box center.
    pub fn bounding_center_radius(&self) -> (Vec3, f32) {
        let mut min = Vec3::splat(f32::INFINITY);
        let mut max = Vec3::splat(f32::NEG_INFINITY);
        for p in &self.positions {
            let v = Vec3::from(*p);
            min = min.min(v);
            max = max.max(v);
        }
        if self.positions.is_empty() {
            return (Vec3::ZERO, 0.0);
        }
        let center = (min + max) * 0.5;
        let radius = self
            .positions
            .iter()
            .map(|p| (Vec3::from(*p) - center).length())
            .fold(0.0f32, f32::max);
        (center, radius)
    }

    /// One-time display transform: center the mesh, scale its bounding
    /// radius to `radius`, then lift it by `lift` along +Y.
    pub fn apply_display_transform(&mut self, radius: f32, lift: f32) {
        let (center, current) = self.bounding_center_radius();
        if current <= f32::EPSILON {
            return;
        }
        let scale = radius / current;
        for p in &mut self.positions {
            let v = (Vec3::from(*p) - center) * scale + Vec3::new(0.0, lift, 0.0);
            *p = v.to_array();
        }
    }

    /// Expand to a non-indexed triangle list for BVH construction.
    pub fn to_triangles(&self) -> Vec<Triangle> {
        let mut tris = Vec::with_capacity(self.indices.len() / 3);
        for chunk in self.indices.chunks_exact(3) {
            let (i0, i1, i2) = (chunk[0] as usize, chunk[1] as usize, chunk[2] as usize);
            if i0 >= self.positions.len() || i1 >= self.positions.len() || i2 >= self.positions.len()
            {
                continue;
            }
            tris.push(Triangle {
                v0: self.positions[i0],
                v1: self.positions[i1],
                v2: self.positions[i2],
            });
        }
        tris
    }
}

/// Area-weighted vertex normals (cross products accumulate unnormalized,
/// so larger faces weigh more).
fn compute_vertex_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut acc = vec![Vec3::ZERO; positions.len()];
    for chunk in indices.chunks_exact(3) {
        let (i0, i1, i2) = (chunk[0] as usize, chunk[1] as usize, chunk[2] as usize);
        if i0 >= positions.len() || i1 >= positions.len() || i2 >= positions.len() {
            continue;
        }
        let p0 = Vec3::from(positions[i0]);
        let p1 = Vec3::from(positions[i1]);
        let p2 = Vec3::from(positions[i2]);
        let n = (p1 - p0).cross(p2 - p0);
        acc[i0] += n;
        acc[i1] += n;
        acc[i2] += n;
    }
    acc.into_iter()
        .map(|n| n.normalize_or_zero().to_array())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> MeshData {
        MeshData {
            positions: vec![
                [0.0, 0.0, 0.0],
                [2.0, 0.0, 0.0],
                [2.0, 2.0, 0.0],
                [0.0, 2.0, 0.0],
            ],
            normals: vec![[0.0, 0.0, 1.0]; 4],
            indices: vec![0, 1, 2, 0, 2, 3],
        }
    }

    #[test]
    fn non_indexed_expansion_matches_index_count() {
        let mesh = quad();
        let tris = mesh.to_triangles();
        assert_eq!(tris.len(), mesh.indices.len() / 3);
        assert_eq!(tris.len(), mesh.triangle_count());
    }

    #[test]
    fn display_transform_normalizes_radius_and_lifts() {
        let mut mesh = quad();
        mesh.apply_display_transform(GEM_RADIUS, GEM_LIFT);
        let (center, radius) = mesh.bounding_center_radius();
        assert!((radius - GEM_RADIUS).abs() < 1e-3, "radius {radius}");
        assert!((center.y - GEM_LIFT).abs() < 1e-3, "center {center}");
        assert!(center.x.abs() < 1e-3 && center.z.abs() < 1e-3);
    }

    #[test]
    fn out_of_range_indices_are_skipped() {
        let mut mesh = quad();
        mesh.indices.extend_from_slice(&[0, 1, 99]);
        assert_eq!(mesh.to_triangles().len(), 2);
    }

    #[test]
    fn synthesized_normals_are_unit_length() {
        let mesh = quad();
        let normals = compute_vertex_normals(&mesh.positions, &mesh.indices);
        for n in normals {
            let len = Vec3::from(n).length();
            assert!((len - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn missing_file_reports_not_found() {
        let err = MeshData::load_gltf(Path::new("/nonexistent/gem.glb")).unwrap_err();
        assert!(matches!(err, AssetError::NotFound(_)));
    }
}
