//! Serialize BVH + triangles into GPU storage buffers.

use super::build::{build_bvh, Bvh};
use super::types::{BvhNode, GpuTriangle, Triangle};
use crate::assets::mesh::MeshData;

/// Complete scene data ready for GPU upload.
pub struct GpuSceneData {
    /// Flat BVH node array (bytemuck-castable).
    pub nodes: Vec<BvhNode>,
    /// Packed triangle data in BVH leaf order.
    pub triangles: Vec<GpuTriangle>,
    /// Total triangle count.
    pub tri_count: u32,
    /// Total node count.
    pub node_count: u32,
}

impl GpuSceneData {
    /// Build GPU-ready scene data from a BVH + its source triangles.
    ///
    /// Triangles are reordered into leaf order so leaves address
    /// contiguous runs.
    pub fn build(bvh: &Bvh, triangles: &[Triangle]) -> Self {
        let gpu_tris: Vec<GpuTriangle> = bvh
            .tri_indices
            .iter()
            .map(|&idx| triangles[idx].to_gpu())
            .collect();

        Self {
            nodes: bvh.nodes.clone(),
            triangles: gpu_tris,
            tri_count: bvh.tri_indices.len() as u32,
            node_count: bvh.nodes.len() as u32,
        }
    }

    /// Non-indexed copy + SAH build + packing in one step.
    pub fn from_mesh(mesh: &MeshData) -> Self {
        let triangles = mesh.to_triangles();
        let bvh = build_bvh(&triangles);
        Self::build(&bvh, &triangles)
    }

    /// BVH nodes as bytes.
    pub fn nodes_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.nodes)
    }

    /// Triangle data as bytes.
    pub fn triangles_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.triangles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::gem;

    #[test]
    fn counts_match_non_indexed_mesh_copy() {
        let mesh = gem::brilliant();
        let data = GpuSceneData::from_mesh(&mesh);
        assert_eq!(data.tri_count as usize, mesh.triangle_count());
        assert_eq!(data.node_count as usize, data.nodes.len());
        assert!(data.node_count as usize <= 2 * mesh.triangle_count());
        assert_eq!(data.triangles.len(), mesh.triangle_count());
    }

    #[test]
    fn byte_views_match_struct_sizes() {
        let mesh = gem::brilliant();
        let data = GpuSceneData::from_mesh(&mesh);
        assert_eq!(data.nodes_bytes().len(), data.nodes.len() * 32);
        assert_eq!(data.triangles_bytes().len(), data.triangles.len() * 48);
    }

    #[test]
    fn leaf_order_permutes_all_triangles() {
        let mesh = gem::brilliant();
        let triangles = mesh.to_triangles();
        let bvh = build_bvh(&triangles);
        let data = GpuSceneData::build(&bvh, &triangles);

        // Every source triangle must appear exactly once in leaf order
        let mut seen = vec![false; triangles.len()];
        for gpu in &data.triangles {
            let found = triangles
                .iter()
                .position(|t| t.v0 == gpu.v0 && t.v1 == gpu.v1 && t.v2 == gpu.v2)
                .expect("packed triangle not found in source");
            seen[found] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }
}
