//! SAH BVH over the gem triangles, built once at load time.
//!
//! ## Architecture
//! ```text
//! non-indexed mesh copy → BVH build (CPU, binned SAH) → flat buffers → fragment shader traversal
//! ```
//!
//! The node layout (32 bytes) and triangle packing match the WGSL
//! structs in the gem shader; both upload as read-only storage buffers.

pub mod build;
pub mod gpu_data;
pub mod types;

pub use build::{build_bvh, Bvh};
pub use gpu_data::GpuSceneData;
pub use types::{Aabb, BvhNode, GpuTriangle, Triangle};
