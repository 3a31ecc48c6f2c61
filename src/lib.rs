//! # gemview
//!
//! Interactive viewer for a single refractive gem mesh.
//!
//! The gem is shaded by a screen-space ray-bounce fragment shader that
//! refracts view rays into the mesh, bounces them against a SAH BVH of
//! its triangles and exits into an environment cube map. A fixed post
//! chain (effect, ACES filmic tone map, gamma, optional FXAA) composites
//! the frame.
//!
//! ## Modules
//!
//! - [`assets`] - CPU-side asset decoding (glTF mesh, HDR/cube environment)
//! - [`bvh`] - SAH BVH build and GPU-uploadable scene data
//! - [`viewer`] - eframe/egui application, renderer and pass chain

pub mod assets;
pub mod bvh;
pub mod viewer;

pub use assets::AssetError;
