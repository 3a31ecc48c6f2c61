//! Environment map decoding.
//!
//! The GPU side wants one cube texture with a full mip chain. Three
//! sources feed it, in priority order: six explicit face bitmaps, an
//! equirectangular HDR/EXR radiance map reprojected into faces, or a
//! procedural gradient sky. All pixel math is linear f32 RGBA here;
//! upload converts to f16.

use std::path::{Path, PathBuf};

use glam::Vec3;
use half::f16;

use super::AssetError;

/// Face edge length used when reprojecting an equirect map.
pub const REPROJECT_SIZE: u32 = 256;
/// Face edge length of the procedural fallback sky.
pub const FALLBACK_SKY_SIZE: u32 = 64;

/// Decoded equirectangular panorama (linear RGBA f32).
pub struct EquirectImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<f32>,
}

impl EquirectImage {
    /// Decode an `.hdr`/`.exr` panorama. Values stay linear.
    pub fn load(path: &Path) -> Result<Self, AssetError> {
        use image::GenericImageView;

        let img = image::ImageReader::open(path)
            .map_err(|e| AssetError::ImageLoadFailed(path.to_path_buf(), e.to_string()))?
            .decode()
            .map_err(|e| AssetError::ImageLoadFailed(path.to_path_buf(), e.to_string()))?;
        let (width, height) = img.dimensions();
        let pixels = img.to_rgba32f().into_raw();
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Bilinear sample along a world direction (+Y up). X wraps, Y clamps.
    pub fn sample_dir(&self, dir: Vec3) -> [f32; 3] {
        let d = dir.normalize_or_zero();
        let u = 0.5 + d.z.atan2(d.x) / std::f32::consts::TAU;
        let v = d.y.clamp(-1.0, 1.0).acos() / std::f32::consts::PI;

        let fx = u * self.width as f32 - 0.5;
        let fy = v * self.height as f32 - 0.5;
        let x0 = fx.floor() as i64;
        let y0 = fy.floor() as i64;
        let tx = fx - x0 as f32;
        let ty = fy - y0 as f32;

        let mut out = [0.0f32; 3];
        for (wy, y) in [(1.0 - ty, y0), (ty, y0 + 1)] {
            let y = y.clamp(0, self.height as i64 - 1) as u32;
            for (wx, x) in [(1.0 - tx, x0), (tx, x0 + 1)] {
                let x = x.rem_euclid(self.width as i64) as u32;
                let idx = ((y * self.width + x) * 4) as usize;
                let w = wx * wy;
                out[0] += self.pixels[idx] * w;
                out[1] += self.pixels[idx + 1] * w;
                out[2] += self.pixels[idx + 2] * w;
            }
        }
        out
    }
}

/// One mip level of a cube map: six square faces of linear RGBA f32.
pub struct CubeMipLevel {
    pub size: u32,
    pub faces: Vec<Vec<f32>>,
}

/// Cube map with a full mip chain (`levels[0]` is the base).
pub struct CubeMap {
    pub size: u32,
    pub levels: Vec<CubeMipLevel>,
}

impl CubeMap {
    /// Decode six face bitmaps (sRGB, linearized here).
    pub fn from_faces(paths: &[PathBuf; 6]) -> Result<Self, AssetError> {
        let mut faces = Vec::with_capacity(6);
        let mut size = 0u32;
        for path in paths {
            let img = image::ImageReader::open(path)
                .map_err(|e| AssetError::ImageLoadFailed(path.clone(), e.to_string()))?
                .decode()
                .map_err(|e| AssetError::ImageLoadFailed(path.clone(), e.to_string()))?
                .to_rgba8();
            let (w, h) = img.dimensions();
            if w != h {
                return Err(AssetError::FaceNotSquare(path.clone(), w, h));
            }
            if size == 0 {
                size = w;
            } else if w != size {
                return Err(AssetError::FaceSizeMismatch(size, w));
            }
            let linear: Vec<f32> = img
                .into_raw()
                .chunks_exact(4)
                .flat_map(|px| {
                    [
                        srgb_to_linear(px[0]),
                        srgb_to_linear(px[1]),
                        srgb_to_linear(px[2]),
                        1.0,
                    ]
                })
                .collect();
            faces.push(linear);
        }
        Ok(Self::from_base(size, faces))
    }

    /// Reproject an equirect panorama into cube faces.
    pub fn from_equirect(equirect: &EquirectImage, size: u32) -> Self {
        let mut faces = Vec::with_capacity(6);
        for face in 0..6 {
            let mut pixels = vec![0.0f32; (size * size * 4) as usize];
            for y in 0..size {
                for x in 0..size {
                    let u = (x as f32 + 0.5) / size as f32 * 2.0 - 1.0;
                    let v = (y as f32 + 0.5) / size as f32 * 2.0 - 1.0;
                    let rgb = equirect.sample_dir(face_texel_dir(face, u, v));
                    let idx = ((y * size + x) * 4) as usize;
                    pixels[idx..idx + 3].copy_from_slice(&rgb);
                    pixels[idx + 3] = 1.0;
                }
            }
            faces.push(pixels);
        }
        Self::from_base(size, faces)
    }

    /// Procedural vertical-gradient sky, the last-resort environment.
    pub fn gradient_sky(size: u32) -> Self {
        let zenith = Vec3::new(0.32, 0.42, 0.62);
        let horizon = Vec3::new(0.16, 0.16, 0.19);
        let ground = Vec3::new(0.05, 0.05, 0.06);

        let mut faces = Vec::with_capacity(6);
        for face in 0..6 {
            let mut pixels = vec![0.0f32; (size * size * 4) as usize];
            for y in 0..size {
                for x in 0..size {
                    let u = (x as f32 + 0.5) / size as f32 * 2.0 - 1.0;
                    let v = (y as f32 + 0.5) / size as f32 * 2.0 - 1.0;
                    let dir = face_texel_dir(face, u, v).normalize();
                    let rgb = if dir.y >= 0.0 {
                        horizon.lerp(zenith, dir.y.powf(0.6))
                    } else {
                        horizon.lerp(ground, (-dir.y).powf(0.8))
                    };
                    let idx = ((y * size + x) * 4) as usize;
                    pixels[idx..idx + 3].copy_from_slice(&rgb.to_array());
                    pixels[idx + 3] = 1.0;
                }
            }
            faces.push(pixels);
        }
        Self::from_base(size, faces)
    }

    /// Build the mip chain down to 1x1 with 2x2 box filtering.
    fn from_base(size: u32, faces: Vec<Vec<f32>>) -> Self {
        let mut levels = vec![CubeMipLevel { size, faces }];
        while levels.last().map(|l| l.size).unwrap_or(1) > 1 {
            let prev = levels.last().expect("at least the base level");
            let next_size = (prev.size / 2).max(1);
            let faces = prev
                .faces
                .iter()
                .map(|src| downsample(src, prev.size, next_size))
                .collect();
            levels.push(CubeMipLevel {
                size: next_size,
                faces,
            });
        }
        Self { size, levels }
    }

    pub fn mip_count(&self) -> u32 {
        self.levels.len() as u32
    }

    /// One face of one level as little-endian f16 RGBA bytes for upload.
    pub fn face_f16_bytes(&self, level: usize, face: usize) -> Vec<u8> {
        let halves: Vec<f16> = self.levels[level].faces[face]
            .iter()
            .map(|&v| f16::from_f32(v))
            .collect();
        bytemuck::cast_slice(&halves).to_vec()
    }
}

/// World direction through the center of a cube face texel.
/// `face` follows wgpu layer order (+X -X +Y -Y +Z -Z); `u`,`v` in [-1,1]
/// with `v` growing downward in the bitmap.
pub fn face_texel_dir(face: usize, u: f32, v: f32) -> Vec3 {
    match face {
        0 => Vec3::new(1.0, -v, -u),
        1 => Vec3::new(-1.0, -v, u),
        2 => Vec3::new(u, 1.0, v),
        3 => Vec3::new(u, -1.0, -v),
        4 => Vec3::new(u, -v, 1.0),
        _ => Vec3::new(-u, -v, -1.0),
    }
}

fn downsample(src: &[f32], src_size: u32, dst_size: u32) -> Vec<f32> {
    let mut dst = vec![0.0f32; (dst_size * dst_size * 4) as usize];
    for y in 0..dst_size {
        for x in 0..dst_size {
            let mut acc = [0.0f32; 4];
            for (sy, sx) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
                let px = (x * 2 + sx).min(src_size - 1);
                let py = (y * 2 + sy).min(src_size - 1);
                let idx = ((py * src_size + px) * 4) as usize;
                for c in 0..4 {
                    acc[c] += src[idx + c];
                }
            }
            let idx = ((y * dst_size + x) * 4) as usize;
            for c in 0..4 {
                dst[idx + c] = acc[c] * 0.25;
            }
        }
    }
    dst
}

fn srgb_to_linear(v: u8) -> f32 {
    let c = v as f32 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split_equirect() -> EquirectImage {
        // top half white, bottom half black
        let (w, h) = (16u32, 8u32);
        let mut pixels = vec![0.0f32; (w * h * 4) as usize];
        for y in 0..h {
            let val = if y < h / 2 { 1.0 } else { 0.0 };
            for x in 0..w {
                let idx = ((y * w + x) * 4) as usize;
                pixels[idx..idx + 4].copy_from_slice(&[val, val, val, 1.0]);
            }
        }
        EquirectImage {
            width: w,
            height: h,
            pixels,
        }
    }

    fn face_mean(level: &CubeMipLevel, face: usize) -> f32 {
        let px = &level.faces[face];
        px.chunks_exact(4).map(|p| p[0]).sum::<f32>() / (level.size * level.size) as f32
    }

    #[test]
    fn mip_chain_halves_to_one() {
        let cube = CubeMap::gradient_sky(8);
        let sizes: Vec<u32> = cube.levels.iter().map(|l| l.size).collect();
        assert_eq!(sizes, vec![8, 4, 2, 1]);
        assert_eq!(cube.mip_count(), 4);
    }

    #[test]
    fn reprojection_is_directionally_correct() {
        let cube = CubeMap::from_equirect(&split_equirect(), 8);
        let base = &cube.levels[0];
        assert!(face_mean(base, 2) > 0.9, "+Y face should be bright");
        assert!(face_mean(base, 3) < 0.1, "-Y face should be dark");
        // side faces straddle the split
        let side = face_mean(base, 0);
        assert!(side > 0.25 && side < 0.75, "side mean {side}");
    }

    #[test]
    fn gradient_sky_is_finite() {
        let cube = CubeMap::gradient_sky(FALLBACK_SKY_SIZE);
        for level in &cube.levels {
            for face in &level.faces {
                assert!(face.iter().all(|v| v.is_finite()));
            }
        }
    }

    #[test]
    fn f16_bytes_have_expected_length() {
        let cube = CubeMap::gradient_sky(4);
        assert_eq!(cube.face_f16_bytes(0, 0).len(), 4 * 4 * 4 * 2);
        assert_eq!(cube.face_f16_bytes(2, 5).len(), 4 * 2);
    }

    #[test]
    fn face_directions_hit_major_axes() {
        for (face, axis) in [
            (0, Vec3::X),
            (1, Vec3::NEG_X),
            (2, Vec3::Y),
            (3, Vec3::NEG_Y),
            (4, Vec3::Z),
            (5, Vec3::NEG_Z),
        ] {
            let dir = face_texel_dir(face, 0.0, 0.0).normalize();
            assert!((dir - axis).length() < 1e-6, "face {face}");
        }
    }
}
