//! GPU-side resources and the CPU-side uniform/pass-list logic.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::viewer::settings::EffectSettings;

/// Intermediate color format for the HDR portion of the chain.
pub const HDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;
/// Post-gamma format when FXAA still has to run.
pub const LDR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Fixed per-frame mesh rotation (radians).
pub const ROTATION_STEP: f32 = 0.01;

/// Advance the gem rotation by one frame, wrapping at a full turn.
pub fn step_rotation(angle: f32) -> f32 {
    (angle + ROTATION_STEP) % std::f32::consts::TAU
}

/// Per-channel IORs for the trace.
///
/// With aberration on, the red/blue channels get spread by `strength`;
/// all three clamp at 1 (an IOR below vacuum makes `refract` nonsense).
/// With aberration off the three channels are identical.
pub fn channel_iors(ior: f32, strength: f32, chromatic: bool) -> [f32; 3] {
    if chromatic {
        [
            (ior * (1.0 - strength)).max(1.0),
            ior.max(1.0),
            (ior * (1.0 + strength)).max(1.0),
        ]
    } else {
        [ior.max(1.0); 3]
    }
}

/// One fullscreen pass in the post chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// Consumes the scene color target as its extra input.
    Effect,
    /// ACES filmic tone mapping.
    ToneMap,
    /// Linear to sRGB.
    Gamma,
    /// Appended only when the display path has no MSAA.
    Fxaa,
}

/// The fixed pass order. Decided once at setup, never reordered.
pub fn build_pass_list(msaa_samples: u32) -> Vec<PassKind> {
    let mut passes = vec![PassKind::Effect, PassKind::ToneMap, PassKind::Gamma];
    if msaa_samples <= 1 {
        passes.push(PassKind::Fxaa);
    }
    passes
}

/// Camera uniform matching the WGSL `Camera` struct.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
    /// Camera world matrix (inverse view).
    pub view_inv: [[f32; 4]; 4],
    pub proj_inv: [[f32; 4]; 4],
    pub position: [f32; 3],
    pub _pad: f32,
}

/// Gem shader parameters matching the WGSL `GemParams` struct.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GemParams {
    pub model: [[f32; 4]; 4],
    pub model_inv: [[f32; 4]; 4],
    pub color: [f32; 4],
    /// xyz = per-channel IOR, w unused.
    pub ior: [f32; 4],
    pub resolution: [f32; 2],
    pub bounces: u32,
    pub correct_mips: u32,
    pub chromatic: u32,
    pub _pad: [u32; 3],
}

impl GemParams {
    /// Rebuild the whole uniform from panel state - every field is
    /// written every frame, nothing carries over.
    pub fn new(model: Mat4, fx: &EffectSettings, resolution: (f32, f32)) -> Self {
        let iors = channel_iors(fx.ior, fx.aberration_strength, fx.chromatic_aberration);
        Self {
            model: model.to_cols_array_2d(),
            model_inv: model.inverse().to_cols_array_2d(),
            color: [1.0, 1.0, 1.0, 1.0],
            ior: [iors[0], iors[1], iors[2], 0.0],
            resolution: [resolution.0, resolution.1],
            bounces: fx.bounces,
            correct_mips: fx.correct_mips as u32,
            chromatic: fx.chromatic_aberration as u32,
            _pad: [0; 3],
        }
    }
}

/// Tone-map pass parameters.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ToneMapParams {
    pub exposure: f32,
    pub _pad: [f32; 3],
}

/// FXAA pass parameters.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct FxaaParams {
    /// 1 / resolution.
    pub texel: [f32; 2],
    pub _pad: [f32; 2],
}

/// A color or depth attachment with its view.
pub struct TargetTexture {
    #[allow(dead_code)]
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl TargetTexture {
    fn new(
        device: &wgpu::Device,
        label: &str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        samples: u32,
        usage: wgpu::TextureUsages,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: samples,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

/// All offscreen targets for one viewport size.
///
/// `hdr_a`/`hdr_b` ping-pong through the chain; `ldr` only exists when
/// an FXAA pass follows gamma; the MSAA pair only when multisampling.
pub struct RenderTargets {
    pub size: (u32, u32),
    pub hdr_a: TargetTexture,
    pub hdr_b: TargetTexture,
    pub ldr: Option<TargetTexture>,
    pub depth: TargetTexture,
    pub msaa_color: Option<TargetTexture>,
}

impl RenderTargets {
    pub fn create(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        msaa_samples: u32,
        needs_ldr: bool,
    ) -> Self {
        let attach_and_bind =
            wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
        let hdr_a = TargetTexture::new(
            device, "hdr_target_a", width, height, HDR_FORMAT, 1, attach_and_bind,
        );
        let hdr_b = TargetTexture::new(
            device, "hdr_target_b", width, height, HDR_FORMAT, 1, attach_and_bind,
        );
        let ldr = needs_ldr.then(|| {
            TargetTexture::new(
                device, "ldr_target", width, height, LDR_FORMAT, 1, attach_and_bind,
            )
        });
        let depth = TargetTexture::new(
            device,
            "depth_target",
            width,
            height,
            DEPTH_FORMAT,
            msaa_samples,
            wgpu::TextureUsages::RENDER_ATTACHMENT,
        );
        let msaa_color = (msaa_samples > 1).then(|| {
            TargetTexture::new(
                device,
                "msaa_color_target",
                width,
                height,
                HDR_FORMAT,
                msaa_samples,
                wgpu::TextureUsages::RENDER_ATTACHMENT,
            )
        });
        Self {
            size: (width, height),
            hdr_a,
            hdr_b,
            ldr,
            depth,
            msaa_color,
        }
    }
}

/// Gem vertex: interleaved position + normal.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct GemVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl GemVertex {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<GemVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x3,
                offset: 0,
                shader_location: 0,
            },
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x3,
                offset: 12,
                shader_location: 1,
            },
        ],
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aberration_off_uses_identical_channel_iors() {
        let iors = channel_iors(2.4, 0.5, false);
        assert_eq!(iors[0], iors[1]);
        assert_eq!(iors[1], iors[2]);
        assert_eq!(iors[1], 2.4);
    }

    #[test]
    fn aberration_on_spreads_and_clamps() {
        let iors = channel_iors(2.0, 0.1, true);
        assert!(iors[0] < iors[1] && iors[1] < iors[2]);
        assert!((iors[0] - 1.8).abs() < 1e-6);
        assert!((iors[2] - 2.2).abs() < 1e-6);

        // Strength large enough to push red below vacuum clamps at 1
        let clamped = channel_iors(1.05, 0.9, true);
        assert_eq!(clamped[0], 1.0);
    }

    #[test]
    fn pass_list_is_fixed_and_fxaa_conditional() {
        assert_eq!(
            build_pass_list(4),
            vec![PassKind::Effect, PassKind::ToneMap, PassKind::Gamma]
        );
        assert_eq!(
            build_pass_list(1),
            vec![
                PassKind::Effect,
                PassKind::ToneMap,
                PassKind::Gamma,
                PassKind::Fxaa
            ]
        );
    }

    #[test]
    fn gem_params_rewrite_every_field_from_panel_state() {
        let fx = EffectSettings {
            bounces: 1,
            ior: 3.0,
            aberration_strength: 0.25,
            correct_mips: false,
            chromatic_aberration: false,
            ..Default::default()
        };
        let params = GemParams::new(Mat4::IDENTITY, &fx, (800.0, 600.0));
        assert_eq!(params.bounces, 1);
        assert_eq!(params.correct_mips, 0);
        assert_eq!(params.chromatic, 0);
        assert_eq!(params.resolution, [800.0, 600.0]);
        // aberration off: all channels carry the same IOR
        assert_eq!(params.ior[0], params.ior[1]);
        assert_eq!(params.ior[1], params.ior[2]);
    }

    #[test]
    fn uniform_sizes_match_wgsl_layout() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 208);
        assert_eq!(std::mem::size_of::<GemParams>(), 192);
        assert_eq!(std::mem::size_of::<ToneMapParams>(), 16);
        assert_eq!(std::mem::size_of::<FxaaParams>(), 16);
    }

    #[test]
    fn rotation_steps_and_wraps() {
        let mut angle = 0.0;
        for _ in 0..10 {
            angle = step_rotation(angle);
        }
        assert!((angle - 10.0 * ROTATION_STEP).abs() < 1e-6);

        let wrapped = step_rotation(std::f32::consts::TAU - ROTATION_STEP * 0.5);
        assert!(wrapped < std::f32::consts::TAU);
    }
}
