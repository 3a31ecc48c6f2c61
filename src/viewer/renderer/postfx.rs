//! Post-processing pass chain.
//!
//! The chain is built once from the MSAA configuration and executes in
//! fixed order after the scene pass: effect → tone map → gamma, with
//! FXAA appended when multisampling is off. Each pass is one
//! fullscreen-triangle draw reading the previous target.

use wgpu::util::DeviceExt;

use super::resources::{
    build_pass_list, FxaaParams, PassKind, RenderTargets, ToneMapParams, HDR_FORMAT, LDR_FORMAT,
};
use super::shaders::{
    fullscreen_shader, EFFECT_SHADER_BODY, FXAA_SHADER_BODY, GAMMA_SHADER_BODY,
    TONEMAP_SHADER_BODY,
};

struct PostPass {
    kind: PassKind,
    pipeline: wgpu::RenderPipeline,
    params: Option<wgpu::Buffer>,
    bind_group: Option<wgpu::BindGroup>,
}

pub struct PassChain {
    passes: Vec<PostPass>,
    sampler: wgpu::Sampler,
    layout_tex: wgpu::BindGroupLayout,
    layout_tex_params: wgpu::BindGroupLayout,
}

impl PassChain {
    pub fn new(device: &wgpu::Device, msaa_samples: u32, final_format: wgpu::TextureFormat) -> Self {
        let layout_tex = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("postfx_tex_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let layout_tex_params = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("postfx_tex_params_layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("postfx_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let kinds = build_pass_list(msaa_samples);
        let has_fxaa = kinds.contains(&PassKind::Fxaa);

        let passes = kinds
            .iter()
            .map(|&kind| {
                let (body, entry, format) = match kind {
                    PassKind::Effect => (EFFECT_SHADER_BODY, "fs_effect", HDR_FORMAT),
                    PassKind::ToneMap => (TONEMAP_SHADER_BODY, "fs_tonemap", HDR_FORMAT),
                    PassKind::Gamma => {
                        let out = if has_fxaa { LDR_FORMAT } else { final_format };
                        (GAMMA_SHADER_BODY, "fs_gamma", out)
                    }
                    PassKind::Fxaa => (FXAA_SHADER_BODY, "fs_fxaa", final_format),
                };

                let params = match kind {
                    PassKind::ToneMap => {
                        Some(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                            label: Some("tonemap_params"),
                            contents: bytemuck::bytes_of(&ToneMapParams {
                                exposure: 1.0,
                                _pad: [0.0; 3],
                            }),
                            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                        }))
                    }
                    PassKind::Fxaa => {
                        Some(device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                            label: Some("fxaa_params"),
                            contents: bytemuck::bytes_of(&FxaaParams {
                                texel: [0.0, 0.0],
                                _pad: [0.0; 2],
                            }),
                            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                        }))
                    }
                    _ => None,
                };

                let layout = if params.is_some() {
                    &layout_tex_params
                } else {
                    &layout_tex
                };
                let pipeline_layout =
                    device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                        label: Some("postfx_pipeline_layout"),
                        bind_group_layouts: &[layout],
                        push_constant_ranges: &[],
                    });

                let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
                    label: Some("postfx_shader"),
                    source: wgpu::ShaderSource::Wgsl(fullscreen_shader(body).into()),
                });

                let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                    label: Some("postfx_pipeline"),
                    layout: Some(&pipeline_layout),
                    vertex: wgpu::VertexState {
                        module: &shader,
                        entry_point: Some("vs_fullscreen"),
                        compilation_options: Default::default(),
                        buffers: &[],
                    },
                    fragment: Some(wgpu::FragmentState {
                        module: &shader,
                        entry_point: Some(entry),
                        compilation_options: Default::default(),
                        targets: &[Some(wgpu::ColorTargetState {
                            format,
                            blend: Some(wgpu::BlendState::REPLACE),
                            write_mask: wgpu::ColorWrites::ALL,
                        })],
                    }),
                    primitive: wgpu::PrimitiveState::default(),
                    depth_stencil: None,
                    multisample: wgpu::MultisampleState::default(),
                    multiview: None,
                    cache: None,
                });

                PostPass {
                    kind,
                    pipeline,
                    params,
                    bind_group: None,
                }
            })
            .collect();

        Self {
            passes,
            sampler,
            layout_tex,
            layout_tex_params,
        }
    }

    pub fn has_fxaa(&self) -> bool {
        self.passes.iter().any(|p| p.kind == PassKind::Fxaa)
    }

    /// Write the tone-map exposure (cheap per-frame uniform update).
    pub fn set_exposure(&self, queue: &wgpu::Queue, exposure: f32) {
        for pass in &self.passes {
            if pass.kind == PassKind::ToneMap {
                if let Some(buf) = &pass.params {
                    queue.write_buffer(
                        buf,
                        0,
                        bytemuck::bytes_of(&ToneMapParams {
                            exposure,
                            _pad: [0.0; 3],
                        }),
                    );
                }
            }
        }
    }

    /// Rebuild input bind groups after target recreation.
    pub fn rebuild_bind_groups(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        targets: &RenderTargets,
    ) {
        for pass in &mut self.passes {
            let input = match pass.kind {
                PassKind::Effect => &targets.hdr_a.view,
                PassKind::ToneMap => &targets.hdr_b.view,
                PassKind::Gamma => &targets.hdr_a.view,
                PassKind::Fxaa => {
                    &targets
                        .ldr
                        .as_ref()
                        .expect("FXAA pass requires the LDR target")
                        .view
                }
            };

            let mut entries = vec![
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(input),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ];
            let layout = if let Some(params) = &pass.params {
                entries.push(wgpu::BindGroupEntry {
                    binding: 2,
                    resource: params.as_entire_binding(),
                });
                &self.layout_tex_params
            } else {
                &self.layout_tex
            };

            pass.bind_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("postfx_bind_group"),
                layout,
                entries: &entries,
            }));

            if pass.kind == PassKind::Fxaa {
                if let Some(buf) = &pass.params {
                    let (w, h) = targets.size;
                    queue.write_buffer(
                        buf,
                        0,
                        bytemuck::bytes_of(&FxaaParams {
                            texel: [1.0 / w.max(1) as f32, 1.0 / h.max(1) as f32],
                            _pad: [0.0; 2],
                        }),
                    );
                }
            }
        }
    }

    /// Run the chain. The scene pass must already have written `hdr_a`.
    pub fn execute(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        targets: &RenderTargets,
        final_view: &wgpu::TextureView,
    ) {
        for pass in &self.passes {
            let Some(bind_group) = &pass.bind_group else {
                return;
            };

            let target = match pass.kind {
                PassKind::Effect => &targets.hdr_b.view,
                PassKind::ToneMap => &targets.hdr_a.view,
                PassKind::Gamma => {
                    if self.has_fxaa() {
                        &targets
                            .ldr
                            .as_ref()
                            .expect("FXAA pass requires the LDR target")
                            .view
                    } else {
                        final_view
                    }
                }
                PassKind::Fxaa => final_view,
            };

            let mut rp = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("postfx_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            rp.set_pipeline(&pass.pipeline);
            rp.set_bind_group(0, bind_group, &[]);
            rp.draw(0..3, 0..1);
        }
    }
}
