//! wgpu renderer: gem scene pass + post chain.

use std::sync::Arc;

use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

mod passes;
mod pipelines;
mod postfx;
mod resources;
mod shaders;

use crate::assets::environment::CubeMap;
use crate::assets::mesh::MeshData;
use crate::bvh::GpuSceneData;
use crate::viewer::settings::EffectSettings;
use pipelines::{create_bind_group_layouts, create_scene_pipelines, BindGroupLayouts, ScenePipelines};
use postfx::PassChain;
use resources::{step_rotation, CameraUniform, GemParams, GemVertex, RenderTargets};

/// Camera matrices for one frame.
#[derive(Debug, Clone, Copy)]
pub struct CameraFrame {
    pub view_proj: Mat4,
    /// Camera world matrix (inverse view).
    pub view_inv: Mat4,
    pub proj_inv: Mat4,
    pub position: Vec3,
}

/// GPU mesh data for the gem.
struct GemMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

/// Main renderer state.
pub struct Renderer {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,

    layouts: BindGroupLayouts,
    pipelines: ScenePipelines,
    chain: PassChain,
    targets: Option<RenderTargets>,
    msaa_samples: u32,

    // Per-frame uniforms
    camera_buffer: wgpu::Buffer,
    params_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,

    // Scene resources (environment + BVH); stub content until loaded
    #[allow(dead_code)]
    env_texture: wgpu::Texture,
    env_view: wgpu::TextureView,
    env_sampler: wgpu::Sampler,
    nodes_buffer: wgpu::Buffer,
    tris_buffer: wgpu::Buffer,
    scene_bind_group: wgpu::BindGroup,
    env_loaded: bool,

    gem: Option<GemMesh>,

    /// Gem rotation angle, advanced by a fixed step each frame.
    rotation: f32,

    // Stats for the UI
    pub tri_count: u32,
    pub node_count: u32,
}

impl Renderer {
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        final_format: wgpu::TextureFormat,
        msaa_samples: u32,
    ) -> Self {
        let layouts = create_bind_group_layouts(&device);
        let pipelines = create_scene_pipelines(&device, &layouts, msaa_samples);
        let chain = PassChain::new(&device, msaa_samples, final_format);

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("camera_buffer"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("gem_params_buffer"),
            size: std::mem::size_of::<GemParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame_bind_group"),
            layout: &layouts.frame,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: params_buffer.as_entire_binding(),
                },
            ],
        });

        // Default environment: 1x1 black cube until assets arrive
        let env_texture = create_default_env(&device, &queue);
        let env_view = env_texture.create_view(&wgpu::TextureViewDescriptor {
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        let env_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("env_sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        // Stub BVH buffers (wgpu requires non-empty bindings)
        let nodes_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("bvh_nodes"),
            contents: &[0u8; 32],
            usage: wgpu::BufferUsages::STORAGE,
        });
        let tris_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("bvh_triangles"),
            contents: &[0u8; 48],
            usage: wgpu::BufferUsages::STORAGE,
        });

        let scene_bind_group = create_scene_bind_group(
            &device,
            &layouts.scene,
            &env_view,
            &env_sampler,
            &nodes_buffer,
            &tris_buffer,
        );

        Self {
            device,
            queue,
            layouts,
            pipelines,
            chain,
            targets: None,
            msaa_samples,
            camera_buffer,
            params_buffer,
            frame_bind_group,
            env_texture,
            env_view,
            env_sampler,
            nodes_buffer,
            tris_buffer,
            scene_bind_group,
            env_loaded: false,
            gem: None,
            rotation: 0.0,
            tri_count: 0,
            node_count: 0,
        }
    }

    /// Upload a decoded cube map (all mip levels).
    pub fn set_environment(&mut self, cube: &CubeMap) {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("env_cube_texture"),
            size: wgpu::Extent3d {
                width: cube.size,
                height: cube.size,
                depth_or_array_layers: 6,
            },
            mip_level_count: cube.mip_count(),
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba16Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (level_idx, level) in cube.levels.iter().enumerate() {
            for face in 0..6usize {
                let bytes = cube.face_f16_bytes(level_idx, face);
                self.queue.write_texture(
                    wgpu::TexelCopyTextureInfo {
                        texture: &texture,
                        mip_level: level_idx as u32,
                        origin: wgpu::Origin3d {
                            x: 0,
                            y: 0,
                            z: face as u32,
                        },
                        aspect: wgpu::TextureAspect::All,
                    },
                    &bytes,
                    wgpu::TexelCopyBufferLayout {
                        offset: 0,
                        bytes_per_row: Some(level.size * 8),
                        rows_per_image: Some(level.size),
                    },
                    wgpu::Extent3d {
                        width: level.size,
                        height: level.size,
                        depth_or_array_layers: 1,
                    },
                );
            }
        }

        self.env_view = texture.create_view(&wgpu::TextureViewDescriptor {
            dimension: Some(wgpu::TextureViewDimension::Cube),
            ..Default::default()
        });
        self.env_texture = texture;
        self.env_loaded = true;
        self.rebuild_scene_bind_group();
        log::info!("environment uploaded: {}px, {} mips", cube.size, cube.mip_count());
    }

    /// Upload the gem mesh and its acceleration structure.
    pub fn set_gem(&mut self, mesh: &MeshData, scene: &GpuSceneData) {
        let vertices: Vec<GemVertex> = mesh
            .positions
            .iter()
            .zip(&mesh.normals)
            .map(|(p, n)| GemVertex {
                position: *p,
                normal: *n,
            })
            .collect();

        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("gem_vertex_buffer"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("gem_index_buffer"),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });

        self.nodes_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("bvh_nodes"),
                contents: scene.nodes_bytes(),
                usage: wgpu::BufferUsages::STORAGE,
            });
        self.tris_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("bvh_triangles"),
                contents: scene.triangles_bytes(),
                usage: wgpu::BufferUsages::STORAGE,
            });

        self.gem = Some(GemMesh {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        });
        self.tri_count = scene.tri_count;
        self.node_count = scene.node_count;
        self.rebuild_scene_bind_group();
    }

    pub fn has_gem(&self) -> bool {
        self.gem.is_some()
    }

    pub fn has_environment(&self) -> bool {
        self.env_loaded
    }

    fn rebuild_scene_bind_group(&mut self) {
        self.scene_bind_group = create_scene_bind_group(
            &self.device,
            &self.layouts.scene,
            &self.env_view,
            &self.env_sampler,
            &self.nodes_buffer,
            &self.tris_buffer,
        );
    }

    /// Recreate offscreen targets when the viewport size changes.
    fn ensure_targets(&mut self, width: u32, height: u32) {
        let needs_recreate = match &self.targets {
            Some(t) => t.size != (width, height),
            None => true,
        };
        if !needs_recreate {
            return;
        }
        let targets = RenderTargets::create(
            &self.device,
            width,
            height,
            self.msaa_samples,
            self.chain.has_fxaa(),
        );
        self.chain
            .rebuild_bind_groups(&self.device, &self.queue, &targets);
        self.targets = Some(targets);
        log::debug!("render targets recreated: {}x{}", width, height);
    }

    /// Render one frame into `final_view`.
    ///
    /// Pushes the full uniform set, advances the gem rotation by its
    /// fixed step, renders the scene pass and runs the post chain.
    pub fn render(
        &mut self,
        final_view: &wgpu::TextureView,
        width: u32,
        height: u32,
        camera: CameraFrame,
        fx: &EffectSettings,
    ) {
        if width == 0 || height == 0 {
            return;
        }
        self.ensure_targets(width, height);

        self.rotation = step_rotation(self.rotation);
        let model = Mat4::from_rotation_y(self.rotation);

        let camera_uniform = CameraUniform {
            view_proj: camera.view_proj.to_cols_array_2d(),
            view_inv: camera.view_inv.to_cols_array_2d(),
            proj_inv: camera.proj_inv.to_cols_array_2d(),
            position: camera.position.to_array(),
            _pad: 0.0,
        };
        self.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&camera_uniform));

        let params = GemParams::new(model, fx, (width as f32, height as f32));
        self.queue
            .write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&params));

        self.chain.set_exposure(&self.queue, fx.exposure);

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("render_encoder"),
            });

        self.render_scene_pass(&mut encoder, fx);
        if let Some(targets) = &self.targets {
            self.chain.execute(&mut encoder, targets, final_view);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
    }
}

fn create_scene_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    env_view: &wgpu::TextureView,
    env_sampler: &wgpu::Sampler,
    nodes: &wgpu::Buffer,
    tris: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("scene_bind_group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(env_view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(env_sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: nodes.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: tris.as_entire_binding(),
            },
        ],
    })
}

/// 1x1 black cube texture used before the environment loads.
fn create_default_env(device: &wgpu::Device, queue: &wgpu::Queue) -> wgpu::Texture {
    use half::f16;

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("default_env_texture"),
        size: wgpu::Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 6,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba16Float,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    let pixel: [f16; 4] = [f16::ZERO, f16::ZERO, f16::ZERO, f16::ONE];
    for face in 0..6 {
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x: 0, y: 0, z: face },
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(&pixel),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(8),
                rows_per_image: Some(1),
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
    }

    texture
}
