//! Scene render pass.

use super::Renderer;
use crate::viewer::settings::EffectSettings;

impl Renderer {
    /// Render the base scene (sky + gem) into the offscreen HDR target.
    ///
    /// With MSAA the pass draws into the multisampled color target and
    /// resolves into `hdr_a`; the post chain always reads `hdr_a`.
    pub(super) fn render_scene_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        fx: &EffectSettings,
    ) {
        let Some(targets) = &self.targets else {
            return;
        };

        let (color_view, resolve_target) = match &targets.msaa_color {
            Some(msaa) => (&msaa.view, Some(&targets.hdr_a.view)),
            None => (&targets.hdr_a.view, None),
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("scene_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color_view,
                resolve_target,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: fx.background_color[0] as f64,
                        g: fx.background_color[1] as f64,
                        b: fx.background_color[2] as f64,
                        a: fx.background_color[3] as f64,
                    }),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &targets.depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_bind_group(0, &self.frame_bind_group, &[]);
        pass.set_bind_group(1, &self.scene_bind_group, &[]);

        if fx.show_sky && self.has_environment() {
            pass.set_pipeline(&self.pipelines.sky);
            pass.draw(0..3, 0..1);
        }

        if let Some(gem) = &self.gem {
            pass.set_pipeline(&self.pipelines.gem);
            pass.set_vertex_buffer(0, gem.vertex_buffer.slice(..));
            pass.set_index_buffer(gem.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..gem.index_count, 0, 0..1);
        }
    }
}
