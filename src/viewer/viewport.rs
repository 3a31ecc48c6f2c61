//! 3D viewport widget for egui.

use egui::{Response, Sense, Ui, Vec2};

use super::camera::OrbitCamera;
use super::renderer::{CameraFrame, Renderer};
use super::settings::EffectSettings;

/// 3D viewport state: camera, renderer and the egui-registered texture
/// the renderer draws into.
pub struct Viewport {
    pub camera: OrbitCamera,
    pub renderer: Option<Renderer>,
    texture_id: Option<egui::TextureId>,
    render_texture: Option<RenderTexture>,
}

struct RenderTexture {
    #[allow(dead_code)]
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    size: (u32, u32),
}

impl Viewport {
    pub fn new() -> Self {
        Self {
            camera: OrbitCamera::default(),
            renderer: None,
            texture_id: None,
            render_texture: None,
        }
    }

    /// Initialize renderer (call once when the wgpu context is available).
    pub fn init_renderer(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        format: wgpu::TextureFormat,
        msaa_samples: u32,
    ) {
        self.renderer = Some(Renderer::new(
            std::sync::Arc::new(device.clone()),
            std::sync::Arc::new(queue.clone()),
            format,
            msaa_samples,
        ));
    }

    /// Show the viewport and drive one frame.
    pub fn show(
        &mut self,
        ui: &mut Ui,
        wgpu_render_state: Option<&egui_wgpu::RenderState>,
        fx: &EffectSettings,
    ) -> Response {
        let _span = tracing::info_span!("viewport_show").entered();
        let available = ui.available_size();
        let size = Vec2::new(available.x.max(64.0), available.y.max(64.0));

        let (rect, response) = ui.allocate_exact_size(size, Sense::click_and_drag());

        self.handle_input(ui, &response);
        self.camera.update(ui.input(|i| i.stable_dt));

        if let Some(render_state) = wgpu_render_state {
            let width = size.x as u32;
            let height = size.y as u32;

            if width > 0 && height > 0 {
                let aspect = size.x / size.y;
                let view = self.camera.view_matrix();
                let proj = self.camera.projection_matrix(aspect);
                let frame = CameraFrame {
                    view_proj: proj * view,
                    view_inv: view.inverse(),
                    proj_inv: proj.inverse(),
                    position: self.camera.position(),
                };

                self.ensure_render_texture(render_state, width, height);

                if let (Some(renderer), Some(rt)) = (&mut self.renderer, &self.render_texture) {
                    renderer.render(&rt.view, width, height, frame, fx);
                }

                if let Some(tex_id) = self.texture_id {
                    ui.painter().image(
                        tex_id,
                        rect,
                        egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                        egui::Color32::WHITE,
                    );
                }
            }
        } else {
            ui.painter()
                .rect_filled(rect, 0.0, egui::Color32::from_rgb(30, 30, 35));
            ui.painter().text(
                rect.center(),
                egui::Align2::CENTER_CENTER,
                "Initializing...",
                egui::FontId::default(),
                egui::Color32::GRAY,
            );
        }

        response
    }

    fn ensure_render_texture(
        &mut self,
        render_state: &egui_wgpu::RenderState,
        width: u32,
        height: u32,
    ) {
        let needs_recreate = match &self.render_texture {
            Some(rt) => rt.size != (width, height),
            None => true,
        };
        if !needs_recreate {
            return;
        }

        let device = &render_state.device;
        let format = render_state.target_format;

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("viewport_render_texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let tex_id = render_state.renderer.write().register_native_texture(
            device,
            &view,
            wgpu::FilterMode::Linear,
        );

        if let Some(old_id) = self.texture_id.take() {
            render_state.renderer.write().free_texture(&old_id);
        }

        self.texture_id = Some(tex_id);
        self.render_texture = Some(RenderTexture {
            texture,
            view,
            size: (width, height),
        });
    }

    fn handle_input(&mut self, ui: &Ui, response: &Response) {
        // Orbit with left mouse drag
        if response.dragged_by(egui::PointerButton::Primary) {
            let delta = response.drag_delta();
            self.camera.orbit(delta.x, delta.y);
        }

        // Pan with middle mouse drag
        if response.dragged_by(egui::PointerButton::Middle) {
            let delta = response.drag_delta();
            self.camera.pan(delta.x, delta.y);
        }

        // Zoom with right mouse drag
        if response.dragged_by(egui::PointerButton::Secondary) {
            let delta = response.drag_delta();
            self.camera.zoom(delta.y * 0.1);
        }

        // Zoom with scroll
        if response.hovered() {
            let scroll = ui.input(|i| i.raw_scroll_delta.y);
            if scroll.abs() > 0.0 {
                self.camera.zoom(scroll * 0.1);
            }
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new()
    }
}
