//! Main application state and UI.

use std::path::PathBuf;
use std::time::Instant;

use egui::{CentralPanel, SidePanel, TopBottomPanel};

use crate::assets::mesh::{GEM_LIFT, GEM_RADIUS};

use super::settings::Settings;
use super::viewport::Viewport;
use super::worker::{LoadRequest, LoadedScene, LoaderHandle};

/// Format FPS for display (hide decimals for whole numbers)
fn format_fps(fps: f32) -> String {
    if (fps - fps.round()).abs() < 0.001 {
        format!("{:.0}", fps)
    } else {
        format!("{:.1}", fps)
    }
}

/// Main viewer application
pub struct GemApp {
    viewport: Viewport,
    settings: Settings,

    assets_dir: PathBuf,
    mesh_path: Option<PathBuf>,
    worker: Option<LoaderHandle>,
    scene_loaded: bool,

    status_message: String,

    // Frame timing (EMA over the frame-to-frame delta)
    last_frame: Instant,
    frame_dt: f32,

    _trace_guard: Option<tracing_chrome::FlushGuard>,
}

impl GemApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        assets_dir: Option<PathBuf>,
        mesh_path: Option<PathBuf>,
        trace_guard: Option<tracing_chrome::FlushGuard>,
    ) -> Self {
        let mut settings = Settings::load();

        // Explicit mesh argument wins over the remembered one
        let mesh_path = mesh_path.or_else(|| {
            settings
                .last_mesh
                .clone()
                .filter(|p| p.exists())
        });
        if let Some(path) = &mesh_path {
            settings.last_mesh = Some(path.clone());
        }

        Self {
            viewport: Viewport::new(),
            settings,
            assets_dir: assets_dir.unwrap_or_else(|| PathBuf::from("assets")),
            mesh_path,
            worker: None,
            scene_loaded: false,
            status_message: "Loading scene...".into(),
            last_frame: Instant::now(),
            frame_dt: 1.0 / 60.0,
            _trace_guard: trace_guard,
        }
    }

    fn process_loaded_scene(&mut self, scene: LoadedScene) {
        if let Some(renderer) = &mut self.viewport.renderer {
            renderer.set_gem(&scene.mesh, &scene.scene);
            renderer.set_environment(&scene.cube);
        }
        self.scene_loaded = true;
        self.status_message = if scene.notes.is_empty() {
            format!(
                "Scene ready: {} triangles, {} BVH nodes",
                scene.scene.tri_count, scene.scene.node_count
            )
        } else {
            scene.notes.join("; ")
        };
    }

    fn side_panel(&mut self, ui: &mut egui::Ui) {
        let mut changed = false;

        ui.heading("Refraction");
        ui.separator();

        changed |= ui
            .add(egui::Slider::new(&mut self.settings.effect.bounces, 1..=10).text("Bounces"))
            .changed();
        changed |= ui
            .add(
                egui::Slider::new(&mut self.settings.effect.ior, 1.0..=5.0)
                    .step_by(0.01)
                    .text("IOR"),
            )
            .changed();
        changed |= ui
            .checkbox(&mut self.settings.effect.correct_mips, "Correct Mips")
            .changed();
        changed |= ui
            .checkbox(
                &mut self.settings.effect.chromatic_aberration,
                "Chromatic Aberration",
            )
            .changed();
        ui.add_enabled_ui(self.settings.effect.chromatic_aberration, |ui| {
            changed |= ui
                .add(
                    egui::Slider::new(&mut self.settings.effect.aberration_strength, 0.0..=1.0)
                        .step_by(0.0001)
                        .text("Aberration Strength"),
                )
                .changed();
        });

        ui.add_space(8.0);
        ui.heading("Display");
        ui.separator();

        changed |= ui
            .add(
                egui::Slider::new(&mut self.settings.effect.exposure, 0.1..=10.0)
                    .logarithmic(true)
                    .text("Exposure"),
            )
            .changed();
        changed |= ui
            .checkbox(&mut self.settings.effect.show_sky, "Show Background")
            .changed();
        let mut bg = [
            self.settings.effect.background_color[0],
            self.settings.effect.background_color[1],
            self.settings.effect.background_color[2],
        ];
        if ui.color_edit_button_rgb(&mut bg).changed() {
            self.settings.effect.background_color = [bg[0], bg[1], bg[2], 1.0];
            changed = true;
        }

        if changed {
            self.settings.save();
        }

        ui.add_space(8.0);
        ui.heading("Scene");
        ui.separator();
        if let Some(renderer) = &self.viewport.renderer {
            if renderer.has_gem() {
                ui.label(format!("Triangles: {}", renderer.tri_count));
                ui.label(format!("BVH nodes: {}", renderer.node_count));
            } else {
                ui.label("Loading gem...");
            }
        }
        ui.label(format!("MSAA: {}x", self.settings.antialiasing));
        if self.settings.antialiasing == 1 {
            ui.label("FXAA pass active");
        }
    }

    fn status_bar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label(&self.status_message);
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let fps = if self.frame_dt > 0.0 {
                    1.0 / self.frame_dt
                } else {
                    0.0
                };
                ui.label(format!("{} fps", format_fps(fps)));
            });
        });
    }
}

impl eframe::App for GemApp {
    fn on_exit(&mut self) {
        self.settings.camera_distance = self.viewport.camera.distance();
        let (yaw, pitch) = self.viewport.camera.angles();
        self.settings.camera_yaw = yaw;
        self.settings.camera_pitch = pitch;
        self.settings.save();
    }

    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        let _span = tracing::info_span!("viewer_update").entered();

        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.frame_dt = self.frame_dt * 0.9 + dt * 0.1;

        // Esc = quit
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            return;
        }

        // H = reset camera
        if ctx.input(|i| i.key_pressed(egui::Key::H)) {
            self.viewport.camera.reset();
            self.status_message = "Camera reset".into();
        }

        // F = frame the gem
        if ctx.input(|i| i.key_pressed(egui::Key::F)) {
            self.viewport
                .camera
                .focus(glam::Vec3::new(0.0, GEM_LIFT, 0.0), GEM_RADIUS);
            self.status_message = "Framed gem".into();
        }

        // Initialize renderer once the wgpu context exists
        if self.viewport.renderer.is_none() {
            if let Some(render_state) = frame.wgpu_render_state() {
                self.viewport.init_renderer(
                    &render_state.device,
                    &render_state.queue,
                    render_state.target_format,
                    self.settings.antialiasing as u32,
                );
                self.viewport
                    .camera
                    .set_distance(self.settings.camera_distance);
                self.viewport
                    .camera
                    .set_angles(self.settings.camera_yaw, self.settings.camera_pitch);
                self.settings.save();
            }
        }

        // Kick off the background load once the renderer is live
        if self.viewport.renderer.is_some() && self.worker.is_none() && !self.scene_loaded {
            self.worker = Some(LoaderHandle::spawn(LoadRequest {
                assets_dir: self.assets_dir.clone(),
                mesh_path: self.mesh_path.clone(),
            }));
        }

        // Poll the loader (non-blocking)
        if let Some(worker) = &self.worker {
            if let Some(scene) = worker.try_recv() {
                self.process_loaded_scene(scene);
                self.worker = None;
            }
        }

        TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            self.status_bar(ui);
        });

        SidePanel::right("control_panel")
            .default_width(240.0)
            .min_width(180.0)
            .resizable(true)
            .show(ctx, |ui| {
                self.side_panel(ui);
            });

        CentralPanel::default().show(ctx, |ui| {
            let render_state = frame.wgpu_render_state();
            let fx = self.settings.effect.clone();
            self.viewport.show(ui, render_state, &fx);
        });

        // Track window geometry for saving on exit
        ctx.input(|i| {
            if let Some(rect) = i.viewport().inner_rect {
                self.settings.window_width = rect.width();
                self.settings.window_height = rect.height();
            }
            if let Some(pos) = i.viewport().outer_rect {
                self.settings.window_x = Some(pos.min.x);
                self.settings.window_y = Some(pos.min.y);
            }
        });

        // The gem spins every frame; keep the loop running
        ctx.request_repaint();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fps_formatting() {
        assert_eq!(format_fps(60.0), "60");
        assert_eq!(format_fps(59.94), "59.9");
    }
}
