use std::sync::Arc;

use glam::{Mat4, Vec2};
use idw_heatmap::{HeatmapLayer, HeatmapOptions, Projector, RenderContext, WebMercator};
use instant::Instant;
use winit::application::ApplicationHandler;
use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::gpu::GpuState;
use crate::venues;

/// How many venues to generate on startup.
const VENUE_COUNT: usize = 250;
/// How often to log FPS (seconds).
const FPS_LOG_INTERVAL: f64 = 5.0;
/// Pixel size of the world at zoom 0.
const TILE_SIZE: f32 = 512.0;
const INITIAL_ZOOM: f32 = 12.0;
/// Fraction of the viewport panned per arrow key press.
const PAN_STEP: f32 = 0.1;

// ---------------------------------------------------------------------------
// Frame timing
// ---------------------------------------------------------------------------

struct FrameStats {
    frame_count: u64,
    last_log_time: Instant,
    frame_time_sum: f64,
    frame_time_min: f64,
    frame_time_max: f64,
    frames_since_log: u32,
}

impl FrameStats {
    fn new() -> Self {
        Self {
            frame_count: 0,
            last_log_time: Instant::now(),
            frame_time_sum: 0.0,
            frame_time_min: f64::MAX,
            frame_time_max: 0.0,
            frames_since_log: 0,
        }
    }

    fn record_frame(&mut self, dt: f64) {
        self.frame_count += 1;
        self.frames_since_log += 1;
        self.frame_time_sum += dt;
        self.frame_time_min = self.frame_time_min.min(dt);
        self.frame_time_max = self.frame_time_max.max(dt);

        let elapsed = self.last_log_time.elapsed().as_secs_f64();
        if elapsed >= FPS_LOG_INTERVAL {
            let avg_ms = (self.frame_time_sum / self.frames_since_log as f64) * 1000.0;
            let fps = self.frames_since_log as f64 / elapsed;
            log::info!(
                "FPS: {:.0} | avg: {:.2}ms | min: {:.2}ms | max: {:.2}ms | total frames: {}",
                fps,
                avg_ms,
                self.frame_time_min * 1000.0,
                self.frame_time_max * 1000.0,
                self.frame_count,
            );
            self.last_log_time = Instant::now();
            self.frame_time_sum = 0.0;
            self.frame_time_min = f64::MAX;
            self.frame_time_max = 0.0;
            self.frames_since_log = 0;
        }
    }
}

// ---------------------------------------------------------------------------
// Camera
// ---------------------------------------------------------------------------

/// Web Mercator view: center in normalized world units, zoom in tile levels.
struct Camera {
    center: Vec2,
    zoom: f32,
}

impl Camera {
    /// World units per screen pixel.
    fn units_per_pixel(&self) -> f32 {
        1.0 / (TILE_SIZE * self.zoom.exp2())
    }

    /// Orthographic projection with north up (world y grows southward).
    fn matrix(&self, (width, height): (u32, u32)) -> Mat4 {
        let upp = self.units_per_pixel();
        let half_w = width as f32 * 0.5 * upp;
        let half_h = height as f32 * 0.5 * upp;
        Mat4::orthographic_rh(
            self.center.x - half_w,
            self.center.x + half_w,
            self.center.y + half_h,
            self.center.y - half_h,
            -1.0,
            1.0,
        )
    }

    fn pan(&mut self, dx: f32, dy: f32, (width, height): (u32, u32)) {
        let upp = self.units_per_pixel();
        self.center += Vec2::new(dx * width as f32 * upp, dy * height as f32 * upp);
    }
}

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// Top-level application state.
struct App {
    window: Option<Arc<Window>>,
    gpu: Option<GpuState>,
    layer: Option<HeatmapLayer>,
    camera: Camera,
    options: Option<HeatmapOptions>,
    last_frame_time: Option<Instant>,
    frame_stats: FrameStats,
}

impl App {
    fn new(verbose: bool) -> Self {
        let mut rng = fastrand::Rng::new();
        let data = venues::generate(VENUE_COUNT, &mut rng);
        let (lat, lon) = venues::centroid(&data);

        let options =
            HeatmapOptions::adaptive("foot-traffic-heatmap", data).with_verbose(verbose);

        Self {
            window: None,
            gpu: None,
            layer: None,
            camera: Camera {
                center: WebMercator.project(lat, lon),
                zoom: INITIAL_ZOOM,
            },
            options: Some(options),
            last_frame_time: None,
            frame_stats: FrameStats::new(),
        }
    }

    fn attach_layer(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let (Some(gpu), Some(options)) = (&self.gpu, self.options.take()) else {
            return Ok(());
        };
        let mut layer = HeatmapLayer::new(options)?;
        layer.attach(&RenderContext {
            adapter: &gpu.adapter,
            device: &gpu.device,
            queue: &gpu.queue,
            target_format: gpu.surface_config.format,
            viewport: gpu.size(),
            projector: &WebMercator,
        })?;
        self.layer = Some(layer);
        Ok(())
    }

    fn render(&mut self) {
        let Some(gpu) = &self.gpu else {
            return;
        };
        let Some(mut frame) = gpu.begin_frame() else {
            return;
        };

        GpuState::draw_basemap(&mut frame.encoder, &frame.view);

        if let Some(layer) = &mut self.layer {
            let matrix = self.camera.matrix(gpu.size()).to_cols_array();
            layer.accumulate(&mut frame.encoder, &matrix);
            layer.draw(&mut frame.encoder, &frame.view, &matrix);
        }

        gpu.finish_frame(frame.encoder, frame.output);
    }

    fn shutdown(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(layer) = &mut self.layer {
            layer.detach();
        }
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attrs = WindowAttributes::default()
            .with_title("IDW heatmap")
            .with_inner_size(winit::dpi::LogicalSize::new(1280.0, 800.0));

        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };

        match GpuState::new(window.clone()) {
            Ok(gpu) => self.gpu = Some(gpu),
            Err(e) => {
                log::error!("Failed to initialize wgpu: {e}");
                event_loop.exit();
                return;
            }
        }

        if let Err(e) = self.attach_layer() {
            log::error!("Failed to attach heatmap layer: {e}");
            event_loop.exit();
            return;
        }

        event_loop.set_control_flow(ControlFlow::Wait);
        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting");
                self.shutdown(event_loop);
            }
            WindowEvent::Resized(new_size) => {
                if let Some(gpu) = &mut self.gpu {
                    gpu.resize(new_size.width, new_size.height);
                }
                if let Some(layer) = &mut self.layer {
                    layer.on_resize(new_size.width, new_size.height);
                }
                self.request_redraw();
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let steps = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32 / 100.0,
                };
                self.camera.zoom = (self.camera.zoom + steps * 0.25).clamp(0.0, 20.0);
                self.request_redraw();
            }
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                let size = self.gpu.as_ref().map(|g| g.size()).unwrap_or((1, 1));
                match event.logical_key {
                    Key::Named(NamedKey::Escape) => {
                        log::info!("ESC pressed, exiting");
                        self.shutdown(event_loop);
                        return;
                    }
                    Key::Named(NamedKey::ArrowLeft) => self.camera.pan(-PAN_STEP, 0.0, size),
                    Key::Named(NamedKey::ArrowRight) => self.camera.pan(PAN_STEP, 0.0, size),
                    Key::Named(NamedKey::ArrowUp) => self.camera.pan(0.0, -PAN_STEP, size),
                    Key::Named(NamedKey::ArrowDown) => self.camera.pan(0.0, PAN_STEP, size),
                    _ => return,
                }
                self.request_redraw();
            }
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                if let Some(last) = self.last_frame_time {
                    self.frame_stats
                        .record_frame(now.duration_since(last).as_secs_f64());
                }
                self.last_frame_time = Some(now);

                self.render();
            }
            _ => {}
        }
    }
}

impl App {
    fn request_redraw(&self) {
        if let Some(w) = &self.window {
            w.request_redraw();
        }
    }
}

/// Create the event loop and run.
pub fn run(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let event_loop = EventLoop::new()?;
    let mut app = App::new(verbose);
    event_loop.run_app(&mut app)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_maps_center_to_origin() {
        let camera = Camera {
            center: Vec2::new(0.3, 0.4),
            zoom: 10.0,
        };
        let m = camera.matrix((800, 600));
        let c = m.project_point3(glam::Vec3::new(0.3, 0.4, 0.0));
        assert!(c.x.abs() < 1e-3 && c.y.abs() < 1e-3);

        // north (smaller y) is up on screen
        let north = m.project_point3(glam::Vec3::new(0.3, 0.4 - camera.units_per_pixel() * 100.0, 0.0));
        assert!(north.y > 0.0);
    }
}
