use anyhow::{Context as _, Result};
use clap::Parser;
use egui::Context as EguiContext;
use orrery_input::{InputState, Key, MouseButton as InputButton};
use orrery_render::demo;
use orrery_render::{
    Camera, FramePipeline, OrbitSystem, RenderDevice, RenderError, Scene, SceneConfig,
    StandardPrograms,
};
use orrery_render_wgpu::{WgpuDevice, shaders};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceEvent, ElementState, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

#[derive(Parser)]
#[command(name = "orrery-desktop", about = "Orrery planetary scene viewer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Scene config (JSON); defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Initial window width, overriding the config
    #[arg(long)]
    width: Option<u32>,

    /// Initial window height, overriding the config
    #[arg(long)]
    height: Option<u32>,
}

fn map_key(code: KeyCode) -> Option<Key> {
    let key = match code {
        KeyCode::KeyA => Key::A,
        KeyCode::KeyB => Key::B,
        KeyCode::KeyC => Key::C,
        KeyCode::KeyD => Key::D,
        KeyCode::KeyE => Key::E,
        KeyCode::KeyF => Key::F,
        KeyCode::KeyG => Key::G,
        KeyCode::KeyH => Key::H,
        KeyCode::KeyI => Key::I,
        KeyCode::KeyJ => Key::J,
        KeyCode::KeyK => Key::K,
        KeyCode::KeyL => Key::L,
        KeyCode::KeyM => Key::M,
        KeyCode::KeyN => Key::N,
        KeyCode::KeyO => Key::O,
        KeyCode::KeyP => Key::P,
        KeyCode::KeyQ => Key::Q,
        KeyCode::KeyR => Key::R,
        KeyCode::KeyS => Key::S,
        KeyCode::KeyT => Key::T,
        KeyCode::KeyU => Key::U,
        KeyCode::KeyV => Key::V,
        KeyCode::KeyW => Key::W,
        KeyCode::KeyX => Key::X,
        KeyCode::KeyY => Key::Y,
        KeyCode::KeyZ => Key::Z,
        KeyCode::Space => Key::Space,
        KeyCode::ControlLeft | KeyCode::ControlRight => Key::Control,
        KeyCode::ShiftLeft | KeyCode::ShiftRight => Key::Shift,
        KeyCode::Escape => Key::Escape,
        KeyCode::Tab => Key::Tab,
        KeyCode::Enter => Key::Enter,
        KeyCode::ArrowUp => Key::Up,
        KeyCode::ArrowDown => Key::Down,
        KeyCode::ArrowLeft => Key::Left,
        KeyCode::ArrowRight => Key::Right,
        _ => return None,
    };
    Some(key)
}

fn map_button(button: MouseButton) -> Option<InputButton> {
    match button {
        MouseButton::Left => Some(InputButton::Left),
        MouseButton::Right => Some(InputButton::Right),
        MouseButton::Middle => Some(InputButton::Middle),
        _ => None,
    }
}

/// Everything that exists only once the window and GPU are up.
struct Gpu {
    window: Arc<Window>,
    device: WgpuDevice,
    pipeline: FramePipeline,
    scene: Scene,
    camera: Camera,
    /// Size still waiting for its targets after a failed resize.
    pending_size: Option<(u32, u32)>,
    egui_winit: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

/// Resize to the pending size. On failure the size stays pending and the
/// next frame tries again.
fn apply_resize<D: RenderDevice>(
    pipeline: &mut FramePipeline,
    device: &mut D,
    camera: &mut Camera,
    pending: &mut Option<(u32, u32)>,
) {
    let Some((width, height)) = *pending else {
        return;
    };
    match pipeline.resize(device, camera, width, height) {
        Ok(_) => *pending = None,
        Err(e) => tracing::warn!(width, height, "resize failed, retrying next frame: {e}"),
    }
}

struct OrreryApp {
    config: SceneConfig,
    input: InputState,
    orbit: OrbitSystem,
    gpu: Option<Gpu>,
    egui_ctx: EguiContext,
    started: Instant,
    last_frame: Instant,
    fps: f32,
}

impl OrreryApp {
    fn new(config: SceneConfig) -> Self {
        Self {
            input: InputState::new(config.bindings.clone()),
            orbit: OrbitSystem::new(config.orbit.clone()),
            config,
            gpu: None,
            egui_ctx: EguiContext::default(),
            started: Instant::now(),
            last_frame: Instant::now(),
            fps: 0.0,
        }
    }

    fn init(&self, event_loop: &ActiveEventLoop) -> Result<Gpu> {
        let attrs = Window::default_attributes()
            .with_title(self.config.window.title.clone())
            .with_inner_size(PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));
        let window = Arc::new(event_loop.create_window(attrs).context("create window")?);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window.clone())
            .context("create surface")?;

        let size = window.inner_size();
        let mut device =
            pollster::block_on(WgpuDevice::new(&instance, surface, size.width, size.height))?;
        let programs = StandardPrograms::create(&mut device, &shaders::sources())?;
        let pipeline = FramePipeline::new(&mut device, &programs, self.config.post)?;
        let scene = demo::build_scene(&mut device, &programs, &self.config)?;

        let (width, height) = device.viewport();
        let camera = Camera::new(&self.config.camera, width as f32 / height as f32);

        let egui_winit = egui_winit::State::new(
            self.egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );
        let egui_renderer =
            egui_wgpu::Renderer::new(device.device(), device.surface_format(), None, 1, false);

        Ok(Gpu {
            window,
            device,
            pipeline,
            scene,
            camera,
            pending_size: None,
            egui_winit,
            egui_renderer,
        })
    }

    fn draw_ui(ctx: &EguiContext, fps: f32, viewport: (u32, u32), orbit: &mut OrbitSystem) {
        egui::Window::new("System Stats")
            .default_pos([12.0, 12.0])
            .show(ctx, |ui| {
                ui.label(format!("FPS: {fps:.0}"));
                ui.label(format!("Width: {}", viewport.0));
                ui.label(format!("Height: {}", viewport.1));
            });
        egui::Window::new("Orbit Controller")
            .default_pos([12.0, 120.0])
            .show(ctx, |ui| {
                let mut paused = orbit.is_paused();
                if ui.checkbox(&mut paused, "Pause orbit").changed() {
                    orbit.set_paused(paused);
                }
                ui.label(format!("Angle: {:.1}°", orbit.angle()));
            });
    }

    fn frame(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        let dt = (now - self.last_frame).as_secs_f32().min(0.1);
        self.last_frame = now;
        if dt > 0.0 {
            self.fps = self.fps * 0.9 + (1.0 / dt) * 0.1;
        }
        let time = (now - self.started).as_secs_f32();

        let Some(gpu) = &mut self.gpu else {
            return;
        };

        if self.input.action_triggered(orrery_input::Action::Quit) {
            event_loop.exit();
            return;
        }
        if self.input.action_triggered(orrery_input::Action::ToggleOrbit) {
            self.orbit.toggle_paused();
        }
        apply_resize(
            &mut gpu.pipeline,
            &mut gpu.device,
            &mut gpu.camera,
            &mut gpu.pending_size,
        );
        gpu.camera.update(&self.input, dt);
        self.orbit.update(&mut gpu.scene, dt);

        let raw_input = gpu.egui_winit.take_egui_input(&gpu.window);
        let viewport = gpu.device.viewport();
        let fps = self.fps;
        let orbit = &mut self.orbit;
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            Self::draw_ui(ctx, fps, viewport, orbit);
        });
        gpu.egui_winit
            .handle_platform_output(&gpu.window, full_output.platform_output);
        let paint_jobs = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [viewport.0, viewport.1],
            pixels_per_point: full_output.pixels_per_point,
        };

        let egui_renderer = &mut gpu.egui_renderer;
        let textures_delta = &full_output.textures_delta;
        let result = gpu.pipeline.render_frame_with(
            &mut gpu.device,
            &gpu.scene,
            &gpu.camera,
            time,
            |device| {
                device.paint_overlay(|device, queue, encoder, view| {
                    for (id, image_delta) in &textures_delta.set {
                        egui_renderer.update_texture(device, queue, *id, image_delta);
                    }
                    egui_renderer.update_buffers(
                        device,
                        queue,
                        encoder,
                        &paint_jobs,
                        &screen_descriptor,
                    );
                    let mut pass = encoder
                        .begin_render_pass(&wgpu::RenderPassDescriptor {
                            label: Some("egui_pass"),
                            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                                view,
                                resolve_target: None,
                                ops: wgpu::Operations {
                                    load: wgpu::LoadOp::Load,
                                    store: wgpu::StoreOp::Store,
                                },
                            })],
                            depth_stencil_attachment: None,
                            ..Default::default()
                        })
                        .forget_lifetime();
                    egui_renderer.render(&mut pass, &paint_jobs, &screen_descriptor);
                })
            },
        );
        for id in &full_output.textures_delta.free {
            gpu.egui_renderer.free_texture(id);
        }

        match result {
            Ok(()) | Err(RenderError::SurfaceLost) => {}
            Err(e) => tracing::error!("frame failed: {e}"),
        }
        self.input.end_frame();
        gpu.window.request_redraw();
    }
}

impl ApplicationHandler for OrreryApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.gpu.is_some() {
            return;
        }
        match self.init(event_loop) {
            Ok(gpu) => {
                self.gpu = Some(gpu);
                self.last_frame = Instant::now();
            }
            Err(e) => {
                tracing::error!("failed to initialize renderer: {e:#}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(gpu) = &mut self.gpu else {
            return;
        };
        let response = gpu.egui_winit.on_window_event(&gpu.window, &event);
        if response.consumed {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => {
                gpu.pending_size = Some((new_size.width, new_size.height));
                apply_resize(
                    &mut gpu.pipeline,
                    &mut gpu.device,
                    &mut gpu.camera,
                    &mut gpu.pending_size,
                );
            }
            WindowEvent::Focused(false) => {
                self.input.clear();
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(code),
                        state,
                        repeat: false,
                        ..
                    },
                ..
            } => {
                if let Some(key) = map_key(code) {
                    match state {
                        ElementState::Pressed => self.input.key_pressed(key),
                        ElementState::Released => self.input.key_released(key),
                    }
                }
            }
            WindowEvent::MouseInput { button, state, .. } => {
                if let Some(button) = map_button(button) {
                    match state {
                        ElementState::Pressed => self.input.mouse_button_pressed(button),
                        ElementState::Released => self.input.mouse_button_released(button),
                    }
                }
                let looking = self.input.action_down(orrery_input::Action::Look);
                gpu.window.set_cursor_visible(!looking);
            }
            WindowEvent::RedrawRequested => {
                self.frame(event_loop);
            }
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: winit::event::DeviceId,
        event: DeviceEvent,
    ) {
        if let DeviceEvent::MouseMotion { delta } = event {
            self.input.mouse_moved(delta.0 as f32, delta.1 as f32);
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(gpu) = &self.gpu {
            gpu.window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let mut config = match &cli.config {
        Some(path) => SceneConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SceneConfig::default(),
    };
    if let Some(width) = cli.width {
        config.window.width = width;
    }
    if let Some(height) = cli.height {
        config.window.height = height;
    }

    tracing::info!(
        width = config.window.width,
        height = config.window.height,
        "orrery-desktop starting"
    );

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = OrreryApp::new(config);
    event_loop.run_app(&mut app)?;

    Ok(())
}
