use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context as _, Result};
use winit::dpi::PhysicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::EventLoop;
use winit::window::WindowBuilder;

use crate::accel::Bvh;
use crate::buffers::{self, FrameBuffers, SceneBuffers};
use crate::camera::Camera;
use crate::capture;
use crate::context;
use crate::heatmap_pass::{HeatmapBindings, HeatmapChannel, HeatmapParams, HeatmapPipelines};
use crate::input::InputState;
use crate::options::Options;
use crate::present_pass::{PresentBindings, PresentPass, PresentUniform};
use crate::scene::SceneDescription;
use crate::trace_pass::{TraceBindings, TracePipelines};

/// Where the `p` key writes the current frame.
const SAVE_PATH: &str = "adaptive-path-tracer.png";

const FPS_LOG_INTERVAL: Duration = Duration::from_secs(2);

/// Everything the event handlers mutate, gathered in one place so the
/// render loop reads a single source of truth per frame.
pub struct App {
    pub camera: Camera,
    pub input: InputState,
    pub frame_number: u32,
    pub heatmap: Option<HeatmapChannel>,
    pub use_interop: bool,
    pub width: u32,
    pub height: u32,
    fps_frames: u32,
    fps_window: Instant,
}

/// What a frame's drained input asks the render loop to do.
pub struct FrameActions {
    pub quit: bool,
    pub save_frame: bool,
    pub heatmap_changed: bool,
}

impl App {
    pub fn new(options: &Options) -> App {
        App {
            camera: Camera::new(),
            input: InputState::new(),
            frame_number: 0,
            heatmap: None,
            use_interop: options.use_interop,
            width: options.width,
            height: options.height,
            fps_frames: 0,
            fps_window: Instant::now(),
        }
    }

    /// Returns false when the size did not actually change, in which case
    /// no swapchain or buffer work is needed.
    pub fn handle_resize(&mut self, width: u32, height: u32) -> bool {
        if width == self.width && height == self.height {
            return false;
        }
        self.width = width;
        self.height = height;
        true
    }

    /// Drains the input collected since the last frame into camera motion
    /// and one-shot requests, then advances the frame counter.
    pub fn advance_frame(&mut self) -> FrameActions {
        let quit = self.input.take_quit();
        let save_frame = self.input.take_save_frame();

        if self.input.take_reset_camera() {
            self.camera.reset();
        }

        let heatmap_changed = if self.input.take_heatmap_cycle() {
            self.heatmap = HeatmapChannel::cycle(self.heatmap);
            match self.heatmap {
                Some(channel) => log::info!("Heatmap: {}", channel.label()),
                None => log::info!("Heatmap off"),
            }
            true
        } else {
            false
        };

        let (forward, strafe, vertical) = self.input.movement_axes();
        self.camera.apply_movement(forward, strafe, vertical);
        let (look_dx, look_dy) = self.input.take_look_delta();
        self.camera.apply_mouse_look(look_dx, look_dy);
        // Dolly events stay separate so the camera clamps each one against
        // the focus distance remaining at that point, not the frame's sum.
        for dolly in self.input.take_dolly_deltas() {
            self.camera.apply_dolly(dolly);
        }

        self.frame_number += 1;
        FrameActions {
            quit,
            save_frame,
            heatmap_changed,
        }
    }

    /// The display buffer carries the image whenever it is not coming
    /// straight out of the trace target: staged presentation, or a heatmap
    /// overlay rendered on top.
    fn presents_display_buffer(&self) -> bool {
        !self.use_interop || self.heatmap.is_some()
    }

    fn tick_fps(&mut self) {
        self.fps_frames += 1;
        let elapsed = self.fps_window.elapsed();
        if elapsed >= FPS_LOG_INTERVAL {
            log::info!("{:.1} fps", self.fps_frames as f64 / elapsed.as_secs_f64());
            self.fps_frames = 0;
            self.fps_window = Instant::now();
        }
    }
}

fn present_source<'a>(frame: &'a FrameBuffers, app: &App) -> &'a wgpu::Buffer {
    if app.presents_display_buffer() {
        &frame.display
    } else {
        &frame.radiance
    }
}

fn write_heatmap_params(queue: &wgpu::Queue, buffer: &wgpu::Buffer, app: &App) {
    let channel = app.heatmap.unwrap_or(HeatmapChannel::HitDistance);
    let params = HeatmapParams::new(app.width, app.height, channel);
    queue.write_buffer(buffer, 0, bytemuck::bytes_of(&params));
}

pub fn run_interactive(options: Options) -> Result<()> {
    pollster::block_on(run_windowed(options))
}

async fn run_windowed(options: Options) -> Result<()> {
    let scene = SceneDescription::cornell_box();
    let bvh = Bvh::build(&scene.quads);

    let event_loop = EventLoop::new().context("creating event loop")?;
    let window = WindowBuilder::new()
        .with_title("Adaptive Path Tracer")
        .with_inner_size(PhysicalSize::new(options.width, options.height))
        .build(&event_loop)
        .context("creating window")?;

    let instance = wgpu::Instance::default();
    let surface = instance
        .create_surface(&window)
        .context("creating surface")?;
    let (adapter, device, queue) =
        context::request_device_for_surface(&instance, &surface).await?;

    let caps = surface.get_capabilities(&adapter);
    let format = context::preferred_surface_format(&caps);
    let apply_gamma = !format.is_srgb();
    let mut config = context::surface_config(format, &caps, options.width, options.height);
    surface.configure(&device, &config);

    let mut app = App::new(&options);

    let scene_buffers = SceneBuffers::new(&device, &scene, &bvh);
    let mut frame_buffers = FrameBuffers::new(&device, app.width, app.height);

    let camera_buffer = buffers::create_uniform_buffer(
        &device,
        "Camera Uniform Buffer",
        &app.camera.uniform(app.width, app.height, 0),
    );
    let heatmap_params_buffer = buffers::create_uniform_buffer(
        &device,
        "Heatmap Params Buffer",
        &HeatmapParams::new(app.width, app.height, HeatmapChannel::HitDistance),
    );
    let present_uniform_buffer = buffers::create_uniform_buffer(
        &device,
        "Present Uniform Buffer",
        &PresentUniform::new(app.width, app.height, apply_gamma),
    );

    let trace_pipelines = TracePipelines::new(&device);
    let heatmap_pipelines = HeatmapPipelines::new(&device);
    let present_pass = PresentPass::new(&device, format);

    let mut trace_bindings = TraceBindings::new(
        &device,
        &trace_pipelines,
        &frame_buffers,
        &scene_buffers,
        &camera_buffer,
    );
    let mut heatmap_bindings = HeatmapBindings::new(
        &device,
        &heatmap_pipelines,
        &frame_buffers,
        &heatmap_params_buffer,
    );
    let mut present_bindings = PresentBindings::new(
        &device,
        &present_pass,
        present_source(&frame_buffers, &app),
        &present_uniform_buffer,
    );

    let mut error_slot: Option<anyhow::Error> = None;
    {
        let window = &window;
        let run_error = &mut error_slot;
        event_loop
            .run(move |event, target| {
                // The closure owns the GPU resources so they live as long
                // as the loop does.
                let _ = (&instance, &adapter, &scene_buffers);

                match event {
                    Event::AboutToWait => window.request_redraw(),
                    Event::WindowEvent { event, .. } => match event {
                        WindowEvent::CloseRequested => target.exit(),
                        WindowEvent::KeyboardInput { event, .. } => {
                            app.input.handle_key_event(&event);
                        }
                        WindowEvent::MouseInput { state, button, .. } => {
                            app.input.handle_mouse_button(button, state);
                        }
                        WindowEvent::CursorMoved { position, .. } => {
                            app.input.handle_cursor_moved(
                                position.x,
                                position.y,
                                (app.width, app.height),
                            );
                        }
                        WindowEvent::Resized(new_size) => {
                            if app.handle_resize(new_size.width.max(1), new_size.height.max(1)) {
                                config.width = app.width;
                                config.height = app.height;
                                surface.configure(&device, &config);
                                frame_buffers = FrameBuffers::new(&device, app.width, app.height);
                                trace_bindings.update_frame_buffers(
                                    &device,
                                    &trace_pipelines,
                                    &frame_buffers,
                                );
                                heatmap_bindings.update_frame_buffers(
                                    &device,
                                    &heatmap_pipelines,
                                    &frame_buffers,
                                    &heatmap_params_buffer,
                                );
                                present_bindings.update_color_buffer(
                                    &device,
                                    &present_pass,
                                    present_source(&frame_buffers, &app),
                                );
                                queue.write_buffer(
                                    &present_uniform_buffer,
                                    0,
                                    bytemuck::bytes_of(&PresentUniform::new(
                                        app.width,
                                        app.height,
                                        apply_gamma,
                                    )),
                                );
                                write_heatmap_params(&queue, &heatmap_params_buffer, &app);
                            }
                            // On macos the window needs to be redrawn manually after resizing
                            window.request_redraw();
                        }
                        WindowEvent::RedrawRequested => {
                            let actions = app.advance_frame();
                            if actions.quit {
                                target.exit();
                                return;
                            }
                            if actions.heatmap_changed {
                                write_heatmap_params(&queue, &heatmap_params_buffer, &app);
                                present_bindings.update_color_buffer(
                                    &device,
                                    &present_pass,
                                    present_source(&frame_buffers, &app),
                                );
                            }
                            queue.write_buffer(
                                &camera_buffer,
                                0,
                                bytemuck::bytes_of(&app.camera.uniform(
                                    app.width,
                                    app.height,
                                    app.frame_number,
                                )),
                            );

                            let frame = match surface.get_current_texture() {
                                Ok(frame) => frame,
                                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                                    surface.configure(&device, &config);
                                    window.request_redraw();
                                    return;
                                }
                                Err(e) => {
                                    *run_error = Some(anyhow!("acquiring frame: {e}"));
                                    target.exit();
                                    return;
                                }
                            };

                            let mut encoder = device.create_command_encoder(
                                &wgpu::CommandEncoderDescriptor {
                                    label: Some("Render Encoder"),
                                },
                            );
                            {
                                let mut cpass =
                                    encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                                        label: Some("Trace Pass"),
                                        timestamp_writes: None,
                                    });
                                trace_pipelines.record_firstpass(
                                    &mut cpass,
                                    &trace_bindings,
                                    app.width,
                                    app.height,
                                );
                                trace_pipelines.record_distance(
                                    &mut cpass,
                                    &trace_bindings,
                                    app.width,
                                    app.height,
                                );
                                if app.heatmap.is_some() {
                                    heatmap_pipelines.record(
                                        &mut cpass,
                                        &heatmap_bindings,
                                        app.width,
                                        app.height,
                                    );
                                }
                            }
                            if !app.use_interop && app.heatmap.is_none() {
                                encoder.copy_buffer_to_buffer(
                                    &frame_buffers.radiance,
                                    0,
                                    &frame_buffers.display,
                                    0,
                                    frame_buffers.color_bytes(),
                                );
                            }
                            {
                                let view = frame
                                    .texture
                                    .create_view(&wgpu::TextureViewDescriptor::default());
                                let mut rpass =
                                    encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                                        label: Some("Present Pass"),
                                        color_attachments: &[Some(
                                            wgpu::RenderPassColorAttachment {
                                                view: &view,
                                                resolve_target: None,
                                                ops: wgpu::Operations {
                                                    load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                                                    store: wgpu::StoreOp::Store,
                                                },
                                            },
                                        )],
                                        depth_stencil_attachment: None,
                                        timestamp_writes: None,
                                        occlusion_query_set: None,
                                    });
                                present_pass.record(&mut rpass, &present_bindings);
                            }
                            queue.submit(Some(encoder.finish()));
                            frame.present();
                            app.tick_fps();

                            if actions.save_frame {
                                let source = present_source(&frame_buffers, &app);
                                match capture::save_png(
                                    &device,
                                    &queue,
                                    source,
                                    app.width,
                                    app.height,
                                    Path::new(SAVE_PATH),
                                ) {
                                    Ok(()) => log::info!("Wrote frame to {SAVE_PATH}"),
                                    Err(e) => {
                                        *run_error = Some(e);
                                        target.exit();
                                    }
                                }
                            }
                        }
                        _ => {}
                    },
                    _ => {}
                }
            })
            .context("running event loop")?;
    }

    match error_slot {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

/// Renders one reference frame without a window and writes it to `path`.
pub fn render_to_file(options: &Options, path: &Path) -> Result<()> {
    pollster::block_on(render_headless(options, path))
}

async fn render_headless(options: &Options, path: &Path) -> Result<()> {
    let scene = SceneDescription::cornell_box();
    let bvh = Bvh::build(&scene.quads);

    let instance = wgpu::Instance::default();
    let (_adapter, device, queue) = context::request_headless_device(&instance).await?;

    let camera = Camera::new();
    let camera_buffer = buffers::create_uniform_buffer(
        &device,
        "Camera Uniform Buffer",
        &camera.uniform(options.width, options.height, 1),
    );

    let scene_buffers = SceneBuffers::new(&device, &scene, &bvh);
    let frame_buffers = FrameBuffers::new(&device, options.width, options.height);
    let trace_pipelines = TracePipelines::new(&device);
    let trace_bindings = TraceBindings::new(
        &device,
        &trace_pipelines,
        &frame_buffers,
        &scene_buffers,
        &camera_buffer,
    );

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Reference Encoder"),
    });
    {
        let mut cpass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some("Reference Pass"),
            timestamp_writes: None,
        });
        trace_pipelines.record_reference(&mut cpass, &trace_bindings, options.width, options.height);
    }
    queue.submit(Some(encoder.finish()));

    capture::save_png(
        &device,
        &queue,
        &frame_buffers.radiance,
        options.width,
        options.height,
        path,
    )?;
    log::info!("Wrote frame to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::MetricSpace;
    use winit::keyboard::KeyCode;

    #[test]
    fn held_movement_key_advances_the_camera_by_its_speed() {
        let mut app = App::new(&Options::default());
        let start = app.camera.position;
        app.input.handle_key(KeyCode::KeyW, true);
        app.advance_frame();
        assert!(
            (app.camera.position.distance(start) - 10.0).abs() < 1e-3,
            "one frame of forward motion should cover one speed unit"
        );
    }

    #[test]
    fn reset_key_restores_the_starting_pose() {
        let mut app = App::new(&Options::default());
        app.input.handle_key(KeyCode::KeyW, true);
        app.advance_frame();
        app.input.handle_key(KeyCode::KeyW, false);
        app.input.handle_key(KeyCode::KeyR, true);
        app.advance_frame();
        assert_eq!(app.camera.position, Camera::new().position);
        assert_eq!(app.camera.yaw, Camera::new().yaw);
    }

    #[test]
    fn frame_counter_increments_once_per_advance() {
        let mut app = App::new(&Options::default());
        assert_eq!(app.frame_number, 0);
        app.advance_frame();
        app.advance_frame();
        app.advance_frame();
        assert_eq!(app.frame_number, 3);
    }

    #[test]
    fn quit_and_save_surface_exactly_once() {
        let mut app = App::new(&Options::default());
        app.input.handle_key(KeyCode::Escape, true);
        app.input.handle_key(KeyCode::KeyP, true);
        let first = app.advance_frame();
        assert!(first.quit);
        assert!(first.save_frame);
        app.input.handle_key(KeyCode::Escape, false);
        app.input.handle_key(KeyCode::KeyP, false);
        let second = app.advance_frame();
        assert!(!second.quit);
        assert!(!second.save_frame);
    }

    #[test]
    fn heatmap_key_cycles_and_reports_the_change() {
        let mut app = App::new(&Options::default());
        app.input.handle_key(KeyCode::KeyH, true);
        let actions = app.advance_frame();
        assert!(actions.heatmap_changed);
        assert_eq!(app.heatmap, Some(HeatmapChannel::HitDistance));
        app.input.handle_key(KeyCode::KeyH, false);
        let actions = app.advance_frame();
        assert!(!actions.heatmap_changed);
        assert_eq!(app.heatmap, Some(HeatmapChannel::HitDistance));
    }

    #[test]
    fn fast_dolly_drag_clamps_each_event_separately() {
        use winit::event::{ElementState, MouseButton};

        let mut app = App::new(&Options::default());
        let size = (app.width, app.height);
        let start_focus = app.camera.focus_distance;
        app.input.handle_cursor_moved(0.0, 500.0, size);
        app.input
            .handle_mouse_button(MouseButton::Right, ElementState::Pressed);
        // Two full-window drags in one frame: each event is clamped to
        // 0.9 of the focus distance left after the previous one, so the
        // remainder compounds to 1% rather than one summed clamp's 10%.
        app.input.handle_cursor_moved(1000.0, 500.0, size);
        app.input.handle_cursor_moved(2000.0, 500.0, size);
        app.advance_frame();
        assert!(
            (app.camera.focus_distance - start_focus * 0.01).abs() < 1e-2,
            "expected {} of focus left, got {}",
            start_focus * 0.01,
            app.camera.focus_distance
        );
    }

    #[test]
    fn unchanged_resize_is_skipped() {
        let mut app = App::new(&Options::default());
        assert!(!app.handle_resize(app.width, app.height));
        assert!(app.handle_resize(800, 600));
        assert_eq!((app.width, app.height), (800, 600));
    }

    #[test]
    fn display_buffer_is_used_for_staged_or_overlaid_frames() {
        let mut interop = App::new(&Options::default());
        assert!(!interop.presents_display_buffer());
        interop.heatmap = Some(HeatmapChannel::SampleCount);
        assert!(interop.presents_display_buffer());

        let staged = App::new(&Options {
            use_interop: false,
            ..Options::default()
        });
        assert!(staged.presents_display_buffer());
    }
}
