//! Demo host: a window with three stacked scene regions on a virtual page.
//!
//! The mouse wheel scrolls the page. Each scene owns one third of it and
//! receives region enter/leave and local scroll progress as it passes
//! through. Keys `1`-`5` switch the pointer style, `Esc` quits.

use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use crate::capability::{self, CapabilityProfile, HostSnapshot};
use crate::choreographer::{Choreographer, SceneEvent};
use crate::error::AppError;
use crate::gpu::{Camera, GpuBackend, GpuContext, GpuSimulation, RenderSurface, CLEAR_COLOR};
use crate::input::{ray_plane_z0, Input, KeyCode};
use crate::responsive::{self, Viewport};
use crate::scene::{ChoreographyConfig, SceneConfig};
use crate::time::{PerformanceMonitor, Time};

/// Page progress per wheel line.
const SCROLL_STEP: f32 = 0.01;

/// One scene and the slice of the page it occupies.
struct SceneSlot {
    start: f32,
    end: f32,
    visible: bool,
    choreographer: Choreographer,
    simulation: GpuSimulation,
}

impl SceneSlot {
    fn local_progress(&self, page: f32) -> f32 {
        ((page - self.start) / (self.end - self.start)).clamp(0.0, 1.0)
    }

    fn contains(&self, page: f32) -> bool {
        page >= self.start && page <= self.end
    }
}

/// Everything that dies with the GPU context.
struct GpuLayer {
    context: Arc<GpuContext>,
    surface: RenderSurface,
    scenes: Vec<SceneSlot>,
}

/// winit application driving the backdrop.
pub struct App {
    shape_shifter: Option<SceneConfig>,
    window: Option<Arc<Window>>,
    layer: Option<GpuLayer>,
    profile: Option<CapabilityProfile>,
    input: Input,
    time: Time,
    monitor: PerformanceMonitor,
    camera: Camera,
    page: f32,
    landscape: bool,
}

impl App {
    /// `shape_shifter` replaces the middle scene's preset.
    pub fn new(shape_shifter: Option<SceneConfig>) -> Self {
        Self {
            shape_shifter,
            window: None,
            layer: None,
            profile: None,
            input: Input::new(),
            time: Time::new(),
            monitor: PerformanceMonitor::new(),
            camera: Camera::new(),
            page: 0.0,
            landscape: true,
        }
    }

    fn viewport(window: &Window) -> Viewport {
        let scale = window.scale_factor() as f32;
        let logical = window.inner_size().to_logical::<f32>(scale as f64);
        Viewport::new(logical.width as u32, logical.height as u32, scale)
    }

    /// Bring up the GPU layer, or log and run without one.
    fn start_gpu(&mut self, window: Arc<Window>) {
        let viewport = Self::viewport(&window);
        match pollster::block_on(GpuContext::new(window)) {
            Ok((context, surface)) => {
                let profile = self.profile.get_or_insert_with(|| {
                    let snapshot = HostSnapshot::probe(
                        &context.adapter,
                        viewport.width as f32,
                        viewport.device_pixel_ratio,
                    );
                    capability::detect(&snapshot)
                });
                let scenes = if profile.enabled() {
                    build_scenes(profile, self.shape_shifter.as_ref(), &context, &surface, &viewport)
                } else {
                    Vec::new()
                };
                self.layer = Some(GpuLayer {
                    context,
                    surface,
                    scenes,
                });
            }
            Err(e) => {
                log::error!("GPU initialization failed, running without particles: {e}");
                if self.profile.is_none() {
                    self.profile = Some(capability::detect(&HostSnapshot::without_gpu()));
                }
            }
        }
    }

    /// Rebuild the context and every scene's backend after a device loss.
    fn recover(&mut self) {
        let Some(window) = self.window.clone() else {
            return;
        };
        let Some(GpuLayer {
            surface: old_surface,
            mut scenes,
            ..
        }) = self.layer.take()
        else {
            return;
        };
        // The window can only back one surface at a time.
        drop(old_surface);
        log::warn!("Restoring lost GPU context");
        match pollster::block_on(GpuContext::new(window)) {
            Ok((context, surface)) => {
                for slot in &mut scenes {
                    let backend = GpuBackend::new(
                        context.clone(),
                        surface.format(),
                        slot.simulation.particle_count(),
                    );
                    slot.simulation.replace_backend(backend);
                }
                log::info!("GPU context restored, {} scenes re-initialized", scenes.len());
                self.layer = Some(GpuLayer {
                    context,
                    surface,
                    scenes,
                });
            }
            Err(e) => log::error!("Could not restore GPU context: {e}"),
        }
    }

    fn handle_keys(&mut self, event_loop: &ActiveEventLoop) {
        let keys: Vec<KeyCode> = self.input.pressed_keys().collect();
        for key in keys {
            if key == KeyCode::Escape {
                event_loop.exit();
            }
            if let Some(mode) = key.displacement_mode() {
                log::info!("Pointer mode {mode:?}");
                if let Some(layer) = self.layer.as_mut() {
                    for slot in &mut layer.scenes {
                        slot.choreographer.set_mode(mode);
                    }
                }
            }
        }
    }

    fn frame(&mut self, event_loop: &ActiveEventLoop) {
        let (now, dt) = self.time.update();
        self.monitor.record(dt);
        self.handle_keys(event_loop);

        if self.layer.as_ref().is_some_and(|l| l.context.is_lost()) {
            self.recover();
        }

        self.page = (self.page - self.input.scroll_delta() * SCROLL_STEP).clamp(0.0, 1.0);

        let (Some(layer), Some(profile)) = (self.layer.as_mut(), self.profile.as_ref()) else {
            self.input.begin_frame();
            return;
        };
        let aspect = layer.surface.aspect();
        let pointer = self
            .input
            .mouse_ndc()
            .filter(|_| self.input.cursor_moved())
            .and_then(|ndc| {
                let (origin, dir) = self.camera.ray(ndc, aspect);
                ray_plane_z0(origin, dir)
            });

        for slot in &mut layer.scenes {
            let visible = slot.contains(self.page);
            if visible != slot.visible {
                slot.visible = visible;
                slot.choreographer.handle(if visible {
                    SceneEvent::RegionEnter
                } else {
                    SceneEvent::RegionLeave
                });
            }
            // Off-region scenes still see clamped progress so a fast flick
            // past them lands on 0 or 1.
            slot.choreographer.handle(SceneEvent::ScrollProgress {
                value: slot.local_progress(self.page),
            });
            if visible {
                if let Some(world) = pointer {
                    slot.choreographer.handle(SceneEvent::PointerMove { world });
                }
            }
            slot.choreographer.handle(SceneEvent::Tick { now, dt });

            if let Some(viewport) = slot.choreographer.take_viewport() {
                let derived = responsive::derive(
                    slot.simulation.scene(),
                    &profile.settings,
                    &viewport,
                    profile.is_mobile,
                );
                slot.simulation.resize(derived.particle_count);
            }
            if let Some(index) = slot.choreographer.take_resample() {
                slot.simulation.resample(index);
            }
            let update = slot.choreographer.take_update();
            slot.simulation.apply(&update);

            if slot.visible {
                slot.simulation
                    .backend_mut()
                    .set_camera(&self.camera, aspect);
                slot.simulation.step(dt);
            }
        }

        match layer.surface.acquire() {
            Ok(output) => {
                let view = output
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                let mut encoder =
                    layer
                        .context
                        .device
                        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                            label: Some("Render Encoder"),
                        });
                {
                    let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                        label: Some("Backdrop Pass"),
                        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                            view: &view,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                                store: wgpu::StoreOp::Store,
                            },
                        })],
                        depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                            view: layer.surface.depth_view(),
                            depth_ops: Some(wgpu::Operations {
                                load: wgpu::LoadOp::Clear(1.0),
                                store: wgpu::StoreOp::Store,
                            }),
                            stencil_ops: None,
                        }),
                        timestamp_writes: None,
                        occlusion_query_set: None,
                    });
                    for slot in layer.scenes.iter().filter(|s| s.visible) {
                        slot.simulation.backend().draw(&mut pass);
                    }
                }
                layer.context.queue.submit(std::iter::once(encoder.finish()));
                output.present();
            }
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                layer.surface.reconfigure(&layer.context);
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                log::error!("Surface out of memory");
                event_loop.exit();
            }
            Err(e) => log::warn!("Surface error: {e:?}"),
        }

        self.input.begin_frame();
    }
}

fn build_scenes(
    profile: &CapabilityProfile,
    shape_shifter: Option<&SceneConfig>,
    context: &Arc<GpuContext>,
    surface: &RenderSurface,
    viewport: &Viewport,
) -> Vec<SceneSlot> {
    let class = profile.device_class;
    let presets = [
        SceneConfig::sphere(class),
        shape_shifter
            .cloned()
            .unwrap_or_else(|| SceneConfig::shape_shifter(class)),
        SceneConfig::torus(class),
    ];
    let span = 1.0 / presets.len() as f32;

    presets
        .into_iter()
        .enumerate()
        .map(|(i, scene)| {
            let derived = responsive::derive(&scene, &profile.settings, viewport, profile.is_mobile);
            let mut choreographer = Choreographer::new(&scene, ChoreographyConfig::for_class(class))
                .with_host(profile.is_mobile, false);
            choreographer.handle(SceneEvent::Resize {
                width: viewport.width,
                height: viewport.height,
                device_pixel_ratio: viewport.device_pixel_ratio,
                orientation_changed: false,
            });
            let backend = GpuBackend::new(context.clone(), surface.format(), derived.particle_count);
            let simulation = GpuSimulation::new(
                scene,
                &profile.settings,
                derived.particle_count,
                rand::random(),
                backend,
            );
            SceneSlot {
                start: i as f32 * span,
                end: (i + 1) as f32 * span,
                visible: false,
                choreographer,
                simulation,
            }
        })
        .collect()
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        let attrs = Window::default_attributes()
            .with_title("backdrop")
            .with_inner_size(LogicalSize::new(1280, 720));
        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Could not create window: {e}");
                event_loop.exit();
                return;
            }
        };
        let size = window.inner_size();
        self.input.set_window_size(size.width, size.height);
        self.landscape = size.width >= size.height;
        self.window = Some(window.clone());
        self.start_gpu(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        self.input.handle_event(&event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => {
                self.input.set_window_size(size.width, size.height);
                let landscape = size.width >= size.height;
                let orientation_changed = landscape != self.landscape;
                self.landscape = landscape;

                let viewport = self.window.as_deref().map(Self::viewport);
                if let (Some(layer), Some(viewport)) = (self.layer.as_mut(), viewport) {
                    layer.surface.resize(&layer.context, size.width, size.height);
                    for slot in &mut layer.scenes {
                        slot.choreographer.handle(SceneEvent::Resize {
                            width: viewport.width,
                            height: viewport.height,
                            device_pixel_ratio: viewport.device_pixel_ratio,
                            orientation_changed,
                        });
                    }
                }
            }
            WindowEvent::RedrawRequested => {
                self.frame(event_loop);
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}

/// Run the demo until the window closes.
pub fn run(shape_shifter: Option<SceneConfig>) -> Result<(), AppError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);
    let mut app = App::new(shape_shifter);
    event_loop.run_app(&mut app)?;
    Ok(())
}
