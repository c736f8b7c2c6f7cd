//! wgpu backend.
//!
//! One [`GpuContext`] per window holds the device and queue and is shared
//! through `Arc` by every scene's [`GpuBackend`]. The window owns the
//! [`RenderSurface`]. Each frame the host steps every backend (uniform
//! writes plus one compute submission) and then records a single render
//! pass in which every backend draws its instances.

mod camera;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use winit::window::Window;

pub use camera::Camera;

use crate::error::GpuError;
use crate::scene::KernelParams;
use crate::shader::{compute_shader, render_shader, WORKGROUP_SIZE};
use crate::simulation::{Backend, ParticleSimulation};
use crate::target_field::TargetField;
use crate::uniforms::ControlSurface;
use crate::ShaderUniforms;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const FIELD_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

/// Per-frame values owned by the backend. Matches `FrameUniforms` in
/// [`crate::shader::FRAME_UNIFORMS_WGSL`].
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct FrameUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub camera_right: [f32; 4],
    pub camera_up: [f32; 4],
    pub time: f32,
    pub delta_time: f32,
    pub seed: u32,
    pub particle_count: u32,
    pub field_width: u32,
    pub _pad0: u32,
    pub _pad1: u32,
    pub _pad2: u32,
}

impl Default for FrameUniforms {
    fn default() -> Self {
        Self {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            camera_right: [1.0, 0.0, 0.0, 0.0],
            camera_up: [0.0, 1.0, 0.0, 0.0],
            ..Self::zeroed()
        }
    }
}

/// Device and queue shared by every scene in a window.
pub struct GpuContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    lost: Arc<AtomicBool>,
}

impl GpuContext {
    /// Create the context and the window's surface.
    pub async fn new(window: Arc<Window>) -> Result<(Arc<Self>, RenderSurface), GpuError> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let info = adapter.get_info();
        log::info!("Using adapter {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Backdrop Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        let lost = Arc::new(AtomicBool::new(false));
        let flag = lost.clone();
        device.set_device_lost_callback(move |reason, message| {
            log::warn!("GPU device lost ({reason:?}): {message}");
            flag.store(true, Ordering::SeqCst);
        });

        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or(GpuError::NoAdapter)?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        let depth = create_depth_texture(&device, &config);

        let context = Arc::new(Self {
            instance,
            adapter,
            device,
            queue,
            lost,
        });
        Ok((
            context,
            RenderSurface {
                surface,
                config,
                depth,
            },
        ))
    }

    /// Set once the device has been lost; every resource made from it is
    /// dead.
    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::SeqCst)
    }
}

/// Swapchain surface and its depth buffer.
pub struct RenderSurface {
    surface: wgpu::Surface<'static>,
    pub config: wgpu::SurfaceConfiguration,
    depth: wgpu::TextureView,
}

impl RenderSurface {
    pub fn resize(&mut self, context: &GpuContext, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.reconfigure(context);
        }
    }

    /// Reconfigure at the current size, as after `SurfaceError::Lost`.
    pub fn reconfigure(&mut self, context: &GpuContext) {
        self.surface.configure(&context.device, &self.config);
        self.depth = create_depth_texture(&context.device, &self.config);
    }

    pub fn aspect(&self) -> f32 {
        self.config.width as f32 / self.config.height.max(1) as f32
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn acquire(&self) -> Result<wgpu::SurfaceTexture, wgpu::SurfaceError> {
        self.surface.get_current_texture()
    }

    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth
    }
}

/// GPU-backed scene.
pub type GpuSimulation = ParticleSimulation<GpuBackend>;

struct ParticleStorage {
    spawn: wgpu::Buffer,
    offset: wgpu::Buffer,
    velocity: wgpu::Buffer,
    blast_velocity: wgpu::Buffer,
    age: wgpu::Buffer,
    field_texture: wgpu::Texture,
    field_view: wgpu::TextureView,
    field_width: u32,
}

impl ParticleStorage {
    fn new(device: &wgpu::Device, particle_count: u32) -> Self {
        // Bindings must not be empty, so a disabled scene keeps one slot.
        let slots = particle_count.max(1) as wgpu::BufferAddress;
        let vec4 = |label: &str| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: slots * 16,
                usage: wgpu::BufferUsages::VERTEX
                    | wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        };
        let spawn = vec4("Spawn Position Buffer");
        let offset = vec4("Offset Position Buffer");
        let velocity = vec4("Velocity Buffer");
        let blast_velocity = vec4("Blast Velocity Buffer");
        let age = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Age Buffer"),
            size: slots * 4,
            usage: wgpu::BufferUsages::VERTEX
                | wgpu::BufferUsages::STORAGE
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let field_width = crate::target_field::field_width(particle_count);
        let field_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Target Field Texture"),
            size: wgpu::Extent3d {
                width: field_width,
                height: field_width,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FIELD_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let field_view = field_texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            spawn,
            offset,
            velocity,
            blast_velocity,
            age,
            field_texture,
            field_view,
            field_width,
        }
    }
}

/// Backend running the generated WGSL kernels.
pub struct GpuBackend {
    context: Arc<GpuContext>,
    particle_count: u32,
    frame: FrameUniforms,

    frame_buffer: wgpu::Buffer,
    controls_buffer: wgpu::Buffer,
    params_buffer: wgpu::Buffer,
    storage: ParticleStorage,

    compute_layout: wgpu::BindGroupLayout,
    compute_bind_group: wgpu::BindGroup,
    render_bind_group: wgpu::BindGroup,
    init_pipeline: wgpu::ComputePipeline,
    update_pipeline: wgpu::ComputePipeline,
    render_pipeline: wgpu::RenderPipeline,
}

const SPAWN_ATTRIBUTES: [wgpu::VertexAttribute; 1] = [wgpu::VertexAttribute {
    offset: 0,
    shader_location: 0,
    format: wgpu::VertexFormat::Float32x4,
}];
const OFFSET_ATTRIBUTES: [wgpu::VertexAttribute; 1] = [wgpu::VertexAttribute {
    offset: 0,
    shader_location: 1,
    format: wgpu::VertexFormat::Float32x4,
}];
const AGE_ATTRIBUTES: [wgpu::VertexAttribute; 1] = [wgpu::VertexAttribute {
    offset: 0,
    shader_location: 2,
    format: wgpu::VertexFormat::Float32,
}];

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn storage_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: false },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn uniform_buffer(device: &wgpu::Device, label: &str, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(label),
        size,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

impl GpuBackend {
    /// Compile the kernels and allocate storage for `particle_count`
    /// particles. Call [`Backend::initialize`] before stepping.
    pub fn new(
        context: Arc<GpuContext>,
        color_format: wgpu::TextureFormat,
        particle_count: u32,
    ) -> Self {
        let device = &context.device;

        let frame_buffer = uniform_buffer(
            device,
            "Frame Uniform Buffer",
            std::mem::size_of::<FrameUniforms>() as u64,
        );
        let controls_buffer =
            uniform_buffer(device, "Control Surface Buffer", ControlSurface::SIZE as u64);
        let params_buffer =
            uniform_buffer(device, "Kernel Params Buffer", KernelParams::SIZE as u64);

        let compute_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Compute Bind Group Layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::COMPUTE),
                uniform_entry(1, wgpu::ShaderStages::COMPUTE),
                uniform_entry(2, wgpu::ShaderStages::COMPUTE),
                storage_entry(3),
                storage_entry(4),
                storage_entry(5),
                storage_entry(6),
                storage_entry(7),
                wgpu::BindGroupLayoutEntry {
                    binding: 8,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: false },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
            ],
        });

        let render_stages = wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT;
        let render_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Render Bind Group Layout"),
            entries: &[
                uniform_entry(0, render_stages),
                uniform_entry(1, render_stages),
                uniform_entry(2, render_stages),
            ],
        });
        let render_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Render Bind Group"),
            layout: &render_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: frame_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: controls_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: params_buffer.as_entire_binding(),
                },
            ],
        });

        // Compute pipelines
        let compute_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Particle Kernels"),
            source: wgpu::ShaderSource::Wgsl(compute_shader().into()),
        });
        let compute_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Compute Pipeline Layout"),
                bind_group_layouts: &[&compute_layout],
                push_constant_ranges: &[],
            });
        let compute_pipeline = |entry: &str, label: &str| {
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some(label),
                layout: Some(&compute_pipeline_layout),
                module: &compute_module,
                entry_point: Some(entry),
                compilation_options: Default::default(),
                cache: None,
            })
        };
        let init_pipeline = compute_pipeline("init_main", "Init Pipeline");
        let update_pipeline = compute_pipeline("update_main", "Update Pipeline");

        // Render pipeline
        let render_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Sprite Shader"),
            source: wgpu::ShaderSource::Wgsl(render_shader().into()),
        });
        let render_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Render Pipeline Layout"),
                bind_group_layouts: &[&render_layout],
                push_constant_ranges: &[],
            });
        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Sprite Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &render_module,
                entry_point: Some("vs_main"),
                buffers: &[
                    wgpu::VertexBufferLayout {
                        array_stride: 16,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &SPAWN_ATTRIBUTES,
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: 16,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &OFFSET_ATTRIBUTES,
                    },
                    wgpu::VertexBufferLayout {
                        array_stride: 4,
                        step_mode: wgpu::VertexStepMode::Instance,
                        attributes: &AGE_ATTRIBUTES,
                    },
                ],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &render_module,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: color_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            // Translucent sprites: test against depth, never write it.
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let storage = ParticleStorage::new(device, particle_count);
        let compute_bind_group = create_compute_bind_group(
            device,
            &compute_layout,
            &frame_buffer,
            &controls_buffer,
            &params_buffer,
            &storage,
        );

        let frame = FrameUniforms {
            particle_count,
            field_width: storage.field_width,
            ..Default::default()
        };

        Self {
            context,
            particle_count,
            frame,
            frame_buffer,
            controls_buffer,
            params_buffer,
            storage,
            compute_layout,
            compute_bind_group,
            render_bind_group,
            init_pipeline,
            update_pipeline,
            render_pipeline,
        }
    }

    /// Camera used by the next step's frame uniforms.
    pub fn set_camera(&mut self, camera: &Camera, aspect: f32) {
        let (right, up) = camera.billboard_axes();
        self.frame.view_proj = camera.view_proj(aspect).to_cols_array_2d();
        self.frame.camera_right = right.extend(0.0).to_array();
        self.frame.camera_up = up.extend(0.0).to_array();
    }

    pub fn context(&self) -> &Arc<GpuContext> {
        &self.context
    }

    /// Record this scene's sprites into an open render pass.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        if self.particle_count == 0 {
            return;
        }
        pass.set_pipeline(&self.render_pipeline);
        pass.set_bind_group(0, &self.render_bind_group, &[]);
        pass.set_vertex_buffer(0, self.storage.spawn.slice(..));
        pass.set_vertex_buffer(1, self.storage.offset.slice(..));
        pass.set_vertex_buffer(2, self.storage.age.slice(..));
        pass.draw(0..6, 0..self.particle_count);
    }

    fn write_frame(&self) {
        self.context
            .queue
            .write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&self.frame));
    }

    fn dispatch(&self, pipeline: &wgpu::ComputePipeline, label: &str) {
        if self.particle_count == 0 {
            return;
        }
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some(label),
                });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(label),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &self.compute_bind_group, &[]);
            pass.dispatch_workgroups(self.particle_count.div_ceil(WORKGROUP_SIZE), 1, 1);
        }
        self.context.queue.submit(std::iter::once(encoder.finish()));
    }
}

impl Backend for GpuBackend {
    fn reallocate(&mut self, particle_count: u32) {
        let device = &self.context.device;
        self.storage = ParticleStorage::new(device, particle_count);
        self.compute_bind_group = create_compute_bind_group(
            device,
            &self.compute_layout,
            &self.frame_buffer,
            &self.controls_buffer,
            &self.params_buffer,
            &self.storage,
        );
        self.particle_count = particle_count;
        self.frame.particle_count = particle_count;
        self.frame.field_width = self.storage.field_width;
    }

    fn upload_target_field(&mut self, field: &mut TargetField) {
        let width = field.width();
        if width != self.storage.field_width {
            log::warn!(
                "Target field width {width} does not match texture width {}",
                self.storage.field_width
            );
            return;
        }
        self.context.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.storage.field_texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            field.as_bytes(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 16),
                rows_per_image: Some(width),
            },
            wgpu::Extent3d {
                width,
                height: width,
                depth_or_array_layers: 1,
            },
        );
        field.mark_uploaded();
    }

    fn initialize(&mut self, params: &KernelParams, _field: &TargetField, seed: u32) {
        self.frame.seed = seed;
        self.frame.time = 0.0;
        self.frame.delta_time = 0.0;
        self.write_frame();
        self.context
            .queue
            .write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&params.to_gpu()));
        self.dispatch(&self.init_pipeline, "Init Pass");
    }

    fn step(
        &mut self,
        _field: &TargetField,
        _params: &KernelParams,
        controls: &ControlSurface,
        dt: f32,
    ) {
        self.frame.time += dt;
        self.frame.delta_time = dt;
        self.write_frame();
        self.context
            .queue
            .write_buffer(&self.controls_buffer, 0, bytemuck::bytes_of(&controls.to_gpu()));
        self.dispatch(&self.update_pipeline, "Update Pass");
    }

    fn particle_count(&self) -> u32 {
        self.particle_count
    }
}

fn create_compute_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    frame: &wgpu::Buffer,
    controls: &wgpu::Buffer,
    params: &wgpu::Buffer,
    storage: &ParticleStorage,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Compute Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: frame.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: controls.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: params.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: storage.spawn.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 4,
                resource: storage.offset.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 5,
                resource: storage.velocity.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 6,
                resource: storage.blast_velocity.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 7,
                resource: storage.age.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 8,
                resource: wgpu::BindingResource::TextureView(&storage.field_view),
            },
        ],
    })
}

fn create_depth_texture(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&wgpu::TextureViewDescriptor::default())
}

/// Clear color behind the particles.
pub const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.0,
    g: 0.0,
    b: 0.0,
    a: 1.0,
};
