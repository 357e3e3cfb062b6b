use std::collections::{HashMap, HashSet};
use std::num::NonZeroU64;

use bytemuck::{bytes_of, Pod, Zeroable};
use glam::Mat3;
use wgpu::util::DeviceExt;

use super::shaders::{BACKGROUND_SHADER, SCENE_SHADER, SHADOW_SHADER};
use super::RenderSurface;
use crate::background::GradientBackground;
use crate::camera::PerspectiveCamera;
use crate::error::{DirectorError, RenderError};
use crate::geometry::{MeshData, MeshId, VERTEX_STRIDE};
use crate::scene::{MeshPart, Scene, SceneObject};
use crate::viewport::Viewport;

#[cfg(target_arch = "wasm32")]
const BACKENDS: wgpu::Backends = wgpu::Backends::GL;
#[cfg(not(target_arch = "wasm32"))]
const BACKENDS: wgpu::Backends = wgpu::Backends::PRIMARY;

const MSAA_SAMPLES: u32 = 4;
const SHADOW_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;
const SHADOW_BIAS: f32 = 0.0005;
const CLEAR_COLOR: wgpu::Color = wgpu::Color::BLACK;

const VERTEX_LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
    array_stride: (VERTEX_STRIDE * std::mem::size_of::<f32>()) as u64,
    step_mode: wgpu::VertexStepMode::Vertex,
    attributes: &[
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x3,
            offset: 0,
            shader_location: 0,
        },
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x3,
            offset: (3 * std::mem::size_of::<f32>()) as u64,
            shader_location: 1,
        },
    ],
};

/// wgpu renderer drawing the gradient background, the spotlight shadow map
/// and the lit scene meshes.
pub struct GpuRenderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    sample_count: u32,
    targets: RenderTargets,
    background: BackgroundPass,
    shadow: ShadowPass,
    pipeline: wgpu::RenderPipeline,
    global_buffer: wgpu::Buffer,
    global_layout: wgpu::BindGroupLayout,
    global_bind_group: wgpu::BindGroup,
    object_layout: wgpu::BindGroupLayout,
    mesh_cache: HashMap<MeshId, MeshBuffers>,
}

fn host_error(context: &str) -> impl FnOnce(String) -> DirectorError + '_ {
    move |err| DirectorError::Host(format!("{context}: {err}"))
}

impl GpuRenderer {
    /// Creates the device and pipelines for a window or canvas of `size`
    /// pixels.
    pub async fn new(
        target: impl Into<wgpu::SurfaceTarget<'static>>,
        size: Viewport,
    ) -> Result<Self, DirectorError> {
        if size.is_empty() {
            return Err(DirectorError::Host("render surface has zero area".into()));
        }

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: BACKENDS,
            ..Default::default()
        });
        let surface = instance
            .create_surface(target)
            .map_err(|err| err.to_string())
            .map_err(host_error("failed to create surface"))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|err| err.to_string())
            .map_err(host_error("failed to acquire GPU adapter"))?;
        log::info!("using adapter {:?}", adapter.get_info().name);

        let device_descriptor = wgpu::DeviceDescriptor {
            label: Some("scene-device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_webgl2_defaults()
                .using_resolution(adapter.limits()),
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::Off,
        };
        let (device, queue) = adapter
            .request_device(&device_descriptor)
            .await
            .map_err(|err| err.to_string())
            .map_err(host_error("failed to create GPU device"))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|format| format.is_srgb())
            .or_else(|| surface_caps.formats.first())
            .copied()
            .ok_or_else(|| DirectorError::Host("surface reports no formats".into()))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: surface_caps
                .present_modes
                .iter()
                .copied()
                .find(|mode| {
                    matches!(
                        mode,
                        wgpu::PresentMode::Mailbox | wgpu::PresentMode::Immediate
                    )
                })
                .unwrap_or(wgpu::PresentMode::Fifo),
            desired_maximum_frame_latency: 2,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let format_flags = adapter.get_texture_format_features(surface_format).flags;
        let sample_count = if format_flags.sample_count_supported(MSAA_SAMPLES) {
            MSAA_SAMPLES
        } else {
            1
        };
        let targets = RenderTargets::create(&device, &config, sample_count);

        let global_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("global-bind-layout"),
            entries: &[
                uniform_entry(0, std::mem::size_of::<GlobalUniform>()),
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
        });

        // Per-object uniform layout, shared by the shadow and scene passes
        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("object-bind-layout"),
            entries: &[uniform_entry(0, std::mem::size_of::<ObjectConstants>())],
        });

        let global_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("global-uniform"),
            size: std::mem::size_of::<GlobalUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let shadow = ShadowPass::new(&device, &object_layout, DEFAULT_SHADOW_MAP_SIZE);
        let global_bind_group =
            create_global_bind_group(&device, &global_layout, &global_buffer, &shadow);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("scene-shader"),
            source: wgpu::ShaderSource::Wgsl(SCENE_SHADER.into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("scene-pipeline-layout"),
            bind_group_layouts: &[&global_layout, &object_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("scene-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[VERTEX_LAYOUT],
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                polygon_mode: wgpu::PolygonMode::Fill,
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: RenderTargets::DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: sample_count,
                ..Default::default()
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            multiview: None,
            cache: None,
        });

        let background = BackgroundPass::new(&device, surface_format, sample_count);

        log::info!(
            "render surface {}x{} ({surface_format:?}, {sample_count}x MSAA)",
            size.width,
            size.height
        );

        Ok(Self {
            surface,
            device,
            queue,
            config,
            sample_count,
            targets,
            background,
            shadow,
            pipeline,
            global_buffer,
            global_layout,
            global_bind_group,
            object_layout,
            mesh_cache: HashMap::new(),
        })
    }

    /// Uploads meshes seen for the first time and drops buffers of meshes
    /// that left the scene.
    fn sync_meshes(&mut self, scene: &Scene) {
        let mut live = HashSet::new();
        for part in scene.objects().iter().flat_map(|object| &object.parts) {
            live.insert(part.mesh.id);
            if part.mesh.is_empty() || self.mesh_cache.contains_key(&part.mesh.id) {
                continue;
            }
            let buffers = MeshBuffers::from_mesh(&self.device, &part.mesh);
            self.mesh_cache.insert(part.mesh.id, buffers);
        }
        self.mesh_cache.retain(|id, _| live.contains(id));
    }

    fn object_bind_group(&self, object: &SceneObject, part: &MeshPart) -> wgpu::BindGroup {
        let constants = ObjectConstants::new(object, part);
        let object_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("object-uniform"),
                contents: bytes_of(&constants),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            });
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("object-bind-group"),
            layout: &self.object_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: object_buffer.as_entire_binding(),
            }],
        })
    }
}

impl RenderSurface for GpuRenderer {
    fn size(&self) -> Viewport {
        Viewport::new(self.config.width, self.config.height)
    }

    fn set_size(&mut self, size: Viewport) {
        if size.is_empty() {
            return;
        }
        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(&self.device, &self.config);
        self.targets = RenderTargets::create(&self.device, &self.config, self.sample_count);
    }

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<(), RenderError> {
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("surface timed out; frame skipped");
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => return Err(RenderError::OutOfMemory),
            Err(err) => return Err(RenderError::Surface(err.to_string())),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.background.upload(&self.queue, scene.background);
        if self
            .shadow
            .ensure_size(&self.device, scene.spotlight.shadow_map_size)
        {
            self.global_bind_group = create_global_bind_group(
                &self.device,
                &self.global_layout,
                &self.global_buffer,
                &self.shadow,
            );
        }
        self.sync_meshes(scene);

        let shadows = shadows_enabled(scene);
        let globals = GlobalUniform::new(scene, camera, shadows);
        self.queue
            .write_buffer(&self.global_buffer, 0, bytes_of(&globals));
        self.queue.write_buffer(
            &self.shadow.uniform,
            0,
            bytes_of(&scene.spotlight.shadow_view_projection().to_cols_array_2d()),
        );

        // Build the draw list with one uniform buffer per part
        let mut draws = Vec::new();
        for object in scene.objects() {
            for part in &object.parts {
                if !self.mesh_cache.contains_key(&part.mesh.id) {
                    continue;
                }
                let bind_group = self.object_bind_group(object, part);
                draws.push((part.mesh.id, object.cast_shadow, bind_group));
            }
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("scene-encoder"),
            });

        if shadows {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("shadow-pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.shadow.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            pass.set_pipeline(&self.shadow.pipeline);
            pass.set_bind_group(0, &self.shadow.bind_group, &[]);
            for (mesh_id, _, bind_group) in draws.iter().filter(|(_, cast, _)| *cast) {
                if let Some(mesh) = self.mesh_cache.get(mesh_id) {
                    pass.set_vertex_buffer(0, mesh.vertex.slice(..));
                    pass.set_index_buffer(mesh.index.slice(..), wgpu::IndexFormat::Uint32);
                    pass.set_bind_group(1, bind_group, &[]);
                    pass.draw_indexed(0..mesh.index_count, 0, 0..1);
                }
            }
        }

        let (attachment, resolve_target) = match &self.targets.color {
            Some(msaa) => (msaa, Some(&view)),
            None => (&view, None),
        };
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("main-pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: attachment,
                resolve_target,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.targets.depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Discard,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(&self.background.pipeline);
        pass.set_bind_group(0, &self.background.bind_group, &[]);
        pass.draw(0..3, 0..1);

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.global_bind_group, &[]);
        for (mesh_id, _, bind_group) in &draws {
            let Some(mesh) = self.mesh_cache.get(mesh_id) else {
                continue;
            };
            pass.set_vertex_buffer(0, mesh.vertex.slice(..));
            pass.set_index_buffer(mesh.index.slice(..), wgpu::IndexFormat::Uint32);
            pass.set_bind_group(1, bind_group, &[]);
            pass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }

        drop(pass);
        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

fn uniform_entry(binding: u32, size: usize) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: NonZeroU64::new(size as u64),
        },
        count: None,
    }
}

fn create_global_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
    shadow: &ShadowPass,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("global-bind-group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&shadow.view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(&shadow.sampler),
            },
        ],
    })
}

/// Shadows are only worth a pass when something casts and something receives.
fn shadows_enabled(scene: &Scene) -> bool {
    let objects = scene.objects();
    scene.spotlight.cast_shadow
        && objects.iter().any(|object| object.cast_shadow)
        && objects.iter().any(|object| object.receive_shadow)
}

fn mat3_to_3x4(matrix: Mat3) -> [[f32; 4]; 3] {
    let cols = matrix.to_cols_array();
    [
        [cols[0], cols[1], cols[2], 0.0],
        [cols[3], cols[4], cols[5], 0.0],
        [cols[6], cols[7], cols[8], 0.0],
    ]
}

struct MeshBuffers {
    vertex: wgpu::Buffer,
    index: wgpu::Buffer,
    index_count: u32,
}

impl MeshBuffers {
    fn from_mesh(device: &wgpu::Device, mesh: &MeshData) -> Self {
        let label = format!("{:?}", mesh.id);
        let vertex = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-vertices")),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label}-indices")),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        Self {
            vertex,
            index,
            index_count: mesh.indices.len() as u32,
        }
    }
}

/// Multisampled color target (when MSAA is available) and depth buffer.
struct RenderTargets {
    color: Option<wgpu::TextureView>,
    depth: wgpu::TextureView,
}

impl RenderTargets {
    const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;

    fn create(device: &wgpu::Device, config: &wgpu::SurfaceConfiguration, samples: u32) -> Self {
        let size = wgpu::Extent3d {
            width: config.width.max(1),
            height: config.height.max(1),
            depth_or_array_layers: 1,
        };
        let target = |label: &str, format: wgpu::TextureFormat| {
            device
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some(label),
                    size,
                    mip_level_count: 1,
                    sample_count: samples,
                    dimension: wgpu::TextureDimension::D2,
                    format,
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
                .create_view(&wgpu::TextureViewDescriptor::default())
        };
        Self {
            color: (samples > 1).then(|| target("msaa-color", config.format)),
            depth: target("depth-texture", Self::DEPTH_FORMAT),
        }
    }
}

struct BackgroundPass {
    pipeline: wgpu::RenderPipeline,
    texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
    uploaded: Option<GradientBackground>,
}

impl BackgroundPass {
    fn new(device: &wgpu::Device, format: wgpu::TextureFormat, samples: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("background-texture"),
            size: wgpu::Extent3d {
                width: GradientBackground::WIDTH,
                height: GradientBackground::HEIGHT,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("background-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("background-bind-layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
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
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("background-bind-group"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("background-shader"),
            source: wgpu::ShaderSource::Wgsl(BACKGROUND_SHADER.into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("background-pipeline-layout"),
            bind_group_layouts: &[&layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("background-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[],
            },
            primitive: wgpu::PrimitiveState::default(),
            depth_stencil: Some(wgpu::DepthStencilState {
                format: RenderTargets::DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Always,
                stencil: Default::default(),
                bias: Default::default(),
            }),
            multisample: wgpu::MultisampleState {
                count: samples,
                ..Default::default()
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            texture,
            bind_group,
            uploaded: None,
        }
    }

    fn upload(&mut self, queue: &wgpu::Queue, background: GradientBackground) {
        if self.uploaded == Some(background) {
            return;
        }
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &background.pixels(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * GradientBackground::WIDTH),
                rows_per_image: Some(GradientBackground::HEIGHT),
            },
            wgpu::Extent3d {
                width: GradientBackground::WIDTH,
                height: GradientBackground::HEIGHT,
                depth_or_array_layers: 1,
            },
        );
        self.uploaded = Some(background);
    }
}

const DEFAULT_SHADOW_MAP_SIZE: u32 = 512;

struct ShadowPass {
    pipeline: wgpu::RenderPipeline,
    uniform: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    sampler: wgpu::Sampler,
    view: wgpu::TextureView,
    size: u32,
}

impl ShadowPass {
    fn new(device: &wgpu::Device, object_layout: &wgpu::BindGroupLayout, size: u32) -> Self {
        let uniform = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("shadow-uniform"),
            size: std::mem::size_of::<[[f32; 4]; 4]>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("shadow-bind-layout"),
            entries: &[uniform_entry(0, std::mem::size_of::<[[f32; 4]; 4]>())],
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("shadow-bind-group"),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform.as_entire_binding(),
            }],
        });
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("shadow-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("shadow-shader"),
            source: wgpu::ShaderSource::Wgsl(SHADOW_SHADER.into()),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("shadow-pipeline-layout"),
            bind_group_layouts: &[&layout, object_layout],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("shadow-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers: &[VERTEX_LAYOUT],
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(wgpu::DepthStencilState {
                format: SHADOW_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: Default::default(),
                bias: wgpu::DepthBiasState {
                    constant: 2,
                    slope_scale: 2.0,
                    clamp: 0.0,
                },
            }),
            multisample: wgpu::MultisampleState::default(),
            fragment: None,
            multiview: None,
            cache: None,
        });

        let size = size.max(1);
        Self {
            pipeline,
            uniform,
            bind_group,
            sampler,
            view: Self::create_map(device, size),
            size,
        }
    }

    fn create_map(device: &wgpu::Device, size: u32) -> wgpu::TextureView {
        device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("shadow-map"),
                size: wgpu::Extent3d {
                    width: size,
                    height: size,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: SHADOW_FORMAT,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                    | wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default())
    }

    /// Recreates the map at `size`; returns whether the view changed.
    fn ensure_size(&mut self, device: &wgpu::Device, size: u32) -> bool {
        let size = size.max(1);
        if size == self.size {
            return false;
        }
        self.view = Self::create_map(device, size);
        self.size = size;
        true
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct GlobalUniform {
    view_proj: [[f32; 4]; 4],
    light_view_proj: [[f32; 4]; 4],
    camera_position: [f32; 4],
    ambient: [f32; 4],
    spot_position: [f32; 4],
    spot_direction: [f32; 4],
    spot_color: [f32; 4],
    spot_cone: [f32; 4],
}

impl GlobalUniform {
    fn new(scene: &Scene, camera: &PerspectiveCamera, shadows: bool) -> Self {
        let spot = &scene.spotlight;
        let (outer, inner) = spot.cone_cosines();
        Self {
            view_proj: camera.view_projection().to_cols_array_2d(),
            light_view_proj: spot.shadow_view_projection().to_cols_array_2d(),
            camera_position: camera.position.extend(1.0).into(),
            ambient: (scene.ambient.color * scene.ambient.intensity)
                .extend(1.0)
                .into(),
            spot_position: spot.position.extend(spot.distance).into(),
            spot_direction: spot.direction().extend(spot.decay).into(),
            spot_color: (spot.color * spot.intensity).extend(1.0).into(),
            spot_cone: [
                outer,
                inner.max(outer + 1e-4),
                if shadows { 1.0 } else { 0.0 },
                SHADOW_BIAS,
            ],
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct ObjectConstants {
    model: [[f32; 4]; 4],
    normal: [[f32; 4]; 3],
    color: [f32; 4],
    material: [f32; 4],
}

impl ObjectConstants {
    fn new(object: &SceneObject, part: &MeshPart) -> Self {
        let model = object.transform.matrix() * part.local;
        let linear = Mat3::from_mat4(model);
        let normal = if linear.determinant().abs() > f32::EPSILON {
            linear.inverse().transpose()
        } else {
            Mat3::IDENTITY
        };
        let material = part.material;
        Self {
            model: model.to_cols_array_2d(),
            normal: mat3_to_3x4(normal),
            color: material.color.extend(1.0).into(),
            material: [
                material.metalness,
                material.roughness,
                if object.receive_shadow { 1.0 } else { 0.0 },
                0.0,
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use glam::{Mat4, Vec3};

    use super::*;
    use crate::config::{AmbientConfig, BackgroundConfig, CameraConfig, SpotlightConfig};
    use crate::light::{AmbientLight, SpotLight};
    use crate::scene::{StandardMaterial, Transform};

    fn scene() -> Scene {
        Scene::new(
            GradientBackground::from_config(&BackgroundConfig::default()),
            AmbientLight::from_config(&AmbientConfig::default()),
            SpotLight::from_config(&SpotlightConfig::default()),
        )
    }

    fn part() -> MeshPart {
        MeshPart {
            mesh: Arc::new(MeshData::new(Vec::new(), Vec::new())),
            material: StandardMaterial {
                color: Vec3::new(0.1, 0.2, 0.3),
                metalness: 0.8,
                roughness: 0.2,
            },
            local: Mat4::from_translation(Vec3::Y),
        }
    }

    #[test]
    fn uniform_layouts_match_the_shader() {
        assert_eq!(std::mem::size_of::<GlobalUniform>(), 224);
        assert_eq!(std::mem::size_of::<ObjectConstants>(), 144);
    }

    #[test]
    fn globals_pack_light_parameters() {
        let scene = scene();
        let camera = PerspectiveCamera::from_config(&CameraConfig::default(), 1.0);
        let globals = GlobalUniform::new(&scene, &camera, false);
        assert_eq!(globals.spot_position, [0.0, 0.0, 5.0, 50.0]);
        assert_eq!(globals.spot_direction, [0.0, 0.0, -1.0, 2.0]);
        assert!((globals.spot_color[0] - 1.5).abs() < 1e-5);
        assert!(globals.spot_cone[1] > globals.spot_cone[0]);
        assert_eq!(globals.spot_cone[2], 0.0);
        assert!((globals.ambient[0] - 0.2).abs() < 1e-5);
    }

    #[test]
    fn object_constants_compose_object_and_part_transforms() {
        let mut object = SceneObject::new("character", vec![part()]);
        object.transform = Transform {
            position: Vec3::new(3.0, 0.0, 0.0),
            scale: Vec3::splat(0.5),
            ..Transform::default()
        };
        object.receive_shadow = true;
        let constants = ObjectConstants::new(&object, &object.parts[0]);
        let model = Mat4::from_cols_array_2d(&constants.model);
        assert_eq!(model.transform_point3(Vec3::ZERO), Vec3::new(3.0, 0.5, 0.0));
        // uniform scale: the normal matrix is the inverse scale
        assert!((constants.normal[0][0] - 2.0).abs() < 1e-5);
        assert_eq!(constants.material, [0.8, 0.2, 1.0, 0.0]);
    }

    #[test]
    fn shadow_pass_needs_casters_and_receivers() {
        let mut scene = scene();
        let mut caster = SceneObject::new("text", vec![part()]);
        caster.cast_shadow = true;
        scene.add(caster);
        assert!(!shadows_enabled(&scene));
        let mut receiver = SceneObject::new("floor", vec![part()]);
        receiver.receive_shadow = true;
        scene.add(receiver);
        assert!(shadows_enabled(&scene));
        scene.spotlight.cast_shadow = false;
        assert!(!shadows_enabled(&scene));
    }
}
