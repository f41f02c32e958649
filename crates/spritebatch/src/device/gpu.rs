use std::collections::HashMap;

use anyhow::{Context, Result};
use wgpu::util::DeviceExt;

use crate::batch::Vertex;

use super::{
    BufferId, Device, DeviceError, DeviceResult, FilterMode, GpuInit, ModuleId, ProgramId,
    ShaderStage, TextureDesc, TextureId,
};

const VERTEX_ENTRY: &str = "vs_main";
const FRAGMENT_ENTRY: &str = "fs_main";

/// Prefix of the sampler uniforms understood by [`Gpu::set_uniform_i32`].
const SAMPLER_UNIFORM: &str = "textures";

struct Module {
    stage: ShaderStage,
    module: wgpu::ShaderModule,
}

struct Program {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    /// Texture unit sampled by each sampler binding (`textures[i]`).
    sampler_units: Vec<u32>,
}

struct GpuTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

/// wgpu implementation of [`Device`].
///
/// Owns the wgpu device/queue plus every object created through the trait.
/// Drawing happens into the current render target (see
/// [`set_render_target`](Self::set_render_target)), which stands in for the
/// "active context" of an immediate-mode API.
///
/// Binding convention for linked programs: slot `i` uses `@group(0)
/// @binding(2i)` for the `texture_2d<f32>` and `@binding(2i + 1)` for its
/// sampler. Sampler uniforms `textures[i]` choose which texture unit binding
/// `i` reads; they default to unit 0.
///
/// Each `clear`/`draw_indexed` is recorded and submitted immediately, so GPU
/// execution order equals call order. Every call runs inside a validation
/// error scope and reports captured errors as [`DeviceError`].
pub struct Gpu {
    device: wgpu::Device,
    queue: wgpu::Queue,
    target_format: wgpu::TextureFormat,
    slots: u32,

    target: Option<wgpu::TextureView>,
    clear_color: wgpu::Color,

    modules: HashMap<ModuleId, Module>,
    programs: HashMap<ProgramId, Program>,
    current_program: Option<ProgramId>,

    vertex_buffers: HashMap<BufferId, wgpu::Buffer>,
    index_buffers: HashMap<BufferId, wgpu::Buffer>,

    textures: HashMap<TextureId, GpuTexture>,
    units: Vec<Option<TextureId>>,
    /// Sampled by units with nothing bound.
    placeholder: GpuTexture,

    next_id: u32,
}

impl Gpu {
    /// Creates a device without a presentation surface.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu; block on it with
    /// `pollster::block_on` from synchronous code.
    pub async fn headless(init: GpuInit) -> Result<Self> {
        let GpuInit {
            power_preference,
            required_features,
            required_limits,
            target_format,
            max_texture_slots,
        } = init;

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("spritebatch device"),
                required_features,
                required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let limits = device.limits();
        let slots = max_texture_slots
            .min(limits.max_sampled_textures_per_shader_stage)
            .min(limits.max_samplers_per_shader_stage);
        anyhow::ensure!(slots > 0, "device exposes no texture units");

        let info = adapter.get_info();
        log::debug!(
            "Gpu: adapter \"{}\" ({:?}), {slots} texture slots",
            info.name,
            info.backend
        );

        let placeholder = upload_texture(
            &device,
            &queue,
            &TextureDesc { width: 1, height: 1, filter: FilterMode::Nearest },
            &[0, 0, 0, 255],
            "spritebatch placeholder texture",
        );

        Ok(Self {
            device,
            queue,
            target_format,
            slots,
            target: None,
            clear_color: wgpu::Color::BLACK,
            modules: HashMap::new(),
            programs: HashMap::new(),
            current_program: None,
            vertex_buffers: HashMap::new(),
            index_buffers: HashMap::new(),
            textures: HashMap::new(),
            units: vec![None; slots as usize],
            placeholder,
            next_id: 1,
        })
    }

    /// Returns a reference to the logical device.
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Returns a reference to the command queue.
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Color format expected of render targets.
    pub fn target_format(&self) -> wgpu::TextureFormat {
        self.target_format
    }

    /// Creates a texture usable as a render target for this device.
    pub fn create_render_target(&self, width: u32, height: u32) -> wgpu::Texture {
        self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("spritebatch render target"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.target_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        })
    }

    /// Sets (or unsets) the view that `clear` and `draw_indexed` render into.
    ///
    /// The view must have the format returned by [`target_format`](Self::target_format).
    pub fn set_render_target(&mut self, view: Option<wgpu::TextureView>) {
        self.target = view;
    }

    fn alloc_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn target_view(&self) -> DeviceResult<&wgpu::TextureView> {
        self.target
            .as_ref()
            .ok_or_else(|| DeviceError::new("no render target is set"))
    }

    /// Records one render pass into `target` and submits it.
    fn submit_pass(
        &self,
        label: &str,
        target: &wgpu::TextureView,
        load: wgpu::LoadOp<wgpu::Color>,
        record: impl FnOnce(&mut wgpu::RenderPass<'_>),
    ) {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some(label) });

        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(label),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            record(&mut rpass);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn sprite_bind_group_layout(&self) -> wgpu::BindGroupLayout {
        let entries: Vec<wgpu::BindGroupLayoutEntry> = (0..self.slots)
            .flat_map(|slot| {
                [
                    wgpu::BindGroupLayoutEntry {
                        binding: slot * 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: slot * 2 + 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ]
            })
            .collect();

        self.device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("spritebatch texture slots bgl"),
                entries: &entries,
            })
    }

    /// Texture currently bound to `unit`, or the placeholder.
    fn unit_texture(&self, unit: u32) -> &GpuTexture {
        self.units
            .get(unit as usize)
            .copied()
            .flatten()
            .and_then(|id| self.textures.get(&id))
            .unwrap_or(&self.placeholder)
    }
}

impl Device for Gpu {
    fn max_texture_slots(&self) -> u32 {
        self.slots
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> DeviceResult<ModuleId> {
        let label = format!("spritebatch {stage} shader");
        let module = scoped(&self.device, "shader compilation failed", || {
            self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            })
        })?;

        let id = ModuleId(self.alloc_id());
        self.modules.insert(id, Module { stage, module });
        Ok(id)
    }

    fn link_program(&mut self, vertex: ModuleId, fragment: ModuleId) -> DeviceResult<ProgramId> {
        let vs = lookup_module(&self.modules, vertex, ShaderStage::Vertex)?;
        let fs = lookup_module(&self.modules, fragment, ShaderStage::Fragment)?;

        let bind_group_layout = self.sprite_bind_group_layout();

        let pipeline = scoped(&self.device, "program link failed", || {
            let pipeline_layout =
                self.device
                    .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                        label: Some("spritebatch pipeline layout"),
                        bind_group_layouts: &[&bind_group_layout],
                        immediate_size: 0,
                    });

            self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("spritebatch pipeline"),
                layout: Some(&pipeline_layout),

                vertex: wgpu::VertexState {
                    module: vs,
                    entry_point: Some(VERTEX_ENTRY),
                    compilation_options: Default::default(),
                    buffers: &[Vertex::layout()],
                },

                fragment: Some(wgpu::FragmentState {
                    module: fs,
                    entry_point: Some(FRAGMENT_ENTRY),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.target_format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),

                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    // Quads are wound clockwise in NDC; keep both faces.
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },

                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            })
        })?;

        let id = ProgramId(self.alloc_id());
        self.programs.insert(
            id,
            Program {
                pipeline,
                bind_group_layout,
                sampler_units: vec![0; self.slots as usize],
            },
        );
        log::debug!("Gpu: linked program {}", id.0);
        Ok(id)
    }

    fn delete_shader(&mut self, module: ModuleId) {
        self.modules.remove(&module);
    }

    fn delete_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
        if self.current_program == Some(program) {
            self.current_program = None;
        }
    }

    fn use_program(&mut self, program: ProgramId) -> DeviceResult<()> {
        if !self.programs.contains_key(&program) {
            return Err(DeviceError::new(format!("unknown program {}", program.0)));
        }
        self.current_program = Some(program);
        Ok(())
    }

    fn set_uniform_i32(&mut self, program: ProgramId, name: &str, value: i32) -> DeviceResult<()> {
        let slots = self.slots;
        let program = self
            .programs
            .get_mut(&program)
            .ok_or_else(|| DeviceError::new(format!("unknown program {}", program.0)))?;

        let binding = parse_sampler_uniform(name)
            .filter(|&i| i < slots)
            .ok_or_else(|| DeviceError::new(format!("uniform \"{name}\" not found")))?;

        let unit = u32::try_from(value)
            .ok()
            .filter(|&u| u < slots)
            .ok_or_else(|| DeviceError::new(format!("texture unit {value} out of range")))?;

        program.sampler_units[binding as usize] = unit;
        Ok(())
    }

    fn create_vertex_buffer(&mut self, vertex_capacity: usize) -> DeviceResult<BufferId> {
        let size = (vertex_capacity * std::mem::size_of::<Vertex>()) as u64;
        let buffer = scoped(&self.device, "couldn't create vertex buffer", || {
            self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("spritebatch vertex buffer"),
                size,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        })?;

        let id = BufferId(self.alloc_id());
        self.vertex_buffers.insert(id, buffer);
        Ok(id)
    }

    fn create_index_buffer(&mut self, indices: &[u32]) -> DeviceResult<BufferId> {
        let buffer = scoped(&self.device, "couldn't create index buffer", || {
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("spritebatch index buffer"),
                    contents: bytemuck::cast_slice(indices),
                    usage: wgpu::BufferUsages::INDEX,
                })
        })?;

        let id = BufferId(self.alloc_id());
        self.index_buffers.insert(id, buffer);
        Ok(id)
    }

    fn write_vertices(&mut self, buffer: BufferId, vertices: &[Vertex]) -> DeviceResult<()> {
        let target = self
            .vertex_buffers
            .get(&buffer)
            .ok_or_else(|| DeviceError::new(format!("unknown vertex buffer {}", buffer.0)))?;

        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        if bytes.len() as u64 > target.size() {
            return Err(DeviceError::new(format!(
                "write of {} bytes overruns vertex buffer of {} bytes",
                bytes.len(),
                target.size()
            )));
        }
        if bytes.is_empty() {
            return Ok(());
        }

        scoped(&self.device, "vertex upload failed", || {
            self.queue.write_buffer(target, 0, bytes);
        })
    }

    fn delete_buffer(&mut self, buffer: BufferId) {
        self.vertex_buffers.remove(&buffer);
        self.index_buffers.remove(&buffer);
    }

    fn create_texture(&mut self, desc: &TextureDesc, rgba: &[u8]) -> DeviceResult<TextureId> {
        if desc.width == 0 || desc.height == 0 {
            return Err(DeviceError::new("texture dimensions must be non-zero"));
        }
        let expected = desc.width as usize * desc.height as usize * 4;
        if rgba.len() != expected {
            return Err(DeviceError::new(format!(
                "texture data is {} bytes, expected {expected}",
                rgba.len()
            )));
        }

        let texture = scoped(&self.device, "couldn't load texture in GPU", || {
            upload_texture(&self.device, &self.queue, desc, rgba, "spritebatch texture")
        })?;

        let id = TextureId(self.alloc_id());
        self.textures.insert(id, texture);
        Ok(id)
    }

    fn delete_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
        for unit in self.units.iter_mut().filter(|u| **u == Some(texture)) {
            *unit = None;
        }
    }

    fn bind_texture(&mut self, slot: u32, texture: TextureId) -> DeviceResult<()> {
        if !self.textures.contains_key(&texture) {
            return Err(DeviceError::new(format!("unknown texture {texture}")));
        }
        let unit = self.units.get_mut(slot as usize).ok_or_else(|| {
            DeviceError::new(format!("texture unit {slot} out of range (max {})", self.slots))
        })?;
        *unit = Some(texture);
        Ok(())
    }

    fn set_clear_color(&mut self, rgba: [f32; 4]) {
        let [r, g, b, a] = rgba.map(f64::from);
        self.clear_color = wgpu::Color { r, g, b, a };
    }

    fn clear(&mut self) -> DeviceResult<()> {
        let target = self.target_view()?;
        scoped(&self.device, "clear failed", || {
            self.submit_pass(
                "spritebatch clear pass",
                target,
                wgpu::LoadOp::Clear(self.clear_color),
                |_| {},
            );
        })
    }

    fn draw_indexed(
        &mut self,
        vertices: BufferId,
        indices: BufferId,
        index_count: u32,
    ) -> DeviceResult<()> {
        let target = self.target_view()?;
        let program = self
            .current_program
            .and_then(|id| self.programs.get(&id))
            .ok_or_else(|| DeviceError::new("no program in use"))?;
        let vbo = self
            .vertex_buffers
            .get(&vertices)
            .ok_or_else(|| DeviceError::new(format!("unknown vertex buffer {}", vertices.0)))?;
        let ibo = self
            .index_buffers
            .get(&indices)
            .ok_or_else(|| DeviceError::new(format!("unknown index buffer {}", indices.0)))?;

        let available = ibo.size() / std::mem::size_of::<u32>() as u64;
        if u64::from(index_count) > available {
            return Err(DeviceError::new(format!(
                "draw of {index_count} indices exceeds index buffer of {available}"
            )));
        }
        if index_count == 0 {
            return Ok(());
        }

        let entries: Vec<wgpu::BindGroupEntry<'_>> = program
            .sampler_units
            .iter()
            .zip(0u32..)
            .flat_map(|(&unit, slot)| {
                let tex = self.unit_texture(unit);
                [
                    wgpu::BindGroupEntry {
                        binding: slot * 2,
                        resource: wgpu::BindingResource::TextureView(&tex.view),
                    },
                    wgpu::BindGroupEntry {
                        binding: slot * 2 + 1,
                        resource: wgpu::BindingResource::Sampler(&tex.sampler),
                    },
                ]
            })
            .collect();

        scoped(&self.device, "draw failed", || {
            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("spritebatch texture slots bind group"),
                layout: &program.bind_group_layout,
                entries: &entries,
            });

            self.submit_pass("spritebatch draw pass", target, wgpu::LoadOp::Load, |rpass| {
                rpass.set_pipeline(&program.pipeline);
                rpass.set_bind_group(0, &bind_group, &[]);
                rpass.set_vertex_buffer(0, vbo.slice(..));
                rpass.set_index_buffer(ibo.slice(..), wgpu::IndexFormat::Uint32);
                rpass.draw_indexed(0..index_count, 0, 0..1);
            });
        })
    }
}

/// Runs `f` inside a validation error scope and reports anything captured.
fn scoped<T>(device: &wgpu::Device, what: &str, f: impl FnOnce() -> T) -> DeviceResult<T> {
    let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = f();
    match pollster::block_on(scope.pop()) {
        Some(err) => Err(DeviceError::new(format!("{what}: {err}"))),
        None => Ok(value),
    }
}

fn lookup_module(
    modules: &HashMap<ModuleId, Module>,
    id: ModuleId,
    stage: ShaderStage,
) -> DeviceResult<&wgpu::ShaderModule> {
    match modules.get(&id) {
        Some(m) if m.stage == stage => Ok(&m.module),
        Some(m) => Err(DeviceError::new(format!(
            "module {} is a {} shader, expected {stage}",
            id.0, m.stage
        ))),
        None => Err(DeviceError::new(format!("unknown shader module {}", id.0))),
    }
}

/// Parses `textures[i]` into `i`.
fn parse_sampler_uniform(name: &str) -> Option<u32> {
    name.strip_prefix(SAMPLER_UNIFORM)?
        .strip_prefix('[')?
        .strip_suffix(']')?
        .parse()
        .ok()
}

fn upload_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    desc: &TextureDesc,
    rgba: &[u8],
    label: &str,
) -> GpuTexture {
    let size = wgpu::Extent3d {
        width: desc.width,
        height: desc.height,
        depth_or_array_layers: 1,
    };

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        rgba,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(desc.width * 4),
            rows_per_image: Some(desc.height),
        },
        size,
    );

    let filter = match desc.filter {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    };
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: filter,
        min_filter: filter,
        mipmap_filter: wgpu::MipmapFilterMode::Nearest,
        ..Default::default()
    });

    GpuTexture {
        view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
        _texture: texture,
        sampler,
    }
}
