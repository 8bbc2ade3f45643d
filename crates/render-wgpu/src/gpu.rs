use crate::pipelines::{DEPTH_FORMAT, GpuProgram, PipelineCache, PipelineKey, target_format};
use orrery_render::resource::{
    AddressMode, DepthId, FilterMode, MeshId, OffscreenTarget, ProgramId, RasterState, SamplerDesc,
    SamplerId, TargetDesc, TargetId, TextureData, TextureId,
};
use orrery_render::shader::{ResourceKind, ShaderStage};
use orrery_render::{
    Mesh, MeshData, ProgramDesc, RenderCommand, RenderContext, RenderDevice, RenderError,
    ShaderProgram,
};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use wgpu::util::DeviceExt;

const INITIAL_UNIFORM_CAPACITY: u64 = 1 << 20;

struct GpuMesh {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
}

struct GpuTexture {
    view: wgpu::TextureView,
    filterable: bool,
}

struct GpuTarget {
    view: wgpu::TextureView,
    format: wgpu::TextureFormat,
}

struct Frame {
    surface: wgpu::SurfaceTexture,
    view: wgpu::TextureView,
}

fn align_up(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

/// One uniform buffer shared by every committed block of a flush, bound
/// with dynamic offsets.
struct UniformArena {
    buffer: wgpu::Buffer,
    capacity: u64,
    alignment: u64,
    staging: Vec<u8>,
}

impl UniformArena {
    fn new(device: &wgpu::Device, alignment: u64) -> Self {
        Self {
            buffer: Self::allocate(device, INITIAL_UNIFORM_CAPACITY),
            capacity: INITIAL_UNIFORM_CAPACITY,
            alignment,
            staging: Vec::new(),
        }
    }

    fn allocate(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("uniform_arena"),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn push(&mut self, data: &[u8]) -> u32 {
        let offset = align_up(self.staging.len() as u64, self.alignment) as usize;
        self.staging.resize(offset, 0);
        self.staging.extend_from_slice(data);
        offset as u32
    }

    fn push_zeroed(&mut self, size: u32) -> u32 {
        let offset = self.push(&[]);
        self.staging.resize(offset as usize + size as usize, 0);
        offset
    }

    /// Upload the staged blocks. Returns true if the buffer was replaced,
    /// which invalidates every bind group referencing it.
    fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) -> bool {
        let needed = self.staging.len() as u64;
        let grown = needed > self.capacity;
        if grown {
            self.capacity = needed.next_power_of_two();
            self.buffer = Self::allocate(device, self.capacity);
            tracing::debug!(capacity = self.capacity, "grew uniform arena");
        }
        if !self.staging.is_empty() {
            queue.write_buffer(&self.buffer, 0, &self.staging);
        }
        self.staging.clear();
        grown
    }
}

enum DrawKind {
    Indexed { mesh: MeshId, index_count: u32 },
    Vertices { vertex_count: u32 },
}

struct DrawCall {
    pipeline: usize,
    vertex: ProgramId,
    vertex_offset: u32,
    pixel: ProgramId,
    pixel_offset: u32,
    resources: usize,
    kind: DrawKind,
}

/// Attachments of one render pass, with a clear value where the pass
/// clears instead of loading.
struct PassPlan {
    colors: Vec<(TargetId, Option<[f32; 4]>)>,
    depth: Option<(DepthId, Option<f32>)>,
    draws: Vec<DrawCall>,
}

impl PassPlan {
    fn new(colors: Vec<(TargetId, Option<[f32; 4]>)>, depth: Option<(DepthId, Option<f32>)>) -> Self {
        Self {
            colors,
            depth,
            draws: Vec::new(),
        }
    }

    /// Same attachments, loading what the previous pass stored.
    fn continuation(&self) -> Self {
        Self::new(
            self.colors.iter().map(|(target, _)| (*target, None)).collect(),
            self.depth.map(|(depth, _)| (depth, None)),
        )
    }

    fn has_color(&self, target: TargetId) -> bool {
        self.colors.iter().any(|(t, _)| *t == target)
    }

    fn set_clear_color(&mut self, target: TargetId, color: [f32; 4]) {
        for (t, clear) in &mut self.colors {
            if *t == target {
                *clear = Some(color);
            }
        }
    }

    fn is_noop(&self) -> bool {
        self.draws.is_empty()
            && self.colors.iter().all(|(_, clear)| clear.is_none())
            && self.depth.is_none_or(|(_, clear)| clear.is_none())
    }
}

/// The last pass, reopened with load operations if it has already drawn
/// so a clear cannot overwrite earlier draws.
fn clearable(passes: &mut Vec<PassPlan>) -> Option<&mut PassPlan> {
    let last = passes.last()?;
    if !last.draws.is_empty() {
        let next = last.continuation();
        passes.push(next);
    }
    passes.last_mut()
}

/// A failed flush ends the frame. The acquired surface texture is dropped
/// unpresented so the next `begin_frame` can acquire a fresh one.
fn end_frame_on_error<T>(
    frame: &mut Option<T>,
    result: Result<(), RenderError>,
) -> Result<(), RenderError> {
    if result.is_err() {
        frame.take();
    }
    result
}

/// Bindings accumulated while replaying a command stream.
struct ReplayState {
    raster: RasterState,
    vertex: Option<ProgramId>,
    pixel: Option<ProgramId>,
    committed: BTreeMap<ProgramId, u32>,
    textures: BTreeMap<u32, TextureId>,
    samplers: BTreeMap<u32, SamplerId>,
}

impl ReplayState {
    fn new() -> Self {
        Self {
            raster: RasterState::Opaque,
            vertex: None,
            pixel: None,
            committed: BTreeMap::new(),
            textures: BTreeMap::new(),
            samplers: BTreeMap::new(),
        }
    }
}

/// [`RenderDevice`] backed by wgpu and a window surface.
///
/// Commands are buffered and replayed into render passes at
/// [`RenderDevice::present`] (or [`WgpuDevice::paint_overlay`]). Clears are
/// folded into the load operation of the next pass using the target.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
    depth: wgpu::TextureView,
    frame: Option<Frame>,
    commands: Vec<RenderCommand>,
    next_id: u32,
    programs: BTreeMap<ProgramId, GpuProgram>,
    meshes: BTreeMap<MeshId, GpuMesh>,
    textures: BTreeMap<TextureId, GpuTexture>,
    samplers: BTreeMap<SamplerId, wgpu::Sampler>,
    targets: BTreeMap<TargetId, GpuTarget>,
    pipelines: PipelineCache,
    uniforms: UniformArena,
    uniform_groups: BTreeMap<ProgramId, wgpu::BindGroup>,
    fallback_texture: wgpu::TextureView,
    fallback_sampler: wgpu::Sampler,
}

impl WgpuDevice {
    /// Pick an adapter for `surface`, create the device and configure the
    /// surface at `width` x `height`.
    pub async fn new(
        instance: &wgpu::Instance,
        surface: wgpu::Surface<'static>,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderError> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| RenderError::Backend("no compatible GPU adapter".into()))?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("orrery_device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .map_err(|e| RenderError::Backend(e.to_string()))?;

        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or(surface_caps.formats.first())
            .copied()
            .ok_or_else(|| RenderError::Backend("surface reports no formats".into()))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth = create_depth_texture(&device, config.width, config.height);
        let fallback_texture = device
            .create_texture_with_data(
                &queue,
                &wgpu::TextureDescriptor {
                    label: Some("fallback_white"),
                    size: wgpu::Extent3d {
                        width: 1,
                        height: 1,
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: wgpu::TextureFormat::Rgba8Unorm,
                    usage: wgpu::TextureUsages::TEXTURE_BINDING,
                    view_formats: &[],
                },
                wgpu::util::TextureDataOrder::LayerMajor,
                &[255; 4],
            )
            .create_view(&Default::default());
        let fallback_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("fallback_sampler"),
            ..Default::default()
        });
        let alignment = device.limits().min_uniform_buffer_offset_alignment as u64;
        let uniforms = UniformArena::new(&device, alignment);

        tracing::info!(
            backend = adapter.get_info().backend.to_str(),
            adapter = %adapter.get_info().name,
            ?format,
            "GPU initialized"
        );

        Ok(Self {
            device,
            queue,
            surface,
            config,
            depth,
            frame: None,
            commands: Vec::new(),
            next_id: 1,
            programs: BTreeMap::new(),
            meshes: BTreeMap::new(),
            textures: BTreeMap::new(),
            samplers: BTreeMap::new(),
            targets: BTreeMap::new(),
            pipelines: PipelineCache::default(),
            uniforms,
            uniform_groups: BTreeMap::new(),
            fallback_texture,
            fallback_sampler,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Flush the recorded passes, then let `paint` encode extra work that
    /// draws on top of the current backbuffer.
    pub fn paint_overlay<F>(&mut self, paint: F) -> Result<(), RenderError>
    where
        F: FnOnce(&wgpu::Device, &wgpu::Queue, &mut wgpu::CommandEncoder, &wgpu::TextureView),
    {
        let flushed = self.flush();
        end_frame_on_error(&mut self.frame, flushed)?;
        let frame = self
            .frame
            .as_ref()
            .ok_or_else(|| RenderError::Backend("overlay painted outside a frame".into()))?;
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("overlay_encoder"),
            });
        paint(&self.device, &self.queue, &mut encoder, &frame.view);
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn issue(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn color_format(&self, target: TargetId) -> Result<wgpu::TextureFormat, RenderError> {
        if target == TargetId::BACKBUFFER {
            return Ok(self.config.format);
        }
        self.targets
            .get(&target)
            .map(|t| t.format)
            .ok_or_else(|| RenderError::Backend(format!("unknown render target {target:?}")))
    }

    fn color_view(&self, target: TargetId) -> Result<&wgpu::TextureView, RenderError> {
        if target == TargetId::BACKBUFFER {
            return self
                .frame
                .as_ref()
                .map(|f| &f.view)
                .ok_or_else(|| RenderError::Backend("no backbuffer acquired".into()));
        }
        self.targets
            .get(&target)
            .map(|t| &t.view)
            .ok_or_else(|| RenderError::Backend(format!("unknown render target {target:?}")))
    }

    /// Resolve the pixel program's texture and sampler slots against the
    /// current bindings. Unbound or incompatible slots use the fallbacks.
    fn resource_group(
        &self,
        program: &GpuProgram,
        state: &ReplayState,
    ) -> (Vec<Option<u32>>, wgpu::BindGroup) {
        let mut key = Vec::with_capacity(program.desc.resources.len());
        let mut entries = Vec::with_capacity(program.desc.resources.len());
        for (slot, resource) in program.desc.resources.iter().enumerate() {
            let slot = slot as u32;
            let resource = match resource.kind {
                ResourceKind::Texture { filterable } => {
                    let bound = state.textures.get(&slot).and_then(|id| {
                        self.textures
                            .get(id)
                            .filter(|t| t.filterable || !filterable)
                            .map(|t| (id.0, &t.view))
                    });
                    key.push(bound.map(|(id, _)| id));
                    wgpu::BindingResource::TextureView(
                        bound.map_or(&self.fallback_texture, |(_, view)| view),
                    )
                }
                ResourceKind::Sampler => {
                    let bound = state
                        .samplers
                        .get(&slot)
                        .and_then(|id| self.samplers.get(id).map(|s| (id.0, s)));
                    key.push(bound.map(|(id, _)| id));
                    wgpu::BindingResource::Sampler(
                        bound.map_or(&self.fallback_sampler, |(_, sampler)| sampler),
                    )
                }
            };
            entries.push(wgpu::BindGroupEntry {
                binding: slot,
                resource,
            });
        }
        let group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&program.desc.label),
            layout: &program.resource_layout,
            entries: &entries,
        });
        (key, group)
    }

    /// Replay the recorded commands into render passes and submit them.
    fn flush(&mut self) -> Result<(), RenderError> {
        let commands = std::mem::take(&mut self.commands);
        let mut passes: Vec<PassPlan> = Vec::new();
        let mut pending_colors: BTreeMap<TargetId, [f32; 4]> = BTreeMap::new();
        let mut pending_depth: Option<f32> = None;
        let mut state = ReplayState::new();
        let mut resource_groups: Vec<wgpu::BindGroup> = Vec::new();
        let mut resource_index: HashMap<(ProgramId, Vec<Option<u32>>), usize> = HashMap::new();

        for command in commands {
            match command {
                RenderCommand::SetRenderTargets { colors, depth } => {
                    let colors = colors
                        .into_iter()
                        .map(|target| (target, pending_colors.remove(&target)))
                        .collect();
                    let depth = depth.map(|d| (d, pending_depth.take()));
                    passes.push(PassPlan::new(colors, depth));
                }
                RenderCommand::ClearTarget { target, color } => {
                    if passes.last().is_some_and(|p| p.has_color(target)) {
                        if let Some(pass) = clearable(&mut passes) {
                            pass.set_clear_color(target, color);
                        }
                    } else {
                        pending_colors.insert(target, color);
                    }
                }
                RenderCommand::ClearDepth { value, .. } => {
                    if passes.last().is_some_and(|p| p.depth.is_some()) {
                        if let Some(pass) = clearable(&mut passes) {
                            pass.depth = pass.depth.map(|(d, _)| (d, Some(value)));
                        }
                    } else {
                        pending_depth = Some(value);
                    }
                }
                RenderCommand::SetRasterState(raster) => state.raster = raster,
                RenderCommand::SetProgram { stage, program } => match stage {
                    ShaderStage::Vertex => state.vertex = Some(program),
                    ShaderStage::Pixel => state.pixel = Some(program),
                },
                RenderCommand::CommitUniforms { program, data, .. } => {
                    let offset = self.uniforms.push(&data);
                    state.committed.insert(program, offset);
                }
                RenderCommand::BindTexture {
                    stage: ShaderStage::Pixel,
                    slot,
                    texture,
                } => {
                    state.textures.insert(slot, texture);
                }
                RenderCommand::BindSampler {
                    stage: ShaderStage::Pixel,
                    slot,
                    sampler,
                } => {
                    state.samplers.insert(slot, sampler);
                }
                RenderCommand::BindTexture { .. } | RenderCommand::BindSampler { .. } => {
                    tracing::trace!("ignoring vertex-stage resource binding");
                }
                RenderCommand::UnbindShaderResources { stage } => {
                    if stage == ShaderStage::Pixel {
                        state.textures.clear();
                        state.samplers.clear();
                    }
                }
                RenderCommand::DrawIndexed { mesh, index_count } => {
                    let kind = DrawKind::Indexed { mesh, index_count };
                    self.plan_draw(&mut passes, &mut state, kind, &mut resource_groups, &mut resource_index)?;
                }
                RenderCommand::Draw { vertex_count } => {
                    let kind = DrawKind::Vertices { vertex_count };
                    self.plan_draw(&mut passes, &mut state, kind, &mut resource_groups, &mut resource_index)?;
                }
            }
        }

        // Clears with no later pass still have to reach their targets.
        for (target, color) in pending_colors {
            passes.push(PassPlan::new(vec![(target, Some(color))], None));
        }
        if let Some(value) = pending_depth {
            passes.push(PassPlan::new(Vec::new(), Some((DepthId::PRIMARY, Some(value)))));
        }

        if self.uniforms.upload(&self.device, &self.queue) {
            self.uniform_groups.clear();
        }
        for pass in &passes {
            for draw in &pass.draws {
                self.ensure_uniform_group(draw.vertex)?;
                self.ensure_uniform_group(draw.pixel)?;
            }
        }

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });
        for pass in passes.iter().filter(|p| !p.is_noop()) {
            self.encode_pass(&mut encoder, pass, &resource_groups)?;
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    fn plan_draw(
        &mut self,
        passes: &mut [PassPlan],
        state: &mut ReplayState,
        kind: DrawKind,
        resource_groups: &mut Vec<wgpu::BindGroup>,
        resource_index: &mut HashMap<(ProgramId, Vec<Option<u32>>), usize>,
    ) -> Result<(), RenderError> {
        let pass = passes
            .last_mut()
            .ok_or_else(|| RenderError::Backend("draw with no render targets bound".into()))?;
        let (Some(vertex_id), Some(pixel_id)) = (state.vertex, state.pixel) else {
            return Err(RenderError::Backend("draw with no program bound".into()));
        };
        let missing = |id: ProgramId| RenderError::Backend(format!("unknown program {id:?}"));
        let vertex = self.programs.get(&vertex_id).ok_or_else(|| missing(vertex_id))?;
        let pixel = self.programs.get(&pixel_id).ok_or_else(|| missing(pixel_id))?;

        let colors = pass
            .colors
            .iter()
            .map(|(target, _)| self.color_format(*target))
            .collect::<Result<Vec<_>, _>>()?;
        let key = PipelineKey {
            vertex: vertex_id,
            pixel: pixel_id,
            raster: state.raster,
            colors,
            depth: pass.depth.is_some(),
        };
        let pipeline = self.pipelines.get_or_create(&self.device, &key, vertex, pixel)?;

        let (resource_key, group) = self.resource_group(pixel, state);
        let resources = match resource_index.get(&(pixel_id, resource_key.clone())) {
            Some(&index) => index,
            None => {
                resource_groups.push(group);
                let index = resource_groups.len() - 1;
                resource_index.insert((pixel_id, resource_key), index);
                index
            }
        };

        let vertex_size = vertex.desc.uniforms.size();
        let pixel_size = pixel.desc.uniforms.size();
        let mut offset_of = |id: ProgramId, size: u32| match state.committed.get(&id) {
            Some(&offset) => offset,
            None => {
                let offset = self.uniforms.push_zeroed(size);
                state.committed.insert(id, offset);
                offset
            }
        };
        let vertex_offset = offset_of(vertex_id, vertex_size);
        let pixel_offset = offset_of(pixel_id, pixel_size);

        pass.draws.push(DrawCall {
            pipeline,
            vertex: vertex_id,
            vertex_offset,
            pixel: pixel_id,
            pixel_offset,
            resources,
            kind,
        });
        Ok(())
    }

    fn ensure_uniform_group(&mut self, id: ProgramId) -> Result<(), RenderError> {
        if self.uniform_groups.contains_key(&id) {
            return Ok(());
        }
        let program = self
            .programs
            .get(&id)
            .ok_or_else(|| RenderError::Backend(format!("unknown program {id:?}")))?;
        let group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&program.desc.label),
            layout: &program.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &self.uniforms.buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(program.desc.uniforms.size() as u64),
                }),
            }],
        });
        self.uniform_groups.insert(id, group);
        Ok(())
    }

    fn encode_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        plan: &PassPlan,
        resource_groups: &[wgpu::BindGroup],
    ) -> Result<(), RenderError> {
        let color_attachments = plan
            .colors
            .iter()
            .map(|(target, clear)| {
                let load = match clear {
                    Some([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color {
                        r: *r as f64,
                        g: *g as f64,
                        b: *b as f64,
                        a: *a as f64,
                    }),
                    None => wgpu::LoadOp::Load,
                };
                Ok(Some(wgpu::RenderPassColorAttachment {
                    view: self.color_view(*target)?,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                }))
            })
            .collect::<Result<Vec<_>, RenderError>>()?;
        let depth_stencil_attachment = match plan.depth {
            Some((DepthId::PRIMARY, clear)) => Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth,
                depth_ops: Some(wgpu::Operations {
                    load: clear.map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            Some((other, _)) => {
                return Err(RenderError::Backend(format!("unknown depth buffer {other:?}")));
            }
            None => None,
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("scene_pass"),
            color_attachments: &color_attachments,
            depth_stencil_attachment,
            ..Default::default()
        });

        for draw in &plan.draws {
            let missing = || RenderError::Backend("uniform bind group missing".into());
            let vertex_group = self.uniform_groups.get(&draw.vertex).ok_or_else(missing)?;
            let pixel_group = self.uniform_groups.get(&draw.pixel).ok_or_else(missing)?;

            pass.set_pipeline(self.pipelines.get(draw.pipeline));
            pass.set_bind_group(0, vertex_group, &[draw.vertex_offset]);
            pass.set_bind_group(1, pixel_group, &[draw.pixel_offset]);
            pass.set_bind_group(2, &resource_groups[draw.resources], &[]);
            match draw.kind {
                DrawKind::Indexed { mesh, index_count } => {
                    let Some(mesh) = self.meshes.get(&mesh) else {
                        tracing::warn!(?mesh, "skipping draw of unknown mesh");
                        continue;
                    };
                    pass.set_vertex_buffer(0, mesh.vertices.slice(..));
                    pass.set_index_buffer(mesh.indices.slice(..), wgpu::IndexFormat::Uint32);
                    pass.draw_indexed(0..index_count, 0, 0..1);
                }
                DrawKind::Vertices { vertex_count } => pass.draw(0..vertex_count, 0..1),
            }
        }
        Ok(())
    }
}

impl RenderContext for WgpuDevice {
    fn record(&mut self, command: RenderCommand) {
        self.commands.push(command);
    }
}

impl RenderDevice for WgpuDevice {
    fn viewport(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn resize_backbuffer(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidTargetSize { width, height });
        }
        if self.frame.is_some() {
            return Err(RenderError::Backend("backbuffer resized mid-frame".into()));
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth = create_depth_texture(&self.device, width, height);
        tracing::debug!(width, height, "reconfigured surface");
        Ok(())
    }

    fn begin_frame(&mut self) -> Result<(), RenderError> {
        if self.frame.is_some() {
            return Err(RenderError::Backend("frame already in progress".into()));
        }
        let surface = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                tracing::warn!("surface lost; reconfigured");
                return Err(RenderError::SurfaceLost);
            }
            Err(e) => return Err(RenderError::Backend(format!("surface error: {e}"))),
        };
        let view = surface
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        // Bindings never carry over from the previous frame, including the
        // backbuffer rebind the pipeline records after present.
        self.commands.clear();
        self.frame = Some(Frame { surface, view });
        Ok(())
    }

    fn present(&mut self) -> Result<(), RenderError> {
        let flushed = self.flush();
        let frame = self.frame.take();
        flushed?;
        let frame = frame.ok_or_else(|| RenderError::Backend("present without a frame".into()))?;
        frame.surface.present();
        Ok(())
    }

    fn create_offscreen_target(
        &mut self,
        desc: &TargetDesc,
    ) -> Result<OffscreenTarget, RenderError> {
        if desc.width == 0 || desc.height == 0 {
            return Err(RenderError::InvalidTargetSize {
                width: desc.width,
                height: desc.height,
            });
        }
        let format = target_format(desc.format);
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&desc.label),
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());
        if let Some(err) = validation.or(out_of_memory) {
            return Err(RenderError::TargetCreation {
                label: desc.label.clone(),
                width: desc.width,
                height: desc.height,
                reason: err.to_string(),
            });
        }

        let target = TargetId(self.issue());
        let texture_id = TextureId(self.issue());
        self.targets.insert(
            target,
            GpuTarget {
                view: texture.create_view(&Default::default()),
                format,
            },
        );
        self.textures.insert(
            texture_id,
            GpuTexture {
                view: texture.create_view(&Default::default()),
                filterable: desc.format.is_filterable(),
            },
        );
        Ok(OffscreenTarget {
            target,
            texture: texture_id,
            width: desc.width,
            height: desc.height,
            format: desc.format,
        })
    }

    fn release_target(&mut self, target: &OffscreenTarget) {
        self.targets.remove(&target.target);
        self.textures.remove(&target.texture);
    }

    fn create_mesh(&mut self, data: &MeshData) -> Result<Mesh, RenderError> {
        if data.vertices.is_empty() || data.indices.is_empty() {
            return Err(RenderError::ResourceCreation {
                kind: "mesh",
                label: data.label.clone(),
                reason: "no geometry".into(),
            });
        }
        let vertices = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{}_vertices", data.label)),
                contents: bytemuck::cast_slice(&data.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let indices = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{}_indices", data.label)),
                contents: bytemuck::cast_slice(&data.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        let id = MeshId(self.issue());
        self.meshes.insert(id, GpuMesh { vertices, indices });
        Ok(Mesh {
            id,
            vertex_count: data.vertices.len() as u32,
            index_count: data.indices.len() as u32,
        })
    }

    fn create_texture(&mut self, data: &TextureData) -> Result<TextureId, RenderError> {
        let expected = data.width as usize * data.height as usize * 4;
        if data.width == 0 || data.height == 0 || data.pixels.len() != expected {
            return Err(RenderError::ResourceCreation {
                kind: "texture",
                label: data.label.clone(),
                reason: format!("expected {expected} bytes, got {}", data.pixels.len()),
            });
        }
        let format = if data.srgb {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        };
        let texture = self.device.create_texture_with_data(
            &self.queue,
            &wgpu::TextureDescriptor {
                label: Some(&data.label),
                size: wgpu::Extent3d {
                    width: data.width,
                    height: data.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &data.pixels,
        );
        let id = TextureId(self.issue());
        self.textures.insert(
            id,
            GpuTexture {
                view: texture.create_view(&Default::default()),
                filterable: true,
            },
        );
        Ok(id)
    }

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<SamplerId, RenderError> {
        let address = match desc.address {
            AddressMode::Wrap => wgpu::AddressMode::Repeat,
            AddressMode::Clamp => wgpu::AddressMode::ClampToEdge,
        };
        let (filter, anisotropy) = match desc.filter {
            FilterMode::Linear => (wgpu::FilterMode::Linear, desc.anisotropy.clamp(1, 16)),
            FilterMode::Nearest => (wgpu::FilterMode::Nearest, 1),
        };
        let sampler = self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&desc.label),
            address_mode_u: address,
            address_mode_v: address,
            address_mode_w: address,
            mag_filter: filter,
            min_filter: filter,
            mipmap_filter: filter,
            anisotropy_clamp: anisotropy,
            ..Default::default()
        });
        let id = SamplerId(self.issue());
        self.samplers.insert(id, sampler);
        Ok(id)
    }

    fn create_program(&mut self, desc: ProgramDesc) -> Result<Rc<ShaderProgram>, RenderError> {
        desc.validate()?;
        let program = GpuProgram::new(&self.device, desc.clone())?;
        let id = ProgramId(self.issue());
        self.programs.insert(id, program);
        tracing::debug!(label = %desc.label, ?id, "created shader program");
        Ok(Rc::new(ShaderProgram::new(id, desc)))
    }
}

fn create_depth_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::TextureView {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("depth_texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    texture.create_view(&Default::default())
}
