use orrery_render::resource::{RasterState, TargetFormat};
use orrery_render::shader::{ResourceKind, ResourceSlot, ShaderStage, VertexInput};
use orrery_render::{ProgramDesc, RenderError, Vertex};
use std::collections::HashMap;

pub(crate) const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

pub(crate) fn target_format(format: TargetFormat) -> wgpu::TextureFormat {
    match format {
        TargetFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        TargetFormat::Rgba16Float => wgpu::TextureFormat::Rgba16Float,
        TargetFormat::R32Float => wgpu::TextureFormat::R32Float,
    }
}

/// A compiled program with the bind-group layouts its stage uses.
///
/// Group 0 holds vertex uniforms, group 1 pixel uniforms and group 2 pixel
/// textures and samplers, one binding per resource slot.
pub(crate) struct GpuProgram {
    pub desc: ProgramDesc,
    pub module: wgpu::ShaderModule,
    pub uniform_layout: wgpu::BindGroupLayout,
    pub resource_layout: wgpu::BindGroupLayout,
}

impl GpuProgram {
    pub fn new(device: &wgpu::Device, desc: ProgramDesc) -> Result<Self, RenderError> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&desc.label),
            source: wgpu::ShaderSource::Wgsl(desc.source.as_str().into()),
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(RenderError::ProgramCreation {
                label: desc.label.clone(),
                reason: err.to_string(),
            });
        }

        let visibility = match desc.stage {
            ShaderStage::Vertex => wgpu::ShaderStages::VERTEX,
            ShaderStage::Pixel => wgpu::ShaderStages::FRAGMENT,
        };
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{}_uniforms", desc.label)),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(desc.uniforms.size() as u64),
                },
                count: None,
            }],
        });
        let entries: Vec<wgpu::BindGroupLayoutEntry> = desc
            .resources
            .iter()
            .enumerate()
            .map(|(slot, resource)| resource_entry(slot as u32, resource))
            .collect();
        let resource_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{}_resources", desc.label)),
            entries: &entries,
        });

        Ok(Self {
            desc,
            module,
            uniform_layout,
            resource_layout,
        })
    }
}

fn resource_entry(slot: u32, resource: &ResourceSlot) -> wgpu::BindGroupLayoutEntry {
    let ty = match resource.kind {
        ResourceKind::Texture { filterable } => wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        ResourceKind::Sampler => wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
    };
    wgpu::BindGroupLayoutEntry {
        binding: slot,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty,
        count: None,
    }
}

/// Everything that selects a distinct render pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct PipelineKey {
    pub vertex: orrery_render::resource::ProgramId,
    pub pixel: orrery_render::resource::ProgramId,
    pub raster: RasterState,
    pub colors: Vec<wgpu::TextureFormat>,
    pub depth: bool,
}

/// Render pipelines built on first use and kept for the device's lifetime.
#[derive(Default)]
pub(crate) struct PipelineCache {
    pipelines: Vec<wgpu::RenderPipeline>,
    index: HashMap<PipelineKey, usize>,
}

impl PipelineCache {
    pub fn get(&self, index: usize) -> &wgpu::RenderPipeline {
        &self.pipelines[index]
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    /// Index of the pipeline for `key`, building it if needed.
    pub fn get_or_create(
        &mut self,
        device: &wgpu::Device,
        key: &PipelineKey,
        vertex: &GpuProgram,
        pixel: &GpuProgram,
    ) -> Result<usize, RenderError> {
        if let Some(&index) = self.index.get(key) {
            return Ok(index);
        }
        let pipeline = create_pipeline(device, key, vertex, pixel)?;
        self.pipelines.push(pipeline);
        let index = self.pipelines.len() - 1;
        self.index.insert(key.clone(), index);
        tracing::debug!(
            vertex = %vertex.desc.label,
            pixel = %pixel.desc.label,
            raster = ?key.raster,
            cached = self.len(),
            "created render pipeline"
        );
        Ok(index)
    }
}

fn depth_state(raster: RasterState) -> wgpu::DepthStencilState {
    let (depth_write_enabled, depth_compare) = match raster {
        RasterState::Opaque => (true, wgpu::CompareFunction::Less),
        RasterState::Background => (false, wgpu::CompareFunction::LessEqual),
        RasterState::FullScreen => (false, wgpu::CompareFunction::Always),
    };
    wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled,
        depth_compare,
        stencil: Default::default(),
        bias: Default::default(),
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    key: &PipelineKey,
    vertex: &GpuProgram,
    pixel: &GpuProgram,
) -> Result<wgpu::RenderPipeline, RenderError> {
    let label = format!("{}+{}", vertex.desc.label, pixel.desc.label);
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(&label),
        bind_group_layouts: &[
            &vertex.uniform_layout,
            &pixel.uniform_layout,
            &pixel.resource_layout,
        ],
        push_constant_ranges: &[],
    });

    let mesh_layout = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![
            0 => Float32x3,
            1 => Float32x3,
            2 => Float32x2,
            3 => Float32x3,
        ],
    };
    let buffers = match vertex.desc.vertex_input {
        VertexInput::Mesh => std::slice::from_ref(&mesh_layout),
        VertexInput::None => &[],
    };
    let targets: Vec<Option<wgpu::ColorTargetState>> = key
        .colors
        .iter()
        .map(|&format| {
            Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })
        })
        .collect();

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &vertex.module,
            entry_point: Some(&vertex.desc.entry_point),
            compilation_options: Default::default(),
            buffers,
        },
        fragment: Some(wgpu::FragmentState {
            module: &pixel.module,
            entry_point: Some(&pixel.desc.entry_point),
            compilation_options: Default::default(),
            targets: &targets,
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            cull_mode: None,
            ..Default::default()
        },
        depth_stencil: key.depth.then(|| depth_state(key.raster)),
        multisample: Default::default(),
        multiview: None,
        cache: None,
    });
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(RenderError::ProgramCreation {
            label,
            reason: err.to_string(),
        }),
        None => Ok(pipeline),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sky_tests_depth_without_writing() {
        let state = depth_state(RasterState::Background);
        assert!(!state.depth_write_enabled);
        assert_eq!(state.depth_compare, wgpu::CompareFunction::LessEqual);
        let opaque = depth_state(RasterState::Opaque);
        assert!(opaque.depth_write_enabled);
        assert_eq!(opaque.depth_compare, wgpu::CompareFunction::Less);
    }

    #[test]
    fn depth_target_is_not_filterable() {
        assert_eq!(target_format(TargetFormat::R32Float), wgpu::TextureFormat::R32Float);
        let entry = resource_entry(2, &ResourceSlot::unfilterable_texture("depth"));
        assert!(matches!(
            entry.ty,
            wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                ..
            }
        ));
        assert_eq!(entry.binding, 2);
    }
}
