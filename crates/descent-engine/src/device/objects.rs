use std::num::NonZeroU64;

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::render::Vertex;
use crate::resource::{
    BufferDescriptor, BufferUsage, FilterMode, GpuResourceDescriptor, ShaderDescriptor,
    TextureDescriptor, TextureFormat,
};

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub(super) struct ViewportUniform {
    pub viewport: [f32; 2],
    pub _pad: [f32; 2], // 16-byte alignment
}

const VIEWPORT_UBO_SIZE: NonZeroU64 = match NonZeroU64::new(size_of::<ViewportUniform>() as u64) {
    Some(size) => size,
    None => panic!("ViewportUniform is zero-sized"),
};

fn premul_alpha_blend() -> wgpu::BlendState {
    let component = wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    };
    wgpu::BlendState {
        color: component,
        alpha: component,
    }
}

/// Color target every pipeline of a context renders into.
#[derive(Debug, Copy, Clone)]
pub(super) struct Target {
    pub format: wgpu::TextureFormat,
    pub samples: u32,
}

/// Objects shared by every program and texture of a context.
///
/// Bind group layout:
/// - 0: viewport uniform (vertex)
/// - 1: texture (fragment)
/// - 2: sampler (fragment)
pub(super) struct Bindings {
    pub layout: wgpu::BindGroupLayout,
    pub pipeline_layout: wgpu::PipelineLayout,
    pub viewport_ubo: wgpu::Buffer,
    linear: wgpu::Sampler,
    nearest: wgpu::Sampler,
}

impl Bindings {
    pub fn new(device: &wgpu::Device) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("descent bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: Some(VIEWPORT_UBO_SIZE),
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("descent pipeline layout"),
            bind_group_layouts: &[&layout],
            immediate_size: 0,
        });

        let viewport_ubo = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("descent viewport ubo"),
            size: VIEWPORT_UBO_SIZE.get(),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let sampler = |label, filter| {
            device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some(label),
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                address_mode_w: wgpu::AddressMode::ClampToEdge,
                mag_filter: filter,
                min_filter: filter,
                mipmap_filter: wgpu::MipmapFilterMode::Nearest,
                ..Default::default()
            })
        };

        Self {
            linear: sampler("descent linear sampler", wgpu::FilterMode::Linear),
            nearest: sampler("descent nearest sampler", wgpu::FilterMode::Nearest),
            layout,
            pipeline_layout,
            viewport_ubo,
        }
    }

    pub fn write_viewport(&self, queue: &wgpu::Queue, width: f32, height: f32) {
        queue.write_buffer(
            &self.viewport_ubo,
            0,
            bytemuck::bytes_of(&ViewportUniform {
                viewport: [width.max(1.0), height.max(1.0)],
                _pad: [0.0; 2],
            }),
        );
    }

    fn sampler(&self, filter: FilterMode) -> &wgpu::Sampler {
        match filter {
            FilterMode::Linear => &self.linear,
            FilterMode::Nearest => &self.nearest,
        }
    }
}

/// Native object behind a `NativeHandle`.
pub(super) enum GpuObject {
    Texture {
        texture: wgpu::Texture,
        bind_group: wgpu::BindGroup,
    },
    Program {
        pipeline: wgpu::RenderPipeline,
    },
    Buffer {
        buffer: wgpu::Buffer,
        usage: BufferUsage,
        /// Vertex or index count.
        elements: u32,
    },
}

impl GpuObject {
    pub fn create(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bindings: &Bindings,
        target: Target,
        desc: &GpuResourceDescriptor,
    ) -> Result<Self, String> {
        match desc {
            GpuResourceDescriptor::Texture(t) => Ok(texture(device, queue, bindings, t)),
            GpuResourceDescriptor::FontAtlas(f) => {
                let atlas = &f.atlas;
                let t = TextureDescriptor {
                    label: f.label.clone(),
                    width: atlas.width(),
                    height: atlas.height(),
                    format: TextureFormat::R8Unorm,
                    filter: FilterMode::Linear,
                    pixels: atlas.pixels().to_vec(),
                };
                Ok(texture(device, queue, bindings, &t))
            }
            GpuResourceDescriptor::Shader(s) => Ok(program(device, bindings, target, s)),
            GpuResourceDescriptor::Buffer(b) => buffer(device, b),
        }
    }

    /// Frees GPU memory now instead of when the last command using it retires.
    pub fn destroy(self) {
        match self {
            GpuObject::Texture { texture, .. } => texture.destroy(),
            GpuObject::Buffer { buffer, .. } => buffer.destroy(),
            GpuObject::Program { .. } => {}
        }
    }
}

fn texture_format(format: TextureFormat) -> wgpu::TextureFormat {
    match format {
        TextureFormat::Rgba8UnormSrgb => wgpu::TextureFormat::Rgba8UnormSrgb,
        TextureFormat::Rgba8Unorm => wgpu::TextureFormat::Rgba8Unorm,
        TextureFormat::R8Unorm => wgpu::TextureFormat::R8Unorm,
    }
}

fn texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    bindings: &Bindings,
    desc: &TextureDescriptor,
) -> GpuObject {
    let size = wgpu::Extent3d {
        width: desc.width,
        height: desc.height,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: desc.label.as_deref(),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: texture_format(desc.format),
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
        &desc.pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(desc.width * desc.format.bytes_per_pixel() as u32),
            rows_per_image: Some(desc.height),
        },
        size,
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: desc.label.as_deref(),
        layout: &bindings.layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: bindings.viewport_ubo.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(bindings.sampler(desc.filter)),
            },
        ],
    });

    GpuObject::Texture {
        texture,
        bind_group,
    }
}

fn program(
    device: &wgpu::Device,
    bindings: &Bindings,
    target: Target,
    desc: &ShaderDescriptor,
) -> GpuObject {
    let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: desc.label.as_deref(),
        source: wgpu::ShaderSource::Wgsl(desc.source.as_str().into()),
    });

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: desc.label.as_deref(),
        layout: Some(&bindings.pipeline_layout),
        vertex: wgpu::VertexState {
            module: &module,
            entry_point: Some(desc.vertex_entry.as_str()),
            compilation_options: Default::default(),
            buffers: &[Vertex::layout()],
        },
        fragment: Some(wgpu::FragmentState {
            module: &module,
            entry_point: Some(desc.fragment_entry.as_str()),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: target.format,
                blend: Some(premul_alpha_blend()),
                write_mask: wgpu::ColorWrites::ALL,
            })],
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
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: target.samples,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview_mask: None,
        cache: None,
    });

    GpuObject::Program { pipeline }
}

fn buffer(device: &wgpu::Device, desc: &BufferDescriptor) -> Result<GpuObject, String> {
    let (usage, stride) = match desc.usage {
        BufferUsage::Vertex => (wgpu::BufferUsages::VERTEX, size_of::<Vertex>()),
        BufferUsage::Index => (wgpu::BufferUsages::INDEX, size_of::<u16>()),
        BufferUsage::Uniform => (wgpu::BufferUsages::UNIFORM, 1),
    };
    let elements = u32::try_from(desc.contents.len() / stride)
        .map_err(|_| format!("buffer of {} bytes is too large", desc.contents.len()))?;

    let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: desc.label.as_deref(),
        contents: &desc.contents,
        usage,
    });

    Ok(GpuObject::Buffer {
        buffer,
        usage: desc.usage,
        elements,
    })
}
