use wgpu::{
    BindGroupLayout, BlendState, ColorTargetState, ColorWrites, Device, FragmentState,
    MultisampleState, PipelineCompilationOptions, PipelineLayoutDescriptor, PrimitiveState,
    PrimitiveTopology, RenderPipeline, RenderPipelineDescriptor, ShaderModule,
    ShaderModuleDescriptor, TextureFormat, VertexBufferLayout, VertexState,
};

use crate::backend::Topology;

impl From<Topology> for PrimitiveTopology {
    fn from(topology: Topology) -> Self {
        match topology {
            Topology::Triangles => PrimitiveTopology::TriangleList,
            Topology::TriangleStrip => PrimitiveTopology::TriangleStrip,
        }
    }
}

/// Bundles the creation of a [wgpu::RenderPipeline] from separate vertex and fragment sources.
///
/// ```ignore
/// let pipeline = PipelineBuilder::new()
///     .with_shaders(vertex_src, fragment_src)
///     .with_topology(Topology::TriangleStrip)
///     .build(device);
/// ```
pub struct PipelineBuilder<'a> {
    vertex_src: &'a str,
    fragment_src: &'a str,
    bind_layouts: Vec<&'a BindGroupLayout>,
    vertex_buffers: Vec<VertexBufferLayout<'a>>,
    primitive_state: PrimitiveState,
    format: TextureFormat,
}

impl<'a> PipelineBuilder<'a> {
    pub fn new() -> Self {
        Self {
            vertex_src: "",
            fragment_src: "",
            bind_layouts: Vec::new(),
            vertex_buffers: Vec::new(),
            primitive_state: PrimitiveState::default(),
            format: TextureFormat::Bgra8UnormSrgb,
        }
    }

    pub fn with_shaders(mut self, vertex_src: &'a str, fragment_src: &'a str) -> Self {
        self.vertex_src = vertex_src;
        self.fragment_src = fragment_src;
        self
    }

    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.primitive_state.topology = topology.into();
        self
    }

    pub fn with_format(mut self, format: TextureFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_bind(mut self, layout: &'a BindGroupLayout) -> Self {
        self.bind_layouts.push(layout);
        self
    }

    pub fn with_vb(mut self, layout: VertexBufferLayout<'a>) -> Self {
        self.vertex_buffers.push(layout);
        self
    }

    fn create_module(device: &Device, label: &str, src: &str) -> ShaderModule {
        device.create_shader_module(ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(src.into()),
        })
    }

    pub fn build(&self, device: &Device) -> RenderPipeline {
        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: None,
            bind_group_layouts: self.bind_layouts.as_slice(),
            push_constant_ranges: &[],
        });

        let vertex_module = Self::create_module(device, "text vertex shader", self.vertex_src);
        let fragment_module =
            Self::create_module(device, "text fragment shader", self.fragment_src);

        device.create_render_pipeline(&RenderPipelineDescriptor {
            label: None,
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: &vertex_module,
                entry_point: "vertex",
                buffers: self.vertex_buffers.as_slice(),
                compilation_options: PipelineCompilationOptions::default(),
            },
            primitive: self.primitive_state,
            depth_stencil: None,
            multisample: MultisampleState::default(),
            fragment: Some(FragmentState {
                module: &fragment_module,
                entry_point: "fragment",
                targets: &[Some(ColorTargetState {
                    format: self.format,
                    blend: Some(BlendState::ALPHA_BLENDING),
                    write_mask: ColorWrites::all(),
                })],
                compilation_options: PipelineCompilationOptions::default(),
            }),
            multiview: None,
        })
    }
}

impl Default for PipelineBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topology_maps_to_wgpu() {
        assert_eq!(
            PrimitiveTopology::from(Topology::Triangles),
            PrimitiveTopology::TriangleList
        );
        assert_eq!(
            PrimitiveTopology::from(Topology::TriangleStrip),
            PrimitiveTopology::TriangleStrip
        );
    }

    #[test]
    fn test_builder_records_topology() {
        let builder = PipelineBuilder::new().with_topology(Topology::TriangleStrip);
        assert_eq!(
            builder.primitive_state.topology,
            PrimitiveTopology::TriangleStrip
        );
    }
}
