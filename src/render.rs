use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use generational_arena::Arena;
use log::{debug, error, info};
use wgpu::{
    AddressMode, Adapter, BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout,
    BindingResource, Buffer, BufferDescriptor, BufferUsages, Color, CommandEncoderDescriptor,
    Device, DeviceDescriptor, ErrorFilter, Extent3d, FilterMode, ImageCopyTexture,
    ImageDataLayout, Instance, LoadOp, Operations, Origin3d, Queue, RenderPassColorAttachment,
    RenderPassDescriptor, RenderPipeline, RequestAdapterOptions, Sampler, SamplerDescriptor,
    StoreOp, Surface, SurfaceConfiguration, SurfaceError, SurfaceTexture, TextureAspect,
    TextureDescriptor, TextureDimension, TextureFormat, TextureUsages, TextureView,
    TextureViewDescriptor,
};
use winit::{dpi::PhysicalSize, window::Window};

use crate::{
    backend::{
        BufferUsage, DrawCall, RenderBackend, ShaderHandle, TextureHandle, Topology,
        VertexBufferHandle,
    },
    bind::{build_layout, color_entries, glyph_entries},
    pipeline::PipelineBuilder,
    text::pipeline::TextVertex,
};

/// Smallest vertex buffer we bother allocating, in vertices.
const MIN_VERTEX_CAPACITY: u64 = 64;

struct ShaderProgram {
    triangles: RenderPipeline,
    strip: RenderPipeline,
    color_buffer: Buffer,
    color_bind: BindGroup,
}

impl ShaderProgram {
    fn pipeline(&self, topology: Topology) -> &RenderPipeline {
        match topology {
            Topology::Triangles => &self.triangles,
            Topology::TriangleStrip => &self.strip,
        }
    }
}

struct GpuTexture {
    // kept alive for as long as the bind group refers to it
    _texture: wgpu::Texture,
    bind: BindGroup,
}

struct GpuVertexBuffer {
    buffer: Option<Buffer>,
    usage: BufferUsage,
    len: u32,
}

/// [RenderBackend] over wgpu, drawing into a window surface.
///
/// Every draw is its own render pass and submission, so buffer and uniform
/// writes land in the same order the calls were made.
pub struct WgpuBackend {
    adapter: Adapter,
    device: Device,
    queue: Queue,
    surface: Surface<'static>,
    config: SurfaceConfiguration,
    color_layout: BindGroupLayout,
    glyph_layout: BindGroupLayout,
    sampler: Sampler,
    shaders: Arena<ShaderProgram>,
    textures: Arena<GpuTexture>,
    buffers: Arena<GpuVertexBuffer>,
    frame: Option<(SurfaceTexture, TextureView)>,
}

impl WgpuBackend {
    pub fn new(window: Arc<Window>) -> Result<Self> {
        let instance = Instance::default();
        let size = window.inner_size();
        let surface = instance.create_surface(window)?;

        let (adapter, device, queue) = pollster::block_on(async {
            let adapter = instance
                .request_adapter(&RequestAdapterOptions {
                    compatible_surface: Some(&surface),
                    ..Default::default()
                })
                .await
                .ok_or(anyhow!("No suitable adapter found."))?;

            let (device, queue) = adapter
                .request_device(&DeviceDescriptor::default(), None)
                .await?;

            Ok::<(Adapter, Device, Queue), anyhow::Error>((adapter, device, queue))
        })?;
        info!("using adapter {:?}", adapter.get_info().name);

        let config = surface
            .get_default_config(&adapter, size.width.max(1), size.height.max(1))
            .ok_or(anyhow!("Surface isn't supported by the adapter."))?;
        surface.configure(&device, &config);

        let color_layout = build_layout(&device, "text color", &color_entries());
        let glyph_layout = build_layout(&device, "glyph texture", &glyph_entries());
        let sampler = device.create_sampler(&SamplerDescriptor {
            label: Some("glyph sampler"),
            address_mode_u: AddressMode::ClampToEdge,
            address_mode_v: AddressMode::ClampToEdge,
            mag_filter: FilterMode::Linear,
            min_filter: FilterMode::Linear,
            ..Default::default()
        });

        Ok(Self {
            adapter,
            device,
            queue,
            surface,
            config,
            color_layout,
            glyph_layout,
            sampler,
            shaders: Arena::new(),
            textures: Arena::new(),
            buffers: Arena::new(),
            frame: None,
        })
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn format(&self) -> TextureFormat {
        self.config.format
    }

    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.config.width = size.width;
        self.config.height = size.height;
        self.surface.configure(&self.device, &self.config);
        debug!(
            "surface resized to {}x{} on {:?}",
            size.width,
            size.height,
            self.adapter.get_info().backend
        );
    }

    /// Acquires the surface texture the following draws render into.
    pub fn begin_frame(&mut self) -> Result<()> {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(SurfaceError::Lost | SurfaceError::Outdated) => {
                self.surface.configure(&self.device, &self.config);
                self.surface.get_current_texture()?
            }
            Err(err) => return Err(err.into()),
        };
        let view = frame.texture.create_view(&TextureViewDescriptor::default());
        self.frame = Some((frame, view));
        Ok(())
    }

    pub fn end_frame(&mut self) {
        if let Some((frame, _)) = self.frame.take() {
            frame.present();
        }
    }

    fn frame_view(&self) -> Result<&TextureView> {
        self.frame
            .as_ref()
            .map(|(_, view)| view)
            .ok_or(anyhow!("No frame in progress, call begin_frame first."))
    }

    fn submit_pass(&self, load: LoadOp<Color>, call: Option<&DrawCall>) -> Result<()> {
        let view = self.frame_view()?;

        let (program, texture, buffer) = match call {
            Some(call) => {
                let program = self
                    .shaders
                    .get(call.shader.0)
                    .ok_or(anyhow!("No shader for handle {:?}", call.shader))?;
                let texture = self
                    .textures
                    .get(call.texture.0)
                    .ok_or(anyhow!("No texture for handle {:?}", call.texture))?;
                let buffer = self
                    .buffers
                    .get(call.buffer.0)
                    .ok_or(anyhow!("No vertex buffer for handle {:?}", call.buffer))?;
                if call.vertices.end > buffer.len {
                    bail!(
                        "Draw of vertices {:?} overruns buffer holding {}",
                        call.vertices,
                        buffer.len
                    );
                }
                (Some(program), Some(texture), buffer.buffer.as_ref())
            }
            None => (None, None, None),
        };

        let mut encoder = self
            .device
            .create_command_encoder(&CommandEncoderDescriptor::default());

        {
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: None,
                color_attachments: &[Some(RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: Operations {
                        load,
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let (Some(call), Some(program), Some(texture), Some(buffer)) =
                (call, program, texture, buffer)
            {
                rpass.set_pipeline(program.pipeline(call.topology));
                rpass.set_bind_group(0, &program.color_bind, &[]);
                rpass.set_bind_group(1, &texture.bind, &[]);
                rpass.set_vertex_buffer(0, buffer.slice(..));
                rpass.draw(call.vertices.clone(), 0..1);
            }
        }

        self.queue.submit([encoder.finish()]);
        Ok(())
    }
}

impl RenderBackend for WgpuBackend {
    fn compile_shader(&mut self, vertex_src: &str, fragment_src: &str) -> Result<ShaderHandle> {
        self.device.push_error_scope(ErrorFilter::Validation);

        // wgpu fixes topology per pipeline, GL picks it per draw
        let build = |topology: Topology| {
            PipelineBuilder::new()
                .with_shaders(vertex_src, fragment_src)
                .with_format(self.config.format)
                .with_bind(&self.color_layout)
                .with_bind(&self.glyph_layout)
                .with_vb(TextVertex::layout())
                .with_topology(topology)
                .build(&self.device)
        };
        let triangles = build(Topology::Triangles);
        let strip = build(Topology::TriangleStrip);

        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            error!("text shader failed to compile: {}", err);
            bail!("Shader compilation failed: {}", err);
        }

        let color_buffer = self.device.create_buffer(&BufferDescriptor {
            label: Some("text color"),
            size: std::mem::size_of::<[f32; 4]>() as u64,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let color_bind = self.device.create_bind_group(&BindGroupDescriptor {
            label: Some("text color"),
            layout: &self.color_layout,
            entries: &[BindGroupEntry {
                binding: 0,
                resource: color_buffer.as_entire_binding(),
            }],
        });

        Ok(ShaderHandle(self.shaders.insert(ShaderProgram {
            triangles,
            strip,
            color_buffer,
            color_bind,
        })))
    }

    fn destroy_shader(&mut self, shader: ShaderHandle) {
        self.shaders.remove(shader.0);
    }

    fn create_texture(&mut self, width: u32, height: u32, pixels: &[u8]) -> Result<TextureHandle> {
        if width == 0 || height == 0 {
            bail!("Can't create an empty {}x{} texture", width, height);
        }
        if pixels.len() != (width * height) as usize {
            bail!(
                "{}x{} texture needs {} bytes, got {}",
                width,
                height,
                width * height,
                pixels.len()
            );
        }

        let size = Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&TextureDescriptor {
            label: Some("glyph texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: TextureFormat::R8Unorm,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: Origin3d::ZERO,
                aspect: TextureAspect::All,
            },
            pixels,
            ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(width),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&TextureViewDescriptor::default());
        let bind = self.device.create_bind_group(&BindGroupDescriptor {
            label: Some("glyph texture"),
            layout: &self.glyph_layout,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: BindingResource::TextureView(&view),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        Ok(TextureHandle(self.textures.insert(GpuTexture {
            _texture: texture,
            bind,
        })))
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        // wgpu holds on to the texture until submitted work using it has finished
        self.textures.remove(texture.0);
    }

    fn create_vertex_buffer(&mut self, usage: BufferUsage) -> VertexBufferHandle {
        VertexBufferHandle(self.buffers.insert(GpuVertexBuffer {
            buffer: None,
            usage,
            len: 0,
        }))
    }

    fn write_vertices(
        &mut self,
        buffer: VertexBufferHandle,
        vertices: &[TextVertex],
    ) -> Result<()> {
        let entry = self
            .buffers
            .get_mut(buffer.0)
            .ok_or(anyhow!("No vertex buffer for handle {:?}", buffer))?;
        let bytes: &[u8] = bytemuck::cast_slice(vertices);
        entry.len = vertices.len() as u32;
        if bytes.is_empty() {
            return Ok(());
        }

        let too_small = entry
            .buffer
            .as_ref()
            .map_or(true, |gpu| gpu.size() < bytes.len() as u64);
        if too_small {
            let capacity = (vertices.len() as u64)
                .max(MIN_VERTEX_CAPACITY)
                .next_power_of_two();
            let label = match entry.usage {
                BufferUsage::Static => "static text vertices",
                BufferUsage::Dynamic => "dynamic text vertices",
            };
            debug!("allocating {} with room for {} vertices", label, capacity);
            entry.buffer = Some(self.device.create_buffer(&BufferDescriptor {
                label: Some(label),
                size: capacity * std::mem::size_of::<TextVertex>() as u64,
                usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
                mapped_at_creation: false,
            }));
        }

        if let Some(gpu) = entry.buffer.as_ref() {
            self.queue.write_buffer(gpu, 0, bytes);
        }
        Ok(())
    }

    fn destroy_vertex_buffer(&mut self, buffer: VertexBufferHandle) {
        self.buffers.remove(buffer.0);
    }

    fn set_color(&mut self, shader: ShaderHandle, color: [f32; 4]) -> Result<()> {
        let program = self
            .shaders
            .get(shader.0)
            .ok_or(anyhow!("No shader for handle {:?}", shader))?;
        self.queue
            .write_buffer(&program.color_buffer, 0, bytemuck::cast_slice(&color));
        Ok(())
    }

    fn clear(&mut self, color: [f32; 4]) -> Result<()> {
        let [r, g, b, a] = color.map(f64::from);
        self.submit_pass(LoadOp::Clear(Color { r, g, b, a }), None)
    }

    fn draw(&mut self, call: &DrawCall) -> Result<()> {
        if call.vertices.is_empty() {
            return Ok(());
        }
        self.submit_pass(LoadOp::Load, Some(call))
    }
}
