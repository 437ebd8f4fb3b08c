use std::ops::Range;

use anyhow::Result;
use generational_arena::Index;

use crate::text::pipeline::TextVertex;

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct ShaderHandle(pub Index);

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct TextureHandle(pub Index);

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub struct VertexBufferHandle(pub Index);

#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum Topology {
    Triangles,
    TriangleStrip,
}

/// Hint for how often a vertex buffer is rewritten.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum BufferUsage {
    Static,
    Dynamic,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub shader: ShaderHandle,
    pub texture: TextureHandle,
    pub buffer: VertexBufferHandle,
    pub topology: Topology,
    pub vertices: Range<u32>,
}

/// Everything text rendering needs from a GPU.
///
/// Textures are single channel. Draws happen in call order; a buffer or uniform
/// written before a draw is what that draw sees.
pub trait RenderBackend {
    fn compile_shader(&mut self, vertex_src: &str, fragment_src: &str) -> Result<ShaderHandle>;

    fn destroy_shader(&mut self, shader: ShaderHandle);

    fn create_texture(&mut self, width: u32, height: u32, pixels: &[u8]) -> Result<TextureHandle>;

    fn destroy_texture(&mut self, texture: TextureHandle);

    fn create_vertex_buffer(&mut self, usage: BufferUsage) -> VertexBufferHandle;

    /// Replaces the buffer's contents, growing it if needed.
    fn write_vertices(&mut self, buffer: VertexBufferHandle, vertices: &[TextVertex])
        -> Result<()>;

    fn destroy_vertex_buffer(&mut self, buffer: VertexBufferHandle);

    fn set_color(&mut self, shader: ShaderHandle, color: [f32; 4]) -> Result<()>;

    fn clear(&mut self, color: [f32; 4]) -> Result<()>;

    fn draw(&mut self, call: &DrawCall) -> Result<()>;
}
