use bytemuck::{Pod, Zeroable};
use wgpu::{vertex_attr_array, VertexAttribute, VertexBufferLayout, VertexStepMode};

use crate::backend::Topology;

pub const TEXT_VERTEX_SHADER: &str = include_str!("../shaders/text_vertex.wgsl");
pub const TEXT_FRAGMENT_SHADER: &str = include_str!("../shaders/text_fragment.wgsl");

const TEXT_VERTEX_ATTRIBUTES: [VertexAttribute; 1] = vertex_attr_array![
    // position.xy, texcoord.zw
    0 => Float32x4,
];

/// One corner of a glyph quad. The shader sees it as a single `vec4(x, y, u, v)`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct TextVertex {
    pub pos: [f32; 2],
    pub uv: [f32; 2],
}

impl TextVertex {
    pub const fn new(pos: [f32; 2], uv: [f32; 2]) -> Self {
        Self { pos, uv }
    }

    pub fn layout() -> VertexBufferLayout<'static> {
        VertexBufferLayout {
            array_stride: std::mem::size_of::<TextVertex>() as u64,
            step_mode: VertexStepMode::Vertex,
            attributes: &TEXT_VERTEX_ATTRIBUTES,
        }
    }
}

/// How glyphs get their texels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GlyphMode {
    /// All glyphs prepacked into one texture; the whole string is one draw.
    #[default]
    Atlas,
    /// A fresh texture per glyph per frame. Slow, kept as a reference path.
    Direct,
}

impl GlyphMode {
    pub fn topology(self) -> Topology {
        match self {
            GlyphMode::Atlas => Topology::Triangles,
            GlyphMode::Direct => Topology::TriangleStrip,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_is_four_packed_floats() {
        assert_eq!(std::mem::size_of::<TextVertex>(), 16);
        let vertex = TextVertex::new([1.0, 2.0], [0.5, 0.25]);
        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&vertex));
        assert_eq!(floats, &[1.0, 2.0, 0.5, 0.25]);
    }

    #[test]
    fn test_shaders_agree_on_entry_points() {
        assert!(TEXT_VERTEX_SHADER.contains("fn vertex("));
        assert!(TEXT_FRAGMENT_SHADER.contains("fn fragment("));
        assert!(TEXT_FRAGMENT_SHADER.contains("var<uniform> color"));
    }
}
