// text drawing, kept simple:
// - a rasterizer turns each byte into a coverage bitmap
// - the bitmaps either get stitched into an atlas up front or uploaded one by one
// - each visible glyph becomes a textured quad placed by its metrics

pub mod layout;
pub mod pipeline;
pub mod text_render;
