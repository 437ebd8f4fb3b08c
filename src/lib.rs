pub mod atlas;
pub mod backend;
pub mod bind;
pub mod config;
pub mod font;
pub mod pipeline;
pub mod render;
pub mod text;
pub mod texture;
pub mod window;

// the core (font, atlas, text) only talks to the gpu through `backend::RenderBackend`.
// `render::WgpuBackend` is the one real implementation; tests drive the core with a recorder.
//
// atlas vs direct:
// the direct mode uploads a texture per glyph per frame. it's only kept around to
// check the atlas against - anything that cares about speed should stay on the atlas.
