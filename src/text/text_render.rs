use anyhow::{Context, Result};
use log::{debug, warn};
use nalgebra::{Point2, Vector2};

use crate::{
    atlas::{FontAtlas, UvRect},
    backend::{
        BufferUsage, DrawCall, RenderBackend, ShaderHandle, TextureHandle, Topology,
        VertexBufferHandle,
    },
    config::TextRenderConfig,
    font::{FontFace, Rasterizer},
};

use super::{
    layout::{codes, layout, GlyphCursor, LaidOutGlyph, TextLayout},
    pipeline::{GlyphMode, TEXT_FRAGMENT_SHADER, TEXT_VERTEX_SHADER},
};

/// Draws strings of single-byte characters with one font face.
///
/// Owns the face, the text shader, a vertex buffer and (in atlas mode) the glyph
/// atlas and its texture. GPU objects go back to the backend through [TextRender::destroy].
pub struct TextRender<R: Rasterizer = FontFace> {
    face: R,
    config: TextRenderConfig,
    shader: ShaderHandle,
    vertex_buffer: VertexBufferHandle,
    atlas: Option<(FontAtlas, TextureHandle)>,
}

impl<R: Rasterizer> TextRender<R> {
    pub fn new<B: RenderBackend + ?Sized>(
        backend: &mut B,
        mut face: R,
        config: TextRenderConfig,
    ) -> Result<Self> {
        face.set_pixel_size(config.pixel_size);

        let shader = backend
            .compile_shader(TEXT_VERTEX_SHADER, TEXT_FRAGMENT_SHADER)
            .context("Couldn't compile the text shader")?;
        let vertex_buffer = backend.create_vertex_buffer(BufferUsage::Dynamic);

        let atlas = match config.mode {
            GlyphMode::Atlas => {
                let atlas = FontAtlas::build(&face, config.codes.clone(), config.atlas_max_width)
                    .context("Couldn't build the glyph atlas")?;
                if let Some(path) = &config.atlas_dump_path {
                    if let Err(err) = atlas.save_png(path) {
                        warn!("{:#}", err);
                    }
                }
                let texture =
                    backend.create_texture(atlas.width(), atlas.height(), &atlas.texture().data)?;
                Some((atlas, texture))
            }
            GlyphMode::Direct => None,
        };

        Ok(Self {
            face,
            config,
            shader,
            vertex_buffer,
            atlas,
        })
    }

    pub fn face(&self) -> &R {
        &self.face
    }

    pub fn config(&self) -> &TextRenderConfig {
        &self.config
    }

    pub fn atlas(&self) -> Option<&FontAtlas> {
        self.atlas.as_ref().map(|(atlas, _)| atlas)
    }

    pub fn shader(&self) -> ShaderHandle {
        self.shader
    }

    /// Renders `text` with its pen starting at `(x, y)`, glyph pixels scaled by `(sx, sy)`.
    ///
    /// The text is read as single-byte codes up to the first NUL.
    pub fn render_text<B: RenderBackend + ?Sized, T: AsRef<[u8]> + ?Sized>(
        &self,
        backend: &mut B,
        text: &T,
        x: f32,
        y: f32,
        sx: f32,
        sy: f32,
    ) -> Result<TextLayout> {
        let origin = Point2::new(x, y);
        let scale = Vector2::new(sx, sy);

        match &self.atlas {
            Some((atlas, texture)) => {
                let laid_out = layout(text.as_ref(), origin, scale, atlas);
                let vertices = laid_out.vertices();
                backend.write_vertices(self.vertex_buffer, &vertices)?;
                if !vertices.is_empty() {
                    // draw all the characters in one go
                    backend.draw(&DrawCall {
                        shader: self.shader,
                        texture: *texture,
                        buffer: self.vertex_buffer,
                        topology: Topology::Triangles,
                        vertices: 0..vertices.len() as u32,
                    })?;
                }
                debug!(
                    "drew {} glyphs ({} vertices) from the atlas",
                    laid_out.glyphs.len(),
                    vertices.len()
                );
                Ok(laid_out)
            }
            None => self.render_direct(backend, text.as_ref(), origin, scale),
        }
    }

    /// One texture upload and one draw per visible glyph.
    fn render_direct<B: RenderBackend + ?Sized>(
        &self,
        backend: &mut B,
        text: &[u8],
        origin: Point2<f32>,
        scale: Vector2<f32>,
    ) -> Result<TextLayout> {
        let mut cursor = GlyphCursor::new(origin, scale);
        let mut glyphs = Vec::new();

        for code in codes(text) {
            let Some(bitmap) = self.face.rasterize(code) else {
                continue;
            };
            let Some(quad) = cursor.place(&bitmap.metrics, UvRect::FULL) else {
                continue;
            };

            let texture = backend.create_texture(
                bitmap.metrics.width,
                bitmap.metrics.height,
                &bitmap.data,
            )?;
            let drawn = backend
                .write_vertices(self.vertex_buffer, &quad.strip())
                .and_then(|_| {
                    backend.draw(&DrawCall {
                        shader: self.shader,
                        texture,
                        buffer: self.vertex_buffer,
                        topology: Topology::TriangleStrip,
                        vertices: 0..4,
                    })
                });
            backend.destroy_texture(texture);
            drawn?;

            glyphs.push(LaidOutGlyph { code, quad });
        }

        debug!("drew {} glyphs one texture at a time", glyphs.len());
        Ok(TextLayout {
            glyphs,
            cursor: cursor.position(),
        })
    }

    /// Clears the target and renders the configured sentence in the configured colour.
    pub fn draw<B: RenderBackend + ?Sized>(&mut self, backend: &mut B) -> Result<()> {
        backend.clear(self.config.clear_color)?;

        self.face.set_pixel_size(self.config.pixel_size);
        backend.set_color(self.shader, self.config.color)?;

        let scale = self.config.scale;
        self.render_text(
            backend,
            self.config.sentence.as_str(),
            0.0,
            0.0,
            scale.x,
            scale.y,
        )?;
        Ok(())
    }

    pub fn destroy<B: RenderBackend + ?Sized>(self, backend: &mut B) {
        if let Some((_, texture)) = self.atlas {
            backend.destroy_texture(texture);
        }
        backend.destroy_vertex_buffer(self.vertex_buffer);
        backend.destroy_shader(self.shader);
    }
}
