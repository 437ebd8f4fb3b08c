use std::{ops::Range, path::PathBuf};

use nalgebra::Vector2;

use crate::{font::DEFAULT_PIXEL_SIZE, text::pipeline::GlyphMode};

pub const DEFAULT_SENTENCE: &str = "the quick brown fox jumped over the lazy text layout engine";

/// Settings for a [crate::text::text_render::TextRender].
#[derive(Clone, Debug, PartialEq)]
pub struct TextRenderConfig {
    pub pixel_size: f32,
    pub color: [f32; 4],
    pub clear_color: [f32; 4],
    /// Glyph pixels to clip space.
    pub scale: Vector2<f32>,
    pub sentence: String,
    /// Codes rasterized into the atlas.
    pub codes: Range<u8>,
    pub atlas_max_width: u32,
    pub mode: GlyphMode,
    pub atlas_dump_path: Option<PathBuf>,
}

impl Default for TextRenderConfig {
    fn default() -> Self {
        Self {
            pixel_size: DEFAULT_PIXEL_SIZE,
            color: [1.0, 0.0, 0.0, 1.0],
            clear_color: [0.05, 0.05, 0.05, 1.0],
            scale: Vector2::new(0.001, 0.001),
            sentence: DEFAULT_SENTENCE.into(),
            codes: 32..128,
            atlas_max_width: 1024,
            mode: GlyphMode::Atlas,
            atlas_dump_path: None,
        }
    }
}

impl TextRenderConfig {
    pub fn with_pixel_size(mut self, pixel_size: f32) -> Self {
        self.pixel_size = pixel_size;
        self
    }

    pub fn with_color(mut self, color: [f32; 4]) -> Self {
        self.color = color;
        self
    }

    pub fn with_clear_color(mut self, clear_color: [f32; 4]) -> Self {
        self.clear_color = clear_color;
        self
    }

    pub fn with_scale(mut self, sx: f32, sy: f32) -> Self {
        self.scale = Vector2::new(sx, sy);
        self
    }

    pub fn with_sentence(mut self, sentence: &str) -> Self {
        self.sentence = sentence.into();
        self
    }

    pub fn with_codes(mut self, codes: Range<u8>) -> Self {
        self.codes = codes;
        self
    }

    pub fn with_atlas_max_width(mut self, atlas_max_width: u32) -> Self {
        self.atlas_max_width = atlas_max_width;
        self
    }

    pub fn with_mode(mut self, mode: GlyphMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_atlas_dump<P: Into<PathBuf>>(mut self, path: Option<P>) -> Self {
        self.atlas_dump_path = path.map(Into::into);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TextRenderConfig::default();
        assert_eq!(config.pixel_size, 48.0);
        assert_eq!(config.color, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(config.codes, 32..128);
        assert_eq!(config.mode, GlyphMode::Atlas);
        assert_eq!(config.sentence, DEFAULT_SENTENCE);
    }

    #[test]
    fn test_builder_overrides() {
        let config = TextRenderConfig::default()
            .with_scale(2.0, 3.0)
            .with_mode(GlyphMode::Direct)
            .with_sentence("hi")
            .with_atlas_dump(Some("atlas.png"));

        assert_eq!(config.scale, Vector2::new(2.0, 3.0));
        assert_eq!(config.mode, GlyphMode::Direct);
        assert_eq!(config.sentence, "hi");
        assert_eq!(config.atlas_dump_path, Some(PathBuf::from("atlas.png")));
    }
}
