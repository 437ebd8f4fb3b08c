use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use anyhow::{anyhow, Context, Result};
use fontdue::{Font, FontSettings, Metrics};
use log::{debug, info};

/// The pixel size faces are rasterized at unless told otherwise.
pub const DEFAULT_PIXEL_SIZE: f32 = 48.0;

/// Per-glyph metrics in pixels at the face's current pixel size.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GlyphMetrics {
    pub advance_x: f32,
    pub advance_y: f32,
    pub width: u32,
    pub height: u32,
    pub bearing_left: f32,
    pub bearing_top: f32,
}

impl GlyphMetrics {
    /// Builds metrics from an engine that reports advances in 26.6 fixed point.
    pub fn from_26_6(
        advance_x: i64,
        advance_y: i64,
        width: u32,
        height: u32,
        bearing_left: i32,
        bearing_top: i32,
    ) -> Self {
        Self {
            advance_x: advance_x as f32 / 64.0,
            advance_y: advance_y as f32 / 64.0,
            width,
            height,
            bearing_left: bearing_left as f32,
            bearing_top: bearing_top as f32,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl From<Metrics> for GlyphMetrics {
    fn from(metrics: Metrics) -> Self {
        // fontdue measures ymin from the baseline to the bottom row of the bitmap
        Self {
            advance_x: metrics.advance_width,
            advance_y: metrics.advance_height,
            width: metrics.width as u32,
            height: metrics.height as u32,
            bearing_left: metrics.xmin as f32,
            bearing_top: (metrics.ymin + metrics.height as i32) as f32,
        }
    }
}

/// A rasterized glyph: coverage bytes, one per pixel, top row first.
#[derive(Clone, Debug, PartialEq)]
pub struct GlyphBitmap {
    pub metrics: GlyphMetrics,
    pub data: Vec<u8>,
}

/// Anything that can turn a single-byte character code into a bitmap.
pub trait Rasterizer {
    fn pixel_size(&self) -> f32;

    fn set_pixel_size(&mut self, px: f32);

    /// Returns `None` when there is no glyph for `code`.
    fn rasterize(&self, code: u8) -> Option<GlyphBitmap>;
}

/// Owns the settings every face is opened with.
///
/// There is no global engine: create one, then open faces through it.
#[derive(Clone, Copy, Debug, Default)]
pub struct FontEngine {
    settings: FontSettings,
}

impl FontEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: FontSettings) -> Self {
        Self { settings }
    }

    pub fn load_face<P: AsRef<Path>>(&self, path: P) -> Result<FontFace> {
        let path = path.as_ref();
        let file = File::open(path)
            .with_context(|| format!("Couldn't open font file {}", path.display()))?;
        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();
        let _ = reader
            .read_to_end(&mut buf)
            .with_context(|| format!("Couldn't read font file {}", path.display()))?;
        let face = self
            .face_from_bytes(buf)
            .with_context(|| format!("Couldn't parse font file {}", path.display()))?;
        info!(
            "loaded font face {} ({} chars)",
            path.display(),
            face.font.chars().len()
        );
        Ok(face)
    }

    pub fn face_from_bytes(&self, bytes: Vec<u8>) -> Result<FontFace> {
        let font = Font::from_bytes(bytes, self.settings).map_err(|err| anyhow!(err))?;
        Ok(FontFace {
            font,
            pixel_size: DEFAULT_PIXEL_SIZE,
        })
    }
}

pub struct FontFace {
    font: Font,
    pixel_size: f32,
}

impl FontFace {
    pub fn font(&self) -> &Font {
        &self.font
    }
}

impl Rasterizer for FontFace {
    fn pixel_size(&self) -> f32 {
        self.pixel_size
    }

    fn set_pixel_size(&mut self, px: f32) {
        if px != self.pixel_size {
            debug!("font pixel size {} -> {}", self.pixel_size, px);
        }
        self.pixel_size = px;
    }

    fn rasterize(&self, code: u8) -> Option<GlyphBitmap> {
        let character = char::from(code);
        // index 0 is the missing glyph
        if self.font.lookup_glyph_index(character) == 0 {
            return None;
        }
        let (metrics, data) = self.font.rasterize(character, self.pixel_size);
        Some(GlyphBitmap {
            metrics: metrics.into(),
            data,
        })
    }
}
