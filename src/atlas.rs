use std::{collections::HashMap, ops::Range, path::Path};

use anyhow::{bail, Context, Result};
use itertools::Itertools;
use log::{debug, info};

use crate::{
    font::{GlyphMetrics, Rasterizer},
    text::layout::GlyphSource,
    texture::Texture,
};

/// Empty texels kept between neighbouring glyphs so linear sampling doesn't bleed.
pub const GLYPH_PADDING: u32 = 1;

/// Pixel rectangle inside the atlas texture.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Default)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// Normalized texture coordinates, `min` at the top-left texel.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct UvRect {
    pub min: [f32; 2],
    pub max: [f32; 2],
}

impl UvRect {
    pub const FULL: UvRect = UvRect {
        min: [0.0, 0.0],
        max: [1.0, 1.0],
    };
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct GlyphEntry {
    pub metrics: GlyphMetrics,
    pub rect: Rect,
    pub uv: UvRect,
}

/// Every glyph of a code range rasterized once and packed into one texture.
///
/// Glyphs are laid out left to right in rows; a row ends when the next glyph
/// would cross `max_width`, and the next row starts below the tallest glyph.
#[derive(Debug)]
pub struct FontAtlas {
    texture: Texture,
    entries: HashMap<u8, GlyphEntry>,
    pixel_size: f32,
}

impl FontAtlas {
    pub fn build<R: Rasterizer + ?Sized>(
        rasterizer: &R,
        codes: Range<u8>,
        max_width: u32,
    ) -> Result<Self> {
        let glyphs = codes
            .clone()
            .filter_map(|code| rasterizer.rasterize(code).map(|bitmap| (code, bitmap)))
            .collect_vec();
        if glyphs.is_empty() {
            bail!(
                "Font has no glyphs for codes {}..{}",
                codes.start,
                codes.end
            );
        }

        let mut x = 0;
        let mut y = 0;
        let mut row_height = 0;
        let mut width = 0;
        let mut rects = Vec::with_capacity(glyphs.len());
        for (code, bitmap) in &glyphs {
            let (w, h) = (bitmap.metrics.width, bitmap.metrics.height);
            if bitmap.metrics.is_empty() {
                rects.push(Rect::default());
                continue;
            }
            if w > max_width {
                bail!(
                    "Glyph {} is {}px wide, wider than the atlas limit of {}px",
                    code,
                    w,
                    max_width
                );
            }
            // bounds check
            if x + w > max_width {
                y += row_height + GLYPH_PADDING;
                x = 0;
                row_height = 0;
            }
            rects.push(Rect { x, y, w, h });
            width = width.max(x + w);
            row_height = row_height.max(h);
            x += w + GLYPH_PADDING;
        }
        // a face with only blank glyphs still needs a texture to bind
        let width = width.max(1);
        let height = (y + row_height).max(1);

        let mut texture = Texture::new(width, height);
        let mut entries = HashMap::with_capacity(glyphs.len());
        for ((code, bitmap), rect) in glyphs.into_iter().zip(rects) {
            texture
                .blit(rect.x, rect.y, rect.w, rect.h, &bitmap.data)
                .with_context(|| format!("Couldn't pack glyph {}", code))?;
            let uv = if rect.w == 0 || rect.h == 0 {
                UvRect::default()
            } else {
                let min = [rect.x as f32 / width as f32, rect.y as f32 / height as f32];
                UvRect {
                    min,
                    max: [
                        min[0] + rect.w as f32 / width as f32,
                        min[1] + rect.h as f32 / height as f32,
                    ],
                }
            };
            entries.insert(
                code,
                GlyphEntry {
                    metrics: bitmap.metrics,
                    rect,
                    uv,
                },
            );
        }

        info!(
            "built {}x{} glyph atlas with {} glyphs at {}px",
            width,
            height,
            entries.len(),
            rasterizer.pixel_size()
        );

        Ok(Self {
            texture,
            entries,
            pixel_size: rasterizer.pixel_size(),
        })
    }

    /// Codes the face has no glyph for come back zero-sized.
    pub fn lookup(&self, code: u8) -> GlyphEntry {
        self.entries.get(&code).copied().unwrap_or_default()
    }

    pub fn width(&self) -> u32 {
        self.texture.width()
    }

    pub fn height(&self) -> u32 {
        self.texture.height()
    }

    pub fn texture(&self) -> &Texture {
        &self.texture
    }

    pub fn pixel_size(&self) -> f32 {
        self.pixel_size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        image::save_buffer(
            path,
            &self.texture.data,
            self.texture.width,
            self.texture.height,
            image::ColorType::L8,
        )
        .with_context(|| format!("Couldn't write atlas to {}", path.display()))?;
        debug!("wrote glyph atlas to {}", path.display());
        Ok(())
    }
}

impl GlyphSource for FontAtlas {
    fn glyph(&self, code: u8) -> Option<GlyphEntry> {
        self.entries.get(&code).copied()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::font::GlyphBitmap;

    /// Square-ish glyphs whose pixels all hold the glyph's code.
    struct BlockFace {
        sizes: HashMap<u8, (u32, u32)>,
    }

    impl BlockFace {
        fn new(sizes: &[(u8, u32, u32)]) -> Self {
            Self {
                sizes: sizes.iter().map(|&(c, w, h)| (c, (w, h))).collect(),
            }
        }
    }

    impl Rasterizer for BlockFace {
        fn pixel_size(&self) -> f32 {
            48.0
        }

        fn set_pixel_size(&mut self, _px: f32) {}

        fn rasterize(&self, code: u8) -> Option<GlyphBitmap> {
            let &(width, height) = self.sizes.get(&code)?;
            Some(GlyphBitmap {
                metrics: GlyphMetrics {
                    advance_x: width as f32 + 2.0,
                    advance_y: 0.0,
                    width,
                    height,
                    bearing_left: 1.0,
                    bearing_top: height as f32,
                },
                data: vec![code; (width * height) as usize],
            })
        }
    }

    #[test]
    fn test_lookup_matches_rasterized_dimensions() {
        let face = BlockFace::new(&[(b'A', 10, 12), (b'B', 8, 14), (b'i', 3, 11)]);
        let atlas = FontAtlas::build(&face, 32..128, 1024).unwrap();

        for (code, w, h) in [(b'A', 10, 12), (b'B', 8, 14), (b'i', 3, 11)] {
            let entry = atlas.lookup(code);
            assert_eq!((entry.rect.w, entry.rect.h), (w, h));
            assert_eq!((entry.metrics.width, entry.metrics.height), (w, h));
        }
        assert_eq!(atlas.len(), 3);
        assert_eq!(atlas.height(), 14);
        assert_eq!(atlas.width(), 10 + 8 + 3 + 2 * GLYPH_PADDING);
    }

    #[test]
    fn test_uv_span_matches_rect_over_atlas_size() {
        let face = BlockFace::new(&[(b'A', 10, 12), (b'B', 8, 14)]);
        let atlas = FontAtlas::build(&face, 32..128, 1024).unwrap();
        let (aw, ah) = (atlas.width() as f32, atlas.height() as f32);

        let b = atlas.lookup(b'B');
        assert_eq!(b.uv.min, [b.rect.x as f32 / aw, b.rect.y as f32 / ah]);
        assert!((b.uv.max[0] - b.uv.min[0] - 8.0 / aw).abs() < 1e-6);
        assert!((b.uv.max[1] - b.uv.min[1] - 14.0 / ah).abs() < 1e-6);
    }

    #[test]
    fn test_bitmaps_are_copied_into_their_rects() {
        let face = BlockFace::new(&[(b'A', 4, 4), (b'B', 5, 3)]);
        let atlas = FontAtlas::build(&face, 32..128, 1024).unwrap();

        for code in [b'A', b'B'] {
            let rect = atlas.lookup(code).rect;
            for y in rect.y..rect.y + rect.h {
                for x in rect.x..rect.x + rect.w {
                    assert_eq!(atlas.texture().texel(x, y), Some(code));
                }
            }
        }
        // the padding column between the two glyphs stays empty
        let a = atlas.lookup(b'A').rect;
        assert_eq!(atlas.texture().texel(a.x + a.w, a.y), Some(0));
    }

    #[test]
    fn test_rows_wrap_at_max_width() {
        let face = BlockFace::new(&[(b'a', 10, 10), (b'b', 10, 6), (b'c', 10, 8)]);
        let atlas = FontAtlas::build(&face, b'a'..b'd', 25).unwrap();

        let (a, b, c) = (
            atlas.lookup(b'a').rect,
            atlas.lookup(b'b').rect,
            atlas.lookup(b'c').rect,
        );
        assert_eq!((a.x, a.y), (0, 0));
        assert_eq!((b.x, b.y), (11, 0));
        assert_eq!((c.x, c.y), (0, 10 + GLYPH_PADDING));
        assert_eq!(atlas.height(), 10 + GLYPH_PADDING + 8);
        assert!(atlas.width() <= 25);
    }

    #[test]
    fn test_missing_and_blank_glyphs_are_zero_sized() {
        let face = BlockFace::new(&[(b' ', 0, 0), (b'A', 10, 12)]);
        let atlas = FontAtlas::build(&face, 32..128, 1024).unwrap();

        let space = atlas.lookup(b' ');
        assert_eq!(space.rect, Rect::default());
        assert!(atlas.glyph(b' ').is_some());

        let missing = atlas.lookup(b'Z');
        assert_eq!(missing, GlyphEntry::default());
        assert!(atlas.glyph(b'Z').is_none());
    }

    #[test]
    fn test_glyph_wider_than_limit_fails() {
        let face = BlockFace::new(&[(b'W', 40, 10)]);
        assert!(FontAtlas::build(&face, 32..128, 32).is_err());
    }

    #[test]
    fn test_face_without_glyphs_in_range_fails() {
        let face = BlockFace::new(&[(200, 4, 4)]);
        assert!(FontAtlas::build(&face, 32..128, 1024).is_err());
    }
}
