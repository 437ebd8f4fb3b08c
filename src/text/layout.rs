use nalgebra::{Point2, Vector2};

use crate::{
    atlas::{GlyphEntry, UvRect},
    font::GlyphMetrics,
};

use super::pipeline::TextVertex;

/// Where glyph metrics and texture regions come from.
pub trait GlyphSource {
    /// `None` means there is nothing to draw and nothing to advance by.
    fn glyph(&self, code: u8) -> Option<GlyphEntry>;
}

/// A textured rectangle. `min` is the corner the glyph's top-left texel maps to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quad {
    pub min: Point2<f32>,
    pub max: Point2<f32>,
    pub uv: UvRect,
}

impl Quad {
    /// Two triangles: TL TR BL, TR BL BR.
    pub fn triangles(&self) -> [TextVertex; 6] {
        let [tl, tr, bl, br] = self.strip();
        [tl, tr, bl, tr, bl, br]
    }

    /// Triangle strip order: TL TR BL BR.
    pub fn strip(&self) -> [TextVertex; 4] {
        let (x0, y0, x1, y1) = (self.min.x, self.min.y, self.max.x, self.max.y);
        let ([u0, v0], [u1, v1]) = (self.uv.min, self.uv.max);
        [
            TextVertex::new([x0, y0], [u0, v0]),
            TextVertex::new([x1, y0], [u1, v0]),
            TextVertex::new([x0, y1], [u0, v1]),
            TextVertex::new([x1, y1], [u1, v1]),
        ]
    }
}

/// The pen that walks along a line of text.
///
/// The vertical axis is flipped once: a glyph's top edge sits `bearing_top` below
/// the cursor and the quad extends a further `height` downward.
#[derive(Clone, Copy, Debug)]
pub struct GlyphCursor {
    position: Point2<f32>,
    scale: Vector2<f32>,
}

impl GlyphCursor {
    pub fn new(origin: Point2<f32>, scale: Vector2<f32>) -> Self {
        Self {
            position: origin,
            scale,
        }
    }

    pub fn position(&self) -> Point2<f32> {
        self.position
    }

    /// Places one glyph and advances past it. Blank glyphs only advance.
    pub fn place(&mut self, metrics: &GlyphMetrics, uv: UvRect) -> Option<Quad> {
        let x0 = self.position.x + metrics.bearing_left * self.scale.x;
        let top = self.position.y - metrics.bearing_top * self.scale.y;
        let w = metrics.width as f32 * self.scale.x;
        let h = metrics.height as f32 * self.scale.y;

        self.position += Vector2::new(
            metrics.advance_x * self.scale.x,
            metrics.advance_y * self.scale.y,
        );

        if w == 0.0 || h == 0.0 {
            return None;
        }

        Some(Quad {
            min: Point2::new(x0, top),
            max: Point2::new(x0 + w, top - h),
            uv,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LaidOutGlyph {
    pub code: u8,
    pub quad: Quad,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextLayout {
    /// Visible glyphs in input order.
    pub glyphs: Vec<LaidOutGlyph>,
    /// Where the next glyph would go.
    pub cursor: Point2<f32>,
}

impl TextLayout {
    pub fn vertices(&self) -> Vec<TextVertex> {
        self.glyphs
            .iter()
            .flat_map(|glyph| glyph.quad.triangles())
            .collect()
    }

    pub fn vertex_count(&self) -> usize {
        self.glyphs.len() * 6
    }
}

/// Iterates single-byte codes up to the first NUL.
pub fn codes(text: &[u8]) -> impl Iterator<Item = u8> + '_ {
    text.iter().copied().take_while(|&code| code != 0)
}

pub fn layout<S: GlyphSource + ?Sized>(
    text: &[u8],
    origin: Point2<f32>,
    scale: Vector2<f32>,
    source: &S,
) -> TextLayout {
    let mut cursor = GlyphCursor::new(origin, scale);
    let mut glyphs = Vec::with_capacity(text.len());

    for code in codes(text) {
        let Some(entry) = source.glyph(code) else {
            continue;
        };
        if let Some(quad) = cursor.place(&entry.metrics, entry.uv) {
            glyphs.push(LaidOutGlyph { code, quad });
        }
    }

    TextLayout {
        glyphs,
        cursor: cursor.position(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    struct Glyphs(HashMap<u8, GlyphEntry>);

    impl GlyphSource for Glyphs {
        fn glyph(&self, code: u8) -> Option<GlyphEntry> {
            self.0.get(&code).copied()
        }
    }

    fn entry(w: u32, h: u32, bearing: (f32, f32), advance: f32) -> GlyphEntry {
        GlyphEntry {
            metrics: GlyphMetrics {
                advance_x: advance,
                advance_y: 0.0,
                width: w,
                height: h,
                bearing_left: bearing.0,
                bearing_top: bearing.1,
            },
            uv: UvRect {
                min: [0.25, 0.0],
                max: [0.5, 0.75],
            },
            ..Default::default()
        }
    }

    fn glyphs() -> Glyphs {
        Glyphs(HashMap::from([
            (b'A', entry(10, 12, (1.0, 10.0), 12.0)),
            (b'b', entry(8, 14, (2.0, 14.0), 9.0)),
            (b' ', entry(0, 0, (0.0, 0.0), 6.0)),
        ]))
    }

    fn origin() -> Point2<f32> {
        Point2::new(0.0, 0.0)
    }

    fn unit() -> Vector2<f32> {
        Vector2::new(1.0, 1.0)
    }

    #[test]
    fn test_single_glyph_scenario() {
        let laid_out = layout(b"A", origin(), unit(), &glyphs());

        assert_eq!(laid_out.glyphs.len(), 1);
        let quad = laid_out.glyphs[0].quad;
        assert_eq!(quad.min, Point2::new(1.0, -10.0));
        assert_eq!(quad.max, Point2::new(11.0, -22.0));
        assert_eq!(laid_out.cursor, Point2::new(12.0, 0.0));
    }

    #[test]
    fn test_space_only_advances() {
        let laid_out = layout(b" ", origin(), unit(), &glyphs());

        assert!(laid_out.glyphs.is_empty());
        assert_eq!(laid_out.vertex_count(), 0);
        assert_eq!(laid_out.cursor, Point2::new(6.0, 0.0));
    }

    #[test]
    fn test_empty_text_leaves_cursor_at_origin() {
        let start = Point2::new(3.0, -4.0);
        let laid_out = layout(b"", start, unit(), &glyphs());

        assert!(laid_out.vertices().is_empty());
        assert_eq!(laid_out.cursor, start);
    }

    #[test]
    fn test_vertex_count_is_six_per_visible_glyph() {
        let laid_out = layout(b"A b A", origin(), unit(), &glyphs());

        assert_eq!(laid_out.glyphs.len(), 3);
        assert_eq!(laid_out.vertices().len(), 18);
        assert_eq!(laid_out.vertex_count(), 18);
    }

    #[test]
    fn test_cursor_sums_scaled_advances() {
        let scale = Vector2::new(0.5, 2.0);
        let start = Point2::new(10.0, 5.0);
        let laid_out = layout(b"Ab A", start, scale, &glyphs());

        let expected = 10.0 + (12.0 + 9.0 + 6.0 + 12.0) * 0.5;
        assert!((laid_out.cursor.x - expected).abs() < 1e-5);
        assert_eq!(laid_out.cursor.y, 5.0);
    }

    #[test]
    fn test_quads_follow_input_order() {
        let laid_out = layout(b"AbA", origin(), unit(), &glyphs());

        let codes = laid_out.glyphs.iter().map(|g| g.code).collect::<Vec<_>>();
        assert_eq!(codes, vec![b'A', b'b', b'A']);
        let xs = laid_out
            .glyphs
            .iter()
            .map(|g| g.quad.min.x)
            .collect::<Vec<_>>();
        assert!(xs.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_scale_applies_to_bearing_and_size() {
        let laid_out = layout(b"A", origin(), Vector2::new(2.0, 0.5), &glyphs());

        let quad = laid_out.glyphs[0].quad;
        assert_eq!(quad.min, Point2::new(2.0, -5.0));
        assert_eq!(quad.max, Point2::new(22.0, -11.0));
        assert_eq!(laid_out.cursor, Point2::new(24.0, 0.0));
    }

    #[test]
    fn test_unknown_codes_are_skipped_without_advance() {
        let laid_out = layout(b"A?A", origin(), unit(), &glyphs());

        assert_eq!(laid_out.glyphs.len(), 2);
        assert_eq!(laid_out.glyphs[1].quad.min.x, 13.0);
        assert_eq!(laid_out.cursor.x, 24.0);
    }

    #[test]
    fn test_nul_terminates_text() {
        let laid_out = layout(b"A\0A", origin(), unit(), &glyphs());

        assert_eq!(laid_out.glyphs.len(), 1);
        assert_eq!(laid_out.cursor.x, 12.0);
    }

    #[test]
    fn test_triangles_carry_matching_uvs() {
        let laid_out = layout(b"A", origin(), unit(), &glyphs());
        let vertices = laid_out.vertices();

        assert_eq!(vertices[0], TextVertex::new([1.0, -10.0], [0.25, 0.0]));
        assert_eq!(vertices[1], TextVertex::new([11.0, -10.0], [0.5, 0.0]));
        assert_eq!(vertices[2], TextVertex::new([1.0, -22.0], [0.25, 0.75]));
        assert_eq!(vertices[3], vertices[1]);
        assert_eq!(vertices[4], vertices[2]);
        assert_eq!(vertices[5], TextVertex::new([11.0, -22.0], [0.5, 0.75]));
    }

    #[test]
    fn test_vertical_advance_moves_cursor() {
        let mut cursor = GlyphCursor::new(origin(), unit());
        let metrics = GlyphMetrics {
            advance_x: 0.0,
            advance_y: 7.0,
            ..Default::default()
        };

        assert!(cursor.place(&metrics, UvRect::FULL).is_none());
        assert_eq!(cursor.position(), Point2::new(0.0, 7.0));
    }
}
