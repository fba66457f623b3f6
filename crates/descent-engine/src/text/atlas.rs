use std::collections::HashMap;
use std::ops::RangeInclusive;

use crate::error::DecodeError;

const ATLAS_WIDTH: u32 = 512;
const GLYPH_PADDING: u32 = 1; // pixels between glyphs in the atlas

/// Placement and layout metrics of one glyph.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Glyph {
    /// Top-left corner in the atlas, in pixels.
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Offset of the bitmap's bottom-left corner from the pen position.
    pub xmin: i32,
    pub ymin: i32,
    pub advance: f32,
}

impl Glyph {
    /// `[u0, v0, u1, v1]` for an atlas of the given size.
    pub fn uv(&self, atlas_width: u32, atlas_height: u32) -> [f32; 4] {
        let w = atlas_width.max(1) as f32;
        let h = atlas_height.max(1) as f32;
        [
            self.x as f32 / w,
            self.y as f32 / h,
            (self.x + self.width) as f32 / w,
            (self.y + self.height) as f32 / h,
        ]
    }
}

/// Per-glyph metrics of an atlas, kept by the registry after upload.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphMetrics {
    px: f32,
    ascent: f32,
    descent: f32,
    line_gap: f32,
    glyphs: HashMap<char, Glyph>,
}

impl GlyphMetrics {
    pub fn px(&self) -> f32 {
        self.px
    }

    pub fn ascent(&self) -> f32 {
        self.ascent
    }

    pub fn line_height(&self) -> f32 {
        self.ascent - self.descent + self.line_gap
    }

    pub fn glyph(&self, ch: char) -> Option<&Glyph> {
        self.glyphs.get(&ch)
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// `(width, height)` of `text` laid out on one baseline per line.
    /// Characters missing from the atlas contribute nothing.
    pub fn measure(&self, text: &str) -> (f32, f32) {
        let mut lines = 0usize;
        let mut widest = 0.0f32;
        for line in text.split('\n') {
            lines += 1;
            let w: f32 = line
                .chars()
                .filter_map(|c| self.glyphs.get(&c))
                .map(|g| g.advance)
                .sum();
            widest = widest.max(w);
        }
        (widest, lines as f32 * self.line_height())
    }
}

/// Coverage-only (R8) glyph atlas produced by fontdue.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphAtlas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    metrics: GlyphMetrics,
}

/// A rasterized glyph waiting to be packed.
struct Bitmap {
    ch: char,
    width: u32,
    height: u32,
    xmin: i32,
    ymin: i32,
    advance: f32,
    coverage: Vec<u8>,
}

impl GlyphAtlas {
    /// Printable ASCII.
    pub const DEFAULT_CHARS: RangeInclusive<char> = ' '..='~';

    /// Parses a TrueType/OpenType font and rasterizes `chars` at `px`.
    pub fn build(
        font_bytes: &[u8],
        px: f32,
        chars: impl IntoIterator<Item = char>,
    ) -> Result<Self, DecodeError> {
        if !px.is_finite() || px <= 0.0 {
            return Err(DecodeError::new("font", format!("invalid pixel size {px}")));
        }

        let settings = fontdue::FontSettings {
            scale: px,
            ..fontdue::FontSettings::default()
        };
        let font = fontdue::Font::from_bytes(font_bytes, settings)
            .map_err(|e| DecodeError::new("font", e))?;

        let (ascent, descent, line_gap) = font
            .horizontal_line_metrics(px)
            .map(|m| (m.ascent, m.descent, m.line_gap))
            .unwrap_or((px * 0.8, -px * 0.2, 0.0));

        let mut seen = std::collections::HashSet::new();
        let bitmaps = chars
            .into_iter()
            .filter(|c| seen.insert(*c))
            .map(|ch| {
                let (m, coverage) = font.rasterize(ch, px);
                Bitmap {
                    ch,
                    width: m.width as u32,
                    height: m.height as u32,
                    xmin: m.xmin,
                    ymin: m.ymin,
                    advance: m.advance_width,
                    coverage,
                }
            })
            .collect();

        let mut atlas = Self::pack(bitmaps);
        atlas.metrics.px = px;
        atlas.metrics.ascent = ascent;
        atlas.metrics.descent = descent;
        atlas.metrics.line_gap = line_gap;

        log::debug!(
            "built {}x{} glyph atlas with {} glyphs at {px}px",
            atlas.width,
            atlas.height,
            atlas.metrics.len()
        );
        Ok(atlas)
    }

    /// Shelf-packs bitmaps left to right, opening a new row when one no
    /// longer fits. Height is rounded up to a power of two.
    fn pack(bitmaps: Vec<Bitmap>) -> Self {
        let widest = bitmaps.iter().map(|b| b.width).max().unwrap_or(0);
        let width = ATLAS_WIDTH.max((widest + 2 * GLYPH_PADDING).next_power_of_two());

        let mut cursor_x = GLYPH_PADDING;
        let mut cursor_y = GLYPH_PADDING;
        let mut row_height = 0;
        let mut glyphs = HashMap::with_capacity(bitmaps.len());
        let mut placed = Vec::with_capacity(bitmaps.len());

        for bm in bitmaps {
            let (x, y) = if bm.width == 0 || bm.height == 0 {
                (0, 0)
            } else {
                if cursor_x + bm.width + GLYPH_PADDING > width {
                    cursor_y += row_height + GLYPH_PADDING;
                    cursor_x = GLYPH_PADDING;
                    row_height = 0;
                }
                let at = (cursor_x, cursor_y);
                cursor_x += bm.width + GLYPH_PADDING;
                row_height = row_height.max(bm.height);
                at
            };

            glyphs.insert(
                bm.ch,
                Glyph {
                    x,
                    y,
                    width: bm.width,
                    height: bm.height,
                    xmin: bm.xmin,
                    ymin: bm.ymin,
                    advance: bm.advance,
                },
            );
            placed.push((x, y, bm));
        }

        let height = (cursor_y + row_height + GLYPH_PADDING).next_power_of_two();
        let mut pixels = vec![0u8; width as usize * height as usize];
        for (x, y, bm) in placed {
            for row in 0..bm.height as usize {
                let src = row * bm.width as usize;
                let dst = (y as usize + row) * width as usize + x as usize;
                pixels[dst..dst + bm.width as usize]
                    .copy_from_slice(&bm.coverage[src..src + bm.width as usize]);
            }
        }

        Self {
            width,
            height,
            pixels,
            metrics: GlyphMetrics {
                px: 0.0,
                ascent: 0.0,
                descent: 0.0,
                line_gap: 0.0,
                glyphs,
            },
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row-major coverage, one byte per pixel.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn metrics(&self) -> &GlyphMetrics {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bitmap(ch: char, width: u32, height: u32, fill: u8) -> Bitmap {
        Bitmap {
            ch,
            width,
            height,
            xmin: 0,
            ymin: 0,
            advance: width as f32 + 1.0,
            coverage: vec![fill; (width * height) as usize],
        }
    }

    #[test]
    fn packed_glyphs_do_not_overlap() {
        let bitmaps = (0..26u8)
            .map(|i| bitmap((b'A' + i) as char, 30, 20 + (i % 3) as u32, i + 1))
            .collect();
        let atlas = GlyphAtlas::pack(bitmaps);

        let glyphs: Vec<&Glyph> = atlas.metrics.glyphs.values().collect();
        for (i, a) in glyphs.iter().enumerate() {
            assert!(a.x + a.width <= atlas.width);
            assert!(a.y + a.height <= atlas.height);
            for b in &glyphs[i + 1..] {
                let apart = a.x + a.width <= b.x
                    || b.x + b.width <= a.x
                    || a.y + a.height <= b.y
                    || b.y + b.height <= a.y;
                assert!(apart, "{a:?} overlaps {b:?}");
            }
        }
        assert!(atlas.height.is_power_of_two());
    }

    #[test]
    fn coverage_lands_at_glyph_position() {
        let atlas = GlyphAtlas::pack(vec![bitmap('a', 4, 3, 7), bitmap('b', 2, 2, 9)]);
        let b = *atlas.metrics.glyph('b').unwrap();
        let at = |x: u32, y: u32| atlas.pixels[(y * atlas.width + x) as usize];
        assert_eq!(at(b.x, b.y), 9);
        assert_eq!(at(b.x + 1, b.y + 1), 9);
        assert_eq!(at(b.x + 2, b.y), 0);
    }

    #[test]
    fn empty_glyphs_take_no_space() {
        let atlas = GlyphAtlas::pack(vec![bitmap(' ', 0, 0, 0), bitmap('x', 3, 3, 1)]);
        let space = atlas.metrics.glyph(' ').unwrap();
        assert_eq!((space.width, space.height), (0, 0));
        assert_eq!(atlas.metrics.glyph('x').unwrap().x, GLYPH_PADDING);
    }

    #[test]
    fn measure_sums_advances_per_line() {
        let mut atlas = GlyphAtlas::pack(vec![bitmap('a', 4, 4, 1), bitmap('b', 6, 4, 1)]);
        atlas.metrics.ascent = 8.0;
        atlas.metrics.descent = -2.0;
        assert_eq!(atlas.metrics.measure("ab"), (12.0, 10.0));
        assert_eq!(atlas.metrics.measure("a\nbb?"), (14.0, 20.0));
    }

    #[test]
    fn invalid_font_bytes_fail() {
        let err = GlyphAtlas::build(b"not a font", 16.0, GlyphAtlas::DEFAULT_CHARS).unwrap_err();
        assert_eq!(err.what, "font");
    }

    #[test]
    fn invalid_pixel_size_fails() {
        assert!(GlyphAtlas::build(&[], 0.0, ['a']).is_err());
        assert!(GlyphAtlas::build(&[], f32::NAN, ['a']).is_err());
    }

    #[test]
    fn rasterizes_a_system_font_when_present() {
        let Ok(bytes) = std::fs::read("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf") else {
            return;
        };
        let atlas = GlyphAtlas::build(&bytes, 18.0, GlyphAtlas::DEFAULT_CHARS).unwrap();
        assert_eq!(atlas.metrics().len(), 95);
        assert!(atlas.metrics().line_height() > 18.0);
        assert!(atlas.pixels().iter().any(|p| *p > 0));
    }
}
