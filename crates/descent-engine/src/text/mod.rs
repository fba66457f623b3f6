//! Font rasterization into glyph atlases.

mod atlas;

pub use atlas::{Glyph, GlyphAtlas, GlyphMetrics};
