//! Color model shared by window clear colors and vertex tinting.

pub mod color;

pub use color::Color;
