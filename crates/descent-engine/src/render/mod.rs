//! Per-frame drawing contract.
//!
//! Convention:
//! - Vertex positions are logical pixels (top-left origin, +Y down).
//! - The built-in shaders convert to NDC with a viewport uniform.
//! - Vertex colors are premultiplied.

mod command;
mod surface;
mod vertex;

pub use command::{DrawCommand, ResolvedDraw};
pub use surface::RenderSurface;
pub use vertex::Vertex;
