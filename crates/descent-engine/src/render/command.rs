use std::ops::Range;

use crate::resource::{GpuResource, NativeHandle};

/// One draw call in terms of application handles.
///
/// Without `indices`, `elements` is a vertex range; with them, an index
/// range. Without `texture`, the backend binds a 1x1 white texture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawCommand {
    pub program: GpuResource,
    pub vertices: GpuResource,
    pub indices: Option<GpuResource>,
    pub texture: Option<GpuResource>,
    pub elements: Range<u32>,
}

impl DrawCommand {
    pub fn new(program: GpuResource, vertices: GpuResource, elements: Range<u32>) -> Self {
        Self {
            program,
            vertices,
            indices: None,
            texture: None,
            elements,
        }
    }

    pub fn with_indices(mut self, indices: GpuResource) -> Self {
        self.indices = Some(indices);
        self
    }

    pub fn with_texture(mut self, texture: GpuResource) -> Self {
        self.texture = Some(texture);
        self
    }
}

/// A [`DrawCommand`] after every handle was checked and resolved against
/// the target context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDraw {
    pub program: NativeHandle,
    pub vertices: NativeHandle,
    pub indices: Option<NativeHandle>,
    pub texture: Option<NativeHandle>,
    pub elements: Range<u32>,
}
