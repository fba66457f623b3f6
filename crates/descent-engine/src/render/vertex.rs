use bytemuck::{Pod, Zeroable};

use crate::paint::Color;

/// Vertex layout shared by the built-in sprite and text programs.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex {
    const ATTRS: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x2, 2 => Float32x4];

    pub fn new(position: [f32; 2], uv: [f32; 2], color: Color) -> Self {
        Self {
            position,
            uv,
            color: color.to_array(),
        }
    }

    pub(crate) fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }

    /// Two triangles covering `origin..origin + size`, sampling the full texture.
    pub fn quad(origin: [f32; 2], size: [f32; 2], color: Color) -> [Vertex; 6] {
        Self::quad_uv(origin, size, [0.0, 0.0], [1.0, 1.0], color)
    }

    /// Like [`Vertex::quad`], sampling `uv_min..uv_max` (atlas sub-rects).
    pub fn quad_uv(
        origin: [f32; 2],
        size: [f32; 2],
        uv_min: [f32; 2],
        uv_max: [f32; 2],
        color: Color,
    ) -> [Vertex; 6] {
        let [x0, y0] = origin;
        let [x1, y1] = [x0 + size[0], y0 + size[1]];
        let [u0, v0] = uv_min;
        let [u1, v1] = uv_max;
        let tl = Vertex::new([x0, y0], [u0, v0], color);
        let tr = Vertex::new([x1, y0], [u1, v0], color);
        let br = Vertex::new([x1, y1], [u1, v1], color);
        let bl = Vertex::new([x0, y1], [u0, v1], color);
        [tl, tr, br, tl, br, bl]
    }
}
