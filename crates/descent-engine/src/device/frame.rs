use crate::render::ResolvedDraw;

/// A frame between `begin_frame` and `swap_buffers`.
///
/// Holding the surface texture prevents acquisition of subsequent frames.
/// Draws are recorded here and encoded into a single pass on present.
pub(super) struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub clear: wgpu::Color,
    pub draws: Vec<ResolvedDraw>,
}
