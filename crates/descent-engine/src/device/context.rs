use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use winit::window::Window;

use crate::error::ContextCreationError;
use crate::paint::Color;
use crate::platform::{FrameStatus, GraphicsBackend, GraphicsCapabilities};
use crate::render::ResolvedDraw;
use crate::resource::{BufferUsage, GpuResourceDescriptor, NativeHandle, TextureDescriptor};
use crate::window::WindowConfig;

use super::frame::GpuFrame;
use super::objects::{Bindings, GpuObject, Target};
use super::{GpuInit, SurfaceErrorAction, surface};

/// wgpu graphics context bound to one window.
///
/// - creates and stores Adapter/Device/Queue
/// - configures the Surface (swapchain) and the MSAA target
/// - owns every native object created through it, keyed by `NativeHandle`
/// - records a frame's draws and encodes them in one pass on present
pub struct WgpuContext {
    /// Native objects; dropped before the device.
    objects: HashMap<NativeHandle, GpuObject>,
    next_handle: u64,

    /// Frame between `begin_frame` and `swap_buffers`.
    frame: Option<GpuFrame>,

    /// Bound when a draw names no texture.
    white: GpuObject,
    bindings: Bindings,
    msaa: Option<wgpu::TextureView>,

    surface: wgpu::Surface<'static>,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,

    /// Active surface configuration.
    config: wgpu::SurfaceConfiguration,
    present_modes: Vec<wgpu::PresentMode>,

    /// Current drawable size in physical pixels.
    size: (u32, u32),
    samples: u32,
    capabilities: GraphicsCapabilities,

    /// Kept alive for as long as the surface is.
    window: Arc<Window>,
}

impl WgpuContext {
    /// Creates a context for `window`, blocking on adapter and device
    /// acquisition.
    pub fn new(window: Arc<Window>, config: &WindowConfig) -> Result<Self, ContextCreationError> {
        pollster::block_on(Self::create(window, GpuInit::from(config)))
            .map_err(|e| ContextCreationError::native(config.request(), format!("{e:#}")))
    }

    async fn create(window: Arc<Window>, init: GpuInit) -> Result<Self> {
        let inner = window.inner_size();
        let size = (inner.width, inner.height);

        let GpuInit {
            prefer_srgb,
            vsync,
            samples,
            alpha_mode,
            required_features,
            required_limits,
            desired_maximum_frame_latency,
        } = init;

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("failed to create wgpu surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("descent device"),
                required_features,
                required_limits,
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface::choose_surface_format(&surface_caps, prefer_srgb)
            .context("no supported surface formats")?;
        let alpha_mode = surface::choose_alpha_mode(&surface_caps, alpha_mode);
        let present_mode = surface::choose_present_mode(&surface_caps.present_modes, vsync);

        let features = adapter.get_texture_format_features(format);
        let capabilities = GraphicsCapabilities {
            max_samples: surface::max_samples(features.flags),
            // FIFO is the one present mode every surface supports.
            vsync: true,
            max_texture_size: device.limits().max_texture_dimension_2d,
        };
        // The window manager rejects unsupported requests before anything
        // is drawn; fall back to 1 so the pipelines stay valid meanwhile.
        let samples = if features.flags.sample_count_supported(samples) {
            samples
        } else {
            1
        };

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.0.max(1),
            height: size.1.max(1),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency,
        };
        if size.0 > 0 && size.1 > 0 {
            surface.configure(&device, &config);
        }

        let bindings = Bindings::new(&device);
        let target = Target { format, samples };
        let white = GpuObject::create(
            &device,
            &queue,
            &bindings,
            target,
            &GpuResourceDescriptor::Texture(
                TextureDescriptor::rgba8(1, 1, vec![255; 4]).with_label("descent white"),
            ),
        )
        .map_err(anyhow::Error::msg)?;
        let msaa = create_msaa(&device, &config, samples);

        let info = adapter.get_info();
        log::info!(
            "wgpu context on {} ({:?}): {format:?}, {present_mode:?}, {samples}x MSAA",
            info.name,
            info.backend
        );

        Ok(Self {
            objects: HashMap::new(),
            next_handle: 1,
            frame: None,
            white,
            bindings,
            msaa,
            surface,
            adapter,
            device,
            queue,
            config,
            present_modes: surface_caps.present_modes,
            size,
            samples,
            capabilities,
            window,
        })
    }

    /// Returns the active surface format.
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Name of the adapter this context renders with.
    pub fn adapter_name(&self) -> String {
        self.adapter.get_info().name
    }

    fn target(&self) -> Target {
        Target {
            format: self.config.format,
            samples: self.samples,
        }
    }

    fn acquire(&mut self) -> Result<Option<wgpu::SurfaceTexture>, String> {
        match self.surface.get_current_texture() {
            Ok(texture) => Ok(Some(texture)),
            Err(err) => {
                let reason = err.to_string();
                log::debug!("surface texture unavailable: {reason}");
                match surface::map_surface_error(
                    &self.surface,
                    &self.device,
                    &self.config,
                    self.size,
                    err,
                ) {
                    SurfaceErrorAction::Reconfigured | SurfaceErrorAction::SkipFrame => Ok(None),
                    SurfaceErrorAction::Fatal => Err(format!("surface lost for good: {reason}")),
                }
            }
        }
    }

    /// Checks a recorded draw against the objects still alive. Draws whose
    /// objects were destroyed mid-frame are dropped with a warning.
    fn encodable(&self, draw: &ResolvedDraw) -> bool {
        let program = matches!(self.objects.get(&draw.program), Some(GpuObject::Program { .. }));
        let vertices = match self.objects.get(&draw.vertices) {
            Some(GpuObject::Buffer {
                usage: BufferUsage::Vertex,
                elements,
                ..
            }) => *elements,
            _ => return false,
        };
        let bound = match draw.indices {
            None => vertices,
            Some(handle) => match self.objects.get(&handle) {
                Some(GpuObject::Buffer {
                    usage: BufferUsage::Index,
                    elements,
                    ..
                }) => *elements,
                _ => return false,
            },
        };
        let texture = match draw.texture {
            None => true,
            Some(handle) => matches!(self.objects.get(&handle), Some(GpuObject::Texture { .. })),
        };
        program && texture && draw.elements.end <= bound
    }

    fn encode(&self, frame: &GpuFrame) -> wgpu::CommandBuffer {
        let scale = self.window.scale_factor() as f32;
        self.bindings.write_viewport(
            &self.queue,
            self.size.0 as f32 / scale,
            self.size.1 as f32 / scale,
        );

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("descent frame encoder"),
            });

        let (view, resolve_target, store) = match &self.msaa {
            Some(msaa) => (msaa, Some(&frame.view), wgpu::StoreOp::Discard),
            None => (&frame.view, None, wgpu::StoreOp::Store),
        };

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("descent frame pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    depth_slice: None,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(frame.clear),
                        store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            for draw in &frame.draws {
                if !self.encodable(draw) {
                    log::warn!("dropping draw referencing released GPU objects");
                    continue;
                }
                let Some(GpuObject::Program { pipeline }) = self.objects.get(&draw.program) else {
                    continue;
                };
                let Some(GpuObject::Buffer { buffer: vertices, .. }) =
                    self.objects.get(&draw.vertices)
                else {
                    continue;
                };
                let texture = draw
                    .texture
                    .and_then(|h| self.objects.get(&h))
                    .unwrap_or(&self.white);
                let GpuObject::Texture { bind_group, .. } = texture else {
                    continue;
                };

                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, bind_group, &[]);
                pass.set_vertex_buffer(0, vertices.slice(..));

                match draw.indices.and_then(|h| self.objects.get(&h)) {
                    Some(GpuObject::Buffer { buffer: indices, .. }) => {
                        pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint16);
                        pass.draw_indexed(draw.elements.clone(), 0, 0..1);
                    }
                    _ => pass.draw(draw.elements.clone(), 0..1),
                }
            }
        }

        encoder.finish()
    }
}

impl GraphicsBackend for WgpuContext {
    fn capabilities(&self) -> GraphicsCapabilities {
        self.capabilities
    }

    /// wgpu has no thread-current context; exclusive access goes through
    /// `&mut self`.
    fn make_current(&mut self) -> Result<(), String> {
        Ok(())
    }

    fn set_vsync(&mut self, enabled: bool) -> Result<(), String> {
        self.config.present_mode = surface::choose_present_mode(&self.present_modes, enabled);
        if self.size.0 > 0 && self.size.1 > 0 {
            self.surface.configure(&self.device, &self.config);
        }
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        // A pending surface texture must be released before reconfiguring.
        if self.frame.take().is_some() {
            log::debug!("resize discarded an in-flight frame");
        }
        surface::apply_resize(
            &self.surface,
            &self.device,
            &mut self.config,
            &mut self.size,
            (width, height),
        );
        if width > 0 && height > 0 {
            self.msaa = create_msaa(&self.device, &self.config, self.samples);
        }
    }

    fn create_resource(&mut self, desc: &GpuResourceDescriptor) -> Result<NativeHandle, String> {
        let object = GpuObject::create(&self.device, &self.queue, &self.bindings, self.target(), desc)?;
        let handle = NativeHandle(self.next_handle);
        self.next_handle += 1;
        self.objects.insert(handle, object);
        Ok(handle)
    }

    fn destroy_resource(&mut self, handle: NativeHandle) {
        match self.objects.remove(&handle) {
            Some(object) => object.destroy(),
            None => log::warn!("destroy of unknown native object {}", handle.0),
        }
    }

    fn begin_frame(&mut self, clear: Color) -> Result<FrameStatus, String> {
        if self.frame.take().is_some() {
            log::warn!("begin_frame with a frame still open; discarding it");
        }
        if self.size.0 == 0 || self.size.1 == 0 {
            return Ok(FrameStatus::Skipped);
        }

        let Some(surface_texture) = self.acquire()? else {
            return Ok(FrameStatus::Skipped);
        };
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        self.frame = Some(GpuFrame {
            surface_texture,
            view,
            clear: to_wgpu_color(clear),
            draws: Vec::new(),
        });
        Ok(FrameStatus::Ready)
    }

    fn draw(&mut self, draw: &ResolvedDraw) -> Result<(), String> {
        if !self.encodable(draw) {
            return Err("draw references missing or out-of-range GPU objects".to_string());
        }
        // Skipped frames accept draws and discard them.
        if let Some(frame) = &mut self.frame {
            frame.draws.push(draw.clone());
        }
        Ok(())
    }

    fn swap_buffers(&mut self) -> Result<(), String> {
        let Some(frame) = self.frame.take() else {
            return Ok(());
        };
        let commands = self.encode(&frame);
        self.queue.submit(std::iter::once(commands));
        frame.surface_texture.present();
        Ok(())
    }
}

fn create_msaa(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    samples: u32,
) -> Option<wgpu::TextureView> {
    if samples <= 1 {
        return None;
    }
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("descent msaa target"),
        size: wgpu::Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: samples,
        dimension: wgpu::TextureDimension::D2,
        format: config.format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    Some(texture.create_view(&wgpu::TextureViewDescriptor::default()))
}

fn to_wgpu_color(c: Color) -> wgpu::Color {
    wgpu::Color {
        r: c.r as f64,
        g: c.g as f64,
        b: c.b as f64,
        a: c.a as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_color_keeps_premultiplied_channels() {
        let c = to_wgpu_color(Color::from_premul(0.25, 0.5, 0.0, 0.5));
        assert_eq!((c.r, c.g, c.b, c.a), (0.25, 0.5, 0.0, 0.5));
    }
}
