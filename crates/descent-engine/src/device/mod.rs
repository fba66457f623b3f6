//! wgpu graphics context.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue for one window
//! - configuring the Surface (swapchain) and MSAA target
//! - turning resource descriptors into wgpu objects
//! - recording a frame's draws and presenting them

mod context;
mod error;
mod frame;
mod init;
mod objects;
mod surface;

pub use context::WgpuContext;
pub use error::SurfaceErrorAction;
pub use init::GpuInit;
