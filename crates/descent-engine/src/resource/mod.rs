//! GPU resource handles.
//!
//! Applications hold `GpuResource` values, never native objects. The
//! registry maps each handle to its native object, owning context and
//! reference count, and marks handles invalid when their context dies.

mod descriptor;
mod handle;
mod registry;

pub use descriptor::{
    BufferDescriptor, BufferUsage, FilterMode, FontAtlasDescriptor, GpuResourceDescriptor,
    ShaderDescriptor, TextureDescriptor, TextureFormat,
};
pub use handle::{ContextId, GpuResource, NativeHandle, ResourceKind};
pub use registry::{ResourceInfo, ResourceKey, ResourceRegistry, ResourceState};
