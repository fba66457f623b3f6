use std::fmt;

use super::registry::ResourceKey;

/// Identifies one graphics context. Never reused within a process run.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ContextId(u64);

impl ContextId {
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "context #{}", self.0)
    }
}

/// Backend-assigned id of a native GPU object. Meaningful only to the
/// backend of the context that issued it.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct NativeHandle(pub u64);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ResourceKind {
    Texture,
    Shader,
    Buffer,
    FontAtlas,
}

impl ResourceKind {
    /// Font atlases are textures on the GPU side and bind wherever one does.
    pub fn samplable(self) -> bool {
        matches!(self, ResourceKind::Texture | ResourceKind::FontAtlas)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResourceKind::Texture => "texture",
            ResourceKind::Shader => "shader",
            ResourceKind::Buffer => "buffer",
            ResourceKind::FontAtlas => "font atlas",
        })
    }
}

/// Application-facing handle to a GPU object.
///
/// Copying a handle does not add a reference; owners call `retain` on the
/// window manager for that. A handle outliving its object or context is
/// detected on every use.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct GpuResource {
    pub(crate) key: ResourceKey,
    pub(crate) context: ContextId,
    pub(crate) kind: ResourceKind,
}

impl GpuResource {
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Context that created the resource.
    pub fn context(&self) -> ContextId {
        self.context
    }
}
