use crate::error::{DecodeError, ResourceCreationError};
use crate::platform::GraphicsCapabilities;
use crate::render::Vertex;
use crate::text::GlyphAtlas;

use super::handle::ResourceKind;
use super::registry::ResourceInfo;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TextureFormat {
    Rgba8UnormSrgb,
    Rgba8Unorm,
    R8Unorm,
}

impl TextureFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            TextureFormat::Rgba8UnormSrgb | TextureFormat::Rgba8Unorm => 4,
            TextureFormat::R8Unorm => 1,
        }
    }
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum FilterMode {
    #[default]
    Linear,
    Nearest,
}

/// Pixel data for a 2D texture. Color pixels are premultiplied.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureDescriptor {
    pub label: Option<String>,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub filter: FilterMode,
    pub pixels: Vec<u8>,
}

impl TextureDescriptor {
    /// sRGB RGBA8 texture from premultiplied pixels.
    pub fn rgba8(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            label: None,
            width,
            height,
            format: TextureFormat::Rgba8UnormSrgb,
            filter: FilterMode::Linear,
            pixels,
        }
    }

    /// Decodes a PNG or JPEG image. Alpha is premultiplied on the way in.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let image =
            image::load_from_memory(bytes).map_err(|e| DecodeError::new("image", e.to_string()))?;
        let rgba = image.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(DecodeError::new("image", "image has no pixels"));
        }

        let mut pixels = rgba.into_raw();
        for px in pixels.chunks_exact_mut(4) {
            let a = px[3] as u16;
            for c in &mut px[..3] {
                *c = ((*c as u16 * a + 127) / 255) as u8;
            }
        }
        Ok(Self::rgba8(width, height, pixels))
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_filter(mut self, filter: FilterMode) -> Self {
        self.filter = filter;
        self
    }

    fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}

/// WGSL program with a vertex and a fragment entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderDescriptor {
    pub label: Option<String>,
    pub source: String,
    pub vertex_entry: String,
    pub fragment_entry: String,
}

impl ShaderDescriptor {
    pub fn wgsl(source: impl Into<String>) -> Self {
        Self {
            label: None,
            source: source.into(),
            vertex_entry: "vs_main".to_string(),
            fragment_entry: "fs_main".to_string(),
        }
    }

    /// Built-in textured, vertex-colored sprite program.
    pub fn sprite() -> Self {
        Self::wgsl(include_str!("../render/shaders/sprite.wgsl")).with_label("sprite")
    }

    /// Built-in program for coverage-only font atlas textures.
    pub fn text() -> Self {
        Self::wgsl(include_str!("../render/shaders/text.wgsl")).with_label("text")
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_entry_points(mut self, vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        self.vertex_entry = vertex.into();
        self.fragment_entry = fragment.into();
        self
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferUsage {
    Vertex,
    Index,
    Uniform,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferDescriptor {
    pub label: Option<String>,
    pub usage: BufferUsage,
    pub contents: Vec<u8>,
}

impl BufferDescriptor {
    pub fn vertices(vertices: &[Vertex]) -> Self {
        Self {
            label: None,
            usage: BufferUsage::Vertex,
            contents: bytemuck::cast_slice(vertices).to_vec(),
        }
    }

    /// 16-bit index buffer.
    pub fn indices(indices: &[u16]) -> Self {
        Self {
            label: None,
            usage: BufferUsage::Index,
            contents: bytemuck::cast_slice(indices).to_vec(),
        }
    }

    pub fn uniform(contents: Vec<u8>) -> Self {
        Self {
            label: None,
            usage: BufferUsage::Uniform,
            contents,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FontAtlasDescriptor {
    pub label: Option<String>,
    pub atlas: GlyphAtlas,
}

impl FontAtlasDescriptor {
    /// Rasterizes `chars` from a TrueType/OpenType font at `px` pixels.
    pub fn rasterize(
        font_bytes: &[u8],
        px: f32,
        chars: impl IntoIterator<Item = char>,
    ) -> Result<Self, DecodeError> {
        Ok(Self {
            label: None,
            atlas: GlyphAtlas::build(font_bytes, px, chars)?,
        })
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Everything needed to create one GPU object.
#[derive(Debug, Clone, PartialEq)]
pub enum GpuResourceDescriptor {
    Texture(TextureDescriptor),
    Shader(ShaderDescriptor),
    Buffer(BufferDescriptor),
    FontAtlas(FontAtlasDescriptor),
}

impl GpuResourceDescriptor {
    pub fn kind(&self) -> ResourceKind {
        match self {
            GpuResourceDescriptor::Texture(_) => ResourceKind::Texture,
            GpuResourceDescriptor::Shader(_) => ResourceKind::Shader,
            GpuResourceDescriptor::Buffer(_) => ResourceKind::Buffer,
            GpuResourceDescriptor::FontAtlas(_) => ResourceKind::FontAtlas,
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            GpuResourceDescriptor::Texture(d) => d.label.as_deref(),
            GpuResourceDescriptor::Shader(d) => d.label.as_deref(),
            GpuResourceDescriptor::Buffer(d) => d.label.as_deref(),
            GpuResourceDescriptor::FontAtlas(d) => d.label.as_deref(),
        }
    }

    /// Checks the descriptor against the context's limits before anything
    /// native is created.
    pub fn validate(&self, caps: &GraphicsCapabilities) -> Result<(), ResourceCreationError> {
        let check = |ok: bool, diagnostic: String| {
            if ok {
                Ok(())
            } else {
                Err(self.creation_error(diagnostic))
            }
        };

        match self {
            GpuResourceDescriptor::Texture(t) => {
                check_extent(t.width, t.height, caps).map_err(|d| self.creation_error(d))?;
                check(
                    t.pixels.len() == t.expected_len(),
                    format!(
                        "pixel data is {} bytes, expected {} for {}x{} {:?}",
                        t.pixels.len(),
                        t.expected_len(),
                        t.width,
                        t.height,
                        t.format
                    ),
                )
            }
            GpuResourceDescriptor::Shader(s) => {
                check(!s.source.trim().is_empty(), "shader source is empty".to_string())?;
                check_wgsl(s).map_err(|d| self.creation_error(d))
            }
            GpuResourceDescriptor::Buffer(b) => {
                check(!b.contents.is_empty(), "buffer is empty".to_string())?;
                let stride = match b.usage {
                    BufferUsage::Vertex => size_of::<Vertex>(),
                    BufferUsage::Index => size_of::<u16>(),
                    BufferUsage::Uniform => 4,
                };
                check(
                    b.contents.len() % stride == 0,
                    format!(
                        "{:?} buffer length {} is not a multiple of {stride}",
                        b.usage,
                        b.contents.len()
                    ),
                )
            }
            GpuResourceDescriptor::FontAtlas(f) => {
                let atlas = &f.atlas;
                check_extent(atlas.width(), atlas.height(), caps)
                    .map_err(|d| self.creation_error(d))?;
                check(
                    atlas.pixels().len() == atlas.width() as usize * atlas.height() as usize,
                    "atlas coverage data does not match its size".to_string(),
                )
            }
        }
    }

    pub(crate) fn info(&self) -> ResourceInfo {
        match self {
            GpuResourceDescriptor::Texture(t) => ResourceInfo::Texture {
                width: t.width,
                height: t.height,
                format: t.format,
            },
            GpuResourceDescriptor::Shader(s) => ResourceInfo::Shader {
                vertex_entry: s.vertex_entry.clone(),
                fragment_entry: s.fragment_entry.clone(),
            },
            GpuResourceDescriptor::Buffer(b) => ResourceInfo::Buffer {
                usage: b.usage,
                size: b.contents.len() as u64,
            },
            GpuResourceDescriptor::FontAtlas(f) => ResourceInfo::FontAtlas {
                width: f.atlas.width(),
                height: f.atlas.height(),
                metrics: f.atlas.metrics().clone(),
            },
        }
    }

    pub(crate) fn creation_error(&self, diagnostic: impl Into<String>) -> ResourceCreationError {
        ResourceCreationError {
            kind: self.kind(),
            label: self.label().map(str::to_string),
            diagnostic: diagnostic.into(),
        }
    }
}

macro_rules! impl_from_descriptor {
    ($($ty:ident => $variant:ident),* $(,)?) => {
        $(impl From<$ty> for GpuResourceDescriptor {
            fn from(desc: $ty) -> Self {
                GpuResourceDescriptor::$variant(desc)
            }
        })*
    };
}

impl_from_descriptor! {
    TextureDescriptor => Texture,
    ShaderDescriptor => Shader,
    BufferDescriptor => Buffer,
    FontAtlasDescriptor => FontAtlas,
}

fn check_extent(width: u32, height: u32, caps: &GraphicsCapabilities) -> Result<(), String> {
    if width == 0 || height == 0 {
        return Err(format!("zero-sized texture {width}x{height}"));
    }
    let max = caps.max_texture_size;
    if width > max || height > max {
        return Err(format!("texture {width}x{height} exceeds the {max}px limit"));
    }
    Ok(())
}

/// Highest vertex attribute location the sprite vertex layout provides.
const MAX_VERTEX_LOCATION: u32 = 2;
/// Bindings 0..=2 of group 0: viewport uniform, texture, sampler.
const MAX_BINDING: u32 = 2;

/// Compiles the WGSL through naga so broken source surfaces as a creation
/// error instead of reaching the device.
fn check_wgsl(desc: &ShaderDescriptor) -> Result<(), String> {
    use naga::valid::{Capabilities, ValidationFlags, Validator};

    let source = desc.source.as_str();
    let module = naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))?;
    Validator::new(ValidationFlags::all(), Capabilities::default())
        .validate(&module)
        .map_err(|e| e.emit_to_string(source))?;

    for (stage, name, what) in [
        (naga::ShaderStage::Vertex, &desc.vertex_entry, "vertex"),
        (naga::ShaderStage::Fragment, &desc.fragment_entry, "fragment"),
    ] {
        if !module
            .entry_points
            .iter()
            .any(|ep| ep.stage == stage && ep.name == *name)
        {
            return Err(format!("{what} entry point '{name}' not found"));
        }
    }

    let vertex = module
        .entry_points
        .iter()
        .filter(|ep| ep.stage == naga::ShaderStage::Vertex && ep.name == desc.vertex_entry);
    for ep in vertex {
        for arg in &ep.function.arguments {
            let bindings: Vec<&naga::Binding> = match &arg.binding {
                Some(binding) => vec![binding],
                None => match &module.types[arg.ty].inner {
                    naga::TypeInner::Struct { members, .. } => {
                        members.iter().filter_map(|m| m.binding.as_ref()).collect()
                    }
                    _ => Vec::new(),
                },
            };
            for binding in bindings {
                if let naga::Binding::Location { location, .. } = binding {
                    if *location > MAX_VERTEX_LOCATION {
                        return Err(format!(
                            "vertex input @location({location}) is not provided by the vertex layout"
                        ));
                    }
                }
            }
        }
    }

    for (_, global) in module.global_variables.iter() {
        let Some(rb) = &global.binding else { continue };
        if rb.group != 0 || rb.binding > MAX_BINDING {
            let name = global.name.as_deref().unwrap_or("<unnamed>");
            return Err(format!(
                "'{name}' uses @group({}) @binding({}), only group 0 bindings 0..={MAX_BINDING} exist",
                rb.group, rb.binding
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn caps() -> GraphicsCapabilities {
        GraphicsCapabilities {
            max_samples: 4,
            vsync: true,
            max_texture_size: 256,
        }
    }

    #[test]
    fn builtin_shaders_validate() {
        let sprite = GpuResourceDescriptor::Shader(ShaderDescriptor::sprite());
        assert!(sprite.validate(&caps()).is_ok());
        let text = GpuResourceDescriptor::Shader(ShaderDescriptor::text());
        assert!(text.validate(&caps()).is_ok());
    }

    #[test]
    fn shader_without_entry_point_is_rejected() {
        let desc = GpuResourceDescriptor::Shader(
            ShaderDescriptor::wgsl("@vertex fn vs_main() -> @builtin(position) vec4<f32> { return vec4<f32>(); }")
                .with_label("broken"),
        );
        let err = desc.validate(&caps()).unwrap_err();
        assert_eq!(err.kind, ResourceKind::Shader);
        assert_eq!(err.label.as_deref(), Some("broken"));
        assert!(err.diagnostic.contains("fs_main"));
    }

    #[test]
    fn wgsl_syntax_errors_become_creation_errors() {
        let desc = GpuResourceDescriptor::Shader(ShaderDescriptor::wgsl(
            "fn vs_main() -> i32 { return \"x\"; }\nfn fs_main( {",
        ));
        let err = desc.validate(&caps()).unwrap_err();
        assert_eq!(err.kind, ResourceKind::Shader);
        assert!(!err.diagnostic.trim().is_empty());
    }

    #[test]
    fn wgsl_type_errors_become_creation_errors() {
        let src = ShaderDescriptor::sprite()
            .source
            .replace("return out;", "return 1.0;");
        let err = GpuResourceDescriptor::Shader(ShaderDescriptor::wgsl(src))
            .validate(&caps())
            .unwrap_err();
        assert!(!err.diagnostic.is_empty());
    }

    #[test]
    fn entry_points_must_have_the_right_stage() {
        let src = ShaderDescriptor::sprite()
            .source
            .replace("fn fs_main", "fn fs_other");
        let err = GpuResourceDescriptor::Shader(ShaderDescriptor::wgsl(src))
            .validate(&caps())
            .unwrap_err();
        assert!(err.diagnostic.contains("fragment entry point 'fs_main'"));

        let swapped = ShaderDescriptor {
            vertex_entry: "fs_main".into(),
            ..ShaderDescriptor::sprite()
        };
        assert!(GpuResourceDescriptor::Shader(swapped).validate(&caps()).is_err());
    }

    #[test]
    fn bindings_outside_the_shared_layout_are_rejected() {
        let src = ShaderDescriptor::sprite()
            .source
            .replace("@group(0) @binding(2)", "@group(1) @binding(0)");
        let err = GpuResourceDescriptor::Shader(ShaderDescriptor::wgsl(src))
            .validate(&caps())
            .unwrap_err();
        assert!(err.diagnostic.contains("samp"));

        let src = ShaderDescriptor::sprite()
            .source
            .replace("@location(2) color", "@location(5) color");
        let err = GpuResourceDescriptor::Shader(ShaderDescriptor::wgsl(src))
            .validate(&caps())
            .unwrap_err();
        assert!(err.diagnostic.contains("@location(5)"));
    }

    #[test]
    fn texture_size_limits_apply() {
        let big = GpuResourceDescriptor::Texture(TextureDescriptor::rgba8(
            512,
            1,
            vec![0; 512 * 4],
        ));
        assert!(big.validate(&caps()).unwrap_err().diagnostic.contains("limit"));

        let empty = GpuResourceDescriptor::Texture(TextureDescriptor::rgba8(0, 4, Vec::new()));
        assert!(empty.validate(&caps()).is_err());
    }

    #[test]
    fn texture_pixel_length_must_match() {
        let desc = GpuResourceDescriptor::Texture(TextureDescriptor::rgba8(2, 2, vec![0; 15]));
        assert!(desc.validate(&caps()).is_err());
        let desc = GpuResourceDescriptor::Texture(TextureDescriptor::rgba8(2, 2, vec![0; 16]));
        assert!(desc.validate(&caps()).is_ok());
    }

    #[test]
    fn vertex_buffer_must_hold_whole_vertices() {
        let mut desc = BufferDescriptor::vertices(&[Vertex::default(); 3]);
        assert!(GpuResourceDescriptor::Buffer(desc.clone()).validate(&caps()).is_ok());
        desc.contents.pop();
        assert!(GpuResourceDescriptor::Buffer(desc).validate(&caps()).is_err());
        let empty = BufferDescriptor::indices(&[]);
        assert!(GpuResourceDescriptor::Buffer(empty).validate(&caps()).is_err());
    }

    #[test]
    fn png_decodes_premultiplied() {
        let img = image::RgbaImage::from_pixel(3, 2, image::Rgba([255, 128, 0, 128]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let tex = TextureDescriptor::decode(&bytes).unwrap();
        assert_eq!((tex.width, tex.height), (3, 2));
        assert_eq!(tex.pixels.len(), 3 * 2 * 4);
        assert_eq!(&tex.pixels[..4], &[128, 64, 0, 128]);
    }

    #[test]
    fn garbage_image_bytes_fail_to_decode() {
        let err = TextureDescriptor::decode(b"definitely not a png").unwrap_err();
        assert_eq!(err.what, "image");
    }
}
