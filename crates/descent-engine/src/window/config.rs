use crate::error::GraphicsRequest;
use crate::paint::Color;

/// Window and graphics context configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowConfig {
    /// Inner size in logical pixels.
    pub size: (u32, u32),
    pub title: String,
    pub resizable: bool,
    pub vsync_enabled: bool,
    /// MSAA sample count. Must be a power of two.
    pub samples: u32,
    pub fullscreen: bool,
    pub visible: bool,
    /// Color every frame starts from.
    pub clear_color: Color,
    /// Pick an sRGB surface format when the platform offers one.
    pub prefer_srgb: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            size: (800, 600),
            title: "descent".to_string(),
            resizable: true,
            vsync_enabled: true,
            samples: 1,
            fullscreen: false,
            visible: true,
            clear_color: Color::BLACK,
            prefer_srgb: true,
        }
    }
}

impl WindowConfig {
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = (width, height);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_resizable(mut self, resizable: bool) -> Self {
        self.resizable = resizable;
        self
    }

    pub fn with_vsync(mut self, enabled: bool) -> Self {
        self.vsync_enabled = enabled;
        self
    }

    pub fn with_samples(mut self, samples: u32) -> Self {
        self.samples = samples;
        self
    }

    pub fn with_fullscreen(mut self, fullscreen: bool) -> Self {
        self.fullscreen = fullscreen;
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn with_clear_color(mut self, color: Color) -> Self {
        self.clear_color = color;
        self
    }

    pub fn with_prefer_srgb(mut self, prefer: bool) -> Self {
        self.prefer_srgb = prefer;
        self
    }

    /// The part of the configuration the graphics context has to honor.
    pub fn request(&self) -> GraphicsRequest {
        GraphicsRequest {
            samples: self.samples,
            vsync: self.vsync_enabled,
        }
    }
}
