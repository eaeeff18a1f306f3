use std::fmt;

use async_trait::async_trait;

use crate::error::RenderError;
use crate::study::PixelRef;

/// Handle to a drawable host surface.
///
/// The handle is opaque to the engine; adapters interpret the identifier
/// however their backend requires.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SurfaceHandle {
    id: String,
}

impl SurfaceHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for SurfaceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Trait for the stateful rendering collaborator driven by the engine.
///
/// Every call except [`load_pixel_data`](Self::load_pixel_data) is a
/// synchronous, fire-and-forget instruction. Pixel loads are the only awaited
/// boundary and may complete in any order.
///
/// Implementations hold their own interior state: the engine shares the
/// adapter with the tasks it spawns for pixel loads.
#[async_trait]
pub trait RenderingAdapter: Send + Sync {
    /// Decoded pixel data ready to be shown on the surface.
    type Image: Send + 'static;

    /// Create the rendering context for a host surface.
    ///
    /// Called exactly once per surface lifetime.
    fn create_surface(&self, handle: &SurfaceHandle) -> Result<(), RenderError>;

    /// Load the pixel data behind a reference.
    async fn load_pixel_data(&self, pixel_ref: &PixelRef) -> Result<Self::Image, RenderError>;

    /// Hand loaded pixels to the surface.
    fn display(&self, image: Self::Image) -> Result<(), RenderError>;

    /// Set window width and window center.
    fn set_window_level(&self, width: f64, center: f64) -> Result<(), RenderError>;

    fn set_zoom(&self, factor: f64) -> Result<(), RenderError>;

    fn set_pan(&self, x: f64, y: f64) -> Result<(), RenderError>;

    /// Bind an interaction tool by name.
    ///
    /// Unknown names fail with [`RenderError::ToolBind`].
    fn bind_tool(&self, tool: &str) -> Result<(), RenderError>;

    /// Reset camera and display properties to the adapter's defaults.
    fn reset_camera(&self) -> Result<(), RenderError>;

    fn render(&self) -> Result<(), RenderError>;

    /// Release the rendering context. Must not fail.
    fn destroy(&self);
}
