//! In-process rendering adapter without a display.
//!
//! Pixel references are treated as local file paths. The renderer keeps the
//! surface properties it was given so callers can inspect what a real
//! surface would show.

use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, trace};

use crate::error::RenderError;
use crate::state::{Pan, ViewportSettings};
use crate::study::PixelRef;

use super::adapter::{RenderingAdapter, SurfaceHandle};
use super::tools::ToolName;

/// Raw pixel file contents held by the headless surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessImage {
    pub pixel_ref: PixelRef,
    pub data: Bytes,
}

/// Everything the headless surface currently shows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SurfaceSnapshot {
    pub surface: Option<SurfaceHandle>,
    pub image: Option<PixelRef>,
    pub tool: Option<ToolName>,
    pub viewport: ViewportSettings,
    pub frames_rendered: usize,
    pub surfaces_created: usize,
    pub surfaces_destroyed: usize,
}

/// Rendering adapter that reads pixels from disk and renders nowhere.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    surface: Mutex<SurfaceSnapshot>,
    displayed: Mutex<Option<HeadlessImage>>,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current surface properties.
    pub fn snapshot(&self) -> SurfaceSnapshot {
        self.lock().clone()
    }

    /// The image currently on the surface.
    pub fn displayed(&self) -> Option<HeadlessImage> {
        self.displayed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn lock(&self) -> MutexGuard<'_, SurfaceSnapshot> {
        self.surface.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the surface, failing when none is attached.
    fn attached(&self) -> Result<MutexGuard<'_, SurfaceSnapshot>, RenderError> {
        let guard = self.lock();
        if guard.surface.is_none() {
            return Err(RenderError::SurfaceNotReady);
        }
        Ok(guard)
    }
}

#[async_trait]
impl RenderingAdapter for HeadlessRenderer {
    type Image = HeadlessImage;

    fn create_surface(&self, handle: &SurfaceHandle) -> Result<(), RenderError> {
        let mut surface = self.lock();
        if let Some(existing) = &surface.surface {
            return Err(RenderError::Adapter(format!(
                "surface {existing} is still attached"
            )));
        }
        surface.surface = Some(handle.clone());
        surface.viewport = ViewportSettings::default();
        surface.surfaces_created += 1;
        debug!(surface = %handle, "Created headless surface");
        Ok(())
    }

    async fn load_pixel_data(&self, pixel_ref: &PixelRef) -> Result<HeadlessImage, RenderError> {
        let data = tokio::fs::read(pixel_ref.as_str())
            .await
            .map_err(|e| RenderError::PixelLoad {
                pixel_ref: pixel_ref.to_string(),
                message: e.to_string(),
            })?;

        trace!(pixel_ref = %pixel_ref, bytes = data.len(), "Loaded pixel data");
        Ok(HeadlessImage {
            pixel_ref: pixel_ref.clone(),
            data: Bytes::from(data),
        })
    }

    fn display(&self, image: HeadlessImage) -> Result<(), RenderError> {
        let mut surface = self.attached()?;
        surface.image = Some(image.pixel_ref.clone());
        *self.displayed.lock().unwrap_or_else(PoisonError::into_inner) = Some(image);
        Ok(())
    }

    fn set_window_level(&self, width: f64, center: f64) -> Result<(), RenderError> {
        let mut surface = self.attached()?;
        surface.viewport.window_width = width;
        surface.viewport.window_level = center;
        Ok(())
    }

    fn set_zoom(&self, factor: f64) -> Result<(), RenderError> {
        self.attached()?.viewport.zoom = factor;
        Ok(())
    }

    fn set_pan(&self, x: f64, y: f64) -> Result<(), RenderError> {
        self.attached()?.viewport.pan = Pan::new(x, y);
        Ok(())
    }

    fn bind_tool(&self, tool: &str) -> Result<(), RenderError> {
        let tool: ToolName = tool.parse()?;
        self.attached()?.tool = Some(tool);
        debug!(%tool, "Bound headless tool");
        Ok(())
    }

    fn reset_camera(&self) -> Result<(), RenderError> {
        self.attached()?.viewport = ViewportSettings::default();
        Ok(())
    }

    fn render(&self) -> Result<(), RenderError> {
        let mut surface = self.attached()?;
        surface.frames_rendered += 1;
        trace!(
            image = ?surface.image,
            frame = surface.frames_rendered,
            "Rendered headless frame"
        );
        Ok(())
    }

    fn destroy(&self) {
        let mut surface = self.lock();
        if let Some(handle) = surface.surface.take() {
            surface.image = None;
            surface.tool = None;
            surface.surfaces_destroyed += 1;
            debug!(surface = %handle, "Destroyed headless surface");
        }
        *self.displayed.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
