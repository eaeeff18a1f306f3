//! Viewport display settings.

use serde::Serialize;

// =============================================================================
// Default Values
// =============================================================================

/// Default window width (display contrast range).
pub const DEFAULT_WINDOW_WIDTH: f64 = 400.0;

/// Default window level (center of the display range).
pub const DEFAULT_WINDOW_LEVEL: f64 = 50.0;

/// Default zoom factor.
pub const DEFAULT_ZOOM: f64 = 1.0;

// =============================================================================
// Settings
// =============================================================================

/// Pan offset in the rendering surface's coordinate space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Pan {
    pub x: f64,
    pub y: f64,
}

impl Pan {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Complete viewport settings.
///
/// | Field          | Default |
/// |----------------|---------|
/// | `window_width` | 400     |
/// | `window_level` | 50      |
/// | `zoom`         | 1.0     |
/// | `pan`          | (0, 0)  |
///
/// The store performs no clamping; zoom is expected to be non-negative.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ViewportSettings {
    pub window_width: f64,
    pub window_level: f64,
    pub zoom: f64,
    pub pan: Pan,
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self {
            window_width: DEFAULT_WINDOW_WIDTH,
            window_level: DEFAULT_WINDOW_LEVEL,
            zoom: DEFAULT_ZOOM,
            pan: Pan::default(),
        }
    }
}

impl ViewportSettings {
    /// Return a copy with every field set in `patch` replaced.
    pub fn merged(mut self, patch: &ViewportPatch) -> Self {
        if let Some(window_width) = patch.window_width {
            self.window_width = window_width;
        }
        if let Some(window_level) = patch.window_level {
            self.window_level = window_level;
        }
        if let Some(zoom) = patch.zoom {
            self.zoom = zoom;
        }
        if let Some(pan) = patch.pan {
            self.pan = pan;
        }
        self
    }
}

/// Partial update to [`ViewportSettings`]; `None` fields are left unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ViewportPatch {
    pub window_width: Option<f64>,
    pub window_level: Option<f64>,
    pub zoom: Option<f64>,
    pub pan: Option<Pan>,
}

impl ViewportPatch {
    /// Patch only the window/level pair.
    pub fn window_level(width: f64, level: f64) -> Self {
        Self {
            window_width: Some(width),
            window_level: Some(level),
            ..Self::default()
        }
    }

    /// Patch only the zoom factor.
    pub fn zoom(zoom: f64) -> Self {
        Self {
            zoom: Some(zoom),
            ..Self::default()
        }
    }

    /// Patch only the pan offset.
    pub fn pan(x: f64, y: f64) -> Self {
        Self {
            pan: Some(Pan::new(x, y)),
            ..Self::default()
        }
    }

    /// A patch that sets every field.
    pub fn full(settings: ViewportSettings) -> Self {
        Self {
            window_width: Some(settings.window_width),
            window_level: Some(settings.window_level),
            zoom: Some(settings.zoom),
            pan: Some(settings.pan),
        }
    }
}
