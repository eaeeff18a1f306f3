use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::RenderError;

/// Interaction tools a rendering surface can bind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ToolName {
    /// Drag to move the image
    Pan,

    /// Drag to magnify
    Zoom,

    /// Drag to adjust window width and center
    WindowLevel,

    /// Scroll through the instances of a series
    StackScroll,
}

impl ToolName {
    /// Every known tool.
    pub const ALL: [ToolName; 4] = [
        ToolName::Pan,
        ToolName::Zoom,
        ToolName::WindowLevel,
        ToolName::StackScroll,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::Pan => "Pan",
            ToolName::Zoom => "Zoom",
            ToolName::WindowLevel => "WindowLevel",
            ToolName::StackScroll => "StackScroll",
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolName {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolName::ALL
            .into_iter()
            .find(|tool| tool.as_str() == s)
            .ok_or_else(|| RenderError::ToolBind {
                tool: s.to_string(),
            })
    }
}
