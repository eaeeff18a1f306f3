//! Command-line configuration for the DICOM viewer tools.
//!
//! Two subcommands share one binary:
//! - `inspect` loads a batch of files and prints the assembled hierarchy
//! - `replay` loads a batch and steps a headless viewport through it
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use dicom_viewer::config::{Cli, Command};
//!
//! let cli = Cli::parse();
//! match cli.command {
//!     Command::Inspect(config) => println!("{} file(s)", config.files.len()),
//!     Command::Replay(config) => println!("zoom {}", config.zoom),
//! }
//! ```
//!
//! # Environment Variables
//!
//! Options can also be set via environment variables with the `VIEWER_` prefix:
//!
//! - `VIEWER_FORMAT` - Inspect output format (default: text)
//! - `VIEWER_TOOL` - Tool to bind during replay
//! - `VIEWER_WINDOW_WIDTH` - Window width (default: 400)
//! - `VIEWER_WINDOW_LEVEL` - Window level (default: 50)
//! - `VIEWER_ZOOM` - Zoom factor (default: 1.0)

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::state::{
    Pan, ViewportSettings, DEFAULT_WINDOW_LEVEL, DEFAULT_WINDOW_WIDTH, DEFAULT_ZOOM,
};
use crate::viewport::ToolName;

// =============================================================================
// Default Values
// =============================================================================

/// Default surface identifier used by the replay command.
pub const DEFAULT_SURFACE: &str = "headless";

// =============================================================================
// CLI Arguments
// =============================================================================

/// DICOM viewer core tools.
///
/// Loads DICOM files into a study hierarchy and drives a viewport from it.
#[derive(Parser, Debug, Clone)]
#[command(name = "dicom-viewer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Load files and print the assembled study.
    Inspect(InspectConfig),

    /// Load files and step a headless viewport through every instance.
    Replay(ReplayConfig),
}

/// Output format for the inspect command.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Indented tree for humans
    #[default]
    Text,

    /// The hierarchy as JSON
    Json,
}

// =============================================================================
// Inspect Command
// =============================================================================

#[derive(clap::Args, Debug, Clone)]
pub struct InspectConfig {
    /// DICOM files forming one study.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, env = "VIEWER_FORMAT")]
    pub format: OutputFormat,
}

impl InspectConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        validate_files(&self.files)
    }
}

// =============================================================================
// Replay Command
// =============================================================================

#[derive(clap::Args, Debug, Clone)]
pub struct ReplayConfig {
    /// DICOM files forming one study.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Tool to bind on the surface (Pan, Zoom, WindowLevel, StackScroll).
    #[arg(long, env = "VIEWER_TOOL")]
    pub tool: Option<String>,

    /// Window width applied before stepping.
    #[arg(long, default_value_t = DEFAULT_WINDOW_WIDTH, env = "VIEWER_WINDOW_WIDTH")]
    pub window_width: f64,

    /// Window level (center) applied before stepping.
    #[arg(
        long,
        default_value_t = DEFAULT_WINDOW_LEVEL,
        env = "VIEWER_WINDOW_LEVEL",
        allow_negative_numbers = true
    )]
    pub window_level: f64,

    /// Zoom factor applied before stepping.
    #[arg(long, default_value_t = DEFAULT_ZOOM, env = "VIEWER_ZOOM")]
    pub zoom: f64,
}

impl ReplayConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        validate_files(&self.files)?;

        if self.window_width.is_nan() || self.window_width <= 0.0 {
            return Err("window_width must be greater than 0".to_string());
        }

        if self.zoom.is_nan() || self.zoom < 0.0 {
            return Err("zoom must not be negative".to_string());
        }

        if let Some(tool) = &self.tool {
            tool.parse::<ToolName>().map_err(|_| {
                format!(
                    "Unknown tool '{}'. Expected one of: {}",
                    tool,
                    ToolName::ALL.map(|t| t.as_str()).join(", ")
                )
            })?;
        }

        Ok(())
    }

    /// Viewport settings requested on the command line.
    pub fn viewport(&self) -> ViewportSettings {
        ViewportSettings {
            window_width: self.window_width,
            window_level: self.window_level,
            zoom: self.zoom,
            pan: Pan::default(),
        }
    }
}

fn validate_files(files: &[PathBuf]) -> Result<(), String> {
    if files.is_empty() {
        return Err("At least one input file is required".to_string());
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
