use thiserror::Error;

/// Errors raised while assembling a study hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssembleError {
    /// A study cannot exist without at least one instance
    #[error("Cannot assemble a study from an empty batch")]
    EmptyInput,
}

/// Errors that can occur while loading a batch of files into a study
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// Raw byte access to a file failed
    #[error("Failed to read {source_id}: {message}")]
    FileRead { source_id: String, message: String },

    /// The metadata extractor rejected the file content
    #[error("Failed to parse metadata from {source_id}: {message}")]
    MetadataParse { source_id: String, message: String },

    /// The extracted records could not be assembled
    #[error("{0}")]
    Assemble(#[from] AssembleError),
}

/// Errors reported by a rendering adapter
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// An adapter call was made before a surface was attached
    #[error("Rendering surface is not ready")]
    SurfaceNotReady,

    /// The adapter does not know the requested tool
    #[error("Unknown tool: {tool}")]
    ToolBind { tool: String },

    /// Pixel data for a reference could not be loaded
    #[error("Failed to load pixel data for {pixel_ref}: {message}")]
    PixelLoad { pixel_ref: String, message: String },

    /// Any other adapter-specific failure
    #[error("Rendering adapter error: {0}")]
    Adapter(String),
}
