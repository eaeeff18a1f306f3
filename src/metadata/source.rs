use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::LoadError;
use crate::study::PixelRef;

/// Trait for reading the raw bytes of one image file.
///
/// This abstraction lets the loader work with local files, in-memory
/// buffers or any other backend without knowing where the bytes live.
#[async_trait]
pub trait FileSource: Send + Sync {
    /// Read the whole file.
    async fn read_all(&self) -> Result<Bytes, LoadError>;

    /// Get a unique identifier for this file (for logging and error reports).
    fn identifier(&self) -> &str;

    /// Reference the rendering adapter will later use to load the pixels.
    ///
    /// Defaults to the identifier.
    fn pixel_ref(&self) -> PixelRef {
        PixelRef::new(self.identifier())
    }
}

// =============================================================================
// Local Files
// =============================================================================

/// A file on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalFileSource {
    path: PathBuf,
    identifier: String,
}

impl LocalFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let identifier = path.display().to_string();
        Self { path, identifier }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl FileSource for LocalFileSource {
    async fn read_all(&self) -> Result<Bytes, LoadError> {
        tokio::fs::read(&self.path)
            .await
            .map(Bytes::from)
            .map_err(|e| LoadError::FileRead {
                source_id: self.identifier.clone(),
                message: e.to_string(),
            })
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

// =============================================================================
// In-Memory Buffers
// =============================================================================

/// A file whose bytes are already in memory.
#[derive(Debug, Clone)]
pub struct MemorySource {
    identifier: String,
    data: Bytes,
}

impl MemorySource {
    pub fn new(identifier: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            identifier: identifier.into(),
            data: data.into(),
        }
    }
}

#[async_trait]
impl FileSource for MemorySource {
    async fn read_all(&self) -> Result<Bytes, LoadError> {
        Ok(self.data.clone())
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}
