//! File access, metadata extraction and batch loading.
//!
//! ```text
//! FileSource ──read_all──► MetadataExtractor ──► InstanceRecord ─┐
//!     (one task per file, results kept in input order)           │
//!                                                                ▼
//!                          ViewerStateStore ◄── StudyLoader ◄── assemble
//! ```

mod extractor;
mod loader;
mod source;

pub use extractor::{DicomMetadataExtractor, MetadataExtractor};
pub use loader::{StudyLoader, DEFAULT_MAX_CONCURRENT_READS};
pub use source::{FileSource, LocalFileSource, MemorySource};
