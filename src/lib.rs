//! # DICOM Viewer
//!
//! Core of a DICOM image viewer: turns a batch of files into a
//! Study / Series / Instance hierarchy, keeps viewer state in an observable
//! store, and keeps a rendering surface synchronized with that state.
//!
//! ## Features
//!
//! - **Deterministic assembly**: records are grouped by series and ordered by
//!   series and instance number
//! - **Observable state**: every mutation publishes one complete, immutable snapshot
//! - **Stale-load suppression**: pixel loads that complete after a newer
//!   selection are discarded, never displayed
//! - **Pluggable collaborators**: metadata extraction and rendering sit behind traits
//!
//! ## Architecture
//!
//! - [`study`] - Hierarchy types and assembly
//! - [`metadata`] - File sources, DICOM metadata extraction and batch loading
//! - [`state`] - Viewer state store and viewport settings
//! - [`viewport`] - Rendering adapter contract and synchronization engine
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use dicom_viewer::{
//!     DicomMetadataExtractor, HeadlessRenderer, LocalFileSource, StudyLoader, SurfaceHandle,
//!     ViewerStateStore, ViewportSyncEngine,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = ViewerStateStore::new();
//!     let loader = StudyLoader::new(store.clone(), DicomMetadataExtractor::new());
//!     loader.load(vec![LocalFileSource::new("ct/1.dcm")]).await?;
//!
//!     let mut engine = ViewportSyncEngine::new(store.clone(), Arc::new(HeadlessRenderer::new()));
//!     engine.attach(SurfaceHandle::new("main"))?;
//!     engine.complete_next_load().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod metadata;
pub mod state;
pub mod study;
pub mod viewport;

// Re-export commonly used types
pub use config::{Cli, Command, InspectConfig, OutputFormat, ReplayConfig};
pub use error::{AssembleError, LoadError, RenderError};
pub use metadata::{
    DicomMetadataExtractor, FileSource, LocalFileSource, MemorySource, MetadataExtractor,
    StudyLoader,
};
pub use state::{
    Pan, Selection, StateSubscription, ViewerState, ViewerStateStore, ViewportPatch,
    ViewportSettings,
};
pub use study::{
    assemble, Instance, InstanceRecord, PixelGeometry, PixelRef, Series, SeriesTags, Study,
    StudyTags,
};
pub use viewport::{
    EnginePhase, EngineStats, HeadlessRenderer, LoadDisposition, RenderingAdapter,
    SurfaceHandle, ToolName, ViewportSyncEngine,
};
