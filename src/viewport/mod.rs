//! Rendering surface synchronization.
//!
//! - [`RenderingAdapter`]: contract for the stateful rendering collaborator
//! - [`ViewportSyncEngine`]: drives an adapter from viewer state snapshots
//! - [`HeadlessRenderer`]: adapter that renders nowhere, for tooling and tests

mod adapter;
mod engine;
mod headless;
mod tools;

pub use adapter::{RenderingAdapter, SurfaceHandle};
pub use engine::{EnginePhase, EngineStats, LoadDisposition, ViewportSyncEngine};
pub use headless::{HeadlessImage, HeadlessRenderer, SurfaceSnapshot};
pub use tools::ToolName;
