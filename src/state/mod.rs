//! Viewer state: the observable store and the viewport settings it holds.
//!
//! ```text
//!  StudyLoader ──┐                     ┌──► ViewportSyncEngine
//!                ▼                     │
//!  UI actions ─► ViewerStateStore ─────┤  (full snapshots)
//!                                      └──► other subscribers
//! ```

mod settings;
mod store;

pub use settings::{
    Pan, ViewportPatch, ViewportSettings, DEFAULT_WINDOW_LEVEL, DEFAULT_WINDOW_WIDTH, DEFAULT_ZOOM,
};
pub use store::{Selection, StateSubscription, ViewerState, ViewerStateStore};
