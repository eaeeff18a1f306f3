//! Observable viewer state store.
//!
//! The store holds one immutable [`ViewerState`] snapshot at a time. Every
//! mutation clones the current snapshot, applies one targeted change, bumps
//! the revision and publishes the result as a new snapshot. Readers and
//! subscribers therefore only ever see a complete pre- or post-state.
//!
//! Subscribers receive full snapshots, never diffs. A subscriber interested
//! in a finer-grained change (e.g. "the current instance changed") compares
//! the new snapshot against the one it observed previously.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::study::{Instance, Study};

use super::settings::{ViewportPatch, ViewportSettings};

// =============================================================================
// Viewer State
// =============================================================================

/// Immutable snapshot of everything the UI needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewerState {
    /// Active hierarchy, if one has been loaded
    pub study: Option<Arc<Study>>,

    /// Identifier of the selected series
    pub current_series: Option<String>,

    /// The selected instance
    pub current_instance: Option<Instance>,

    /// Window/level, zoom and pan
    pub viewport: ViewportSettings,

    /// Name of the selected tool
    pub active_tool: Option<String>,

    /// Whether the selected tool is currently engaged
    pub tool_active: bool,

    /// Whether a batch load is in progress
    pub loading: bool,

    /// Last error message surfaced to the user
    pub error: Option<String>,

    /// Incremented by every mutation
    pub revision: u64,
}

impl ViewerState {
    /// Identifier of the selected instance.
    pub fn current_instance_id(&self) -> Option<&str> {
        self.current_instance.as_ref().map(|i| i.id.as_str())
    }
}

/// Selection to install together with a new study.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub series_id: Option<String>,
    pub instance: Option<Instance>,
}

impl Selection {
    /// Select the first series of a study and its first instance.
    pub fn first_of(study: &Study) -> Self {
        let series = study.series.first();
        Self {
            series_id: series.map(|s| s.id.clone()),
            instance: series.and_then(|s| s.first_instance()).cloned(),
        }
    }
}

// =============================================================================
// Store
// =============================================================================

/// Single source of truth for viewer state.
///
/// The store is a cheap handle: clones share the same state. It is created
/// explicitly and passed to the components that need it.
///
/// # Example
///
/// ```
/// use dicom_viewer::state::{ViewerStateStore, ViewportPatch};
///
/// let store = ViewerStateStore::new();
/// store.set_viewport_settings(ViewportPatch::zoom(2.0));
///
/// let snapshot = store.snapshot();
/// assert_eq!(snapshot.viewport.zoom, 2.0);
/// assert_eq!(snapshot.revision, 1);
/// ```
#[derive(Debug, Clone)]
pub struct ViewerStateStore {
    sender: Arc<watch::Sender<Arc<ViewerState>>>,
}

impl Default for ViewerStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewerStateStore {
    /// Create a store holding the default state.
    pub fn new() -> Self {
        let (sender, _receiver) = watch::channel(Arc::new(ViewerState::default()));
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Get the current snapshot.
    pub fn snapshot(&self) -> Arc<ViewerState> {
        self.sender.borrow().clone()
    }

    /// Subscribe to state changes.
    ///
    /// The current snapshot counts as already observed.
    pub fn subscribe(&self) -> StateSubscription {
        StateSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    /// Apply one mutation and publish the resulting snapshot.
    fn update(&self, operation: &'static str, apply: impl FnOnce(&mut ViewerState)) {
        self.sender.send_modify(|current| {
            let mut next = ViewerState::clone(current);
            apply(&mut next);
            next.revision = current.revision + 1;
            debug!(operation, revision = next.revision, "State updated");
            *current = Arc::new(next);
        });
    }

    /// Install a new hierarchy and clear the current selection.
    pub fn set_study(&self, study: impl Into<Arc<Study>>) {
        let study = study.into();
        self.update("set_study", |state| {
            state.study = Some(study);
            state.current_series = None;
            state.current_instance = None;
        });
    }

    /// Install a new hierarchy and select within it in the same step.
    ///
    /// Any part of `selection` that does not belong to `study` is dropped.
    pub fn set_study_and_select(&self, study: impl Into<Arc<Study>>, selection: Selection) {
        let study = study.into();
        let series_id = selection
            .series_id
            .filter(|id| study.find_series(id).is_some());
        let instance = selection
            .instance
            .filter(|instance| study.contains_instance(instance));

        self.update("set_study_and_select", |state| {
            state.study = Some(study);
            state.current_series = series_id;
            state.current_instance = instance;
        });
    }

    /// Remove the hierarchy together with any selection.
    pub fn clear_study(&self) {
        self.update("clear_study", |state| {
            state.study = None;
            state.current_series = None;
            state.current_instance = None;
        });
    }

    /// Select a series.
    ///
    /// The store does not check that the series exists in the current study;
    /// that is the caller's responsibility.
    pub fn set_current_series(&self, series_id: impl Into<String>) {
        let series_id = series_id.into();
        self.update("set_current_series", |state| {
            state.current_series = Some(series_id);
        });
    }

    /// Select an instance. Not validated against the current study.
    pub fn set_current_instance(&self, instance: Instance) {
        self.update("set_current_instance", |state| {
            state.current_instance = Some(instance);
        });
    }

    /// Shallow-merge a patch into the viewport settings. No clamping.
    pub fn set_viewport_settings(&self, patch: ViewportPatch) {
        self.update("set_viewport_settings", |state| {
            state.viewport = state.viewport.merged(&patch);
        });
    }

    /// Select a tool by name.
    pub fn set_active_tool(&self, tool: impl Into<String>) {
        let tool = tool.into();
        self.update("set_active_tool", |state| {
            state.active_tool = Some(tool);
        });
    }

    pub fn set_tool_active(&self, active: bool) {
        self.update("set_tool_active", |state| {
            state.tool_active = active;
        });
    }

    pub fn set_loading(&self, loading: bool) {
        self.update("set_loading", |state| {
            state.loading = loading;
        });
    }

    pub fn set_error(&self, error: Option<String>) {
        self.update("set_error", |state| {
            state.error = error;
        });
    }

    /// Restore every field to its default in one step.
    ///
    /// The revision keeps counting so subscribers see the reset as a change.
    pub fn reset(&self) {
        self.update("reset", |state| {
            *state = ViewerState::default();
        });
    }
}

// =============================================================================
// Subscription
// =============================================================================

/// Receives snapshots published by a [`ViewerStateStore`].
///
/// Snapshots published while the subscriber is not polling are coalesced:
/// the subscriber wakes up once and observes the latest complete state.
#[derive(Debug)]
pub struct StateSubscription {
    receiver: watch::Receiver<Arc<ViewerState>>,
}

impl StateSubscription {
    /// Wait for the next published snapshot.
    ///
    /// Returns `None` once every handle to the store has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<ViewerState>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// The most recently published snapshot, without waiting.
    pub fn current(&self) -> Arc<ViewerState> {
        self.receiver.borrow().clone()
    }
}
