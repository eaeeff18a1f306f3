//! Viewport synchronization engine.
//!
//! The engine observes [`ViewerStateStore`] snapshots and turns the
//! differences into calls on a [`RenderingAdapter`].
//!
//! ```text
//!                 attach(handle)
//!  Uninitialized ────────────────► Attached ◄──────────────┐
//!        ▲                            │                    │ load completed
//!        │ detach()                   │ instance selected  │ (applied, failed
//!        │                            ▼                    │  or discarded)
//!        └──────────────────── Loading(instance id) ───────┘
//! ```
//!
//! Pixel loads cannot be cancelled. Each load is tagged with the surface
//! epoch and the instance it was started for; at completion the tag is
//! compared against the live surface and the store's current selection, and
//! a mismatch discards the result without touching the surface.

use std::future::Future;
use std::sync::Arc;

use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

use crate::error::RenderError;
use crate::state::{
    StateSubscription, ViewerState, ViewerStateStore, ViewportPatch, ViewportSettings,
};
use crate::study::Instance;

use super::adapter::{RenderingAdapter, SurfaceHandle};

// =============================================================================
// Phases and Outcomes
// =============================================================================

/// Lifecycle phase of the engine's surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnginePhase {
    /// No surface is attached
    Uninitialized,

    /// A surface is attached and idle
    Attached,

    /// A pixel load for the given instance is outstanding
    Loading(String),
}

/// What happened to a completed pixel load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadDisposition {
    /// The pixels were displayed and the surface rendered
    Applied { instance_id: String },

    /// The load was superseded and its result dropped
    Discarded { instance_id: String },

    /// The load failed; the error was written to the store
    Failed {
        instance_id: String,
        error: RenderError,
    },
}

/// Counters describing the engine's work so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    pub loads_started: usize,
    pub frames_displayed: usize,
    pub loads_discarded: usize,
    pub loads_failed: usize,
}

/// A pixel load that has finished, with the tag it was started under.
struct CompletedLoad<I> {
    epoch: u64,
    instance_id: String,
    result: Result<I, RenderError>,
}

/// Values of the last snapshot the engine reacted to.
#[derive(Debug, Default)]
struct Observed {
    instance_id: Option<String>,
    tool: Option<String>,
    viewport: ViewportSettings,
}

// =============================================================================
// Engine
// =============================================================================

/// Drives one rendering surface from the viewer state.
///
/// The engine exclusively owns its surface: the adapter's context is created
/// on [`attach`](Self::attach) and destroyed on [`detach`](Self::detach) or
/// when the engine is dropped.
///
/// # Example
///
/// ```ignore
/// let store = ViewerStateStore::new();
/// let mut engine = ViewportSyncEngine::new(store.clone(), Arc::new(HeadlessRenderer::new()));
/// engine.attach(SurfaceHandle::new("main"))?;
///
/// store.set_current_instance(instance);
/// engine.sync();
/// engine.complete_next_load().await;
/// ```
pub struct ViewportSyncEngine<A: RenderingAdapter + 'static> {
    store: ViewerStateStore,
    adapter: Arc<A>,
    subscription: StateSubscription,
    surface: Option<SurfaceHandle>,
    epoch: u64,
    phase: EnginePhase,
    observed: Observed,
    applied: Option<ViewportSettings>,
    loads: JoinSet<CompletedLoad<A::Image>>,
    stats: EngineStats,
}

impl<A: RenderingAdapter + 'static> ViewportSyncEngine<A> {
    /// Create an engine with no surface attached.
    pub fn new(store: ViewerStateStore, adapter: Arc<A>) -> Self {
        let subscription = store.subscribe();
        let observed = observe(&store.snapshot());
        Self {
            store,
            adapter,
            subscription,
            surface: None,
            epoch: 0,
            phase: EnginePhase::Uninitialized,
            observed,
            applied: None,
            loads: JoinSet::new(),
            stats: EngineStats::default(),
        }
    }

    pub fn phase(&self) -> &EnginePhase {
        &self.phase
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn adapter(&self) -> &Arc<A> {
        &self.adapter
    }

    /// Number of pixel loads that have not completed yet.
    pub fn pending_loads(&self) -> usize {
        self.loads.len()
    }

    pub fn is_attached(&self) -> bool {
        self.surface.is_some()
    }

    // -------------------------------------------------------------------------
    // Surface Lifecycle
    // -------------------------------------------------------------------------

    /// Attach a drawable surface.
    ///
    /// Calling this while a surface is already attached does nothing. After
    /// the context is created, the current tool is bound, the current
    /// settings are applied and the current instance, if any, is loaded.
    pub fn attach(&mut self, handle: SurfaceHandle) -> Result<(), RenderError> {
        if let Some(current) = &self.surface {
            debug!(surface = %current, "Surface already attached");
            return Ok(());
        }

        self.adapter.create_surface(&handle)?;
        self.epoch += 1;
        info!(surface = %handle, epoch = self.epoch, "Attached rendering surface");
        self.surface = Some(handle);
        self.phase = EnginePhase::Attached;
        self.applied = None;

        let state = self.store.snapshot();
        self.observed = observe(&state);

        if let Some(tool) = &state.active_tool {
            self.bind_tool(tool);
        }
        self.apply_settings(&state.viewport);
        if let Some(instance) = &state.current_instance {
            self.start_load(instance);
        }
        Ok(())
    }

    /// Release the surface.
    ///
    /// The adapter's context is destroyed exactly once. Loads still in flight
    /// will be discarded when they complete.
    pub fn detach(&mut self) {
        if let Some(handle) = self.surface.take() {
            self.adapter.destroy();
            self.phase = EnginePhase::Uninitialized;
            self.applied = None;
            info!(surface = %handle, "Detached rendering surface");
        }
    }

    // -------------------------------------------------------------------------
    // State Synchronization
    // -------------------------------------------------------------------------

    /// React to the store's current snapshot.
    ///
    /// Each field is compared against the last observed value, and only
    /// changed fields produce adapter calls.
    pub fn sync(&mut self) {
        let state = self.store.snapshot();
        let attached = self.surface.is_some();

        if state.active_tool != self.observed.tool {
            self.observed.tool = state.active_tool.clone();
            match &state.active_tool {
                Some(tool) if attached => self.bind_tool(tool),
                _ => {}
            }
        }

        let instance_id = state.current_instance_id().map(str::to_string);
        if instance_id != self.observed.instance_id {
            self.observed.instance_id = instance_id;
            if attached {
                match &state.current_instance {
                    Some(instance) => self.start_load(instance),
                    None => self.settle(&state.viewport),
                }
            }
        }

        if state.viewport != self.observed.viewport {
            self.observed.viewport = state.viewport;
            if self.phase == EnginePhase::Attached && self.applied != Some(state.viewport) {
                self.apply_settings(&state.viewport);
            }
        }
    }

    /// Wait for the next pixel load to complete and apply or discard it.
    ///
    /// Returns `None` when no load is in flight.
    pub async fn complete_next_load(&mut self) -> Option<LoadDisposition> {
        let joined = self.loads.join_next().await?;
        Some(self.finish_load(joined))
    }

    /// Reset the camera and restore the default viewport settings.
    pub fn reset_viewport(&mut self) {
        let defaults = ViewportSettings::default();

        if self.surface.is_some() {
            if let Err(e) = self.adapter.reset_camera() {
                self.report(e);
            }
        }

        self.store
            .set_viewport_settings(ViewportPatch::full(defaults));
        self.observed.viewport = defaults;
        if self.phase == EnginePhase::Attached {
            self.apply_settings(&defaults);
        }
        self.sync();
    }

    /// React to store changes and load completions until `shutdown` resolves.
    ///
    /// The engine keeps its own store handle, so the subscription stays open
    /// for as long as the loop runs and `shutdown` is the only way out.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        self.sync();

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    debug!("Viewport engine shutting down");
                    break;
                }
                Some(_) = self.subscription.changed() => self.sync(),
                Some(joined) = self.loads.join_next(), if !self.loads.is_empty() => {
                    self.finish_load(joined);
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------------

    fn start_load(&mut self, instance: &Instance) {
        let epoch = self.epoch;
        let instance_id = instance.id.clone();
        let pixel_ref = instance.pixel_ref.clone();
        let adapter = Arc::clone(&self.adapter);

        debug!(instance_id = %instance_id, pixel_ref = %pixel_ref, epoch, "Starting pixel load");
        self.phase = EnginePhase::Loading(instance_id.clone());
        self.stats.loads_started += 1;

        self.loads.spawn(async move {
            // A panicking adapter must still yield a tagged completion.
            let result = tokio::spawn(async move { adapter.load_pixel_data(&pixel_ref).await })
                .await
                .unwrap_or_else(|e| {
                    Err(RenderError::Adapter(format!("pixel load task failed: {e}")))
                });
            CompletedLoad {
                epoch,
                instance_id,
                result,
            }
        });
    }

    fn finish_load(
        &mut self,
        joined: Result<CompletedLoad<A::Image>, JoinError>,
    ) -> LoadDisposition {
        let load = match joined {
            Ok(load) => load,
            Err(e) => {
                // Only reachable when the set itself is torn down.
                warn!(error = %e, "Pixel load task cancelled");
                self.stats.loads_discarded += 1;
                return LoadDisposition::Discarded {
                    instance_id: String::new(),
                };
            }
        };

        let state = self.store.snapshot();
        let current = self.surface.is_some()
            && load.epoch == self.epoch
            && state.current_instance_id() == Some(load.instance_id.as_str());

        if !current {
            debug!(instance_id = %load.instance_id, epoch = load.epoch, "Discarding superseded pixel load");
            self.stats.loads_discarded += 1;
            return LoadDisposition::Discarded {
                instance_id: load.instance_id,
            };
        }

        match load.result {
            Ok(image) => {
                self.phase = EnginePhase::Attached;
                self.observed.viewport = state.viewport;
                let shown = self
                    .adapter
                    .display(image)
                    .and_then(|_| self.apply_settings_checked(&state.viewport))
                    .and_then(|_| self.adapter.render());

                match shown {
                    Ok(()) => {
                        self.applied = Some(state.viewport);
                        self.stats.frames_displayed += 1;
                        debug!(instance_id = %load.instance_id, "Displayed instance");
                        LoadDisposition::Applied {
                            instance_id: load.instance_id,
                        }
                    }
                    Err(error) => self.fail(load.instance_id, error, &state.viewport),
                }
            }
            Err(error) => self.fail(load.instance_id, error, &state.viewport),
        }
    }

    fn fail(
        &mut self,
        instance_id: String,
        error: RenderError,
        settings: &ViewportSettings,
    ) -> LoadDisposition {
        warn!(instance_id = %instance_id, error = %error, "Pixel load failed");
        self.stats.loads_failed += 1;
        self.store.set_error(Some(error.to_string()));
        self.settle(settings);
        LoadDisposition::Failed { instance_id, error }
    }

    /// Go idle and bring the surface up to `settings` if it lags behind.
    fn settle(&mut self, settings: &ViewportSettings) {
        self.phase = EnginePhase::Attached;
        self.observed.viewport = *settings;
        if self.applied != Some(*settings) {
            self.apply_settings(settings);
        }
    }

    fn bind_tool(&self, tool: &str) {
        match self.adapter.bind_tool(tool) {
            Ok(()) => debug!(tool, "Bound tool"),
            Err(e) => self.report(e),
        }
    }

    fn apply_settings(&mut self, settings: &ViewportSettings) {
        self.applied = Some(*settings);
        if let Err(e) = self.apply_settings_checked(settings) {
            self.report(e);
        }
    }

    fn apply_settings_checked(&self, settings: &ViewportSettings) -> Result<(), RenderError> {
        self.adapter
            .set_window_level(settings.window_width, settings.window_level)?;
        self.adapter.set_zoom(settings.zoom)?;
        self.adapter.set_pan(settings.pan.x, settings.pan.y)
    }

    /// Surface an adapter failure through the store.
    fn report(&self, error: RenderError) {
        warn!(error = %error, "Rendering adapter call failed");
        self.store.set_error(Some(error.to_string()));
    }
}

impl<A: RenderingAdapter + 'static> Drop for ViewportSyncEngine<A> {
    fn drop(&mut self) {
        self.detach();
    }
}

fn observe(state: &ViewerState) -> Observed {
    Observed {
        instance_id: state.current_instance_id().map(str::to_string),
        tool: state.active_tool.clone(),
        viewport: state.viewport,
    }
}
