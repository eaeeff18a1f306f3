//! Viewport synchronization against a recording adapter and the headless renderer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

use dicom_viewer::error::RenderError;
use dicom_viewer::metadata::{DicomMetadataExtractor, LocalFileSource, StudyLoader};
use dicom_viewer::state::{Pan, ViewerStateStore, ViewportPatch, ViewportSettings};
use dicom_viewer::viewport::{
    EnginePhase, HeadlessRenderer, LoadDisposition, SurfaceHandle, ToolName, ViewportSyncEngine,
};

use super::test_utils::{instance, scratch_dir, AdapterCall, DicomBuilder, RecordingAdapter};

fn attached_engine() -> (
    ViewerStateStore,
    Arc<RecordingAdapter>,
    ViewportSyncEngine<RecordingAdapter>,
) {
    let store = ViewerStateStore::new();
    let adapter = Arc::new(RecordingAdapter::new());
    let mut engine = ViewportSyncEngine::new(store.clone(), Arc::clone(&adapter));
    engine.attach(SurfaceHandle::new("viewport-1")).unwrap();
    (store, adapter, engine)
}

async fn wait_for<F: Fn() -> bool>(condition: F) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("condition not reached in time");
}

// =============================================================================
// Supersession
// =============================================================================

#[tokio::test]
async fn test_late_completion_of_superseded_load_is_never_displayed() {
    let (store, adapter, mut engine) = attached_engine();
    let gate_a = adapter.gate("a");
    let gate_b = adapter.gate("b");

    store.set_current_instance(instance("a", 1));
    engine.sync();
    store.set_current_instance(instance("b", 2));
    engine.sync();
    adapter.wait_for_pickup("a").await;
    adapter.wait_for_pickup("b").await;

    gate_b.release("pixels-b");
    assert_eq!(
        engine.complete_next_load().await,
        Some(LoadDisposition::Applied {
            instance_id: "b".to_string()
        })
    );

    gate_a.release("pixels-a");
    assert_eq!(
        engine.complete_next_load().await,
        Some(LoadDisposition::Discarded {
            instance_id: "a".to_string()
        })
    );

    assert_eq!(adapter.displayed(), vec!["pixels-b".to_string()]);
    assert_eq!(adapter.calls().last(), Some(&AdapterCall::Render));
}

#[tokio::test]
async fn test_early_completion_of_superseded_load_is_discarded() {
    let (store, adapter, mut engine) = attached_engine();
    let gate_a = adapter.gate("a");
    let gate_b = adapter.gate("b");

    store.set_current_instance(instance("a", 1));
    engine.sync();
    store.set_current_instance(instance("b", 2));
    engine.sync();
    adapter.wait_for_pickup("a").await;

    gate_a.release("pixels-a");
    assert!(matches!(
        engine.complete_next_load().await,
        Some(LoadDisposition::Discarded { .. })
    ));
    assert_eq!(engine.phase(), &EnginePhase::Loading("b".to_string()));

    gate_b.release("pixels-b");
    engine.complete_next_load().await;
    assert_eq!(adapter.displayed(), vec!["pixels-b".to_string()]);
    assert_eq!(engine.phase(), &EnginePhase::Attached);
}

#[tokio::test]
async fn test_run_loop_discards_out_of_order_completion() {
    let (store, adapter, mut engine) = attached_engine();
    let gate_a = adapter.gate("a");
    let gate_b = adapter.gate("b");
    let (stop, stopped) = oneshot::channel::<()>();

    let runner = tokio::spawn(async move {
        engine
            .run(async {
                let _ = stopped.await;
            })
            .await;
        engine
    });

    store.set_current_instance(instance("a", 1));
    adapter.wait_for_pickup("a").await;
    store.set_current_instance(instance("b", 2));
    adapter.wait_for_pickup("b").await;

    gate_b.release("pixels-b");
    wait_for(|| adapter.count(&AdapterCall::Render) > 0).await;
    gate_a.release("pixels-a");

    tokio::time::sleep(Duration::from_millis(20)).await;

    stop.send(()).unwrap();
    let engine = runner.await.unwrap();

    assert_eq!(adapter.displayed(), vec!["pixels-b".to_string()]);
    let stats = engine.stats();
    assert_eq!(stats.frames_displayed, 1);
    assert_eq!(stats.loads_discarded, 1);
}

// =============================================================================
// Surface Lifecycle
// =============================================================================

#[tokio::test]
async fn test_attach_twice_creates_once() {
    let (_store, adapter, mut engine) = attached_engine();
    engine.attach(SurfaceHandle::new("viewport-1")).unwrap();
    engine.attach(SurfaceHandle::new("viewport-2")).unwrap();

    let creations = adapter
        .calls()
        .into_iter()
        .filter(|call| matches!(call, AdapterCall::CreateSurface(_)))
        .count();
    assert_eq!(creations, 1);
}

#[tokio::test]
async fn test_destroy_exactly_once() {
    let (_store, adapter, mut engine) = attached_engine();
    engine.detach();
    engine.detach();
    drop(engine);

    assert_eq!(adapter.count(&AdapterCall::Destroy), 1);
}

#[tokio::test]
async fn test_detach_while_loading_discards_result() {
    let (store, adapter, mut engine) = attached_engine();
    let gate = adapter.gate("a");
    store.set_current_instance(instance("a", 1));
    engine.sync();

    engine.detach();
    gate.release("pixels-a");

    assert!(matches!(
        engine.complete_next_load().await,
        Some(LoadDisposition::Discarded { .. })
    ));
    assert!(adapter.displayed().is_empty());
    assert_eq!(engine.phase(), &EnginePhase::Uninitialized);
}

// =============================================================================
// Settings and Tools
// =============================================================================

#[tokio::test]
async fn test_settings_forwarded_without_reload() {
    let (store, adapter, mut engine) = attached_engine();
    store.set_current_instance(instance("a", 1));
    engine.sync();
    engine.complete_next_load().await;
    adapter.clear_calls();

    store.set_viewport_settings(ViewportPatch::window_level(2000.0, 300.0));
    engine.sync();

    assert_eq!(adapter.count(&AdapterCall::WindowLevel(2000.0, 300.0)), 1);
    assert!(adapter.displayed().is_empty());
    assert_eq!(adapter.load_count(), 1);
}

#[tokio::test]
async fn test_reset_viewport_always_restores_defaults() {
    let (store, adapter, mut engine) = attached_engine();
    store.set_viewport_settings(ViewportPatch::full(ViewportSettings {
        window_width: 80.0,
        window_level: 40.0,
        zoom: 0.0,
        pan: Pan::new(-12.0, 30.0),
    }));
    engine.sync();
    adapter.clear_calls();

    engine.reset_viewport();

    assert_eq!(store.snapshot().viewport, ViewportSettings::default());
    let calls = adapter.calls();
    assert_eq!(calls.first(), Some(&AdapterCall::ResetCamera));
    assert!(calls.contains(&AdapterCall::WindowLevel(400.0, 50.0)));
    assert!(calls.contains(&AdapterCall::Zoom(1.0)));
    assert!(calls.contains(&AdapterCall::Pan(0.0, 0.0)));

    adapter.clear_calls();
    engine.reset_viewport();
    assert_eq!(adapter.count(&AdapterCall::WindowLevel(400.0, 50.0)), 1);
}

#[tokio::test]
async fn test_unknown_tool_reported_through_store() {
    let (store, adapter, mut engine) = attached_engine();

    store.set_active_tool("Lasso");
    engine.sync();

    assert_eq!(
        store.snapshot().error,
        Some(
            RenderError::ToolBind {
                tool: "Lasso".to_string()
            }
            .to_string()
        )
    );
    assert_eq!(engine.phase(), &EnginePhase::Attached);

    store.set_active_tool(ToolName::StackScroll.to_string());
    engine.sync();
    assert_eq!(
        adapter.count(&AdapterCall::BindTool("StackScroll".to_string())),
        1
    );
}

#[tokio::test]
async fn test_failed_load_allows_retry() {
    let (store, adapter, mut engine) = attached_engine();
    let gate = adapter.gate("a");
    store.set_current_instance(instance("a", 1));
    engine.sync();

    gate.fail(RenderError::PixelLoad {
        pixel_ref: "a".to_string(),
        message: "truncated".to_string(),
    });
    assert!(matches!(
        engine.complete_next_load().await,
        Some(LoadDisposition::Failed { .. })
    ));
    assert_eq!(engine.phase(), &EnginePhase::Attached);
    assert!(store.snapshot().error.is_some());

    store.set_current_instance(instance("b", 2));
    engine.sync();
    assert_eq!(
        engine.complete_next_load().await,
        Some(LoadDisposition::Applied {
            instance_id: "b".to_string()
        })
    );
}

#[tokio::test]
async fn test_surface_catches_up_with_settings_after_failed_load() {
    let (store, adapter, mut engine) = attached_engine();
    let gate = adapter.gate("a");
    store.set_current_instance(instance("a", 1));
    engine.sync();
    adapter.wait_for_pickup("a").await;

    store.set_viewport_settings(ViewportPatch::window_level(1500.0, -600.0));
    engine.sync();
    assert_eq!(adapter.count(&AdapterCall::WindowLevel(1500.0, -600.0)), 0);

    gate.fail(RenderError::PixelLoad {
        pixel_ref: "a".to_string(),
        message: "truncated".to_string(),
    });
    engine.complete_next_load().await;
    engine.sync();

    assert_eq!(adapter.count(&AdapterCall::WindowLevel(1500.0, -600.0)), 1);
}

#[tokio::test]
async fn test_surface_catches_up_with_settings_after_selection_cleared() {
    let (store, adapter, mut engine) = attached_engine();
    let _gate = adapter.gate("a");
    store.set_current_instance(instance("a", 1));
    engine.sync();

    store.set_viewport_settings(ViewportPatch::pan(12.0, -4.0));
    engine.sync();
    store.clear_study();
    engine.sync();

    assert_eq!(engine.phase(), &EnginePhase::Attached);
    assert_eq!(adapter.count(&AdapterCall::Pan(12.0, -4.0)), 1);
}

// =============================================================================
// End to End
// =============================================================================

#[tokio::test]
async fn test_load_and_replay_with_headless_renderer() {
    let dir = scratch_dir("engine");
    let mut sources = Vec::new();
    for n in 1..=3 {
        let path = dir.join(format!("{n}.dcm"));
        let uid = format!("9.1.{n}");
        tokio::fs::write(&path, DicomBuilder::ct_instance(&uid, "9.1.100", n).build())
            .await
            .unwrap();
        sources.push(LocalFileSource::new(path));
    }

    let store = ViewerStateStore::new();
    let loader = StudyLoader::new(store.clone(), DicomMetadataExtractor::new());
    let study = loader.load(sources).await.unwrap();
    store.set_active_tool("WindowLevel");

    let renderer = Arc::new(HeadlessRenderer::new());
    let mut engine = ViewportSyncEngine::new(store.clone(), Arc::clone(&renderer));
    engine.attach(SurfaceHandle::new("headless")).unwrap();

    for instance in &study.series[0].instances {
        store.set_current_instance(instance.clone());
        engine.sync();
        while engine.complete_next_load().await.is_some() {}
        assert_eq!(renderer.snapshot().image, Some(instance.pixel_ref.clone()));
    }

    let surface = renderer.snapshot();
    assert_eq!(surface.frames_rendered, 3);
    assert_eq!(surface.tool, Some(ToolName::WindowLevel));
    assert_eq!(engine.stats().frames_displayed, 3);

    drop(engine);
    assert_eq!(renderer.snapshot().surfaces_destroyed, 1);

    tokio::fs::remove_dir_all(&dir).await.unwrap();
}
