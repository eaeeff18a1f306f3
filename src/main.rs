//! DICOM Viewer - command-line front end for the viewer core.
//!
//! This binary loads DICOM files and either prints the assembled study or
//! replays it through a headless viewport.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dicom_viewer::{
    config::{Cli, Command, InspectConfig, OutputFormat, ReplayConfig, DEFAULT_SURFACE},
    DicomMetadataExtractor, HeadlessRenderer, LoadDisposition, LoadError, LocalFileSource,
    Study, StudyLoader, SurfaceHandle, ViewerStateStore, ViewportPatch, ViewportSyncEngine,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Inspect(config) => run_inspect(config).await,
        Command::Replay(config) => run_replay(config).await,
    }
}

// =============================================================================
// Inspect Command
// =============================================================================

async fn run_inspect(config: InspectConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let store = ViewerStateStore::new();
    let study = match load_study(&store, &config.files).await {
        Ok(study) => study,
        Err(e) => {
            error!("Failed to load study: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match config.format {
        OutputFormat::Text => print_study(&study),
        OutputFormat::Json => match serde_json::to_string_pretty(study.as_ref()) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        },
    }

    ExitCode::SUCCESS
}

fn print_study(study: &Study) {
    println!("Study {}", study.id);
    println!("════════════════════════════════");
    println!("  Patient:     {} ({})", study.patient_name, study.patient_id);
    println!("  Date:        {}", study.study_date);
    println!("  Description: {}", study.description);
    println!();

    for series in &study.series {
        println!(
            "S{:<4} {:<4} {} ({} instance(s))",
            series.series_number,
            series.modality,
            series.description,
            series.instances.len()
        );
        for instance in &series.instances {
            let geometry = &instance.geometry;
            println!(
                "  #{:<5} {}x{} {}-bit {}  {}",
                instance.instance_number,
                geometry.columns,
                geometry.rows,
                geometry.bits_stored,
                geometry.photometric_interpretation,
                instance.pixel_ref
            );
        }
    }
}

// =============================================================================
// Replay Command
// =============================================================================

async fn run_replay(config: ReplayConfig) -> ExitCode {
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let store = ViewerStateStore::new();
    let study = match load_study(&store, &config.files).await {
        Ok(study) => study,
        Err(e) => {
            error!("Failed to load study: {}", e);
            return ExitCode::FAILURE;
        }
    };

    store.set_viewport_settings(ViewportPatch::full(config.viewport()));
    if let Some(tool) = &config.tool {
        store.set_active_tool(tool.clone());
    }

    let renderer = Arc::new(HeadlessRenderer::new());
    let mut engine = ViewportSyncEngine::new(store.clone(), Arc::clone(&renderer));
    if let Err(e) = engine.attach(SurfaceHandle::new(DEFAULT_SURFACE)) {
        error!("Failed to attach surface: {}", e);
        return ExitCode::FAILURE;
    }

    info!(
        study_id = %study.id,
        instances = study.instance_count(),
        "Replaying study"
    );

    let mut failures = 0usize;
    for series in &study.series {
        store.set_current_series(series.id.clone());
        for instance in &series.instances {
            store.set_current_instance(instance.clone());
            engine.sync();

            while let Some(disposition) = engine.complete_next_load().await {
                if let LoadDisposition::Failed { instance_id, error } = disposition {
                    warn!(%instance_id, %error, "Instance could not be displayed");
                    failures += 1;
                }
            }
        }
    }

    let stats = engine.stats();
    let surface = renderer.snapshot();
    engine.detach();

    println!("Replay of study {}", study.id);
    println!("────────────────────────────────");
    println!("  Loads started:    {}", stats.loads_started);
    println!("  Frames displayed: {}", stats.frames_displayed);
    println!("  Loads discarded:  {}", stats.loads_discarded);
    println!("  Loads failed:     {}", stats.loads_failed);
    println!("  Frames rendered:  {}", surface.frames_rendered);
    if let Some(tool) = surface.tool {
        println!("  Tool:             {}", tool);
    }
    println!(
        "  Window:           {} / {}",
        surface.viewport.window_width, surface.viewport.window_level
    );
    println!("  Zoom:             {}", surface.viewport.zoom);

    if failures > 0 {
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

// =============================================================================
// Helpers
// =============================================================================

async fn load_study(store: &ViewerStateStore, files: &[PathBuf]) -> Result<Arc<Study>, LoadError> {
    let loader = StudyLoader::new(store.clone(), DicomMetadataExtractor::new());
    let sources = files.iter().map(LocalFileSource::new).collect();
    loader.load(sources).await
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "dicom_viewer=debug"
    } else {
        "dicom_viewer=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
