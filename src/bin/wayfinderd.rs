//! wayfinderd - assistive navigation daemon
//!
//! This daemon:
//! 1. Reads frames from the configured camera
//! 2. Runs object detection (tract ONNX backend when enabled)
//! 3. Falls back to the edge-density heuristic when detection is empty
//! 4. Estimates distance to the most confident object
//! 5. Speaks throttled voice announcements via espeak-ng
//!
//! Runs until SIGINT; cleanup (camera close, speaker stop) always runs,
//! each step isolated so one failure cannot block the other.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use wayfinder::{
    AppConfig, DistanceEstimator, EdgeBlockageHeuristic, FrameSource, ObjectDetector,
    Orchestrator, Speaker, SpeechSink,
};

#[derive(Parser, Debug)]
#[command(name = "wayfinderd", about = "Headless assistive-navigation loop")]
struct Args {
    /// Path to the YAML configuration file.
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    // Unexpected failures are caught once here: logged, then the process
    // still exits cleanly after cleanup has run inside `run`.
    if let Err(err) = run(&args) {
        log::error!("unhandled error: {:#}", err);
    }
}

fn run(args: &Args) -> Result<()> {
    let cfg = AppConfig::load(&args.config)?;

    let mut source = FrameSource::new(cfg.camera.clone());
    let mut detector = ObjectDetector::new(
        make_backend(&cfg),
        cfg.detector.conf_threshold,
        cfg.detector.iou_threshold,
        cfg.detector.labels_map.clone(),
    );
    let edge = EdgeBlockageHeuristic::new(
        cfg.edge.center_region_ratio,
        cfg.edge.edge_density_threshold,
    );
    let distance = DistanceEstimator::new(
        cfg.distance.focal_length,
        cfg.distance.known_object_width,
    );
    let speaker: Arc<Speaker> = Arc::new(Speaker::new(cfg.general.tts_rate));

    source.open().context("failed to open camera")?;
    detector.load().context("failed to load detection model")?;
    log::info!("system started; press Ctrl+C to stop");

    let shutdown = Arc::new(AtomicBool::new(false));
    let handler_flag = shutdown.clone();
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::SeqCst);
    })
    .context("failed to install SIGINT handler")?;

    let mut orchestrator = Orchestrator::new(
        source,
        detector,
        edge,
        distance,
        speaker.clone(),
        cfg.announce.cooldown(),
        cfg.announce.min_distance_m,
        cfg.general.fps_target,
    );
    let result = orchestrator.run(&shutdown);

    // Cleanup runs unconditionally; camera close and speaker stop each
    // swallow their own failures internally.
    orchestrator.close_camera();
    speaker.stop();
    log::info!("shutdown complete");

    result
}

#[cfg(feature = "backend-tract")]
fn make_backend(cfg: &AppConfig) -> Box<dyn wayfinder::DetectorBackend> {
    Box::new(wayfinder::TractBackend::new(&cfg.detector.model_path))
}

#[cfg(not(feature = "backend-tract"))]
fn make_backend(_cfg: &AppConfig) -> Box<dyn wayfinder::DetectorBackend> {
    log::warn!("built without backend-tract; detection is disabled and only the edge fallback can announce");
    Box::new(wayfinder::StubBackend::new(Vec::new()))
}
