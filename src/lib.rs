//! wayfinder — headless assistive-navigation loop.
//!
//! Captures camera frames, runs object detection, falls back to an
//! edge-density heuristic when detection finds nothing, estimates distance
//! to the most confident object with a pinhole-camera formula, and speaks
//! throttled voice announcements.
//!
//! # Module structure
//!
//! - `capture`: frame sources (V4L2 device, synthetic, scripted)
//! - `detect`: detector wrapper and backends (tract ONNX, stub)
//! - `edge`: edge-density blockage fallback
//! - `distance`: pinhole distance estimation
//! - `announce`: per-message cool-down throttle
//! - `speech`: queued espeak-ng speaker
//! - `pipeline`: the orchestrating main loop
//! - `config`: YAML configuration with full defaults

pub mod announce;
pub mod capture;
pub mod config;
pub mod detect;
pub mod distance;
pub mod edge;
pub mod frame;
pub mod pipeline;
pub mod speech;

pub use announce::AnnouncementThrottle;
pub use capture::{CameraConfig, FrameSource};
pub use config::AppConfig;
#[cfg(feature = "backend-tract")]
pub use detect::TractBackend;
pub use detect::{BoundingBox, BoxOutcome, Detection, DetectorBackend, ObjectDetector, RawDetection, StubBackend};
pub use distance::{DistanceEstimator, FAR_SENTINEL_M};
pub use edge::EdgeBlockageHeuristic;
pub use frame::{Frame, Rotation};
pub use pipeline::Orchestrator;
pub use speech::{Speaker, SpeechSink};
