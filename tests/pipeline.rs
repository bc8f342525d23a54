//! End-to-end pipeline scenarios with scripted capture, scripted detection,
//! and a recording speech sink.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use wayfinder::{
    BoundingBox, BoxOutcome, DistanceEstimator, EdgeBlockageHeuristic, Frame, FrameSource,
    ObjectDetector, Orchestrator, RawDetection, Rotation, SpeechSink, StubBackend,
};

#[derive(Default)]
struct RecordingSink {
    spoken: Mutex<Vec<String>>,
    stopped: AtomicBool,
}

impl RecordingSink {
    fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

impl SpeechSink for RecordingSink {
    fn say(&self, text: &str) {
        if self.stopped.load(Ordering::SeqCst) {
            return;
        }
        self.spoken.lock().unwrap().push(text.to_string());
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

fn black_frame() -> Frame {
    Frame::from_bgr(vec![0u8; 416 * 312 * 3], 416, 312).unwrap()
}

/// High-contrast two-pixel stripes; reads as a fully blocked center.
fn striped_frame() -> Frame {
    let (w, h) = (64u32, 48u32);
    let mut data = Vec::with_capacity((w * h * 3) as usize);
    for _y in 0..h {
        for x in 0..w {
            let v = if (x / 2) % 2 == 0 { 0u8 } else { 255u8 };
            data.extend_from_slice(&[v, v, v]);
        }
    }
    Frame::from_bgr(data, w, h).unwrap()
}

fn car_detection() -> BoxOutcome {
    BoxOutcome::Parsed(RawDetection {
        class_id: 0,
        confidence: 0.9,
        bbox: BoundingBox {
            x1: 100.0,
            y1: 100.0,
            x2: 300.0,
            y2: 300.0,
        },
    })
}

struct Setup {
    orchestrator: Orchestrator,
    sink: Arc<RecordingSink>,
}

/// Pipeline wired with spec-like calibration: focal 700, known width 0.5,
/// announce gate 2.1 m, cooldown 3 s.
fn setup(scripted_detections: Vec<Vec<BoxOutcome>>, loaded: bool) -> Setup {
    let mut backend = StubBackend::new(vec!["car".to_string()]);
    for batch in scripted_detections {
        backend.push_frame(batch);
    }
    let mut detector = ObjectDetector::new(Box::new(backend), 0.35, 0.45, HashMap::new());
    if loaded {
        detector.load().unwrap();
    }

    let sink = Arc::new(RecordingSink::default());
    let orchestrator = Orchestrator::new(
        FrameSource::scripted(Vec::new(), Rotation::None),
        detector,
        EdgeBlockageHeuristic::new(0.35, 0.08),
        DistanceEstimator::new(700.0, 0.5),
        sink.clone(),
        Duration::from_secs(3),
        2.1,
        10,
    );
    Setup { orchestrator, sink }
}

#[test]
fn close_car_is_announced_once_within_cooldown() {
    // pixel width 200 -> 0.5 * 700 / 200 = 1.75 m, inside the 2.1 m gate.
    let mut s = setup(vec![vec![car_detection()], vec![car_detection()]], true);
    let t0 = Instant::now();

    let first = s
        .orchestrator
        .process_frame(&black_frame(), t0)
        .unwrap();
    assert_eq!(first.as_deref(), Some("car ahead, 1.8 meters"));

    // Same message two seconds later is inside the cooldown.
    let second = s
        .orchestrator
        .process_frame(&black_frame(), t0 + Duration::from_secs(2))
        .unwrap();
    assert_eq!(second, None);

    assert_eq!(s.sink.spoken(), vec!["car ahead, 1.8 meters".to_string()]);
}

#[test]
fn same_message_after_cooldown_is_spoken_again() {
    let mut s = setup(vec![vec![car_detection()], vec![car_detection()]], true);
    let t0 = Instant::now();

    s.orchestrator.process_frame(&black_frame(), t0).unwrap();
    let second = s
        .orchestrator
        .process_frame(&black_frame(), t0 + Duration::from_secs(4))
        .unwrap();
    assert_eq!(second.as_deref(), Some("car ahead, 1.8 meters"));
    assert_eq!(s.sink.spoken().len(), 2);
}

#[test]
fn far_detection_is_not_announced() {
    // pixel width 100 -> 3.5 m, beyond the 2.1 m gate.
    let far = BoxOutcome::Parsed(RawDetection {
        class_id: 0,
        confidence: 0.9,
        bbox: BoundingBox {
            x1: 100.0,
            y1: 100.0,
            x2: 200.0,
            y2: 300.0,
        },
    });
    let mut s = setup(vec![vec![far]], true);
    let spoken = s
        .orchestrator
        .process_frame(&black_frame(), Instant::now())
        .unwrap();
    assert_eq!(spoken, None);
    assert!(s.sink.spoken().is_empty());
}

#[test]
fn empty_detections_with_blocked_center_announce_obstacle() {
    let mut s = setup(vec![vec![]], true);
    let spoken = s
        .orchestrator
        .process_frame(&striped_frame(), Instant::now())
        .unwrap();
    assert_eq!(spoken.as_deref(), Some("Obstacle ahead"));
    assert_eq!(s.sink.spoken(), vec!["Obstacle ahead".to_string()]);
}

#[test]
fn empty_detections_with_clear_center_stay_silent() {
    let mut s = setup(vec![vec![]], true);
    let spoken = s
        .orchestrator
        .process_frame(&black_frame(), Instant::now())
        .unwrap();
    assert_eq!(spoken, None);
    assert!(s.sink.spoken().is_empty());
}

#[test]
fn subpixel_width_is_floored_to_one_pixel() {
    // max(1.0, ..) floors the width; 0.5 * 700 / 1 = 350 m, never announced.
    let degenerate = BoxOutcome::Parsed(RawDetection {
        class_id: 0,
        confidence: 0.9,
        bbox: BoundingBox {
            x1: 100.0,
            y1: 100.0,
            x2: 100.5,
            y2: 300.0,
        },
    });
    let mut s = setup(vec![vec![degenerate]], true);
    let spoken = s
        .orchestrator
        .process_frame(&black_frame(), Instant::now())
        .unwrap();
    assert_eq!(spoken, None);
}

#[test]
fn run_exits_promptly_once_shutdown_is_set() {
    let mut s = setup(Vec::new(), true);
    let shutdown = AtomicBool::new(true);
    s.orchestrator.run(&shutdown).unwrap();
    assert_eq!(s.orchestrator.frames_processed(), 0);
}

#[test]
fn run_retries_over_capture_gaps() {
    // Script: gap, frame, gap, frame, then the source stays empty and a
    // watcher flips the shutdown flag.
    let frames = vec![None, Some(black_frame()), None, Some(black_frame())];
    let mut backend = StubBackend::new(vec!["car".to_string()]);
    backend.push_frame(vec![]);
    backend.push_frame(vec![]);
    let mut detector = ObjectDetector::new(Box::new(backend), 0.35, 0.45, HashMap::new());
    detector.load().unwrap();

    let sink = Arc::new(RecordingSink::default());
    let mut orchestrator = Orchestrator::new(
        FrameSource::scripted(frames, Rotation::None),
        detector,
        EdgeBlockageHeuristic::new(0.35, 0.08),
        DistanceEstimator::new(700.0, 0.5),
        sink,
        Duration::from_secs(3),
        2.1,
        1000,
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    let watcher = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(400));
        flag.store(true, Ordering::SeqCst);
    });

    orchestrator.run(&shutdown).unwrap();
    watcher.join().unwrap();
    assert_eq!(orchestrator.frames_processed(), 2);
}

#[test]
fn detection_error_propagates_out_of_run() {
    // Detector never loaded: the first processed frame surfaces the usage
    // error to the caller instead of being swallowed.
    let frames = vec![Some(black_frame())];
    let backend = StubBackend::new(Vec::new());
    let detector = ObjectDetector::new(Box::new(backend), 0.35, 0.45, HashMap::new());

    let sink = Arc::new(RecordingSink::default());
    let mut orchestrator = Orchestrator::new(
        FrameSource::scripted(frames, Rotation::None),
        detector,
        EdgeBlockageHeuristic::new(0.35, 0.08),
        DistanceEstimator::new(700.0, 0.5),
        sink,
        Duration::from_secs(3),
        2.1,
        10,
    );
    let shutdown = AtomicBool::new(false);
    let err = orchestrator.run(&shutdown).unwrap_err();
    assert!(err.to_string().contains("not loaded"));
}

#[test]
fn stopped_sink_swallows_later_announcements() {
    let mut s = setup(vec![vec![car_detection()]], true);
    s.sink.stop();
    let spoken = s
        .orchestrator
        .process_frame(&black_frame(), Instant::now())
        .unwrap();
    // The throttle approved it, but the stopped sink drops it silently.
    assert_eq!(spoken.as_deref(), Some("car ahead, 1.8 meters"));
    assert!(s.sink.spoken().is_empty());
}
