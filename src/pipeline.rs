//! Perception-to-announcement pipeline.
//!
//! One logical thread drives the loop: read a frame, detect, fall back to
//! the edge heuristic when detection is empty, estimate distance, and speak
//! a throttled announcement. Speech is the only concurrency; it is queued
//! behind [`SpeechSink`] and never blocks the loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::announce::AnnouncementThrottle;
use crate::capture::FrameSource;
use crate::detect::ObjectDetector;
use crate::distance::DistanceEstimator;
use crate::edge::EdgeBlockageHeuristic;
use crate::frame::Frame;
use crate::speech::SpeechSink;

/// Fixed sleep before retrying an empty capture. Transient, never fatal.
const EMPTY_FRAME_BACKOFF: Duration = Duration::from_millis(50);

/// Fixed message for the edge-density fallback.
const OBSTACLE_MESSAGE: &str = "Obstacle ahead";

pub struct Orchestrator {
    source: FrameSource,
    detector: ObjectDetector,
    edge: EdgeBlockageHeuristic,
    distance: DistanceEstimator,
    throttle: AnnouncementThrottle,
    speaker: Arc<dyn SpeechSink>,
    min_distance_m: f64,
    fps_target: u32,
    frames_processed: u64,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: FrameSource,
        detector: ObjectDetector,
        edge: EdgeBlockageHeuristic,
        distance: DistanceEstimator,
        speaker: Arc<dyn SpeechSink>,
        cooldown: Duration,
        min_distance_m: f64,
        fps_target: u32,
    ) -> Self {
        Self {
            source,
            detector,
            edge,
            distance,
            throttle: AnnouncementThrottle::new(cooldown),
            speaker,
            min_distance_m,
            fps_target,
            frames_processed: 0,
        }
    }

    /// Run the loop until `shutdown` is set. Detection errors propagate to
    /// the caller; empty captures are retried after a short backoff and do
    /// not count toward pacing.
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<()> {
        log::info!("pipeline running; send SIGINT to stop");
        while !shutdown.load(Ordering::SeqCst) {
            let loop_start = Instant::now();

            let Some(frame) = self.source.read() else {
                std::thread::sleep(EMPTY_FRAME_BACKOFF);
                continue;
            };

            self.process_frame(&frame, Instant::now())?;
            self.frames_processed += 1;
            log::debug!("processed frame #{}", self.frames_processed);

            self.pace(loop_start);
        }
        log::info!("pipeline stopped after {} frames", self.frames_processed);
        Ok(())
    }

    /// One pipeline pass over a frame. Returns the message spoken this
    /// pass, if any; `now` is injected so tests can drive the throttle on a
    /// manual clock.
    pub fn process_frame(&mut self, frame: &Frame, now: Instant) -> Result<Option<String>> {
        let detections = self.detector.predict(frame)?;

        if let Some(top) = detections.first() {
            // Floor at one pixel so the distance formula cannot divide by
            // zero downstream.
            let pixel_width = f64::from(top.bbox.width()).max(1.0);
            let est_m = self.distance.estimate_from_pixel_width(pixel_width);
            let message = format!("{} ahead, {:.1} meters", top.label, est_m);
            if est_m <= self.min_distance_m {
                return Ok(self.announce(message, now));
            }
            log::debug!("suppressed (too far at {:.1} m): {}", est_m, message);
            return Ok(None);
        }

        if self.edge.is_blocking(frame) {
            return Ok(self.announce(OBSTACLE_MESSAGE.to_string(), now));
        }
        Ok(None)
    }

    fn announce(&mut self, message: String, now: Instant) -> Option<String> {
        if !self.throttle.approve(&message, now) {
            return None;
        }
        log::info!("announce: {}", message);
        self.speaker.say(&message);
        Some(message)
    }

    /// Best-effort pacing toward the target frame rate.
    fn pace(&self, loop_start: Instant) {
        let target = Duration::from_secs_f64(1.0 / f64::from(self.fps_target.max(1)));
        let elapsed = loop_start.elapsed();
        if elapsed < target {
            std::thread::sleep(target - elapsed);
        }
    }

    /// Frames fully processed so far (empty captures excluded).
    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Release the capture device. Safe to call repeatedly.
    pub fn close_camera(&mut self) {
        self.source.close();
    }
}
