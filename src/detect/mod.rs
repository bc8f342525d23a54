//! Object detection wrapper.
//!
//! `ObjectDetector` owns a [`DetectorBackend`] and the fixed thresholds and
//! relabeling table from configuration. It enforces the load-before-predict
//! contract, applies the label map, skips malformed boxes individually, and
//! returns detections sorted by descending confidence (stable for ties).

mod backend;
mod backends;
mod result;

pub use backend::DetectorBackend;
pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use result::{BoundingBox, BoxOutcome, Detection, RawDetection};

use std::cmp::Ordering;
use std::collections::HashMap;

use anyhow::{anyhow, Result};

use crate::frame::Frame;

pub struct ObjectDetector {
    backend: Box<dyn DetectorBackend>,
    conf_threshold: f32,
    iou_threshold: f32,
    labels_map: HashMap<String, String>,
    loaded: bool,
}

impl ObjectDetector {
    pub fn new(
        backend: Box<dyn DetectorBackend>,
        conf_threshold: f32,
        iou_threshold: f32,
        labels_map: HashMap<String, String>,
    ) -> Self {
        Self {
            backend,
            conf_threshold,
            iou_threshold,
            labels_map,
            loaded: false,
        }
    }

    /// Load model weights. A second call after success is a no-op.
    pub fn load(&mut self) -> Result<()> {
        if self.loaded {
            return Ok(());
        }
        self.backend.load()?;
        self.loaded = true;
        Ok(())
    }

    /// Run detection on one frame.
    ///
    /// Fails if `load()` has not succeeded. Zero detections is an empty
    /// list, not an error; the caller's fallback path depends on that.
    pub fn predict(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        if !self.loaded {
            return Err(anyhow!("model not loaded; call load() before predict()"));
        }

        let outcomes = self
            .backend
            .infer(frame, self.conf_threshold, self.iou_threshold)?;

        let mut detections = Vec::with_capacity(outcomes.len());
        let mut skipped = 0usize;
        for outcome in outcomes {
            match outcome {
                BoxOutcome::Parsed(raw) => {
                    let raw_label = self
                        .backend
                        .class_label(raw.class_id)
                        .map(str::to_string)
                        .unwrap_or_else(|| raw.class_id.to_string());
                    let label = self
                        .labels_map
                        .get(&raw_label)
                        .cloned()
                        .unwrap_or(raw_label);
                    detections.push(Detection {
                        label,
                        confidence: raw.confidence,
                        bbox: raw.bbox,
                    });
                }
                BoxOutcome::Skipped(reason) => {
                    skipped += 1;
                    log::debug!("skipped malformed detection box: {}", reason);
                }
            }
        }
        if skipped > 0 {
            log::debug!("{} of a batch's boxes were skipped", skipped);
        }

        // Stable sort keeps model order for equal confidences.
        detections.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
        });
        Ok(detections)
    }
}
