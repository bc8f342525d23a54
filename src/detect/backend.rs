use anyhow::Result;

use crate::detect::result::BoxOutcome;
use crate::frame::Frame;

/// Detection backend trait.
///
/// A backend owns the model runtime. It emits per-box outcomes so that a
/// single malformed box can be skipped without aborting the batch, and a
/// class table mapping its raw class indices to label strings. Thresholds
/// are fixed at the wrapper and passed per call; the backend applies them
/// where the runtime supports it.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Load model weights into memory. Called exactly once by the wrapper
    /// before any inference.
    fn load(&mut self) -> Result<()>;

    /// Raw label for a class index, if known.
    fn class_label(&self, class_id: usize) -> Option<&str>;

    /// Run inference on one frame. Zero detections is an empty vec, not an
    /// error; errors are reserved for runtime failures.
    fn infer(
        &mut self,
        frame: &Frame,
        conf_threshold: f32,
        iou_threshold: f32,
    ) -> Result<Vec<BoxOutcome>>;
}
