use std::collections::VecDeque;

use anyhow::Result;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::BoxOutcome;
use crate::frame::Frame;

/// Scripted backend for testing and for builds without `backend-tract`.
///
/// Each `infer` call pops the next scripted batch; an exhausted script
/// yields empty batches, matching a camera pointed at nothing.
pub struct StubBackend {
    classes: Vec<String>,
    script: VecDeque<Vec<BoxOutcome>>,
    loaded: bool,
}

impl StubBackend {
    pub fn new(classes: Vec<String>) -> Self {
        Self {
            classes,
            script: VecDeque::new(),
            loaded: false,
        }
    }

    /// Queue the outcomes to emit for the next frame.
    pub fn push_frame(&mut self, outcomes: Vec<BoxOutcome>) {
        self.script.push_back(outcomes);
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn load(&mut self) -> Result<()> {
        self.loaded = true;
        Ok(())
    }

    fn class_label(&self, class_id: usize) -> Option<&str> {
        self.classes.get(class_id).map(String::as_str)
    }

    fn infer(
        &mut self,
        _frame: &Frame,
        _conf_threshold: f32,
        _iou_threshold: f32,
    ) -> Result<Vec<BoxOutcome>> {
        Ok(self.script.pop_front().unwrap_or_default())
    }
}
