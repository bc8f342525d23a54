#![cfg(feature = "backend-tract")]

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BoundingBox, BoxOutcome, RawDetection};
use crate::frame::Frame;

/// COCO class names (80 classes), the label table for YOLOv8-family models.
const COCO_CLASSES: &[&str] = &[
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat",
    "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack",
    "umbrella", "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball",
    "kite", "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket",
    "bottle", "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple",
    "sandwich", "orange", "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair",
    "couch", "potted plant", "bed", "dining table", "toilet", "tv", "laptop", "mouse",
    "remote", "keyboard", "cell phone", "microwave", "oven", "toaster", "sink", "refrigerator",
    "book", "clock", "vase", "scissors", "teddy bear", "hair drier", "toothbrush",
];

/// Model input edge length. YOLOv8 exports use a square 640x640 input.
const INPUT_SIZE: usize = 640;

type RunnableModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Tract-based ONNX backend for YOLOv8-style models.
///
/// Frames are resized (nearest neighbor, no letterboxing) to the model
/// input, and decoded boxes are scaled back to frame pixel coordinates.
pub struct TractBackend {
    model_path: PathBuf,
    model: Option<RunnableModel>,
}

impl TractBackend {
    pub fn new<P: Into<PathBuf>>(model_path: P) -> Self {
        Self {
            model_path: model_path.into(),
            model: None,
        }
    }

    fn build_input(&self, frame: &Frame) -> Result<Tensor> {
        let fw = frame.width() as usize;
        let fh = frame.height() as usize;
        if fw == 0 || fh == 0 {
            return Err(anyhow!("cannot run inference on an empty frame"));
        }
        let pixels = frame.pixels();

        // BGR -> RGB, nearest-neighbor resize, CHW, normalized to [0,1].
        let input = tract_ndarray::Array4::from_shape_fn(
            (1, 3, INPUT_SIZE, INPUT_SIZE),
            |(_, channel, y, x)| {
                let sx = x * fw / INPUT_SIZE;
                let sy = y * fh / INPUT_SIZE;
                let idx = (sy * fw + sx) * 3 + (2 - channel);
                pixels[idx] as f32 / 255.0
            },
        );
        Ok(input.into_tensor())
    }

    fn decode(
        &self,
        output: &Tensor,
        frame_w: f32,
        frame_h: f32,
        conf_threshold: f32,
        iou_threshold: f32,
    ) -> Result<Vec<BoxOutcome>> {
        let view = output
            .to_array_view::<f32>()
            .context("model output tensor was not f32")?;
        let shape = view.shape();
        // Expected layout: [1, 4 + num_classes, num_anchors].
        if shape.len() != 3 || shape[1] <= 4 {
            return Err(anyhow!("unexpected model output shape {:?}", shape));
        }
        let num_classes = (shape[1] - 4).min(COCO_CLASSES.len());
        let num_anchors = shape[2];

        let scale_x = frame_w / INPUT_SIZE as f32;
        let scale_y = frame_h / INPUT_SIZE as f32;

        let mut skipped: Vec<BoxOutcome> = Vec::new();
        let mut candidates: Vec<RawDetection> = Vec::new();
        for i in 0..num_anchors {
            let mut best_class = 0usize;
            let mut best_score = 0.0f32;
            for c in 0..num_classes {
                let score = view[[0, 4 + c, i]];
                if score > best_score {
                    best_score = score;
                    best_class = c;
                }
            }
            if best_score < conf_threshold {
                continue;
            }

            let cx = view[[0, 0, i]];
            let cy = view[[0, 1, i]];
            let w = view[[0, 2, i]];
            let h = view[[0, 3, i]];
            if ![cx, cy, w, h, best_score].iter().all(|v| v.is_finite()) {
                skipped.push(BoxOutcome::Skipped("non-finite box coordinates"));
                continue;
            }

            let x1 = ((cx - w / 2.0) * scale_x).clamp(0.0, frame_w);
            let y1 = ((cy - h / 2.0) * scale_y).clamp(0.0, frame_h);
            let x2 = ((cx + w / 2.0) * scale_x).clamp(0.0, frame_w);
            let y2 = ((cy + h / 2.0) * scale_y).clamp(0.0, frame_h);
            if x2 <= x1 || y2 <= y1 {
                skipped.push(BoxOutcome::Skipped("degenerate box extent"));
                continue;
            }

            candidates.push(RawDetection {
                class_id: best_class,
                confidence: best_score,
                bbox: BoundingBox { x1, y1, x2, y2 },
            });
        }

        let mut outcomes: Vec<BoxOutcome> = nms(candidates, iou_threshold)
            .into_iter()
            .map(BoxOutcome::Parsed)
            .collect();
        outcomes.append(&mut skipped);
        Ok(outcomes)
    }
}

/// Greedy class-aware non-maximum suppression.
fn nms(mut candidates: Vec<RawDetection>, iou_threshold: f32) -> Vec<RawDetection> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let mut kept: Vec<RawDetection> = Vec::new();
    for cand in candidates {
        let suppressed = kept
            .iter()
            .any(|k| k.class_id == cand.class_id && k.bbox.iou(&cand.bbox) >= iou_threshold);
        if !suppressed {
            kept.push(cand);
        }
    }
    kept
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn load(&mut self) -> Result<()> {
        let model = tract_onnx::onnx()
            .model_for_path(&self.model_path)
            .with_context(|| {
                format!(
                    "failed to load ONNX model from {}",
                    self.model_path.display()
                )
            })?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, INPUT_SIZE, INPUT_SIZE)),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;
        self.model = Some(model);
        log::info!("loaded ONNX model {}", self.model_path.display());
        Ok(())
    }

    fn class_label(&self, class_id: usize) -> Option<&str> {
        COCO_CLASSES.get(class_id).copied()
    }

    fn infer(
        &mut self,
        frame: &Frame,
        conf_threshold: f32,
        iou_threshold: f32,
    ) -> Result<Vec<BoxOutcome>> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| anyhow!("tract backend used before load()"))?;
        let input = self.build_input(frame)?;
        let outputs = model.run(tvec!(input.into())).context("ONNX inference failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        self.decode(
            output,
            frame.width() as f32,
            frame.height() as f32,
            conf_threshold,
            iou_threshold,
        )
    }
}
