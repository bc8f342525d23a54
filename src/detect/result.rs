/// Axis-aligned bounding box in frame pixel coordinates.
///
/// Invariant: `x1 < x2` and `y1 < y2`. Backends enforce this before
/// emitting a parsed box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Intersection-over-union with another box. Zero for disjoint boxes.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let ix = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let iy = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        let intersection = ix * iy;
        let union = self.area() + other.area() - intersection;
        if union > 0.0 {
            intersection / union
        } else {
            0.0
        }
    }
}

/// One recognized object instance: display label, confidence in [0,1],
/// bounding box in frame pixels. No identity across frames.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// Backend output before labeling: class index into the backend's class
/// table plus confidence and box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawDetection {
    pub class_id: usize,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// Per-box conversion outcome. A malformed box is skipped on its own and
/// never aborts the batch it arrived in.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BoxOutcome {
    Parsed(RawDetection),
    Skipped(&'static str),
}
