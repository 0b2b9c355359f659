/// Axis-aligned face box in image-pixel coordinates, as reported by a detector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Detector score, 0-1.
    pub confidence: f32,
}

impl Detection {
    pub fn new(x: f32, y: f32, width: f32, height: f32, confidence: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            confidence,
        }
    }

    pub fn from_corners(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32) -> Self {
        Self::new(x1, y1, x2 - x1, y2 - y1, confidence)
    }

    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Intersection over union of two boxes.
    pub fn iou(&self, other: &Detection) -> f32 {
        let ix1 = self.x.max(other.x);
        let iy1 = self.y.max(other.y);
        let ix2 = (self.x + self.width).min(other.x + other.width);
        let iy2 = (self.y + self.height).min(other.y + other.height);

        let intersection = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
        let union = self.area() + other.area() - intersection;

        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

/// Sort detections by left edge. The sort is stable, so boxes sharing an
/// x coordinate keep the detector's order.
pub fn sort_left_to_right(detections: &mut [Detection]) {
    detections.sort_by(|a, b| a.x.total_cmp(&b.x));
}

/// A detection clamped to integer image bounds. May be empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelBox {
    /// Clamp `detection` to an image of `image_width` x `image_height`.
    pub fn clamp(detection: &Detection, image_width: u32, image_height: u32) -> Self {
        let clamp_axis = |start: f32, extent: f32, limit: u32| -> (u32, u32) {
            let limit_f = limit as f32;
            let lo = start.round().clamp(0.0, limit_f);
            let hi = (start + extent).round().clamp(0.0, limit_f);
            // NaN coordinates collapse to an empty span at the origin
            let lo = if lo.is_nan() { 0 } else { lo as u32 };
            let hi = if hi.is_nan() { 0 } else { hi as u32 };
            (lo, hi.saturating_sub(lo))
        };

        let (x, width) = clamp_axis(detection.x, detection.width, image_width);
        let (y, height) = clamp_axis(detection.y, detection.height, image_height);

        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }
}
