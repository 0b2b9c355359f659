use crate::detection::Detection;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.7;
pub const DEFAULT_IOU_THRESHOLD: f32 = 0.3;
pub const DEFAULT_MAX_DETECTIONS: usize = 200;

/// Index of the face class in the `scores` output (0 is background).
const FACE_CLASS: usize = 1;

pub struct PostProcessor {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl PostProcessor {
    pub fn new(confidence_threshold: f32, iou_threshold: f32, max_detections: usize) -> Self {
        Self {
            confidence_threshold,
            iou_threshold,
            max_detections,
        }
    }

    /// Parse UltraFace output into detections in original image pixels.
    ///
    /// `scores` is `[1, N, 2]` (background, face); `boxes` is `[1, N, 4]`
    /// normalized corners `x1, y1, x2, y2`. Result is ordered by descending
    /// confidence after non-maximum suppression.
    #[tracing::instrument(skip(self, scores, boxes))]
    pub fn parse_detections(
        &self,
        scores: &ndarray::ArrayViewD<f32>,
        boxes: &ndarray::ArrayViewD<f32>,
        orig_width: u32,
        orig_height: u32,
    ) -> anyhow::Result<Vec<Detection>> {
        let (score_shape, box_shape) = (scores.shape(), boxes.shape());
        if score_shape.len() != 3 || score_shape[2] <= FACE_CLASS {
            anyhow::bail!("Unexpected scores shape {:?}", score_shape);
        }
        if box_shape.len() != 3 || box_shape[2] != 4 {
            anyhow::bail!("Unexpected boxes shape {:?}", box_shape);
        }
        if score_shape[1] != box_shape[1] {
            anyhow::bail!(
                "Scores and boxes disagree on candidate count: {} vs {}",
                score_shape[1],
                box_shape[1]
            );
        }

        let width = orig_width as f32;
        let height = orig_height as f32;

        let mut candidates = Vec::new();
        for i in 0..score_shape[1] {
            let confidence = scores[[0, i, FACE_CLASS]];
            if confidence < self.confidence_threshold {
                continue;
            }

            let x1 = (boxes[[0, i, 0]] * width).clamp(0.0, width);
            let y1 = (boxes[[0, i, 1]] * height).clamp(0.0, height);
            let x2 = (boxes[[0, i, 2]] * width).clamp(0.0, width);
            let y2 = (boxes[[0, i, 3]] * height).clamp(0.0, height);

            if x2 <= x1 || y2 <= y1 {
                continue;
            }

            candidates.push(Detection::from_corners(x1, y1, x2, y2, confidence));
        }

        let kept = non_max_suppression(candidates, self.iou_threshold, self.max_detections);

        tracing::trace!(kept = kept.len(), "Parsed face detections");

        Ok(kept)
    }
}

impl Default for PostProcessor {
    fn default() -> Self {
        Self::new(
            DEFAULT_CONFIDENCE_THRESHOLD,
            DEFAULT_IOU_THRESHOLD,
            DEFAULT_MAX_DETECTIONS,
        )
    }
}

/// Greedy NMS: keep the highest-scoring box, drop everything overlapping it
/// by more than `iou_threshold`, repeat.
pub fn non_max_suppression(
    mut candidates: Vec<Detection>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<Detection> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Detection> = Vec::new();
    for candidate in candidates {
        if kept.len() >= max_detections {
            break;
        }
        if kept.iter().all(|k| k.iou(&candidate) <= iou_threshold) {
            kept.push(candidate);
        }
    }
    kept
}
