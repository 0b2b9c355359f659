use annotate::{
    AnnotateConfig, AnnotateError, ColorOrder, Detection, FaceDetector, PixelBox, Pipeline,
    draw, imaging,
};
use image::{Rgb, RgbImage};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Detector that returns a scripted list of boxes and counts its calls.
struct ScriptedDetector {
    detections: Vec<Detection>,
    calls: AtomicUsize,
}

impl ScriptedDetector {
    fn new(detections: Vec<Detection>) -> Self {
        Self {
            detections,
            calls: AtomicUsize::new(0),
        }
    }
}

impl FaceDetector for ScriptedDetector {
    fn color_order(&self) -> ColorOrder {
        ColorOrder::Bgr
    }

    fn detect(&self, _pixels: &[u8], _width: u32, _height: u32) -> anyhow::Result<Vec<Detection>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.detections.clone())
    }
}

/// Deterministic high-frequency texture so blur has something to remove.
fn noise_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let v = (x.wrapping_mul(73) ^ y.wrapping_mul(151)).wrapping_mul(2654435761) >> 24;
        Rgb([v as u8, (v as u8).wrapping_add(64), 255 - v as u8])
    })
}

fn smooth_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width) as u8,
            (y * 255 / height) as u8,
            ((x + y) * 127 / (width + height)) as u8,
        ])
    })
}

fn png_bytes(image: &RgbImage) -> Vec<u8> {
    let mut bytes = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, image::ImageFormat::Png)
        .unwrap();
    bytes.into_inner()
}

fn mean_abs_diff(a: &RgbImage, b: &RgbImage) -> f64 {
    let total: u64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| x.abs_diff(*y) as u64)
        .sum();
    total as f64 / a.as_raw().len() as f64
}

fn variance(image: &RgbImage, region: &PixelBox) -> f64 {
    let mut values = Vec::new();
    for y in region.y..region.bottom() {
        for x in region.x..region.right() {
            values.push(image.get_pixel(x, y)[0] as f64);
        }
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

#[test]
fn test_no_faces_returns_input_up_to_jpeg_loss() {
    let input = smooth_image(120, 80);
    let detector = ScriptedDetector::new(vec![]);
    let pipeline = Pipeline::new(AnnotateConfig {
        enhance: false,
        ..Default::default()
    })
    .unwrap();

    let annotated = pipeline.annotate(&detector, &png_bytes(&input)).unwrap();

    assert_eq!(annotated.count, 0);
    assert_eq!((annotated.width, annotated.height), (120, 80));
    let output = imaging::decode(&annotated.jpeg).unwrap();
    assert!(
        mean_abs_diff(&input, &output) < 3.0,
        "Output should only differ by compression artifacts"
    );
}

#[test]
fn test_enhancement_preserves_dimensions() {
    for (width, height) in [(64, 48), (101, 37), (1, 1)] {
        let input = smooth_image(width, height);
        let detector = ScriptedDetector::new(vec![Detection::new(2.0, 2.0, 30.0, 30.0, 0.9)]);
        let pipeline = Pipeline::new(AnnotateConfig::default()).unwrap();

        let annotated = pipeline.annotate(&detector, &png_bytes(&input)).unwrap();
        let output = imaging::decode(&annotated.jpeg).unwrap();

        assert_eq!(output.dimensions(), (width, height));
        assert_eq!((annotated.width, annotated.height), (width, height));
    }
}

#[test]
fn test_labels_numbered_left_to_right() {
    let input = RgbImage::from_pixel(300, 80, Rgb([100, 100, 100]));
    let detector = ScriptedDetector::new(vec![
        Detection::new(210.0, 10.0, 50.0, 50.0, 0.91),
        Detection::new(20.0, 10.0, 50.0, 50.0, 0.72),
        Detection::new(115.0, 10.0, 50.0, 50.0, 0.99),
    ]);
    let pipeline = Pipeline::new(AnnotateConfig {
        enhance: false,
        anonymize: false,
        ..Default::default()
    })
    .unwrap();

    let rendered = pipeline.render(&detector, input).unwrap();

    assert_eq!(rendered.count, 3);
    let ranks: Vec<usize> = rendered.labels.iter().map(|l| l.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3]);

    // Each digit is drawn inside its own box, ordered by left edge
    for label in &rendered.labels {
        let text = label.rank.to_string();
        let (left, top) = draw::label_origin(&label.bbox, &text);
        let digit = label.rank as u32;
        for row in 0..5 {
            for col in 0..3 {
                if draw::glyph_bit(digit, row, col) {
                    let (x, y) = draw::glyph_cell_center(left, top, 0, row, col);
                    assert!(label.bbox.contains(x as u32, y as u32));
                    assert_eq!(*rendered.image.get_pixel(x as u32, y as u32), draw::LABEL_COLOR);
                }
            }
        }
    }
    let lefts: Vec<u32> = rendered.labels.iter().map(|l| l.bbox.x).collect();
    assert_eq!(lefts, vec![20, 115, 210]);
}

#[test]
fn test_repeated_runs_are_identical() {
    let bytes = png_bytes(&noise_image(90, 60));
    let detector = ScriptedDetector::new(vec![
        Detection::new(60.0, 20.0, 40.0, 40.0, 0.8),
        Detection::new(10.0, 20.0, 40.0, 40.0, 0.8),
        Detection::new(60.0, 60.0, 40.0, 40.0, 0.8),
    ]);
    let pipeline = Pipeline::new(AnnotateConfig::default()).unwrap();

    let first = pipeline.annotate(&detector, &bytes).unwrap();
    let second = pipeline.annotate(&detector, &bytes).unwrap();

    assert_eq!(detector.calls.load(Ordering::SeqCst), 2);
    assert_eq!(first.count, second.count);
    assert_eq!(first.jpeg, second.jpeg);
}

#[test]
fn test_anonymization_blurs_inside_and_keeps_outside() {
    let input = noise_image(160, 120);
    let face = Detection::new(40.0, 30.0, 60.0, 50.0, 0.95);
    let detector = ScriptedDetector::new(vec![face]);
    let pipeline = Pipeline::new(AnnotateConfig {
        enhance: false,
        label_background: false,
        ..Default::default()
    })
    .unwrap();

    let rendered = pipeline.render(&detector, input.clone()).unwrap();
    let bbox = PixelBox::clamp(&face, 160, 120);

    // Inner region clear of the outline and the label
    let interior = PixelBox {
        x: bbox.x + 3,
        y: bbox.y + 3,
        width: bbox.width - 6,
        height: bbox.height - 24,
    };
    assert!(variance(&rendered.image, &interior) < variance(&input, &interior) / 4.0);

    for (x, y, pixel) in rendered.image.enumerate_pixels() {
        if !bbox.contains(x, y) {
            assert_eq!(pixel, input.get_pixel(x, y), "pixel ({x}, {y}) outside box changed");
        }
    }
}

#[test]
fn test_non_image_bytes_fail_without_detection() {
    let detector = ScriptedDetector::new(vec![]);
    let pipeline = Pipeline::new(AnnotateConfig::default()).unwrap();

    let result = pipeline.annotate(&detector, b"%PDF-1.7 definitely not an image");

    assert!(matches!(result, Err(AnnotateError::Decode(_))));
    assert_eq!(detector.calls.load(Ordering::SeqCst), 0);
}
