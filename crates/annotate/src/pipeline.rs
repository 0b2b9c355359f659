use crate::{
    config::AnnotateConfig,
    detection::{PixelBox, sort_left_to_right},
    detector::FaceDetector,
    draw, imaging,
    error::AnnotateError,
};
use common::span;
use image::RgbImage;

/// Encoded result of one annotation request.
#[derive(Debug, Clone)]
pub struct Annotated {
    /// Number of faces the detector reported.
    pub count: usize,
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// A drawn rank label and the box it belongs to, in working-image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label {
    /// 1-based position in left-to-right order.
    pub rank: usize,
    pub bbox: PixelBox,
}

/// Annotated image before encoding.
#[derive(Debug, Clone)]
pub struct Rendered {
    /// Final image at the input's dimensions.
    pub image: RgbImage,
    pub count: usize,
    pub labels: Vec<Label>,
    /// Factor between label coordinates and `image` coordinates.
    pub working_scale: u32,
}

/// Decode, detect, annotate and encode uploaded images.
///
/// Holds no per-request state; one instance serves every request.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: AnnotateConfig,
}

impl Pipeline {
    pub fn new(config: AnnotateConfig) -> Result<Self, AnnotateError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnnotateConfig {
        &self.config
    }

    /// Run the full pipeline over raw upload bytes.
    pub fn annotate(
        &self,
        detector: &dyn FaceDetector,
        raw_bytes: &[u8],
    ) -> Result<Annotated, AnnotateError> {
        let _s = span!("annotate");

        let image = imaging::decode(raw_bytes)?;
        let rendered = self.render(detector, image)?;
        let jpeg = imaging::encode_jpeg(&rendered.image, self.config.jpeg_quality)?;

        tracing::debug!(
            faces = rendered.count,
            width = rendered.image.width(),
            height = rendered.image.height(),
            jpeg_bytes = jpeg.len(),
            "Image annotated"
        );

        Ok(Annotated {
            count: rendered.count,
            jpeg,
            width: rendered.image.width(),
            height: rendered.image.height(),
        })
    }

    /// Detect and draw on an already decoded image.
    pub fn render(
        &self,
        detector: &dyn FaceDetector,
        image: RgbImage,
    ) -> Result<Rendered, AnnotateError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(AnnotateError::EmptyImage);
        }

        let (orig_width, orig_height) = image.dimensions();
        let working_scale = self.config.working_scale();

        let mut working = if self.config.enhance {
            let upscaled = imaging::upscale(&image, self.config.scale_factor)?;
            drop(image);
            imaging::unsharp_mask(
                &upscaled,
                self.config.sharpen_sigma,
                self.config.sharpen_amount,
            )
        } else {
            image
        };

        let mut detections = {
            let _s = span!("detect_faces");
            let (width, height) = working.dimensions();
            let pixels = detector.color_order().reorder(working.as_raw());
            detector
                .detect(&pixels, width, height)
                .map_err(AnnotateError::Detector)?
        };
        let count = detections.len();

        sort_left_to_right(&mut detections);

        let labels = {
            let _s = span!("draw_annotations");
            let (width, height) = working.dimensions();
            let mut labels = Vec::with_capacity(count);

            for (i, detection) in detections.iter().enumerate() {
                let rank = i + 1;
                let bbox = PixelBox::clamp(detection, width, height);
                if bbox.is_empty() {
                    tracing::debug!(rank, ?detection, "Skipping face outside the image");
                    continue;
                }

                if self.config.anonymize {
                    imaging::blur_region(&mut working, &bbox, self.config.blur_sigma);
                }
                draw::draw_outline(&mut working, &bbox);
                draw::draw_label(&mut working, &bbox, rank, self.config.label_background);

                labels.push(Label { rank, bbox });
            }
            labels
        };

        let image = if working.dimensions() != (orig_width, orig_height) {
            imaging::downscale(&working, orig_width, orig_height)?
        } else {
            working
        };

        Ok(Rendered {
            image,
            count,
            labels,
            working_scale,
        })
    }
}
