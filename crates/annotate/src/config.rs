use crate::error::AnnotateError;

pub const DEFAULT_SCALE_FACTOR: u32 = 2;
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Product-level toggles and tuning for the annotation pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotateConfig {
    /// Upscale and sharpen before detection, downscale back afterwards.
    pub enhance: bool,
    /// Upscale factor used when `enhance` is set.
    pub scale_factor: u32,
    /// Sigma of the Gaussian used by the unsharp mask.
    pub sharpen_sigma: f32,
    /// Unsharp mask weight: `(1 + amount) * image - amount * blurred`.
    pub sharpen_amount: f32,
    /// Blur each detected face before drawing its outline.
    pub anonymize: bool,
    /// Sigma of the anonymization blur.
    pub blur_sigma: f32,
    /// Paint an opaque box behind each rank label.
    pub label_background: bool,
    pub jpeg_quality: u8,
}

impl Default for AnnotateConfig {
    fn default() -> Self {
        Self {
            enhance: true,
            scale_factor: DEFAULT_SCALE_FACTOR,
            sharpen_sigma: 1.0,
            sharpen_amount: 0.5,
            anonymize: true,
            blur_sigma: 10.0,
            label_background: true,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl AnnotateConfig {
    pub fn validate(&self) -> Result<(), AnnotateError> {
        if self.scale_factor == 0 {
            return Err(AnnotateError::InvalidConfig(
                "scale_factor must be > 0".to_string(),
            ));
        }
        if !(self.sharpen_sigma.is_finite() && self.sharpen_sigma > 0.0) {
            return Err(AnnotateError::InvalidConfig(format!(
                "sharpen_sigma must be > 0, got {}",
                self.sharpen_sigma
            )));
        }
        if !(self.sharpen_amount.is_finite() && self.sharpen_amount >= 0.0) {
            return Err(AnnotateError::InvalidConfig(format!(
                "sharpen_amount must be >= 0, got {}",
                self.sharpen_amount
            )));
        }
        if !(self.blur_sigma.is_finite() && self.blur_sigma > 0.0) {
            return Err(AnnotateError::InvalidConfig(format!(
                "blur_sigma must be > 0, got {}",
                self.blur_sigma
            )));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(AnnotateError::InvalidConfig(format!(
                "jpeg_quality must be between 1 and 100, got {}",
                self.jpeg_quality
            )));
        }
        Ok(())
    }

    /// Effective upscale factor: 1 when enhancement is off.
    pub fn working_scale(&self) -> u32 {
        if self.enhance { self.scale_factor } else { 1 }
    }
}
