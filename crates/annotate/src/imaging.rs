use crate::detection::PixelBox;
use crate::error::AnnotateError;
use common::span_debug;
use fast_image_resize::{
    FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer,
    images::{Image, ImageRef},
};
use image::{RgbImage, codecs::jpeg::JpegEncoder, imageops};
use imageproc::filter::gaussian_blur_f32;

/// Decode an uploaded buffer into display-ordered RGB.
pub fn decode(bytes: &[u8]) -> Result<RgbImage, AnnotateError> {
    let _s = span_debug!("decode");

    let image = image::load_from_memory(bytes).map_err(AnnotateError::Decode)?;
    if image.width() == 0 || image.height() == 0 {
        return Err(AnnotateError::EmptyImage);
    }

    tracing::trace!(
        width = image.width(),
        height = image.height(),
        color = ?image.color(),
        "Decoded image"
    );

    Ok(image.to_rgb8())
}

pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, AnnotateError> {
    let _s = span_debug!("encode_jpeg");

    let mut jpeg_bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg_bytes, quality)
        .encode_image(image)
        .map_err(AnnotateError::Encode)?;

    Ok(jpeg_bytes)
}

fn resize(
    image: &RgbImage,
    width: u32,
    height: u32,
    algorithm: ResizeAlg,
) -> Result<RgbImage, AnnotateError> {
    let src = ImageRef::new(image.width(), image.height(), image.as_raw(), PixelType::U8x3)
        .map_err(|e| AnnotateError::Resize(e.to_string()))?;

    let mut dst = Image::new(width, height, PixelType::U8x3);

    Resizer::new()
        .resize(&src, &mut dst, &ResizeOptions::new().resize_alg(algorithm))
        .map_err(|e| AnnotateError::Resize(e.to_string()))?;

    RgbImage::from_raw(width, height, dst.into_vec()).ok_or_else(|| {
        AnnotateError::Resize(format!("resized buffer does not match {width}x{height}"))
    })
}

/// Upscale by `factor` with a cubic kernel.
pub fn upscale(image: &RgbImage, factor: u32) -> Result<RgbImage, AnnotateError> {
    let _s = span_debug!("upscale");

    let (width, height) = image
        .width()
        .checked_mul(factor)
        .zip(image.height().checked_mul(factor))
        .ok_or_else(|| {
            AnnotateError::Resize(format!(
                "{}x{} cannot be scaled by {factor}",
                image.width(),
                image.height()
            ))
        })?;

    resize(
        image,
        width,
        height,
        ResizeAlg::Convolution(FilterType::CatmullRom),
    )
}

/// Shrink to `width` x `height` by area averaging, which keeps thin drawn
/// lines and text free of aliasing.
pub fn downscale(image: &RgbImage, width: u32, height: u32) -> Result<RgbImage, AnnotateError> {
    let _s = span_debug!("downscale");

    if image.dimensions() == (width, height) {
        return Ok(image.clone());
    }
    resize(image, width, height, ResizeAlg::Convolution(FilterType::Box))
}

/// `(1 + amount) * image - amount * gaussian(image, sigma)`, saturated to u8.
pub fn unsharp_mask(image: &RgbImage, sigma: f32, amount: f32) -> RgbImage {
    let _s = span_debug!("unsharp_mask");

    let blurred = gaussian_blur_f32(image, sigma);
    let mut sharpened = image.clone();

    for (out, &soft) in sharpened.iter_mut().zip(blurred.iter()) {
        let value = (1.0 + amount) * *out as f32 - amount * soft as f32;
        *out = value.round().clamp(0.0, 255.0) as u8;
    }

    sharpened
}

/// Replace the pixels inside `region` with a Gaussian-blurred copy.
pub fn blur_region(image: &mut RgbImage, region: &PixelBox, sigma: f32) {
    if region.is_empty() {
        return;
    }

    let face = imageops::crop_imm(&*image, region.x, region.y, region.width, region.height).to_image();
    let blurred = gaussian_blur_f32(&face, sigma);
    imageops::replace(image, &blurred, region.x as i64, region.y as i64);
}
