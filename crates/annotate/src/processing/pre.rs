use common::span;
use fast_image_resize::{
    FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer,
    images::{Image, ImageRef},
};
use ndarray::{Array, IxDyn};

pub const DEFAULT_INPUT_SIZE: (u32, u32) = (320, 240);

const PIXEL_MEAN: f32 = 127.0;
const PIXEL_SCALE: f32 = 128.0;

/// Turns an RGB buffer into the `[1, 3, H, W]` tensor UltraFace expects.
///
/// The image is stretched to the model size without letterboxing; the
/// model emits boxes normalized to the input, so mapping back only needs
/// the original dimensions.
#[derive(Debug, Clone)]
pub struct PreProcessor {
    pub input_size: (u32, u32),
}

impl PreProcessor {
    pub fn new(input_size: (u32, u32)) -> Self {
        Self { input_size }
    }

    pub fn preprocess(
        &self,
        pixels: &[u8],
        width: u32,
        height: u32,
    ) -> anyhow::Result<Array<f32, IxDyn>> {
        let _s = span!("preprocess");

        let expected_size = (width as usize) * (height as usize) * 3;
        if pixels.len() != expected_size {
            anyhow::bail!(
                "Buffer size mismatch: expected {}, got {} bytes",
                expected_size,
                pixels.len()
            );
        }

        let resized = self.resize(pixels, width, height)?;
        self.normalize(&resized)
    }

    fn resize(&self, pixels: &[u8], width: u32, height: u32) -> anyhow::Result<Vec<u8>> {
        let (input_width, input_height) = self.input_size;
        if (width, height) == self.input_size {
            return Ok(pixels.to_vec());
        }

        let src = ImageRef::new(width, height, pixels, PixelType::U8x3)?;
        let mut resized = Image::new(input_width, input_height, PixelType::U8x3);

        Resizer::new().resize(
            &src,
            &mut resized,
            &ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
        )?;

        Ok(resized.into_vec())
    }

    fn normalize(&self, rgb: &[u8]) -> anyhow::Result<Array<f32, IxDyn>> {
        let (width, height) = (self.input_size.0 as usize, self.input_size.1 as usize);
        let spatial = width * height;

        let mut output = vec![0.0f32; 3 * spatial];
        for (i, px) in rgb.chunks_exact(3).enumerate() {
            output[i] = (px[0] as f32 - PIXEL_MEAN) / PIXEL_SCALE;
            output[i + spatial] = (px[1] as f32 - PIXEL_MEAN) / PIXEL_SCALE;
            output[i + 2 * spatial] = (px[2] as f32 - PIXEL_MEAN) / PIXEL_SCALE;
        }

        Ok(Array::from_shape_vec(
            IxDyn(&[1, 3, height, width]),
            output,
        )?)
    }
}

impl Default for PreProcessor {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT_SIZE)
    }
}
