use crate::detection::Detection;
use std::borrow::Cow;

/// Channel ordering of a packed 3-byte pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorOrder {
    #[default]
    Rgb,
    Bgr,
}

impl ColorOrder {
    /// Reorder RGB pixels into `self`. Borrows when no conversion is needed.
    pub fn reorder<'a>(&self, rgb: &'a [u8]) -> Cow<'a, [u8]> {
        match self {
            ColorOrder::Rgb => Cow::Borrowed(rgb),
            ColorOrder::Bgr => Cow::Owned(swap_red_blue(rgb)),
        }
    }
}

/// Swap the first and third channel of every pixel (RGB <-> BGR).
pub fn swap_red_blue(pixels: &[u8]) -> Vec<u8> {
    let mut swapped = Vec::with_capacity(pixels.len());
    for chunk in pixels.chunks_exact(3) {
        swapped.push(chunk[2]);
        swapped.push(chunk[1]);
        swapped.push(chunk[0]);
    }
    swapped
}

/// Pluggable face detection backend.
///
/// A single instance is shared by every in-flight request, so
/// implementations must tolerate concurrent `detect` calls.
pub trait FaceDetector: Send + Sync {
    /// Channel order `detect` expects its pixels in.
    fn color_order(&self) -> ColorOrder {
        ColorOrder::Rgb
    }

    /// Detect faces in a packed `width` x `height` x 3 buffer laid out in
    /// [`FaceDetector::color_order`]. Boxes are in the buffer's pixel space.
    fn detect(&self, pixels: &[u8], width: u32, height: u32) -> anyhow::Result<Vec<Detection>>;
}

impl<T: FaceDetector + ?Sized> FaceDetector for std::sync::Arc<T> {
    fn color_order(&self) -> ColorOrder {
        (**self).color_order()
    }

    fn detect(&self, pixels: &[u8], width: u32, height: u32) -> anyhow::Result<Vec<Detection>> {
        (**self).detect(pixels, width, height)
    }
}
