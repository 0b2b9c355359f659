use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnnotateError {
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("image dimensions are zero")]
    EmptyImage,

    #[error("face detection failed: {0}")]
    Detector(#[source] anyhow::Error),

    #[error("resize failed: {0}")]
    Resize(String),

    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    #[error("invalid annotation config: {0}")]
    InvalidConfig(String),
}
