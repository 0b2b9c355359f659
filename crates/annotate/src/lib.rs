pub mod backend;
pub mod config;
pub mod detection;
pub mod detector;
pub mod draw;
pub mod error;
pub mod imaging;
pub mod pipeline;
pub mod processing;

// Re-export commonly used types for convenience
pub use config::AnnotateConfig;
pub use detection::{Detection, PixelBox, sort_left_to_right};
pub use detector::{ColorOrder, FaceDetector};
pub use error::AnnotateError;
pub use pipeline::{Annotated, Label, Pipeline, Rendered};
