use crate::detector::DetectorLoading;
use annotate::{
    AnnotateConfig,
    backend::ExecutionProvider,
    config::{DEFAULT_JPEG_QUALITY, DEFAULT_SCALE_FACTOR},
    processing::{
        post::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_IOU_THRESHOLD, DEFAULT_MAX_DETECTIONS},
        pre::DEFAULT_INPUT_SIZE,
    },
};
use common::env_or;
use std::env;
use std::path::PathBuf;

pub use common::Environment;

pub const DEFAULT_ADDR: &str = "0.0.0.0:5000";
pub const DEFAULT_MODEL_PATH: &str = "models/version-RFB-320.onnx";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub environment: Environment,
    pub addr: String,
    pub model_path: PathBuf,
    pub model_input_size: (u32, u32),
    pub execution_provider: ExecutionProvider,
    pub intra_threads: usize,
    pub detector_loading: DetectorLoading,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
    pub annotate: AnnotateConfig,
    pub max_upload_bytes: usize,
    pub otel_endpoint: Option<String>,
    pub trace_sample_ratio: f64,
}

impl GatewayConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = AnnotateConfig::default();

        let annotate = AnnotateConfig {
            enhance: env_or("GATEWAY_ENHANCE", defaults.enhance),
            scale_factor: env_or("GATEWAY_SCALE_FACTOR", DEFAULT_SCALE_FACTOR),
            anonymize: env_or("GATEWAY_ANONYMIZE", defaults.anonymize),
            blur_sigma: env_or("GATEWAY_BLUR_SIGMA", defaults.blur_sigma),
            label_background: env_or("GATEWAY_LABEL_BACKGROUND", defaults.label_background),
            jpeg_quality: env_or("GATEWAY_JPEG_QUALITY", DEFAULT_JPEG_QUALITY),
            ..defaults
        };
        annotate.validate()?;

        let otel_endpoint = env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
            .ok()
            .filter(|s| !s.trim().is_empty());

        Ok(Self {
            environment: Environment::from_env(),
            addr: env_or("GATEWAY_ADDR", DEFAULT_ADDR.to_string()),
            model_path: env_or("GATEWAY_MODEL_PATH", PathBuf::from(DEFAULT_MODEL_PATH)),
            model_input_size: (
                env_or("GATEWAY_MODEL_INPUT_WIDTH", DEFAULT_INPUT_SIZE.0),
                env_or("GATEWAY_MODEL_INPUT_HEIGHT", DEFAULT_INPUT_SIZE.1),
            ),
            execution_provider: env_or("GATEWAY_EXECUTION_PROVIDER", ExecutionProvider::Cpu),
            intra_threads: env_or("GATEWAY_INTRA_THREADS", 4),
            detector_loading: env_or("GATEWAY_DETECTOR_LOADING", DetectorLoading::Eager),
            confidence_threshold: env_or(
                "GATEWAY_CONFIDENCE_THRESHOLD",
                DEFAULT_CONFIDENCE_THRESHOLD,
            ),
            iou_threshold: env_or("GATEWAY_IOU_THRESHOLD", DEFAULT_IOU_THRESHOLD),
            max_detections: env_or("GATEWAY_MAX_DETECTIONS", DEFAULT_MAX_DETECTIONS),
            annotate,
            max_upload_bytes: env_or("GATEWAY_MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES),
            otel_endpoint,
            trace_sample_ratio: env_or("GATEWAY_TRACE_SAMPLE_RATIO", 1.0),
        })
    }

    #[cfg(feature = "ort-backend")]
    pub fn detector_config(&self) -> annotate::backend::ort::OrtDetectorConfig {
        annotate::backend::ort::OrtDetectorConfig {
            model_path: self.model_path.clone(),
            input_size: self.model_input_size,
            provider: self.execution_provider,
            intra_threads: self.intra_threads,
            confidence_threshold: self.confidence_threshold,
            iou_threshold: self.iou_threshold,
            max_detections: self.max_detections,
        }
    }
}
