use super::ExecutionProvider;
use crate::{
    detection::Detection,
    detector::{ColorOrder, FaceDetector},
    processing::{
        post::{
            DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_IOU_THRESHOLD, DEFAULT_MAX_DETECTIONS,
            PostProcessor,
        },
        pre::{DEFAULT_INPUT_SIZE, PreProcessor},
    },
};
use anyhow::Context;
use ort::{
    session::{Session, builder::GraphOptimizationLevel},
    value::TensorRef,
};
use std::path::PathBuf;
use std::sync::Mutex;

const INPUT_NAME: &str = "input";
const SCORES_OUTPUT: &str = "scores";
const BOXES_OUTPUT: &str = "boxes";

#[derive(Debug, Clone)]
pub struct OrtDetectorConfig {
    pub model_path: PathBuf,
    pub input_size: (u32, u32),
    pub provider: ExecutionProvider,
    pub intra_threads: usize,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl OrtDetectorConfig {
    pub fn new(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
            input_size: DEFAULT_INPUT_SIZE,
            provider: ExecutionProvider::Cpu,
            intra_threads: 4,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            iou_threshold: DEFAULT_IOU_THRESHOLD,
            max_detections: DEFAULT_MAX_DETECTIONS,
        }
    }
}

/// UltraFace (RFB-320 / RFB-640) detector on ONNX Runtime.
///
/// The session needs exclusive access per run, so concurrent requests
/// serialize on it.
pub struct OrtFaceDetector {
    session: Mutex<Session>,
    preprocessor: PreProcessor,
    postprocessor: PostProcessor,
}

impl OrtFaceDetector {
    pub fn load(config: &OrtDetectorConfig) -> anyhow::Result<Self> {
        // Initialize ORT environment (idempotent)
        let _ = ort::init().commit();

        let mut builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(config.intra_threads)?;

        match config.provider {
            ExecutionProvider::Cuda => {
                tracing::info!("Initializing ONNX Runtime with CUDA execution provider");
                builder = builder.with_execution_providers([
                    ort::execution_providers::CUDAExecutionProvider::default()
                        .with_device_id(0)
                        .build()
                        .error_on_failure(),
                ])?;
            }
            ExecutionProvider::Cpu => {
                tracing::info!("Initializing ONNX Runtime with CPU execution provider");
            }
        }

        let session = builder
            .commit_from_file(&config.model_path)
            .with_context(|| {
                format!(
                    "Failed to load face detection model from {}",
                    config.model_path.display()
                )
            })?;

        tracing::info!(
            model_path = %config.model_path.display(),
            input_width = config.input_size.0,
            input_height = config.input_size.1,
            "Face detection model loaded"
        );

        Ok(Self {
            session: Mutex::new(session),
            preprocessor: PreProcessor::new(config.input_size),
            postprocessor: PostProcessor::new(
                config.confidence_threshold,
                config.iou_threshold,
                config.max_detections,
            ),
        })
    }
}

impl FaceDetector for OrtFaceDetector {
    fn color_order(&self) -> ColorOrder {
        ColorOrder::Rgb
    }

    fn detect(&self, pixels: &[u8], width: u32, height: u32) -> anyhow::Result<Vec<Detection>> {
        let input = self.preprocessor.preprocess(pixels, width, height)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow::anyhow!("ONNX session lock poisoned"))?;

        let outputs = {
            let _infer_span = tracing::info_span!("model_inference").entered();
            session.run(ort::inputs![
                INPUT_NAME => TensorRef::from_array_view(input.view())?
            ])?
        };

        let scores = outputs[SCORES_OUTPUT].try_extract_array::<f32>()?;
        let boxes = outputs[BOXES_OUTPUT].try_extract_array::<f32>()?;

        self.postprocessor
            .parse_detections(&scores, &boxes, width, height)
    }
}
