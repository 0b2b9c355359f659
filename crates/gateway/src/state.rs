use crate::{detector::DetectorHandle, metrics::GatewayMetrics};
use annotate::Pipeline;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub detector: Arc<DetectorHandle>,
    pub metrics: GatewayMetrics,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(pipeline: Pipeline, detector: DetectorHandle, max_upload_bytes: usize) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            detector: Arc::new(detector),
            metrics: GatewayMetrics::default(),
            max_upload_bytes,
        }
    }
}
