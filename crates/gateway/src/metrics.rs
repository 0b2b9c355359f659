use opentelemetry::{
    KeyValue, global,
    metrics::{Counter, Histogram},
};

pub const METER_NAME: &str = "gateway";

/// Request-level instruments. Recording is a no-op until a meter provider
/// is installed.
#[derive(Clone)]
pub struct GatewayMetrics {
    duration: Histogram<f64>,
    requests: Counter<u64>,
    failures: Counter<u64>,
    faces: Counter<u64>,
}

impl GatewayMetrics {
    pub fn new(meter_name: &'static str) -> Self {
        let meter = global::meter(meter_name);
        let latency_buckets = [
            0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 0.75, 1.0, 1.5, 2.0, 3.0, 5.0, 10.0,
        ];

        Self {
            duration: meter
                .f64_histogram("annotate_duration_seconds")
                .with_description("Time to annotate one upload (decode to encode)")
                .with_unit("s")
                .with_boundaries(latency_buckets.to_vec())
                .build(),
            requests: meter
                .u64_counter("annotate_requests_total")
                .with_description("Total annotation requests received")
                .build(),
            failures: meter
                .u64_counter("annotate_failures_total")
                .with_description("Total annotation requests that failed")
                .build(),
            faces: meter
                .u64_counter("faces_detected_total")
                .with_description("Total faces detected across all uploads")
                .build(),
        }
    }

    pub fn record_request(&self) {
        self.requests.add(1, &[]);
    }

    pub fn record_success(&self, seconds: f64, faces: usize) {
        self.duration.record(seconds, &[]);
        self.faces.add(faces as u64, &[]);
    }

    pub fn record_failure(&self, reason: &'static str) {
        self.failures.add(1, &[KeyValue::new("reason", reason)]);
    }
}

impl Default for GatewayMetrics {
    fn default() -> Self {
        Self::new(METER_NAME)
    }
}
