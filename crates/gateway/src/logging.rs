use crate::config::GatewayConfig;
use common::{TelemetryConfig, TelemetryGuard};

const SERVICE_NAME: &str = "gateway";

/// Install tracing for the gateway: OTLP export when an endpoint is
/// configured, plain console logging otherwise.
///
/// Keep the returned guard alive for the lifetime of the process.
pub fn setup_logging(config: &GatewayConfig) -> anyhow::Result<Option<TelemetryGuard>> {
    let Some(endpoint) = config.otel_endpoint.as_deref() else {
        common::setup_logging(config.environment);
        return Ok(None);
    };

    let mut telemetry = TelemetryConfig::new(SERVICE_NAME, endpoint, config.environment);
    telemetry.sample_ratio = config.trace_sample_ratio;

    TelemetryGuard::init(&telemetry).map(Some)
}
