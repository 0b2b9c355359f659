use crate::Environment;
use crate::logging::{env_filter, fmt_layer};
use anyhow::Context;
use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource,
    metrics::{PeriodicReader, SdkMeterProvider},
    propagation::TraceContextPropagator,
    trace::{Sampler, SdkTracerProvider},
};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const METRIC_EXPORT_INTERVAL: Duration = Duration::from_secs(10);
const DEFAULT_EXPORT_TIMEOUT: Duration = Duration::from_secs(5);

/// Where and how a service exports traces and metrics.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub service_name: String,
    /// OTLP gRPC collector endpoint, e.g. `http://localhost:4317`.
    pub endpoint: String,
    pub environment: Environment,
    /// Fraction of root traces kept, in `[0, 1]`.
    pub sample_ratio: f64,
    pub export_timeout: Duration,
}

impl TelemetryConfig {
    pub fn new(
        service_name: impl Into<String>,
        endpoint: impl Into<String>,
        environment: Environment,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            endpoint: endpoint.into(),
            environment,
            sample_ratio: 1.0,
            export_timeout: DEFAULT_EXPORT_TIMEOUT,
        }
    }

    fn sampler(&self) -> Sampler {
        let root = if self.sample_ratio >= 1.0 {
            Sampler::AlwaysOn
        } else {
            Sampler::TraceIdRatioBased(self.sample_ratio.max(0.0))
        };
        Sampler::ParentBased(Box::new(root))
    }

    fn resource(&self) -> Resource {
        Resource::builder()
            .with_attributes([
                KeyValue::new(
                    opentelemetry_semantic_conventions::attribute::SERVICE_NAME,
                    self.service_name.clone(),
                ),
                KeyValue::new(
                    opentelemetry_semantic_conventions::attribute::SERVICE_VERSION,
                    env!("CARGO_PKG_VERSION"),
                ),
                KeyValue::new("deployment.environment.name", self.environment.as_str()),
            ])
            .build()
    }
}

/// Installs OTLP trace and metric export for the lifetime of the guard;
/// dropping it flushes and shuts both providers down.
///
/// # Example
/// ```ignore
/// let config = TelemetryConfig::new("gateway", "http://localhost:4317", Environment::Production);
/// let _telemetry = TelemetryGuard::init(&config)?;
/// ```
pub struct TelemetryGuard {
    tracer_provider: SdkTracerProvider,
    meter_provider: SdkMeterProvider,
}

impl TelemetryGuard {
    /// Install the OpenTelemetry providers and a `tracing` subscriber that
    /// forwards spans to them. Replaces [`crate::setup_logging`]; call one
    /// or the other.
    pub fn init(config: &TelemetryConfig) -> anyhow::Result<Self> {
        global::set_text_map_propagator(TraceContextPropagator::new());

        let resource = config.resource();
        let tracer_provider = build_tracer_provider(config, resource.clone())?;
        global::set_tracer_provider(tracer_provider.clone());

        let meter_provider = build_meter_provider(config, resource)?;
        global::set_meter_provider(meter_provider.clone());

        let otel_layer = tracing_opentelemetry::layer()
            .with_tracer(global::tracer(config.service_name.clone()));

        tracing_subscriber::registry()
            .with(env_filter())
            .with(otel_layer)
            .with(fmt_layer(config.environment))
            .try_init()
            .context("Tracing subscriber already installed")?;

        tracing::info!(
            service_name = %config.service_name,
            endpoint = %config.endpoint,
            sample_ratio = config.sample_ratio,
            "OpenTelemetry export enabled"
        );

        Ok(Self {
            tracer_provider,
            meter_provider,
        })
    }
}

fn build_tracer_provider(
    config: &TelemetryConfig,
    resource: Resource,
) -> anyhow::Result<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(config.endpoint.as_str())
        .with_timeout(config.export_timeout)
        .build()
        .context("Failed to build OTLP span exporter")?;

    Ok(SdkTracerProvider::builder()
        .with_resource(resource)
        .with_sampler(config.sampler())
        .with_batch_exporter(exporter)
        .build())
}

fn build_meter_provider(
    config: &TelemetryConfig,
    resource: Resource,
) -> anyhow::Result<SdkMeterProvider> {
    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(config.endpoint.as_str())
        .with_timeout(config.export_timeout)
        .build()
        .context("Failed to build OTLP metric exporter")?;

    let reader = PeriodicReader::builder(exporter)
        .with_interval(METRIC_EXPORT_INTERVAL)
        .build();

    Ok(SdkMeterProvider::builder()
        .with_resource(resource)
        .with_reader(reader)
        .build())
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        // The subscriber may already be gone, so report on stderr
        if let Err(e) = self.meter_provider.shutdown() {
            eprintln!("Failed to flush metrics on shutdown: {e:?}");
        }
        if let Err(e) = self.tracer_provider.shutdown() {
            eprintln!("Failed to flush traces on shutdown: {e:?}");
        }
    }
}

/// Creates an info-level span and enters it.
#[macro_export]
macro_rules! span {
    ($name:literal) => {
        tracing::info_span!($name).entered()
    };
}

/// Creates a debug-level span and enters it.
#[macro_export]
macro_rules! span_debug {
    ($name:literal) => {
        tracing::debug_span!($name).entered()
    };
}
