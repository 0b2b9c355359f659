use crate::config::Environment;
use tracing::Subscriber;
use tracing_subscriber::{
    EnvFilter, Layer, layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt,
};

/// Initialize the tracing subscriber: pretty output for development,
/// JSON lines for production.
///
/// Filtering follows `RUST_LOG` and defaults to `info`. Services exporting
/// to an OTLP collector should use [`crate::TelemetryGuard::init`] instead,
/// which installs the same formatting plus the OpenTelemetry bridge.
pub fn setup_logging(environment: Environment) {
    let result = tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt_layer(environment))
        .try_init();

    if let Err(e) = result {
        eprintln!("Tracing subscriber already installed: {e}");
    }
}

pub(crate) fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

pub(crate) fn fmt_layer<S>(environment: Environment) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    match environment {
        Environment::Production => tracing_subscriber::fmt::layer()
            .json()
            .with_level(true)
            .with_current_span(true)
            .boxed(),
        Environment::Development => tracing_subscriber::fmt::layer()
            .pretty()
            .with_ansi(true)
            .boxed(),
    }
}
