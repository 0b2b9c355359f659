use annotate::Pipeline;
use anyhow::Context;
use gateway::{
    AppState, DetectorHandle, DetectorLoading, GatewayConfig, detector::ort_loader,
    logging::setup_logging, run_server,
};

#[cfg(not(feature = "ort-backend"))]
compile_error!("The gateway binary needs a detector backend. Enable the `ort-backend` feature.");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GatewayConfig::from_env().context("Invalid gateway configuration")?;
    let _telemetry = setup_logging(&config)?;

    tracing::info!(
        environment = config.environment.as_str(),
        addr = %config.addr,
        model_path = %config.model_path.display(),
        provider = config.execution_provider.as_str(),
        detector_loading = config.detector_loading.as_str(),
        enhance = config.annotate.enhance,
        anonymize = config.annotate.anonymize,
        "Gateway starting"
    );

    let pipeline = Pipeline::new(config.annotate.clone())?;
    let detector = DetectorHandle::new(ort_loader(config.detector_config()));

    if config.detector_loading == DetectorLoading::Eager {
        detector
            .get()
            .await
            .context("Failed to load face detector at startup")?;
    }

    let state = AppState::new(pipeline, detector, config.max_upload_bytes);
    run_server(&config, state).await
}
