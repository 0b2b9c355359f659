use crate::{config::GatewayConfig, error::ApiError, metrics::GatewayMetrics, state::AppState};
use axum::{
    Json, Router,
    body::Bytes,
    extract::{
        DefaultBodyLimit, Multipart, State,
        multipart::MultipartRejection,
    },
    response::Html,
    routing::get,
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

const FILE_FIELD: &str = "file";
const INDEX_HTML: &str = include_str!("../static/index.html");

#[derive(Debug, Serialize)]
pub struct AnnotateResponse {
    pub count: usize,
    /// Annotated image, base64-encoded JPEG.
    pub image: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub detector_loaded: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index).post(upload))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run_server(config: &GatewayConfig, state: AppState) -> anyhow::Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.addr).await?;
    tracing::info!("HTTP server listening on {}", config.addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        detector_loaded: state.detector.is_loaded(),
    })
}

async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnnotateResponse>, ApiError> {
    state.metrics.record_request();

    let data = match read_upload(multipart).await {
        Ok(data) => data,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected upload");
            state.metrics.record_failure("bad_request");
            return Err(e);
        }
    };

    let started = Instant::now();
    let upload_bytes = data.len();

    let detector = state
        .detector
        .get()
        .await
        .map_err(|e| processing_failed(&state.metrics, "detector_unavailable", format!("{e:#}")))?;

    let pipeline = Arc::clone(&state.pipeline);
    let annotated = tokio::task::spawn_blocking(move || pipeline.annotate(detector.as_ref(), &data))
        .await
        .map_err(|e| processing_failed(&state.metrics, "task_failed", e))?
        .map_err(|e| processing_failed(&state.metrics, "annotate", e))?;

    let elapsed = started.elapsed();
    state
        .metrics
        .record_success(elapsed.as_secs_f64(), annotated.count);

    tracing::info!(
        faces = annotated.count,
        width = annotated.width,
        height = annotated.height,
        upload_bytes,
        jpeg_bytes = annotated.jpeg.len(),
        elapsed_ms = elapsed.as_millis() as u64,
        "Annotated upload"
    );

    Ok(Json(AnnotateResponse {
        count: annotated.count,
        image: STANDARD.encode(&annotated.jpeg),
    }))
}

/// Pull the `file` field out of the form. A body that is not multipart at
/// all carries no file part either.
async fn read_upload(multipart: Result<Multipart, MultipartRejection>) -> Result<Bytes, ApiError> {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            tracing::debug!(%rejection, "Request body is not multipart");
            return Err(ApiError::NoFilePart);
        }
    };

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let has_file_name = field.file_name().is_some_and(|name| !name.is_empty());
        if !has_file_name {
            return Err(ApiError::NoSelectedFile);
        }

        let data = field.bytes().await?;
        if data.is_empty() {
            return Err(ApiError::NoSelectedFile);
        }
        return Ok(data);
    }

    Err(ApiError::NoFilePart)
}

fn processing_failed(
    metrics: &GatewayMetrics,
    reason: &'static str,
    error: impl std::fmt::Display,
) -> ApiError {
    tracing::error!(reason, error = %error, "Annotation failed");
    metrics.record_failure(reason);
    ApiError::Processing(error.to_string())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
