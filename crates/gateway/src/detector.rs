use annotate::FaceDetector;
use anyhow::Context;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OnceCell;

/// When the face detector model is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetectorLoading {
    /// At startup, before the listener binds. A failure aborts startup.
    #[default]
    Eager,
    /// On the first request that needs it. A failure is retried next time.
    Lazy,
}

impl DetectorLoading {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectorLoading::Eager => "eager",
            DetectorLoading::Lazy => "lazy",
        }
    }
}

impl FromStr for DetectorLoading {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "eager" => Ok(Self::Eager),
            "lazy" => Ok(Self::Lazy),
            other => Err(format!(
                "{} is not a supported loading mode. Use either `eager` or `lazy`.",
                other
            )),
        }
    }
}

pub type SharedDetector = Arc<dyn FaceDetector>;

type Loader = Arc<dyn Fn() -> anyhow::Result<SharedDetector> + Send + Sync>;

/// Process-wide face detector, loaded at most once.
pub struct DetectorHandle {
    cell: OnceCell<SharedDetector>,
    loader: Loader,
}

impl DetectorHandle {
    /// Handle that runs `loader` on a blocking thread the first time the
    /// detector is requested.
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> anyhow::Result<SharedDetector> + Send + Sync + 'static,
    {
        Self {
            cell: OnceCell::new(),
            loader: Arc::new(loader),
        }
    }

    /// Handle around an already loaded detector.
    pub fn ready(detector: SharedDetector) -> Self {
        let loader: Loader = Arc::new(|| -> anyhow::Result<SharedDetector> {
            anyhow::bail!("Detector is already loaded")
        });
        Self {
            cell: OnceCell::new_with(Some(detector)),
            loader,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    /// The loaded detector, loading it first if needed. Concurrent callers
    /// wait on a single load; a failed load leaves the handle empty.
    pub async fn get(&self) -> anyhow::Result<SharedDetector> {
        self.cell
            .get_or_try_init(|| async {
                let loader = Arc::clone(&self.loader);
                let started = Instant::now();

                let detector = tokio::task::spawn_blocking(move || loader())
                    .await
                    .context("Detector loading task panicked")??;

                tracing::info!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Face detector loaded"
                );
                Ok::<_, anyhow::Error>(detector)
            })
            .await
            .cloned()
    }
}

/// Loader for the ONNX Runtime UltraFace detector described by `config`.
#[cfg(feature = "ort-backend")]
pub fn ort_loader(
    config: annotate::backend::ort::OrtDetectorConfig,
) -> impl Fn() -> anyhow::Result<SharedDetector> + Send + Sync + 'static {
    move || {
        tracing::info!(
            model_path = %config.model_path.display(),
            provider = config.provider.as_str(),
            "Loading face detector"
        );
        let detector = annotate::backend::ort::OrtFaceDetector::load(&config)?;
        Ok(Arc::new(detector) as SharedDetector)
    }
}
