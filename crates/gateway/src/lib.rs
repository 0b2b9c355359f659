pub mod config;
pub mod detector;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod routes;
pub mod state;

pub use config::GatewayConfig;
pub use detector::{DetectorHandle, DetectorLoading};
pub use routes::{router, run_server};
pub use state::AppState;
