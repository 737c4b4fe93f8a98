//! Rover Control Center
//!
//! Wires the receive pipeline, sensor history, motor link and dashboard
//! together for the `control-center` binary, and hosts the synthetic rover
//! used by `rover-sim`.

pub mod config;
pub mod dashboard;
pub mod sim;

pub use config::ControlCenterConfig;
pub use dashboard::{Dashboard, DashboardView};

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use tracing::info;
use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging. `RUST_LOG` overrides `level` when set.
pub fn init_logging(level: &str) -> Result<(), SetGlobalDefaultError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}

/// Serve Prometheus metrics on `addr`. Must be called inside a tokio runtime.
pub fn install_metrics_exporter(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    info!("Serving metrics on http://{}/metrics", addr);
    Ok(())
}
