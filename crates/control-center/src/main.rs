//! Rover Control Center - Main Entry Point

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use control_center::{init_logging, install_metrics_exporter, ControlCenterConfig, Dashboard};
use frame_decoder::FrameDecoder;
use motor_link::{MotorCommand, MotorLink};
use packet_router::{FrameStatsMonitor, PacketRouter};
use telemetry::SensorHistory;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = ControlCenterConfig::load(config_path.as_deref())
        .context("Failed to load configuration")?;
    init_logging(&config.log_level).context("Failed to initialize logging")?;

    info!("=== Rover Control Center v{} ===", env!("CARGO_PKG_VERSION"));

    if let Some(addr) = config.metrics_addr {
        install_metrics_exporter(addr).context("Failed to start metrics exporter")?;
    }

    let history = Arc::new(SensorHistory::for_rover(config.telemetry.history_len));
    let (writer, decoder) = FrameDecoder::new(config.video.geometry());
    let router_config = config.video.router_config();
    let (monitor, sampler) =
        FrameStatsMonitor::new(router_config.slow_frame_threshold, config.video.stats_every);

    let mut router = match PacketRouter::bind(&router_config, writer, Arc::clone(&history), monitor).await {
        Ok(router) => router,
        Err(e) => {
            error!("Cannot receive rover data: {}", e);
            return Err(e.into());
        }
    };

    let cancel = CancellationToken::new();
    let router_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move { router.run(cancel).await })
    };

    let mut dashboard = Dashboard::new(decoder, history, sampler, config.video.stale_after());
    let motor = config.motor.link_config().map(|link_config| {
        let (command_tx, command_rx) = watch::channel(MotorCommand::STOP);
        let handle = MotorLink::spawn(link_config, command_rx, &cancel);
        (handle, command_tx)
    });
    let motor = match motor {
        Some((handle, command_tx)) => {
            dashboard = dashboard.with_motor_link(handle.status(), command_tx);
            Some(handle)
        }
        None => {
            info!("No rover host configured; motor link disabled");
            None
        }
    };

    // Decoding is CPU-bound; the dashboard gets its own thread
    let render_thread = {
        let cancel = cancel.clone();
        let dashboard_config = config.dashboard.clone();
        std::thread::Builder::new()
            .name("dashboard".to_string())
            .spawn(move || {
                let period = dashboard_config.tick_period();
                let mut ticks = 0u64;
                while !cancel.is_cancelled() {
                    let view = dashboard.tick(Instant::now());
                    ticks += 1;
                    if dashboard_config.report_every_ticks > 0
                        && ticks % dashboard_config.report_every_ticks == 0
                    {
                        info!("{}", view);
                    }
                    std::thread::sleep(period);
                }
                ticks
            })
            .context("Failed to spawn dashboard thread")?
    };

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutting down");
    cancel.cancel();

    let counters = router_task.await.context("Router task panicked")?;
    info!(
        "Router: {} datagrams, {} frames, {} sensor readings, {} protocol errors, {} transport errors",
        counters.datagrams,
        counters.frames,
        counters.sensor_readings,
        counters.protocol_errors,
        counters.transport_errors
    );

    if let Some(handle) = motor {
        let sent = handle.shutdown().await;
        info!("Motor link sent {} commands", sent);
    }

    let ticks = tokio::task::spawn_blocking(move || render_thread.join())
        .await
        .context("Dashboard join task failed")?
        .map_err(|_| anyhow::anyhow!("Dashboard thread panicked"))?;
    info!("Dashboard ran {} ticks", ticks);

    Ok(())
}
