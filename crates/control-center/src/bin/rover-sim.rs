//! Synthetic rover for exercising a control center without hardware
//!
//! Usage: `rover-sim [control-center-addr]` (default `localhost:1512`).
//! Geometry and ports come from the same configuration as the control
//! center.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use anyhow::Context;
use control_center::sim::{serve_motor_commands, stream_to};
use control_center::{init_logging, ControlCenterConfig};
use motor_link::MotorCommand;
use tokio::net::{TcpListener, UdpSocket};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;

const FRAME_INTERVAL: Duration = Duration::from_millis(33);
const SENSOR_INTERVAL: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ControlCenterConfig::load(None).context("Failed to load configuration")?;
    init_logging(&config.log_level).context("Failed to initialize logging")?;

    let target_arg = std::env::args()
        .nth(1)
        .unwrap_or_else(|| format!("localhost:{}", config.video.bind_addr.port()));
    let target = tokio::net::lookup_host(&target_arg)
        .await
        .with_context(|| format!("Failed to resolve {}", target_arg))?
        .next()
        .with_context(|| format!("No address for {}", target_arg))?;

    let local: SocketAddr = if target.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };
    let socket = UdpSocket::bind(local).await.context("Failed to bind UDP socket")?;

    let motor_addr = SocketAddr::from((Ipv6Addr::UNSPECIFIED, config.motor.port));
    let listener = TcpListener::bind(motor_addr)
        .await
        .with_context(|| format!("Failed to listen on {}", motor_addr))?;
    info!("Accepting motor connections on {}", motor_addr);

    let cancel = CancellationToken::new();
    let (command_tx, _command_rx) = watch::channel(MotorCommand::STOP);
    let motors = {
        let cancel = cancel.clone();
        tokio::spawn(async move { serve_motor_commands(listener, command_tx, &cancel).await })
    };
    let streamer = {
        let cancel = cancel.clone();
        let geometry = config.video.geometry();
        tokio::spawn(async move {
            stream_to(&socket, target, geometry, FRAME_INTERVAL, SENSOR_INTERVAL, &cancel).await
        })
    };

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    cancel.cancel();

    let frames = streamer.await.context("Streamer task panicked")?;
    motors.await.context("Motor task panicked")?;
    info!("Sent {} frames", frames);
    Ok(())
}
