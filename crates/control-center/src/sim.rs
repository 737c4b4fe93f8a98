//! Synthetic rover
//!
//! Streams a moving checkerboard and slowly drifting sensor readings to a
//! control center, and accepts motor connections, so the whole pipeline can
//! be exercised without hardware.

use std::f64::consts::TAU;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use frame_decoder::{encode_rgb, FrameGeometry};
use image::{Rgb, RgbImage};
use motor_link::{MotorCommand, COMMAND_LEN};
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wire_protocol::{encode_frame, encode_sensor, SensorId};

/// JPEG quality of simulated frames
pub const SIM_JPEG_QUALITY: u8 = 50;

/// Checker square edge in pixels
const CHECKER: u32 = 25;

const LIGHT: Rgb<u8> = Rgb([235, 235, 235]);
const DARK: Rgb<u8> = Rgb([20, 20, 20]);

/// Checkerboard shifted diagonally by `t` pixels
pub fn checkerboard(geometry: FrameGeometry, t: u32) -> RgbImage {
    RgbImage::from_fn(geometry.width, geometry.height, |x, y| {
        let lit = (x + t) % (2 * CHECKER) < CHECKER && (y + t) % (2 * CHECKER) < CHECKER;
        if lit {
            LIGHT
        } else {
            DARK
        }
    })
}

/// Plausible reading for `sensor` at `elapsed` seconds since start
pub fn sensor_reading(sensor: SensorId, elapsed: f64) -> f32 {
    let (base, swing, period) = match sensor {
        SensorId::WaterTemperature => (14.0, 2.0, 600.0),
        SensorId::WaterTurbidity => (35.0, 10.0, 240.0),
        SensorId::Dust => (40.0, 25.0, 90.0),
        SensorId::AtmosphericPressure => (1013.0, 4.0, 900.0),
        SensorId::AtmosphericTemperature => (21.0, 3.0, 300.0),
        SensorId::AtmosphericHumidity => (55.0, 15.0, 420.0),
    };
    (base + swing * (TAU * elapsed / period).sin()) as f32
}

/// Milliseconds since the Unix epoch
fn timestamp_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Send frames at `frame_interval` and one reading per sensor every
/// `sensor_interval` until cancelled. Returns the number of frames sent.
pub async fn stream_to(
    socket: &UdpSocket,
    target: SocketAddr,
    geometry: FrameGeometry,
    frame_interval: Duration,
    sensor_interval: Duration,
    cancel: &CancellationToken,
) -> u64 {
    let started = Instant::now();
    let mut frame_ticker = tokio::time::interval(frame_interval);
    let mut sensor_ticker = tokio::time::interval(sensor_interval);
    let mut frame_index: i32 = 0;
    let mut frames_sent = 0u64;

    info!("Streaming {}x{} video to {}", geometry.width, geometry.height, target);
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = sensor_ticker.tick() => {
                let elapsed = started.elapsed().as_secs_f64();
                for sensor in SensorId::ALL {
                    let datagram = encode_sensor(timestamp_ms(), sensor, sensor_reading(sensor, elapsed));
                    if let Err(e) = socket.send_to(&datagram, target).await {
                        warn!("Failed to send {} reading: {}", sensor, e);
                    }
                }
            }
            _ = frame_ticker.tick() => {
                let image = checkerboard(geometry, frame_index as u32);
                let datagram = encode_rgb(&image, SIM_JPEG_QUALITY)
                    .map_err(|e| e.to_string())
                    .and_then(|jpeg| {
                        encode_frame(timestamp_ms(), frame_index, &jpeg).map_err(|e| e.to_string())
                    });
                match datagram {
                    Ok(datagram) => match socket.send_to(&datagram, target).await {
                        Ok(_) => {
                            frames_sent += 1;
                            debug!("Sent frame {} ({} bytes)", frame_index, datagram.len());
                        }
                        Err(e) => warn!("Failed to send frame {}: {}", frame_index, e),
                    },
                    Err(e) => warn!("Skipping frame {}: {}", frame_index, e),
                }
                frame_index = frame_index.wrapping_add(1) % geometry.height as i32;
            }
        }
    }
    frames_sent
}

/// Accept motor connections one at a time and publish every command
/// received until cancelled
pub async fn serve_motor_commands(
    listener: TcpListener,
    commands: watch::Sender<MotorCommand>,
    cancel: &CancellationToken,
) {
    loop {
        debug!("Awaiting motor connection");
        let accepted = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            result = listener.accept() => result,
        };

        match accepted {
            Ok((stream, peer)) => {
                info!("Motor connection from {}", peer);
                let received = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return,
                    n = read_commands(stream, &commands) => n,
                };
                info!("Motor connection from {} closed after {} commands", peer, received);
            }
            Err(e) => warn!("Accept failed: {}", e),
        }
    }
}

async fn read_commands(mut stream: TcpStream, commands: &watch::Sender<MotorCommand>) -> u64 {
    let mut buf = [0u8; COMMAND_LEN];
    let mut received = 0u64;
    while stream.read_exact(&mut buf).await.is_ok() {
        let command = MotorCommand::decode(&buf);
        debug!(
            "Left motor {:.2}, right motor {:.2}",
            command.left_speed, command.right_speed
        );
        commands.send_replace(command);
        received += 1;
    }
    received
}
