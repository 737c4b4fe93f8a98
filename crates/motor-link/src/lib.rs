//! Rover Motor Link
//!
//! Streams the operator's current drive command to the rover over TCP. The
//! rover treats the latest command it received as authoritative, so the link
//! just rewrites the current value at a fixed interval and reconnects when
//! the stream breaks.

mod command;
mod link;

pub use command::{MotorCommand, COMMAND_LEN};
pub use link::{LinkStatus, MotorLink, MotorLinkHandle};

use std::time::Duration;

use thiserror::Error;
use wire_protocol::MOTOR_TCP_PORT;

/// Motor link error types
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    #[error("Connection to {addr} timed out after {timeout_ms}ms")]
    ConnectTimeout { addr: String, timeout_ms: u64 },

    #[error("Write failed: {0}")]
    Write(#[from] std::io::Error),
}

/// Motor link configuration
#[derive(Debug, Clone)]
pub struct MotorConfig {
    /// Rover host name or address
    pub host: String,
    /// Rover motor port
    pub port: u16,
    /// How often the current command is resent
    pub send_interval: Duration,
    /// Give up on a connection attempt after this long
    pub connect_timeout: Duration,
    /// Pause between a failure and the next connection attempt
    pub reconnect_delay: Duration,
}

impl Default for MotorConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: MOTOR_TCP_PORT,
            send_interval: Duration::from_millis(100),
            connect_timeout: Duration::from_secs(2),
            reconnect_delay: Duration::from_secs(1),
        }
    }
}

impl MotorConfig {
    /// `host:port` as shown in logs and errors
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
