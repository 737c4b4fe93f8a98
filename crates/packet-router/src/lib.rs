//! Rover Packet Router
//!
//! Owns the one UDP socket the rover streams to. Each datagram is received
//! with a single scatter read (header, payload prefix, and frame body
//! straight into the frame decoder's back slot), classified once by its
//! header type, and routed to the frame pipeline or the sensor history.
//! Nothing received from the network can stop the loop; only cancellation
//! does.

mod router;
mod scatter;
mod stats;

pub use router::{PacketRouter, RouterCounters, RouterState};
pub use stats::{DEFAULT_SAMPLE_EVERY, FrameObservation, FrameStats, FrameStatsMonitor, StatsSampler};

use std::net::{Ipv6Addr, SocketAddr};
use std::time::Duration;

use thiserror::Error;
use wire_protocol::VIDEO_UDP_PORT;

/// Router error types
#[derive(Error, Debug)]
pub enum RouterError {
    #[error("Failed to bind UDP socket on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("Socket error: {0}")]
    Socket(#[from] std::io::Error),
}

/// Router configuration
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Address to receive rover datagrams on
    pub bind_addr: SocketAddr,
    /// Inter-arrival time above which a frame is logged as slow
    pub slow_frame_threshold: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv6Addr::UNSPECIFIED, VIDEO_UDP_PORT)),
            slow_frame_threshold: Duration::from_secs(1),
        }
    }
}

impl RouterConfig {
    /// Config bound to an explicit address
    pub fn with_bind_addr(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Default::default()
        }
    }
}
