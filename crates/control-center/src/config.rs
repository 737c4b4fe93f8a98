//! Control center configuration
//!
//! Built-in defaults, overlaid by an optional TOML file, overlaid by
//! `CONTROL_CENTER__SECTION__KEY` environment variables.

use std::net::{Ipv6Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File, FileFormat};
use frame_decoder::FrameGeometry;
use motor_link::MotorConfig;
use packet_router::RouterConfig;
use serde::Deserialize;
use wire_protocol::{MOTOR_TCP_PORT, VIDEO_UDP_PORT};

/// File read when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "control-center.toml";

/// Prefix of environment overrides
pub const ENV_PREFIX: &str = "CONTROL_CENTER";

/// Top-level configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlCenterConfig {
    pub video: VideoConfig,
    pub telemetry: TelemetryConfig,
    pub motor: MotorSettings,
    pub dashboard: DashboardConfig,
    /// Default log filter; `RUST_LOG` wins when set
    pub log_level: String,
    /// Serve Prometheus metrics on this address
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for ControlCenterConfig {
    fn default() -> Self {
        Self {
            video: VideoConfig::default(),
            telemetry: TelemetryConfig::default(),
            motor: MotorSettings::default(),
            dashboard: DashboardConfig::default(),
            log_level: "info".to_string(),
            metrics_addr: None,
        }
    }
}

/// Video stream settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub width: u32,
    pub height: u32,
    /// Address the UDP socket binds to (video and telemetry share it)
    pub bind_addr: SocketAddr,
    /// Frames arriving later than this after the previous one are logged
    pub slow_frame_ms: u64,
    /// Show the no-signal state after this long without a frame
    pub stale_after_ms: u64,
    /// Refresh the performance numbers every N dashboard ticks
    pub stats_every: usize,
}

impl Default for VideoConfig {
    fn default() -> Self {
        let geometry = FrameGeometry::default();
        Self {
            width: geometry.width,
            height: geometry.height,
            bind_addr: SocketAddr::from((Ipv6Addr::UNSPECIFIED, VIDEO_UDP_PORT)),
            slow_frame_ms: 1000,
            stale_after_ms: 3000,
            stats_every: packet_router::DEFAULT_SAMPLE_EVERY,
        }
    }
}

impl VideoConfig {
    pub fn geometry(&self) -> FrameGeometry {
        FrameGeometry::new(self.width, self.height)
    }

    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            bind_addr: self.bind_addr,
            slow_frame_threshold: Duration::from_millis(self.slow_frame_ms),
        }
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_millis(self.stale_after_ms)
    }
}

/// Sensor history settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Readings kept per sensor
    pub history_len: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            history_len: telemetry::DEFAULT_HISTORY_LEN,
        }
    }
}

/// Motor link settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MotorSettings {
    /// Rover host; the link stays off when unset
    pub host: Option<String>,
    pub port: u16,
    pub send_interval_ms: u64,
}

impl Default for MotorSettings {
    fn default() -> Self {
        Self {
            host: None,
            port: MOTOR_TCP_PORT,
            send_interval_ms: 100,
        }
    }
}

impl MotorSettings {
    /// Link configuration, if a host is set
    pub fn link_config(&self) -> Option<MotorConfig> {
        let host = self.host.as_ref()?;
        Some(MotorConfig {
            host: host.clone(),
            port: self.port,
            send_interval: Duration::from_millis(self.send_interval_ms),
            ..Default::default()
        })
    }
}

/// Dashboard loop settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Dashboard refresh rate
    pub tick_hz: u32,
    /// Log a status line every N ticks (0 disables)
    pub report_every_ticks: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            tick_hz: 30,
            report_every_ticks: 90,
        }
    }
}

impl DashboardConfig {
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_hz.max(1) as f64)
    }
}

impl ControlCenterConfig {
    /// Load from `path` (or [`DEFAULT_CONFIG_FILE`]) and the environment.
    /// A missing file is not an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config: Self = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document over the defaults
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot be built with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.video.width == 0 || self.video.height == 0 {
            return Err(ConfigError::Message(format!(
                "video geometry must be non-zero, got {}x{}",
                self.video.width, self.video.height
            )));
        }
        if self.telemetry.history_len == 0 {
            return Err(ConfigError::Message(
                "telemetry.history_len must be at least 1".to_string(),
            ));
        }
        if self.dashboard.tick_hz == 0 {
            return Err(ConfigError::Message(
                "dashboard.tick_hz must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
