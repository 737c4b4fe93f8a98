//! Headless dashboard
//!
//! Everything the operator window shows, minus the window: the current
//! camera frame, the performance overlay, the telemetry table and the motor
//! link state. Owned by the render thread and refreshed once per tick.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use frame_decoder::{DecodedFrame, FrameDecoder};
use motor_link::{LinkStatus, MotorCommand};
use packet_router::{FrameStats, StatsSampler};
use telemetry::{ChannelSnapshot, SensorHistory};
use tokio::sync::watch;
use tracing::debug;

/// One refresh worth of dashboard state
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub frame_width: u32,
    pub frame_height: u32,
    /// Sender index of the displayed frame
    pub frame_index: Option<i32>,
    /// No frame decoded recently; show the no-signal overlay
    pub stale: bool,
    pub frames_decoded: u64,
    pub decode_failures: u64,
    pub stats: FrameStats,
    pub channels: Vec<ChannelSnapshot>,
    /// `None` when no motor link is configured
    pub link: Option<LinkStatus>,
}

impl fmt::Display for DashboardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.frame_index {
            Some(index) if !self.stale => write!(
                f,
                "frame {} ({}x{})",
                index, self.frame_width, self.frame_height
            )?,
            _ => write!(f, "no signal")?,
        }
        write!(
            f,
            " | video {:.1} ms/frame ({:.1} FPS) | network {:.1}% of max datagram ({:.2} Mbps)",
            self.stats.ms_per_frame(),
            self.stats.fps(),
            self.stats.datagram_utilization(),
            self.stats.megabits_per_second()
        )?;
        for channel in &self.channels {
            match channel.latest() {
                Some(value) => write!(f, " | {} {:.2}", channel.name, value)?,
                None => write!(f, " | {} -", channel.name)?,
            }
        }
        if let Some(link) = &self.link {
            write!(f, " | motors {}", link)?;
        }
        Ok(())
    }
}

/// Render-side owner of the frame decoder and presentation state
pub struct Dashboard {
    decoder: FrameDecoder,
    history: Arc<SensorHistory>,
    sampler: StatsSampler,
    stale_after: Duration,
    link_status: Option<watch::Receiver<LinkStatus>>,
    commands: Option<watch::Sender<MotorCommand>>,
}

impl Dashboard {
    pub fn new(
        decoder: FrameDecoder,
        history: Arc<SensorHistory>,
        sampler: StatsSampler,
        stale_after: Duration,
    ) -> Self {
        Self {
            decoder,
            history,
            sampler,
            stale_after,
            link_status: None,
            commands: None,
        }
    }

    /// Attach a motor link: its status feed and the command channel it reads
    pub fn with_motor_link(
        mut self,
        status: watch::Receiver<LinkStatus>,
        commands: watch::Sender<MotorCommand>,
    ) -> Self {
        self.link_status = Some(status);
        self.commands = Some(commands);
        self
    }

    /// Refresh and return the current view
    pub fn tick(&mut self, now: Instant) -> DashboardView {
        let frame = self.decoder.latest_pixels();
        let (frame_width, frame_height) = (frame.width(), frame.height());

        let channels = (0..self.history.channel_count())
            .filter_map(|channel| self.history.channel_snapshot(channel).ok())
            .collect();

        DashboardView {
            frame_width,
            frame_height,
            frame_index: self.decoder.last_frame_index(),
            stale: self.decoder.is_stale(now, self.stale_after),
            frames_decoded: self.decoder.frames_decoded(),
            decode_failures: self.decoder.decode_failures(),
            stats: self.sampler.sample(),
            channels,
            link: self.link_status.as_ref().map(|rx| *rx.borrow()),
        }
    }

    /// Pixels to draw this tick
    pub fn frame(&mut self) -> &DecodedFrame {
        self.decoder.latest_pixels()
    }

    /// Set the drive command from the operator's stick axes.
    /// Returns false when no motor link is attached.
    pub fn drive(&self, left_y: f64, right_y: f64) -> bool {
        match &self.commands {
            Some(tx) => {
                let command = MotorCommand::from_stick_axes(left_y, right_y);
                tx.send_replace(command);
                debug!("Drive L={:.2} R={:.2}", command.left_speed, command.right_speed);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frame_decoder::{encode_rgb, FrameGeometry, PLACEHOLDER_PIXEL};
    use image::{Rgb, RgbImage};
    use packet_router::FrameStatsMonitor;

    struct Fixture {
        dashboard: Dashboard,
        writer: frame_decoder::FrameWriter,
        monitor: FrameStatsMonitor,
        history: Arc<SensorHistory>,
    }

    fn fixture() -> Fixture {
        let (writer, decoder) = FrameDecoder::new(FrameGeometry::new(32, 24));
        let (monitor, sampler) = FrameStatsMonitor::new(Duration::from_secs(1), 1);
        let history = Arc::new(SensorHistory::default());
        let dashboard = Dashboard::new(
            decoder,
            Arc::clone(&history),
            sampler,
            Duration::from_secs(3),
        );
        Fixture {
            dashboard,
            writer,
            monitor,
            history,
        }
    }

    #[test]
    fn test_no_signal_before_first_frame() {
        let mut f = fixture();
        let view = f.dashboard.tick(Instant::now());

        assert!(view.stale);
        assert_eq!(view.frame_index, None);
        assert_eq!((view.frame_width, view.frame_height), (32, 24));
        assert_eq!(view.channels.len(), 6);
        assert!(view.link.is_none());
        assert!(view.to_string().starts_with("no signal"));
        assert_eq!(f.dashboard.frame().get_pixel(0, 0), Some(PLACEHOLDER_PIXEL));
    }

    #[test]
    fn test_view_reflects_pipeline() {
        let mut f = fixture();
        let jpeg = encode_rgb(&RgbImage::from_pixel(32, 24, Rgb([40, 80, 120])), 90).unwrap();
        f.writer.begin_receive()[..jpeg.len()].copy_from_slice(&jpeg);
        f.writer.end_receive(jpeg.len(), 7);
        f.monitor.record(Instant::now(), jpeg.len() + 20);
        f.history.append(0, 18.5).unwrap();
        f.history.append(0, 19.0).unwrap();

        let view = f.dashboard.tick(Instant::now());
        assert!(!view.stale);
        assert_eq!(view.frame_index, Some(7));
        assert_eq!(view.frames_decoded, 1);
        assert_eq!(view.stats.payload_size, jpeg.len() + 20);
        assert_eq!(view.channels[0].latest(), Some(19.0));
        assert_eq!(view.channels[0].min, Some(18.5));
        assert!(view.to_string().starts_with("frame 7 (32x24)"));

        let later = f.dashboard.tick(Instant::now() + Duration::from_secs(5));
        assert!(later.stale);
        assert_eq!(later.frames_decoded, 1);
    }

    #[test]
    fn test_drive_feeds_motor_link() {
        let f = fixture();
        assert!(!f.dashboard.drive(-1.0, -1.0));

        let (status_tx, status_rx) = watch::channel(LinkStatus::Connecting);
        let (command_tx, command_rx) = watch::channel(MotorCommand::STOP);
        let mut dashboard = f.dashboard.with_motor_link(status_rx, command_tx);

        assert!(dashboard.drive(-0.5, 0.3));
        assert_eq!(*command_rx.borrow(), MotorCommand::new(0.5, 0.0));

        status_tx.send_replace(LinkStatus::Disconnected);
        let view = dashboard.tick(Instant::now());
        assert_eq!(view.link, Some(LinkStatus::Disconnected));
        assert!(view.to_string().ends_with("motors disconnected"));
    }
}
