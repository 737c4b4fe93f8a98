//! Video frame arrival statistics

use std::time::{Duration, Instant};

use swap_buffer::{Consumer, Producer, SwapBuffer};
use wire_protocol::MAX_DATAGRAM_PAYLOAD;

/// Default decimation for the performance overlay
pub const DEFAULT_SAMPLE_EVERY: usize = 64;

/// Timing and size of the most recent video frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Time since the previous frame arrived (zero for the first frame)
    pub inter_arrival: Duration,
    /// Size of the frame datagram in bytes
    pub payload_size: usize,
}

impl FrameStats {
    /// Streaming rate implied by the inter-arrival time
    pub fn fps(&self) -> f64 {
        if self.inter_arrival.is_zero() {
            0.0
        } else {
            1.0 / self.inter_arrival.as_secs_f64()
        }
    }

    /// Inter-arrival time in milliseconds
    pub fn ms_per_frame(&self) -> f64 {
        self.inter_arrival.as_secs_f64() * 1000.0
    }

    /// Share of the largest possible datagram used, in percent
    pub fn datagram_utilization(&self) -> f64 {
        self.payload_size as f64 / MAX_DATAGRAM_PAYLOAD as f64 * 100.0
    }

    /// Video bandwidth in megabits per second
    pub fn megabits_per_second(&self) -> f64 {
        const BYTES_TO_MEGABITS: f64 = 8.0 / (1024.0 * 1024.0);
        self.fps() * self.payload_size as f64 * BYTES_TO_MEGABITS
    }
}

/// Result of recording one frame arrival
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameObservation {
    pub stats: FrameStats,
    /// Inter-arrival time exceeded the slow threshold
    pub slow: bool,
}

/// Network-side recorder of frame arrivals.
///
/// Every observation is published wholesale through a triple buffer, so the
/// overlay never sees the duration of one frame paired with the size of
/// another.
#[derive(Debug)]
pub struct FrameStatsMonitor {
    published: Producer<FrameStats>,
    last_arrival: Option<Instant>,
    slow_threshold: Duration,
    slow_frames: u64,
}

impl FrameStatsMonitor {
    /// Create a monitor and the overlay-side sampler reading from it.
    ///
    /// The sampler refreshes its value on every `sample_every`-th call.
    #[allow(clippy::new_ret_no_self)]
    pub fn new(slow_threshold: Duration, sample_every: usize) -> (FrameStatsMonitor, StatsSampler) {
        let (published, consumer) = SwapBuffer::<FrameStats>::with_default();
        let monitor = FrameStatsMonitor {
            published,
            last_arrival: None,
            slow_threshold,
            slow_frames: 0,
        };
        let sampler = StatsSampler {
            published: consumer,
            every: sample_every.max(1),
            calls: 0,
            current: FrameStats::default(),
        };
        (monitor, sampler)
    }

    /// Record a frame that arrived at `now`
    pub fn record(&mut self, now: Instant, payload_size: usize) -> FrameObservation {
        let inter_arrival = self
            .last_arrival
            .map(|prev| now.saturating_duration_since(prev))
            .unwrap_or_default();
        self.last_arrival = Some(now);

        let stats = FrameStats {
            inter_arrival,
            payload_size,
        };
        *self.published.producer_slot() = stats;
        self.published.publish();

        let slow = inter_arrival > self.slow_threshold;
        if slow {
            self.slow_frames += 1;
        }
        FrameObservation { stats, slow }
    }

    /// Frames that arrived later than the slow threshold
    pub fn slow_frames(&self) -> u64 {
        self.slow_frames
    }
}

/// Overlay-side reader of frame statistics, decimated to bound churn
#[derive(Debug)]
pub struct StatsSampler {
    published: Consumer<FrameStats>,
    every: usize,
    calls: usize,
    current: FrameStats,
}

impl StatsSampler {
    /// Current statistics; picks up new values on every Nth call only
    pub fn sample(&mut self) -> FrameStats {
        if self.calls % self.every == 0 && self.published.acquire() {
            self.current = *self.published.consumer_slot();
        }
        self.calls = self.calls.wrapping_add(1);
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_interval_stream() {
        let (mut monitor, mut sampler) = FrameStatsMonitor::new(Duration::from_secs(1), 1);
        let start = Instant::now();
        let interval = Duration::from_millis(33);

        for i in 0..30u32 {
            let obs = monitor.record(start + interval * i, 20_000);
            assert!(!obs.slow);
        }

        let stats = sampler.sample();
        let error = stats.inter_arrival.as_secs_f64() - interval.as_secs_f64();
        assert!(error.abs() < 1e-3);
        assert_eq!(stats.payload_size, 20_000);
        assert!((stats.fps() - 30.3).abs() < 0.1);
    }

    #[test]
    fn test_first_frame_has_no_interval() {
        let (mut monitor, _sampler) = FrameStatsMonitor::new(Duration::from_secs(1), 1);
        let obs = monitor.record(Instant::now(), 10);
        assert_eq!(obs.stats.inter_arrival, Duration::ZERO);
        assert!(!obs.slow);
    }

    #[test]
    fn test_delayed_frame_flagged() {
        let (mut monitor, _sampler) = FrameStatsMonitor::new(Duration::from_secs(1), 1);
        let start = Instant::now();

        monitor.record(start, 100);
        assert!(!monitor.record(start + Duration::from_millis(40), 100).slow);
        let late = monitor.record(start + Duration::from_millis(1240), 100);

        assert!(late.slow);
        assert_eq!(late.stats.inter_arrival, Duration::from_millis(1200));
        assert_eq!(monitor.slow_frames(), 1);
    }

    #[test]
    fn test_sampler_decimation() {
        let (mut monitor, mut sampler) = FrameStatsMonitor::new(Duration::from_secs(1), 4);
        let start = Instant::now();

        monitor.record(start, 1);
        assert_eq!(sampler.sample().payload_size, 1); // call 0 refreshes

        monitor.record(start + Duration::from_millis(10), 2);
        for _ in 1..4 {
            assert_eq!(sampler.sample().payload_size, 1);
        }
        assert_eq!(sampler.sample().payload_size, 2); // call 4 refreshes
    }

    #[test]
    fn test_derived_rates() {
        let stats = FrameStats {
            inter_arrival: Duration::from_millis(50),
            payload_size: MAX_DATAGRAM_PAYLOAD / 2,
        };
        assert!((stats.fps() - 20.0).abs() < 1e-9);
        assert!((stats.ms_per_frame() - 50.0).abs() < 1e-9);
        assert!((stats.datagram_utilization() - 50.0).abs() < 0.01);
        assert!(stats.megabits_per_second() > 4.9 && stats.megabits_per_second() < 5.1);
    }
}
