//! Packet Router Implementation

use std::io::IoSliceMut;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use frame_decoder::FrameWriter;
use telemetry::SensorHistory;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use wire_protocol::{FrameMessage, Message, ProtocolError, SensorMessage, HEADER_LEN, PREFIX_LEN};

use crate::scatter::{ScatterReceiver, ScatterRecv};
use crate::stats::FrameStatsMonitor;
use crate::{RouterConfig, RouterError};

/// Where the receive loop is in handling a datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterState {
    /// Waiting for the next datagram
    AwaitingHeader,
    /// Header said video frame; handing the body to the frame pipeline
    ReceivingFramePayload,
    /// Header named a sensor channel; recording the reading
    ReceivingSensorPayload,
    /// Cancelled; the loop has exited
    Stopped,
}

/// Running totals for the receive loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouterCounters {
    /// Datagrams received (valid or not)
    pub datagrams: u64,
    /// Frames handed to the decoder
    pub frames: u64,
    /// Sensor readings recorded
    pub sensor_readings: u64,
    /// Datagrams dropped as malformed, oversized or unroutable
    pub protocol_errors: u64,
    /// Failed receives (socket errors other than cancellation)
    pub transport_errors: u64,
}

/// Single-socket receive loop feeding the frame pipeline and sensor history
pub struct PacketRouter {
    socket: UdpSocket,
    receiver: ScatterReceiver,
    frames: FrameWriter,
    history: Arc<SensorHistory>,
    stats: FrameStatsMonitor,
    state: RouterState,
    counters: RouterCounters,
}

impl PacketRouter {
    /// Bind the configured address
    pub async fn bind(
        config: &RouterConfig,
        frames: FrameWriter,
        history: Arc<SensorHistory>,
        stats: FrameStatsMonitor,
    ) -> Result<Self, RouterError> {
        let socket = UdpSocket::bind(config.bind_addr)
            .await
            .map_err(|source| RouterError::Bind {
                addr: config.bind_addr,
                source,
            })?;
        info!("Packet router bound to {}", socket.local_addr()?);

        Ok(Self {
            socket,
            receiver: ScatterReceiver::new(),
            frames,
            history,
            stats,
            state: RouterState::AwaitingHeader,
            counters: RouterCounters::default(),
        })
    }

    /// Address the socket is bound to
    pub fn local_addr(&self) -> Result<SocketAddr, RouterError> {
        Ok(self.socket.local_addr()?)
    }

    /// Current loop state
    pub fn state(&self) -> RouterState {
        self.state
    }

    /// Totals so far
    pub fn counters(&self) -> RouterCounters {
        self.counters
    }

    /// Receive and route datagrams until `cancel` fires.
    ///
    /// Exactly one receive is outstanding at a time. Receive errors and bad
    /// datagrams are logged and skipped; cancellation is the only exit.
    pub async fn run(&mut self, cancel: CancellationToken) -> RouterCounters {
        info!("Starting packet router");

        loop {
            self.state = RouterState::AwaitingHeader;

            let mut header = [0u8; HEADER_LEN];
            let mut prefix = [0u8; PREFIX_LEN];
            let received = {
                let mut bufs = [
                    IoSliceMut::new(&mut header),
                    IoSliceMut::new(&mut prefix),
                    IoSliceMut::new(self.frames.begin_receive()),
                ];
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    result = self.receiver.recv(&self.socket, &mut bufs) => Some(result),
                }
            };

            match received {
                None => break,
                Some(Ok(recv)) => self.dispatch(&header, &prefix, recv),
                Some(Err(e)) => {
                    self.counters.transport_errors += 1;
                    metrics::counter!("rover_dropped_datagrams_total", "reason" => "transport")
                        .increment(1);
                    warn!("UDP receive failed: {}", e);
                }
            }
        }

        self.state = RouterState::Stopped;
        info!(
            "Packet router stopped: {} datagrams, {} frames, {} readings, {} dropped",
            self.counters.datagrams,
            self.counters.frames,
            self.counters.sensor_readings,
            self.counters.protocol_errors + self.counters.transport_errors
        );
        self.counters
    }

    fn dispatch(&mut self, header: &[u8; HEADER_LEN], prefix: &[u8; PREFIX_LEN], recv: ScatterRecv) {
        self.counters.datagrams += 1;

        if recv.truncated {
            let capacity = HEADER_LEN + PREFIX_LEN + self.frames.capacity();
            self.drop_datagram(ProtocolError::Oversized { capacity });
            return;
        }

        match Message::from_segments(header, prefix, recv.len) {
            Ok(Message::Frame(frame)) => {
                self.transition(RouterState::ReceivingFramePayload);
                self.on_frame(frame, recv.len);
            }
            Ok(Message::Sensor(reading)) => {
                self.transition(RouterState::ReceivingSensorPayload);
                self.on_sensor(reading);
            }
            Err(e) => self.drop_datagram(e),
        }
    }

    fn on_frame(&mut self, frame: FrameMessage, datagram_len: usize) {
        self.frames.end_receive(frame.payload_len, frame.frame_index);
        self.counters.frames += 1;
        metrics::counter!("rover_datagrams_total", "kind" => "frame").increment(1);

        let observation = self.stats.record(Instant::now(), datagram_len);
        if observation.slow {
            warn!(
                "Slow frame {}: {:.0} ms since previous",
                frame.frame_index,
                observation.stats.ms_per_frame()
            );
        } else {
            debug!(
                "Frame {} ({} bytes, ts {})",
                frame.frame_index, frame.payload_len, frame.timestamp
            );
        }
    }

    fn on_sensor(&mut self, reading: SensorMessage) {
        match self.history.append(reading.sensor.index(), reading.reading) {
            Ok(()) => {
                self.counters.sensor_readings += 1;
                metrics::counter!("rover_datagrams_total", "kind" => "sensor").increment(1);
            }
            Err(e) => {
                self.counters.protocol_errors += 1;
                metrics::counter!("rover_dropped_datagrams_total", "reason" => "bad_reading")
                    .increment(1);
                warn!("Dropping {} reading: {}", reading.sensor, e);
            }
        }
    }

    fn drop_datagram(&mut self, error: ProtocolError) {
        self.counters.protocol_errors += 1;
        metrics::counter!("rover_dropped_datagrams_total", "reason" => error.reason())
            .increment(1);
        warn!("Dropping datagram: {}", error);
    }

    fn transition(&mut self, next: RouterState) {
        trace!("{:?} -> {:?}", self.state, next);
        self.state = next;
    }
}
