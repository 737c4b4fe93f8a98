//! Motor command transmitter task

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::command::MotorCommand;
use crate::{LinkError, MotorConfig};

/// Connection state shown to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// Resolving or connecting
    Connecting,
    /// Streaming commands to this peer
    Connected(SocketAddr),
    /// Waiting to retry, or stopped
    Disconnected,
}

impl LinkStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, LinkStatus::Connected(_))
    }
}

impl fmt::Display for LinkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkStatus::Connecting => write!(f, "connecting"),
            LinkStatus::Connected(addr) => write!(f, "connected to {}", addr),
            LinkStatus::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// Background task that owns the TCP connection to the rover
pub struct MotorLink {
    config: MotorConfig,
    commands: watch::Receiver<MotorCommand>,
    status: watch::Sender<LinkStatus>,
    commands_sent: u64,
}

impl MotorLink {
    /// Spawn the link on the current tokio runtime.
    ///
    /// The task sends whatever `commands` currently holds every
    /// `send_interval` and runs until `cancel` fires or the handle is shut
    /// down.
    pub fn spawn(
        config: MotorConfig,
        commands: watch::Receiver<MotorCommand>,
        cancel: &CancellationToken,
    ) -> MotorLinkHandle {
        let (status_tx, status_rx) = watch::channel(LinkStatus::Connecting);
        let cancel = cancel.child_token();

        let link = MotorLink {
            config,
            commands,
            status: status_tx,
            commands_sent: 0,
        };
        let task = tokio::spawn(link.run(cancel.clone()));

        MotorLinkHandle {
            status: status_rx,
            cancel,
            task,
        }
    }

    async fn run(mut self, cancel: CancellationToken) -> u64 {
        let addr = self.config.addr();
        info!("Starting motor link to {}", addr);

        loop {
            self.status.send_replace(LinkStatus::Connecting);
            let connected = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = self.connect() => result,
            };

            let outcome = match connected {
                Ok(stream) => self.stream_commands(stream, &cancel).await,
                Err(e) => Err(e),
            };
            match outcome {
                Ok(()) => break,
                Err(e) => warn!("Motor link to {}: {}", addr, e),
            }

            self.status.send_replace(LinkStatus::Disconnected);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.reconnect_delay) => {}
            }
        }

        self.status.send_replace(LinkStatus::Disconnected);
        info!(
            "Motor link to {} stopped after {} commands",
            addr, self.commands_sent
        );
        self.commands_sent
    }

    async fn connect(&self) -> Result<TcpStream, LinkError> {
        let addr = self.config.addr();
        debug!("Connecting to {}", addr);

        let attempt = TcpStream::connect((self.config.host.as_str(), self.config.port));
        let stream = tokio::time::timeout(self.config.connect_timeout, attempt)
            .await
            .map_err(|_| LinkError::ConnectTimeout {
                addr: addr.clone(),
                timeout_ms: self.config.connect_timeout.as_millis() as u64,
            })?
            .map_err(|source| LinkError::Connect { addr, source })?;

        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not disable Nagle: {}", e);
        }
        Ok(stream)
    }

    /// Write the current command on every tick. Returns `Ok` only on
    /// cancellation.
    async fn stream_commands(
        &mut self,
        mut stream: TcpStream,
        cancel: &CancellationToken,
    ) -> Result<(), LinkError> {
        let peer = stream.peer_addr()?;
        self.status.send_replace(LinkStatus::Connected(peer));
        info!("Motor link connected to {}", peer);

        let period = self.config.send_interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    if let Err(e) = stream.shutdown().await {
                        debug!("Shutdown of motor stream failed: {}", e);
                    }
                    return Ok(());
                }
                _ = ticker.tick() => {}
            }

            let command = *self.commands.borrow_and_update();
            stream.write_all(&command.encode()).await?;
            self.commands_sent += 1;
            trace!(
                "Sent motor command L={:.2} R={:.2}",
                command.left_speed,
                command.right_speed
            );
        }
    }
}

/// Owner-side handle of a running [`MotorLink`]
#[derive(Debug)]
pub struct MotorLinkHandle {
    status: watch::Receiver<LinkStatus>,
    cancel: CancellationToken,
    task: JoinHandle<u64>,
}

impl MotorLinkHandle {
    /// Subscribe to status changes
    pub fn status(&self) -> watch::Receiver<LinkStatus> {
        self.status.clone()
    }

    /// Status right now
    pub fn current_status(&self) -> LinkStatus {
        *self.status.borrow()
    }

    /// Stop the link and wait for it; returns the number of commands sent
    pub async fn shutdown(self) -> u64 {
        self.cancel.cancel();
        match self.task.await {
            Ok(sent) => sent,
            Err(e) => {
                warn!("Motor link task failed: {}", e);
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::COMMAND_LEN;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    const WAIT: Duration = Duration::from_secs(2);

    fn config_for(addr: SocketAddr) -> MotorConfig {
        MotorConfig {
            host: addr.ip().to_string(),
            port: addr.port(),
            send_interval: Duration::from_millis(10),
            connect_timeout: Duration::from_millis(500),
            reconnect_delay: Duration::from_millis(20),
        }
    }

    async fn read_command(stream: &mut TcpStream) -> MotorCommand {
        let mut buf = [0u8; COMMAND_LEN];
        tokio::time::timeout(WAIT, stream.read_exact(&mut buf))
            .await
            .unwrap()
            .unwrap();
        MotorCommand::decode(&buf)
    }

    async fn accept(listener: &TcpListener) -> TcpStream {
        tokio::time::timeout(WAIT, listener.accept())
            .await
            .unwrap()
            .unwrap()
            .0
    }

    #[tokio::test]
    async fn test_streams_current_command() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (tx, rx) = watch::channel(MotorCommand::new(0.5, 0.25));
        let cancel = CancellationToken::new();
        let handle = MotorLink::spawn(config_for(listener.local_addr().unwrap()), rx, &cancel);

        let mut rover = accept(&listener).await;
        assert_eq!(read_command(&mut rover).await, MotorCommand::new(0.5, 0.25));

        let mut status = handle.status();
        tokio::time::timeout(WAIT, status.wait_for(LinkStatus::is_connected))
            .await
            .unwrap()
            .unwrap();

        tx.send(MotorCommand::new(1.0, 0.0)).unwrap();
        let mut latest = read_command(&mut rover).await;
        for _ in 0..50 {
            if latest == MotorCommand::new(1.0, 0.0) {
                break;
            }
            latest = read_command(&mut rover).await;
        }
        assert_eq!(latest, MotorCommand::new(1.0, 0.0));

        let sent = handle.shutdown().await;
        assert!(sent >= 2);
    }

    #[tokio::test]
    async fn test_reconnects_after_peer_closes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (_tx, rx) = watch::channel(MotorCommand::STOP);
        let cancel = CancellationToken::new();
        let handle = MotorLink::spawn(config_for(listener.local_addr().unwrap()), rx, &cancel);

        let mut first = accept(&listener).await;
        read_command(&mut first).await;
        drop(first);

        let mut second = accept(&listener).await;
        assert_eq!(read_command(&mut second).await, MotorCommand::STOP);

        cancel.cancel();
        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_unreachable_rover_keeps_retrying() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap()
        };
        let (_tx, rx) = watch::channel(MotorCommand::STOP);
        let cancel = CancellationToken::new();
        let handle = MotorLink::spawn(config_for(addr), rx, &cancel);

        let mut status = handle.status();
        tokio::time::timeout(WAIT, status.wait_for(|s| *s == LinkStatus::Disconnected))
            .await
            .unwrap()
            .unwrap();

        cancel.cancel();
        assert_eq!(handle.shutdown().await, 0);
    }

    #[tokio::test]
    async fn test_shutdown_reports_disconnected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (_tx, rx) = watch::channel(MotorCommand::STOP);
        let cancel = CancellationToken::new();
        let handle = MotorLink::spawn(config_for(listener.local_addr().unwrap()), rx, &cancel);
        let _rover = accept(&listener).await;

        let status = handle.status();
        handle.shutdown().await;
        assert_eq!(*status.borrow(), LinkStatus::Disconnected);
    }

    #[test]
    fn test_status_display() {
        let addr: SocketAddr = "10.0.0.7:1333".parse().unwrap();
        assert_eq!(LinkStatus::Connected(addr).to_string(), "connected to 10.0.0.7:1333");
        assert_eq!(LinkStatus::Disconnected.to_string(), "disconnected");
    }
}
