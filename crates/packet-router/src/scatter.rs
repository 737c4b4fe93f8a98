//! Scatter receive: one datagram split across several caller buffers

use std::io::{self, IoSliceMut};

use tokio::net::UdpSocket;

/// Outcome of a single scatter receive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScatterRecv {
    /// Bytes written across all buffers
    pub len: usize,
    /// The datagram was larger than the buffers; the tail was discarded
    pub truncated: bool,
}

/// Receives datagrams straight into caller-provided segments
#[derive(Debug, Default)]
pub(crate) struct ScatterReceiver {
    /// Platforms without `recvmsg` receive here first, then copy out
    #[cfg(not(unix))]
    scratch: Vec<u8>,
}

impl ScatterReceiver {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Wait for the next datagram and scatter it across `bufs` in order
    #[cfg(unix)]
    pub(crate) async fn recv(
        &mut self,
        socket: &UdpSocket,
        bufs: &mut [IoSliceMut<'_>],
    ) -> io::Result<ScatterRecv> {
        use std::os::fd::AsRawFd;
        use tokio::io::Interest;

        let fd = socket.as_raw_fd();
        socket
            .async_io(Interest::READABLE, || recvmsg(fd, &mut *bufs))
            .await
    }

    #[cfg(not(unix))]
    pub(crate) async fn recv(
        &mut self,
        socket: &UdpSocket,
        bufs: &mut [IoSliceMut<'_>],
    ) -> io::Result<ScatterRecv> {
        let capacity: usize = bufs.iter().map(|b| b.len()).sum();
        // One spare byte tells a datagram that exactly fits from one that was cut
        self.scratch.resize(capacity + 1, 0);
        let received = socket.recv(&mut self.scratch).await?;

        let mut remaining = &self.scratch[..received.min(capacity)];
        for buf in bufs.iter_mut() {
            let n = remaining.len().min(buf.len());
            buf[..n].copy_from_slice(&remaining[..n]);
            remaining = &remaining[n..];
        }
        Ok(ScatterRecv {
            len: received.min(capacity),
            truncated: received > capacity,
        })
    }
}

/// Non-blocking `recvmsg(2)` into `bufs`
#[cfg(unix)]
fn recvmsg(fd: std::os::fd::RawFd, bufs: &mut [IoSliceMut<'_>]) -> io::Result<ScatterRecv> {
    // SAFETY: an all-zero msghdr is valid (no name, no control data).
    let mut msg: libc::msghdr = unsafe { std::mem::zeroed() };
    // IoSliceMut is guaranteed ABI-compatible with iovec on unix.
    msg.msg_iov = bufs.as_mut_ptr().cast::<libc::iovec>();
    msg.msg_iovlen = bufs.len() as _;

    // SAFETY: every iovec points into a live, exclusively borrowed buffer for
    // the duration of the call, and `msg` outlives it.
    let n = unsafe { libc::recvmsg(fd, &mut msg, 0) };
    if n < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(ScatterRecv {
        len: n as usize,
        truncated: msg.msg_flags & libc::MSG_TRUNC != 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_datagram_split_across_buffers() {
        let rx = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let tx = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        tx.send_to(b"headprefixbody!", rx.local_addr().unwrap())
            .await
            .unwrap();

        let mut head = [0u8; 4];
        let mut prefix = [0u8; 6];
        let mut body = [0u8; 32];
        let mut bufs = [
            IoSliceMut::new(&mut head),
            IoSliceMut::new(&mut prefix),
            IoSliceMut::new(&mut body),
        ];
        let recv = ScatterReceiver::new().recv(&rx, &mut bufs).await.unwrap();

        assert_eq!(recv, ScatterRecv { len: 15, truncated: false });
        assert_eq!(&head, b"head");
        assert_eq!(&prefix, b"prefix");
        assert_eq!(&body[..5], b"body!");
    }

    #[tokio::test]
    async fn test_oversized_datagram_reported() {
        let rx = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let tx = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        tx.send_to(&[7u8; 64], rx.local_addr().unwrap()).await.unwrap();

        let mut a = [0u8; 8];
        let mut b = [0u8; 8];
        let mut bufs = [IoSliceMut::new(&mut a), IoSliceMut::new(&mut b)];
        let recv = ScatterReceiver::new().recv(&rx, &mut bufs).await.unwrap();

        assert!(recv.truncated);
        assert_eq!(recv.len, 16);
    }
}
