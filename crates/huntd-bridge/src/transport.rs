//! Deadline-bounded socket wrappers
//!
//! Every operation on the daemon's sockets carries the same fixed deadline.
//! Expiry is reported as `IoOutcome::TimedOut` rather than as an error so
//! callers can decide whether a timeout is soft (an established session)
//! or fatal (the handshake, the port exchange).

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};

/// Result of an I/O operation run against a deadline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IoOutcome<T> {
    /// Finished within the deadline
    Complete(T),
    /// Deadline expired; carries a human readable description
    TimedOut(String),
}

impl<T> IoOutcome<T> {
    pub fn is_timed_out(&self) -> bool {
        matches!(self, IoOutcome::TimedOut(_))
    }

    /// Treat a timeout as an ordinary `io::Error`
    pub fn into_io(self) -> io::Result<T> {
        match self {
            IoOutcome::Complete(v) => Ok(v),
            IoOutcome::TimedOut(msg) => Err(io::Error::new(io::ErrorKind::TimedOut, msg)),
        }
    }
}

async fn bounded<T>(
    timeout: Duration,
    fut: impl Future<Output = io::Result<T>>,
) -> io::Result<IoOutcome<T>> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(v)) => Ok(IoOutcome::Complete(v)),
        Ok(Err(e)) if e.kind() == io::ErrorKind::TimedOut => Ok(IoOutcome::TimedOut(e.to_string())),
        Ok(Err(e)) => Err(e),
        Err(_) => Ok(IoOutcome::TimedOut(format!(
            "i/o timeout after {}ms",
            timeout.as_millis()
        ))),
    }
}

/// Stream wrapper applying a fresh deadline to each operation
#[derive(Debug)]
pub struct TimeoutStream<S> {
    inner: S,
    timeout: Duration,
}

impl TimeoutStream<TcpStream> {
    /// Dial `addr` within the deadline
    pub async fn connect(addr: SocketAddr, timeout: Duration) -> io::Result<IoOutcome<Self>> {
        Ok(match bounded(timeout, TcpStream::connect(addr)).await? {
            IoOutcome::Complete(stream) => IoOutcome::Complete(Self::new(stream, timeout)),
            IoOutcome::TimedOut(msg) => IoOutcome::TimedOut(msg),
        })
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin + Send> TimeoutStream<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Single read of up to `buf.len()` bytes
    pub async fn read_some(&mut self, buf: &mut [u8]) -> io::Result<IoOutcome<usize>> {
        bounded(self.timeout, self.inner.read(buf)).await
    }

    pub async fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<IoOutcome<()>> {
        bounded(self.timeout, async {
            self.inner.read_exact(buf).await?;
            Ok::<_, io::Error>(())
        })
        .await
    }

    pub async fn write_all(&mut self, buf: &[u8]) -> io::Result<IoOutcome<()>> {
        bounded(self.timeout, async {
            self.inner.write_all(buf).await?;
            self.inner.flush().await
        })
        .await
    }

    /// Drain until the peer closes
    pub async fn read_to_end(&mut self) -> io::Result<IoOutcome<Vec<u8>>> {
        bounded(self.timeout, async {
            let mut out = Vec::new();
            self.inner.read_to_end(&mut out).await?;
            Ok::<_, io::Error>(out)
        })
        .await
    }

    pub async fn shutdown(&mut self) -> io::Result<IoOutcome<()>> {
        bounded(self.timeout, self.inner.shutdown()).await
    }
}

/// Connected UDP socket with per-operation deadlines
#[derive(Debug)]
pub struct TimeoutUdp {
    socket: UdpSocket,
    timeout: Duration,
}

impl TimeoutUdp {
    /// Bind an ephemeral local port and connect it to `remote`
    pub async fn connect(remote: SocketAddr, timeout: Duration) -> io::Result<Self> {
        let local: SocketAddr = if remote.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(remote).await?;
        Ok(Self { socket, timeout })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub async fn send(&self, buf: &[u8]) -> io::Result<IoOutcome<usize>> {
        bounded(self.timeout, self.socket.send(buf)).await
    }

    /// Receive one datagram along with its source address
    pub async fn recv_from(&self, buf: &mut [u8]) -> io::Result<IoOutcome<(usize, SocketAddr)>> {
        bounded(self.timeout, self.socket.recv_from(buf)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_after_timeout() {
        let mock = tokio_test::io::Builder::new()
            .wait(Duration::from_millis(60))
            .read(b"ok")
            .build();
        let mut stream = TimeoutStream::new(mock, Duration::from_millis(20));

        let mut buf = [0u8; 8];
        assert!(stream.read_some(&mut buf).await.unwrap().is_timed_out());

        let mut n = IoOutcome::TimedOut(String::new());
        for _ in 0..10 {
            n = stream.read_some(&mut buf).await.unwrap();
            if !n.is_timed_out() {
                break;
            }
        }
        assert_eq!(n, IoOutcome::Complete(2));
        assert_eq!(&buf[..2], b"ok");
    }

    #[tokio::test]
    async fn test_hard_error_propagates() {
        let mock = tokio_test::io::Builder::new()
            .read_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            .build();
        let mut stream = TimeoutStream::new(mock, Duration::from_secs(1));

        let mut buf = [0u8; 4];
        let err = stream.read_exact(&mut buf).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
    }

    #[tokio::test]
    async fn test_udp_exchange() {
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let peer_addr = peer.local_addr().unwrap();

        let udp = TimeoutUdp::connect(peer_addr, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(udp.send(&[0, 3]).await.unwrap(), IoOutcome::Complete(2));

        let mut buf = [0u8; 2];
        let (n, from) = peer.recv_from(&mut buf).await.unwrap();
        assert_eq!((n, buf), (2, [0, 3]));
        peer.send_to(&[0x12, 0x34], from).await.unwrap();

        let IoOutcome::Complete((n, src)) = udp.recv_from(&mut buf).await.unwrap() else {
            panic!("timed out");
        };
        assert_eq!(n, 2);
        assert_eq!(src, peer_addr);
        assert_eq!(u16::from_be_bytes(buf), 0x1234);
    }
}
