//! In-process stand-ins for the hunt daemon's sockets

use crate::protocol::{self, CompatFlags, SERVER_VERSION};
use hunt_core::{ConnectMode, EnterStatus, JoinParameters, Team};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::{Mutex, mpsc};

pub(crate) fn join_params(mode: ConnectMode) -> JoinParameters {
    JoinParameters::new(1000, "tad", Team::NONE, EnterStatus::Cloak, "", mode).unwrap()
}

/// Gameplay port that speaks the daemon side of the join exchange
pub(crate) struct FakeDaemon {
    pub addr: SocketAddr,
    joined: mpsc::Receiver<DaemonConn>,
}

/// A connection that completed the join exchange
pub(crate) struct DaemonConn {
    pub join: JoinParameters,
    pub message: Vec<u8>,
    stream: TcpStream,
}

impl FakeDaemon {
    pub async fn spawn(flags: CompatFlags) -> Self {
        Self::spawn_with_version(flags, SERVER_VERSION).await
    }

    pub async fn spawn_with_version(flags: CompatFlags, version: u32) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, joined) = mpsc::channel(8);

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let tx = tx.clone();
                tokio::spawn(async move {
                    if let Some(conn) = Self::serve(stream, flags, version).await {
                        let _ = tx.send(conn).await;
                    }
                });
            }
        });

        Self { addr, joined }
    }

    async fn serve(mut stream: TcpStream, flags: CompatFlags, version: u32) -> Option<DaemonConn> {
        if !flags.version_after_join {
            stream.write_all(&version.to_be_bytes()).await.ok()?;
        }

        let mut record = vec![0u8; flags.join_len()];
        stream.read_exact(&mut record).await.ok()?;

        if flags.version_after_join {
            stream.write_all(&version.to_be_bytes()).await.ok()?;
        }

        let (join, _) = protocol::decode_join(&record, flags).ok()?;
        let mut message = Vec::new();
        if join.connect_mode() == ConnectMode::Message {
            stream.read_to_end(&mut message).await.ok()?;
        }

        Some(DaemonConn {
            join,
            message,
            stream,
        })
    }

    /// Next connection that finished joining
    pub async fn accept(mut self) -> DaemonConn {
        self.joined.recv().await.unwrap()
    }
}

impl DaemonConn {
    pub async fn send(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).await.unwrap();
    }

    pub async fn recv(&mut self, n: usize) -> Vec<u8> {
        let mut buf = vec![0u8; n];
        self.stream.read_exact(&mut buf).await.unwrap();
        buf
    }
}

/// Statistics port: writes the scoreboard and hangs up
pub(crate) struct FakeStats {
    pub addr: SocketAddr,
}

impl FakeStats {
    pub async fn spawn(text: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                let _ = stream.write_all(text.as_bytes()).await;
            }
        });

        Self { addr }
    }
}

/// Well-known UDP port answering port requests
pub(crate) struct FakeWellKnown {
    pub addr: SocketAddr,
    seen: Arc<Mutex<Vec<u16>>>,
}

impl FakeWellKnown {
    pub async fn spawn(game_port: u16, stats_port: u16) -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = socket.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let log = seen.clone();
        tokio::spawn(async move {
            let mut buf = [0u8; 2];
            while let Ok((2, from)) = socket.recv_from(&mut buf).await {
                let op = u16::from_be_bytes(buf);
                log.lock().await.push(op);
                let port = if op == crate::resolver::C_SCORES {
                    stats_port
                } else {
                    game_port
                };
                let _ = socket.send_to(&port.to_be_bytes(), from).await;
            }
        });

        Self { addr, seen }
    }

    pub async fn opcodes(&self) -> Vec<u16> {
        self.seen.lock().await.clone()
    }
}
