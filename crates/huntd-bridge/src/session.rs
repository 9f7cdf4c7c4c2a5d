//! One player's connection to the daemon

use crate::protocol::{self, CompatFlags};
use crate::transport::{IoOutcome, TimeoutStream};
use hunt_core::{BridgeError, JoinParameters, Result};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Largest single game data read
pub const GAME_DATA_BUF_LEN: usize = 2048;

/// Opaque session identifier
pub type SessionId = String;

enum State {
    Unjoined,
    Joined {
        stream: TimeoutStream<TcpStream>,
        server_version: u32,
        join: JoinParameters,
    },
    Closed,
}

/// Player session lifecycle: `Unjoined -> Joined -> Closed`
pub struct PlayerSession {
    id: SessionId,
    state: State,
}

impl Default for PlayerSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerSession {
    /// New unjoined session with a fresh identifier
    pub fn new() -> Self {
        let id = Uuid::new_v4().to_string();
        debug!("Created new player {}", id);
        Self {
            id,
            state: State::Unjoined,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_joined(&self) -> bool {
        matches!(self.state, State::Joined { .. })
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, State::Closed)
    }

    pub fn server_version(&self) -> Option<u32> {
        match &self.state {
            State::Joined { server_version, .. } => Some(*server_version),
            _ => None,
        }
    }

    pub fn join_params(&self) -> Option<&JoinParameters> {
        match &self.state {
            State::Joined { join, .. } => Some(join),
            _ => None,
        }
    }

    /// Dial the gameplay port and run the join handshake
    ///
    /// On failure the connection is dropped and the session is closed.
    pub async fn join(
        &mut self,
        addr: SocketAddr,
        params: &JoinParameters,
        message: &[u8],
        flags: CompatFlags,
        timeout: Duration,
    ) -> Result<()> {
        if !matches!(self.state, State::Unjoined) {
            return Err(BridgeError::Session(format!("{}: already joined", self.id)));
        }

        info!("Player {}: join huntd gameplay server @ {}", self.id, addr);

        let mut stream = match TimeoutStream::connect(addr, timeout).await {
            Ok(IoOutcome::Complete(s)) => s,
            Ok(IoOutcome::TimedOut(msg)) => {
                self.state = State::Closed;
                return Err(BridgeError::Protocol(format!("dial {}: {}", addr, msg)));
            }
            Err(e) => {
                self.state = State::Closed;
                return Err(BridgeError::Protocol(format!("dial {}: {}", addr, e)));
            }
        };

        match protocol::handshake(&mut stream, params, message, flags).await {
            Ok(server_version) => {
                self.state = State::Joined {
                    stream,
                    server_version,
                    join: params.clone(),
                };
                Ok(())
            }
            Err(e) => {
                self.state = State::Closed;
                Err(e)
            }
        }
    }

    fn stream(&mut self) -> Result<&mut TimeoutStream<TcpStream>> {
        match &mut self.state {
            State::Joined { stream, .. } => Ok(stream),
            State::Unjoined => Err(BridgeError::Session(format!("{}: not joined", self.id))),
            State::Closed => Err(BridgeError::Session(format!("{}: session closed", self.id))),
        }
    }

    /// Record a hard failure; the connection is dropped
    fn fail(&mut self, what: String) -> BridgeError {
        warn!("Player {}: {}", self.id, what);
        self.state = State::Closed;
        BridgeError::Session(format!("{}: {}", self.id, what))
    }

    /// One bounded read of screen data, each byte widened to `u32`
    pub async fn read_game_data(&mut self) -> Result<IoOutcome<Vec<u32>>> {
        let mut buf = vec![0u8; GAME_DATA_BUF_LEN];
        let result = self.stream()?.read_some(&mut buf).await;
        debug!("Player {}: Read GameData: {:?}", self.id, result);

        match result {
            Ok(IoOutcome::Complete(0)) => {
                Err(self.fail("read game data: connection closed by daemon".into()))
            }
            Ok(IoOutcome::Complete(n)) => Ok(IoOutcome::Complete(
                buf[..n].iter().map(|&b| u32::from(b)).collect(),
            )),
            Ok(IoOutcome::TimedOut(msg)) => Ok(IoOutcome::TimedOut(msg)),
            Err(e) => Err(self.fail(format!("read game data: {}", e))),
        }
    }

    /// One bounded write of raw key bytes
    ///
    /// A soft timeout does not mean nothing was sent: a prefix of `keys` may
    /// already have reached the daemon.
    pub async fn send_input(&mut self, keys: &[u8]) -> Result<IoOutcome<()>> {
        debug!("Player {}: Send Input {:?}", self.id, String::from_utf8_lossy(keys));

        let result = self.stream()?.write_all(keys).await;
        match result {
            Ok(outcome) => Ok(outcome),
            Err(e) => Err(self.fail(format!("send input: {}", e))),
        }
    }

    /// Close the connection; a no-op unless joined
    pub async fn close(&mut self) {
        if let State::Joined { mut stream, .. } =
            std::mem::replace(&mut self.state, State::Closed)
        {
            info!("Player {}: Close", self.id);
            if let Ok(IoOutcome::TimedOut(msg)) = stream.shutdown().await {
                debug!("Player {}: shutdown timed out: {}", self.id, msg);
            }
        } else {
            self.state = State::Closed;
        }
    }
}
