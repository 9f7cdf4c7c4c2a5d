//! The bridge service: RPC operations mapped onto daemon sessions

use crate::protocol::CompatFlags;
use crate::registry::SessionRegistry;
use crate::resolver::{self, DaemonAddrs};
use crate::session::PlayerSession;
use crate::transport::{IoOutcome, TimeoutStream};
use async_trait::async_trait;
use hunt_core::{
    BridgeError, ConnectMode, GameDataReply, GameDataRequest, InputReply, InputRequest,
    JoinParameters, JoinReply, JoinRequest, MessageReply, MessageRequest, QuitReply, QuitRequest,
    Result, StatsReply, StatsRequest,
};
use hunt_rpc::HuntService;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{debug, info};

/// Longest message accepted by `Message`
pub const MAX_MESSAGE_LEN: usize = 1024;

/// Hunt daemon bridge
pub struct HuntDaemon {
    well_known: SocketAddr,
    addrs: DaemonAddrs,
    flags: CompatFlags,
    timeout: Duration,
    registry: SessionRegistry,
}

impl HuntDaemon {
    /// Bridge to a daemon whose ports are already known
    pub fn new(
        well_known: SocketAddr,
        addrs: DaemonAddrs,
        flags: CompatFlags,
        timeout: Duration,
    ) -> Self {
        Self {
            well_known,
            addrs,
            flags,
            timeout,
            registry: SessionRegistry::new(),
        }
    }

    /// Discover the daemon's ports through its well-known endpoint
    pub async fn connect(
        well_known: SocketAddr,
        flags: CompatFlags,
        timeout: Duration,
    ) -> Result<Self> {
        let addrs = resolver::resolve(well_known, timeout).await?;
        Ok(Self::new(well_known, addrs, flags, timeout))
    }

    /// The UDP endpoint the ports were discovered through
    pub fn well_known(&self) -> SocketAddr {
        self.well_known
    }

    pub fn addrs(&self) -> DaemonAddrs {
        self.addrs
    }

    pub fn flags(&self) -> CompatFlags {
        self.flags
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    async fn fetch_stats(&self) -> Result<String> {
        info!("Contacting huntd stats @ {}", self.addrs.stats);

        let mut stream = match TimeoutStream::connect(self.addrs.stats, self.timeout).await {
            Ok(IoOutcome::Complete(s)) => s,
            Ok(IoOutcome::TimedOut(msg)) => return Err(BridgeError::Stats(msg)),
            Err(e) => return Err(BridgeError::Stats(e.to_string())),
        };

        let bytes = stream
            .read_to_end()
            .await
            .and_then(IoOutcome::into_io)
            .map_err(|e| BridgeError::Stats(e.to_string()))?;

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[async_trait]
impl HuntService for HuntDaemon {
    async fn join(&self, req: JoinRequest) -> Result<JoinReply> {
        let params = JoinParameters::try_from(&req)?;

        let mut session = PlayerSession::new();
        session
            .join(self.addrs.game, &params, b"", self.flags, self.timeout)
            .await?;
        let player_id = self.registry.create(session).await?;

        info!("Player {} joined as {}", player_id, params.name());
        Ok(JoinReply {
            token: req.token,
            player_id,
        })
    }

    async fn quit(&self, req: QuitRequest) -> Result<QuitReply> {
        self.registry.delete(&req.player_id).await?;
        Ok(QuitReply { token: req.token })
    }

    async fn message(&self, req: MessageRequest) -> Result<MessageReply> {
        if req.message.is_empty() {
            return Err(BridgeError::InvalidParams("missing Message".into()));
        }
        if req.message.len() > MAX_MESSAGE_LEN {
            return Err(BridgeError::InvalidParams(format!(
                "Message too long: {} bytes, max {}",
                req.message.len(),
                MAX_MESSAGE_LEN
            )));
        }

        let join = JoinRequest {
            connect_mode: ConnectMode::Message.as_u32(),
            ..req.join
        };
        let params = JoinParameters::try_from(&join)?;

        let mut session = PlayerSession::new();
        let result = session
            .join(
                self.addrs.game,
                &params,
                req.message.as_bytes(),
                self.flags,
                self.timeout,
            )
            .await;
        session.close().await;
        result?;

        Ok(MessageReply { token: req.token })
    }

    async fn game_data(&self, req: GameDataRequest) -> Result<GameDataReply> {
        let handle = self.registry.lookup(&req.player_id).await?;
        let outcome = handle.lock().await.read_game_data().await?;

        Ok(match outcome {
            IoOutcome::Complete(data) => GameDataReply {
                token: req.token,
                timeout: false,
                timeout_error: String::new(),
                data,
            },
            IoOutcome::TimedOut(msg) => {
                debug!("Player {}: GameData timeout: {}", req.player_id, msg);
                GameDataReply {
                    token: req.token,
                    timeout: true,
                    timeout_error: msg,
                    data: Vec::new(),
                }
            }
        })
    }

    async fn input(&self, req: InputRequest) -> Result<InputReply> {
        let handle = self.registry.lookup(&req.player_id).await?;
        let outcome = handle.lock().await.send_input(req.keys.as_bytes()).await?;

        let (timeout, timeout_error) = match outcome {
            IoOutcome::Complete(()) => (false, String::new()),
            IoOutcome::TimedOut(msg) => (true, msg),
        };
        Ok(InputReply {
            token: req.token,
            timeout,
            timeout_error,
        })
    }

    async fn stats(&self, req: StatsRequest) -> Result<StatsReply> {
        let stats = self.fetch_stats().await?;
        Ok(StatsReply {
            token: req.token,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeDaemon, FakeStats};
    use hunt_core::{PingRequest, error_codes};

    const TIMEOUT: Duration = Duration::from_millis(200);

    async fn bridge(flags: CompatFlags) -> (HuntDaemon, FakeDaemon) {
        let daemon = FakeDaemon::spawn(flags).await;
        let stats = FakeStats::spawn("tad\t12\n").await;
        let addrs = DaemonAddrs {
            game: daemon.addr,
            stats: stats.addr,
        };
        (HuntDaemon::new(daemon.addr, addrs, flags, TIMEOUT), daemon)
    }

    fn join_request(token: i64) -> JoinRequest {
        JoinRequest {
            uid: 1000,
            name: "tad".into(),
            team: "none".into(),
            enter_status: 1,
            ttyname: String::new(),
            connect_mode: 0,
            token,
        }
    }

    #[tokio::test]
    async fn test_join_play_quit() {
        let (hunt, daemon) = bridge(CompatFlags::NETBSD).await;

        let reply = hunt.join(join_request(11)).await.unwrap();
        assert_eq!(reply.token, 11);
        let mut conn = daemon.accept().await;
        assert_eq!(conn.join.tty_name(), "/dev/tty-web");

        conn.send(b"\x1b[H").await;
        let data = hunt
            .game_data(GameDataRequest {
                player_id: reply.player_id.clone(),
                token: 12,
            })
            .await
            .unwrap();
        assert_eq!(data.token, 12);
        assert!(!data.timeout);
        assert_eq!(data.data, vec![0x1b, u32::from(b'['), u32::from(b'H')]);

        let input = hunt
            .input(InputRequest {
                player_id: reply.player_id.clone(),
                keys: "q".into(),
                token: 13,
            })
            .await
            .unwrap();
        assert!(!input.timeout);
        assert_eq!(conn.recv(1).await, b"q");

        hunt.quit(QuitRequest {
            player_id: reply.player_id.clone(),
            token: 14,
        })
        .await
        .unwrap();

        let err = hunt
            .game_data(GameDataRequest {
                player_id: reply.player_id,
                token: 15,
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), error_codes::UNKNOWN_SESSION);
    }

    #[tokio::test]
    async fn test_game_data_soft_timeout() {
        let (hunt, daemon) = bridge(CompatFlags::DARWIN).await;
        let reply = hunt.join(join_request(1)).await.unwrap();
        let mut conn = daemon.accept().await;

        let req = GameDataRequest {
            player_id: reply.player_id.clone(),
            token: 2,
        };
        let first = hunt.game_data(req.clone()).await.unwrap();
        assert!(first.timeout);
        assert!(!first.timeout_error.is_empty());
        assert!(first.data.is_empty());

        conn.send(b"ok").await;
        let second = hunt.game_data(req).await.unwrap();
        assert!(!second.timeout);
        assert_eq!(second.data, vec![u32::from(b'o'), u32::from(b'k')]);
    }

    #[tokio::test]
    async fn test_message_not_registered() {
        let (hunt, daemon) = bridge(CompatFlags::DEBIAN).await;

        let reply = hunt
            .message(MessageRequest {
                join: join_request(0),
                message: "gg all".into(),
                token: 21,
            })
            .await
            .unwrap();
        assert_eq!(reply.token, 21);

        let conn = daemon.accept().await;
        assert_eq!(conn.join.connect_mode(), ConnectMode::Message);
        assert_eq!(conn.message, b"gg all");
        assert!(hunt.registry().is_empty().await);
    }

    #[tokio::test]
    async fn test_message_validation() {
        let (hunt, _daemon) = bridge(CompatFlags::NETBSD).await;

        let empty = hunt
            .message(MessageRequest {
                join: join_request(0),
                message: String::new(),
                token: 1,
            })
            .await
            .unwrap_err();
        assert!(matches!(empty, BridgeError::InvalidParams(_)));

        let long = hunt
            .message(MessageRequest {
                join: join_request(0),
                message: "x".repeat(MAX_MESSAGE_LEN + 1),
                token: 1,
            })
            .await
            .unwrap_err();
        assert!(matches!(long, BridgeError::InvalidParams(_)));
    }

    #[tokio::test]
    async fn test_join_rejects_bad_team() {
        let (hunt, _daemon) = bridge(CompatFlags::NETBSD).await;
        let req = JoinRequest {
            team: "red".into(),
            ..join_request(0)
        };
        assert!(matches!(
            hunt.join(req).await,
            Err(BridgeError::InvalidParams(_))
        ));
        assert!(hunt.registry().is_empty().await);
    }

    #[tokio::test]
    async fn test_stats() {
        let (hunt, _daemon) = bridge(CompatFlags::NETBSD).await;
        let reply = hunt.stats(StatsRequest { token: 5 }).await.unwrap();
        assert_eq!(reply.token, 5);
        assert_eq!(reply.stats, "tad\t12\n");
    }

    #[tokio::test]
    async fn test_stats_unavailable() {
        let closed = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = closed.local_addr().unwrap();
        drop(closed);

        let hunt = HuntDaemon::new(
            addr,
            DaemonAddrs {
                game: addr,
                stats: addr,
            },
            CompatFlags::NETBSD,
            TIMEOUT,
        );
        let err = hunt.stats(StatsRequest { token: 1 }).await.unwrap_err();
        assert_eq!(err.code(), error_codes::STATS_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_ping_no_io() {
        let addr: SocketAddr = "127.0.0.1:9".parse().unwrap();
        let hunt = HuntDaemon::new(
            addr,
            DaemonAddrs {
                game: addr,
                stats: addr,
            },
            CompatFlags::NETBSD,
            TIMEOUT,
        );
        let reply = hunt.ping(PingRequest { token: 7, seq: 42 });
        assert_eq!((reply.token, reply.seq), (7, 42));
    }
}
