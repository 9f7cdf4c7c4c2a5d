//! Bridge service trait

use async_trait::async_trait;
use hunt_core::{
    GameDataReply, GameDataRequest, InputReply, InputRequest, JoinReply, JoinRequest,
    MessageReply, MessageRequest, PingReply, PingRequest, QuitReply, QuitRequest, Result,
    StatsReply, StatsRequest,
};

/// Operations exposed over RPC
///
/// Implement this trait to put a daemon behind the dispatcher. Handlers run
/// concurrently, one per inbound request, so implementations take `&self`.
#[async_trait]
pub trait HuntService: Send + Sync + 'static {
    /// Join the game and register a new session
    async fn join(&self, req: JoinRequest) -> Result<JoinReply>;

    /// Tear down a session
    async fn quit(&self, req: QuitRequest) -> Result<QuitReply>;

    /// Join, deliver a message and hang up without registering a session
    async fn message(&self, req: MessageRequest) -> Result<MessageReply>;

    /// Read one chunk of screen data
    async fn game_data(&self, req: GameDataRequest) -> Result<GameDataReply>;

    /// Send raw key input
    async fn input(&self, req: InputRequest) -> Result<InputReply>;

    /// Fetch the scoreboard text
    async fn stats(&self, req: StatsRequest) -> Result<StatsReply>;

    /// Reachability probe; never touches the network
    fn ping(&self, req: PingRequest) -> PingReply {
        PingReply {
            token: req.token,
            seq: req.seq,
        }
    }
}
