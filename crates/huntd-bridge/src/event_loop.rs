//! Main control loop

use crate::keepalive::KeepalivePublisher;
use hunt_rpc::{Event, EventReceiver};
use std::fmt;
use tracing::{debug, error, warn};

/// Why the loop stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    /// The RPC transport stopped serving
    Transport(Option<String>),
    /// Every event sender is gone
    ChannelClosed,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Transport(Some(e)) => write!(f, "RPC transport exited: {}", e),
            ExitReason::Transport(None) => f.write_str("RPC transport exited"),
            ExitReason::ChannelClosed => f.write_str("event channel closed"),
        }
    }
}

/// Single consumer of process events
pub struct EventLoop {
    events: EventReceiver,
    keepalive: Option<KeepalivePublisher>,
}

impl EventLoop {
    pub fn new(events: EventReceiver, keepalive: Option<KeepalivePublisher>) -> Self {
        Self { events, keepalive }
    }

    /// Dispatch events until the transport exits
    pub async fn run(mut self) -> ExitReason {
        while let Some(event) = self.events.recv().await {
            debug!("event {:?}", event);

            match event {
                Event::KeepaliveTick { seq } => self.on_keepalive(seq).await,
                Event::TransportExit { error } => {
                    let reason = ExitReason::Transport(error);
                    error!("{}", reason);
                    return reason;
                }
            }
        }

        ExitReason::ChannelClosed
    }

    async fn on_keepalive(&self, seq: u64) {
        let Some(keepalive) = &self.keepalive else {
            debug!("Keepalive {} ignored: publishing disabled", seq);
            return;
        };

        if let Err(e) = keepalive.publish(seq).await {
            warn!("Keepalive failed: {}", e);
        }
    }
}
