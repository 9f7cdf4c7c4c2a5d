//! Process events consumed by the bridge's main loop

use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

/// Event delivered to the main loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Time to publish a keepalive
    KeepaliveTick { seq: u64 },
    /// The RPC transport stopped serving
    TransportExit { error: Option<String> },
}

/// Event channel sender
pub type EventSender = mpsc::Sender<Event>;

/// Event channel receiver
pub type EventReceiver = mpsc::Receiver<Event>;

/// Create the main loop's event channel
pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::channel(16)
}

/// Emit a `KeepaliveTick` every `interval`
///
/// Sequence numbers start at zero and increase by one per tick. The first
/// tick fires immediately. Returns when the receiver is dropped.
pub async fn keepalive_ticker(interval: Duration, tx: EventSender) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let mut seq = 0u64;
    loop {
        ticker.tick().await;
        if tx.send(Event::KeepaliveTick { seq }).await.is_err() {
            debug!("Event loop gone, stopping keepalive ticker");
            return;
        }
        seq += 1;
    }
}
