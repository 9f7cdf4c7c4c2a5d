//! Bridge from the BSD hunt daemon protocol to RPC
//!
//! This crate provides:
//! - Well-known port discovery for the daemon's TCP ports
//! - The join handshake codec and its per-daemon quirks
//! - Player sessions and the session registry
//! - `HuntDaemon`, the `HuntService` implementation
//! - Keepalive publishing and the main event loop

pub mod config;
pub mod daemon;
pub mod event_loop;
pub mod keepalive;
pub mod protocol;
pub mod registry;
pub mod resolver;
pub mod session;
pub mod transport;

#[cfg(test)]
mod testing;

pub use config::{BridgeConfig, KeepaliveConfig};
pub use daemon::HuntDaemon;
pub use event_loop::{EventLoop, ExitReason};
pub use keepalive::{InMemoryBus, KeepalivePublisher, MessageBus, PubSubRestBus};
pub use protocol::CompatFlags;
pub use registry::SessionRegistry;
pub use resolver::DaemonAddrs;
pub use session::PlayerSession;
pub use transport::{IoOutcome, TimeoutStream, TimeoutUdp};
