//! Well-known port discovery
//!
//! The daemon listens on a fixed UDP port and hands out the dynamically
//! assigned TCP ports for gameplay and statistics on request.

use crate::transport::{IoOutcome, TimeoutUdp};
use hunt_core::{BridgeError, Result};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;

/// Request the gameplay port
pub const C_PLAYER: u16 = 0;

/// Request the statistics port
pub const C_SCORES: u16 = 3;

/// TCP endpoints learned from the well-known port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaemonAddrs {
    pub game: SocketAddr,
    pub stats: SocketAddr,
}

/// Replace the port of a `host:port` string
///
/// An empty `port` strips the port; an address without a port gets one
/// appended.
pub fn replace_port(addr: &str, port: &str) -> String {
    let host = match addr.rfind(':') {
        Some(i) => &addr[..i],
        None => addr,
    };

    if port.is_empty() {
        host.to_string()
    } else {
        format!("{}:{}", host, port)
    }
}

fn resolution_io<T>(op: u16, what: &str, r: std::io::Result<IoOutcome<T>>) -> Result<T> {
    match r {
        Ok(IoOutcome::Complete(v)) => Ok(v),
        Ok(IoOutcome::TimedOut(msg)) => Err(BridgeError::Resolution(format!(
            "opcode {}: {}: {}",
            op, what, msg
        ))),
        Err(e) => Err(BridgeError::Resolution(format!(
            "opcode {}: {}: {}",
            op, what, e
        ))),
    }
}

/// One request/reply exchange on the well-known port
///
/// Returns the assigned TCP port and the reply's source address.
pub async fn request_port(udp: &TimeoutUdp, op: u16) -> Result<(u16, SocketAddr)> {
    let req = op.to_be_bytes();
    let n = resolution_io(op, "send", udp.send(&req).await)?;
    if n != req.len() {
        return Err(BridgeError::Resolution(format!(
            "short write: wrote {} expected {}",
            n,
            req.len()
        )));
    }

    let mut reply = [0u8; 2];
    let (n, from) = resolution_io(op, "receive", udp.recv_from(&mut reply).await)?;
    if n != reply.len() {
        return Err(BridgeError::Resolution(format!(
            "short read: read {} expected {}",
            n,
            reply.len()
        )));
    }

    Ok((u16::from_be_bytes(reply), from))
}

fn derive_addr(from: SocketAddr, port: u16) -> Result<SocketAddr> {
    let s = replace_port(&from.to_string(), &port.to_string());
    s.parse()
        .map_err(|e| BridgeError::Resolution(format!("bad derived address {}: {}", s, e)))
}

/// Look up the well-known endpoint
pub async fn lookup(host: &str, port: u16) -> Result<SocketAddr> {
    tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| BridgeError::Resolution(format!("{}:{}: {}", host, port, e)))?
        .next()
        .ok_or_else(|| BridgeError::Resolution(format!("{}:{}: no addresses", host, port)))
}

/// Discover the gameplay and statistics ports
pub async fn resolve(well_known: SocketAddr, timeout: Duration) -> Result<DaemonAddrs> {
    info!("Contacting huntd @ {} ...", well_known);

    let udp = TimeoutUdp::connect(well_known, timeout)
        .await
        .map_err(|e| BridgeError::Resolution(format!("{}: {}", well_known, e)))?;

    let (game_port, game_from) = request_port(&udp, C_PLAYER).await?;
    info!(
        "gameplay port is {} on host {}",
        game_port,
        replace_port(&game_from.to_string(), "")
    );

    let (stats_port, stats_from) = request_port(&udp, C_SCORES).await?;
    info!(
        "statistics port is {} on host {}",
        stats_port,
        replace_port(&stats_from.to_string(), "")
    );

    Ok(DaemonAddrs {
        game: derive_addr(game_from, game_port)?,
        stats: derive_addr(stats_from, stats_port)?,
    })
}
