//! Hunt bridge server
//!
//! Resolves the hunt daemon's ports through its well-known UDP endpoint,
//! serves the `HuntDaemon` RPC service over HTTP and, when configured,
//! announces the server on a keepalive topic.
//!
//! Configuration comes from the environment (`SERVER_*`, `HUNTD_*`,
//! `PUBSUB_*`); log filtering from `RUST_LOG`.

use anyhow::{Context, Result};
use hunt_rpc::{RpcServer, events};
use huntd_bridge::{BridgeConfig, EventLoop, HuntDaemon, KeepalivePublisher, PubSubRestBus};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

async fn keepalive_publisher(config: &BridgeConfig) -> Result<Option<KeepalivePublisher>> {
    let Some(keepalive) = &config.keepalive else {
        info!("Keepalive publishing disabled");
        return Ok(None);
    };

    let url = keepalive.url()?;
    let bus = Arc::new(PubSubRestBus::new(
        &keepalive.pubsub_endpoint,
        &keepalive.pubsub_project,
        config.timeout,
    ));
    let publisher = KeepalivePublisher::new(
        bus,
        &keepalive.topic,
        &keepalive.hostname,
        &keepalive.instance,
        url,
    )
    .await?;

    info!(
        "Publishing keepalives for instance {} to {}",
        keepalive.instance, keepalive.topic
    );
    Ok(Some(publisher))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = BridgeConfig::from_env().context("invalid configuration")?;
    info!(
        "Hunt bridge starting: legacy_wide_mode_field={} version_after_join={}",
        config.compat.legacy_wide_mode_field, config.compat.version_after_join
    );

    let well_known = huntd_bridge::resolver::lookup(&config.huntd_host, config.huntd_port)
        .await
        .context("resolving huntd")?;
    let daemon = HuntDaemon::connect(well_known, config.compat, config.timeout)
        .await
        .context("discovering huntd ports")?;
    let addrs = daemon.addrs();
    info!("huntd game @ {}, stats @ {}", addrs.game, addrs.stats);

    let server = RpcServer::new(
        daemon,
        config.rpc_type,
        &config.listen_host,
        config.listen_port,
    );
    let listener = TcpListener::bind(server.listen_addr())
        .await
        .with_context(|| format!("binding {}", server.listen_addr()))?;
    info!(
        "Serving {} RPC on {}",
        config.rpc_type,
        listener.local_addr()?
    );

    let (tx, rx) = events::channel();
    tokio::spawn(server.run_http(listener, tx.clone()));
    tokio::spawn(events::keepalive_ticker(config.keepalive_interval, tx));

    let keepalive = keepalive_publisher(&config).await?;
    let reason = EventLoop::new(rx, keepalive).run().await;

    error!("Shutting down: {}", reason);
    std::process::exit(1);
}
