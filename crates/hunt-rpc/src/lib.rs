//! # hunt-rpc
//!
//! RPC dispatcher for the hunt daemon bridge.
//!
//! This crate provides:
//! - `HuntService` trait for putting a daemon behind the dispatcher
//! - Method dispatch over a codec-independent envelope
//! - JSON and MessagePack wire codecs served over HTTP
//! - Process events (keepalive ticks, transport exit)

pub mod codec;
pub mod dispatch;
pub mod envelope;
pub mod events;
pub mod service;
pub mod transport;

pub use codec::WireCodec;
pub use events::{Event, EventReceiver, EventSender};
pub use service::HuntService;

use std::sync::Arc;
use tokio::net::TcpListener;

/// Hunt bridge RPC server
pub struct RpcServer<S: HuntService> {
    /// Service implementation
    service: Arc<S>,
    /// Active wire codec
    codec: WireCodec,
    /// Listen host, as configured
    host: String,
    /// Listen port, as configured
    port: u16,
}

impl<S: HuntService> RpcServer<S> {
    /// Create a new server with the given service
    pub fn new(service: S, codec: WireCodec, host: impl Into<String>, port: u16) -> Self {
        Self::from_arc(Arc::new(service), codec, host, port)
    }

    /// Create a server sharing an existing service handle
    pub fn from_arc(
        service: Arc<S>,
        codec: WireCodec,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            service,
            codec,
            host: host.into(),
            port,
        }
    }

    pub fn codec(&self) -> WireCodec {
        self.codec
    }

    /// `host:port` to bind
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn service(&self) -> &Arc<S> {
        &self.service
    }

    /// HTTP router for the active codec
    pub fn router(&self) -> axum::Router {
        transport::http::router(self.service.clone(), self.codec, &self.host, self.port)
    }

    /// Serve HTTP on an already bound listener
    ///
    /// Reports a single `Event::TransportExit` on `events` when serving stops.
    pub async fn run_http(self, listener: TcpListener, events: EventSender) {
        let router = self.router();
        transport::http::serve(listener, router, events, std::future::pending()).await
    }
}
