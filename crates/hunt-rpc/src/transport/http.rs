//! HTTP transport for the RPC dispatcher

use crate::codec::WireCodec;
use crate::dispatch::{self, Method};
use crate::envelope::Response;
use crate::events::{Event, EventSender};
use crate::service::HuntService;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header::CONTENT_TYPE};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// Path of the descriptive info endpoint
pub const INFO_PATH: &str = "/info";

struct HttpState<S> {
    service: Arc<S>,
    codec: WireCodec,
    host: Arc<str>,
    port: u16,
}

impl<S> Clone for HttpState<S> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            codec: self.codec,
            host: self.host.clone(),
            port: self.port,
        }
    }
}

/// Build the router serving `codec` on its path
///
/// `host` and `port` are only reported by the info endpoint.
pub fn router<S: HuntService>(
    service: Arc<S>,
    codec: WireCodec,
    host: &str,
    port: u16,
) -> Router {
    Router::new()
        .route(codec.path(), post(handle_rpc::<S>))
        .route(INFO_PATH, get(handle_info::<S>))
        .with_state(HttpState {
            service,
            codec,
            host: Arc::from(host),
            port,
        })
}

/// Serve until the listener fails or `shutdown` resolves, then report
/// exactly one `TransportExit`
pub async fn serve<F>(listener: TcpListener, router: Router, events: EventSender, shutdown: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!("RPC server listening on {}", addr);
    }

    let served = axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await;
    let error = served.err().map(|e| {
        error!("RPC server stopped: {}", e);
        e.to_string()
    });

    if events.send(Event::TransportExit { error }).await.is_err() {
        warn!("Event loop gone before transport exit was reported");
    }
}

async fn handle_rpc<S: HuntService>(
    State(state): State<HttpState<S>>,
    headers: HeaderMap,
    body: Bytes,
) -> axum::response::Response {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !state.codec.accepts(content_type) {
        warn!("Rejected request with content type '{}'", content_type);
        return (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            format!("expected {}", state.codec.content_type()),
        )
            .into_response();
    }

    let response = match state.codec.decode_request(&body) {
        Ok(request) => {
            debug!("Received {} ({} bytes)", request.method, body.len());
            dispatch::handle_request(&request, state.service.as_ref()).await
        }
        Err(e) => {
            warn!("Failed to parse request: {}", e);
            Response::parse_error(e.to_string())
        }
    };

    match state.codec.encode_response(&response) {
        Ok(bytes) => ([(CONTENT_TYPE, state.codec.content_type())], bytes).into_response(),
        Err(e) => {
            error!("Failed to encode response: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn handle_info<S: HuntService>(State(state): State<HttpState<S>>) -> impl IntoResponse {
    let methods: Vec<String> = Method::ALL
        .iter()
        .map(|m| format!("{}.{}", dispatch::SERVICE_NAME, m.name()))
        .collect();

    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "host": &*state.host,
        "port": state.port,
        "codec": state.codec.name(),
        "path": state.codec.path(),
        "methods": methods,
    }))
}
