//! Method dispatch for bridge RPCs

use crate::envelope::{Request, Response, RpcError};
use crate::service::HuntService;
use hunt_core::{
    GameDataRequest, InputRequest, JoinRequest, MessageRequest, PingRequest, QuitRequest, Result,
    StatsRequest, error_codes,
};
use tracing::{debug, info, warn};

/// Service name prefix used by existing clients (`HuntDaemon.Join`)
pub const SERVICE_NAME: &str = "HuntDaemon";

/// Bridge RPC methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Join,
    Quit,
    Message,
    GameData,
    Input,
    Stats,
    Ping,
}

impl Method {
    pub const ALL: [Method; 7] = [
        Method::Join,
        Method::Quit,
        Method::Message,
        Method::GameData,
        Method::Input,
        Method::Stats,
        Method::Ping,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Method::Join => "Join",
            Method::Quit => "Quit",
            Method::Message => "Message",
            Method::GameData => "GameData",
            Method::Input => "Input",
            Method::Stats => "Stats",
            Method::Ping => "Ping",
        }
    }

    /// Resolve a wire method name
    ///
    /// Accepts `Join`, `HuntDaemon.Join`, and the `HuntDaemon.JJoin` form
    /// the frontend's HTTP handlers were registered under.
    pub fn parse(method: &str) -> Option<Method> {
        let bare = method
            .strip_prefix(SERVICE_NAME)
            .and_then(|m| m.strip_prefix('.'))
            .unwrap_or(method);

        Self::lookup(bare).or_else(|| bare.strip_prefix('J').and_then(Self::lookup))
    }

    fn lookup(name: &str) -> Option<Method> {
        Self::ALL.into_iter().find(|m| m.name() == name)
    }
}

/// Handle one decoded request
pub async fn handle_request<S: HuntService>(request: &Request, service: &S) -> Response {
    let Some(method) = Method::parse(&request.method) else {
        warn!("Method not found: {}", request.method);
        return Response::error(
            request,
            RpcError::new(
                error_codes::METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            ),
        );
    };

    let params = match request.param() {
        Ok(p) => p,
        Err(e) => return Response::error(request, e),
    };

    match call(method, params, service).await {
        Ok(value) => Response::success(request, value),
        Err(e) => {
            warn!("{} failed: {}", method.name(), e);
            Response::error(request, RpcError::new(e.code(), e.to_string()))
        }
    }
}

async fn call<S: HuntService>(
    method: Method,
    params: serde_json::Value,
    service: &S,
) -> Result<serde_json::Value> {
    match method {
        Method::Join => {
            let req: JoinRequest = serde_json::from_value(params)?;
            info!("Join {}", req.name);
            Ok(serde_json::to_value(service.join(req).await?)?)
        }
        Method::Quit => {
            let req: QuitRequest = serde_json::from_value(params)?;
            info!("Quit {}", req.player_id);
            Ok(serde_json::to_value(service.quit(req).await?)?)
        }
        Method::Message => {
            let req: MessageRequest = serde_json::from_value(params)?;
            info!("Message {}", req.message);
            Ok(serde_json::to_value(service.message(req).await?)?)
        }
        Method::GameData => {
            let req: GameDataRequest = serde_json::from_value(params)?;
            debug!("GameData {}", req.player_id);
            Ok(serde_json::to_value(service.game_data(req).await?)?)
        }
        Method::Input => {
            let req: InputRequest = serde_json::from_value(params)?;
            debug!("Input {} Keys {:?}", req.player_id, req.keys);
            Ok(serde_json::to_value(service.input(req).await?)?)
        }
        Method::Stats => {
            let req: StatsRequest = serde_json::from_value(params)?;
            info!("Stats");
            Ok(serde_json::to_value(service.stats(req).await?)?)
        }
        Method::Ping => {
            let req: PingRequest = serde_json::from_value(params)?;
            debug!("Ping Token {} Seq {}", req.token, req.seq);
            Ok(serde_json::to_value(service.ping(req))?)
        }
    }
}
