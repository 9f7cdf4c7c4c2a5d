//! RPC envelope shared by every wire codec

use hunt_core::error_codes;
use serde::{Deserialize, Serialize};

/// RPC request
///
/// `jsonrpc` is optional so both JSON-RPC 2.0 clients and the older
/// 1.0-style clients (no version field, positional `params`) are served.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: RequestId,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

impl Request {
    /// The call's single parameter record
    ///
    /// 1.0-style clients wrap it in a one-element array.
    pub fn param(&self) -> Result<serde_json::Value, RpcError> {
        match &self.params {
            serde_json::Value::Array(items) => match items.as_slice() {
                [single] => Ok(single.clone()),
                _ => Err(RpcError::new(
                    error_codes::INVALID_PARAMS,
                    format!("expected exactly one param, got {}", items.len()),
                )),
            },
            serde_json::Value::Null => Ok(serde_json::json!({})),
            other => Ok(other.clone()),
        }
    }
}

/// Request ID (number, string, or absent)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
    #[default]
    Null,
}

/// RPC response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonrpc: Option<String>,
    pub id: RequestId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// RPC error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl Response {
    pub fn success(request: &Request, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: request.jsonrpc.clone(),
            id: request.id.clone(),
            result: Some(result),
            error: None,
        }
    }

    pub fn error(request: &Request, error: RpcError) -> Self {
        Self {
            jsonrpc: request.jsonrpc.clone(),
            id: request.id.clone(),
            result: None,
            error: Some(error),
        }
    }

    /// Error reply for a request that could not be decoded at all
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self {
            jsonrpc: Some("2.0".to_string()),
            id: RequestId::Null,
            result: None,
            error: Some(RpcError::new(error_codes::PARSE_ERROR, message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_request() {
        let json = r#"{"method":"HuntDaemon.JPing","params":[{"Token":7,"Seq":42}],"id":3}"#;
        let req: Request = serde_json::from_str(json).unwrap();
        assert_eq!(req.jsonrpc, None);
        assert_eq!(req.id, RequestId::Number(3));
        assert_eq!(req.param().unwrap(), serde_json::json!({"Token":7,"Seq":42}));
    }

    #[test]
    fn test_v2_request_object_params() {
        let json = r#"{"jsonrpc":"2.0","method":"Ping","params":{"Token":1},"id":"a"}"#;
        let req: Request = serde_json::from_str(json).unwrap();
        assert_eq!(req.jsonrpc.as_deref(), Some("2.0"));
        assert_eq!(req.id, RequestId::String("a".into()));
        assert_eq!(req.param().unwrap(), serde_json::json!({"Token":1}));
    }

    #[test]
    fn test_missing_id_and_params() {
        let req: Request = serde_json::from_str(r#"{"method":"Stats"}"#).unwrap();
        assert_eq!(req.id, RequestId::Null);
        assert_eq!(req.param().unwrap(), serde_json::json!({}));
    }

    #[test]
    fn test_too_many_params() {
        let req: Request =
            serde_json::from_str(r#"{"method":"Ping","params":[{},{}],"id":1}"#).unwrap();
        assert_eq!(req.param().unwrap_err().code, error_codes::INVALID_PARAMS);
    }

    #[test]
    fn test_response_echoes_version() {
        let req: Request = serde_json::from_str(r#"{"method":"Ping","id":1}"#).unwrap();
        let json = serde_json::to_string(&Response::success(&req, serde_json::json!({}))).unwrap();
        assert_eq!(json, r#"{"id":1,"result":{}}"#);
    }
}
