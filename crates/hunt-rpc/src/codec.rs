//! Wire codecs for the RPC envelope
//!
//! Exactly one codec is active per process, selected at startup. JSON is the
//! codec the browser-facing frontend speaks; MessagePack is the compact
//! binary alternative.

use crate::envelope::{Request, Response};
use std::fmt;
use std::str::FromStr;

/// Codec errors
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("MessagePack decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
    #[error("MessagePack encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("unsupported rpc type '{0}'")]
    Unsupported(String),
}

/// Active RPC wire encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireCodec {
    /// JSON-RPC over HTTP
    Json,
    /// MessagePack envelope over HTTP
    MessagePack,
}

impl WireCodec {
    /// Configuration name
    pub fn name(self) -> &'static str {
        match self {
            WireCodec::Json => "jsonrpc",
            WireCodec::MessagePack => "msgpack",
        }
    }

    /// HTTP path the dispatcher is mounted on
    pub fn path(self) -> &'static str {
        match self {
            WireCodec::Json => "/jsonrpc",
            WireCodec::MessagePack => "/msgpackrpc",
        }
    }

    /// Content type of encoded replies
    pub fn content_type(self) -> &'static str {
        match self {
            WireCodec::Json => "application/json",
            WireCodec::MessagePack => "application/msgpack",
        }
    }

    /// Whether a request with this Content-Type header can be decoded
    pub fn accepts(self, content_type: &str) -> bool {
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match self {
            WireCodec::Json => mime == "application/json" || mime == "text/plain",
            WireCodec::MessagePack => {
                mime == "application/msgpack" || mime == "application/x-msgpack"
            }
        }
    }

    pub fn decode_request(self, bytes: &[u8]) -> Result<Request, CodecError> {
        match self {
            WireCodec::Json => Ok(serde_json::from_slice(bytes)?),
            WireCodec::MessagePack => Ok(rmp_serde::from_slice(bytes)?),
        }
    }

    pub fn encode_response(self, response: &Response) -> Result<Vec<u8>, CodecError> {
        match self {
            WireCodec::Json => Ok(serde_json::to_vec(response)?),
            WireCodec::MessagePack => Ok(rmp_serde::to_vec_named(response)?),
        }
    }
}

impl FromStr for WireCodec {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "jsonrpc" | "json" => Ok(WireCodec::Json),
            "msgpack" | "msgpackrpc" => Ok(WireCodec::MessagePack),
            other => Err(CodecError::Unsupported(other.to_string())),
        }
    }
}

impl fmt::Display for WireCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::RequestId;

    #[test]
    fn test_from_str() {
        assert_eq!("jsonrpc".parse::<WireCodec>().unwrap(), WireCodec::Json);
        assert_eq!("msgpack".parse::<WireCodec>().unwrap(), WireCodec::MessagePack);
        assert!("netrpc".parse::<WireCodec>().is_err());
    }

    #[test]
    fn test_accepts() {
        assert!(WireCodec::Json.accepts("application/json;charset=utf-8"));
        assert!(WireCodec::Json.accepts("text/plain"));
        assert!(!WireCodec::Json.accepts("application/msgpack"));
        assert!(WireCodec::MessagePack.accepts("application/x-msgpack"));
        assert!(!WireCodec::MessagePack.accepts("application/json"));
    }

    #[test]
    fn test_msgpack_request() {
        #[derive(serde::Serialize)]
        struct Outgoing {
            id: i64,
            method: &'static str,
            params: serde_json::Value,
        }

        let bytes = rmp_serde::to_vec_named(&Outgoing {
            id: 5,
            method: "HuntDaemon.Ping",
            params: serde_json::json!({"Token": 7, "Seq": 42}),
        })
        .unwrap();

        let req = WireCodec::MessagePack.decode_request(&bytes).unwrap();
        assert_eq!(req.id, RequestId::Number(5));
        assert_eq!(req.method, "HuntDaemon.Ping");
        assert_eq!(req.param().unwrap()["Seq"], 42);
    }

    #[test]
    fn test_msgpack_response_is_map() {
        let req = WireCodec::Json
            .decode_request(br#"{"method":"Ping","id":1}"#)
            .unwrap();
        let bytes = WireCodec::MessagePack
            .encode_response(&Response::success(&req, serde_json::json!({"Token": 1})))
            .unwrap();

        // fixmap with two entries: id, result
        assert_eq!(bytes[0], 0x82);

        let decoded: serde_json::Value = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(decoded["result"]["Token"], 1);
    }

    #[test]
    fn test_json_garbage() {
        assert!(matches!(
            WireCodec::Json.decode_request(b"{not json"),
            Err(CodecError::Json(_))
        ));
    }
}
