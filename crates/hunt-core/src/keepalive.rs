//! Keepalive message published by each bridge instance

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Attribute keys carried on the bus message
pub mod attributes {
    pub const HOSTNAME: &str = "hostname";
    pub const INSTANCE: &str = "instance";
    pub const SEQ: &str = "seq";
}

/// Liveness ping identifying a bridge instance and where to reach it
///
/// Consumers refresh a cached instance -> URL mapping from these; delivery
/// order does not matter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeepaliveMessage {
    pub hostname: String,
    pub instance: String,
    pub seq: u64,
    #[serde(rename = "URL")]
    pub url: String,
}

impl KeepaliveMessage {
    /// Bus attributes (`seq` as a decimal string)
    pub fn attributes(&self) -> HashMap<String, String> {
        HashMap::from([
            (attributes::HOSTNAME.to_string(), self.hostname.clone()),
            (attributes::INSTANCE.to_string(), self.instance.clone()),
            (attributes::SEQ.to_string(), self.seq.to_string()),
        ])
    }

    /// Message body: the external URL as raw bytes
    pub fn body(&self) -> Vec<u8> {
        self.url.as_bytes().to_vec()
    }

    /// Rebuild a message from bus attributes and body
    pub fn from_parts(attrs: &HashMap<String, String>, body: &[u8]) -> Option<Self> {
        Some(Self {
            hostname: attrs.get(attributes::HOSTNAME)?.clone(),
            instance: attrs.get(attributes::INSTANCE)?.clone(),
            seq: attrs.get(attributes::SEQ)?.parse().ok()?,
            url: String::from_utf8(body.to_vec()).ok()?,
        })
    }
}
