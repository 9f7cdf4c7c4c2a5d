//! Startup configuration

use crate::keepalive::expand_game_url;
use crate::protocol::CompatFlags;
use hunt_core::{BridgeError, Result};
use hunt_rpc::WireCodec;
use std::str::FromStr;
use std::time::Duration;
use uuid::Uuid;

/// Well-known port compiled into the daemon (`'h' << 8 | 't'`)
pub const DEFAULT_HUNTD_PORT: u16 = 26740;

/// Keepalive publishing settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeepaliveConfig {
    pub topic: String,
    /// External URL template; `{{instance}}` is replaced by `instance`
    pub game_url: String,
    pub instance: String,
    pub hostname: String,
    /// Pub/Sub REST base URL
    pub pubsub_endpoint: String,
    pub pubsub_project: String,
}

impl KeepaliveConfig {
    /// The announced URL with the instance substituted
    pub fn url(&self) -> Result<String> {
        expand_game_url(&self.game_url, &self.instance)
    }
}

/// Bridge configuration, read once at startup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// RPC listen host
    pub listen_host: String,
    /// RPC listen port
    pub listen_port: u16,
    /// Daemon well-known host
    pub huntd_host: String,
    /// Daemon well-known UDP port
    pub huntd_port: u16,
    /// Active RPC codec
    pub rpc_type: WireCodec,
    /// Daemon protocol quirks
    pub compat: CompatFlags,
    /// Deadline for every daemon I/O operation
    pub timeout: Duration,
    /// Publishing is disabled when `None`
    pub keepalive: Option<KeepaliveConfig>,
    /// Tick interval, also used when publishing is disabled
    pub keepalive_interval: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            listen_host: "0.0.0.0".to_string(),
            listen_port: 8080,
            huntd_host: "localhost".to_string(),
            huntd_port: DEFAULT_HUNTD_PORT,
            rpc_type: WireCodec::Json,
            compat: CompatFlags::NETBSD,
            timeout: Duration::from_millis(1000),
            keepalive: None,
            keepalive_interval: Duration::from_millis(10_000),
        }
    }
}

fn parse<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| BridgeError::Config(format!("{}={:?}: {}", key, value, e)))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(BridgeError::Config(format!(
            "{}={:?}: expected a boolean",
            key, value
        ))),
    }
}

impl BridgeConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(v) = get("SERVER_HOST") {
            config.listen_host = v;
        }
        if let Some(v) = get("SERVER_PORT") {
            config.listen_port = parse("SERVER_PORT", &v)?;
        }
        if let Some(v) = get("HUNTD_HOST") {
            config.huntd_host = v;
        }
        if let Some(v) = get("HUNTD_PORT") {
            config.huntd_port = parse("HUNTD_PORT", &v)?;
        }
        if let Some(v) = get("SERVER_RPC_TYPE") {
            config.rpc_type = v
                .parse()
                .map_err(|e| BridgeError::Config(format!("SERVER_RPC_TYPE: {}", e)))?;
        }
        if let Some(v) = get("HUNTD_TIMEOUT_MS") {
            config.timeout = Duration::from_millis(parse("HUNTD_TIMEOUT_MS", &v)?);
            if config.timeout.is_zero() {
                return Err(BridgeError::Config("HUNTD_TIMEOUT_MS must be positive".into()));
            }
        }

        if let Some(v) = get("HUNTD_COMPAT") {
            config.compat = CompatFlags::preset(&v).ok_or_else(|| {
                BridgeError::Config(format!("HUNTD_COMPAT={:?}: unknown preset", v))
            })?;
        }
        if let Some(v) = get("HUNTD_LEGACY_WIDE_MODE_FIELD") {
            config.compat.legacy_wide_mode_field = parse_bool("HUNTD_LEGACY_WIDE_MODE_FIELD", &v)?;
        }
        if let Some(v) = get("HUNTD_VERSION_AFTER_JOIN") {
            config.compat.version_after_join = parse_bool("HUNTD_VERSION_AFTER_JOIN", &v)?;
        }

        if let Some(v) = get("SERVER_KEEPALIVE_INTERVAL_MS") {
            config.keepalive_interval =
                Duration::from_millis(parse("SERVER_KEEPALIVE_INTERVAL_MS", &v)?);
            if config.keepalive_interval.is_zero() {
                return Err(BridgeError::Config(
                    "SERVER_KEEPALIVE_INTERVAL_MS must be positive".into(),
                ));
            }
        }

        if let Some(topic) = get("SERVER_KEEPALIVE_TOPIC") {
            let game_url = get("SERVER_GAME_URL").ok_or_else(|| {
                BridgeError::Config("SERVER_GAME_URL required with SERVER_KEEPALIVE_TOPIC".into())
            })?;

            let keepalive = KeepaliveConfig {
                topic,
                game_url,
                instance: get("SERVER_INSTANCE").unwrap_or_else(|| Uuid::new_v4().to_string()),
                hostname: get("SERVER_HOSTNAME")
                    .or_else(|| get("HOSTNAME"))
                    .unwrap_or_else(|| "localhost".to_string()),
                pubsub_endpoint: get("PUBSUB_ENDPOINT")
                    .unwrap_or_else(|| "http://localhost:8085".to_string()),
                pubsub_project: get("PUBSUB_PROJECT").unwrap_or_else(|| "hunt".to_string()),
            };
            keepalive.url()?;
            config.keepalive = Some(keepalive);
        }

        Ok(config)
    }

    /// `host:port` for the RPC listener
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listen_host, self.listen_port)
    }
}
