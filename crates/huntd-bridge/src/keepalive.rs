//! Liveness announcements on a message bus
//!
//! Each tick publishes this instance's hostname, instance id and external
//! URL so registries can refresh their instance-to-address mapping.

use async_trait::async_trait;
use base64::prelude::*;
use http_body_util::{BodyExt, Full};
use hunt_core::{BridgeError, KeepaliveMessage, Result};
use hyper::body::Bytes;
use hyper::{Method, Request, StatusCode, Uri};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Placeholder in the game URL template replaced by the instance id
pub const INSTANCE_PLACEHOLDER: &str = "{{instance}}";

/// A message as handed to the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub attributes: HashMap<String, String>,
    pub data: Vec<u8>,
}

impl From<&KeepaliveMessage> for BusMessage {
    fn from(msg: &KeepaliveMessage) -> Self {
        Self {
            attributes: msg.attributes(),
            data: msg.body(),
        }
    }
}

/// Topic creation errors
#[derive(Debug, thiserror::Error)]
pub enum TopicError {
    #[error("topic {0} already exists")]
    AlreadyExists(String),
    #[error("create topic {topic}: {reason}")]
    Failed { topic: String, reason: String },
}

/// Publish side of a message bus
#[async_trait]
pub trait MessageBus: Send + Sync {
    async fn create_topic(&self, topic: &str) -> std::result::Result<(), TopicError>;

    /// Publish one message; returns the bus-assigned message id
    async fn publish(&self, topic: &str, msg: BusMessage) -> Result<String>;
}

/// Substitute the instance id into a game URL template
pub fn expand_game_url(template: &str, instance: &str) -> Result<String> {
    let url = template.replace(INSTANCE_PLACEHOLDER, instance);
    url.parse::<Uri>()
        .map_err(|e| BridgeError::Config(format!("bad game url {:?}: {}", url, e)))?;
    Ok(url)
}

/// Periodic keepalive publisher
pub struct KeepalivePublisher {
    bus: Arc<dyn MessageBus>,
    topic: String,
    hostname: String,
    instance: String,
    url: String,
}

impl std::fmt::Debug for KeepalivePublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeepalivePublisher")
            .field("topic", &self.topic)
            .field("hostname", &self.hostname)
            .field("instance", &self.instance)
            .field("url", &self.url)
            .finish()
    }
}

impl KeepalivePublisher {
    /// Create the topic, reusing it if it already exists
    pub async fn new(
        bus: Arc<dyn MessageBus>,
        topic: impl Into<String>,
        hostname: impl Into<String>,
        instance: impl Into<String>,
        url: impl Into<String>,
    ) -> Result<Self> {
        let topic = topic.into();

        match bus.create_topic(&topic).await {
            Ok(()) => info!("Created keepalive topic {}", topic),
            Err(TopicError::AlreadyExists(_)) => info!("Reusing keepalive topic {}", topic),
            Err(e) => return Err(BridgeError::Keepalive(e.to_string())),
        }

        Ok(Self {
            bus,
            topic,
            hostname: hostname.into(),
            instance: instance.into(),
            url: url.into(),
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn message(&self, seq: u64) -> KeepaliveMessage {
        KeepaliveMessage {
            hostname: self.hostname.clone(),
            instance: self.instance.clone(),
            seq,
            url: self.url.clone(),
        }
    }

    pub async fn publish(&self, seq: u64) -> Result<()> {
        let msg = self.message(seq);
        let id = self.bus.publish(&self.topic, BusMessage::from(&msg)).await?;
        debug!("Published seqid {} msgid {}", seq, id);
        Ok(())
    }
}

#[derive(Serialize)]
struct PublishBody<'a> {
    messages: [PubsubMessage<'a>; 1],
}

#[derive(Serialize)]
struct PubsubMessage<'a> {
    attributes: &'a HashMap<String, String>,
    data: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishResponse {
    #[serde(default)]
    message_ids: Vec<String>,
}

/// Pub/Sub REST API client over plain HTTP
///
/// Suitable for the Pub/Sub emulator or an authenticating sidecar proxy.
pub struct PubSubRestBus {
    endpoint: String,
    project: String,
    timeout: Duration,
    client: Client<HttpConnector, Full<Bytes>>,
}

impl PubSubRestBus {
    pub fn new(endpoint: impl Into<String>, project: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            project: project.into(),
            timeout,
            client: Client::builder(TokioExecutor::new()).build_http(),
        }
    }

    fn topic_uri(&self, topic: &str) -> String {
        format!(
            "{}/v1/projects/{}/topics/{}",
            self.endpoint, self.project, topic
        )
    }

    async fn send(&self, method: Method, uri: &str, body: Vec<u8>) -> Result<(StatusCode, Bytes)> {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| BridgeError::Keepalive(e.to_string()))?;

        // The deadline covers the body as well as the headers
        let exchange = async {
            let resp = self
                .client
                .request(req)
                .await
                .map_err(|e| BridgeError::Keepalive(format!("{}: {}", uri, e)))?;

            let (parts, body) = resp.into_parts();
            let bytes = body
                .collect()
                .await
                .map_err(|e| BridgeError::Keepalive(format!("{}: {}", uri, e)))?
                .to_bytes();
            Ok::<_, BridgeError>((parts.status, bytes))
        };

        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| BridgeError::Keepalive(format!("{}: request timeout", uri)))?
    }
}

#[async_trait]
impl MessageBus for PubSubRestBus {
    async fn create_topic(&self, topic: &str) -> std::result::Result<(), TopicError> {
        let failed = |reason: String| TopicError::Failed {
            topic: topic.to_string(),
            reason,
        };

        let (status, body) = self
            .send(Method::PUT, &self.topic_uri(topic), b"{}".to_vec())
            .await
            .map_err(|e| failed(e.to_string()))?;

        match status {
            s if s.is_success() => Ok(()),
            StatusCode::CONFLICT => Err(TopicError::AlreadyExists(topic.to_string())),
            s => Err(failed(format!("HTTP {}: {}", s, String::from_utf8_lossy(&body)))),
        }
    }

    async fn publish(&self, topic: &str, msg: BusMessage) -> Result<String> {
        let body = serde_json::to_vec(&PublishBody {
            messages: [PubsubMessage {
                attributes: &msg.attributes,
                data: BASE64_STANDARD.encode(&msg.data),
            }],
        })?;

        let uri = format!("{}:publish", self.topic_uri(topic));
        let (status, bytes) = self.send(Method::POST, &uri, body).await?;
        if !status.is_success() {
            return Err(BridgeError::Keepalive(format!(
                "HTTP {}: {}",
                status,
                String::from_utf8_lossy(&bytes)
            )));
        }

        let resp: PublishResponse = serde_json::from_slice(&bytes)?;
        Ok(resp.message_ids.into_iter().next().unwrap_or_default())
    }
}

/// Bus kept in memory
#[derive(Default)]
pub struct InMemoryBus {
    topics: Mutex<HashMap<String, Vec<BusMessage>>>,
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages published to `topic` so far
    pub async fn messages(&self, topic: &str) -> Vec<BusMessage> {
        self.topics
            .lock()
            .await
            .get(topic)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl MessageBus for InMemoryBus {
    async fn create_topic(&self, topic: &str) -> std::result::Result<(), TopicError> {
        let mut topics = self.topics.lock().await;
        if topics.contains_key(topic) {
            return Err(TopicError::AlreadyExists(topic.to_string()));
        }
        topics.insert(topic.to_string(), Vec::new());
        Ok(())
    }

    async fn publish(&self, topic: &str, msg: BusMessage) -> Result<String> {
        let mut topics = self.topics.lock().await;
        let queue = topics
            .get_mut(topic)
            .ok_or_else(|| BridgeError::Keepalive(format!("no such topic {}", topic)))?;
        queue.push(msg);
        Ok(queue.len().to_string())
    }
}
