pub mod whapi;

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::FileConfig;
use crate::error::{ConfigError, TransportError};

/// Body of a `messages` webhook call.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
}

/// A message delivered by the webhook, reduced to what the bot reads.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "WireMessage")]
pub struct InboundMessage {
    pub from_me: bool,
    pub chat_id: String,
    pub text_body: String,
}

impl InboundMessage {
    pub fn new(from_me: bool, chat_id: impl Into<String>, text_body: impl Into<String>) -> Self {
        Self {
            from_me,
            chat_id: chat_id.into(),
            text_body: text_body.into(),
        }
    }
}

#[derive(Deserialize)]
struct WireMessage {
    #[serde(default)]
    from_me: Option<bool>,
    chat_id: String,
    #[serde(default)]
    text: Option<WireText>,
}

#[derive(Deserialize)]
struct WireText {
    #[serde(default)]
    body: Option<String>,
}

impl From<WireMessage> for InboundMessage {
    fn from(wire: WireMessage) -> Self {
        Self {
            from_me: wire.from_me.unwrap_or(false),
            chat_id: wire.chat_id,
            text_body: wire.text.and_then(|t| t.body).unwrap_or_default(),
        }
    }
}

/// A text reply to one chat.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundReply {
    pub to: String,
    pub body: String,
}

/// A text alert for the operator chat.
#[derive(Debug, Clone, PartialEq)]
pub struct AdminNotification {
    pub to: String,
    pub body: String,
}

impl From<AdminNotification> for OutboundReply {
    fn from(n: AdminNotification) -> Self {
        Self {
            to: n.to,
            body: n.body,
        }
    }
}

/// A file sent through a multipart media endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaMessage {
    pub to: String,
    pub caption: Option<String>,
    pub attachment: MediaAttachment,
}

impl MediaMessage {
    /// Look up `name` in the configured file catalogue.
    pub fn from_catalogue(
        files: &BTreeMap<String, FileConfig>,
        name: &str,
        to: impl Into<String>,
        caption: Option<String>,
    ) -> Result<Self, ConfigError> {
        let file = files.get(name).ok_or_else(|| ConfigError::InvalidValue {
            key: "files".to_string(),
            message: format!(
                "unknown file {:?} (available: {})",
                name,
                files.keys().cloned().collect::<Vec<_>>().join(", ")
            ),
        })?;
        Ok(Self {
            to: to.into(),
            caption,
            attachment: MediaAttachment {
                path: file.path.clone(),
                mime: file.mime.clone(),
                endpoint: file.endpoint.clone(),
            },
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaAttachment {
    pub path: PathBuf,
    pub mime: String,
    /// API endpoint relative to the base URL, e.g. `messages/document`.
    pub endpoint: String,
}

/// Outbound side of the messaging platform.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_text(&self, reply: &OutboundReply) -> Result<serde_json::Value, TransportError>;

    async fn send_media(&self, media: &MediaMessage) -> Result<serde_json::Value, TransportError>;
}
