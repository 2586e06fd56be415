//! Whapi.Cloud REST client: text and media sends plus webhook registration.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::{MediaMessage, OutboundReply, Transport};
use crate::config::WhapiConfig;
use crate::error::TransportError;

const TEXT_ENDPOINT: &str = "messages/text";
const SETTINGS_ENDPOINT: &str = "settings";

enum RequestBody {
    Json(Value),
    Multipart(Form),
}

pub struct WhapiClient {
    client: reqwest::Client,
    api_url: String,
    token: String,
}

impl WhapiClient {
    pub fn new(config: &WhapiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.api_url, endpoint.trim_start_matches('/'))
    }

    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: RequestBody,
    ) -> Result<Value, TransportError> {
        let builder = self
            .client
            .request(method, self.url(endpoint))
            .bearer_auth(&self.token);

        let builder = match body {
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(form) => builder.multipart(form),
        };

        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let value = serde_json::from_str(&text).unwrap_or(Value::String(text));
        debug!("Whapi response from {}: {}", endpoint, value);
        Ok(value)
    }

    /// Subscribe `bot_url` to the `messages` event.
    pub async fn set_hook(&self, bot_url: &str) -> Result<Value, TransportError> {
        let settings = json!({
            "webhooks": [
                {
                    "url": bot_url,
                    "events": [
                        { "type": "messages", "method": "post" }
                    ],
                    "mode": "method"
                }
            ]
        });
        let response = self
            .request(Method::PATCH, SETTINGS_ENDPOINT, RequestBody::Json(settings))
            .await?;
        info!("Webhook registered: {}", bot_url);
        Ok(response)
    }
}

#[async_trait]
impl Transport for WhapiClient {
    async fn send_text(&self, reply: &OutboundReply) -> Result<Value, TransportError> {
        let payload = json!({ "to": reply.to, "body": reply.body });
        self.request(Method::POST, TEXT_ENDPOINT, RequestBody::Json(payload))
            .await
    }

    async fn send_media(&self, media: &MediaMessage) -> Result<Value, TransportError> {
        let path = &media.attachment.path;
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| TransportError::File {
                path: path.clone(),
                source,
            })?;

        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file")
            .to_string();
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(&media.attachment.mime)?;

        let mut form = Form::new().text("to", media.to.clone());
        if let Some(caption) = &media.caption {
            form = form.text("caption", caption.clone());
        }
        let form = form.part("media", part);

        self.request(
            Method::POST,
            &media.attachment.endpoint,
            RequestBody::Multipart(form),
        )
        .await
    }
}
