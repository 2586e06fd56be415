//! Error types for the collaborator seams.

use std::path::PathBuf;

/// Failure while talking to the Whapi messaging API.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Whapi API error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("failed to read attachment {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure while asking the completion service for an answer.
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("no API key configured")]
    MissingApiKey,

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("empty response from model")]
    EmptyResponse,
}

/// Structural failure of a whole webhook call.
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("malformed webhook payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}

/// Configuration that parsed but cannot be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}
