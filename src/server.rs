//! HTTP surface: the Whapi webhook and a liveness probe.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use tracing::{error, info};

use crate::bot::Dispatcher;

pub fn router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/hook/messages", post(handle_messages))
        .with_state(dispatcher)
}

async fn health() -> &'static str {
    "Bot is running"
}

async fn handle_messages(
    State(dispatcher): State<Arc<Dispatcher>>,
    body: Bytes,
) -> (StatusCode, String) {
    match dispatcher.handle_webhook(&body).await {
        Ok(_) => (StatusCode::OK, "Ok".to_string()),
        Err(e) => {
            error!("❌ Error: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

pub async fn serve(addr: &str, dispatcher: Arc<Dispatcher>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Listening on http://{}", addr);

    axum::serve(listener, router(dispatcher))
        .await
        .context("Server error")?;

    Ok(())
}
