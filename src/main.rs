use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use whapi_faq_bot::bot::{Classifier, Dispatcher};
use whapi_faq_bot::config::Config;
use whapi_faq_bot::llm::LlmClient;
use whapi_faq_bot::platform::whapi::WhapiClient;
use whapi_faq_bot::platform::{MediaMessage, Transport};
use whapi_faq_bot::server;

const DEFAULT_CONFIG: &str = "config.toml";

#[derive(Parser)]
#[command(name = "whapi-faq-bot", about = "WhatsApp FAQ bot for Whapi.Cloud")]
struct Cli {
    /// Path to the TOML config (defaults to ./config.toml if present)
    #[arg(short, long, env = "BOT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Register the webhook and serve it (default)
    Serve,
    /// Only register the webhook URL with Whapi
    RegisterHook,
    /// Send a file from the [files] catalogue to a chat
    SendFile {
        #[arg(long)]
        to: String,
        #[arg(long)]
        file: String,
        #[arg(long)]
        caption: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,whapi_faq_bot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let (config_path, required) = match cli.config {
        Some(path) => (path, true),
        None => (PathBuf::from(DEFAULT_CONFIG), false),
    };

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path, required)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Whapi API: {}", config.whapi.api_url);
    info!("  Model: {}", config.openai.model);
    info!("  FAQ entries: {}", config.commands.len());
    info!(
        "  Operator: {}",
        config.workflow.operator_chat_id.as_deref().unwrap_or("(none)")
    );

    let whapi = Arc::new(WhapiClient::new(&config.whapi));

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            register_hook(&config, &whapi).await;

            let llm = Arc::new(LlmClient::new(config.openai.clone()));
            let classifier = Classifier::from_config(&config, llm)?;
            let dispatcher = Arc::new(Dispatcher::new(classifier, whapi));

            info!("Bot is starting...");
            server::serve(&config.bind_address(), dispatcher).await?;
        }
        Command::RegisterHook => {
            let bot_url = config
                .whapi
                .bot_url
                .as_deref()
                .context("BOT_URL / whapi.bot_url is not set")?;
            whapi.set_hook(bot_url).await?;
        }
        Command::SendFile { to, file, caption } => {
            let media = MediaMessage::from_catalogue(&config.files, &file, to, caption)?;
            let response = whapi.send_media(&media).await?;
            info!("Sent {} to {}: {}", file, media.to, response);
        }
    }

    Ok(())
}

/// Subscribe the callback URL if one is configured. Failure does not stop startup.
async fn register_hook(config: &Config, whapi: &WhapiClient) {
    let Some(bot_url) = config.whapi.bot_url.as_deref() else {
        info!("No BOT_URL configured, skipping webhook registration");
        return;
    };
    if let Err(e) = whapi.set_hook(bot_url).await {
        warn!("Failed to register webhook {}: {}", bot_url, e);
    }
}
