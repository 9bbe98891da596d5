mod config;
mod dedup;
mod keepalive;
mod matcher;
mod notifier;
mod responder;
mod retry;
mod twitter;
mod watcher;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use teloxide::Bot;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::matcher::KeywordMatcher;
use crate::notifier::{chat_recipient, PhotoSource, TelegramNotifier};
use crate::responder::ResponderState;
use crate::twitter::TwitterClient;
use crate::watcher::Watcher;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tweetwatch=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  Tracked accounts: {:?}", config.twitter.usernames);
    info!("  Keywords: {:?}", config.watch.keywords);
    info!("  Poll interval: {}s", config.watch.poll_interval_secs);

    let matcher = KeywordMatcher::new(&config.watch.keywords)?;
    let chat = chat_recipient(&config.telegram.chat_id)?;
    let welcome_photo = config
        .telegram
        .welcome_photo
        .as_deref()
        .map(PhotoSource::parse)
        .transpose()?;

    let bot = Bot::new(config.telegram.bot_token.clone());
    let notifier = TelegramNotifier::new(bot.clone(), chat);
    let source = TwitterClient::new(config.twitter.bearer_token.clone());

    // Keep-alive endpoint, so the hosting platform doesn't idle us out
    let port = config.keepalive.port;
    tokio::spawn(async move {
        if let Err(e) = keepalive::serve(port).await {
            error!("Keep-alive server exited: {:#}", e);
        }
    });

    // Command responder (long-poll over inbound messages)
    let responder_state = Arc::new(ResponderState { welcome_photo });
    let responder_bot = bot.clone();
    tokio::spawn(async move {
        if let Err(e) = responder::run(responder_bot, responder_state).await {
            error!("Command responder exited: {:#}", e);
        }
    });

    // Resolve handles once; failures are excluded for the rest of the run
    let accounts = watcher::resolve_accounts(&source, &config.twitter.usernames).await;
    if accounts.is_empty() {
        warn!("No accounts resolved; polling loop will be idle");
    }

    info!("Bot started successfully.");
    let watcher = Watcher::new(
        source,
        notifier,
        matcher,
        accounts,
        Duration::from_secs(config.watch.poll_interval_secs),
    );
    watcher.run().await
}
