use std::sync::Arc;

use adapters::ai::{ANTHROPIC_BASE_URL, AnthropicClient, OPENAI_BASE_URL, OpenAiClient};
use adapters::calendar::GoogleCalendarClient;
use adapters::github::{GITHUB_BASE_URL, GitHubNoteStore};
use adapters::scrape::HttpPageFetcher;
use config::AppConfig;
use daybook_server::{AppState, create_router};
use dispatch::{Publisher, Receiver};
use dn_core::traits::CalendarClient;
use storage::RedisStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Starting daybook server");

    let config = AppConfig::from_env()?;
    info!(queue = %config.dispatch.queue, "Configuration loaded");

    let receiver = Arc::new(Receiver::new(
        &config.dispatch.current_signing_key,
        &config.dispatch.next_signing_key,
    ));
    let publisher = Arc::new(Publisher::new(
        &config.dispatch.base_url,
        &config.dispatch.token,
        &config.site_url,
    )?);
    let store = Arc::new(RedisStore::new(&config.digest.redis_url).await?);
    let notes = Arc::new(GitHubNoteStore::new(
        &config.notes.owner,
        &config.notes.repo,
        &config.notes.token,
        GITHUB_BASE_URL,
    )?);
    let model = Arc::new(AnthropicClient::new(
        &config.models.anthropic_api_key,
        &config.models.summary_model,
        ANTHROPIC_BASE_URL,
    )?);
    let classifier = Arc::new(OpenAiClient::new(
        &config.models.openai_api_key,
        &config.models.classifier_model,
        OPENAI_BASE_URL,
    )?);
    let fetcher = Arc::new(HttpPageFetcher::new()?);
    let calendar: Option<Arc<dyn CalendarClient>> = match &config.calendar {
        Some(calendar_config) => Some(Arc::new(GoogleCalendarClient::new(
            calendar_config.clone(),
        )?)),
        None => None,
    };

    let bind = format!("{}:{}", config.bind_address, config.port);
    let state = AppState {
        config: Arc::new(config),
        receiver,
        publisher,
        store,
        notes,
        model,
        classifier,
        fetcher,
        calendar,
    };

    let app = create_router(state);
    info!(addr = %bind, "Listening");
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
