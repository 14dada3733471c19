use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use config::AppConfig;
use dispatch::{Publisher, Receiver};
use dn_core::traits::{
    CalendarClient, ChatModel, NoteStore, PageFetcher, PartialResultStore, UrlClassifier,
};
use dn_core::types::routes;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::routes as handlers;

/// Explicitly-owned client handles, passed into every handler. Tests swap
/// any collaborator for a double.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub receiver: Arc<Receiver>,
    pub publisher: Arc<Publisher>,
    pub store: Arc<dyn PartialResultStore>,
    pub notes: Arc<dyn NoteStore>,
    pub model: Arc<dyn ChatModel>,
    pub classifier: Arc<dyn UrlClassifier>,
    pub fetcher: Arc<dyn PageFetcher>,
    pub calendar: Option<Arc<dyn CalendarClient>>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(routes::NOTE_SUMMARIZE, post(handlers::notes::summarize_note))
        .route(
            routes::DIFF_SUMMARIZE,
            post(handlers::notes::summarize_diff),
        )
        .route(routes::URL_SCRAPE, post(handlers::urls::scrape_url))
        .route(
            routes::DAILY_SUMMARIZE,
            get(handlers::daily::trigger_daily).post(handlers::daily::aggregate_daily),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
