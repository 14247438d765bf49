// ABOUTME: Main entry point for the opensit meditation journal and social stream service
// ABOUTME: Loads configuration, opens storage, wires the social graph, and serves the JSON API

use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod entities;
mod error;
mod migration;
mod notify;
mod session;
mod social;
mod storage;
mod stream;
mod types;

#[cfg(test)]
mod storage_tests;
#[cfg(test)]
mod test_support;

use config::AppConfig;
use notify::{NotificationSink, StoredNotifications};
use session::SessionStore;
use social::SocialGraph;
use storage::Storage;
use stream::ActivityStream;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub storage: Arc<Storage>,
    pub social: SocialGraph,
    pub stream: ActivityStream,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(config: AppConfig, storage: Arc<Storage>) -> Self {
        let notifications: Arc<dyn NotificationSink> =
            Arc::new(StoredNotifications::new(storage.clone()));

        Self {
            config: Arc::new(config),
            social: SocialGraph::new(storage.clone(), notifications),
            stream: ActivityStream::new(storage.clone()),
            sessions: SessionStore::new(),
            storage,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("opensit=info,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = AppConfig::from_env();
    let storage = Arc::new(Storage::new(&config.database_url).await?);
    let address = config.bind_address();

    let app = api::router(AppState::new(config, storage))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = TcpListener::bind(&address).await?;
    tracing::info!("opensit listening on http://{}", address);

    axum::serve(listener, app).await?;
    Ok(())
}
