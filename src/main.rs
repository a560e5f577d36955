use std::sync::Arc;

use ticketdesk::{
    config::AppConfig,
    desk::TicketDesk,
    http::{self, AppState},
    query_cache::QueryCache,
    remote::{HttpRemoteApi, OfflineRemoteApi, RemoteApi},
    stats,
    store::{InMemoryRecordStore, LocalStore, RecordStore, SqliteRecordStore},
};
use tokio::net::TcpListener;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;

    let remote = build_remote(&config)?;
    let local = LocalStore::new(build_record_store(&config).await?);

    // Cached counters may be stale from a previous session.
    stats::recompute_user_stats(&local).await;

    let desk = Arc::new(TicketDesk::new(
        remote,
        local,
        QueryCache::new(config.query_cache_ttl),
    ));

    let app = http::router(AppState { desk });
    let listener = TcpListener::bind(config.http_bind).await?;
    info!("Ticket desk HTTP API listening on {}", config.http_bind);

    axum::serve(listener, app).await?;
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .compact()
        .init();
}

fn build_remote(config: &AppConfig) -> anyhow::Result<Arc<dyn RemoteApi>> {
    if config.offline_mode {
        warn!("OFFLINE_MODE is set; serving from the local cache only");
        Ok(Arc::new(OfflineRemoteApi))
    } else {
        info!(api_url = %config.api_url, "using remote ticket API");
        Ok(Arc::new(HttpRemoteApi::new(
            config.api_url.clone(),
            config.remote_timeout,
        )?))
    }
}

async fn build_record_store(config: &AppConfig) -> anyhow::Result<Arc<dyn RecordStore>> {
    if let Some(database_url) = &config.database_url {
        let store = SqliteRecordStore::connect(database_url).await?;
        info!("Connected to SQLite record store");
        Ok(Arc::new(store))
    } else {
        warn!("DATABASE_URL not set; local records will not survive a restart");
        Ok(Arc::new(InMemoryRecordStore::default()))
    }
}
