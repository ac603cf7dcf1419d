use std::sync::Arc;

use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

use bill_tracker_backend::config::Config;
use bill_tracker_backend::rest::{self, AppState};
use bill_tracker_backend::storage::{
    AssetStore, CacheStore, JsonFileStore, RecordStore, RemoteStore, SqliteKeyValue, SyncService,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    info!("data directory: {:?}", config.data_dir);

    let files = JsonFileStore::new(&config.data_dir);
    files.bootstrap()?;

    let kv = SqliteKeyValue::new(&config.cache_url).await?;
    let cache = CacheStore::new(Arc::new(kv));

    // Remote service when configured, local JSON documents otherwise; the
    // cache is always the fallback.
    let primary: Arc<dyn RecordStore> = match &config.remote_url {
        Some(url) => {
            info!("authoritative backend: remote service at {}", url);
            Arc::new(RemoteStore::new(url, &config.remote_key)?)
        }
        None => {
            info!("authoritative backend: local JSON documents");
            Arc::new(files.clone())
        }
    };

    let store = Arc::new(SyncService::new(primary, cache));
    store.ensure_default_users().await?;

    let assets = AssetStore::new(files.assets_dir());
    let state = AppState::new(store, files, assets);

    // CORS setup to allow the frontend to make requests
    let cors = CorsLayer::new()
        .allow_origin("http://localhost:8080".parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    let app = rest::router(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
