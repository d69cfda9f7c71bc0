use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use homestead::config::AppConfig;
use homestead::core::error::set_detail_exposure;
use homestead::geocode::{GeocodeProvider, GeocodingResolver, GoogleGeocoder, NominatimGeocoder};
use homestead::ingest::IngestionOrchestrator;
use homestead::media::{MediaUploader, S3ObjectStore};
use homestead::server::{build_router, AppState};
use homestead::storage::PgPropertyStore;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load()?;
    set_detail_exposure(!config.is_production());

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let store = Arc::new(PgPropertyStore::new(pool, config.radius_meters()));

    let object_store = Arc::new(
        S3ObjectStore::from_env(config.storage.bucket.clone(), config.storage.region.clone())
            .await,
    );
    let uploader = MediaUploader::new(
        object_store,
        config.media.max_concurrent_uploads,
        config.media.retry_attempts,
    );

    let http = reqwest::Client::new();
    let providers: Vec<Arc<dyn GeocodeProvider>> = vec![
        Arc::new(GoogleGeocoder::new(
            http.clone(),
            config.geocoding.google_api_key.clone(),
        )),
        Arc::new(NominatimGeocoder::new(
            http,
            config.geocoding.nominatim_user_agent.clone(),
        )),
    ];
    let resolver = Arc::new(GeocodingResolver::new(
        providers,
        Duration::from_millis(config.geocoding.timeout_ms),
    ));

    let orchestrator = IngestionOrchestrator::new(store.clone(), uploader, resolver);
    let app = build_router(AppState {
        store,
        orchestrator,
    });

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "homestead listening");
    axum::serve(listener, app).await?;

    Ok(())
}
