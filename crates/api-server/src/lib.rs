//! HTTP surface of the dashboard: routing, status-code mapping, JSON
//! error envelopes, CORS, and startup wiring.

use alphavantage_client::AlphaVantageClient;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use dashboard_core::{CacheStore, LookupError, MarketDataSource};
use lookup_cache::{CachePolicy, CachedLookupService};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use symbol_store::DashboardDb;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod lookup_routes;
pub mod symbol_routes;

pub use config::ServerConfig;

#[derive(Clone)]
pub struct AppState {
    pub lookup: Arc<CachedLookupService>,
    pub db: DashboardDb,
    pub market_data: Arc<AlphaVantageClient>,
}

/// Route-level error. Lookup errors carry their own HTTP status; anything
/// else is a 500.
pub enum AppError {
    Lookup(LookupError),
    Internal(anyhow::Error),
}

impl From<LookupError> for AppError {
    fn from(e: LookupError) -> Self {
        AppError::Lookup(e)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Internal(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail, message) = match self {
            AppError::Lookup(LookupError::InvalidInput(m)) => {
                (StatusCode::BAD_REQUEST, "InvalidInput", m)
            }
            AppError::Lookup(LookupError::NotFound(m)) => (StatusCode::NOT_FOUND, "NotFound", m),
            AppError::Lookup(LookupError::UpstreamUnavailable(m)) => {
                (StatusCode::BAD_GATEWAY, "UpstreamUnavailable", m)
            }
            AppError::Internal(e) => {
                tracing::error!("internal error: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "InternalError",
                    "internal server error".to_string(),
                )
            }
        };

        // { error, error_detail } is the body shape the frontend parses.
        (status, Json(json!({ "error": message, "error_detail": detail }))).into_response()
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(lookup_routes::lookup_routes())
        .merge(symbol_routes::symbol_routes())
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn run_server() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api_server=info,lookup_cache=info,alphavantage_client=warn".into()),
        )
        .init();

    let config = ServerConfig::from_env()?;

    let db = DashboardDb::new(&config.database_url)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open {}: {}", config.database_url, e))?;
    let market_data = Arc::new(AlphaVantageClient::new(config.alphavantage_api_key.clone()));

    let store: Arc<dyn CacheStore> = Arc::new(db.clone());
    let upstream: Arc<dyn MarketDataSource> = market_data.clone();
    let lookup = CachedLookupService::new(store, upstream).with_policy(CachePolicy {
        overview_ttl: Duration::from_secs(config.overview_ttl_secs),
        financials_ttl: Duration::from_secs(config.financials_ttl_secs),
    });

    let state = AppState {
        lookup: Arc::new(lookup),
        db,
        market_data,
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, build_router(state)).await?;

    Ok(())
}
