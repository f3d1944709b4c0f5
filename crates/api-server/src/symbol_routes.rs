//! Symbol search and per-symbol metrics endpoints.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use dashboard_core::{LookupError, SymbolInfo};
use serde::Deserialize;
use symbol_store::SymbolMetrics;

use crate::{AppError, AppState};

const SEARCH_LIMIT: u32 = 25;

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: String,
}

pub fn symbol_routes() -> Router<AppState> {
    Router::new()
        .route("/symbols", get(search_symbols))
        .route("/metrics/:symbol", get(get_metrics))
}

async fn search_symbols(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<SymbolInfo>>, AppError> {
    let q = query.query.trim();

    let local = state
        .db
        .search_symbols(q, SEARCH_LIMIT)
        .await
        .map_err(|e| anyhow::anyhow!("Symbol search failed: {}", e))?;

    if !local.is_empty() || q.is_empty() {
        return Ok(Json(local));
    }

    // Nothing locally tracked for this query; ask the provider. A search
    // miss is an empty list, not an error.
    let remote = match state.market_data.search_symbols(q).await {
        Ok(remote) => remote,
        Err(e) => {
            tracing::warn!("upstream symbol search failed for {:?}: {}", q, e);
            Vec::new()
        }
    };
    Ok(Json(remote))
}

async fn get_metrics(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<SymbolMetrics>, AppError> {
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(LookupError::InvalidInput("symbol is required".to_string()).into());
    }

    let metrics = state
        .db
        .get_metrics(&symbol)
        .await
        .map_err(|e| anyhow::anyhow!("Metrics lookup failed: {}", e))?
        .ok_or_else(|| LookupError::NotFound(format!("No metrics for {}", symbol)))?;

    Ok(Json(metrics))
}
