//! Cached lookup endpoints: company overview and financial statements.
//!
//! Both endpoints return the shaped payload directly (no envelope); the
//! field names and formatted strings are a compatibility contract with
//! the existing frontend.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use dashboard_core::DataKind;
use serde::Deserialize;
use serde_json::Value;

use crate::{AppError, AppState};

#[derive(Deserialize)]
pub struct SymbolQuery {
    #[serde(default)]
    pub symbol: String,
}

pub fn lookup_routes() -> Router<AppState> {
    Router::new()
        .route("/overview", get(get_overview))
        .route("/financials", get(get_financials))
}

async fn get_overview(
    State(state): State<AppState>,
    Query(query): Query<SymbolQuery>,
) -> Result<Json<Value>, AppError> {
    let payload = state.lookup.fetch(DataKind::Overview, &query.symbol).await?;
    Ok(Json(payload))
}

async fn get_financials(
    State(state): State<AppState>,
    Query(query): Query<SymbolQuery>,
) -> Result<Json<Value>, AppError> {
    let payload = state
        .lookup
        .fetch(DataKind::Financials, &query.symbol)
        .await?;
    Ok(Json(payload))
}
