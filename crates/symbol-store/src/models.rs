use serde::{Deserialize, Serialize};

/// One row of the metrics table, as served by `/metrics/:symbol`.
/// Populated out-of-band by the metrics pipeline; this crate only reads.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SymbolMetrics {
    pub symbol: String,
    pub price: Option<f64>,
    pub change: Option<f64>,
    pub pe_ratio: Option<f64>,
    pub pb_ratio: Option<f64>,
    pub debt_equity: Option<f64>,
    pub current_ratio: Option<f64>,
    pub market_cap: Option<f64>,
    pub graham_ratio: Option<f64>,
    pub aisc: Option<f64>,
    pub production_oz: Option<i64>,
    pub resources_oz: Option<i64>,
    pub shares_outstanding: Option<i64>,
    pub last_updated: Option<String>,
}
