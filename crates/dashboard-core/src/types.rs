use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A category of cached derived data. Each kind has its own TTL, its own
/// transform, and its own namespace in the cache store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    Overview,
    Financials,
}

impl DataKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataKind::Overview => "overview",
            DataKind::Financials => "financials",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One cached payload for a (kind, symbol) pair.
///
/// Overwritten wholesale on every successful refresh; never deleted by
/// the lookup service itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub symbol: String,
    pub payload: serde_json::Value,
    /// Seconds since epoch of the last successful upstream refresh.
    pub fetched_at: i64,
}

impl CacheEntry {
    pub fn new(symbol: impl Into<String>, payload: serde_json::Value, fetched_at: i64) -> Self {
        Self {
            symbol: symbol.into(),
            payload,
            fetched_at,
        }
    }

    /// An entry is fresh while its age is strictly inside the TTL window.
    pub fn is_fresh(&self, now: i64, ttl: Duration) -> bool {
        now.saturating_sub(self.fetched_at) < ttl.as_secs() as i64
    }
}

/// Shaped company overview served to the dashboard. Field names and the
/// formatted `market_cap`/`dividend_yield` strings are a compatibility
/// contract with existing consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyOverview {
    pub symbol: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub exchange: Option<String>,
    /// Abbreviated with a T/B/M suffix, e.g. "35.00B".
    pub market_cap: Option<String>,
    pub pe_ratio: Option<f64>,
    /// Percentage string, e.g. "2.15%".
    pub dividend_yield: Option<String>,
    #[serde(rename = "52_week_high")]
    pub week_high_52: Option<f64>,
    #[serde(rename = "52_week_low")]
    pub week_low_52: Option<f64>,
}

/// Shaped financial statements: most-recent-first quarterly reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialStatements {
    pub income_statement: Vec<IncomeReport>,
    pub balance_sheet: Vec<BalanceReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomeReport {
    pub fiscal_year: i32,
    pub fiscal_quarter: u32,
    pub total_revenue: Option<f64>,
    pub net_income: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceReport {
    pub fiscal_year: i32,
    pub fiscal_quarter: u32,
    pub total_assets: Option<f64>,
    pub total_liabilities: Option<f64>,
}

/// A symbol known to the dashboard, as returned by `/symbols`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub symbol: String,
    pub name: String,
    pub exchange: Option<String>,
    pub currency: Option<String>,
    pub region: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_freshness_window() {
        let entry = CacheEntry::new("AEM", json!({"name": "Agnico Eagle Mines"}), 1_000);
        let ttl = Duration::from_secs(3600);

        assert!(entry.is_fresh(1_000, ttl));
        assert!(entry.is_fresh(4_599, ttl));
        assert!(!entry.is_fresh(4_600, ttl));
        assert!(!entry.is_fresh(10_000, ttl));
    }

    #[test]
    fn test_overview_serializes_52_week_fields() {
        let overview = CompanyOverview {
            symbol: "NG".to_string(),
            name: Some("NovaGold".to_string()),
            description: None,
            sector: Some("Basic Materials".to_string()),
            industry: None,
            exchange: None,
            market_cap: Some("1.20B".to_string()),
            pe_ratio: None,
            dividend_yield: None,
            week_high_52: Some(7.5),
            week_low_52: Some(3.1),
        };

        let value = serde_json::to_value(&overview).unwrap();
        assert_eq!(value["52_week_high"], json!(7.5));
        assert_eq!(value["52_week_low"], json!(3.1));
        assert_eq!(value["market_cap"], json!("1.20B"));
    }
}
