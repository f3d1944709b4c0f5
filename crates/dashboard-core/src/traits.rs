use crate::{CacheEntry, DataKind, StoreError, UpstreamError};
use async_trait::async_trait;

/// Keyed cache storage. One entry per (kind, symbol); `put` overwrites
/// atomically per key.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, kind: DataKind, symbol: &str) -> Result<Option<CacheEntry>, StoreError>;
    async fn put(&self, kind: DataKind, entry: &CacheEntry) -> Result<(), StoreError>;
}

/// Upstream market-data provider. Implementations own per-attempt
/// timeouts, retries for transient failures, and required-field
/// validation of the raw response.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Raw company overview for a symbol.
    async fn fetch_overview(&self, symbol: &str) -> Result<serde_json::Value, UpstreamError>;

    /// Raw income statement and balance sheet for a symbol, as one unit:
    /// either both statements are present in the returned value or the
    /// whole call fails.
    async fn fetch_financials(&self, symbol: &str) -> Result<serde_json::Value, UpstreamError>;
}
