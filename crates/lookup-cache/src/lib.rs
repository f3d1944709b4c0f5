//! Read-through cache with staleness-tolerant fallback.
//!
//! One policy for every kind of derived symbol data: serve fresh cache
//! without touching the network, refresh from upstream on miss or
//! staleness, fall back to stale cache when upstream fails, and persist
//! successful refreshes best-effort.

use chrono::Utc;
use dashboard_core::{
    CacheEntry, CacheStore, DataKind, LookupError, MarketDataSource, UpstreamError,
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub mod transform;

pub const DEFAULT_OVERVIEW_TTL: Duration = Duration::from_secs(7 * 24 * 3600);
pub const DEFAULT_FINANCIALS_TTL: Duration = Duration::from_secs(24 * 3600);

const MAX_SYMBOL_LEN: usize = 10;

/// Per-kind TTL configuration. Defaults: overview 7 days, financials
/// 24 hours.
#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
    pub overview_ttl: Duration,
    pub financials_ttl: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            overview_ttl: DEFAULT_OVERVIEW_TTL,
            financials_ttl: DEFAULT_FINANCIALS_TTL,
        }
    }
}

impl CachePolicy {
    pub fn ttl(&self, kind: DataKind) -> Duration {
        match kind {
            DataKind::Overview => self.overview_ttl,
            DataKind::Financials => self.financials_ttl,
        }
    }
}

/// Resolves a (kind, symbol) request to the freshest available payload.
///
/// Concurrent refreshes of the same key may race; the last successful
/// write wins on `fetched_at`, which staleness tolerance already accepts.
pub struct CachedLookupService {
    store: Arc<dyn CacheStore>,
    upstream: Arc<dyn MarketDataSource>,
    policy: CachePolicy,
}

impl CachedLookupService {
    pub fn new(store: Arc<dyn CacheStore>, upstream: Arc<dyn MarketDataSource>) -> Self {
        Self {
            store,
            upstream,
            policy: CachePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Fetch the payload for a (kind, symbol) pair.
    ///
    /// At most one cache read, one upstream call (internally retried for
    /// transient failures), and one cache write per invocation.
    pub async fn fetch(&self, kind: DataKind, symbol: &str) -> Result<Value, LookupError> {
        let symbol = normalize_symbol(symbol)?;
        let now = Utc::now().timestamp();

        let cached = match self.store.get(kind, &symbol).await {
            Ok(cached) => cached,
            Err(e) => {
                // A broken store degrades to a cache miss, never a failed
                // request.
                tracing::warn!(%kind, %symbol, "cache read failed, treating as miss: {}", e);
                None
            }
        };

        if let Some(entry) = &cached {
            if entry.is_fresh(now, self.policy.ttl(kind)) {
                tracing::debug!(%kind, %symbol, age_secs = now - entry.fetched_at, "cache hit");
                return Ok(entry.payload.clone());
            }
        }

        let refreshed = match kind {
            DataKind::Overview => self.upstream.fetch_overview(&symbol).await,
            DataKind::Financials => self.upstream.fetch_financials(&symbol).await,
        };

        match refreshed {
            Ok(raw) => {
                let payload = shape(kind, &symbol, &raw);
                let entry = CacheEntry::new(symbol.clone(), payload.clone(), now);
                if let Err(e) = self.store.put(kind, &entry).await {
                    // The payload is already in hand; a failed write only
                    // costs the next request a refresh.
                    tracing::warn!(%kind, %symbol, "cache write failed: {}", e);
                }
                tracing::info!(%kind, %symbol, "refreshed from upstream");
                Ok(payload)
            }
            Err(e) => {
                if let Some(entry) = cached {
                    tracing::warn!(
                        %kind, %symbol,
                        age_secs = now - entry.fetched_at,
                        "upstream failed, serving stale cache: {}", e
                    );
                    return Ok(entry.payload);
                }
                Err(match e {
                    UpstreamError::UnknownSymbol(detail) => LookupError::NotFound(detail),
                    UpstreamError::Unavailable(detail) => LookupError::UpstreamUnavailable(detail),
                })
            }
        }
    }
}

fn shape(kind: DataKind, symbol: &str, raw: &Value) -> Value {
    let shaped = match kind {
        DataKind::Overview => serde_json::to_value(transform::shape_overview(symbol, raw)),
        DataKind::Financials => serde_json::to_value(transform::shape_financials(raw)),
    };
    // Plain structs of strings and numbers; serialization cannot fail.
    shaped.unwrap_or_default()
}

/// Uppercase, trim, and validate a requested symbol. Rejections never
/// reach the cache or upstream.
fn normalize_symbol(raw: &str) -> Result<String, LookupError> {
    let symbol = raw.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(LookupError::InvalidInput("symbol is required".to_string()));
    }
    if symbol.len() > MAX_SYMBOL_LEN
        || !symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(LookupError::InvalidInput(format!(
            "invalid symbol: {}",
            raw.trim()
        )));
    }
    Ok(symbol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dashboard_core::StoreError;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        entries: Mutex<HashMap<(DataKind, String), CacheEntry>>,
        fail_reads: bool,
        fail_writes: bool,
        puts: AtomicUsize,
    }

    impl MemoryStore {
        fn seeded(kind: DataKind, entry: CacheEntry) -> Self {
            let store = Self::default();
            store
                .entries
                .lock()
                .unwrap()
                .insert((kind, entry.symbol.clone()), entry);
            store
        }

        fn entry(&self, kind: DataKind, symbol: &str) -> Option<CacheEntry> {
            self.entries
                .lock()
                .unwrap()
                .get(&(kind, symbol.to_string()))
                .cloned()
        }
    }

    #[async_trait]
    impl CacheStore for MemoryStore {
        async fn get(&self, kind: DataKind, symbol: &str) -> Result<Option<CacheEntry>, StoreError> {
            if self.fail_reads {
                return Err(StoreError::Backend("read refused".to_string()));
            }
            Ok(self.entry(kind, symbol))
        }

        async fn put(&self, kind: DataKind, entry: &CacheEntry) -> Result<(), StoreError> {
            self.puts.fetch_add(1, Ordering::SeqCst);
            if self.fail_writes {
                return Err(StoreError::Backend("write refused".to_string()));
            }
            self.entries
                .lock()
                .unwrap()
                .insert((kind, entry.symbol.clone()), entry.clone());
            Ok(())
        }
    }

    struct StubUpstream {
        overview: Result<Value, UpstreamError>,
        financials: Result<Value, UpstreamError>,
        calls: AtomicUsize,
    }

    impl StubUpstream {
        fn overview_ok(raw: Value) -> Self {
            Self {
                overview: Ok(raw),
                financials: Err(UpstreamError::Unavailable("unused".to_string())),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing(error: fn(String) -> UpstreamError) -> Self {
            Self {
                overview: Err(error("boom".to_string())),
                financials: Err(error("boom".to_string())),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn clone_result(result: &Result<Value, UpstreamError>) -> Result<Value, UpstreamError> {
        match result {
            Ok(v) => Ok(v.clone()),
            Err(UpstreamError::UnknownSymbol(s)) => Err(UpstreamError::UnknownSymbol(s.clone())),
            Err(UpstreamError::Unavailable(s)) => Err(UpstreamError::Unavailable(s.clone())),
        }
    }

    #[async_trait]
    impl MarketDataSource for StubUpstream {
        async fn fetch_overview(&self, _symbol: &str) -> Result<Value, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            clone_result(&self.overview)
        }

        async fn fetch_financials(&self, _symbol: &str) -> Result<Value, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            clone_result(&self.financials)
        }
    }

    fn service(store: MemoryStore, upstream: StubUpstream) -> (CachedLookupService, Arc<MemoryStore>, Arc<StubUpstream>) {
        let store = Arc::new(store);
        let upstream = Arc::new(upstream);
        let service = CachedLookupService::new(store.clone(), upstream.clone());
        (service, store, upstream)
    }

    fn aem_raw() -> Value {
        json!({
            "Symbol": "AEM",
            "Name": "Agnico Eagle Mines",
            "Sector": "Basic Materials",
            "MarketCapitalization": "35000000000"
        })
    }

    #[tokio::test]
    async fn test_fresh_cache_hit_skips_upstream() {
        let now = Utc::now().timestamp();
        let entry = CacheEntry::new("K", json!({"name": "Kinross Gold"}), now - 3600);
        let (service, _, upstream) = service(
            MemoryStore::seeded(DataKind::Overview, entry),
            StubUpstream::failing(UpstreamError::Unavailable),
        );

        let payload = service.fetch(DataKind::Overview, "K").await.unwrap();
        assert_eq!(payload["name"], "Kinross Gold");
        assert_eq!(upstream.call_count(), 0);
    }

    #[tokio::test]
    async fn test_miss_refreshes_transforms_and_persists() {
        let (service, store, upstream) = service(
            MemoryStore::default(),
            StubUpstream::overview_ok(aem_raw()),
        );

        let before = Utc::now().timestamp();
        let payload = service.fetch(DataKind::Overview, "AEM").await.unwrap();
        assert_eq!(payload["name"], "Agnico Eagle Mines");
        assert_eq!(payload["sector"], "Basic Materials");
        assert_eq!(payload["market_cap"], "35.00B");
        assert_eq!(upstream.call_count(), 1);

        let entry = store.entry(DataKind::Overview, "AEM").expect("persisted");
        assert!(entry.fetched_at >= before);
        assert_eq!(entry.payload, payload);

        // Second fetch inside the TTL window: cached, no upstream call.
        let again = service.fetch(DataKind::Overview, "AEM").await.unwrap();
        assert_eq!(again, payload);
        assert_eq!(upstream.call_count(), 1);
    }

    #[tokio::test]
    async fn test_stale_cache_served_when_upstream_fails() {
        let now = Utc::now().timestamp();
        let stale = CacheEntry::new("ABR", json!({"name": "Arbor Metals"}), now - 30 * 24 * 3600);
        let (service, store, _) = service(
            MemoryStore::seeded(DataKind::Overview, stale),
            StubUpstream::failing(UpstreamError::Unavailable),
        );

        let payload = service.fetch(DataKind::Overview, "ABR").await.unwrap();
        assert_eq!(payload["name"], "Arbor Metals");
        // The stale entry is untouched; no write happened.
        assert_eq!(store.puts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_cache_and_upstream_down_is_unavailable() {
        let (service, _, _) = service(
            MemoryStore::default(),
            StubUpstream::failing(UpstreamError::Unavailable),
        );

        let err = service.fetch(DataKind::Overview, "AEM").await.unwrap_err();
        assert!(matches!(err, LookupError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn test_unknown_symbol_maps_to_not_found() {
        let (service, _, upstream) = service(
            MemoryStore::default(),
            StubUpstream::failing(UpstreamError::UnknownSymbol),
        );

        let err = service.fetch(DataKind::Overview, "ZZZZ").await.unwrap_err();
        assert!(matches!(err, LookupError::NotFound(_)));
        // The adapter reported a semantic miss; exactly one logical call.
        assert_eq!(upstream.call_count(), 1);
    }

    #[tokio::test]
    async fn test_stale_cache_beats_unknown_symbol() {
        let now = Utc::now().timestamp();
        let stale = CacheEntry::new("NG", json!({"name": "NovaGold"}), now - 90 * 24 * 3600);
        let (service, _, _) = service(
            MemoryStore::seeded(DataKind::Overview, stale),
            StubUpstream::failing(UpstreamError::UnknownSymbol),
        );

        let payload = service.fetch(DataKind::Overview, "NG").await.unwrap();
        assert_eq!(payload["name"], "NovaGold");
    }

    #[tokio::test]
    async fn test_invalid_symbols_rejected_before_any_io() {
        let (service, store, upstream) = service(
            MemoryStore::default(),
            StubUpstream::overview_ok(aem_raw()),
        );

        for bad in ["", "   ", "WAY-TOO-LONG-SYMBOL", "A$M", "a b"] {
            let err = service.fetch(DataKind::Overview, bad).await.unwrap_err();
            assert!(matches!(err, LookupError::InvalidInput(_)), "{:?}", bad);
        }
        assert_eq!(upstream.call_count(), 0);
        assert_eq!(store.puts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_symbol_normalized_to_uppercase() {
        let (service, store, _) = service(
            MemoryStore::default(),
            StubUpstream::overview_ok(aem_raw()),
        );

        service.fetch(DataKind::Overview, " aem ").await.unwrap();
        assert!(store.entry(DataKind::Overview, "AEM").is_some());
    }

    #[tokio::test]
    async fn test_store_read_failure_degrades_to_miss() {
        let store = MemoryStore {
            fail_reads: true,
            ..MemoryStore::default()
        };
        let (service, _, upstream) = service(store, StubUpstream::overview_ok(aem_raw()));

        let payload = service.fetch(DataKind::Overview, "AEM").await.unwrap();
        assert_eq!(payload["market_cap"], "35.00B");
        assert_eq!(upstream.call_count(), 1);
    }

    #[tokio::test]
    async fn test_store_write_failure_still_returns_payload() {
        let store = MemoryStore {
            fail_writes: true,
            ..MemoryStore::default()
        };
        let (service, store, _) = service(store, StubUpstream::overview_ok(aem_raw()));

        let payload = service.fetch(DataKind::Overview, "AEM").await.unwrap();
        assert_eq!(payload["name"], "Agnico Eagle Mines");
        assert_eq!(store.puts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_kinds_are_independent_namespaces() {
        let now = Utc::now().timestamp();
        let entry = CacheEntry::new("AEM", json!({"name": "cached overview"}), now - 60);
        let (service, _, upstream) = service(
            MemoryStore::seeded(DataKind::Overview, entry),
            StubUpstream::failing(UpstreamError::Unavailable),
        );

        // Overview is cached and fresh; financials has no entry.
        service.fetch(DataKind::Overview, "AEM").await.unwrap();
        assert_eq!(upstream.call_count(), 0);
        let err = service.fetch(DataKind::Financials, "AEM").await.unwrap_err();
        assert!(matches!(err, LookupError::UpstreamUnavailable(_)));
        assert_eq!(upstream.call_count(), 1);
    }

    #[tokio::test]
    async fn test_configured_ttl_is_honored() {
        let now = Utc::now().timestamp();
        // Fresh under the default 7-day TTL, stale under a 1-minute one.
        let entry = CacheEntry::new("K", json!({"name": "old"}), now - 600);
        let (service, _, upstream) = service(
            MemoryStore::seeded(DataKind::Overview, entry),
            StubUpstream::overview_ok(aem_raw()),
        );
        let service = service.with_policy(CachePolicy {
            overview_ttl: Duration::from_secs(60),
            financials_ttl: Duration::from_secs(60),
        });

        let payload = service.fetch(DataKind::Overview, "K").await.unwrap();
        assert_eq!(payload["name"], "Agnico Eagle Mines");
        assert_eq!(upstream.call_count(), 1);
    }
}
