//! SQLite-backed document store for the dashboard: the lookup cache
//! plus the read-only `symbols` and `metrics` tables.

use async_trait::async_trait;
use dashboard_core::{CacheEntry, CacheStore, DataKind, StoreError, SymbolInfo};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

pub mod models;
pub use models::SymbolMetrics;

#[derive(Clone)]
pub struct DashboardDb {
    pool: SqlitePool,
}

impl DashboardDb {
    /// Open (creating if missing) and apply the schema.
    pub async fn new(database_url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(backend)?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(backend)?;

        let db = Self { pool };
        db.init_schema().await?;

        Ok(db)
    }

    async fn init_schema(&self) -> Result<(), StoreError> {
        let schema = include_str!("../../../schema.sql");

        // sqlx executes one statement at a time.
        for statement in schema.split(';') {
            let stmt = statement.trim();
            if !stmt.is_empty() {
                sqlx::query(stmt).execute(&self.pool).await.map_err(backend)?;
            }
        }

        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Symbols matching a query: prefix match on the ticker, substring
    /// match on the company name. An empty query lists everything up to
    /// the limit.
    pub async fn search_symbols(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<SymbolInfo>, StoreError> {
        let query = query.trim();

        let rows: Vec<(String, String, Option<String>, Option<String>, Option<String>)> =
            if query.is_empty() {
                sqlx::query_as(
                    "SELECT symbol, name, exchange, currency, region FROM symbols \
                     ORDER BY symbol LIMIT ?",
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await
                .map_err(backend)?
            } else {
                sqlx::query_as(
                    "SELECT symbol, name, exchange, currency, region FROM symbols \
                     WHERE symbol LIKE ?1 OR name LIKE ?2 ORDER BY symbol LIMIT ?3",
                )
                .bind(format!("{}%", query))
                .bind(format!("%{}%", query))
                .bind(limit)
                .fetch_all(&self.pool)
                .await
                .map_err(backend)?
            };

        Ok(rows
            .into_iter()
            .map(|(symbol, name, exchange, currency, region)| SymbolInfo {
                symbol,
                name,
                exchange,
                currency,
                region,
            })
            .collect())
    }

    pub async fn get_metrics(&self, symbol: &str) -> Result<Option<SymbolMetrics>, StoreError> {
        sqlx::query_as::<_, SymbolMetrics>("SELECT * FROM metrics WHERE symbol = ?")
            .bind(symbol)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)
    }
}

#[async_trait]
impl CacheStore for DashboardDb {
    async fn get(&self, kind: DataKind, symbol: &str) -> Result<Option<CacheEntry>, StoreError> {
        let row: Option<(String, i64)> = sqlx::query_as(
            "SELECT payload, fetched_at FROM cache_entries WHERE kind = ? AND symbol = ?",
        )
        .bind(kind.as_str())
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        match row {
            Some((payload, fetched_at)) => {
                let payload = serde_json::from_str(&payload)
                    .map_err(|e| StoreError::Corrupt(format!("{}/{}: {}", kind, symbol, e)))?;
                Ok(Some(CacheEntry::new(symbol, payload, fetched_at)))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, kind: DataKind, entry: &CacheEntry) -> Result<(), StoreError> {
        let payload = serde_json::to_string(&entry.payload).map_err(|e| backend(e))?;

        sqlx::query(
            "INSERT INTO cache_entries (kind, symbol, payload, fetched_at) VALUES (?, ?, ?, ?) \
             ON CONFLICT(kind, symbol) DO UPDATE SET \
             payload = excluded.payload, fetched_at = excluded.fetched_at",
        )
        .bind(kind.as_str())
        .bind(&entry.symbol)
        .bind(payload)
        .bind(entry.fetched_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }
}

fn backend(e: impl std::fmt::Display) -> StoreError {
    StoreError::Backend(e.to_string())
}
