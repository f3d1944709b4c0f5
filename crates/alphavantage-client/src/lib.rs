use async_trait::async_trait;
use dashboard_core::{MarketDataSource, SymbolInfo, UpstreamError};
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

const BASE_URL: &str = "https://www.alphavantage.co/query";

/// Per-attempt timeout. Each invocation must complete or fail quickly;
/// the hosting environment gives the whole request only a few seconds.
const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Alpha Vantage market-data client.
///
/// Transport errors, HTTP 5xx, and HTTP 429 are retried up to
/// `MAX_ATTEMPTS` with a fixed backoff. A semantic "unknown symbol"
/// answer from the provider is terminal and never retried.
#[derive(Clone)]
pub struct AlphaVantageClient {
    api_key: String,
    client: Client,
}

impl AlphaVantageClient {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(ATTEMPT_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { api_key, client }
    }

    /// Issue one Alpha Vantage query with retry on transient failures.
    async fn query(&self, function: &str, params: &[(&str, &str)]) -> Result<Value, UpstreamError> {
        let mut last_error = String::new();

        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(RETRY_BACKOFF).await;
            }

            let request = self
                .client
                .get(BASE_URL)
                .query(&[("function", function)])
                .query(params)
                .query(&[("apikey", self.api_key.as_str())]);

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    last_error = e.to_string();
                    if e.is_timeout() || e.is_connect() {
                        tracing::warn!(
                            function,
                            attempt = attempt + 1,
                            "Alpha Vantage request failed, retrying: {}",
                            last_error
                        );
                        continue;
                    }
                    return Err(UpstreamError::Unavailable(last_error));
                }
            };

            let status = response.status();
            if status.is_server_error() || status.as_u16() == 429 {
                last_error = format!("HTTP {}", status);
                tracing::warn!(
                    function,
                    attempt = attempt + 1,
                    "Alpha Vantage returned {}, retrying",
                    status
                );
                continue;
            }

            if !status.is_success() {
                return Err(UpstreamError::Unavailable(format!(
                    "HTTP {}: {}",
                    status,
                    response.text().await.unwrap_or_default()
                )));
            }

            let body: Value = response
                .json()
                .await
                .map_err(|e| UpstreamError::Unavailable(e.to_string()))?;

            // Semantic error payload: the symbol (or function) is wrong.
            // Not a retry candidate.
            if let Some(message) = body.get("Error Message").and_then(Value::as_str) {
                return Err(UpstreamError::UnknownSymbol(message.to_string()));
            }

            // "Note"/"Information" bodies are rate-limit responses with a
            // 200 status; backing off inside this request will not help.
            if body.get("Note").is_some() || body.get("Information").is_some() {
                return Err(UpstreamError::Unavailable(
                    "Alpha Vantage rate limit reached".to_string(),
                ));
            }

            return Ok(body);
        }

        Err(UpstreamError::Unavailable(format!(
            "Alpha Vantage unreachable after {} attempts: {}",
            MAX_ATTEMPTS, last_error
        )))
    }

    async fn fetch_statement(&self, function: &str, symbol: &str) -> Result<Value, UpstreamError> {
        let body = self.query(function, &[("symbol", symbol)]).await?;

        let has_reports = body
            .get("quarterlyReports")
            .or_else(|| body.get("annualReports"))
            .map(|v| v.is_array())
            .unwrap_or(false);

        if !has_reports {
            return Err(UpstreamError::UnknownSymbol(format!(
                "No {} data for {}",
                function, symbol
            )));
        }

        Ok(body)
    }

    /// Search tradable symbols matching a free-text query.
    pub async fn search_symbols(&self, keywords: &str) -> Result<Vec<SymbolInfo>, UpstreamError> {
        let body = self.query("SYMBOL_SEARCH", &[("keywords", keywords)]).await?;
        Ok(parse_search_results(&body))
    }
}

#[async_trait]
impl MarketDataSource for AlphaVantageClient {
    async fn fetch_overview(&self, symbol: &str) -> Result<Value, UpstreamError> {
        let body = self.query("OVERVIEW", &[("symbol", symbol)]).await?;

        // Unknown symbols come back as an empty object with HTTP 200.
        if body.get("Symbol").and_then(Value::as_str).is_none() {
            return Err(UpstreamError::UnknownSymbol(format!(
                "No overview data for {}",
                symbol
            )));
        }

        Ok(body)
    }

    async fn fetch_financials(&self, symbol: &str) -> Result<Value, UpstreamError> {
        // Both statements build one payload; a miss on either is a unit
        // failure so the cache never stores half a set of financials.
        let (income, balance) = tokio::try_join!(
            self.fetch_statement("INCOME_STATEMENT", symbol),
            self.fetch_statement("BALANCE_SHEET", symbol),
        )?;

        Ok(json!({
            "income_statement": income,
            "balance_sheet": balance,
        }))
    }
}

fn parse_search_results(body: &Value) -> Vec<SymbolInfo> {
    let matches = match body.get("bestMatches").and_then(Value::as_array) {
        Some(matches) => matches,
        None => return Vec::new(),
    };

    matches
        .iter()
        .filter_map(|m| {
            let symbol = m.get("1. symbol")?.as_str()?.to_string();
            let name = m.get("2. name")?.as_str()?.to_string();
            Some(SymbolInfo {
                symbol,
                name,
                exchange: None,
                currency: m
                    .get("8. currency")
                    .and_then(Value::as_str)
                    .map(String::from),
                region: m
                    .get("4. region")
                    .and_then(Value::as_str)
                    .map(String::from),
            })
        })
        .collect()
}
