use thiserror::Error;

/// Errors surfaced to callers of the lookup service. The router maps each
/// variant to a distinct HTTP status so clients can tell "bad request"
/// from "unknown symbol" from "try again later".
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),
}

/// Failures reported by the market-data adapter.
///
/// `UnknownSymbol` is a semantic answer from the provider and must not be
/// retried; `Unavailable` covers transport errors, HTTP failures, and
/// rate limiting, after the adapter's own retry budget is spent.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    #[error("Upstream unavailable: {0}")]
    Unavailable(String),
}

/// Cache-store failures. The lookup service absorbs these (a failed read
/// degrades to a miss, a failed write is logged and dropped), so they
/// never reach the HTTP surface on their own.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store error: {0}")]
    Backend(String),

    #[error("Corrupt cache entry: {0}")]
    Corrupt(String),
}
