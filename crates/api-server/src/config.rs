use anyhow::Context;

/// Server configuration, read once at startup from the environment
/// (with `.env` support via dotenvy).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub alphavantage_api_key: String,
    pub database_url: String,
    pub port: u16,
    pub overview_ttl_secs: u64,
    pub financials_ttl_secs: u64,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            alphavantage_api_key: std::env::var("ALPHAVANTAGE_API_KEY")
                .context("ALPHAVANTAGE_API_KEY must be set")?,
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:dashboard.db".to_string()),
            port: env_parsed("API_PORT", 3000),
            overview_ttl_secs: env_parsed("OVERVIEW_TTL_SECS", 7 * 24 * 3600),
            financials_ttl_secs: env_parsed("FINANCIALS_TTL_SECS", 24 * 3600),
        })
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
