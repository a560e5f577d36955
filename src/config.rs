use std::{env, net::SocketAddr, time::Duration};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http_bind: SocketAddr,
    pub api_url: String,
    pub offline_mode: bool,
    pub remote_timeout: Duration,
    pub database_url: Option<String>,
    pub query_cache_ttl: Duration,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let port = env::var("PORT").unwrap_or_else(|_| "8080".to_owned());
        let http_bind = env::var("HTTP_BIND").unwrap_or_else(|_| format!("0.0.0.0:{port}"));
        let http_bind = http_bind.parse()?;

        Ok(Self {
            http_bind,
            api_url: env::var("API_URL").unwrap_or_else(|_| "http://localhost:8000/api".to_owned()),
            offline_mode: env_flag("OFFLINE_MODE"),
            remote_timeout: Duration::from_millis(env_u64("REMOTE_TIMEOUT_MS", 10_000)?),
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            query_cache_ttl: Duration::from_secs(env_u64("QUERY_CACHE_TTL_SEC", 30)?),
        })
    }
}

fn env_flag(key: &str) -> bool {
    env::var(key)
        .map(|value| matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn env_u64(key: &str, default: u64) -> anyhow::Result<u64> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|error| anyhow::anyhow!("{key} must be a whole number: {error}")),
        Err(_) => Ok(default),
    }
}
