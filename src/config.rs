use std::env;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use dotenvy::dotenv;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub server_addr: String,
    pub db_max_connections: u32,

    // Rate limiting
    pub rate_read_per_min: u32,
    pub rate_write_per_min: u32,

    // Balance cache
    pub balance_cache_capacity: u64,
    pub balance_cache_ttl_secs: u64,
    pub warmup_days: u32,

    // Logging
    pub log_dir: String,
    pub log_level: tracing::Level,

    pub api_prefix: String,
}

fn var_or<T>(name: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .with_context(|| format!("{name} is not valid"))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let config = Self {
            server_addr: env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            db_max_connections: var_or("DB_MAX_CONNECTIONS", "10")?,

            rate_read_per_min: var_or("RATE_READ_PER_MIN", "600")?,
            rate_write_per_min: var_or("RATE_WRITE_PER_MIN", "60")?,

            balance_cache_capacity: var_or("BALANCE_CACHE_CAPACITY", "2000")?,
            balance_cache_ttl_secs: var_or("BALANCE_CACHE_TTL_SECS", "300")?, // 5 min
            warmup_days: var_or("BALANCE_WARMUP_DAYS", "30")?,

            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            log_level: var_or("LOG_LEVEL", "info")?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api/v1".to_string()),
        };

        if config.rate_read_per_min == 0 || config.rate_write_per_min == 0 {
            bail!("rate limits must be at least one request per minute");
        }

        Ok(config)
    }
}
