//! Configuration loading from environment.

use std::env;

/// Application configuration.
pub struct Config {
    pub database_url: String,
    pub event_webhook_url: String,
    pub relay_poll_interval_secs: u64,
    pub relay_batch_size: i64,
    pub relay_max_attempts: i32,
    pub relay_lease_ttl_secs: i64,
    pub interest_period_days: i64,
    pub interest_check_interval_secs: u64,
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => Ok(value.parse()?),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let event_webhook_url = env::var("EVENT_WEBHOOK_URL")
            .map_err(|_| anyhow::anyhow!("EVENT_WEBHOOK_URL environment variable is required"))?;

        Ok(Self {
            database_url,
            event_webhook_url,
            relay_poll_interval_secs: parsed_or("RELAY_POLL_INTERVAL_SECS", 1)?,
            relay_batch_size: parsed_or("RELAY_BATCH_SIZE", 20)?,
            relay_max_attempts: parsed_or("RELAY_MAX_ATTEMPTS", 3)?,
            relay_lease_ttl_secs: parsed_or("RELAY_LEASE_TTL_SECS", 30)?,
            interest_period_days: parsed_or("INTEREST_PERIOD_DAYS", 30)?,
            interest_check_interval_secs: parsed_or("INTEREST_CHECK_INTERVAL_SECS", 86_400)?,
        })
    }
}
