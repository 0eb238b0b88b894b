use anyhow::{anyhow, Context};

use crate::review::RetentionPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub retention: RetentionPolicy,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = lookup("DATABASE_URL")
            .context("DATABASE_URL must be set to a production Postgres instance")?;

        let max_connections = match lookup("DB_MAX_CONNECTIONS") {
            Some(value) => value
                .parse()
                .with_context(|| format!("DB_MAX_CONNECTIONS is not a number: {value:?}"))?,
            None => 5,
        };

        let retention = match lookup("REVIEW_RETENTION") {
            Some(value) => value
                .parse::<RetentionPolicy>()
                .map_err(|err| anyhow!(err))
                .context("invalid REVIEW_RETENTION")?,
            None => RetentionPolicy::default(),
        };

        Ok(Self {
            database_url,
            max_connections,
            retention,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }
}
