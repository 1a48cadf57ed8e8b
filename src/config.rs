use std::time::Duration;

use anyhow::Context;

/// Runtime configuration loaded from the environment (and `.env`).
///
/// | Env Var                    | Default |
/// |----------------------------|---------|
/// | `DATABASE_URL`             | none    |
/// | `SCOUT_DB_MAX_CONNECTIONS` | `5`     |
/// | `SCOUT_EVENT_LIMIT`        | `300`   |
/// | `SCOUT_POLL_INTERVAL_SECS` | `5`     |
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Only store-backed commands need this.
    pub database_url: Option<String>,
    pub max_connections: u32,
    /// How many of the newest events a leaderboard snapshot reads.
    pub event_limit: i64,
    pub poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: 5,
            event_limit: 300,
            poll_interval: Duration::from_secs(5),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let max_connections = match lookup("SCOUT_DB_MAX_CONNECTIONS") {
            Some(raw) => raw
                .parse()
                .context("SCOUT_DB_MAX_CONNECTIONS must be a positive integer")?,
            None => defaults.max_connections,
        };

        let event_limit = match lookup("SCOUT_EVENT_LIMIT") {
            Some(raw) => raw
                .parse()
                .context("SCOUT_EVENT_LIMIT must be an integer")?,
            None => defaults.event_limit,
        };

        let poll_interval = match lookup("SCOUT_POLL_INTERVAL_SECS") {
            Some(raw) => Duration::from_secs(
                raw.parse()
                    .context("SCOUT_POLL_INTERVAL_SECS must be a whole number of seconds")?,
            ),
            None => defaults.poll_interval,
        };

        Ok(Self {
            database_url,
            max_connections,
            event_limit,
            poll_interval,
        })
    }

    pub fn require_database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set to a production Postgres instance")
    }
}
