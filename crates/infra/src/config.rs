//! Configuration loading and representation.

use anyhow::{Context, ensure};
use sqlx::postgres::PgPoolOptions;

use crate::store::PostgresIdentityStore;
use crate::username::{DEFAULT_MAX_ATTEMPTS, RandomTokens, UsernameGenerator};

pub const DATABASE_URL_VAR: &str = "ROSTER_DATABASE_URL";
pub const DB_MAX_CONNECTIONS_VAR: &str = "ROSTER_DB_MAX_CONNECTIONS";
pub const USERNAME_MAX_ATTEMPTS_VAR: &str = "ROSTER_USERNAME_MAX_ATTEMPTS";

pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

#[derive(Clone, PartialEq, Eq)]
pub struct RosterConfig {
    /// Postgres connection string. `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub username_max_attempts: u32,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            username_max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

// The URL may embed credentials.
impl core::fmt::Debug for RosterConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RosterConfig")
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("db_max_connections", &self.db_max_connections)
            .field("username_max_attempts", &self.username_max_attempts)
            .finish()
    }
}

impl RosterConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let db_max_connections = match get(DB_MAX_CONNECTIONS_VAR) {
            Some(raw) => positive(DB_MAX_CONNECTIONS_VAR, &raw)?,
            None => DEFAULT_DB_MAX_CONNECTIONS,
        };
        let username_max_attempts = match get(USERNAME_MAX_ATTEMPTS_VAR) {
            Some(raw) => positive(USERNAME_MAX_ATTEMPTS_VAR, &raw)?,
            None => DEFAULT_MAX_ATTEMPTS,
        };

        Ok(Self {
            database_url: get(DATABASE_URL_VAR),
            db_max_connections,
            username_max_attempts,
        })
    }

    pub fn username_generator(&self) -> UsernameGenerator {
        UsernameGenerator::new(RandomTokens, self.username_max_attempts)
    }

    /// Open the Postgres store and apply the schema, if a URL is configured.
    pub async fn connect(&self) -> anyhow::Result<Option<PostgresIdentityStore>> {
        let Some(url) = self.database_url.as_deref() else {
            tracing::info!("no database configured; using in-memory identity store");
            return Ok(None);
        };

        let pool = PgPoolOptions::new()
            .max_connections(self.db_max_connections)
            .connect(url)
            .await
            .with_context(|| format!("failed to connect to database from {DATABASE_URL_VAR}"))?;

        let store = PostgresIdentityStore::new(pool);
        store.migrate().await.context("failed to apply identity schema")?;
        tracing::info!(max_connections = self.db_max_connections, "identity store connected");
        Ok(Some(store))
    }
}

fn positive(var: &str, raw: &str) -> anyhow::Result<u32> {
    let value: u32 = raw
        .trim()
        .parse()
        .with_context(|| format!("{var} must be a positive integer, got {raw:?}"))?;
    ensure!(value >= 1, "{var} must be at least 1");
    Ok(value)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = RosterConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, RosterConfig::default());
        assert_eq!(
            format!("{:?}", config.username_generator()),
            "UsernameGenerator { max_attempts: 100, .. }"
        );
    }

    #[test]
    fn reads_all_variables() {
        let config = RosterConfig::from_lookup(lookup(&[
            (DATABASE_URL_VAR, "postgres://u:p@localhost/roster"),
            (DB_MAX_CONNECTIONS_VAR, "12"),
            (USERNAME_MAX_ATTEMPTS_VAR, " 7 "),
        ]))
        .unwrap();
        assert_eq!(config.database_url.as_deref(), Some("postgres://u:p@localhost/roster"));
        assert_eq!(config.db_max_connections, 12);
        assert_eq!(config.username_max_attempts, 7);
        assert!(!format!("{config:?}").contains("u:p"));
    }

    #[test]
    fn invalid_numbers_name_the_variable() {
        let err = RosterConfig::from_lookup(lookup(&[(DB_MAX_CONNECTIONS_VAR, "many")])).unwrap_err();
        assert!(err.to_string().contains(DB_MAX_CONNECTIONS_VAR));

        let err = RosterConfig::from_lookup(lookup(&[(USERNAME_MAX_ATTEMPTS_VAR, "0")])).unwrap_err();
        assert!(err.to_string().contains(USERNAME_MAX_ATTEMPTS_VAR));
    }

    #[tokio::test]
    async fn connect_without_url_selects_in_memory() {
        assert!(RosterConfig::default().connect().await.unwrap().is_none());
    }
}
