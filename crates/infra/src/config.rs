//! Persistence configuration from the environment.

use std::str::FromStr;
use std::sync::Arc;

use tracing::{info, warn};

use polystore_core::{ConfigError, PersistenceResult, Provider};

use crate::document::InMemoryDocumentClient;
use crate::factory::StorageBackends;
use crate::graph::InMemoryGraphClient;
use crate::relational;

pub const PROVIDER_VAR: &str = "POLYSTORE_PROVIDER";
pub const DATABASE_URL_VAR: &str = "POLYSTORE_DATABASE_URL";
pub const MAX_CONNECTIONS_VAR: &str = "POLYSTORE_MAX_CONNECTIONS";

pub const DEFAULT_DATABASE_URL: &str = "sqlite::memory:";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistenceConfig {
    pub provider: Provider,
    pub database_url: String,
    pub max_connections: u32,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Relational,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

impl PersistenceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup (tests pass a map here).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = match lookup(PROVIDER_VAR) {
            Some(value) => Provider::from_str(&value)?,
            None => {
                warn!("{PROVIDER_VAR} not set; defaulting to relational");
                Provider::Relational
            }
        };

        let database_url = lookup(DATABASE_URL_VAR)
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let max_connections = match lookup(MAX_CONNECTIONS_VAR) {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::invalid(format!(
                        "{MAX_CONNECTIONS_VAR} must be a positive integer, got '{raw}'"
                    )));
                }
            },
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            provider,
            database_url,
            max_connections,
        })
    }

    /// Connect the backend of the configured provider.
    ///
    /// Document and graph use the in-process clients; a networked client
    /// plugs in through `StorageBackends` directly.
    pub async fn connect(&self) -> PersistenceResult<StorageBackends> {
        info!(provider = %self.provider, "connecting persistence backend");
        let backends = StorageBackends::default();
        Ok(match self.provider {
            Provider::Relational => backends.with_relational(
                relational::connect(&self.database_url, self.max_connections).await?,
            ),
            Provider::Document => backends.with_document(Arc::new(InMemoryDocumentClient::new())),
            Provider::Graph => backends.with_graph(Arc::new(InMemoryGraphClient::new())),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn missing_provider_defaults_to_relational() {
        let config = PersistenceConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, PersistenceConfig::default());
    }

    #[test]
    fn provider_is_case_insensitive() {
        let config = PersistenceConfig::from_lookup(lookup(&[(PROVIDER_VAR, "Graph")])).unwrap();
        assert_eq!(config.provider, Provider::Graph);
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let err = PersistenceConfig::from_lookup(lookup(&[(PROVIDER_VAR, "cassandra")])).unwrap_err();
        assert_eq!(err, ConfigError::UnknownProvider("cassandra".to_string()));
    }

    #[test]
    fn bad_pool_size_is_rejected() {
        let err =
            PersistenceConfig::from_lookup(lookup(&[(MAX_CONNECTIONS_VAR, "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[tokio::test]
    async fn connects_only_the_selected_backend() {
        let config = PersistenceConfig::from_lookup(lookup(&[(PROVIDER_VAR, "document")])).unwrap();
        let backends = config.connect().await.unwrap();
        assert!(backends.document.is_some());
        assert!(backends.relational.is_none());
        assert!(backends.graph.is_none());
    }
}
