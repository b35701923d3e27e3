//! Storage provider selection.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// The storage backend kind active for the whole process.
///
/// Chosen once at startup from configuration; there is no way to switch it at
/// runtime.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Relational,
    Document,
    Graph,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::Relational, Provider::Document, Provider::Graph];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Relational => "relational",
            Provider::Document => "document",
            Provider::Graph => "graph",
        }
    }

    /// Whether begin/commit/rollback give real multi-operation atomicity.
    pub fn supports_transactions(&self) -> bool {
        matches!(self, Provider::Relational)
    }
}

impl core::fmt::Display for Provider {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "relational" => Ok(Provider::Relational),
            "document" => Ok(Provider::Document),
            "graph" => Ok(Provider::Graph),
            _ => Err(ConfigError::UnknownProvider(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Relational".parse::<Provider>().unwrap(), Provider::Relational);
        assert_eq!(" DOCUMENT ".parse::<Provider>().unwrap(), Provider::Document);
        assert_eq!("graph".parse::<Provider>().unwrap(), Provider::Graph);
    }

    #[test]
    fn unknown_provider_is_named_in_error() {
        let err = "cassandra".parse::<Provider>().unwrap_err();
        assert_eq!(err, ConfigError::UnknownProvider("cassandra".to_string()));
        assert!(err.to_string().contains("cassandra"));
    }

    #[test]
    fn display_matches_parse() {
        for p in Provider::ALL {
            assert_eq!(p.to_string().parse::<Provider>().unwrap(), p);
        }
    }

    #[test]
    fn only_relational_is_transactional() {
        assert!(Provider::Relational.supports_transactions());
        assert!(!Provider::Document.supports_transactions());
        assert!(!Provider::Graph.supports_transactions());
    }
}
