//! Subscriber initialization.
//!
//! The filter comes from `RUST_LOG` (default `info`). Adapters log at `debug`
//! per staged change and storage call, so `RUST_LOG=polystore_infra=debug` is
//! the usual knob when chasing a persistence issue. `POLYSTORE_LOG_FORMAT`
//! picks the output format.

use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "info";

pub const LOG_FORMAT_VAR: &str = "POLYSTORE_LOG_FORMAT";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Json,
    /// Human-readable lines, for local runs.
    Pretty,
}

impl LogFormat {
    /// `json` (default) or `pretty`; anything else falls back to JSON.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }

    /// Read from `POLYSTORE_LOG_FORMAT`; JSON when unset.
    pub fn from_env() -> Self {
        std::env::var(LOG_FORMAT_VAR)
            .map(|name| Self::from_name(&name))
            .unwrap_or_default()
    }
}

fn filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. Returns `false` if one was already set.
pub fn init(format: LogFormat) -> bool {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false);

    match format {
        LogFormat::Json => builder.json().try_init().is_ok(),
        LogFormat::Pretty => builder.try_init().is_ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_names() {
        assert_eq!(LogFormat::from_name("Pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::from_name("json"), LogFormat::Json);
        assert_eq!(LogFormat::from_name("xml"), LogFormat::Json);
    }

    #[test]
    fn second_init_is_noop() {
        init(LogFormat::Pretty);
        assert!(!init(LogFormat::Json));
    }
}
