//! Runtime configuration loaded from environment variables.

use std::time::Duration;

use crate::catalog::{DATASET_CATALOG, DatasetEntry};
use crate::store::DEFAULT_SESSION_TTL;

/// Config bag for question answering. All fields have defaults via `from_env`.
#[derive(Clone, Debug)]
pub struct QaConfig {
    /// Interpolate the dataset catalog into prompts and credit it in sources.
    pub attach_citations: bool,
    /// Idle time before a chat session is forgotten. Zero keeps sessions forever.
    pub session_ttl: Duration,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            attach_citations: true,
            session_ttl: DEFAULT_SESSION_TTL,
        }
    }
}

impl QaConfig {
    /// Build from environment variables with sensible defaults.
    ///
    /// - `QA_ATTACH_CITATIONS` (`true`/`false`, default `true`)
    /// - `QA_SESSION_TTL_SECS` (default 3600, `0` disables eviction)
    pub fn from_env() -> Self {
        Self {
            attach_citations: parse_bool(std::env::var("QA_ATTACH_CITATIONS").ok(), true),
            session_ttl: parse_secs(
                std::env::var("QA_SESSION_TTL_SECS").ok(),
                DEFAULT_SESSION_TTL,
            ),
        }
    }

    /// Citation entries to use for a prompt under this config.
    pub fn citations(&self) -> &'static [DatasetEntry] {
        if self.attach_citations {
            DATASET_CATALOG
        } else {
            &[]
        }
    }
}

fn parse_bool(raw: Option<String>, dflt: bool) -> bool {
    match raw.as_deref().map(str::trim).map(str::to_ascii_lowercase).as_deref() {
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        _ => dflt,
    }
}

fn parse_secs(raw: Option<String>, dflt: Duration) -> Duration {
    raw.and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(dflt)
}
