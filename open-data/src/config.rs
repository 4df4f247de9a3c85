//! Client configuration, read from `DATA_GOV_*` environment variables.

use std::time::Duration;

use crate::error::{OpenDataError, Result};

pub const DEFAULT_ENDPOINT: &str = "https://data.gov.in/api/datastore/resource.json";
pub const DEFAULT_RESOURCE_ID: &str = "9ef84268-d588-465a-a308-a864a43d0070";
pub const DEFAULT_LIMIT: u32 = 10;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

#[derive(Clone, PartialEq, Eq)]
pub struct OpenDataConfig {
    pub endpoint: String,
    pub resource_id: String,
    /// Sent as `api-key`; an empty key is still sent, the portal then answers non-200.
    pub api_key: String,
    pub limit: u32,
    pub timeout: Duration,
    /// How long a live payload is reused. Zero disables caching.
    pub cache_ttl: Duration,
}

impl std::fmt::Debug for OpenDataConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenDataConfig")
            .field("endpoint", &self.endpoint)
            .field("resource_id", &self.resource_id)
            .field("api_key", &if self.api_key.is_empty() { "<empty>" } else { "<redacted>" })
            .field("limit", &self.limit)
            .field("timeout", &self.timeout)
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

impl Default for OpenDataConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            resource_id: DEFAULT_RESOURCE_ID.to_string(),
            api_key: String::new(),
            limit: DEFAULT_LIMIT,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        }
    }
}

impl OpenDataConfig {
    /// Reads `DATA_GOV_API_KEY`, `DATA_GOV_ENDPOINT`, `DATA_GOV_RESOURCE_ID`,
    /// `DATA_GOV_TIMEOUT_SECS` and `DATA_GOV_CACHE_TTL_SECS`.
    ///
    /// # Errors
    /// [`OpenDataError::Config`] for a malformed endpoint or number.
    pub fn from_env() -> Result<Self> {
        let dflt = Self::default();

        let endpoint = env("DATA_GOV_ENDPOINT").unwrap_or(dflt.endpoint);
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(OpenDataError::Config {
                var: "DATA_GOV_ENDPOINT",
                reason: "must start with http:// or https://",
            });
        }

        let timeout_secs = env_u64("DATA_GOV_TIMEOUT_SECS")?.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(OpenDataError::Config {
                var: "DATA_GOV_TIMEOUT_SECS",
                reason: "must be greater than zero",
            });
        }
        let ttl_secs = env_u64("DATA_GOV_CACHE_TTL_SECS")?.unwrap_or(DEFAULT_CACHE_TTL_SECS);

        Ok(Self {
            endpoint,
            resource_id: env("DATA_GOV_RESOURCE_ID").unwrap_or(dflt.resource_id),
            api_key: env("DATA_GOV_API_KEY").unwrap_or_default(),
            limit: dflt.limit,
            timeout: Duration::from_secs(timeout_secs),
            cache_ttl: Duration::from_secs(ttl_secs),
        })
    }
}

fn env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_u64(name: &'static str) -> Result<Option<u64>> {
    parse_u64(name, env(name))
}

fn parse_u64(var: &'static str, raw: Option<String>) -> Result<Option<u64>> {
    raw.map(|v| {
        v.parse::<u64>().map_err(|_| OpenDataError::Config {
            var,
            reason: "expected u64",
        })
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_mandi_prices() {
        let c = OpenDataConfig::default();
        assert_eq!(c.resource_id, DEFAULT_RESOURCE_ID);
        assert_eq!(c.limit, 10);
        assert_eq!(c.timeout, Duration::from_secs(10));
    }

    #[test]
    fn parse_u64_rejects_garbage() {
        assert_eq!(parse_u64("X", Some("42".into())).unwrap(), Some(42));
        assert_eq!(parse_u64("X", None).unwrap(), None);
        assert!(matches!(
            parse_u64("X", Some("ten".into())),
            Err(OpenDataError::Config { var: "X", .. })
        ));
    }

    #[test]
    fn debug_hides_api_key() {
        let c = OpenDataConfig {
            api_key: "secret-key".into(),
            ..OpenDataConfig::default()
        };
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("secret-key"));
        assert!(dbg.contains("<redacted>"));
    }
}
