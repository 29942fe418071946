use crate::enrichment::{DEFAULT_CACHE_TTL, DEFAULT_PROVIDER_TIMEOUT};
use crate::error::ConfigError;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_PROVIDER_URL: &str = "CALCFIELD_PROVIDER_URL";
pub const ENV_API_KEY: &str = "CALCFIELD_API_KEY";
pub const ENV_CACHE_TTL_SECS: &str = "CALCFIELD_CACHE_TTL_SECS";
pub const ENV_PROVIDER_TIMEOUT_SECS: &str = "CALCFIELD_PROVIDER_TIMEOUT_SECS";
pub const ENV_CACHE_CAPACITY: &str = "CALCFIELD_CACHE_CAPACITY";

pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

/// Settings for a [`FormulaEngine`](crate::FormulaEngine).
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Base URL of the enrichment provider. Without one, networked `AI_*`
    /// functions always return their fallbacks.
    pub provider_url: Option<String>,
    /// Sent as a bearer token with every provider request.
    pub api_key: Option<String>,
    pub cache_ttl: Duration,
    /// Deadline for a single provider call.
    pub provider_timeout: Duration,
    /// Maximum number of cached enrichment results.
    pub cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            provider_url: None,
            api_key: None,
            cache_ttl: DEFAULT_CACHE_TTL,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Reads the `CALCFIELD_*` environment variables, keeping defaults for
    /// unset or empty ones.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let defaults = Self::default();

        Ok(Self {
            provider_url: var(ENV_PROVIDER_URL),
            api_key: var(ENV_API_KEY),
            cache_ttl: parse_var(ENV_CACHE_TTL_SECS, var(ENV_CACHE_TTL_SECS))?
                .map_or(defaults.cache_ttl, Duration::from_secs),
            provider_timeout: parse_var(ENV_PROVIDER_TIMEOUT_SECS, var(ENV_PROVIDER_TIMEOUT_SECS))?
                .map_or(defaults.provider_timeout, Duration::from_secs),
            cache_capacity: parse_var(ENV_CACHE_CAPACITY, var(ENV_CACHE_CAPACITY))?
                .unwrap_or(defaults.cache_capacity),
        })
    }

    /// Config with no provider: every networked function degrades.
    pub fn offline() -> Self {
        Self::default()
    }

    pub fn with_provider(mut self, url: impl Into<String>, api_key: Option<String>) -> Self {
        self.provider_url = Some(url.into());
        self.api_key = api_key;
        self
    }
}

fn parse_var<T: FromStr>(name: &str, value: Option<String>) -> Result<Option<T>, ConfigError> {
    value
        .map(|value| {
            value.trim().parse::<T>().map_err(|_| ConfigError::InvalidVar {
                name: name.to_string(),
                value,
            })
        })
        .transpose()
}
