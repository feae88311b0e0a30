// Service configuration: defaults plus FERIADOS_* environment overrides
use crate::cache::CacheConfig;
use crate::fetcher::ScraperConfig;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub cache: CacheConfig,
    pub scraper: ScraperConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cache: CacheConfig::default(),
            scraper: ScraperConfig::default(),
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from defaults, overriding each field whose key
    /// `lookup` resolves.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup("FERIADOS_HOST") {
            config.host = host;
        }
        if let Some(port) = parse_var(&lookup, "FERIADOS_PORT")? {
            config.port = port;
        }
        if let Some(url) = lookup("FERIADOS_URL") {
            config.scraper.url = url;
        }
        if let Some(ttl) = parse_var(&lookup, "FERIADOS_TTL_SECONDS")? {
            config.cache.ttl_seconds = non_zero("FERIADOS_TTL_SECONDS", ttl)?;
        }
        if let Some(timeout) = parse_var(&lookup, "FERIADOS_TIMEOUT_MS")? {
            config.scraper.timeout_ms = non_zero("FERIADOS_TIMEOUT_MS", timeout)?;
        }

        Ok(config)
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

fn parse_var<L, T>(lookup: &L, key: &str) -> Result<Option<T>, ConfigError>
where
    L: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

fn non_zero(key: &str, value: u64) -> Result<u64, ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }
    Ok(value)
}
