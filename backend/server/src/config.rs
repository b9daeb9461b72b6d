use std::{env, fmt::Display, fs::read_to_string, str::FromStr};

use anyhow::{Context, Result, anyhow};
use tracing::{info, warn};

pub const DEFAULT_WEBRING_URL: &str = webring::remote::WEBRING_API;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
    Redis,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            other => Err(anyhow!("unknown storage backend {other:?}")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Environment {
    Production,
    Development,
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "production" | "prod" => Ok(Self::Production),
            "development" | "dev" | "local" => Ok(Self::Development),
            other => Err(anyhow!("unknown environment {other:?}")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub storage: StorageBackend,
    pub redis_url: String,
    pub environment: Environment,
    pub entry_cap: usize,
    pub cooldown_ms: i64,
    pub geo_city_header: String,
    pub geo_country_header: String,
    pub webring_url: String,
    pub webring_timeout_ms: u64,
    /// Reverse proxies in front of the server that append to `X-Forwarded-For`.
    /// Zero means the socket peer is the submitter.
    pub trusted_proxy_hops: usize,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let admin_password = read_secret("ADMIN_PASSWORD");

        if admin_password.is_none() {
            warn!("ADMIN_PASSWORD not configured, deleting entries is disabled");
        }

        Ok(Self {
            port: try_load("RUST_PORT", "1111")?,
            storage: try_load("STORAGE_BACKEND", "memory")?,
            redis_url: try_load("REDIS_URL", "redis://127.0.0.1:6379")?,
            environment: try_load("APP_ENV", "development")?,
            entry_cap: try_load("ENTRY_CAP", "1000")?,
            cooldown_ms: try_load("COOLDOWN_MS", "60000")?,
            geo_city_header: try_load("GEO_CITY_HEADER", "x-geo-city")?,
            geo_country_header: try_load("GEO_COUNTRY_HEADER", "x-geo-country")?,
            webring_url: try_load("WEBRING_URL", DEFAULT_WEBRING_URL)?,
            webring_timeout_ms: try_load("WEBRING_TIMEOUT_MS", "3000")?,
            trusted_proxy_hops: try_load("TRUSTED_PROXY_HOPS", "0")?,
            admin_password,
        })
    }
}

impl Default for Config {
    /// Local development defaults, without reading the environment.
    fn default() -> Self {
        Self {
            port: 1111,
            storage: StorageBackend::Memory,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            environment: Environment::Development,
            entry_cap: 1000,
            cooldown_ms: 60_000,
            geo_city_header: "x-geo-city".to_string(),
            geo_country_header: "x-geo-country".to_string(),
            webring_url: DEFAULT_WEBRING_URL.to_string(),
            webring_timeout_ms: 3000,
            trusted_proxy_hops: 0,
            admin_password: None,
        }
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| anyhow!("Invalid {key} value: {e}"))
        .context("Environment misconfigured!")
}

/// Docker secret first, then a plain environment variable of the same name.
fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    match read_to_string(&path) {
        Ok(secret) => Some(secret.trim().to_string()).filter(|s| !s.is_empty()),
        Err(e) => {
            info!("Failed to read {secret_name} from file: {e}, trying environment");
            var(secret_name).map(|s| s.trim().to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_backend() {
        assert_eq!("memory".parse::<StorageBackend>().unwrap(), StorageBackend::Memory);
        assert_eq!(" Redis ".parse::<StorageBackend>().unwrap(), StorageBackend::Redis);
        assert!("sqlite".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn test_environment() {
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("development".parse::<Environment>().unwrap(), Environment::Development);
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_try_load_default() {
        let cap: usize = try_load("GUESTBOOK_TEST_UNSET_KEY", "1000").unwrap();

        assert_eq!(cap, 1000);
    }

    #[test]
    fn test_try_load_rejects_garbage_default() {
        assert!(try_load::<u16>("GUESTBOOK_TEST_UNSET_KEY", "not-a-port").is_err());
    }
}
