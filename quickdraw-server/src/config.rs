use std::env;
use std::net::SocketAddr;
use thiserror::Error;

use quickdraw_persistence::connection::DEFAULT_DATABASE_URL;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
    #[error("Cannot resolve HOST {host:?}: {reason}")]
    UnresolvableHost { host: String, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// IP literal or hostname, resolved when the server binds
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Directory of `<category>.txt` word lists. The built-in catalog is used
    /// when unset.
    pub categories_directory: Option<String>,
    pub connection_timeout_seconds: u64,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build a config from any variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            host: host(&lookup)?,
            port: parse_var(&lookup, "PORT", "8080")?,
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            categories_directory: lookup("CATEGORIES_DIRECTORY").filter(|dir| !dir.is_empty()),
            connection_timeout_seconds: parse_var(&lookup, "CONNECTION_TIMEOUT_SECONDS", "300")?,
        })
    }

    /// First address `host:port` resolves to
    pub async fn bind_address(&self) -> Result<SocketAddr, ConfigError> {
        let unresolvable = |reason: String| ConfigError::UnresolvableHost {
            host: self.host.clone(),
            reason,
        };

        tokio::net::lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|e| unresolvable(e.to_string()))?
            .next()
            .ok_or_else(|| unresolvable("no addresses".to_string()))
    }
}

fn host(lookup: &impl Fn(&str) -> Option<String>) -> Result<String, ConfigError> {
    match lookup("HOST") {
        None => Ok("127.0.0.1".to_string()),
        Some(value) if value.trim().is_empty() => Err(ConfigError::InvalidValue {
            name: "HOST",
            value,
        }),
        Some(value) => Ok(value.trim().to_string()),
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: &str,
) -> Result<T, ConfigError> {
    let value = lookup(name).unwrap_or_else(|| default.to_string());
    value
        .parse()
        .map_err(|_| ConfigError::InvalidValue { name, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert!(config.categories_directory.is_none());
        assert_eq!(config.connection_timeout_seconds, 300);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("HOST", "0.0.0.0"),
            ("PORT", "9000"),
            ("DATABASE_URL", "sqlite::memory:"),
            ("CATEGORIES_DIRECTORY", "./words"),
        ])
        .unwrap();

        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9000);
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.categories_directory.as_deref(), Some("./words"));
    }

    #[test]
    fn test_invalid_values() {
        assert_eq!(
            config_from(&[("PORT", "eighty")]).unwrap_err(),
            ConfigError::InvalidValue {
                name: "PORT",
                value: "eighty".to_string()
            }
        );
        assert!(matches!(
            config_from(&[("HOST", " ")]),
            Err(ConfigError::InvalidValue { name: "HOST", .. })
        ));
    }

    #[tokio::test]
    async fn test_bind_address_accepts_hostnames() {
        let config = config_from(&[("HOST", "localhost"), ("PORT", "9000")]).unwrap();
        assert_eq!(config.host, "localhost");

        let addr = config.bind_address().await.unwrap();
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 9000);
    }

    #[tokio::test]
    async fn test_bind_address_for_ip_literal() {
        let config = config_from(&[("HOST", "0.0.0.0")]).unwrap();
        let addr = config.bind_address().await.unwrap();
        assert_eq!(addr.to_string(), "0.0.0.0:8080");
    }
}
