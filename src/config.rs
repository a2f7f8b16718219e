// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, default values, and the
//! [`Config`] loaded from the environment at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `IDENTITY_BACKEND_URL` | Base URL of the managed identity backend | Required |
//! | `IDENTITY_BACKEND_API_KEY` | API key sent with every backend call | Required |
//! | `PROFILE_TABLE` | Table receiving profile mirror rows | `profiles` |
//! | `BACKEND_TIMEOUT_SECS` | Timeout of a single backend call | `10` |
//! | `TOKEN_CACHE_TTL_SECS` | Validated-token cache TTL (`0` disables) | `0` |
//! | `TOKEN_CACHE_CAPACITY` | Maximum cached tokens | `1024` |
//! | `TLS_CERT_PATH` | PEM certificate chain (enables HTTPS with `TLS_KEY_PATH`) | Optional |
//! | `TLS_KEY_PATH` | PEM private key | Optional |
//! | `CORS_ALLOWED_ORIGINS` | Comma-separated allowed origins | Permissive |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::{
    net::SocketAddr,
    num::NonZeroUsize,
    path::PathBuf,
    time::Duration,
};

use url::Url;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const BACKEND_URL_ENV: &str = "IDENTITY_BACKEND_URL";
pub const BACKEND_API_KEY_ENV: &str = "IDENTITY_BACKEND_API_KEY";
pub const PROFILE_TABLE_ENV: &str = "PROFILE_TABLE";
pub const BACKEND_TIMEOUT_ENV: &str = "BACKEND_TIMEOUT_SECS";
pub const TOKEN_CACHE_TTL_ENV: &str = "TOKEN_CACHE_TTL_SECS";
pub const TOKEN_CACHE_CAPACITY_ENV: &str = "TOKEN_CACHE_CAPACITY";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const CORS_ALLOWED_ORIGINS_ENV: &str = "CORS_ALLOWED_ORIGINS";

/// Logging format selector, read by the telemetry setup.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_PROFILE_TABLE: &str = "profiles";
const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 10;
const DEFAULT_TOKEN_CACHE_CAPACITY: usize = 1024;

/// Configuration error. Aborts startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {name}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Connection settings for the identity backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL, always ending in `/` so endpoint paths can be joined.
    pub url: Url,
    pub api_key: String,
    pub profile_table: String,
    pub timeout: Duration,
}

/// Certificate and key for serving HTTPS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub backend: BackendConfig,
    /// Zero disables the validated-token cache.
    pub token_cache_ttl: Duration,
    pub token_cache_capacity: NonZeroUsize,
    pub tls: Option<TlsPaths>,
    /// Empty means any origin is allowed.
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &'static str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = var(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or(PORT_ENV, var(PORT_ENV), DEFAULT_PORT)?;

        let url_value = var(BACKEND_URL_ENV).ok_or(ConfigError::Missing(BACKEND_URL_ENV))?;
        let url = parse_backend_url(&url_value)?;
        let api_key = var(BACKEND_API_KEY_ENV).ok_or(ConfigError::Missing(BACKEND_API_KEY_ENV))?;
        let profile_table =
            var(PROFILE_TABLE_ENV).unwrap_or_else(|| DEFAULT_PROFILE_TABLE.to_string());
        let timeout_secs = parse_or(
            BACKEND_TIMEOUT_ENV,
            var(BACKEND_TIMEOUT_ENV),
            DEFAULT_BACKEND_TIMEOUT_SECS,
        )?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: BACKEND_TIMEOUT_ENV,
                value: "0".to_string(),
                reason: "timeout must be at least one second".to_string(),
            });
        }

        let token_cache_ttl = Duration::from_secs(parse_or(
            TOKEN_CACHE_TTL_ENV,
            var(TOKEN_CACHE_TTL_ENV),
            0u64,
        )?);
        let capacity = parse_or(
            TOKEN_CACHE_CAPACITY_ENV,
            var(TOKEN_CACHE_CAPACITY_ENV),
            DEFAULT_TOKEN_CACHE_CAPACITY,
        )?;
        let token_cache_capacity = NonZeroUsize::new(capacity).ok_or(ConfigError::Invalid {
            name: TOKEN_CACHE_CAPACITY_ENV,
            value: capacity.to_string(),
            reason: "capacity must be positive".to_string(),
        })?;

        let tls = match (var(TLS_CERT_PATH_ENV), var(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: PathBuf::from(cert),
                key: PathBuf::from(key),
            }),
            (None, None) => None,
            (Some(value), None) | (None, Some(value)) => {
                return Err(ConfigError::Invalid {
                    name: TLS_CERT_PATH_ENV,
                    value,
                    reason: format!("{TLS_CERT_PATH_ENV} and {TLS_KEY_PATH_ENV} must be set together"),
                })
            }
        };

        let cors_allowed_origins = var(CORS_ALLOWED_ORIGINS_ENV)
            .map(|origins| {
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            host,
            port,
            backend: BackendConfig {
                url,
                api_key,
                profile_table,
                timeout: Duration::from_secs(timeout_secs),
            },
            token_cache_ttl,
            token_cache_capacity,
            tls,
            cors_allowed_origins,
        })
    }

    /// Socket address the server binds to.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: HOST_ENV,
                value: self.host.clone(),
                reason: e.to_string(),
            })
    }
}

fn parse_or<T>(name: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

fn parse_backend_url(value: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        name: BACKEND_URL_ENV,
        value: value.to_string(),
        reason,
    };

    let mut url = Url::parse(value.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https".to_string()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [
        (BACKEND_URL_ENV, "https://project.example.co"),
        (BACKEND_API_KEY_ENV, "anon-key"),
    ];

    #[test]
    fn defaults_apply_when_only_required_vars_set() {
        let config = load(&REQUIRED).expect("config loads");
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.backend.url.as_str(), "https://project.example.co/");
        assert_eq!(config.backend.profile_table, "profiles");
        assert_eq!(config.backend.timeout, Duration::from_secs(10));
        assert_eq!(config.token_cache_ttl, Duration::ZERO);
        assert!(config.tls.is_none());
        assert!(config.cors_allowed_origins.is_empty());
    }

    #[test]
    fn missing_backend_url_is_reported() {
        let err = load(&[(BACKEND_API_KEY_ENV, "anon-key")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(BACKEND_URL_ENV)));
    }

    #[test]
    fn invalid_port_is_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push((PORT_ENV, "eighty"));
        assert!(matches!(
            load(&vars),
            Err(ConfigError::Invalid { name: PORT_ENV, .. })
        ));
    }

    #[test]
    fn backend_url_path_gets_trailing_slash() {
        let mut vars = vec![(BACKEND_API_KEY_ENV, "anon-key")];
        vars.push((BACKEND_URL_ENV, "http://localhost:54321/gateway"));
        let config = load(&vars).unwrap();
        assert_eq!(config.backend.url.as_str(), "http://localhost:54321/gateway/");
        assert_eq!(
            config.backend.url.join("auth/v1/user").unwrap().as_str(),
            "http://localhost:54321/gateway/auth/v1/user"
        );
    }

    #[test]
    fn non_http_backend_url_is_rejected() {
        let vars = [
            (BACKEND_URL_ENV, "ftp://example.com"),
            (BACKEND_API_KEY_ENV, "anon-key"),
        ];
        assert!(matches!(load(&vars), Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn tls_requires_both_paths() {
        let mut vars = REQUIRED.to_vec();
        vars.push((TLS_CERT_PATH_ENV, "/etc/tls/cert.pem"));
        assert!(load(&vars).is_err());

        vars.push((TLS_KEY_PATH_ENV, "/etc/tls/key.pem"));
        let config = load(&vars).unwrap();
        assert_eq!(
            config.tls,
            Some(TlsPaths {
                cert: PathBuf::from("/etc/tls/cert.pem"),
                key: PathBuf::from("/etc/tls/key.pem"),
            })
        );
    }

    #[test]
    fn cors_origins_are_split_and_trimmed() {
        let mut vars = REQUIRED.to_vec();
        vars.push((CORS_ALLOWED_ORIGINS_ENV, "https://app.example.com, http://localhost:3000,"));
        let config = load(&vars).unwrap();
        assert_eq!(
            config.cors_allowed_origins,
            vec!["https://app.example.com", "http://localhost:3000"]
        );
    }

    #[test]
    fn zero_cache_capacity_is_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push((TOKEN_CACHE_CAPACITY_ENV, "0"));
        assert!(load(&vars).is_err());
    }

    #[test]
    fn bind_addr_combines_host_and_port() {
        let mut vars = REQUIRED.to_vec();
        vars.push((HOST_ENV, "127.0.0.1"));
        vars.push((PORT_ENV, "3000"));
        let config = load(&vars).unwrap();
        assert_eq!(config.bind_addr().unwrap(), "127.0.0.1:3000".parse::<SocketAddr>().unwrap());
    }
}
