use std::fmt::Display;
use std::str::FromStr;

use thiserror::Error;

use crate::models::{
    AuthConfig, Config, CorsConfig, DatabaseConfig, RevocationConfig, ServerConfig,
};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DATABASE_URL: &str = "sqlite:taskhub.db";
const DEFAULT_TOKEN_TTL_SECS: i64 = 86_400; // 24 hours
const DEFAULT_REVOCATION_CAPACITY: usize = 10_000;
const DEFAULT_REVOCATION_HASHES: u32 = 3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

impl Config {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary lookup function. Keeps the
    /// parsing/validation logic testable without mutating process state.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let host = lookup("TASKHUB_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_or("TASKHUB_PORT", &lookup, DEFAULT_PORT)?;

        let database_url =
            lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

        let jwt_secret = lookup("JWT_SECRET")
            .filter(|secret| !secret.trim().is_empty())
            .ok_or(ConfigError::MissingVar("JWT_SECRET"))?;
        let token_ttl_secs = parse_or("TOKEN_TTL_SECS", &lookup, DEFAULT_TOKEN_TTL_SECS)?;
        if token_ttl_secs <= 0 {
            return Err(ConfigError::Invalid {
                var: "TOKEN_TTL_SECS",
                reason: "must be positive".to_string(),
            });
        }

        let capacity_hint =
            parse_or("REVOCATION_CAPACITY", &lookup, DEFAULT_REVOCATION_CAPACITY)?;
        let hash_count = parse_or("REVOCATION_HASHES", &lookup, DEFAULT_REVOCATION_HASHES)?;
        if capacity_hint == 0 {
            return Err(ConfigError::Invalid {
                var: "REVOCATION_CAPACITY",
                reason: "must be non-zero".to_string(),
            });
        }
        if hash_count == 0 {
            return Err(ConfigError::Invalid {
                var: "REVOCATION_HASHES",
                reason: "must be non-zero".to_string(),
            });
        }

        let allowed_origins = lookup("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Config {
            server: ServerConfig { host, port },
            database: DatabaseConfig { url: database_url },
            auth: AuthConfig {
                jwt_secret,
                token_ttl_secs,
            },
            revocation: RevocationConfig {
                capacity_hint,
                hash_count,
            },
            cors: CorsConfig { allowed_origins },
        })
    }
}

fn parse_or<T>(
    var: &'static str,
    lookup: impl Fn(&str) -> Option<String>,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<T>().map_err(|err| ConfigError::Invalid {
            var,
            reason: err.to_string(),
        }),
    }
}
