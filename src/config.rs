use std::env;
use std::fmt;
use std::str::FromStr;

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. When unset the in-memory store is used.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub server_port: u16,
    pub server_host: String,
    /// HMAC secret for session tokens.
    pub jwt_secret: String,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
    pub bcrypt_cost: u32,
    pub store_timeout_secs: u64,
    pub cors_allowed_origins: Vec<String>,
}

/// A configuration problem that prevents the server from starting.
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid { key, value } => {
                write!(f, "{} has an invalid value: {:?}", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let jwt_secret = env::var("JWT_SECRET")
            .ok()
            .filter(|secret| !secret.trim().is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let bcrypt_cost = parse_or("BCRYPT_COST", bcrypt::DEFAULT_COST)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                key: "BCRYPT_COST",
                value: bcrypt_cost.to_string(),
            });
        }

        Ok(Self {
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 10)?,
            server_port: parse_or("SERVER_PORT", 8080)?,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            jwt_secret,
            access_token_ttl_secs: parse_ttl("ACCESS_TOKEN_TTL_SECS", 60 * 60 * 24)?,
            refresh_token_ttl_secs: parse_ttl("REFRESH_TOKEN_TTL_SECS", 60 * 60 * 24 * 7)?,
            bcrypt_cost,
            store_timeout_secs: parse_or("STORE_TIMEOUT_SECS", 5)?,
            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:3000".to_string())
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
        })
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}

/// Longest accepted token lifetime: ten years.
const MAX_TTL_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// Token lifetimes must be positive and small enough to add to any timestamp.
fn parse_ttl(key: &'static str, default: i64) -> Result<i64, ConfigError> {
    let ttl = parse_or(key, default)?;
    if !(1..=MAX_TTL_SECS).contains(&ttl) {
        return Err(ConfigError::Invalid {
            key,
            value: ttl.to_string(),
        });
    }
    Ok(ttl)
}
