//! Configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string. When unset the service
//!   runs on the in-memory store and loses all data on exit.
//! - `HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 8080)
//! - `SHOP_CURRENCY` - Currency for seeded products and empty carts (default: JPY)
//! - `DATABASE_MAX_CONNECTIONS` - Pool size (default: 10)
//! - `RUST_LOG` - Tracing filter (default: info)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    Invalid(String, String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub host: IpAddr,
    pub port: u16,
    pub currency: String,
    pub database_max_connections: u32,
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let currency = lookup("SHOP_CURRENCY").unwrap_or_else(|| "JPY".to_string());
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ConfigError::Invalid("SHOP_CURRENCY".into(), format!("{currency:?} is not a currency code")));
        }
        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            host: parse_or(&lookup, "HOST", IpAddr::from([0, 0, 0, 0]))?,
            port: parse_or(&lookup, "PORT", 8080)?,
            currency: currency.to_ascii_uppercase(),
            database_max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr { SocketAddr::new(self.host, self.port) }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid(key.to_string(), e.to_string())),
        None => Ok(default),
    }
}
