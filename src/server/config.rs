use axum::http::HeaderValue;
use std::env;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_ALLOWED_ORIGINS: &str =
    "http://localhost:3000,https://retailpulse-frontend.vercel.app";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {key}: {details}")]
    InvalidValue {
        key: String,
        value: String,
        details: String,
    },

    #[error("Invalid listen address '{0}'")]
    InvalidAddress(String),
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<HeaderValue>,
    pub max_upload_bytes: usize,
    pub request_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            allowed_origins: DEFAULT_ALLOWED_ORIGINS
                .split(',')
                .map(HeaderValue::from_static)
                .collect(),
            max_upload_bytes: 10 * 1024 * 1024,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ServerConfig {
    /// Reads `HOST`, `PORT`, `RETAIL_PULSE_ALLOWED_ORIGINS`,
    /// `RETAIL_PULSE_MAX_UPLOAD_BYTES` and `RETAIL_PULSE_REQUEST_TIMEOUT_SECS`.
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let host = lookup("HOST").unwrap_or(defaults.host);
        let port = parse_var(&lookup, "PORT")?.unwrap_or(defaults.port);
        let max_upload_bytes =
            parse_var(&lookup, "RETAIL_PULSE_MAX_UPLOAD_BYTES")?.unwrap_or(defaults.max_upload_bytes);
        let request_timeout = parse_var::<u64, _>(&lookup, "RETAIL_PULSE_REQUEST_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        let allowed_origins = match lookup("RETAIL_PULSE_ALLOWED_ORIGINS") {
            Some(raw) => parse_origins(&raw)?,
            None => defaults.allowed_origins,
        };

        if max_upload_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "RETAIL_PULSE_MAX_UPLOAD_BYTES".to_string(),
                value: "0".to_string(),
                details: "must be greater than zero".to_string(),
            });
        }

        if request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                key: "RETAIL_PULSE_REQUEST_TIMEOUT_SECS".to_string(),
                value: "0".to_string(),
                details: "must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            host,
            port,
            allowed_origins,
            max_upload_bytes,
            request_timeout,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ConfigError::InvalidAddress(addr))
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };

    raw.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.clone(),
            details: e.to_string(),
        })
}

fn parse_origins(raw: &str) -> Result<Vec<HeaderValue>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(|origin| {
            HeaderValue::from_str(origin).map_err(|e| ConfigError::InvalidValue {
                key: "RETAIL_PULSE_ALLOWED_ORIGINS".to_string(),
                value: origin.to_string(),
                details: e.to_string(),
            })
        })
        .collect()
}
