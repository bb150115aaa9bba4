use std::{env, fmt::Display, fs::read_to_string, str::FromStr};

use tracing::{info, warn};

use crate::error::ConfigError;

pub struct Config {
    pub port: u16,
    pub redis_url: Option<String>,
    pub meili_url: Option<String>,
    pub meili_key: Option<String>,
    pub jwt_secret: String,
    pub webhook_secret: String,
    pub token_ttl_hours: i64,
    pub cookie_secure: bool,
    pub cors_origin: String,
    pub mail_relay_url: Option<String>,
    pub mail_from: String,
    pub whoami_url: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            port: try_load("RUST_PORT", "8080")?,
            redis_url: optional("REDIS_URL"),
            meili_url: optional("MEILI_URL"),
            meili_key: read_secret("MEILI_ADMIN_KEY").ok(),
            jwt_secret: read_secret("JWT_SECRET")?,
            webhook_secret: read_secret("WEBHOOK_SECRET")?,
            token_ttl_hours: try_load("TOKEN_TTL_HOURS", "168")?,
            cookie_secure: try_load("COOKIE_SECURE", "false")?,
            cors_origin: try_load("CORS_ORIGIN", "http://localhost:5173")?,
            mail_relay_url: optional("MAIL_RELAY_URL"),
            mail_from: try_load("MAIL_FROM", "orders@feast.local")?,
            whoami_url: optional("GATE_WHOAMI_URL"),
        })
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn optional(key: &str) -> Option<String> {
    let value = var(key);

    if value.is_none() {
        info!("{key} not set, feature disabled");
    }

    value
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse::<T>()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
            ConfigError::Invalid {
                key: key.to_string(),
                reason: e.to_string(),
            }
        })
}

/// Docker secrets first, then a plain environment variable of the same name.
pub fn read_secret(secret_name: &str) -> Result<String, ConfigError> {
    let path = format!("/run/secrets/{secret_name}");

    match read_to_string(&path) {
        Ok(secret) if !secret.trim().is_empty() => return Ok(secret.trim().to_string()),
        Ok(_) => warn!("Secret file {path} is empty"),
        Err(e) => info!("Failed to read {secret_name} from file: {e}, trying environment"),
    }

    var(secret_name).ok_or_else(|| ConfigError::MissingSecret(secret_name.to_string()))
}
