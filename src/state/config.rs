use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_IP_HASH_SALT: &str = "qrgate_salt";

/// Runtime settings, read from the environment (and `.env` via dotenv).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub bind_address: String,
    pub mongodb_uri: String,
    pub mongodb_database: String,
    pub jwt_secret: String,
    pub geoip_url: Option<String>,
    pub geoip_timeout: Duration,
    pub ip_hash_salt: String,
    pub cors_origins: Vec<String>,
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let port = env::var("PORT")
            .context("PORT not set")?
            .parse::<u16>()
            .context("PORT is not a valid port number")?;
        let geoip_timeout_ms = optional("GEOIP_TIMEOUT_MS")
            .map(|v| v.parse::<u64>())
            .transpose()
            .context("GEOIP_TIMEOUT_MS is not a number")?
            .unwrap_or(1500);

        Ok(Self {
            port,
            bind_address: optional("BIND_ADDRESS").unwrap_or_else(|| "127.0.0.1".to_string()),
            mongodb_uri: env::var("MONGODB_URI").context("MONGODB_URI not set")?,
            mongodb_database: optional("MONGODB_DATABASE").unwrap_or_else(|| "qrgate".to_string()),
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET not set")?,
            geoip_url: optional("GEOIP_URL"),
            geoip_timeout: Duration::from_millis(geoip_timeout_ms),
            ip_hash_salt: optional("IP_HASH_SALT")
                .unwrap_or_else(|| DEFAULT_IP_HASH_SALT.to_string()),
            cors_origins: optional("CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_else(|| vec!["http://localhost:5173".to_string()]),
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            port: 0,
            bind_address: "127.0.0.1".to_string(),
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            mongodb_database: "qrgate_test".to_string(),
            jwt_secret: "test-secret".to_string(),
            geoip_url: None,
            geoip_timeout: Duration::from_millis(100),
            ip_hash_salt: DEFAULT_IP_HASH_SALT.to_string(),
            cors_origins: Vec::new(),
        }
    }
}
