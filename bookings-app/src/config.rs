//! Configuration loading from environment.

use std::env;

/// Application configuration.
///
/// Loaded once at startup and passed explicitly to the components that
/// need it; nothing reads the environment after this point. The gateway
/// key pair is loaded separately by `RazorpayConfig::from_env`.
pub struct Config {
    pub port: u16,
    pub database_url: String,
    /// Shared secret the gateway signs webhook bodies with.
    pub webhook_secret: String,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()?;

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let webhook_secret = env::var("RAZORPAY_WEBHOOK_SECRET").map_err(|_| {
            anyhow::anyhow!("RAZORPAY_WEBHOOK_SECRET environment variable is required")
        })?;

        Ok(Self {
            port,
            database_url,
            webhook_secret,
        })
    }
}
