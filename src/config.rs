//! Configuration management for the Libris server

use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

/// Lending business rules
#[derive(Debug, Deserialize, Clone)]
pub struct LibraryConfig {
    /// Multiplier applied on top of the daily fee for overdue fines
    pub fine_multiplier: Decimal,
}

/// External payment gateway access
#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub secret_key: String,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
    pub timeout_secs: u64,
}

/// Notification webhook sink
#[derive(Debug, Deserialize, Clone)]
pub struct NotifierConfig {
    pub webhook_url: Option<String>,
    pub timeout_secs: u64,
}

/// Cadence of the background sweeps
#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerConfig {
    pub fine_sweep_interval_secs: u64,
    pub payment_expiry_interval_secs: u64,
    /// Pending payments older than this are expired by the cleanup sweep
    pub payment_retention_hours: i64,
    pub reminder_interval_secs: u64,
    /// Reminders cover borrowings due within this many days
    pub reminder_lead_days: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub library: LibraryConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub notifier: NotifierConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let config = Config::builder()
            // Start with default configuration
            .add_source(File::with_name("config/default"))
            // Layer on the environment-specific file
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add environment variables (with prefix LIBRIS_)
            .add_source(
                Environment::with_prefix("LIBRIS")
                    .separator("_")
                    .try_parsing(true),
            )
            // Override gateway secret from PAYMENT_GATEWAY_SECRET env var if present
            .set_override_option(
                "gateway.secret_key",
                env::var("PAYMENT_GATEWAY_SECRET").ok(),
            )?
            // Override notification webhook from NOTIFY_WEBHOOK_URL env var if present
            .set_override_option(
                "notifier.webhook_url",
                env::var("NOTIFY_WEBHOOK_URL").ok(),
            )?
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            fine_multiplier: Decimal::from(2),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://gateway.example.com".to_string(),
            secret_key: "change-this-secret-in-production".to_string(),
            currency: "usd".to_string(),
            success_url: "http://localhost:8080/api/v1/payments/success".to_string(),
            cancel_url: "http://localhost:8080/api/v1/payments/cancel".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: 5,
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            fine_sweep_interval_secs: 86_400,
            payment_expiry_interval_secs: 3_600,
            payment_retention_hours: 24,
            reminder_interval_secs: 86_400,
            reminder_lead_days: 2,
        }
    }
}
