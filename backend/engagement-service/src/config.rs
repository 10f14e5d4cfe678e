/// Configuration management for Engagement Service
///
/// Loads configuration from environment variables (`.env` is read by main).
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::services::NotificationSettings;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub store: StoreConfig,
    /// Database configuration, present for the postgres backend
    pub database: Option<DatabaseConfig>,
    pub auth: AuthConfig,
    pub notifications: NotificationConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (dev, staging, prod)
    pub env: String,
    pub host: String,
    pub http_port: u16,
    /// `json` switches the log output to JSON lines
    pub log_format: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => bail!("unsupported STORE_BACKEND: {}", other),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 secret shared with the identity service
    #[serde(skip_serializing)]
    pub jwt_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_dedup_window_hours")]
    pub dedup_window_hours: i64,
    #[serde(default = "default_excerpt_length")]
    pub excerpt_length: usize,
}

/// Dedup windows longer than a year are treated as misconfiguration
const MAX_DEDUP_WINDOW_HOURS: i64 = 24 * 365;

impl NotificationConfig {
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_DEDUP_WINDOW_HOURS).contains(&self.dedup_window_hours) {
            bail!(
                "NOTIFICATION_DEDUP_WINDOW_HOURS must be between 1 and {}, got {}",
                MAX_DEDUP_WINDOW_HOURS,
                self.dedup_window_hours
            );
        }
        if self.excerpt_length == 0 {
            bail!("NOTIFICATION_EXCERPT_LENGTH must be positive");
        }
        Ok(())
    }

    pub fn settings(&self) -> NotificationSettings {
        NotificationSettings {
            dedup_window: chrono::Duration::hours(self.dedup_window_hours),
            excerpt_length: self.excerpt_length,
        }
    }
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

fn default_dedup_window_hours() -> i64 {
    24
}

fn default_excerpt_length() -> usize {
    50
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let app = AppConfig {
            env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: env_or("PORT", 8010),
            log_format: std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string()),
        };

        let backend = match std::env::var("STORE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => StoreBackend::Postgres,
        };

        let database = match backend {
            StoreBackend::Postgres => Some(DatabaseConfig {
                url: std::env::var("DATABASE_URL")
                    .context("DATABASE_URL environment variable not set")?,
                max_connections: env_or("DB_MAX_CONNECTIONS", default_max_connections()),
                min_connections: env_or("DB_MIN_CONNECTIONS", default_min_connections()),
            }),
            StoreBackend::Memory => None,
        };

        let jwt_secret =
            std::env::var("JWT_SECRET").context("JWT_SECRET environment variable not set")?;
        if jwt_secret.trim().is_empty() {
            bail!("JWT_SECRET must not be empty");
        }

        let notifications = NotificationConfig {
            dedup_window_hours: env_or(
                "NOTIFICATION_DEDUP_WINDOW_HOURS",
                default_dedup_window_hours(),
            ),
            excerpt_length: env_or("NOTIFICATION_EXCERPT_LENGTH", default_excerpt_length()),
        };
        notifications.validate()?;

        Ok(Config {
            app,
            store: StoreConfig { backend },
            database,
            auth: AuthConfig { jwt_secret },
            notifications,
        })
    }
}
