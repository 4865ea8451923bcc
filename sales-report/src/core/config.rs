//! Process configuration
//!
//! # Environment variables
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | ENVIRONMENT | development | development, staging or production |
//! | LOG_LEVEL | info | tracing filter when RUST_LOG is unset |
//! | LOG_JSON | false | JSON console output |
//! | LOG_DIR | (unset) | daily-rotated application logs |
//! | MOYSKLAD_API_BASE_URL | https://api.moysklad.ru/api/remap/1.2 | upstream API root |
//! | REQUEST_TIMEOUT_SECS | 30 | per-request upstream timeout |
//! | PAGE_LIMIT | 1000 | listing page size (capped at 100 when expanding) |
//! | FANOUT_CONCURRENCY | 3 | parallel fetches per interactive request |
//! | DATABASE_URL | sqlite://data/bot_database.db | subscriber registry |
//! | ENCRYPTION_KEY | (required) | base64 32-byte credential master key |
//! | BOT_TOKEN | (required) | delivery channel credential |
//! | SCHEDULER_TIMEZONE | Europe/Moscow | zone cron expressions fire in |
//! | DAILY_CRON | 0 0 9 * * * | daily report |
//! | WEEKLY_CRON | 0 5 9 * * Mon | weekly report |
//! | MONTHLY_CRON | 0 1 9 1 * * | monthly report |
//! | DELIVERY_INTERVAL_MS | 500 | minimum gap between tenant deliveries |
//! | SCHEDULER_TICK_SECS | 30 | how often due jobs are checked |

use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;
use sklad_client::ClientConfig;
use thiserror::Error;

/// Configuration loading failure
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be set in {environment} environment")]
    MissingSecret { name: String, environment: String },

    #[error("{name} has an invalid value: {reason}")]
    Invalid { name: String, reason: String },
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// development | staging | production
    pub environment: String,
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,

    // === Upstream ===
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub page_limit: u32,
    /// Bounded worker pool size for interactive fan-out
    pub fanout_concurrency: usize,

    // === Dispatcher collaborators ===
    pub database_url: String,
    /// Base64 master key for stored credentials
    pub encryption_key: String,
    pub bot_token: String,

    // === Scheduler ===
    pub timezone: Tz,
    pub daily_cron: String,
    pub weekly_cron: String,
    pub monthly_cron: String,
    pub delivery_interval: Duration,
    pub scheduler_tick: Duration,
}

impl Config {
    /// Load `.env` (if present), then read the environment
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv()
            && !e.not_found()
        {
            return Err(ConfigError::Invalid {
                name: ".env".into(),
                reason: e.to_string(),
            });
        }
        Self::from_env()
    }

    /// Require a secret: must be set and non-empty outside development
    fn require_secret(name: &str, environment: &str) -> Result<String, ConfigError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(ConfigError::MissingSecret {
                        name: name.into(),
                        environment: environment.into(),
                    });
                }
                String::new()
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(ConfigError::MissingSecret {
                name: name.into(),
                environment: environment.into(),
            });
        }
        Ok(val)
    }

    /// Read configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let timezone_name =
            std::env::var("SCHEDULER_TIMEZONE").unwrap_or_else(|_| "Europe/Moscow".into());
        let timezone = Tz::from_str(&timezone_name).map_err(|e| ConfigError::Invalid {
            name: "SCHEDULER_TIMEZONE".into(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: parse_or("LOG_JSON", false),
            log_dir: std::env::var("LOG_DIR").ok().filter(|s| !s.is_empty()),
            api_base_url: std::env::var("MOYSKLAD_API_BASE_URL")
                .unwrap_or_else(|_| sklad_client::config::DEFAULT_BASE_URL.into()),
            request_timeout_secs: parse_or("REQUEST_TIMEOUT_SECS", 30),
            page_limit: parse_or("PAGE_LIMIT", 1000),
            fanout_concurrency: parse_or::<usize>("FANOUT_CONCURRENCY", 3).max(1),
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://data/bot_database.db".into()),
            encryption_key: Self::require_secret("ENCRYPTION_KEY", &environment)?,
            bot_token: Self::require_secret("BOT_TOKEN", &environment)?,
            timezone,
            daily_cron: std::env::var("DAILY_CRON").unwrap_or_else(|_| "0 0 9 * * *".into()),
            weekly_cron: std::env::var("WEEKLY_CRON").unwrap_or_else(|_| "0 5 9 * * Mon".into()),
            monthly_cron: std::env::var("MONTHLY_CRON").unwrap_or_else(|_| "0 1 9 1 * *".into()),
            delivery_interval: Duration::from_millis(parse_or("DELIVERY_INTERVAL_MS", 500)),
            scheduler_tick: Duration::from_secs(parse_or::<u64>("SCHEDULER_TICK_SECS", 30).max(1)),
            environment,
        })
    }

    /// Upstream client settings shared by every per-tenant client
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.api_base_url.clone())
            .with_timeout(self.request_timeout_secs)
            .with_page_limit(self.page_limit)
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

fn parse_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
