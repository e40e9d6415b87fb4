use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub settings: SettingsApiConfig,
    pub schedule: ScheduleConfig,
    pub push: PushConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub api_port: u16,
}

/// Connection details for the settings/subscription API that owns the
/// durable preference store. This engine only reads profiles and marks
/// endpoints removed; it never writes preference data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Cadence of the full tear-down/rebuild reconciliation pass.
    pub full_reconcile_secs: u64,
    /// Cadence of the water-only reconciliation pass.
    pub water_reconcile_secs: u64,
    /// Zone used when a profile has no parseable timezone.
    pub default_timezone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    pub ttl_secs: u64,
    pub timeout_secs: u64,
    /// Consecutive ambiguous-404 responses before an endpoint is treated
    /// as permanently gone.
    pub transient_removal_threshold: u32,
}

impl Config {
    pub fn from_env() -> Self {
        let _ = dotenv::dotenv();

        Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                api_port: env::var("API_PORT")
                    .or_else(|_| env::var("PORT"))
                    .unwrap_or_else(|_| "8080".to_string())
                    .parse()
                    .unwrap_or(8080),
            },
            settings: SettingsApiConfig {
                base_url: env::var("SETTINGS_API_URL")
                    .unwrap_or_else(|_| "http://localhost:3000/api".to_string()),
                timeout_secs: env::var("SETTINGS_API_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
            },
            schedule: ScheduleConfig {
                full_reconcile_secs: env::var("FULL_RECONCILE_SECS")
                    .unwrap_or_else(|_| "3600".to_string())
                    .parse()
                    .unwrap_or(3600),
                water_reconcile_secs: env::var("WATER_RECONCILE_SECS")
                    .unwrap_or_else(|_| "1800".to_string())
                    .parse()
                    .unwrap_or(1800),
                default_timezone: env::var("DEFAULT_TIMEZONE")
                    .unwrap_or_else(|_| "UTC".to_string()),
            },
            push: PushConfig {
                ttl_secs: env::var("PUSH_TTL_SECS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .unwrap_or(60),
                timeout_secs: env::var("PUSH_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .unwrap_or(10),
                transient_removal_threshold: env::var("TRANSIENT_REMOVAL_THRESHOLD")
                    .unwrap_or_else(|_| "3".to_string())
                    .parse()
                    .unwrap_or(3),
            },
        }
    }
}
