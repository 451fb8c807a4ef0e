//! Configuration module with engine-specific sub-modules
//!
//! This module organizes configuration into logical areas:
//! - `cache` - Redis connection and key namespacing
//! - `environment` - Environment detection and logging configuration
//! - `otp` - Code length, TTL, attempt ceiling and store backend
//! - `providers` - Delivery vendors and failover policy
//! - `rate_limit` - Per-phone and per-IP send quotas

pub mod cache;
pub mod environment;
pub mod otp;
pub mod providers;
pub mod rate_limit;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// Re-export commonly used types
pub use cache::CacheConfig;
pub use environment::{Environment, LogFormat, LoggingConfig};
pub use otp::{OtpConfig, StoreType, MAX_TTL_SECONDS};
pub use providers::{ProviderKind, ProvidersConfig, TwilioConfig, ZaloConfig};
pub use rate_limit::{RateLimitConfig, RateLimitFailurePolicy};

/// Rejected configuration values
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("No OTP delivery provider configured")]
    NoProviders,
}

/// Complete engine configuration combining all sub-configurations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub environment: Environment,

    #[serde(default)]
    pub otp: OtpConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub providers: ProvidersConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let env = Environment::default();
        Self {
            environment: env,
            otp: OtpConfig::default(),
            rate_limit: RateLimitConfig::default(),
            cache: CacheConfig::default(),
            providers: ProvidersConfig::default(),
            logging: LoggingConfig::for_environment(env),
        }
    }
}

impl AppConfig {
    /// Create configuration for development environment
    ///
    /// Uses the in-memory store and the logging provider so the engine
    /// runs without Redis or vendor credentials.
    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            otp: OtpConfig {
                store: StoreType::Memory,
                ..Default::default()
            },
            rate_limit: RateLimitConfig::development(),
            cache: CacheConfig::default(),
            providers: ProvidersConfig::development(),
            logging: LoggingConfig::for_environment(Environment::Development),
        }
    }

    /// Create configuration for production environment
    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            otp: OtpConfig::default(),
            rate_limit: RateLimitConfig::default(),
            cache: CacheConfig::default(),
            providers: ProvidersConfig::default(),
            logging: LoggingConfig::for_environment(Environment::Production),
        }
    }

    /// Load configuration from `.env` files and process environment
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok(); // Load .env file if present
        let environment = Environment::from_env();
        dotenvy::from_filename(environment.env_file()).ok();

        Self {
            environment,
            otp: OtpConfig::from_env(),
            rate_limit: RateLimitConfig::from_env(),
            cache: CacheConfig::from_env(),
            providers: ProvidersConfig::from_env(),
            logging: LoggingConfig::from_env(environment),
        }
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(4..=10).contains(&self.otp.code_length) {
            return Err(ConfigError::InvalidValue {
                field: "otp.code_length",
                reason: format!("{} is outside 4..=10", self.otp.code_length),
            });
        }
        if self.otp.ttl_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "otp.ttl_seconds",
                reason: "must be positive".to_string(),
            });
        }
        if self.otp.ttl_seconds > MAX_TTL_SECONDS {
            return Err(ConfigError::InvalidValue {
                field: "otp.ttl_seconds",
                reason: format!("{} exceeds {}", self.otp.ttl_seconds, MAX_TTL_SECONDS),
            });
        }
        if self.otp.max_verification_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "otp.max_verification_attempts",
                reason: "must be positive".to_string(),
            });
        }
        // bcrypt accepts costs 4..=31
        if !(4..=31).contains(&self.otp.hash_cost) {
            return Err(ConfigError::InvalidValue {
                field: "otp.hash_cost",
                reason: format!("{} is outside 4..=31", self.otp.hash_cost),
            });
        }
        if self.otp.allowed_regions.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "otp.allowed_regions",
                reason: "at least one region is required".to_string(),
            });
        }
        if self.rate_limit.enabled {
            if self.rate_limit.max_sends_per_phone == 0 || self.rate_limit.max_sends_per_ip == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "rate_limit",
                    reason: "ceilings must be positive".to_string(),
                });
            }
            if self.rate_limit.window_seconds == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "rate_limit.window_seconds",
                    reason: "must be positive".to_string(),
                });
            }
        }
        if self.providers.order.is_empty() {
            return Err(ConfigError::NoProviders);
        }
        if self.providers.send_timeout_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "providers.send_timeout_seconds",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(AppConfig::default().validate().is_ok());
        assert!(AppConfig::development().validate().is_ok());
        assert!(AppConfig::production().validate().is_ok());
    }

    #[test]
    fn test_development_runs_without_infrastructure() {
        let config = AppConfig::development();
        assert_eq!(config.otp.store, StoreType::Memory);
        assert_eq!(config.providers.order, vec![ProviderKind::Mock]);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.otp.code_length = 3;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "otp.code_length", .. })
        ));

        let mut config = AppConfig::default();
        config.otp.ttl_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.otp.ttl_seconds = u64::MAX;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "otp.ttl_seconds", .. })
        ));

        let mut config = AppConfig::default();
        config.otp.ttl_seconds = MAX_TTL_SECONDS;
        assert!(config.validate().is_ok());

        let mut config = AppConfig::default();
        config.providers.order.clear();
        assert_eq!(config.validate(), Err(ConfigError::NoProviders));
    }

    #[test]
    fn test_disabled_rate_limit_skips_ceiling_checks() {
        let mut config = AppConfig::default();
        config.rate_limit.enabled = false;
        config.rate_limit.max_sends_per_phone = 0;
        assert!(config.validate().is_ok());
    }
}
