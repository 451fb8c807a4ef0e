//! # Infrastructure Layer
//!
//! Concrete implementations of the collaborators the OTP core reaches
//! through traits.
//!
//! ## Architecture
//!
//! The infrastructure layer contains:
//! - **Cache**: Redis and in-memory key-value backends plus the OTP record store
//! - **Services**: Fixed-window send quotas and phone number parsing
//! - **Providers**: Zalo ZNS, Twilio SMS and a logging provider
//! - **Bootstrap**: Wiring everything from an [`otp_shared::AppConfig`]
//!
//! ## Features
//!
//! - `redis-cache`: Enable the Redis backend (default)
//! - `twilio-sms`: Enable the Twilio SMS provider (default)

use otp_core::errors::OtpError;

pub mod bootstrap;
pub mod cache;
pub mod providers;
pub mod services;
pub mod settings;
pub mod telemetry;

pub use bootstrap::{build_otp_service, EngineService, OtpEngine};

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Redis cache error
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// HTTP request error for external services
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Stored value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Backend did not answer within its deadline
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Delivery provider error
    #[error("Provider error: {0}")]
    Provider(String),
}

impl From<InfrastructureError> for OtpError {
    fn from(err: InfrastructureError) -> Self {
        OtpError::store_unavailable(err.to_string())
    }
}

impl From<config::ConfigError> for InfrastructureError {
    fn from(err: config::ConfigError) -> Self {
        InfrastructureError::Config(err.to_string())
    }
}

impl From<otp_shared::ConfigError> for InfrastructureError {
    fn from(err: otp_shared::ConfigError) -> Self {
        InfrastructureError::Config(err.to_string())
    }
}
