//! Shared utilities and common types for the SmartRent OTP engine
//!
//! This crate provides common functionality used across all engine crates:
//! - Configuration types (OTP policy, rate limits, cache, providers, logging)
//! - Utility functions (phone formatting and masking)

pub mod config;
pub mod utils;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, CacheConfig, ConfigError, Environment, LogFormat, LoggingConfig, OtpConfig,
    ProviderKind, ProvidersConfig, RateLimitConfig, RateLimitFailurePolicy, StoreType, TwilioConfig,
    ZaloConfig,
};
pub use utils::phone;
