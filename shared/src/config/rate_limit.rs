//! Rate limiting configuration module

use serde::{Deserialize, Serialize};

use super::cache::env_or;

/// What to do when the counter backend cannot be reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitFailurePolicy {
    /// Deny the send (safe default)
    #[default]
    Closed,
    /// Admit the send and log a warning
    Open,
}

impl std::str::FromStr for RateLimitFailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "closed" | "fail-closed" | "deny" => Ok(RateLimitFailurePolicy::Closed),
            "open" | "fail-open" | "allow" => Ok(RateLimitFailurePolicy::Open),
            _ => Err(format!("Invalid rate limit failure policy: {}", s)),
        }
    }
}

/// Send quotas per phone number and per client IP
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Max sends per phone number inside one window
    #[serde(default = "default_per_phone")]
    pub max_sends_per_phone: u32,

    /// Max sends per client IP inside one window
    #[serde(default = "default_per_ip")]
    pub max_sends_per_ip: u32,

    /// Fixed window length in seconds
    #[serde(default = "default_window")]
    pub window_seconds: u64,

    #[serde(default)]
    pub failure_policy: RateLimitFailurePolicy,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            max_sends_per_phone: default_per_phone(),
            max_sends_per_ip: default_per_ip(),
            window_seconds: default_window(),
            failure_policy: RateLimitFailurePolicy::default(),
        }
    }
}

impl RateLimitConfig {
    /// Relaxed limits for local development
    pub fn development() -> Self {
        Self {
            max_sends_per_phone: 50,
            max_sends_per_ip: 200,
            ..Default::default()
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: env_or("OTP_RATE_LIMIT_ENABLED", defaults.enabled),
            max_sends_per_phone: env_or("OTP_RATE_LIMIT_PER_PHONE", defaults.max_sends_per_phone),
            max_sends_per_ip: env_or("OTP_RATE_LIMIT_PER_IP", defaults.max_sends_per_ip),
            window_seconds: env_or("OTP_RATE_LIMIT_WINDOW_SECONDS", defaults.window_seconds),
            failure_policy: env_or("OTP_RATE_LIMIT_FAILURE_POLICY", defaults.failure_policy),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_per_phone() -> u32 {
    5
}

fn default_per_ip() -> u32 {
    20
}

fn default_window() -> u64 {
    3600 // 1 hour
}
