//! Configuration for the OTP service

use otp_shared::config::{OtpConfig, ProvidersConfig};

use super::code::clamp_code_length;

/// Policy applied by [`super::OtpService`]
#[derive(Debug, Clone)]
pub struct OtpServiceConfig {
    /// Number of digits in a code, clamped to the supported range
    pub code_length: usize,
    /// Seconds a code stays valid
    pub ttl_seconds: u64,
    /// Wrong guesses allowed per challenge
    pub max_attempts: u32,
    /// bcrypt cost
    pub hash_cost: u32,
    /// Product name passed to message templates
    pub app_name: Option<String>,
}

impl OtpServiceConfig {
    pub fn from_configs(otp: &OtpConfig, providers: &ProvidersConfig) -> Self {
        Self {
            app_name: Some(providers.zalo.app_name.clone()),
            ..Self::from(otp)
        }
    }

    pub fn expiry_minutes(&self) -> u64 {
        (self.ttl_seconds / 60).max(1)
    }
}

impl From<&OtpConfig> for OtpServiceConfig {
    fn from(config: &OtpConfig) -> Self {
        Self {
            code_length: clamp_code_length(config.code_length),
            ttl_seconds: config.ttl_seconds,
            max_attempts: config.max_verification_attempts,
            hash_cost: config.hash_cost,
            app_name: None,
        }
    }
}

impl Default for OtpServiceConfig {
    fn default() -> Self {
        Self::from_configs(&OtpConfig::default(), &ProvidersConfig::default())
    }
}
