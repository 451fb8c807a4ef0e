//! OTP issuance and verification policy

use serde::{Deserialize, Serialize};

use super::cache::env_or;

/// Longest lifetime accepted for an issued code (one day)
pub const MAX_TTL_SECONDS: u64 = 86_400;

/// Backend holding OTP records and rate limit counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreType {
    /// Shared Redis instance (multi-instance deployments)
    Redis,
    /// Process-local map (single instance / development only)
    Memory,
}

impl std::str::FromStr for StoreType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "redis" => Ok(StoreType::Redis),
            "memory" | "in-memory" | "inmemory" => Ok(StoreType::Memory),
            _ => Err(format!("Invalid OTP store type: {}", s)),
        }
    }
}

/// OTP policy settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OtpConfig {
    /// Number of digits in a generated code
    #[serde(default = "default_code_length")]
    pub code_length: usize,

    /// Lifetime of an issued code in seconds
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,

    /// Wrong guesses allowed before the challenge is destroyed
    #[serde(default = "default_max_attempts")]
    pub max_verification_attempts: u32,

    /// bcrypt work factor used when hashing codes
    #[serde(default = "default_hash_cost")]
    pub hash_cost: u32,

    #[serde(default = "default_store")]
    pub store: StoreType,

    /// Interval of the expired-record sweep (memory store only)
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,

    /// ISO region codes whose numbers may receive codes
    #[serde(default = "default_allowed_regions")]
    pub allowed_regions: Vec<String>,

    /// Region assumed for numbers written without a country code
    #[serde(default = "default_region")]
    pub default_region: String,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            code_length: default_code_length(),
            ttl_seconds: default_ttl_seconds(),
            max_verification_attempts: default_max_attempts(),
            hash_cost: default_hash_cost(),
            store: default_store(),
            sweep_interval_seconds: default_sweep_interval(),
            allowed_regions: default_allowed_regions(),
            default_region: default_region(),
        }
    }
}

impl OtpConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            code_length: env_or("OTP_CODE_LENGTH", defaults.code_length),
            ttl_seconds: env_or("OTP_TTL_SECONDS", defaults.ttl_seconds),
            max_verification_attempts: env_or("OTP_MAX_ATTEMPTS", defaults.max_verification_attempts),
            hash_cost: env_or("OTP_HASH_COST", defaults.hash_cost),
            store: env_or("OTP_STORE_TYPE", defaults.store),
            sweep_interval_seconds: env_or("OTP_SWEEP_INTERVAL_SECONDS", defaults.sweep_interval_seconds),
            allowed_regions: std::env::var("OTP_ALLOWED_REGIONS")
                .map(|v| {
                    v.split(',')
                        .map(|r| r.trim().to_uppercase())
                        .filter(|r| !r.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.allowed_regions),
            default_region: std::env::var("OTP_DEFAULT_REGION").unwrap_or(defaults.default_region),
        }
    }

    /// Whole minutes a code stays valid, as shown in message templates
    pub fn expiry_minutes(&self) -> u64 {
        (self.ttl_seconds / 60).max(1)
    }
}

fn default_code_length() -> usize {
    6
}

fn default_ttl_seconds() -> u64 {
    300 // 5 minutes
}

fn default_max_attempts() -> u32 {
    5
}

fn default_hash_cost() -> u32 {
    10
}

fn default_store() -> StoreType {
    StoreType::Redis
}

fn default_sweep_interval() -> u64 {
    60
}

fn default_allowed_regions() -> Vec<String> {
    vec![String::from("VN")]
}

fn default_region() -> String {
    String::from("VN")
}
