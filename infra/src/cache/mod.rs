//! Cache module for OTP records and rate limit counters
//!
//! A small key-value contract with two backends: Redis for shared
//! deployments and an in-process map for development and tests. The OTP
//! record store is written once against the contract.

mod memory_store;
mod otp_store;
#[cfg(feature = "redis-cache")]
pub mod redis_store;
mod store;

#[cfg(test)]
mod tests;

pub use memory_store::{MemoryStore, SweeperHandle};
pub use otp_store::CacheOtpStore;
#[cfg(feature = "redis-cache")]
pub use redis_store::RedisStore;
pub use store::KeyValueStore;

// Re-export commonly used types
pub use otp_shared::config::CacheConfig;

/// Apply an optional namespace to a key (`prefix:key`)
pub(crate) fn namespaced(prefix: Option<&str>, key: String) -> String {
    match prefix {
        Some(prefix) => format!("{}:{}", prefix, key),
        None => key,
    }
}
