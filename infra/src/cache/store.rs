use async_trait::async_trait;
use std::time::Duration;

use crate::InfrastructureError;

/// Minimal key-value operations the OTP store and rate limiter need
///
/// Every write carries a TTL; backends must never return a value past its
/// expiry, even if they reclaim the memory later.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Write `value` only if `key` is absent. `Ok(false)` when it exists.
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, InfrastructureError>;

    /// Overwrite `value` only if `key` still exists. `Ok(false)` otherwise.
    async fn replace(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, InfrastructureError>;

    async fn get(&self, key: &str) -> Result<Option<String>, InfrastructureError>;

    /// `Ok(true)` if the key existed
    async fn delete(&self, key: &str) -> Result<bool, InfrastructureError>;

    /// Atomically increment a counter and return the new value
    ///
    /// The first increment of a fresh counter starts a window of `window`;
    /// later increments leave the expiry alone.
    async fn increment_with_window(
        &self,
        key: &str,
        window: Duration,
    ) -> Result<u64, InfrastructureError>;

    /// Short name for logs ("redis", "memory")
    fn backend_name(&self) -> &'static str;
}
