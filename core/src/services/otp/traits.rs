//! Traits for storage, rate limiting and phone parsing collaborators

use async_trait::async_trait;

use crate::domain::entities::OtpRecord;
use crate::errors::OtpResult;

/// Persistence of OTP records keyed by `(phone, request_id)`
///
/// Backend failures surface as `OtpError::StoreUnavailable`, never as an
/// empty result.
#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Insert if absent; `Ok(false)` when the key already exists
    async fn create(&self, record: &OtpRecord, ttl_seconds: u64) -> OtpResult<bool>;

    /// `None` when absent or past `expires_at`
    async fn get(&self, phone: &str, request_id: &str) -> OtpResult<Option<OtpRecord>>;

    /// Replace the record, keeping its original absolute expiry.
    /// `Ok(false)` when it expired in the meantime.
    async fn update(&self, record: &OtpRecord) -> OtpResult<bool>;

    /// Atomically count one verification attempt against the challenge
    ///
    /// Returns the attempt total including this one, or `None` when the
    /// challenge no longer exists. Concurrent callers each observe a
    /// distinct total.
    async fn record_attempt(&self, phone: &str, request_id: &str) -> OtpResult<Option<u32>>;

    async fn delete(&self, phone: &str, request_id: &str) -> OtpResult<bool>;

    async fn exists(&self, phone: &str, request_id: &str) -> OtpResult<bool>;
}

/// Send quotas checked before any provider is contacted
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Count one send for `phone`; `RateLimitExceeded` once over the ceiling
    async fn check_phone_limit(&self, phone: &str) -> OtpResult<()>;

    /// Count one send for `ip`; `RateLimitExceeded` once over the ceiling
    async fn check_ip_limit(&self, ip: &str) -> OtpResult<()>;
}

/// Validates a raw phone number and returns it in E.164 form
pub trait PhoneNormalizer: Send + Sync {
    /// `InvalidPhone` or `UnsupportedRegion` on rejection
    fn normalize(&self, raw: &str) -> OtpResult<String>;
}
