//! OTP record store on top of a [`KeyValueStore`]
//!
//! Records are stored as JSON under `otp:{phone}:{request_id}` with a TTL
//! equal to their remaining lifetime. Updates keep the original absolute
//! expiry and never recreate a record that is already gone.
//!
//! Verification attempts are counted with an atomic increment on a sibling
//! key, `otp:{phone}:{request_id}:attempts`, so concurrent guesses each
//! claim a distinct attempt. The counter outlives a deleted record until
//! the record's own deadline.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

use otp_core::domain::entities::OtpRecord;
use otp_core::errors::{OtpError, OtpResult};
use otp_core::services::otp::OtpStore;
use otp_shared::phone::mask_phone_number;

use super::namespaced;
use super::store::KeyValueStore;

/// Key prefix for OTP records
const OTP_KEY_PREFIX: &str = "otp";

/// Suffix of the per-challenge attempt counter
const ATTEMPTS_SUFFIX: &str = "attempts";

/// [`OtpStore`] over any key-value backend
pub struct CacheOtpStore {
    backend: Arc<dyn KeyValueStore>,
    key_prefix: Option<String>,
}

impl CacheOtpStore {
    pub fn new(backend: Arc<dyn KeyValueStore>, key_prefix: Option<String>) -> Self {
        Self {
            backend,
            key_prefix,
        }
    }

    /// Format the key for one challenge
    pub fn record_key(&self, phone: &str, request_id: &str) -> String {
        namespaced(
            self.key_prefix.as_deref(),
            format!("{}:{}:{}", OTP_KEY_PREFIX, phone, request_id),
        )
    }

    /// Format the attempt counter key for one challenge
    pub fn attempts_key(&self, phone: &str, request_id: &str) -> String {
        format!("{}:{}", self.record_key(phone, request_id), ATTEMPTS_SUFFIX)
    }

    /// The stored record without counted attempts folded in
    async fn load(&self, phone: &str, request_id: &str) -> OtpResult<Option<OtpRecord>> {
        let key = self.record_key(phone, request_id);

        let Some(value) = self.backend.get(&key).await? else {
            return Ok(None);
        };

        let record: OtpRecord = serde_json::from_str(&value).map_err(|e| {
            error!(
                phone = %mask_phone_number(phone),
                request_id = %request_id,
                error = %e,
                "Stored OTP record is corrupt"
            );
            OtpError::store_unavailable(format!("Corrupt OTP record: {}", e))
        })?;

        // the backend TTL is coarser than the record's own deadline
        if record.is_expired() {
            return Ok(None);
        }
        Ok(Some(record))
    }

    async fn counted_attempts(&self, phone: &str, request_id: &str) -> OtpResult<u32> {
        let key = self.attempts_key(phone, request_id);
        Ok(self
            .backend
            .get(&key)
            .await?
            .and_then(|count| count.parse::<u32>().ok())
            .unwrap_or(0))
    }

    fn encode(record: &OtpRecord) -> OtpResult<String> {
        serde_json::to_string(record).map_err(|e| {
            error!(error = %e, "Failed to serialize OTP record");
            OtpError::store_unavailable(format!("Failed to serialize OTP record: {}", e))
        })
    }
}

#[async_trait]
impl OtpStore for CacheOtpStore {
    async fn create(&self, record: &OtpRecord, ttl_seconds: u64) -> OtpResult<bool> {
        let key = self.record_key(&record.phone, &record.request_id);
        let value = Self::encode(record)?;

        let created = self
            .backend
            .set_if_absent(&key, &value, Duration::from_secs(ttl_seconds))
            .await
            .map_err(|e| {
                error!(
                    phone = %mask_phone_number(&record.phone),
                    request_id = %record.request_id,
                    backend = self.backend.backend_name(),
                    error = %e,
                    "Failed to store OTP record"
                );
                OtpError::from(e)
            })?;

        debug!(
            phone = %mask_phone_number(&record.phone),
            request_id = %record.request_id,
            created = created,
            "Stored OTP record"
        );
        Ok(created)
    }

    async fn get(&self, phone: &str, request_id: &str) -> OtpResult<Option<OtpRecord>> {
        let Some(mut record) = self.load(phone, request_id).await? else {
            return Ok(None);
        };
        let counted = self.counted_attempts(phone, request_id).await?;
        record.attempts = record.attempts.saturating_add(counted);
        Ok(Some(record))
    }

    async fn update(&self, record: &OtpRecord) -> OtpResult<bool> {
        let remaining = record.remaining_ttl().num_milliseconds();
        if remaining <= 0 {
            return Ok(false);
        }

        // attempts already on the counter are not written twice
        let counted = self
            .counted_attempts(&record.phone, &record.request_id)
            .await?;
        let mut stored = record.clone();
        stored.attempts = record.attempts.saturating_sub(counted);

        let key = self.record_key(&record.phone, &record.request_id);
        let value = Self::encode(&stored)?;

        Ok(self
            .backend
            .replace(&key, &value, Duration::from_millis(remaining as u64))
            .await?)
    }

    async fn record_attempt(&self, phone: &str, request_id: &str) -> OtpResult<Option<u32>> {
        let Some(record) = self.load(phone, request_id).await? else {
            return Ok(None);
        };
        let remaining = record.remaining_ttl().num_milliseconds();
        if remaining <= 0 {
            return Ok(None);
        }

        let count = self
            .backend
            .increment_with_window(
                &self.attempts_key(phone, request_id),
                Duration::from_millis(remaining as u64),
            )
            .await?;
        let count = u32::try_from(count).unwrap_or(u32::MAX);

        debug!(
            phone = %mask_phone_number(phone),
            request_id = %request_id,
            attempt = count,
            "Counted verification attempt"
        );
        Ok(Some(record.attempts.saturating_add(count)))
    }

    async fn delete(&self, phone: &str, request_id: &str) -> OtpResult<bool> {
        let key = self.record_key(phone, request_id);
        Ok(self.backend.delete(&key).await?)
    }

    async fn exists(&self, phone: &str, request_id: &str) -> OtpResult<bool> {
        Ok(self.get(phone, request_id).await?.is_some())
    }
}
