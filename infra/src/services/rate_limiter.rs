//! Fixed-window send quotas on top of a [`KeyValueStore`]
//!
//! Each check increments the counter for its subject first and then
//! compares, so concurrent callers can never both see the last free slot.
//! The window starts with the first send and is not extended by later ones.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

use otp_core::errors::{OtpError, OtpResult, RateLimitScope};
use otp_core::services::otp::RateLimiter;
use otp_shared::config::{RateLimitConfig, RateLimitFailurePolicy};
use otp_shared::phone::mask_phone_number;

use crate::cache::{namespaced, KeyValueStore};

/// Key prefix for rate limit counters
const RATE_LIMIT_PREFIX: &str = "ratelimit";

/// [`RateLimiter`] counting sends per phone and per client IP
pub struct CacheRateLimiter {
    backend: Arc<dyn KeyValueStore>,
    config: RateLimitConfig,
    key_prefix: Option<String>,
}

impl CacheRateLimiter {
    pub fn new(
        backend: Arc<dyn KeyValueStore>,
        config: RateLimitConfig,
        key_prefix: Option<String>,
    ) -> Self {
        Self {
            backend,
            config,
            key_prefix,
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    fn counter_key(&self, scope: RateLimitScope, subject: &str) -> String {
        let scope = match scope {
            RateLimitScope::Phone => "phone",
            RateLimitScope::Ip => "ip",
        };
        namespaced(
            self.key_prefix.as_deref(),
            format!("{}:{}:{}", RATE_LIMIT_PREFIX, scope, subject),
        )
    }

    fn ceiling(&self, scope: RateLimitScope) -> u32 {
        match scope {
            RateLimitScope::Phone => self.config.max_sends_per_phone,
            RateLimitScope::Ip => self.config.max_sends_per_ip,
        }
    }

    /// Count one send and reject it if the window is already full
    async fn check(&self, scope: RateLimitScope, subject: &str, log_subject: &str) -> OtpResult<()> {
        if !self.config.enabled {
            return Ok(());
        }

        let key = self.counter_key(scope, subject);
        let window = Duration::from_secs(self.config.window_seconds);
        let ceiling = self.ceiling(scope);

        match self.backend.increment_with_window(&key, window).await {
            Ok(count) if count > u64::from(ceiling) => {
                warn!(
                    subject = %log_subject,
                    scope = %scope,
                    count = count,
                    limit = ceiling,
                    event = "otp_rate_limited",
                    "OTP send rate limit exceeded"
                );
                Err(OtpError::RateLimitExceeded {
                    scope,
                    window_seconds: self.config.window_seconds,
                })
            }
            Ok(_) => Ok(()),
            Err(e) => match self.config.failure_policy {
                RateLimitFailurePolicy::Closed => {
                    error!(
                        subject = %log_subject,
                        scope = %scope,
                        backend = self.backend.backend_name(),
                        error = %e,
                        "Rate limit backend unavailable, rejecting send"
                    );
                    Err(OtpError::from(e))
                }
                RateLimitFailurePolicy::Open => {
                    warn!(
                        subject = %log_subject,
                        scope = %scope,
                        backend = self.backend.backend_name(),
                        error = %e,
                        "Rate limit backend unavailable, allowing send"
                    );
                    Ok(())
                }
            },
        }
    }

    async fn remaining(&self, scope: RateLimitScope, subject: &str) -> OtpResult<u32> {
        let key = self.counter_key(scope, subject);
        let used = self
            .backend
            .get(&key)
            .await?
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(0);

        let left = u64::from(self.ceiling(scope)).saturating_sub(used);
        Ok(u32::try_from(left).unwrap_or(u32::MAX))
    }

    /// Sends left for `phone` in the current window
    pub async fn remaining_phone_sends(&self, phone: &str) -> OtpResult<u32> {
        self.remaining(RateLimitScope::Phone, phone).await
    }

    /// Sends left for `ip` in the current window
    pub async fn remaining_ip_sends(&self, ip: &str) -> OtpResult<u32> {
        self.remaining(RateLimitScope::Ip, ip).await
    }

    /// Clear the counter for `phone` (support tooling)
    pub async fn reset_phone_limit(&self, phone: &str) -> OtpResult<bool> {
        let key = self.counter_key(RateLimitScope::Phone, phone);
        Ok(self.backend.delete(&key).await?)
    }

    /// Clear the counter for `ip` (support tooling)
    pub async fn reset_ip_limit(&self, ip: &str) -> OtpResult<bool> {
        let key = self.counter_key(RateLimitScope::Ip, ip);
        Ok(self.backend.delete(&key).await?)
    }
}

#[async_trait]
impl RateLimiter for CacheRateLimiter {
    async fn check_phone_limit(&self, phone: &str) -> OtpResult<()> {
        self.check(RateLimitScope::Phone, phone, &mask_phone_number(phone))
            .await
    }

    async fn check_ip_limit(&self, ip: &str) -> OtpResult<()> {
        self.check(RateLimitScope::Ip, ip, ip).await
    }
}
