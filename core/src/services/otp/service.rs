//! Main OTP service implementation

use std::sync::Arc;
use uuid::Uuid;

use otp_shared::phone::{is_e164, mask_phone_number};

use crate::domain::entities::{OtpChannel, OtpRecord, OtpState};
use crate::errors::{OtpError, OtpResult};
use crate::services::metrics::OtpMetrics;
use crate::services::provider::{ProviderRegistry, TemplateContext};

use super::code::{clamp_code_length, generate_code, hash_code, is_well_formed, verify_code};
use super::config::OtpServiceConfig;
use super::traits::{OtpStore, PhoneNormalizer, RateLimiter};
use super::types::{SendOtpResult, VerifyOtpResult};

/// Orchestrates issuance and verification of one-time passcodes
pub struct OtpService<S: OtpStore, L: RateLimiter, N: PhoneNormalizer> {
    /// Record persistence
    store: Arc<S>,
    /// Per-phone and per-IP send quotas
    rate_limiter: Arc<L>,
    /// Raw input to E.164
    normalizer: Arc<N>,
    /// Delivery providers with failover
    providers: Arc<ProviderRegistry>,
    /// Shared with the registry
    metrics: Arc<OtpMetrics>,
    config: OtpServiceConfig,
}

impl<S: OtpStore, L: RateLimiter, N: PhoneNormalizer> OtpService<S, L, N> {
    pub fn new(
        store: Arc<S>,
        rate_limiter: Arc<L>,
        normalizer: Arc<N>,
        providers: Arc<ProviderRegistry>,
        mut config: OtpServiceConfig,
    ) -> Self {
        config.code_length = clamp_code_length(config.code_length);
        let metrics = providers.metrics();
        Self {
            store,
            rate_limiter,
            normalizer,
            providers,
            metrics,
            config,
        }
    }

    pub fn config(&self) -> &OtpServiceConfig {
        &self.config
    }

    /// Send, verify and fallback counters
    pub fn metrics(&self) -> Arc<OtpMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Send a code to `phone` using the configured provider order
    ///
    /// `ip` is the client address; when absent only the phone quota applies.
    pub async fn send_otp(&self, phone: &str, ip: Option<&str>) -> OtpResult<SendOtpResult> {
        self.send_otp_with_channels(phone, ip, &[]).await
    }

    /// Send a code, trying providers for `preferred` channels first
    ///
    /// This method:
    /// 1. Normalizes the phone number
    /// 2. Counts the send against the phone quota, then the IP quota
    /// 3. Generates and hashes a new code
    /// 4. Delivers it through the provider registry
    /// 5. Persists the hashed record only after a provider accepted it
    pub async fn send_otp_with_channels(
        &self,
        phone: &str,
        ip: Option<&str>,
        preferred: &[OtpChannel],
    ) -> OtpResult<SendOtpResult> {
        let phone = self.normalize(phone)?;

        self.rate_limiter.check_phone_limit(&phone).await?;
        if let Some(ip) = ip.map(str::trim).filter(|ip| !ip.is_empty()) {
            self.rate_limiter.check_ip_limit(ip).await?;
        }

        let result = self.issue(phone, preferred).await;
        match &result {
            Ok(_) => self.metrics.record_send_success(),
            Err(_) => self.metrics.record_send_failure(),
        }
        result
    }

    /// Generate, deliver and persist a code for an already admitted send
    async fn issue(&self, phone: String, preferred: &[OtpChannel]) -> OtpResult<SendOtpResult> {
        let masked = mask_phone_number(&phone);

        let code = generate_code(self.config.code_length);
        let hashed = self.hash_off_thread(code.clone()).await?;
        let request_id = Uuid::new_v4().to_string();

        tracing::info!(
            phone = %masked,
            request_id = %request_id,
            state = %OtpState::Pending,
            event = "otp_generated",
            "Generated new OTP"
        );

        let context = TemplateContext {
            request_id: request_id.clone(),
            expiry_minutes: self.config.expiry_minutes(),
            app_name: self.config.app_name.clone(),
        };
        let delivery = self
            .providers
            .send(&phone, &code, &context, preferred)
            .await?;

        let record = OtpRecord::new(
            phone.as_str(),
            request_id.as_str(),
            hashed,
            delivery.channel,
            self.config.ttl_seconds,
            self.config.max_attempts,
        );

        match self.store.create(&record, self.config.ttl_seconds).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::error!(
                    phone = %masked,
                    request_id = %request_id,
                    event = "otp_duplicate_request",
                    "OTP record already exists for request id"
                );
                return Err(OtpError::DuplicateRequest);
            }
            Err(e) => {
                tracing::error!(
                    phone = %masked,
                    request_id = %request_id,
                    error = %e,
                    event = "otp_storage_failed",
                    "Failed to persist OTP record after delivery"
                );
                return Err(e);
            }
        }

        tracing::info!(
            phone = %masked,
            request_id = %request_id,
            channel = %delivery.channel,
            provider = %delivery.provider,
            state = %OtpState::Issued,
            event = "otp_sent",
            "OTP issued"
        );

        Ok(SendOtpResult {
            request_id,
            channel: delivery.channel,
            ttl_seconds: self.config.ttl_seconds,
            masked_phone: masked,
        })
    }

    /// Verify `code` for the challenge `(phone, request_id)`
    ///
    /// A match consumes the challenge. A miss costs one attempt; the miss
    /// that reaches the ceiling destroys the challenge and reports zero
    /// remaining attempts, after which the challenge is `NotFound`.
    ///
    /// The attempt is claimed in the store before the hash comparison, so
    /// concurrent guesses never evaluate more than `max_attempts` codes.
    pub async fn verify_otp(
        &self,
        phone: &str,
        request_id: &str,
        code: &str,
    ) -> OtpResult<VerifyOtpResult> {
        let phone = self.normalize(phone)?;

        let result = self.check(&phone, request_id, code).await;
        match &result {
            Ok(outcome) if outcome.verified => self.metrics.record_verify_success(),
            _ => self.metrics.record_verify_failure(),
        }
        result
    }

    async fn check(&self, phone: &str, request_id: &str, code: &str) -> OtpResult<VerifyOtpResult> {
        let masked = mask_phone_number(phone);

        let record = match self.store.get(phone, request_id).await? {
            Some(record) => record,
            None => {
                tracing::warn!(
                    phone = %masked,
                    request_id = %request_id,
                    event = "otp_not_found",
                    "OTP not found or expired"
                );
                return Err(OtpError::NotFound);
            }
        };

        match record.state() {
            OtpState::Issued => {}
            OtpState::Exhausted => return self.reject_exhausted(phone, request_id, &masked).await,
            OtpState::Expired | OtpState::Verified | OtpState::Pending => {
                self.store.delete(phone, request_id).await?;
                return Err(OtpError::NotFound);
            }
        }

        let max_attempts = record.max_attempts;
        let attempt = match self.store.record_attempt(phone, request_id).await? {
            Some(attempt) => attempt,
            None => return Err(OtpError::NotFound),
        };
        if attempt > max_attempts {
            return self.reject_exhausted(phone, request_id, &masked).await;
        }

        let matches = is_well_formed(code, self.config.code_length)
            && self
                .verify_off_thread(code.to_string(), record.hashed_code.clone())
                .await;

        if matches {
            // only the caller that actually removes the record wins
            if !self.store.delete(phone, request_id).await? {
                return Err(OtpError::NotFound);
            }
            tracing::info!(
                phone = %masked,
                request_id = %request_id,
                channel = %record.channel,
                state = %OtpState::Verified,
                event = "otp_verified_success",
                "OTP verified"
            );
            // the successful attempt itself is not a spent guess
            return Ok(VerifyOtpResult {
                verified: true,
                remaining_attempts: max_attempts.saturating_sub(attempt.saturating_sub(1)),
            });
        }

        let remaining = max_attempts.saturating_sub(attempt);
        if remaining == 0 {
            self.store.delete(phone, request_id).await?;
            tracing::warn!(
                phone = %masked,
                request_id = %request_id,
                state = %OtpState::Exhausted,
                event = "otp_max_attempts_exceeded",
                "Maximum verification attempts reached, OTP destroyed"
            );
        } else {
            tracing::warn!(
                phone = %masked,
                request_id = %request_id,
                remaining_attempts = remaining,
                event = "otp_verification_failed",
                "Wrong OTP code"
            );
        }

        Ok(VerifyOtpResult {
            verified: false,
            remaining_attempts: remaining,
        })
    }

    async fn reject_exhausted(
        &self,
        phone: &str,
        request_id: &str,
        masked: &str,
    ) -> OtpResult<VerifyOtpResult> {
        self.store.delete(phone, request_id).await?;
        tracing::warn!(
            phone = %masked,
            request_id = %request_id,
            state = %OtpState::Exhausted,
            event = "otp_max_attempts_exceeded",
            "Verification attempted on exhausted OTP"
        );
        Err(OtpError::AttemptsExceeded)
    }

    /// Withdraw an outstanding challenge
    ///
    /// Returns `false` when no such challenge exists.
    pub async fn cancel_otp(&self, phone: &str, request_id: &str) -> OtpResult<bool> {
        let phone = self.normalize(phone)?;
        let removed = self.store.delete(&phone, request_id).await?;

        tracing::info!(
            phone = %mask_phone_number(&phone),
            request_id = %request_id,
            removed = removed,
            event = "otp_cancelled",
            "OTP cancelled"
        );
        Ok(removed)
    }

    /// Whether the challenge is still outstanding
    pub async fn is_pending(&self, phone: &str, request_id: &str) -> OtpResult<bool> {
        let phone = self.normalize(phone)?;
        self.store.exists(&phone, request_id).await
    }

    /// Normalize and hold the normalizer to its E.164 contract
    fn normalize(&self, raw: &str) -> OtpResult<String> {
        let phone = self.normalizer.normalize(raw)?;
        if !is_e164(&phone) {
            tracing::error!(
                phone = %mask_phone_number(&phone),
                "Phone normalizer returned a non E.164 number"
            );
            return Err(OtpError::InvalidPhone);
        }
        Ok(phone)
    }

    // bcrypt is deliberately slow; keep it off the async workers
    async fn hash_off_thread(&self, code: String) -> OtpResult<String> {
        let cost = self.config.hash_cost;
        tokio::task::spawn_blocking(move || hash_code(&code, cost))
            .await
            .map_err(|_| OtpError::HashingFailed)?
    }

    async fn verify_off_thread(&self, code: String, hashed: String) -> bool {
        tokio::task::spawn_blocking(move || verify_code(&code, &hashed))
            .await
            .unwrap_or(false)
    }
}
