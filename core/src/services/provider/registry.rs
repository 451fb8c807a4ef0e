//! Ordered provider failover
//!
//! The registry holds providers in their configured priority order and
//! delivers a code through the first one that accepts it. Consecutive
//! failures trip a per-provider circuit so a dead vendor stops adding
//! latency to every send until its cooldown has passed.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{error, info, warn};

use otp_shared::config::ProvidersConfig;
use otp_shared::phone::mask_phone_number;

use crate::domain::entities::OtpChannel;
use crate::errors::{OtpError, OtpResult};
use crate::services::metrics::OtpMetrics;

use super::traits::{OtpProvider, ProviderFailure, ProviderReceipt, TemplateContext};

/// Upper bound for the retry backoff
const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Failover policy
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Extra attempts on the same provider after a retryable failure
    pub max_retries: u32,
    /// First backoff delay, doubled on each retry
    pub retry_backoff: Duration,
    /// Deadline for a single provider call
    pub send_timeout: Duration,
    /// Consecutive failed deliveries that trip the circuit (0 disables it)
    pub circuit_failure_threshold: u32,
    /// How long a tripped provider is skipped
    pub circuit_cooldown: Duration,
}

impl From<&ProvidersConfig> for RegistryConfig {
    fn from(config: &ProvidersConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
            send_timeout: Duration::from_secs(config.send_timeout_seconds),
            circuit_failure_threshold: config.circuit_failure_threshold,
            circuit_cooldown: Duration::from_secs(config.circuit_cooldown_seconds),
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self::from(&ProvidersConfig::default())
    }
}

/// Outcome of a successful delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub channel: OtpChannel,
    pub provider: String,
    pub message_id: String,
}

/// Circuit tracking for one provider
#[derive(Debug, Clone, Default)]
struct CircuitState {
    consecutive_failures: u32,
    opened_at: Option<Instant>,
}

/// Providers in priority order with failover between them
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn OtpProvider>>,
    circuits: RwLock<Vec<CircuitState>>,
    config: RegistryConfig,
    metrics: Arc<OtpMetrics>,
}

impl ProviderRegistry {
    pub fn new(providers: Vec<Arc<dyn OtpProvider>>, config: RegistryConfig) -> Self {
        Self::with_metrics(providers, config, Arc::new(OtpMetrics::new()))
    }

    /// Build a registry that reports into existing counters
    pub fn with_metrics(
        providers: Vec<Arc<dyn OtpProvider>>,
        config: RegistryConfig,
        metrics: Arc<OtpMetrics>,
    ) -> Self {
        let names: Vec<&str> = providers.iter().map(|p| p.name()).collect();
        info!(providers = ?names, "Initializing OTP provider registry");

        let circuits = RwLock::new(vec![CircuitState::default(); providers.len()]);
        Self {
            providers,
            circuits,
            config,
            metrics,
        }
    }

    /// Counters shared with the service using this registry
    pub fn metrics(&self) -> Arc<OtpMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Channels that currently have a configured provider, in priority order
    pub fn available_channels(&self) -> Vec<OtpChannel> {
        let mut channels = Vec::new();
        for provider in self.providers.iter().filter(|p| p.is_available()) {
            if !channels.contains(&provider.channel()) {
                channels.push(provider.channel());
            }
        }
        channels
    }

    /// Deliver `code` through the first provider that accepts it
    ///
    /// Providers for `preferred` channels are tried first (in the given
    /// order), then the remaining providers in configured order. Fails with
    /// `SendFailed` once every candidate has been exhausted.
    pub async fn send(
        &self,
        phone: &str,
        code: &str,
        context: &TemplateContext,
        preferred: &[OtpChannel],
    ) -> OtpResult<Delivery> {
        let masked = mask_phone_number(phone);

        let available: Vec<usize> = self
            .ordered_indices(preferred)
            .into_iter()
            .filter(|&idx| self.providers[idx].is_available())
            .collect();

        if available.is_empty() {
            error!(
                phone = %masked,
                request_id = %context.request_id,
                event = "otp_no_provider",
                "No OTP provider is configured"
            );
            return Err(OtpError::SendFailed);
        }

        let mut candidates = Vec::with_capacity(available.len());
        for &idx in &available {
            if self.is_circuit_open(idx).await {
                info!(
                    provider = self.providers[idx].name(),
                    "Skipping provider with open circuit"
                );
            } else {
                candidates.push(idx);
            }
        }
        if candidates.is_empty() {
            // every circuit is open; probing beats refusing outright
            warn!("All OTP provider circuits are open, trying them anyway");
            candidates = available;
        }

        let last = candidates.len() - 1;
        for (position, idx) in candidates.into_iter().enumerate() {
            let provider = &self.providers[idx];
            match self.send_with_retry(provider.as_ref(), phone, code, context).await {
                Ok(receipt) => {
                    self.record_success(idx).await;
                    info!(
                        phone = %masked,
                        request_id = %context.request_id,
                        provider = provider.name(),
                        channel = %provider.channel(),
                        message_id = %receipt.message_id,
                        event = "otp_delivered",
                        "OTP delivered"
                    );
                    return Ok(Delivery {
                        channel: provider.channel(),
                        provider: provider.name().to_string(),
                        message_id: receipt.message_id,
                    });
                }
                Err(failure) => {
                    self.record_failure(idx).await;
                    warn!(
                        phone = %masked,
                        request_id = %context.request_id,
                        provider = provider.name(),
                        failure_code = %failure.code,
                        retryable = failure.retryable,
                        event = "otp_provider_failed",
                        "OTP provider failed, moving to next provider"
                    );
                    if position < last {
                        self.metrics.record_fallback();
                    }
                }
            }
        }

        error!(
            phone = %masked,
            request_id = %context.request_id,
            event = "otp_send_failed",
            "All OTP providers failed"
        );
        Err(OtpError::SendFailed)
    }

    /// Provider indices with preferred channels first
    fn ordered_indices(&self, preferred: &[OtpChannel]) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.providers.len());
        for channel in preferred {
            for (idx, provider) in self.providers.iter().enumerate() {
                if provider.channel() == *channel && !order.contains(&idx) {
                    order.push(idx);
                }
            }
        }
        for idx in 0..self.providers.len() {
            if !order.contains(&idx) {
                order.push(idx);
            }
        }
        order
    }

    /// Call one provider, retrying retryable failures with backoff
    async fn send_with_retry(
        &self,
        provider: &dyn OtpProvider,
        phone: &str,
        code: &str,
        context: &TemplateContext,
    ) -> Result<ProviderReceipt, ProviderFailure> {
        let mut attempts = 0;
        let mut delay = self.config.retry_backoff;

        loop {
            attempts += 1;

            let result = match tokio::time::timeout(
                self.config.send_timeout,
                provider.send(phone, code, context),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(ProviderFailure::retryable(
                    "TIMEOUT",
                    format!("no response within {:?}", self.config.send_timeout),
                )),
            };

            match result {
                Ok(receipt) => return Ok(receipt),
                Err(failure) if failure.retryable && attempts <= self.config.max_retries => {
                    warn!(
                        provider = provider.name(),
                        failure_code = %failure.code,
                        attempt = attempts,
                        "Retryable provider failure, retrying in {:?}",
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(MAX_BACKOFF);
                }
                Err(failure) => return Err(failure),
            }
        }
    }

    async fn is_circuit_open(&self, idx: usize) -> bool {
        let circuits = self.circuits.read().await;
        match circuits[idx].opened_at {
            Some(opened_at) => opened_at.elapsed() < self.config.circuit_cooldown,
            None => false,
        }
    }

    async fn record_failure(&self, idx: usize) {
        if self.config.circuit_failure_threshold == 0 {
            return;
        }

        let mut circuits = self.circuits.write().await;
        let state = &mut circuits[idx];
        state.consecutive_failures += 1;

        if state.consecutive_failures >= self.config.circuit_failure_threshold {
            if state.opened_at.is_none() {
                warn!(
                    provider = self.providers[idx].name(),
                    failures = state.consecutive_failures,
                    "Opening circuit for failing OTP provider"
                );
            }
            state.opened_at = Some(Instant::now());
        }
    }

    async fn record_success(&self, idx: usize) {
        let mut circuits = self.circuits.write().await;
        let state = &mut circuits[idx];

        if state.opened_at.is_some() {
            info!(
                provider = self.providers[idx].name(),
                "OTP provider recovered, closing circuit"
            );
        }
        *state = CircuitState::default();
    }
}
