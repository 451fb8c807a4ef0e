//! Operational counters for sends, verifications and provider fallbacks
//!
//! Counters live in process and are also emitted as `tracing` events with a
//! `metric` field so a log pipeline can aggregate them.

use std::sync::atomic::{AtomicU64, Ordering};

pub const SEND_SUCCESS: &str = "otp.send.success";
pub const SEND_FAILURE: &str = "otp.send.failure";
pub const VERIFY_SUCCESS: &str = "otp.verify.success";
pub const VERIFY_FAILURE: &str = "otp.verify.failure";
pub const FALLBACK: &str = "otp.fallback";

/// Point-in-time copy of [`OtpMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub send_success: u64,
    pub send_failure: u64,
    pub verify_success: u64,
    pub verify_failure: u64,
    pub fallback: u64,
}

/// Monotonic counters shared by the service and the provider registry
#[derive(Debug, Default)]
pub struct OtpMetrics {
    send_success: AtomicU64,
    send_failure: AtomicU64,
    verify_success: AtomicU64,
    verify_failure: AtomicU64,
    fallback: AtomicU64,
}

impl OtpMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_send_success(&self) {
        Self::bump(&self.send_success, SEND_SUCCESS);
    }

    pub fn record_send_failure(&self) {
        Self::bump(&self.send_failure, SEND_FAILURE);
    }

    pub fn record_verify_success(&self) {
        Self::bump(&self.verify_success, VERIFY_SUCCESS);
    }

    pub fn record_verify_failure(&self) {
        Self::bump(&self.verify_failure, VERIFY_FAILURE);
    }

    /// A provider failed and the registry moved on to the next candidate
    pub fn record_fallback(&self) {
        Self::bump(&self.fallback, FALLBACK);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            send_success: self.send_success.load(Ordering::SeqCst),
            send_failure: self.send_failure.load(Ordering::SeqCst),
            verify_success: self.verify_success.load(Ordering::SeqCst),
            verify_failure: self.verify_failure.load(Ordering::SeqCst),
            fallback: self.fallback.load(Ordering::SeqCst),
        }
    }

    fn bump(counter: &AtomicU64, name: &'static str) {
        let total = counter.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::debug!(metric = name, total = total, "counter incremented");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_independent() {
        let metrics = OtpMetrics::new();
        metrics.record_send_success();
        metrics.record_send_success();
        metrics.record_verify_failure();
        metrics.record_fallback();

        assert_eq!(
            metrics.snapshot(),
            MetricsSnapshot {
                send_success: 2,
                send_failure: 0,
                verify_success: 0,
                verify_failure: 1,
                fallback: 1,
            }
        );
    }
}
