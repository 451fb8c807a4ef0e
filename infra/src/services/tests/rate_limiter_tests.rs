use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use otp_core::errors::{OtpError, RateLimitScope};
use otp_core::services::otp::RateLimiter;
use otp_shared::config::{RateLimitConfig, RateLimitFailurePolicy};

use crate::cache::{KeyValueStore, MemoryStore};
use crate::services::CacheRateLimiter;
use crate::InfrastructureError;

const PHONE: &str = "+84912345678";

fn config(per_phone: u32, per_ip: u32) -> RateLimitConfig {
    RateLimitConfig {
        enabled: true,
        max_sends_per_phone: per_phone,
        max_sends_per_ip: per_ip,
        window_seconds: 3600,
        failure_policy: RateLimitFailurePolicy::Closed,
    }
}

fn limiter(config: RateLimitConfig) -> CacheRateLimiter {
    CacheRateLimiter::new(Arc::new(MemoryStore::new()), config, None)
}

struct UnreachableBackend;

#[async_trait]
impl KeyValueStore for UnreachableBackend {
    async fn set_if_absent(&self, _: &str, _: &str, _: Duration) -> Result<bool, InfrastructureError> {
        Err(InfrastructureError::Timeout("unreachable".to_string()))
    }

    async fn replace(&self, _: &str, _: &str, _: Duration) -> Result<bool, InfrastructureError> {
        Err(InfrastructureError::Timeout("unreachable".to_string()))
    }

    async fn get(&self, _: &str) -> Result<Option<String>, InfrastructureError> {
        Err(InfrastructureError::Timeout("unreachable".to_string()))
    }

    async fn delete(&self, _: &str) -> Result<bool, InfrastructureError> {
        Err(InfrastructureError::Timeout("unreachable".to_string()))
    }

    async fn increment_with_window(&self, _: &str, _: Duration) -> Result<u64, InfrastructureError> {
        Err(InfrastructureError::Timeout("unreachable".to_string()))
    }

    fn backend_name(&self) -> &'static str {
        "unreachable"
    }
}

#[tokio::test]
async fn test_phone_limit_allows_up_to_ceiling() {
    let limiter = limiter(config(3, 100));

    for _ in 0..3 {
        assert!(limiter.check_phone_limit(PHONE).await.is_ok());
    }

    let result = limiter.check_phone_limit(PHONE).await;
    assert_eq!(
        result,
        Err(OtpError::RateLimitExceeded {
            scope: RateLimitScope::Phone,
            window_seconds: 3600,
        })
    );
}

#[tokio::test]
async fn test_phone_limits_are_independent() {
    let limiter = limiter(config(1, 100));

    assert!(limiter.check_phone_limit(PHONE).await.is_ok());
    assert!(limiter.check_phone_limit(PHONE).await.is_err());
    assert!(limiter.check_phone_limit("+84987654321").await.is_ok());
}

#[tokio::test]
async fn test_ip_limit() {
    let limiter = limiter(config(100, 2));

    assert!(limiter.check_ip_limit("10.0.0.1").await.is_ok());
    assert!(limiter.check_ip_limit("10.0.0.1").await.is_ok());

    let result = limiter.check_ip_limit("10.0.0.1").await;
    assert!(matches!(
        result,
        Err(OtpError::RateLimitExceeded {
            scope: RateLimitScope::Ip,
            ..
        })
    ));
    assert!(limiter.check_ip_limit("10.0.0.2").await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_window_resets_after_expiry() {
    let limiter = limiter(RateLimitConfig {
        window_seconds: 60,
        ..config(1, 100)
    });

    assert!(limiter.check_phone_limit(PHONE).await.is_ok());
    assert!(limiter.check_phone_limit(PHONE).await.is_err());

    tokio::time::advance(Duration::from_secs(61)).await;
    assert!(limiter.check_phone_limit(PHONE).await.is_ok());
}

#[tokio::test]
async fn test_concurrent_checks_admit_exactly_the_ceiling() {
    let limiter = Arc::new(limiter(config(5, 100)));

    let tasks: Vec<_> = (0..20)
        .map(|_| {
            let limiter = limiter.clone();
            tokio::spawn(async move { limiter.check_phone_limit(PHONE).await.is_ok() })
        })
        .collect();

    let mut admitted = 0;
    for task in tasks {
        if task.await.unwrap() {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 5);
}

#[tokio::test]
async fn test_disabled_limiter_admits_everything() {
    let limiter = limiter(RateLimitConfig {
        enabled: false,
        ..config(1, 1)
    });

    for _ in 0..10 {
        assert!(limiter.check_phone_limit(PHONE).await.is_ok());
        assert!(limiter.check_ip_limit("10.0.0.1").await.is_ok());
    }
}

#[tokio::test]
async fn test_backend_failure_closed_denies() {
    let limiter = CacheRateLimiter::new(Arc::new(UnreachableBackend), config(5, 5), None);

    let result = limiter.check_phone_limit(PHONE).await;
    assert!(matches!(result, Err(OtpError::StoreUnavailable { .. })));
}

#[tokio::test]
async fn test_backend_failure_open_admits() {
    let limiter = CacheRateLimiter::new(
        Arc::new(UnreachableBackend),
        RateLimitConfig {
            failure_policy: RateLimitFailurePolicy::Open,
            ..config(5, 5)
        },
        None,
    );

    assert!(limiter.check_phone_limit(PHONE).await.is_ok());
    assert!(limiter.check_ip_limit("10.0.0.1").await.is_ok());
}

#[tokio::test]
async fn test_remaining_and_reset() {
    let limiter = limiter(config(5, 100));

    assert_eq!(limiter.remaining_phone_sends(PHONE).await.unwrap(), 5);
    limiter.check_phone_limit(PHONE).await.unwrap();
    limiter.check_phone_limit(PHONE).await.unwrap();
    assert_eq!(limiter.remaining_phone_sends(PHONE).await.unwrap(), 3);

    assert!(limiter.reset_phone_limit(PHONE).await.unwrap());
    assert_eq!(limiter.remaining_phone_sends(PHONE).await.unwrap(), 5);

    limiter.check_ip_limit("10.0.0.1").await.unwrap();
    assert_eq!(limiter.remaining_ip_sends("10.0.0.1").await.unwrap(), 99);
    assert!(limiter.reset_ip_limit("10.0.0.1").await.unwrap());
    assert!(!limiter.reset_ip_limit("10.0.0.1").await.unwrap());
}

#[tokio::test]
async fn test_key_prefix_is_applied() {
    let backend = MemoryStore::new();
    let limiter = CacheRateLimiter::new(
        Arc::new(backend.clone()),
        config(5, 5),
        Some("staging".to_string()),
    );

    limiter.check_phone_limit(PHONE).await.unwrap();

    let raw = backend.get("staging:ratelimit:phone:+84912345678").await.unwrap();
    assert_eq!(raw, Some("1".to_string()));
}
