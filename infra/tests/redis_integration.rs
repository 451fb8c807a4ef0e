//! Integration tests for the Redis backend
//!
//! These tests require a running Redis instance to execute.
//! Run with: cargo test -p otp_infra --test redis_integration -- --ignored

#![cfg(feature = "redis-cache")]

use std::sync::Arc;
use std::time::Duration;

use otp_core::domain::entities::{OtpChannel, OtpRecord};
use otp_core::services::otp::OtpStore;
use otp_infra::cache::{CacheConfig, CacheOtpStore, KeyValueStore, RedisStore};
use uuid::Uuid;

fn config() -> CacheConfig {
    CacheConfig {
        url: std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string()),
        ..Default::default()
    }
}

fn unique_key(name: &str) -> String {
    format!("otp-test:{}:{}", name, Uuid::new_v4())
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_redis_connection() {
    let store = RedisStore::new(config()).await.unwrap();
    assert!(store.health_check().await.unwrap());
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_set_if_absent_and_replace() {
    let store = RedisStore::new(config()).await.unwrap();
    let key = unique_key("nx");
    let ttl = Duration::from_secs(60);

    // XX on a missing key must not create it
    assert!(!store.replace(&key, "ghost", ttl).await.unwrap());
    assert_eq!(store.get(&key).await.unwrap(), None);

    assert!(store.set_if_absent(&key, "first", ttl).await.unwrap());
    assert!(!store.set_if_absent(&key, "second", ttl).await.unwrap());
    assert_eq!(store.get(&key).await.unwrap(), Some("first".to_string()));

    assert!(store.replace(&key, "updated", ttl).await.unwrap());
    assert_eq!(store.get(&key).await.unwrap(), Some("updated".to_string()));

    assert!(store.delete(&key).await.unwrap());
    assert!(!store.delete(&key).await.unwrap());
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_values_expire() {
    let store = RedisStore::new(config()).await.unwrap();
    let key = unique_key("ttl");

    store
        .set_if_absent(&key, "short-lived", Duration::from_millis(200))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(store.get(&key).await.unwrap(), None);
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_increment_with_window() {
    let store = RedisStore::new(config()).await.unwrap();
    let key = unique_key("counter");
    let window = Duration::from_secs(1);

    assert_eq!(store.increment_with_window(&key, window).await.unwrap(), 1);
    assert_eq!(store.increment_with_window(&key, window).await.unwrap(), 2);
    assert_eq!(store.increment_with_window(&key, window).await.unwrap(), 3);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(store.increment_with_window(&key, window).await.unwrap(), 1);

    store.delete(&key).await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_concurrent_increments_are_counted_once_each() {
    let store = Arc::new(RedisStore::new(config()).await.unwrap());
    let key = unique_key("concurrent");

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let store = store.clone();
            let key = key.clone();
            tokio::spawn(async move {
                store
                    .increment_with_window(&key, Duration::from_secs(60))
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut counts = Vec::new();
    for handle in handles {
        counts.push(handle.await.unwrap());
    }
    counts.sort_unstable();
    assert_eq!(counts, (1..=20).collect::<Vec<u64>>());

    store.delete(&key).await.unwrap();
}

#[tokio::test]
#[ignore] // Requires Redis server
async fn test_otp_store_over_redis() {
    let backend: Arc<dyn KeyValueStore> = Arc::new(RedisStore::new(config()).await.unwrap());
    let store = CacheOtpStore::new(backend, Some("otp-test".to_string()));

    let phone = "+84912345678";
    let request_id = Uuid::new_v4().to_string();
    let record = OtpRecord::new(
        phone,
        request_id.as_str(),
        "$2b$04$abcdefghijklmnopqrstuuO9mD8O7l6R8eXbRrJ5vWJ7bC1pS3kq",
        OtpChannel::Sms,
        60,
        5,
    );

    assert!(store.create(&record, 60).await.unwrap());
    assert!(!store.create(&record, 60).await.unwrap());

    let updated = record.with_failed_attempt();
    assert!(store.update(&updated).await.unwrap());

    let fetched = store.get(phone, &request_id).await.unwrap().unwrap();
    assert_eq!(fetched.attempts, 1);
    assert_eq!(fetched.expires_at, record.expires_at);

    assert!(store.delete(phone, &request_id).await.unwrap());
    assert!(!store.exists(phone, &request_id).await.unwrap());
    assert!(!store.update(&updated).await.unwrap());
}
