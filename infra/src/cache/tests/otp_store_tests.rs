use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use otp_core::domain::entities::{OtpChannel, OtpRecord};
use otp_core::errors::OtpError;
use otp_core::services::otp::code::hash_code;
use otp_core::services::otp::OtpStore;

use crate::cache::{CacheOtpStore, KeyValueStore, MemoryStore};
use crate::InfrastructureError;

const PHONE: &str = "+84912345678";

fn record(request_id: &str, ttl_seconds: u64) -> OtpRecord {
    OtpRecord::new(
        PHONE,
        request_id,
        "$2b$04$abcdefghijklmnopqrstuuO9mD8O7l6R8eXbRrJ5vWJ7bC1pS3kq",
        OtpChannel::Zalo,
        ttl_seconds,
        5,
    )
}

fn store() -> (CacheOtpStore, MemoryStore) {
    let backend = MemoryStore::new();
    (CacheOtpStore::new(Arc::new(backend.clone()), None), backend)
}

/// Backend whose every call fails
struct DownBackend;

#[async_trait]
impl KeyValueStore for DownBackend {
    async fn set_if_absent(&self, _: &str, _: &str, _: Duration) -> Result<bool, InfrastructureError> {
        Err(InfrastructureError::Timeout("backend down".to_string()))
    }

    async fn replace(&self, _: &str, _: &str, _: Duration) -> Result<bool, InfrastructureError> {
        Err(InfrastructureError::Timeout("backend down".to_string()))
    }

    async fn get(&self, _: &str) -> Result<Option<String>, InfrastructureError> {
        Err(InfrastructureError::Timeout("backend down".to_string()))
    }

    async fn delete(&self, _: &str) -> Result<bool, InfrastructureError> {
        Err(InfrastructureError::Timeout("backend down".to_string()))
    }

    async fn increment_with_window(&self, _: &str, _: Duration) -> Result<u64, InfrastructureError> {
        Err(InfrastructureError::Timeout("backend down".to_string()))
    }

    fn backend_name(&self) -> &'static str {
        "down"
    }
}

#[test]
fn test_record_key_format() {
    let (store, _) = store();
    assert_eq!(store.record_key(PHONE, "req-1"), "otp:+84912345678:req-1");

    let prefixed = CacheOtpStore::new(Arc::new(MemoryStore::new()), Some("staging".to_string()));
    assert_eq!(
        prefixed.record_key(PHONE, "req-1"),
        "staging:otp:+84912345678:req-1"
    );
}

#[tokio::test]
async fn test_create_and_get() {
    let (store, _) = store();
    let original = record("req-1", 300);

    assert!(store.create(&original, 300).await.unwrap());

    let loaded = store.get(PHONE, "req-1").await.unwrap().unwrap();
    assert_eq!(loaded, original);
    assert!(store.exists(PHONE, "req-1").await.unwrap());
}

#[tokio::test]
async fn test_create_duplicate_is_rejected() {
    let (store, _) = store();
    let original = record("req-1", 300);

    assert!(store.create(&original, 300).await.unwrap());

    let mut clash = record("req-1", 300);
    clash.hashed_code = "different".to_string();
    assert!(!store.create(&clash, 300).await.unwrap());

    let loaded = store.get(PHONE, "req-1").await.unwrap().unwrap();
    assert_eq!(loaded.hashed_code, original.hashed_code);
}

#[tokio::test]
async fn test_records_are_scoped_by_phone_and_request() {
    let (store, _) = store();
    store.create(&record("req-1", 300), 300).await.unwrap();

    assert!(store.get(PHONE, "req-2").await.unwrap().is_none());
    assert!(store.get("+84987654321", "req-1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_update_keeps_absolute_expiry() {
    let (store, _) = store();
    let original = record("req-1", 300);
    store.create(&original, 300).await.unwrap();

    let updated = original.with_failed_attempt();
    assert!(store.update(&updated).await.unwrap());

    let loaded = store.get(PHONE, "req-1").await.unwrap().unwrap();
    assert_eq!(loaded.attempts, 1);
    assert_eq!(loaded.expires_at, original.expires_at);
}

#[tokio::test]
async fn test_update_never_resurrects_deleted_record() {
    let (store, _) = store();
    let original = record("req-1", 300);
    store.create(&original, 300).await.unwrap();
    assert!(store.delete(PHONE, "req-1").await.unwrap());

    assert!(!store.update(&original.with_failed_attempt()).await.unwrap());
    assert!(store.get(PHONE, "req-1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_update_of_expired_record_is_rejected() {
    let (store, _) = store();
    let mut expired = record("req-1", 300);
    store.create(&expired, 300).await.unwrap();

    expired.expires_at = chrono::Utc::now() - chrono::Duration::seconds(1);
    assert!(!store.update(&expired).await.unwrap());
}

#[tokio::test]
async fn test_get_hides_records_past_their_deadline() {
    let (store, backend) = store();
    let mut stale = record("req-1", 300);
    stale.expires_at = chrono::Utc::now() - chrono::Duration::seconds(1);

    // backend TTL still running, record deadline passed
    let key = store.record_key(PHONE, "req-1");
    let json = serde_json::to_string(&stale).unwrap();
    backend
        .set_if_absent(&key, &json, Duration::from_secs(300))
        .await
        .unwrap();

    assert!(store.get(PHONE, "req-1").await.unwrap().is_none());
    assert!(!store.exists(PHONE, "req-1").await.unwrap());
}

#[tokio::test]
async fn test_corrupt_record_is_store_error() {
    let (store, backend) = store();
    let key = store.record_key(PHONE, "req-1");
    backend
        .set_if_absent(&key, "{not json", Duration::from_secs(300))
        .await
        .unwrap();

    let result = store.get(PHONE, "req-1").await;
    assert!(matches!(result, Err(OtpError::StoreUnavailable { .. })));
}

#[tokio::test]
async fn test_backend_failure_is_store_unavailable() {
    let store = CacheOtpStore::new(Arc::new(DownBackend), None);

    let created = store.create(&record("req-1", 300), 300).await;
    assert!(matches!(created, Err(OtpError::StoreUnavailable { .. })));

    // failures never masquerade as "not found"
    let loaded = store.get(PHONE, "req-1").await;
    assert!(matches!(loaded, Err(OtpError::StoreUnavailable { .. })));

    let deleted = store.delete(PHONE, "req-1").await;
    assert!(matches!(deleted, Err(OtpError::StoreUnavailable { .. })));
}

#[tokio::test]
async fn test_stored_value_holds_no_plaintext_code() {
    let (store, backend) = store();
    let hashed = hash_code("482913", 4).unwrap();
    let r = OtpRecord::new(PHONE, "req-1", hashed, OtpChannel::Sms, 300, 5);
    store.create(&r, 300).await.unwrap();

    let raw = backend
        .get(&store.record_key(PHONE, "req-1"))
        .await
        .unwrap()
        .unwrap();
    assert!(!raw.contains("482913"));
}

#[tokio::test]
async fn test_record_attempt_counts_on_sibling_key() {
    let (store, backend) = store();
    store.create(&record("req-1", 300), 300).await.unwrap();
    assert_eq!(
        store.attempts_key(PHONE, "req-1"),
        "otp:+84912345678:req-1:attempts"
    );

    assert_eq!(store.record_attempt(PHONE, "req-1").await.unwrap(), Some(1));
    assert_eq!(store.record_attempt(PHONE, "req-1").await.unwrap(), Some(2));

    let loaded = store.get(PHONE, "req-1").await.unwrap().unwrap();
    assert_eq!(loaded.attempts, 2);

    // the stored JSON is untouched by counting
    let raw = backend
        .get(&store.record_key(PHONE, "req-1"))
        .await
        .unwrap()
        .unwrap();
    let stored: OtpRecord = serde_json::from_str(&raw).unwrap();
    assert_eq!(stored.attempts, 0);
}

#[tokio::test]
async fn test_record_attempt_on_missing_record() {
    let (store, _) = store();
    assert_eq!(store.record_attempt(PHONE, "missing").await.unwrap(), None);

    store.create(&record("req-1", 300), 300).await.unwrap();
    store.delete(PHONE, "req-1").await.unwrap();
    assert_eq!(store.record_attempt(PHONE, "req-1").await.unwrap(), None);
}

#[tokio::test]
async fn test_update_does_not_double_count_claimed_attempts() {
    let (store, _) = store();
    store.create(&record("req-1", 300), 300).await.unwrap();
    store.record_attempt(PHONE, "req-1").await.unwrap();

    let loaded = store.get(PHONE, "req-1").await.unwrap().unwrap();
    assert!(store.update(&loaded.with_failed_attempt()).await.unwrap());

    let reloaded = store.get(PHONE, "req-1").await.unwrap().unwrap();
    assert_eq!(reloaded.attempts, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_attempts_are_distinct() {
    let (store, _) = store();
    let store = Arc::new(store);
    store.create(&record("req-1", 300), 300).await.unwrap();

    let tasks: Vec<_> = (0..40)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.record_attempt(PHONE, "req-1").await.unwrap() })
        })
        .collect();

    let mut attempts = Vec::new();
    for task in tasks {
        attempts.push(task.await.unwrap().unwrap());
    }
    attempts.sort_unstable();
    assert_eq!(attempts, (1..=40).collect::<Vec<u32>>());
}
