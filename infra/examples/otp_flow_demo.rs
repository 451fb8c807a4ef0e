//! Walk through a full OTP challenge against the in-memory backend
//!
//! Run with: cargo run -p otp_infra --example otp_flow_demo

use std::sync::Arc;
use std::time::Duration;

use otp_core::errors::OtpError;
use otp_core::services::otp::{OtpService, OtpServiceConfig};
use otp_core::services::provider::{OtpProvider, ProviderRegistry, RegistryConfig};
use otp_infra::cache::{CacheOtpStore, KeyValueStore, MemoryStore};
use otp_infra::providers::MockProvider;
use otp_infra::services::{CacheRateLimiter, LibPhoneNormalizer};
use otp_infra::telemetry::init_tracing;
use otp_shared::config::{AppConfig, RateLimitConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::development();
    init_tracing(&config.logging)?;

    let memory = MemoryStore::new();
    let sweeper = memory.start_sweeper(Duration::from_secs(30));
    let backend: Arc<dyn KeyValueStore> = Arc::new(memory);

    // Tight quota so the demo reaches it quickly
    let rate_limit = RateLimitConfig {
        max_sends_per_phone: 2,
        ..config.rate_limit.clone()
    };

    let mock = Arc::new(MockProvider::new());
    let providers: Vec<Arc<dyn OtpProvider>> = vec![mock.clone()];

    let service = OtpService::new(
        Arc::new(CacheOtpStore::new(backend.clone(), None)),
        Arc::new(CacheRateLimiter::new(backend, rate_limit, None)),
        Arc::new(LibPhoneNormalizer::from_config(&config.otp)?),
        Arc::new(ProviderRegistry::new(providers, RegistryConfig::default())),
        OtpServiceConfig::from_configs(&config.otp, &config.providers),
    );

    println!("\n=== Issue a code ===");
    let sent = service.send_otp("0912 345 678", Some("203.0.113.7")).await?;
    println!(
        "Sent to {} via {:?}, valid for {}s (request {})",
        sent.masked_phone, sent.channel, sent.ttl_seconds, sent.request_id
    );

    println!("\n=== Wrong guess ===");
    let miss = service
        .verify_otp("+84912345678", &sent.request_id, "000000")
        .await?;
    println!("Verified: {}, remaining attempts: {}", miss.verified, miss.remaining_attempts);

    println!("\n=== Correct code ===");
    let code = mock
        .last_code_for("+84912345678")
        .await
        .ok_or_else(|| anyhow::anyhow!("mock provider recorded no code"))?;
    let hit = service
        .verify_otp("+84912345678", &sent.request_id, &code)
        .await?;
    println!("Verified: {}", hit.verified);

    println!("\n=== Replay ===");
    match service
        .verify_otp("+84912345678", &sent.request_id, &code)
        .await
    {
        Err(OtpError::NotFound) => println!("Challenge already consumed"),
        other => println!("Unexpected: {:?}", other),
    }

    println!("\n=== Phone quota ===");
    for i in 1..=2 {
        match service.send_otp("+84912345678", None).await {
            Ok(sent) => println!("Send {}: ok ({})", i, sent.request_id),
            Err(e) => println!("Send {}: {}", i, e),
        }
    }

    println!("\n=== Counters ===");
    println!("{:?}", service.metrics().snapshot());

    sweeper.shutdown().await;
    Ok(())
}
