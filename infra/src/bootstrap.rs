//! Engine assembly
//!
//! Wires the configured backend, rate limiter, phone normalizer and
//! delivery providers into a ready [`OtpService`].

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use otp_core::services::otp::{OtpService, OtpServiceConfig};
use otp_core::services::provider::{ProviderRegistry, RegistryConfig};
use otp_shared::config::{AppConfig, StoreType};

use crate::cache::{CacheOtpStore, KeyValueStore, MemoryStore, SweeperHandle};
use crate::providers::build_providers;
use crate::services::{CacheRateLimiter, LibPhoneNormalizer};
use crate::InfrastructureError;

/// The service type produced by [`build_otp_service`]
pub type EngineService = OtpService<CacheOtpStore, CacheRateLimiter, LibPhoneNormalizer>;

/// A running engine and the background work it owns
pub struct OtpEngine {
    service: Arc<EngineService>,
    sweeper: Option<SweeperHandle>,
    backend: &'static str,
}

impl OtpEngine {
    pub fn service(&self) -> Arc<EngineService> {
        Arc::clone(&self.service)
    }

    /// Name of the key-value backend in use ("redis" or "memory")
    pub fn backend_name(&self) -> &'static str {
        self.backend
    }

    /// Stop background tasks (the in-memory sweeper)
    pub async fn shutdown(self) {
        if let Some(sweeper) = self.sweeper {
            sweeper.shutdown().await;
        }
        info!("OTP engine stopped");
    }
}

/// Build the engine from configuration
pub async fn build_otp_service(config: &AppConfig) -> Result<OtpEngine, InfrastructureError> {
    config.validate()?;

    let (backend, sweeper): (Arc<dyn KeyValueStore>, Option<SweeperHandle>) =
        match config.otp.store {
            StoreType::Redis => (connect_redis(config).await?, None),
            StoreType::Memory => {
                let store = MemoryStore::new();
                let sweeper =
                    store.start_sweeper(Duration::from_secs(config.otp.sweep_interval_seconds));
                (Arc::new(store), Some(sweeper))
            }
        };
    let backend_name = backend.backend_name();
    let key_prefix = config.cache.key_prefix.clone();

    let store = CacheOtpStore::new(Arc::clone(&backend), key_prefix.clone());
    let rate_limiter = CacheRateLimiter::new(backend, config.rate_limit.clone(), key_prefix);
    let normalizer = LibPhoneNormalizer::from_config(&config.otp)?;

    let providers = build_providers(&config.providers)?;
    let registry = ProviderRegistry::new(providers, RegistryConfig::from(&config.providers));
    if registry.available_channels().is_empty() {
        warn!("No OTP delivery provider is available; every send will fail");
    }

    let service = OtpService::new(
        Arc::new(store),
        Arc::new(rate_limiter),
        Arc::new(normalizer),
        Arc::new(registry),
        OtpServiceConfig::from_configs(&config.otp, &config.providers),
    );

    info!(
        environment = %config.environment,
        backend = backend_name,
        code_length = config.otp.code_length,
        ttl_seconds = config.otp.ttl_seconds,
        "OTP engine ready"
    );

    Ok(OtpEngine {
        service: Arc::new(service),
        sweeper,
        backend: backend_name,
    })
}

#[cfg(feature = "redis-cache")]
async fn connect_redis(config: &AppConfig) -> Result<Arc<dyn KeyValueStore>, InfrastructureError> {
    let store = crate::cache::RedisStore::new(config.cache.clone()).await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "redis-cache"))]
async fn connect_redis(_config: &AppConfig) -> Result<Arc<dyn KeyValueStore>, InfrastructureError> {
    Err(InfrastructureError::Config(
        "Redis store requested but the redis-cache feature is disabled".to_string(),
    ))
}
