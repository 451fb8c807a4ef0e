//! Redis key-value backend
//!
//! Wraps a multiplexed connection with connect retries, per-command
//! deadlines and retry with exponential backoff for transient errors.
//! Conditional writes use `SET NX/XX PX` so a record is never resurrected
//! or overwritten by a racing caller.

use async_trait::async_trait;
use redis::{aio::MultiplexedConnection, AsyncCommands, Client, RedisError, RedisResult};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use super::store::KeyValueStore;
use super::CacheConfig;
use crate::InfrastructureError;

/// Upper bound for retry backoff, in milliseconds
const MAX_RETRY_DELAY_MS: u64 = 5000;

type RedisFuture<T> = Pin<Box<dyn Future<Output = RedisResult<T>> + Send>>;

/// Redis-backed [`KeyValueStore`]
#[derive(Clone)]
pub struct RedisStore {
    /// Redis multiplexed connection for async operations
    connection: MultiplexedConnection,
    /// Configuration used to create this store
    config: CacheConfig,
}

impl RedisStore {
    /// Connect to Redis using `config.url`
    ///
    /// Connection attempts are retried `config.max_retries` times with
    /// exponential backoff, each bounded by `config.connection_timeout`.
    pub async fn new(config: CacheConfig) -> Result<Self, InfrastructureError> {
        info!("Creating Redis store with URL: {}", mask_url(&config.url));

        let client = Client::open(config.url.as_str()).map_err(|e| {
            error!("Failed to parse Redis URL: {}", e);
            InfrastructureError::Config(format!("Invalid Redis URL: {}", e))
        })?;

        let connection = Self::create_connection_with_retry(&client, &config).await?;

        info!("Redis store created successfully");
        Ok(Self { connection, config })
    }

    async fn create_connection_with_retry(
        client: &Client,
        config: &CacheConfig,
    ) -> Result<MultiplexedConnection, InfrastructureError> {
        let connect_timeout = Duration::from_secs(config.connection_timeout.max(1));
        let max_attempts = config.max_retries.max(1);
        let mut attempts = 0;
        let mut delay = config.retry_delay_ms;

        loop {
            attempts += 1;
            debug!("Attempting to connect to Redis (attempt {})", attempts);

            let failure = match timeout(connect_timeout, client.get_multiplexed_async_connection())
                .await
            {
                Ok(Ok(connection)) => {
                    info!("Successfully connected to Redis");
                    return Ok(connection);
                }
                Ok(Err(e)) => InfrastructureError::Cache(e),
                Err(_) => InfrastructureError::Timeout(format!(
                    "no connection to Redis within {:?}",
                    connect_timeout
                )),
            };

            if attempts >= max_attempts {
                error!(
                    "Failed to connect to Redis after {} attempts: {}",
                    attempts, failure
                );
                return Err(failure);
            }

            warn!(
                "Failed to connect to Redis (attempt {}/{}): {}. Retrying in {}ms...",
                attempts, max_attempts, failure, delay
            );
            sleep(Duration::from_millis(delay)).await;
            delay = (delay * 2).min(MAX_RETRY_DELAY_MS);
        }
    }

    /// Run one Redis command with a deadline and retry on transient errors
    ///
    /// Timeouts are not retried: the command may already have been applied.
    async fn execute_with_retry<F, T>(&self, operation: F) -> Result<T, InfrastructureError>
    where
        F: Fn(MultiplexedConnection) -> RedisFuture<T>,
    {
        let op_timeout = Duration::from_millis(self.config.operation_timeout_ms);
        let max_attempts = self.config.max_retries.max(1);
        let mut attempts = 0;
        let mut delay = self.config.retry_delay_ms;

        loop {
            attempts += 1;
            let conn = self.connection.clone();

            match timeout(op_timeout, operation(conn)).await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(e)) if attempts < max_attempts && is_retriable_error(&e) => {
                    warn!(
                        "Redis operation failed (attempt {}/{}): {}. Retrying in {}ms...",
                        attempts, max_attempts, e, delay
                    );
                    sleep(Duration::from_millis(delay)).await;
                    delay = (delay * 2).min(MAX_RETRY_DELAY_MS);
                }
                Ok(Err(e)) => {
                    error!("Redis operation failed after {} attempts: {}", attempts, e);
                    return Err(InfrastructureError::Cache(e));
                }
                Err(_) => {
                    error!("Redis operation timed out after {:?}", op_timeout);
                    return Err(InfrastructureError::Timeout(format!(
                        "Redis did not answer within {:?}",
                        op_timeout
                    )));
                }
            }
        }
    }

    /// Check connectivity with PING
    pub async fn health_check(&self) -> Result<bool, InfrastructureError> {
        let response = self
            .execute_with_retry(|mut conn| {
                Box::pin(async move { redis::cmd("PING").query_async::<_, String>(&mut conn).await })
            })
            .await?;

        if response != "PONG" {
            warn!("Redis health check returned unexpected response: {}", response);
        }
        Ok(response == "PONG")
    }

    /// Conditional `SET key value <mode> PX ttl`; `true` when written
    async fn conditional_set(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
        mode: &'static str,
    ) -> Result<bool, InfrastructureError> {
        let ttl_ms = ttl_millis(ttl);
        let written = self
            .execute_with_retry(|mut conn| {
                let key = key.to_string();
                let value = value.to_string();

                Box::pin(async move {
                    redis::cmd("SET")
                        .arg(key)
                        .arg(value)
                        .arg(mode)
                        .arg("PX")
                        .arg(ttl_ms)
                        .query_async::<_, Option<String>>(&mut conn)
                        .await
                })
            })
            .await?
            .is_some();

        debug!("SET {} on '{}' written: {}", mode, key, written);
        Ok(written)
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, InfrastructureError> {
        self.conditional_set(key, value, ttl, "NX").await
    }

    async fn replace(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, InfrastructureError> {
        self.conditional_set(key, value, ttl, "XX").await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, InfrastructureError> {
        self.execute_with_retry(|mut conn| {
            let key = key.to_string();
            Box::pin(async move { conn.get::<_, Option<String>>(key).await })
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<bool, InfrastructureError> {
        let deleted = self
            .execute_with_retry(|mut conn| {
                let key = key.to_string();
                Box::pin(async move { conn.del::<_, u32>(key).await })
            })
            .await?;

        debug!("Deleted '{}': {}", key, deleted > 0);
        Ok(deleted > 0)
    }

    async fn increment_with_window(
        &self,
        key: &str,
        window: Duration,
    ) -> Result<u64, InfrastructureError> {
        let window_seconds = i64::try_from(window.as_secs().max(1)).unwrap_or(i64::MAX);

        let count = self
            .execute_with_retry(|mut conn| {
                let key = key.to_string();

                Box::pin(async move {
                    let (count, ttl): (u64, i64) = redis::pipe()
                        .atomic()
                        .incr(&key, 1)
                        .ttl(&key)
                        .query_async(&mut conn)
                        .await?;

                    // -1: counter has no expiry yet, so this increment opened the window
                    if ttl < 0 {
                        conn.expire::<_, ()>(&key, window_seconds).await?;
                    }
                    Ok::<_, RedisError>(count)
                })
            })
            .await?;

        debug!("Counter '{}' incremented to {}", key, count);
        Ok(count)
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

/// Millisecond TTL for `PX`, never zero
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

/// Transient errors worth retrying
pub(crate) fn is_retriable_error(error: &RedisError) -> bool {
    matches!(
        error.kind(),
        redis::ErrorKind::IoError
            | redis::ErrorKind::BusyLoadingError
            | redis::ErrorKind::TryAgain
    )
}

/// Mask credentials in a Redis URL for logging
pub(crate) fn mask_url(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@') {
        if let Some(proto_end) = url.find("://") {
            let proto = &url[..proto_end + 3];
            let host_part = &url[at_pos..];
            return format!("{}****{}", proto, host_part);
        }
    }
    url.to_string()
}
