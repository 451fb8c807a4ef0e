//! Provider contract shared by every delivery vendor

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::OtpChannel;

/// Template parameters supplied by the orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateContext {
    /// Request id, usable as a vendor tracking id
    pub request_id: String,
    /// Minutes until the code expires
    pub expiry_minutes: u64,
    /// Product name shown in the message
    pub app_name: Option<String>,
}

/// Vendor acknowledgement of an accepted message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderReceipt {
    pub message_id: String,
}

impl ProviderReceipt {
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
        }
    }
}

/// A provider call that did not deliver
///
/// `retryable` tells the registry whether another attempt on the same
/// provider can succeed (rate limited, 5xx, timeout) or whether it should
/// move on (bad credentials, rejected number, unknown template).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct ProviderFailure {
    pub code: String,
    pub message: String,
    pub retryable: bool,
}

impl ProviderFailure {
    pub fn retryable(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            retryable: true,
        }
    }

    pub fn permanent(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            retryable: false,
        }
    }
}

/// A delivery vendor for one channel
#[async_trait]
pub trait OtpProvider: Send + Sync {
    fn channel(&self) -> OtpChannel;

    /// Human readable provider name for logs
    fn name(&self) -> &str;

    /// Cheap local check that credentials are configured; no network calls
    fn is_available(&self) -> bool;

    /// Deliver `code` to `phone` (E.164)
    async fn send(
        &self,
        phone: &str,
        code: &str,
        context: &TemplateContext,
    ) -> Result<ProviderReceipt, ProviderFailure>;
}
