//! Mock provider for development
//!
//! Accepts every message and keeps the most recent delivered codes in
//! memory so local tooling and tests can read them back. Codes are never
//! written to logs.

use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

use otp_core::domain::entities::OtpChannel;
use otp_core::services::provider::{OtpProvider, ProviderFailure, ProviderReceipt, TemplateContext};
use otp_shared::phone::mask_phone_number;

/// Messages retained before the oldest is dropped
pub const MAX_RECORDED_MESSAGES: usize = 100;

/// A message accepted by [`MockProvider`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub phone: String,
    pub code: String,
    pub request_id: String,
    pub message_id: String,
}

/// [`OtpProvider`] that records instead of delivering
pub struct MockProvider {
    channel: OtpChannel,
    sent: Mutex<VecDeque<SentMessage>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::with_channel(OtpChannel::Sms)
    }

    pub fn with_channel(channel: OtpChannel) -> Self {
        Self {
            channel,
            sent: Mutex::new(VecDeque::new()),
        }
    }

    /// Retained messages, oldest first
    pub async fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().await.iter().cloned().collect()
    }

    /// Most recent code sent to `phone`
    pub async fn last_code_for(&self, phone: &str) -> Option<String> {
        self.sent
            .lock()
            .await
            .iter()
            .rev()
            .find(|m| m.phone == phone)
            .map(|m| m.code.clone())
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OtpProvider for MockProvider {
    fn channel(&self) -> OtpChannel {
        self.channel
    }

    fn name(&self) -> &str {
        "mock"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn send(
        &self,
        phone: &str,
        code: &str,
        context: &TemplateContext,
    ) -> Result<ProviderReceipt, ProviderFailure> {
        let message_id = format!("mock-{}", Uuid::new_v4());

        {
            let mut sent = self.sent.lock().await;
            if sent.len() == MAX_RECORDED_MESSAGES {
                sent.pop_front();
            }
            sent.push_back(SentMessage {
                phone: phone.to_string(),
                code: code.to_string(),
                request_id: context.request_id.clone(),
                message_id: message_id.clone(),
            });
        }

        info!(
            phone = %mask_phone_number(phone),
            request_id = %context.request_id,
            message_id = %message_id,
            "Mock provider accepted OTP"
        );
        Ok(ProviderReceipt::new(message_id))
    }
}
