//! Zalo ZNS provider
//!
//! Sends the code as a registered template message through the Zalo
//! Official Account API. The template must expose `otp_code`,
//! `expire_time` and `app_name` fields.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

use otp_core::domain::entities::OtpChannel;
use otp_core::services::provider::{OtpProvider, ProviderFailure, ProviderReceipt, TemplateContext};
use otp_shared::config::ZaloConfig;
use otp_shared::phone::mask_phone_number;

use crate::InfrastructureError;

/// Zalo error codes that will fail the same way on retry
/// (invalid phone, user blocked the OA, template or quota problems)
const NON_RETRYABLE_ERRORS: [i64; 4] = [-124, -214, -216, -217];

#[derive(Debug, Serialize)]
struct ZnsRequest<'a> {
    /// Recipient without the leading `+` (84912345678)
    phone: &'a str,
    template_id: &'a str,
    template_data: ZnsTemplateData<'a>,
    tracking_id: &'a str,
}

#[derive(Debug, Serialize)]
struct ZnsTemplateData<'a> {
    otp_code: &'a str,
    expire_time: String,
    app_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct ZnsResponse {
    error: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<ZnsData>,
}

#[derive(Debug, Deserialize)]
struct ZnsData {
    #[serde(default)]
    msg_id: Option<String>,
}

/// [`OtpProvider`] delivering through Zalo ZNS
pub struct ZaloProvider {
    client: reqwest::Client,
    config: ZaloConfig,
}

impl ZaloProvider {
    pub fn new(config: ZaloConfig, timeout: Duration) -> Result<Self, InfrastructureError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl OtpProvider for ZaloProvider {
    fn channel(&self) -> OtpChannel {
        OtpChannel::Zalo
    }

    fn name(&self) -> &str {
        "zalo"
    }

    fn is_available(&self) -> bool {
        self.config.is_configured()
    }

    async fn send(
        &self,
        phone: &str,
        code: &str,
        context: &TemplateContext,
    ) -> Result<ProviderReceipt, ProviderFailure> {
        let (Some(access_token), Some(template_id)) =
            (&self.config.access_token, &self.config.template_id)
        else {
            return Err(ProviderFailure::permanent(
                "ZALO_NOT_CONFIGURED",
                "Zalo access token or template id missing",
            ));
        };

        let app_name = context.app_name.as_deref().unwrap_or(&self.config.app_name);
        let request = ZnsRequest {
            phone: phone.trim_start_matches('+'),
            template_id,
            template_data: ZnsTemplateData {
                otp_code: code,
                expire_time: format!("{} phút", context.expiry_minutes),
                app_name,
            },
            tracking_id: &context.request_id,
        };

        info!(
            phone = %mask_phone_number(phone),
            request_id = %context.request_id,
            "Sending OTP via Zalo ZNS"
        );

        let response = self
            .client
            .post(&self.config.api_endpoint)
            .header("access_token", access_token)
            .json(&request)
            .send()
            .await
            .map_err(transport_failure)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport_failure)?;

        parse_zns_response(status, &body)
    }
}

fn transport_failure(err: reqwest::Error) -> ProviderFailure {
    if err.is_timeout() {
        ProviderFailure::retryable("TIMEOUT", "Zalo ZNS request timed out")
    } else {
        ProviderFailure::retryable("ZALO_ERROR", err.to_string())
    }
}

/// Interpret an HTTP status and body from the ZNS endpoint
pub(crate) fn parse_zns_response(
    status: u16,
    body: &str,
) -> Result<ProviderReceipt, ProviderFailure> {
    if !(200..300).contains(&status) {
        let retryable = status >= 500 || status == 429;
        warn!(status = status, "Zalo ZNS API returned HTTP error");
        return Err(ProviderFailure {
            code: format!("ZALO_HTTP_{}", status),
            message: format!("Zalo API responded with HTTP {}", status),
            retryable,
        });
    }

    let parsed: ZnsResponse = serde_json::from_str(body).map_err(|_| {
        ProviderFailure::permanent("ZALO_PARSE_ERROR", "Failed to parse Zalo response")
    })?;

    if parsed.error != 0 {
        let message = parsed.message.unwrap_or_else(|| "Zalo error".to_string());
        warn!(code = parsed.error, message = %message, "Zalo ZNS returned error");
        return Err(ProviderFailure {
            code: format!("ZALO_{}", parsed.error),
            message,
            retryable: !NON_RETRYABLE_ERRORS.contains(&parsed.error),
        });
    }

    let message_id = parsed
        .data
        .and_then(|d| d.msg_id)
        .unwrap_or_default();
    info!(message_id = %message_id, "Zalo ZNS OTP sent successfully");
    Ok(ProviderReceipt::new(message_id))
}
