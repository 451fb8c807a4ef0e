//! Twilio SMS provider
//!
//! Delivers the code as a plain SMS rendered from the configured message
//! template. Retries are left to the provider registry; this module only
//! classifies Twilio errors as retryable or permanent.

use async_trait::async_trait;
use tracing::{info, warn};
use twilio::{Client, OutboundMessage};

use otp_core::domain::entities::OtpChannel;
use otp_core::services::provider::{OtpProvider, ProviderFailure, ProviderReceipt, TemplateContext};
use otp_shared::config::TwilioConfig;
use otp_shared::phone::mask_phone_number;

use super::render_template;

/// Twilio limit for a single message body
const MAX_MESSAGE_LENGTH: usize = 1600;

/// Twilio error codes for destinations that will never accept the message
const PERMANENT_ERROR_CODES: [&str; 5] = ["21211", "21408", "21610", "30003", "30005"];

/// [`OtpProvider`] delivering through Twilio programmable SMS
pub struct TwilioProvider {
    client: Option<Client>,
    config: TwilioConfig,
}

impl TwilioProvider {
    pub fn new(config: TwilioConfig) -> Self {
        let client = match (&config.account_sid, &config.auth_token) {
            (Some(sid), Some(token)) => Some(Client::new(sid, token)),
            _ => None,
        };

        if let Some(from) = &config.from_number {
            info!(
                "Twilio SMS provider initialized with from number: {}",
                mask_phone_number(from)
            );
        }

        Self { client, config }
    }

    fn render(&self, code: &str, context: &TemplateContext) -> String {
        render_template(
            &self.config.message_template,
            code,
            context.expiry_minutes,
            context.app_name.as_deref().unwrap_or_default(),
        )
    }
}

#[async_trait]
impl OtpProvider for TwilioProvider {
    fn channel(&self) -> OtpChannel {
        OtpChannel::Sms
    }

    fn name(&self) -> &str {
        "twilio"
    }

    fn is_available(&self) -> bool {
        self.client.is_some() && self.config.from_number.is_some()
    }

    async fn send(
        &self,
        phone: &str,
        code: &str,
        context: &TemplateContext,
    ) -> Result<ProviderReceipt, ProviderFailure> {
        let (Some(client), Some(from)) = (&self.client, &self.config.from_number) else {
            return Err(ProviderFailure::permanent(
                "TWILIO_NOT_CONFIGURED",
                "Twilio credentials or sender number missing",
            ));
        };

        let body = self.render(code, context);
        if body.len() > MAX_MESSAGE_LENGTH {
            return Err(ProviderFailure::permanent(
                "TWILIO_MESSAGE_TOO_LONG",
                format!("Message exceeds maximum length of {} characters", MAX_MESSAGE_LENGTH),
            ));
        }

        info!(
            phone = %mask_phone_number(phone),
            request_id = %context.request_id,
            "Sending OTP via Twilio SMS"
        );

        let message = OutboundMessage::new(from, phone, &body);
        match client.send_message(message).await {
            Ok(response) => {
                info!(
                    phone = %mask_phone_number(phone),
                    sid = %response.sid,
                    "SMS sent successfully"
                );
                Ok(ProviderReceipt::new(response.sid))
            }
            Err(e) => {
                let failure = classify_error(&e.to_string());
                warn!(
                    phone = %mask_phone_number(phone),
                    failure_code = %failure.code,
                    retryable = failure.retryable,
                    "Twilio rejected SMS"
                );
                Err(failure)
            }
        }
    }
}

/// Map a Twilio error message onto a provider failure
pub(crate) fn classify_error(message: &str) -> ProviderFailure {
    if let Some(code) = PERMANENT_ERROR_CODES.iter().find(|c| message.contains(*c)) {
        return ProviderFailure::permanent(format!("TWILIO_{}", code), message);
    }

    if message.contains("429") || message.to_lowercase().contains("rate") {
        return ProviderFailure::retryable("TWILIO_RATE_LIMITED", message);
    }

    if ["500", "502", "503", "504"].iter().any(|s| message.contains(s)) {
        return ProviderFailure::retryable("TWILIO_SERVER_ERROR", message);
    }

    if message.contains("400") || message.to_lowercase().contains("invalid") {
        return ProviderFailure::permanent("TWILIO_INVALID_REQUEST", message);
    }

    ProviderFailure::retryable("TWILIO_ERROR", message)
}
