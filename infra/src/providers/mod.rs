//! Delivery provider implementations
//!
//! ## Features
//!
//! - **Zalo ZNS**: Template message through the Zalo Official Account API
//! - **Twilio**: Plain SMS (feature `twilio-sms`)
//! - **Mock**: Records codes in memory for development and tests
//! - **Security**: Only masked phone numbers reach the logs

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use otp_core::services::provider::OtpProvider;
use otp_shared::config::{ProviderKind, ProvidersConfig};

use crate::InfrastructureError;

pub mod mock;
#[cfg(feature = "twilio-sms")]
pub mod twilio_sms;
pub mod zalo;

pub use mock::MockProvider;
#[cfg(feature = "twilio-sms")]
pub use twilio_sms::TwilioProvider;
pub use zalo::ZaloProvider;

/// Build providers in the configured priority order
///
/// Providers lacking credentials are still built but report themselves
/// unavailable, so the registry skips them without failing the send.
pub fn build_providers(
    config: &ProvidersConfig,
) -> Result<Vec<Arc<dyn OtpProvider>>, InfrastructureError> {
    let timeout = Duration::from_secs(config.send_timeout_seconds);
    let mut providers: Vec<Arc<dyn OtpProvider>> = Vec::with_capacity(config.order.len());

    for kind in &config.order {
        match kind {
            ProviderKind::Zalo => {
                if !config.zalo.is_configured() {
                    warn!("Zalo ZNS provider is listed but not configured");
                }
                providers.push(Arc::new(ZaloProvider::new(config.zalo.clone(), timeout)?));
            }
            #[cfg(feature = "twilio-sms")]
            ProviderKind::Twilio => {
                if !config.twilio.is_configured() {
                    warn!("Twilio provider is listed but not configured");
                }
                providers.push(Arc::new(TwilioProvider::new(config.twilio.clone())));
            }
            #[cfg(not(feature = "twilio-sms"))]
            ProviderKind::Twilio => {
                warn!("Twilio provider is listed but the twilio-sms feature is disabled");
            }
            ProviderKind::Mock => {
                providers.push(Arc::new(MockProvider::new()));
            }
        }
    }

    let available: Vec<&str> = providers
        .iter()
        .filter(|p| p.is_available())
        .map(|p| p.name())
        .collect();
    info!(providers = ?available, "Built OTP delivery providers");

    Ok(providers)
}

/// Render an SMS body from a template with `{code}`, `{minutes}` and `{app}`
#[cfg_attr(not(feature = "twilio-sms"), allow(dead_code))]
pub(crate) fn render_template(template: &str, code: &str, minutes: u64, app: &str) -> String {
    template
        .replace("{code}", code)
        .replace("{minutes}", &minutes.to_string())
        .replace("{app}", app)
}
