//! Delivery provider configuration
//!
//! Credentials for each vendor plus the failover policy the provider
//! registry applies when walking them in priority order.

use serde::{Deserialize, Serialize};

use super::cache::env_or;

/// Known delivery provider implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Zalo Notification Service (chat-app business message)
    Zalo,
    /// Twilio programmable SMS
    Twilio,
    /// In-process provider that only logs (development)
    Mock,
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "zalo" | "zns" => Ok(ProviderKind::Zalo),
            "twilio" | "sms" => Ok(ProviderKind::Twilio),
            "mock" => Ok(ProviderKind::Mock),
            _ => Err(format!("Unknown OTP provider: {}", s)),
        }
    }
}

/// Zalo ZNS credentials and template settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ZaloConfig {
    #[serde(default = "default_zalo_endpoint")]
    pub api_endpoint: String,
    #[serde(default)]
    pub access_token: Option<String>,
    /// Official Account id
    #[serde(default)]
    pub oa_id: Option<String>,
    /// Registered OTP template id
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default = "default_app_name")]
    pub app_name: String,
}

impl Default for ZaloConfig {
    fn default() -> Self {
        Self {
            api_endpoint: default_zalo_endpoint(),
            access_token: None,
            oa_id: None,
            template_id: None,
            app_name: default_app_name(),
        }
    }
}

impl ZaloConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_endpoint: std::env::var("ZALO_API_ENDPOINT").unwrap_or(defaults.api_endpoint),
            access_token: non_empty_env("ZALO_ACCESS_TOKEN"),
            oa_id: non_empty_env("ZALO_OA_ID"),
            template_id: non_empty_env("ZALO_TEMPLATE_ID"),
            app_name: std::env::var("OTP_APP_NAME").unwrap_or(defaults.app_name),
        }
    }

    /// All credentials needed to call the API are present
    pub fn is_configured(&self) -> bool {
        self.access_token.is_some() && self.oa_id.is_some() && self.template_id.is_some()
    }
}

/// Twilio SMS credentials
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TwilioConfig {
    #[serde(default)]
    pub account_sid: Option<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
    /// Sender number in E.164 format
    #[serde(default)]
    pub from_number: Option<String>,
    /// Message body; `{code}`, `{minutes}` and `{app}` are substituted
    #[serde(default = "default_sms_template")]
    pub message_template: String,
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            from_number: None,
            message_template: default_sms_template(),
        }
    }
}

impl TwilioConfig {
    pub fn from_env() -> Self {
        Self {
            account_sid: non_empty_env("TWILIO_ACCOUNT_SID"),
            auth_token: non_empty_env("TWILIO_AUTH_TOKEN"),
            from_number: non_empty_env("TWILIO_FROM_NUMBER"),
            message_template: std::env::var("TWILIO_MESSAGE_TEMPLATE")
                .unwrap_or_else(|_| default_sms_template()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.account_sid.is_some() && self.auth_token.is_some() && self.from_number.is_some()
    }
}

/// Provider priority and failover policy
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProvidersConfig {
    /// Providers in priority order; the first available one is tried first
    #[serde(default = "default_order")]
    pub order: Vec<ProviderKind>,

    /// Extra attempts on the same provider after a retryable failure
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff between retries (doubles each attempt)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Deadline for a single provider call
    #[serde(default = "default_send_timeout")]
    pub send_timeout_seconds: u64,

    /// Consecutive failed deliveries before a provider is skipped
    #[serde(default = "default_circuit_threshold")]
    pub circuit_failure_threshold: u32,

    /// How long a tripped provider is skipped
    #[serde(default = "default_circuit_cooldown")]
    pub circuit_cooldown_seconds: u64,

    #[serde(default)]
    pub zalo: ZaloConfig,

    #[serde(default)]
    pub twilio: TwilioConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            order: default_order(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
            send_timeout_seconds: default_send_timeout(),
            circuit_failure_threshold: default_circuit_threshold(),
            circuit_cooldown_seconds: default_circuit_cooldown(),
            zalo: ZaloConfig::default(),
            twilio: TwilioConfig::default(),
        }
    }
}

impl ProvidersConfig {
    /// Development preset that only uses the logging provider
    pub fn development() -> Self {
        Self {
            order: vec![ProviderKind::Mock],
            ..Default::default()
        }
    }

    /// Create from environment variables (`OTP_PROVIDER_ORDER=zalo,twilio`)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let order = std::env::var("OTP_PROVIDER_ORDER")
            .ok()
            .map(|v| {
                v.split(',')
                    .filter(|p| !p.trim().is_empty())
                    .filter_map(|p| p.parse().ok())
                    .collect::<Vec<ProviderKind>>()
            })
            .filter(|order| !order.is_empty())
            .unwrap_or(defaults.order);

        Self {
            order,
            max_retries: env_or("OTP_PROVIDER_MAX_RETRIES", defaults.max_retries),
            retry_backoff_ms: env_or("OTP_PROVIDER_RETRY_BACKOFF_MS", defaults.retry_backoff_ms),
            send_timeout_seconds: env_or("OTP_PROVIDER_TIMEOUT_SECONDS", defaults.send_timeout_seconds),
            circuit_failure_threshold: env_or("OTP_PROVIDER_CIRCUIT_THRESHOLD", defaults.circuit_failure_threshold),
            circuit_cooldown_seconds: env_or("OTP_PROVIDER_CIRCUIT_COOLDOWN_SECONDS", defaults.circuit_cooldown_seconds),
            zalo: ZaloConfig::from_env(),
            twilio: TwilioConfig::from_env(),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn default_zalo_endpoint() -> String {
    String::from("https://business.openapi.zalo.me/message/template")
}

fn default_app_name() -> String {
    String::from("SmartRent")
}

fn default_sms_template() -> String {
    String::from("{app} - Your verification code is {code}. Valid for {minutes} minutes. Do not share this code.")
}

fn default_order() -> Vec<ProviderKind> {
    vec![ProviderKind::Zalo, ProviderKind::Twilio]
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    500
}

fn default_send_timeout() -> u64 {
    10
}

fn default_circuit_threshold() -> u32 {
    3
}

fn default_circuit_cooldown() -> u64 {
    30
}
