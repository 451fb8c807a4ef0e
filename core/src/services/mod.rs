//! Business services containing domain logic and use cases.

pub mod metrics;
pub mod otp;
pub mod provider;

// Re-export commonly used types
pub use metrics::{MetricsSnapshot, OtpMetrics};
pub use otp::{
    OtpService, OtpServiceConfig, OtpStore, PhoneNormalizer, RateLimiter, SendOtpResult,
    VerifyOtpResult,
};
pub use provider::{
    Delivery, OtpProvider, ProviderFailure, ProviderReceipt, ProviderRegistry, RegistryConfig,
    TemplateContext,
};
