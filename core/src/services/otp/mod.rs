//! OTP issuance and verification
//!
//! This module provides the complete one-time passcode workflow:
//! - Phone normalization and per-phone / per-IP send quotas
//! - Code generation and bcrypt hashing
//! - Delivery through the provider registry
//! - Single-use verification with an attempt ceiling and absolute expiry

pub mod code;
mod config;
mod service;
mod traits;
mod types;

#[cfg(test)]
mod tests;

pub use config::OtpServiceConfig;
pub use service::OtpService;
pub use traits::{OtpStore, PhoneNormalizer, RateLimiter};
pub use types::{SendOtpResult, VerifyOtpResult};
