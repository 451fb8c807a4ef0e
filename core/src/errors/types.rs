//! OTP error taxonomy
//!
//! Messages are safe to show to end users: they never carry the code, an
//! unmasked phone number or a raw vendor payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Quota axis that rejected a send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitScope {
    Phone,
    Ip,
}

impl fmt::Display for RateLimitScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateLimitScope::Phone => f.write_str("phone number"),
            RateLimitScope::Ip => f.write_str("IP address"),
        }
    }
}

/// Errors raised by OTP issuance and verification
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OtpError {
    #[error("Invalid phone number")]
    InvalidPhone,

    #[error("Phone numbers from this region are not supported")]
    UnsupportedRegion,

    #[error("Too many OTP requests for this {scope}. Please try again in {window_seconds} seconds")]
    RateLimitExceeded {
        scope: RateLimitScope,
        window_seconds: u64,
    },

    #[error("Failed to deliver the verification code. Please try again later")]
    SendFailed,

    #[error("An OTP challenge with this request id already exists")]
    DuplicateRequest,

    #[error("OTP not found or expired")]
    NotFound,

    #[error("Maximum verification attempts exceeded. Please request a new code")]
    AttemptsExceeded,

    #[error("OTP store unavailable: {message}")]
    StoreUnavailable { message: String },

    #[error("Failed to secure the verification code")]
    HashingFailed,
}

impl OtpError {
    /// Stable machine-readable code
    pub fn error_code(&self) -> &'static str {
        match self {
            OtpError::InvalidPhone => "OTP_INVALID_PHONE",
            OtpError::UnsupportedRegion => "OTP_UNSUPPORTED_REGION",
            OtpError::RateLimitExceeded { .. } => "OTP_RATE_LIMIT_EXCEEDED",
            OtpError::SendFailed => "OTP_SEND_FAILED",
            OtpError::DuplicateRequest => "OTP_DUPLICATE_REQUEST",
            OtpError::NotFound => "OTP_NOT_FOUND",
            OtpError::AttemptsExceeded => "OTP_MAX_ATTEMPTS_EXCEEDED",
            OtpError::StoreUnavailable { .. } => "OTP_STORE_UNAVAILABLE",
            OtpError::HashingFailed => "OTP_INTERNAL_ERROR",
        }
    }

    /// System failures a caller may retry as-is
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            OtpError::SendFailed | OtpError::StoreUnavailable { .. } | OtpError::HashingFailed
        )
    }

    pub fn store_unavailable(message: impl Into<String>) -> Self {
        OtpError::StoreUnavailable {
            message: message.into(),
        }
    }
}

/// Error body handed to the transport layer
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub error: String,
    pub message: String,
    pub retryable: bool,
    pub timestamp: DateTime<Utc>,
}

impl From<&OtpError> for ErrorResponse {
    fn from(err: &OtpError) -> Self {
        Self {
            error: err.error_code().to_string(),
            message: err.to_string(),
            retryable: err.is_retryable(),
            timestamp: Utc::now(),
        }
    }
}

impl From<OtpError> for ErrorResponse {
    fn from(err: OtpError) -> Self {
        ErrorResponse::from(&err)
    }
}
