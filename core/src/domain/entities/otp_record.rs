//! OTP record entity and challenge state machine.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use otp_shared::config::MAX_TTL_SECONDS;

/// Delivery channel that carried a code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtpChannel {
    /// Zalo Notification Service message
    Zalo,
    /// Plain SMS
    Sms,
}

impl OtpChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpChannel::Zalo => "zalo",
            OtpChannel::Sms => "sms",
        }
    }
}

impl fmt::Display for OtpChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OtpChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "zalo" | "zns" => Ok(OtpChannel::Zalo),
            "sms" => Ok(OtpChannel::Sms),
            _ => Err(format!("Unknown OTP channel: {}", s)),
        }
    }
}

/// Lifecycle of one challenge
///
/// `Pending` covers everything before a provider accepted the code; no
/// record exists in that state. Terminal states are never persisted: the
/// record is deleted when it reaches them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpState {
    Pending,
    Issued,
    Verified,
    Exhausted,
    Expired,
}

impl fmt::Display for OtpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OtpState::Pending => "pending",
            OtpState::Issued => "issued",
            OtpState::Verified => "verified",
            OtpState::Exhausted => "exhausted",
            OtpState::Expired => "expired",
        };
        f.write_str(name)
    }
}

/// One outstanding verification challenge
///
/// Identified by `(phone, request_id)`. Holds only the bcrypt hash of the
/// code; the plaintext never leaves the send path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpRecord {
    /// Identifier minted when the code was sent
    pub request_id: String,

    /// Canonical E.164 phone number
    pub phone: String,

    /// bcrypt hash of the code
    pub hashed_code: String,

    pub channel: OtpChannel,

    /// Failed verification attempts so far
    pub attempts: u32,

    pub max_attempts: u32,

    pub created_at: DateTime<Utc>,

    /// Absolute expiry; never moved by updates
    pub expires_at: DateTime<Utc>,

    pub verified: bool,
}

impl OtpRecord {
    /// Creates a fresh record that expires `ttl_seconds` from now
    ///
    /// Lifetimes beyond `MAX_TTL_SECONDS` are cut down to it.
    pub fn new(
        phone: impl Into<String>,
        request_id: impl Into<String>,
        hashed_code: impl Into<String>,
        channel: OtpChannel,
        ttl_seconds: u64,
        max_attempts: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            request_id: request_id.into(),
            phone: phone.into(),
            hashed_code: hashed_code.into(),
            channel,
            attempts: 0,
            max_attempts,
            created_at: now,
            expires_at: now + Duration::seconds(ttl_seconds.min(MAX_TTL_SECONDS) as i64),
            verified: false,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Current state derived from the stored fields
    pub fn state(&self) -> OtpState {
        if self.verified {
            OtpState::Verified
        } else if self.is_expired() {
            OtpState::Expired
        } else if self.is_exhausted() {
            OtpState::Exhausted
        } else {
            OtpState::Issued
        }
    }

    pub fn remaining_attempts(&self) -> u32 {
        self.max_attempts.saturating_sub(self.attempts)
    }

    /// Time left until expiry, zero once expired
    pub fn remaining_ttl(&self) -> Duration {
        let remaining = self.expires_at - Utc::now();
        if remaining > Duration::zero() {
            remaining
        } else {
            Duration::zero()
        }
    }

    /// Replacement value for a wrong guess; `self` is left untouched
    pub fn with_failed_attempt(&self) -> Self {
        Self {
            attempts: self.attempts.saturating_add(1),
            ..self.clone()
        }
    }
}
