//! Types for OTP service results

use serde::Serialize;

use crate::domain::entities::OtpChannel;

/// Result of issuing a code
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpResult {
    /// Identifier the client echoes back when verifying
    pub request_id: String,
    /// Channel that delivered the code
    pub channel: OtpChannel,
    pub ttl_seconds: u64,
    /// Destination in masked form (e.g. +8491***5678)
    pub masked_phone: String,
}

/// Result of a verification attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpResult {
    pub verified: bool,
    /// Guesses left on this challenge; zero once it has been destroyed
    pub remaining_attempts: u32,
}
