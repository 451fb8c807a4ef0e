//! Code generation and hashing
//!
//! Codes come from the operating system CSPRNG and are stored only as
//! salted bcrypt hashes.

use rand::{rngs::OsRng, Rng};

use crate::errors::{OtpError, OtpResult};

/// Shortest code the engine will issue
pub const MIN_CODE_LENGTH: usize = 4;

/// Longest code the engine will issue
pub const MAX_CODE_LENGTH: usize = 10;

/// Bring a configured length into `MIN_CODE_LENGTH..=MAX_CODE_LENGTH`
pub fn clamp_code_length(length: usize) -> usize {
    length.clamp(MIN_CODE_LENGTH, MAX_CODE_LENGTH)
}

/// Generate a numeric code of exactly `length` digits
///
/// Each digit is drawn independently and uniformly, so leading zeros are
/// as likely as any other digit. `length` goes through
/// [`clamp_code_length`].
pub fn generate_code(length: usize) -> String {
    let length = clamp_code_length(length);
    let mut rng = OsRng;
    (0..length)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

/// Hash a code with bcrypt at the given cost
pub fn hash_code(code: &str, cost: u32) -> OtpResult<String> {
    bcrypt::hash(code, cost).map_err(|e| {
        tracing::error!(error = %e, "Failed to hash OTP code");
        OtpError::HashingFailed
    })
}

/// Check a code against its hash; malformed hashes never match
pub fn verify_code(code: &str, hashed: &str) -> bool {
    bcrypt::verify(code, hashed).unwrap_or(false)
}

/// Whether `code` has the shape of an issued code
pub fn is_well_formed(code: &str, length: usize) -> bool {
    code.len() == length && code.chars().all(|c| c.is_ascii_digit())
}
