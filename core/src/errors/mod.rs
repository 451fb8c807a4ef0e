//! Domain-specific error types and error handling.

mod types;

#[cfg(test)]
mod tests;

// Re-export all error types and utilities
pub use types::{ErrorResponse, OtpError, RateLimitScope};

pub type OtpResult<T> = Result<T, OtpError>;
