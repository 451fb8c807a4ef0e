//! Domain layer containing the OTP entities.

pub mod entities;

// Re-export commonly used domain types
pub use entities::*;
