//! # SmartRent OTP Core
//!
//! Domain layer of the OTP engine. It owns the OTP record and its state
//! machine, code generation and hashing, the delivery provider contract with
//! ordered failover, and the orchestrating service. Storage, rate limiting
//! and phone parsing are reached through traits implemented by `otp_infra`.

pub mod domain;
pub mod errors;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::*;
pub use errors::*;
pub use services::*;
