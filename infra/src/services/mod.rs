//! Infrastructure implementations of the OTP service collaborators

pub mod phone;
pub mod rate_limiter;

#[cfg(test)]
mod tests;

pub use phone::LibPhoneNormalizer;
pub use rate_limiter::CacheRateLimiter;
