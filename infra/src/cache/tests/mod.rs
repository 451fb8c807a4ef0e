//! Unit tests for the cache backends and the OTP record store

#[cfg(test)]
mod otp_store_tests;
