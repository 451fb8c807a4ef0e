//! Tests for OTP error types
