//! Unit tests for infrastructure services

#[cfg(test)]
mod rate_limiter_tests;
