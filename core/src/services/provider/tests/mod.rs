//! Tests for the provider registry
