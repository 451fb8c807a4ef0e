//! Delivery provider abstraction
//!
//! This module defines the uniform contract every delivery vendor implements
//! and the registry that walks providers in priority order:
//! - Skips providers that are not configured
//! - Retries retryable failures with exponential backoff
//! - Bounds every call with a deadline
//! - Temporarily skips providers that keep failing

mod registry;
mod traits;

#[cfg(test)]
pub(crate) mod tests;

pub use registry::{Delivery, ProviderRegistry, RegistryConfig};
pub use traits::{OtpProvider, ProviderFailure, ProviderReceipt, TemplateContext};
