//! Market data provider abstractions and implementations.
//!
//! This module contains:
//! - The `MarketDataProvider` trait that all providers implement
//! - Provider capabilities and rate limiting configuration
//! - Concrete provider implementations (Yahoo)
//!
//! Providers receive symbols already in their own convention. Mapping from
//! a local listing symbol happens in [`crate::symbol`], not in the providers.

mod capabilities;
mod traits;

pub mod yahoo;

// Re-exports
pub use capabilities::{ProviderCapabilities, RateLimit};
pub use traits::MarketDataProvider;
