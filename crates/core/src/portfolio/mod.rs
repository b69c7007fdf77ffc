pub mod closed;
pub mod portfolio_model;
pub mod portfolio_service;
pub mod positions;
pub mod valuation;

pub use closed::*;
pub use portfolio_model::*;
pub use portfolio_service::*;
pub use positions::*;
pub use valuation::*;

#[cfg(test)]
mod portfolio_service_tests;
