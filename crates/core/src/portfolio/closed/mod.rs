//! Realized results of fully liquidated securities.

mod closed_model;
mod closed_reconciler;

pub use closed_model::*;
pub use closed_reconciler::*;
