//! Position reconstruction with the proportional average-cost method.

mod position_engine;
mod positions_model;

pub use position_engine::*;
pub use positions_model::*;
