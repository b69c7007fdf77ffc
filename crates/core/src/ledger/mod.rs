//! Movement ledger - raw records from the spreadsheet store and their
//! conversion into typed transactions.

mod csv_source;
mod ledger_model;
mod ledger_parser;
mod ledger_traits;

pub use csv_source::*;
pub use ledger_model::*;
pub use ledger_parser::*;
pub use ledger_traits::*;
