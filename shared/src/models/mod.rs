//! Domain models for the Branch Stock Ledger Platform

pub mod ledger;
pub mod stock_unit;

pub use ledger::*;
pub use stock_unit::*;
