//! HTTP handlers for the Branch Stock Ledger Platform

pub mod boxset;
pub mod health;
pub mod ledger;
pub mod stock;

pub use boxset::*;
pub use health::*;
pub use ledger::*;
pub use stock::*;
