//! Shared types and models for the Branch Stock Ledger Platform
//!
//! This crate contains the domain types shared between the backend and
//! other components of the system: the stock approval state machine,
//! ledger event types, and input validation helpers.

pub mod fifo;
pub mod models;
pub mod validation;

pub use models::*;
pub use validation::*;
