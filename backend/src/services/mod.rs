//! Business logic services for the Branch Stock Ledger Platform

pub mod boxset;
pub mod catalog;
pub mod enrichment;
pub mod ledger;
pub mod stock;

pub use boxset::BoxsetService;
pub use catalog::CatalogService;
pub use ledger::LedgerService;
pub use stock::StockService;
