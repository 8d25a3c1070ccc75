//! Middleware for the Branch Stock Ledger Platform

pub mod auth;

pub use auth::{auth_middleware, check_approval_role, AuthUser, CurrentUser};
