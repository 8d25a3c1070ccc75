//! Route definitions for the Branch Stock Ledger Platform

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - stock units and movements
        .nest("/stock", stock_routes(state.clone()))
        // Protected routes - ledger history log
        .nest("/ledger", ledger_routes(state))
}

/// Stock unit routes (protected)
fn stock_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_stock))
        .route("/decrement", post(handlers::decrement_stock))
        .route("/boxset/check", post(handlers::check_boxset_stock))
        .route("/boxset/deduct", post(handlers::deduct_boxset_stock))
        .route("/boxset/:contract_no/status", get(handlers::get_boxset_status))
        .route("/branch/:branch_code", get(handlers::list_branch_stock))
        .route("/cost", get(handlers::get_po_cost))
        .route(
            "/:id",
            get(handlers::get_stock)
                .put(handlers::update_stock)
                .delete(handlers::reject_stock),
        )
        .route("/:id/approve", post(handlers::approve_stock))
        .route("/:id/price", put(handlers::update_price))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Ledger routes (protected)
fn ledger_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_ledger_entries))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
