//! HTTP handlers for stock unit endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{check_approval_role, CurrentUser};
use crate::models::{StockState, StockUnit};
use crate::services::ledger::{DecrementInput, DecrementOutcome, LedgerService};
use crate::services::stock::{
    ApproveStockInput, CostLookup, CreateStockInput, CreateStockOutcome, StockQuery, StockService,
    UpdatePriceInput, UpdateStockInput,
};
use crate::AppState;

/// Register a stock unit; the unit arrives pending approval
pub async fn create_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateStockInput>,
) -> AppResult<(StatusCode, Json<CreateStockOutcome>)> {
    let service = StockService::new(state.db, state.events);
    let outcome = service.create(input, Some(current_user.0.user_id)).await?;
    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome)))
}

/// Approve a pending unit (managerial roles only)
pub async fn approve_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    input: Option<Json<ApproveStockInput>>,
) -> AppResult<Json<StockUnit>> {
    check_approval_role(&current_user.0)?;
    let service = StockService::new(state.db, state.events);
    let input = input.map(|Json(i)| i).unwrap_or_default();
    let unit = service.approve(id, input, current_user.0.user_id).await?;
    Ok(Json(unit))
}

#[derive(Serialize)]
pub struct RejectResponse {
    pub deleted: bool,
}

/// Remove a unit; rejecting a pending unit requires a managerial role
pub async fn reject_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RejectResponse>> {
    let service = StockService::new(state.db, state.events);
    service.reject(id, &current_user.0).await?;
    Ok(Json(RejectResponse { deleted: true }))
}

/// Edit a unit's descriptive fields
pub async fn update_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateStockInput>,
) -> AppResult<Json<StockUnit>> {
    let service = StockService::new(state.db, state.events);
    let unit = service.update(id, input, current_user.0.user_id).await?;
    Ok(Json(unit))
}

/// Reprice a unit
pub async fn update_price(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdatePriceInput>,
) -> AppResult<Json<StockUnit>> {
    let service = StockService::new(state.db, state.events);
    let unit = service
        .update_price(id, input, current_user.0.user_id)
        .await?;
    Ok(Json(unit))
}

/// Get a single stock unit
pub async fn get_stock(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<StockUnit>> {
    let service = StockService::new(state.db, state.events);
    let unit = service.get(id).await?;
    Ok(Json(unit))
}

/// List stock units at a branch; verified units unless a state filter
/// is given
pub async fn list_branch_stock(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(branch_code): Path<String>,
    Query(mut query): Query<StockQuery>,
) -> AppResult<Json<Vec<StockUnit>>> {
    query.state.get_or_insert(StockState::Verified);
    let service = StockService::new(state.db, state.events);
    let units = service.list(&branch_code, &query).await?;
    Ok(Json(units))
}

#[derive(serde::Deserialize)]
pub struct CostQuery {
    pub branch_code: String,
    pub po_number: String,
}

/// Cost snapshot for a purchase order's stock at a branch
pub async fn get_po_cost(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<CostQuery>,
) -> AppResult<Json<CostLookup>> {
    let service = StockService::new(state.db, state.events);
    let lookup = service
        .cost_for_po(&query.branch_code, &query.po_number)
        .await?;
    Ok(Json(lookup))
}

/// Consume stock from a purchase order's lots, oldest first
pub async fn decrement_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<DecrementInput>,
) -> AppResult<Json<DecrementOutcome>> {
    let service = LedgerService::new(state.db, state.events);
    let outcome = service
        .decrement(input, Some(current_user.0.user_id))
        .await?;
    Ok(Json(outcome))
}
