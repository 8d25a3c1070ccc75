//! HTTP handlers for boxset stock deduction

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::boxset::{BoxsetService, BoxsetStockReport};
use crate::AppState;

#[derive(Deserialize)]
pub struct BoxsetRequest {
    pub contract_no: String,
    /// Check or deduct at this branch instead of the contract's own
    pub branch_code: Option<String>,
}

#[derive(Serialize)]
pub struct BoxsetStatusResponse {
    pub deductions: i64,
    #[serde(flatten)]
    pub report: BoxsetStockReport,
}

/// Check constituent availability for a contract without deducting
pub async fn check_boxset_stock(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Json(input): Json<BoxsetRequest>,
) -> AppResult<Json<BoxsetStockReport>> {
    let service = BoxsetService::new(state.db, state.events);
    let report = service
        .check(&input.contract_no, input.branch_code.as_deref())
        .await?;
    Ok(Json(report))
}

/// Deduct every constituent of a paid-off contract, all or nothing
pub async fn deduct_boxset_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<BoxsetRequest>,
) -> AppResult<Json<BoxsetStockReport>> {
    let service = BoxsetService::new(state.db, state.events);
    let report = service
        .deduct(
            &input.contract_no,
            input.branch_code.as_deref(),
            Some(current_user.0.user_id),
        )
        .await?;
    Ok(Json(report))
}

/// Availability snapshot plus how many deductions the contract has seen
pub async fn get_boxset_status(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(contract_no): Path<String>,
) -> AppResult<Json<BoxsetStatusResponse>> {
    let service = BoxsetService::new(state.db, state.events);
    let report = service.check(&contract_no, None).await?;
    let deductions = service.deduction_count(&contract_no).await?;
    Ok(Json(BoxsetStatusResponse { deductions, report }))
}
