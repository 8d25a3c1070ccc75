//! HTTP handlers for the ledger history log

use axum::{
    extract::{Query, State},
    Json,
};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::LedgerEntry;
use crate::services::ledger::{LedgerQuery, LedgerService};
use crate::AppState;

/// Ledger entries for a branch, newest first
pub async fn list_ledger_entries(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(query): Query<LedgerQuery>,
) -> AppResult<Json<Vec<LedgerEntry>>> {
    let service = LedgerService::new(state.db, state.events);
    let entries = service.list_entries(&query).await?;
    Ok(Json(entries))
}
