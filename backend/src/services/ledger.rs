//! Ledger history log and FIFO decrement engine
//!
//! Every stock movement is appended to `stock_ledger`; entries are never
//! updated or deleted except for the `remain_qty` counter on inbound
//! items, which outbound sales consume oldest-first.
//!
//! The FIFO walk itself is a pure function over a snapshot of open lots
//! (`plan_fifo_consumption`). The service applies a plan inside a single
//! transaction with the lot rows locked, retrying a bounded number of
//! times when the database reports a serialization conflict.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::events::{EventBus, StockEvent};
use crate::models::{ChangeType, LedgerEntry, LedgerEntryRow, LedgerItem, LedgerItemRow};
use shared::fifo::{plan_fifo_consumption, FifoLot};

/// Attempts per decrement before a serialization conflict is surfaced
const MAX_DECREMENT_ATTEMPTS: u32 = 3;

#[derive(Clone)]
pub struct LedgerService {
    db: PgPool,
    events: EventBus,
}

/// One product line of an entry about to be recorded
#[derive(Debug, Clone, Default)]
pub struct NewLedgerItem {
    pub name: String,
    pub brand: String,
    pub model: String,
    pub imei: Option<String>,
    pub po_number: Option<String>,
    pub document_number: Option<String>,
    pub qty: i32,
    pub remain_qty: i32,
    pub cost: Decimal,
    pub price: Decimal,
    pub unit: String,
}

/// An entry about to be recorded
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub branch_code: String,
    pub change_type: ChangeType,
    pub reason: String,
    pub performed_by: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub contract_no: Option<String>,
    pub supplier_id: Option<Uuid>,
    pub quantity: i32,
    pub items: Vec<NewLedgerItem>,
}

/// Input for an outbound FIFO decrement
#[derive(Debug, Clone, Deserialize)]
pub struct DecrementInput {
    pub branch_code: String,
    pub po_number: String,
    pub qty: i32,
    pub reason: Option<String>,
    pub order_id: Option<Uuid>,
}

/// Result of a committed decrement
#[derive(Debug, Clone, Serialize)]
pub struct DecrementOutcome {
    pub branch_code: String,
    pub po_number: String,
    pub qty: i32,
    /// Unit cost of the last lot consumed, used downstream for margins
    pub last_cost: Decimal,
    pub entry: LedgerEntry,
}

/// Query parameters for listing ledger entries
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerQuery {
    pub branch_code: String,
    pub change_type: Option<ChangeType>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Lot row as locked during a decrement
#[derive(Debug, Clone, FromRow)]
struct OpenLotRow {
    id: Uuid,
    name: String,
    brand: String,
    model: String,
    imei: Option<String>,
    document_number: Option<String>,
    remain_qty: i32,
    cost: Decimal,
    price: Decimal,
    unit: String,
}

/// Append one entry with its items inside an open transaction
pub async fn record_entry(
    tx: &mut Transaction<'_, Postgres>,
    entry: NewLedgerEntry,
) -> AppResult<LedgerEntry> {
    let row = sqlx::query_as::<_, LedgerEntryRow>(
        "INSERT INTO stock_ledger \
             (branch_code, change_type, reason, performed_by, order_id, contract_no, supplier_id, quantity) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         RETURNING id, branch_code, change_type, reason, performed_at, performed_by, \
                   order_id, contract_no, supplier_id, quantity",
    )
    .bind(&entry.branch_code)
    .bind(entry.change_type.as_str())
    .bind(&entry.reason)
    .bind(entry.performed_by)
    .bind(entry.order_id)
    .bind(&entry.contract_no)
    .bind(entry.supplier_id)
    .bind(entry.quantity)
    .fetch_one(&mut **tx)
    .await?;

    let mut items = Vec::with_capacity(entry.items.len());
    for (position, item) in entry.items.into_iter().enumerate() {
        let item_row = sqlx::query_as::<_, LedgerItemRow>(
            "INSERT INTO stock_ledger_items \
                 (entry_id, position, name, brand, model, imei, po_number, document_number, \
                  qty, remain_qty, cost, price, unit) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING id, entry_id, name, brand, model, imei, po_number, document_number, \
                       qty, remain_qty, cost, price, unit",
        )
        .bind(row.id)
        .bind(position as i32)
        .bind(&item.name)
        .bind(&item.brand)
        .bind(&item.model)
        .bind(&item.imei)
        .bind(&item.po_number)
        .bind(&item.document_number)
        .bind(item.qty)
        .bind(item.remain_qty)
        .bind(item.cost)
        .bind(item.price)
        .bind(&item.unit)
        .fetch_one(&mut **tx)
        .await?;
        items.push(LedgerItem::from(item_row));
    }

    row.into_entry(items)
}

fn is_serialization_conflict(err: &AppError) -> bool {
    match err {
        AppError::DatabaseError(sqlx::Error::Database(db)) => {
            matches!(db.code().as_deref(), Some("40001") | Some("40P01"))
        }
        _ => false,
    }
}

impl LedgerService {
    pub fn new(db: PgPool, events: EventBus) -> Self {
        Self { db, events }
    }

    /// Consume `qty` units from the inbound lots of one purchase order
    /// at one branch, oldest lot first.
    ///
    /// The lot walk, the `remain_qty` updates, the stock unit cleanup
    /// and the OUT entry all commit in one transaction; concurrent
    /// decrements of the same lots serialize on row locks and a
    /// conflicting attempt is retried from a fresh snapshot.
    pub async fn decrement(
        &self,
        input: DecrementInput,
        performed_by: Option<Uuid>,
    ) -> AppResult<DecrementOutcome> {
        if input.qty <= 0 {
            return Err(AppError::Validation {
                field: "qty".to_string(),
                message: "Quantity must be positive".to_string(),
                message_th: "จำนวนต้องมากกว่า 0".to_string(),
            });
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.try_decrement(&input, performed_by).await {
                Ok(outcome) => {
                    self.events.publish(StockEvent::StockDecremented {
                        branch_code: outcome.branch_code.clone(),
                        po_number: outcome.po_number.clone(),
                        qty: outcome.qty,
                        entry: outcome.entry.clone(),
                    });
                    return Ok(outcome);
                }
                Err(e) if is_serialization_conflict(&e) && attempt < MAX_DECREMENT_ATTEMPTS => {
                    tracing::warn!(
                        branch_code = %input.branch_code,
                        po_number = %input.po_number,
                        attempt,
                        "decrement hit serialization conflict, retrying"
                    );
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn try_decrement(
        &self,
        input: &DecrementInput,
        performed_by: Option<Uuid>,
    ) -> AppResult<DecrementOutcome> {
        let mut tx = self.db.begin().await?;

        let lots = sqlx::query_as::<_, OpenLotRow>(
            "SELECT li.id, li.name, li.brand, li.model, li.imei, li.document_number, \
                    li.remain_qty, li.cost, li.price, li.unit \
             FROM stock_ledger_items li \
             JOIN stock_ledger e ON e.id = li.entry_id \
             WHERE e.branch_code = $1 \
               AND e.change_type = 'IN' \
               AND li.po_number = $2 \
               AND li.remain_qty > 0 \
             ORDER BY e.performed_at, li.position \
             FOR UPDATE OF li",
        )
        .bind(&input.branch_code)
        .bind(&input.po_number)
        .fetch_all(&mut *tx)
        .await?;

        let planner_lots: Vec<FifoLot> = lots
            .iter()
            .map(|l| FifoLot {
                item_id: l.id,
                remain_qty: l.remain_qty,
                cost: l.cost,
            })
            .collect();

        let plan = plan_fifo_consumption(&planner_lots, input.qty).map_err(|available| {
            AppError::InsufficientStock(format!(
                "requested {} units of PO {} at branch {}, only {} remaining",
                input.qty, input.po_number, input.branch_code, available
            ))
        })?;

        for draw in &plan.draws {
            sqlx::query(
                "UPDATE stock_ledger_items SET remain_qty = remain_qty - $1 WHERE id = $2",
            )
            .bind(draw.take)
            .bind(draw.item_id)
            .execute(&mut *tx)
            .await?;
        }

        // The sale clears the unit store for this key wholesale; the
        // remaining quantity lives in the open lots
        sqlx::query("DELETE FROM branch_stock WHERE branch_code = $1 AND po_number = $2")
            .bind(&input.branch_code)
            .bind(&input.po_number)
            .execute(&mut *tx)
            .await?;

        // One summary item: identity and document number come from the
        // oldest lot drawn, the cost from the last lot touched
        let items = match plan
            .draws
            .first()
            .and_then(|draw| lots.iter().find(|l| l.id == draw.item_id))
        {
            Some(oldest) => vec![NewLedgerItem {
                name: oldest.name.clone(),
                brand: oldest.brand.clone(),
                model: oldest.model.clone(),
                imei: oldest.imei.clone(),
                po_number: Some(input.po_number.clone()),
                document_number: oldest.document_number.clone(),
                qty: input.qty,
                remain_qty: 0,
                cost: plan.last_cost,
                price: oldest.price,
                unit: oldest.unit.clone(),
            }],
            None => Vec::new(),
        };

        let entry = record_entry(
            &mut tx,
            NewLedgerEntry {
                branch_code: input.branch_code.clone(),
                change_type: ChangeType::Out,
                reason: input
                    .reason
                    .clone()
                    .unwrap_or_else(|| "ตัดสต๊อกขายสินค้า".to_string()),
                performed_by,
                order_id: input.order_id,
                contract_no: None,
                supplier_id: None,
                quantity: input.qty,
                items,
            },
        )
        .await?;

        tx.commit().await?;

        Ok(DecrementOutcome {
            branch_code: input.branch_code.clone(),
            po_number: input.po_number.clone(),
            qty: input.qty,
            last_cost: plan.last_cost,
            entry,
        })
    }

    /// Ledger entries for a branch, newest first
    pub async fn list_entries(&self, query: &LedgerQuery) -> AppResult<Vec<LedgerEntry>> {
        let branch_code = query.branch_code.as_str();
        let limit = query.limit.unwrap_or(50).clamp(1, 500);
        let offset = query.offset.unwrap_or(0).max(0);

        let rows = match query.change_type {
            Some(change_type) => {
                sqlx::query_as::<_, LedgerEntryRow>(
                    "SELECT id, branch_code, change_type, reason, performed_at, performed_by, \
                            order_id, contract_no, supplier_id, quantity \
                     FROM stock_ledger \
                     WHERE branch_code = $1 AND change_type = $2 \
                     ORDER BY performed_at DESC \
                     LIMIT $3 OFFSET $4",
                )
                .bind(branch_code)
                .bind(change_type.as_str())
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.db)
                .await?
            }
            None => {
                sqlx::query_as::<_, LedgerEntryRow>(
                    "SELECT id, branch_code, change_type, reason, performed_at, performed_by, \
                            order_id, contract_no, supplier_id, quantity \
                     FROM stock_ledger \
                     WHERE branch_code = $1 \
                     ORDER BY performed_at DESC \
                     LIMIT $2 OFFSET $3",
                )
                .bind(branch_code)
                .bind(limit)
                .bind(offset)
                .fetch_all(&self.db)
                .await?
            }
        };

        let entry_ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let item_rows = sqlx::query_as::<_, LedgerItemRow>(
            "SELECT id, entry_id, name, brand, model, imei, po_number, document_number, \
                    qty, remain_qty, cost, price, unit \
             FROM stock_ledger_items \
             WHERE entry_id = ANY($1) \
             ORDER BY entry_id, position",
        )
        .bind(&entry_ids)
        .fetch_all(&self.db)
        .await?;

        let mut items_by_entry: std::collections::HashMap<Uuid, Vec<LedgerItem>> =
            std::collections::HashMap::new();
        for item in item_rows {
            items_by_entry
                .entry(item.entry_id)
                .or_default()
                .push(LedgerItem::from(item));
        }

        rows.into_iter()
            .map(|row| {
                let items = items_by_entry.remove(&row.id).unwrap_or_default();
                row.into_entry(items)
            })
            .collect()
    }

    /// Remaining quantity across open inbound lots of a purchase order
    pub async fn remaining_for_po(&self, branch_code: &str, po_number: &str) -> AppResult<i64> {
        let remaining = sqlx::query_scalar::<_, Option<i64>>(
            "SELECT SUM(li.remain_qty)::bigint \
             FROM stock_ledger_items li \
             JOIN stock_ledger e ON e.id = li.entry_id \
             WHERE e.branch_code = $1 AND e.change_type = 'IN' AND li.po_number = $2",
        )
        .bind(branch_code)
        .bind(po_number)
        .fetch_one(&self.db)
        .await?;
        Ok(remaining.unwrap_or(0))
    }
}

