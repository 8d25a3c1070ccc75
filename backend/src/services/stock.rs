//! Stock unit lifecycle service
//!
//! Owns the `branch_stock` table: intake of pending units, managerial
//! approval and rejection, field updates and the read API. Every
//! mutation appends the matching ledger entry inside the same
//! transaction, so the unit store and the history log cannot drift.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::events::{EventBus, StockEvent};
use crate::models::{
    ChangeType, InstallmentPricing, ProductType, StockState, StockType, StockUnit, StockUnitRow,
    TaxType, TransitionError, STOCK_UNIT_COLUMNS,
};
use crate::services::catalog::CatalogService;
use crate::services::enrichment::{self, EnrichmentSources, StockDraft};
use crate::services::ledger::{record_entry, NewLedgerEntry, NewLedgerItem};
use shared::validation;

#[derive(Clone)]
pub struct StockService {
    db: PgPool,
    catalog: CatalogService,
    events: EventBus,
}

/// Request to register a new stock unit (arrives pending)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateStockInput {
    pub branch_code: String,
    pub name: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub imei: Option<String>,
    pub barcode: Option<String>,
    pub price: Option<Decimal>,
    pub cost: Option<Decimal>,
    pub tax_type: Option<TaxType>,
    pub tax_rate: Option<Decimal>,
    pub unit: Option<String>,
    pub stock_type: Option<StockType>,
    pub product_type: Option<ProductType>,
    pub category_name: Option<String>,
    pub category_group_id: Option<Uuid>,
    pub po_number: Option<String>,
    pub document_number: Option<String>,
    pub invoice_number: Option<String>,
    /// Supplier id or case-insensitive supplier name
    pub supplier: Option<String>,
    pub installment: Option<InstallmentPricing>,
}

/// Request to approve a pending unit
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApproveStockInput {
    /// Quantity entering stock; only honoured for quantity-tracked
    /// units, IMEI units always enter with one
    pub qty: Option<i32>,
}

/// Request to edit a unit's descriptive fields
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateStockInput {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub imei: Option<String>,
    pub barcode: Option<String>,
    pub price: Option<Decimal>,
    pub cost: Option<Decimal>,
    pub tax_type: Option<TaxType>,
    pub tax_rate: Option<Decimal>,
    pub unit: Option<String>,
    pub category_name: Option<String>,
    pub po_number: Option<String>,
    pub document_number: Option<String>,
    pub invoice_number: Option<String>,
}

/// Request to reprice a unit
#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePriceInput {
    pub price: Decimal,
    pub installment: Option<InstallmentPricing>,
}

/// Filters for the branch stock listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StockQuery {
    pub state: Option<StockState>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Outcome of a create call; `created` is false when an identical
/// pending unit already existed and was returned instead
#[derive(Debug, Clone, Serialize)]
pub struct CreateStockOutcome {
    pub unit: StockUnit,
    pub created: bool,
    /// Advisory only; selling below cost is allowed but flagged
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Snapshot of a purchase order's stock at one branch
#[derive(Debug, Clone, Serialize)]
pub struct CostLookup {
    pub branch_code: String,
    pub po_number: String,
    pub name: String,
    pub cost: Decimal,
    pub price: Decimal,
    pub stock_value: i32,
    pub document_number: Option<String>,
}

fn validation_error(field: &str, message: &'static str) -> AppError {
    AppError::Validation {
        field: field.to_string(),
        message: message.to_string(),
        message_th: format!("ข้อมูล {} ไม่ถูกต้อง", field),
    }
}

impl StockService {
    pub fn new(db: PgPool, events: EventBus) -> Self {
        let catalog = CatalogService::new(db.clone());
        Self {
            db,
            catalog,
            events,
        }
    }

    /// Register a unit as pending approval.
    ///
    /// Creating the same pending unit twice is idempotent: the existing
    /// pending row is returned instead of a duplicate. An IMEI already
    /// present on a verified unit at the branch is a conflict.
    pub async fn create(
        &self,
        input: CreateStockInput,
        performed_by: Option<Uuid>,
    ) -> AppResult<CreateStockOutcome> {
        let identified = !input.name.trim().is_empty()
            || input.brand.as_deref().is_some_and(|b| !b.trim().is_empty())
            || input.model.as_deref().is_some_and(|m| !m.trim().is_empty());
        if !identified {
            return Err(validation_error(
                "name",
                "At least one of name, brand or model is required",
            ));
        }
        validation::validate_branch_code(&input.branch_code)
            .map_err(|m| validation_error("branch_code", m))?;
        if let Some(imei) = &input.imei {
            validation::validate_imei(imei).map_err(|m| validation_error("imei", m))?;
        }
        if let Some(barcode) = &input.barcode {
            validation::validate_barcode(barcode).map_err(|m| validation_error("barcode", m))?;
        }
        if let Some(price) = input.price {
            validation::validate_money(price).map_err(|m| validation_error("price", m))?;
        }
        if let Some(cost) = input.cost {
            validation::validate_money(cost).map_err(|m| validation_error("cost", m))?;
        }

        if !self.catalog.branch_exists(&input.branch_code).await? {
            return Err(AppError::NotFound(format!(
                "Branch {}",
                input.branch_code
            )));
        }

        if let Some(imei) = &input.imei {
            if let Some(existing) = self.find_by_imei(&input.branch_code, imei).await? {
                if existing.state.is_pending() {
                    tracing::info!(
                        branch_code = %input.branch_code,
                        imei = %imei,
                        "pending unit already registered, returning existing"
                    );
                    return Ok(CreateStockOutcome {
                        unit: existing,
                        created: false,
                        warning: None,
                    });
                }
                return Err(AppError::DuplicateEntry("imei".to_string()));
            }
        }

        // Registering the same identity twice while the first is still
        // awaiting approval returns the pending unit unchanged
        if let Some(existing) = self.find_pending_by_identity(&input).await? {
            tracing::info!(
                branch_code = %input.branch_code,
                name = %input.name,
                "pending unit with this identity exists, returning existing"
            );
            return Ok(CreateStockOutcome {
                unit: existing,
                created: false,
                warning: None,
            });
        }

        let supplier_id = match &input.supplier {
            Some(reference) => self
                .catalog
                .find_supplier(reference)
                .await?
                .map(|s| s.id),
            None => None,
        };

        let draft = StockDraft {
            name: input.name.clone(),
            brand: input.brand.clone(),
            model: input.model.clone(),
            imei: input.imei.clone(),
            barcode: input.barcode.clone(),
            price: input.price,
            cost: input.cost,
            tax_type: input.tax_type,
            tax_rate: input.tax_rate,
            unit: input.unit.clone(),
            stock_type: input.stock_type,
            product_type: input.product_type,
            category_name: input.category_name.clone(),
            category_group_id: input.category_group_id,
            document_number: input.document_number.clone(),
            supplier_id,
            installment: input.installment.clone(),
        };
        let sources = self
            .load_enrichment_sources(&draft, input.po_number.as_deref())
            .await?;
        if input.po_number.is_some() && sources.purchase_order.is_none() {
            return Err(AppError::NotFound(format!(
                "Purchase order {}",
                input.po_number.as_deref().unwrap_or("")
            )));
        }
        let resolved = enrichment::resolve(&draft, &sources);

        let mut tx = self.db.begin().await?;

        let row = sqlx::query_as::<_, StockUnitRow>(&format!(
            "INSERT INTO branch_stock \
                 (branch_code, name, brand, model, imei, barcode, price, cost, \
                  tax_type, tax_rate, unit, stock_type, product_type, \
                  category_name, category_group_id, state, stock_value, \
                  po_number, document_number, invoice_number, supplier_id, \
                  down_amount, down_installment_count, down_installment, \
                  credit_threshold, pay_use_installment_count, pay_use_installment, \
                  updated_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, \
                     'pending', 0, $16, $17, $18, $19, $20, $21, $22, $23, $24, $25, $26) \
             RETURNING {}",
            STOCK_UNIT_COLUMNS
        ))
        .bind(&input.branch_code)
        .bind(&resolved.name)
        .bind(&resolved.brand)
        .bind(&resolved.model)
        .bind(&input.imei)
        .bind(&input.barcode)
        .bind(resolved.price)
        .bind(resolved.cost)
        .bind(resolved.tax_type.as_str())
        .bind(resolved.tax_rate)
        .bind(&resolved.unit)
        .bind(resolved.stock_type.as_str())
        .bind(resolved.product_type.as_str())
        .bind(&resolved.category_name)
        .bind(resolved.category_group_id)
        .bind(&input.po_number)
        .bind(&resolved.document_number)
        .bind(&input.invoice_number)
        .bind(resolved.supplier_id)
        .bind(resolved.installment.down_amount)
        .bind(resolved.installment.down_installment_count)
        .bind(resolved.installment.down_installment)
        .bind(resolved.installment.credit_threshold)
        .bind(resolved.installment.pay_use_installment_count)
        .bind(resolved.installment.pay_use_installment)
        .bind(performed_by)
        .fetch_one(&mut *tx)
        .await?;

        let unit = StockUnit::try_from(row)?;

        // Informational entry; the unit carries no sellable stock yet
        record_entry(
            &mut tx,
            NewLedgerEntry {
                branch_code: unit.branch_code.clone(),
                change_type: ChangeType::InPending,
                reason: "รับสินค้าเข้าระบบ รออนุมัติ".to_string(),
                performed_by,
                order_id: None,
                contract_no: None,
                supplier_id: unit.supplier_id,
                quantity: 0,
                items: vec![NewLedgerItem {
                    name: unit.name.clone(),
                    brand: unit.brand.clone(),
                    model: unit.model.clone(),
                    imei: unit.imei.clone(),
                    po_number: unit.po_number.clone(),
                    document_number: unit.document_number.clone(),
                    qty: 0,
                    remain_qty: 0,
                    cost: unit.cost,
                    price: unit.price,
                    unit: unit.unit.clone(),
                }],
            },
        )
        .await?;

        tx.commit().await?;

        self.events
            .publish(StockEvent::StockCreated { unit: unit.clone() });

        let warning = validation::price_below_cost(unit.price, unit.cost).then(|| {
            format!(
                "price {} is below cost {} for {}",
                unit.price, unit.cost, unit.name
            )
        });

        Ok(CreateStockOutcome {
            unit,
            created: true,
            warning,
        })
    }

    /// Approve a pending unit, making it sellable.
    ///
    /// The state change, the stock counter and the inbound ledger entry
    /// commit together; the inbound lot's `remain_qty` starts equal to
    /// the approved quantity.
    pub async fn approve(
        &self,
        id: Uuid,
        input: ApproveStockInput,
        approved_by: Uuid,
    ) -> AppResult<StockUnit> {
        let mut tx = self.db.begin().await?;

        let unit = self.fetch_for_update(&mut tx, id).await?;
        unit.state
            .transition(StockState::Verified)
            .map_err(map_transition_error)?;

        let qty = match unit.stock_type {
            StockType::Imei => 1,
            StockType::Quantity => {
                let qty = input.qty.unwrap_or(1);
                validation::validate_quantity(qty).map_err(|m| validation_error("qty", m))?;
                qty
            }
        };

        let row = sqlx::query_as::<_, StockUnitRow>(&format!(
            "UPDATE branch_stock \
             SET state = 'verified', stock_value = $1, verified_by = $2, updated_at = now() \
             WHERE id = $3 \
             RETURNING {}",
            STOCK_UNIT_COLUMNS
        ))
        .bind(qty)
        .bind(approved_by)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        let unit = StockUnit::try_from(row)?;

        record_entry(
            &mut tx,
            NewLedgerEntry {
                branch_code: unit.branch_code.clone(),
                change_type: ChangeType::In,
                reason: "อนุมัติรับสินค้าเข้าสต๊อก".to_string(),
                performed_by: Some(approved_by),
                order_id: None,
                contract_no: None,
                supplier_id: unit.supplier_id,
                quantity: qty,
                items: vec![NewLedgerItem {
                    name: unit.name.clone(),
                    brand: unit.brand.clone(),
                    model: unit.model.clone(),
                    imei: unit.imei.clone(),
                    po_number: unit.po_number.clone(),
                    document_number: unit.document_number.clone(),
                    qty,
                    remain_qty: qty,
                    cost: unit.cost,
                    price: unit.price,
                    unit: unit.unit.clone(),
                }],
            },
        )
        .await?;

        tx.commit().await?;

        self.events
            .publish(StockEvent::StockApproved { unit: unit.clone() });
        Ok(unit)
    }

    /// Remove a unit. For a pending unit this is the rejection decision
    /// and requires a managerial role; removing an already verified unit
    /// is an administrative cleanup open to any authenticated caller.
    /// No compensating ledger entry is written either way; the
    /// IN_PENDING record keeps the trace.
    pub async fn reject(&self, id: Uuid, user: &crate::middleware::AuthUser) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let unit = self.fetch_for_update(&mut tx, id).await?;
        if unit.state.is_pending() {
            crate::middleware::check_approval_role(user)?;
        }

        sqlx::query("DELETE FROM branch_stock WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(unit_id = %id, removed_by = %user.user_id, "stock unit removed");
        self.events.publish(StockEvent::StockDeleted {
            unit_id: id,
            branch_code: unit.branch_code,
        });
        Ok(())
    }

    /// Edit a unit's descriptive fields. Fields omitted from the input
    /// keep their value; an IMEI change is journalled as UPDATE_IMEI.
    pub async fn update(
        &self,
        id: Uuid,
        input: UpdateStockInput,
        updated_by: Uuid,
    ) -> AppResult<StockUnit> {
        if let Some(imei) = &input.imei {
            validation::validate_imei(imei).map_err(|m| validation_error("imei", m))?;
        }
        if let Some(barcode) = &input.barcode {
            validation::validate_barcode(barcode).map_err(|m| validation_error("barcode", m))?;
        }
        if let Some(price) = input.price {
            validation::validate_money(price).map_err(|m| validation_error("price", m))?;
        }
        if let Some(cost) = input.cost {
            validation::validate_money(cost).map_err(|m| validation_error("cost", m))?;
        }

        let mut tx = self.db.begin().await?;
        let current = self.fetch_for_update(&mut tx, id).await?;

        let imei_changed = match &input.imei {
            Some(imei) => current.imei.as_deref() != Some(imei.as_str()),
            None => false,
        };

        // Merge the edit over the current values, then re-resolve so a
        // renamed product picks up its catalog fields again
        let po_number = input.po_number.clone().or_else(|| current.po_number.clone());
        let draft = StockDraft {
            name: input.name.clone().unwrap_or_else(|| current.name.clone()),
            brand: input.brand.clone().or_else(|| Some(current.brand.clone())),
            model: input.model.clone().or_else(|| Some(current.model.clone())),
            imei: input.imei.clone().or_else(|| current.imei.clone()),
            barcode: input.barcode.clone().or_else(|| current.barcode.clone()),
            price: input.price.or(Some(current.price)),
            cost: input.cost.or(Some(current.cost)),
            tax_type: input.tax_type.or(Some(current.tax_type)),
            tax_rate: input.tax_rate.or(Some(current.tax_rate)),
            unit: input.unit.clone().or_else(|| Some(current.unit.clone())),
            stock_type: Some(current.stock_type),
            product_type: Some(current.product_type),
            category_name: input
                .category_name
                .clone()
                .or_else(|| Some(current.category_name.clone())),
            category_group_id: current.category_group_id,
            document_number: input
                .document_number
                .clone()
                .or_else(|| current.document_number.clone()),
            supplier_id: current.supplier_id,
            installment: Some(current.installment.clone()),
        };
        let sources = self
            .load_enrichment_sources(&draft, po_number.as_deref())
            .await?;
        let resolved = enrichment::resolve(&draft, &sources);

        let row = sqlx::query_as::<_, StockUnitRow>(&format!(
            "UPDATE branch_stock \
             SET name = $1, brand = $2, model = $3, imei = $4, barcode = $5, \
                 price = $6, cost = $7, tax_type = $8, tax_rate = $9, unit = $10, \
                 category_name = $11, category_group_id = $12, \
                 po_number = $13, document_number = $14, invoice_number = $15, \
                 supplier_id = $16, updated_by = $17, updated_at = now() \
             WHERE id = $18 \
             RETURNING {}",
            STOCK_UNIT_COLUMNS
        ))
        .bind(&resolved.name)
        .bind(&resolved.brand)
        .bind(&resolved.model)
        .bind(&draft.imei)
        .bind(&draft.barcode)
        .bind(resolved.price)
        .bind(resolved.cost)
        .bind(resolved.tax_type.as_str())
        .bind(resolved.tax_rate)
        .bind(&resolved.unit)
        .bind(&resolved.category_name)
        .bind(resolved.category_group_id)
        .bind(&po_number)
        .bind(&resolved.document_number)
        .bind(
            input
                .invoice_number
                .clone()
                .or_else(|| current.invoice_number.clone()),
        )
        .bind(resolved.supplier_id)
        .bind(updated_by)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        let unit = StockUnit::try_from(row)?;

        if imei_changed {
            record_entry(
                &mut tx,
                NewLedgerEntry {
                    branch_code: unit.branch_code.clone(),
                    change_type: ChangeType::UpdateImei,
                    reason: format!(
                        "แก้ไข IMEI จาก {} เป็น {}",
                        current.imei.as_deref().unwrap_or("-"),
                        unit.imei.as_deref().unwrap_or("-")
                    ),
                    performed_by: Some(updated_by),
                    order_id: None,
                    contract_no: None,
                    supplier_id: unit.supplier_id,
                    quantity: 0,
                    items: vec![NewLedgerItem {
                        name: unit.name.clone(),
                        brand: unit.brand.clone(),
                        model: unit.model.clone(),
                        imei: unit.imei.clone(),
                        po_number: unit.po_number.clone(),
                        document_number: unit.document_number.clone(),
                        qty: 0,
                        remain_qty: 0,
                        cost: unit.cost,
                        price: unit.price,
                        unit: unit.unit.clone(),
                    }],
                },
            )
            .await?;
        }

        tx.commit().await?;

        self.events
            .publish(StockEvent::StockUpdated { unit: unit.clone() });
        Ok(unit)
    }

    /// Reprice a unit without touching its ledger history
    pub async fn update_price(
        &self,
        id: Uuid,
        input: UpdatePriceInput,
        updated_by: Uuid,
    ) -> AppResult<StockUnit> {
        validation::validate_money(input.price).map_err(|m| validation_error("price", m))?;

        let installment = input.installment.unwrap_or_default();
        let row = sqlx::query_as::<_, StockUnitRow>(&format!(
            "UPDATE branch_stock \
             SET price = $1, down_amount = $2, down_installment_count = $3, \
                 down_installment = $4, credit_threshold = $5, \
                 pay_use_installment_count = $6, pay_use_installment = $7, \
                 updated_by = $8, updated_at = now() \
             WHERE id = $9 \
             RETURNING {}",
            STOCK_UNIT_COLUMNS
        ))
        .bind(input.price)
        .bind(installment.down_amount)
        .bind(installment.down_installment_count)
        .bind(installment.down_installment)
        .bind(installment.credit_threshold)
        .bind(installment.pay_use_installment_count)
        .bind(installment.pay_use_installment)
        .bind(updated_by)
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock unit".to_string()))?;

        let unit = StockUnit::try_from(row)?;
        self.events
            .publish(StockEvent::StockUpdated { unit: unit.clone() });
        Ok(unit)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<StockUnit> {
        let row = sqlx::query_as::<_, StockUnitRow>(&format!(
            "SELECT {} FROM branch_stock WHERE id = $1",
            STOCK_UNIT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock unit".to_string()))?;
        StockUnit::try_from(row)
    }

    /// Stock units at a branch, newest first
    pub async fn list(&self, branch_code: &str, query: &StockQuery) -> AppResult<Vec<StockUnit>> {
        let limit = query.limit.unwrap_or(50).clamp(1, 500);
        let offset = query.offset.unwrap_or(0).max(0);
        let search = query
            .search
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));

        let rows = sqlx::query_as::<_, StockUnitRow>(&format!(
            "SELECT {} FROM branch_stock \
             WHERE branch_code = $1 \
               AND ($2::text IS NULL OR state = $2) \
               AND ($3::text IS NULL OR name ILIKE $3 OR imei ILIKE $3 OR barcode ILIKE $3) \
             ORDER BY created_at DESC \
             LIMIT $4 OFFSET $5",
            STOCK_UNIT_COLUMNS
        ))
        .bind(branch_code)
        .bind(query.state.map(|s| s.as_str()))
        .bind(search)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(StockUnit::try_from).collect()
    }

    /// Unit cost recorded for a purchase order's stock at a branch
    pub async fn cost_for_po(&self, branch_code: &str, po_number: &str) -> AppResult<CostLookup> {
        let row = sqlx::query_as::<_, StockUnitRow>(&format!(
            "SELECT {} FROM branch_stock \
             WHERE branch_code = $1 AND po_number = $2 \
             ORDER BY created_at DESC \
             LIMIT 1",
            STOCK_UNIT_COLUMNS
        ))
        .bind(branch_code)
        .bind(po_number)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Stock for PO {} at branch {}", po_number, branch_code))
        })?;

        Ok(CostLookup {
            branch_code: branch_code.to_string(),
            po_number: po_number.to_string(),
            name: row.name,
            cost: row.cost,
            price: row.price,
            stock_value: row.stock_value,
            document_number: row.document_number,
        })
    }

    async fn find_pending_by_identity(
        &self,
        input: &CreateStockInput,
    ) -> AppResult<Option<StockUnit>> {
        let row = sqlx::query_as::<_, StockUnitRow>(&format!(
            "SELECT {} FROM branch_stock \
             WHERE branch_code = $1 AND state = 'pending' \
               AND lower(name) = lower($2) \
               AND lower(brand) = lower($3) \
               AND lower(model) = lower($4) \
             LIMIT 1",
            STOCK_UNIT_COLUMNS
        ))
        .bind(&input.branch_code)
        .bind(&input.name)
        .bind(input.brand.as_deref().unwrap_or(""))
        .bind(input.model.as_deref().unwrap_or(""))
        .fetch_optional(&self.db)
        .await?;
        row.map(StockUnit::try_from).transpose()
    }

    async fn find_by_imei(&self, branch_code: &str, imei: &str) -> AppResult<Option<StockUnit>> {
        let row = sqlx::query_as::<_, StockUnitRow>(&format!(
            "SELECT {} FROM branch_stock WHERE branch_code = $1 AND imei = $2 LIMIT 1",
            STOCK_UNIT_COLUMNS
        ))
        .bind(branch_code)
        .bind(imei)
        .fetch_optional(&self.db)
        .await?;
        row.map(StockUnit::try_from).transpose()
    }

    async fn fetch_for_update(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> AppResult<StockUnit> {
        let row = sqlx::query_as::<_, StockUnitRow>(&format!(
            "SELECT {} FROM branch_stock WHERE id = $1 FOR UPDATE",
            STOCK_UNIT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Stock unit".to_string()))?;
        StockUnit::try_from(row)
    }

    async fn load_enrichment_sources(
        &self,
        draft: &StockDraft,
        po_number: Option<&str>,
    ) -> AppResult<EnrichmentSources> {
        let catalog = self.catalog.find_product_by_name(&draft.name).await?;
        let purchase_order = match po_number {
            Some(po) => self.catalog.find_purchase_order(po).await?,
            None => None,
        };

        let category_group_id = draft
            .category_group_id
            .or_else(|| catalog.as_ref().and_then(|c| c.category_group_id))
            .or_else(|| {
                purchase_order
                    .as_ref()
                    .and_then(|po| po.order.category_group_id)
            });
        let category_unit = match category_group_id {
            Some(id) => self
                .catalog
                .category_group(id)
                .await?
                .map(|g| g.unit_name),
            None => None,
        };

        Ok(EnrichmentSources {
            catalog,
            purchase_order,
            category_unit,
            supplier_id: draft.supplier_id,
        })
    }
}

fn map_transition_error(err: TransitionError) -> AppError {
    match err {
        TransitionError::AlreadyVerified => AppError::Conflict {
            resource: "state".to_string(),
            message: "Unit is already verified".to_string(),
            message_th: "รายการนี้ถูกอนุมัติไปแล้ว".to_string(),
        },
        TransitionError::NotPending | TransitionError::Rejected => AppError::NotPending,
    }
}
