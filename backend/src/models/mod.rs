//! Database models for the Branch Stock Ledger Platform
//!
//! Re-exports models from the shared crate and adds the row types used
//! to map `branch_stock` and `stock_ledger` tables onto them. Enum-like
//! columns are stored as text and parsed here so the shared crate stays
//! free of database dependencies.

pub use shared::models::*;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::AppError;

/// Raw `branch_stock` row
#[derive(Debug, Clone, FromRow)]
pub struct StockUnitRow {
    pub id: Uuid,
    pub branch_code: String,
    pub name: String,
    pub brand: String,
    pub model: String,
    pub imei: Option<String>,
    pub barcode: Option<String>,
    pub price: Decimal,
    pub cost: Decimal,
    pub tax_type: String,
    pub tax_rate: Decimal,
    pub unit: String,
    pub stock_type: String,
    pub product_type: String,
    pub category_name: String,
    pub category_group_id: Option<Uuid>,
    pub state: String,
    pub stock_value: i32,
    pub po_number: Option<String>,
    pub document_number: Option<String>,
    pub invoice_number: Option<String>,
    pub supplier_id: Option<Uuid>,
    pub down_amount: Decimal,
    pub down_installment_count: i32,
    pub down_installment: Decimal,
    pub credit_threshold: Decimal,
    pub pay_use_installment_count: i32,
    pub pay_use_installment: Decimal,
    pub verified_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Columns selected for every `branch_stock` query
pub const STOCK_UNIT_COLUMNS: &str = "id, branch_code, name, brand, model, imei, barcode, \
     price, cost, tax_type, tax_rate, unit, stock_type, product_type, \
     category_name, category_group_id, state, stock_value, \
     po_number, document_number, invoice_number, supplier_id, \
     down_amount, down_installment_count, down_installment, \
     credit_threshold, pay_use_installment_count, pay_use_installment, \
     verified_by, updated_by, created_at, updated_at";

fn parse_column<T>(value: &str, column: &str) -> Result<T, AppError>
where
    T: std::str::FromStr<Err = String>,
{
    value
        .parse()
        .map_err(|e| AppError::Internal(format!("corrupt {} column: {}", column, e)))
}

impl TryFrom<StockUnitRow> for StockUnit {
    type Error = AppError;

    fn try_from(row: StockUnitRow) -> Result<Self, Self::Error> {
        Ok(StockUnit {
            id: row.id,
            branch_code: row.branch_code,
            name: row.name,
            brand: row.brand,
            model: row.model,
            imei: row.imei,
            barcode: row.barcode,
            price: row.price,
            cost: row.cost,
            tax_type: parse_column(&row.tax_type, "tax_type")?,
            tax_rate: row.tax_rate,
            unit: row.unit,
            stock_type: parse_column(&row.stock_type, "stock_type")?,
            product_type: parse_column(&row.product_type, "product_type")?,
            category_name: row.category_name,
            category_group_id: row.category_group_id,
            state: parse_column(&row.state, "state")?,
            stock_value: row.stock_value,
            po_number: row.po_number,
            document_number: row.document_number,
            invoice_number: row.invoice_number,
            supplier_id: row.supplier_id,
            installment: InstallmentPricing {
                down_amount: row.down_amount,
                down_installment_count: row.down_installment_count,
                down_installment: row.down_installment,
                credit_threshold: row.credit_threshold,
                pay_use_installment_count: row.pay_use_installment_count,
                pay_use_installment: row.pay_use_installment,
            },
            verified_by: row.verified_by,
            updated_by: row.updated_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Raw `stock_ledger` row (items are fetched separately)
#[derive(Debug, Clone, FromRow)]
pub struct LedgerEntryRow {
    pub id: Uuid,
    pub branch_code: String,
    pub change_type: String,
    pub reason: String,
    pub performed_at: DateTime<Utc>,
    pub performed_by: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub contract_no: Option<String>,
    pub supplier_id: Option<Uuid>,
    pub quantity: i32,
}

impl LedgerEntryRow {
    pub fn into_entry(self, items: Vec<LedgerItem>) -> Result<LedgerEntry, AppError> {
        Ok(LedgerEntry {
            id: self.id,
            branch_code: self.branch_code,
            change_type: parse_column(&self.change_type, "change_type")?,
            reason: self.reason,
            performed_at: self.performed_at,
            performed_by: self.performed_by,
            order_id: self.order_id,
            contract_no: self.contract_no,
            supplier_id: self.supplier_id,
            quantity: self.quantity,
            items,
        })
    }
}

/// Raw `stock_ledger_items` row
#[derive(Debug, Clone, FromRow)]
pub struct LedgerItemRow {
    pub id: Uuid,
    pub entry_id: Uuid,
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

impl From<LedgerItemRow> for LedgerItem {
    fn from(row: LedgerItemRow) -> Self {
        LedgerItem {
            id: row.id,
            name: row.name,
            brand: row.brand,
            model: row.model,
            imei: row.imei,
            po_number: row.po_number,
            document_number: row.document_number,
            qty: row.qty,
            remain_qty: row.remain_qty,
            cost: row.cost,
            price: row.price,
            unit: row.unit,
        }
    }
}
