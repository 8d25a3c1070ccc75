//! Read-only lookups against collaborator tables
//!
//! The stock ledger does not own catalog records, purchase orders,
//! suppliers or contracts; it only reads them during enrichment and
//! boxset resolution. All lookups here are side-effect free.

use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::AppResult;

#[derive(Clone)]
pub struct CatalogService {
    db: PgPool,
}

/// Catalog record for a product name
#[derive(Debug, Clone, FromRow)]
pub struct ProductImage {
    pub id: Uuid,
    pub name: String,
    pub brand: String,
    pub model: String,
    pub price: Decimal,
    pub cost: Decimal,
    pub tax_type: String,
    pub stock_type: String,
    pub product_type: String,
    pub category_name: String,
    pub category_group_id: Option<Uuid>,
    pub down_amount: Decimal,
    pub down_installment_count: i32,
    pub down_installment: Decimal,
    pub credit_threshold: Decimal,
    pub pay_use_installment_count: i32,
    pub pay_use_installment: Decimal,
}

const PRODUCT_IMAGE_COLUMNS: &str = "id, name, brand, model, price, cost, tax_type, stock_type, \
     product_type, category_name, category_group_id, down_amount, \
     down_installment_count, down_installment, credit_threshold, \
     pay_use_installment_count, pay_use_installment";

/// Purchase order header
#[derive(Debug, Clone, FromRow)]
pub struct PurchaseOrder {
    pub id: Uuid,
    pub po_number: String,
    pub document_number: String,
    pub tax_type: Option<String>,
    pub category_group_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
}

/// One line of a purchase order
#[derive(Debug, Clone, FromRow)]
pub struct PurchaseOrderLine {
    pub id: Uuid,
    pub imei: Option<String>,
    pub name: String,
    pub brand: String,
    pub model: String,
    pub cost: Decimal,
    pub tax_type: Option<String>,
    pub tax_rate: Decimal,
}

/// Purchase order with its lines, as consumed by enrichment
#[derive(Debug, Clone)]
pub struct PurchaseOrderDetails {
    pub order: PurchaseOrder,
    pub lines: Vec<PurchaseOrderLine>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Supplier {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct CategoryGroup {
    pub id: Uuid,
    pub name: String,
    pub unit_name: String,
}

/// Installment contract header
#[derive(Debug, Clone, FromRow)]
pub struct Contract {
    pub id: Uuid,
    pub contract_no: String,
    pub branch_code: String,
    pub plan_type: String,
    pub payment_status: String,
}

/// One product line on a contract
#[derive(Debug, Clone, FromRow)]
pub struct ContractItem {
    pub id: Uuid,
    pub product_image_id: Option<Uuid>,
    pub name: String,
    pub product_type: String,
    pub tax_type: String,
}

impl CatalogService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn branch_exists(&self, branch_code: &str) -> AppResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM branches WHERE branch_code = $1)",
        )
        .bind(branch_code)
        .fetch_one(&self.db)
        .await?;
        Ok(exists)
    }

    /// Catalog record matched case-insensitively by product name
    pub async fn find_product_by_name(&self, name: &str) -> AppResult<Option<ProductImage>> {
        let product = sqlx::query_as::<_, ProductImage>(&format!(
            "SELECT {} FROM product_images WHERE lower(name) = lower($1) LIMIT 1",
            PRODUCT_IMAGE_COLUMNS
        ))
        .bind(name)
        .fetch_optional(&self.db)
        .await?;
        Ok(product)
    }

    /// Constituents of a boxset catalog record, in catalog order
    pub async fn boxset_constituents(&self, boxset_id: Uuid) -> AppResult<Vec<ProductImage>> {
        let constituents = sqlx::query_as::<_, ProductImage>(
            "SELECT p.id, p.name, p.brand, p.model, p.price, p.cost, p.tax_type, \
                    p.stock_type, p.product_type, p.category_name, p.category_group_id, \
                    p.down_amount, p.down_installment_count, p.down_installment, \
                    p.credit_threshold, p.pay_use_installment_count, p.pay_use_installment \
             FROM product_images p \
             JOIN product_image_boxset_items b ON b.constituent_id = p.id \
             WHERE b.boxset_id = $1 \
             ORDER BY b.position",
        )
        .bind(boxset_id)
        .fetch_all(&self.db)
        .await?;
        Ok(constituents)
    }

    /// Purchase order with lines, by PO number
    pub async fn find_purchase_order(
        &self,
        po_number: &str,
    ) -> AppResult<Option<PurchaseOrderDetails>> {
        let order = sqlx::query_as::<_, PurchaseOrder>(
            "SELECT id, po_number, document_number, tax_type, category_group_id, supplier_id \
             FROM purchase_orders WHERE po_number = $1",
        )
        .bind(po_number)
        .fetch_optional(&self.db)
        .await?;

        let Some(order) = order else {
            return Ok(None);
        };

        let lines = sqlx::query_as::<_, PurchaseOrderLine>(
            "SELECT id, imei, name, brand, model, cost, tax_type, tax_rate \
             FROM purchase_order_items WHERE purchase_order_id = $1 \
             ORDER BY position",
        )
        .bind(order.id)
        .fetch_all(&self.db)
        .await?;

        Ok(Some(PurchaseOrderDetails { order, lines }))
    }

    /// Supplier by id, or by case-insensitive name when the reference is
    /// not a UUID
    pub async fn find_supplier(&self, reference: &str) -> AppResult<Option<Supplier>> {
        if let Ok(id) = Uuid::parse_str(reference) {
            let supplier =
                sqlx::query_as::<_, Supplier>("SELECT id, name FROM suppliers WHERE id = $1")
                    .bind(id)
                    .fetch_optional(&self.db)
                    .await?;
            return Ok(supplier);
        }

        let supplier = sqlx::query_as::<_, Supplier>(
            "SELECT id, name FROM suppliers WHERE lower(name) = lower($1) LIMIT 1",
        )
        .bind(reference)
        .fetch_optional(&self.db)
        .await?;
        Ok(supplier)
    }

    pub async fn category_group(&self, id: Uuid) -> AppResult<Option<CategoryGroup>> {
        let group = sqlx::query_as::<_, CategoryGroup>(
            "SELECT id, name, unit_name FROM category_groups WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(group)
    }

    pub async fn find_contract(&self, contract_no: &str) -> AppResult<Option<Contract>> {
        let contract = sqlx::query_as::<_, Contract>(
            "SELECT id, contract_no, branch_code, plan_type, payment_status \
             FROM contracts WHERE contract_no = $1",
        )
        .bind(contract_no)
        .fetch_optional(&self.db)
        .await?;
        Ok(contract)
    }

    pub async fn contract_items(&self, contract_id: Uuid) -> AppResult<Vec<ContractItem>> {
        let items = sqlx::query_as::<_, ContractItem>(
            "SELECT id, product_image_id, name, product_type, tax_type \
             FROM contract_items WHERE contract_id = $1",
        )
        .bind(contract_id)
        .fetch_all(&self.db)
        .await?;
        Ok(items)
    }
}
