//! Stock unit model and approval lifecycle

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a stock unit.
///
/// A unit is created `Pending`, becomes `Verified` on managerial approval
/// and `Rejected` on refusal. Both successors are terminal; a rejected
/// unit is physically deleted and never becomes sellable again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockState {
    Pending,
    Verified,
    Rejected,
}

/// Invalid lifecycle transition
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("unit is already verified")]
    AlreadyVerified,
    #[error("unit is not awaiting approval")]
    NotPending,
    #[error("unit is rejected and cannot change state")]
    Rejected,
}

impl StockState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockState::Pending => "pending",
            StockState::Verified => "verified",
            StockState::Rejected => "rejected",
        }
    }

    /// Validate and perform a lifecycle transition.
    ///
    /// Only `Pending -> Verified` and `Pending -> Rejected` are legal.
    pub fn transition(self, to: StockState) -> Result<StockState, TransitionError> {
        match (self, to) {
            (StockState::Pending, StockState::Verified) => Ok(StockState::Verified),
            (StockState::Pending, StockState::Rejected) => Ok(StockState::Rejected),
            (StockState::Verified, StockState::Verified) => Err(TransitionError::AlreadyVerified),
            (StockState::Verified, _) => Err(TransitionError::NotPending),
            (StockState::Rejected, _) => Err(TransitionError::Rejected),
            (StockState::Pending, StockState::Pending) => Err(TransitionError::NotPending),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, StockState::Pending)
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, StockState::Verified)
    }
}

impl std::str::FromStr for StockState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(StockState::Pending),
            "verified" => Ok(StockState::Verified),
            "rejected" => Ok(StockState::Rejected),
            other => Err(format!("unknown stock state: {}", other)),
        }
    }
}

/// How stock for a product is tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockType {
    /// One row per physical item, identified by IMEI/barcode
    #[default]
    Imei,
    /// Fungible quantity lot
    Quantity,
}

impl StockType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockType::Imei => "imei",
            StockType::Quantity => "quantity",
        }
    }
}

impl std::str::FromStr for StockType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "imei" => Ok(StockType::Imei),
            "quantity" => Ok(StockType::Quantity),
            other => Err(format!("unknown stock type: {}", other)),
        }
    }
}

/// Product classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductType {
    #[default]
    Mobile,
    Accessory,
    Boxset,
    Gift,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::Mobile => "mobile",
            ProductType::Accessory => "accessory",
            ProductType::Boxset => "boxset",
            ProductType::Gift => "gift",
        }
    }

    pub fn is_boxset(&self) -> bool {
        matches!(self, ProductType::Boxset)
    }
}

impl std::str::FromStr for ProductType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mobile" => Ok(ProductType::Mobile),
            "accessory" => Ok(ProductType::Accessory),
            "boxset" => Ok(ProductType::Boxset),
            "gift" => Ok(ProductType::Gift),
            other => Err(format!("unknown product type: {}", other)),
        }
    }
}

/// VAT classification of a product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxType {
    /// No VAT (ไม่มีภาษี)
    None,
    /// VAT added on top of the price (แยกภาษี)
    #[default]
    Excluded,
    /// VAT included in the price (รวมภาษี)
    Included,
}

impl TaxType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaxType::None => "none",
            TaxType::Excluded => "excluded",
            TaxType::Included => "included",
        }
    }

    /// Thai label as used on printed documents
    pub fn thai_label(&self) -> &'static str {
        match self {
            TaxType::None => "ไม่มีภาษี",
            TaxType::Excluded => "แยกภาษี",
            TaxType::Included => "รวมภาษี",
        }
    }

    /// Only taxable products participate in boxset stock deduction
    pub fn is_taxable(&self) -> bool {
        !matches!(self, TaxType::None)
    }
}

impl std::str::FromStr for TaxType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(TaxType::None),
            "excluded" => Ok(TaxType::Excluded),
            "included" => Ok(TaxType::Included),
            other => Err(format!("unknown tax type: {}", other)),
        }
    }
}

/// Installment pricing fields carried for the loan subsystem
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstallmentPricing {
    pub down_amount: Decimal,
    pub down_installment_count: i32,
    pub down_installment: Decimal,
    pub credit_threshold: Decimal,
    pub pay_use_installment_count: i32,
    pub pay_use_installment: Decimal,
}

/// One inventory line at one branch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockUnit {
    pub id: Uuid,
    pub branch_code: String,
    pub name: String,
    pub brand: String,
    pub model: String,
    pub imei: Option<String>,
    pub barcode: Option<String>,
    pub price: Decimal,
    pub cost: Decimal,
    pub tax_type: TaxType,
    pub tax_rate: Decimal,
    pub unit: String,
    pub stock_type: StockType,
    pub product_type: ProductType,
    pub category_name: String,
    pub category_group_id: Option<Uuid>,
    pub state: StockState,
    pub stock_value: i32,
    pub po_number: Option<String>,
    pub document_number: Option<String>,
    pub invoice_number: Option<String>,
    pub supplier_id: Option<Uuid>,
    pub installment: InstallmentPricing,
    pub verified_by: Option<Uuid>,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockUnit {
    /// A unit is sellable once verified with stock on hand
    pub fn is_sellable(&self) -> bool {
        self.state.is_verified() && self.stock_value >= 1
    }

    /// Lifecycle invariants: pending units carry no stock, verified
    /// units carry at least one.
    pub fn invariants_hold(&self) -> bool {
        match self.state {
            StockState::Pending => self.stock_value == 0,
            StockState::Verified => self.stock_value >= 1,
            StockState::Rejected => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_can_be_verified() {
        assert_eq!(
            StockState::Pending.transition(StockState::Verified),
            Ok(StockState::Verified)
        );
    }

    #[test]
    fn pending_can_be_rejected() {
        assert_eq!(
            StockState::Pending.transition(StockState::Rejected),
            Ok(StockState::Rejected)
        );
    }

    #[test]
    fn verified_is_terminal() {
        assert_eq!(
            StockState::Verified.transition(StockState::Verified),
            Err(TransitionError::AlreadyVerified)
        );
        assert_eq!(
            StockState::Verified.transition(StockState::Rejected),
            Err(TransitionError::NotPending)
        );
        assert_eq!(
            StockState::Verified.transition(StockState::Pending),
            Err(TransitionError::NotPending)
        );
    }

    #[test]
    fn rejected_is_terminal() {
        for to in [StockState::Pending, StockState::Verified, StockState::Rejected] {
            assert_eq!(
                StockState::Rejected.transition(to),
                Err(TransitionError::Rejected)
            );
        }
    }

    #[test]
    fn taxable_filter_excludes_no_vat_only() {
        assert!(!TaxType::None.is_taxable());
        assert!(TaxType::Excluded.is_taxable());
        assert!(TaxType::Included.is_taxable());
    }
}
