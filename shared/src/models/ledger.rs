//! Stock ledger models
//!
//! The ledger is the append-only record of every stock movement at a
//! branch. Entries are never deleted; the only field ever mutated after
//! the fact is an item's `remain_qty`, which later outbound events
//! consume oldest-first.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of stock movement an entry records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    /// Inbound lot entering sellable stock
    In,
    /// Informational record for a unit awaiting approval (qty 0)
    InPending,
    /// Outbound sale consuming inbound lots
    Out,
    /// Outbound deduction of one boxset constituent
    OutBoxset,
    /// IMEI correction, no quantity change
    UpdateImei,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::In => "IN",
            ChangeType::InPending => "IN_PENDING",
            ChangeType::Out => "OUT",
            ChangeType::OutBoxset => "OUT_BOXSET",
            ChangeType::UpdateImei => "UPDATE_IMEI",
        }
    }
}

impl std::str::FromStr for ChangeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IN" => Ok(ChangeType::In),
            "IN_PENDING" => Ok(ChangeType::InPending),
            "OUT" => Ok(ChangeType::Out),
            "OUT_BOXSET" => Ok(ChangeType::OutBoxset),
            "UPDATE_IMEI" => Ok(ChangeType::UpdateImei),
            other => Err(format!("unknown change type: {}", other)),
        }
    }
}

/// One product line within a ledger entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerItem {
    pub id: Uuid,
    pub name: String,
    pub brand: String,
    pub model: String,
    pub imei: Option<String>,
    pub po_number: Option<String>,
    pub document_number: Option<String>,
    /// Quantity originally recorded by this event
    pub qty: i32,
    /// Remaining quantity of this lot; decremented by later OUT events
    pub remain_qty: i32,
    pub cost: Decimal,
    pub price: Decimal,
    pub unit: String,
}

impl LedgerItem {
    /// `0 <= remain_qty <= qty` must hold for every item at all times
    pub fn remain_qty_in_bounds(&self) -> bool {
        0 <= self.remain_qty && self.remain_qty <= self.qty
    }
}

/// One append-only stock movement event for a branch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub branch_code: String,
    pub change_type: ChangeType,
    pub reason: String,
    pub performed_at: DateTime<Utc>,
    pub performed_by: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub contract_no: Option<String>,
    pub supplier_id: Option<Uuid>,
    pub quantity: i32,
    pub items: Vec<LedgerItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_type_wire_names() {
        assert_eq!(ChangeType::In.as_str(), "IN");
        assert_eq!(ChangeType::InPending.as_str(), "IN_PENDING");
        assert_eq!(ChangeType::Out.as_str(), "OUT");
        assert_eq!(ChangeType::OutBoxset.as_str(), "OUT_BOXSET");
        assert_eq!(ChangeType::UpdateImei.as_str(), "UPDATE_IMEI");
    }

    #[test]
    fn change_type_serializes_to_the_column_value() {
        for change_type in [
            ChangeType::In,
            ChangeType::InPending,
            ChangeType::Out,
            ChangeType::OutBoxset,
            ChangeType::UpdateImei,
        ] {
            let json = serde_json::to_value(change_type).unwrap();
            assert_eq!(json, serde_json::Value::String(change_type.as_str().into()));
        }
    }

    #[test]
    fn remain_qty_bounds() {
        let mut item = LedgerItem {
            id: Uuid::nil(),
            name: "Phone X".into(),
            brand: String::new(),
            model: String::new(),
            imei: None,
            po_number: None,
            document_number: None,
            qty: 3,
            remain_qty: 3,
            cost: Decimal::ZERO,
            price: Decimal::ZERO,
            unit: String::new(),
        };
        assert!(item.remain_qty_in_bounds());
        item.remain_qty = 0;
        assert!(item.remain_qty_in_bounds());
        item.remain_qty = 4;
        assert!(!item.remain_qty_in_bounds());
        item.remain_qty = -1;
        assert!(!item.remain_qty_in_bounds());
    }
}
