//! Stock unit lifecycle tests
//!
//! Covers the approval state machine and the lifecycle invariants:
//! - a unit enters the system pending with no sellable stock
//! - only pending units can be approved or rejected, exactly once
//! - a verified unit carries at least one unit of stock

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use shared::models::{
    InstallmentPricing, ProductType, StockState, StockType, StockUnit, TaxType, TransitionError,
};

fn pending_unit() -> StockUnit {
    StockUnit {
        id: Uuid::new_v4(),
        branch_code: "00000".to_string(),
        name: "Phone X".to_string(),
        brand: "Acme".to_string(),
        model: "X-128".to_string(),
        imei: Some("356938031234567".to_string()),
        barcode: None,
        price: Decimal::from(12900),
        cost: Decimal::from(9500),
        tax_type: TaxType::Included,
        tax_rate: Decimal::from(7),
        unit: "เครื่อง".to_string(),
        stock_type: StockType::Imei,
        product_type: ProductType::Mobile,
        category_name: "Smartphone".to_string(),
        category_group_id: None,
        state: StockState::Pending,
        stock_value: 0,
        po_number: Some("PO-001".to_string()),
        document_number: None,
        invoice_number: None,
        supplier_id: None,
        installment: InstallmentPricing::default(),
        verified_by: None,
        updated_by: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[test]
fn new_unit_is_pending_with_zero_stock() {
    let unit = pending_unit();
    assert!(unit.state.is_pending());
    assert_eq!(unit.stock_value, 0);
    assert!(unit.invariants_hold());
    assert!(!unit.is_sellable());
}

#[test]
fn approval_makes_the_unit_sellable() {
    let mut unit = pending_unit();
    unit.state = unit.state.transition(StockState::Verified).unwrap();
    unit.stock_value = 1;
    unit.verified_by = Some(Uuid::new_v4());

    assert!(unit.state.is_verified());
    assert!(unit.invariants_hold());
    assert!(unit.is_sellable());
}

#[test]
fn approval_is_single_shot() {
    let verified = StockState::Pending.transition(StockState::Verified).unwrap();
    assert_eq!(
        verified.transition(StockState::Verified),
        Err(TransitionError::AlreadyVerified)
    );
}

#[test]
fn rejection_only_applies_to_pending_units() {
    assert!(StockState::Pending.transition(StockState::Rejected).is_ok());
    assert_eq!(
        StockState::Verified.transition(StockState::Rejected),
        Err(TransitionError::NotPending)
    );
    assert_eq!(
        StockState::Rejected.transition(StockState::Verified),
        Err(TransitionError::Rejected)
    );
}

#[test]
fn verified_unit_with_zero_stock_breaks_invariant() {
    let mut unit = pending_unit();
    unit.state = StockState::Verified;
    unit.stock_value = 0;
    assert!(!unit.invariants_hold());
}

#[test]
fn pending_unit_with_stock_breaks_invariant() {
    let mut unit = pending_unit();
    unit.stock_value = 3;
    assert!(!unit.invariants_hold());
}

// ============================================================================
// Property Tests
// ============================================================================

fn any_state() -> impl Strategy<Value = StockState> {
    prop_oneof![
        Just(StockState::Pending),
        Just(StockState::Verified),
        Just(StockState::Rejected),
    ]
}

proptest! {
    /// Of all state pairs, only pending -> verified and
    /// pending -> rejected are legal transitions
    #[test]
    fn only_pending_units_transition(from in any_state(), to in any_state()) {
        let result = from.transition(to);
        let legal = from == StockState::Pending && to != StockState::Pending;
        prop_assert_eq!(result.is_ok(), legal);
    }

    /// A successful transition always lands on the requested state
    #[test]
    fn transition_lands_on_target(to in any_state()) {
        if let Ok(state) = StockState::Pending.transition(to) {
            prop_assert_eq!(state, to);
        }
    }

    /// Sellability requires both the verified state and positive stock
    #[test]
    fn sellability_requires_verified_and_stock(value in 0i32..=10) {
        let mut unit = pending_unit();
        unit.stock_value = value;
        prop_assert!(!unit.is_sellable());

        unit.state = StockState::Verified;
        prop_assert_eq!(unit.is_sellable(), value >= 1);
    }
}
