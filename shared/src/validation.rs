//! Validation utilities for the Branch Stock Ledger Platform
//!
//! Covers the identifier formats used by Thai mobile retail stock intake
//! (IMEI, EAN/UPC barcodes, branch codes) and the numeric rules every
//! stock mutation enforces.

use rust_decimal::Decimal;

// ============================================================================
// Identifier Validations
// ============================================================================

/// Validate an IMEI: 14-17 digits (14 = without check digit, 15 = standard,
/// 16-17 = IMEISV variants seen on intake scans)
pub fn validate_imei(imei: &str) -> Result<(), &'static str> {
    if imei.is_empty() {
        return Err("IMEI cannot be empty");
    }
    if !imei.chars().all(|c| c.is_ascii_digit()) {
        return Err("IMEI must contain digits only");
    }
    if imei.len() < 14 || imei.len() > 17 {
        return Err("IMEI must be 14-17 digits");
    }
    Ok(())
}

/// Validate a product barcode (EAN-8 through EAN/GTIN-14)
pub fn validate_barcode(barcode: &str) -> Result<(), &'static str> {
    if barcode.is_empty() {
        return Err("Barcode cannot be empty");
    }
    if !barcode.chars().all(|c| c.is_ascii_digit()) {
        return Err("Barcode must contain digits only");
    }
    if barcode.len() < 8 || barcode.len() > 14 {
        return Err("Barcode must be 8-14 digits");
    }
    Ok(())
}

/// Validate a branch code (2-10 alphanumeric, e.g. "00000" for head office)
pub fn validate_branch_code(code: &str) -> Result<(), &'static str> {
    if code.len() < 2 || code.len() > 10 {
        return Err("Branch code must be 2-10 characters");
    }
    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err("Branch code must be alphanumeric only");
    }
    Ok(())
}

// ============================================================================
// Numeric Validations
// ============================================================================

/// Quantities are always positive integers; over-asking a decrement is a
/// hard failure elsewhere, a non-positive request is rejected here.
pub fn validate_quantity(qty: i32) -> Result<(), &'static str> {
    if qty <= 0 {
        return Err("Quantity must be a positive integer");
    }
    Ok(())
}

/// Validate a money amount (price/cost) against intake bounds
pub fn validate_money(amount: Decimal) -> Result<(), &'static str> {
    if amount < Decimal::ZERO {
        return Err("Amount cannot be negative");
    }
    if amount > Decimal::from(9_999_999) {
        return Err("Amount exceeds the allowed maximum");
    }
    Ok(())
}

/// Selling below cost is allowed but flagged to the caller as a warning
pub fn price_below_cost(price: Decimal, cost: Decimal) -> bool {
    price > Decimal::ZERO && cost > Decimal::ZERO && price < cost
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn imei_accepts_standard_lengths() {
        assert!(validate_imei("35693803123456").is_ok()); // 14
        assert!(validate_imei("356938031234567").is_ok()); // 15
        assert!(validate_imei("3569380312345678").is_ok()); // 16
    }

    #[test]
    fn imei_rejects_bad_input() {
        assert!(validate_imei("").is_err());
        assert!(validate_imei("abc938031234567").is_err());
        assert!(validate_imei("1234").is_err());
        assert!(validate_imei("123456789012345678").is_err());
    }

    #[test]
    fn barcode_bounds() {
        assert!(validate_barcode("12345678").is_ok());
        assert!(validate_barcode("1234567890123").is_ok());
        assert!(validate_barcode("1234567").is_err());
        assert!(validate_barcode("123456789012345").is_err());
    }

    #[test]
    fn branch_code_head_office() {
        assert!(validate_branch_code("00000").is_ok());
        assert!(validate_branch_code("B1").is_ok());
        assert!(validate_branch_code("").is_err());
        assert!(validate_branch_code("BR-01").is_err());
    }

    #[test]
    fn quantity_must_be_positive() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
    }

    #[test]
    fn price_below_cost_flags_warning_only() {
        assert!(price_below_cost(Decimal::from(100), Decimal::from(150)));
        assert!(!price_below_cost(Decimal::from(200), Decimal::from(150)));
        // Unpriced intake rows never warn
        assert!(!price_below_cost(Decimal::ZERO, Decimal::from(150)));
    }

    proptest! {
        #[test]
        fn any_digit_string_of_valid_length_is_valid_imei(s in "[0-9]{14,17}") {
            prop_assert!(validate_imei(&s).is_ok());
        }

        #[test]
        fn positive_quantities_validate(q in 1i32..=1_000_000) {
            prop_assert!(validate_quantity(q).is_ok());
        }

        #[test]
        fn non_negative_bounded_money_validates(n in 0i64..=9_999_999) {
            prop_assert!(validate_money(Decimal::from(n)).is_ok());
        }
    }
}
