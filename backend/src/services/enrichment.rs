//! Stock unit enrichment
//!
//! A create or update request may arrive with only a product name and an
//! IMEI; the remaining commercial fields are filled in from collaborator
//! records. `resolve` is a pure function over pre-fetched sources so the
//! precedence rules can be tested without a database, and so re-running
//! it over its own output changes nothing.
//!
//! Field precedence, highest first:
//! 1. values given explicitly on the request
//! 2. the catalog record matched by product name
//! 3. the purchase order line matched by IMEI, then name+brand, then
//!    name, then the first line
//! 4. the purchase order header
//! 5. the category group (unit name only)
//! 6. static defaults

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{InstallmentPricing, ProductType, StockType, TaxType};
use crate::services::catalog::{ProductImage, PurchaseOrderDetails, PurchaseOrderLine};

/// Thai VAT rate applied when a taxable product carries no explicit rate
fn default_vat_rate() -> Decimal {
    Decimal::from(7)
}

/// Partially specified stock unit as received from the client
#[derive(Debug, Clone, Default)]
pub struct StockDraft {
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
    pub document_number: Option<String>,
    pub supplier_id: Option<Uuid>,
    pub installment: Option<InstallmentPricing>,
}

/// Pre-fetched collaborator records the draft is resolved against
#[derive(Debug, Clone, Default)]
pub struct EnrichmentSources {
    pub catalog: Option<ProductImage>,
    pub purchase_order: Option<PurchaseOrderDetails>,
    /// Unit name of the resolved category group
    pub category_unit: Option<String>,
    /// Supplier resolved from the request's supplier reference
    pub supplier_id: Option<Uuid>,
}

/// Fully resolved commercial fields for a stock unit
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStock {
    pub name: String,
    pub brand: String,
    pub model: String,
    pub price: Decimal,
    pub cost: Decimal,
    pub tax_type: TaxType,
    pub tax_rate: Decimal,
    pub unit: String,
    pub stock_type: StockType,
    pub product_type: ProductType,
    pub category_name: String,
    pub category_group_id: Option<Uuid>,
    pub document_number: Option<String>,
    pub supplier_id: Option<Uuid>,
    pub installment: InstallmentPricing,
}

/// Pick the purchase order line that best matches the draft
pub fn match_po_line<'a>(
    lines: &'a [PurchaseOrderLine],
    imei: Option<&str>,
    name: &str,
    brand: Option<&str>,
) -> Option<&'a PurchaseOrderLine> {
    if let Some(imei) = imei {
        if let Some(line) = lines.iter().find(|l| l.imei.as_deref() == Some(imei)) {
            return Some(line);
        }
    }
    if let Some(brand) = brand {
        if let Some(line) = lines.iter().find(|l| {
            l.name.eq_ignore_ascii_case(name) && l.brand.eq_ignore_ascii_case(brand)
        }) {
            return Some(line);
        }
    }
    if let Some(line) = lines.iter().find(|l| l.name.eq_ignore_ascii_case(name)) {
        return Some(line);
    }
    lines.first()
}

fn parse_or_default<T>(value: &str) -> T
where
    T: std::str::FromStr + Default,
{
    value.parse().unwrap_or_default()
}

/// Resolve a draft against its sources. Pure and idempotent: resolving
/// a fully resolved draft again yields the same output.
pub fn resolve(draft: &StockDraft, sources: &EnrichmentSources) -> ResolvedStock {
    let catalog = sources.catalog.as_ref();
    let po = sources.purchase_order.as_ref();
    let line = po.and_then(|po| {
        match_po_line(
            &po.lines,
            draft.imei.as_deref(),
            &draft.name,
            draft.brand.as_deref(),
        )
    });

    let non_empty = |s: &Option<String>| s.clone().filter(|v| !v.is_empty());

    let brand = non_empty(&draft.brand)
        .or_else(|| line.map(|l| l.brand.clone()).filter(|v| !v.is_empty()))
        .or_else(|| catalog.map(|c| c.brand.clone()))
        .unwrap_or_default();

    let model = non_empty(&draft.model)
        .or_else(|| line.map(|l| l.model.clone()).filter(|v| !v.is_empty()))
        .or_else(|| catalog.map(|c| c.model.clone()))
        .unwrap_or_default();

    let price = draft
        .price
        .or_else(|| catalog.map(|c| c.price))
        .unwrap_or(Decimal::ZERO);

    let cost = draft
        .cost
        .or_else(|| line.map(|l| l.cost))
        .or_else(|| catalog.map(|c| c.cost))
        .unwrap_or(Decimal::ZERO);

    let tax_type = draft
        .tax_type
        .or_else(|| line.and_then(|l| l.tax_type.as_deref()).and_then(|t| t.parse().ok()))
        .or_else(|| {
            po.and_then(|po| po.order.tax_type.as_deref())
                .and_then(|t| t.parse().ok())
        })
        .or_else(|| catalog.map(|c| parse_or_default(&c.tax_type)))
        .unwrap_or_default();

    let tax_rate = draft
        .tax_rate
        .or_else(|| line.map(|l| l.tax_rate).filter(|r| !r.is_zero()))
        .unwrap_or_else(|| {
            if tax_type.is_taxable() {
                default_vat_rate()
            } else {
                Decimal::ZERO
            }
        });

    let unit = non_empty(&draft.unit)
        .or_else(|| sources.category_unit.clone().filter(|u| !u.is_empty()))
        .unwrap_or_default();

    let stock_type = draft
        .stock_type
        .or_else(|| catalog.map(|c| parse_or_default(&c.stock_type)))
        .unwrap_or_default();

    let product_type = draft
        .product_type
        .or_else(|| catalog.map(|c| parse_or_default(&c.product_type)))
        .unwrap_or_default();

    let category_name = non_empty(&draft.category_name)
        .or_else(|| catalog.map(|c| c.category_name.clone()))
        .unwrap_or_default();

    let category_group_id = draft
        .category_group_id
        .or_else(|| catalog.and_then(|c| c.category_group_id))
        .or_else(|| po.and_then(|po| po.order.category_group_id));

    let document_number = non_empty(&draft.document_number).or_else(|| {
        po.map(|po| po.order.document_number.clone())
            .filter(|d| !d.is_empty())
    });

    let supplier_id = draft
        .supplier_id
        .or(sources.supplier_id)
        .or_else(|| po.and_then(|po| po.order.supplier_id));

    let installment = draft.installment.clone().unwrap_or_else(|| {
        catalog
            .map(|c| InstallmentPricing {
                down_amount: c.down_amount,
                down_installment_count: c.down_installment_count,
                down_installment: c.down_installment,
                credit_threshold: c.credit_threshold,
                pay_use_installment_count: c.pay_use_installment_count,
                pay_use_installment: c.pay_use_installment,
            })
            .unwrap_or_default()
    });

    ResolvedStock {
        name: draft.name.clone(),
        brand,
        model,
        price,
        cost,
        tax_type,
        tax_rate,
        unit,
        stock_type,
        product_type,
        category_name,
        category_group_id,
        document_number,
        supplier_id,
        installment,
    }
}

impl ResolvedStock {
    /// Turn a resolved unit back into a draft with every field explicit.
    /// Resolving that draft again yields the same output.
    pub fn into_draft(self, imei: Option<String>, barcode: Option<String>) -> StockDraft {
        StockDraft {
            name: self.name,
            brand: Some(self.brand),
            model: Some(self.model),
            imei,
            barcode,
            price: Some(self.price),
            cost: Some(self.cost),
            tax_type: Some(self.tax_type),
            tax_rate: Some(self.tax_rate),
            unit: Some(self.unit),
            stock_type: Some(self.stock_type),
            product_type: Some(self.product_type),
            category_name: Some(self.category_name),
            category_group_id: self.category_group_id,
            document_number: self.document_number,
            supplier_id: self.supplier_id,
            installment: Some(self.installment),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::catalog::{ProductImage, PurchaseOrder, PurchaseOrderDetails};

    fn catalog_phone() -> ProductImage {
        ProductImage {
            id: Uuid::from_u128(10),
            name: "Phone X".to_string(),
            brand: "Acme".to_string(),
            model: "X-128".to_string(),
            price: Decimal::from(12900),
            cost: Decimal::from(9500),
            tax_type: "included".to_string(),
            stock_type: "imei".to_string(),
            product_type: "mobile".to_string(),
            category_name: "Smartphone".to_string(),
            category_group_id: Some(Uuid::from_u128(20)),
            down_amount: Decimal::from(2000),
            down_installment_count: 4,
            down_installment: Decimal::from(500),
            credit_threshold: Decimal::from(8000),
            pay_use_installment_count: 6,
            pay_use_installment: Decimal::from(1800),
        }
    }

    fn po_line(imei: &str, name: &str, cost: i64) -> PurchaseOrderLine {
        PurchaseOrderLine {
            id: Uuid::new_v4(),
            imei: Some(imei.to_string()),
            name: name.to_string(),
            brand: "Acme".to_string(),
            model: "X-128".to_string(),
            cost: Decimal::from(cost),
            tax_type: None,
            tax_rate: Decimal::ZERO,
        }
    }

    fn po_with_lines(lines: Vec<PurchaseOrderLine>) -> PurchaseOrderDetails {
        PurchaseOrderDetails {
            order: PurchaseOrder {
                id: Uuid::from_u128(30),
                po_number: "PO-001".to_string(),
                document_number: "DOC-7".to_string(),
                tax_type: Some("excluded".to_string()),
                category_group_id: None,
                supplier_id: Some(Uuid::from_u128(40)),
            },
            lines,
        }
    }

    #[test]
    fn explicit_values_win_over_every_source() {
        let draft = StockDraft {
            name: "Phone X".to_string(),
            price: Some(Decimal::from(11111)),
            cost: Some(Decimal::from(8000)),
            tax_type: Some(TaxType::None),
            ..Default::default()
        };
        let sources = EnrichmentSources {
            catalog: Some(catalog_phone()),
            purchase_order: Some(po_with_lines(vec![po_line(
                "356938031234567",
                "Phone X",
                9000,
            )])),
            ..Default::default()
        };
        let resolved = resolve(&draft, &sources);
        assert_eq!(resolved.price, Decimal::from(11111));
        assert_eq!(resolved.cost, Decimal::from(8000));
        assert_eq!(resolved.tax_type, TaxType::None);
        assert_eq!(resolved.tax_rate, Decimal::ZERO);
    }

    #[test]
    fn catalog_fills_missing_commercial_fields() {
        let draft = StockDraft {
            name: "Phone X".to_string(),
            ..Default::default()
        };
        let sources = EnrichmentSources {
            catalog: Some(catalog_phone()),
            ..Default::default()
        };
        let resolved = resolve(&draft, &sources);
        assert_eq!(resolved.price, Decimal::from(12900));
        assert_eq!(resolved.brand, "Acme");
        assert_eq!(resolved.tax_type, TaxType::Included);
        assert_eq!(resolved.category_name, "Smartphone");
        assert_eq!(resolved.installment.down_amount, Decimal::from(2000));
    }

    #[test]
    fn po_line_cost_beats_catalog_cost() {
        let draft = StockDraft {
            name: "Phone X".to_string(),
            imei: Some("356938031234567".to_string()),
            ..Default::default()
        };
        let sources = EnrichmentSources {
            catalog: Some(catalog_phone()),
            purchase_order: Some(po_with_lines(vec![
                po_line("111111111111111", "Other", 100),
                po_line("356938031234567", "Phone X", 9100),
            ])),
            ..Default::default()
        };
        let resolved = resolve(&draft, &sources);
        assert_eq!(resolved.cost, Decimal::from(9100));
    }

    #[test]
    fn po_line_matching_falls_back_name_then_first() {
        let lines = vec![
            po_line("111111111111111", "Charger", 150),
            po_line("222222222222222", "Phone X", 9000),
        ];
        let by_name = match_po_line(&lines, None, "phone x", None).unwrap();
        assert_eq!(by_name.name, "Phone X");

        let fallback = match_po_line(&lines, None, "Unknown", None).unwrap();
        assert_eq!(fallback.name, "Charger");
    }

    #[test]
    fn taxable_without_rate_gets_default_vat() {
        let draft = StockDraft {
            name: "Phone X".to_string(),
            tax_type: Some(TaxType::Excluded),
            ..Default::default()
        };
        let resolved = resolve(&draft, &EnrichmentSources::default());
        assert_eq!(resolved.tax_rate, default_vat_rate());
    }

    #[test]
    fn category_group_supplies_unit_name() {
        let draft = StockDraft {
            name: "Charger".to_string(),
            ..Default::default()
        };
        let sources = EnrichmentSources {
            category_unit: Some("ชิ้น".to_string()),
            ..Default::default()
        };
        let resolved = resolve(&draft, &sources);
        assert_eq!(resolved.unit, "ชิ้น");
    }

    #[test]
    fn resolving_a_resolved_draft_is_identity() {
        let draft = StockDraft {
            name: "Phone X".to_string(),
            imei: Some("356938031234567".to_string()),
            ..Default::default()
        };
        let sources = EnrichmentSources {
            catalog: Some(catalog_phone()),
            purchase_order: Some(po_with_lines(vec![po_line(
                "356938031234567",
                "Phone X",
                9100,
            )])),
            category_unit: Some("เครื่อง".to_string()),
            ..Default::default()
        };
        let first = resolve(&draft, &sources);
        let again = resolve(
            &first.clone().into_draft(draft.imei.clone(), None),
            &sources,
        );
        assert_eq!(first, again);
    }
}
