//! Boxset deduction coordinator
//!
//! When an installment contract is paid off the customer collects the
//! goods, and every taxable constituent of the contract's products must
//! leave branch stock at once. Boxset products are flattened one level
//! into their catalog constituents; non-taxable give-away lines are
//! skipped. The deduction is all-or-nothing: a shortfall on any
//! constituent leaves every counter untouched and the per-constituent
//! availability is reported back instead.

use serde::Serialize;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::events::{EventBus, StockEvent};
use crate::models::{ChangeType, TaxType};
use crate::services::catalog::{CatalogService, Contract};
use crate::services::ledger::{record_entry, NewLedgerEntry, NewLedgerItem};

#[derive(Clone)]
pub struct BoxsetService {
    db: PgPool,
    catalog: CatalogService,
    events: EventBus,
}

/// One product the contract requires from branch stock
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstituentRequirement {
    pub name: String,
    pub required: i32,
}

/// Availability of one constituent at the contract's branch
#[derive(Debug, Clone, Serialize)]
pub struct ConstituentCheck {
    pub name: String,
    pub required: i32,
    pub available: i32,
    pub sufficient: bool,
}

/// Constituent counts rolled up for the caller
#[derive(Debug, Clone, Serialize)]
pub struct BoxsetSummary {
    pub total: usize,
    pub available: usize,
    pub missing: usize,
}

/// Result of a check or deduction run
#[derive(Debug, Clone, Serialize)]
pub struct BoxsetStockReport {
    pub contract_no: String,
    pub branch_code: String,
    /// True when every constituent is covered; for a deduction this
    /// also means the counters were decremented and committed
    pub all_sufficient: bool,
    pub results: Vec<ConstituentCheck>,
    pub summary: BoxsetSummary,
}

fn summarize(results: &[ConstituentCheck]) -> BoxsetSummary {
    let available = results.iter().filter(|r| r.sufficient).count();
    BoxsetSummary {
        total: results.len(),
        available,
        missing: results.len() - available,
    }
}

/// Collapse contract lines into per-product requirements.
///
/// Non-taxable lines are dropped; names are matched case-insensitively
/// and keep their first-seen spelling and order.
pub fn aggregate_constituents(lines: &[(String, TaxType)]) -> Vec<ConstituentRequirement> {
    let mut requirements: Vec<ConstituentRequirement> = Vec::new();
    for (name, tax_type) in lines {
        if !tax_type.is_taxable() {
            continue;
        }
        match requirements
            .iter_mut()
            .find(|r| r.name.eq_ignore_ascii_case(name))
        {
            Some(existing) => existing.required += 1,
            None => requirements.push(ConstituentRequirement {
                name: name.clone(),
                required: 1,
            }),
        }
    }
    requirements
}

// plan3 is the pay-everything-then-collect installment plan; only those
// contracts release goods from stock, and only once fully paid
fn contract_is_eligible(contract: &Contract) -> bool {
    contract.plan_type == "plan3" && contract.payment_status == "COMPLETED"
}

#[derive(Debug, Clone, FromRow)]
struct StockCounterRow {
    id: Uuid,
    stock_value: i32,
    cost: rust_decimal::Decimal,
    price: rust_decimal::Decimal,
    unit: String,
    po_number: Option<String>,
}

impl BoxsetService {
    pub fn new(db: PgPool, events: EventBus) -> Self {
        let catalog = CatalogService::new(db.clone());
        Self {
            db,
            catalog,
            events,
        }
    }

    /// Read-only availability check; never mutates anything
    pub async fn check(
        &self,
        contract_no: &str,
        branch_override: Option<&str>,
    ) -> AppResult<BoxsetStockReport> {
        let (contract, requirements) = self.resolve_requirements(contract_no).await?;
        let branch_code = branch_override.unwrap_or(&contract.branch_code).to_string();

        let mut results = Vec::with_capacity(requirements.len());
        for requirement in &requirements {
            let available = sqlx::query_scalar::<_, Option<i64>>(
                "SELECT SUM(stock_value)::bigint FROM branch_stock \
                 WHERE branch_code = $1 AND lower(name) = lower($2) AND state = 'verified'",
            )
            .bind(&branch_code)
            .bind(&requirement.name)
            .fetch_one(&self.db)
            .await?
            .unwrap_or(0) as i32;

            results.push(ConstituentCheck {
                name: requirement.name.clone(),
                required: requirement.required,
                available,
                sufficient: available >= requirement.required,
            });
        }

        let all_sufficient = results.iter().all(|r| r.sufficient);
        let summary = summarize(&results);
        Ok(BoxsetStockReport {
            contract_no: contract.contract_no,
            branch_code,
            all_sufficient,
            results,
            summary,
        })
    }

    /// Deduct every constituent of the contract from branch stock.
    ///
    /// Runs in a single transaction with the matching stock rows locked.
    /// Any shortfall rolls the whole deduction back and the report
    /// carries the per-constituent availability instead.
    pub async fn deduct(
        &self,
        contract_no: &str,
        branch_override: Option<&str>,
        performed_by: Option<Uuid>,
    ) -> AppResult<BoxsetStockReport> {
        let (contract, requirements) = self.resolve_requirements(contract_no).await?;
        let branch_code = branch_override.unwrap_or(&contract.branch_code).to_string();

        let mut tx = self.db.begin().await?;
        let mut results = Vec::with_capacity(requirements.len());
        let mut locked: Vec<(ConstituentRequirement, Vec<StockCounterRow>)> = Vec::new();

        for requirement in requirements {
            let rows = sqlx::query_as::<_, StockCounterRow>(
                "SELECT id, stock_value, cost, price, unit, po_number FROM branch_stock \
                 WHERE branch_code = $1 AND lower(name) = lower($2) \
                   AND state = 'verified' AND stock_value > 0 \
                 ORDER BY created_at \
                 FOR UPDATE",
            )
            .bind(&branch_code)
            .bind(&requirement.name)
            .fetch_all(&mut *tx)
            .await?;

            let available: i32 = rows.iter().map(|r| r.stock_value).sum();
            results.push(ConstituentCheck {
                name: requirement.name.clone(),
                required: requirement.required,
                available,
                sufficient: available >= requirement.required,
            });
            locked.push((requirement, rows));
        }

        if results.iter().any(|r| !r.sufficient) {
            // Dropping the transaction rolls everything back
            tracing::warn!(
                contract_no = %contract.contract_no,
                branch_code = %branch_code,
                "boxset deduction aborted, constituent short"
            );
            let summary = summarize(&results);
            return Ok(BoxsetStockReport {
                contract_no: contract.contract_no,
                branch_code,
                all_sufficient: false,
                results,
                summary,
            });
        }

        let deducted = locked.len();
        for (requirement, rows) in locked {
            self.deduct_constituent(&mut tx, &contract, &branch_code, &requirement, rows, performed_by)
                .await?;
        }

        tx.commit().await?;

        self.events.publish(StockEvent::BoxsetDeducted {
            contract_no: contract.contract_no.clone(),
            branch_code: branch_code.clone(),
            deducted,
        });

        let summary = summarize(&results);
        Ok(BoxsetStockReport {
            contract_no: contract.contract_no,
            branch_code,
            all_sufficient: true,
            results,
            summary,
        })
    }

    /// Past deductions recorded for a contract
    pub async fn deduction_count(&self, contract_no: &str) -> AppResult<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM stock_ledger \
             WHERE contract_no = $1 AND change_type = 'OUT_BOXSET'",
        )
        .bind(contract_no)
        .fetch_one(&self.db)
        .await?;
        Ok(count)
    }

    async fn deduct_constituent(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        contract: &Contract,
        branch_code: &str,
        requirement: &ConstituentRequirement,
        rows: Vec<StockCounterRow>,
        performed_by: Option<Uuid>,
    ) -> AppResult<()> {
        let mut remaining = requirement.required;
        let mut items = Vec::new();

        for row in rows {
            if remaining == 0 {
                break;
            }
            let take = row.stock_value.min(remaining);
            sqlx::query(
                "UPDATE branch_stock \
                 SET stock_value = stock_value - $1, updated_at = now() \
                 WHERE id = $2",
            )
            .bind(take)
            .bind(row.id)
            .execute(&mut **tx)
            .await?;
            remaining -= take;

            items.push(NewLedgerItem {
                name: requirement.name.clone(),
                po_number: row.po_number,
                qty: take,
                remain_qty: 0,
                cost: row.cost,
                price: row.price,
                unit: row.unit,
                ..Default::default()
            });
        }

        if remaining > 0 {
            // Availability was verified under lock, this cannot be hit
            // unless the snapshot logic regresses
            return Err(AppError::InsufficientStock(format!(
                "constituent {} short by {} during deduction",
                requirement.name, remaining
            )));
        }

        record_entry(
            tx,
            NewLedgerEntry {
                branch_code: branch_code.to_string(),
                change_type: ChangeType::OutBoxset,
                reason: format!("ตัดสต๊อกรับของตามสัญญา {}", contract.contract_no),
                performed_by,
                order_id: None,
                contract_no: Some(contract.contract_no.clone()),
                supplier_id: None,
                quantity: requirement.required,
                items,
            },
        )
        .await?;

        Ok(())
    }

    /// Contract lines flattened to per-product requirements
    async fn resolve_requirements(
        &self,
        contract_no: &str,
    ) -> AppResult<(Contract, Vec<ConstituentRequirement>)> {
        let contract = self
            .catalog
            .find_contract(contract_no)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Contract {}", contract_no)))?;

        if !contract_is_eligible(&contract) {
            return Err(AppError::ContractNotEligible(format!(
                "contract {} is not fully paid",
                contract.contract_no
            )));
        }

        let items = self.catalog.contract_items(contract.id).await?;
        let mut lines: Vec<(String, TaxType)> = Vec::new();

        for item in items {
            let is_boxset = item.product_type == "boxset";
            if is_boxset {
                let Some(product_id) = item.product_image_id else {
                    continue;
                };
                // One level only: a boxset inside a boxset is not expanded
                for constituent in self.catalog.boxset_constituents(product_id).await? {
                    let tax_type: TaxType = constituent.tax_type.parse().unwrap_or_default();
                    lines.push((constituent.name, tax_type));
                }
            } else {
                let tax_type: TaxType = item.tax_type.parse().unwrap_or_default();
                lines.push((item.name, tax_type));
            }
        }

        if lines.is_empty() {
            return Err(AppError::ValidationError(format!(
                "contract {} has no stock-relevant items",
                contract.contract_no
            )));
        }

        Ok((contract, aggregate_constituents(&lines)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregation_counts_repeats_and_drops_non_taxable() {
        let lines = vec![
            ("Phone X".to_string(), TaxType::Included),
            ("Charger".to_string(), TaxType::Excluded),
            ("phone x".to_string(), TaxType::Included),
            ("Sticker".to_string(), TaxType::None),
        ];
        let requirements = aggregate_constituents(&lines);
        assert_eq!(
            requirements,
            vec![
                ConstituentRequirement {
                    name: "Phone X".to_string(),
                    required: 2
                },
                ConstituentRequirement {
                    name: "Charger".to_string(),
                    required: 1
                },
            ]
        );
    }

    #[test]
    fn aggregation_of_only_non_taxable_is_empty() {
        let lines = vec![("Gift".to_string(), TaxType::None)];
        assert!(aggregate_constituents(&lines).is_empty());
    }

    #[test]
    fn only_completed_plan3_contracts_release_goods() {
        let contract = |plan_type: &str, payment_status: &str| Contract {
            id: Uuid::nil(),
            contract_no: "C-001".to_string(),
            branch_code: "00000".to_string(),
            plan_type: plan_type.to_string(),
            payment_status: payment_status.to_string(),
        };
        assert!(contract_is_eligible(&contract("plan3", "COMPLETED")));
        assert!(!contract_is_eligible(&contract("plan3", "PAID")));
        assert!(!contract_is_eligible(&contract("plan3", "PENDING")));
        assert!(!contract_is_eligible(&contract("plan1", "COMPLETED")));
    }
}
