//! FIFO lot consumption planning
//!
//! Outbound sales consume inbound lots oldest-first. Planning is a pure
//! function over a snapshot of open lots; applying a plan to storage and
//! locking the rows is the backend's job.

use rust_decimal::Decimal;
use uuid::Uuid;

/// Open inbound lot as seen by the planner. Lots are presented
/// oldest-first.
#[derive(Debug, Clone, PartialEq)]
pub struct FifoLot {
    pub item_id: Uuid,
    pub remain_qty: i32,
    pub cost: Decimal,
}

/// Quantity drawn from one lot by a plan
#[derive(Debug, Clone, PartialEq)]
pub struct LotDraw {
    pub item_id: Uuid,
    pub take: i32,
    pub cost: Decimal,
}

/// Result of planning a FIFO consumption
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumptionPlan {
    pub draws: Vec<LotDraw>,
    /// Unit cost of the last lot the walk touched; attributed to the
    /// whole outbound movement for margin reporting
    pub last_cost: Decimal,
}

impl ConsumptionPlan {
    pub fn total_taken(&self) -> i32 {
        self.draws.iter().map(|d| d.take).sum()
    }
}

/// Walk open lots oldest-first and draw `qty` units.
///
/// Fails with the total available quantity when the lots cannot cover
/// the demand; on success the drawn quantities sum to exactly `qty` and
/// no draw exceeds its lot's `remain_qty`.
pub fn plan_fifo_consumption(lots: &[FifoLot], qty: i32) -> Result<ConsumptionPlan, i32> {
    let available: i32 = lots.iter().map(|l| l.remain_qty).sum();
    if available < qty {
        return Err(available);
    }

    let mut remaining = qty;
    let mut draws = Vec::new();
    let mut last_cost = Decimal::ZERO;

    for lot in lots {
        if remaining == 0 {
            break;
        }
        if lot.remain_qty <= 0 {
            continue;
        }
        let take = lot.remain_qty.min(remaining);
        draws.push(LotDraw {
            item_id: lot.item_id,
            take,
            cost: lot.cost,
        });
        last_cost = lot.cost;
        remaining -= take;
    }

    Ok(ConsumptionPlan { draws, last_cost })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lot(id: u128, remain: i32, cost: i64) -> FifoLot {
        FifoLot {
            item_id: Uuid::from_u128(id),
            remain_qty: remain,
            cost: Decimal::from(cost),
        }
    }

    #[test]
    fn drains_oldest_lot_first() {
        let lots = vec![lot(1, 2, 100), lot(2, 5, 120)];
        let plan = plan_fifo_consumption(&lots, 3).unwrap();
        assert_eq!(plan.draws.len(), 2);
        assert_eq!(plan.draws[0].take, 2);
        assert_eq!(plan.draws[1].take, 1);
        assert_eq!(plan.last_cost, Decimal::from(120));
    }

    #[test]
    fn single_lot_keeps_its_cost() {
        let lots = vec![lot(1, 10, 350)];
        let plan = plan_fifo_consumption(&lots, 4).unwrap();
        assert_eq!(plan.total_taken(), 4);
        assert_eq!(plan.last_cost, Decimal::from(350));
    }

    #[test]
    fn insufficient_stock_reports_available() {
        let lots = vec![lot(1, 1, 100), lot(2, 1, 100)];
        assert_eq!(plan_fifo_consumption(&lots, 3), Err(2));
    }

    #[test]
    fn exhausted_lots_are_skipped() {
        let lots = vec![lot(1, 0, 90), lot(2, 3, 110)];
        let plan = plan_fifo_consumption(&lots, 2).unwrap();
        assert_eq!(plan.draws.len(), 1);
        assert_eq!(plan.draws[0].item_id, Uuid::from_u128(2));
    }
}
