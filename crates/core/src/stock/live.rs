//! Live snapshot computation for the current month.

use std::collections::{BTreeMap, HashMap};

use warpline_shared::types::SkuId;

use super::types::{Breakdown, MovementTotal, StockSnapshot, TxnType};

#[derive(Default)]
struct Movements {
    inward: Breakdown,
    outward: Breakdown,
}

/// Computes per-SKU snapshot rows from the previous month's closing stock
/// and this month's grouped movements.
///
/// SKUs present in either input are reported, except those with no opening
/// stock and no movement at all. Rows are ordered by SKU id.
#[must_use]
pub fn compute_live_snapshot(
    openings: &HashMap<SkuId, i64>,
    movements: &[MovementTotal],
) -> Vec<StockSnapshot> {
    let mut by_sku: BTreeMap<SkuId, Movements> = BTreeMap::new();

    for movement in movements {
        let entry = by_sku.entry(movement.sku_id).or_default();
        let breakdown = match movement.txn_type {
            TxnType::Inward => &mut entry.inward,
            TxnType::Outward => &mut entry.outward,
        };
        *breakdown
            .entry(movement.reason.as_str().to_string())
            .or_insert(0) += movement.qty;
    }

    for sku_id in openings.keys() {
        by_sku.entry(*sku_id).or_default();
    }

    by_sku
        .into_iter()
        .map(|(sku_id, moved)| {
            let opening = openings.get(&sku_id).copied().unwrap_or(0);
            StockSnapshot::from_movements(sku_id, opening, moved.inward, moved.outward)
        })
        .filter(|row| !row.is_empty())
        .collect()
}
