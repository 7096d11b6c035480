//! Engine behaviour against an in-memory ledger, plus property tests for
//! the live computation and the presentation pipeline.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use warpline_shared::types::{PageRequest, PageResponse, ProductId, SkuId};

use super::engine::{SnapshotEngine, StockLedger, StoreError};
use super::error::SnapshotError;
use super::live::compute_live_snapshot;
use super::period::SnapshotPeriod;
use super::pipeline::{enrich, rollup_by_product, sort_rows};
use super::types::{
    Breakdown, MovementReason, MovementTotal, Rollup, SkuMetadata, SnapshotFilter, SnapshotQuery,
    StockSnapshot, TxnType,
};
use crate::clock::FixedClock;

// ============================================================================
// In-memory ledger
// ============================================================================

struct LedgerTxn {
    sku_id: SkuId,
    txn_type: TxnType,
    reason: Option<String>,
    qty: i64,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct InMemoryLedger {
    txns: Vec<LedgerTxn>,
    frozen: Vec<(NaiveDate, StockSnapshot)>,
    catalogue: Vec<SkuMetadata>,
    unavailable: bool,
}

impl InMemoryLedger {
    fn record(
        &mut self,
        sku_id: SkuId,
        txn_type: TxnType,
        reason: Option<&str>,
        qty: i64,
        created_at: DateTime<Utc>,
    ) {
        self.txns.push(LedgerTxn {
            sku_id,
            txn_type,
            reason: reason.map(str::to_string),
            qty,
            created_at,
        });
    }

    fn freeze(&mut self, year: i32, month: u32, row: StockSnapshot) {
        let month = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
        self.frozen.push((month, row));
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable {
            return Err("connection refused".into());
        }
        Ok(())
    }
}

#[async_trait]
impl StockLedger for InMemoryLedger {
    async fn frozen_snapshot(&self, month: NaiveDate) -> Result<Vec<StockSnapshot>, StoreError> {
        self.check()?;
        Ok(self
            .frozen
            .iter()
            .filter(|(m, _)| *m == month)
            .map(|(_, row)| row.clone())
            .collect())
    }

    async fn closing_stock(&self, month: NaiveDate) -> Result<HashMap<SkuId, i64>, StoreError> {
        self.check()?;
        Ok(self
            .frozen
            .iter()
            .filter(|(m, _)| *m == month)
            .map(|(_, row)| (row.sku_id, row.closing_stock))
            .collect())
    }

    async fn movement_totals(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<MovementTotal>, StoreError> {
        self.check()?;
        let mut groups: HashMap<(SkuId, TxnType, MovementReason), i64> = HashMap::new();
        for txn in self
            .txns
            .iter()
            .filter(|t| t.created_at >= from && t.created_at < to)
        {
            let reason = MovementReason::normalize(txn.reason.as_deref());
            *groups.entry((txn.sku_id, txn.txn_type, reason)).or_insert(0) += txn.qty;
        }
        Ok(groups
            .into_iter()
            .map(|((sku_id, txn_type, reason), qty)| MovementTotal {
                sku_id,
                txn_type,
                reason,
                qty,
            })
            .collect())
    }

    async fn sku_metadata(&self, sku_ids: &[SkuId]) -> Result<Vec<SkuMetadata>, StoreError> {
        self.check()?;
        Ok(self
            .catalogue
            .iter()
            .filter(|m| sku_ids.contains(&m.sku_id))
            .cloned()
            .collect())
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn ist() -> FixedOffset {
    FixedOffset::east_opt(19_800).unwrap()
}

fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0).unwrap()
}

fn engine(ledger: &InMemoryLedger, now: DateTime<Utc>) -> SnapshotEngine<&InMemoryLedger, FixedClock> {
    SnapshotEngine::new(ledger, FixedClock::at(now), ist())
}

fn period(year: i32, month: u32) -> SnapshotPeriod {
    SnapshotPeriod::new(year, month).unwrap()
}

fn sku(code: &str, product_id: ProductId, product_name: &str, color: &str) -> SkuMetadata {
    SkuMetadata {
        sku_id: SkuId::new(),
        sku_code: code.to_string(),
        size: "M".to_string(),
        color_name: color.to_string(),
        product_id,
        product_name: product_name.to_string(),
        category: Some("tops".to_string()),
    }
}

fn frozen_row(sku_id: SkuId, opening: i64, inward: &[(&str, i64)], outward: &[(&str, i64)]) -> StockSnapshot {
    StockSnapshot::from_movements(
        sku_id,
        opening,
        inward.iter().map(|(r, q)| ((*r).to_string(), *q)).collect(),
        outward.iter().map(|(r, q)| ((*r).to_string(), *q)).collect(),
    )
}

fn query(period: SnapshotPeriod) -> SnapshotQuery {
    SnapshotQuery {
        period,
        filter: SnapshotFilter::default(),
        rollup: Rollup::Sku,
        page: PageRequest::default(),
    }
}

/// Ledger with SKU "S1" moving in April 2025 and a frozen March closing of 20.
fn april_ledger() -> (InMemoryLedger, SkuMetadata) {
    let s1 = sku("S1", ProductId::new(), "Linen Shirt", "White");
    let mut ledger = InMemoryLedger::default();
    ledger.record(s1.sku_id, TxnType::Inward, Some("production"), 10, at(2025, 4, 3, 9, 0));
    ledger.record(s1.sku_id, TxnType::Inward, Some("return_receipt"), 5, at(2025, 4, 10, 12, 0));
    ledger.record(s1.sku_id, TxnType::Outward, Some("sale"), 3, at(2025, 4, 20, 15, 45));
    ledger.freeze(2025, 3, frozen_row(s1.sku_id, 8, &[("production", 12)], &[]));
    ledger.catalogue.push(s1.clone());
    (ledger, s1)
}

// ============================================================================
// Engine
// ============================================================================

#[tokio::test]
async fn test_live_april_from_march_closing() {
    let (ledger, s1) = april_ledger();
    let engine = engine(&ledger, at(2025, 4, 25, 6, 0));

    let raw = engine.raw_snapshot(period(2025, 4)).await.unwrap();

    assert!(raw.is_live);
    assert_eq!(raw.rows.len(), 1);
    let row = &raw.rows[0];
    assert_eq!(row.sku_id, s1.sku_id);
    assert_eq!(row.opening_stock, 20);
    assert_eq!(row.total_inward, 15);
    assert_eq!(row.total_outward, 3);
    assert_eq!(row.closing_stock, 32);
    assert_eq!(
        row.inward_breakdown,
        Breakdown::from([("production".to_string(), 10), ("return_receipt".to_string(), 5)])
    );
    assert_eq!(row.outward_breakdown, Breakdown::from([("sale".to_string(), 3)]));
}

#[tokio::test]
async fn test_frozen_april_matches_live_computation() {
    let (mut ledger, _) = april_ledger();
    let live = engine(&ledger, at(2025, 4, 25, 6, 0))
        .raw_snapshot(period(2025, 4))
        .await
        .unwrap();

    for row in live.rows.clone() {
        ledger.freeze(2025, 4, row);
    }
    let frozen = engine(&ledger, at(2025, 5, 2, 6, 0))
        .raw_snapshot(period(2025, 4))
        .await
        .unwrap();

    assert!(!frozen.is_live);
    assert_eq!(frozen.rows, live.rows);
}

#[tokio::test]
async fn test_past_month_reads_frozen_rows_only() {
    let (mut ledger, s1) = april_ledger();
    ledger.record(s1.sku_id, TxnType::Outward, Some("sale"), 1, at(2025, 3, 15, 10, 0));

    let raw = engine(&ledger, at(2025, 4, 25, 6, 0))
        .raw_snapshot(period(2025, 3))
        .await
        .unwrap();

    assert!(!raw.is_live);
    assert_eq!(raw.rows.len(), 1);
    assert_eq!(raw.rows[0].closing_stock, 20);
    assert_eq!(raw.rows[0].total_outward, 0);
}

#[tokio::test]
async fn test_idle_sku_is_absent() {
    let (mut ledger, _) = april_ledger();
    let s2 = sku("S2", ProductId::new(), "Denim Jacket", "Blue");
    ledger.catalogue.push(s2.clone());

    let page = engine(&ledger, at(2025, 4, 25, 6, 0))
        .enriched_snapshot(&query(period(2025, 4)))
        .await
        .unwrap();

    assert!(page.page.items.iter().all(|row| row.sku_id != Some(s2.sku_id)));
    assert_eq!(page.page.total, 1);
}

#[tokio::test]
async fn test_search_is_case_insensitive() {
    let (mut ledger, _) = april_ledger();
    let other = sku("TEE-RED-M", ProductId::new(), "Crew Tee", "Red");
    let coloured = sku("TEE-X", ProductId::new(), "Crew Tee", "Colour s1 edition");
    ledger.record(other.sku_id, TxnType::Inward, Some("production"), 4, at(2025, 4, 2, 8, 0));
    ledger.record(coloured.sku_id, TxnType::Inward, Some("production"), 2, at(2025, 4, 2, 8, 0));
    ledger.catalogue.push(other);
    ledger.catalogue.push(coloured);

    let mut q = query(period(2025, 4));
    q.filter.search = Some("S1".to_string());
    let page = engine(&ledger, at(2025, 4, 25, 6, 0))
        .enriched_snapshot(&q)
        .await
        .unwrap();

    let codes: Vec<_> = page.page.items.iter().map(|r| r.sku_code.as_str()).collect();
    assert_eq!(codes, vec!["S1", "TEE-X"]);
}

#[tokio::test]
async fn test_live_reads_are_idempotent() {
    let (ledger, _) = april_ledger();
    let engine = engine(&ledger, at(2025, 4, 25, 6, 0));

    let first = engine.summary(period(2025, 4)).await.unwrap();
    let second = engine.summary(period(2025, 4)).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.total_closing, 32);
}

#[tokio::test]
async fn test_month_boundary_follows_business_offset() {
    let s1 = sku("S1", ProductId::new(), "Linen Shirt", "White");
    let mut ledger = InMemoryLedger::default();
    // 23:59 on 31 March at +05:30
    ledger.record(s1.sku_id, TxnType::Inward, Some("production"), 1, at(2025, 3, 31, 18, 29));
    // 00:00 on 1 April at +05:30
    ledger.record(s1.sku_id, TxnType::Inward, Some("production"), 2, at(2025, 3, 31, 18, 30));
    // 00:00 on 1 May at +05:30
    ledger.record(s1.sku_id, TxnType::Inward, Some("production"), 4, at(2025, 4, 30, 18, 30));

    // 1 April 02:00 at +05:30 is still 31 March in UTC
    let engine = engine(&ledger, at(2025, 3, 31, 20, 30));
    assert_eq!(engine.current_period(), period(2025, 4));

    let raw = engine.raw_snapshot(period(2025, 4)).await.unwrap();
    assert!(raw.is_live);
    assert_eq!(raw.rows[0].total_inward, 2);
}

#[tokio::test]
async fn test_unknown_and_missing_reasons_normalize() {
    let s1 = sku("S1", ProductId::new(), "Linen Shirt", "White");
    let mut ledger = InMemoryLedger::default();
    ledger.record(s1.sku_id, TxnType::Outward, None, 1, at(2025, 4, 2, 8, 0));
    ledger.record(s1.sku_id, TxnType::Outward, Some("gifted"), 2, at(2025, 4, 2, 8, 0));
    ledger.record(s1.sku_id, TxnType::Inward, Some("Production"), 9, at(2025, 4, 2, 8, 0));

    let raw = engine(&ledger, at(2025, 4, 25, 6, 0))
        .raw_snapshot(period(2025, 4))
        .await
        .unwrap();

    assert_eq!(raw.rows[0].outward_breakdown, Breakdown::from([("unknown".to_string(), 3)]));
    assert_eq!(raw.rows[0].inward_breakdown, Breakdown::from([("production".to_string(), 9)]));
}

#[tokio::test]
async fn test_historical_rows_use_current_catalogue_names() {
    let (mut ledger, s1) = april_ledger();
    // Renamed and recategorised after March closed.
    ledger.catalogue[0].product_name = "Linen Shirt (Relaxed)".to_string();
    ledger.catalogue[0].category = Some("shirts".to_string());

    let mut q = query(period(2025, 3));
    q.filter.category = Some("shirts".to_string());
    let page = engine(&ledger, at(2025, 4, 25, 6, 0))
        .enriched_snapshot(&q)
        .await
        .unwrap();

    assert_eq!(page.page.items.len(), 1);
    assert_eq!(page.page.items[0].sku_id, Some(s1.sku_id));
    assert_eq!(page.page.items[0].product_name, "Linen Shirt (Relaxed)");
}

#[tokio::test]
async fn test_product_rollup_and_pagination() {
    let shirt = ProductId::new();
    let tee = ProductId::new();
    let shirt_s = sku("SH-S", shirt, "Shirt", "White");
    let shirt_l = sku("SH-L", shirt, "Shirt", "White");
    let tee_m = sku("TE-M", tee, "Tee", "Black");

    let mut ledger = InMemoryLedger::default();
    ledger.freeze(2025, 1, frozen_row(shirt_s.sku_id, 0, &[("production", 10)], &[]));
    ledger.freeze(2025, 1, frozen_row(shirt_l.sku_id, 5, &[], &[("sale", 2)]));
    ledger.freeze(2025, 1, frozen_row(tee_m.sku_id, 30, &[], &[("damage", 1)]));
    ledger.catalogue.extend([shirt_s, shirt_l, tee_m]);

    let engine = engine(&ledger, at(2025, 4, 25, 6, 0));
    let mut q = query(period(2025, 1));
    q.rollup = Rollup::Product;
    q.page = PageRequest::new(1, 1);

    let first = engine.enriched_snapshot(&q).await.unwrap();
    assert_eq!(first.page.total, 2);
    assert_eq!(first.page.total_pages, 2);
    assert_eq!(first.page.items[0].sku_code, "Tee");
    assert_eq!(first.page.items[0].closing_stock, 29);

    q.page = PageRequest::new(2, 1);
    let second = engine.enriched_snapshot(&q).await.unwrap();
    let row = &second.page.items[0];
    assert_eq!(row.sku_code, "Shirt");
    assert_eq!(row.size, "All");
    assert_eq!(row.opening_stock, 5);
    assert_eq!(row.closing_stock, 13);
    assert!(!second.is_live);
}

#[tokio::test]
async fn test_empty_month_is_not_an_error() {
    let ledger = InMemoryLedger::default();
    let engine = engine(&ledger, at(2025, 4, 25, 6, 0));

    let page = engine.enriched_snapshot(&query(period(2024, 11))).await.unwrap();
    assert!(page.page.items.is_empty());
    assert_eq!(page.page.total, 0);

    let summary = engine.summary(period(2025, 4)).await.unwrap();
    assert_eq!(summary.sku_count, 0);
    assert_eq!(summary.total_closing, 0);
    assert!(summary.is_live);
}

#[tokio::test]
async fn test_summary_merges_reasons_across_skus() {
    let (mut ledger, _) = april_ledger();
    let other = sku("S9", ProductId::new(), "Scarf", "Green");
    ledger.record(other.sku_id, TxnType::Inward, Some("production"), 6, at(2025, 4, 5, 8, 0));
    ledger.record(other.sku_id, TxnType::Outward, Some("damage"), 1, at(2025, 4, 6, 8, 0));
    ledger.catalogue.push(other);

    let summary = engine(&ledger, at(2025, 4, 25, 6, 0))
        .summary(period(2025, 4))
        .await
        .unwrap();

    assert_eq!(summary.sku_count, 2);
    assert_eq!(summary.total_opening, 20);
    assert_eq!(summary.total_inward, 21);
    assert_eq!(summary.total_outward, 4);
    assert_eq!(summary.total_closing, 37);
    assert_eq!(summary.top_inward_reasons.get("production"), Some(&16));
    assert_eq!(summary.top_outward_reasons.get("damage"), Some(&1));
    assert_eq!(summary.top_outward_reasons.get("sale"), Some(&3));
}

#[tokio::test]
async fn test_store_failure_propagates() {
    let ledger = InMemoryLedger {
        unavailable: true,
        ..InMemoryLedger::default()
    };

    let err = engine(&ledger, at(2025, 4, 25, 6, 0))
        .summary(period(2025, 2))
        .await
        .unwrap_err();

    assert!(matches!(err, SnapshotError::Store(_)));
    assert!(!err.is_validation());
    assert!(err.to_string().contains("connection refused"));
}

// ============================================================================
// Properties
// ============================================================================

fn reason_strategy() -> impl Strategy<Value = MovementReason> {
    prop::sample::select(MovementReason::ALL.to_vec())
}

fn txn_type_strategy() -> impl Strategy<Value = TxnType> {
    prop_oneof![Just(TxnType::Inward), Just(TxnType::Outward)]
}

/// Openings and movements over a small pool of SKUs so that they overlap.
fn ledger_strategy() -> impl Strategy<Value = (HashMap<SkuId, i64>, Vec<MovementTotal>)> {
    let pool: Vec<SkuId> = (0..8).map(|_| SkuId::new()).collect();
    let opening_pool = pool.clone();
    (
        prop::collection::vec((0usize..8, 0i64..200), 0..8),
        prop::collection::vec((0usize..8, txn_type_strategy(), reason_strategy(), 1i64..100), 0..40),
    )
        .prop_map(move |(openings, movements)| {
            let openings = openings
                .into_iter()
                .map(|(i, qty)| (opening_pool[i], qty))
                .collect();
            let movements = movements
                .into_iter()
                .map(|(i, txn_type, reason, qty)| MovementTotal {
                    sku_id: pool[i],
                    txn_type,
                    reason,
                    qty,
                })
                .collect();
            (openings, movements)
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Every live row satisfies closing = opening + inward - outward, and
    /// its totals equal the sums of its breakdowns.
    #[test]
    fn prop_live_rows_balance((openings, movements) in ledger_strategy()) {
        for row in compute_live_snapshot(&openings, &movements) {
            prop_assert!(row.is_balanced());
            prop_assert_eq!(row.total_inward, row.inward_breakdown.values().sum::<i64>());
            prop_assert_eq!(row.total_outward, row.outward_breakdown.values().sum::<i64>());
            prop_assert_eq!(row.opening_stock, openings.get(&row.sku_id).copied().unwrap_or(0));
        }
    }

    /// A SKU is reported iff it had opening stock or any movement.
    #[test]
    fn prop_live_rows_skip_idle_skus((openings, movements) in ledger_strategy()) {
        let rows = compute_live_snapshot(&openings, &movements);

        for row in &rows {
            prop_assert!(!row.is_empty());
        }
        for (sku_id, opening) in &openings {
            let moved = movements.iter().any(|m| m.sku_id == *sku_id);
            let reported = rows.iter().any(|r| r.sku_id == *sku_id);
            prop_assert_eq!(reported, *opening != 0 || moved);
        }
    }

    /// Product rollup preserves the quantity totals of each product.
    #[test]
    fn prop_rollup_preserves_product_totals((openings, movements) in ledger_strategy()) {
        let raw = compute_live_snapshot(&openings, &movements);
        let products = [ProductId::new(), ProductId::new(), ProductId::new()];
        let metadata: HashMap<SkuId, SkuMetadata> = raw
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let product_id = products[i % products.len()];
                (row.sku_id, SkuMetadata {
                    sku_id: row.sku_id,
                    sku_code: format!("SKU-{i:02}"),
                    size: "M".to_string(),
                    color_name: "Black".to_string(),
                    product_id,
                    product_name: format!("Product {}", i % products.len()),
                    category: None,
                })
            })
            .collect();

        let sku_rows = enrich(raw, &metadata);
        let rolled = rollup_by_product(sku_rows.clone());

        for product_id in products {
            let expected: Vec<_> = sku_rows.iter().filter(|r| r.product_id == Some(product_id)).collect();
            let merged: Vec<_> = rolled.iter().filter(|r| r.product_id == Some(product_id)).collect();
            if expected.is_empty() {
                prop_assert!(merged.is_empty());
                continue;
            }
            prop_assert_eq!(merged.len(), 1);
            let merged = merged[0];
            prop_assert_eq!(merged.opening_stock, expected.iter().map(|r| r.opening_stock).sum::<i64>());
            prop_assert_eq!(merged.total_inward, expected.iter().map(|r| r.total_inward).sum::<i64>());
            prop_assert_eq!(merged.total_outward, expected.iter().map(|r| r.total_outward).sum::<i64>());
            prop_assert_eq!(merged.closing_stock, expected.iter().map(|r| r.closing_stock).sum::<i64>());
            prop_assert!(merged.sku_id.is_none());
        }
    }

    /// Concatenating every page reproduces the sorted list exactly once.
    #[test]
    fn prop_pages_partition_sorted_rows(
        (openings, movements) in ledger_strategy(),
        limit in 1u32..6,
    ) {
        let mut rows = enrich(compute_live_snapshot(&openings, &movements), &HashMap::new());
        sort_rows(&mut rows);

        let total_pages = PageResponse::new(Vec::<()>::new(), 1, limit, rows.len() as u64).total_pages;
        let mut concatenated = Vec::new();
        for page in 1..=total_pages {
            let response = PageResponse::from_sorted(rows.clone(), PageRequest::new(page, limit));
            prop_assert_eq!(response.total, rows.len() as u64);
            concatenated.extend(response.items);
        }

        prop_assert_eq!(concatenated, rows);
    }
}
