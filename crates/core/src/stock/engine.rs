//! Snapshot computation engine.
//!
//! Decides, per requested month, whether to read frozen snapshot rows or to
//! compute the month live from the inventory ledger, then runs the shared
//! presentation pipeline.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use tracing::debug;
use warpline_shared::types::{PageResponse, SkuId};

use super::error::SnapshotError;
use super::live::compute_live_snapshot;
use super::period::SnapshotPeriod;
use super::pipeline;
use super::types::{
    MovementTotal, RawSnapshot, SkuMetadata, SnapshotPage, SnapshotQuery, SnapshotSummary,
    StockSnapshot,
};
use crate::clock::Clock;

/// Error raised by a [`StockLedger`] implementation.
pub type StoreError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Read access to the inventory ledger, the frozen snapshot store and the
/// SKU catalogue.
#[async_trait]
pub trait StockLedger: Send + Sync {
    /// Frozen snapshot rows for the month starting on `month`.
    async fn frozen_snapshot(&self, month: NaiveDate) -> Result<Vec<StockSnapshot>, StoreError>;

    /// Closing stock per SKU from the frozen snapshot of the month starting on `month`.
    async fn closing_stock(&self, month: NaiveDate) -> Result<HashMap<SkuId, i64>, StoreError>;

    /// Movements with `created_at` in `[from, to)`, summed per (SKU, direction, reason).
    async fn movement_totals(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<MovementTotal>, StoreError>;

    /// Current catalogue metadata for the given SKUs.
    async fn sku_metadata(&self, sku_ids: &[SkuId]) -> Result<Vec<SkuMetadata>, StoreError>;
}

#[async_trait]
impl<T: StockLedger + ?Sized> StockLedger for &T {
    async fn frozen_snapshot(&self, month: NaiveDate) -> Result<Vec<StockSnapshot>, StoreError> {
        (**self).frozen_snapshot(month).await
    }

    async fn closing_stock(&self, month: NaiveDate) -> Result<HashMap<SkuId, i64>, StoreError> {
        (**self).closing_stock(month).await
    }

    async fn movement_totals(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<MovementTotal>, StoreError> {
        (**self).movement_totals(from, to).await
    }

    async fn sku_metadata(&self, sku_ids: &[SkuId]) -> Result<Vec<SkuMetadata>, StoreError> {
        (**self).sku_metadata(sku_ids).await
    }
}

/// Produces monthly stock snapshots.
pub struct SnapshotEngine<L, C> {
    ledger: L,
    clock: C,
    offset: FixedOffset,
}

impl<L: StockLedger, C: Clock> SnapshotEngine<L, C> {
    /// Creates an engine whose business calendar is shifted from UTC by `offset`.
    pub const fn new(ledger: L, clock: C, offset: FixedOffset) -> Self {
        Self {
            ledger,
            clock,
            offset,
        }
    }

    /// The month that is currently accumulating on the business calendar.
    pub fn current_period(&self) -> SnapshotPeriod {
        SnapshotPeriod::containing(self.clock.now(), self.offset)
    }

    /// Returns true if `period` is the current month and must be computed live.
    pub fn is_live(&self, period: SnapshotPeriod) -> bool {
        period == self.current_period()
    }

    /// Per-SKU rows for `period`, read frozen or computed live.
    pub async fn raw_snapshot(&self, period: SnapshotPeriod) -> Result<RawSnapshot, SnapshotError> {
        let is_live = self.is_live(period);

        let rows = if is_live {
            self.compute_live(period).await?
        } else {
            self.ledger
                .frozen_snapshot(period.first_day())
                .await
                .map_err(SnapshotError::Store)?
        };

        debug!(%period, is_live, rows = rows.len(), "Loaded raw stock snapshot");

        Ok(RawSnapshot {
            period,
            is_live,
            rows,
        })
    }

    async fn compute_live(&self, period: SnapshotPeriod) -> Result<Vec<StockSnapshot>, SnapshotError> {
        let (start, end) = period.utc_bounds(self.offset)?;
        let previous = period.previous()?;

        let movements = self
            .ledger
            .movement_totals(start, end)
            .await
            .map_err(SnapshotError::Store)?;
        let openings = self
            .ledger
            .closing_stock(previous.first_day())
            .await
            .map_err(SnapshotError::Store)?;

        Ok(compute_live_snapshot(&openings, &movements))
    }

    /// Enriched, filtered, rolled up, sorted and paginated snapshot rows.
    pub async fn enriched_snapshot(&self, query: &SnapshotQuery) -> Result<SnapshotPage, SnapshotError> {
        let raw = self.raw_snapshot(query.period).await?;

        let sku_ids: Vec<SkuId> = raw.rows.iter().map(|row| row.sku_id).collect();
        let metadata: HashMap<SkuId, SkuMetadata> = if sku_ids.is_empty() {
            HashMap::new()
        } else {
            self.ledger
                .sku_metadata(&sku_ids)
                .await
                .map_err(SnapshotError::Store)?
                .into_iter()
                .map(|meta| (meta.sku_id, meta))
                .collect()
        };

        let rows = pipeline::enrich(raw.rows, &metadata);
        let rows = query.filter.apply(rows);
        let mut rows = pipeline::apply_rollup(rows, query.rollup);
        pipeline::sort_rows(&mut rows);

        Ok(SnapshotPage {
            page: PageResponse::from_sorted(rows, query.page),
            is_live: raw.is_live,
        })
    }

    /// Month-level totals and merged reason breakdowns.
    pub async fn summary(&self, period: SnapshotPeriod) -> Result<SnapshotSummary, SnapshotError> {
        let raw = self.raw_snapshot(period).await?;
        Ok(pipeline::summarize(&raw.rows, raw.is_live))
    }
}
