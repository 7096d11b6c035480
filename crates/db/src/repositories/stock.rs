//! Stock repository: inventory ledger aggregation, frozen monthly snapshots
//! and SKU catalogue metadata.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, FromQueryResult, JoinType, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait,
};
use tracing::debug;
use uuid::Uuid;

use warpline_core::stock::{
    Breakdown, MovementReason, MovementTotal, SkuMetadata, StockLedger, StockSnapshot, StoreError,
    TxnType,
};
use warpline_shared::types::{ProductId, SkuId};

use crate::entities::{
    inventory_transactions, monthly_stock_snapshots, products,
    sea_orm_active_enums::InventoryTxnType, skus, variations,
};

/// SKU ids bound per metadata query; Postgres allows 65,535 bind parameters.
const METADATA_BATCH_SIZE: usize = 10_000;

/// Error types for stock repository operations.
#[derive(Debug, thiserror::Error)]
pub enum StockRepositoryError {
    /// A stored breakdown is not a reason-to-quantity map.
    #[error("Malformed {column} for SKU {sku_id} in {month}: {source}")]
    MalformedBreakdown {
        /// Breakdown column name.
        column: &'static str,
        /// SKU of the offending row.
        sku_id: Uuid,
        /// Month of the offending row.
        month: NaiveDate,
        /// Parse failure.
        #[source]
        source: serde_json::Error,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Movement totals grouped by SKU, direction and stored reason.
#[derive(Debug, FromQueryResult)]
struct MovementGroupRow {
    sku_id: Uuid,
    txn_type: InventoryTxnType,
    reason: Option<String>,
    qty: i64,
}

/// A SKU joined with its variation and product.
#[derive(Debug, FromQueryResult)]
struct SkuMetadataRow {
    sku_id: Uuid,
    sku_code: String,
    size: String,
    color_name: String,
    product_id: Uuid,
    product_name: String,
    category: Option<String>,
}

impl From<SkuMetadataRow> for SkuMetadata {
    fn from(row: SkuMetadataRow) -> Self {
        Self {
            sku_id: SkuId::from_uuid(row.sku_id),
            sku_code: row.sku_code,
            size: row.size,
            color_name: row.color_name,
            product_id: ProductId::from_uuid(row.product_id),
            product_name: row.product_name,
            category: row.category,
        }
    }
}

impl From<InventoryTxnType> for TxnType {
    fn from(value: InventoryTxnType) -> Self {
        match value {
            InventoryTxnType::Inward => Self::Inward,
            InventoryTxnType::Outward => Self::Outward,
        }
    }
}

impl From<TxnType> for InventoryTxnType {
    fn from(value: TxnType) -> Self {
        match value {
            TxnType::Inward => Self::Inward,
            TxnType::Outward => Self::Outward,
        }
    }
}

fn parse_breakdown(
    column: &'static str,
    model: &monthly_stock_snapshots::Model,
    value: &serde_json::Value,
) -> Result<Breakdown, StockRepositoryError> {
    serde_json::from_value(value.clone()).map_err(|source| {
        StockRepositoryError::MalformedBreakdown {
            column,
            sku_id: model.sku_id,
            month: model.month,
            source,
        }
    })
}

/// Converts a frozen snapshot row into the engine's representation.
pub fn snapshot_from_model(
    model: &monthly_stock_snapshots::Model,
) -> Result<StockSnapshot, StockRepositoryError> {
    Ok(StockSnapshot {
        sku_id: SkuId::from_uuid(model.sku_id),
        opening_stock: model.opening_stock,
        total_inward: model.total_inward,
        total_outward: model.total_outward,
        closing_stock: model.closing_stock,
        inward_breakdown: parse_breakdown("inward_breakdown", model, &model.inward_breakdown)?,
        outward_breakdown: parse_breakdown("outward_breakdown", model, &model.outward_breakdown)?,
    })
}

/// Stock repository backed by Postgres.
#[derive(Debug, Clone)]
pub struct StockRepository {
    db: DatabaseConnection,
}

impl StockRepository {
    /// Creates a new stock repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Frozen snapshot rows for the month starting on `month`, ordered by SKU.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored breakdown is malformed.
    pub async fn find_frozen(&self, month: NaiveDate) -> Result<Vec<StockSnapshot>, StockRepositoryError> {
        let models = monthly_stock_snapshots::Entity::find()
            .filter(monthly_stock_snapshots::Column::Month.eq(month))
            .order_by_asc(monthly_stock_snapshots::Column::SkuId)
            .all(&self.db)
            .await?;

        debug!(%month, rows = models.len(), "Loaded frozen snapshot rows");

        models.iter().map(snapshot_from_model).collect()
    }

    /// Closing stock per SKU of the frozen month starting on `month`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_closing_stock(
        &self,
        month: NaiveDate,
    ) -> Result<HashMap<SkuId, i64>, StockRepositoryError> {
        let rows: Vec<(Uuid, i64)> = monthly_stock_snapshots::Entity::find()
            .filter(monthly_stock_snapshots::Column::Month.eq(month))
            .select_only()
            .column(monthly_stock_snapshots::Column::SkuId)
            .column(monthly_stock_snapshots::Column::ClosingStock)
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(sku_id, closing)| (SkuId::from_uuid(sku_id), closing))
            .collect())
    }

    /// Movements in `[from, to)` summed per SKU, direction and reason.
    ///
    /// Reasons are normalized after grouping, so several stored spellings
    /// of the same reason may yield several totals for one group.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn sum_movements(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<MovementTotal>, StockRepositoryError> {
        let rows = inventory_transactions::Entity::find()
            .select_only()
            .column(inventory_transactions::Column::SkuId)
            .column(inventory_transactions::Column::TxnType)
            .column(inventory_transactions::Column::Reason)
            .column_as(inventory_transactions::Column::Qty.sum(), "qty")
            .filter(inventory_transactions::Column::CreatedAt.gte(from))
            .filter(inventory_transactions::Column::CreatedAt.lt(to))
            .group_by(inventory_transactions::Column::SkuId)
            .group_by(inventory_transactions::Column::TxnType)
            .group_by(inventory_transactions::Column::Reason)
            .into_model::<MovementGroupRow>()
            .all(&self.db)
            .await?;

        debug!(%from, %to, groups = rows.len(), "Aggregated inventory movements");

        Ok(rows
            .into_iter()
            .map(|row| MovementTotal {
                sku_id: SkuId::from_uuid(row.sku_id),
                txn_type: row.txn_type.into(),
                reason: MovementReason::normalize(row.reason.as_deref()),
                qty: row.qty,
            })
            .collect())
    }

    /// Current catalogue metadata for the given SKUs.
    ///
    /// SKUs missing from the catalogue are simply absent from the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find_sku_metadata(
        &self,
        sku_ids: &[SkuId],
    ) -> Result<Vec<SkuMetadata>, StockRepositoryError> {
        if sku_ids.is_empty() {
            return Ok(Vec::new());
        }

        self.find_sku_metadata_in_batches(sku_ids, METADATA_BATCH_SIZE)
            .await
    }

    async fn find_sku_metadata_in_batches(
        &self,
        sku_ids: &[SkuId],
        batch_size: usize,
    ) -> Result<Vec<SkuMetadata>, StockRepositoryError> {
        let mut rows = Vec::with_capacity(sku_ids.len());
        for batch in sku_ids.chunks(batch_size.max(1)) {
            let ids: Vec<Uuid> = batch.iter().map(|id| id.into_inner()).collect();

            let found = skus::Entity::find()
                .filter(skus::Column::Id.is_in(ids))
                .join(JoinType::InnerJoin, skus::Relation::Variations.def())
                .join(JoinType::InnerJoin, variations::Relation::Products.def())
                .select_only()
                .column_as(skus::Column::Id, "sku_id")
                .column(skus::Column::SkuCode)
                .column(skus::Column::Size)
                .column(variations::Column::ColorName)
                .column_as(products::Column::Id, "product_id")
                .column_as(products::Column::Name, "product_name")
                .column(products::Column::Category)
                .into_model::<SkuMetadataRow>()
                .all(&self.db)
                .await?;
            rows.extend(found);
        }

        Ok(rows.into_iter().map(SkuMetadata::from).collect())
    }
}

#[async_trait]
impl StockLedger for StockRepository {
    async fn frozen_snapshot(&self, month: NaiveDate) -> Result<Vec<StockSnapshot>, StoreError> {
        Ok(self.find_frozen(month).await?)
    }

    async fn closing_stock(&self, month: NaiveDate) -> Result<HashMap<SkuId, i64>, StoreError> {
        Ok(self.find_closing_stock(month).await?)
    }

    async fn movement_totals(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<MovementTotal>, StoreError> {
        Ok(self.sum_movements(from, to).await?)
    }

    async fn sku_metadata(&self, sku_ids: &[SkuId]) -> Result<Vec<SkuMetadata>, StoreError> {
        Ok(self.find_sku_metadata(sku_ids).await?)
    }
}

#[cfg(test)]
#[path = "stock_tests.rs"]
mod tests;
