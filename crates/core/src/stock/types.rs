//! Stock snapshot data types.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use warpline_shared::types::{PageRequest, PageResponse, ProductId, SkuId};

use super::period::SnapshotPeriod;

/// Quantity per reason code.
///
/// Ordered so that serialized breakdowns are stable across requests.
pub type Breakdown = BTreeMap<String, i64>;

/// Direction of an inventory movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxnType {
    /// Stock coming in.
    Inward,
    /// Stock going out.
    Outward,
}

impl TxnType {
    /// Returns the wire/database representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inward => "inward",
            Self::Outward => "outward",
        }
    }
}

impl fmt::Display for TxnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a movement happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementReason {
    /// Finished goods from production.
    Production,
    /// Customer return received back into stock.
    ReturnReceipt,
    /// Return-to-origin parcel received.
    RtoReceived,
    /// Manual stock correction.
    Adjustment,
    /// Transfer between locations.
    Transfer,
    /// Stock reserved for an order.
    OrderAllocation,
    /// Sale.
    Sale,
    /// Damaged goods.
    Damage,
    /// Written off.
    WriteOff,
    /// Missing or unrecognized reason.
    Unknown,
}

impl MovementReason {
    /// All known reasons, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::Production,
        Self::ReturnReceipt,
        Self::RtoReceived,
        Self::Adjustment,
        Self::Transfer,
        Self::OrderAllocation,
        Self::Sale,
        Self::Damage,
        Self::WriteOff,
        Self::Unknown,
    ];

    /// Maps a stored reason code to a known reason.
    ///
    /// Missing, blank, or unrecognized codes become [`MovementReason::Unknown`].
    #[must_use]
    pub fn normalize(code: Option<&str>) -> Self {
        let Some(code) = code.map(str::trim).filter(|c| !c.is_empty()) else {
            return Self::Unknown;
        };
        let code = code.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|reason| reason.as_str() == code)
            .unwrap_or(Self::Unknown)
    }

    /// Returns the reason code used as breakdown key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Production => "production",
            Self::ReturnReceipt => "return_receipt",
            Self::RtoReceived => "rto_received",
            Self::Adjustment => "adjustment",
            Self::Transfer => "transfer",
            Self::OrderAllocation => "order_allocation",
            Self::Sale => "sale",
            Self::Damage => "damage",
            Self::WriteOff => "write_off",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MovementReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summed movement quantity for one (SKU, direction, reason) group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementTotal {
    /// SKU the movement belongs to.
    pub sku_id: SkuId,
    /// Direction.
    pub txn_type: TxnType,
    /// Reason code.
    pub reason: MovementReason,
    /// Summed quantity.
    pub qty: i64,
}

/// Per-SKU monthly stock aggregate.
///
/// Frozen snapshot rows and live computations both take this shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockSnapshot {
    /// SKU.
    pub sku_id: SkuId,
    /// Stock at the start of the month.
    pub opening_stock: i64,
    /// Total inward quantity.
    pub total_inward: i64,
    /// Total outward quantity.
    pub total_outward: i64,
    /// Stock at the end of the month.
    pub closing_stock: i64,
    /// Inward quantity per reason.
    pub inward_breakdown: Breakdown,
    /// Outward quantity per reason.
    pub outward_breakdown: Breakdown,
}

impl StockSnapshot {
    /// Builds a row from its movements, deriving the closing stock.
    #[must_use]
    pub fn from_movements(
        sku_id: SkuId,
        opening_stock: i64,
        inward_breakdown: Breakdown,
        outward_breakdown: Breakdown,
    ) -> Self {
        let total_inward = inward_breakdown.values().sum();
        let total_outward = outward_breakdown.values().sum();
        Self {
            sku_id,
            opening_stock,
            total_inward,
            total_outward,
            closing_stock: opening_stock + total_inward - total_outward,
            inward_breakdown,
            outward_breakdown,
        }
    }

    /// Returns true if the row carries no information (nothing opened, nothing moved).
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.opening_stock == 0 && self.total_inward == 0 && self.total_outward == 0
    }

    /// Returns true if `closing = opening + inward - outward`.
    #[must_use]
    pub const fn is_balanced(&self) -> bool {
        self.closing_stock == self.opening_stock + self.total_inward - self.total_outward
    }
}

/// Current catalogue metadata for a SKU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkuMetadata {
    /// SKU.
    pub sku_id: SkuId,
    /// SKU code.
    pub sku_code: String,
    /// Size label.
    pub size: String,
    /// Colour of the variation.
    pub color_name: String,
    /// Product.
    pub product_id: ProductId,
    /// Product name.
    pub product_name: String,
    /// Product category.
    pub category: Option<String>,
}

/// Snapshot row with display metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRow {
    /// SKU, or `None` for a product rollup row.
    pub sku_id: Option<SkuId>,
    /// Product, or `None` if the SKU has no catalogue entry.
    pub product_id: Option<ProductId>,
    /// SKU code (product name for rollup rows).
    pub sku_code: String,
    /// Product name.
    pub product_name: String,
    /// Colour name.
    pub color_name: String,
    /// Size label (`"All"` for rollup rows).
    pub size: String,
    /// Product category.
    pub category: Option<String>,
    /// Stock at the start of the month.
    pub opening_stock: i64,
    /// Total inward quantity.
    pub total_inward: i64,
    /// Total outward quantity.
    pub total_outward: i64,
    /// Stock at the end of the month.
    pub closing_stock: i64,
    /// Inward quantity per reason.
    pub inward_breakdown: Breakdown,
    /// Outward quantity per reason.
    pub outward_breakdown: Breakdown,
}

/// Aggregation level of a snapshot listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rollup {
    /// One row per SKU.
    #[default]
    Sku,
    /// One row per product, summed across its SKUs.
    Product,
}

impl FromStr for Rollup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sku" => Ok(Self::Sku),
            "product" => Ok(Self::Product),
            other => Err(other.to_string()),
        }
    }
}

/// Search and category filters applied to enriched rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotFilter {
    /// Case-insensitive substring matched against SKU code, product name and colour.
    pub search: Option<String>,
    /// Exact category.
    pub category: Option<String>,
}

/// A validated snapshot listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotQuery {
    /// Month to report.
    pub period: SnapshotPeriod,
    /// Filters.
    pub filter: SnapshotFilter,
    /// Aggregation level.
    pub rollup: Rollup,
    /// Page to return.
    pub page: PageRequest,
}

/// Raw snapshot for a month, before enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSnapshot {
    /// Month reported.
    pub period: SnapshotPeriod,
    /// Whether the rows were computed live from the ledger.
    pub is_live: bool,
    /// Per-SKU rows.
    pub rows: Vec<StockSnapshot>,
}

/// One page of a snapshot listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPage {
    /// Page of rows with pagination metadata.
    #[serde(flatten)]
    pub page: PageResponse<SnapshotRow>,
    /// Whether the month is the live (current) month.
    pub is_live: bool,
}

/// Month-level totals across all SKUs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSummary {
    /// Sum of opening stock.
    pub total_opening: i64,
    /// Sum of inward quantity.
    pub total_inward: i64,
    /// Sum of outward quantity.
    pub total_outward: i64,
    /// Sum of closing stock.
    pub total_closing: i64,
    /// Number of SKU rows.
    pub sku_count: u64,
    /// Inward quantity per reason, across all SKUs.
    pub top_inward_reasons: Breakdown,
    /// Outward quantity per reason, across all SKUs.
    pub top_outward_reasons: Breakdown,
    /// Whether the month is the live (current) month.
    pub is_live: bool,
}
