//! Monthly stock snapshots.
//!
//! A snapshot reports, per SKU and calendar month, the opening stock, the
//! inward and outward movement (with reason breakdowns) and the closing
//! stock. Completed months are read from frozen snapshot rows; the current
//! month is computed live from the inventory ledger. Both paths produce the
//! same [`StockSnapshot`] rows, and everything downstream (enrichment,
//! search, rollup, sorting, pagination) is shared.

pub mod engine;
pub mod error;
pub mod live;
pub mod period;
pub mod pipeline;
pub mod types;

#[cfg(test)]
mod tests;

pub use engine::{SnapshotEngine, StockLedger, StoreError};
pub use error::SnapshotError;
pub use period::SnapshotPeriod;
pub use types::*;
