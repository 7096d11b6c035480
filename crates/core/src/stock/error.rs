//! Stock snapshot error types.

use thiserror::Error;
use warpline_shared::AppError;
use warpline_shared::types::PaginationError;

use super::engine::StoreError;

/// Errors that can occur while producing a stock snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Month outside 1-12.
    #[error("Month must be between 1 and 12, got {0}")]
    InvalidMonth(u32),

    /// Year outside the supported range.
    #[error("Year must be between {min} and {max}, got {year}")]
    InvalidYear {
        /// Requested year.
        year: i32,
        /// Earliest supported year.
        min: i32,
        /// Latest supported year.
        max: i32,
    },

    /// Month cannot be represented on the calendar.
    #[error("Month {year}-{month:02} is out of range")]
    PeriodOutOfRange {
        /// Year.
        year: i32,
        /// Month.
        month: u32,
    },

    /// Unknown rollup level.
    #[error("Rollup must be 'sku' or 'product', got '{0}'")]
    InvalidRollup(String),

    /// Bad page or limit.
    #[error(transparent)]
    Pagination(#[from] PaginationError),

    /// The ledger or snapshot store failed.
    #[error("Snapshot store error: {0}")]
    Store(#[source] StoreError),
}

impl SnapshotError {
    /// Returns true if the error was caused by invalid request input.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        !matches!(self, Self::Store(_))
    }
}

impl From<SnapshotError> for AppError {
    fn from(err: SnapshotError) -> Self {
        if err.is_validation() {
            Self::Validation(err.to_string())
        } else {
            Self::Database(err.to_string())
        }
    }
}
