//! Allocation error types.

use rust_decimal::Decimal;
use thiserror::Error;
use warpline_shared::AppError;
use warpline_shared::types::{AllocationId, InvoiceId, PaymentId};

/// Errors that can occur while matching payments to invoices.
#[derive(Debug, Error)]
pub enum AllocationError {
    /// Allocation amount is zero or negative.
    #[error("Allocation amount must be positive, got {0}")]
    NonPositiveAmount(Decimal),

    /// Amount carries more decimal places than money is stored with.
    #[error("Amount {0} has more than 2 decimal places")]
    ExcessPrecision(Decimal),

    /// Invoice amounts are negative or leave nothing payable.
    #[error("Invalid invoice amounts: {0}")]
    InvalidInvoiceAmounts(String),

    /// An invoice with this number already exists.
    #[error("Invoice number {0} already exists")]
    DuplicateInvoiceNumber(String),

    /// TDS rate outside 0-100 percent.
    #[error("TDS rate must be between 0 and 100 percent, got {0}")]
    InvalidTdsRate(Decimal),

    /// Payment has been cancelled.
    #[error("Payment {0} is cancelled")]
    PaymentCancelled(PaymentId),

    /// Invoice has been cancelled.
    #[error("Invoice {0} is cancelled")]
    InvoiceCancelled(InvoiceId),

    /// Amount is more than the payment has left to allocate.
    #[error("Amount {amount} exceeds unmatched payment amount {unmatched}")]
    ExceedsUnmatched {
        /// Requested amount.
        amount: Decimal,
        /// Unallocated remainder of the payment.
        unmatched: Decimal,
    },

    /// Amount is more than the invoice still has due.
    #[error("Amount {amount} exceeds invoice balance due {balance_due}")]
    ExceedsBalanceDue {
        /// Requested amount.
        amount: Decimal,
        /// Payable amount not yet covered.
        balance_due: Decimal,
    },

    /// Reversal would take a balance below zero.
    #[error("Cannot reverse {amount}; only {matched} is matched")]
    ReversalExceedsMatched {
        /// Amount being reversed.
        amount: Decimal,
        /// Smaller of the payment's matched and the invoice's paid amount.
        matched: Decimal,
    },

    /// Payment not found.
    #[error("Payment {0} not found")]
    PaymentNotFound(PaymentId),

    /// Invoice not found.
    #[error("Invoice {0} not found")]
    InvoiceNotFound(InvoiceId),

    /// Allocation not found.
    #[error("Allocation {0} not found")]
    AllocationNotFound(AllocationId),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl AllocationError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NonPositiveAmount(_)
            | Self::ExcessPrecision(_)
            | Self::InvalidInvoiceAmounts(_)
            | Self::InvalidTdsRate(_) => 400,

            Self::PaymentNotFound(_) | Self::InvoiceNotFound(_) | Self::AllocationNotFound(_) => {
                404
            }

            Self::DuplicateInvoiceNumber(_) => 409,

            Self::PaymentCancelled(_)
            | Self::InvoiceCancelled(_)
            | Self::ExceedsUnmatched { .. }
            | Self::ExceedsBalanceDue { .. }
            | Self::ReversalExceedsMatched { .. } => 422,

            Self::Database(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NonPositiveAmount(_) => "NON_POSITIVE_AMOUNT",
            Self::ExcessPrecision(_) => "EXCESS_PRECISION",
            Self::InvalidInvoiceAmounts(_) => "INVALID_INVOICE_AMOUNTS",
            Self::DuplicateInvoiceNumber(_) => "DUPLICATE_INVOICE_NUMBER",
            Self::InvalidTdsRate(_) => "INVALID_TDS_RATE",
            Self::PaymentCancelled(_) => "PAYMENT_CANCELLED",
            Self::InvoiceCancelled(_) => "INVOICE_CANCELLED",
            Self::ExceedsUnmatched { .. } => "EXCEEDS_UNMATCHED",
            Self::ExceedsBalanceDue { .. } => "EXCEEDS_BALANCE_DUE",
            Self::ReversalExceedsMatched { .. } => "REVERSAL_EXCEEDS_MATCHED",
            Self::PaymentNotFound(_) => "PAYMENT_NOT_FOUND",
            Self::InvoiceNotFound(_) => "INVOICE_NOT_FOUND",
            Self::AllocationNotFound(_) => "ALLOCATION_NOT_FOUND",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }
}

impl From<AllocationError> for AppError {
    fn from(err: AllocationError) -> Self {
        let message = err.to_string();
        match err.status_code() {
            400 => Self::Validation(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            422 => Self::BusinessRule(message),
            _ => Self::Database(message),
        }
    }
}
