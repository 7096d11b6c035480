//! Finance domain records.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use warpline_shared::types::{AllocationId, InvoiceId, PaymentId};

/// Invoice lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Nothing paid yet.
    Open,
    /// Some, but not all, of the payable amount has been matched.
    PartiallyPaid,
    /// Fully matched.
    Paid,
    /// Withdrawn; accepts no further matches.
    Cancelled,
}

impl InvoiceStatus {
    /// Database and wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::PartiallyPaid => "partially_paid",
            Self::Paid => "paid",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Can be matched.
    Active,
    /// Withdrawn; all of its allocations have been reversed.
    Cancelled,
}

impl PaymentStatus {
    /// Database and wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A receivable invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    /// Invoice identifier.
    pub id: InvoiceId,
    /// Human-facing invoice number.
    pub invoice_number: String,
    /// Billed party.
    pub party_name: String,
    /// Amount before tax.
    pub taxable_amount: Decimal,
    /// Tax deducted at source, in percent.
    pub tds_rate: Option<Decimal>,
    /// Tax withheld by the payer.
    pub tds_amount: Decimal,
    /// Invoice total including tax.
    pub total_amount: Decimal,
    /// Sum of live allocations against this invoice.
    pub paid_amount: Decimal,
    /// Lifecycle status.
    pub status: InvoiceStatus,
}

impl Invoice {
    /// Amount the party actually owes once TDS is withheld.
    #[must_use]
    pub fn payable(&self) -> Decimal {
        self.total_amount - self.tds_amount
    }

    /// Payable amount not yet covered by allocations.
    #[must_use]
    pub fn balance_due(&self) -> Decimal {
        self.payable() - self.paid_amount
    }
}

/// A received payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    /// Payment identifier.
    pub id: PaymentId,
    /// Bank or cheque reference.
    pub reference: String,
    /// Amount received.
    pub amount: Decimal,
    /// Sum of live allocations from this payment.
    pub matched_amount: Decimal,
    /// Lifecycle status.
    pub status: PaymentStatus,
}

impl Payment {
    /// Part of the payment not yet allocated to any invoice.
    #[must_use]
    pub fn unmatched(&self) -> Decimal {
        self.amount - self.matched_amount
    }
}

/// A portion of a payment applied to one invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    /// Allocation identifier.
    pub id: AllocationId,
    /// Source payment.
    pub payment_id: PaymentId,
    /// Target invoice.
    pub invoice_id: InvoiceId,
    /// Allocated amount.
    pub amount: Decimal,
    /// When the allocation was made.
    pub created_at: DateTime<Utc>,
}
