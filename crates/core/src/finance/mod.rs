//! Invoice and payment matching.
//!
//! Payments are allocated against invoices in partial amounts. Every rule
//! here is pure: the db crate loads and locks rows, asks
//! [`AllocationService`] for the new balances, then writes them back.
//!
//! # Modules
//!
//! - `types` - Invoice, payment and allocation records with their statuses
//! - `error` - Allocation rule violations
//! - `allocation` - TDS calculation, match validation, apply and reverse

pub mod allocation;
pub mod error;
pub mod types;

#[cfg(test)]
mod allocation_props;

pub use allocation::{AllocationService, MatchOutcome};
pub use error::AllocationError;
pub use types::{Allocation, Invoice, InvoiceStatus, Payment, PaymentStatus};
