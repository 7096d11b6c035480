//! Allocation rules.

use rust_decimal::{Decimal, RoundingStrategy};

use super::error::AllocationError;
use super::types::{Invoice, InvoiceStatus, Payment, PaymentStatus};

/// Decimal places kept on money amounts.
pub const MONEY_SCALE: u32 = 2;

/// Balances of a payment and an invoice after a match or its reversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    /// Payment with its new matched amount.
    pub payment: Payment,
    /// Invoice with its new paid amount and status.
    pub invoice: Invoice,
}

/// Stateless allocation rules.
pub struct AllocationService;

impl AllocationService {
    /// Checks that `amount` is positive and fits the stored money scale.
    ///
    /// Trailing zeros do not count towards the scale.
    pub fn validate_amount(amount: Decimal) -> Result<(), AllocationError> {
        if amount.normalize().scale() > MONEY_SCALE {
            return Err(AllocationError::ExcessPrecision(amount));
        }
        if amount <= Decimal::ZERO {
            return Err(AllocationError::NonPositiveAmount(amount));
        }
        Ok(())
    }

    /// Validates new invoice amounts and returns the TDS to record.
    ///
    /// The taxable amount may be zero; the total less TDS must leave
    /// something payable.
    pub fn invoice_tds(
        taxable: Decimal,
        tds_rate: Option<Decimal>,
        total: Decimal,
    ) -> Result<Decimal, AllocationError> {
        for amount in [taxable, total] {
            if amount.normalize().scale() > MONEY_SCALE {
                return Err(AllocationError::ExcessPrecision(amount));
            }
        }
        if taxable < Decimal::ZERO {
            return Err(AllocationError::InvalidInvoiceAmounts(format!(
                "taxable amount must not be negative, got {taxable}"
            )));
        }

        let tds = match tds_rate {
            Some(rate) if rate.normalize().scale() > MONEY_SCALE => {
                return Err(AllocationError::InvalidTdsRate(rate));
            }
            Some(rate) => Self::compute_tds(taxable, rate)?,
            None => Decimal::ZERO,
        };

        if total - tds <= Decimal::ZERO {
            return Err(AllocationError::InvalidInvoiceAmounts(format!(
                "total {total} must exceed TDS {tds}"
            )));
        }
        Ok(tds)
    }

    /// Tax deducted at source on `taxable` at `rate` percent.
    ///
    /// Rounded to paise with banker's rounding.
    pub fn compute_tds(taxable: Decimal, rate: Decimal) -> Result<Decimal, AllocationError> {
        if rate < Decimal::ZERO || rate > Decimal::ONE_HUNDRED {
            return Err(AllocationError::InvalidTdsRate(rate));
        }

        Ok((taxable * rate / Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointNearestEven))
    }

    /// Status an open invoice should carry for its current paid amount.
    #[must_use]
    pub fn invoice_status(invoice: &Invoice) -> InvoiceStatus {
        if invoice.status == InvoiceStatus::Cancelled {
            InvoiceStatus::Cancelled
        } else if invoice.balance_due() <= Decimal::ZERO {
            InvoiceStatus::Paid
        } else if invoice.paid_amount > Decimal::ZERO {
            InvoiceStatus::PartiallyPaid
        } else {
            InvoiceStatus::Open
        }
    }

    /// Checks that `amount` of `payment` may be allocated to `invoice`.
    pub fn validate_match(
        payment: &Payment,
        invoice: &Invoice,
        amount: Decimal,
    ) -> Result<(), AllocationError> {
        Self::validate_amount(amount)?;
        if payment.status == PaymentStatus::Cancelled {
            return Err(AllocationError::PaymentCancelled(payment.id));
        }
        if invoice.status == InvoiceStatus::Cancelled {
            return Err(AllocationError::InvoiceCancelled(invoice.id));
        }

        let unmatched = payment.unmatched();
        if amount > unmatched {
            return Err(AllocationError::ExceedsUnmatched { amount, unmatched });
        }

        let balance_due = invoice.balance_due();
        if amount > balance_due {
            return Err(AllocationError::ExceedsBalanceDue {
                amount,
                balance_due,
            });
        }

        Ok(())
    }

    /// Allocates `amount` of `payment` to `invoice`.
    pub fn apply_match(
        payment: &Payment,
        invoice: &Invoice,
        amount: Decimal,
    ) -> Result<MatchOutcome, AllocationError> {
        Self::validate_match(payment, invoice, amount)?;

        let payment = Payment {
            matched_amount: payment.matched_amount + amount,
            ..payment.clone()
        };
        let mut invoice = Invoice {
            paid_amount: invoice.paid_amount + amount,
            ..invoice.clone()
        };
        invoice.status = Self::invoice_status(&invoice);

        Ok(MatchOutcome { payment, invoice })
    }

    /// Undoes an allocation of `amount` between `payment` and `invoice`.
    ///
    /// Statuses of cancelled records are left alone; the caller cancels
    /// after reversing.
    pub fn reverse_match(
        payment: &Payment,
        invoice: &Invoice,
        amount: Decimal,
    ) -> Result<MatchOutcome, AllocationError> {
        if amount <= Decimal::ZERO {
            return Err(AllocationError::NonPositiveAmount(amount));
        }

        let matched = payment.matched_amount.min(invoice.paid_amount);
        if amount > matched {
            return Err(AllocationError::ReversalExceedsMatched { amount, matched });
        }

        let payment = Payment {
            matched_amount: payment.matched_amount - amount,
            ..payment.clone()
        };
        let mut invoice = Invoice {
            paid_amount: invoice.paid_amount - amount,
            ..invoice.clone()
        };
        invoice.status = Self::invoice_status(&invoice);

        Ok(MatchOutcome { payment, invoice })
    }
}
