//! Property-based tests for AllocationService.

use proptest::prelude::*;
use rust_decimal::Decimal;
use warpline_shared::types::{InvoiceId, PaymentId};

use crate::finance::allocation::AllocationService;
use crate::finance::types::{Invoice, InvoiceStatus, Payment, PaymentStatus};

/// Strategy for positive money amounts with two decimal places.
fn arb_amount() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|n| Decimal::new(n, 2))
}

/// Strategy for an open invoice and an active payment, each possibly partly matched.
fn arb_pair() -> impl Strategy<Value = (Payment, Invoice)> {
    (arb_amount(), 0u32..=100, arb_amount(), 0u32..=100).prop_map(
        |(total, paid_pct, received, matched_pct)| {
            let paid = (total * Decimal::from(paid_pct) / Decimal::ONE_HUNDRED).round_dp(2);
            let matched = (received * Decimal::from(matched_pct) / Decimal::ONE_HUNDRED).round_dp(2);

            let mut invoice = Invoice {
                id: InvoiceId::new(),
                invoice_number: "INV-PROP".to_string(),
                party_name: "Prop Party".to_string(),
                taxable_amount: total,
                tds_rate: None,
                tds_amount: Decimal::ZERO,
                total_amount: total,
                paid_amount: paid,
                status: InvoiceStatus::Open,
            };
            invoice.status = AllocationService::invoice_status(&invoice);

            let payment = Payment {
                id: PaymentId::new(),
                reference: "UTR-PROP".to_string(),
                amount: received,
                matched_amount: matched,
                status: PaymentStatus::Active,
            };

            (payment, invoice)
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// A successful match never overdraws the payment or overpays the invoice.
    #[test]
    fn prop_match_stays_within_balances((payment, invoice) in arb_pair(), amount in arb_amount()) {
        match AllocationService::apply_match(&payment, &invoice, amount) {
            Ok(outcome) => {
                prop_assert!(outcome.payment.unmatched() >= Decimal::ZERO);
                prop_assert!(outcome.invoice.balance_due() >= Decimal::ZERO);
                prop_assert_eq!(outcome.payment.matched_amount - payment.matched_amount, amount);
                prop_assert_eq!(outcome.invoice.paid_amount - invoice.paid_amount, amount);
            }
            Err(_) => {
                prop_assert!(amount > payment.unmatched() || amount > invoice.balance_due());
            }
        }
    }

    /// Reversing a match restores both balances and the invoice status.
    #[test]
    fn prop_reverse_restores_balances((payment, invoice) in arb_pair(), amount in arb_amount()) {
        let amount = amount.min(payment.unmatched()).min(invoice.balance_due());
        prop_assume!(amount > Decimal::ZERO);

        let matched = AllocationService::apply_match(&payment, &invoice, amount).unwrap();
        let reversed =
            AllocationService::reverse_match(&matched.payment, &matched.invoice, amount).unwrap();

        prop_assert_eq!(reversed.payment, payment);
        prop_assert_eq!(reversed.invoice, invoice);
    }

    /// TDS is never negative, never above the taxable amount and has two decimals.
    #[test]
    fn prop_tds_is_bounded(taxable in arb_amount(), rate_bp in 0u32..=10_000) {
        let rate = Decimal::new(i64::from(rate_bp), 2);
        let tds = AllocationService::compute_tds(taxable, rate).unwrap();

        prop_assert!(tds >= Decimal::ZERO);
        prop_assert!(tds <= taxable);
        prop_assert!(tds.scale() <= 2);
    }
}
