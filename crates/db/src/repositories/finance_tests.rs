use chrono::Utc;
use rust_decimal_macros::dec;
use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

use super::*;

fn payment_model(id: Uuid, amount: Decimal, matched: Decimal) -> payments::Model {
    payments::Model {
        id,
        reference: "NEFT-20250411-0091".to_string(),
        amount,
        matched_amount: matched,
        status: sea_orm_active_enums::PaymentStatus::Active,
        created_at: Utc::now().into(),
        updated_at: Utc::now().into(),
    }
}

fn invoice_model(id: Uuid, total: Decimal, tds: Decimal, paid: Decimal) -> invoices::Model {
    invoices::Model {
        id,
        invoice_number: "WL/25-26/0042".to_string(),
        party_name: "Kaveri Retail LLP".to_string(),
        taxable_amount: total,
        tds_rate: None,
        tds_amount: tds,
        total_amount: total,
        paid_amount: paid,
        status: sea_orm_active_enums::InvoiceStatus::Open,
        created_at: Utc::now().into(),
        updated_at: Utc::now().into(),
    }
}

fn allocation_model(id: Uuid, payment_id: Uuid, invoice_id: Uuid, amount: Decimal) -> payment_allocations::Model {
    payment_allocations::Model {
        id,
        payment_id,
        invoice_id,
        amount,
        created_at: Utc::now().into(),
    }
}

#[tokio::test]
async fn test_match_payment_writes_new_balances() {
    let payment_id = Uuid::now_v7();
    let invoice_id = Uuid::now_v7();
    let allocation_id = Uuid::now_v7();

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![payment_model(payment_id, dec!(1000), dec!(0))]])
        .append_query_results([vec![invoice_model(invoice_id, dec!(1180), dec!(20), dec!(0))]])
        .append_query_results([vec![payment_model(payment_id, dec!(1000), dec!(400))]])
        .append_query_results([vec![invoice_model(invoice_id, dec!(1180), dec!(20), dec!(400))]])
        .append_query_results([vec![allocation_model(allocation_id, payment_id, invoice_id, dec!(400))]])
        .into_connection();

    let allocation = FinanceRepository::new(db)
        .match_payment(
            PaymentId::from_uuid(payment_id),
            InvoiceId::from_uuid(invoice_id),
            dec!(400),
        )
        .await
        .unwrap();

    assert_eq!(allocation.id, AllocationId::from_uuid(allocation_id));
    assert_eq!(allocation.amount, dec!(400));
    assert_eq!(allocation.payment_id, PaymentId::from_uuid(payment_id));
}

#[tokio::test]
async fn test_match_payment_revalidates_locked_balances() {
    let payment_id = Uuid::now_v7();
    let invoice_id = Uuid::now_v7();

    // Another match already brought the invoice down to 60 due.
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![payment_model(payment_id, dec!(1000), dec!(0))]])
        .append_query_results([vec![invoice_model(invoice_id, dec!(1000), dec!(0), dec!(940))]])
        .into_connection();

    let err = FinanceRepository::new(db)
        .match_payment(
            PaymentId::from_uuid(payment_id),
            InvoiceId::from_uuid(invoice_id),
            dec!(100),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AllocationError::ExceedsBalanceDue { balance_due, .. } if balance_due == dec!(60)
    ));
}

#[tokio::test]
async fn test_match_payment_unknown_payment() {
    let payment_id = Uuid::now_v7();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<payments::Model>::new()])
        .into_connection();

    let err = FinanceRepository::new(db)
        .match_payment(PaymentId::from_uuid(payment_id), InvoiceId::new(), dec!(1))
        .await
        .unwrap_err();

    assert!(matches!(err, AllocationError::PaymentNotFound(id) if id.into_inner() == payment_id));
}

#[tokio::test]
async fn test_unmatch_allocation_restores_balances() {
    let payment_id = Uuid::now_v7();
    let invoice_id = Uuid::now_v7();
    let allocation_id = Uuid::now_v7();
    let allocation = allocation_model(allocation_id, payment_id, invoice_id, dec!(250));

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![allocation.clone()]])
        .append_query_results([vec![payment_model(payment_id, dec!(500), dec!(250))]])
        .append_query_results([vec![invoice_model(invoice_id, dec!(250), dec!(0), dec!(250))]])
        .append_query_results([vec![allocation]])
        .append_query_results([vec![payment_model(payment_id, dec!(500), dec!(0))]])
        .append_query_results([vec![invoice_model(invoice_id, dec!(250), dec!(0), dec!(0))]])
        .append_exec_results([MockExecResult {
            last_insert_id: 0,
            rows_affected: 1,
        }])
        .into_connection();

    let outcome = FinanceRepository::new(db)
        .unmatch_allocation(AllocationId::from_uuid(allocation_id))
        .await
        .unwrap();

    assert_eq!(outcome.payment.matched_amount, dec!(0));
    assert_eq!(outcome.invoice.paid_amount, dec!(0));
    assert_eq!(outcome.invoice.status, InvoiceStatus::Open);
}

#[tokio::test]
async fn test_cancel_cancelled_payment_is_rejected() {
    let payment_id = Uuid::now_v7();
    let mut model = payment_model(payment_id, dec!(500), dec!(0));
    model.status = sea_orm_active_enums::PaymentStatus::Cancelled;

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![model]])
        .into_connection();

    let err = FinanceRepository::new(db)
        .cancel_payment(PaymentId::from_uuid(payment_id))
        .await
        .unwrap_err();

    assert!(matches!(err, AllocationError::PaymentCancelled(_)));
}

#[tokio::test]
async fn test_create_invoice_rejects_bad_tds_rate_before_writing() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

    let err = FinanceRepository::new(db)
        .create_invoice(CreateInvoiceInput {
            invoice_number: "WL/25-26/0100".to_string(),
            party_name: "Kaveri Retail LLP".to_string(),
            taxable_amount: dec!(1000),
            tds_rate: Some(dec!(120)),
            total_amount: dec!(1180),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AllocationError::InvalidTdsRate(_)));
}

#[tokio::test]
async fn test_list_invoice_allocations_maps_rows() {
    let invoice_id = Uuid::now_v7();
    let first = allocation_model(Uuid::now_v7(), Uuid::now_v7(), invoice_id, dec!(100));
    let second = allocation_model(Uuid::now_v7(), Uuid::now_v7(), invoice_id, dec!(50.50));

    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![invoice_model(invoice_id, dec!(500), dec!(0), dec!(150.50))]])
        .append_query_results([vec![first.clone(), second.clone()]])
        .into_connection();

    let allocations = FinanceRepository::new(db)
        .list_invoice_allocations(InvoiceId::from_uuid(invoice_id))
        .await
        .unwrap();

    assert_eq!(allocations.len(), 2);
    assert_eq!(allocations[0].id.into_inner(), first.id);
    assert_eq!(allocations[1].amount, dec!(50.50));
    assert!(allocations.iter().all(|a| a.invoice_id.into_inner() == invoice_id));
}

#[tokio::test]
async fn test_list_allocations_of_unknown_invoice() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<invoices::Model>::new()])
        .into_connection();

    let err = FinanceRepository::new(db)
        .list_invoice_allocations(InvoiceId::new())
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), 404);
}

fn invoice_input(number: &str, taxable: Decimal, total: Decimal) -> CreateInvoiceInput {
    CreateInvoiceInput {
        invoice_number: number.to_string(),
        party_name: "Kaveri Retail LLP".to_string(),
        taxable_amount: taxable,
        tds_rate: None,
        total_amount: total,
    }
}

#[tokio::test]
async fn test_create_invoice_rejects_taken_number() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![invoice_model(Uuid::now_v7(), dec!(1180), dec!(0), dec!(0))]])
        .into_connection();

    let err = FinanceRepository::new(db)
        .create_invoice(invoice_input("WL/25-26/0042", dec!(1000), dec!(1180)))
        .await
        .unwrap_err();

    assert!(matches!(err, AllocationError::DuplicateInvoiceNumber(ref n) if n == "WL/25-26/0042"));
    assert_eq!(err.status_code(), 409);
}

#[tokio::test]
async fn test_create_invoice_inserts_when_number_is_free() {
    let invoice_id = Uuid::now_v7();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<invoices::Model>::new()])
        .append_query_results([vec![invoice_model(invoice_id, dec!(1180), dec!(0), dec!(0))]])
        .into_connection();

    let invoice = FinanceRepository::new(db)
        .create_invoice(invoice_input("WL/25-26/0042", dec!(1180), dec!(1180)))
        .await
        .unwrap();

    assert_eq!(invoice.id, InvoiceId::from_uuid(invoice_id));
    assert_eq!(invoice.status, InvoiceStatus::Open);
}

#[tokio::test]
async fn test_create_invoice_rejects_bad_amounts_before_writing() {
    let repo = FinanceRepository::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

    let negative = repo
        .create_invoice(invoice_input("WL/25-26/0101", dec!(-1), dec!(100)))
        .await
        .unwrap_err();
    assert!(matches!(negative, AllocationError::InvalidInvoiceAmounts(_)));

    let precise = repo
        .create_invoice(invoice_input("WL/25-26/0102", dec!(100), dec!(118.005)))
        .await
        .unwrap_err();
    assert!(matches!(precise, AllocationError::ExcessPrecision(_)));
}

#[tokio::test]
async fn test_create_payment_rejects_sub_paisa_amount() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

    let err = FinanceRepository::new(db)
        .create_payment(CreatePaymentInput {
            reference: "NEFT-20250411-0092".to_string(),
            amount: dec!(0.004),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AllocationError::ExcessPrecision(_)));
    assert_eq!(err.status_code(), 400);
}
