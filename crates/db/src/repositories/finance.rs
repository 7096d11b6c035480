//! Finance repository for invoice/payment matching.
//!
//! Every write runs in one database transaction. Rows are locked with
//! `SELECT ... FOR UPDATE` and the allocation rules are re-checked against
//! the locked values before anything is written. Payments are always locked
//! before invoices.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    ModelTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use tracing::info;
use uuid::Uuid;

use warpline_core::finance::{
    Allocation, AllocationError, AllocationService, Invoice, InvoiceStatus, MatchOutcome, Payment,
    PaymentStatus,
};
use warpline_shared::types::{AllocationId, InvoiceId, PaymentId};

use crate::entities::{invoices, payment_allocations, payments, sea_orm_active_enums};

/// Input for creating an invoice.
#[derive(Debug, Clone)]
pub struct CreateInvoiceInput {
    /// Unique invoice number.
    pub invoice_number: String,
    /// Billed party.
    pub party_name: String,
    /// Amount before tax.
    pub taxable_amount: Decimal,
    /// TDS rate in percent, if the payer withholds tax.
    pub tds_rate: Option<Decimal>,
    /// Invoice total including tax.
    pub total_amount: Decimal,
}

/// Input for recording a payment.
#[derive(Debug, Clone)]
pub struct CreatePaymentInput {
    /// Bank or cheque reference.
    pub reference: String,
    /// Amount received.
    pub amount: Decimal,
}

#[allow(clippy::needless_pass_by_value)]
fn db_err(e: DbErr) -> AllocationError {
    AllocationError::Database(e.to_string())
}

impl From<sea_orm_active_enums::InvoiceStatus> for InvoiceStatus {
    fn from(value: sea_orm_active_enums::InvoiceStatus) -> Self {
        match value {
            sea_orm_active_enums::InvoiceStatus::Open => Self::Open,
            sea_orm_active_enums::InvoiceStatus::PartiallyPaid => Self::PartiallyPaid,
            sea_orm_active_enums::InvoiceStatus::Paid => Self::Paid,
            sea_orm_active_enums::InvoiceStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl From<InvoiceStatus> for sea_orm_active_enums::InvoiceStatus {
    fn from(value: InvoiceStatus) -> Self {
        match value {
            InvoiceStatus::Open => Self::Open,
            InvoiceStatus::PartiallyPaid => Self::PartiallyPaid,
            InvoiceStatus::Paid => Self::Paid,
            InvoiceStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl From<sea_orm_active_enums::PaymentStatus> for PaymentStatus {
    fn from(value: sea_orm_active_enums::PaymentStatus) -> Self {
        match value {
            sea_orm_active_enums::PaymentStatus::Active => Self::Active,
            sea_orm_active_enums::PaymentStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl From<PaymentStatus> for sea_orm_active_enums::PaymentStatus {
    fn from(value: PaymentStatus) -> Self {
        match value {
            PaymentStatus::Active => Self::Active,
            PaymentStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl From<invoices::Model> for Invoice {
    fn from(model: invoices::Model) -> Self {
        Self {
            id: InvoiceId::from_uuid(model.id),
            invoice_number: model.invoice_number,
            party_name: model.party_name,
            taxable_amount: model.taxable_amount,
            tds_rate: model.tds_rate,
            tds_amount: model.tds_amount,
            total_amount: model.total_amount,
            paid_amount: model.paid_amount,
            status: model.status.into(),
        }
    }
}

impl From<payments::Model> for Payment {
    fn from(model: payments::Model) -> Self {
        Self {
            id: PaymentId::from_uuid(model.id),
            reference: model.reference,
            amount: model.amount,
            matched_amount: model.matched_amount,
            status: model.status.into(),
        }
    }
}

impl From<payment_allocations::Model> for Allocation {
    fn from(model: payment_allocations::Model) -> Self {
        Self {
            id: AllocationId::from_uuid(model.id),
            payment_id: PaymentId::from_uuid(model.payment_id),
            invoice_id: InvoiceId::from_uuid(model.invoice_id),
            amount: model.amount,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

async fn lock_payment<C: ConnectionTrait>(
    conn: &C,
    payment_id: PaymentId,
) -> Result<payments::Model, AllocationError> {
    payments::Entity::find_by_id(payment_id.into_inner())
        .lock_exclusive()
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or(AllocationError::PaymentNotFound(payment_id))
}

async fn lock_invoice<C: ConnectionTrait>(
    conn: &C,
    invoice_id: InvoiceId,
) -> Result<invoices::Model, AllocationError> {
    invoices::Entity::find_by_id(invoice_id.into_inner())
        .lock_exclusive()
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or(AllocationError::InvoiceNotFound(invoice_id))
}

async fn save_payment<C: ConnectionTrait>(
    conn: &C,
    model: payments::Model,
    updated: &Payment,
) -> Result<payments::Model, AllocationError> {
    let mut active: payments::ActiveModel = model.into();
    active.matched_amount = Set(updated.matched_amount);
    active.status = Set(updated.status.into());
    active.updated_at = Set(Utc::now().into());
    active.update(conn).await.map_err(db_err)
}

async fn save_invoice<C: ConnectionTrait>(
    conn: &C,
    model: invoices::Model,
    updated: &Invoice,
) -> Result<invoices::Model, AllocationError> {
    let mut active: invoices::ActiveModel = model.into();
    active.paid_amount = Set(updated.paid_amount);
    active.status = Set(updated.status.into());
    active.updated_at = Set(Utc::now().into());
    active.update(conn).await.map_err(db_err)
}

/// Finance repository for invoices, payments and their allocations.
#[derive(Debug, Clone)]
pub struct FinanceRepository {
    db: DatabaseConnection,
}

impl FinanceRepository {
    /// Creates a new finance repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates an open invoice, computing its TDS from the rate.
    ///
    /// # Errors
    ///
    /// Returns an error if the amounts or TDS rate are invalid, the invoice
    /// number is taken, or the insert fails.
    pub async fn create_invoice(&self, input: CreateInvoiceInput) -> Result<Invoice, AllocationError> {
        let tds_amount = AllocationService::invoice_tds(
            input.taxable_amount,
            input.tds_rate,
            input.total_amount,
        )?;

        let existing = invoices::Entity::find()
            .filter(invoices::Column::InvoiceNumber.eq(input.invoice_number.as_str()))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        if existing.is_some() {
            return Err(AllocationError::DuplicateInvoiceNumber(input.invoice_number));
        }

        let now = Utc::now().into();
        let invoice_number = input.invoice_number.clone();
        let model = invoices::ActiveModel {
            id: Set(InvoiceId::new().into_inner()),
            invoice_number: Set(input.invoice_number),
            party_name: Set(input.party_name),
            taxable_amount: Set(input.taxable_amount),
            tds_rate: Set(input.tds_rate),
            tds_amount: Set(tds_amount),
            total_amount: Set(input.total_amount),
            paid_amount: Set(Decimal::ZERO),
            status: Set(sea_orm_active_enums::InvoiceStatus::Open),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await
        .map_err(|e| match e.sql_err() {
            // Lost a race with a concurrent insert of the same number.
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                AllocationError::DuplicateInvoiceNumber(invoice_number)
            }
            _ => db_err(e),
        })?;

        info!(invoice_id = %model.id, %tds_amount, "Invoice created");

        Ok(model.into())
    }

    /// Records an active, unmatched payment.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is not positive, has more than two
    /// decimal places, or the insert fails.
    pub async fn create_payment(&self, input: CreatePaymentInput) -> Result<Payment, AllocationError> {
        AllocationService::validate_amount(input.amount)?;
        let now = Utc::now().into();

        let model = payments::ActiveModel {
            id: Set(PaymentId::new().into_inner()),
            reference: Set(input.reference),
            amount: Set(input.amount),
            matched_amount: Set(Decimal::ZERO),
            status: Set(sea_orm_active_enums::PaymentStatus::Active),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await
        .map_err(db_err)?;

        Ok(model.into())
    }

    /// Finds an invoice by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the invoice does not exist or the query fails.
    pub async fn find_invoice(&self, invoice_id: InvoiceId) -> Result<Invoice, AllocationError> {
        invoices::Entity::find_by_id(invoice_id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(Invoice::from)
            .ok_or(AllocationError::InvoiceNotFound(invoice_id))
    }

    /// Finds a payment by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the payment does not exist or the query fails.
    pub async fn find_payment(&self, payment_id: PaymentId) -> Result<Payment, AllocationError> {
        payments::Entity::find_by_id(payment_id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(Payment::from)
            .ok_or(AllocationError::PaymentNotFound(payment_id))
    }

    /// Allocates `amount` of a payment to an invoice.
    ///
    /// # Errors
    ///
    /// Returns an error if either record is missing, the allocation rules
    /// reject the amount against the locked balances, or the database fails.
    pub async fn match_payment(
        &self,
        payment_id: PaymentId,
        invoice_id: InvoiceId,
        amount: Decimal,
    ) -> Result<Allocation, AllocationError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let payment_model = lock_payment(&txn, payment_id).await?;
        let invoice_model = lock_invoice(&txn, invoice_id).await?;

        let outcome = AllocationService::apply_match(
            &Payment::from(payment_model.clone()),
            &Invoice::from(invoice_model.clone()),
            amount,
        )?;

        save_payment(&txn, payment_model, &outcome.payment).await?;
        save_invoice(&txn, invoice_model, &outcome.invoice).await?;

        let allocation = payment_allocations::ActiveModel {
            id: Set(AllocationId::new().into_inner()),
            payment_id: Set(payment_id.into_inner()),
            invoice_id: Set(invoice_id.into_inner()),
            amount: Set(amount),
            created_at: Set(Utc::now().into()),
        }
        .insert(&txn)
        .await
        .map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;

        info!(
            allocation_id = %allocation.id,
            %payment_id,
            %invoice_id,
            %amount,
            invoice_status = %outcome.invoice.status,
            "Payment matched"
        );

        Ok(allocation.into())
    }

    /// Reverses one allocation and deletes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the allocation or its records are missing, or
    /// the database fails.
    pub async fn unmatch_allocation(
        &self,
        allocation_id: AllocationId,
    ) -> Result<MatchOutcome, AllocationError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let allocation = payment_allocations::Entity::find_by_id(allocation_id.into_inner())
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or(AllocationError::AllocationNotFound(allocation_id))?;

        let payment_model = lock_payment(&txn, PaymentId::from_uuid(allocation.payment_id)).await?;
        let invoice_model = lock_invoice(&txn, InvoiceId::from_uuid(allocation.invoice_id)).await?;

        // Re-read under the locks; a concurrent unmatch may have won.
        let allocation = payment_allocations::Entity::find_by_id(allocation_id.into_inner())
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or(AllocationError::AllocationNotFound(allocation_id))?;

        let outcome = AllocationService::reverse_match(
            &Payment::from(payment_model.clone()),
            &Invoice::from(invoice_model.clone()),
            allocation.amount,
        )?;

        save_payment(&txn, payment_model, &outcome.payment).await?;
        save_invoice(&txn, invoice_model, &outcome.invoice).await?;
        allocation.delete(&txn).await.map_err(db_err)?;

        txn.commit().await.map_err(db_err)?;

        info!(%allocation_id, "Allocation reversed");

        Ok(outcome)
    }

    /// Reverses every allocation of a payment and marks it cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error if the payment is missing or already cancelled, or
    /// the database fails.
    pub async fn cancel_payment(&self, payment_id: PaymentId) -> Result<Payment, AllocationError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let payment_model = lock_payment(&txn, payment_id).await?;
        let mut payment = Payment::from(payment_model.clone());
        if payment.status == PaymentStatus::Cancelled {
            return Err(AllocationError::PaymentCancelled(payment_id));
        }

        let allocations = payment_allocations::Entity::find()
            .filter(payment_allocations::Column::PaymentId.eq(payment_id.into_inner()))
            .order_by_asc(payment_allocations::Column::CreatedAt)
            .lock_exclusive()
            .all(&txn)
            .await
            .map_err(db_err)?;

        let invoice_ids: BTreeSet<Uuid> = allocations.iter().map(|a| a.invoice_id).collect();
        let mut invoices: BTreeMap<Uuid, (invoices::Model, Invoice)> = BTreeMap::new();
        for id in invoice_ids {
            let model = lock_invoice(&txn, InvoiceId::from_uuid(id)).await?;
            let invoice = Invoice::from(model.clone());
            invoices.insert(id, (model, invoice));
        }

        let count = allocations.len();
        for allocation in allocations {
            let Some((_, invoice)) = invoices.get_mut(&allocation.invoice_id) else {
                return Err(AllocationError::InvoiceNotFound(InvoiceId::from_uuid(
                    allocation.invoice_id,
                )));
            };
            let outcome = AllocationService::reverse_match(&payment, invoice, allocation.amount)?;
            payment = outcome.payment;
            *invoice = outcome.invoice;
            allocation.delete(&txn).await.map_err(db_err)?;
        }

        for (model, invoice) in invoices.into_values() {
            save_invoice(&txn, model, &invoice).await?;
        }

        payment.status = PaymentStatus::Cancelled;
        let saved = save_payment(&txn, payment_model, &payment).await?;

        txn.commit().await.map_err(db_err)?;

        info!(%payment_id, reversed = count, "Payment cancelled");

        Ok(saved.into())
    }

    /// Reverses every allocation on an invoice and marks it cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error if the invoice is missing or already cancelled, or
    /// the database fails.
    pub async fn cancel_invoice(&self, invoice_id: InvoiceId) -> Result<Invoice, AllocationError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        // Lock the paying payments first to keep the payment-then-invoice order.
        let payment_ids: BTreeSet<Uuid> = payment_allocations::Entity::find()
            .filter(payment_allocations::Column::InvoiceId.eq(invoice_id.into_inner()))
            .all(&txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|a| a.payment_id)
            .collect();

        let mut payments: BTreeMap<Uuid, (payments::Model, Payment)> = BTreeMap::new();
        for id in payment_ids {
            let model = lock_payment(&txn, PaymentId::from_uuid(id)).await?;
            let payment = Payment::from(model.clone());
            payments.insert(id, (model, payment));
        }

        let invoice_model = lock_invoice(&txn, invoice_id).await?;
        let mut invoice = Invoice::from(invoice_model.clone());
        if invoice.status == InvoiceStatus::Cancelled {
            return Err(AllocationError::InvoiceCancelled(invoice_id));
        }

        let allocations = payment_allocations::Entity::find()
            .filter(payment_allocations::Column::InvoiceId.eq(invoice_id.into_inner()))
            .order_by_asc(payment_allocations::Column::CreatedAt)
            .lock_exclusive()
            .all(&txn)
            .await
            .map_err(db_err)?;

        let count = allocations.len();
        for allocation in allocations {
            if !payments.contains_key(&allocation.payment_id) {
                let model = lock_payment(&txn, PaymentId::from_uuid(allocation.payment_id)).await?;
                let payment = Payment::from(model.clone());
                payments.insert(allocation.payment_id, (model, payment));
            }
            let Some((_, payment)) = payments.get_mut(&allocation.payment_id) else {
                return Err(AllocationError::PaymentNotFound(PaymentId::from_uuid(
                    allocation.payment_id,
                )));
            };
            let outcome = AllocationService::reverse_match(payment, &invoice, allocation.amount)?;
            *payment = outcome.payment;
            invoice = outcome.invoice;
            allocation.delete(&txn).await.map_err(db_err)?;
        }

        for (model, payment) in payments.into_values() {
            save_payment(&txn, model, &payment).await?;
        }

        invoice.status = InvoiceStatus::Cancelled;
        let saved = save_invoice(&txn, invoice_model, &invoice).await?;

        txn.commit().await.map_err(db_err)?;

        info!(%invoice_id, reversed = count, "Invoice cancelled");

        Ok(saved.into())
    }

    /// Allocations against an invoice, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the invoice does not exist or the query fails.
    pub async fn list_invoice_allocations(
        &self,
        invoice_id: InvoiceId,
    ) -> Result<Vec<Allocation>, AllocationError> {
        let invoice = invoices::Entity::find_by_id(invoice_id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(AllocationError::InvoiceNotFound(invoice_id))?;

        let allocations = invoice
            .find_related(payment_allocations::Entity)
            .order_by_asc(payment_allocations::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(allocations.into_iter().map(Allocation::from).collect())
    }

    /// Allocations from a payment, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the payment does not exist or the query fails.
    pub async fn list_payment_allocations(
        &self,
        payment_id: PaymentId,
    ) -> Result<Vec<Allocation>, AllocationError> {
        let payment = payments::Entity::find_by_id(payment_id.into_inner())
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(AllocationError::PaymentNotFound(payment_id))?;

        let allocations = payment
            .find_related(payment_allocations::Entity)
            .order_by_asc(payment_allocations::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        Ok(allocations.into_iter().map(Allocation::from).collect())
    }
}

#[cfg(test)]
#[path = "finance_tests.rs"]
mod tests;
