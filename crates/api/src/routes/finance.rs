//! Invoice and payment matching routes.
//!
//! Amounts are sent and returned as decimal strings.

use axum::{
    Json, Router,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use warpline_core::finance::AllocationService;
use warpline_db::FinanceRepository;
use warpline_db::repositories::{CreateInvoiceInput, CreatePaymentInput};
use warpline_shared::types::{AllocationId, InvoiceId, PaymentId};

use crate::AppState;
use crate::error::{error_response, validation_error};

// ============================================================================
// Request Types
// ============================================================================

/// Request body for allocating part of a payment to an invoice.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchPaymentRequest {
    /// Payment to draw from.
    pub payment_id: Uuid,
    /// Invoice to settle.
    pub invoice_id: Uuid,
    /// Amount to allocate.
    pub amount: Decimal,
}

/// Request body for creating an invoice.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoiceRequest {
    /// Unique invoice number.
    pub invoice_number: String,
    /// Billed party.
    pub party_name: String,
    /// Amount before tax.
    pub taxable_amount: Decimal,
    /// TDS rate in percent.
    pub tds_rate: Option<Decimal>,
    /// Invoice total including tax.
    pub total_amount: Decimal,
}

/// Request body for recording a payment.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    /// Bank or cheque reference.
    pub reference: String,
    /// Amount received.
    pub amount: Decimal,
}

/// Creates finance routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/finance/invoices", post(create_invoice))
        .route("/finance/invoices/{invoice_id}", get(get_invoice))
        .route(
            "/finance/invoices/{invoice_id}/allocations",
            get(list_invoice_allocations),
        )
        .route("/finance/invoices/{invoice_id}/cancel", post(cancel_invoice))
        .route("/finance/payments", post(create_payment))
        .route("/finance/payments/{payment_id}", get(get_payment))
        .route(
            "/finance/payments/{payment_id}/allocations",
            get(list_payment_allocations),
        )
        .route("/finance/payments/{payment_id}/cancel", post(cancel_payment))
        .route("/finance/allocations", post(match_payment))
        .route("/finance/allocations/{allocation_id}", delete(unmatch_allocation))
}

fn repository(state: &AppState) -> FinanceRepository {
    FinanceRepository::new((*state.db).clone())
}

fn path_id(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, Response> {
    path.map(|Path(id)| id)
        .map_err(|rejection| validation_error(rejection.body_text()))
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    body.map(|Json(value)| value)
        .map_err(|rejection| validation_error(rejection.body_text()))
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/finance/invoices` - Create an open invoice.
async fn create_invoice(
    State(state): State<AppState>,
    body: Result<Json<CreateInvoiceRequest>, JsonRejection>,
) -> Response {
    let payload = match json_body(body) {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    if payload.invoice_number.trim().is_empty() {
        return validation_error("invoiceNumber must not be empty");
    }

    let input = CreateInvoiceInput {
        invoice_number: payload.invoice_number,
        party_name: payload.party_name,
        taxable_amount: payload.taxable_amount,
        tds_rate: payload.tds_rate,
        total_amount: payload.total_amount,
    };

    match repository(&state).create_invoice(input).await {
        Ok(invoice) => (StatusCode::CREATED, Json(invoice)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET `/finance/invoices/{invoice_id}` - Get an invoice with its balances.
async fn get_invoice(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let invoice_id = match path_id(path) {
        Ok(id) => InvoiceId::from_uuid(id),
        Err(response) => return response,
    };

    match repository(&state).find_invoice(invoice_id).await {
        Ok(invoice) => (StatusCode::OK, Json(invoice)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET `/finance/invoices/{invoice_id}/allocations` - Allocations against an invoice.
async fn list_invoice_allocations(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let invoice_id = match path_id(path) {
        Ok(id) => InvoiceId::from_uuid(id),
        Err(response) => return response,
    };

    match repository(&state).list_invoice_allocations(invoice_id).await {
        Ok(allocations) => {
            (StatusCode::OK, Json(json!({ "allocations": allocations }))).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// POST `/finance/invoices/{invoice_id}/cancel` - Reverse all allocations and cancel.
async fn cancel_invoice(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let invoice_id = match path_id(path) {
        Ok(id) => InvoiceId::from_uuid(id),
        Err(response) => return response,
    };

    match repository(&state).cancel_invoice(invoice_id).await {
        Ok(invoice) => (StatusCode::OK, Json(invoice)).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST `/finance/payments` - Record a payment.
async fn create_payment(
    State(state): State<AppState>,
    body: Result<Json<CreatePaymentRequest>, JsonRejection>,
) -> Response {
    let payload = match json_body(body) {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    if payload.reference.trim().is_empty() {
        return validation_error("reference must not be empty");
    }

    let input = CreatePaymentInput {
        reference: payload.reference,
        amount: payload.amount,
    };

    match repository(&state).create_payment(input).await {
        Ok(payment) => (StatusCode::CREATED, Json(payment)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET `/finance/payments/{payment_id}` - Get a payment with its matched amount.
async fn get_payment(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let payment_id = match path_id(path) {
        Ok(id) => PaymentId::from_uuid(id),
        Err(response) => return response,
    };

    match repository(&state).find_payment(payment_id).await {
        Ok(payment) => (StatusCode::OK, Json(payment)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET `/finance/payments/{payment_id}/allocations` - Allocations from a payment.
async fn list_payment_allocations(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let payment_id = match path_id(path) {
        Ok(id) => PaymentId::from_uuid(id),
        Err(response) => return response,
    };

    match repository(&state).list_payment_allocations(payment_id).await {
        Ok(allocations) => {
            (StatusCode::OK, Json(json!({ "allocations": allocations }))).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// POST `/finance/payments/{payment_id}/cancel` - Reverse all allocations and cancel.
async fn cancel_payment(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let payment_id = match path_id(path) {
        Ok(id) => PaymentId::from_uuid(id),
        Err(response) => return response,
    };

    match repository(&state).cancel_payment(payment_id).await {
        Ok(payment) => (StatusCode::OK, Json(payment)).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST `/finance/allocations` - Allocate part of a payment to an invoice.
async fn match_payment(
    State(state): State<AppState>,
    body: Result<Json<MatchPaymentRequest>, JsonRejection>,
) -> Response {
    let payload = match json_body(body) {
        Ok(payload) => payload,
        Err(response) => return response,
    };
    if let Err(e) = AllocationService::validate_amount(payload.amount) {
        return error_response(e);
    }

    match repository(&state)
        .match_payment(
            PaymentId::from_uuid(payload.payment_id),
            InvoiceId::from_uuid(payload.invoice_id),
            payload.amount,
        )
        .await
    {
        Ok(allocation) => (StatusCode::CREATED, Json(allocation)).into_response(),
        Err(e) => error_response(e),
    }
}

/// DELETE `/finance/allocations/{allocation_id}` - Reverse an allocation.
async fn unmatch_allocation(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let allocation_id = match path_id(path) {
        Ok(id) => AllocationId::from_uuid(id),
        Err(response) => return response,
    };

    match repository(&state).unmatch_allocation(allocation_id).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}
