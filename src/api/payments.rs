use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::model::engineer_transaction::EngineerTransaction;
use crate::model::payment::{PaymentChannel, PaymentEntry, PaymentMode};
use crate::settlement::{
    Allocation, OperationDescriptor, PaymentMetadata, SiteBalances, WeekBalance, allocate,
    cancel_payment as cancel_descriptors, group_by_week, record_payment as record_descriptors,
};
use crate::utils::{balance_cache, db_utils::execute_batch};

#[derive(Deserialize, ToSchema)]
pub struct PreviewRequest {
    #[schema(example = "1500")]
    pub amount: Decimal,
    /// Pay one laborer instead of the whole site contract
    #[schema(example = 301)]
    pub laborer_id: Option<u64>,
}

#[derive(Deserialize, ToSchema)]
pub struct RecordPaymentRequest {
    #[schema(example = "1500")]
    pub amount: Decimal,
    #[schema(example = 301)]
    pub laborer_id: Option<u64>,
    pub channel: PaymentChannel,
    pub mode: PaymentMode,
    /// Defaults to today
    #[schema(example = "2026-01-20", format = "date", value_type = String)]
    pub payment_date: Option<NaiveDate>,
    #[schema(example = 4)]
    pub engineer_id: Option<u64>,
    pub engineer_transaction_id: Option<u64>,
    pub subcontract_id: Option<u64>,
    #[schema(example = "https://files.example/receipts/1500.jpg")]
    pub proof_url: Option<String>,
    pub notes: Option<String>,
    /// Idempotency key; resubmitting the same reference records nothing new
    pub reference: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct RecordPaymentResponse {
    pub reference: String,
    pub allocation: Allocation,
    #[schema(value_type = Vec<Object>)]
    pub operations: Vec<OperationDescriptor>,
}

/// Oldest-first allocation of `amount` against what the site (or laborer) owes.
fn allocation_for(
    balances: &SiteBalances,
    laborer_id: Option<u64>,
    amount: Decimal,
) -> Result<Allocation, ApiError> {
    let allocation = match laborer_id {
        Some(id) => {
            let weeks: Vec<WeekBalance> = balances
                .weeks
                .iter()
                .filter(|w| w.laborer_id == id)
                .cloned()
                .collect();
            allocate(amount, &weeks)?
        }
        None => allocate(amount, &group_by_week(&balances.weeks))?,
    };
    Ok(allocation)
}

/// Balances only see payments dated up to today, so a later date would
/// settle weeks that every report still shows as open.
fn payment_date(requested: Option<NaiveDate>, today: NaiveDate) -> Result<NaiveDate, ApiError> {
    match requested {
        Some(date) if date > today => Err(ApiError::BadRequest(format!(
            "Payment date {date} is in the future"
        ))),
        Some(date) => Ok(date),
        None => Ok(today),
    }
}

/// Preview how a payment would be spread over open weeks
#[utoipa::path(
    post,
    path = "/api/v1/sites/{site_id}/payments/preview",
    params(("site_id" = u64, Path, description = "Site ID")),
    request_body = PreviewRequest,
    responses(
        (status = 200, description = "Allocation preview", body = Allocation),
        (status = 400, description = "Negative amount", body = Object, example = json!({
            "message": "Allocation amount cannot be negative (got -5)"
        })),
        (status = 500, description = "Internal server error")
    ),
    tag = "Payments"
)]
pub async fn preview_payment(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<PreviewRequest>,
) -> Result<HttpResponse, ApiError> {
    let site_id = path.into_inner();
    let today = chrono::Local::now().date_naive();

    let balances = balance_cache::site_balances(pool.get_ref(), site_id, today).await?;
    let allocation = allocation_for(&balances, payload.laborer_id, payload.amount)?;

    Ok(HttpResponse::Ok().json(allocation))
}

/// Record a payment and settle attendance oldest week first
#[utoipa::path(
    post,
    path = "/api/v1/sites/{site_id}/payments",
    params(("site_id" = u64, Path, description = "Site ID")),
    request_body = RecordPaymentRequest,
    responses(
        (status = 201, description = "Payment recorded", body = RecordPaymentResponse),
        (status = 400, description = "Validation failed or payment dated in the future", body = Object, example = json!({
            "message": "An engineer must be selected for engineer wallet payments"
        })),
        (status = 500, description = "Failed to process payment", body = Object, example = json!({
            "message": "Failed to process payment"
        }))
    ),
    tag = "Payments"
)]
#[instrument(skip(pool, payload))]
pub async fn record_payment(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<RecordPaymentRequest>,
) -> Result<HttpResponse, ApiError> {
    let site_id = path.into_inner();
    let req = payload.into_inner();
    let today = chrono::Local::now().date_naive();
    let paid_on = payment_date(req.payment_date, today)?;

    if let Some(transaction_id) = req.engineer_transaction_id {
        let transaction = EngineerTransaction::fetch_by_id(pool.get_ref(), transaction_id)
            .await?
            .ok_or(ApiError::NotFound("Engineer transaction"))?;

        if !transaction.is_pending() || transaction.site_id != site_id {
            return Err(ApiError::BadRequest(
                "Engineer transaction is not open for this site".into(),
            ));
        }
        if req.engineer_id.is_some_and(|id| id != transaction.engineer_id) {
            return Err(ApiError::BadRequest(
                "Engineer transaction belongs to another engineer".into(),
            ));
        }
    }

    let balances = balance_cache::site_balances(pool.get_ref(), site_id, today).await?;
    let allocation = allocation_for(&balances, req.laborer_id, req.amount)?;

    let meta = PaymentMetadata {
        reference: req
            .reference
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        site_id,
        laborer_id: req.laborer_id,
        payment_date: paid_on,
        mode: req.mode,
        engineer_id: req.engineer_id,
        engineer_transaction_id: req.engineer_transaction_id,
        subcontract_id: req.subcontract_id,
        proof_url: req.proof_url,
        notes: req.notes,
    };

    let operations = record_descriptors(&allocation, req.channel, &meta)?;

    let affected = execute_batch(pool.get_ref(), &operations).await?;
    balance_cache::invalidate_site(site_id);

    info!(
        reference = %meta.reference,
        amount = %allocation.amount,
        excess = %allocation.excess,
        weeks = allocation.previews.len(),
        affected,
        "Payment recorded"
    );

    Ok(HttpResponse::Created().json(RecordPaymentResponse {
        reference: meta.reference,
        allocation,
        operations,
    }))
}

/// Cancel a payment and return its attendance to unpaid
#[utoipa::path(
    post,
    path = "/api/v1/payments/{payment_id}/cancel",
    params(("payment_id" = u64, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Payment cancelled", body = Object, example = json!({
            "message": "Payment cancelled"
        })),
        (status = 404, description = "Payment not found"),
        (status = 500, description = "Failed to process payment")
    ),
    tag = "Payments"
)]
#[instrument(skip(pool))]
pub async fn cancel_payment(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let payment_id = path.into_inner();

    let payment = PaymentEntry::fetch_by_id(pool.get_ref(), payment_id)
        .await?
        .ok_or(ApiError::NotFound("Payment"))?;

    let related = match payment.engineer_transaction_id {
        Some(transaction_id) => {
            PaymentEntry::fetch_by_engineer_transaction(pool.get_ref(), transaction_id).await?
        }
        None => Vec::new(),
    };

    let operations = cancel_descriptors(&payment, &related);
    if operations.is_empty() {
        warn!(payment_id, "Payment already cancelled");
        return Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "Payment already cancelled"
        })));
    }

    execute_batch(pool.get_ref(), &operations).await?;
    balance_cache::invalidate_site(payment.site_id);

    info!(payment_id, site_id = payment.site_id, "Payment cancelled");

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Payment cancelled"
    })))
}
