use actix_web::{HttpResponse, web};
use sqlx::MySqlPool;

use crate::error::ApiError;
use crate::model::engineer_transaction::EngineerTransaction;
use crate::settlement::recorder::settle_engineer_transaction;
use crate::utils::{balance_cache, db_utils::execute_batch};

/// Engineer confirms the money reached the laborers
#[utoipa::path(
    put,
    path = "/api/v1/engineer-transactions/{transaction_id}/settle",
    params(
        ("transaction_id" = u64, Path, description = "Engineer transaction ID")
    ),
    responses(
        (status = 200, description = "Transaction settled", body = Object, example = json!({
            "message": "Engineer transaction settled"
        })),
        (status = 400, description = "Transaction was cancelled", body = Object, example = json!({
            "message": "Engineer transaction 7 is cancelled"
        })),
        (status = 404, description = "Engineer transaction not found")
    ),
    tag = "Engineer Transactions"
)]
#[tracing::instrument(skip(pool))]
pub async fn settle_transaction(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ApiError> {
    let transaction_id = path.into_inner();

    let transaction = EngineerTransaction::fetch_by_id(pool.get_ref(), transaction_id)
        .await?
        .ok_or(ApiError::NotFound("Engineer transaction"))?;

    let operations = settle_engineer_transaction(&transaction)?;
    if operations.is_empty() {
        return Ok(HttpResponse::Ok().json(serde_json::json!({
            "message": "Engineer transaction already settled"
        })));
    }

    execute_batch(pool.get_ref(), &operations).await?;
    balance_cache::invalidate_site(transaction.site_id);

    tracing::info!(
        transaction_id,
        engineer_id = transaction.engineer_id,
        amount = %transaction.amount,
        "Engineer transaction settled"
    );

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Engineer transaction settled"
    })))
}
