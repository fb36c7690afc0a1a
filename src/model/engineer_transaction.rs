use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use strum_macros::{AsRefStr, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EngineerTransactionStatus {
    /// Money is with the engineer, laborers not yet confirmed paid
    PendingSettlement,
    Settled,
    Cancelled,
}

/// Money handed to a site engineer to disburse to laborers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EngineerTransaction {
    #[schema(example = 7)]
    pub id: u64,
    pub reference: String,
    #[schema(example = 12)]
    pub site_id: u64,
    #[schema(example = 4)]
    pub engineer_id: u64,
    #[schema(example = "12000")]
    pub amount: Decimal,
    #[schema(example = "2026-01-10", format = "date", value_type = String)]
    pub transaction_date: NaiveDate,
    pub status: EngineerTransactionStatus,
}

#[derive(sqlx::FromRow)]
struct EngineerTransactionRow {
    id: u64,
    reference: String,
    site_id: u64,
    engineer_id: u64,
    amount: Decimal,
    transaction_date: NaiveDate,
    status: String,
}

impl TryFrom<EngineerTransactionRow> for EngineerTransaction {
    type Error = sqlx::Error;

    fn try_from(row: EngineerTransactionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            reference: row.reference,
            site_id: row.site_id,
            engineer_id: row.engineer_id,
            amount: row.amount,
            transaction_date: row.transaction_date,
            status: row
                .status
                .parse()
                .map_err(|e| sqlx::Error::Decode(Box::new(e)))?,
        })
    }
}

impl EngineerTransaction {
    pub async fn fetch_by_id(pool: &MySqlPool, id: u64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, EngineerTransactionRow>(
            r#"
            SELECT id, reference, site_id, engineer_id, amount, transaction_date, status
            FROM engineer_transactions
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(EngineerTransaction::try_from)
        .transpose()
    }

    pub fn is_pending(&self) -> bool {
        self.status == EngineerTransactionStatus::PendingSettlement
    }
}
