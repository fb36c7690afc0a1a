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
pub enum PaymentMode {
    Cash,
    Upi,
    BankTransfer,
    Cheque,
}

/// Who hands the money to the laborers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentChannel {
    /// Company pays the laborers itself
    Direct,
    /// Company funds a site engineer, who pays the laborers
    EngineerWallet,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentKind {
    /// Settles earned salary week by week
    Salary,
    /// Paid beyond everything earned so far
    Advance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PaymentEntry {
    #[schema(example = 41)]
    pub id: u64,
    /// Client generated key; inserting the same reference twice is a no-op
    #[schema(example = "5f0c8a64-3c55-4a8e-9d43-0b6a2d1f4e11")]
    pub reference: String,
    #[schema(example = 12)]
    pub site_id: u64,
    /// None for site-wide contract payments
    pub laborer_id: Option<u64>,
    #[schema(example = "1500")]
    pub amount: Decimal,
    #[schema(example = "2026-01-10", format = "date", value_type = String)]
    pub payment_date: NaiveDate,
    pub mode: PaymentMode,
    pub channel: PaymentChannel,
    pub kind: PaymentKind,
    pub subcontract_id: Option<u64>,
    pub engineer_transaction_id: Option<u64>,
    pub proof_url: Option<String>,
    pub notes: Option<String>,
    pub is_cancelled: bool,
}

#[derive(sqlx::FromRow)]
struct PaymentRow {
    id: u64,
    reference: String,
    site_id: u64,
    laborer_id: Option<u64>,
    amount: Decimal,
    payment_date: NaiveDate,
    mode: String,
    channel: String,
    kind: String,
    subcontract_id: Option<u64>,
    engineer_transaction_id: Option<u64>,
    proof_url: Option<String>,
    notes: Option<String>,
    is_cancelled: bool,
}

impl TryFrom<PaymentRow> for PaymentEntry {
    type Error = sqlx::Error;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let decode = |e: strum::ParseError| sqlx::Error::Decode(Box::new(e));

        Ok(Self {
            id: row.id,
            reference: row.reference,
            site_id: row.site_id,
            laborer_id: row.laborer_id,
            amount: row.amount,
            payment_date: row.payment_date,
            mode: row.mode.parse().map_err(decode)?,
            channel: row.channel.parse().map_err(decode)?,
            kind: row.kind.parse().map_err(decode)?,
            subcontract_id: row.subcontract_id,
            engineer_transaction_id: row.engineer_transaction_id,
            proof_url: row.proof_url,
            notes: row.notes,
            is_cancelled: row.is_cancelled,
        })
    }
}

const PAYMENT_COLUMNS: &str = r#"
    id,
    reference,
    site_id,
    laborer_id,
    amount,
    payment_date,
    mode,
    channel,
    kind,
    subcontract_id,
    engineer_transaction_id,
    proof_url,
    notes,
    is_cancelled
"#;

impl PaymentEntry {
    /// Live payments of a site dated up to and including `to`.
    pub async fn fetch_for_site(
        pool: &MySqlPool,
        site_id: u64,
        to: NaiveDate,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments \
             WHERE site_id = ? AND payment_date <= ? AND is_cancelled = FALSE \
             ORDER BY payment_date, id"
        );

        let rows = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(site_id)
            .bind(to)
            .fetch_all(pool)
            .await?;

        rows.into_iter().map(PaymentEntry::try_from).collect()
    }

    pub async fn fetch_by_id(pool: &MySqlPool, id: u64) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE id = ?");

        sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await?
            .map(PaymentEntry::try_from)
            .transpose()
    }

    /// All payments, cancelled ones included, funded through one engineer transaction.
    pub async fn fetch_by_engineer_transaction(
        pool: &MySqlPool,
        transaction_id: u64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE engineer_transaction_id = ? ORDER BY id"
        );

        let rows = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(transaction_id)
            .fetch_all(pool)
            .await?;

        rows.into_iter().map(PaymentEntry::try_from).collect()
    }
}
