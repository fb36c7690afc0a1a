use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use strum_macros::{AsRefStr, EnumString};
use utoipa::ToSchema;

/// How much of a day's earnings has been settled.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttendanceState {
    Unpaid,
    Partial,
    Paid,
}

/// One day of recorded labor for one laborer at a site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceEntry {
    #[schema(example = 1)]
    pub id: u64,
    #[schema(example = 12)]
    pub site_id: u64,
    #[schema(example = 301)]
    pub laborer_id: u64,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub date: NaiveDate,
    /// Amount earned that day
    #[schema(example = "850")]
    pub earnings: Decimal,
    /// Fraction of a full work day (1, 0.5, 1.5 ...)
    #[schema(example = "1")]
    pub work_days: Decimal,
    pub state: AttendanceState,
    pub payment_id: Option<u64>,
    pub subcontract_id: Option<u64>,
}

#[derive(sqlx::FromRow)]
struct AttendanceRow {
    id: u64,
    site_id: u64,
    laborer_id: u64,
    work_date: NaiveDate,
    daily_earnings: Decimal,
    work_days: Decimal,
    payment_state: String,
    payment_id: Option<u64>,
    subcontract_id: Option<u64>,
}

impl TryFrom<AttendanceRow> for AttendanceEntry {
    type Error = sqlx::Error;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        let state = row
            .payment_state
            .parse::<AttendanceState>()
            .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

        Ok(Self {
            id: row.id,
            site_id: row.site_id,
            laborer_id: row.laborer_id,
            date: row.work_date,
            earnings: row.daily_earnings,
            work_days: row.work_days,
            state,
            payment_id: row.payment_id,
            subcontract_id: row.subcontract_id,
        })
    }
}

impl AttendanceEntry {
    /// Every attendance row of a site up to and including `to`.
    ///
    /// Balances are cumulative, so the lower bound of a report range is never
    /// pushed down to the query.
    pub async fn fetch_for_site(
        pool: &MySqlPool,
        site_id: u64,
        to: NaiveDate,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let rows = sqlx::query_as::<_, AttendanceRow>(
            r#"
            SELECT
                id,
                site_id,
                laborer_id,
                work_date,
                daily_earnings,
                work_days,
                payment_state,
                payment_id,
                subcontract_id
            FROM attendance
            WHERE site_id = ?
            AND work_date <= ?
            ORDER BY laborer_id, work_date
            "#,
        )
        .bind(site_id)
        .bind(to)
        .fetch_all(pool)
        .await?;

        rows.into_iter().map(AttendanceEntry::try_from).collect()
    }
}
