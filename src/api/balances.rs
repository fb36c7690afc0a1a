use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use utoipa::{IntoParams, ToSchema};

use crate::error::ApiError;
use crate::settlement::{LaborerSummary, WeekBalance, WeekGroup, group_by_week};
use crate::utils::balance_cache;

#[derive(Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct BalanceQuery {
    /// First day of the report; earlier weeks still feed the running totals
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub from: Option<NaiveDate>,
    /// Last day of the report (defaults to today)
    #[schema(example = "2026-01-31", format = "date", value_type = String)]
    pub to: Option<NaiveDate>,
    /// Restrict to one laborer
    #[schema(example = 301)]
    pub laborer_id: Option<u64>,
}

impl BalanceQuery {
    pub fn range(&self) -> Result<(Option<NaiveDate>, NaiveDate), ApiError> {
        let to = self.to.unwrap_or_else(|| chrono::Local::now().date_naive());
        if let Some(from) = self.from {
            if from > to {
                return Err(ApiError::BadRequest("from cannot be after to".into()));
            }
        }
        Ok((self.from, to))
    }
}

#[derive(Serialize, ToSchema)]
pub struct BalanceResponse {
    pub weeks: Vec<WeekBalance>,
    pub laborers: Vec<LaborerSummary>,
    /// Site-wide payments not yet matched to any laborer's work
    #[schema(example = "0")]
    pub site_advance: rust_decimal::Decimal,
}

#[derive(Serialize, ToSchema)]
pub struct WeekGroupResponse {
    pub data: Vec<WeekGroup>,
    #[schema(example = "4200")]
    pub total_unsettled: rust_decimal::Decimal,
}

fn in_range(week_end: NaiveDate, from: Option<NaiveDate>) -> bool {
    from.is_none_or(|from| week_end >= from)
}

/// Weekly running balances of a site's laborers
#[utoipa::path(
    get,
    path = "/api/v1/sites/{site_id}/balances",
    params(
        ("site_id" = u64, Path, description = "Site ID"),
        BalanceQuery
    ),
    responses(
        (status = 200, description = "Weekly balances and laborer totals", body = BalanceResponse),
        (status = 400, description = "Invalid date range"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Balances"
)]
pub async fn site_balances(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    query: web::Query<BalanceQuery>,
) -> Result<HttpResponse, ApiError> {
    let site_id = path.into_inner();
    let (from, to) = query.range()?;

    let balances = balance_cache::site_balances(pool.get_ref(), site_id, to).await?;

    let for_laborer = |id: u64| query.laborer_id.is_none_or(|wanted| wanted == id);

    let weeks = balances
        .weeks
        .iter()
        .filter(|w| for_laborer(w.laborer_id) && in_range(w.week_end, from))
        .cloned()
        .collect();
    let laborers = balances
        .laborers
        .iter()
        .filter(|l| for_laborer(l.laborer_id))
        .cloned()
        .collect();

    Ok(HttpResponse::Ok().json(BalanceResponse {
        weeks,
        laborers,
        site_advance: balances.site_advance,
    }))
}

/// Site weeks with every laborer combined
#[utoipa::path(
    get,
    path = "/api/v1/sites/{site_id}/weeks",
    params(
        ("site_id" = u64, Path, description = "Site ID"),
        BalanceQuery
    ),
    responses(
        (status = 200, description = "Week groups, oldest first", body = WeekGroupResponse),
        (status = 400, description = "Invalid date range"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Balances"
)]
pub async fn site_weeks(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    query: web::Query<BalanceQuery>,
) -> Result<HttpResponse, ApiError> {
    let site_id = path.into_inner();
    let (from, to) = query.range()?;

    let balances = balance_cache::site_balances(pool.get_ref(), site_id, to).await?;

    let data: Vec<WeekGroup> = group_by_week(&balances.weeks)
        .into_iter()
        .filter(|g| in_range(g.week_end, from))
        .collect();
    let total_unsettled = data.iter().map(|g| g.total_unsettled).sum();

    tracing::debug!(site_id, weeks = data.len(), "Week groups computed");

    Ok(HttpResponse::Ok().json(WeekGroupResponse {
        data,
        total_unsettled,
    }))
}
