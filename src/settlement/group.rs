use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::settlement::balance::{WeekBalance, progress};
use crate::settlement::calendar::week_end;
use crate::settlement::status::{SettlementStatus, classify};

/// One site week across every laborer who worked it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WeekGroup {
    #[schema(example = "2026-01-04", format = "date", value_type = String)]
    pub week_start: NaiveDate,
    #[schema(example = "2026-01-10", format = "date", value_type = String)]
    pub week_end: NaiveDate,
    pub laborer_count: u32,
    pub days_worked: Decimal,
    pub total_salary: Decimal,
    pub total_paid: Decimal,
    pub total_unsettled: Decimal,
    /// Laborers with part of this week still unpaid
    pub unsettled_laborers: u32,
    pub payment_progress: Decimal,
    pub status: SettlementStatus,
}

#[derive(Default)]
struct GroupTotals {
    laborers: u32,
    days: Decimal,
    salary: Decimal,
    paid: Decimal,
    unsettled: Decimal,
    unsettled_laborers: u32,
    cumulative_salary: Decimal,
    cumulative_paid: Decimal,
}

/// Site level weeks, oldest first.
pub fn group_by_week(balances: &[WeekBalance]) -> Vec<WeekGroup> {
    let mut groups: BTreeMap<NaiveDate, GroupTotals> = BTreeMap::new();

    for b in balances {
        let g = groups.entry(b.week_start).or_default();
        g.laborers += 1;
        g.days += b.days_worked;
        g.salary += b.week_salary;
        g.paid += b.week_paid;
        g.unsettled += b.unsettled;
        if b.unsettled > Decimal::ZERO {
            g.unsettled_laborers += 1;
        }
        g.cumulative_salary += b.cumulative_salary;
        g.cumulative_paid += b.cumulative_paid;
    }

    groups
        .into_iter()
        .map(|(start, g)| WeekGroup {
            week_start: start,
            week_end: week_end(start),
            laborer_count: g.laborers,
            days_worked: g.days,
            total_salary: g.salary,
            total_paid: g.paid,
            total_unsettled: g.unsettled,
            unsettled_laborers: g.unsettled_laborers,
            payment_progress: progress(g.salary, g.salary - g.unsettled),
            status: classify(g.cumulative_salary, g.cumulative_paid),
        })
        .collect()
}
