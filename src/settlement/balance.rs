//! Per-laborer weekly balances.
//!
//! Attendance and payments are bucketed by laborer and calendar week, then
//! walked oldest week first while the cumulative salary and cumulative paid
//! totals are carried forward.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::{attendance::AttendanceEntry, payment::PaymentEntry};
use crate::settlement::calendar::{week_end, week_start};
use crate::settlement::status::{SettlementStatus, classify};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WeekBalance {
    #[schema(example = 301)]
    pub laborer_id: u64,
    #[schema(example = "2026-01-04", format = "date", value_type = String)]
    pub week_start: NaiveDate,
    #[schema(example = "2026-01-10", format = "date", value_type = String)]
    pub week_end: NaiveDate,
    pub days_worked: Decimal,
    pub week_salary: Decimal,
    pub week_paid: Decimal,
    /// Balance due going into the week, never below zero
    pub previous_balance: Decimal,
    pub cumulative_salary: Decimal,
    pub cumulative_paid: Decimal,
    /// `cumulative_salary - cumulative_paid`; negative means advance
    pub running_balance: Decimal,
    /// Percentage paid, above 100 when in advance
    pub payment_progress: Decimal,
    /// Part of this week's salary still unpaid once every recorded payment
    /// of the laborer is applied oldest week first
    pub unsettled: Decimal,
    pub status: SettlementStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LaborerSummary {
    #[schema(example = 301)]
    pub laborer_id: u64,
    pub weeks_worked: u32,
    pub days_worked: Decimal,
    pub total_salary: Decimal,
    pub total_paid: Decimal,
    pub balance: Decimal,
    pub payment_progress: Decimal,
    pub status: SettlementStatus,
    #[schema(example = "2026-01-09", format = "date", value_type = String)]
    pub last_worked: Option<NaiveDate>,
}

/// Everything the balance endpoints report for one site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SiteBalances {
    pub weeks: Vec<WeekBalance>,
    pub laborers: Vec<LaborerSummary>,
    /// Site-wide money left over once every laborer week is covered
    #[schema(example = "0")]
    pub site_advance: Decimal,
}

impl SiteBalances {
    pub fn compute(entries: &[AttendanceEntry], payments: &[PaymentEntry]) -> Self {
        let ledger = build_ledger(entries, payments);
        Self {
            weeks: week_balances(&ledger.laborers),
            laborers: laborer_summaries(&ledger.laborers),
            site_advance: ledger.unapplied,
        }
    }
}

#[derive(Default)]
struct WeekTotals {
    worked: bool,
    last_worked: Option<NaiveDate>,
    days: Decimal,
    salary: Decimal,
    paid: Decimal,
}

type Ledger = BTreeMap<u64, BTreeMap<NaiveDate, WeekTotals>>;

struct SiteLedger {
    laborers: Ledger,
    unapplied: Decimal,
}

fn build_ledger(entries: &[AttendanceEntry], payments: &[PaymentEntry]) -> SiteLedger {
    let mut ledger = Ledger::new();

    for entry in entries {
        let week = ledger
            .entry(entry.laborer_id)
            .or_default()
            .entry(week_start(entry.date))
            .or_default();
        week.worked = true;
        week.days += entry.work_days;
        week.salary += entry.earnings;
        week.last_worked = week.last_worked.max(Some(entry.date));
    }

    let mut site_wide = Vec::new();
    for payment in payments.iter().filter(|p| !p.is_cancelled) {
        match payment.laborer_id {
            Some(laborer_id) => {
                ledger
                    .entry(laborer_id)
                    .or_default()
                    .entry(week_start(payment.payment_date))
                    .or_default()
                    .paid += payment.amount;
            }
            None => site_wide.push(payment),
        }
    }

    let unapplied = spread_site_payments(&mut ledger, site_wide);

    SiteLedger {
        laborers: ledger,
        unapplied,
    }
}

/// Salary still open per (week, laborer) once each laborer's own payments
/// are applied oldest week first.
fn open_dues(ledger: &Ledger) -> BTreeMap<(NaiveDate, u64), Decimal> {
    let mut dues = BTreeMap::new();

    for (&laborer_id, weeks) in ledger {
        let total_paid: Decimal = weeks.values().map(|w| w.paid).sum();
        let mut cumulative_salary = Decimal::ZERO;

        for (&start, week) in weeks {
            cumulative_salary += week.salary;
            let due = (cumulative_salary - total_paid)
                .max(Decimal::ZERO)
                .min(week.salary);
            if due > Decimal::ZERO {
                dues.insert((start, laborer_id), due);
            }
        }
    }

    dues
}

/// Site-wide payments cover site weeks oldest first, laborers in id order
/// within a week, the same order the week groups were allocated in. Each
/// share is booked to the laborer in the week the payment was made.
fn spread_site_payments(ledger: &mut Ledger, mut payments: Vec<&PaymentEntry>) -> Decimal {
    if payments.is_empty() {
        return Decimal::ZERO;
    }
    payments.sort_by_key(|p| (p.payment_date, p.id));

    let mut dues = open_dues(ledger);
    let mut unapplied = Decimal::ZERO;

    for payment in payments {
        let mut remaining = payment.amount;

        for (&(_, laborer_id), due) in dues.iter_mut() {
            if remaining <= Decimal::ZERO {
                break;
            }
            if *due <= Decimal::ZERO {
                continue;
            }
            let share = remaining.min(*due);
            *due -= share;
            remaining -= share;

            ledger
                .entry(laborer_id)
                .or_default()
                .entry(week_start(payment.payment_date))
                .or_default()
                .paid += share;
        }

        unapplied += remaining.max(Decimal::ZERO);
    }

    unapplied
}

pub(crate) fn progress(salary: Decimal, paid: Decimal) -> Decimal {
    if salary.is_zero() {
        Decimal::ZERO
    } else {
        (paid / salary * dec!(100)).round_dp(2)
    }
}

/// Weekly balances ordered by laborer, then by week.
///
/// Weeks in which a laborer has no attendance are not emitted, but payments
/// dated in them still count toward the cumulative paid of later weeks.
/// Site-wide payments count once spread over the laborers they settled.
pub fn compute_week_balances(
    entries: &[AttendanceEntry],
    payments: &[PaymentEntry],
) -> Vec<WeekBalance> {
    week_balances(&build_ledger(entries, payments).laborers)
}

fn week_balances(ledger: &Ledger) -> Vec<WeekBalance> {
    let mut balances = Vec::new();

    for (&laborer_id, weeks) in ledger {
        let total_paid: Decimal = weeks.values().map(|w| w.paid).sum();
        let mut cumulative_salary = Decimal::ZERO;
        let mut cumulative_paid = Decimal::ZERO;

        for (&start, week) in weeks {
            let previous_balance = (cumulative_salary - cumulative_paid).max(Decimal::ZERO);
            cumulative_salary += week.salary;
            cumulative_paid += week.paid;

            if !week.worked {
                continue;
            }

            let unsettled = (cumulative_salary - total_paid)
                .max(Decimal::ZERO)
                .min(week.salary);

            balances.push(WeekBalance {
                laborer_id,
                week_start: start,
                week_end: week_end(start),
                days_worked: week.days,
                week_salary: week.salary,
                week_paid: week.paid,
                previous_balance,
                cumulative_salary,
                cumulative_paid,
                running_balance: cumulative_salary - cumulative_paid,
                payment_progress: progress(cumulative_salary, cumulative_paid),
                unsettled,
                status: classify(cumulative_salary, cumulative_paid),
            });
        }
    }

    balances
}

/// Totals per laborer over every recorded week, including payments dated
/// after the last worked week.
pub fn summarize_laborers(
    entries: &[AttendanceEntry],
    payments: &[PaymentEntry],
) -> Vec<LaborerSummary> {
    laborer_summaries(&build_ledger(entries, payments).laborers)
}

fn laborer_summaries(ledger: &Ledger) -> Vec<LaborerSummary> {
    ledger
        .iter()
        .map(|(&laborer_id, weeks)| {
            let worked = weeks.values().filter(|w| w.worked);
            let weeks_worked = worked.clone().count() as u32;
            let days_worked = worked.clone().map(|w| w.days).sum();
            let last_worked = worked.filter_map(|w| w.last_worked).max();
            let total_salary: Decimal = weeks.values().map(|w| w.salary).sum();
            let total_paid: Decimal = weeks.values().map(|w| w.paid).sum();

            LaborerSummary {
                laborer_id,
                weeks_worked,
                days_worked,
                total_salary,
                total_paid,
                balance: total_salary - total_paid,
                payment_progress: progress(total_salary, total_paid),
                status: classify(total_salary, total_paid),
                last_worked,
            }
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::attendance::AttendanceState;
    use crate::model::payment::{PaymentChannel, PaymentKind, PaymentMode};

    pub(crate) fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    pub(crate) fn attendance(laborer_id: u64, date: NaiveDate, earnings: Decimal) -> AttendanceEntry {
        AttendanceEntry {
            id: 0,
            site_id: 1,
            laborer_id,
            date,
            earnings,
            work_days: dec!(1),
            state: AttendanceState::Unpaid,
            payment_id: None,
            subcontract_id: None,
        }
    }

    pub(crate) fn payment(laborer_id: Option<u64>, date: NaiveDate, amount: Decimal) -> PaymentEntry {
        PaymentEntry {
            id: 0,
            reference: "ref".into(),
            site_id: 1,
            laborer_id,
            amount,
            payment_date: date,
            mode: PaymentMode::Cash,
            channel: PaymentChannel::Direct,
            kind: PaymentKind::Salary,
            subcontract_id: None,
            engineer_transaction_id: None,
            proof_url: None,
            notes: None,
            is_cancelled: false,
        }
    }

    #[test]
    fn groups_days_into_sunday_weeks() {
        let entries = vec![
            attendance(1, d(2026, 1, 5), dec!(500)),
            attendance(1, d(2026, 1, 6), dec!(500)),
            attendance(1, d(2026, 1, 12), dec!(400)),
            attendance(1, d(2026, 1, 13), dec!(400)),
        ];

        let weeks = compute_week_balances(&entries, &[]);

        assert_eq!(weeks.len(), 2);
        assert_eq!(weeks[0].week_start, d(2026, 1, 4));
        assert_eq!(weeks[0].week_end, d(2026, 1, 10));
        assert_eq!(weeks[0].week_salary, dec!(1000));
        assert_eq!(weeks[0].days_worked, dec!(2));
        assert_eq!(weeks[1].previous_balance, dec!(1000));
        assert_eq!(weeks[1].cumulative_salary, dec!(1800));
        assert_eq!(weeks[1].running_balance, dec!(1800));
        assert_eq!(weeks[1].status, SettlementStatus::Pending);
    }

    #[test]
    fn running_balance_identity_holds_without_advance() {
        let entries = vec![
            attendance(1, d(2026, 1, 5), dec!(1000)),
            attendance(1, d(2026, 1, 12), dec!(800)),
            attendance(1, d(2026, 1, 19), dec!(600)),
            attendance(2, d(2026, 1, 6), dec!(700)),
        ];
        let payments = vec![
            payment(Some(1), d(2026, 1, 9), dec!(300)),
            payment(Some(1), d(2026, 1, 14), dec!(1200)),
            payment(Some(2), d(2026, 1, 8), dec!(100)),
        ];

        let weeks = compute_week_balances(&entries, &payments);

        assert_eq!(weeks.len(), 4);
        for w in &weeks {
            assert_eq!(
                w.running_balance,
                w.previous_balance + w.week_salary - w.week_paid,
                "laborer {} week {}",
                w.laborer_id,
                w.week_start
            );
        }
        assert_eq!(weeks[1].previous_balance, dec!(700));
        assert_eq!(weeks[1].running_balance, dec!(300));
        assert_eq!(weeks[1].status, SettlementStatus::Partial);
        assert_eq!(weeks[3].laborer_id, 2);
    }

    #[test]
    fn previous_balance_is_clamped_after_advance() {
        let entries = vec![
            attendance(1, d(2026, 1, 5), dec!(500)),
            attendance(1, d(2026, 1, 12), dec!(500)),
        ];
        let payments = vec![payment(Some(1), d(2026, 1, 8), dec!(800))];

        let weeks = compute_week_balances(&entries, &payments);

        assert_eq!(weeks[0].running_balance, dec!(-300));
        assert_eq!(weeks[0].status, SettlementStatus::Advance);
        assert_eq!(weeks[0].payment_progress, dec!(160));
        assert_eq!(weeks[1].previous_balance, dec!(0));
        assert_eq!(weeks[1].running_balance, dec!(200));
    }

    #[test]
    fn payments_in_idle_weeks_carry_forward() {
        let entries = vec![
            attendance(1, d(2026, 1, 5), dec!(1000)),
            attendance(1, d(2026, 1, 19), dec!(1000)),
        ];
        let payments = vec![payment(Some(1), d(2026, 1, 14), dec!(600))];

        let weeks = compute_week_balances(&entries, &payments);

        assert_eq!(weeks.len(), 2);
        assert_eq!(weeks[1].week_start, d(2026, 1, 18));
        assert_eq!(weeks[1].previous_balance, dec!(400));
        assert_eq!(weeks[1].week_paid, dec!(0));
        assert_eq!(weeks[1].cumulative_paid, dec!(600));
        assert_eq!(weeks[1].running_balance, dec!(1400));
    }

    #[test]
    fn unsettled_applies_all_payments_oldest_week_first() {
        let entries = vec![
            attendance(1, d(2026, 1, 5), dec!(1000)),
            attendance(1, d(2026, 1, 12), dec!(800)),
            attendance(1, d(2026, 1, 19), dec!(600)),
        ];
        // Paid late, after the last worked week
        let payments = vec![payment(Some(1), d(2026, 1, 28), dec!(1300))];

        let weeks = compute_week_balances(&entries, &payments);
        let unsettled: Vec<Decimal> = weeks.iter().map(|w| w.unsettled).collect();

        assert_eq!(unsettled, vec![dec!(0), dec!(500), dec!(600)]);
    }

    #[test]
    fn ignores_cancelled_payments() {
        let entries = vec![attendance(1, d(2026, 1, 5), dec!(1000))];
        let mut cancelled = payment(Some(1), d(2026, 1, 6), dec!(400));
        cancelled.is_cancelled = true;
        let mut cancelled_site_wide = payment(None, d(2026, 1, 6), dec!(900));
        cancelled_site_wide.is_cancelled = true;

        let weeks = compute_week_balances(&entries, &[cancelled, cancelled_site_wide]);

        assert_eq!(weeks.len(), 1);
        assert_eq!(weeks[0].cumulative_paid, dec!(0));
        assert_eq!(weeks[0].payment_progress, dec!(0));
        assert_eq!(weeks[0].unsettled, dec!(1000));
    }

    #[test]
    fn site_wide_payment_settles_oldest_week_across_laborers() {
        let entries = vec![
            attendance(2, d(2026, 1, 6), dec!(400)),
            attendance(1, d(2026, 1, 5), dec!(600)),
            attendance(1, d(2026, 1, 12), dec!(800)),
        ];
        let payments = vec![payment(None, d(2026, 1, 20), dec!(1200))];

        let site = SiteBalances::compute(&entries, &payments);
        let unsettled: Vec<(u64, NaiveDate, Decimal)> = site
            .weeks
            .iter()
            .map(|w| (w.laborer_id, w.week_start, w.unsettled))
            .collect();

        assert_eq!(
            unsettled,
            vec![
                (1, d(2026, 1, 4), dec!(0)),
                (1, d(2026, 1, 11), dec!(600)),
                (2, d(2026, 1, 4), dec!(0)),
            ]
        );
        assert_eq!(site.laborers[0].total_paid, dec!(800));
        assert_eq!(site.laborers[1].total_paid, dec!(400));
        assert_eq!(site.site_advance, dec!(0));
    }

    #[test]
    fn own_payments_apply_before_site_wide_ones() {
        let entries = vec![
            attendance(1, d(2026, 1, 5), dec!(600)),
            attendance(2, d(2026, 1, 6), dec!(400)),
        ];
        let payments = vec![
            payment(None, d(2026, 1, 9), dec!(500)),
            payment(Some(1), d(2026, 1, 8), dec!(600)),
        ];

        let site = SiteBalances::compute(&entries, &payments);

        assert_eq!(site.weeks[0].unsettled, dec!(0));
        assert_eq!(site.weeks[1].unsettled, dec!(0));
        assert_eq!(site.laborers[0].total_paid, dec!(600));
        assert_eq!(site.laborers[1].total_paid, dec!(400));
        assert_eq!(site.site_advance, dec!(100));
    }

    #[test]
    fn site_advance_is_absorbed_by_later_work() {
        let paid_ahead = vec![payment(None, d(2026, 1, 2), dec!(300))];

        let before = SiteBalances::compute(&[], &paid_ahead);
        assert!(before.weeks.is_empty());
        assert_eq!(before.site_advance, dec!(300));

        let entries = vec![attendance(4, d(2026, 1, 13), dec!(500))];
        let after = SiteBalances::compute(&entries, &paid_ahead);

        assert_eq!(after.site_advance, dec!(0));
        assert_eq!(after.weeks[0].unsettled, dec!(200));
        assert_eq!(after.laborers[0].total_paid, dec!(300));
        assert_eq!(after.laborers[0].balance, dec!(200));
    }

    #[test]
    fn summary_includes_payments_after_last_week() {
        let entries = vec![
            attendance(3, d(2026, 1, 5), dec!(750)),
            attendance(3, d(2026, 1, 7), dec!(750)),
        ];
        let payments = vec![payment(Some(3), d(2026, 2, 2), dec!(1000))];

        let summary = summarize_laborers(&entries, &payments);

        assert_eq!(summary.len(), 1);
        let s = &summary[0];
        assert_eq!(s.weeks_worked, 1);
        assert_eq!(s.days_worked, dec!(2));
        assert_eq!(s.total_paid, dec!(1000));
        assert_eq!(s.balance, dec!(500));
        assert_eq!(s.payment_progress, dec!(66.67));
        assert_eq!(s.status, SettlementStatus::Partial);
        assert_eq!(s.last_worked, Some(d(2026, 1, 7)));
    }
}
