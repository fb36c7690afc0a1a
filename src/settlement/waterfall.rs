//! Oldest-week-first allocation of a payment across open balances.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::settlement::balance::WeekBalance;
use crate::settlement::error::{Result, SettlementError};
use crate::settlement::group::WeekGroup;

/// A week that can receive money.
pub trait OpenWeek {
    fn week_start(&self) -> NaiveDate;
    fn week_end(&self) -> NaiveDate;
    /// Amount still owed for the week
    fn due(&self) -> Decimal;
    /// Laborers the due amount is spread over
    fn laborer_count(&self) -> u32;
}

impl OpenWeek for WeekBalance {
    fn week_start(&self) -> NaiveDate {
        self.week_start
    }

    fn week_end(&self) -> NaiveDate {
        self.week_end
    }

    fn due(&self) -> Decimal {
        self.unsettled
    }

    fn laborer_count(&self) -> u32 {
        u32::from(self.unsettled > Decimal::ZERO)
    }
}

impl OpenWeek for WeekGroup {
    fn week_start(&self) -> NaiveDate {
        self.week_start
    }

    fn week_end(&self) -> NaiveDate {
        self.week_end
    }

    fn due(&self) -> Decimal {
        self.total_unsettled
    }

    fn laborer_count(&self) -> u32 {
        self.unsettled_laborers
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AllocationPreview {
    #[schema(example = "2026-01-04", format = "date", value_type = String)]
    pub week_start: NaiveDate,
    #[schema(example = "2026-01-10", format = "date", value_type = String)]
    pub week_end: NaiveDate,
    #[schema(example = "1000")]
    pub week_due: Decimal,
    #[schema(example = "1000")]
    pub allocated: Decimal,
    pub is_fully_paid: bool,
    /// Laborers of the week still owed money after this allocation
    pub remaining_laborers: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Allocation {
    #[schema(example = "1500")]
    pub amount: Decimal,
    pub previews: Vec<AllocationPreview>,
    /// Left over once every open week is covered; becomes an advance
    #[schema(example = "0")]
    pub excess: Decimal,
}

impl Allocation {
    pub fn total_allocated(&self) -> Decimal {
        self.previews.iter().map(|p| p.allocated).sum()
    }

    pub fn fully_paid_weeks(&self) -> usize {
        self.previews.iter().filter(|p| p.is_fully_paid).count()
    }
}

/// Spread `amount` over `weeks`, oldest week first.
///
/// Weeks are re-sorted by start date (stable) and weeks with nothing due are
/// skipped, so callers may pass unfiltered balances. Whatever cannot be placed
/// is returned as `excess`.
pub fn allocate<W: OpenWeek>(amount: Decimal, weeks: &[W]) -> Result<Allocation> {
    if amount < Decimal::ZERO {
        return Err(SettlementError::NegativeAmount(amount));
    }

    let mut open: Vec<&W> = weeks.iter().filter(|w| w.due() > Decimal::ZERO).collect();
    open.sort_by_key(|w| w.week_start());

    let mut remaining = amount;
    let mut previews = Vec::new();

    for week in open {
        if remaining <= Decimal::ZERO {
            break;
        }

        let due = week.due();
        let allocated = remaining.min(due);
        let is_fully_paid = allocated == due;
        remaining -= allocated;

        previews.push(AllocationPreview {
            week_start: week.week_start(),
            week_end: week.week_end(),
            week_due: due,
            allocated,
            is_fully_paid,
            remaining_laborers: if is_fully_paid { 0 } else { week.laborer_count() },
        });
    }

    Ok(Allocation {
        amount,
        previews,
        excess: remaining,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settlement::calendar::week_end;
    use rust_decimal_macros::dec;

    struct Week {
        start: NaiveDate,
        due: Decimal,
        laborers: u32,
    }

    impl OpenWeek for Week {
        fn week_start(&self) -> NaiveDate {
            self.start
        }

        fn week_end(&self) -> NaiveDate {
            week_end(self.start)
        }

        fn due(&self) -> Decimal {
            self.due
        }

        fn laborer_count(&self) -> u32 {
            self.laborers
        }
    }

    fn week(day: u32, due: Decimal) -> Week {
        Week {
            start: NaiveDate::from_ymd_opt(2026, 1, day).unwrap(),
            due,
            laborers: 3,
        }
    }

    fn two_weeks() -> Vec<Week> {
        vec![week(4, dec!(1000)), week(11, dec!(800))]
    }

    #[test]
    fn partial_payment_fills_oldest_week_first() {
        let a = allocate(dec!(1500), &two_weeks()).unwrap();

        assert_eq!(a.previews.len(), 2);
        assert_eq!(a.previews[0].allocated, dec!(1000));
        assert!(a.previews[0].is_fully_paid);
        assert_eq!(a.previews[0].remaining_laborers, 0);
        assert_eq!(a.previews[1].allocated, dec!(500));
        assert!(!a.previews[1].is_fully_paid);
        assert_eq!(a.previews[1].remaining_laborers, 3);
        assert_eq!(a.excess, dec!(0));
    }

    #[test]
    fn overpayment_becomes_excess() {
        let a = allocate(dec!(2200), &two_weeks()).unwrap();

        assert_eq!(a.fully_paid_weeks(), 2);
        assert_eq!(a.total_allocated(), dec!(1800));
        assert_eq!(a.excess, dec!(400));
    }

    #[test]
    fn nothing_outstanding_makes_everything_excess() {
        let a = allocate::<Week>(dec!(500), &[]).unwrap();

        assert!(a.previews.is_empty());
        assert_eq!(a.excess, dec!(500));
    }

    #[test]
    fn stops_once_amount_is_exhausted() {
        let weeks = vec![week(4, dec!(1000)), week(11, dec!(800)), week(18, dec!(200))];

        let a = allocate(dec!(1000), &weeks).unwrap();

        assert_eq!(a.previews.len(), 1);
        assert!(a.previews[0].is_fully_paid);
    }

    #[test]
    fn zero_amount_allocates_nothing() {
        let a = allocate(dec!(0), &two_weeks()).unwrap();

        assert!(a.previews.is_empty());
        assert_eq!(a.excess, dec!(0));
    }

    #[test]
    fn negative_amount_is_rejected() {
        let err = allocate(dec!(-1), &two_weeks()).unwrap_err();
        assert_eq!(err, SettlementError::NegativeAmount(dec!(-1)));
    }

    #[test]
    fn unsorted_and_settled_weeks_are_tolerated() {
        let weeks = vec![week(18, dec!(300)), week(11, dec!(0)), week(4, dec!(200))];

        let a = allocate(dec!(400), &weeks).unwrap();

        let starts: Vec<u32> = a.previews.iter().map(|p| chrono::Datelike::day(&p.week_start)).collect();
        assert_eq!(starts, vec![4, 18]);
        assert_eq!(a.previews[1].allocated, dec!(200));
    }

    #[test]
    fn conservation_and_order_hold_across_amounts() {
        let weeks = vec![
            week(4, dec!(1000)),
            week(11, dec!(800)),
            week(18, dec!(250.50)),
            week(25, dec!(75)),
        ];

        for amount in [dec!(0), dec!(1), dec!(999.99), dec!(1000), dec!(1800), dec!(2125.50), dec!(5000)] {
            let a = allocate(amount, &weeks).unwrap();

            assert_eq!(a.total_allocated() + a.excess, amount, "amount {amount}");
            for pair in a.previews.windows(2) {
                assert!(pair[0].is_fully_paid, "amount {amount}");
                assert!(pair[1].allocated > dec!(0));
            }
            for p in &a.previews {
                assert!(p.allocated <= p.week_due);
            }
            if a.excess > dec!(0) {
                assert_eq!(a.fully_paid_weeks(), weeks.len());
            }
        }
    }

    #[test]
    fn week_balances_allocate_on_unsettled_amount() {
        use crate::settlement::balance::compute_week_balances;
        use crate::settlement::balance::tests::{attendance, d, payment};

        let entries = vec![
            attendance(1, d(2026, 1, 5), dec!(1000)),
            attendance(1, d(2026, 1, 12), dec!(800)),
        ];
        let payments = vec![payment(Some(1), d(2026, 1, 13), dec!(300))];
        let balances = compute_week_balances(&entries, &payments);

        let a = allocate(dec!(1000), &balances).unwrap();

        assert_eq!(a.previews[0].week_due, dec!(700));
        assert_eq!(a.previews[0].remaining_laborers, 0);
        assert_eq!(a.previews[1].allocated, dec!(300));
        assert_eq!(a.previews[1].remaining_laborers, 1);
    }
}
