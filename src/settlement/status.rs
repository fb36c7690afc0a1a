use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SettlementStatus {
    /// Balance due, nothing paid yet
    Pending,
    /// Balance due, something paid
    Partial,
    /// Nothing due
    Completed,
    /// Paid more than earned
    Advance,
}

/// Status is derived from the cumulative totals alone.
///
/// A laborer with nothing earned and nothing paid counts as `Completed`.
pub fn classify(cumulative_salary: Decimal, cumulative_paid: Decimal) -> SettlementStatus {
    let balance = cumulative_salary - cumulative_paid;

    if balance < Decimal::ZERO {
        SettlementStatus::Advance
    } else if balance.is_zero() {
        SettlementStatus::Completed
    } else if cumulative_paid > Decimal::ZERO {
        SettlementStatus::Partial
    } else {
        SettlementStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn boundary_pairs() {
        assert_eq!(classify(dec!(0), dec!(0)), SettlementStatus::Completed);
        assert_eq!(classify(dec!(100), dec!(100)), SettlementStatus::Completed);
        assert_eq!(classify(dec!(100), dec!(150)), SettlementStatus::Advance);
    }

    #[test]
    fn open_balances() {
        assert_eq!(classify(dec!(100), dec!(0)), SettlementStatus::Pending);
        assert_eq!(classify(dec!(100), dec!(40)), SettlementStatus::Partial);
        assert_eq!(classify(dec!(0), dec!(25)), SettlementStatus::Advance);
    }

    #[test]
    fn status_follows_sign_of_running_balance() {
        let amounts = [dec!(0), dec!(0.5), dec!(99), dec!(100), dec!(101), dec!(2500)];

        for salary in amounts {
            for paid in amounts {
                let balance = salary - paid;
                let status = classify(salary, paid);
                match status {
                    SettlementStatus::Advance => assert!(balance < dec!(0)),
                    SettlementStatus::Completed => assert!(balance.is_zero()),
                    SettlementStatus::Partial => assert!(balance > dec!(0) && paid > dec!(0)),
                    SettlementStatus::Pending => assert!(balance > dec!(0) && paid.is_zero()),
                }
            }
        }
    }

    #[test]
    fn status_strings() {
        assert_eq!(SettlementStatus::Advance.as_ref(), "advance");
        assert_eq!(
            serde_json::to_string(&SettlementStatus::Completed).unwrap(),
            "\"completed\""
        );
    }
}
