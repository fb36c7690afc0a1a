use derive_more::Display;
use rust_decimal::Decimal;

/// Rejections raised before any descriptor is produced.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum SettlementError {
    #[display(fmt = "Payment amount must be greater than zero (got {})", _0)]
    InvalidAmount(Decimal),

    #[display(fmt = "Allocation amount cannot be negative (got {})", _0)]
    NegativeAmount(Decimal),

    #[display(fmt = "An engineer must be selected for engineer wallet payments")]
    MissingEngineer,

    #[display(fmt = "Engineer details are only accepted for engineer wallet payments")]
    UnexpectedEngineer,

    #[display(fmt = "Payment reference cannot be empty")]
    MissingReference,

    #[display(fmt = "Engineer transaction {} is cancelled", _0)]
    TransactionCancelled(u64),
}

impl std::error::Error for SettlementError {}

pub type Result<T> = std::result::Result<T, SettlementError>;
