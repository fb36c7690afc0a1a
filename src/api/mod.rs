pub mod balances;
pub mod engineer_transactions;
pub mod payments;
