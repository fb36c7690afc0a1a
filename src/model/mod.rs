pub mod attendance;
pub mod engineer_transaction;
pub mod payment;
