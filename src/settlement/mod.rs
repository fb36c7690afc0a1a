//! Waterfall payment allocation and balance reconciliation.
//!
//! Pure functions over already fetched attendance and payment rows. The
//! database side effects are described by [`recorder::OperationDescriptor`]
//! values and executed elsewhere.

pub mod balance;
pub mod calendar;
pub mod error;
pub mod group;
pub mod recorder;
pub mod status;
pub mod waterfall;

pub use balance::{LaborerSummary, SiteBalances, WeekBalance};
pub use error::SettlementError;
pub use group::{WeekGroup, group_by_week};
pub use recorder::{OperationDescriptor, PaymentMetadata, cancel_payment, record_payment};
pub use status::SettlementStatus;
pub use waterfall::{Allocation, AllocationPreview, allocate};
