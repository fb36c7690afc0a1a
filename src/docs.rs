use crate::api::balances::{BalanceQuery, BalanceResponse, WeekGroupResponse};
use crate::api::payments::{PreviewRequest, RecordPaymentRequest, RecordPaymentResponse};
use crate::model::attendance::{AttendanceEntry, AttendanceState};
use crate::model::engineer_transaction::{EngineerTransaction, EngineerTransactionStatus};
use crate::model::payment::{PaymentChannel, PaymentEntry, PaymentKind, PaymentMode};
use crate::settlement::{
    Allocation, AllocationPreview, LaborerSummary, SettlementStatus, WeekBalance, WeekGroup,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Site Labor Settlement API",
        version = "1.0.0",
        description = r#"
## Construction Site Labor Settlement

Weekly wage balances and payment settlement for laborers working on construction sites.

### 🔹 Key Features
- **Balances**
  - Running balance, progress and status per laborer per week (Sunday to Saturday)
  - Site weeks with every laborer combined
- **Payments**
  - Preview how an amount is spread over open weeks, oldest first
  - Record direct payments or payments through an engineer wallet
  - Overpayments are kept as advances
  - Cancel a payment and return its attendance to unpaid
- **Engineer transactions**
  - Confirm that money handed to a site engineer reached the laborers

### 📦 Response Format
- JSON-based RESTful responses
- Amounts are decimal strings in rupees

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::balances::site_balances,
        crate::api::balances::site_weeks,

        crate::api::payments::preview_payment,
        crate::api::payments::record_payment,
        crate::api::payments::cancel_payment,

        crate::api::engineer_transactions::settle_transaction
    ),
    components(
        schemas(
            BalanceQuery,
            BalanceResponse,
            WeekGroupResponse,
            PreviewRequest,
            RecordPaymentRequest,
            RecordPaymentResponse,
            WeekBalance,
            WeekGroup,
            LaborerSummary,
            SettlementStatus,
            Allocation,
            AllocationPreview,
            AttendanceEntry,
            AttendanceState,
            PaymentEntry,
            PaymentMode,
            PaymentChannel,
            PaymentKind,
            EngineerTransaction,
            EngineerTransactionStatus
        )
    ),
    tags(
        (name = "Balances", description = "Weekly balance APIs"),
        (name = "Payments", description = "Payment settlement APIs"),
        (name = "Engineer Transactions", description = "Engineer wallet settlement APIs"),
    )
)]
pub struct ApiDoc;
