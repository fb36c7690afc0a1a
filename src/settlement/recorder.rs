//! Turns settlement decisions into persistence operations.
//!
//! Nothing here touches the database: every function returns the ordered list
//! of [`OperationDescriptor`]s the caller executes as one batch. Payment rows
//! are keyed by a caller supplied reference so replaying a batch after a
//! failure does not double record money.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::model::attendance::AttendanceState;
use crate::model::engineer_transaction::{EngineerTransaction, EngineerTransactionStatus};
use crate::model::payment::{PaymentChannel, PaymentEntry, PaymentKind, PaymentMode};
use crate::settlement::error::{Result, SettlementError};
use crate::settlement::waterfall::Allocation;

/// Everything about a payment that is not decided by the allocator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentMetadata {
    pub reference: String,
    pub site_id: u64,
    /// None pays the site contract across all laborers
    pub laborer_id: Option<u64>,
    pub payment_date: NaiveDate,
    pub mode: PaymentMode,
    pub engineer_id: Option<u64>,
    /// Add to an engineer transaction that is still pending instead of opening a new one
    pub engineer_transaction_id: Option<u64>,
    pub subcontract_id: Option<u64>,
    pub proof_url: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPayment {
    pub reference: String,
    pub site_id: u64,
    pub laborer_id: Option<u64>,
    pub amount: Decimal,
    pub payment_date: NaiveDate,
    pub mode: PaymentMode,
    pub channel: PaymentChannel,
    pub kind: PaymentKind,
    pub subcontract_id: Option<u64>,
    pub proof_url: Option<String>,
    pub notes: Option<String>,
}

/// Attendance of one site week settled by a payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceMark {
    pub payment_reference: String,
    pub site_id: u64,
    pub laborer_id: Option<u64>,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub state: AttendanceState,
    pub subcontract_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEngineerTransaction {
    pub reference: String,
    pub site_id: u64,
    pub engineer_id: u64,
    pub amount: Decimal,
    pub transaction_date: NaiveDate,
    pub payment_references: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum OperationDescriptor {
    CreatePayment(NewPayment),
    MarkAttendance(AttendanceMark),
    CreateEngineerTransaction(NewEngineerTransaction),
    /// Links more payments; the amount is re-summed from live payments
    TopUpEngineerTransaction {
        transaction_id: u64,
        payment_references: Vec<String>,
    },
    ResetAttendance {
        payment_id: u64,
    },
    VoidPayment {
        payment_id: u64,
    },
    CancelEngineerTransaction {
        transaction_id: u64,
    },
    /// Re-sums the amount after one of its payments was voided
    ReduceEngineerTransaction {
        transaction_id: u64,
    },
    SettleEngineerTransaction {
        transaction_id: u64,
    },
}

pub fn advance_reference(reference: &str) -> String {
    format!("{reference}:advance")
}

pub fn engineer_reference(reference: &str) -> String {
    format!("{reference}:engineer")
}

fn validate(allocation: &Allocation, channel: PaymentChannel, meta: &PaymentMetadata) -> Result<()> {
    if allocation.amount <= Decimal::ZERO {
        return Err(SettlementError::InvalidAmount(allocation.amount));
    }
    if meta.reference.trim().is_empty() {
        return Err(SettlementError::MissingReference);
    }
    match channel {
        PaymentChannel::EngineerWallet if meta.engineer_id.is_none() => {
            Err(SettlementError::MissingEngineer)
        }
        PaymentChannel::Direct
            if meta.engineer_id.is_some() || meta.engineer_transaction_id.is_some() =>
        {
            Err(SettlementError::UnexpectedEngineer)
        }
        _ => Ok(()),
    }
}

/// Operations that persist a finalized allocation.
///
/// Order: payment rows, then one attendance mark per allocated week, then the
/// engineer transaction for wallet payments. Excess is recorded as a separate
/// advance payment that settles no week.
pub fn record_payment(
    allocation: &Allocation,
    channel: PaymentChannel,
    meta: &PaymentMetadata,
) -> Result<Vec<OperationDescriptor>> {
    validate(allocation, channel, meta)?;

    let new_payment = |reference: String, amount: Decimal, kind: PaymentKind| NewPayment {
        reference,
        site_id: meta.site_id,
        laborer_id: meta.laborer_id,
        amount,
        payment_date: meta.payment_date,
        mode: meta.mode,
        channel,
        kind,
        subcontract_id: meta.subcontract_id,
        proof_url: meta.proof_url.clone(),
        notes: meta.notes.clone(),
    };

    let mut ops = Vec::with_capacity(allocation.previews.len() + 3);
    let mut references = Vec::with_capacity(2);

    let allocated = allocation.total_allocated();
    if allocated > Decimal::ZERO {
        ops.push(OperationDescriptor::CreatePayment(new_payment(
            meta.reference.clone(),
            allocated,
            PaymentKind::Salary,
        )));
        references.push(meta.reference.clone());
    }

    if allocation.excess > Decimal::ZERO {
        let reference = advance_reference(&meta.reference);
        ops.push(OperationDescriptor::CreatePayment(new_payment(
            reference.clone(),
            allocation.excess,
            PaymentKind::Advance,
        )));
        references.push(reference);
    }

    for preview in allocation.previews.iter().filter(|p| p.allocated > Decimal::ZERO) {
        ops.push(OperationDescriptor::MarkAttendance(AttendanceMark {
            payment_reference: meta.reference.clone(),
            site_id: meta.site_id,
            laborer_id: meta.laborer_id,
            week_start: preview.week_start,
            week_end: preview.week_end,
            state: if preview.is_fully_paid {
                AttendanceState::Paid
            } else {
                AttendanceState::Partial
            },
            subcontract_id: meta.subcontract_id,
        }));
    }

    if channel == PaymentChannel::EngineerWallet {
        match (meta.engineer_transaction_id, meta.engineer_id) {
            (Some(transaction_id), _) => ops.push(OperationDescriptor::TopUpEngineerTransaction {
                transaction_id,
                payment_references: references,
            }),
            (None, Some(engineer_id)) => ops.push(OperationDescriptor::CreateEngineerTransaction(
                NewEngineerTransaction {
                    reference: engineer_reference(&meta.reference),
                    site_id: meta.site_id,
                    engineer_id,
                    amount: allocated + allocation.excess,
                    transaction_date: meta.payment_date,
                    payment_references: references,
                },
            )),
            (None, None) => return Err(SettlementError::MissingEngineer),
        }
    }

    Ok(ops)
}

/// Operations that reverse a payment.
///
/// `related` holds the other payments funded through the same engineer
/// transaction; the transaction is cancelled only when no live one remains.
/// An already cancelled payment yields no operations.
pub fn cancel_payment(payment: &PaymentEntry, related: &[PaymentEntry]) -> Vec<OperationDescriptor> {
    if payment.is_cancelled {
        return Vec::new();
    }

    let mut ops = Vec::with_capacity(3);

    if payment.kind == PaymentKind::Salary {
        ops.push(OperationDescriptor::ResetAttendance {
            payment_id: payment.id,
        });
    }
    ops.push(OperationDescriptor::VoidPayment {
        payment_id: payment.id,
    });

    if let Some(transaction_id) = payment.engineer_transaction_id {
        let still_funded = related.iter().any(|p| {
            p.id != payment.id && !p.is_cancelled && p.engineer_transaction_id == Some(transaction_id)
        });

        ops.push(if still_funded {
            OperationDescriptor::ReduceEngineerTransaction { transaction_id }
        } else {
            OperationDescriptor::CancelEngineerTransaction { transaction_id }
        });
    }

    ops
}

/// Second stage of a wallet payment: the engineer confirms the laborers were paid.
pub fn settle_engineer_transaction(
    transaction: &EngineerTransaction,
) -> Result<Vec<OperationDescriptor>> {
    match transaction.status {
        EngineerTransactionStatus::PendingSettlement => {
            Ok(vec![OperationDescriptor::SettleEngineerTransaction {
                transaction_id: transaction.id,
            }])
        }
        EngineerTransactionStatus::Settled => Ok(Vec::new()),
        EngineerTransactionStatus::Cancelled => {
            Err(SettlementError::TransactionCancelled(transaction.id))
        }
    }
}
