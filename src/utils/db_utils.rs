use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::MySqlPool;

use crate::model::engineer_transaction::EngineerTransactionStatus;
use crate::settlement::recorder::{AttendanceMark, NewEngineerTransaction, NewPayment, OperationDescriptor};

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    U64(u64),
    Decimal(Decimal),
    Date(NaiveDate),
    Null,
}

impl From<Option<u64>> for SqlValue {
    fn from(value: Option<u64>) -> Self {
        value.map_or(SqlValue::Null, SqlValue::U64)
    }
}

impl From<Option<String>> for SqlValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(SqlValue::Null, SqlValue::String)
    }
}

/// ===============================
/// One statement of a batch
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub struct SqlStatement {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

impl SqlStatement {
    fn new(sql: impl Into<String>, values: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            values,
        }
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn insert_payment(p: &NewPayment) -> SqlStatement {
    SqlStatement::new(
        r#"
        INSERT IGNORE INTO payments
            (reference, site_id, laborer_id, amount, payment_date, mode, channel, kind,
             subcontract_id, proof_url, notes)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        vec![
            SqlValue::String(p.reference.clone()),
            SqlValue::U64(p.site_id),
            p.laborer_id.into(),
            SqlValue::Decimal(p.amount),
            SqlValue::Date(p.payment_date),
            SqlValue::String(p.mode.as_ref().to_string()),
            SqlValue::String(p.channel.as_ref().to_string()),
            SqlValue::String(p.kind.as_ref().to_string()),
            p.subcontract_id.into(),
            p.proof_url.clone().into(),
            p.notes.clone().into(),
        ],
    )
}

/// Attendance rows of the marked week that are not fully paid yet.
fn week_rows(m: &AttendanceMark) -> (String, Vec<SqlValue>) {
    let mut sql = String::from(
        r#"
        WHERE a.site_id = ?
        AND a.work_date BETWEEN ? AND ?
        AND a.payment_state <> 'paid'
        "#,
    );
    let mut values = vec![
        SqlValue::U64(m.site_id),
        SqlValue::Date(m.week_start),
        SqlValue::Date(m.week_end),
    ];

    if let Some(laborer_id) = m.laborer_id {
        sql.push_str("AND a.laborer_id = ?\n");
        values.push(SqlValue::U64(laborer_id));
    }

    (sql, values)
}

/// Link first: once the rows are `paid` the filter no longer sees them.
fn mark_attendance(m: &AttendanceMark) -> Vec<SqlStatement> {
    let (filter, filter_values) = week_rows(m);

    let mut link_values = vec![SqlValue::String(m.payment_reference.clone())];
    link_values.extend(filter_values.iter().cloned());
    let link = SqlStatement::new(
        format!(
            r#"
        INSERT IGNORE INTO attendance_payments (attendance_id, payment_id)
        SELECT a.id, p.id
        FROM attendance a
        JOIN payments p ON p.reference = ?
        {filter}"#
        ),
        link_values,
    );

    let mut update_values = vec![
        SqlValue::String(m.state.as_ref().to_string()),
        SqlValue::String(m.payment_reference.clone()),
        m.subcontract_id.into(),
    ];
    update_values.extend(filter_values);
    let update = SqlStatement::new(
        format!(
            r#"
        UPDATE attendance a
        SET a.payment_state = ?,
            a.payment_id = (SELECT id FROM payments WHERE reference = ?),
            a.subcontract_id = COALESCE(?, a.subcontract_id)
        {filter}"#
        ),
        update_values,
    );

    vec![link, update]
}

/// Rows the payment touched fall back to the latest other live payment
/// linked to them (`partial`), or to `unpaid` when none is left.
fn reset_attendance(payment_id: u64) -> Vec<SqlStatement> {
    const OTHER_LIVE_LINKS: &str = r#"
            FROM attendance_payments other
            JOIN payments p ON p.id = other.payment_id
            WHERE other.attendance_id = a.id
            AND other.payment_id <> ?
            AND p.is_cancelled = FALSE"#;

    let update = SqlStatement::new(
        format!(
            r#"
        UPDATE attendance a
        SET a.payment_state = CASE
                WHEN EXISTS (SELECT 1 {OTHER_LIVE_LINKS}) THEN 'partial'
                ELSE 'unpaid'
            END,
            a.payment_id = (SELECT MAX(other.payment_id) {OTHER_LIVE_LINKS})
        WHERE a.id IN (SELECT attendance_id FROM attendance_payments WHERE payment_id = ?)
        "#
        ),
        vec![SqlValue::U64(payment_id); 3],
    );

    let unlink = SqlStatement::new(
        "DELETE FROM attendance_payments WHERE payment_id = ?",
        vec![SqlValue::U64(payment_id)],
    );

    vec![update, unlink]
}

fn link_payments(transaction: SqlValue, references: &[String]) -> SqlStatement {
    let sql = format!(
        "UPDATE payments SET engineer_transaction_id = {} WHERE reference IN ({}) AND engineer_transaction_id IS NULL",
        match transaction {
            SqlValue::String(_) => "(SELECT id FROM engineer_transactions WHERE reference = ?)",
            _ => "?",
        },
        placeholders(references.len()),
    );

    let mut values = Vec::with_capacity(references.len() + 1);
    values.push(transaction);
    values.extend(references.iter().cloned().map(SqlValue::String));

    SqlStatement::new(sql, values)
}

/// Transaction amount is rebuilt from its live payments so replays and
/// reversals never drift from the payments table.
fn recompute_engineer_amount(transaction_id: u64) -> SqlStatement {
    SqlStatement::new(
        r#"
        UPDATE engineer_transactions
        SET amount = (
            SELECT COALESCE(SUM(amount), 0)
            FROM payments
            WHERE engineer_transaction_id = ?
            AND is_cancelled = FALSE
        )
        WHERE id = ?
        "#,
        vec![SqlValue::U64(transaction_id), SqlValue::U64(transaction_id)],
    )
}

fn insert_engineer_transaction(t: &NewEngineerTransaction) -> Vec<SqlStatement> {
    let mut statements = vec![SqlStatement::new(
        r#"
        INSERT IGNORE INTO engineer_transactions
            (reference, site_id, engineer_id, amount, transaction_date, status)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
        vec![
            SqlValue::String(t.reference.clone()),
            SqlValue::U64(t.site_id),
            SqlValue::U64(t.engineer_id),
            SqlValue::Decimal(t.amount),
            SqlValue::Date(t.transaction_date),
            SqlValue::String(EngineerTransactionStatus::PendingSettlement.as_ref().to_string()),
        ],
    )];

    if !t.payment_references.is_empty() {
        statements.push(link_payments(
            SqlValue::String(t.reference.clone()),
            &t.payment_references,
        ));
    }

    statements
}

fn set_engineer_status(
    transaction_id: u64,
    status: EngineerTransactionStatus,
    settled_at: bool,
) -> SqlStatement {
    let sql = format!(
        "UPDATE engineer_transactions SET status = ?{} WHERE id = ? AND status = ?",
        if settled_at { ", settled_at = NOW()" } else { "" }
    );

    SqlStatement::new(
        sql,
        vec![
            SqlValue::String(status.as_ref().to_string()),
            SqlValue::U64(transaction_id),
            SqlValue::String(EngineerTransactionStatus::PendingSettlement.as_ref().to_string()),
        ],
    )
}

/// ===============================
/// Descriptor -> SQL
/// ===============================
pub fn build_statements(op: &OperationDescriptor) -> Vec<SqlStatement> {
    match op {
        OperationDescriptor::CreatePayment(p) => vec![insert_payment(p)],
        OperationDescriptor::MarkAttendance(m) => mark_attendance(m),
        OperationDescriptor::CreateEngineerTransaction(t) => insert_engineer_transaction(t),
        OperationDescriptor::TopUpEngineerTransaction {
            transaction_id,
            payment_references,
        } => {
            let mut statements = Vec::with_capacity(2);
            if !payment_references.is_empty() {
                statements.push(link_payments(
                    SqlValue::U64(*transaction_id),
                    payment_references,
                ));
            }
            statements.push(recompute_engineer_amount(*transaction_id));
            statements
        }
        OperationDescriptor::ResetAttendance { payment_id } => reset_attendance(*payment_id),
        OperationDescriptor::VoidPayment { payment_id } => vec![SqlStatement::new(
            "UPDATE payments SET is_cancelled = TRUE WHERE id = ?",
            vec![SqlValue::U64(*payment_id)],
        )],
        OperationDescriptor::CancelEngineerTransaction { transaction_id } => vec![
            set_engineer_status(*transaction_id, EngineerTransactionStatus::Cancelled, false),
        ],
        OperationDescriptor::ReduceEngineerTransaction { transaction_id } => {
            vec![recompute_engineer_amount(*transaction_id)]
        }
        OperationDescriptor::SettleEngineerTransaction { transaction_id } => vec![
            set_engineer_status(*transaction_id, EngineerTransactionStatus::Settled, true),
        ],
    }
}

/// ===============================
/// Execute a batch atomically
/// ===============================
pub async fn execute_batch(
    pool: &MySqlPool,
    ops: &[OperationDescriptor],
) -> Result<u64, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let mut affected = 0;

    for statement in ops.iter().flat_map(build_statements) {
        let mut query = sqlx::query(&statement.sql);

        for value in statement.values {
            query = match value {
                SqlValue::String(v) => query.bind(v),
                SqlValue::U64(v) => query.bind(v),
                SqlValue::Decimal(v) => query.bind(v),
                SqlValue::Date(v) => query.bind(v),
                SqlValue::Null => query.bind(None::<String>),
            };
        }

        affected += query.execute(&mut *tx).await?.rows_affected();
    }

    // Dropping `tx` on an early return rolls the whole batch back
    tx.commit().await?;
    Ok(affected)
}
