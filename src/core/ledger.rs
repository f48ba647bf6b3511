//! Balance ledger - append-only transaction log per student plus the cached
//! outstanding-balance projection.
//!
//! Every insert is paired with the matching balance mutation in the same
//! database transaction; the cached `students.balance` is therefore always
//! equal to the fold over the log (see [`computed_balance`]). Sign convention:
//! `invoice` increases the outstanding balance, `payment` and `discount`
//! decrease it; `payment` additionally stamps the student's last-payment date.

use crate::{
    core::directory,
    entities::{Transaction, transaction, transaction::TransactionKind},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, TransactionTrait, prelude::*};
use tracing::info;

/// Largest accepted transaction magnitude.
pub const MAX_AMOUNT: f64 = 99_999.99;

/// Validates a raw amount and normalizes it to a positive whole-cent magnitude.
///
/// Rejects non-finite values, amounts that round to zero, and magnitudes above
/// [`MAX_AMOUNT`]. The sign of the input is discarded; signedness lives in the
/// transaction kind.
pub(crate) fn normalize_amount(amount: f64) -> Result<f64> {
    if !amount.is_finite() {
        return Err(Error::Validation {
            message: format!("amount must be a finite number, got {amount}"),
        });
    }
    let magnitude = (amount.abs() * 100.0).round() / 100.0;
    if magnitude == 0.0 {
        return Err(Error::Validation {
            message: "amount must not be zero".to_string(),
        });
    }
    if magnitude > MAX_AMOUNT {
        return Err(Error::Validation {
            message: format!("amount {magnitude:.2} exceeds the maximum of {MAX_AMOUNT}"),
        });
    }
    Ok(magnitude)
}

/// Signed effect of a transaction on the outstanding balance.
const fn balance_delta(kind: TransactionKind, magnitude: f64) -> f64 {
    match kind {
        TransactionKind::Invoice => magnitude,
        TransactionKind::Payment | TransactionKind::Discount => -magnitude,
    }
}

/// Records a ledger transaction and updates the cached balance in one atomic unit.
///
/// Opens its own database transaction; use [`record_transaction_with`] to
/// compose the same unit into a larger transaction (the scheduler does this
/// when invoicing a completed lesson).
///
/// # Arguments
/// * `student_id` - Student the entry is booked against
/// * `amount` - Raw amount; validated and normalized to a positive magnitude
/// * `kind` - payment, invoice, or discount
/// * `description` - Optional free text; defaults to the kind label
/// * `entry_date` - Business date of the entry; defaults to today
///
/// # Returns
/// The persisted transaction and the student's new cached balance
pub async fn record_transaction(
    db: &DatabaseConnection,
    student_id: i64,
    amount: f64,
    kind: TransactionKind,
    description: Option<String>,
    entry_date: Option<Date>,
) -> Result<(transaction::Model, f64)> {
    // Validate before touching the database
    normalize_amount(amount)?;

    let txn = db.begin().await?;
    let (recorded, student) =
        record_transaction_with(&txn, student_id, amount, kind, description, entry_date).await?;
    txn.commit().await?;

    info!(
        student_id,
        transaction_id = recorded.id,
        kind = kind.as_str(),
        amount = recorded.amount,
        balance = student.balance,
        "transaction recorded"
    );
    Ok((recorded, student.balance))
}

/// The insert-plus-balance unit without transaction management.
///
/// Callers are responsible for wrapping this in a database transaction; an
/// error return must abort the whole unit or the cached balance diverges from
/// the log.
///
/// # Returns
/// The persisted transaction and the updated student model
pub async fn record_transaction_with<C>(
    db: &C,
    student_id: i64,
    amount: f64,
    kind: TransactionKind,
    description: Option<String>,
    entry_date: Option<Date>,
) -> Result<(transaction::Model, crate::entities::student::Model)>
where
    C: ConnectionTrait,
{
    let magnitude = normalize_amount(amount)?;
    let entry_date = entry_date.unwrap_or_else(|| chrono::Utc::now().date_naive());

    directory::get_student(db, student_id)
        .await?
        .ok_or(Error::StudentNotFound { id: student_id })?;

    let model = transaction::ActiveModel {
        student_id: Set(student_id),
        kind: Set(kind),
        amount: Set(magnitude),
        description: Set(description.unwrap_or_else(|| kind.as_str().to_string())),
        entry_date: Set(entry_date),
        recorded_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let recorded = model.insert(db).await?;

    // Payments stamp the last-payment date in the same statement as the balance
    let stamp = (kind == TransactionKind::Payment).then_some(entry_date);
    let student =
        directory::apply_balance_delta(db, student_id, balance_delta(kind, magnitude), stamp)
            .await?;

    Ok((recorded, student))
}

/// Retrieves all transactions for a student, newest first.
pub async fn transactions_for_student(
    db: &DatabaseConnection,
    student_id: i64,
) -> Result<Vec<transaction::Model>> {
    Transaction::find()
        .filter(transaction::Column::StudentId.eq(student_id))
        .order_by_desc(transaction::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Recomputes the outstanding balance from the transaction log.
///
/// Audit companion to the cached `students.balance`: the two are equal at all
/// times because every insert and its balance mutation share one database
/// transaction.
pub async fn computed_balance(db: &DatabaseConnection, student_id: i64) -> Result<f64> {
    directory::get_student(db, student_id)
        .await?
        .ok_or(Error::StudentNotFound { id: student_id })?;

    let rows = Transaction::find()
        .filter(transaction::Column::StudentId.eq(student_id))
        .order_by_asc(transaction::Column::Id)
        .all(db)
        .await?;

    let balance = rows
        .iter()
        .fold(0.0, |acc, row| acc + balance_delta(row.kind, row.amount));
    Ok((balance * 100.0).round() / 100.0)
}
