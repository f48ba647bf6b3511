//! Student-scoped endpoints: the balance ledger and the lesson history log.

use super::ApiState;
use crate::{
    core::{directory, ledger, scheduling},
    entities::{lesson_history, transaction, transaction::TransactionKind},
    errors::{Error, Result},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

/// Request body for recording a ledger transaction.
#[derive(Debug, Deserialize)]
pub(crate) struct TransactionRequest {
    amount: f64,
    kind: TransactionKind,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    entry_date: Option<chrono::NaiveDate>,
}

/// The persisted transaction plus the student's new cached balance.
#[derive(Debug, Serialize)]
pub(crate) struct TransactionResponse {
    transaction: transaction::Model,
    balance: f64,
}

pub(crate) async fn record_transaction(
    State(state): State<ApiState>,
    Path(student_id): Path<i64>,
    axum::Json(request): axum::Json<TransactionRequest>,
) -> Result<(StatusCode, axum::Json<TransactionResponse>)> {
    let (transaction, balance) = ledger::record_transaction(
        &state.db,
        student_id,
        request.amount,
        request.kind,
        request.description,
        request.entry_date,
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        axum::Json(TransactionResponse {
            transaction,
            balance,
        }),
    ))
}

pub(crate) async fn list_transactions(
    State(state): State<ApiState>,
    Path(student_id): Path<i64>,
) -> Result<axum::Json<Vec<transaction::Model>>> {
    directory::get_student(&state.db, student_id)
        .await?
        .ok_or(Error::StudentNotFound { id: student_id })?;
    let transactions = ledger::transactions_for_student(&state.db, student_id).await?;
    Ok(axum::Json(transactions))
}

/// Cached balance next to its recomputation from the log; the two are equal
/// unless the ledger invariant has been violated out of band.
#[derive(Debug, Serialize)]
pub(crate) struct BalanceReport {
    cached: f64,
    computed: f64,
}

pub(crate) async fn balance(
    State(state): State<ApiState>,
    Path(student_id): Path<i64>,
) -> Result<axum::Json<BalanceReport>> {
    let student = directory::get_student(&state.db, student_id)
        .await?
        .ok_or(Error::StudentNotFound { id: student_id })?;
    let computed = ledger::computed_balance(&state.db, student_id).await?;
    Ok(axum::Json(BalanceReport {
        cached: (student.balance * 100.0).round() / 100.0,
        computed,
    }))
}

pub(crate) async fn list_history(
    State(state): State<ApiState>,
    Path(student_id): Path<i64>,
) -> Result<axum::Json<Vec<lesson_history::Model>>> {
    directory::get_student(&state.db, student_id)
        .await?
        .ok_or(Error::StudentNotFound { id: student_id })?;
    let entries = scheduling::history_for_student(&state.db, student_id).await?;
    Ok(axum::Json(entries))
}

/// Request body for a manual history entry.
#[derive(Debug, Deserialize)]
pub(crate) struct ManualHistoryRequest {
    entry_date: chrono::NaiveDate,
    duration_minutes: i32,
    #[serde(default)]
    notes: Option<String>,
}

pub(crate) async fn record_manual_history(
    State(state): State<ApiState>,
    Path(student_id): Path<i64>,
    axum::Json(request): axum::Json<ManualHistoryRequest>,
) -> Result<(StatusCode, axum::Json<lesson_history::Model>)> {
    let entry = scheduling::record_manual_history(
        &state.db,
        student_id,
        request.entry_date,
        request.duration_minutes,
        request.notes,
    )
    .await?;
    Ok((StatusCode::CREATED, axum::Json(entry)))
}
