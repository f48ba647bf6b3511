//! Resource directory - read-only lookups over the reference entities plus the
//! single mutation the ledger is allowed: the atomic student-balance update.
//!
//! Students, instructors, and vehicles are managed outside this service. The
//! scheduler consults this module to decide whether a resource may be booked;
//! the ledger uses [`apply_balance_delta`] to keep the cached balance in step
//! with the transaction log. All functions are generic over [`ConnectionTrait`]
//! so they compose into the callers' database transactions.

use crate::{
    entities::{Instructor, Student, Vehicle, instructor, student, vehicle},
    errors::{Error, Result},
};
use sea_orm::prelude::*;

/// Finds a student by id, returning None if absent.
pub async fn get_student<C>(db: &C, student_id: i64) -> Result<Option<student::Model>>
where
    C: ConnectionTrait,
{
    Student::find_by_id(student_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds an instructor by id, returning None if absent.
pub async fn get_instructor<C>(db: &C, instructor_id: i64) -> Result<Option<instructor::Model>>
where
    C: ConnectionTrait,
{
    Instructor::find_by_id(instructor_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds a vehicle by id, returning None if absent.
pub async fn get_vehicle<C>(db: &C, vehicle_id: i64) -> Result<Option<vehicle::Model>>
where
    C: ConnectionTrait,
{
    Vehicle::find_by_id(vehicle_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Whether the student exists and is currently enrolled.
pub async fn is_student_active<C>(db: &C, student_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    Ok(get_student(db, student_id)
        .await?
        .is_some_and(|s| s.is_active))
}

/// Whether the instructor exists and currently teaches.
pub async fn is_instructor_active<C>(db: &C, instructor_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    Ok(get_instructor(db, instructor_id)
        .await?
        .is_some_and(|i| i.is_active))
}

/// Whether the vehicle exists and is in bookable condition.
pub async fn is_vehicle_available<C>(db: &C, vehicle_id: i64) -> Result<bool>
where
    C: ConnectionTrait,
{
    Ok(get_vehicle(db, vehicle_id)
        .await?
        .is_some_and(|v| v.status == vehicle::VehicleStatus::Available))
}

/// Atomically adds a delta to the student's cached balance, optionally stamping
/// the last-payment date.
///
/// The update is a single SQL statement (`balance = balance + delta`), never a
/// read-modify-write, so concurrent ledger inserts cannot lose each other's
/// updates. Callers run this inside the same database transaction as the
/// transaction-row insert the delta reflects.
///
/// # Returns
/// The updated student model
pub async fn apply_balance_delta<C>(
    db: &C,
    student_id: i64,
    delta: f64,
    last_payment_date: Option<Date>,
) -> Result<student::Model>
where
    C: ConnectionTrait,
{
    use sea_orm::sea_query::Expr;

    // First verify the student exists
    Student::find_by_id(student_id)
        .one(db)
        .await?
        .ok_or(Error::StudentNotFound { id: student_id })?;

    let mut update = Student::update_many().col_expr(
        student::Column::Balance,
        Expr::col(student::Column::Balance).add(delta),
    );
    if let Some(date) = last_payment_date {
        update = update.col_expr(student::Column::LastPaymentDate, Expr::value(date));
    }
    update
        .filter(student::Column::Id.eq(student_id))
        .exec(db)
        .await?;

    // Return the updated student
    Student::find_by_id(student_id)
        .one(db)
        .await?
        .ok_or(Error::StudentNotFound { id: student_id })
}
