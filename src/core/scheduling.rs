//! Lesson scheduling - creation, rescheduling, status transitions, and deletion
//! of lesson bookings, plus the completion side effects that feed the history
//! log and the balance ledger.
//!
//! Every mutation runs the conflict check and the write inside one database
//! transaction; the partial unique slot indexes (see
//! [`crate::config::database::create_indexes`]) reject any racing writer that
//! slipped past the pre-check, surfaced as a [`Error::Conflict`]. The status
//! lifecycle is a single transition table consulted by [`update_lesson_status`]
//! rather than ad hoc conditionals at call sites: Scheduled and Confirmed may
//! move forward or be cancelled, Completed and Cancelled are terminal.

use crate::{
    core::{conflict, directory, ledger},
    entities::{
        Lesson, LessonHistory, lesson,
        lesson::{LessonKind, LessonStatus},
        lesson_history,
        transaction::TransactionKind,
    },
    errors::{Error, Result},
};
use sea_orm::{
    IntoActiveModel, QueryOrder, Set, SqlErr, TransactionTrait, prelude::*,
};
use serde::Deserialize;
use tracing::info;

/// Shortest bookable lesson in minutes.
pub const MIN_DURATION_MINUTES: i32 = 15;
/// Longest bookable lesson in minutes.
pub const MAX_DURATION_MINUTES: i32 = 480;

/// Request payload for scheduling a new lesson.
#[derive(Debug, Clone, Deserialize)]
pub struct NewLesson {
    /// Calendar date of the lesson
    pub lesson_date: Date,
    /// Start time of the lesson
    pub start_time: Time,
    /// Length in minutes, bounded 15-480
    pub duration_minutes: i32,
    /// Student taking the lesson
    pub student_id: i64,
    /// Instructor giving the lesson
    pub instructor_id: i64,
    /// Vehicle used, if any
    #[serde(default)]
    pub vehicle_id: Option<i64>,
    /// What kind of appointment this is
    pub kind: LessonKind,
    /// Free-text notes
    #[serde(default)]
    pub notes: Option<String>,
    /// Price invoiced on completion, if any
    #[serde(default)]
    pub price: Option<f64>,
}

/// Field changes for a reschedule request. Absent fields are left untouched;
/// `vehicle_id` distinguishes "unchanged" (absent) from "remove the vehicle"
/// (explicit null).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LessonChanges {
    /// New calendar date
    pub lesson_date: Option<Date>,
    /// New start time
    pub start_time: Option<Time>,
    /// New duration in minutes
    pub duration_minutes: Option<i32>,
    /// New instructor
    pub instructor_id: Option<i64>,
    /// New vehicle assignment; `Some(None)` removes the vehicle. In JSON, an
    /// absent field leaves the vehicle unchanged while an explicit null removes it.
    #[serde(deserialize_with = "deserialize_explicit_null")]
    pub vehicle_id: Option<Option<i64>>,
    /// New appointment kind
    pub kind: Option<LessonKind>,
    /// New notes
    pub notes: Option<String>,
    /// New price
    pub price: Option<f64>,
}

/// Maps a present-but-null field to `Some(None)`; absent fields fall back to
/// the `#[serde(default)]` of `None`.
fn deserialize_explicit_null<'de, D>(deserializer: D) -> std::result::Result<Option<Option<i64>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<i64>::deserialize(deserializer).map(Some)
}

/// Optional filters for lesson listings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LessonFilter {
    /// Only lessons on this date
    pub date: Option<Date>,
    /// Only lessons of this student
    pub student_id: Option<i64>,
    /// Only lessons of this instructor
    pub instructor_id: Option<i64>,
}

/// The lesson status transition table. Terminal statuses allow nothing;
/// same-status requests are handled as no-ops before this table is consulted.
const fn transition_allowed(from: LessonStatus, to: LessonStatus) -> bool {
    matches!(
        (from, to),
        (
            LessonStatus::Scheduled,
            LessonStatus::Confirmed | LessonStatus::Completed | LessonStatus::Cancelled
        ) | (
            LessonStatus::Confirmed,
            LessonStatus::Completed | LessonStatus::Cancelled
        )
    )
}

fn validate_duration(duration_minutes: i32) -> Result<()> {
    if !(MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&duration_minutes) {
        return Err(Error::Validation {
            message: format!(
                "duration must be between {MIN_DURATION_MINUTES} and {MAX_DURATION_MINUTES} minutes, got {duration_minutes}"
            ),
        });
    }
    Ok(())
}

/// Validates and cent-rounds a lesson price. Unlike ledger amounts a price of
/// zero is legal (free lesson); it simply produces no invoice on completion.
fn normalize_price(price: f64) -> Result<f64> {
    if !price.is_finite() {
        return Err(Error::Validation {
            message: format!("price must be a finite number, got {price}"),
        });
    }
    if price < 0.0 {
        return Err(Error::Validation {
            message: format!("price must not be negative, got {price}"),
        });
    }
    let rounded = (price * 100.0).round() / 100.0;
    if rounded > ledger::MAX_AMOUNT {
        return Err(Error::Validation {
            message: format!("price {rounded:.2} exceeds the maximum of {}", ledger::MAX_AMOUNT),
        });
    }
    Ok(rounded)
}

/// Maps a unique-index violation on the slot indexes to a conflict; anything
/// else stays a database error.
fn slot_taken_on_unique(err: DbErr) -> Error {
    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        Error::Conflict {
            message: "another lesson claimed the slot concurrently".to_string(),
        }
    } else {
        Error::Database(err)
    }
}

fn conflict_with(clashes: &[lesson::Model]) -> Error {
    let ids: Vec<String> = clashes.iter().map(|l| l.id.to_string()).collect();
    Error::Conflict {
        message: format!("slot already booked by lesson(s) {}", ids.join(", ")),
    }
}

async fn check_instructor_bookable<C>(db: &C, instructor_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    let instructor = directory::get_instructor(db, instructor_id)
        .await?
        .ok_or(Error::InstructorNotFound { id: instructor_id })?;
    if !instructor.is_active {
        return Err(Error::Validation {
            message: format!("instructor {instructor_id} is not active"),
        });
    }
    Ok(())
}

async fn check_vehicle_bookable<C>(db: &C, vehicle_id: i64) -> Result<()>
where
    C: ConnectionTrait,
{
    let vehicle = directory::get_vehicle(db, vehicle_id)
        .await?
        .ok_or(Error::VehicleNotFound { id: vehicle_id })?;
    if vehicle.status != crate::entities::vehicle::VehicleStatus::Available {
        return Err(Error::Validation {
            message: format!("vehicle {vehicle_id} is not available"),
        });
    }
    Ok(())
}

/// Schedules a new lesson.
///
/// Validates the duration and price bounds, that the student and instructor are
/// active and the vehicle (if any) is available, and that the slot is free for
/// both resources. The conflict check and the insert share one database
/// transaction; a racing writer that passes its own pre-check is rejected by
/// the unique slot indexes at commit and reported as a conflict.
pub async fn create_lesson(db: &DatabaseConnection, new: NewLesson) -> Result<lesson::Model> {
    validate_duration(new.duration_minutes)?;
    let price = new.price.map(normalize_price).transpose()?;

    let txn = db.begin().await?;

    let student = directory::get_student(&txn, new.student_id)
        .await?
        .ok_or(Error::StudentNotFound { id: new.student_id })?;
    if !student.is_active {
        return Err(Error::Validation {
            message: format!("student {} is not active", new.student_id),
        });
    }
    check_instructor_bookable(&txn, new.instructor_id).await?;
    if let Some(vehicle_id) = new.vehicle_id {
        check_vehicle_bookable(&txn, vehicle_id).await?;
    }

    let clashes = conflict::find_clashes(
        &txn,
        new.lesson_date,
        new.start_time,
        new.instructor_id,
        new.vehicle_id,
        None,
    )
    .await?;
    if !clashes.is_empty() {
        return Err(conflict_with(&clashes));
    }

    let now = chrono::Utc::now();
    let model = lesson::ActiveModel {
        lesson_date: Set(new.lesson_date),
        start_time: Set(new.start_time),
        duration_minutes: Set(new.duration_minutes),
        student_id: Set(new.student_id),
        instructor_id: Set(new.instructor_id),
        vehicle_id: Set(new.vehicle_id),
        kind: Set(new.kind),
        status: Set(LessonStatus::Scheduled),
        notes: Set(new.notes),
        price: Set(price),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let created = model.insert(&txn).await.map_err(slot_taken_on_unique)?;
    txn.commit().await.map_err(slot_taken_on_unique)?;

    info!(
        lesson_id = created.id,
        student_id = created.student_id,
        instructor_id = created.instructor_id,
        date = %created.lesson_date,
        time = %created.start_time,
        "lesson scheduled"
    );
    Ok(created)
}

/// Reschedules an existing lesson.
///
/// Only non-terminal lessons can be rescheduled. When any of date, time,
/// instructor, or vehicle change, the conflict check is re-run against the new
/// tuple with the lesson itself excluded; a changed instructor or vehicle is
/// re-validated as bookable. Duration, kind, notes, and price are routine edit
/// fields and need no conflict check.
pub async fn reschedule_lesson(
    db: &DatabaseConnection,
    lesson_id: i64,
    changes: LessonChanges,
) -> Result<lesson::Model> {
    let txn = db.begin().await?;

    let current = Lesson::find_by_id(lesson_id)
        .one(&txn)
        .await?
        .ok_or(Error::LessonNotFound { id: lesson_id })?;
    if current.status.is_terminal() {
        return Err(Error::Validation {
            message: format!(
                "cannot reschedule a {} lesson",
                current.status.as_str()
            ),
        });
    }

    let new_date = changes.lesson_date.unwrap_or(current.lesson_date);
    let new_time = changes.start_time.unwrap_or(current.start_time);
    let new_instructor = changes.instructor_id.unwrap_or(current.instructor_id);
    let new_vehicle = changes.vehicle_id.unwrap_or(current.vehicle_id);

    if let Some(duration) = changes.duration_minutes {
        validate_duration(duration)?;
    }
    let new_price = changes.price.map(normalize_price).transpose()?;

    if new_instructor != current.instructor_id {
        check_instructor_bookable(&txn, new_instructor).await?;
    }
    if new_vehicle != current.vehicle_id {
        if let Some(vehicle_id) = new_vehicle {
            check_vehicle_bookable(&txn, vehicle_id).await?;
        }
    }

    let slot_changed = new_date != current.lesson_date
        || new_time != current.start_time
        || new_instructor != current.instructor_id
        || new_vehicle != current.vehicle_id;
    if slot_changed {
        let clashes = conflict::find_clashes(
            &txn,
            new_date,
            new_time,
            new_instructor,
            new_vehicle,
            Some(lesson_id),
        )
        .await?;
        if !clashes.is_empty() {
            return Err(conflict_with(&clashes));
        }
    }

    let mut active = current.into_active_model();
    active.lesson_date = Set(new_date);
    active.start_time = Set(new_time);
    active.instructor_id = Set(new_instructor);
    active.vehicle_id = Set(new_vehicle);
    if let Some(duration) = changes.duration_minutes {
        active.duration_minutes = Set(duration);
    }
    if let Some(kind) = changes.kind {
        active.kind = Set(kind);
    }
    if let Some(notes) = changes.notes {
        active.notes = Set(Some(notes));
    }
    if let Some(price) = new_price {
        active.price = Set(Some(price));
    }
    active.updated_at = Set(chrono::Utc::now());

    let updated = active.update(&txn).await.map_err(slot_taken_on_unique)?;
    txn.commit().await.map_err(slot_taken_on_unique)?;

    info!(lesson_id, "lesson rescheduled");
    Ok(updated)
}

/// Applies a status transition to a lesson.
///
/// A request for the status the lesson already has is an idempotent no-op
/// returning the unchanged row; in particular, re-completing a completed lesson
/// creates no second history entry and no second invoice. Transitions not in
/// the table are rejected.
///
/// Moving into `Completed` performs the three-way atomic unit: status write,
/// history-entry insert, and (when the lesson carries a positive price) the
/// invoice transaction plus balance update, all in one database transaction.
pub async fn update_lesson_status(
    db: &DatabaseConnection,
    lesson_id: i64,
    new_status: LessonStatus,
) -> Result<lesson::Model> {
    let txn = db.begin().await?;

    let current = Lesson::find_by_id(lesson_id)
        .one(&txn)
        .await?
        .ok_or(Error::LessonNotFound { id: lesson_id })?;

    if current.status == new_status {
        return Ok(current);
    }
    if !transition_allowed(current.status, new_status) {
        return Err(Error::InvalidTransition {
            from: current.status.as_str().to_string(),
            to: new_status.as_str().to_string(),
        });
    }

    let snapshot = current.clone();
    let mut active = current.into_active_model();
    active.status = Set(new_status);
    active.updated_at = Set(chrono::Utc::now());
    let updated = active.update(&txn).await?;

    if new_status == LessonStatus::Completed {
        let entry = lesson_history::ActiveModel {
            student_id: Set(snapshot.student_id),
            lesson_id: Set(Some(snapshot.id)),
            entry_date: Set(snapshot.lesson_date),
            duration_minutes: Set(snapshot.duration_minutes),
            notes: Set(snapshot.notes.clone()),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        };
        entry.insert(&txn).await.map_err(|err| {
            if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                Error::Integrity {
                    message: format!("lesson {lesson_id} already has a history entry"),
                }
            } else {
                Error::Database(err)
            }
        })?;

        if let Some(price) = snapshot.price {
            if price > 0.0 {
                ledger::record_transaction_with(
                    &txn,
                    snapshot.student_id,
                    price,
                    TransactionKind::Invoice,
                    Some(completion_description(&snapshot)),
                    Some(snapshot.lesson_date),
                )
                .await?;
            }
        }
    }

    txn.commit().await?;

    info!(
        lesson_id,
        status = new_status.as_str(),
        "lesson status updated"
    );
    Ok(updated)
}

/// Invoice line for a completed lesson.
fn completion_description(lesson: &lesson::Model) -> String {
    let label = match lesson.kind {
        LessonKind::Regular => "Driving lesson",
        LessonKind::Exam => "Exam",
        LessonKind::Intake => "Intake",
        LessonKind::Other => "Appointment",
    };
    format!(
        "{label} on {} ({} min)",
        lesson.lesson_date, lesson.duration_minutes
    )
}

/// Deletes a lesson.
///
/// Completed lessons are part of permanent history and can never be deleted;
/// confirmed lessons in the past are kept as accountability for no-shows.
/// Everything else is removed outright.
///
/// # Returns
/// The removed lesson model
pub async fn delete_lesson(db: &DatabaseConnection, lesson_id: i64) -> Result<lesson::Model> {
    let lesson = Lesson::find_by_id(lesson_id)
        .one(db)
        .await?
        .ok_or(Error::LessonNotFound { id: lesson_id })?;

    match lesson.status {
        LessonStatus::Completed => {
            return Err(Error::Integrity {
                message: format!("lesson {lesson_id} is completed and part of permanent history"),
            });
        }
        LessonStatus::Confirmed if lesson.lesson_date < chrono::Utc::now().date_naive() => {
            return Err(Error::Validation {
                message: format!("cannot delete confirmed lesson {lesson_id} with a past date"),
            });
        }
        _ => {}
    }

    let removed = lesson.clone();
    lesson.delete(db).await?;
    info!(lesson_id, "lesson deleted");
    Ok(removed)
}

/// Finds a lesson by id, returning None if absent.
pub async fn get_lesson(db: &DatabaseConnection, lesson_id: i64) -> Result<Option<lesson::Model>> {
    Lesson::find_by_id(lesson_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Lists lessons matching the filter, ordered by date, start time, and id.
pub async fn list_lessons(
    db: &DatabaseConnection,
    filter: &LessonFilter,
) -> Result<Vec<lesson::Model>> {
    let mut query = Lesson::find();
    if let Some(date) = filter.date {
        query = query.filter(lesson::Column::LessonDate.eq(date));
    }
    if let Some(student_id) = filter.student_id {
        query = query.filter(lesson::Column::StudentId.eq(student_id));
    }
    if let Some(instructor_id) = filter.instructor_id {
        query = query.filter(lesson::Column::InstructorId.eq(instructor_id));
    }
    query
        .order_by_asc(lesson::Column::LessonDate)
        .order_by_asc(lesson::Column::StartTime)
        .order_by_asc(lesson::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Retrieves all history entries for a student, newest first.
pub async fn history_for_student(
    db: &DatabaseConnection,
    student_id: i64,
) -> Result<Vec<lesson_history::Model>> {
    LessonHistory::find()
        .filter(lesson_history::Column::StudentId.eq(student_id))
        .order_by_desc(lesson_history::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Records a manual history entry with no originating lesson, e.g. lessons
/// taken at another school or paper records being digitized.
pub async fn record_manual_history(
    db: &DatabaseConnection,
    student_id: i64,
    entry_date: Date,
    duration_minutes: i32,
    notes: Option<String>,
) -> Result<lesson_history::Model> {
    validate_duration(duration_minutes)?;
    directory::get_student(db, student_id)
        .await?
        .ok_or(Error::StudentNotFound { id: student_id })?;

    let entry = lesson_history::ActiveModel {
        student_id: Set(student_id),
        lesson_id: Set(None),
        entry_date: Set(entry_date),
        duration_minutes: Set(duration_minutes),
        notes: Set(notes),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    entry.insert(db).await.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;
    use crate::entities::{Transaction, transaction, vehicle::VehicleStatus};
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_create_lesson_happy_path() -> Result<()> {
        let (db, roster) = setup_with_roster().await?;
        let (date, time) = test_slot();

        let lesson = create_test_lesson(&db, &roster, date, time).await?;
        assert_eq!(lesson.status, LessonStatus::Scheduled);
        assert_eq!(lesson.lesson_date, date);
        assert_eq!(lesson.start_time, time);
        assert_eq!(lesson.instructor_id, roster.instructor.id);
        assert_eq!(lesson.vehicle_id, Some(roster.vehicle.id));

        Ok(())
    }

    #[tokio::test]
    async fn test_instructor_clash_rejected_even_with_other_vehicle() -> Result<()> {
        let (db, roster) = setup_with_roster().await?;
        let (date, time) = test_slot();
        let other_vehicle = create_test_vehicle(&db, "Golf 2", VehicleStatus::Available).await?;

        create_test_lesson(&db, &roster, date, time).await?;

        // Same instructor, different vehicle
        let result = create_lesson(
            &db,
            NewLesson {
                vehicle_id: Some(other_vehicle.id),
                ..new_lesson(&roster, date, time)
            },
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::Conflict { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_vehicle_clash_rejected_even_with_other_instructor() -> Result<()> {
        let (db, roster) = setup_with_roster().await?;
        let (date, time) = test_slot();
        let other_instructor = create_test_instructor(&db, "Carla").await?;

        create_test_lesson(&db, &roster, date, time).await?;

        // Different instructor, same vehicle
        let result = create_lesson(
            &db,
            NewLesson {
                instructor_id: other_instructor.id,
                ..new_lesson(&roster, date, time)
            },
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::Conflict { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_lessons_without_vehicles_share_a_slot() -> Result<()> {
        let (db, roster) = setup_with_roster().await?;
        let (date, time) = test_slot();
        let other_instructor = create_test_instructor(&db, "Carla").await?;

        // Two theory lessons, no vehicle, different instructors, same slot
        create_lesson(
            &db,
            NewLesson {
                vehicle_id: None,
                ..new_lesson(&roster, date, time)
            },
        )
        .await?;
        create_lesson(
            &db,
            NewLesson {
                instructor_id: other_instructor.id,
                vehicle_id: None,
                ..new_lesson(&roster, date, time)
            },
        )
        .await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_create_lesson_validation() -> Result<()> {
        let (db, roster) = setup_with_roster().await?;
        let (date, time) = test_slot();

        // Duration bounds
        for duration in [0, 14, 481] {
            let result = create_lesson(
                &db,
                NewLesson {
                    duration_minutes: duration,
                    ..new_lesson(&roster, date, time)
                },
            )
            .await;
            assert!(
                matches!(result.unwrap_err(), Error::Validation { .. }),
                "duration {duration} should be rejected"
            );
        }

        // Price bounds
        for price in [-1.0, f64::NAN, 100_000.0] {
            let result = create_lesson(
                &db,
                NewLesson {
                    price: Some(price),
                    ..new_lesson(&roster, date, time)
                },
            )
            .await;
            assert!(
                matches!(result.unwrap_err(), Error::Validation { .. }),
                "price {price} should be rejected"
            );
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_create_lesson_checks_references() -> Result<()> {
        let (db, roster) = setup_with_roster().await?;
        let (date, time) = test_slot();

        let result = create_lesson(
            &db,
            NewLesson {
                student_id: 999,
                ..new_lesson(&roster, date, time)
            },
        )
        .await;
        assert!(matches!(
            result.unwrap_err(),
            Error::StudentNotFound { id: 999 }
        ));

        let result = create_lesson(
            &db,
            NewLesson {
                instructor_id: 999,
                ..new_lesson(&roster, date, time)
            },
        )
        .await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InstructorNotFound { id: 999 }
        ));

        let result = create_lesson(
            &db,
            NewLesson {
                vehicle_id: Some(999),
                ..new_lesson(&roster, date, time)
            },
        )
        .await;
        assert!(matches!(
            result.unwrap_err(),
            Error::VehicleNotFound { id: 999 }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_create_lesson_rejects_unbookable_resources() -> Result<()> {
        let (db, roster) = setup_with_roster().await?;
        let (date, time) = test_slot();

        let inactive_student = create_inactive_student(&db, "Ivan").await?;
        let result = create_lesson(
            &db,
            NewLesson {
                student_id: inactive_student.id,
                ..new_lesson(&roster, date, time)
            },
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        let in_shop = create_test_vehicle(&db, "Golf 9", VehicleStatus::Maintenance).await?;
        let result = create_lesson(
            &db,
            NewLesson {
                vehicle_id: Some(in_shop.id),
                ..new_lesson(&roster, date, time)
            },
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_status_transitions_follow_the_table() -> Result<()> {
        let (db, roster) = setup_with_roster().await?;
        let (date, time) = test_slot();

        let lesson = create_test_lesson(&db, &roster, date, time).await?;
        let confirmed = update_lesson_status(&db, lesson.id, LessonStatus::Confirmed).await?;
        assert_eq!(confirmed.status, LessonStatus::Confirmed);

        // Backwards is never allowed
        let result = update_lesson_status(&db, lesson.id, LessonStatus::Scheduled).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidTransition { .. }
        ));

        let completed = update_lesson_status(&db, lesson.id, LessonStatus::Completed).await?;
        assert_eq!(completed.status, LessonStatus::Completed);

        // Nothing leaves a terminal status
        for target in [
            LessonStatus::Scheduled,
            LessonStatus::Confirmed,
            LessonStatus::Cancelled,
        ] {
            let result = update_lesson_status(&db, lesson.id, target).await;
            assert!(
                matches!(result.unwrap_err(), Error::InvalidTransition { .. }),
                "completed -> {} should be rejected",
                target.as_str()
            );
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_cancelled_is_terminal() -> Result<()> {
        let (db, roster) = setup_with_roster().await?;
        let (date, time) = test_slot();

        let lesson = create_test_lesson(&db, &roster, date, time).await?;
        update_lesson_status(&db, lesson.id, LessonStatus::Cancelled).await?;

        let result = update_lesson_status(&db, lesson.id, LessonStatus::Confirmed).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::InvalidTransition { .. }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_lesson_is_not_found() -> Result<()> {
        let db = setup_test_db().await?;

        let result = update_lesson_status(&db, 999, LessonStatus::Confirmed).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::LessonNotFound { id: 999 }
        ));

        let result = reschedule_lesson(&db, 999, LessonChanges::default()).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::LessonNotFound { id: 999 }
        ));

        let result = delete_lesson(&db, 999).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::LessonNotFound { id: 999 }
        ));

        Ok(())
    }

    #[tokio::test]
    async fn test_completion_records_history_and_invoice() -> Result<()> {
        let (db, roster) = setup_with_roster().await?;
        let (date, time) = test_slot();

        let lesson = create_lesson(
            &db,
            NewLesson {
                price: Some(45.0),
                notes: Some("highway merging".to_string()),
                ..new_lesson(&roster, date, time)
            },
        )
        .await?;
        update_lesson_status(&db, lesson.id, LessonStatus::Completed).await?;

        let history = history_for_student(&db, roster.student.id).await?;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].lesson_id, Some(lesson.id));
        assert_eq!(history[0].entry_date, date);
        assert_eq!(history[0].duration_minutes, lesson.duration_minutes);
        assert_eq!(history[0].notes.as_deref(), Some("highway merging"));

        let transactions = Transaction::find()
            .filter(transaction::Column::StudentId.eq(roster.student.id))
            .all(&db)
            .await?;
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].kind, TransactionKind::Invoice);
        assert_eq!(transactions[0].amount, 45.0);
        assert_eq!(transactions[0].entry_date, date);

        let student = crate::core::directory::get_student(&db, roster.student.id)
            .await?
            .unwrap();
        assert_eq!(student.balance, 45.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_completion_is_idempotent() -> Result<()> {
        let (db, roster) = setup_with_roster().await?;
        let (date, time) = test_slot();

        let lesson = create_lesson(
            &db,
            NewLesson {
                price: Some(45.0),
                ..new_lesson(&roster, date, time)
            },
        )
        .await?;
        update_lesson_status(&db, lesson.id, LessonStatus::Completed).await?;

        // Second completion: no-op, no duplicate side effects
        let again = update_lesson_status(&db, lesson.id, LessonStatus::Completed).await?;
        assert_eq!(again.status, LessonStatus::Completed);

        let history = history_for_student(&db, roster.student.id).await?;
        assert_eq!(history.len(), 1);
        let transactions = crate::core::ledger::transactions_for_student(&db, roster.student.id)
            .await?;
        assert_eq!(transactions.len(), 1);
        let student = crate::core::directory::get_student(&db, roster.student.id)
            .await?
            .unwrap();
        assert_eq!(student.balance, 45.0);

        Ok(())
    }

    #[tokio::test]
    async fn test_completion_without_price_skips_invoice() -> Result<()> {
        let (db, roster) = setup_with_roster().await?;
        let (date, time) = test_slot();

        let lesson = create_test_lesson(&db, &roster, date, time).await?;
        assert_eq!(lesson.price, None);
        update_lesson_status(&db, lesson.id, LessonStatus::Completed).await?;

        let history = history_for_student(&db, roster.student.id).await?;
        assert_eq!(history.len(), 1);
        let transactions = crate::core::ledger::transactions_for_student(&db, roster.student.id)
            .await?;
        assert!(transactions.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_completion_with_zero_price_skips_invoice() -> Result<()> {
        let (db, roster) = setup_with_roster().await?;
        let (date, time) = test_slot();

        let lesson = create_lesson(
            &db,
            NewLesson {
                price: Some(0.0),
                ..new_lesson(&roster, date, time)
            },
        )
        .await?;
        update_lesson_status(&db, lesson.id, LessonStatus::Completed).await?;

        let transactions = crate::core::ledger::transactions_for_student(&db, roster.student.id)
            .await?;
        assert!(transactions.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_reschedule_moves_the_lesson() -> Result<()> {
        let (db, roster) = setup_with_roster().await?;
        let (date, time) = test_slot();

        let lesson = create_test_lesson(&db, &roster, date, time).await?;
        let new_time = chrono::NaiveTime::from_hms_opt(11, 0, 0).unwrap();
        let moved = reschedule_lesson(
            &db,
            lesson.id,
            LessonChanges {
                start_time: Some(new_time),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(moved.start_time, new_time);

        // Old slot is free again
        let clash = conflict::has_conflict(
            &db,
            date,
            time,
            roster.instructor.id,
            Some(roster.vehicle.id),
            None,
        )
        .await?;
        assert!(!clash);

        Ok(())
    }

    #[tokio::test]
    async fn test_reschedule_onto_own_slot_succeeds() -> Result<()> {
        let (db, roster) = setup_with_roster().await?;
        let (date, time) = test_slot();

        let lesson = create_test_lesson(&db, &roster, date, time).await?;

        // Re-submitting the same slot must not clash with itself
        let unchanged = reschedule_lesson(
            &db,
            lesson.id,
            LessonChanges {
                lesson_date: Some(date),
                start_time: Some(time),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(unchanged.start_time, time);

        Ok(())
    }

    #[tokio::test]
    async fn test_reschedule_onto_taken_slot_rejected() -> Result<()> {
        let (db, roster) = setup_with_roster().await?;
        let (date, time) = test_slot();
        let later = chrono::NaiveTime::from_hms_opt(11, 0, 0).unwrap();

        create_test_lesson(&db, &roster, date, time).await?;
        let movable = create_test_lesson(&db, &roster, date, later).await?;

        let result = reschedule_lesson(
            &db,
            movable.id,
            LessonChanges {
                start_time: Some(time),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::Conflict { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_reschedule_terminal_lesson_rejected() -> Result<()> {
        let (db, roster) = setup_with_roster().await?;
        let (date, time) = test_slot();

        let lesson = create_test_lesson(&db, &roster, date, time).await?;
        update_lesson_status(&db, lesson.id, LessonStatus::Cancelled).await?;

        let result = reschedule_lesson(
            &db,
            lesson.id,
            LessonChanges {
                start_time: chrono::NaiveTime::from_hms_opt(11, 0, 0),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_reschedule_validates_new_resources() -> Result<()> {
        let (db, roster) = setup_with_roster().await?;
        let (date, time) = test_slot();
        let in_shop = create_test_vehicle(&db, "Golf 9", VehicleStatus::Maintenance).await?;

        let lesson = create_test_lesson(&db, &roster, date, time).await?;

        let result = reschedule_lesson(
            &db,
            lesson.id,
            LessonChanges {
                vehicle_id: Some(Some(in_shop.id)),
                ..Default::default()
            },
        )
        .await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        // Removing the vehicle outright is fine
        let without = reschedule_lesson(
            &db,
            lesson.id,
            LessonChanges {
                vehicle_id: Some(None),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(without.vehicle_id, None);

        Ok(())
    }

    #[tokio::test]
    async fn test_delete_guards() -> Result<()> {
        let (db, roster) = setup_with_roster().await?;
        let today = chrono::Utc::now().date_naive();
        let yesterday = today - chrono::Duration::days(1);
        let tomorrow = today + chrono::Duration::days(1);
        let time = chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap();

        // Completed lessons are immutable history
        let completed = create_test_lesson(&db, &roster, tomorrow, time).await?;
        update_lesson_status(&db, completed.id, LessonStatus::Completed).await?;
        let result = delete_lesson(&db, completed.id).await;
        assert!(matches!(result.unwrap_err(), Error::Integrity { .. }));

        // Confirmed lessons in the past document no-shows
        let no_show = create_lesson(
            &db,
            NewLesson {
                vehicle_id: None,
                ..new_lesson(&roster, yesterday, time)
            },
        )
        .await?;
        update_lesson_status(&db, no_show.id, LessonStatus::Confirmed).await?;
        let result = delete_lesson(&db, no_show.id).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        // A merely scheduled lesson in the past is deletable
        let later = chrono::NaiveTime::from_hms_opt(11, 0, 0).unwrap();
        let stale = create_lesson(
            &db,
            NewLesson {
                vehicle_id: None,
                ..new_lesson(&roster, yesterday, later)
            },
        )
        .await?;
        let removed = delete_lesson(&db, stale.id).await?;
        assert_eq!(removed.id, stale.id);
        assert!(get_lesson(&db, stale.id).await?.is_none());

        // A future confirmed lesson is deletable
        let upcoming = create_lesson(
            &db,
            NewLesson {
                vehicle_id: None,
                ..new_lesson(&roster, tomorrow, later)
            },
        )
        .await?;
        update_lesson_status(&db, upcoming.id, LessonStatus::Confirmed).await?;
        delete_lesson(&db, upcoming.id).await?;

        Ok(())
    }

    #[tokio::test]
    async fn test_list_lessons_filters_and_ordering() -> Result<()> {
        let (db, roster) = setup_with_roster().await?;
        let day1 = chrono::NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let day2 = chrono::NaiveDate::from_ymd_opt(2025, 3, 11).unwrap();
        let nine = chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        let eleven = chrono::NaiveTime::from_hms_opt(11, 0, 0).unwrap();

        let b = create_test_lesson(&db, &roster, day1, eleven).await?;
        let a = create_test_lesson(&db, &roster, day1, nine).await?;
        let c = create_test_lesson(&db, &roster, day2, nine).await?;

        let all = list_lessons(&db, &LessonFilter::default()).await?;
        assert_eq!(
            all.iter().map(|l| l.id).collect::<Vec<_>>(),
            vec![a.id, b.id, c.id]
        );

        let day1_only = list_lessons(
            &db,
            &LessonFilter {
                date: Some(day1),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(day1_only.len(), 2);

        let by_student = list_lessons(
            &db,
            &LessonFilter {
                student_id: Some(roster.student.id),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(by_student.len(), 3);

        let none = list_lessons(
            &db,
            &LessonFilter {
                instructor_id: Some(999),
                ..Default::default()
            },
        )
        .await?;
        assert!(none.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn test_manual_history_entries() -> Result<()> {
        let (db, student) = setup_with_student().await?;
        let date = chrono::NaiveDate::from_ymd_opt(2024, 11, 2).unwrap();

        let entry = record_manual_history(
            &db,
            student.id,
            date,
            90,
            Some("transferred from previous school".to_string()),
        )
        .await?;
        assert_eq!(entry.lesson_id, None);
        assert_eq!(entry.entry_date, date);

        let result = record_manual_history(&db, 999, date, 90, None).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::StudentNotFound { id: 999 }
        ));

        let result = record_manual_history(&db, student.id, date, 5, None).await;
        assert!(matches!(result.unwrap_err(), Error::Validation { .. }));

        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_creates_book_at_most_once() -> Result<()> {
        // File-backed database so the pool's connections share real state
        let path = std::env::temp_dir().join(format!(
            "drivedesk-storm-{}.sqlite",
            std::process::id()
        ));
        std::fs::remove_file(&path).ok();
        let url = format!("sqlite://{}?mode=rwc", path.display());
        let db = sea_orm::Database::connect(&url).await?;
        crate::config::database::create_tables(&db).await?;
        crate::config::database::create_indexes(&db).await?;

        let roster = create_test_roster(&db).await?;
        let (date, time) = test_slot();

        let mut students = Vec::new();
        for i in 0..6 {
            students.push(create_test_student(&db, &format!("Student {i}")).await?);
        }

        let mut handles = Vec::new();
        for student in &students {
            let db = db.clone();
            let request = NewLesson {
                student_id: student.id,
                ..new_lesson(&roster, date, time)
            };
            handles.push(tokio::spawn(
                async move { create_lesson(&db, request).await },
            ));
        }

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                // Losers surface as conflicts whether the pre-check or the
                // unique index caught them
                Err(e) => assert_eq!(e.kind(), "conflict", "unexpected loser error: {e}"),
            }
        }
        assert_eq!(successes, 1, "exactly one racing create may win the slot");

        let booked = list_lessons(
            &db,
            &LessonFilter {
                date: Some(date),
                instructor_id: Some(roster.instructor.id),
                ..Default::default()
            },
        )
        .await?;
        assert_eq!(booked.len(), 1);

        drop(db);
        std::fs::remove_file(&path).ok();
        Ok(())
    }
}
