//! Conflict checker - decides whether a proposed slot clashes with an existing
//! booking of the same instructor or vehicle.
//!
//! The conflict granularity is exact (date, start-time) equality, not interval
//! overlap: two lessons starting at different times never clash even when their
//! durations would overlap on a wall clock. Cancelled lessons free their slot
//! and are never counted. The check is read-only and safe to call
//! speculatively; the scheduler re-runs it inside its own database transaction
//! before every write, with the partial unique indexes as the final arbiter
//! against racing writers.

use crate::{
    entities::{Lesson, lesson, lesson::LessonStatus},
    errors::Result,
};
use sea_orm::{Condition, QueryOrder, prelude::*};

/// Returns all non-cancelled lessons occupying the given slot with the same
/// instructor or, when `vehicle_id` is given, the same vehicle.
///
/// `exclude_lesson_id` removes one lesson from consideration, used when
/// checking a reschedule of an existing lesson against itself.
pub async fn find_clashes<C>(
    db: &C,
    lesson_date: Date,
    start_time: Time,
    instructor_id: i64,
    vehicle_id: Option<i64>,
    exclude_lesson_id: Option<i64>,
) -> Result<Vec<lesson::Model>>
where
    C: ConnectionTrait,
{
    let mut resource = Condition::any().add(lesson::Column::InstructorId.eq(instructor_id));
    if let Some(vehicle_id) = vehicle_id {
        resource = resource.add(lesson::Column::VehicleId.eq(vehicle_id));
    }

    let mut query = Lesson::find()
        .filter(lesson::Column::LessonDate.eq(lesson_date))
        .filter(lesson::Column::StartTime.eq(start_time))
        .filter(lesson::Column::Status.ne(LessonStatus::Cancelled))
        .filter(resource);

    if let Some(exclude_id) = exclude_lesson_id {
        query = query.filter(lesson::Column::Id.ne(exclude_id));
    }

    query
        .order_by_asc(lesson::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Convenience wrapper: whether any clashing lesson exists for the slot.
pub async fn has_conflict<C>(
    db: &C,
    lesson_date: Date,
    start_time: Time,
    instructor_id: i64,
    vehicle_id: Option<i64>,
    exclude_lesson_id: Option<i64>,
) -> Result<bool>
where
    C: ConnectionTrait,
{
    let clashes = find_clashes(
        db,
        lesson_date,
        start_time,
        instructor_id,
        vehicle_id,
        exclude_lesson_id,
    )
    .await?;
    Ok(!clashes.is_empty())
}
