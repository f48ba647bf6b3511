//! Lesson endpoints: booking lifecycle and the conflict pre-check.

use super::ApiState;
use crate::{
    core::{conflict, scheduling},
    entities::lesson::{self, LessonStatus},
    errors::{Error, Result},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

pub(crate) async fn create(
    State(state): State<ApiState>,
    axum::Json(payload): axum::Json<scheduling::NewLesson>,
) -> Result<(StatusCode, axum::Json<lesson::Model>)> {
    let created = scheduling::create_lesson(&state.db, payload).await?;
    Ok((StatusCode::CREATED, axum::Json(created)))
}

pub(crate) async fn list(
    State(state): State<ApiState>,
    Query(filter): Query<scheduling::LessonFilter>,
) -> Result<axum::Json<Vec<lesson::Model>>> {
    let lessons = scheduling::list_lessons(&state.db, &filter).await?;
    Ok(axum::Json(lessons))
}

pub(crate) async fn fetch(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<axum::Json<lesson::Model>> {
    let lesson = scheduling::get_lesson(&state.db, id)
        .await?
        .ok_or(Error::LessonNotFound { id })?;
    Ok(axum::Json(lesson))
}

pub(crate) async fn reschedule(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    axum::Json(changes): axum::Json<scheduling::LessonChanges>,
) -> Result<axum::Json<lesson::Model>> {
    let updated = scheduling::reschedule_lesson(&state.db, id, changes).await?;
    Ok(axum::Json(updated))
}

/// Status-change request body.
#[derive(Debug, Deserialize)]
pub(crate) struct StatusRequest {
    status: LessonStatus,
}

pub(crate) async fn update_status(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    axum::Json(request): axum::Json<StatusRequest>,
) -> Result<axum::Json<lesson::Model>> {
    let updated = scheduling::update_lesson_status(&state.db, id, request.status).await?;
    Ok(axum::Json(updated))
}

pub(crate) async fn remove(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
) -> Result<axum::Json<lesson::Model>> {
    let removed = scheduling::delete_lesson(&state.db, id).await?;
    Ok(axum::Json(removed))
}

/// Query parameters for the conflict pre-check. The time accepts `HH:MM` or
/// `HH:MM:SS` so calendar frontends can pass either form.
#[derive(Debug, Deserialize)]
pub(crate) struct ConflictQuery {
    date: chrono::NaiveDate,
    time: String,
    instructor_id: i64,
    #[serde(default)]
    vehicle_id: Option<i64>,
    #[serde(default)]
    exclude_lesson_id: Option<i64>,
}

/// Conflict pre-check response: the verdict plus the clashing lessons.
#[derive(Debug, Serialize)]
pub(crate) struct ConflictReport {
    conflict: bool,
    clashes: Vec<lesson::Model>,
}

fn parse_time(raw: &str) -> Result<chrono::NaiveTime> {
    chrono::NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| chrono::NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|_| Error::Validation {
            message: format!("invalid time '{raw}', expected HH:MM or HH:MM:SS"),
        })
}

pub(crate) async fn check_conflicts(
    State(state): State<ApiState>,
    Query(query): Query<ConflictQuery>,
) -> Result<axum::Json<ConflictReport>> {
    let time = parse_time(&query.time)?;
    let clashes = conflict::find_clashes(
        &state.db,
        query.date,
        time,
        query.instructor_id,
        query.vehicle_id,
        query.exclude_lesson_id,
    )
    .await?;
    Ok(axum::Json(ConflictReport {
        conflict: !clashes.is_empty(),
        clashes,
    }))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_time_accepts_both_forms() {
        assert_eq!(
            parse_time("09:00").unwrap(),
            chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap()
        );
        assert_eq!(
            parse_time("14:30:15").unwrap(),
            chrono::NaiveTime::from_hms_opt(14, 30, 15).unwrap()
        );
        assert!(matches!(
            parse_time("9 o'clock").unwrap_err(),
            Error::Validation { .. }
        ));
    }
}
