//! Shared test utilities for drivedesk.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test entities with sensible defaults.

#![allow(clippy::unwrap_used)]

use crate::{
    core::scheduling::{self, NewLesson},
    entities::{instructor, lesson, lesson::LessonKind, student, vehicle, vehicle::VehicleStatus},
    errors::Result,
};
use sea_orm::{DatabaseConnection, Set, prelude::*};

/// Creates an in-memory `SQLite` database with all tables and indexes installed.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    crate::config::database::create_indexes(&db).await?;
    Ok(db)
}

/// The standard slot used across scheduling tests: 2025-03-10 at 09:00.
pub fn test_slot() -> (chrono::NaiveDate, chrono::NaiveTime) {
    (
        chrono::NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
        chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
    )
}

/// One active student, instructor, and available vehicle, ready for booking.
pub struct TestRoster {
    /// Active student
    pub student: student::Model,
    /// Active instructor
    pub instructor: instructor::Model,
    /// Available vehicle
    pub vehicle: vehicle::Model,
}

/// Creates an active test student with a zero balance.
pub async fn create_test_student(db: &DatabaseConnection, name: &str) -> Result<student::Model> {
    let model = student::ActiveModel {
        name: Set(name.to_string()),
        email: Set(None),
        is_active: Set(true),
        balance: Set(0.0),
        last_payment_date: Set(None),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}

/// Creates a student that is no longer enrolled.
pub async fn create_inactive_student(
    db: &DatabaseConnection,
    name: &str,
) -> Result<student::Model> {
    let model = student::ActiveModel {
        name: Set(name.to_string()),
        email: Set(None),
        is_active: Set(false),
        balance: Set(0.0),
        last_payment_date: Set(None),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}

/// Creates an active test instructor.
pub async fn create_test_instructor(
    db: &DatabaseConnection,
    name: &str,
) -> Result<instructor::Model> {
    let model = instructor::ActiveModel {
        name: Set(name.to_string()),
        is_active: Set(true),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}

/// Creates a test vehicle with the given status.
pub async fn create_test_vehicle(
    db: &DatabaseConnection,
    name: &str,
    status: VehicleStatus,
) -> Result<vehicle::Model> {
    let model = vehicle::ActiveModel {
        name: Set(name.to_string()),
        license_plate: Set(format!("TST-{}", name.len())),
        status: Set(status),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    model.insert(db).await.map_err(Into::into)
}

/// Creates the standard roster: one active student, instructor, and vehicle.
pub async fn create_test_roster(db: &DatabaseConnection) -> Result<TestRoster> {
    Ok(TestRoster {
        student: create_test_student(db, "Anna de Boer").await?,
        instructor: create_test_instructor(db, "Bert Visser").await?,
        vehicle: create_test_vehicle(db, "Golf 1", VehicleStatus::Available).await?,
    })
}

/// Sets up a complete test environment with a roster.
/// Returns (db, roster) for common scheduling scenarios.
pub async fn setup_with_roster() -> Result<(DatabaseConnection, TestRoster)> {
    let db = setup_test_db().await?;
    let roster = create_test_roster(&db).await?;
    Ok((db, roster))
}

/// Sets up a complete test environment with a single active student.
/// Returns (db, student) for ledger tests.
pub async fn setup_with_student() -> Result<(DatabaseConnection, student::Model)> {
    let db = setup_test_db().await?;
    let student = create_test_student(&db, "Anna de Boer").await?;
    Ok((db, student))
}

/// A sensible default lesson request against the roster: 60 minutes, regular
/// kind, vehicle assigned, no price, no notes.
pub fn new_lesson(
    roster: &TestRoster,
    date: chrono::NaiveDate,
    time: chrono::NaiveTime,
) -> NewLesson {
    NewLesson {
        lesson_date: date,
        start_time: time,
        duration_minutes: 60,
        student_id: roster.student.id,
        instructor_id: roster.instructor.id,
        vehicle_id: Some(roster.vehicle.id),
        kind: LessonKind::Regular,
        notes: None,
        price: None,
    }
}

/// Schedules a lesson with the default parameters for the given slot.
pub async fn create_test_lesson(
    db: &DatabaseConnection,
    roster: &TestRoster,
    date: chrono::NaiveDate,
    time: chrono::NaiveTime,
) -> Result<lesson::Model> {
    scheduling::create_lesson(db, new_lesson(roster, date, time)).await
}
