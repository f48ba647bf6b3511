//! Database configuration module for drivedesk.
//!
//! This module handles `SQLite` database connection, table creation, and index
//! installation using `SeaORM`. Tables are generated from the entity definitions
//! via `Schema::create_table_from_entity`, so the database schema matches the
//! Rust struct definitions without manual SQL. The supplementary indexes are the
//! one exception: the partial unique slot indexes cannot be expressed through
//! entity annotations and are installed with raw DDL. They are the storage-layer
//! enforcement of the no-double-booking invariant, catching racing writers that
//! pass the application-level conflict pre-check simultaneously.

use crate::entities::{Instructor, Lesson, LessonHistory, Student, Transaction, Vehicle};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};

/// Gets the database URL from environment variable or returns default `SQLite` path.
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://data/drivedesk.sqlite".to_string())
}

/// Establishes a connection to the `SQLite` database using the `DATABASE_URL`
/// environment variable, falling back to a default local `SQLite` file.
pub async fn create_connection() -> Result<DatabaseConnection> {
    Database::connect(get_database_url()).await.map_err(Into::into)
}

/// Creates all necessary database tables using `SeaORM`'s schema generation from
/// entity definitions.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let student_table = schema.create_table_from_entity(Student);
    let instructor_table = schema.create_table_from_entity(Instructor);
    let vehicle_table = schema.create_table_from_entity(Vehicle);
    let lesson_table = schema.create_table_from_entity(Lesson);
    let history_table = schema.create_table_from_entity(LessonHistory);
    let transaction_table = schema.create_table_from_entity(Transaction);

    db.execute(builder.build(&student_table)).await?;
    db.execute(builder.build(&instructor_table)).await?;
    db.execute(builder.build(&vehicle_table)).await?;
    db.execute(builder.build(&lesson_table)).await?;
    db.execute(builder.build(&history_table)).await?;
    db.execute(builder.build(&transaction_table)).await?;

    Ok(())
}

/// Installs the partial unique indexes enforcing the scheduling invariants.
///
/// Among non-cancelled lessons, at most one may claim a given
/// (date, start time, instructor) and at most one a given
/// (date, start time, vehicle); each completed lesson has at most one history
/// row. Cancelled lessons fall outside the index predicate and free their slot.
pub async fn create_indexes(db: &DatabaseConnection) -> Result<()> {
    db.execute_unprepared(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_lessons_instructor_slot \
         ON lessons (lesson_date, start_time, instructor_id) \
         WHERE status <> 'cancelled'",
    )
    .await?;
    db.execute_unprepared(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_lessons_vehicle_slot \
         ON lessons (lesson_date, start_time, vehicle_id) \
         WHERE vehicle_id IS NOT NULL AND status <> 'cancelled'",
    )
    .await?;
    db.execute_unprepared(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_lesson_history_lesson \
         ON lesson_history (lesson_id) \
         WHERE lesson_id IS NOT NULL",
    )
    .await?;
    Ok(())
}
