//! Lesson history entity - Write-once record of a completed lesson.
//!
//! A row is created exactly once, at the moment a lesson transitions into
//! `Completed` status, snapshotting the lesson's date, duration, and notes at
//! completion time. `lesson_id` is nullable because manual entries (lessons
//! taken at another school, paper records) exist without an originating lesson.
//! A partial unique index over `lesson_id` guarantees at most one history row
//! per completed lesson even if two completion requests race.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lesson history database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "lesson_history")]
pub struct Model {
    /// Unique identifier for the history entry
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Student the entry belongs to
    pub student_id: i64,
    /// Originating lesson, None for manual entries
    pub lesson_id: Option<i64>,
    /// Date the lesson took place
    pub entry_date: Date,
    /// Duration in minutes at time of completion
    pub duration_minutes: i32,
    /// Notes snapshotted at time of completion
    pub notes: Option<String>,
    /// When the history entry was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between LessonHistory and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each history entry belongs to one student
    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::StudentId",
        to = "super::student::Column::Id"
    )]
    Student,
    /// Each history entry may reference its originating lesson
    #[sea_orm(
        belongs_to = "super::lesson::Entity",
        from = "Column::LessonId",
        to = "super::lesson::Column::Id"
    )]
    Lesson,
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl Related<super::lesson::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lesson.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
