//! Lesson entity - A scheduled occupation of an instructor (and optionally a vehicle)
//! for one student at a specific date, start time, and duration.
//!
//! Two partial unique indexes (see [`crate::config::database::create_indexes`])
//! enforce that among non-cancelled lessons no two rows share the same
//! (`lesson_date`, `start_time`, `instructor_id`) or, when a vehicle is assigned,
//! the same (`lesson_date`, `start_time`, `vehicle_id`). The scheduler relies on
//! these indexes to reject racing writers that pass the application-level
//! conflict pre-check simultaneously.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a lesson.
///
/// `Completed` and `Cancelled` are terminal; the transition table lives in
/// [`crate::core::scheduling`] and is the single place that decides which
/// status changes are legal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum LessonStatus {
    /// Initial status of every freshly created lesson
    #[sea_orm(string_value = "scheduled")]
    Scheduled,
    /// Acknowledged by student or office; still occupies its slot
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    /// Lesson took place; terminal, feeds history and billing
    #[sea_orm(string_value = "completed")]
    Completed,
    /// Lesson called off; terminal, frees the slot
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl LessonStatus {
    /// Lowercase label used in error messages and log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether no further transition is permitted out of this status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

/// What kind of appointment the lesson is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum LessonKind {
    /// Ordinary driving lesson
    #[sea_orm(string_value = "regular")]
    Regular,
    /// Practical or theory exam appointment
    #[sea_orm(string_value = "exam")]
    Exam,
    /// First meeting with a new student
    #[sea_orm(string_value = "intake")]
    Intake,
    /// Anything else (office appointment, make-up session, ...)
    #[sea_orm(string_value = "other")]
    Other,
}

/// Lesson database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "lessons")]
pub struct Model {
    /// Unique identifier for the lesson
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Calendar date of the lesson
    pub lesson_date: Date,
    /// Start time; conflict granularity is exact start-time equality
    pub start_time: Time,
    /// Length of the lesson in minutes, bounded 15-480
    pub duration_minutes: i32,
    /// Student taking the lesson
    pub student_id: i64,
    /// Instructor giving the lesson
    pub instructor_id: i64,
    /// Vehicle used, if any (theory lessons and intakes have none)
    pub vehicle_id: Option<i64>,
    /// What kind of appointment this is
    pub kind: LessonKind,
    /// Current lifecycle status
    pub status: LessonStatus,
    /// Free-text notes
    pub notes: Option<String>,
    /// Price invoiced to the student on completion, if any
    pub price: Option<f64>,
    /// When the lesson record was created
    pub created_at: DateTimeUtc,
    /// When the lesson record was last modified
    pub updated_at: DateTimeUtc,
}

/// Defines relationships between Lesson and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each lesson belongs to one student
    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::StudentId",
        to = "super::student::Column::Id"
    )]
    Student,
    /// Each lesson belongs to one instructor
    #[sea_orm(
        belongs_to = "super::instructor::Entity",
        from = "Column::InstructorId",
        to = "super::instructor::Column::Id"
    )]
    Instructor,
    /// Each lesson may reference one vehicle
    #[sea_orm(
        belongs_to = "super::vehicle::Entity",
        from = "Column::VehicleId",
        to = "super::vehicle::Column::Id"
    )]
    Vehicle,
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl Related<super::instructor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Instructor.def()
    }
}

impl Related<super::vehicle::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vehicle.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
