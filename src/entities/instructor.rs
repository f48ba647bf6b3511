//! Instructor entity - Reference record for a driving instructor.
//!
//! Instructor records are managed outside this service; the scheduler only reads
//! them to check that a lesson's instructor is currently active.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Instructor database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "instructors")]
pub struct Model {
    /// Unique identifier for the instructor
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Full name of the instructor
    pub name: String,
    /// Whether the instructor currently teaches; inactive instructors cannot be booked
    pub is_active: bool,
    /// When the instructor record was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Instructor and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One instructor has many scheduled lessons
    #[sea_orm(has_many = "super::lesson::Entity")]
    Lessons,
}

impl Related<super::lesson::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lessons.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
