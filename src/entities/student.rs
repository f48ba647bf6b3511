//! Student entity - Reference record for an enrolled student.
//!
//! Student records themselves are managed outside this service; the scheduler and
//! ledger only read them and maintain the two billing projections: the cached
//! outstanding `balance` and the `last_payment_date`. Both fields are mutated
//! exclusively through the ledger, in the same database transaction as the
//! transaction row they reflect.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Student database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "students")]
pub struct Model {
    /// Unique identifier for the student
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Full name of the student
    pub name: String,
    /// Contact e-mail address, if known
    pub email: Option<String>,
    /// Whether the student is currently enrolled; inactive students cannot be scheduled
    pub is_active: bool,
    /// Cached outstanding balance: positive means the student owes money,
    /// negative means the student is in credit
    pub balance: f64,
    /// Date of the most recent payment transaction, if any
    pub last_payment_date: Option<Date>,
    /// When the student record was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Student and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One student has many scheduled lessons
    #[sea_orm(has_many = "super::lesson::Entity")]
    Lessons,
    /// One student has many completed-lesson history entries
    #[sea_orm(has_many = "super::lesson_history::Entity")]
    LessonHistory,
    /// One student has many ledger transactions
    #[sea_orm(has_many = "super::transaction::Entity")]
    Transactions,
}

impl Related<super::lesson::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lessons.def()
    }
}

impl Related<super::lesson_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::LessonHistory.def()
    }
}

impl Related<super::transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
