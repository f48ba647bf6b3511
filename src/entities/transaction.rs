//! Transaction entity - Append-only ledger entry against a student.
//!
//! Amounts are stored as positive magnitudes; the sign convention lives in the
//! `kind` column: `invoice` increases the student's outstanding balance,
//! `payment` and `discount` decrease it. Every insert is paired with the
//! matching update of the cached `students.balance` in the same database
//! transaction, so the cached balance is always a faithful projection of the
//! ledger log.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Kind of ledger entry; determines the sign applied to the student balance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Money received from the student; decreases outstanding balance
    #[sea_orm(string_value = "payment")]
    Payment,
    /// Amount billed to the student; increases outstanding balance
    #[sea_orm(string_value = "invoice")]
    Invoice,
    /// Reduction granted to the student; decreases outstanding balance
    #[sea_orm(string_value = "discount")]
    Discount,
}

impl TransactionKind {
    /// Lowercase label used in error messages and log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Payment => "payment",
            Self::Invoice => "invoice",
            Self::Discount => "discount",
        }
    }
}

/// Transaction database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Unique identifier for the transaction
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Student this transaction is booked against
    pub student_id: i64,
    /// Kind of entry: payment, invoice, or discount
    pub kind: TransactionKind,
    /// Positive magnitude, normalized to two decimal places
    pub amount: f64,
    /// Human-readable description of the transaction
    pub description: String,
    /// Business date of the entry (e.g. the lesson date for an invoice)
    pub entry_date: Date,
    /// When the transaction row was inserted
    pub recorded_at: DateTimeUtc,
}

/// Defines relationships between Transaction and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each transaction belongs to one student
    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::StudentId",
        to = "super::student::Column::Id"
    )]
    Student,
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
