//! Vehicle entity - Reference record for a training vehicle.
//!
//! Vehicle records are managed outside this service; the scheduler only reads the
//! `status` column to decide whether a vehicle may be booked for a lesson.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Operational status of a vehicle. Only `Available` vehicles can be booked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum VehicleStatus {
    /// In service and bookable
    #[sea_orm(string_value = "available")]
    Available,
    /// Temporarily out of service for repairs or inspection
    #[sea_orm(string_value = "maintenance")]
    Maintenance,
    /// Permanently withdrawn from the fleet
    #[sea_orm(string_value = "retired")]
    Retired,
}

/// Vehicle database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vehicles")]
pub struct Model {
    /// Unique identifier for the vehicle
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Human-readable name (e.g. "Golf 2", "Motorcycle A")
    pub name: String,
    /// Registration plate of the vehicle
    pub license_plate: String,
    /// Current operational status
    pub status: VehicleStatus,
    /// When the vehicle record was created
    pub created_at: DateTimeUtc,
}

/// Defines relationships between Vehicle and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One vehicle appears in many scheduled lessons
    #[sea_orm(has_many = "super::lesson::Entity")]
    Lessons,
}

impl Related<super::lesson::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lessons.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
