//! School roster loading from config.toml
//!
//! This module provides functionality to load the initial instructor, vehicle,
//! and student roster from a TOML configuration file. The roster defined in
//! config.toml seeds the database on first run so the service is usable out of
//! the box; records themselves remain externally managed reference data.
//! Seeding is idempotent and keyed on name: records that already exist are left
//! untouched, so restarting the service never duplicates the roster.

use crate::{
    entities::{
        Instructor, Student, Vehicle, instructor, student, vehicle, vehicle::VehicleStatus,
    },
    errors::{Error, Result},
};
use sea_orm::{DatabaseConnection, Set, prelude::*};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct SchoolConfig {
    /// Instructors to seed
    pub instructors: Vec<InstructorSeed>,
    /// Vehicles to seed
    pub vehicles: Vec<VehicleSeed>,
    /// Students to seed
    pub students: Vec<StudentSeed>,
}

/// Seed entry for a single instructor
#[derive(Debug, Deserialize, Clone)]
pub struct InstructorSeed {
    /// Full name of the instructor
    pub name: String,
    /// Whether the instructor starts out active (default true)
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Seed entry for a single vehicle
#[derive(Debug, Deserialize, Clone)]
pub struct VehicleSeed {
    /// Human-readable name of the vehicle
    pub name: String,
    /// Registration plate
    pub license_plate: String,
    /// Initial operational status (default available)
    #[serde(default = "default_vehicle_status")]
    pub status: VehicleStatus,
}

/// Seed entry for a single student
#[derive(Debug, Deserialize, Clone)]
pub struct StudentSeed {
    /// Full name of the student
    pub name: String,
    /// Contact e-mail address, if known
    #[serde(default)]
    pub email: Option<String>,
    /// Whether the student starts out active (default true)
    #[serde(default = "default_true")]
    pub is_active: bool,
}

const fn default_true() -> bool {
    true
}

const fn default_vehicle_status() -> VehicleStatus {
    VehicleStatus::Available
}

/// Loads the school roster configuration from a TOML file
///
/// # Errors
/// Returns an error if:
/// - The file cannot be read
/// - The TOML syntax is invalid
/// - Required fields are missing
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SchoolConfig> {
    let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| Error::Config {
        message: format!("Failed to read config file: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads the school roster from the default location (./config.toml)
pub fn load_default_config() -> Result<SchoolConfig> {
    load_config("config.toml")
}

/// Seeds the roster into the database, skipping records that already exist.
///
/// Matching is by name per table; seeding never updates existing rows, so
/// status changes made through other channels survive a restart.
pub async fn seed_roster(db: &DatabaseConnection, config: &SchoolConfig) -> Result<()> {
    let now = chrono::Utc::now();
    let mut seeded = 0usize;

    for seed in &config.instructors {
        let exists = Instructor::find()
            .filter(instructor::Column::Name.eq(seed.name.as_str()))
            .one(db)
            .await?
            .is_some();
        if !exists {
            instructor::ActiveModel {
                name: Set(seed.name.clone()),
                is_active: Set(seed.is_active),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(db)
            .await?;
            seeded += 1;
        }
    }

    for seed in &config.vehicles {
        let exists = Vehicle::find()
            .filter(vehicle::Column::Name.eq(seed.name.as_str()))
            .one(db)
            .await?
            .is_some();
        if !exists {
            vehicle::ActiveModel {
                name: Set(seed.name.clone()),
                license_plate: Set(seed.license_plate.clone()),
                status: Set(seed.status),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(db)
            .await?;
            seeded += 1;
        }
    }

    for seed in &config.students {
        let exists = Student::find()
            .filter(student::Column::Name.eq(seed.name.as_str()))
            .one(db)
            .await?
            .is_some();
        if !exists {
            student::ActiveModel {
                name: Set(seed.name.clone()),
                email: Set(seed.email.clone()),
                is_active: Set(seed.is_active),
                balance: Set(0.0),
                last_payment_date: Set(None),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(db)
            .await?;
            seeded += 1;
        }
    }

    info!(seeded, "roster seeding finished");
    Ok(())
}
