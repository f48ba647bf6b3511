//! Unified error types and result handling.
//!
//! Every fallible operation in the crate returns [`Result`]. Each variant maps to a
//! stable machine-readable kind (see [`Error::kind`]) so the API layer can translate
//! failures into status codes without matching on message text. Scheduling and ledger
//! operations either complete fully or roll back; no variant represents a partially
//! applied state.

use thiserror::Error;

/// All errors produced by the scheduling, ledger, and configuration layers.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or out-of-range input (bad duration, inactive student, zero amount, ...).
    #[error("validation error: {message}")]
    Validation {
        /// Human-readable explanation of what was rejected
        message: String,
    },

    /// The requested instructor or vehicle is already booked for the slot.
    #[error("scheduling conflict: {message}")]
    Conflict {
        /// Description of the clashing booking(s)
        message: String,
    },

    /// A lesson status change not permitted by the lifecycle rules.
    #[error("invalid status transition from '{from}' to '{to}'")]
    InvalidTransition {
        /// Current status of the lesson
        from: String,
        /// Requested status
        to: String,
    },

    /// No lesson exists with the given id.
    #[error("lesson {id} not found")]
    LessonNotFound {
        /// Requested lesson id
        id: i64,
    },

    /// No student exists with the given id.
    #[error("student {id} not found")]
    StudentNotFound {
        /// Requested student id
        id: i64,
    },

    /// No instructor exists with the given id.
    #[error("instructor {id} not found")]
    InstructorNotFound {
        /// Requested instructor id
        id: i64,
    },

    /// No vehicle exists with the given id.
    #[error("vehicle {id} not found")]
    VehicleNotFound {
        /// Requested vehicle id
        id: i64,
    },

    /// An operation would damage completed records (e.g. deleting a completed lesson).
    #[error("integrity violation: {message}")]
    Integrity {
        /// Which record the operation would have damaged
        message: String,
    },

    /// Configuration file or environment problem.
    #[error("configuration error: {message}")]
    Config {
        /// What failed to load or parse
        message: String,
    },

    /// Underlying database failure.
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// I/O failure (listener binding, config file access).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable kind string for API responses and log fields.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation { .. } => "validation",
            Error::Conflict { .. } => "conflict",
            Error::InvalidTransition { .. } => "invalid_transition",
            Error::LessonNotFound { .. }
            | Error::StudentNotFound { .. }
            | Error::InstructorNotFound { .. }
            | Error::VehicleNotFound { .. } => "not_found",
            Error::Integrity { .. } => "integrity",
            Error::Config { .. } => "config",
            Error::Database(_) => "database",
            Error::Io(_) => "io",
        }
    }
}

// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
