//! Core business logic - framework-agnostic scheduling, conflict checking, and
//! ledger operations over a SeaORM connection.

/// Conflict checker - same-slot clash detection for instructors and vehicles
pub mod conflict;

/// Resource directory - read-only reference lookups plus the atomic balance update
pub mod directory;

/// Balance ledger - append-only transaction log and cached balance projection
pub mod ledger;

/// Lesson scheduler - booking lifecycle and completion side effects
pub mod scheduling;
