//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod instructor;
pub mod lesson;
pub mod lesson_history;
pub mod student;
pub mod transaction;
pub mod vehicle;

// Re-export specific types to avoid conflicts
pub use instructor::{Column as InstructorColumn, Entity as Instructor, Model as InstructorModel};
pub use lesson::{Column as LessonColumn, Entity as Lesson, Model as LessonModel};
pub use lesson_history::{
    Column as LessonHistoryColumn, Entity as LessonHistory, Model as LessonHistoryModel,
};
pub use student::{Column as StudentColumn, Entity as Student, Model as StudentModel};
pub use transaction::{
    Column as TransactionColumn, Entity as Transaction, Model as TransactionModel,
};
pub use vehicle::{Column as VehicleColumn, Entity as Vehicle, Model as VehicleModel};
