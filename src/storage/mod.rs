//! Storage Layer - SQLite-backed persistence
//!
//! System of record is SQLite with tables:
//! - User(UserId, Username, Firstname, Lastname, Password)
//! - Exercise(ExerciseId, Name, DueDate)
//! - Question(ExerciseId, QuestionId, Name, Description, Points)
//! - Submission(SubmissionId, UserId, ExerciseId, SubmissionTime)
//! - QuestionGrade(SubmissionId, QuestionId, Grade)

pub mod schema;
pub mod sqlite;
pub mod target;

pub use sqlite::{GradingStore, StoreStats};
pub use target::ConnectionTarget;
