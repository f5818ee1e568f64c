//! # Gradestore - grading system data-access layer
//!
//! Persists users, exercises and graded submissions in SQLite.
//!
//! Gradestore provides:
//! - Idempotent schema setup on every open
//! - User upsert keyed on username, plain-text login check
//! - Exercises with ordered, sequentially numbered questions
//! - Transactional submission storage (submission row plus one grade per question)
//! - Latest and best submission queries

pub mod model;
pub mod storage;
pub mod config;
pub mod ui;

// Re-exports for convenient access
pub use model::{
    Exercise, ExerciseId, Question, QuestionId, Submission, SubmissionId, SubmissionQuery, User,
    UserId,
};
pub use storage::{ConnectionTarget, GradingStore, StoreStats};

/// Result type alias for Gradestore operations
pub type Result<T> = std::result::Result<T, Error>;

/// Outcome of a write that may be refused for a business reason.
///
/// `Err` here is an expected result, not a failure of the store.
pub type Outcome<T> = std::result::Result<T, Rejection>;

/// Error types for Gradestore operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Invalid connection string: {0}")]
    InvalidConnection(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Reasons a write was refused without touching the database
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Rejection {
    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("exercise {0} already exists")]
    DuplicateExerciseId(ExerciseId),

    #[error("expected {expected} grades, got {actual}")]
    GradeCountMismatch { expected: usize, actual: usize },
}
