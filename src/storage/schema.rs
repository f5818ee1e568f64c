//! Database schema definitions
//!
//! Times are stored as INTEGER milliseconds since the Unix epoch.

/// SQL to create the User table
pub const CREATE_USER_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS User (
    UserId INTEGER PRIMARY KEY,
    Username TEXT NOT NULL UNIQUE,
    Firstname TEXT,
    Lastname TEXT,
    Password TEXT NOT NULL
)
"#;

/// SQL to create the Exercise table; ids are chosen by the caller
pub const CREATE_EXERCISE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS Exercise (
    ExerciseId INTEGER PRIMARY KEY,
    Name TEXT NOT NULL,
    DueDate INTEGER NOT NULL
)
"#;

/// SQL to create the Question table
/// QuestionId is the 1-based position of the question within its exercise
pub const CREATE_QUESTION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS Question (
    ExerciseId INTEGER NOT NULL,
    QuestionId INTEGER NOT NULL,
    Name TEXT NOT NULL,
    Description TEXT,
    Points INTEGER NOT NULL,
    PRIMARY KEY (ExerciseId, QuestionId),
    FOREIGN KEY (ExerciseId) REFERENCES Exercise(ExerciseId)
)
"#;

/// SQL to create the Submission table
pub const CREATE_SUBMISSION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS Submission (
    SubmissionId INTEGER PRIMARY KEY,
    UserId INTEGER NOT NULL,
    ExerciseId INTEGER NOT NULL,
    SubmissionTime INTEGER NOT NULL,
    FOREIGN KEY (UserId) REFERENCES User(UserId),
    FOREIGN KEY (ExerciseId) REFERENCES Exercise(ExerciseId)
)
"#;

/// SQL to create the QuestionGrade table
pub const CREATE_QUESTION_GRADE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS QuestionGrade (
    SubmissionId INTEGER NOT NULL,
    QuestionId INTEGER NOT NULL,
    Grade REAL NOT NULL,
    PRIMARY KEY (SubmissionId, QuestionId),
    FOREIGN KEY (SubmissionId) REFERENCES Submission(SubmissionId)
)
"#;

/// SQL to create indexes
pub const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_submission_user_exercise ON Submission(UserId, ExerciseId)",
];

/// All schema creation statements, parents before children
pub fn all_schema_statements() -> Vec<&'static str> {
    let mut stmts = vec![
        CREATE_USER_TABLE,
        CREATE_EXERCISE_TABLE,
        CREATE_QUESTION_TABLE,
        CREATE_SUBMISSION_TABLE,
        CREATE_QUESTION_GRADE_TABLE,
    ];
    stmts.extend(CREATE_INDEXES.iter().copied());
    stmts
}
