//! SQLite storage implementation

use std::path::Path;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, ErrorCode, OptionalExtension, TransactionBehavior, params};
use crate::{Error, Outcome, Rejection, Result};
use crate::model::{
    Exercise, ExerciseId, Question, QuestionId, Submission, SubmissionId, SubmissionQuery, User,
    UserId,
};
use super::schema;
use super::target::ConnectionTarget;

/// One row per question of the latest submission.
/// ?1 username, ?2 exercise id, ?3 number of questions.
const LATEST_SUBMISSION_GRADES: &str = r#"
WITH Chosen AS (
    SELECT SubmissionId
    FROM Submission
    WHERE UserId = (SELECT UserId FROM User WHERE Username = ?1)
      AND ExerciseId = ?2
    ORDER BY SubmissionTime DESC, SubmissionId DESC
    LIMIT 1
)
SELECT Submission.SubmissionId, QuestionGrade.QuestionId, QuestionGrade.Grade, Submission.SubmissionTime
FROM Submission
JOIN QuestionGrade ON QuestionGrade.SubmissionId = Submission.SubmissionId
WHERE Submission.SubmissionId = (SELECT SubmissionId FROM Chosen)
ORDER BY QuestionGrade.QuestionId
LIMIT ?3
"#;

/// One row per question of the submission with the highest total grade.
/// Same parameters as [`LATEST_SUBMISSION_GRADES`].
const BEST_SUBMISSION_GRADES: &str = r#"
WITH Totals AS (
    SELECT Submission.SubmissionId, Submission.SubmissionTime, SUM(QuestionGrade.Grade) AS Total
    FROM Submission
    JOIN QuestionGrade ON QuestionGrade.SubmissionId = Submission.SubmissionId
    WHERE Submission.UserId = (SELECT UserId FROM User WHERE Username = ?1)
      AND Submission.ExerciseId = ?2
    GROUP BY Submission.SubmissionId, Submission.SubmissionTime
),
Chosen AS (
    SELECT SubmissionId
    FROM Totals
    ORDER BY Total DESC, SubmissionTime ASC, SubmissionId ASC
    LIMIT 1
)
SELECT Submission.SubmissionId, QuestionGrade.QuestionId, QuestionGrade.Grade, Submission.SubmissionTime
FROM Submission
JOIN QuestionGrade ON QuestionGrade.SubmissionId = Submission.SubmissionId
WHERE Submission.SubmissionId = (SELECT SubmissionId FROM Chosen)
ORDER BY QuestionGrade.QuestionId
LIMIT ?3
"#;

/// SQLite-backed grading store.
///
/// Owns a single connection. Reads take `&self`; every multi-statement
/// write takes `&mut self` and runs in its own transaction.
pub struct GradingStore {
    conn: Connection,
}

impl GradingStore {
    /// Open a store from a connection string such as `sqlite:grades.db`
    pub fn open(connection: &str) -> Result<Self> {
        let target = ConnectionTarget::parse(connection)?;
        Self::open_target(&target)
    }

    /// Open a parsed connection target
    pub fn open_target(target: &ConnectionTarget) -> Result<Self> {
        match target {
            ConnectionTarget::Memory => Self::open_in_memory(),
            ConnectionTarget::File(path) => Self::open_path(path),
        }
    }

    /// Open a database file (creates if doesn't exist)
    pub fn open_path(path: &Path) -> Result<Self> {
        tracing::debug!("Opening grading store at {}", path.display());
        Self::with_connection(Connection::open(path)?)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema
    fn initialize_schema(&self) -> Result<()> {
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    /// Close the connection, reporting any error SQLite raises on close
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, err)| Error::Storage(err))
    }

    // ========== User Operations ==========

    /// Insert a user, or update names and password of the user with the same username.
    ///
    /// Returns the user's id, which never changes across updates.
    pub fn add_or_update_user(&mut self, user: &User, password: &str) -> Result<UserId> {
        if user.username.trim().is_empty() {
            return Err(Error::InvalidInput("username is required".to_string()));
        }

        // IMMEDIATE takes the write lock up front so lookup and write are not interleaved
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let user_id = match lookup_user_id(&tx, &user.username)? {
            Some(id) => {
                update_user(&tx, id, user, password)?;
                tracing::debug!("Updated user {} ({})", user.username, id);
                id
            }
            None => {
                let inserted = tx.execute(
                    "INSERT INTO User (Username, Firstname, Lastname, Password) VALUES (?1, ?2, ?3, ?4)",
                    params![user.username, user.firstname, user.lastname, password],
                );
                match inserted {
                    Ok(_) => {
                        let id = tx.last_insert_rowid();
                        tracing::debug!("Created user {} ({})", user.username, id);
                        id
                    }
                    Err(rusqlite::Error::SqliteFailure(err, _))
                        if err.code == ErrorCode::ConstraintViolation =>
                    {
                        // Another writer created the username first
                        let id = lookup_user_id(&tx, &user.username)?
                            .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
                        update_user(&tx, id, user, password)?;
                        tracing::warn!("User {} was created concurrently, updated instead", user.username);
                        id
                    }
                    Err(err) => return Err(err.into()),
                }
            }
        };

        tx.commit()?;
        Ok(user_id)
    }

    /// Check a username/password pair.
    ///
    /// Passwords are compared in clear text. This is not safe for real use.
    pub fn verify_login(&self, username: &str, password: &str) -> Result<bool> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT 1 FROM User WHERE Username = ?1 AND Password = ?2")?;
        Ok(stmt.exists(params![username, password])?)
    }

    /// Get a user by username
    pub fn find_user(&self, username: &str) -> Result<Option<User>> {
        self.conn
            .query_row(
                "SELECT UserId, Username, Firstname, Lastname FROM User WHERE Username = ?1",
                [username],
                |row| {
                    Ok(User {
                        id: Some(row.get(0)?),
                        username: row.get(1)?,
                        firstname: row.get(2)?,
                        lastname: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    // ========== Exercise Operations ==========

    /// Insert an exercise and its questions.
    ///
    /// Questions are numbered 1, 2, 3... in list order. An exercise whose id
    /// is already stored is rejected and nothing is written.
    pub fn add_exercise(&mut self, exercise: &Exercise) -> Result<Outcome<ExerciseId>> {
        if exercise.name.trim().is_empty() {
            return Err(Error::InvalidInput("exercise name is required".to_string()));
        }

        let tx = self.conn.transaction()?;

        let exists = tx
            .prepare_cached("SELECT 1 FROM Exercise WHERE ExerciseId = ?1")?
            .exists([exercise.id])?;
        if exists {
            tracing::debug!("Exercise {} already exists", exercise.id);
            return Ok(Err(Rejection::DuplicateExerciseId(exercise.id)));
        }

        tx.execute(
            "INSERT INTO Exercise (ExerciseId, Name, DueDate) VALUES (?1, ?2, ?3)",
            params![exercise.id, exercise.name, exercise.due_date.timestamp_millis()],
        )?;

        {
            let mut insert_question = tx.prepare_cached(
                "INSERT INTO Question (ExerciseId, QuestionId, Name, Description, Points) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (index, question) in exercise.questions.iter().enumerate() {
                insert_question.execute(params![
                    exercise.id,
                    index as QuestionId + 1,
                    question.name,
                    question.description,
                    question.points,
                ])?;
            }
        }

        tx.commit()?;
        tracing::info!(
            "Added exercise {} '{}' with {} questions",
            exercise.id,
            exercise.name,
            exercise.questions.len()
        );
        Ok(Ok(exercise.id))
    }

    /// Load every exercise, ordered by id, with its questions ordered by question id
    pub fn load_exercises(&self) -> Result<Vec<Exercise>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT ExerciseId, Name, DueDate FROM Exercise ORDER BY ExerciseId")?;

        let mut exercises = stmt
            .query_map([], |row| self.row_to_exercise(row))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for exercise in &mut exercises {
            exercise.questions = self.load_questions(exercise.id)?;
        }

        Ok(exercises)
    }

    /// Load a single exercise with its questions
    pub fn load_exercise(&self, id: ExerciseId) -> Result<Option<Exercise>> {
        let exercise = self
            .conn
            .query_row(
                "SELECT ExerciseId, Name, DueDate FROM Exercise WHERE ExerciseId = ?1",
                [id],
                |row| self.row_to_exercise(row),
            )
            .optional()?;

        match exercise {
            Some(mut exercise) => {
                exercise.questions = self.load_questions(id)?;
                Ok(Some(exercise))
            }
            None => Ok(None),
        }
    }

    fn load_questions(&self, exercise_id: ExerciseId) -> Result<Vec<Question>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT QuestionId, Name, Description, Points FROM Question WHERE ExerciseId = ?1 ORDER BY QuestionId",
        )?;

        let questions = stmt
            .query_map([exercise_id], |row| {
                let description: Option<String> = row.get(2)?;
                Ok(Question {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: description.unwrap_or_default(),
                    points: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(questions)
    }

    /// Helper to convert a row to an Exercise without questions
    fn row_to_exercise(&self, row: &rusqlite::Row) -> rusqlite::Result<Exercise> {
        Ok(Exercise {
            id: row.get(0)?,
            name: row.get(1)?,
            due_date: millis_to_time(row.get(2)?, 2)?,
            questions: Vec::new(),
        })
    }

    // ========== Submission Operations ==========

    /// Store a submission and one grade row per question, atomically.
    ///
    /// Rejected without writing when the user is unknown or the number of
    /// grades differs from the exercise's question count. Grade rows always
    /// reference the id the submission was actually stored under.
    pub fn store_submission(&mut self, submission: &Submission) -> Result<Outcome<SubmissionId>> {
        if let Some(grade) = submission.grades.iter().find(|g| !g.is_finite()) {
            return Err(Error::InvalidInput(format!("grade {} is not a finite number", grade)));
        }

        let tx = self.conn.transaction()?;

        if lookup_user_id(&tx, &submission.username)?.is_none() {
            tracing::warn!("Rejected submission for unknown user {}", submission.username);
            return Ok(Err(Rejection::UserNotFound(submission.username.clone())));
        }

        // An unknown exercise is left to the foreign key on insert
        let exercise_exists = tx
            .prepare_cached("SELECT 1 FROM Exercise WHERE ExerciseId = ?1")?
            .exists([submission.exercise_id])?;
        if exercise_exists {
            let expected: i64 = tx.query_row(
                "SELECT COUNT(*) FROM Question WHERE ExerciseId = ?1",
                [submission.exercise_id],
                |row| row.get(0),
            )?;
            if expected as usize != submission.grades.len() {
                tracing::warn!(
                    "Rejected submission for exercise {}: {} grades for {} questions",
                    submission.exercise_id,
                    submission.grades.len(),
                    expected
                );
                return Ok(Err(Rejection::GradeCountMismatch {
                    expected: expected as usize,
                    actual: submission.grades.len(),
                }));
            }
        }

        let submitted_at = submission.submitted_at.timestamp_millis();
        let submission_id = match submission.id {
            None => {
                tx.execute(
                    "INSERT INTO Submission (UserId, ExerciseId, SubmissionTime) VALUES ((SELECT UserId FROM User WHERE Username = ?1), ?2, ?3)",
                    params![submission.username, submission.exercise_id, submitted_at],
                )?;
                tx.last_insert_rowid()
            }
            Some(id) => {
                tx.execute(
                    "INSERT INTO Submission (SubmissionId, UserId, ExerciseId, SubmissionTime) VALUES (?1, (SELECT UserId FROM User WHERE Username = ?2), ?3, ?4)",
                    params![id, submission.username, submission.exercise_id, submitted_at],
                )?;
                id
            }
        };

        {
            let mut insert_grade = tx.prepare_cached(
                "INSERT INTO QuestionGrade (SubmissionId, QuestionId, Grade) VALUES (?1, ?2, ?3)",
            )?;
            for (index, grade) in submission.grades.iter().enumerate() {
                insert_grade.execute(params![submission_id, index as QuestionId + 1, grade])?;
            }
        }

        tx.commit()?;
        tracing::info!(
            "Stored submission {} by {} for exercise {}",
            submission_id,
            submission.username,
            submission.exercise_id
        );
        Ok(Ok(submission_id))
    }

    /// Get the submission selected by `query` for a user and exercise.
    ///
    /// Returns `None` when the user has no graded submission for the exercise
    /// (or does not exist). Grades are placed by question id, so the result
    /// always has one entry per question of `exercise`.
    pub fn get_submission(
        &self,
        user: &User,
        exercise: &Exercise,
        query: SubmissionQuery,
    ) -> Result<Option<Submission>> {
        let sql = match query {
            SubmissionQuery::Latest => LATEST_SUBMISSION_GRADES,
            SubmissionQuery::Best => BEST_SUBMISSION_GRADES,
        };
        let question_count = exercise.question_count();

        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt
            .query_map(
                params![user.username, exercise.id, question_count as i64],
                |row| {
                    Ok(GradeRow {
                        submission_id: row.get(0)?,
                        question_id: row.get(1)?,
                        grade: row.get(2)?,
                        submitted_at: row.get(3)?,
                    })
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let Some(first) = rows.first() else {
            return Ok(None);
        };

        let mut grades = vec![0.0; question_count];
        for row in &rows {
            if row.question_id >= 1 && (row.question_id as usize) <= question_count {
                grades[row.question_id as usize - 1] = row.grade;
            }
        }

        Ok(Some(Submission {
            id: Some(first.submission_id),
            username: user.username.clone(),
            exercise_id: exercise.id,
            submitted_at: millis_to_time(first.submitted_at, 3)?,
            grades,
        }))
    }

    /// Get the most recent submission
    pub fn get_last_submission(&self, user: &User, exercise: &Exercise) -> Result<Option<Submission>> {
        self.get_submission(user, exercise, SubmissionQuery::Latest)
    }

    /// Get the submission with the highest total grade
    pub fn get_best_submission(&self, user: &User, exercise: &Exercise) -> Result<Option<Submission>> {
        self.get_submission(user, exercise, SubmissionQuery::Best)
    }

    // ========== Statistics ==========

    fn count(&self, table: &str) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            users: self.count("User")?,
            exercises: self.count("Exercise")?,
            questions: self.count("Question")?,
            submissions: self.count("Submission")?,
            grades: self.count("QuestionGrade")?,
        })
    }
}

struct GradeRow {
    submission_id: SubmissionId,
    question_id: QuestionId,
    grade: f64,
    submitted_at: i64,
}

fn lookup_user_id(conn: &Connection, username: &str) -> rusqlite::Result<Option<UserId>> {
    conn.query_row("SELECT UserId FROM User WHERE Username = ?1", [username], |row| row.get(0))
        .optional()
}

fn update_user(conn: &Connection, id: UserId, user: &User, password: &str) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE User SET Firstname = ?1, Lastname = ?2, Password = ?3 WHERE UserId = ?4",
        params![user.firstname, user.lastname, password, id],
    )?;
    Ok(())
}

fn millis_to_time(millis: i64, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(column, millis))
}

/// Database statistics
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StoreStats {
    pub users: usize,
    pub exercises: usize,
    pub questions: usize,
    pub submissions: usize,
    pub grades: usize,
}
