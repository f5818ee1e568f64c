//! Domain records - users, exercises, questions and submissions
//!
//! These are plain values. Identity and relationships are owned by the
//! storage layer:
//! - `User` is keyed on `username`; the numeric id is assigned by the database
//! - `Exercise` ids are chosen by the caller
//! - `Question` ids are the 1-based position within their exercise
//! - `Submission` grades are positional, index `i` grades question `i + 1`

use crate::{Error, Result};
use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub type UserId = i64;
pub type ExerciseId = i64;
pub type QuestionId = i64;
pub type SubmissionId = i64;

/// A registered user. The password is never part of the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Database id, `None` until the user has been stored or loaded
    pub id: Option<UserId>,
    pub username: String,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: None,
            username: username.into(),
            firstname: None,
            lastname: None,
        }
    }

    /// Set first and last name
    pub fn with_name(mut self, firstname: impl Into<String>, lastname: impl Into<String>) -> Self {
        self.firstname = Some(firstname.into());
        self.lastname = Some(lastname.into());
        self
    }

    /// "First Last", falling back to the username
    pub fn display_name(&self) -> String {
        match (&self.firstname, &self.lastname) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => self.username.clone(),
        }
    }
}

/// One gradable item of an exercise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Position within the exercise, starting at 1
    pub id: QuestionId,
    pub name: String,
    pub description: String,
    pub points: i64,
}

/// A named assignment with a due date and an ordered list of questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: ExerciseId,
    pub name: String,
    /// Stored with millisecond precision; `new` truncates to match
    pub due_date: DateTime<Utc>,
    pub questions: Vec<Question>,
}

impl Exercise {
    pub fn new(id: ExerciseId, name: impl Into<String>, due_date: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            due_date: due_date.trunc_subsecs(3),
            questions: Vec::new(),
        }
    }

    /// Append a question; its id is its 1-based position
    pub fn add_question(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        points: i64,
    ) -> &Question {
        let id = self.questions.len() as QuestionId + 1;
        self.questions.push(Question {
            id,
            name: name.into(),
            description: description.into(),
            points,
        });
        &self.questions[self.questions.len() - 1]
    }

    /// Builder form of [`Exercise::add_question`]
    pub fn with_question(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        points: i64,
    ) -> Self {
        self.add_question(name, description, points);
        self
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    /// Sum of the points of every question
    pub fn total_points(&self) -> i64 {
        self.questions.iter().map(|q| q.points).sum()
    }
}

/// One attempt by a user at an exercise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    /// `None` lets the database assign the id on insert
    pub id: Option<SubmissionId>,
    pub username: String,
    pub exercise_id: ExerciseId,
    /// Stored with millisecond precision; `new` truncates to match
    pub submitted_at: DateTime<Utc>,
    /// One grade per question, in question order
    pub grades: Vec<f64>,
}

impl Submission {
    pub fn new(
        user: &User,
        exercise: &Exercise,
        submitted_at: DateTime<Utc>,
        grades: Vec<f64>,
    ) -> Self {
        Self {
            id: None,
            username: user.username.clone(),
            exercise_id: exercise.id,
            submitted_at: submitted_at.trunc_subsecs(3),
            grades,
        }
    }

    /// Use an explicit submission id instead of an assigned one
    pub fn with_id(mut self, id: SubmissionId) -> Self {
        self.id = Some(id);
        self
    }

    /// Sum of all question grades
    pub fn total(&self) -> f64 {
        self.grades.iter().sum()
    }
}

/// Which submission of a (user, exercise) pair a query selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionQuery {
    /// Maximum submission time; ties go to the higher submission id
    Latest,
    /// Maximum total grade; ties go to the earliest submission, then the lower id
    Best,
}

impl SubmissionQuery {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionQuery::Latest => "latest",
            SubmissionQuery::Best => "best",
        }
    }

    pub fn all() -> &'static [SubmissionQuery] {
        &[SubmissionQuery::Latest, SubmissionQuery::Best]
    }
}

impl FromStr for SubmissionQuery {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "latest" | "last" => Ok(SubmissionQuery::Latest),
            "best" | "max" => Ok(SubmissionQuery::Best),
            _ => Err(Error::Parse(format!("Unknown submission query: {}", s))),
        }
    }
}

impl std::fmt::Display for SubmissionQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_question_ids_follow_position() {
        let due = Utc.timestamp_millis_opt(0).unwrap();
        let exercise = Exercise::new(7, "Joins", due)
            .with_question("a", "first", 5)
            .with_question("b", "second", 10)
            .with_question("c", "third", 15);

        let ids: Vec<_> = exercise.questions.iter().map(|q| q.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(exercise.total_points(), 30);
    }

    #[test]
    fn test_times_truncated_to_millis() {
        let precise = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let exercise = Exercise::new(1, "Precise", precise);
        assert_eq!(exercise.due_date.timestamp_subsec_nanos(), 123_000_000);

        let submission = Submission::new(&User::new("ada"), &exercise, precise, Vec::new());
        assert_eq!(submission.submitted_at, exercise.due_date);
    }

    #[test]
    fn test_submission_query_aliases() {
        assert_eq!(SubmissionQuery::from_str("last").unwrap(), SubmissionQuery::Latest);
        assert_eq!(SubmissionQuery::from_str("BEST").unwrap(), SubmissionQuery::Best);
        assert!(SubmissionQuery::from_str("worst").is_err());
        for kind in SubmissionQuery::all() {
            assert_eq!(kind.as_str().parse::<SubmissionQuery>().unwrap(), *kind);
        }
    }

    #[test]
    fn test_display_name() {
        assert_eq!(User::new("ada").with_name("Ada", "Lovelace").display_name(), "Ada Lovelace");
        assert_eq!(User::new("ada").display_name(), "ada");
    }

    #[test]
    fn test_submission_total() {
        let due = Utc.timestamp_millis_opt(0).unwrap();
        let user = User::new("ada");
        let exercise = Exercise::new(1, "Sums", due);
        let submission = Submission::new(&user, &exercise, due, vec![1.5, 2.5, 6.0]);
        assert_eq!(submission.total(), 10.0);
        assert_eq!(submission.id, None);
        assert_eq!(submission.with_id(4).id, Some(4));
    }
}
