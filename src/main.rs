//! Gradestore CLI - maintenance commands over a grading store

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use gradestore::config::{self, GradestoreConfig};
use gradestore::ui::{self, Icons};
use gradestore::{
    Exercise, ExerciseId, GradingStore, Submission, SubmissionId, SubmissionQuery, User,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "gradestore")]
#[command(version)]
#[command(about = "Grading store - users, exercises and graded submissions on SQLite")]
#[command(long_about = r#"
Gradestore keeps users, exercises and graded submissions in a SQLite file.

Example usage:
  gradestore init --database sqlite:course.db
  gradestore user ada --password secret --first Ada --last Lovelace
  gradestore exercise exercises/joins.toml
  gradestore submit ada 1 7.5 10 4
  gradestore best ada 1
"#)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON instead of human-readable output
    #[arg(long, global = true)]
    json: bool,

    /// Path to the config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Connection string (overrides the config file)
    #[arg(short, long, global = true)]
    database: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database schema and write a config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Add a user, or update the names and password of an existing one
    User {
        username: String,

        #[arg(short, long)]
        password: String,

        #[arg(long)]
        first: Option<String>,

        #[arg(long)]
        last: Option<String>,
    },

    /// Check a username and password
    Login {
        username: String,

        #[arg(short, long)]
        password: String,
    },

    /// Add an exercise described in a TOML file
    Exercise {
        /// Path to the exercise file
        file: PathBuf,
    },

    /// List all exercises
    Exercises,

    /// Store a graded submission
    Submit {
        username: String,

        exercise: ExerciseId,

        /// One grade per question, in question order
        #[arg(required = true, num_args = 1.., allow_negative_numbers = true)]
        grades: Vec<f64>,

        /// Explicit submission id (assigned by the database otherwise)
        #[arg(long)]
        id: Option<SubmissionId>,

        /// Submission time, RFC 3339 (defaults to now)
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// Show the latest submission of a user for an exercise
    Last { username: String, exercise: ExerciseId },

    /// Show the highest-graded submission of a user for an exercise
    Best { username: String, exercise: ExerciseId },

    /// Show statistics about the store
    Stats,
}

/// Exercise file layout:
///
/// ```toml
/// id = 1
/// name = "Joins"
/// due = "2025-01-31T23:59:00Z"
///
/// [[questions]]
/// name = "inner"
/// description = "Write an inner join"
/// points = 10
/// ```
#[derive(Debug, Deserialize)]
struct ExerciseDocument {
    id: ExerciseId,
    name: String,
    due: DateTime<Utc>,
    #[serde(default)]
    questions: Vec<QuestionDocument>,
}

#[derive(Debug, Deserialize)]
struct QuestionDocument {
    name: String,
    #[serde(default)]
    description: String,
    points: i64,
}

impl ExerciseDocument {
    fn load(path: &Path) -> anyhow::Result<Exercise> {
        let contents = std::fs::read_to_string(path)?;
        let doc: ExerciseDocument = toml::from_str(&contents)?;
        let mut exercise = Exercise::new(doc.id, doc.name, doc.due);
        for q in doc.questions {
            exercise.add_question(q.name, q.description, q.points);
        }
        Ok(exercise)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let file_config = config::load_config(cli.config.as_deref())?;
    let target = config::resolve_connection(cli.database.as_deref(), file_config.as_ref())?;
    config::ensure_db_dir(&target)?;

    tracing::debug!("Using store {}", target);
    let mut store = GradingStore::open_target(&target)?;

    match cli.command {
        Commands::Init { force } => {
            let path = cli.config.clone().unwrap_or_else(config::default_config_path);
            let new_config = GradestoreConfig {
                database: Some(target.to_connection_string()),
            };
            config::write_config(&path, &new_config, force)?;

            if cli.json {
                print_json(&serde_json::json!({
                    "database": target.to_connection_string(),
                    "config": path.display().to_string(),
                }))?;
            } else {
                ui::header("Initialized grading store");
                ui::info(&format!("{} Database", Icons::DATABASE), &target.to_string());
                ui::info("Config", &path.display().to_string());
            }
        }

        Commands::User { username, password, first, last } => {
            let user = User {
                id: None,
                username,
                firstname: first,
                lastname: last,
            };
            let id = store.add_or_update_user(&user, &password)?;

            if cli.json {
                print_json(&serde_json::json!({ "username": user.username, "id": id }))?;
            } else {
                ui::success(&format!("{} {} saved (id {})", Icons::PERSON, user.display_name(), id));
            }
        }

        Commands::Login { username, password } => {
            let ok = store.verify_login(&username, &password)?;

            if cli.json {
                print_json(&serde_json::json!({ "username": username, "valid": ok }))?;
            } else if ok {
                ui::success(&format!("Credentials for {} are valid", username));
            } else {
                ui::error(&format!("Invalid username or password for {}", username));
            }

            if !ok {
                store.close()?;
                std::process::exit(1);
            }
        }

        Commands::Exercise { file } => {
            let exercise = ExerciseDocument::load(&file)?;
            match store.add_exercise(&exercise)? {
                Ok(id) => {
                    if cli.json {
                        print_json(&exercise)?;
                    } else {
                        ui::success(&format!(
                            "{} Exercise {} '{}' added with {} questions",
                            Icons::BOOK,
                            id,
                            exercise.name,
                            exercise.question_count()
                        ));
                    }
                }
                Err(rejection) => anyhow::bail!("{}", rejection),
            }
        }

        Commands::Exercises => {
            let exercises = store.load_exercises()?;

            if cli.json {
                print_json(&exercises)?;
            } else if exercises.is_empty() {
                ui::warn("No exercises stored.");
            } else {
                ui::section(&format!("{} Exercises", Icons::BOOK));
                println!("{}", ui::exercises_table(&exercises));
            }
        }

        Commands::Submit { username, exercise, grades, id, at } => {
            let user = User::new(username);
            let exercise = store
                .load_exercise(exercise)?
                .ok_or_else(|| anyhow::anyhow!("exercise {} not found", exercise))?;

            let mut submission =
                Submission::new(&user, &exercise, at.unwrap_or_else(Utc::now), grades);
            if let Some(id) = id {
                submission = submission.with_id(id);
            }

            match store.store_submission(&submission)? {
                Ok(id) => {
                    if cli.json {
                        print_json(&serde_json::json!({
                            "id": id,
                            "total": submission.total(),
                        }))?;
                    } else {
                        ui::success(&format!(
                            "Stored submission {} ({:.2} / {})",
                            id,
                            submission.total(),
                            exercise.total_points()
                        ));
                    }
                }
                Err(rejection) => anyhow::bail!("{}", rejection),
            }
        }

        Commands::Last { username, exercise } => {
            show_submission(&store, &username, exercise, SubmissionQuery::Latest, cli.json)?;
        }

        Commands::Best { username, exercise } => {
            show_submission(&store, &username, exercise, SubmissionQuery::Best, cli.json)?;
        }

        Commands::Stats => {
            let stats = store.stats()?;

            if cli.json {
                print_json(&stats)?;
            } else {
                ui::section(&format!("{} Gradestore Statistics ({})", Icons::STATS, target));
                let rows = [
                    ("Users", stats.users.to_string()),
                    ("Exercises", stats.exercises.to_string()),
                    ("Questions", stats.questions.to_string()),
                    ("Submissions", stats.submissions.to_string()),
                    ("Grades", stats.grades.to_string()),
                ];
                let rows: Vec<(&str, &str)> = rows.iter().map(|(k, v)| (*k, v.as_str())).collect();
                println!("{}", ui::stats_table(&rows));
            }
        }
    }

    store.close()?;
    Ok(())
}

fn show_submission(
    store: &GradingStore,
    username: &str,
    exercise_id: ExerciseId,
    query: SubmissionQuery,
    json: bool,
) -> anyhow::Result<()> {
    let Some(user) = store.find_user(username)? else {
        anyhow::bail!("user {} not found", username);
    };
    let Some(exercise) = store.load_exercise(exercise_id)? else {
        anyhow::bail!("exercise {} not found", exercise_id);
    };

    let submission = store.get_submission(&user, &exercise, query)?;

    if json {
        return print_json(&submission);
    }

    let Some(submission) = submission else {
        ui::warn(&format!("{} has no submission for exercise {}", username, exercise_id));
        return Ok(());
    };

    let id = submission
        .id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "?".to_string());
    let icon = match query {
        SubmissionQuery::Latest => Icons::CLOCK,
        SubmissionQuery::Best => Icons::STAR,
    };
    ui::section(&format!("{} {} submission of {} for '{}'", icon, query, user.display_name(), exercise.name));
    ui::summary_row("Submission:", &id);
    ui::summary_row("Submitted:", &submission.submitted_at.to_rfc3339());
    for (question, grade) in exercise.questions.iter().zip(&submission.grades) {
        ui::grade_line(question.id, &question.name, *grade, question.points);
    }
    ui::summary_row(
        "Total:",
        &format!("{:.2} / {}", submission.total(), exercise.total_points()),
    );
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
