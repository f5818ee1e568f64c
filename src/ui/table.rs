use tabled::{settings::Style, Table, Tabled};

use crate::model::Exercise;

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

pub struct TableBuilder {
    rows: Vec<TableRow>,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn add_row(&mut self, label: &str, value: &str) {
        self.rows.push(TableRow {
            metric: label.to_string(),
            value: value.to_string(),
        });
    }

    pub fn build(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }

        Table::new(&self.rows).with(Style::rounded()).to_string()
    }
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub fn stats_table(stats: &[(&str, &str)]) -> String {
    let mut builder = TableBuilder::new();
    for (label, value) in stats {
        builder.add_row(label, value);
    }
    builder.build()
}

#[derive(Tabled)]
struct ExerciseRow {
    #[tabled(rename = "Id")]
    id: i64,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Due")]
    due: String,
    #[tabled(rename = "Questions")]
    questions: usize,
    #[tabled(rename = "Points")]
    points: i64,
}

pub fn exercises_table(exercises: &[Exercise]) -> String {
    if exercises.is_empty() {
        return String::new();
    }

    let rows: Vec<ExerciseRow> = exercises
        .iter()
        .map(|e| ExerciseRow {
            id: e.id,
            name: e.name.clone(),
            due: e.due_date.format("%Y-%m-%d %H:%M").to_string(),
            questions: e.question_count(),
            points: e.total_points(),
        })
        .collect();

    Table::new(&rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn test_empty_tables_render_nothing() {
        assert!(TableBuilder::new().build().is_empty());
        assert!(exercises_table(&[]).is_empty());
    }

    #[test]
    fn test_exercise_table_lists_rows() {
        let due = DateTime::from_timestamp_millis(0).unwrap();
        let exercise = Exercise::new(4, "Normal forms", due)
            .with_question("1nf", "", 10)
            .with_question("3nf", "", 15);
        let table = exercises_table(&[exercise]);
        assert!(table.contains("Normal forms"));
        assert!(table.contains("1970-01-01 00:00"));
        assert!(table.contains("25"));
    }

    #[test]
    fn test_stats_table() {
        let table = stats_table(&[("Users", "3")]);
        assert!(table.contains("Metric"));
        assert!(table.contains("Users"));
    }
}
