//! File-backed store behavior across open/close

use chrono::DateTime;
use gradestore::{Exercise, GradingStore, Rejection, Submission, User};

fn at(millis: i64) -> chrono::DateTime<chrono::Utc> {
    DateTime::from_timestamp_millis(millis).unwrap()
}

fn course_exercise() -> Exercise {
    Exercise::new(12, "Aggregates", at(1_735_689_600_000))
        .with_question("count", "COUNT per group", 10)
        .with_question("having", "Filter groups", 10)
        .with_question("window", "Running totals", 20)
}

#[test]
fn data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let conn = format!("sqlite:{}", dir.path().join("grades.db").display());
    let user = User::new("linus").with_name("Linus", "Torvalds");
    let exercise = course_exercise();

    {
        let mut store = GradingStore::open(&conn).unwrap();
        store.add_or_update_user(&user, "hunter2").unwrap();
        store.add_exercise(&exercise).unwrap().unwrap();
        store
            .store_submission(&Submission::new(&user, &exercise, at(1_000), vec![10.0, 5.0, 20.0]))
            .unwrap()
            .unwrap();
        store.close().unwrap();
    }

    let mut store = GradingStore::open(&conn).unwrap();
    assert!(store.verify_login("linus", "hunter2").unwrap());
    assert_eq!(store.load_exercises().unwrap(), vec![exercise.clone()]);

    let last = store.get_last_submission(&user, &exercise).unwrap().unwrap();
    assert_eq!(last.grades, vec![10.0, 5.0, 20.0]);
    assert_eq!(last.submitted_at, at(1_000));

    // Reopening must not have reset the duplicate check
    assert_eq!(
        store.add_exercise(&exercise).unwrap(),
        Err(Rejection::DuplicateExerciseId(12))
    );
}

#[test]
fn jdbc_style_connection_strings_open() {
    let dir = tempfile::tempdir().unwrap();
    let conn = format!("jdbc:sqlite:{}", dir.path().join("legacy.db").display());

    let store = GradingStore::open(&conn).unwrap();
    assert_eq!(store.stats().unwrap().exercises, 0);
    store.close().unwrap();
    assert!(dir.path().join("legacy.db").exists());
}

#[test]
fn in_memory_connection_string() {
    let mut store = GradingStore::open("sqlite::memory:").unwrap();
    let id = store.add_or_update_user(&User::new("mem"), "pw").unwrap();
    assert_eq!(store.find_user("mem").unwrap().unwrap().id, Some(id));
}

#[test]
fn unsupported_connection_is_an_error() {
    assert!(GradingStore::open("jdbc:mysql://localhost/grades").is_err());
}

#[test]
fn best_and_latest_over_many_submissions() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = GradingStore::open_path(&dir.path().join("many.db")).unwrap();
    let user = User::new("ken");
    let exercise = course_exercise();
    store.add_or_update_user(&user, "pw").unwrap();
    store.add_exercise(&exercise).unwrap().unwrap();

    let attempts = [
        (100, vec![1.0, 1.0, 1.0]),
        (400, vec![2.0, 2.0, 2.0]),
        (300, vec![10.0, 10.0, 20.0]),
        (200, vec![0.0, 0.0, 0.0]),
    ];
    let mut ids = Vec::new();
    for (time, grades) in attempts {
        let id = store
            .store_submission(&Submission::new(&user, &exercise, at(time), grades))
            .unwrap()
            .unwrap();
        ids.push(id);
    }

    let last = store.get_last_submission(&user, &exercise).unwrap().unwrap();
    assert_eq!(last.id, Some(ids[1]));

    let best = store.get_best_submission(&user, &exercise).unwrap().unwrap();
    assert_eq!(best.id, Some(ids[2]));
    assert_eq!(best.total(), exercise.total_points() as f64);

    let stats = store.stats().unwrap();
    assert_eq!(stats.submissions, 4);
    assert_eq!(stats.grades, 12);
}

#[test]
fn concurrent_upserts_of_one_username_share_an_id() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.db");
    // Create the schema once so the writers only race on the upsert
    GradingStore::open_path(&path).unwrap().close().unwrap();

    let ids: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let path = path.clone();
                scope.spawn(move || {
                    let mut store = GradingStore::open_path(&path).unwrap();
                    let mut ids = Vec::new();
                    for round in 0..25 {
                        let user = User::new("shared").with_name(format!("w{}", worker), "Writer");
                        let password = format!("pw-{}-{}", worker, round);
                        ids.push(store.add_or_update_user(&user, &password).unwrap());
                    }
                    store.close().unwrap();
                    ids
                })
            })
            .collect();
        handles.into_iter().flat_map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(ids.len(), 200);
    assert!(ids.iter().all(|id| *id == ids[0]));

    let store = GradingStore::open_path(&path).unwrap();
    assert_eq!(store.stats().unwrap().users, 1);
    assert_eq!(store.find_user("shared").unwrap().unwrap().id, Some(ids[0]));
}
