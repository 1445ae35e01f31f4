use std::fs;

use chrono::NaiveDate;
use tempfile::tempdir;
use todo_runner_core::clock::ManualClock;
use todo_runner_core::filter::Filter;
use todo_runner_core::persist::{DARK_MODE_KEY, TODOS_KEY};
use todo_runner_core::session::Session;
use todo_runner_core::storage::{FileStore, KeyValueStore};
use todo_runner_core::store::Stats;
use todo_runner_core::task::Priority;

#[test]
fn file_backed_session_round_trip() {
    let temp = tempdir().expect("tempdir");
    let clock = ManualClock::new(1_760_000_000_000);

    let storage = FileStore::open(temp.path()).expect("open storage");
    let mut session = Session::open(storage, Box::new(clock.clone()));
    assert!(session.store().tasks().is_empty());
    assert!(session.dark_mode());

    let a = session.add("A", Priority::Low, None).expect("add").expect("added");
    clock.advance(5);
    let b = session
        .add("B", Priority::High, NaiveDate::from_ymd_opt(2026, 11, 2))
        .expect("add")
        .expect("added");
    clock.advance(5);
    let c = session.add("C", Priority::Medium, None).expect("add").expect("added");

    let order: Vec<_> = session.store().tasks().iter().map(|t| t.id.clone()).collect();
    assert_eq!(order, vec![c.clone(), b.clone(), a.clone()]);

    assert!(session.toggle(&b).expect("toggle"));
    assert_eq!(
        session.store().stats(),
        Stats {
            total: 3,
            active: 2,
            completed: 1,
        }
    );
    assert_eq!(session.store().completion_rate(), 33);
    session.set_filter(Filter::Completed);
    assert_eq!(session.store().visible().len(), 1);
    session.set_dark_mode(false).expect("theme");

    let snapshot = session.store().tasks().to_vec();
    session.close();

    assert!(temp.path().join(TODOS_KEY).is_file());
    assert_eq!(
        fs::read_to_string(temp.path().join(DARK_MODE_KEY)).expect("read theme"),
        "false"
    );

    let reopened = Session::open(
        FileStore::open(temp.path()).expect("reopen storage"),
        Box::new(clock.clone()),
    );
    assert_eq!(reopened.store().tasks(), snapshot.as_slice());
    assert_eq!(reopened.store().filter(), Filter::All);
    assert!(!reopened.dark_mode());
    assert_eq!(reopened.store().tasks()[1].created_at, 1_760_000_000_005);
}

#[test]
fn malformed_file_is_discarded_and_overwritten() {
    let temp = tempdir().expect("tempdir");
    fs::write(temp.path().join(TODOS_KEY), "[{\"id\": ").expect("seed garbage");

    let storage = FileStore::open(temp.path()).expect("open storage");
    let mut session = Session::open(storage, Box::new(ManualClock::new(0)));
    assert!(session.store().tasks().is_empty());

    session.add("fresh start", Priority::Medium, None).expect("add");
    let storage = session.close();
    let raw = storage.get(TODOS_KEY).expect("get").expect("stored");
    assert!(raw.contains("\"text\":\"fresh start\""));
}

#[test]
fn loads_list_written_by_another_front_end() {
    let temp = tempdir().expect("tempdir");
    fs::write(
        temp.path().join(TODOS_KEY),
        r#"[{"id":"1760000000000","text":"Old task","completed":false,"priority":"high","createdAt":1760000000000,"dueDate":"2026-10-01"}]"#,
    )
    .expect("seed list");
    fs::write(temp.path().join(DARK_MODE_KEY), "true").expect("seed theme");

    let storage = FileStore::open(temp.path()).expect("open storage");
    let session = Session::open(storage, Box::new(ManualClock::new(0)));
    let tasks = session.store().tasks();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id.as_str(), "1760000000000");
    assert_eq!(tasks[0].priority, Priority::High);

    let today = NaiveDate::from_ymd_opt(2026, 10, 19).expect("date");
    assert_eq!(session.store().overdue(today).len(), 1);
    assert!(session.dark_mode());
}
