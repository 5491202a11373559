use std::fs;
use std::sync::Arc;
use std::thread;

use tempfile::TempDir;
use todust::{TaskStore, TodoError};

fn with_test_db<F>(f: F)
where
    F: FnOnce(TaskStore),
{
    let dir = TempDir::new().unwrap();
    let store = TaskStore::new(dir.path().join("tasks.json"));
    f(store);
}

#[test]
fn test_list_on_missing_file_is_empty() {
    with_test_db(|store| {
        assert!(store.list().unwrap().is_empty());
        assert!(!store.path().exists());
    });
}

#[test]
fn test_empty_file_is_empty_store() {
    with_test_db(|store| {
        fs::write(store.path(), "  \n").unwrap();
        assert!(store.list().unwrap().is_empty());
    });
}

#[test]
fn test_add_and_list() {
    with_test_db(|store| {
        let task = store.add("buy milk").unwrap();
        assert_eq!(task.id, 1);
        assert!(!task.done);

        let tasks = store.list().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, 1);
        assert_eq!(tasks[0].content, "buy milk");
        assert!(!tasks[0].done);
        assert!(tasks[0].created_time().is_some());
    });
}

#[test]
fn test_add_rejects_empty_content() {
    with_test_db(|store| {
        assert!(matches!(store.add(""), Err(TodoError::Validation(_))));
        assert!(matches!(store.add("   \t"), Err(TodoError::Validation(_))));
        assert!(store.list().unwrap().is_empty());
    });
}

#[test]
fn test_ids_follow_max_plus_one() {
    with_test_db(|store| {
        store.add("a").unwrap();
        store.add("b").unwrap();
        store.delete(1).unwrap();
        let c = store.add("c").unwrap();
        assert_eq!(c.id, 3);

        let tasks = store.list().unwrap();
        let ids: Vec<u64> = tasks.iter().map(|t| t.id).collect();
        let contents: Vec<&str> = tasks.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(contents, vec!["b", "c"]);
    });
}

#[test]
fn test_ids_increase_when_lower_ids_are_deleted() {
    with_test_db(|store| {
        let mut last = 0;
        for i in 0..10 {
            let t = store.add(&format!("task {i}")).unwrap();
            assert!(t.id > last);
            last = t.id;
            if i % 3 == 0 {
                store.delete(t.id - 1).ok();
            }
        }
    });
}

#[test]
fn test_deleting_highest_id_lets_it_come_back() {
    with_test_db(|store| {
        store.add("a").unwrap();
        store.add("b").unwrap();
        store.delete(2).unwrap();
        let c = store.add("c").unwrap();
        assert_eq!(c.id, 2);

        let ids: Vec<u64> = store.list().unwrap().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2]);
    });
}

#[test]
fn test_add_fails_when_ids_are_exhausted() {
    with_test_db(|store| {
        let doc = format!(r#"[{{"id":{},"content":"last","done":false,"created_at":""}}]"#, u64::MAX);
        fs::write(store.path(), &doc).unwrap();
        assert!(matches!(store.add("one more"), Err(TodoError::Validation(_))));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), doc);
    });
}

#[test]
fn test_next_id_uses_existing_maximum() {
    with_test_db(|store| {
        fs::write(
            store.path(),
            r#"[{"id":4,"content":"x","done":false,"created_at":""},{"content":"y","id":9}]"#,
        )
        .unwrap();
        assert_eq!(store.add("z").unwrap().id, 10);
    });
}

#[test]
fn test_set_done_round_trip() {
    with_test_db(|store| {
        let original = store.add("water plants").unwrap();

        let done = store.set_done(original.id, true).unwrap();
        assert!(done.done);
        assert!(store.list().unwrap()[0].done);

        store.set_done(original.id, false).unwrap();
        let tasks = store.list().unwrap();
        assert_eq!(tasks[0], original);
    });
}

#[test]
fn test_set_done_unknown_id() {
    with_test_db(|store| {
        store.add("a").unwrap();
        assert!(matches!(store.set_done(999, true), Err(TodoError::NotFound(999))));
    });
}

#[test]
fn test_delete_unknown_id_leaves_file_untouched() {
    with_test_db(|store| {
        store.add("a").unwrap();
        store.add("b").unwrap();
        let before = fs::read(store.path()).unwrap();

        assert!(matches!(store.delete(42), Err(TodoError::NotFound(42))));
        assert_eq!(fs::read(store.path()).unwrap(), before);
    });
}

#[test]
fn test_delete_removes_task() {
    with_test_db(|store| {
        store.add("a").unwrap();
        store.add("b").unwrap();
        store.add("c").unwrap();
        let removed = store.delete(2).unwrap();
        assert_eq!(removed.content, "b");
        assert!(store.list().unwrap().iter().all(|t| t.id != 2));
        assert_eq!(store.list().unwrap().len(), 2);
    });
}

#[test]
fn test_clear() {
    with_test_db(|store| {
        store.clear().unwrap();
        assert!(store.list().unwrap().is_empty());

        store.add("a").unwrap();
        store.add("b").unwrap();
        store.clear().unwrap();
        assert!(store.list().unwrap().is_empty());
        assert_eq!(store.add("c").unwrap().id, 1);
    });
}

#[test]
fn test_clear_recovers_corrupt_file() {
    with_test_db(|store| {
        fs::write(store.path(), "{not json").unwrap();
        store.clear().unwrap();
        assert!(store.list().unwrap().is_empty());
    });
}

#[test]
fn test_corrupt_file_is_decode_error() {
    with_test_db(|store| {
        fs::write(store.path(), "[{\"id\": \"one\"}]").unwrap();
        assert!(matches!(store.list(), Err(TodoError::Decode { .. })));
        assert!(matches!(store.add("x"), Err(TodoError::Decode { .. })));
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "[{\"id\": \"one\"}]");
    });
}

#[test]
fn test_directory_path_is_io_error() {
    let dir = TempDir::new().unwrap();
    let store = TaskStore::new(dir.path());
    assert!(matches!(store.list(), Err(TodoError::Io { .. })));
}

#[test]
fn test_creates_missing_parent_directory() {
    let dir = TempDir::new().unwrap();
    let store = TaskStore::new(dir.path().join("deep").join("er").join("tasks.json"));
    store.add("a").unwrap();
    assert_eq!(store.list().unwrap().len(), 1);
}

#[test]
fn test_reads_legacy_documents() {
    with_test_db(|store| {
        fs::write(
            store.path(),
            r#"[
 {
  "id": 1,
  "content": "old task",
  "done": true,
  "created_at": "2025-03-01 09:30:00.123456789 +0800 CST m=+0.000012345"
 }
]"#,
        )
        .unwrap();
        let tasks = store.list().unwrap();
        assert_eq!(tasks[0].content, "old task");
        assert!(tasks[0].done);
        assert!(tasks[0].created_time().is_some());
    });
}

#[test]
fn test_file_keeps_field_order() {
    with_test_db(|store| {
        store.add("a").unwrap();
        let s = fs::read_to_string(store.path()).unwrap();
        let id = s.find("\"id\"").unwrap();
        let content = s.find("\"content\"").unwrap();
        let done = s.find("\"done\"").unwrap();
        let created = s.find("\"created_at\"").unwrap();
        assert!(id < content && content < done && done < created);
    });
}

#[test]
fn test_independent_stores_in_one_process() {
    let dir = TempDir::new().unwrap();
    let a = TaskStore::new(dir.path().join("a.json"));
    let b = TaskStore::new(dir.path().join("b.json"));
    a.add("only in a").unwrap();
    assert_eq!(a.list().unwrap().len(), 1);
    assert!(b.list().unwrap().is_empty());
}

#[test]
fn test_concurrent_adds_lose_nothing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tasks.json");
    let store = Arc::new(TaskStore::new(&path));

    let handles: Vec<_> = (0..8)
        .map(|n| {
            // Separate handles for the same file must still serialize.
            let store = if n % 2 == 0 {
                Arc::clone(&store)
            } else {
                Arc::new(TaskStore::new(&path))
            };
            thread::spawn(move || {
                for i in 0..10 {
                    store.add(&format!("worker {n} item {i}")).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let tasks = store.list().unwrap();
    assert_eq!(tasks.len(), 80);
    let mut ids: Vec<u64> = tasks.iter().map(|t| t.id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids, (1..=80).collect::<Vec<u64>>());
}

#[test]
fn test_lock_file_sits_next_to_task_file() {
    with_test_db(|store| {
        store.add("a").unwrap();
        let lock = store.path().with_file_name("tasks.json.lock");
        assert!(lock.exists());
        // The lock is released once the call returns.
        store.add("b").unwrap();
        store.clear().unwrap();
    });
}

#[cfg(unix)]
#[test]
fn test_save_keeps_file_mode() {
    use std::os::unix::fs::PermissionsExt;

    with_test_db(|store| {
        store.add("a").unwrap();
        let mode = fs::metadata(store.path()).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);

        fs::set_permissions(store.path(), fs::Permissions::from_mode(0o640)).unwrap();
        store.add("b").unwrap();
        let mode = fs::metadata(store.path()).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o640);
    });
}

#[cfg(unix)]
#[test]
fn test_save_follows_symlinked_task_file() {
    let dir = TempDir::new().unwrap();
    let real = dir.path().join("real.json");
    let link = dir.path().join("tasks.json");
    fs::write(&real, "[]").unwrap();
    std::os::unix::fs::symlink(&real, &link).unwrap();

    let store = TaskStore::new(&link);
    store.add("through the link").unwrap();

    assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
    assert!(fs::read_to_string(&real).unwrap().contains("through the link"));
    assert_eq!(store.list().unwrap().len(), 1);
}
