// tests/store_test.rs — Integration test: SQLite session records and the store actor

use livetrack::storage::{self, schema, spawn_store_server, Store};
use livetrack::upstream::Session;
use pretty_assertions::assert_eq;
use rusqlite::Connection;

/// Create an in-memory SQLite store with schema applied.
fn test_store() -> Store {
    let conn = Connection::open_in_memory().unwrap();
    schema::run_migrations(&conn).unwrap();
    Store::new(conn)
}

fn session(id: &str, owner_id: i64, started_at_ms: i64) -> Session {
    Session {
        session_id: id.into(),
        owner_id,
        owner_name: "Koi".into(),
        stream_token: format!("token-{id}"),
        started_at_ms,
        title: format!("stream {id}"),
        ..Session::default()
    }
}

#[test]
fn test_upsert_is_idempotent() {
    let store = test_store();
    let original = session("a", 1, 1_000);

    assert!(store.upsert(&original).unwrap());

    // A later upsert with drifted fields neither duplicates nor overwrites
    let mut drifted = original.clone();
    drifted.title = "renamed".into();
    assert!(!store.upsert(&drifted).unwrap());

    assert_eq!(store.count().unwrap(), 1);
    assert_eq!(store.get("a").unwrap().unwrap(), original);
}

#[test]
fn test_duration_is_monotonic() {
    let store = test_store();
    store.upsert(&session("a", 1, 1_000)).unwrap();

    assert!(!store.update_duration("a", 0).unwrap());
    assert!(store.update_duration("a", 600_000).unwrap());
    // A stale later fetch cannot overwrite or reset it
    assert!(!store.update_duration("a", 5).unwrap());
    assert!(!store.update_duration("a", 0).unwrap());

    assert_eq!(store.get("a").unwrap().unwrap().duration_ms, 600_000);
}

#[test]
fn test_cut_number_is_monotonic() {
    let store = test_store();
    store.upsert(&session("a", 1, 1_000)).unwrap();

    assert!(store.update_cut_number("a", 12345).unwrap());
    assert!(!store.update_cut_number("a", 99).unwrap());
    assert_eq!(store.get("a").unwrap().unwrap().cut_number, 12345);
}

#[test]
fn test_updates_on_missing_session_change_nothing() {
    let store = test_store();
    assert!(!store.update_duration("ghost", 10).unwrap());
    assert!(!store.update_cut_number("ghost", 10).unwrap());
    assert!(!store.update_playback("ghost", "u", "b").unwrap());
    assert_eq!(store.count().unwrap(), 0);
}

#[test]
fn test_playback_needs_both_urls_and_is_set_once() {
    let store = test_store();
    store.upsert(&session("a", 1, 1_000)).unwrap();

    assert!(!store.update_playback("a", "https://alivod/a", "").unwrap());
    assert!(store
        .update_playback("a", "https://alivod/a", "https://txvod/a")
        .unwrap());
    assert!(!store
        .update_playback("a", "https://alivod/other", "https://txvod/other")
        .unwrap());

    let stored = store.get("a").unwrap().unwrap();
    assert_eq!(stored.playback_url, "https://alivod/a");
    assert_eq!(stored.playback_backup_url, "https://txvod/a");
}

#[test]
fn test_list_by_owner_newest_first_with_limit() {
    let store = test_store();
    store.upsert(&session("old", 7, 1_000)).unwrap();
    store.upsert(&session("new", 7, 3_000)).unwrap();
    store.upsert(&session("mid", 7, 2_000)).unwrap();
    store.upsert(&session("other", 8, 5_000)).unwrap();

    let ids = |limit| -> Vec<String> {
        store
            .list_by_owner(7, limit)
            .unwrap()
            .into_iter()
            .map(|s| s.session_id)
            .collect()
    };

    assert_eq!(ids(-1), vec!["new", "mid", "old"]);
    assert_eq!(ids(2), vec!["new", "mid"]);
    assert!(ids(0).is_empty());
    assert!(store.list_by_owner(9, -1).unwrap().is_empty());
}

#[test]
fn test_file_database_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("livetrack.db");

    {
        let store = storage::open(&path).unwrap();
        store.upsert(&session("a", 1, 1_000)).unwrap();
        store.update_duration("a", 42).unwrap();
    }

    let store = storage::open(&path).unwrap();
    assert_eq!(schema::schema_version(store.conn()).unwrap(), schema::latest_version());
    let stored = store.get("a").unwrap().unwrap();
    assert_eq!(stored.duration_ms, 42);
}

#[test]
fn test_legacy_database_keeps_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.db");
    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE sessions (
                session_id TEXT PRIMARY KEY,
                owner_id INTEGER NOT NULL,
                owner_name TEXT NOT NULL,
                stream_token TEXT NOT NULL,
                started_at_ms INTEGER NOT NULL,
                title TEXT NOT NULL,
                duration_ms INTEGER NOT NULL DEFAULT 0,
                playback_url TEXT NOT NULL DEFAULT '',
                playback_backup_url TEXT NOT NULL DEFAULT ''
            );
            INSERT INTO sessions (session_id, owner_id, owner_name, stream_token, started_at_ms, title)
            VALUES ('legacy', 3, 'Old', 'tok', 500, 'before');",
        )
        .unwrap();
    }

    let store = storage::open(&path).unwrap();
    let stored = store.get("legacy").unwrap().unwrap();
    assert_eq!(stored.owner_name, "Old");
    assert_eq!(stored.cut_number, 0);
    assert!(store.update_cut_number("legacy", 77).unwrap());
}

#[tokio::test]
async fn test_actor_serializes_concurrent_upserts() {
    let (handle, join) = spawn_store_server(test_store());

    let mut writers = Vec::new();
    for _ in 0..8 {
        let handle = handle.clone();
        writers.push(tokio::spawn(async move {
            handle.upsert(session("same", 1, 1_000)).await.unwrap()
        }));
    }

    let mut inserted = 0;
    for w in writers {
        if w.await.unwrap() {
            inserted += 1;
        }
    }
    assert_eq!(inserted, 1);
    assert!(handle.exists("same").await.unwrap());

    handle.update_duration("same", 10).await.unwrap();
    let listed = handle.list_by_owner(1, -1).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].duration_ms, 10);

    drop(handle);
    join.await.unwrap();
}
