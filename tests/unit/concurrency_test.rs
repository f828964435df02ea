//! Concurrency tests for the collection ordering engine.
//!
//! Each worker thread opens its own connection to the same on-disk database,
//! the way independent requests would. SQLite serializes the write
//! transactions; the final ordering must still be dense.

use std::sync::{Arc, Barrier};
use std::thread;

use shelfmark::database::Database;
use shelfmark::managers::bookmark_manager::{BookmarkManager, BookmarkManagerTrait};
use shelfmark::managers::collection_manager::{CollectionManager, CollectionManagerTrait};
use shelfmark::types::settings::DatabaseSettings;
use tempfile::TempDir;

const OWNER: &str = "user-1";

fn settings() -> DatabaseSettings {
    DatabaseSettings {
        path: None,
        busy_timeout_ms: 30_000,
    }
}

/// Creates a database file with one collection of `n` bookmarks.
fn setup(n: usize) -> (TempDir, std::path::PathBuf, String, Vec<String>) {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let path = tmp.path().join("shared.db");
    let db = Database::open_with_settings(&path, &settings()).unwrap();

    let mut bookmarks = BookmarkManager::new(db.connection());
    let ids: Vec<String> = (0..n)
        .map(|i| {
            bookmarks
                .add_bookmark(OWNER, &format!("https://c{}.example", i), &format!("C{}", i), None)
                .unwrap()
        })
        .collect();
    let mut collections = CollectionManager::new(db.connection());
    let cid = collections.create_collection(OWNER, "Shared", None).unwrap();
    collections.append_bookmarks(OWNER, &cid, &ids).unwrap();

    (tmp, path, cid, ids)
}

#[test]
fn test_concurrent_removes_keep_ordering_dense() {
    let (_tmp, path, cid, ids) = setup(12);
    let victims: Vec<String> = ids.iter().step_by(2).cloned().collect();
    let barrier = Arc::new(Barrier::new(victims.len()));

    let handles: Vec<_> = victims
        .iter()
        .cloned()
        .map(|bookmark_id| {
            let path = path.clone();
            let cid = cid.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let db = Database::open_with_settings(&path, &settings()).unwrap();
                let mut mgr = CollectionManager::new(db.connection());
                barrier.wait();
                mgr.remove_bookmark(OWNER, &cid, &bookmark_id).unwrap();
            })
        })
        .collect();
    for h in handles {
        h.join().expect("worker panicked");
    }

    let db = Database::open_with_settings(&path, &settings()).unwrap();
    let mgr = CollectionManager::new(db.connection());
    mgr.verify_order(&cid).unwrap();

    let remaining: Vec<String> = mgr
        .list_collection_bookmarks(OWNER, &cid)
        .unwrap()
        .into_iter()
        .map(|m| m.bookmark.id)
        .collect();
    let expected: Vec<String> = ids.iter().skip(1).step_by(2).cloned().collect();
    assert_eq!(remaining, expected, "survivors keep their relative order");
}

#[test]
fn test_concurrent_moves_and_removes_stay_dense() {
    let (_tmp, path, cid, ids) = setup(10);
    let workers = 6;
    let barrier = Arc::new(Barrier::new(workers));

    let handles: Vec<_> = (0..workers)
        .map(|w| {
            let path = path.clone();
            let cid = cid.clone();
            let victim = ids[w].clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let db = Database::open_with_settings(&path, &settings()).unwrap();
                let mut mgr = CollectionManager::new(db.connection());
                barrier.wait();
                if w % 2 == 0 {
                    mgr.remove_bookmark(OWNER, &cid, &victim).unwrap();
                } else {
                    // At most three removals precede this, so indices 0..=6 stay valid.
                    mgr.move_bookmark(OWNER, &cid, 6, (w as u32) - 1).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().expect("worker panicked");
    }

    let db = Database::open_with_settings(&path, &settings()).unwrap();
    let mgr = CollectionManager::new(db.connection());
    mgr.verify_order(&cid).unwrap();
    assert_eq!(mgr.list_collection_bookmarks(OWNER, &cid).unwrap().len(), 7);
}
