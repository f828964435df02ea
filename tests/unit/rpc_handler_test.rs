//! Unit tests for the RPC handler, the JSON methods dispatched by `handle_method`.
//!
//! These tests go through the same code path as the `shelfmark-rpc` binary,
//! using a temporary on-disk SQLite database.

use std::sync::Mutex;
use serde_json::{json, Value};
use tempfile::TempDir;

use shelfmark::app::App;
use shelfmark::rpc_handler::{handle_method, RpcError};
use shelfmark::types::errors::ErrorKind;

const OWNER: &str = "user-1";

/// Create a fresh App backed by a temp directory DB.
fn setup() -> (Mutex<App>, TempDir) {
    let tmp = TempDir::new().expect("Failed to create temp dir");
    let db_path = tmp.path().join("test.db");
    let app = App::new(db_path.to_str().unwrap()).expect("Failed to init App");
    (Mutex::new(app), tmp)
}

fn call(app: &Mutex<App>, method: &str, mut params: Value) -> Result<Value, RpcError> {
    if params.get("owner_id").is_none() {
        params["owner_id"] = json!(OWNER);
    }
    handle_method(app, method, &params)
}

fn add_bookmark(app: &Mutex<App>, n: usize) -> String {
    let res = call(
        app,
        "bookmark.add",
        json!({"url": format!("https://site{}.example", n), "title": format!("Site {}", n)}),
    )
    .unwrap();
    res["id"].as_str().unwrap().to_string()
}

fn order(app: &Mutex<App>, cid: &str) -> Vec<String> {
    let res = call(app, "collection.bookmarks", json!({"id": cid})).unwrap();
    res.as_array()
        .unwrap()
        .iter()
        .enumerate()
        .map(|(i, m)| {
            assert_eq!(m["bookmark_index"], json!(i));
            m["bookmark"]["id"].as_str().unwrap().to_string()
        })
        .collect()
}

/// A collection holding four fresh bookmarks, returned with their IDs in order.
fn seeded_collection(app: &Mutex<App>) -> (String, Vec<String>) {
    let ids: Vec<String> = (0..4).map(|n| add_bookmark(app, n)).collect();
    let cid = call(app, "collection.create", json!({"name": "Reading"})).unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();
    call(app, "collection.add_bookmarks", json!({"id": cid, "bookmark_ids": ids})).unwrap();
    (cid, ids)
}

// ─── Ping / dispatch ───

#[test]
fn test_ping() {
    let (app, _tmp) = setup();
    let res = handle_method(&app, "ping", &json!({})).unwrap();
    assert_eq!(res, json!({"pong": true}));
}

#[test]
fn test_unknown_method_returns_invalid_argument() {
    let (app, _tmp) = setup();
    let err = call(&app, "nonexistent.method", json!({})).unwrap_err();
    assert_eq!(err.status, 400);
    assert!(err.message.contains("unknown method"));
}

#[test]
fn test_owner_id_is_required() {
    let (app, _tmp) = setup();
    let err = handle_method(&app, "collection.list", &json!({})).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidArgument);

    let err = handle_method(&app, "collection.list", &json!({"owner_id": "  "})).unwrap_err();
    assert_eq!(err.status, 400);
}

#[test]
fn test_error_serializes_with_status_and_kind() {
    let (app, _tmp) = setup();
    let err = call(&app, "collection.get", json!({"id": "missing"})).unwrap_err();
    let body = serde_json::to_value(&err).unwrap();
    assert_eq!(body["status"], json!(404));
    assert_eq!(body["kind"], json!("not_found"));
}

// ─── Bookmarks and tags ───

#[test]
fn test_bookmark_add_list_and_delete() {
    let (app, _tmp) = setup();
    let id = add_bookmark(&app, 1);
    add_bookmark(&app, 2);

    let page = call(&app, "bookmark.list", json!({"limit": 1})).unwrap();
    assert_eq!(page["total"], json!(2));
    assert_eq!(page["items"].as_array().unwrap().len(), 1);

    let got = call(&app, "bookmark.get", json!({"id": id})).unwrap();
    assert_eq!(got["title"], json!("Site 1"));

    call(&app, "bookmark.delete", json!({"id": id})).unwrap();
    let err = call(&app, "bookmark.get", json!({"id": id})).unwrap_err();
    assert_eq!(err.status, 404);
}

#[test]
fn test_bookmark_add_rejects_bad_url() {
    let (app, _tmp) = setup();
    let err = call(&app, "bookmark.add", json!({"url": "notaurl", "title": "x"})).unwrap_err();
    assert_eq!(err.status, 400);
}

#[test]
fn test_foreign_bookmark_is_forbidden() {
    let (app, _tmp) = setup();
    let id = add_bookmark(&app, 1);
    let err = call(&app, "bookmark.get", json!({"id": id, "owner_id": "intruder"})).unwrap_err();
    assert_eq!(err.status, 403);
}

#[test]
fn test_tag_flow() {
    let (app, _tmp) = setup();
    let bookmark = add_bookmark(&app, 1);
    let tag = call(&app, "tag.create", json!({"name": "rust"})).unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();

    call(&app, "tag.attach", json!({"tag_id": tag, "bookmark_id": bookmark})).unwrap();
    let tags = call(&app, "bookmark.tags", json!({"id": bookmark})).unwrap();
    assert_eq!(tags[0]["name"], json!("rust"));

    let err = call(&app, "tag.create", json!({"name": "rust"})).unwrap_err();
    assert_eq!(err.status, 409);
}

// ─── Collections ───

#[test]
fn test_collection_list_reports_counts() {
    let (app, _tmp) = setup();
    let (cid, _) = seeded_collection(&app);

    let list = call(&app, "collection.list", json!({})).unwrap();
    assert_eq!(list[0]["id"], json!(cid));
    assert_eq!(list[0]["bookmark_count"], json!(4));
}

#[test]
fn test_collection_move_and_remove() {
    let (app, _tmp) = setup();
    let (cid, ids) = seeded_collection(&app);

    call(&app, "collection.move_bookmark", json!({"id": cid, "current_index": 3, "new_index": 1}))
        .unwrap();
    assert_eq!(order(&app, &cid), vec![ids[0].clone(), ids[3].clone(), ids[1].clone(), ids[2].clone()]);

    call(&app, "collection.remove_bookmark", json!({"id": cid, "bookmark_id": ids[3]})).unwrap();
    assert_eq!(order(&app, &cid), vec![ids[0].clone(), ids[1].clone(), ids[2].clone()]);

    let err = call(&app, "collection.remove_bookmark", json!({"id": cid, "bookmark_id": ids[3]}))
        .unwrap_err();
    assert_eq!(err.status, 409);
}

#[test]
fn test_collection_move_out_of_range_and_negative_index() {
    let (app, _tmp) = setup();
    let (cid, ids) = seeded_collection(&app);

    let err = call(&app, "collection.move_bookmark", json!({"id": cid, "current_index": 0, "new_index": 4}))
        .unwrap_err();
    assert_eq!(err.status, 400);

    let err = call(&app, "collection.move_bookmark", json!({"id": cid, "current_index": -1, "new_index": 0}))
        .unwrap_err();
    assert_eq!(err.status, 400);
    assert!(err.message.contains("invalid params"));

    assert_eq!(order(&app, &cid), ids);
}

#[test]
fn test_collection_add_bookmarks_conflict_and_empty() {
    let (app, _tmp) = setup();
    let (cid, ids) = seeded_collection(&app);

    let err = call(&app, "collection.add_bookmarks", json!({"id": cid, "bookmark_ids": [ids[0]]}))
        .unwrap_err();
    assert_eq!(err.status, 409);

    let err = call(&app, "collection.add_bookmarks", json!({"id": cid, "bookmark_ids": []}))
        .unwrap_err();
    assert_eq!(err.status, 400);
}

#[test]
fn test_collection_replace_bookmarks_returns_new_order() {
    let (app, _tmp) = setup();
    let (cid, ids) = seeded_collection(&app);

    let res = call(
        &app,
        "collection.replace_bookmarks",
        json!({"id": cid, "bookmark_ids": [ids[2], "missing", ids[0]]}),
    )
    .unwrap();
    let members = res.as_array().unwrap();
    assert_eq!(members.len(), 2);
    assert_eq!(members[0]["bookmark"]["id"], json!(ids[2]));
    assert_eq!(members[1]["bookmark_index"], json!(1));
}

#[test]
fn test_collection_operations_check_owner() {
    let (app, _tmp) = setup();
    let (cid, _) = seeded_collection(&app);

    let err = call(
        &app,
        "collection.move_bookmark",
        json!({"id": cid, "current_index": 0, "new_index": 1, "owner_id": "intruder"}),
    )
    .unwrap_err();
    assert_eq!(err.status, 403);
}

#[test]
fn test_collection_delete() {
    let (app, _tmp) = setup();
    let (cid, ids) = seeded_collection(&app);

    call(&app, "collection.delete", json!({"id": cid})).unwrap();
    assert_eq!(call(&app, "collection.get", json!({"id": cid})).unwrap_err().status, 404);
    // Bookmarks outlive the collection.
    assert!(call(&app, "bookmark.get", json!({"id": ids[0]})).is_ok());
}
