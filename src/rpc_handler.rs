//! RPC method handler for the Shelfmark JSON-RPC protocol.
//!
//! Kept apart from `rpc_server.rs` so it can be unit-tested independently.
//! `handle_method` validates the request shape with serde, then dispatches
//! to the managers. Every request carries `owner_id`, the identity the host
//! process authenticated; the managers enforce ownership against it.

use std::fmt;
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::app::App;
use crate::managers::bookmark_manager::{BookmarkManager, BookmarkManagerTrait};
use crate::managers::collection_manager::{CollectionManager, CollectionManagerTrait};
use crate::managers::tag_manager::{TagManager, TagManagerTrait};
use crate::types::errors::{BookmarkError, CollectionError, ErrorKind, TagError};

/// Error returned to the RPC client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcError {
    pub status: u16,
    pub kind: ErrorKind,
    pub message: String,
}

impl RpcError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            status: kind.status_code(),
            kind,
            message: message.into(),
        }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.status)
    }
}

impl std::error::Error for RpcError {}

impl From<BookmarkError> for RpcError {
    fn from(e: BookmarkError) -> Self {
        Self::new(e.kind(), e.to_string())
    }
}

impl From<TagError> for RpcError {
    fn from(e: TagError) -> Self {
        Self::new(e.kind(), e.to_string())
    }
}

impl From<CollectionError> for RpcError {
    fn from(e: CollectionError) -> Self {
        Self::new(e.kind(), e.to_string())
    }
}

// ─── Request shapes ───

#[derive(Deserialize)]
struct Owner {
    owner_id: String,
}

#[derive(Deserialize)]
struct ById {
    id: String,
}

#[derive(Deserialize)]
struct AddBookmark {
    url: String,
    title: String,
    description: Option<String>,
}

#[derive(Deserialize)]
struct UpdateBookmark {
    id: String,
    url: Option<String>,
    title: Option<String>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct ListPage {
    limit: Option<u32>,
    offset: Option<u32>,
}

#[derive(Deserialize)]
struct Search {
    query: String,
}

#[derive(Deserialize)]
struct Named {
    name: String,
}

#[derive(Deserialize)]
struct Rename {
    id: String,
    name: String,
}

#[derive(Deserialize)]
struct TagLink {
    tag_id: String,
    bookmark_id: String,
}

#[derive(Deserialize)]
struct CreateCollection {
    name: String,
    description: Option<String>,
}

#[derive(Deserialize)]
struct UpdateCollection {
    id: String,
    name: Option<String>,
    description: Option<String>,
}

#[derive(Deserialize)]
struct BookmarkIds {
    id: String,
    bookmark_ids: Vec<String>,
}

#[derive(Deserialize)]
struct Membership {
    id: String,
    bookmark_id: String,
}

#[derive(Deserialize)]
struct MoveBookmark {
    id: String,
    current_index: u32,
    new_index: u32,
}

/// Deserializes `params` into a request shape, reporting mismatches as 400.
fn parse<T: DeserializeOwned>(params: &Value) -> Result<T, RpcError> {
    serde_json::from_value(params.clone())
        .map_err(|e| RpcError::invalid_params(format!("invalid params: {}", e)))
}

/// Dispatch a JSON-RPC method call to the appropriate handler.
pub fn handle_method(app: &Mutex<App>, method: &str, params: &Value) -> Result<Value, RpcError> {
    if method == "ping" {
        return Ok(json!({"pong": true}));
    }

    let Owner { owner_id } = parse(params)?;
    if owner_id.trim().is_empty() {
        return Err(RpcError::invalid_params("owner_id must not be empty"));
    }
    let owner = owner_id.as_str();

    let a = app.lock().map_err(|e| RpcError::internal(e.to_string()))?;
    let conn = a.db.connection();

    match method {
        // ─── Bookmarks ───
        "bookmark.add" => {
            let p: AddBookmark = parse(params)?;
            let mut mgr = BookmarkManager::new(conn);
            let id = mgr.add_bookmark(owner, &p.url, &p.title, p.description.as_deref())?;
            Ok(json!({"id": id, "url": p.url, "title": p.title}))
        }
        "bookmark.get" => {
            let p: ById = parse(params)?;
            let mgr = BookmarkManager::new(conn);
            Ok(json!(mgr.get_bookmark(owner, &p.id)?))
        }
        "bookmark.update" => {
            let p: UpdateBookmark = parse(params)?;
            let mut mgr = BookmarkManager::new(conn);
            mgr.update_bookmark(owner, &p.id, p.url.as_deref(), p.title.as_deref(), p.description.as_deref())?;
            Ok(json!({"ok": true}))
        }
        "bookmark.delete" => {
            let p: ById = parse(params)?;
            let mut mgr = BookmarkManager::new(conn);
            mgr.remove_bookmark(owner, &p.id)?;
            Ok(json!({"ok": true}))
        }
        "bookmark.list" => {
            let p: ListPage = parse(params)?;
            let limit = p.limit.unwrap_or(a.settings().rpc.default_page_size);
            let mgr = BookmarkManager::new(conn);
            let page = mgr.list_bookmarks_paginated(owner, limit as i64, p.offset.unwrap_or(0) as i64)?;
            Ok(json!(page))
        }
        "bookmark.search" => {
            let p: Search = parse(params)?;
            let mgr = BookmarkManager::new(conn);
            Ok(json!(mgr.search_bookmarks(owner, &p.query)?))
        }
        "bookmark.tags" => {
            let p: ById = parse(params)?;
            let mgr = TagManager::new(conn);
            Ok(json!(mgr.tags_for_bookmark(owner, &p.id)?))
        }

        // ─── Tags ───
        "tag.create" => {
            let p: Named = parse(params)?;
            let mut mgr = TagManager::new(conn);
            let id = mgr.create_tag(owner, &p.name)?;
            Ok(json!({"id": id, "name": p.name.trim()}))
        }
        "tag.list" => {
            let mgr = TagManager::new(conn);
            Ok(json!(mgr.list_tags(owner)?))
        }
        "tag.rename" => {
            let p: Rename = parse(params)?;
            let mut mgr = TagManager::new(conn);
            mgr.rename_tag(owner, &p.id, &p.name)?;
            Ok(json!({"ok": true}))
        }
        "tag.delete" => {
            let p: ById = parse(params)?;
            let mut mgr = TagManager::new(conn);
            mgr.delete_tag(owner, &p.id)?;
            Ok(json!({"ok": true}))
        }
        "tag.attach" => {
            let p: TagLink = parse(params)?;
            let mut mgr = TagManager::new(conn);
            mgr.tag_bookmark(owner, &p.tag_id, &p.bookmark_id)?;
            Ok(json!({"ok": true}))
        }
        "tag.detach" => {
            let p: TagLink = parse(params)?;
            let mut mgr = TagManager::new(conn);
            mgr.untag_bookmark(owner, &p.tag_id, &p.bookmark_id)?;
            Ok(json!({"ok": true}))
        }
        "tag.bookmarks" => {
            let p: ById = parse(params)?;
            let mgr = TagManager::new(conn);
            Ok(json!(mgr.bookmarks_with_tag(owner, &p.id)?))
        }

        // ─── Collections ───
        "collection.create" => {
            let p: CreateCollection = parse(params)?;
            let mut mgr = CollectionManager::new(conn);
            let id = mgr.create_collection(owner, &p.name, p.description.as_deref())?;
            Ok(json!({"id": id, "name": p.name.trim()}))
        }
        "collection.get" => {
            let p: ById = parse(params)?;
            let mgr = CollectionManager::new(conn);
            Ok(json!(mgr.get_collection(owner, &p.id)?))
        }
        "collection.list" => {
            let mgr = CollectionManager::new(conn);
            Ok(json!(mgr.list_collections(owner)?))
        }
        "collection.update" => {
            let p: UpdateCollection = parse(params)?;
            let mut mgr = CollectionManager::new(conn);
            mgr.update_collection(owner, &p.id, p.name.as_deref(), p.description.as_deref())?;
            Ok(json!({"ok": true}))
        }
        "collection.delete" => {
            let p: ById = parse(params)?;
            let mut mgr = CollectionManager::new(conn);
            mgr.delete_collection(owner, &p.id)?;
            Ok(json!({"ok": true}))
        }
        "collection.bookmarks" => {
            let p: ById = parse(params)?;
            let mgr = CollectionManager::new(conn);
            Ok(json!(mgr.list_collection_bookmarks(owner, &p.id)?))
        }
        "collection.replace_bookmarks" => {
            let p: BookmarkIds = parse(params)?;
            let mut mgr = CollectionManager::new(conn);
            Ok(json!(mgr.replace_bookmarks(owner, &p.id, &p.bookmark_ids)?))
        }
        "collection.add_bookmarks" => {
            let p: BookmarkIds = parse(params)?;
            let mut mgr = CollectionManager::new(conn);
            mgr.append_bookmarks(owner, &p.id, &p.bookmark_ids)?;
            Ok(json!({"ok": true}))
        }
        "collection.remove_bookmark" => {
            let p: Membership = parse(params)?;
            let mut mgr = CollectionManager::new(conn);
            mgr.remove_bookmark(owner, &p.id, &p.bookmark_id)?;
            Ok(json!({"ok": true}))
        }
        "collection.move_bookmark" => {
            let p: MoveBookmark = parse(params)?;
            let mut mgr = CollectionManager::new(conn);
            mgr.move_bookmark(owner, &p.id, p.current_index, p.new_index)?;
            Ok(json!({"ok": true}))
        }

        _ => Err(RpcError::invalid_params(format!("unknown method: {}", method))),
    }
}
