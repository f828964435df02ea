//! Collection Manager for Shelfmark.
//!
//! Implements `CollectionManagerTrait`: CRUD for collections plus the
//! membership ordering engine that keeps `bookmark_index` dense
//! (`{0, .., n - 1}`) within every collection.
//!
//! Every mutating operation runs inside an IMMEDIATE transaction, so the
//! write lock is taken before the first read and concurrent operations on the
//! same collection are serialized by SQLite. Index shifts are set-based range
//! updates. Dropping a transaction without committing rolls it back.

use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::instrument;
use uuid::Uuid;

use crate::managers::bookmark_manager::BookmarkManager;
use crate::types::collection::{Collection, CollectionBookmark, CollectionSummary};
use crate::types::errors::CollectionError;

/// Trait defining collection and membership ordering operations.
///
/// Every method takes the acting `owner_id`; operations on collections or
/// bookmarks owned by someone else fail with `Forbidden` before any write.
pub trait CollectionManagerTrait {
    fn create_collection(&mut self, owner_id: &str, name: &str, description: Option<&str>) -> Result<String, CollectionError>;
    fn get_collection(&self, owner_id: &str, id: &str) -> Result<Collection, CollectionError>;
    fn list_collections(&self, owner_id: &str) -> Result<Vec<CollectionSummary>, CollectionError>;
    fn update_collection(&mut self, owner_id: &str, id: &str, name: Option<&str>, description: Option<&str>) -> Result<(), CollectionError>;
    fn delete_collection(&mut self, owner_id: &str, id: &str) -> Result<(), CollectionError>;
    /// Bookmarks of a collection in `bookmark_index` order.
    fn list_collection_bookmarks(&self, owner_id: &str, collection_id: &str) -> Result<Vec<CollectionBookmark>, CollectionError>;
    /// Replaces the whole membership list. Unknown or foreign IDs are dropped.
    fn replace_bookmarks(&mut self, owner_id: &str, collection_id: &str, bookmark_ids: &[String]) -> Result<Vec<CollectionBookmark>, CollectionError>;
    /// Appends bookmarks after the current last index, in the given order.
    fn append_bookmarks(&mut self, owner_id: &str, collection_id: &str, bookmark_ids: &[String]) -> Result<(), CollectionError>;
    /// Removes one bookmark and closes the gap it leaves.
    fn remove_bookmark(&mut self, owner_id: &str, collection_id: &str, bookmark_id: &str) -> Result<(), CollectionError>;
    /// Moves the bookmark at `current_index` to `new_index`.
    fn move_bookmark(&mut self, owner_id: &str, collection_id: &str, current_index: u32, new_index: u32) -> Result<(), CollectionError>;
    /// Checks that the indices of a collection are exactly `{0, .., n - 1}`.
    fn verify_order(&self, collection_id: &str) -> Result<(), CollectionError>;
}

/// Collection manager backed by a SQLite connection.
pub struct CollectionManager<'a> {
    conn: &'a Connection,
}

impl<'a> CollectionManager<'a> {
    /// Creates a new `CollectionManager` using the provided database connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }

    /// Starts a write transaction that holds the database write lock from its first statement.
    fn begin_write(&self) -> Result<Transaction<'a>, CollectionError> {
        Ok(Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?)
    }

    fn row_to_collection(row: &rusqlite::Row) -> rusqlite::Result<Collection> {
        Ok(Collection {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    fn validate_name(name: &str) -> Result<(), CollectionError> {
        if name.trim().is_empty() {
            return Err(CollectionError::InvalidName("name must not be empty".to_string()));
        }
        Ok(())
    }

    fn load_members(conn: &Connection, collection_id: &str) -> Result<Vec<CollectionBookmark>, CollectionError> {
        let mut stmt = conn.prepare(
            "SELECT b.id, b.owner_id, b.url, b.title, b.description, b.created_at, b.updated_at, \
                    cb.collection_id, cb.bookmark_index \
             FROM collection_bookmarks cb JOIN bookmarks b ON b.id = cb.bookmark_id \
             WHERE cb.collection_id = ?1 ORDER BY cb.bookmark_index",
        )?;
        let rows = stmt.query_map(params![collection_id], |row| {
            Ok(CollectionBookmark {
                bookmark: BookmarkManager::row_to_bookmark(row)?,
                collection_id: row.get(7)?,
                bookmark_index: row.get(8)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}

/// Fails with `NotFound` or `Forbidden` unless `owner_id` owns the collection.
fn ensure_collection_owned(conn: &Connection, owner_id: &str, collection_id: &str) -> Result<(), CollectionError> {
    let owner: Option<String> = conn
        .query_row(
            "SELECT owner_id FROM collections WHERE id = ?1",
            params![collection_id],
            |row| row.get(0),
        )
        .optional()?;
    match owner {
        None => Err(CollectionError::NotFound(collection_id.to_string())),
        Some(o) if o != owner_id => Err(CollectionError::Forbidden(format!("collection {}", collection_id))),
        Some(_) => Ok(()),
    }
}

/// Fails with `BookmarkNotFound` or `Forbidden` unless `owner_id` owns the bookmark.
fn ensure_bookmark_owned(conn: &Connection, owner_id: &str, bookmark_id: &str) -> Result<(), CollectionError> {
    let owner: Option<String> = conn
        .query_row(
            "SELECT owner_id FROM bookmarks WHERE id = ?1",
            params![bookmark_id],
            |row| row.get(0),
        )
        .optional()?;
    match owner {
        None => Err(CollectionError::BookmarkNotFound(bookmark_id.to_string())),
        Some(o) if o != owner_id => Err(CollectionError::Forbidden(format!("bookmark {}", bookmark_id))),
        Some(_) => Ok(()),
    }
}

fn member_count(conn: &Connection, collection_id: &str) -> Result<u32, CollectionError> {
    let count: u32 = conn.query_row(
        "SELECT COUNT(*) FROM collection_bookmarks WHERE collection_id = ?1",
        params![collection_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Moves every index in `[from, to]` of `collection_id` by `delta`.
///
/// SQLite checks the `(collection_id, bookmark_index)` unique index row by
/// row, so the rows are first parked at distinct negative values
/// (`-(i + delta) - 1`) and then flipped back in a second statement.
/// The caller guarantees the destination range is free.
fn shift_range(conn: &Connection, collection_id: &str, from: i64, to: i64, delta: i64) -> Result<usize, rusqlite::Error> {
    if from > to {
        return Ok(0);
    }
    let shifted = conn.execute(
        "UPDATE collection_bookmarks SET bookmark_index = -(bookmark_index + ?4) - 1 \
         WHERE collection_id = ?1 AND bookmark_index BETWEEN ?2 AND ?3",
        params![collection_id, from, to, delta],
    )?;
    unpark(conn, collection_id)?;
    Ok(shifted)
}

fn unpark(conn: &Connection, collection_id: &str) -> Result<usize, rusqlite::Error> {
    conn.execute(
        "UPDATE collection_bookmarks SET bookmark_index = -bookmark_index - 1 \
         WHERE collection_id = ?1 AND bookmark_index < 0",
        params![collection_id],
    )
}

/// Closes the gap left at `removed_index` after a membership was deleted.
pub(crate) fn compact_after_removal(conn: &Connection, collection_id: &str, removed_index: i64) -> Result<usize, rusqlite::Error> {
    shift_range(conn, collection_id, removed_index + 1, i64::MAX, -1)
}

/// Returns `Internal` unless the indices of `collection_id` are exactly `{0, .., n - 1}`.
pub(crate) fn check_dense(conn: &Connection, collection_id: &str) -> Result<(), CollectionError> {
    let (count, distinct, min, max): (i64, i64, i64, i64) = conn.query_row(
        "SELECT COUNT(*), COUNT(DISTINCT bookmark_index), \
                COALESCE(MIN(bookmark_index), 0), COALESCE(MAX(bookmark_index), -1) \
         FROM collection_bookmarks WHERE collection_id = ?1",
        params![collection_id],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
    )?;

    if distinct == count && max == count - 1 && (count == 0 || min == 0) {
        Ok(())
    } else {
        tracing::error!(collection_id, count, distinct, min, max, "collection ordering is not dense");
        Err(CollectionError::Internal(format!(
            "collection {} has {} members with indices {}..={} ({} distinct)",
            collection_id, count, min, max, distinct
        )))
    }
}

impl<'a> CollectionManagerTrait for CollectionManager<'a> {
    /// Creates a new, empty collection. Returns the generated collection ID.
    fn create_collection(
        &mut self,
        owner_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> Result<String, CollectionError> {
        Self::validate_name(name)?;

        let id = Uuid::new_v4().to_string();
        let now = Self::now();
        self.conn.execute(
            "INSERT INTO collections (id, owner_id, name, description, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, owner_id, name.trim(), description, now, now],
        )?;

        tracing::debug!(collection_id = %id, owner_id, "collection created");
        Ok(id)
    }

    fn get_collection(&self, owner_id: &str, id: &str) -> Result<Collection, CollectionError> {
        ensure_collection_owned(self.conn, owner_id, id)?;
        let collection = self.conn.query_row(
            "SELECT id, owner_id, name, description, created_at, updated_at FROM collections WHERE id = ?1",
            params![id],
            Self::row_to_collection,
        )?;
        Ok(collection)
    }

    fn list_collections(&self, owner_id: &str) -> Result<Vec<CollectionSummary>, CollectionError> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.owner_id, c.name, c.description, c.created_at, c.updated_at, \
                    COUNT(cb.bookmark_id) \
             FROM collections c LEFT JOIN collection_bookmarks cb ON cb.collection_id = c.id \
             WHERE c.owner_id = ?1 GROUP BY c.id ORDER BY c.created_at, c.rowid",
        )?;
        let rows = stmt.query_map(params![owner_id], |row| {
            Ok(CollectionSummary {
                collection: Self::row_to_collection(row)?,
                bookmark_count: row.get(6)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    fn update_collection(
        &mut self,
        owner_id: &str,
        id: &str,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<(), CollectionError> {
        if let Some(n) = name {
            Self::validate_name(n)?;
        }
        ensure_collection_owned(self.conn, owner_id, id)?;

        let now = Self::now();
        self.conn.execute(
            "UPDATE collections SET name = COALESCE(?1, name), description = COALESCE(?2, description), \
             updated_at = ?3 WHERE id = ?4",
            params![name.map(str::trim), description, now, id],
        )?;
        Ok(())
    }

    /// Deletes a collection. Its memberships are removed by cascade; the
    /// bookmarks themselves are untouched.
    fn delete_collection(&mut self, owner_id: &str, id: &str) -> Result<(), CollectionError> {
        let tx = self.begin_write()?;
        ensure_collection_owned(&tx, owner_id, id)?;
        tx.execute("DELETE FROM collections WHERE id = ?1", params![id])?;
        tx.commit()?;

        tracing::debug!(collection_id = id, "collection deleted");
        Ok(())
    }

    fn list_collection_bookmarks(
        &self,
        owner_id: &str,
        collection_id: &str,
    ) -> Result<Vec<CollectionBookmark>, CollectionError> {
        ensure_collection_owned(self.conn, owner_id, collection_id)?;
        Self::load_members(self.conn, collection_id)
    }

    #[instrument(skip(self, bookmark_ids), fields(requested = bookmark_ids.len()))]
    fn replace_bookmarks(
        &mut self,
        owner_id: &str,
        collection_id: &str,
        bookmark_ids: &[String],
    ) -> Result<Vec<CollectionBookmark>, CollectionError> {
        let tx = self.begin_write()?;
        ensure_collection_owned(&tx, owner_id, collection_id)?;

        // Keep the valid subset in request order; first occurrence wins.
        let mut seen = HashSet::new();
        let mut valid = Vec::with_capacity(bookmark_ids.len());
        for id in bookmark_ids {
            if !seen.insert(id.as_str()) {
                continue;
            }
            match ensure_bookmark_owned(&tx, owner_id, id) {
                Ok(()) => valid.push(id.as_str()),
                Err(CollectionError::BookmarkNotFound(_)) | Err(CollectionError::Forbidden(_)) => {}
                Err(e) => return Err(e),
            }
        }
        if valid.len() != bookmark_ids.len() {
            tracing::warn!(
                dropped = bookmark_ids.len() - valid.len(),
                "replace dropped unknown, foreign or repeated bookmark ids"
            );
        }

        tx.execute(
            "DELETE FROM collection_bookmarks WHERE collection_id = ?1",
            params![collection_id],
        )?;
        {
            let mut insert = tx.prepare(
                "INSERT INTO collection_bookmarks (collection_id, bookmark_id, bookmark_index) VALUES (?1, ?2, ?3)",
            )?;
            for (index, bookmark_id) in valid.iter().enumerate() {
                insert.execute(params![collection_id, bookmark_id, index as i64])?;
            }
        }
        tx.execute(
            "UPDATE collections SET updated_at = ?1 WHERE id = ?2",
            params![Self::now(), collection_id],
        )?;

        check_dense(&tx, collection_id)?;
        let members = Self::load_members(&tx, collection_id)?;
        tx.commit()?;

        tracing::debug!(members = members.len(), "collection membership replaced");
        Ok(members)
    }

    #[instrument(skip(self, bookmark_ids), fields(requested = bookmark_ids.len()))]
    fn append_bookmarks(
        &mut self,
        owner_id: &str,
        collection_id: &str,
        bookmark_ids: &[String],
    ) -> Result<(), CollectionError> {
        if bookmark_ids.is_empty() {
            return Err(CollectionError::EmptyInput);
        }
        let mut seen = HashSet::new();
        for id in bookmark_ids {
            if !seen.insert(id.as_str()) {
                return Err(CollectionError::DuplicateInput(id.clone()));
            }
        }

        let tx = self.begin_write()?;
        ensure_collection_owned(&tx, owner_id, collection_id)?;
        for id in bookmark_ids {
            ensure_bookmark_owned(&tx, owner_id, id)?;
        }
        for id in bookmark_ids {
            let existing: Option<i64> = tx
                .query_row(
                    "SELECT bookmark_index FROM collection_bookmarks WHERE collection_id = ?1 AND bookmark_id = ?2",
                    params![collection_id, id],
                    |row| row.get(0),
                )
                .optional()?;
            if existing.is_some() {
                return Err(CollectionError::AlreadyMember(id.clone()));
            }
        }

        let start = member_count(&tx, collection_id)? as i64;
        {
            let mut insert = tx.prepare(
                "INSERT INTO collection_bookmarks (collection_id, bookmark_id, bookmark_index) VALUES (?1, ?2, ?3)",
            )?;
            for (offset, id) in bookmark_ids.iter().enumerate() {
                insert.execute(params![collection_id, id, start + offset as i64])?;
            }
        }
        tx.execute(
            "UPDATE collections SET updated_at = ?1 WHERE id = ?2",
            params![Self::now(), collection_id],
        )?;

        check_dense(&tx, collection_id)?;
        tx.commit()?;

        tracing::debug!(first_index = start, "bookmarks appended");
        Ok(())
    }

    #[instrument(skip(self))]
    fn remove_bookmark(
        &mut self,
        owner_id: &str,
        collection_id: &str,
        bookmark_id: &str,
    ) -> Result<(), CollectionError> {
        let tx = self.begin_write()?;
        ensure_collection_owned(&tx, owner_id, collection_id)?;
        ensure_bookmark_owned(&tx, owner_id, bookmark_id)?;

        let index: i64 = tx
            .query_row(
                "SELECT bookmark_index FROM collection_bookmarks WHERE collection_id = ?1 AND bookmark_id = ?2",
                params![collection_id, bookmark_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| CollectionError::MembershipNotFound {
                collection_id: collection_id.to_string(),
                bookmark_id: bookmark_id.to_string(),
            })?;

        tx.execute(
            "DELETE FROM collection_bookmarks WHERE collection_id = ?1 AND bookmark_id = ?2",
            params![collection_id, bookmark_id],
        )?;
        let shifted = compact_after_removal(&tx, collection_id, index)?;
        tx.execute(
            "UPDATE collections SET updated_at = ?1 WHERE id = ?2",
            params![Self::now(), collection_id],
        )?;

        check_dense(&tx, collection_id)?;
        tx.commit()?;

        tracing::debug!(removed_index = index, shifted, "bookmark removed from collection");
        Ok(())
    }

    #[instrument(skip(self))]
    fn move_bookmark(
        &mut self,
        owner_id: &str,
        collection_id: &str,
        current_index: u32,
        new_index: u32,
    ) -> Result<(), CollectionError> {
        let tx = self.begin_write()?;
        ensure_collection_owned(&tx, owner_id, collection_id)?;

        let count = member_count(&tx, collection_id)?;
        for index in [current_index, new_index] {
            if index >= count {
                return Err(CollectionError::IndexOutOfRange { index, count });
            }
        }

        let target: Option<String> = tx
            .query_row(
                "SELECT bookmark_id FROM collection_bookmarks WHERE collection_id = ?1 AND bookmark_index = ?2",
                params![collection_id, current_index],
                |row| row.get(0),
            )
            .optional()?;
        if target.is_none() {
            tracing::error!(current_index, count, "no membership at index inside valid range");
            return Err(CollectionError::Internal(format!(
                "no bookmark at index {} of collection {}",
                current_index, collection_id
            )));
        }

        if current_index == new_index {
            return Ok(());
        }

        // Moving left shifts [new, current) up by one; moving right shifts
        // (current, new] down by one. The target row lands on `new_index`
        // within the same statement.
        let (from, to, delta) = if new_index < current_index {
            (new_index, current_index, 1i64)
        } else {
            (current_index, new_index, -1i64)
        };
        tx.execute(
            "UPDATE collection_bookmarks SET bookmark_index = \
                 -(CASE WHEN bookmark_index = ?2 THEN ?3 ELSE bookmark_index + ?4 END) - 1 \
             WHERE collection_id = ?1 AND bookmark_index BETWEEN ?5 AND ?6",
            params![collection_id, current_index, new_index, delta, from, to],
        )?;
        unpark(&tx, collection_id)?;
        tx.execute(
            "UPDATE collections SET updated_at = ?1 WHERE id = ?2",
            params![Self::now(), collection_id],
        )?;

        check_dense(&tx, collection_id)?;
        tx.commit()?;

        tracing::debug!("bookmark moved");
        Ok(())
    }

    fn verify_order(&self, collection_id: &str) -> Result<(), CollectionError> {
        check_dense(self.conn, collection_id)
    }
}
