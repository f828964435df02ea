//! Bookmark Manager for Shelfmark.
//!
//! Implements `BookmarkManagerTrait`: owner-scoped CRUD operations for
//! bookmarks, backed by SQLite via `rusqlite`.

use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::managers::collection_manager::{check_dense, compact_after_removal};
use crate::types::bookmark::{Bookmark, BookmarkPage};
use crate::types::errors::{BookmarkError, CollectionError};

/// Trait defining bookmark management operations.
pub trait BookmarkManagerTrait {
    fn add_bookmark(&mut self, owner_id: &str, url: &str, title: &str, description: Option<&str>) -> Result<String, BookmarkError>;
    fn get_bookmark(&self, owner_id: &str, id: &str) -> Result<Bookmark, BookmarkError>;
    fn update_bookmark(&mut self, owner_id: &str, id: &str, url: Option<&str>, title: Option<&str>, description: Option<&str>) -> Result<(), BookmarkError>;
    fn remove_bookmark(&mut self, owner_id: &str, id: &str) -> Result<(), BookmarkError>;
    fn search_bookmarks(&self, owner_id: &str, query: &str) -> Result<Vec<Bookmark>, BookmarkError>;
    fn list_bookmarks(&self, owner_id: &str) -> Result<Vec<Bookmark>, BookmarkError>;
    /// Paginated bookmark listing, newest first.
    fn list_bookmarks_paginated(&self, owner_id: &str, limit: i64, offset: i64) -> Result<BookmarkPage, BookmarkError>;
}

/// Bookmark manager backed by a SQLite connection.
pub struct BookmarkManager<'a> {
    conn: &'a Connection,
}

const SELECT_BOOKMARK: &str =
    "SELECT id, owner_id, url, title, description, created_at, updated_at FROM bookmarks";

impl<'a> BookmarkManager<'a> {
    /// Creates a new `BookmarkManager` using the provided database connection.
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Returns the current UNIX timestamp in seconds.
    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }

    /// Reads the first seven columns of a row into a `Bookmark`.
    pub(crate) fn row_to_bookmark(row: &rusqlite::Row) -> rusqlite::Result<Bookmark> {
        Ok(Bookmark {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            url: row.get(2)?,
            title: row.get(3)?,
            description: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn validate_url(url: &str) -> Result<(), BookmarkError> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(BookmarkError::InvalidInput(format!(
                "url must start with http:// or https://: {}",
                url
            )));
        }
        Ok(())
    }

    fn validate_title(title: &str) -> Result<(), BookmarkError> {
        if title.trim().is_empty() {
            return Err(BookmarkError::InvalidInput("title must not be empty".to_string()));
        }
        Ok(())
    }

    /// Fails with `NotFound` or `Forbidden` unless `owner_id` owns the bookmark.
    fn ensure_owned(conn: &Connection, owner_id: &str, id: &str) -> Result<(), BookmarkError> {
        let owner: Option<String> = conn
            .query_row(
                "SELECT owner_id FROM bookmarks WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        match owner {
            None => Err(BookmarkError::NotFound(id.to_string())),
            Some(o) if o != owner_id => Err(BookmarkError::Forbidden(id.to_string())),
            Some(_) => Ok(()),
        }
    }
}

impl<'a> BookmarkManagerTrait for BookmarkManager<'a> {
    /// Adds a new bookmark. Returns the generated bookmark ID.
    fn add_bookmark(
        &mut self,
        owner_id: &str,
        url: &str,
        title: &str,
        description: Option<&str>,
    ) -> Result<String, BookmarkError> {
        Self::validate_url(url)?;
        Self::validate_title(title)?;

        let id = Uuid::new_v4().to_string();
        let now = Self::now();

        self.conn.execute(
            "INSERT INTO bookmarks (id, owner_id, url, title, description, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![id, owner_id, url, title, description, now, now],
        )?;

        tracing::debug!(bookmark_id = %id, owner_id, "bookmark added");
        Ok(id)
    }

    fn get_bookmark(&self, owner_id: &str, id: &str) -> Result<Bookmark, BookmarkError> {
        Self::ensure_owned(self.conn, owner_id, id)?;
        let bookmark = self.conn.query_row(
            &format!("{} WHERE id = ?1", SELECT_BOOKMARK),
            params![id],
            Self::row_to_bookmark,
        )?;
        Ok(bookmark)
    }

    /// Updates the url, title and/or description of an existing bookmark.
    ///
    /// Fields passed as `None` keep their current value.
    fn update_bookmark(
        &mut self,
        owner_id: &str,
        id: &str,
        url: Option<&str>,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<(), BookmarkError> {
        if let Some(u) = url {
            Self::validate_url(u)?;
        }
        if let Some(t) = title {
            Self::validate_title(t)?;
        }
        Self::ensure_owned(self.conn, owner_id, id)?;

        let now = Self::now();
        self.conn.execute(
            "UPDATE bookmarks SET url = COALESCE(?1, url), title = COALESCE(?2, title), \
             description = COALESCE(?3, description), updated_at = ?4 WHERE id = ?5",
            params![url, title, description, now, id],
        )?;
        Ok(())
    }

    /// Deletes a bookmark and closes the gap it leaves in every collection
    /// that contained it, all in one transaction.
    fn remove_bookmark(&mut self, owner_id: &str, id: &str) -> Result<(), BookmarkError> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        Self::ensure_owned(&tx, owner_id, id)?;

        let memberships: Vec<(String, i64)> = {
            let mut stmt = tx.prepare(
                "SELECT collection_id, bookmark_index FROM collection_bookmarks WHERE bookmark_id = ?1",
            )?;
            let rows = stmt.query_map(params![id], |row| Ok((row.get(0)?, row.get(1)?)))?;
            let mut memberships = Vec::new();
            for row in rows {
                memberships.push(row?);
            }
            memberships
        };

        // Memberships and tag links go with the bookmark via ON DELETE CASCADE.
        tx.execute("DELETE FROM bookmarks WHERE id = ?1", params![id])?;

        for (collection_id, index) in &memberships {
            compact_after_removal(&tx, collection_id, *index)?;
            check_dense(&tx, collection_id).map_err(|e| match e {
                CollectionError::DatabaseError(db) => BookmarkError::DatabaseError(db),
                other => BookmarkError::Internal(other.to_string()),
            })?;
        }
        tx.commit()?;

        tracing::debug!(bookmark_id = id, collections = memberships.len(), "bookmark removed");
        Ok(())
    }

    /// Searches the owner's bookmarks by title, URL or description using SQL LIKE.
    fn search_bookmarks(&self, owner_id: &str, query: &str) -> Result<Vec<Bookmark>, BookmarkError> {
        let pattern = format!("%{}%", query);
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE owner_id = ?1 AND (title LIKE ?2 OR url LIKE ?2 OR description LIKE ?2) \
             ORDER BY created_at DESC, rowid DESC",
            SELECT_BOOKMARK
        ))?;

        let rows = stmt.query_map(params![owner_id, pattern], Self::row_to_bookmark)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Lists all of the owner's bookmarks, newest first.
    fn list_bookmarks(&self, owner_id: &str) -> Result<Vec<Bookmark>, BookmarkError> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE owner_id = ?1 ORDER BY created_at DESC, rowid DESC",
            SELECT_BOOKMARK
        ))?;

        let rows = stmt.query_map(params![owner_id], Self::row_to_bookmark)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    fn list_bookmarks_paginated(&self, owner_id: &str, limit: i64, offset: i64) -> Result<BookmarkPage, BookmarkError> {
        let total: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM bookmarks WHERE owner_id = ?1",
            params![owner_id],
            |row| row.get(0),
        )?;

        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE owner_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2 OFFSET ?3",
            SELECT_BOOKMARK
        ))?;
        let rows = stmt.query_map(params![owner_id, limit, offset], Self::row_to_bookmark)?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(BookmarkPage { items, total })
    }
}
