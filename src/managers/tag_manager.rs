//! Tag Manager for Shelfmark.
//!
//! Owner-scoped tags and the many-to-many link between tags and bookmarks.

use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::managers::bookmark_manager::BookmarkManager;
use crate::types::bookmark::Bookmark;
use crate::types::errors::TagError;
use crate::types::tag::Tag;

/// Trait defining tag management operations.
pub trait TagManagerTrait {
    fn create_tag(&mut self, owner_id: &str, name: &str) -> Result<String, TagError>;
    fn list_tags(&self, owner_id: &str) -> Result<Vec<Tag>, TagError>;
    fn rename_tag(&mut self, owner_id: &str, id: &str, name: &str) -> Result<(), TagError>;
    fn delete_tag(&mut self, owner_id: &str, id: &str) -> Result<(), TagError>;
    /// Attaches a tag to a bookmark. Attaching twice is a no-op.
    fn tag_bookmark(&mut self, owner_id: &str, tag_id: &str, bookmark_id: &str) -> Result<(), TagError>;
    fn untag_bookmark(&mut self, owner_id: &str, tag_id: &str, bookmark_id: &str) -> Result<(), TagError>;
    fn tags_for_bookmark(&self, owner_id: &str, bookmark_id: &str) -> Result<Vec<Tag>, TagError>;
    fn bookmarks_with_tag(&self, owner_id: &str, tag_id: &str) -> Result<Vec<Bookmark>, TagError>;
}

/// Tag manager backed by a SQLite connection.
pub struct TagManager<'a> {
    conn: &'a Connection,
}

impl<'a> TagManager<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }

    fn row_to_tag(row: &rusqlite::Row) -> rusqlite::Result<Tag> {
        Ok(Tag {
            id: row.get(0)?,
            owner_id: row.get(1)?,
            name: row.get(2)?,
            created_at: row.get(3)?,
        })
    }

    fn normalize_name(name: &str) -> Result<&str, TagError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TagError::InvalidName("name must not be empty".to_string()));
        }
        Ok(name)
    }

    fn ensure_tag_owned(&self, owner_id: &str, tag_id: &str) -> Result<(), TagError> {
        let owner: Option<String> = self
            .conn
            .query_row("SELECT owner_id FROM tags WHERE id = ?1", params![tag_id], |row| row.get(0))
            .optional()?;
        match owner {
            None => Err(TagError::NotFound(tag_id.to_string())),
            Some(o) if o != owner_id => Err(TagError::Forbidden(format!("tag {}", tag_id))),
            Some(_) => Ok(()),
        }
    }

    fn ensure_bookmark_owned(&self, owner_id: &str, bookmark_id: &str) -> Result<(), TagError> {
        let owner: Option<String> = self
            .conn
            .query_row("SELECT owner_id FROM bookmarks WHERE id = ?1", params![bookmark_id], |row| row.get(0))
            .optional()?;
        match owner {
            None => Err(TagError::BookmarkNotFound(bookmark_id.to_string())),
            Some(o) if o != owner_id => Err(TagError::Forbidden(format!("bookmark {}", bookmark_id))),
            Some(_) => Ok(()),
        }
    }

    /// Maps a UNIQUE(owner_id, name) violation to `DuplicateName`.
    fn map_unique(err: rusqlite::Error, name: &str) -> TagError {
        match err {
            rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation => {
                TagError::DuplicateName(name.to_string())
            }
            other => TagError::DatabaseError(other),
        }
    }
}

impl<'a> TagManagerTrait for TagManager<'a> {
    fn create_tag(&mut self, owner_id: &str, name: &str) -> Result<String, TagError> {
        let name = Self::normalize_name(name)?;
        let id = Uuid::new_v4().to_string();

        self.conn
            .execute(
                "INSERT INTO tags (id, owner_id, name, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![id, owner_id, name, Self::now()],
            )
            .map_err(|e| Self::map_unique(e, name))?;

        tracing::debug!(tag_id = %id, name, "tag created");
        Ok(id)
    }

    /// Lists the owner's tags alphabetically.
    fn list_tags(&self, owner_id: &str) -> Result<Vec<Tag>, TagError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, owner_id, name, created_at FROM tags WHERE owner_id = ?1 ORDER BY name",
        )?;
        let rows = stmt.query_map(params![owner_id], Self::row_to_tag)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    fn rename_tag(&mut self, owner_id: &str, id: &str, name: &str) -> Result<(), TagError> {
        let name = Self::normalize_name(name)?;
        self.ensure_tag_owned(owner_id, id)?;
        self.conn
            .execute("UPDATE tags SET name = ?1 WHERE id = ?2", params![name, id])
            .map_err(|e| Self::map_unique(e, name))?;
        Ok(())
    }

    /// Deletes a tag; its bookmark links go with it.
    fn delete_tag(&mut self, owner_id: &str, id: &str) -> Result<(), TagError> {
        self.ensure_tag_owned(owner_id, id)?;
        self.conn.execute("DELETE FROM tags WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn tag_bookmark(&mut self, owner_id: &str, tag_id: &str, bookmark_id: &str) -> Result<(), TagError> {
        self.ensure_tag_owned(owner_id, tag_id)?;
        self.ensure_bookmark_owned(owner_id, bookmark_id)?;
        self.conn.execute(
            "INSERT OR IGNORE INTO bookmark_tags (bookmark_id, tag_id) VALUES (?1, ?2)",
            params![bookmark_id, tag_id],
        )?;
        Ok(())
    }

    fn untag_bookmark(&mut self, owner_id: &str, tag_id: &str, bookmark_id: &str) -> Result<(), TagError> {
        self.ensure_tag_owned(owner_id, tag_id)?;
        self.ensure_bookmark_owned(owner_id, bookmark_id)?;
        self.conn.execute(
            "DELETE FROM bookmark_tags WHERE bookmark_id = ?1 AND tag_id = ?2",
            params![bookmark_id, tag_id],
        )?;
        Ok(())
    }

    fn tags_for_bookmark(&self, owner_id: &str, bookmark_id: &str) -> Result<Vec<Tag>, TagError> {
        self.ensure_bookmark_owned(owner_id, bookmark_id)?;
        let mut stmt = self.conn.prepare(
            "SELECT t.id, t.owner_id, t.name, t.created_at FROM tags t \
             JOIN bookmark_tags bt ON bt.tag_id = t.id WHERE bt.bookmark_id = ?1 ORDER BY t.name",
        )?;
        let rows = stmt.query_map(params![bookmark_id], Self::row_to_tag)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    fn bookmarks_with_tag(&self, owner_id: &str, tag_id: &str) -> Result<Vec<Bookmark>, TagError> {
        self.ensure_tag_owned(owner_id, tag_id)?;
        let mut stmt = self.conn.prepare(
            "SELECT b.id, b.owner_id, b.url, b.title, b.description, b.created_at, b.updated_at \
             FROM bookmarks b JOIN bookmark_tags bt ON bt.bookmark_id = b.id \
             WHERE bt.tag_id = ?1 ORDER BY b.created_at DESC, b.rowid DESC",
        )?;
        let rows = stmt.query_map(params![tag_id], BookmarkManager::row_to_bookmark)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }
}
