//! SQLite database connection management for Shelfmark.
//!
//! Provides the [`Database`] struct that wraps a `rusqlite::Connection`
//! and automatically runs schema migrations on open.

use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

use super::migrations;
use crate::types::settings::DatabaseSettings;

/// Core database wrapper providing SQLite connection management.
///
/// The `Database` struct owns a `rusqlite::Connection` and ensures that
/// all required tables and indexes are created when the database is opened.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (or creates) a SQLite database at the given file path with default settings.
    ///
    /// # Errors
    /// Returns `rusqlite::Error` if the connection cannot be established or migrations fail.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, rusqlite::Error> {
        Self::open_with_settings(path, &DatabaseSettings::default())
    }

    /// Opens (or creates) a SQLite database at `path`, applying the busy timeout
    /// from `settings`, and runs migrations.
    ///
    /// Every connection to the same file competes for the write lock; the busy
    /// timeout is how long a writer waits for a concurrent transaction to finish.
    pub fn open_with_settings<P: AsRef<Path>>(
        path: P,
        settings: &DatabaseSettings,
    ) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_millis(settings.busy_timeout_ms))?;
        let db = Self { conn };
        db.run_migrations()?;
        tracing::debug!("database opened, schema version {}", migrations::get_schema_version(&db.conn));
        Ok(db)
    }

    /// Opens an in-memory SQLite database and runs migrations.
    ///
    /// Useful for testing: the database is discarded when the `Database` is dropped.
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> Result<(), rusqlite::Error> {
        migrations::run_all(&self.conn)
    }

    /// Returns a reference to the underlying `rusqlite::Connection`.
    ///
    /// Managers borrow this to execute queries against the database.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
