use serde::{Deserialize, Serialize};
use thiserror::Error;

// === ErrorKind ===

/// Transport-independent classification shared by every error in the crate.
///
/// The request boundary maps each kind to a distinct status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// A referenced collection, bookmark, tag or membership does not exist.
    NotFound,
    /// The acting owner does not own the referenced entity.
    Forbidden,
    /// Malformed input: empty list, index out of range, bad URL.
    InvalidArgument,
    /// The request contradicts current state (duplicate membership, duplicate tag).
    Conflict,
    /// Storage failure or a broken invariant. Indicates a bug, not a user error.
    Internal,
}

impl ErrorKind {
    /// HTTP-style status code for this kind.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::Forbidden => 403,
            ErrorKind::InvalidArgument => 400,
            ErrorKind::Conflict => 409,
            ErrorKind::Internal => 500,
        }
    }
}

// === BookmarkError ===

/// Errors related to bookmark management operations.
#[derive(Debug, Error)]
pub enum BookmarkError {
    /// Bookmark with the given ID was not found.
    #[error("Bookmark not found: {0}")]
    NotFound(String),
    /// The bookmark belongs to another owner.
    #[error("Bookmark not owned by caller: {0}")]
    Forbidden(String),
    /// The URL or title failed validation.
    #[error("Invalid bookmark: {0}")]
    InvalidInput(String),
    /// Removing the bookmark would break a collection's ordering.
    #[error("Bookmark removal aborted: {0}")]
    Internal(String),
    /// Database operation failed.
    #[error("Bookmark database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),
}

impl BookmarkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BookmarkError::NotFound(_) => ErrorKind::NotFound,
            BookmarkError::Forbidden(_) => ErrorKind::Forbidden,
            BookmarkError::InvalidInput(_) => ErrorKind::InvalidArgument,
            BookmarkError::Internal(_) | BookmarkError::DatabaseError(_) => ErrorKind::Internal,
        }
    }
}

// === TagError ===

/// Errors related to tag management operations.
#[derive(Debug, Error)]
pub enum TagError {
    /// Tag with the given ID was not found.
    #[error("Tag not found: {0}")]
    NotFound(String),
    /// Bookmark referenced by a tagging operation was not found.
    #[error("Bookmark not found: {0}")]
    BookmarkNotFound(String),
    /// The tag or bookmark belongs to another owner.
    #[error("Tag operation forbidden: {0}")]
    Forbidden(String),
    /// A tag with the same name already exists for this owner.
    #[error("Duplicate tag name: {0}")]
    DuplicateName(String),
    /// The tag name is empty or otherwise invalid.
    #[error("Invalid tag name: {0}")]
    InvalidName(String),
    /// Database operation failed.
    #[error("Tag database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),
}

impl TagError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TagError::NotFound(_) | TagError::BookmarkNotFound(_) => ErrorKind::NotFound,
            TagError::Forbidden(_) => ErrorKind::Forbidden,
            TagError::DuplicateName(_) => ErrorKind::Conflict,
            TagError::InvalidName(_) => ErrorKind::InvalidArgument,
            TagError::DatabaseError(_) => ErrorKind::Internal,
        }
    }
}

// === CollectionError ===

/// Errors raised by collection CRUD and the membership ordering engine.
///
/// Every variant is produced before the first mutating statement runs, except
/// `Internal` and `DatabaseError`, which abort and roll back the transaction.
#[derive(Debug, Error)]
pub enum CollectionError {
    /// Collection with the given ID was not found.
    #[error("Collection not found: {0}")]
    NotFound(String),
    /// A referenced bookmark was not found.
    #[error("Bookmark not found: {0}")]
    BookmarkNotFound(String),
    /// The bookmark is not a member of the collection.
    #[error("Bookmark {bookmark_id} is not in collection {collection_id}")]
    MembershipNotFound {
        collection_id: String,
        bookmark_id: String,
    },
    /// The collection or a bookmark belongs to another owner.
    #[error("Collection operation forbidden: {0}")]
    Forbidden(String),
    /// The bookmark list was empty where at least one ID is required.
    #[error("Bookmark list must not be empty")]
    EmptyInput,
    /// The same bookmark ID appears more than once in one request.
    #[error("Bookmark listed more than once: {0}")]
    DuplicateInput(String),
    /// An index argument lies outside `[0, count - 1]`.
    #[error("Index {index} out of range for collection of {count} bookmarks")]
    IndexOutOfRange { index: u32, count: u32 },
    /// The collection name is empty or otherwise invalid.
    #[error("Invalid collection name: {0}")]
    InvalidName(String),
    /// The bookmark is already a member of the collection.
    #[error("Bookmark already in collection: {0}")]
    AlreadyMember(String),
    /// The persisted ordering is not dense or a lookup contradicted it.
    #[error("Collection ordering invariant violated: {0}")]
    Internal(String),
    /// Database operation failed.
    #[error("Collection database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),
}

impl CollectionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CollectionError::NotFound(_) | CollectionError::BookmarkNotFound(_) => {
                ErrorKind::NotFound
            }
            CollectionError::Forbidden(_) => ErrorKind::Forbidden,
            CollectionError::EmptyInput
            | CollectionError::DuplicateInput(_)
            | CollectionError::IndexOutOfRange { .. }
            | CollectionError::InvalidName(_) => ErrorKind::InvalidArgument,
            CollectionError::AlreadyMember(_) | CollectionError::MembershipNotFound { .. } => {
                ErrorKind::Conflict
            }
            CollectionError::Internal(_) | CollectionError::DatabaseError(_) => ErrorKind::Internal,
        }
    }
}

// === SettingsError ===

/// Errors related to settings management.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// An I/O error occurred while reading or writing settings.
    #[error("Settings I/O error: {0}")]
    IoError(String),
    /// Failed to serialize or deserialize settings.
    #[error("Settings serialization error: {0}")]
    SerializationError(String),
    /// The provided settings key is invalid.
    #[error("Invalid settings key: {0}")]
    InvalidKey(String),
    /// The provided settings value is invalid.
    #[error("Invalid settings value: {0}")]
    InvalidValue(String),
}

impl SettingsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SettingsError::InvalidKey(_) | SettingsError::InvalidValue(_) => {
                ErrorKind::InvalidArgument
            }
            SettingsError::IoError(_) | SettingsError::SerializationError(_) => {
                ErrorKind::Internal
            }
        }
    }
}
