use serde::{Deserialize, Serialize};

use super::bookmark::Bookmark;

/// A named, owner-scoped, ordered list of bookmarks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A collection together with the number of bookmarks it holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionSummary {
    #[serde(flatten)]
    pub collection: Collection,
    pub bookmark_count: u32,
}

/// One bookmark's inclusion in one collection, joined with the bookmark.
///
/// `bookmark_index` is dense over `[0, count - 1]` within a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionBookmark {
    pub collection_id: String,
    pub bookmark_index: u32,
    pub bookmark: Bookmark,
}
