use serde::{Deserialize, Serialize};

/// A user-defined label that can be attached to any number of bookmarks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub created_at: i64,
}
