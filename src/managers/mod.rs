// Shelfmark state managers
// Managers own the persisted state: bookmarks, tags and ordered collections.

pub mod bookmark_manager;
pub mod collection_manager;
pub mod tag_manager;
