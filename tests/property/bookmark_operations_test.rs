//! Property-based tests for Bookmark Manager operations.
//!
//! Adding a bookmark and then searching by its title always finds it, and
//! deleting a bookmark that sits in several collections keeps each of them
//! densely ordered.

use proptest::prelude::*;
use shelfmark::database::Database;
use shelfmark::managers::bookmark_manager::{BookmarkManager, BookmarkManagerTrait};
use shelfmark::managers::collection_manager::{CollectionManager, CollectionManagerTrait};

const OWNER: &str = "owner";

/// Strategy for generating valid URL strings.
fn arb_url() -> impl Strategy<Value = String> {
    (
        prop_oneof![Just("https"), Just("http")],
        "[a-z][a-z0-9]{2,15}",
        prop_oneof![Just(".com"), Just(".org"), Just(".net"), Just(".io")],
        proptest::option::of("/[a-z0-9]{1,10}"),
    )
        .prop_map(|(scheme, host, tld, path)| {
            format!("{}://{}{}{}", scheme, host, tld, path.unwrap_or_default())
        })
}

/// Printable ASCII titles, avoiding SQL LIKE wildcards.
fn arb_title() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9 ]{1,30}"
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn bookmark_add_then_search_returns_result(url in arb_url(), title in arb_title()) {
        let db = Database::open_in_memory().expect("Failed to open in-memory database");
        let mut manager = BookmarkManager::new(db.connection());

        let bookmark_id = manager
            .add_bookmark(OWNER, &url, &title, None)
            .expect("add_bookmark should succeed for valid inputs");

        let results = manager.search_bookmarks(OWNER, &title).expect("search should succeed");
        let found = results.iter().find(|b| b.id == bookmark_id);
        prop_assert!(found.is_some(), "searching '{}' should find {}", title, bookmark_id);
        let bookmark = found.unwrap();
        prop_assert_eq!(&bookmark.url, &url);
        prop_assert_eq!(&bookmark.title, &title);
    }

    #[test]
    fn deleting_bookmark_keeps_collections_dense(
        sizes in proptest::collection::vec(1usize..6, 1..4),
        victim_seed in any::<usize>(),
    ) {
        let db = Database::open_in_memory().expect("Failed to open in-memory database");
        let mut bookmarks = BookmarkManager::new(db.connection());
        let pool: Vec<String> = (0..6)
            .map(|i| bookmarks.add_bookmark(OWNER, &format!("https://d{}.io", i), "D", None).unwrap())
            .collect();

        let mut collections = CollectionManager::new(db.connection());
        let mut cids = Vec::new();
        for (c, size) in sizes.iter().enumerate() {
            let cid = collections.create_collection(OWNER, &format!("C{}", c), None).unwrap();
            // Rotate so the victim lands at different positions per collection.
            let members: Vec<String> = (0..*size).map(|i| pool[(i + c) % pool.len()].clone()).collect();
            collections.append_bookmarks(OWNER, &cid, &members).unwrap();
            cids.push((cid, members));
        }

        let victim = pool[victim_seed % pool.len()].clone();
        bookmarks.remove_bookmark(OWNER, &victim).unwrap();

        for (cid, members) in &cids {
            let expected: Vec<String> = members.iter().filter(|m| **m != victim).cloned().collect();
            let got: Vec<String> = collections
                .list_collection_bookmarks(OWNER, cid)
                .unwrap()
                .into_iter()
                .map(|m| m.bookmark.id)
                .collect();
            prop_assert_eq!(got, expected);
            prop_assert!(collections.verify_order(cid).is_ok());
        }
    }
}
