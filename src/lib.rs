//! Shelfmark: a personal bookmark manager backend.
//!
//! Bookmarks are organized with tags and with collections: owner-scoped lists
//! whose members carry a dense `0..n` order that survives insert, remove and
//! reorder. This library crate exposes all modules for use by the binary and
//! integration tests.

pub mod app;
pub mod database;
pub mod managers;
pub mod platform;
pub mod rpc_handler;
pub mod services;
pub mod types;
