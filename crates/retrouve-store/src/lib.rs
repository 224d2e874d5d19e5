//! # retrouve-store
//!
//! Durable storage for the Retrouvé chat backend, backed by SQLite.
//!
//! Messages are kept as a separate ordered log keyed by chat id (not
//! embedded in the chat record), so log growth never collides with the
//! parent row and pagination is an indexed range scan. The crate exposes a
//! synchronous `Database` handle that wraps a `rusqlite::Connection` and
//! provides typed helpers for every domain model.

pub mod chats;
pub mod database;
pub mod directory;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod profiles;
pub mod read_state;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use models::*;
