//! CRUD operations for [`DirectoryEntry`] records.
//!
//! A directory entry is a user's private view of a chat. Toggles are two
//! point operations (read current, write negation); concurrent toggles on
//! the same entry are last-write-wins, which callers detect by inspecting
//! the returned entry rather than assuming a target value.

use chrono::{SecondsFormat, Utc};
use rusqlite::params;

use retrouve_shared::types::{ChatId, UserId};

use crate::chats::parse_ts;
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::DirectoryEntry;

impl Database {
    /// Add a directory entry with default flags if none exists. Idempotent.
    pub fn ensure_entry(&self, user_id: &UserId, chat_id: ChatId) -> Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO directory (user_id, chat_id, is_pinned, is_muted, created_at)
             VALUES (?1, ?2, 0, 0, ?3)",
            params![
                user_id.as_str(),
                chat_id.to_string(),
                Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        )?;
        Ok(())
    }

    /// Fetch a single directory entry.
    pub fn get_entry(&self, user_id: &UserId, chat_id: ChatId) -> Result<DirectoryEntry> {
        self.conn()
            .query_row(
                "SELECT user_id, chat_id, is_pinned, is_muted, created_at
                   FROM directory
                  WHERE user_id = ?1 AND chat_id = ?2",
                params![user_id.as_str(), chat_id.to_string()],
                row_to_entry,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// All directory entries for a user.
    pub fn entries_for_user(&self, user_id: &UserId) -> Result<Vec<DirectoryEntry>> {
        let mut stmt = self.conn().prepare(
            "SELECT user_id, chat_id, is_pinned, is_muted, created_at
               FROM directory
              WHERE user_id = ?1",
        )?;

        let rows = stmt.query_map(params![user_id.as_str()], row_to_entry)?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }

    /// Flip the pinned flag and return the new entry.
    pub fn toggle_pinned(&self, user_id: &UserId, chat_id: ChatId) -> Result<DirectoryEntry> {
        let current = self.get_entry(user_id, chat_id)?;
        self.conn().execute(
            "UPDATE directory SET is_pinned = ?3 WHERE user_id = ?1 AND chat_id = ?2",
            params![
                user_id.as_str(),
                chat_id.to_string(),
                !current.is_pinned,
            ],
        )?;
        self.get_entry(user_id, chat_id)
    }

    /// Flip the muted flag and return the new entry.
    pub fn toggle_muted(&self, user_id: &UserId, chat_id: ChatId) -> Result<DirectoryEntry> {
        let current = self.get_entry(user_id, chat_id)?;
        self.conn().execute(
            "UPDATE directory SET is_muted = ?3 WHERE user_id = ?1 AND chat_id = ?2",
            params![
                user_id.as_str(),
                chat_id.to_string(),
                !current.is_muted,
            ],
        )?;
        self.get_entry(user_id, chat_id)
    }

    /// Remove a user's entry for a chat.  Returns `true` if a row was
    /// deleted.  The chat and its messages are untouched, as is the other
    /// participant's entry.
    pub fn remove_entry(&self, user_id: &UserId, chat_id: ChatId) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM directory WHERE user_id = ?1 AND chat_id = ?2",
            params![user_id.as_str(), chat_id.to_string()],
        )?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`DirectoryEntry`].
fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<DirectoryEntry> {
    let user: String = row.get(0)?;
    let chat_str: String = row.get(1)?;
    let is_pinned: bool = row.get(2)?;
    let is_muted: bool = row.get(3)?;
    let created_str: String = row.get(4)?;

    let chat_id = ChatId::parse(&chat_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(DirectoryEntry {
        user_id: UserId(user),
        chat_id,
        is_pinned,
        is_muted,
        created_at: parse_ts(&created_str, 4)?,
    })
}
