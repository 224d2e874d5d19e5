//! Bulk read-receipt updates.
//!
//! The client contract is bounded-count: the client reports "I saw N
//! messages" and the `count` most recent `Delivered` messages flip to
//! `Read`.  Delivered messages older than the `count`-th most recent one
//! are left untouched even if the user has seen them.  This is NOT a
//! watermark; see DESIGN.md for the rejected cursor-based alternative.

use rusqlite::params;

use retrouve_shared::types::{ChatId, MessageStatus};

use crate::database::Database;
use crate::error::Result;

impl Database {
    /// Transition the `count` most recent `Delivered` messages of a chat to
    /// `Read`.  Returns the number of messages actually updated.
    pub fn mark_recent_delivered_as_read(&self, chat_id: ChatId, count: u32) -> Result<u32> {
        let affected = self.conn().execute(
            "UPDATE messages
                SET status = ?3
              WHERE id IN (SELECT id FROM messages
                            WHERE chat_id = ?1 AND status = ?4
                            ORDER BY timestamp DESC, rowid DESC
                            LIMIT ?2)",
            params![
                chat_id.to_string(),
                count as i64,
                MessageStatus::Read.as_str(),
                MessageStatus::Delivered.as_str(),
            ],
        )?;

        tracing::debug!(chat = %chat_id, requested = count, updated = affected, "read receipts applied");
        Ok(affected as u32)
    }
}
