//! Read queries over the message log.
//!
//! The log is stored oldest-first; feed pages are newest-first, so every
//! paged query orders by `timestamp DESC` with `rowid DESC` breaking ties
//! in favour of the later append.

use rusqlite::params;

use retrouve_shared::types::{ChatId, MessageId, MessageStatus, UserId};

use crate::chats::parse_ts;
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::StoredMessage;

impl Database {
    /// Total number of messages in a chat.
    pub fn count_messages(&self, chat_id: ChatId) -> Result<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM messages WHERE chat_id = ?1",
            params![chat_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// One newest-first page of a chat's messages.
    ///
    /// `page` is 1-based; page 1 holds the most recent `page_size` messages.
    pub fn page_messages(
        &self,
        chat_id: ChatId,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<StoredMessage>> {
        let skip = page.saturating_sub(1) as i64 * page_size as i64;

        let mut stmt = self.conn().prepare(
            "SELECT id, chat_id, sender_id, content, attachment_url,
                    attachment_type, status, is_edited, timestamp
               FROM messages
              WHERE chat_id = ?1
              ORDER BY timestamp DESC, rowid DESC
              LIMIT ?2 OFFSET ?3",
        )?;

        let rows = stmt.query_map(
            params![chat_id.to_string(), page_size as i64, skip],
            row_to_message,
        )?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    /// The most recent message of a chat, if any.
    pub fn latest_message(&self, chat_id: ChatId) -> Result<Option<StoredMessage>> {
        self.conn()
            .query_row(
                "SELECT id, chat_id, sender_id, content, attachment_url,
                        attachment_type, status, is_edited, timestamp
                   FROM messages
                  WHERE chat_id = ?1
                  ORDER BY timestamp DESC, rowid DESC
                  LIMIT 1",
                params![chat_id.to_string()],
                row_to_message,
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(StoreError::Sqlite(other)),
            })
    }

    /// Unread count for `viewer`: scanning from the most recent message
    /// backward, count consecutive messages that are neither sent by the
    /// viewer nor already read, stopping at the first message that breaks
    /// either condition.  This is a contiguous-suffix count, not a total.
    pub fn unread_suffix_count(&self, chat_id: ChatId, viewer: &UserId) -> Result<u32> {
        let mut stmt = self.conn().prepare(
            "SELECT sender_id, status
               FROM messages
              WHERE chat_id = ?1
              ORDER BY timestamp DESC, rowid DESC",
        )?;

        let rows = stmt.query_map(params![chat_id.to_string()], |row| {
            let sender: String = row.get(0)?;
            let status: String = row.get(1)?;
            Ok((sender, status))
        })?;

        let mut count = 0u32;
        for row in rows {
            let (sender, status) = row?;
            if sender == viewer.as_str() || status == MessageStatus::Read.as_str() {
                break;
            }
            count += 1;
        }
        Ok(count)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`StoredMessage`].
pub(crate) fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredMessage> {
    let id_str: String = row.get(0)?;
    let chat_id_str: String = row.get(1)?;
    let sender: String = row.get(2)?;
    let content: String = row.get(3)?;
    let attachment_url: Option<String> = row.get(4)?;
    let attachment_type: Option<String> = row.get(5)?;
    let status_str: String = row.get(6)?;
    let is_edited: bool = row.get(7)?;
    let ts_str: String = row.get(8)?;

    let id = uuid::Uuid::parse_str(&id_str).map(MessageId).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let chat_id = ChatId::parse(&chat_id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let status = MessageStatus::from_str(&status_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            6,
            rusqlite::types::Type::Text,
            format!("unknown message status: {status_str}").into(),
        )
    })?;

    let timestamp = parse_ts(&ts_str, 8)?;

    Ok(StoredMessage {
        id,
        chat_id,
        sender_id: UserId(sender),
        content,
        attachment_url,
        attachment_type,
        status,
        is_edited,
        timestamp,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    use crate::models::NewMessage;

    fn test_db() -> (Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        (db, dir)
    }

    fn seed_chat(db: &Database, count: usize) -> ChatId {
        let a = UserId::from("alice");
        let b = UserId::from("bob");
        let chat = db.find_or_create_chat(&a, &b).unwrap();

        let base = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();
        let batch: Vec<NewMessage> = (0..count)
            .map(|i| {
                NewMessage::text(
                    a.clone(),
                    format!("message {i}"),
                    base + Duration::seconds(i as i64),
                )
            })
            .collect();
        db.append_messages(chat.id, &batch).unwrap();
        chat.id
    }

    #[test]
    fn first_page_starts_with_newest() {
        let (db, _dir) = test_db();
        let chat_id = seed_chat(&db, 45);

        let page = db.page_messages(chat_id, 1, 20).unwrap();
        assert_eq!(page.len(), 20);
        assert_eq!(page[0].content, "message 44");
        assert_eq!(page[19].content, "message 25");
    }

    #[test]
    fn last_page_is_short() {
        let (db, _dir) = test_db();
        let chat_id = seed_chat(&db, 45);

        let page = db.page_messages(chat_id, 3, 20).unwrap();
        assert_eq!(page.len(), 5);
        assert_eq!(page[4].content, "message 0");
    }

    #[test]
    fn count_and_latest() {
        let (db, _dir) = test_db();
        let chat_id = seed_chat(&db, 3);

        assert_eq!(db.count_messages(chat_id).unwrap(), 3);
        let latest = db.latest_message(chat_id).unwrap().unwrap();
        assert_eq!(latest.content, "message 2");
    }

    #[test]
    fn empty_chat_has_no_latest() {
        let (db, _dir) = test_db();
        let chat = db
            .find_or_create_chat(&UserId::from("a"), &UserId::from("b"))
            .unwrap();
        assert!(db.latest_message(chat.id).unwrap().is_none());
        assert_eq!(db.count_messages(chat.id).unwrap(), 0);
    }

    #[test]
    fn unread_count_is_contiguous_suffix() {
        let (db, _dir) = test_db();
        let me = UserId::from("me");
        let them = UserId::from("them");
        let chat = db.find_or_create_chat(&me, &them).unwrap();

        let base = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();
        // Oldest -> newest: mine/read, theirs/read, theirs/delivered x2.
        let mut m1 = NewMessage::text(me.clone(), "mine", base);
        m1.status = MessageStatus::Read;
        let mut m2 = NewMessage::text(them.clone(), "seen", base + Duration::seconds(1));
        m2.status = MessageStatus::Read;
        let m3 = NewMessage::text(them.clone(), "new 1", base + Duration::seconds(2));
        let m4 = NewMessage::text(them.clone(), "new 2", base + Duration::seconds(3));
        db.append_messages(chat.id, &[m1, m2, m3, m4]).unwrap();

        assert_eq!(db.unread_suffix_count(chat.id, &me).unwrap(), 2);
        // From the other side everything newest-first is "mine", so zero.
        assert_eq!(db.unread_suffix_count(chat.id, &them).unwrap(), 0);
    }

    #[test]
    fn read_message_truncates_suffix_even_with_older_unread() {
        let (db, _dir) = test_db();
        let me = UserId::from("me");
        let them = UserId::from("them");
        let chat = db.find_or_create_chat(&me, &them).unwrap();

        let base = Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap();
        // An unread message followed by a read one: the read message stops
        // the backward scan, so the older unread one is not counted.
        let m1 = NewMessage::text(them.clone(), "old unread", base);
        let mut m2 = NewMessage::text(them.clone(), "read later", base + Duration::seconds(1));
        m2.status = MessageStatus::Read;
        db.append_messages(chat.id, &[m1, m2]).unwrap();

        assert_eq!(db.unread_suffix_count(chat.id, &me).unwrap(), 0);
    }
}
