//! CRUD operations for [`Chat`] records and their message log.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::params;

use retrouve_shared::types::{ChatId, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Chat, NewMessage};

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new chat with the given participants (creation order kept).
    pub fn create_chat(&self, participants: &[UserId]) -> Result<Chat> {
        if participants.len() < 2 {
            return Err(StoreError::TooFewParticipants(participants.len()));
        }

        let id = ChatId::new();
        let now = Utc::now();

        let tx = self.conn().unchecked_transaction()?;
        tx.execute(
            "INSERT INTO chats (id, name, avatar_url, last_message_content,
                                last_message_at, created_at, updated_at)
             VALUES (?1, NULL, NULL, NULL, NULL, ?2, ?2)",
            params![
                id.to_string(),
                now.to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        )?;

        for (position, user) in participants.iter().enumerate() {
            tx.execute(
                "INSERT INTO chat_participants (chat_id, user_id, position)
                 VALUES (?1, ?2, ?3)",
                params![id.to_string(), user.as_str(), position as i64],
            )?;
        }
        tx.commit()?;

        tracing::debug!(chat = %id, participants = participants.len(), "chat created");

        Ok(Chat {
            id,
            name: None,
            avatar_url: None,
            participants: participants.to_vec(),
            last_message_content: None,
            last_message_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Find the direct chat between two users, treating the pair as
    /// unordered: a chat created for `[a, b]` is found for `(b, a)` too.
    pub fn find_chat_for_pair(&self, a: &UserId, b: &UserId) -> Result<Option<Chat>> {
        let chat_id: Option<String> = self
            .conn()
            .query_row(
                "SELECT p1.chat_id
                   FROM chat_participants p1
                   JOIN chat_participants p2 ON p1.chat_id = p2.chat_id
                  WHERE p1.user_id = ?1
                    AND p2.user_id = ?2
                    AND (SELECT COUNT(*) FROM chat_participants pc
                          WHERE pc.chat_id = p1.chat_id) = 2
                  LIMIT 1",
                params![a.as_str(), b.as_str()],
                |row| row.get(0),
            )
            .map(Some)
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(None),
                other => Err(StoreError::Sqlite(other)),
            })?;

        match chat_id {
            Some(id) => Ok(Some(self.get_chat(ChatId::parse(&id)?)?)),
            None => Ok(None),
        }
    }

    /// Find the chat between two users, creating it if absent.
    ///
    /// Idempotent and order-independent: a second attempt for the same
    /// unordered pair returns the existing chat.
    pub fn find_or_create_chat(&self, a: &UserId, b: &UserId) -> Result<Chat> {
        if a == b {
            return Err(StoreError::TooFewParticipants(1));
        }

        if let Some(chat) = self.find_chat_for_pair(a, b)? {
            return Ok(chat);
        }
        self.create_chat(&[a.clone(), b.clone()])
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single chat by id, participants included.
    pub fn get_chat(&self, id: ChatId) -> Result<Chat> {
        let mut chat = self
            .conn()
            .query_row(
                "SELECT id, name, avatar_url, last_message_content,
                        last_message_at, created_at, updated_at
                   FROM chats
                  WHERE id = ?1",
                params![id.to_string()],
                row_to_chat,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })?;

        chat.participants = self.chat_participants(id)?;
        Ok(chat)
    }

    /// Participant ids for a chat, in creation order.
    pub fn chat_participants(&self, chat_id: ChatId) -> Result<Vec<UserId>> {
        let mut stmt = self.conn().prepare(
            "SELECT user_id FROM chat_participants
              WHERE chat_id = ?1
              ORDER BY position ASC",
        )?;

        let rows = stmt.query_map(params![chat_id.to_string()], |row| {
            row.get::<_, String>(0).map(UserId)
        })?;

        let mut participants = Vec::new();
        for row in rows {
            participants.push(row?);
        }
        Ok(participants)
    }

    // ------------------------------------------------------------------
    // Append
    // ------------------------------------------------------------------

    /// Append a batch of messages and refresh the chat's denormalised
    /// last-message fields, all in one transaction.  The summary always
    /// reflects the final item of the batch.
    pub fn append_messages(&self, chat_id: ChatId, messages: &[NewMessage]) -> Result<Chat> {
        let Some(last) = messages.last() else {
            return self.get_chat(chat_id);
        };

        for message in messages {
            if message.content.is_empty() && message.attachment_url.is_none() {
                return Err(StoreError::EmptyMessage);
            }
        }

        let tx = self.conn().unchecked_transaction()?;

        let exists: bool = tx
            .query_row(
                "SELECT 1 FROM chats WHERE id = ?1",
                params![chat_id.to_string()],
                |_| Ok(true),
            )
            .or_else(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => Ok(false),
                other => Err(StoreError::Sqlite(other)),
            })?;
        if !exists {
            return Err(StoreError::NotFound);
        }

        for message in messages {
            tx.execute(
                "INSERT INTO messages (id, chat_id, sender_id, content,
                                       attachment_url, attachment_type,
                                       status, is_edited, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8)",
                params![
                    message.id.to_string(),
                    chat_id.to_string(),
                    message.sender_id.as_str(),
                    message.content,
                    message.attachment_url,
                    message.attachment_type,
                    message.status.as_str(),
                    message.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
                ],
            )?;
        }

        tx.execute(
            "UPDATE chats
                SET last_message_content = ?2,
                    last_message_at      = ?3,
                    updated_at           = ?3
              WHERE id = ?1",
            params![
                chat_id.to_string(),
                last.summary_text(),
                last.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            ],
        )?;

        tx.commit()?;

        tracing::debug!(chat = %chat_id, count = messages.len(), "messages appended");

        self.get_chat(chat_id)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Chat`] (participants filled in separately).
fn row_to_chat(row: &rusqlite::Row<'_>) -> rusqlite::Result<Chat> {
    let id_str: String = row.get(0)?;
    let name: Option<String> = row.get(1)?;
    let avatar_url: Option<String> = row.get(2)?;
    let last_message_content: Option<String> = row.get(3)?;
    let last_at_str: Option<String> = row.get(4)?;
    let created_str: String = row.get(5)?;
    let updated_str: String = row.get(6)?;

    let id = ChatId::parse(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let last_message_at = last_at_str
        .map(|s| parse_ts(&s, 4))
        .transpose()?;
    let created_at = parse_ts(&created_str, 5)?;
    let updated_at = parse_ts(&updated_str, 6)?;

    Ok(Chat {
        id,
        name,
        avatar_url,
        participants: Vec::new(),
        last_message_content,
        last_message_at,
        created_at,
        updated_at,
    })
}

pub(crate) fn parse_ts(s: &str, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                column,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
}
