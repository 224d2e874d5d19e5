//! Domain model structs persisted in the SQLite database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the view assemblers and the gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use retrouve_shared::types::{ChatId, MessageId, MessageStatus, UserId};

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// A conversation between two or more participants.
///
/// `last_message_content` / `last_message_at` are denormalised from the
/// message log so inbox listing never scans it; `append_messages` keeps them
/// in step within a single transaction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chat {
    /// Unique chat identifier.
    pub id: ChatId,
    /// Optional display name (group use).
    pub name: Option<String>,
    /// Optional avatar URL (group use).
    pub avatar_url: Option<String>,
    /// Participant identifiers, in creation order. Immutable after creation.
    pub participants: Vec<UserId>,
    /// Preview text of the most recent message.
    pub last_message_content: Option<String>,
    /// Timestamp of the most recent message.
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single chat message as stored in the log.
///
/// Invariant: `content` is non-empty or `attachment_url` is present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredMessage {
    /// Unique message identifier.
    pub id: MessageId,
    /// The chat this message belongs to.
    pub chat_id: ChatId,
    /// Sender identifier.
    pub sender_id: UserId,
    /// Text content; empty for pure attachment messages.
    pub content: String,
    /// Public URL of the attachment, if any.
    pub attachment_url: Option<String>,
    /// MIME type of the attachment, if any.
    pub attachment_type: Option<String>,
    /// Delivery lifecycle state.
    pub status: MessageStatus,
    /// Whether the message was edited after sending.
    pub is_edited: bool,
    /// When the message was sent.
    pub timestamp: DateTime<Utc>,
}

/// Input for appending a message to a chat's log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub id: MessageId,
    pub sender_id: UserId,
    pub content: String,
    pub attachment_url: Option<String>,
    pub attachment_type: Option<String>,
    pub status: MessageStatus,
    pub timestamp: DateTime<Utc>,
}

impl NewMessage {
    /// A plain text message.
    pub fn text(sender_id: UserId, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: MessageId::new(),
            sender_id,
            content: content.into(),
            attachment_url: None,
            attachment_type: None,
            status: MessageStatus::Delivered,
            timestamp,
        }
    }

    /// A message carrying a single attachment and no text.
    pub fn attachment(
        sender_id: UserId,
        url: impl Into<String>,
        content_type: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            sender_id,
            content: String::new(),
            attachment_url: Some(url.into()),
            attachment_type: Some(content_type.into()),
            status: MessageStatus::Delivered,
            timestamp,
        }
    }

    /// Text used for the chat's denormalised last-message preview: the
    /// content when present, otherwise the attachment URL.
    pub fn summary_text(&self) -> &str {
        if !self.content.is_empty() {
            &self.content
        } else {
            self.attachment_url.as_deref().unwrap_or_default()
        }
    }
}

// ---------------------------------------------------------------------------
// Directory entry
// ---------------------------------------------------------------------------

/// A user's personal view of a chat: pinned/muted flags, independent of the
/// chat itself. Removing an entry hides the chat from this user only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub user_id: UserId,
    pub chat_id: ChatId,
    pub is_pinned: bool,
    pub is_muted: bool,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// Cached identity of a user from the external user service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub user_id: UserId,
    pub full_name: String,
    pub picture_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}
