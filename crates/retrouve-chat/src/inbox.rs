//! Chat List Assembler.
//!
//! Produces the ordered, paginated inbox for a user. The ordering contract
//! is part of the client protocol and must hold exactly:
//!
//! 1. pinned chats with messages, most recent message first
//! 2. pinned chats without messages
//! 3. unpinned chats with messages, most recent message first
//! 4. unpinned chats without messages
//!
//! Pages are 0-based with a fixed size of [`CHAT_PAGE_SIZE`].

use chrono::{DateTime, Local};

use retrouve_shared::constants::CHAT_PAGE_SIZE;
use retrouve_shared::preview::format_preview_date;
use retrouve_shared::protocol::ChatSummaryView;
use retrouve_shared::types::UserId;
use retrouve_store::{Chat, Database, DirectoryEntry};

use crate::error::Result;
use crate::users::UserDirectory;

/// One page of a user's inbox.
#[derive(Debug, Clone, PartialEq)]
pub struct InboxPage {
    pub items: Vec<ChatSummaryView>,
    pub is_more: bool,
    pub page: u32,
    pub total_pages: u32,
    pub total_chats: u64,
}

/// Assemble one page of `viewer`'s inbox.
///
/// `now` anchors the preview-date formatting so callers (and tests) control
/// the clock.
pub fn inbox_page(
    db: &Database,
    users: &dyn UserDirectory,
    viewer: &UserId,
    page_number: u32,
    now: DateTime<Local>,
) -> Result<InboxPage> {
    let mut rows = Vec::new();
    for entry in db.entries_for_user(viewer)? {
        let chat = db.get_chat(entry.chat_id)?;
        rows.push((entry, chat));
    }

    let ordered = order_rows(rows);

    tracing::debug!(user = %viewer, chats = ordered.len(), page = page_number, "inbox assembled");

    let total_chats = ordered.len() as u64;
    let total_pages = total_chats.div_ceil(CHAT_PAGE_SIZE as u64) as u32;
    let is_more = total_chats > (page_number as u64 + 1) * CHAT_PAGE_SIZE as u64;

    let mut items = Vec::new();
    for (entry, chat) in ordered
        .into_iter()
        .skip(page_number as usize * CHAT_PAGE_SIZE)
        .take(CHAT_PAGE_SIZE)
    {
        items.push(summary_view(db, users, viewer, &entry, &chat, &now)?);
    }

    Ok(InboxPage {
        items,
        is_more,
        page: page_number,
        total_pages,
        total_chats,
    })
}

/// Apply the four-partition ordering policy.
fn order_rows(rows: Vec<(DirectoryEntry, Chat)>) -> Vec<(DirectoryEntry, Chat)> {
    let mut pinned_active = Vec::new();
    let mut pinned_empty = Vec::new();
    let mut unpinned_active = Vec::new();
    let mut unpinned_empty = Vec::new();

    for row in rows {
        let has_messages = row.1.last_message_at.is_some();
        match (row.0.is_pinned, has_messages) {
            (true, true) => pinned_active.push(row),
            (true, false) => pinned_empty.push(row),
            (false, true) => unpinned_active.push(row),
            (false, false) => unpinned_empty.push(row),
        }
    }

    pinned_active.sort_by(|a, b| b.1.last_message_at.cmp(&a.1.last_message_at));
    unpinned_active.sort_by(|a, b| b.1.last_message_at.cmp(&a.1.last_message_at));

    let mut ordered = pinned_active;
    ordered.extend(pinned_empty);
    ordered.extend(unpinned_active);
    ordered.extend(unpinned_empty);
    ordered
}

/// Build one inbox row.
fn summary_view(
    db: &Database,
    users: &dyn UserDirectory,
    viewer: &UserId,
    entry: &DirectoryEntry,
    chat: &Chat,
    now: &DateTime<Local>,
) -> Result<ChatSummaryView> {
    let other = chat
        .participants
        .iter()
        .find(|p| *p != viewer)
        .cloned()
        .unwrap_or_else(|| viewer.clone());
    let profile = users.find_by_id(&other)?;

    // Group chats carry their own name/avatar; direct chats show the other
    // participant.
    let full_name = chat
        .name
        .clone()
        .or_else(|| profile.as_ref().map(|p| p.full_name.clone()))
        .unwrap_or_default();
    let picture = chat
        .avatar_url
        .clone()
        .or_else(|| profile.as_ref().and_then(|p| p.picture_url.clone()));

    let last = db.latest_message(chat.id)?;
    let unread_count = db.unread_suffix_count(chat.id, viewer)?;

    let (is_mine, status, is_image, date) = match &last {
        Some(message) => (
            &message.sender_id == viewer,
            Some(message.status),
            message.attachment_url.is_some(),
            Some(format_preview_date(
                &message.timestamp.with_timezone(&Local),
                now,
            )),
        ),
        None => (false, None, false, None),
    };

    Ok(ChatSummaryView {
        chat_id: chat.id,
        full_name,
        picture,
        last_message: chat.last_message_content.clone(),
        last_message_date: date,
        is_last_message_mine: is_mine,
        last_message_status: status,
        is_last_message_image: is_image,
        unread_count,
        is_pinned: entry.is_pinned,
        is_muted: entry.is_muted,
    })
}
