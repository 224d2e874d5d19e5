//! Message Feed Assembler.
//!
//! Messages are stored oldest-first; the feed is served newest-first with
//! 1-based pages of [`MESSAGE_PAGE_SIZE`]: page 1 holds the most recent
//! messages.

use chrono::Local;

use retrouve_shared::constants::MESSAGE_PAGE_SIZE;
use retrouve_shared::preview::format_time_of_day;
use retrouve_shared::protocol::MessageView;
use retrouve_shared::types::ChatId;
use retrouve_store::{Database, StoredMessage};

use crate::error::Result;

/// One page of a chat's message history.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedPage {
    pub items: Vec<MessageView>,
    pub is_more: bool,
    pub page: u32,
    pub total_pages: u32,
    pub total_items: u64,
}

/// Assemble one newest-first page of a chat's messages.
pub fn feed_page(db: &Database, chat_id: ChatId, page_number: u32) -> Result<FeedPage> {
    let page = page_number.max(1);
    let page_size = MESSAGE_PAGE_SIZE as u64;

    let total_items = db.count_messages(chat_id)?;
    let total_pages = total_items.div_ceil(page_size) as u32;

    let items = db
        .page_messages(chat_id, page, MESSAGE_PAGE_SIZE as u32)?
        .iter()
        .map(message_view)
        .collect();

    Ok(FeedPage {
        items,
        is_more: page < total_pages,
        page,
        total_pages,
        total_items,
    })
}

/// Project a stored message into its wire shape.
pub fn message_view(message: &StoredMessage) -> MessageView {
    MessageView {
        message_id: message.id,
        chat_id: message.chat_id,
        sender: message.sender_id.clone(),
        content: message.content.clone(),
        attachment_url: message.attachment_url.clone(),
        attachment_type: message.attachment_type.clone(),
        time: format_time_of_day(&message.timestamp.with_timezone(&Local)),
        status: message.status,
        is_edited: message.is_edited,
    }
}
