use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::types::{ChatId, MessageId, MessageStatus, UserId};

// The event names and payload field spellings below (including `reciever`)
// are part of the deployed client contract and must not be renamed.

/// Commands received from a connected client session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    /// Join the broadcast room for a chat.
    #[serde(rename = "joinRoom")]
    JoinRoom(JoinRoom),

    /// Request one page of the caller's inbox.
    #[serde(rename = "getChatsPagination")]
    GetChatsPagination(GetChatsPagination),

    /// Find or create the chat between two users.
    #[serde(rename = "createChatAttempt")]
    CreateChatAttempt(CreateChatAttempt),

    /// Request one page of a chat's message history.
    #[serde(rename = "getChatMessages")]
    GetChatMessages(GetChatMessages),

    /// Send a text message and/or image attachments into a chat.
    #[serde(rename = "sendMessage")]
    SendMessage(SendMessage),

    /// Mark the `count` most recent delivered messages as read.
    #[serde(rename = "updateUnreadMessage")]
    UpdateUnreadMessage(UpdateUnreadMessage),

    /// Remove a chat from the caller's own inbox.
    #[serde(rename = "deleteChat")]
    DeleteChat(DeleteChat),

    /// Toggle the pinned flag on the caller's directory entry.
    #[serde(rename = "pinChat")]
    PinChat(PinChat),

    /// Toggle the muted flag on the caller's directory entry.
    #[serde(rename = "muteChat")]
    MuteChat(MuteChat),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoom {
    pub chat_id: ChatId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GetChatsPagination {
    pub user_id: UserId,
    pub page_number: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateChatAttempt {
    pub sender_id: UserId,
    #[serde(rename = "recieverId")]
    pub reciever_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GetChatMessages {
    pub chat_id: ChatId,
    pub page_number: u32,
}

/// `sendMessage` payload.
///
/// The required identifiers are optional at the deserialization boundary so
/// that a missing field is reported as a validation failure, not a parse
/// error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    #[serde(default)]
    pub message_text: String,
    pub sender: Option<UserId>,
    pub reciever: Option<UserId>,
    pub chat_id: Option<ChatId>,
    /// Image attachments, in submission order.
    #[serde(rename = "imagesUrl", default)]
    pub images_url: Vec<AttachmentUpload>,
}

/// One attachment submitted with `sendMessage`: raw bytes as base64 plus
/// the MIME type the client reported.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentUpload {
    pub data: String,
    pub content_type: String,
    #[serde(default)]
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUnreadMessage {
    pub count: u32,
    pub chat_id: ChatId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteChat {
    pub chat_id: ChatId,
    pub user_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PinChat {
    pub chat_id: ChatId,
    pub user_id: UserId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MuteChat {
    pub chat_id: ChatId,
    pub user_id: UserId,
}

/// Events emitted to client sessions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "chatsPaginationResponse")]
    ChatsPagination(ChatsPaginationResponse),

    #[serde(rename = "createChatResponse")]
    CreateChat(CreateChatResponse),

    #[serde(rename = "chatMessagesResponse")]
    ChatMessages(ChatMessagesResponse),

    /// Broadcast to every session in the chat's room.
    #[serde(rename = "newMessage")]
    NewMessage(Vec<MessageView>),

    /// Direct acknowledgement to the sending session only.
    #[serde(rename = "messageSent")]
    MessageSent(MessageSent),

    #[serde(rename = "messagesUpdated")]
    MessagesUpdated(MessagesUpdated),

    #[serde(rename = "deleteChatResponse")]
    DeleteChat(SimpleResponse),

    #[serde(rename = "pinChatResponse")]
    PinChat(SimpleResponse),

    #[serde(rename = "muteChatResponse")]
    MuteChat(SimpleResponse),

    /// Generic failure notice.
    #[serde(rename = "error")]
    Error(ErrorNotice),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatsPaginationResponse {
    pub success: bool,
    pub data: Vec<ChatSummaryView>,
    pub pagination: ChatsPaginationMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatsPaginationMeta {
    pub is_more: bool,
    pub page: u32,
    pub total_pages: u32,
    pub total_chats: u64,
}

/// One inbox row: the other participant, the last-message preview, and the
/// caller's unread/pin/mute state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummaryView {
    pub chat_id: ChatId,
    pub full_name: String,
    pub picture: Option<String>,
    pub last_message: Option<String>,
    pub last_message_date: Option<String>,
    pub is_last_message_mine: bool,
    pub last_message_status: Option<MessageStatus>,
    pub is_last_message_image: bool,
    pub unread_count: u32,
    pub is_pinned: bool,
    pub is_muted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateChatResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<ChatId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver_full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receiver_picture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CreateChatResponse {
    pub fn ok(chat_id: ChatId, full_name: String, picture: Option<String>) -> Self {
        Self {
            success: true,
            chat_id: Some(chat_id),
            receiver_full_name: Some(full_name),
            receiver_picture: picture,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            chat_id: None,
            receiver_full_name: None,
            receiver_picture: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessagesResponse {
    pub success: bool,
    pub data: Vec<MessageView>,
    pub pagination: FeedPaginationMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeedPaginationMeta {
    pub is_more: bool,
    pub page: u32,
    pub total_pages: u32,
    pub total_items: u64,
}

/// One message as shown in the feed and in `newMessage` broadcasts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub message_id: MessageId,
    pub chat_id: ChatId,
    pub sender: UserId,
    pub content: String,
    pub attachment_url: Option<String>,
    pub attachment_type: Option<String>,
    /// `HH:MM` time of day.
    pub time: String,
    pub status: MessageStatus,
    pub is_edited: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessageSent {
    pub success: bool,
    pub messages: Vec<MessageView>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessagesUpdated {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<ChatId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl MessagesUpdated {
    pub fn ok(chat_id: ChatId, updated_count: u32) -> Self {
        Self {
            success: true,
            chat_id: Some(chat_id),
            updated_count: Some(updated_count),
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            chat_id: None,
            updated_count: None,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SimpleResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorNotice {
    pub message: String,
}

impl ClientEvent {
    /// Parse a client frame.
    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl ServerEvent {
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(text: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorNotice {
            message: message.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_room_uses_exact_event_name() {
        let chat_id = ChatId::new();
        let json = ClientEvent::JoinRoom(JoinRoom { chat_id }).to_json().unwrap();
        assert!(json.contains("\"event\":\"joinRoom\""));
        assert!(json.contains("\"chatId\""));
    }

    #[test]
    fn create_chat_attempt_keeps_misspelled_field() {
        let json = ClientEvent::CreateChatAttempt(CreateChatAttempt {
            sender_id: "alice".into(),
            reciever_id: "bob".into(),
        })
        .to_json()
        .unwrap();
        assert!(json.contains("\"recieverId\":\"bob\""));

        let restored = ClientEvent::from_json(&json).unwrap();
        match restored {
            ClientEvent::CreateChatAttempt(p) => assert_eq!(p.reciever_id, "bob".into()),
            other => panic!("wrong event: {other:?}"),
        }
    }

    #[test]
    fn send_message_parses_with_missing_ids() {
        // Missing identifiers must parse; validation happens in the gateway.
        let json = r#"{"event":"sendMessage","data":{"messageText":"hello"}}"#;
        let event = ClientEvent::from_json(json).unwrap();
        match event {
            ClientEvent::SendMessage(p) => {
                assert_eq!(p.message_text, "hello");
                assert!(p.chat_id.is_none());
                assert!(p.images_url.is_empty());
            }
            other => panic!("wrong event: {other:?}"),
        }
    }

    #[test]
    fn send_message_attachment_payload() {
        let chat_id = ChatId::new();
        let json = format!(
            r#"{{"event":"sendMessage","data":{{"sender":"a","reciever":"b","chatId":"{}","imagesUrl":[{{"data":"aGk=","contentType":"image/png"}}]}}}}"#,
            chat_id
        );
        let event = ClientEvent::from_json(&json).unwrap();
        match event {
            ClientEvent::SendMessage(p) => {
                assert_eq!(p.chat_id, Some(chat_id));
                assert_eq!(p.images_url.len(), 1);
                assert_eq!(p.images_url[0].content_type, "image/png");
            }
            other => panic!("wrong event: {other:?}"),
        }
    }

    #[test]
    fn failed_create_chat_response_omits_chat_fields() {
        let json = ServerEvent::CreateChat(CreateChatResponse::failed("no such user"))
            .to_json()
            .unwrap();
        assert!(json.contains("\"event\":\"createChatResponse\""));
        assert!(json.contains("\"success\":false"));
        assert!(json.contains("\"error\":\"no such user\""));
        assert!(!json.contains("chatId"));
    }

    #[test]
    fn messages_updated_success_shape() {
        let chat_id = ChatId::new();
        let json = ServerEvent::MessagesUpdated(MessagesUpdated::ok(chat_id, 3))
            .to_json()
            .unwrap();
        assert!(json.contains("\"updatedCount\":3"));
        assert!(!json.contains("\"message\""));
    }

    #[test]
    fn malformed_frame_is_rejected() {
        assert!(ClientEvent::from_json("{\"event\":\"noSuchEvent\",\"data\":{}}").is_err());
        assert!(ClientEvent::from_json("not json").is_err());
    }

    #[test]
    fn server_event_round_trip() {
        let event = ServerEvent::error("boom");
        let json = event.to_json().unwrap();
        assert_eq!(json, r#"{"event":"error","data":{"message":"boom"}}"#);
        assert_eq!(ServerEvent::from_json(&json).unwrap(), event);
    }
}
