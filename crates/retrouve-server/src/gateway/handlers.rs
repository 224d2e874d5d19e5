//! Typed handlers for the gateway event surface.
//!
//! Every command yields exactly one terminal response event to the issuing
//! session — except `sendMessage`, which on success emits both a room
//! broadcast (`newMessage`) and a direct acknowledgement (`messageSent`),
//! and only an `error` event on total failure. Failures are mapped to the
//! response shape each command defines; commands without a failure field
//! answer with the generic `error` event.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{Local, Utc};
use uuid::Uuid;

use retrouve_chat::feed::{feed_page, message_view};
use retrouve_chat::inbox::inbox_page;
use retrouve_shared::protocol::{
    ChatMessagesResponse, ChatsPaginationMeta, ChatsPaginationResponse, ClientEvent,
    CreateChatAttempt, CreateChatResponse, DeleteChat, FeedPaginationMeta, GetChatMessages,
    GetChatsPagination, JoinRoom, MessageSent, MessageView, MessagesUpdated, MuteChat, PinChat,
    SendMessage, ServerEvent, SimpleResponse, UpdateUnreadMessage,
};
use retrouve_shared::types::ChatId;
use retrouve_store::{NewMessage, StoredMessage};

use crate::api::AppState;
use crate::error::GatewayError;
use crate::rooms::Outbox;

/// Dispatch one parsed client event.
pub async fn handle(state: &AppState, conn_id: Uuid, outbox: &Outbox, event: ClientEvent) {
    match event {
        ClientEvent::JoinRoom(payload) => join_room(state, conn_id, outbox, payload).await,
        ClientEvent::GetChatsPagination(payload) => {
            let response = match build_inbox(state, &payload) {
                Ok(response) => ServerEvent::ChatsPagination(response),
                Err(e) => {
                    tracing::warn!(user = %payload.user_id, error = %e, "getChatsPagination failed");
                    ServerEvent::error(e.to_string())
                }
            };
            let _ = outbox.send(response);
        }
        ClientEvent::CreateChatAttempt(payload) => {
            let response = match build_create_chat(state, &payload) {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(sender = %payload.sender_id, error = %e, "createChatAttempt failed");
                    CreateChatResponse::failed(e.to_string())
                }
            };
            let _ = outbox.send(ServerEvent::CreateChat(response));
        }
        ClientEvent::GetChatMessages(payload) => {
            let response = match build_feed(state, &payload) {
                Ok(response) => ServerEvent::ChatMessages(response),
                Err(e) => {
                    tracing::warn!(chat = %payload.chat_id, error = %e, "getChatMessages failed");
                    ServerEvent::error(e.to_string())
                }
            };
            let _ = outbox.send(response);
        }
        ClientEvent::SendMessage(payload) => send_message(state, outbox, payload).await,
        ClientEvent::UpdateUnreadMessage(payload) => {
            let response = match apply_read_receipts(state, &payload) {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(chat = %payload.chat_id, error = %e, "updateUnreadMessage failed");
                    MessagesUpdated::failed(e.to_string())
                }
            };
            let _ = outbox.send(ServerEvent::MessagesUpdated(response));
        }
        ClientEvent::DeleteChat(payload) => {
            let success = match remove_chat(state, &payload) {
                Ok(removed) => removed,
                Err(e) => {
                    tracing::warn!(chat = %payload.chat_id, error = %e, "deleteChat failed");
                    false
                }
            };
            let _ = outbox.send(ServerEvent::DeleteChat(SimpleResponse { success }));
        }
        ClientEvent::PinChat(payload) => {
            let success = match toggle_pin(state, &payload) {
                Ok(entry) => {
                    tracing::debug!(chat = %payload.chat_id, pinned = entry, "pin toggled");
                    true
                }
                Err(e) => {
                    tracing::warn!(chat = %payload.chat_id, error = %e, "pinChat failed");
                    false
                }
            };
            let _ = outbox.send(ServerEvent::PinChat(SimpleResponse { success }));
        }
        ClientEvent::MuteChat(payload) => {
            let success = match toggle_mute(state, &payload) {
                Ok(entry) => {
                    tracing::debug!(chat = %payload.chat_id, muted = entry, "mute toggled");
                    true
                }
                Err(e) => {
                    tracing::warn!(chat = %payload.chat_id, error = %e, "muteChat failed");
                    false
                }
            };
            let _ = outbox.send(ServerEvent::MuteChat(SimpleResponse { success }));
        }
    }
}

async fn join_room(state: &AppState, conn_id: Uuid, outbox: &Outbox, payload: JoinRoom) {
    state
        .rooms
        .join(payload.chat_id, conn_id, outbox.clone())
        .await;
}

fn build_inbox(
    state: &AppState,
    payload: &GetChatsPagination,
) -> Result<ChatsPaginationResponse, GatewayError> {
    let db = state.store()?;
    let page = inbox_page(&db, &*db, &payload.user_id, payload.page_number, Local::now())?;

    Ok(ChatsPaginationResponse {
        success: true,
        data: page.items,
        pagination: ChatsPaginationMeta {
            is_more: page.is_more,
            page: page.page,
            total_pages: page.total_pages,
            total_chats: page.total_chats,
        },
    })
}

fn build_create_chat(
    state: &AppState,
    payload: &CreateChatAttempt,
) -> Result<CreateChatResponse, GatewayError> {
    let db = state.store()?;

    // Resolve the receiver before creating anything so an unknown id fails
    // without leaving a chat behind.
    let profile = match db.get_profile(&payload.reciever_id) {
        Ok(profile) => profile,
        Err(retrouve_store::StoreError::NotFound) => {
            return Err(GatewayError::NotFound("Receiver"));
        }
        Err(other) => return Err(other.into()),
    };

    let chat = db.find_or_create_chat(&payload.sender_id, &payload.reciever_id)?;

    Ok(CreateChatResponse::ok(
        chat.id,
        profile.full_name,
        profile.picture_url,
    ))
}

fn build_feed(
    state: &AppState,
    payload: &GetChatMessages,
) -> Result<ChatMessagesResponse, GatewayError> {
    let db = state.store()?;
    let page = feed_page(&db, payload.chat_id, payload.page_number)?;

    Ok(ChatMessagesResponse {
        success: true,
        data: page.items,
        pagination: FeedPaginationMeta {
            is_more: page.is_more,
            page: page.page,
            total_pages: page.total_pages,
            total_items: page.total_items,
        },
    })
}

async fn send_message(state: &AppState, outbox: &Outbox, payload: SendMessage) {
    match process_send(state, &payload).await {
        Ok((chat_id, views)) => {
            let receivers = state
                .rooms
                .broadcast(chat_id, &ServerEvent::NewMessage(views.clone()))
                .await;
            tracing::debug!(chat = %chat_id, count = views.len(), receivers, "new messages broadcast");

            let _ = outbox.send(ServerEvent::MessageSent(MessageSent {
                success: true,
                messages: views,
            }));
        }
        Err(e) => {
            tracing::warn!(error = %e, "sendMessage failed");
            let _ = outbox.send(ServerEvent::error(e.to_string()));
        }
    }
}

/// Validate, upload attachments, and persist the message batch.
///
/// Per-attachment failures (bad encoding, upload errors) are logged and
/// skipped; the operation only fails as a whole when no message at all
/// could be produced.
async fn process_send(
    state: &AppState,
    payload: &SendMessage,
) -> Result<(ChatId, Vec<MessageView>), GatewayError> {
    let chat_id = payload.chat_id.ok_or(GatewayError::Validation("chatId"))?;
    let sender = payload
        .sender
        .clone()
        .ok_or(GatewayError::Validation("sender"))?;
    let reciever = payload
        .reciever
        .clone()
        .ok_or(GatewayError::Validation("reciever"))?;

    let text = payload.message_text.trim();
    if text.is_empty() && payload.images_url.is_empty() {
        return Err(GatewayError::Validation("messageText"));
    }

    {
        let db = state.store()?;
        db.get_chat(chat_id)?;
        // Both participants see the chat in their inbox from the first
        // message on.
        db.ensure_entry(&sender, chat_id)?;
        db.ensure_entry(&reciever, chat_id)?;
    }

    let mut batch = Vec::new();
    if !text.is_empty() {
        batch.push(NewMessage::text(sender.clone(), text, Utc::now()));
    }

    for (index, upload) in payload.images_url.iter().enumerate() {
        let bytes = match BASE64.decode(upload.data.as_bytes()) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(index, error = %e, "attachment decode failed, skipping");
                continue;
            }
        };

        match state.media.save(&bytes, &upload.content_type).await {
            Ok(object) => {
                // Each message carries its own timestamp so the chat's
                // lastMessageDate reflects the final item appended.
                batch.push(NewMessage::attachment(
                    sender.clone(),
                    object.url,
                    upload.content_type.clone(),
                    Utc::now(),
                ));
            }
            Err(e) => {
                tracing::warn!(index, error = %e, "attachment upload failed, skipping");
            }
        }
    }

    if batch.is_empty() {
        return Err(GatewayError::ExternalService(
            "no message could be produced".to_string(),
        ));
    }

    {
        let db = state.store()?;
        db.append_messages(chat_id, &batch)?;
    }

    let views = batch
        .iter()
        .map(|message| {
            message_view(&StoredMessage {
                id: message.id,
                chat_id,
                sender_id: message.sender_id.clone(),
                content: message.content.clone(),
                attachment_url: message.attachment_url.clone(),
                attachment_type: message.attachment_type.clone(),
                status: message.status,
                is_edited: false,
                timestamp: message.timestamp,
            })
        })
        .collect();

    Ok((chat_id, views))
}

fn apply_read_receipts(
    state: &AppState,
    payload: &UpdateUnreadMessage,
) -> Result<MessagesUpdated, GatewayError> {
    let db = state.store()?;
    let updated = db.mark_recent_delivered_as_read(payload.chat_id, payload.count)?;
    Ok(MessagesUpdated::ok(payload.chat_id, updated))
}

fn remove_chat(state: &AppState, payload: &DeleteChat) -> Result<bool, GatewayError> {
    let db = state.store()?;
    Ok(db.remove_entry(&payload.user_id, payload.chat_id)?)
}

fn toggle_pin(state: &AppState, payload: &PinChat) -> Result<bool, GatewayError> {
    let db = state.store()?;
    let entry = db.toggle_pinned(&payload.user_id, payload.chat_id)?;
    Ok(entry.is_pinned)
}

fn toggle_mute(state: &AppState, payload: &MuteChat) -> Result<bool, GatewayError> {
    let db = state.store()?;
    let entry = db.toggle_muted(&payload.user_id, payload.chat_id)?;
    Ok(entry.is_muted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use tokio::sync::mpsc;

    use retrouve_shared::protocol::AttachmentUpload;
    use retrouve_shared::types::UserId;
    use retrouve_store::{Database, Profile};

    use crate::config::ServerConfig;
    use crate::media::MediaStore;
    use crate::rate_limit::RateLimiter;
    use crate::rooms::Rooms;

    async fn test_state() -> (
        AppState,
        Outbox,
        mpsc::UnboundedReceiver<ServerEvent>,
        tempfile::TempDir,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        let media = MediaStore::new(
            dir.path().join("media"),
            1024 * 1024,
            "http://localhost:8080".to_string(),
        )
        .await
        .unwrap();

        let state = AppState {
            db: Arc::new(Mutex::new(db)),
            media: Arc::new(media),
            rooms: Rooms::new(),
            rate_limiter: RateLimiter::default(),
            config: Arc::new(ServerConfig::default()),
        };
        let (tx, rx) = mpsc::unbounded_channel();
        (state, tx, rx, dir)
    }

    fn seed_chat(state: &AppState, a: &str, b: &str) -> ChatId {
        let db = state.store().unwrap();
        db.find_or_create_chat(&UserId::from(a), &UserId::from(b))
            .unwrap()
            .id
    }

    fn seed_profile(state: &AppState, id: &str, name: &str) {
        let db = state.store().unwrap();
        db.upsert_profile(&Profile {
            user_id: UserId::from(id),
            full_name: name.to_string(),
            picture_url: None,
            updated_at: Utc::now(),
        })
        .unwrap();
    }

    fn send_payload(chat_id: ChatId, text: &str) -> SendMessage {
        SendMessage {
            message_text: text.to_string(),
            sender: Some(UserId::from("alice")),
            reciever: Some(UserId::from("bob")),
            chat_id: Some(chat_id),
            images_url: Vec::new(),
        }
    }

    #[tokio::test]
    async fn text_message_broadcasts_then_acks() {
        let (state, outbox, mut rx, _dir) = test_state().await;
        let chat_id = seed_chat(&state, "alice", "bob");
        let conn_id = Uuid::new_v4();

        handle(
            &state,
            conn_id,
            &outbox,
            ClientEvent::JoinRoom(JoinRoom { chat_id }),
        )
        .await;
        handle(
            &state,
            conn_id,
            &outbox,
            ClientEvent::SendMessage(send_payload(chat_id, "bonjour")),
        )
        .await;

        // The sender joined the room, so it sees the broadcast first and
        // the direct acknowledgement second.
        match rx.recv().await.unwrap() {
            ServerEvent::NewMessage(views) => {
                assert_eq!(views.len(), 1);
                assert_eq!(views[0].content, "bonjour");
            }
            other => panic!("expected newMessage, got {other:?}"),
        }
        match rx.recv().await.unwrap() {
            ServerEvent::MessageSent(ack) => {
                assert!(ack.success);
                assert_eq!(ack.messages.len(), 1);
            }
            other => panic!("expected messageSent, got {other:?}"),
        }

        // Both participants got a directory entry.
        let db = state.store().unwrap();
        assert!(db.get_entry(&UserId::from("alice"), chat_id).is_ok());
        assert!(db.get_entry(&UserId::from("bob"), chat_id).is_ok());
    }

    #[tokio::test]
    async fn two_attachments_without_text_create_two_messages() {
        let (state, outbox, mut rx, _dir) = test_state().await;
        let chat_id = seed_chat(&state, "alice", "bob");

        let mut payload = send_payload(chat_id, "");
        payload.images_url = vec![
            AttachmentUpload {
                data: BASE64.encode(b"first image"),
                content_type: "image/png".to_string(),
                file_name: None,
            },
            AttachmentUpload {
                data: BASE64.encode(b"second image"),
                content_type: "image/jpeg".to_string(),
                file_name: None,
            },
        ];

        handle(
            &state,
            Uuid::new_v4(),
            &outbox,
            ClientEvent::SendMessage(payload),
        )
        .await;

        let ack = match rx.recv().await.unwrap() {
            ServerEvent::MessageSent(ack) => ack,
            other => panic!("expected messageSent, got {other:?}"),
        };
        assert_eq!(ack.messages.len(), 2);
        assert!(ack.messages[0].content.is_empty());
        assert!(ack.messages[0].attachment_url.is_some());

        // The chat summary points at the final attachment's URL.
        let db = state.store().unwrap();
        let chat = db.get_chat(chat_id).unwrap();
        assert_eq!(
            chat.last_message_content.as_deref(),
            ack.messages[1].attachment_url.as_deref()
        );
    }

    #[tokio::test]
    async fn missing_chat_id_is_rejected_before_the_store() {
        let (state, outbox, mut rx, _dir) = test_state().await;
        let chat_id = seed_chat(&state, "alice", "bob");

        let mut payload = send_payload(chat_id, "hello");
        payload.chat_id = None;

        handle(
            &state,
            Uuid::new_v4(),
            &outbox,
            ClientEvent::SendMessage(payload),
        )
        .await;

        assert!(matches!(
            rx.recv().await.unwrap(),
            ServerEvent::Error(_)
        ));

        let db = state.store().unwrap();
        assert_eq!(db.count_messages(chat_id).unwrap(), 0);
        // Validation failed before any directory write.
        assert!(db.get_entry(&UserId::from("alice"), chat_id).is_err());
    }

    #[tokio::test]
    async fn bad_attachment_is_skipped_when_text_survives() {
        let (state, outbox, mut rx, _dir) = test_state().await;
        let chat_id = seed_chat(&state, "alice", "bob");

        let mut payload = send_payload(chat_id, "still works");
        payload.images_url = vec![AttachmentUpload {
            data: "*** not base64 ***".to_string(),
            content_type: "image/png".to_string(),
            file_name: None,
        }];

        handle(
            &state,
            Uuid::new_v4(),
            &outbox,
            ClientEvent::SendMessage(payload),
        )
        .await;

        let ack = match rx.recv().await.unwrap() {
            ServerEvent::MessageSent(ack) => ack,
            other => panic!("expected messageSent, got {other:?}"),
        };
        assert_eq!(ack.messages.len(), 1);
        assert_eq!(ack.messages[0].content, "still works");
    }

    #[tokio::test]
    async fn zero_surviving_messages_fail_the_whole_send() {
        let (state, outbox, mut rx, _dir) = test_state().await;
        let chat_id = seed_chat(&state, "alice", "bob");

        let mut payload = send_payload(chat_id, "");
        payload.images_url = vec![AttachmentUpload {
            data: "*** not base64 ***".to_string(),
            content_type: "image/png".to_string(),
            file_name: None,
        }];

        handle(
            &state,
            Uuid::new_v4(),
            &outbox,
            ClientEvent::SendMessage(payload),
        )
        .await;

        assert!(matches!(rx.recv().await.unwrap(), ServerEvent::Error(_)));
        let db = state.store().unwrap();
        assert_eq!(db.count_messages(chat_id).unwrap(), 0);
    }

    #[tokio::test]
    async fn create_chat_attempt_is_idempotent_and_resolves_receiver() {
        let (state, outbox, mut rx, _dir) = test_state().await;
        seed_profile(&state, "bob", "Bob Martin");

        let attempt = ClientEvent::CreateChatAttempt(CreateChatAttempt {
            sender_id: "alice".into(),
            reciever_id: "bob".into(),
        });

        handle(&state, Uuid::new_v4(), &outbox, attempt.clone()).await;
        let first = match rx.recv().await.unwrap() {
            ServerEvent::CreateChat(response) => response,
            other => panic!("expected createChatResponse, got {other:?}"),
        };
        assert!(first.success);
        assert_eq!(first.receiver_full_name.as_deref(), Some("Bob Martin"));

        handle(&state, Uuid::new_v4(), &outbox, attempt).await;
        let second = match rx.recv().await.unwrap() {
            ServerEvent::CreateChat(response) => response,
            other => panic!("expected createChatResponse, got {other:?}"),
        };
        assert_eq!(first.chat_id, second.chat_id);
    }

    #[tokio::test]
    async fn create_chat_attempt_with_unknown_receiver_fails() {
        let (state, outbox, mut rx, _dir) = test_state().await;

        handle(
            &state,
            Uuid::new_v4(),
            &outbox,
            ClientEvent::CreateChatAttempt(CreateChatAttempt {
                sender_id: "alice".into(),
                reciever_id: "ghost".into(),
            }),
        )
        .await;

        let response = match rx.recv().await.unwrap() {
            ServerEvent::CreateChat(response) => response,
            other => panic!("expected createChatResponse, got {other:?}"),
        };
        assert!(!response.success);
        assert!(response.error.is_some());

        // No chat was left behind.
        let db = state.store().unwrap();
        assert!(db
            .find_chat_for_pair(&UserId::from("alice"), &UserId::from("ghost"))
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn update_unread_reports_applied_count() {
        let (state, outbox, mut rx, _dir) = test_state().await;
        let chat_id = seed_chat(&state, "alice", "bob");

        handle(
            &state,
            Uuid::new_v4(),
            &outbox,
            ClientEvent::SendMessage(send_payload(chat_id, "one")),
        )
        .await;
        rx.recv().await.unwrap(); // messageSent (no room joined)

        handle(
            &state,
            Uuid::new_v4(),
            &outbox,
            ClientEvent::UpdateUnreadMessage(UpdateUnreadMessage { count: 5, chat_id }),
        )
        .await;

        let response = match rx.recv().await.unwrap() {
            ServerEvent::MessagesUpdated(response) => response,
            other => panic!("expected messagesUpdated, got {other:?}"),
        };
        assert!(response.success);
        assert_eq!(response.updated_count, Some(1));
        assert_eq!(response.chat_id, Some(chat_id));
    }

    #[tokio::test]
    async fn pin_and_delete_respond_with_success_flags() {
        let (state, outbox, mut rx, _dir) = test_state().await;
        let chat_id = seed_chat(&state, "alice", "bob");
        let alice = UserId::from("alice");
        state.store().unwrap().ensure_entry(&alice, chat_id).unwrap();

        handle(
            &state,
            Uuid::new_v4(),
            &outbox,
            ClientEvent::PinChat(PinChat {
                chat_id,
                user_id: alice.clone(),
            }),
        )
        .await;
        assert_eq!(
            rx.recv().await.unwrap(),
            ServerEvent::PinChat(SimpleResponse { success: true })
        );

        handle(
            &state,
            Uuid::new_v4(),
            &outbox,
            ClientEvent::DeleteChat(DeleteChat {
                chat_id,
                user_id: alice.clone(),
            }),
        )
        .await;
        assert_eq!(
            rx.recv().await.unwrap(),
            ServerEvent::DeleteChat(SimpleResponse { success: true })
        );

        // A second delete finds nothing to remove.
        handle(
            &state,
            Uuid::new_v4(),
            &outbox,
            ClientEvent::DeleteChat(DeleteChat {
                chat_id,
                user_id: alice,
            }),
        )
        .await;
        assert_eq!(
            rx.recv().await.unwrap(),
            ServerEvent::DeleteChat(SimpleResponse { success: false })
        );
    }

    #[tokio::test]
    async fn mute_without_entry_fails() {
        let (state, outbox, mut rx, _dir) = test_state().await;
        let chat_id = seed_chat(&state, "alice", "bob");

        handle(
            &state,
            Uuid::new_v4(),
            &outbox,
            ClientEvent::MuteChat(MuteChat {
                chat_id,
                user_id: "alice".into(),
            }),
        )
        .await;
        assert_eq!(
            rx.recv().await.unwrap(),
            ServerEvent::MuteChat(SimpleResponse { success: false })
        );
    }

    #[tokio::test]
    async fn inbox_and_feed_queries_answer_with_pagination() {
        let (state, outbox, mut rx, _dir) = test_state().await;
        let chat_id = seed_chat(&state, "alice", "bob");

        handle(
            &state,
            Uuid::new_v4(),
            &outbox,
            ClientEvent::SendMessage(send_payload(chat_id, "salut")),
        )
        .await;
        rx.recv().await.unwrap(); // messageSent

        handle(
            &state,
            Uuid::new_v4(),
            &outbox,
            ClientEvent::GetChatsPagination(GetChatsPagination {
                user_id: "alice".into(),
                page_number: 0,
            }),
        )
        .await;
        let inbox = match rx.recv().await.unwrap() {
            ServerEvent::ChatsPagination(response) => response,
            other => panic!("expected chatsPaginationResponse, got {other:?}"),
        };
        assert!(inbox.success);
        assert_eq!(inbox.data.len(), 1);
        assert_eq!(inbox.pagination.total_chats, 1);
        assert!(!inbox.pagination.is_more);

        handle(
            &state,
            Uuid::new_v4(),
            &outbox,
            ClientEvent::GetChatMessages(GetChatMessages {
                chat_id,
                page_number: 1,
            }),
        )
        .await;
        let feed = match rx.recv().await.unwrap() {
            ServerEvent::ChatMessages(response) => response,
            other => panic!("expected chatMessagesResponse, got {other:?}"),
        };
        assert!(feed.success);
        assert_eq!(feed.data.len(), 1);
        assert_eq!(feed.data[0].content, "salut");
        assert_eq!(feed.pagination.total_items, 1);
    }
}
