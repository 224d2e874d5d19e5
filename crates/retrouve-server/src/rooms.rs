//! Room registry for the realtime gateway.
//!
//! One room per chat id. A room maps connection ids to their outbox
//! channels, so a broadcast is one `send` per connected session. Closed
//! outboxes are pruned lazily on broadcast and eagerly on disconnect.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use retrouve_shared::protocol::ServerEvent;
use retrouve_shared::types::ChatId;

/// Per-connection event pipe, drained by the connection's writer task.
pub type Outbox = mpsc::UnboundedSender<ServerEvent>;

#[derive(Clone, Default)]
pub struct Rooms {
    inner: Arc<RwLock<HashMap<ChatId, HashMap<Uuid, Outbox>>>>,
}

impl Rooms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a chat's room. Re-joining replaces the previous
    /// outbox for that connection.
    pub async fn join(&self, chat_id: ChatId, conn_id: Uuid, outbox: Outbox) {
        let mut rooms = self.inner.write().await;
        rooms.entry(chat_id).or_default().insert(conn_id, outbox);
        tracing::debug!(room = %chat_id.to_room(), conn = %conn_id, "joined room");
    }

    /// Remove a connection from every room it joined (disconnect path).
    pub async fn leave_all(&self, conn_id: Uuid) {
        let mut rooms = self.inner.write().await;
        rooms.retain(|_, members| {
            members.remove(&conn_id);
            !members.is_empty()
        });
    }

    /// Send an event to every session in a chat's room.  Returns the number
    /// of sessions that received it.
    pub async fn broadcast(&self, chat_id: ChatId, event: &ServerEvent) -> usize {
        let mut rooms = self.inner.write().await;
        let Some(members) = rooms.get_mut(&chat_id) else {
            return 0;
        };

        members.retain(|_, outbox| outbox.send(event.clone()).is_ok());
        let delivered = members.len();
        if members.is_empty() {
            rooms.remove(&chat_id);
        }
        delivered
    }

    /// Number of sessions currently in a chat's room.
    pub async fn member_count(&self, chat_id: ChatId) -> usize {
        self.inner
            .read()
            .await
            .get(&chat_id)
            .map(|members| members.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_reaches_every_member() {
        let rooms = Rooms::new();
        let chat_id = ChatId::new();

        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        rooms.join(chat_id, Uuid::new_v4(), tx1).await;
        rooms.join(chat_id, Uuid::new_v4(), tx2).await;

        let delivered = rooms.broadcast(chat_id, &ServerEvent::error("ping")).await;
        assert_eq!(delivered, 2);
        assert!(rx1.recv().await.is_some());
        assert!(rx2.recv().await.is_some());
    }

    #[tokio::test]
    async fn broadcast_to_empty_room_is_zero() {
        let rooms = Rooms::new();
        assert_eq!(
            rooms.broadcast(ChatId::new(), &ServerEvent::error("ping")).await,
            0
        );
    }

    #[tokio::test]
    async fn closed_outboxes_are_pruned() {
        let rooms = Rooms::new();
        let chat_id = ChatId::new();

        let (tx, rx) = mpsc::unbounded_channel();
        rooms.join(chat_id, Uuid::new_v4(), tx).await;
        drop(rx);

        assert_eq!(rooms.broadcast(chat_id, &ServerEvent::error("ping")).await, 0);
        assert_eq!(rooms.member_count(chat_id).await, 0);
    }

    #[tokio::test]
    async fn leave_all_removes_connection_from_every_room() {
        let rooms = Rooms::new();
        let conn_id = Uuid::new_v4();
        let chat_a = ChatId::new();
        let chat_b = ChatId::new();

        let (tx, _rx) = mpsc::unbounded_channel();
        rooms.join(chat_a, conn_id, tx.clone()).await;
        rooms.join(chat_b, conn_id, tx).await;

        rooms.leave_all(conn_id).await;
        assert_eq!(rooms.member_count(chat_a).await, 0);
        assert_eq!(rooms.member_count(chat_b).await, 0);
    }
}
