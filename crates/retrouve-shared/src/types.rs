use serde::{Deserialize, Serialize};
use uuid::Uuid;

// User identity is owned by the external user service; we treat it as an
// opaque string and never parse it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ChatId(pub Uuid);

impl ChatId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }

    /// Room name for the realtime gateway: one room per chat.
    pub fn to_room(&self) -> String {
        format!("chat:{}", self.0)
    }
}

impl Default for ChatId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Delivery lifecycle of a message.
///
/// The forward chain is `InProgress -> Sent -> Delivered -> Read`.
/// `Changed` marks an edited message and is reachable from any non-terminal
/// state. `NotDelivered` is a failure terminal reachable while the message
/// is still in flight. Only `Delivered -> Read` is driven in bulk (by the
/// read-state tracker); the other transitions are per-message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum MessageStatus {
    #[serde(rename = "inProgress")]
    InProgress,
    #[serde(rename = "sent")]
    Sent,
    #[serde(rename = "delivered")]
    Delivered,
    #[serde(rename = "read")]
    Read,
    #[serde(rename = "changed")]
    Changed,
    #[serde(rename = "notDelivered")]
    NotDelivered,
}

impl MessageStatus {
    /// Wire / storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "inProgress",
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Read => "read",
            Self::Changed => "changed",
            Self::NotDelivered => "notDelivered",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "inProgress" => Some(Self::InProgress),
            "sent" => Some(Self::Sent),
            "delivered" => Some(Self::Delivered),
            "read" => Some(Self::Read),
            "changed" => Some(Self::Changed),
            "notDelivered" => Some(Self::NotDelivered),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Read | Self::NotDelivered)
    }

    /// Whether `self -> to` is a legal transition.
    pub fn can_transition(&self, to: MessageStatus) -> bool {
        use MessageStatus::*;
        match (*self, to) {
            (InProgress, Sent) => true,
            (Sent, Delivered) => true,
            (Delivered, Read) => true,
            (InProgress | Sent, NotDelivered) => true,
            // Edits: any non-terminal state may become Changed.
            (from, Changed) if !from.is_terminal() => true,
            // An edited message re-enters the delivery chain.
            (Changed, Delivered | Read) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
