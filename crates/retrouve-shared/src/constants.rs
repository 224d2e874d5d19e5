/// Application name
pub const APP_NAME: &str = "Retrouvé";

/// Number of chat summaries per inbox page
pub const CHAT_PAGE_SIZE: usize = 7;

/// Number of messages per feed page
pub const MESSAGE_PAGE_SIZE: usize = 20;

/// Maximum attachment size in bytes (10 MiB)
pub const MAX_ATTACHMENT_SIZE: usize = 10 * 1024 * 1024;

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Preview text shown for yesterday's messages
pub const YESTERDAY_LABEL: &str = "Yesterday";
