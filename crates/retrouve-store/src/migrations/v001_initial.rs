//! v001 -- Initial schema creation.
//!
//! Creates the five core tables: `chats`, `chat_participants`, `messages`,
//! `directory`, and `profiles`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Chats
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS chats (
    id                   TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    name                 TEXT,                       -- group display name
    avatar_url           TEXT,                       -- group avatar
    last_message_content TEXT,                       -- denormalised preview
    last_message_at      TEXT,                       -- ISO-8601 / RFC-3339
    created_at           TEXT NOT NULL,
    updated_at           TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- Chat participants (ordered, immutable after creation)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS chat_participants (
    chat_id  TEXT NOT NULL,                          -- FK -> chats(id)
    user_id  TEXT NOT NULL,                          -- external user id
    position INTEGER NOT NULL,

    PRIMARY KEY (chat_id, user_id),
    FOREIGN KEY (chat_id) REFERENCES chats(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_participants_user ON chat_participants(user_id);

-- ----------------------------------------------------------------
-- Messages (ordered log, one row per message)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id              TEXT PRIMARY KEY NOT NULL,       -- UUID v4
    chat_id         TEXT NOT NULL,                   -- FK -> chats(id)
    sender_id       TEXT NOT NULL,                   -- external user id
    content         TEXT NOT NULL DEFAULT '',
    attachment_url  TEXT,
    attachment_type TEXT,
    status          TEXT NOT NULL,                   -- delivery lifecycle
    is_edited       INTEGER NOT NULL DEFAULT 0,      -- boolean 0/1
    timestamp       TEXT NOT NULL,                   -- ISO-8601

    FOREIGN KEY (chat_id) REFERENCES chats(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_messages_chat_ts
    ON messages(chat_id, timestamp DESC);

-- ----------------------------------------------------------------
-- Directory (per-user chat view: pinned/muted)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS directory (
    user_id    TEXT NOT NULL,
    chat_id    TEXT NOT NULL,                        -- FK -> chats(id)
    is_pinned  INTEGER NOT NULL DEFAULT 0,           -- boolean 0/1
    is_muted   INTEGER NOT NULL DEFAULT 0,           -- boolean 0/1
    created_at TEXT NOT NULL,

    PRIMARY KEY (user_id, chat_id),
    FOREIGN KEY (chat_id) REFERENCES chats(id) ON DELETE CASCADE
);

-- ----------------------------------------------------------------
-- Profiles (cache of the external user service)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS profiles (
    user_id     TEXT PRIMARY KEY NOT NULL,
    full_name   TEXT NOT NULL,
    picture_url TEXT,
    updated_at  TEXT NOT NULL
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
