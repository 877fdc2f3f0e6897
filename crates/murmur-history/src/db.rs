use rusqlite::{Connection, Result};

/// Initialise the chat history table. Safe to call on every startup
/// (idempotent).
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS chat_message (
            id              INTEGER PRIMARY KEY,
            room_id         INTEGER NOT NULL,
            from_user_id    INTEGER NOT NULL,
            from_user_name  TEXT NOT NULL,
            content         TEXT NOT NULL,
            op              INTEGER NOT NULL,
            created_at      TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_chat_room_time
            ON chat_message(room_id, created_at DESC);",
    )
}
