//! Database schema migrations.
//!
//! Applies the initial schema: chat_sessions, chat_messages, the
//! schema_migrations tracking table, and the demo seed conversation.

use rusqlite::Connection;
use tracing::info;

use charla_core::error::CharlaError;

/// Epoch seconds for 2025-01-01 12:00:00 UTC, used by the seed rows.
const SEED_TIMESTAMP: i64 = 1_735_732_800;

/// Run all pending database migrations.
///
/// Currently implements the initial schema (version 1). Future migrations
/// can be added by checking the current version and applying incremental
/// changes.
pub fn run_migrations(conn: &Connection) -> Result<(), CharlaError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| CharlaError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| CharlaError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: initial_schema");
    }

    Ok(())
}

/// Version 1: Initial schema plus the demo conversation seed.
fn apply_v1(conn: &Connection) -> Result<(), CharlaError> {
    conn.execute_batch(&format!(
        "
        CREATE TABLE IF NOT EXISTS chat_sessions (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     TEXT NOT NULL,
            title       TEXT NOT NULL,
            created_at  INTEGER NOT NULL,
            updated_at  INTEGER NOT NULL,
            is_active   INTEGER NOT NULL DEFAULT 1
        );

        CREATE INDEX IF NOT EXISTS idx_chat_sessions_user_id
            ON chat_sessions (user_id);

        CREATE TABLE IF NOT EXISTS chat_messages (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            session_id    INTEGER NOT NULL,
            content       TEXT NOT NULL,
            sender        TEXT NOT NULL
                          CHECK (sender IN ('user', 'bot')),
            timestamp     INTEGER NOT NULL,
            message_type  TEXT NOT NULL DEFAULT 'text',
            is_read       INTEGER NOT NULL DEFAULT 0,
            FOREIGN KEY (session_id) REFERENCES chat_sessions(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_chat_messages_timestamp
            ON chat_messages (timestamp);

        CREATE INDEX IF NOT EXISTS idx_chat_messages_session
            ON chat_messages (session_id, timestamp);

        -- Demo conversation so a fresh install has something to show.
        INSERT OR IGNORE INTO chat_sessions (id, user_id, title, created_at, updated_at)
            VALUES (1, 'demo', 'Conversación de Demo', {ts}, {ts});

        INSERT OR IGNORE INTO chat_messages (id, session_id, content, sender, timestamp)
            VALUES (1, 1, '¡Hola! Soy tu asistente virtual. ¿En qué puedo ayudarte hoy?', 'bot', {ts});

        INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (1, 'initial_schema');
        ",
        ts = SEED_TIMESTAMP,
    ))
    .map_err(|e| CharlaError::Storage(format!("Failed to apply migration v1: {}", e)))?;

    Ok(())
}
