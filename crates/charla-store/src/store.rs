//! The conversation repository.
//!
//! Every public operation is a single transaction: an append and its parent
//! session refresh either both land or neither does.

use std::sync::Arc;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use charla_core::error::CharlaError;
use charla_core::types::{Message, Sender, Session};

use crate::db::Database;

/// Repository for chat sessions and their messages.
pub struct ConversationStore {
    db: Arc<Database>,
}

impl ConversationStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Create a session and its bot-authored welcome message atomically.
    pub fn create_session(
        &self,
        user_id: &str,
        title: &str,
        welcome_message: &str,
    ) -> Result<Session, CharlaError> {
        self.db.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| CharlaError::Storage(format!("Failed to begin transaction: {}", e)))?;

            let now = Utc::now().timestamp();
            tx.execute(
                "INSERT INTO chat_sessions (user_id, title, created_at, updated_at, is_active)
                 VALUES (?1, ?2, ?3, ?3, 1)",
                rusqlite::params![user_id, title, now],
            )
            .map_err(|e| CharlaError::Storage(format!("Failed to create session: {}", e)))?;
            let session_id = tx.last_insert_rowid();

            let welcome = insert_message(&tx, session_id, welcome_message, Sender::Bot, now)?;

            tx.commit()
                .map_err(|e| CharlaError::Storage(format!("Failed to commit session: {}", e)))?;

            debug!(session_id, user_id, "Session created");

            Ok(Session {
                id: session_id,
                user_id: user_id.to_string(),
                title: title.to_string(),
                created_at: now,
                updated_at: now,
                is_active: true,
                messages: vec![welcome],
            })
        })
    }

    /// Append a message and refresh the parent session's `updated_at`.
    ///
    /// Fails with `SessionNotFound` if the session does not exist.
    pub fn add_message(
        &self,
        session_id: i64,
        content: &str,
        sender: Sender,
    ) -> Result<Message, CharlaError> {
        self.db.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| CharlaError::Storage(format!("Failed to begin transaction: {}", e)))?;

            let exists: Option<i64> = tx
                .query_row(
                    "SELECT 1 FROM chat_sessions WHERE id = ?1",
                    rusqlite::params![session_id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| CharlaError::Storage(e.to_string()))?;
            if exists.is_none() {
                return Err(CharlaError::SessionNotFound(session_id));
            }

            let now = Utc::now().timestamp();
            let message = insert_message(&tx, session_id, content, sender, now)?;
            tx.execute(
                "UPDATE chat_sessions SET updated_at = ?1 WHERE id = ?2",
                rusqlite::params![now, session_id],
            )
            .map_err(|e| CharlaError::Storage(format!("Failed to refresh session: {}", e)))?;

            tx.commit()
                .map_err(|e| CharlaError::Storage(format!("Failed to commit message: {}", e)))?;

            Ok(message)
        })
    }

    /// Messages of a session in display order: timestamp ascending, insertion
    /// order as tiebreak.
    pub fn get_messages(&self, session_id: i64) -> Result<Vec<Message>, CharlaError> {
        self.db.with_conn(|conn| query_messages(conn, session_id))
    }

    /// Active sessions of a user, newest-updated first.
    pub fn get_user_sessions(&self, user_id: &str) -> Result<Vec<Session>, CharlaError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, user_id, title, created_at, updated_at, is_active
                     FROM chat_sessions
                     WHERE user_id = ?1 AND is_active = 1
                     ORDER BY updated_at DESC, id DESC",
                )
                .map_err(|e| CharlaError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![user_id], row_to_session)
                .map_err(|e| CharlaError::Storage(e.to_string()))?;

            let mut sessions = Vec::new();
            for row in rows {
                sessions.push(row.map_err(|e| CharlaError::Storage(e.to_string()))?);
            }
            Ok(sessions)
        })
    }

    /// A session with its messages, or `None` if the id is unknown.
    pub fn get_session(&self, session_id: i64) -> Result<Option<Session>, CharlaError> {
        self.db.with_conn(|conn| {
            let session = conn
                .query_row(
                    "SELECT id, user_id, title, created_at, updated_at, is_active
                     FROM chat_sessions WHERE id = ?1",
                    rusqlite::params![session_id],
                    row_to_session,
                )
                .optional()
                .map_err(|e| CharlaError::Storage(e.to_string()))?;

            match session {
                Some(mut session) => {
                    session.messages = query_messages(conn, session_id)?;
                    Ok(Some(session))
                }
                None => Ok(None),
            }
        })
    }

    /// Soft-delete a session. Idempotent: a second call, or an unknown id,
    /// is a no-op.
    pub fn delete_session(&self, session_id: i64) -> Result<(), CharlaError> {
        self.db.with_conn(|conn| {
            let changed = conn
                .execute(
                    "UPDATE chat_sessions SET is_active = 0 WHERE id = ?1 AND is_active = 1",
                    rusqlite::params![session_id],
                )
                .map_err(|e| CharlaError::Storage(format!("Failed to delete session: {}", e)))?;
            if changed > 0 {
                debug!(session_id, "Session soft-deleted");
            }
            Ok(())
        })
    }

    /// Id of the user's most recently updated active session, or 0 when the
    /// user has none.
    pub fn get_last_session_id(&self, user_id: &str) -> Result<i64, CharlaError> {
        self.db.with_conn(|conn| {
            let id: Option<i64> = conn
                .query_row(
                    "SELECT id FROM chat_sessions
                     WHERE user_id = ?1 AND is_active = 1
                     ORDER BY updated_at DESC, id DESC
                     LIMIT 1",
                    rusqlite::params![user_id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| CharlaError::Storage(e.to_string()))?;
            Ok(id.unwrap_or(0))
        })
    }

    /// Flag every message of a session as read.
    pub fn mark_messages_read(&self, session_id: i64) -> Result<(), CharlaError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE chat_messages SET is_read = 1 WHERE session_id = ?1 AND is_read = 0",
                rusqlite::params![session_id],
            )
            .map_err(|e| CharlaError::Storage(format!("Failed to mark messages read: {}", e)))?;
            Ok(())
        })
    }
}

fn insert_message(
    conn: &Connection,
    session_id: i64,
    content: &str,
    sender: Sender,
    timestamp: i64,
) -> Result<Message, CharlaError> {
    conn.execute(
        "INSERT INTO chat_messages (session_id, content, sender, timestamp, message_type, is_read)
         VALUES (?1, ?2, ?3, ?4, 'text', 0)",
        rusqlite::params![session_id, content, sender.as_str(), timestamp],
    )
    .map_err(|e| CharlaError::Storage(format!("Failed to insert message: {}", e)))?;

    Ok(Message {
        id: conn.last_insert_rowid(),
        session_id,
        content: content.to_string(),
        sender,
        timestamp,
        message_type: "text".to_string(),
        is_read: false,
    })
}

fn query_messages(conn: &Connection, session_id: i64) -> Result<Vec<Message>, CharlaError> {
    let mut stmt = conn
        .prepare(
            "SELECT id, session_id, content, sender, timestamp, message_type, is_read
             FROM chat_messages
             WHERE session_id = ?1
             ORDER BY timestamp ASC, id ASC",
        )
        .map_err(|e| CharlaError::Storage(e.to_string()))?;

    let rows = stmt
        .query_map(rusqlite::params![session_id], row_to_message)
        .map_err(|e| CharlaError::Storage(e.to_string()))?;

    let mut messages = Vec::new();
    for row in rows {
        messages.push(row.map_err(|e| CharlaError::Storage(e.to_string()))?);
    }
    Ok(messages)
}

fn row_to_session(row: &rusqlite::Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
        is_active: row.get::<_, i64>(5)? != 0,
        messages: Vec::new(),
    })
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let sender: String = row.get(3)?;
    let sender = Sender::parse(&sender).unwrap_or(Sender::Bot);
    Ok(Message {
        id: row.get(0)?,
        session_id: row.get(1)?,
        content: row.get(2)?,
        sender,
        timestamp: row.get(4)?,
        message_type: row.get(5)?,
        is_read: row.get::<_, i64>(6)? != 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> ConversationStore {
        ConversationStore::new(Arc::new(Database::in_memory().unwrap()))
    }

    fn set_updated_at(store: &ConversationStore, session_id: i64, updated_at: i64) {
        store
            .db
            .with_conn(|conn| {
                conn.execute(
                    "UPDATE chat_sessions SET updated_at = ?1 WHERE id = ?2",
                    rusqlite::params![updated_at, session_id],
                )
                .map_err(|e| CharlaError::Storage(e.to_string()))?;
                Ok(())
            })
            .unwrap();
    }

    const WELCOME: &str = "¡Hola! Soy tu asistente virtual. ¿En qué puedo ayudarte hoy?";

    #[test]
    fn test_create_session_has_exactly_one_welcome_message() {
        let store = test_store();
        let session = store
            .create_session("user-1", "Nueva Conversación", WELCOME)
            .unwrap();

        assert!(session.id > 1); // id 1 is the seed session
        assert_eq!(session.user_id, "user-1");
        assert!(session.is_active);
        assert_eq!(session.updated_at, session.created_at);
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.messages[0].sender, Sender::Bot);
        assert_eq!(session.messages[0].content, WELCOME);

        // The welcome message is persisted, not just returned.
        let messages = store.get_messages(session.id).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, WELCOME);
    }

    #[test]
    fn test_add_message_refreshes_updated_at() {
        let store = test_store();
        let session = store.create_session("user-1", "t", WELCOME).unwrap();

        // Push updated_at into the past so the refresh is observable.
        set_updated_at(&store, session.id, 1_000);

        let message = store
            .add_message(session.id, "qué es ia", Sender::User)
            .unwrap();
        let reloaded = store.get_session(session.id).unwrap().unwrap();

        assert!(reloaded.updated_at >= message.timestamp);
        assert!(reloaded.updated_at >= reloaded.created_at);
    }

    #[test]
    fn test_add_message_unknown_session() {
        let store = test_store();
        let err = store.add_message(999, "hola", Sender::User).unwrap_err();
        assert!(matches!(err, CharlaError::SessionNotFound(999)));
    }

    #[test]
    fn test_get_messages_ordering_is_stable_under_ties() {
        let store = test_store();
        let session = store.create_session("user-1", "t", WELCOME).unwrap();

        // Same-second inserts: ordering must fall back to insertion order.
        for i in 0..5 {
            store
                .add_message(session.id, &format!("mensaje {}", i), Sender::User)
                .unwrap();
        }

        let messages = store.get_messages(session.id).unwrap();
        assert_eq!(messages.len(), 6); // welcome + 5
        assert_eq!(messages[0].content, WELCOME);
        for i in 0..5 {
            assert_eq!(messages[i + 1].content, format!("mensaje {}", i));
        }
        // Ids strictly increase along the display order.
        assert!(messages.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn test_get_user_sessions_filters_and_orders() {
        let store = test_store();
        let s1 = store.create_session("user-1", "primera", WELCOME).unwrap();
        let s2 = store.create_session("user-1", "segunda", WELCOME).unwrap();
        let s3 = store.create_session("user-1", "tercera", WELCOME).unwrap();
        store.create_session("user-2", "ajena", WELCOME).unwrap();

        set_updated_at(&store, s1.id, 3_000);
        set_updated_at(&store, s2.id, 1_000);
        set_updated_at(&store, s3.id, 2_000);
        store.delete_session(s2.id).unwrap();

        let sessions = store.get_user_sessions("user-1").unwrap();
        let ids: Vec<i64> = sessions.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![s1.id, s3.id]);
        assert!(sessions.iter().all(|s| s.is_active));
        assert!(sessions.iter().all(|s| s.user_id == "user-1"));
    }

    #[test]
    fn test_get_session_includes_messages() {
        let store = test_store();
        let session = store.create_session("user-1", "t", WELCOME).unwrap();
        store.add_message(session.id, "hola", Sender::User).unwrap();

        let loaded = store.get_session(session.id).unwrap().unwrap();
        assert_eq!(loaded.id, session.id);
        assert_eq!(loaded.messages.len(), 2);
        assert_eq!(loaded.messages[1].content, "hola");

        assert!(store.get_session(999).unwrap().is_none());
    }

    #[test]
    fn test_delete_session_is_idempotent_and_permanent() {
        let store = test_store();
        let session = store.create_session("user-1", "t", WELCOME).unwrap();

        store.delete_session(session.id).unwrap();
        // Second delete and unknown id are no-ops.
        store.delete_session(session.id).unwrap();
        store.delete_session(999).unwrap();

        assert!(store.get_user_sessions("user-1").is_ok());
        assert!(store
            .get_user_sessions("user-1")
            .unwrap()
            .iter()
            .all(|s| s.id != session.id));

        // Messages are retained, not physically deleted.
        assert_eq!(store.get_messages(session.id).unwrap().len(), 1);
        let loaded = store.get_session(session.id).unwrap().unwrap();
        assert!(!loaded.is_active);
    }

    #[test]
    fn test_get_last_session_id() {
        let store = test_store();
        assert_eq!(store.get_last_session_id("nobody").unwrap(), 0);

        let s1 = store.create_session("user-1", "a", WELCOME).unwrap();
        let s2 = store.create_session("user-1", "b", WELCOME).unwrap();
        set_updated_at(&store, s1.id, 5_000);
        set_updated_at(&store, s2.id, 4_000);

        assert_eq!(store.get_last_session_id("user-1").unwrap(), s1.id);

        store.delete_session(s1.id).unwrap();
        assert_eq!(store.get_last_session_id("user-1").unwrap(), s2.id);

        store.delete_session(s2.id).unwrap();
        assert_eq!(store.get_last_session_id("user-1").unwrap(), 0);
    }

    #[test]
    fn test_add_message_to_inactive_session_still_works() {
        // Soft-deleted sessions still exist; only missing rows are an error.
        let store = test_store();
        let session = store.create_session("user-1", "t", WELCOME).unwrap();
        store.delete_session(session.id).unwrap();
        assert!(store.add_message(session.id, "hola", Sender::User).is_ok());
    }

    #[test]
    fn test_mark_messages_read() {
        let store = test_store();
        let session = store.create_session("user-1", "t", WELCOME).unwrap();
        store.add_message(session.id, "hola", Sender::User).unwrap();

        assert!(store
            .get_messages(session.id)
            .unwrap()
            .iter()
            .all(|m| !m.is_read));

        store.mark_messages_read(session.id).unwrap();
        assert!(store
            .get_messages(session.id)
            .unwrap()
            .iter()
            .all(|m| m.is_read));

        // Idempotent.
        store.mark_messages_read(session.id).unwrap();
    }

    #[test]
    fn test_seed_demo_session_visible_through_store() {
        let store = test_store();
        assert_eq!(store.get_last_session_id("demo").unwrap(), 1);
        let demo = store.get_session(1).unwrap().unwrap();
        assert_eq!(demo.user_id, "demo");
        assert_eq!(demo.messages.len(), 1);
        assert_eq!(demo.messages[0].sender, Sender::Bot);
    }
}
