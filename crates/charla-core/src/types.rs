use serde::{Deserialize, Serialize};

// =============================================================================
// Enums
// =============================================================================

/// Who authored a persisted chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Bot,
}

impl Sender {
    /// Storage representation, also used by the `sender` CHECK constraint.
    pub fn as_str(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Bot => "bot",
        }
    }

    /// Parse the storage representation back into a `Sender`.
    pub fn parse(s: &str) -> Option<Sender> {
        match s {
            "user" => Some(Sender::User),
            "bot" => Some(Sender::Bot),
            _ => None,
        }
    }
}

/// Role tag on a conversation turn as the completion API expects it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl From<Sender> for Role {
    fn from(sender: Sender) -> Self {
        match sender {
            Sender::User => Role::User,
            Sender::Bot => Role::Assistant,
        }
    }
}

// =============================================================================
// Entities
// =============================================================================

/// A conversation owned by a user.
///
/// Sessions are soft-deleted by flipping `is_active`; their messages are
/// retained. `updated_at` is refreshed on every message append, so
/// `updated_at >= created_at` always holds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    /// Epoch seconds (UTC).
    pub created_at: i64,
    /// Epoch seconds (UTC).
    pub updated_at: i64,
    pub is_active: bool,
    /// Messages in display order. Populated by `get_session`; empty for
    /// listing queries.
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// A single chat message. Immutable once written except for `is_read`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub session_id: i64,
    pub content: String,
    pub sender: Sender,
    /// Epoch seconds (UTC).
    pub timestamp: i64,
    /// Content-type hint: "text", "image", or "file". Not validated.
    pub message_type: String,
    pub is_read: bool,
}

/// One question/answer record from the FAQ document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
}

/// An ephemeral role-tagged turn used only for prompt construction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Build a turn from a persisted message.
    pub fn from_message(message: &Message) -> Self {
        Self {
            role: message.sender.into(),
            content: message.content.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_round_trip() {
        assert_eq!(Sender::parse("user"), Some(Sender::User));
        assert_eq!(Sender::parse("bot"), Some(Sender::Bot));
        assert_eq!(Sender::parse("assistant"), None);
        assert_eq!(Sender::User.as_str(), "user");
        assert_eq!(Sender::Bot.as_str(), "bot");
    }

    #[test]
    fn test_role_from_sender() {
        assert_eq!(Role::from(Sender::User), Role::User);
        assert_eq!(Role::from(Sender::Bot), Role::Assistant);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::System).unwrap(), "\"system\"");
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );
    }

    #[test]
    fn test_turn_from_message() {
        let msg = Message {
            id: 1,
            session_id: 1,
            content: "hola".to_string(),
            sender: Sender::Bot,
            timestamp: 1_700_000_000,
            message_type: "text".to_string(),
            is_read: false,
        };
        let turn = ConversationTurn::from_message(&msg);
        assert_eq!(turn.role, Role::Assistant);
        assert_eq!(turn.content, "hola");
    }

    #[test]
    fn test_faq_entry_deserializes_from_document_shape() {
        let json = r#"{"question": "qué es ia", "answer": "Inteligencia artificial."}"#;
        let entry: FaqEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.question, "qué es ia");
        assert_eq!(entry.answer, "Inteligencia artificial.");
    }
}
