//! Charla application binary - composition root.
//!
//! Ties the crates together into a console chatbot:
//! 1. Load configuration from TOML (credential may come from the environment)
//! 2. Open the SQLite store and run migrations
//! 3. Load the FAQ knowledge base
//! 4. Wire the HTTP transport and the chat orchestrator
//! 5. Resume (or create) the user's conversation and run the chat loop

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use charla_chat::{ChatOrchestrator, HttpTransport, KnowledgeBase};
use charla_core::config::CharlaConfig;
use charla_core::types::{ConversationTurn, Sender, Session};
use charla_store::{ConversationStore, Database};

/// Resolve the config file path (CHARLA_CONFIG env, or ~/.charla/config.toml).
fn config_path() -> PathBuf {
    if let Ok(p) = std::env::var("CHARLA_CONFIG") {
        return PathBuf::from(p);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".charla").join("config.toml");
    }
    PathBuf::from("config.toml")
}

/// Expand ~ to the home directory in a path string.
fn resolve_data_dir(data_dir: &str) -> PathBuf {
    if let Some(rest) = data_dir.strip_prefix("~/") {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(rest)
    } else {
        PathBuf::from(data_dir)
    }
}

/// Resume the user's most recent active session, or start a fresh one.
fn resolve_session(
    store: &ConversationStore,
    config: &CharlaConfig,
    user_id: &str,
) -> Result<Session, charla_core::CharlaError> {
    let last_id = store.get_last_session_id(user_id)?;
    if last_id != 0 {
        if let Some(session) = store.get_session(last_id)? {
            return Ok(session);
        }
    }
    store.create_session(
        user_id,
        &config.chat.default_title,
        &config.chat.welcome_message,
    )
}

fn print_message(sender: Sender, content: &str) {
    let label = match sender {
        Sender::User => "tú",
        Sender::Bot => "bot",
    };
    println!("[{}] {}", label, content);
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Config first: the log level lives there.
    let config_file = config_path();
    let mut config = CharlaConfig::load_or_default(&config_file);
    if config.provider.api_key.is_empty() {
        if let Ok(key) = std::env::var("CHARLA_API_KEY") {
            config.provider.api_key = key;
        }
    }

    // Tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.general.log_level)),
        )
        .init();

    tracing::info!("Starting Charla v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration loaded");

    // Missing credential is fatal at startup, not at first chat turn.
    config.validate()?;

    // Storage.
    let data_dir = resolve_data_dir(&config.general.data_dir);
    let db_path = data_dir.join("charla.db");
    let db = Arc::new(Database::new(&db_path)?);
    tracing::info!(path = %db_path.display(), "SQLite database opened");
    let store = ConversationStore::new(db);

    // Knowledge base: missing document degrades to empty, malformed aborts.
    let kb_path = PathBuf::from(&config.chat.knowledge_base_path);
    let knowledge = KnowledgeBase::load(&kb_path, &config.chat)?;

    // Orchestrator over the real HTTP transport.
    let transport = Arc::new(HttpTransport::new(&config.provider)?);
    let orchestrator = ChatOrchestrator::new(
        knowledge,
        transport,
        &config.provider,
        config.chat.clone(),
    );

    // Resume the caller-supplied user's conversation.
    let user_id = std::env::var("CHARLA_USER").unwrap_or_else(|_| "demo".to_string());
    let mut session = resolve_session(&store, &config, &user_id)?;
    tracing::info!(session_id = session.id, user_id = %user_id, "Session ready");

    println!("— {} —", session.title);
    for message in &session.messages {
        print_message(message.sender, &message.content);
    }
    store.mark_messages_read(session.id)?;

    println!("(/nueva empieza otra conversación, /salir termina)");

    // Chat loop: one sequential unit of work per turn.
    let stdin = std::io::stdin();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            break; // EOF
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            "/salir" => break,
            "/nueva" => {
                session = store.create_session(
                    &user_id,
                    &config.chat.default_title,
                    &config.chat.welcome_message,
                )?;
                println!("— {} —", session.title);
                for message in &session.messages {
                    print_message(message.sender, &message.content);
                }
                continue;
            }
            _ => {}
        }

        // History window comes from the store, before this turn is appended.
        let history: Vec<ConversationTurn> = store
            .get_messages(session.id)?
            .iter()
            .map(ConversationTurn::from_message)
            .collect();

        store.add_message(session.id, input, Sender::User)?;
        let reply = orchestrator.answer(input, &history).await;
        store.add_message(session.id, &reply, Sender::Bot)?;
        store.mark_messages_read(session.id)?;

        print_message(Sender::Bot, &reply);
    }

    Ok(())
}
