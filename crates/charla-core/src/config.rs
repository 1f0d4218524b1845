use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{CharlaError, Result};

/// Top-level configuration for the Charla application.
///
/// Loaded from `~/.charla/config.toml` by default. Each section covers one
/// concern; all user-visible canned strings and the greeting/topic
/// vocabularies live here so the chat core stays localizable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CharlaConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl CharlaConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CharlaConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| CharlaError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Validate startup requirements.
    ///
    /// The provider credential is the only hard requirement: without it the
    /// grounded-response path cannot work at all, so startup must fail.
    pub fn validate(&self) -> Result<()> {
        if self.provider.api_key.trim().is_empty() {
            return Err(CharlaError::Config(
                "provider.api_key is required (or set CHARLA_API_KEY)".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.provider.temperature) {
            return Err(CharlaError::Config(format!(
                "provider.temperature must be in [0.0, 1.0], got {}",
                self.provider.temperature
            )));
        }
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory for the SQLite database.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.charla/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Completion provider settings.
///
/// `api_key` is never logged anywhere in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Bearer credential for the completion API. Required at startup.
    pub api_key: String,
    /// Chat-completions endpoint URL.
    pub api_url: String,
    /// Model name sent in every request.
    pub model: String,
    /// Completion length cap.
    pub max_tokens: u32,
    /// Sampling temperature in [0.0, 1.0].
    pub temperature: f64,
    /// Request timeout in seconds. The provider call is the only network
    /// boundary and performs no retries, so it must be bounded.
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: "https://api.mistral.ai/v1/chat/completions".to_string(),
            model: "mistral-small-latest".to_string(),
            max_tokens: 500,
            temperature: 0.7,
            timeout_secs: 30,
        }
    }
}

/// Chat behavior settings: history window, topical gate, vocabularies, and
/// every canned user-visible string (all Spanish by default).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Path to the FAQ document (JSON array of question/answer records).
    pub knowledge_base_path: String,
    /// Maximum prior turns included in the prompt.
    pub history_limit: usize,
    /// When true, off-topic questions get `refusal_reply` without a
    /// provider call.
    pub topic_gate: bool,
    /// Title given to new sessions.
    pub default_title: String,
    /// Bot message appended to every freshly created session.
    pub welcome_message: String,
    /// Reply to greeting inputs.
    pub greeting_reply: String,
    /// Reply to off-topic inputs when the gate is enabled.
    pub refusal_reply: String,
    /// Greeting vocabulary (matched against the normalized input prefix).
    pub greetings: Vec<String>,
    /// Topic keyword vocabulary (substring match on normalized input).
    pub topic_keywords: Vec<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            knowledge_base_path: "faq.json".to_string(),
            history_limit: 6,
            topic_gate: true,
            default_title: "Nueva Conversación".to_string(),
            welcome_message: "¡Hola! Soy tu asistente virtual. ¿En qué puedo ayudarte hoy?"
                .to_string(),
            greeting_reply: "¡Hola! ¿En qué puedo ayudarte sobre inteligencia artificial?"
                .to_string(),
            refusal_reply:
                "Lo siento, solo puedo responder preguntas sobre inteligencia artificial."
                    .to_string(),
            greetings: vec![
                "hola".to_string(),
                "buenos dias".to_string(),
                "buenas tardes".to_string(),
                "buenas noches".to_string(),
                "saludos".to_string(),
                "hello".to_string(),
                "hi".to_string(),
            ],
            topic_keywords: vec![
                "inteligencia artificial".to_string(),
                "ia".to_string(),
                "machine learning".to_string(),
                "aprendizaje automatico".to_string(),
                "deep learning".to_string(),
                "red neuronal".to_string(),
                "modelo de lenguaje".to_string(),
                "chatbot".to_string(),
            ],
        }
    }
}
