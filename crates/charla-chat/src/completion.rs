//! Client for the chat-completions provider.
//!
//! The transport is injected behind a trait so the orchestrator tests can
//! observe (and count) calls without a network. The production transport
//! wraps reqwest with the bearer credential and a request timeout.
//!
//! Faults never leave this module: every failure kind is recovered into a
//! fixed Spanish fallback string. No retries are performed; this client is
//! the single place a retry/backoff policy would go.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::warn;

use charla_core::config::ProviderConfig;
use charla_core::error::CharlaError;
use charla_core::types::{ConversationTurn, Role};

use crate::error::CompletionError;

/// Soft failure: the provider answered but without usable content.
pub const FALLBACK_NO_CONTENT: &str = "Lo siento, no pude procesar tu mensaje.";
/// The provider answered with a non-success status.
pub const FALLBACK_CONNECTIVITY: &str =
    "Lo siento, hubo un error al conectar con el servicio de IA.";
/// The request never completed or the body was unreadable.
pub const FALLBACK_UNEXPECTED: &str = "Lo siento, ocurrió un error inesperado.";

// =============================================================================
// Wire types
// =============================================================================

/// Request body for `POST <api_url>`.
#[derive(Clone, Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ConversationTurn>,
    pub max_tokens: u32,
    pub temperature: f64,
    pub stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// A raw provider reply: status code plus unparsed body.
#[derive(Clone, Debug)]
pub struct TransportReply {
    pub status: u16,
    pub body: String,
}

// =============================================================================
// Transport
// =============================================================================

/// The network seam. One request in, one raw reply or transport fault out.
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    async fn send(&self, request: &ChatCompletionRequest)
        -> Result<TransportReply, CompletionError>;
}

/// Production transport: reqwest with the bearer credential attached to
/// every call and a bounded request timeout.
pub struct HttpTransport {
    client: reqwest::Client,
    api_url: String,
}

impl HttpTransport {
    /// Build the transport from provider configuration.
    ///
    /// The credential goes into default headers once and is never logged.
    pub fn new(config: &ProviderConfig) -> Result<Self, CharlaError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| CharlaError::Config("api_key contains invalid characters".to_string()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CharlaError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
        })
    }
}

#[async_trait]
impl CompletionTransport for HttpTransport {
    async fn send(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<TransportReply, CompletionError> {
        let response = self
            .client
            .post(&self.api_url)
            .json(request)
            .send()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| CompletionError::Transport(e.to_string()))?;

        Ok(TransportReply { status, body })
    }
}

// =============================================================================
// Client
// =============================================================================

/// The completion client: builds the request body, sends it over the
/// injected transport, and extracts the first choice's content.
pub struct CompletionClient {
    transport: Arc<dyn CompletionTransport>,
    model: String,
    max_tokens: u32,
    temperature: f64,
}

impl CompletionClient {
    pub fn new(transport: Arc<dyn CompletionTransport>, config: &ProviderConfig) -> Self {
        Self {
            transport,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    /// Ask the provider for a completion. Always returns a display-ready
    /// string: failures are logged for diagnostics and mapped to a fixed
    /// fallback, never surfaced to the caller as faults.
    pub async fn complete(&self, system_prompt: &str, turns: Vec<ConversationTurn>) -> String {
        match self.try_complete(system_prompt, turns).await {
            Ok(content) => content,
            Err(CompletionError::MissingContent) => {
                warn!("Provider response had no completion content");
                FALLBACK_NO_CONTENT.to_string()
            }
            Err(CompletionError::Provider { status, body }) => {
                warn!(status, body = %body, "Provider returned an error response");
                FALLBACK_CONNECTIVITY.to_string()
            }
            Err(e) => {
                warn!(error = %e, "Completion request failed");
                FALLBACK_UNEXPECTED.to_string()
            }
        }
    }

    async fn try_complete(
        &self,
        system_prompt: &str,
        turns: Vec<ConversationTurn>,
    ) -> Result<String, CompletionError> {
        let mut messages = Vec::with_capacity(turns.len() + 1);
        messages.push(ConversationTurn::new(Role::System, system_prompt));
        messages.extend(turns);

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            stream: false,
        };

        let reply = self.transport.send(&request).await?;
        if !(200..300).contains(&reply.status) {
            return Err(CompletionError::Provider {
                status: reply.status,
                body: reply.body,
            });
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&reply.body)
            .map_err(|e| CompletionError::MalformedResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .ok_or(CompletionError::MissingContent)
    }
}
