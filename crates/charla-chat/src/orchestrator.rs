//! Chat orchestrator: the decision pipeline behind every turn.
//!
//! Greeting and FAQ matches are answered from the knowledge base without a
//! network call; off-topic questions are refused when the gate is enabled;
//! everything else goes to the completion provider with an FAQ-grounded
//! system prompt and a bounded history window.

use std::sync::Arc;

use tracing::debug;

use charla_core::config::ChatConfig;
use charla_core::types::ConversationTurn;

use crate::completion::{CompletionClient, CompletionTransport};
use crate::knowledge::KnowledgeBase;
use crate::prompt::{build_system_prompt, build_turns};

/// State-free coordinator of knowledge base, prompt builder, and
/// completion client.
pub struct ChatOrchestrator {
    knowledge: KnowledgeBase,
    client: CompletionClient,
    config: ChatConfig,
}

impl ChatOrchestrator {
    pub fn new(
        knowledge: KnowledgeBase,
        transport: Arc<dyn CompletionTransport>,
        provider: &charla_core::config::ProviderConfig,
        config: ChatConfig,
    ) -> Self {
        Self {
            knowledge,
            client: CompletionClient::new(transport, provider),
            config,
        }
    }

    /// Answer one user message given the recent conversation history.
    ///
    /// Always returns a display-ready string; provider failures surface as
    /// the client's canned fallbacks, which pass through verbatim.
    pub async fn answer(&self, user_message: &str, history: &[ConversationTurn]) -> String {
        // Cheap deterministic paths first: they keep the bot useful even
        // when the provider is unreachable or unconfigured.
        if self.knowledge.is_greeting(user_message) {
            debug!("Answering from greeting vocabulary");
            return self.config.greeting_reply.clone();
        }

        if let Some(answer) = self.knowledge.find_answer(user_message) {
            debug!("Answering verbatim from the knowledge base");
            return answer.to_string();
        }

        // The gate runs before the grounded prompt is built: off-topic
        // questions are refused rather than sent to the provider.
        if self.config.topic_gate && !self.knowledge.is_on_topic(user_message) {
            debug!("Refusing off-topic question");
            return self.config.refusal_reply.clone();
        }

        let system_prompt = build_system_prompt(self.knowledge.entries());
        let turns = build_turns(history, user_message, self.config.history_limit);
        debug!(turns = turns.len(), "Requesting grounded completion");
        self.client.complete(&system_prompt, turns).await
    }
}
