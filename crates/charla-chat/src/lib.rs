//! Conversational core for Charla.
//!
//! Provides the FAQ knowledge base, prompt construction, the completion
//! provider client, and the orchestrator that ties them into the
//! greeting → FAQ → topical gate → grounded-completion pipeline.

pub mod completion;
pub mod error;
pub mod knowledge;
pub mod orchestrator;
pub mod prompt;

pub use completion::{
    ChatCompletionRequest, CompletionClient, CompletionTransport, HttpTransport, TransportReply,
};
pub use error::CompletionError;
pub use knowledge::{normalize, KnowledgeBase};
pub use orchestrator::ChatOrchestrator;
pub use prompt::{build_system_prompt, build_turns};
