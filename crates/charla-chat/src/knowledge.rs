//! Static FAQ knowledge base.
//!
//! Loaded once at startup from a JSON document and read-only afterwards.
//! A missing document is tolerated (empty knowledge base, degraded mode);
//! a malformed one is a startup failure.

use std::path::Path;

use tracing::{info, warn};

use charla_core::config::ChatConfig;
use charla_core::error::CharlaError;
use charla_core::types::FaqEntry;

/// Normalize text for matching: lowercase, strip the Spanish diacritic set,
/// trim surrounding whitespace.
///
/// Pure and total: never fails, and `normalize(normalize(x)) == normalize(x)`.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| match c {
            'á' => 'a',
            'é' => 'e',
            'í' => 'i',
            'ó' => 'o',
            'ú' | 'ü' => 'u',
            'ñ' => 'n',
            other => other,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// The FAQ knowledge base plus the greeting and topic vocabularies.
#[derive(Debug)]
pub struct KnowledgeBase {
    entries: Vec<FaqEntry>,
    /// Normalized stored questions, parallel to `entries`.
    normalized_questions: Vec<String>,
    greetings: Vec<String>,
    topic_keywords: Vec<String>,
}

impl KnowledgeBase {
    /// Load the FAQ document at `path`.
    ///
    /// A missing file yields an empty knowledge base; an unreadable or
    /// structurally invalid file is an error.
    pub fn load(path: &Path, config: &ChatConfig) -> Result<Self, CharlaError> {
        let entries = if path.exists() {
            let json = std::fs::read_to_string(path)
                .map_err(|e| CharlaError::Knowledge(format!("{}: {}", path.display(), e)))?;
            let entries: Vec<FaqEntry> = serde_json::from_str(&json)
                .map_err(|e| CharlaError::Knowledge(format!("{}: {}", path.display(), e)))?;
            info!(count = entries.len(), path = %path.display(), "Knowledge base loaded");
            entries
        } else {
            warn!(path = %path.display(), "Knowledge base document missing; starting empty");
            Vec::new()
        };

        Ok(Self::from_entries(entries, config))
    }

    /// Build a knowledge base directly from entries (used by tests and by
    /// `load`).
    pub fn from_entries(entries: Vec<FaqEntry>, config: &ChatConfig) -> Self {
        let normalized_questions = entries.iter().map(|e| normalize(&e.question)).collect();
        Self {
            entries,
            normalized_questions,
            greetings: config.greetings.iter().map(|g| normalize(g)).collect(),
            topic_keywords: config.topic_keywords.iter().map(|k| normalize(k)).collect(),
        }
    }

    /// Look up a canned answer for `question`.
    ///
    /// Matches on normalized exact equality, or when a stored question is a
    /// substring of the input. First match in insertion order wins; there is
    /// no ranking.
    pub fn find_answer(&self, question: &str) -> Option<&str> {
        let normalized = normalize(question);
        for (entry, stored) in self.entries.iter().zip(&self.normalized_questions) {
            if *stored == normalized || (!stored.is_empty() && normalized.contains(stored)) {
                return Some(&entry.answer);
            }
        }
        None
    }

    /// Whether the input is a greeting (normalized prefix or exact match
    /// against the greeting vocabulary).
    pub fn is_greeting(&self, question: &str) -> bool {
        let normalized = normalize(question);
        self.greetings
            .iter()
            .any(|g| normalized == *g || normalized.starts_with(g.as_str()))
    }

    /// Whether the input mentions any configured topic keyword.
    pub fn is_on_topic(&self, question: &str) -> bool {
        let normalized = normalize(question);
        self.topic_keywords.iter().any(|k| normalized.contains(k.as_str()))
    }

    /// All entries in insertion order, for prompt construction.
    pub fn entries(&self) -> &[FaqEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
