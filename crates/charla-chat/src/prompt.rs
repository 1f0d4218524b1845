//! Prompt construction.
//!
//! Pure functions: a system prompt grounded in the FAQ entries, and a
//! bounded window of role-tagged conversation turns.

use charla_core::types::{ConversationTurn, FaqEntry, Role};

/// Persona and priority instructions. The FAQ block is the only
/// data-dependent part of the prompt.
const PROMPT_HEADER: &str = "Eres un asistente virtual especializado en inteligencia artificial. \
Responde siempre en español, de manera clara y concisa.\n\n\
Si la pregunta del usuario coincide o casi coincide con alguna de las siguientes preguntas \
frecuentes, responde exactamente con la respuesta indicada, palabra por palabra. Para cualquier \
otra pregunta, responde de forma general dentro del tema de la inteligencia artificial.";

/// Render the system prompt embedding every FAQ entry as a two-line
/// `P:`/`R:` block.
///
/// No escaping: the transport serializes the whole prompt as one JSON
/// string, so embedded control characters survive as-is.
pub fn build_system_prompt(entries: &[FaqEntry]) -> String {
    let mut prompt = String::from(PROMPT_HEADER);
    if !entries.is_empty() {
        prompt.push_str("\n\nPreguntas frecuentes:");
        for entry in entries {
            prompt.push_str("\nP: ");
            prompt.push_str(&entry.question);
            prompt.push_str("\nR: ");
            prompt.push_str(&entry.answer);
        }
    }
    prompt
}

/// Bound `history` to its last `limit` turns and append the current user
/// message.
///
/// Tail truncation: the oldest turns beyond the window are dropped, never
/// the newest. Total for any `limit`, including 0 and history shorter than
/// the window.
pub fn build_turns(
    history: &[ConversationTurn],
    current: &str,
    limit: usize,
) -> Vec<ConversationTurn> {
    let start = history.len().saturating_sub(limit);
    let mut turns: Vec<ConversationTurn> = history[start..].to_vec();
    turns.push(ConversationTurn::new(Role::User, current));
    turns
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(question: &str, answer: &str) -> FaqEntry {
        FaqEntry {
            question: question.to_string(),
            answer: answer.to_string(),
        }
    }

    fn turn(role: Role, content: &str) -> ConversationTurn {
        ConversationTurn::new(role, content)
    }

    // ---- System prompt ----

    #[test]
    fn test_system_prompt_embeds_every_entry() {
        let entries = vec![
            entry("qué es ia", "Inteligencia artificial."),
            entry("qué es ml", "Aprendizaje automático."),
        ];
        let prompt = build_system_prompt(&entries);

        assert!(prompt.starts_with("Eres un asistente virtual"));
        assert!(prompt.contains("Preguntas frecuentes:"));
        assert!(prompt.contains("P: qué es ia\nR: Inteligencia artificial."));
        assert!(prompt.contains("P: qué es ml\nR: Aprendizaje automático."));
    }

    #[test]
    fn test_system_prompt_without_entries_is_just_the_template() {
        let prompt = build_system_prompt(&[]);
        assert!(prompt.starts_with("Eres un asistente virtual"));
        assert!(!prompt.contains("Preguntas frecuentes:"));
    }

    #[test]
    fn test_system_prompt_preserves_control_characters() {
        let entries = vec![entry("línea\ndoble", "respuesta\tcon tab")];
        let prompt = build_system_prompt(&entries);
        assert!(prompt.contains("línea\ndoble"));
        assert!(prompt.contains("respuesta\tcon tab"));
        // And the whole thing survives a JSON round-trip as one string.
        let json = serde_json::to_string(&prompt).unwrap();
        let back: String = serde_json::from_str(&json).unwrap();
        assert_eq!(back, prompt);
    }

    // ---- Turn window ----

    #[test]
    fn test_build_turns_tail_truncation() {
        let history = vec![
            turn(Role::User, "uno"),
            turn(Role::Assistant, "dos"),
            turn(Role::User, "tres"),
            turn(Role::Assistant, "cuatro"),
            turn(Role::User, "cinco"),
        ];
        let turns = build_turns(&history, "actual", 2);

        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].content, "cuatro");
        assert_eq!(turns[0].role, Role::Assistant);
        assert_eq!(turns[1].content, "cinco");
        assert_eq!(turns[2].content, "actual");
        assert_eq!(turns[2].role, Role::User);
    }

    #[test]
    fn test_build_turns_history_shorter_than_limit() {
        let history = vec![turn(Role::User, "uno")];
        let turns = build_turns(&history, "actual", 10);
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content, "uno");
        assert_eq!(turns[1].content, "actual");
    }

    #[test]
    fn test_build_turns_zero_limit_keeps_only_current() {
        let history = vec![turn(Role::User, "uno"), turn(Role::Assistant, "dos")];
        let turns = build_turns(&history, "actual", 0);
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].content, "actual");
        assert_eq!(turns[0].role, Role::User);
    }

    #[test]
    fn test_build_turns_empty_history() {
        let turns = build_turns(&[], "actual", 6);
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].content, "actual");
    }

    #[test]
    fn test_build_turns_preserves_relative_order_and_roles() {
        let history = vec![
            turn(Role::User, "pregunta"),
            turn(Role::Assistant, "respuesta"),
        ];
        let turns = build_turns(&history, "siguiente", 6);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[2].role, Role::User);
    }
}
