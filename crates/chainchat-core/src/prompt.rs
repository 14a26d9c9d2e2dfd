//! Prompt assembly: merging ranked chunks, the persona, and prior
//! conversation turns into the final model request.
//!
//! The assembled sequence always has exactly one system turn placed first,
//! preserves history turns in their original order, and ends with the
//! active user query. Retrieved context is injected into either the system
//! turn or the user turn, selected by [`ContextPlacement`].

use serde::Deserialize;

use crate::models::{Message, ScoredChunk};

/// Where retrieved context is merged into the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextPlacement {
    /// Context is appended to the system turn after the persona.
    System,
    /// Context prefixes the user turn, with a `User question:` marker.
    User,
}

/// Build the ordered turn sequence for one model invocation.
///
/// `history` carries the prior turns only — the active query is passed
/// separately and always becomes the final turn. With no ranked chunks the
/// persona and query pass through unchanged.
pub fn assemble(
    persona: &str,
    ranked: &[ScoredChunk],
    history: &[Message],
    query: &str,
    placement: ContextPlacement,
) -> Vec<Message> {
    let context = format_context(ranked);

    let mut turns = Vec::with_capacity(history.len() + 2);

    match placement {
        ContextPlacement::System => {
            let content = match &context {
                Some(ctx) => format!("{persona}\n\n{ctx}"),
                None => persona.to_string(),
            };
            turns.push(Message::system(content));
            turns.extend_from_slice(history);
            turns.push(Message::user(query));
        }
        ContextPlacement::User => {
            turns.push(Message::system(persona));
            turns.extend_from_slice(history);
            let content = match &context {
                Some(ctx) => format!("{ctx}\n\nUser question: {query}"),
                None => query.to_string(),
            };
            turns.push(Message::user(content));
        }
    }

    turns
}

/// Format ranked chunks as a context block, in ranking order.
///
/// Returns `None` when there are no chunks so callers can skip the block
/// entirely rather than injecting an empty header.
fn format_context(ranked: &[ScoredChunk]) -> Option<String> {
    if ranked.is_empty() {
        return None;
    }
    let mut ctx = String::from("Here is some relevant information from the textbooks:\n");
    for sc in ranked {
        ctx.push_str(&format!("\nFrom \"{}\":\n{}\n", sc.chunk.source, sc.chunk.text));
    }
    Some(ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Chunk, Role};

    fn scored(text: &str, source: &str) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk {
                id: 0,
                text: text.to_string(),
                source: source.to_string(),
                page: None,
                embedding: None,
            },
            score: 1.0,
        }
    }

    #[test]
    fn test_system_placement_single_chunk() {
        let ranked = vec![scored("Inventory turnover measures stock velocity.", "A")];
        let history = vec![Message::user("hi"), Message::assistant("hello")];
        let turns = assemble("You are an assistant.", &ranked, &history, "what is turnover?", ContextPlacement::System);

        assert_eq!(turns.len(), 4);
        // Exactly one system turn, placed first, carrying persona and chunk text.
        assert_eq!(turns[0].role, Role::System);
        assert!(turns[0].content.contains("You are an assistant."));
        assert!(turns[0].content.contains("Inventory turnover measures stock velocity."));
        assert!(turns[0].content.contains("From \"A\":"));
        assert_eq!(turns.iter().filter(|t| t.role == Role::System).count(), 1);
        // History unchanged, user turn unmodified.
        assert_eq!(turns[1], history[0]);
        assert_eq!(turns[2], history[1]);
        assert_eq!(turns[3], Message::user("what is turnover?"));
    }

    #[test]
    fn test_user_placement_moves_context_to_user_turn() {
        let ranked = vec![scored("Safety stock covers demand spikes.", "B")];
        let turns = assemble("Persona.", &ranked, &[], "how much safety stock?", ContextPlacement::User);

        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0], Message::system("Persona."));
        assert!(turns[1].content.contains("Safety stock covers demand spikes."));
        assert!(turns[1].content.contains("User question: how much safety stock?"));
    }

    #[test]
    fn test_no_chunks_passes_turns_through() {
        for placement in [ContextPlacement::System, ContextPlacement::User] {
            let turns = assemble("Persona.", &[], &[], "query", placement);
            assert_eq!(turns.len(), 2);
            assert_eq!(turns[0], Message::system("Persona."));
            assert_eq!(turns[1], Message::user("query"));
        }
    }

    #[test]
    fn test_chunks_appear_in_ranking_order() {
        let ranked = vec![scored("first chunk", "A"), scored("second chunk", "B")];
        let turns = assemble("P", &ranked, &[], "q", ContextPlacement::System);
        let sys = &turns[0].content;
        let a = sys.find("first chunk").unwrap();
        let b = sys.find("second chunk").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_placement_parses_from_config_strings() {
        let sys: ContextPlacement = serde_json::from_str("\"system\"").unwrap();
        let user: ContextPlacement = serde_json::from_str("\"user\"").unwrap();
        assert_eq!(sys, ContextPlacement::System);
        assert_eq!(user, ContextPlacement::User);
    }
}
