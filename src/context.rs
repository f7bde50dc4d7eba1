use crate::store::types::{ChatMessage, DocumentRecord, MessageRole};
use std::fmt::Write;

/// Hard cap on grounding-document text injected into a request. A safety
/// bound against unbounded prompt size, not a chunking strategy.
pub const GROUNDING_CHAR_LIMIT: usize = 30_000;

pub const DEFAULT_INSTRUCTION: &str = "You are Chalkbox, an AI assistant for educators.\n\
     # Behavior\n\
     - Be practical and classroom-ready: concrete activities, realistic timings, age-appropriate language.\n\
     - Use plain markdown: headers, **bold**, numbered lists, and tables where they help.\n\
     - Match the user's language.\n\
     - When a reference document is provided, ground your answers in it and say so when you go beyond it.\n\
     - Ask at most one clarifying question, and only when the grade level or subject is truly ambiguous.\n";

pub struct PromptParts {
    pub instruction: String,
    pub user_turn: String,
}

pub struct AssembleRequest<'a> {
    pub base_instruction: &'a str,
    pub document: Option<&'a DocumentRecord>,
    pub include_document: bool,
    pub format_directive: Option<&'a str>,
    pub history: &'a [ChatMessage],
    pub user_text: &'a str,
}

pub fn truncate_grounding(content: &str) -> &str {
    match content.char_indices().nth(GROUNDING_CHAR_LIMIT) {
        Some((byte_index, _)) => &content[..byte_index],
        None => content,
    }
}

/// Prior turns rendered for replay. Errored messages never reach the
/// completion service again.
pub fn render_history(history: &[ChatMessage]) -> String {
    let mut out = String::new();
    for message in history.iter().filter(|m| !m.is_error) {
        let label = match message.role {
            MessageRole::User => "User",
            MessageRole::Assistant => "Assistant",
        };
        let _ = writeln!(out, "{}: {}\n", label, message.text);
    }
    out.trim_end().to_string()
}

pub fn assemble(req: &AssembleRequest) -> PromptParts {
    let mut instruction = req.base_instruction.to_string();

    if req.include_document
        && let Some(doc) = req.document
    {
        let _ = write!(
            instruction,
            "\n\n# Reference Document: {}\nGround your answer in the document below.\n\n{}",
            doc.name,
            truncate_grounding(&doc.content)
        );
    }

    // The format directive comes last so it is the final instruction the
    // model sees.
    if let Some(directive) = req.format_directive {
        let _ = write!(instruction, "\n\n# Output Format\n{}", directive);
    }

    let mut user_turn = String::new();
    let rendered = render_history(req.history);
    if !rendered.is_empty() {
        user_turn.push_str("# Conversation So Far\n\n");
        user_turn.push_str(&rendered);
        user_turn.push_str("\n\n");
    }
    let _ = write!(user_turn, "User: {}", req.user_text);

    PromptParts {
        instruction,
        user_turn,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::types::SourceKind;

    fn doc_with_content(content: &str) -> DocumentRecord {
        DocumentRecord::new(
            "owner-1",
            "syllabus.txt",
            SourceKind::Txt,
            content.to_string(),
            content.len() as u64,
        )
    }

    #[test]
    fn test_truncation_is_exact_at_the_cap() {
        let content = "a".repeat(GROUNDING_CHAR_LIMIT + 500);
        let truncated = truncate_grounding(&content);
        assert_eq!(truncated.chars().count(), GROUNDING_CHAR_LIMIT);
    }

    #[test]
    fn test_truncation_leaves_short_content_alone() {
        assert_eq!(truncate_grounding("short"), "short");
        let exact = "b".repeat(GROUNDING_CHAR_LIMIT);
        assert_eq!(truncate_grounding(&exact), exact);
    }

    #[test]
    fn test_truncation_counts_characters_not_bytes() {
        let content = "é".repeat(GROUNDING_CHAR_LIMIT + 10);
        let truncated = truncate_grounding(&content);
        assert_eq!(truncated.chars().count(), GROUNDING_CHAR_LIMIT);
    }

    #[test]
    fn test_assembled_document_segment_is_capped() {
        let doc = doc_with_content(&"x".repeat(GROUNDING_CHAR_LIMIT * 2));
        let parts = assemble(&AssembleRequest {
            base_instruction: "base",
            document: Some(&doc),
            include_document: true,
            format_directive: None,
            history: &[],
            user_text: "summarize this",
        });
        let run_length = parts
            .instruction
            .chars()
            .filter(|c| *c == 'x')
            .count();
        assert_eq!(run_length, GROUNDING_CHAR_LIMIT);
    }

    #[test]
    fn test_document_can_be_excluded_per_request() {
        let doc = doc_with_content("grounding text");
        let parts = assemble(&AssembleRequest {
            base_instruction: "base",
            document: Some(&doc),
            include_document: false,
            format_directive: None,
            history: &[],
            user_text: "answer from general knowledge",
        });
        assert!(!parts.instruction.contains("grounding text"));
        assert!(!parts.instruction.contains("syllabus.txt"));
    }

    #[test]
    fn test_format_directive_is_the_final_clause() {
        let doc = doc_with_content("document body");
        let parts = assemble(&AssembleRequest {
            base_instruction: "base",
            document: Some(&doc),
            include_document: true,
            format_directive: Some("Answer as a numbered list."),
            history: &[],
            user_text: "go",
        });
        let doc_pos = parts.instruction.find("document body").unwrap();
        let directive_pos = parts.instruction.find("Answer as a numbered list.").unwrap();
        assert!(directive_pos > doc_pos);
        assert!(parts.instruction.ends_with("Answer as a numbered list."));
    }

    #[test]
    fn test_history_replay_skips_errored_turns() {
        let history = vec![
            ChatMessage::user("first question"),
            ChatMessage::error_reply("Something went wrong."),
            ChatMessage::assistant("a real answer"),
        ];
        let rendered = render_history(&history);
        assert!(rendered.contains("first question"));
        assert!(rendered.contains("a real answer"));
        assert!(!rendered.contains("Something went wrong."));
    }

    #[test]
    fn test_user_turn_ends_with_the_current_message() {
        let history = vec![ChatMessage::user("old"), ChatMessage::assistant("older")];
        let parts = assemble(&AssembleRequest {
            base_instruction: "base",
            document: None,
            include_document: true,
            format_directive: None,
            history: &history,
            user_text: "what now?",
        });
        assert!(parts.user_turn.ends_with("User: what now?"));
        assert!(parts.user_turn.contains("Assistant: older"));
    }
}
