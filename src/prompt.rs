//! Prompt composition and response cleaning.
//!
//! Local backends get a single labelled-block prompt; completion backends get
//! a role-labelled transcript of the recent turn window ending in an `AI:`
//! cue; chat backends receive the structured turn list directly (built in the
//! provider router). Response cleaning strips delimited reasoning spans from
//! local model output before it reaches the client.

use crate::models::ConversationTurn;

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

/// Build the single-string prompt for a local model: optional system
/// instruction, optional retrieved-context block, optional live editor
/// context, then the user query, separated by blank lines.
pub fn compose_local_prompt(
    system: Option<&str>,
    context_chunks: &[String],
    editor_context: Option<&str>,
    query: &str,
) -> String {
    let mut blocks: Vec<String> = Vec::new();

    if let Some(system) = system {
        if !system.trim().is_empty() {
            blocks.push(system.trim().to_string());
        }
    }

    if !context_chunks.is_empty() {
        blocks.push(format!("Context:\n{}", context_chunks.join("\n\n")));
    }

    if let Some(editor) = editor_context {
        if !editor.trim().is_empty() {
            blocks.push(format!("Current editor context:\n{}", editor));
        }
    }

    blocks.push(format!("User Query: {}", query));

    blocks.join("\n\n")
}

/// Build the plain-text transcript for completion-style backends: each turn
/// labelled with its role, newest last, terminated by an `AI:` cue for the
/// model to continue from. The caller bounds `turns` to the rolling window.
pub fn compose_transcript(turns: &[ConversationTurn]) -> String {
    let mut transcript = String::new();
    for turn in turns {
        transcript.push_str(turn.role.label());
        transcript.push_str(": ");
        transcript.push_str(&turn.content);
        transcript.push('\n');
    }
    transcript.push_str("AI:");
    transcript
}

/// Strip delimited reasoning spans (`<think>…</think>`) from a raw model
/// response and trim surrounding whitespace. Unpaired markers are left
/// alone. Pure text transform, no side effects.
pub fn clean_response(raw: &str) -> String {
    let mut text = raw.to_string();

    while let Some(start) = text.find(THINK_OPEN) {
        match text[start..].find(THINK_CLOSE) {
            Some(rel_end) => {
                let end = start + rel_end + THINK_CLOSE.len();
                text.replace_range(start..end, "");
            }
            None => break,
        }
    }

    text.trim().to_string()
}
