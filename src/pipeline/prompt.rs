//! Prompt composition for the two model families.
//!
//! Claude-family models take one user turn plus a system prompt that carries
//! instructions, retrieved context and the serialized prior history. Llama
//! chat models take the whole exchange as role-tagged turns.

use serde_json::Value;

use crate::generation::ChatMessage;
use crate::retrieval::RetrievedChunk;

const INSTRUCTIONS: &str = "You are a helpful assistant answering questions about a document \
collection. Use the retrieved context below to answer. If the context does not cover the \
question, say so instead of guessing.";

/// System prompt + single-user-turn message list for Claude-style models.
pub fn claude_prompt(
    chunks: &[RetrievedChunk],
    history: &[ChatMessage],
    query: &str,
) -> (String, Vec<ChatMessage>) {
    let mut system = String::from(INSTRUCTIONS);
    system.push_str("\n\n");
    system.push_str(&format_context(chunks));

    if !history.is_empty() {
        system.push_str("\n\nConversation so far:\n");
        system.push_str(&serialize_history(history));
    }

    (system, vec![ChatMessage::new("user", query)])
}

/// Full role-tagged turn list for Llama-style chat models.
pub fn llama_messages(
    chunks: &[RetrievedChunk],
    history: &[ChatMessage],
    query: &str,
) -> Vec<ChatMessage> {
    let system = format!("{INSTRUCTIONS}\n\n{}", format_context(chunks));

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::new("system", system));
    messages.extend(history.iter().cloned());
    messages.push(ChatMessage::new("user", query));
    messages
}

/// Numbered context block with source and relevance per chunk.
fn format_context(chunks: &[RetrievedChunk]) -> String {
    if chunks.is_empty() {
        return "Retrieved context: (none)".to_string();
    }

    let mut out = String::from("Retrieved context:\n");
    for (i, chunk) in chunks.iter().enumerate() {
        out.push_str(&format!(
            "[{}] (source: {}, relevance: {:.2})\n{}\n\n",
            i + 1,
            location_label(&chunk.location),
            chunk.score,
            chunk.content.trim(),
        ));
    }
    out.trim_end().to_string()
}

fn serialize_history(history: &[ChatMessage]) -> String {
    history
        .iter()
        .map(|turn| {
            let speaker = match turn.role.as_str() {
                "assistant" => "Assistant",
                _ => "User",
            };
            format!("{speaker}: {}", turn.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn location_label(location: &Value) -> String {
    location["s3Location"]["uri"]
        .as_str()
        .or_else(|| location["type"].as_str())
        .map(str::to_string)
        .unwrap_or_else(|| "unknown".to_string())
}
