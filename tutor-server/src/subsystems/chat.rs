//! Chat subsystem: one student message in, one assistant reply out.
//!
//! Pipeline per request:
//! 1. Load the assistant and its knowledge corpus from the store
//! 2. Overlay per-request `assistantSettings` on the stored guardrails
//! 3. Compose the system instruction and call the LLM
//! 4. Postprocess the raw reply (topic, citations, reasoning) and pick suggestions
//! 5. Seed a review item for a tagged topic, then persist both turns
//!
//! Nothing is written before the LLM has answered. The review seed is
//! insert-if-absent, so a retried request never duplicates it; the two turns
//! are stored together or not at all.

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tutor_core::composer::{compose, ModeFlags};
use tutor_core::llm::{GenerationRequest, LlmBackend};
use tutor_core::models::{ChatTurn, Guardrails, HistoryEntry};
use tutor_core::postprocess::postprocess;
use tutor_core::suggestions::suggest;
use tutor_core::{TutorError, TutorStore};
use uuid::Uuid;

use super::review::seed_review_item;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    pub assistant_id: Uuid,
    pub session_id: String,
    #[serde(default)]
    pub conversation_history: Vec<HistoryEntry>,
    #[serde(default)]
    pub assistant_settings: Guardrails,
    #[serde(flatten)]
    pub modes: ModeFlags,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub response: String,
    pub suggestions: Vec<String>,
    pub citations: Vec<String>,
    pub reasoning: String,
    /// Empty when the reply tagged no topic.
    pub extracted_topic: String,
    pub turn_id: Uuid,
}

/// Run one chat turn against the given store and LLM backend.
pub async fn run_chat_turn(
    store: &dyn TutorStore,
    llm: &dyn LlmBackend,
    request: ChatRequest,
) -> Result<ChatResponse> {
    let assistant = store
        .get_assistant(request.assistant_id)
        .await?
        .ok_or_else(|| TutorError::NotFound(format!("assistant {}", request.assistant_id)))?;

    let knowledge = store.list_knowledge(assistant.id).await?;
    let effective = assistant.with_settings(&request.assistant_settings);

    let system_instruction = compose(
        &effective,
        &knowledge,
        &request.conversation_history,
        &request.modes,
    );

    let generation = GenerationRequest {
        system_instruction,
        message: request.message.clone(),
        temperature: GenerationRequest::temperature_for_level(effective.creativity_level),
    };

    tracing::info!(
        assistant_id = %assistant.id,
        session_id = %request.session_id,
        creativity_level = effective.creativity_level,
        knowledge_snippets = knowledge.len(),
        history_turns = request.conversation_history.len(),
        backend = llm.name(),
        "Generating reply"
    );

    let raw = llm.generate(&generation).await.map_err(TutorError::from)?;

    let processed = postprocess(&raw, effective.citation_mode, effective.transparency_mode);
    let suggestions = suggest(processed.extracted_topic.as_deref(), &request.modes);

    let user_turn = ChatTurn::user(assistant.id, &request.session_id, &request.message);
    let mut assistant_turn = ChatTurn::assistant(assistant.id, &request.session_id, &processed.text);
    assistant_turn.citations = processed.citations.clone();
    assistant_turn.reasoning = if processed.reasoning.is_empty() {
        None
    } else {
        Some(processed.reasoning.clone())
    };
    assistant_turn.suggestions = suggestions.clone();

    if let Some(topic) = processed.extracted_topic.as_deref() {
        seed_review_item(store, assistant.id, &request.session_id, topic, Utc::now()).await?;
    }

    store.append_turns(&[user_turn, assistant_turn.clone()]).await?;

    tracing::info!(
        turn_id = %assistant_turn.id,
        citations = processed.citations.len(),
        topic = processed.extracted_topic.as_deref().unwrap_or(""),
        "Chat turn complete"
    );

    Ok(ChatResponse {
        response: processed.text,
        suggestions,
        citations: processed.citations,
        reasoning: processed.reasoning,
        extracted_topic: processed.extracted_topic.unwrap_or_default(),
        turn_id: assistant_turn.id,
    })
}
