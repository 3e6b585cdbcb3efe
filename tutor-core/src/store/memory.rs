//! In-memory store: used by tests and by `--memory-store` runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::TutorStore;
use crate::error::TutorError;
use crate::models::{AssistantConfig, ChatTurn, KnowledgeSnippet, ReviewItem};

#[derive(Default)]
struct State {
    assistants: HashMap<Uuid, AssistantConfig>,
    knowledge: Vec<KnowledgeSnippet>,
    turns: Vec<ChatTurn>,
    reviews: Vec<ReviewItem>,
}

#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the turns of one session, oldest first.
    pub async fn turns(&self, session_id: &str) -> Vec<ChatTurn> {
        self.state
            .read()
            .await
            .turns
            .iter()
            .filter(|t| t.session_id == session_id)
            .cloned()
            .collect()
    }

    /// Snapshot of all review items of one session.
    pub async fn review_items(&self, session_id: &str) -> Vec<ReviewItem> {
        self.state
            .read()
            .await
            .reviews
            .iter()
            .filter(|r| r.session_id == session_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl TutorStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn health(&self) -> Result<String, TutorError> {
        let state = self.state.read().await;
        Ok(format!(
            "in-memory ({} assistants, {} review items)",
            state.assistants.len(),
            state.reviews.len()
        ))
    }

    async fn upsert_assistant(&self, assistant: &AssistantConfig) -> Result<(), TutorError> {
        self.state
            .write()
            .await
            .assistants
            .insert(assistant.id, assistant.clone());
        Ok(())
    }

    async fn get_assistant(&self, id: Uuid) -> Result<Option<AssistantConfig>, TutorError> {
        Ok(self.state.read().await.assistants.get(&id).cloned())
    }

    async fn add_knowledge(&self, snippet: &KnowledgeSnippet) -> Result<(), TutorError> {
        self.state.write().await.knowledge.push(snippet.clone());
        Ok(())
    }

    async fn list_knowledge(&self, assistant_id: Uuid) -> Result<Vec<KnowledgeSnippet>, TutorError> {
        Ok(self
            .state
            .read()
            .await
            .knowledge
            .iter()
            .filter(|k| k.assistant_id == assistant_id)
            .cloned()
            .collect())
    }

    async fn append_turns(&self, turns: &[ChatTurn]) -> Result<(), TutorError> {
        self.state.write().await.turns.extend_from_slice(turns);
        Ok(())
    }

    async fn set_turn_feedback(&self, turn_id: Uuid, score: i16) -> Result<bool, TutorError> {
        let mut state = self.state.write().await;
        match state.turns.iter_mut().find(|t| t.id == turn_id) {
            Some(turn) => {
                turn.feedback = Some(score);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_review_item_if_absent(&self, item: &ReviewItem) -> Result<ReviewItem, TutorError> {
        let mut state = self.state.write().await;
        if let Some(existing) = state.reviews.iter().find(|r| {
            r.assistant_id == item.assistant_id
                && r.session_id == item.session_id
                && r.topic == item.topic
        }) {
            return Ok(existing.clone());
        }
        state.reviews.push(item.clone());
        Ok(item.clone())
    }

    async fn get_review_item(&self, id: Uuid) -> Result<Option<ReviewItem>, TutorError> {
        Ok(self
            .state
            .read()
            .await
            .reviews
            .iter()
            .find(|r| r.id == id)
            .cloned())
    }

    async fn update_review_item(&self, item: &ReviewItem) -> Result<(), TutorError> {
        let mut state = self.state.write().await;
        match state.reviews.iter_mut().find(|r| r.id == item.id) {
            Some(existing) => {
                *existing = item.clone();
                Ok(())
            }
            None => Err(TutorError::NotFound(format!("review item {}", item.id))),
        }
    }

    async fn due_review_items(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<ReviewItem>, TutorError> {
        let state = self.state.read().await;
        let mut due: Vec<ReviewItem> = state
            .reviews
            .iter()
            .filter(|r| r.session_id == session_id && r.is_due(now))
            .cloned()
            .collect();
        due.sort_by_key(|r| r.next_review);
        due.truncate(limit as usize);
        Ok(due)
    }
}
