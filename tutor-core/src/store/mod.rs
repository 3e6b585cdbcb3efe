//! Persistence port.
//!
//! Everything that reads or writes assistants, knowledge, chat turns or
//! review items goes through a `TutorStore` handed in by the caller. There is
//! no ambient global state.

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::TutorError;
use crate::models::{AssistantConfig, ChatTurn, KnowledgeSnippet, ReviewItem};

#[async_trait]
pub trait TutorStore: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Short description of the backing store, or an error if unreachable.
    async fn health(&self) -> Result<String, TutorError>;

    async fn upsert_assistant(&self, assistant: &AssistantConfig) -> Result<(), TutorError>;

    async fn get_assistant(&self, id: Uuid) -> Result<Option<AssistantConfig>, TutorError>;

    async fn add_knowledge(&self, snippet: &KnowledgeSnippet) -> Result<(), TutorError>;

    /// All snippets of an assistant in insertion order.
    async fn list_knowledge(&self, assistant_id: Uuid) -> Result<Vec<KnowledgeSnippet>, TutorError>;

    /// Persist turns in order; either all of them are stored or none.
    async fn append_turns(&self, turns: &[ChatTurn]) -> Result<(), TutorError>;

    /// Attach a feedback score. Returns `false` when the turn does not exist.
    async fn set_turn_feedback(&self, turn_id: Uuid, score: i16) -> Result<bool, TutorError>;

    /// Insert `item` unless one already exists for the same
    /// (assistant, session, topic); returns whichever row is stored.
    async fn insert_review_item_if_absent(&self, item: &ReviewItem) -> Result<ReviewItem, TutorError>;

    async fn get_review_item(&self, id: Uuid) -> Result<Option<ReviewItem>, TutorError>;

    async fn update_review_item(&self, item: &ReviewItem) -> Result<(), TutorError>;

    /// Items of a session with `next_review <= now`, earliest first.
    async fn due_review_items(
        &self,
        session_id: &str,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<ReviewItem>, TutorError>;
}
