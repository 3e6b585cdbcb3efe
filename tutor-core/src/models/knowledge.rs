use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct KnowledgeSnippet {
    pub id: Uuid,
    pub assistant_id: Uuid,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl KnowledgeSnippet {
    pub fn new(assistant_id: Uuid, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            assistant_id,
            title: title.into(),
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}
