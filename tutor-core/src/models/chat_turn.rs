use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One message of a conversation. Only `feedback` may change after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub id: Uuid,
    pub assistant_id: Uuid,
    pub session_id: String,
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub citations: Vec<String>,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    /// +1 / -1, set by the student after the fact.
    #[serde(default)]
    pub feedback: Option<i16>,
}

impl ChatTurn {
    pub fn user(assistant_id: Uuid, session_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            assistant_id,
            session_id: session_id.into(),
            role: Role::User,
            content: content.into(),
            created_at: Utc::now(),
            citations: Vec::new(),
            reasoning: None,
            suggestions: Vec::new(),
            feedback: None,
        }
    }

    pub fn assistant(assistant_id: Uuid, session_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            ..Self::user(assistant_id, session_id, content)
        }
    }
}

/// Prior message as it arrives in `conversationHistory`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}
