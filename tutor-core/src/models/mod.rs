pub mod assistant;
pub mod chat_turn;
pub mod knowledge;
pub mod review_item;

pub use assistant::{AssistantConfig, Guardrails, Personality};
pub use chat_turn::{ChatTurn, HistoryEntry, Role};
pub use knowledge::KnowledgeSnippet;
pub use review_item::{Difficulty, ReviewItem};
