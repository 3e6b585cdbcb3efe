pub mod composer;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod models;
pub mod postprocess;
pub mod scheduler;
pub mod seed;
pub mod store;
pub mod suggestions;

pub use composer::{compose, ModeFlags};
pub use config::TutorConfig;
pub use error::TutorError;
pub use llm::{
    create_backend, GeminiChatClient, GeminiConfig, GenerationRequest, LlmBackend, LlmError,
};
pub use postprocess::{postprocess, PostprocessedReply};
pub use scheduler::{schedule_next, schedule_next_at, ScheduledReview};
pub use seed::{SeedFile, SeedSummary};
pub use store::{InMemoryStore, PgStore, TutorStore};
pub use suggestions::suggest;
