//! Startup seed data: assistants and their knowledge corpus.
//!
//! A seed file is TOML with one `[[assistants]]` table per assistant:
//!
//! ```toml
//! [[assistants]]
//! id = "6f1c2a9e-3b7d-4c55-9a0e-2d8f4b1e7c30"
//! name = "Prof. Ana"
//! subject = "Biologia"
//! personality = "socratic"
//!
//! [assistants.guardrails]
//! creativityLevel = 40
//! citationMode = true
//!
//! [[assistants.knowledge]]
//! title = "Capítulo 1"
//! content = "A célula é a unidade básica da vida."
//! ```
//!
//! Applying a seed twice is a no-op for knowledge: a snippet whose title and
//! content already exist for the assistant is skipped.

use config::{Config, File, FileFormat};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::TutorError;
use crate::models::{AssistantConfig, Guardrails, KnowledgeSnippet};
use crate::store::TutorStore;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SeedFile {
    #[serde(default)]
    pub assistants: Vec<SeedAssistant>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SeedAssistant {
    pub id: Uuid,
    pub name: String,
    pub subject: String,
    #[serde(default)]
    pub personality: String,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub guardrails: Guardrails,
    #[serde(default)]
    pub knowledge: Vec<SeedSnippet>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SeedSnippet {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub assistants: usize,
    pub snippets_added: usize,
}

impl SeedFile {
    pub fn load(path: &str) -> Result<Self, TutorError> {
        let s = Config::builder()
            .add_source(File::with_name(path).format(FileFormat::Toml))
            .build()?;
        Ok(s.try_deserialize()?)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, TutorError> {
        let s = Config::builder()
            .add_source(File::from_str(raw, FileFormat::Toml))
            .build()?;
        Ok(s.try_deserialize()?)
    }

    /// Upsert every assistant and add the knowledge snippets it lacks.
    pub async fn apply(
        &self,
        store: &dyn TutorStore,
        default_creativity_level: u8,
    ) -> Result<SeedSummary, TutorError> {
        let mut summary = SeedSummary::default();

        for seed in &self.assistants {
            let assistant = AssistantConfig::from_parts(
                seed.id,
                seed.name.clone(),
                seed.subject.clone(),
                seed.personality.clone(),
                seed.instructions.clone(),
                &seed.guardrails,
                default_creativity_level,
            );
            store.upsert_assistant(&assistant).await?;
            summary.assistants += 1;

            let existing = store.list_knowledge(assistant.id).await?;
            for snippet in &seed.knowledge {
                let present = existing
                    .iter()
                    .any(|k| k.title == snippet.title && k.content == snippet.content);
                if present {
                    continue;
                }
                store
                    .add_knowledge(&KnowledgeSnippet::new(
                        assistant.id,
                        snippet.title.as_str(),
                        snippet.content.as_str(),
                    ))
                    .await?;
                summary.snippets_added += 1;
            }

            tracing::info!(
                assistant_id = %assistant.id,
                name = %assistant.name,
                snippets = seed.knowledge.len(),
                "Seeded assistant"
            );
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    const SAMPLE: &str = r#"
        [[assistants]]
        id = "6f1c2a9e-3b7d-4c55-9a0e-2d8f4b1e7c30"
        name = "Prof. Ana"
        subject = "Biologia"
        personality = "socratic"

        [assistants.guardrails]
        creativityLevel = 20
        citationMode = true

        [[assistants.knowledge]]
        title = "Capítulo 1"
        content = "A célula é a unidade básica da vida."

        [[assistants.knowledge]]
        title = "Capítulo 2"
        content = "Mitocôndrias produzem energia."

        [[assistants]]
        id = "0b7e9d41-52a3-4f8e-8c16-93a0e5d2f7b4"
        name = "Prof. Rui"
        subject = "História"
    "#;

    fn ana_id() -> Uuid {
        Uuid::parse_str("6f1c2a9e-3b7d-4c55-9a0e-2d8f4b1e7c30").unwrap()
    }

    // ========================================================================
    // TEST 1: TOML parses with defaults for optional fields
    // ========================================================================
    #[test]
    fn test_parse_seed_file() {
        let seed = SeedFile::from_toml_str(SAMPLE).unwrap();

        assert_eq!(seed.assistants.len(), 2);
        let ana = &seed.assistants[0];
        assert_eq!(ana.id, ana_id());
        assert_eq!(ana.guardrails.creativity_level, Some(20.0));
        assert_eq!(ana.guardrails.citation_mode, Some(true));
        assert_eq!(ana.knowledge.len(), 2);

        let rui = &seed.assistants[1];
        assert_eq!(rui.personality, "");
        assert_eq!(rui.guardrails, Guardrails::default());
        assert!(rui.knowledge.is_empty());
    }

    // ========================================================================
    // TEST 2: apply makes assistants and knowledge readable from the store
    // ========================================================================
    #[tokio::test]
    async fn test_apply_populates_store() {
        let seed = SeedFile::from_toml_str(SAMPLE).unwrap();
        let store = InMemoryStore::new();

        let summary = seed.apply(&store, 50).await.unwrap();
        assert_eq!(summary, SeedSummary { assistants: 2, snippets_added: 2 });

        let ana = store.get_assistant(ana_id()).await.unwrap().unwrap();
        assert_eq!(ana.creativity_level, 20);
        assert!(ana.citation_mode);
        let knowledge = store.list_knowledge(ana_id()).await.unwrap();
        assert_eq!(knowledge[0].title, "Capítulo 1");
        assert_eq!(knowledge[1].title, "Capítulo 2");

        let rui = store.get_assistant(seed.assistants[1].id).await.unwrap().unwrap();
        assert_eq!(rui.creativity_level, 50);
    }

    // ========================================================================
    // TEST 3: re-applying does not duplicate knowledge
    // ========================================================================
    #[tokio::test]
    async fn test_apply_is_idempotent() {
        let seed = SeedFile::from_toml_str(SAMPLE).unwrap();
        let store = InMemoryStore::new();

        seed.apply(&store, 50).await.unwrap();
        let again = seed.apply(&store, 50).await.unwrap();

        assert_eq!(again.snippets_added, 0);
        assert_eq!(store.list_knowledge(ana_id()).await.unwrap().len(), 2);
    }

    #[test]
    fn test_missing_id_is_rejected() {
        let raw = r#"
            [[assistants]]
            name = "Sem id"
            subject = "Nada"
        "#;
        assert!(matches!(SeedFile::from_toml_str(raw), Err(TutorError::Config(_))));
    }
}
