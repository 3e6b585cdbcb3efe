//! System-instruction assembly for assistant chat turns.
//!
//! `compose` is pure string building: the same assistant, corpus, history and
//! mode flags always produce the same instruction. Sections are joined by a
//! blank line in a fixed order:
//!
//! 1. identity sentence
//! 2. creativity tier (Guardian ≤ 30 < Balanced ≤ 70 < Creative Partner)
//! 3. personality tone
//! 4. citation format (citation mode)
//! 5. reasoning block (transparency mode)
//! 6. anti-cheat guidance, then the per-request mode blocks
//! 7. review-topic tagging
//! 8. educator instructions
//! 9. knowledge corpus
//! 10. conversation history

use serde::{Deserialize, Serialize};

use crate::models::{AssistantConfig, HistoryEntry, KnowledgeSnippet, Personality, Role};

/// Highest level that still selects the Guardian tier.
pub const GUARDIAN_MAX_LEVEL: u8 = 30;
/// Highest level that still selects the Balanced tier.
pub const BALANCED_MAX_LEVEL: u8 = 70;

pub const GUARDIAN_HEADER: &str = "MODO GUARDIÃO (criatividade baixa):";
pub const BALANCED_HEADER: &str = "MODO EQUILIBRADO (criatividade moderada):";
pub const CREATIVE_HEADER: &str = "MODO PARCEIRO CRIATIVO (criatividade alta):";

/// Exact sentence a Guardian assistant must answer with when the corpus is silent.
pub const GUARDIAN_REFUSAL: &str =
    "Não encontrei essa informação no material fornecido pelo professor.";

pub const CITATION_INSTRUCTION: &str = "Ao usar informações da base de conhecimento, cite a fonte no formato (Fonte: <nome do material>), logo após a informação citada.";

/// Heading the model places before its reasoning block.
pub const REASONING_HEADING: &str = "💡 Como cheguei a esta resposta:";

/// Tag name of the review-topic marker, `[TÓPICO_REVISÃO: <nome>]`.
pub const REVIEW_TOPIC_TAG: &str = "TÓPICO_REVISÃO";

pub const FRIENDLY_TONE: &str =
    "Seja amigável, acolhedor e encorajador, usando uma linguagem próxima do aluno.";
pub const FORMAL_TONE: &str = "Mantenha um tom formal, preciso e acadêmico.";
pub const SOCRATIC_TONE: &str = "Use o método socrático: guie o aluno com perguntas em vez de entregar respostas prontas.";
pub const CREATIVE_TONE: &str =
    "Seja criativo e envolvente, usando histórias e exemplos inusitados para explicar.";

const ANTI_CHEAT_BLOCK: &str = "MODO ANTI-COLA: Não entregue respostas prontas para tarefas, provas ou exercícios avaliativos. Oriente o aluno passo a passo para que ele chegue à resposta por conta própria.";

const PRACTICE_BLOCK: &str = "MODO EXERCÍCIOS: Gere exercícios práticos sobre o tema solicitado, com enunciados claros, níveis de dificuldade variados e gabarito comentado ao final.";
const ACTIVITY_BLOCK: &str = "GERAÇÃO DE ATIVIDADES: Crie atividades didáticas estruturadas (objetivo, materiais, passo a passo e critérios de avaliação) adequadas ao nível do aluno.";
const COMMAND_BLOCK: &str = "COMANDO: A mensagem do aluno é um comando rápido (por exemplo /resumo, /quiz ou /explicar). Execute o comando de forma direta e objetiva, sem rodeios.";
const SIMULATION_BLOCK: &str = "MODO SIMULAÇÃO: Conduza uma simulação interativa do cenário proposto, descrevendo cada etapa e pedindo a decisão do aluno antes de avançar.";
const LIFE_CONNECTION_BLOCK: &str = "CONEXÃO COM A VIDA REAL: Relacione o conteúdo a situações do cotidiano, profissões e aplicações práticas que o aluno possa reconhecer.";
const STUDY_PLAN_BLOCK: &str = "PLANO DE ESTUDOS: Monte um plano de estudos organizado por dias ou semanas, com metas, tópicos e momentos de revisão.";

/// Per-request switches that pull in extra guidance paragraphs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeFlags {
    #[serde(default)]
    pub is_practice_mode: bool,
    #[serde(default)]
    pub is_activity_generation: bool,
    #[serde(default)]
    pub is_command: bool,
    #[serde(default)]
    pub is_simulation: bool,
    #[serde(default)]
    pub is_life_connection: bool,
    #[serde(default)]
    pub is_study_plan: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Practice,
    Activity,
    Command,
    Simulation,
    LifeConnection,
    StudyPlan,
}

impl ModeFlags {
    pub fn is_set(&self, mode: Mode) -> bool {
        match mode {
            Mode::Practice => self.is_practice_mode,
            Mode::Activity => self.is_activity_generation,
            Mode::Command => self.is_command,
            Mode::Simulation => self.is_simulation,
            Mode::LifeConnection => self.is_life_connection,
            Mode::StudyPlan => self.is_study_plan,
        }
    }
}

/// Mode paragraphs in emission order.
const MODE_BLOCKS: &[(Mode, &str)] = &[
    (Mode::Practice, PRACTICE_BLOCK),
    (Mode::Activity, ACTIVITY_BLOCK),
    (Mode::Command, COMMAND_BLOCK),
    (Mode::Simulation, SIMULATION_BLOCK),
    (Mode::LifeConnection, LIFE_CONNECTION_BLOCK),
    (Mode::StudyPlan, STUDY_PLAN_BLOCK),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreativityTier {
    Guardian,
    Balanced,
    CreativePartner,
}

impl CreativityTier {
    pub fn for_level(level: u8) -> Self {
        if level <= GUARDIAN_MAX_LEVEL {
            Self::Guardian
        } else if level <= BALANCED_MAX_LEVEL {
            Self::Balanced
        } else {
            Self::CreativePartner
        }
    }

    pub fn header(&self) -> &'static str {
        match self {
            Self::Guardian => GUARDIAN_HEADER,
            Self::Balanced => BALANCED_HEADER,
            Self::CreativePartner => CREATIVE_HEADER,
        }
    }
}

pub fn personality_sentence(personality: Personality) -> &'static str {
    match personality {
        Personality::Friendly => FRIENDLY_TONE,
        Personality::Formal => FORMAL_TONE,
        Personality::Socratic => SOCRATIC_TONE,
        Personality::Creative => CREATIVE_TONE,
    }
}

/// Build the system instruction for one chat turn.
pub fn compose(
    config: &AssistantConfig,
    knowledge: &[KnowledgeSnippet],
    history: &[HistoryEntry],
    modes: &ModeFlags,
) -> String {
    let mut sections: Vec<String> = Vec::new();

    sections.push(format!(
        "Você é {}, um assistente educacional especializado em {}.",
        config.name, config.subject
    ));

    sections.push(tier_block(CreativityTier::for_level(config.creativity_level)));

    if let Some(personality) = config.personality_kind() {
        sections.push(personality_sentence(personality).to_string());
    }

    if config.citation_mode {
        sections.push(CITATION_INSTRUCTION.to_string());
    }

    if config.transparency_mode {
        sections.push(format!(
            "Ao final da resposta, inclua uma seção iniciada por \"{}\" explicando brevemente, em poucas linhas, o raciocínio que levou à resposta.",
            REASONING_HEADING
        ));
    }

    if config.anti_cheat_mode {
        sections.push(ANTI_CHEAT_BLOCK.to_string());
    }

    sections.extend(
        MODE_BLOCKS
            .iter()
            .filter(|(mode, _)| modes.is_set(*mode))
            .map(|(_, text)| text.to_string()),
    );

    sections.push(format!(
        "Quando abordar um conceito importante que mereça revisão espaçada, inclua ao final da resposta a marcação [{}: <nome do conceito>].",
        REVIEW_TOPIC_TAG
    ));

    if !config.instructions.trim().is_empty() {
        sections.push(format!("INSTRUÇÕES DO PROFESSOR:\n{}", config.instructions));
    }

    if !knowledge.is_empty() {
        let corpus = knowledge
            .iter()
            .map(|snippet| format!("{}: {}", snippet.title, snippet.content))
            .collect::<Vec<_>>()
            .join("\n\n");
        sections.push(format!("BASE DE CONHECIMENTO:\n\n{}", corpus));
    }

    if !history.is_empty() {
        let lines = history
            .iter()
            .map(|entry| {
                let speaker = match entry.role {
                    Role::User => "Aluno",
                    Role::Assistant => "Assistente",
                };
                format!("{}: {}", speaker, entry.content)
            })
            .collect::<Vec<_>>()
            .join("\n");
        sections.push(format!("HISTÓRICO DA CONVERSA:\n{}", lines));
    }

    sections.join("\n\n")
}

fn tier_block(tier: CreativityTier) -> String {
    let rules = match tier {
        CreativityTier::Guardian => format!(
            "- Responda EXCLUSIVAMENTE com base na base de conhecimento fornecida.\n\
             - Se a informação não estiver na base de conhecimento, responda exatamente: \"{}\"\n\
             - Sempre indique a fonte de cada informação utilizada.",
            GUARDIAN_REFUSAL
        ),
        CreativityTier::Balanced => "- Use a base de conhecimento como fonte principal.\n\
             - Você pode usar analogias simples para facilitar o entendimento.\n\
             - Não invente fatos que contradigam o material."
            .to_string(),
        CreativityTier::CreativePartner => "- Use analogias criativas, exemplos do cotidiano e conhecimento geral além do material.\n\
             - Mantenha sempre a precisão conceitual da matéria."
            .to_string(),
    };
    format!("{}\n{}", tier.header(), rules)
}
