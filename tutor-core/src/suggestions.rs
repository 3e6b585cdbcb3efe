//! Follow-up suggestions shown under an assistant reply.
//!
//! Deterministic: the same topic and mode flags always give the same list.

use crate::composer::{Mode, ModeFlags};

pub const MAX_SUGGESTIONS: usize = 4;

const GENERIC: &[&str] = &[
    "Pode me dar um exemplo prático?",
    "Pode explicar de outra forma?",
    "Quais são os pontos mais importantes?",
    "Crie um exercício para eu praticar.",
];

/// Mode-specific follow-ups. `{}` is replaced by the topic, or by
/// "este conteúdo" when the reply carried no topic.
const MODE_SUGGESTIONS: &[(Mode, &str)] = &[
    (Mode::Practice, "Corrija minhas respostas sobre {}."),
    (Mode::Activity, "Crie outra atividade sobre {}."),
    (Mode::Command, "Resuma {} em tópicos."),
    (Mode::Simulation, "Continue a simulação sobre {}."),
    (Mode::LifeConnection, "Onde {} aparece no dia a dia?"),
    (Mode::StudyPlan, "Inclua revisões de {} no plano."),
];

const TOPIC_SUGGESTIONS: &[&str] = &[
    "Explique {} com um exemplo do cotidiano.",
    "Faça um quiz rápido sobre {}.",
    "Quais erros comuns os alunos cometem sobre {}?",
    "Como {} se conecta com o resto da matéria?",
];

fn fill(template: &str, topic: &str) -> String {
    template.replace("{}", topic)
}

/// Up to [`MAX_SUGGESTIONS`] follow-ups, mode entries first.
pub fn suggest(topic: Option<&str>, modes: &ModeFlags) -> Vec<String> {
    let subject = topic.unwrap_or("este conteúdo");

    let mut out: Vec<String> = MODE_SUGGESTIONS
        .iter()
        .filter(|(mode, _)| modes.is_set(*mode))
        .map(|(_, template)| fill(template, subject))
        .collect();

    match topic {
        Some(topic) => out.extend(TOPIC_SUGGESTIONS.iter().map(|t| fill(t, topic))),
        None => out.extend(GENERIC.iter().map(|s| s.to_string())),
    }

    out.truncate(MAX_SUGGESTIONS);
    out
}
