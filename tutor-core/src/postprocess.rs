//! Structured side-channel extraction from the model's free-text reply.
//!
//! Three independent passes, none of which can fail:
//! - review topic: first `[TÓPICO_REVISÃO: ...]` is captured, every marker is
//!   removed from the visible text
//! - citations (citation mode): every `(Fonte: ...)` in order, left inline
//! - reasoning (transparency mode): text after the reasoning heading up to a
//!   blank line or the end, left inline
//!
//! Only the first topic is kept even though all markers are stripped. The
//! chat UI relies on that, so the asymmetry stays.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::composer::{REASONING_HEADING, REVIEW_TOPIC_TAG};

static TOPIC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\[{}:\s*(.+?)\]", regex::escape(REVIEW_TOPIC_TAG)))
        .expect("valid topic regex")
});

static CITATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(Fonte: ([^)]+)\)").expect("valid citation regex"));

static REASONING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?s){}\s*(.*?)(?:\n[ \t]*\n|\z)",
        regex::escape(REASONING_HEADING)
    ))
    .expect("valid reasoning regex")
});

/// Visible reply plus whatever structured data was found in it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostprocessedReply {
    pub text: String,
    pub citations: Vec<String>,
    pub reasoning: String,
    pub extracted_topic: Option<String>,
}

pub fn postprocess(raw: &str, citation_mode: bool, transparency_mode: bool) -> PostprocessedReply {
    let (text, extracted_topic) = extract_topic(raw);

    let citations = if citation_mode {
        extract_citations(&text)
    } else {
        Vec::new()
    };

    let reasoning = if transparency_mode {
        extract_reasoning(&text)
    } else {
        String::new()
    };

    PostprocessedReply {
        text,
        citations,
        reasoning,
        extracted_topic,
    }
}

/// Returns the text with every topic marker removed and the first topic, if any.
/// Text without markers comes back unchanged.
pub fn extract_topic(raw: &str) -> (String, Option<String>) {
    let topic = TOPIC_RE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.is_empty());

    if !TOPIC_RE.is_match(raw) {
        return (raw.to_string(), topic);
    }

    let stripped = TOPIC_RE.replace_all(raw, "").trim().to_string();
    (stripped, topic)
}

pub fn extract_citations(text: &str) -> Vec<String> {
    CITATION_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

pub fn extract_reasoning(text: &str) -> String {
    REASONING_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}
