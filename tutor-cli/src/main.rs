//! tutor-cli: command-line client for the tutor HTTP API
//!
//! # Subcommands
//! - `chat <message> --assistant <id> --session <id>`: one chat turn
//! - `rate <review-id> <easy|medium|hard>`            : rate a review item
//! - `due --session <id> [-n <limit>]`                : list due reviews
//! - `feedback <turn-id> <up|down>`                   : score an answer
//! - `status`                                         : show server health

use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;

const DEFAULT_SERVER: &str = "http://127.0.0.1:8787";
const DEFAULT_DUE_LIMIT: u32 = 20;

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Debug, Parser)]
#[command(name = "tutor-cli", version, about = "Chat with a tutor assistant and review what you learned")]
struct Cli {
    /// Tutor HTTP server URL (overrides TUTOR_HTTP_URL env var)
    #[arg(long, env = "TUTOR_HTTP_URL", default_value = DEFAULT_SERVER)]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Practice,
    Activity,
    Command,
    Simulation,
    Life,
    StudyPlan,
}

impl ModeArg {
    /// Request field that switches this mode on.
    pub fn field(&self) -> &'static str {
        match self {
            ModeArg::Practice => "isPracticeMode",
            ModeArg::Activity => "isActivityGeneration",
            ModeArg::Command => "isCommand",
            ModeArg::Simulation => "isSimulation",
            ModeArg::Life => "isLifeConnection",
            ModeArg::StudyPlan => "isStudyPlan",
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Send one message to an assistant
    Chat {
        /// What the student asks
        message: String,

        #[arg(long)]
        assistant: String,

        #[arg(long)]
        session: String,

        /// Override the assistant's creativity level (0-100)
        #[arg(long)]
        creativity: Option<f64>,

        /// Ask for inline source citations
        #[arg(long)]
        citations: bool,

        /// Ask the assistant to explain its reasoning
        #[arg(long)]
        transparency: bool,

        #[arg(long)]
        anti_cheat: bool,

        /// Extra modes; repeat the flag for several
        #[arg(long = "mode", value_enum)]
        modes: Vec<ModeArg>,

        /// Print the raw JSON response
        #[arg(long)]
        json: bool,
    },

    /// Rate a review item
    Rate {
        review_id: String,

        /// easy, medium or hard
        difficulty: String,
    },

    /// List review items that are due now
    Due {
        #[arg(long)]
        session: String,

        #[arg(short = 'n', long, default_value_t = DEFAULT_DUE_LIMIT)]
        limit: u32,

        #[arg(long)]
        json: bool,
    },

    /// Thumbs up / down on an assistant answer
    Feedback {
        turn_id: String,

        /// up, down, 1 or -1
        score: String,
    },

    /// Show tutor server status
    Status,
}

// ============================================================================
// API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub response: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub citations: Vec<String>,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default)]
    pub extracted_topic: String,
    pub turn_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEntry {
    pub id: String,
    pub topic: String,
    pub next_review: String,
    pub difficulty: String,
    pub streak: u32,
}

#[derive(Debug, Deserialize)]
pub struct DueReply {
    pub items: Vec<ReviewEntry>,
    pub count: usize,
}

// ============================================================================
// Request building and output formatting (pure)
// ============================================================================

pub struct ChatOptions<'a> {
    pub assistant: &'a str,
    pub session: &'a str,
    pub creativity: Option<f64>,
    pub citations: bool,
    pub transparency: bool,
    pub anti_cheat: bool,
    pub modes: &'a [ModeArg],
}

/// Body for POST /chat. Settings the user did not pass are left out so the
/// assistant's stored guardrails apply.
pub fn build_chat_body(message: &str, opts: &ChatOptions<'_>) -> serde_json::Value {
    let mut settings = serde_json::Map::new();
    if let Some(level) = opts.creativity {
        settings.insert("creativityLevel".into(), serde_json::json!(level));
    }
    if opts.citations {
        settings.insert("citationMode".into(), serde_json::json!(true));
    }
    if opts.transparency {
        settings.insert("transparencyMode".into(), serde_json::json!(true));
    }
    if opts.anti_cheat {
        settings.insert("antiCheatMode".into(), serde_json::json!(true));
    }

    let mut body = serde_json::json!({
        "message": message,
        "assistantId": opts.assistant,
        "sessionId": opts.session,
        "conversationHistory": [],
        "assistantSettings": settings,
    });
    if let Some(obj) = body.as_object_mut() {
        for mode in opts.modes {
            obj.insert(mode.field().to_string(), serde_json::json!(true));
        }
    }
    body
}

pub fn format_chat_reply(reply: &ChatReply) -> String {
    let mut out = reply.response.clone();

    if !reply.citations.is_empty() {
        out.push_str("\n\nFontes:");
        for c in &reply.citations {
            out.push_str(&format!("\n  - {}", c));
        }
    }
    if !reply.extracted_topic.is_empty() {
        out.push_str(&format!("\n\nTópico para revisão: {}", reply.extracted_topic));
    }
    if !reply.suggestions.is_empty() {
        out.push_str("\n\nSugestões:");
        for (i, s) in reply.suggestions.iter().enumerate() {
            out.push_str(&format!("\n  {}. {}", i + 1, s));
        }
    }
    if let Some(id) = &reply.turn_id {
        out.push_str(&format!("\n\n(turn {})", id));
    }
    out
}

pub fn format_due(reply: &DueReply) -> String {
    if reply.items.is_empty() {
        return "Nothing due.".to_string();
    }
    let mut lines = vec![format!("{} item(s) due:", reply.count)];
    for item in &reply.items {
        lines.push(format!(
            "  {}  {:<30} {:<6} streak {}  (due {})",
            item.id, item.topic, item.difficulty, item.streak, item.next_review
        ));
    }
    lines.join("\n")
}

/// `up`/`down` or a literal `1`/`-1`.
pub fn parse_score(raw: &str) -> Option<i16> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "up" | "+1" | "1" => Some(1),
        "down" | "-1" => Some(-1),
        _ => None,
    }
}

// ============================================================================
// HTTP Client Calls
// ============================================================================

fn client(timeout_secs: u64) -> anyhow::Result<reqwest::blocking::Client> {
    Ok(reqwest::blocking::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()?)
}

/// Send a request and return the JSON body, exiting on transport or HTTP errors.
fn send_json(req: reqwest::blocking::RequestBuilder, url: &str) -> anyhow::Result<serde_json::Value> {
    let resp = match req.send() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("tutor-cli: connection failed to {}: {}", url, e);
            std::process::exit(1);
        }
    };

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().unwrap_or_default();
        eprintln!("tutor-cli: server returned {}: {}", status, body);
        std::process::exit(1);
    }

    Ok(resp.json()?)
}

fn do_chat(server: &str, message: &str, opts: &ChatOptions<'_>, json_output: bool) -> anyhow::Result<()> {
    let url = format!("{}/chat", server);
    let body = build_chat_body(message, opts);
    let value = send_json(client(120)?.post(&url).json(&body), &url)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let reply: ChatReply = serde_json::from_value(value)?;
    println!("{}", format_chat_reply(&reply));
    Ok(())
}

fn do_rate(server: &str, review_id: &str, difficulty: &str) -> anyhow::Result<()> {
    let url = format!("{}/reviews/{}/rate", server, review_id);
    let body = serde_json::json!({ "difficulty": difficulty });
    let value = send_json(client(30)?.post(&url).json(&body), &url)?;

    let item: ReviewEntry = serde_json::from_value(value)?;
    println!(
        "{}: {} (streak {}), next review {}",
        item.topic, item.difficulty, item.streak, item.next_review
    );
    Ok(())
}

fn do_due(server: &str, session: &str, limit: u32, json_output: bool) -> anyhow::Result<()> {
    let url = format!("{}/reviews/due", server);
    let req = client(30)?
        .get(&url)
        .query(&[("sessionId", session.to_string()), ("limit", limit.to_string())]);
    let value = send_json(req, &url)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let due: DueReply = serde_json::from_value(value)?;
    println!("{}", format_due(&due));
    Ok(())
}

fn do_feedback(server: &str, turn_id: &str, raw_score: &str) -> anyhow::Result<()> {
    let score = match parse_score(raw_score) {
        Some(s) => s,
        None => anyhow::bail!("score must be up, down, 1 or -1 (got '{}')", raw_score),
    };

    let url = format!("{}/turns/{}/feedback", server, turn_id);
    send_json(client(30)?.post(&url).json(&serde_json::json!({ "score": score })), &url)?;
    println!("Feedback recorded.");
    Ok(())
}

/// Show the server status by calling GET /health.
fn do_status(server: &str) -> anyhow::Result<()> {
    let url = format!("{}/health", server);
    let resp = client(10)?.get(&url).send();

    match resp {
        Ok(r) if r.status().is_success() => {
            let body: serde_json::Value = r.json().unwrap_or_default();
            println!("Tutor server: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("Version:      {}", body["version"].as_str().unwrap_or("?"));
            println!("Store:        {}", body["store"].as_str().unwrap_or("?"));
            println!("Details:      {}", body["details"].as_str().unwrap_or("?"));
        }
        Ok(r) => {
            let status = r.status();
            eprintln!("tutor-cli: server unhealthy (HTTP {})", status);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("tutor-cli: cannot reach {}: {}", url, e);
            std::process::exit(1);
        }
    }

    Ok(())
}

// ============================================================================
// Main
// ============================================================================

fn main() {
    let cli = Cli::parse();
    let server = cli.server.trim_end_matches('/').to_string();

    let result = match cli.command {
        Commands::Chat {
            message,
            assistant,
            session,
            creativity,
            citations,
            transparency,
            anti_cheat,
            modes,
            json,
        } => {
            let opts = ChatOptions {
                assistant: &assistant,
                session: &session,
                creativity,
                citations,
                transparency,
                anti_cheat,
                modes: &modes,
            };
            do_chat(&server, &message, &opts, json)
        }
        Commands::Rate { review_id, difficulty } => do_rate(&server, &review_id, &difficulty),
        Commands::Due { session, limit, json } => do_due(&server, &session, limit, json),
        Commands::Feedback { turn_id, score } => do_feedback(&server, &turn_id, &score),
        Commands::Status => do_status(&server),
    };

    if let Err(e) = result {
        eprintln!("tutor-cli: {}", e);
        std::process::exit(1);
    }
}

// ============================================================================
// Tests
// ============================================================================
