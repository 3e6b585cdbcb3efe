use std::sync::Arc;

use clap::Parser;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};
use tutor_core::{InMemoryStore, LlmBackend, PgStore, SeedFile, TutorConfig, TutorStore};

use tutor_server::http::{start_http_server, HttpState};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "tutor.toml")]
    config: String,

    /// Check the database connection and exit
    #[arg(long)]
    health: bool,

    /// Keep everything in memory instead of Postgres (nothing survives a restart)
    #[arg(long)]
    memory_store: bool,

    /// TOML file of assistants and knowledge snippets to load at startup
    #[arg(long)]
    seed: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience; production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let config = match TutorConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging; RUST_LOG wins over service.log_level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_env_filter(filter).init();

    let store: Arc<dyn TutorStore> = if args.memory_store {
        tracing::warn!("Running on the in-memory store; data is lost on exit");
        Arc::new(InMemoryStore::new())
    } else {
        let pool = match tutor_core::db::create_pool(&config.database).await {
            Ok(p) => p,
            Err(e) => {
                eprintln!("Failed to connect to database: {}", e);
                std::process::exit(1);
            }
        };

        if args.health {
            match tutor_core::db::health_check(&pool).await {
                Ok(v) => println!("✅ PostgreSQL connected: {}", v),
                Err(e) => {
                    println!("❌ PostgreSQL connection failed: {}", e);
                    std::process::exit(1);
                }
            }
            println!("✅ Tutor DB health check passed");
            return Ok(());
        }

        tutor_core::db::run_migrations(&pool).await?;
        Arc::new(PgStore::new(pool, config.review.default_creativity_level))
    };

    if args.health {
        println!("✅ {}", store.health().await?);
        return Ok(());
    }

    if let Some(path) = &args.seed {
        let seed = match SeedFile::load(path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("Failed to load seed file {}: {}", path, e);
                std::process::exit(1);
            }
        };
        let summary = seed
            .apply(store.as_ref(), config.review.default_creativity_level)
            .await?;
        tracing::info!(
            path = %path,
            assistants = summary.assistants,
            snippets_added = summary.snippets_added,
            "Seed data loaded"
        );
    } else if args.memory_store {
        tracing::warn!("In-memory store started without --seed; /chat has no assistants to answer for");
    }

    let llm: Arc<dyn LlmBackend> = match tutor_core::create_backend(&config.llm) {
        Ok(backend) => Arc::from(backend),
        Err(e) => {
            eprintln!("Failed to create LLM backend: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!(store = store.name(), llm = llm.name(), model = %config.llm.model, "Backends ready");

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for Ctrl+C");
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    if !config.http.enabled {
        tracing::warn!("HTTP API disabled in config; nothing to serve");
        return Ok(());
    }

    let state = Arc::new(HttpState { store, llm, config });
    start_http_server(state, tx.subscribe()).await?;

    Ok(())
}
