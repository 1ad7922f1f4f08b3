//! LearnPal - adaptive tutoring service
//!
//! Runs the HTTP API, or a single lesson turn / progress report from the
//! command line against the local database.

use clap::{Parser, Subcommand};
use learnpal_core::{
    api::{ApiServer, ApiServerConfig},
    error::Result,
    AppConfig, HintTierController, LearnPalError, OpenAiGenerator, SqliteStore, Tutor,
    TutorStore,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, Level};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(name = "learnpal")]
#[command(about = "Adaptive tutoring service", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Set log level
    #[arg(short, long, env = "LEARNPAL_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Config file (defaults to ./learnpal.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Database path (overrides DATABASE_PATH env var and config file)
    #[arg(long)]
    db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Server address (overrides BIND_ADDR)
        #[arg(long)]
        addr: Option<String>,
    },

    /// Run one tutoring turn for a learner and print the reply as JSON
    Lesson {
        /// Learner ID
        learner_id: i64,

        /// What the learner said
        text: String,
    },

    /// Print a learner's progress report as JSON
    Progress {
        /// Learner ID
        learner_id: i64,
    },
}

async fn build_tutor(config: &AppConfig) -> Result<Tutor> {
    let store = SqliteStore::open(&config.database_path).await?;
    let seeded = store.seed_concepts().await?;
    if seeded > 0 {
        info!("Seeded {} starter concepts", seeded);
    }

    let generator = OpenAiGenerator::new(config.llm_config())?;
    if !generator.is_configured() {
        info!("OPENAI_API_KEY not set, tutor replies will use the fallback text");
    }

    Ok(Tutor::new(
        Arc::new(store),
        Arc::new(HintTierController::new(config.max_streak_entries)),
        Arc::new(generator),
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Use specified level for learnpal, but WARN for request tracing
    let filter = EnvFilter::new(format!(
        "learnpal={level},learnpal_core={level},tower_http=warn",
        level = level.as_str().to_lowercase()
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr) // Write logs to stderr, not stdout
        .init();

    debug!("LearnPal v{} starting...", env!("CARGO_PKG_VERSION"));

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(path) = cli.db_path {
        config.database_path = path;
    }
    debug!("Using database: {}", config.database_path.display());

    let tutor = build_tutor(&config).await?;

    match cli.command {
        Commands::Serve { addr } => {
            let addr = addr.unwrap_or_else(|| config.bind_addr.clone());
            let addr = addr.parse::<SocketAddr>().map_err(|e| {
                LearnPalError::InvalidInput(format!("Invalid server address {:?}: {}", addr, e))
            })?;

            let server = ApiServer::new(ApiServerConfig { addr }, Arc::new(tutor));

            // Run server with graceful shutdown on signals
            tokio::select! {
                result = server.serve() => {
                    result?;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal, stopping API server gracefully...");
                }
            }

            info!("API server shut down complete");
        }
        Commands::Lesson { learner_id, text } => {
            let reply = tutor.reply(learner_id, &text).await?;
            println!("{}", serde_json::to_string_pretty(&reply)?);
        }
        Commands::Progress { learner_id } => {
            let learner = tutor
                .store()
                .get_learner(learner_id)
                .await?
                .ok_or(LearnPalError::LearnerNotFound(learner_id))?;
            let report = tutor.store().progress_report(learner.id).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
