use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};

use replus::api::{self, AppState};
use replus::config::{Overrides, ReplusConfig, Settings};
use replus_db::Database;
use replus_logging::{init_tracing, LogFormat};

#[derive(Parser, Debug)]
#[command(name = "replus", about = "Workout tracking server", version, author)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API
    Serve(ServeArgs),
    /// Write a default replus.toml in the current directory
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to bind (default: 127.0.0.1)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (default: 8000)
    #[arg(short, long)]
    port: Option<u16>,

    /// Path to the SQLite database
    #[arg(short, long)]
    database: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum)]
    log_format: Option<LogFormatChoice>,

    /// Log level filter, e.g. "debug" or "replus=trace"
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let working_dir = std::env::current_dir().context("Failed to get current directory")?;

    match cli.command {
        Commands::Serve(args) => serve(args, &working_dir).await,
        Commands::Init { force } => {
            let path = ReplusConfig::write_default(&working_dir, force)?;
            eprintln!("Wrote {}", path.display());
            Ok(())
        }
    }
}

async fn serve(args: ServeArgs, working_dir: &Path) -> Result<()> {
    let config = ReplusConfig::load(working_dir)?.unwrap_or_default();
    let settings = Settings::resolve(
        &config,
        Overrides {
            host: args.host,
            port: args.port,
            database: args.database,
            log_level: args.log_level,
            log_format: args.log_format.map(Into::into),
        },
        working_dir,
    );

    init_tracing(&settings.log_level, settings.log_format);

    let db = Database::open_at(&settings.database).with_context(|| {
        format!(
            "Failed to open database at {}",
            settings.database.display()
        )
    })?;

    let purged = db
        .users()
        .purge_tokens_before(Utc::now() - settings.token_ttl)
        .context("Failed to purge expired tokens")?;
    if purged > 0 {
        tracing::info!(count = purged, "Purged expired tokens");
    }

    let state = AppState::new(Arc::new(db), settings.token_ttl);
    let router = api::create_router(state);

    let addr = settings.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind API server to {}", addr))?;

    tracing::info!(
        addr = %addr,
        database = %settings.database.display(),
        "Listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
