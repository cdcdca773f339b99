mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "assessor-cli")]
#[command(about = "Assessor CLI - Extract test cases, prepare harnesses, grade submissions, and analyse progress", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the test cases found in a problem statement
    Extract {
        /// Statement file ("-" reads stdin)
        #[arg(short, long)]
        statement: String,

        /// Print JSON instead of a table
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Print the prepared source that would be submitted for execution
    Wrap {
        /// Language (python, javascript, java)
        #[arg(short, long)]
        language: String,

        /// Candidate source file ("-" reads stdin)
        #[arg(short, long)]
        source: String,
    },

    /// Grade a submission against the statement's examples
    Run {
        /// Statement file
        #[arg(long)]
        statement: String,

        /// Candidate source file
        #[arg(short, long)]
        source: String,

        /// Language (python, javascript, java)
        #[arg(short, long)]
        language: String,

        /// Execution service base URL (overrides EXECUTION_API_URL)
        #[arg(long)]
        api_url: Option<String>,

        /// Per-case timeout in milliseconds (overrides EXECUTION_TIMEOUT_MS)
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Print the RunSummary as JSON
        #[arg(long, default_value = "false")]
        json: bool,
    },

    /// Aggregate an attempt history (JSON array of attempt records)
    Progress {
        /// Attempts file ("-" reads stdin)
        #[arg(short, long)]
        attempts: String,

        /// Trend window in days (overrides TREND_WINDOW_DAYS)
        #[arg(short, long)]
        window_days: Option<u32>,

        /// Reference time (RFC 3339), defaults to now
        #[arg(long)]
        now: Option<String>,
    },

    /// List the runtime mapping used for the execution service
    Languages {
        /// Path to languages.json (overrides LANGUAGES_CONFIG)
        #[arg(short, long)]
        config: Option<String>,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Extract { statement, json } => {
            commands::extract_cases(&statement, json)?;
        }
        Commands::Wrap { language, source } => {
            commands::wrap_source(&language, &source)?;
        }
        Commands::Run {
            statement,
            source,
            language,
            api_url,
            timeout_ms,
            json,
        } => {
            commands::run_submission(&statement, &source, &language, api_url, timeout_ms, json).await?;
        }
        Commands::Progress {
            attempts,
            window_days,
            now,
        } => {
            commands::progress_report(&attempts, window_days, now.as_deref())?;
        }
        Commands::Languages { config } => {
            commands::list_languages(config.as_deref())?;
        }
    }

    Ok(())
}
