//! IdeaCheck CLI: patentability pre-check from the terminal.
//!
//! Runs the keyword, analysis and suggestion flows once per invocation, or
//! serves them over HTTP with `ideacheck serve`.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// IdeaCheck: is your invention idea likely patentable?
#[derive(Parser, Debug)]
#[command(name = "ideacheck", version, about, long_about = None)]
struct Cli {
    /// LLM model to use
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// LLM provider: gemini or openai (any OpenAI-compatible endpoint)
    #[arg(short, long, global = true)]
    provider: Option<String>,

    /// Workspace directory (holds .ideacheck/config.toml)
    #[arg(short, long, default_value = ".", global = true)]
    workspace: PathBuf,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where the idea description comes from: an argument, a file, or stdin with `-`.
#[derive(clap::Args, Debug, Clone)]
struct IdeaArgs {
    /// Idea description, or `-` to read it from stdin
    idea: Option<String>,

    /// Read the idea description from a file
    #[arg(short, long, conflicts_with = "idea")]
    file: Option<PathBuf>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Serve the flows over HTTP
    Serve {
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
        /// Allow cross-origin requests from any origin
        #[arg(long)]
        cors: bool,
    },
    /// Generate keywords for an idea
    Keywords {
        #[command(flatten)]
        idea: IdeaArgs,
        /// Print the raw JSON output
        #[arg(long)]
        json: bool,
    },
    /// Analyze the patentability of an idea
    Analyze {
        #[command(flatten)]
        idea: IdeaArgs,
        /// Comma-separated keywords for a more targeted analysis
        #[arg(short, long)]
        keywords: Option<String>,
        /// Generate keywords first when none are given
        #[arg(long, conflicts_with = "quick")]
        auto_keywords: bool,
        /// Quick check: analyze the idea alone, without keywords
        #[arg(long, conflicts_with = "keywords")]
        quick: bool,
        /// Refine the improvement suggestions afterwards
        #[arg(long)]
        refine: bool,
        /// Check that cited resource links resolve
        #[arg(long)]
        verify_links: bool,
        /// Print the raw JSON output
        #[arg(long)]
        json: bool,
    },
    /// Refine suggestions from free-text analysis results
    Suggest {
        #[command(flatten)]
        idea: IdeaArgs,
        /// Prior analysis results as free text
        #[arg(short, long, required_unless_present = "analysis_file")]
        analysis: Option<String>,
        /// Read the prior analysis results from a file
        #[arg(long, conflicts_with = "analysis")]
        analysis_file: Option<PathBuf>,
        /// Comma-separated keywords
        #[arg(short, long)]
        keywords: String,
        /// Print the raw JSON output
        #[arg(long)]
        json: bool,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Create a default configuration file in the workspace
    Init,
    /// Show the current configuration
    Show,
    /// Show where configuration files are read from
    Path,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Set up tracing: human-readable stderr + JSON file logging
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)));

    let log_dir = directories::ProjectDirs::from("dev", "ideacheck", "ideacheck")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "ideacheck.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    let overrides = commands::Overrides {
        model: cli.model,
        provider: cli.provider,
    };
    commands::handle_command(cli.command, &workspace, &overrides).await
}
