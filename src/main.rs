//! Lookout CLI - replay recorded agent sessions, inspect configuration

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;

use lookout::config::mask_token;
use lookout::replay::{parse_recording, replay};
use lookout::{FixSuggestion, LookoutConfig, LookoutError, Snapshot};

#[derive(Parser)]
#[command(name = "lookout")]
#[command(about = "Lookout - sync engine for a remote coding-agent session")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded event stream and print the resulting state
    Replay {
        /// Path to a .ndjson recording
        file: PathBuf,

        /// Number of transcript lines to print
        #[arg(short, long, default_value_t = 10)]
        tail: usize,
    },

    /// Show the effective configuration
    Config {
        /// Print only the config file path
        #[arg(long)]
        path: bool,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (ignore if not present)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Replay { file, tail } => run_replay(&file, tail).await,
        Commands::Config { path } => show_config(path),
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        let suggestion = e
            .downcast_ref::<LookoutError>()
            .and_then(|e| e.fix_suggestion());
        if let Some(suggestion) = suggestion {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

async fn run_replay(file: &Path, tail: usize) -> anyhow::Result<()> {
    let text = tokio::fs::read_to_string(file)
        .await
        .map_err(LookoutError::from)
        .with_context(|| format!("reading {}", file.display()))?;
    let lines = parse_recording(&text)?;
    let config = LookoutConfig::load()?.with_env();

    println!(
        "{} Replaying {} line(s) from {}",
        "→".cyan(),
        lines.len(),
        file.display().to_string().cyan()
    );

    let snapshot = replay(lines, &config).await?;
    print_snapshot(&snapshot, tail);
    Ok(())
}

fn print_snapshot(snapshot: &Snapshot, tail: usize) {
    println!();
    println!("{}", "State".cyan().bold());
    println!("  connection: {}", snapshot.connection);
    println!("  agent:      {}", snapshot.claude_state.to_string().bold());
    println!(
        "  session:    {}",
        snapshot.session_id.as_deref().unwrap_or("(none)")
    );
    println!("  events:     {}", snapshot.events_applied);

    if let Some(pending) = &snapshot.pending {
        println!(
            "  pending:    {} {}",
            pending.request_id.yellow(),
            pending.prompt
        );
    }

    if !snapshot.logs.is_empty() {
        println!();
        println!("{} ({} total)", "Transcript".cyan().bold(), snapshot.logs.len());
        let skip = snapshot.logs.len().saturating_sub(tail);
        for entry in snapshot.transcript().skip(skip) {
            println!("  [{}] {}", entry.stream.label().dimmed(), entry.content);
        }
    }

    if !snapshot.diffs.is_empty() {
        println!();
        println!("{}", "Changes".cyan().bold());
        for diff in &snapshot.diffs {
            println!(
                "  {} {} {}{}",
                diff.status.marker().to_string().yellow(),
                diff.path,
                format!("+{}", diff.additions).green(),
                format!(" -{}", diff.deletions).red()
            );
        }
    }

    if let Some(error) = &snapshot.last_error {
        println!();
        println!("{} {}", "Last error:".red().bold(), error);
    }
}

fn show_config(path_only: bool) -> anyhow::Result<()> {
    let path = LookoutConfig::config_path();
    if path_only {
        println!("{}", path.display());
        return Ok(());
    }

    let config = LookoutConfig::load()?.with_env();
    println!("{} {}", "Config:".cyan().bold(), path.display());
    println!(
        "  server.url:             {}",
        config.server.url.as_deref().unwrap_or("(not set)")
    );
    println!(
        "  server.token:           {}",
        config
            .server
            .token
            .as_deref()
            .map(|t| mask_token(t, 6))
            .unwrap_or_else(|| "(not set)".to_string())
    );
    println!("  cache.max_log_entries:  {}", config.cache.max_log_entries);
    println!("  cache.max_diff_entries: {}", config.cache.max_diff_entries);
    println!("  search.debounce_ms:     {}", config.search.debounce_ms);
    println!("  search.min_query_len:   {}", config.search.min_query_len);
    println!("  history.page_size:      {}", config.history.page_size);
    println!("  history.max_pages:      {}", config.history.max_pages);
    Ok(())
}
