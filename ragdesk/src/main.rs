//! ragdesk - terminal client for a document Q&A service
//!
//! Commands:
//! - `type`: replay a chat answer with the typewriter effect
//! - `watch`: follow document processing until nothing is in flight
//! - `status`: list documents and their processing status
//! - `config`: show resolved paths and effective settings
//!
//! Uses XDG Base Directory specification for file locations:
//! - Config: $XDG_CONFIG_HOME/ragdesk/config.toml (~/.config/ragdesk/config.toml)
//! - Logs: $XDG_STATE_HOME/ragdesk/ragdesk.log (~/.local/state/ragdesk/ragdesk.log)

mod typewriter;
mod watch;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ragdesk_core::config::MAX_DELAY_MS;
use ragdesk_core::{Config, DocumentClient};

#[derive(Parser)]
#[command(name = "ragdesk")]
#[command(about = "Terminal client for a document Q&A service")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reveal text with the typewriter effect
    ///
    /// Keys (when attached to a terminal): space pause/resume, s or Enter
    /// skip, r replay, m toggle reduced motion, q or Esc quit.
    Type {
        /// Text to reveal (reads stdin when omitted)
        text: Option<String>,

        /// Read the text from a file
        #[arg(short, long, conflicts_with = "text")]
        file: Option<PathBuf>,

        /// Delay between characters in milliseconds (default: from config)
        #[arg(long)]
        base_delay: Option<u64>,

        /// Show the text at once
        #[arg(long)]
        reduced_motion: bool,
    },

    /// Follow document processing until every document is done
    Watch {
        /// Also poll these document ids (e.g. fresh uploads)
        #[arg(long = "id")]
        ids: Vec<String>,
    },

    /// List documents and their processing status
    Status,

    /// Show configuration paths and effective settings
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Initialize logging (to file, stdout belongs to the command)
    let _log_guard =
        ragdesk_core::logging::init(&config.logging).context("failed to initialize logging")?;

    match args.command {
        Command::Type {
            text,
            file,
            base_delay,
            reduced_motion,
        } => {
            let text = read_text(text, file)?;
            let mut options: ragdesk_core::RevealOptions = (&config.reveal).into();
            if let Some(base_delay) = base_delay {
                anyhow::ensure!(
                    (1..=MAX_DELAY_MS).contains(&base_delay),
                    "--base-delay must be between 1 and {}",
                    MAX_DELAY_MS
                );
                options.base_delay_ms = base_delay;
            }
            let reduced = reduced_motion || config.reveal.reduced_motion || reduced_motion_env();
            typewriter::run(text, options, reduced).await
        }
        Command::Watch { ids } => watch::run(&config, ids).await,
        Command::Status => cmd_status(&config).await,
        Command::Config => cmd_config(&config),
    }
}

/// Text from the argument, a file, or stdin.
fn read_text(text: Option<String>, file: Option<PathBuf>) -> Result<String> {
    if let Some(text) = text {
        return Ok(text);
    }
    if let Some(path) = file {
        return std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()));
    }
    let text = std::io::read_to_string(std::io::stdin()).context("failed to read stdin")?;
    Ok(text.trim_end_matches('\n').to_string())
}

/// Whether the environment asks for reduced motion.
///
/// `NO_MOTION` or `RAGDESK_REDUCED_MOTION` set to anything but empty, `0`
/// or `false`.
fn reduced_motion_env() -> bool {
    ["NO_MOTION", "RAGDESK_REDUCED_MOTION"].iter().any(|name| {
        std::env::var(name)
            .map(|value| !matches!(value.trim(), "" | "0" | "false"))
            .unwrap_or(false)
    })
}

async fn cmd_status(config: &Config) -> Result<()> {
    let client = DocumentClient::new(config.api.clone()).context("invalid [api] configuration")?;

    if !client.health_check().await? {
        tracing::warn!(base_url = client.base_url(), "Health check failed");
        eprintln!("Warning: {} did not pass its health check", client.base_url());
    }

    let documents = client
        .list_documents()
        .await
        .context("failed to list documents")?;

    if documents.is_empty() {
        println!("No documents.");
        return Ok(());
    }

    println!("{:<38} {:<11} {:<17} NAME", "ID", "STATUS", "UPLOADED");
    for doc in &documents {
        let uploaded = doc
            .created_at
            .map(|t| {
                t.with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M")
                    .to_string()
            })
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<38} {:<11} {:<17} {}",
            doc.id,
            doc.status,
            uploaded,
            doc.display_name()
        );
    }

    let pending = documents.iter().filter(|d| !d.status.is_terminal()).count();
    println!();
    println!("{} document(s), {} still processing", documents.len(), pending);

    Ok(())
}

fn cmd_config(config: &Config) -> Result<()> {
    println!("ragdesk Configuration");
    println!("=====================");
    println!();
    println!("Config file:     {}", Config::config_path().display());
    println!("Log file:        {}", Config::log_path().display());
    println!();

    println!("[api]");
    println!("  base_url:               {}", config.api.base_url);
    println!(
        "  api_key:                {}",
        if config.api.api_key.is_some() {
            "<set>"
        } else {
            "<not set>"
        }
    );
    println!("  timeout_secs:           {}", config.api.timeout_secs);

    let reveal = &config.reveal;
    println!("[reveal]");
    println!("  base_delay_ms:          {}", reveal.base_delay_ms);
    println!("  punctuation_pause_ms:   {}", reveal.punctuation_pause_ms);
    println!("  auto_skip_threshold:    {}", reveal.auto_skip_threshold);
    println!("  respect_reduced_motion: {}", reveal.respect_reduced_motion);
    println!(
        "  reduced_motion:         {}{}",
        reveal.reduced_motion,
        if !reveal.reduced_motion && reduced_motion_env() {
            " (overridden by environment)"
        } else {
            ""
        }
    );
    println!("  watchdog_ms:            {}", reveal.watchdog_ms);

    println!("[polling]");
    println!("  interval_ms:            {}", config.polling.interval_ms);
    println!("  status_retries:         {}", config.polling.status_retries);

    println!("[logging]");
    println!("  level:                  {}", config.logging.level);
    println!("  max_files:              {}", config.logging.max_files);

    Ok(())
}
