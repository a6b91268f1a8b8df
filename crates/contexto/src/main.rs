//! Contexto - terminal client
//!
//! Plays games against a ranking service and exposes its exploration
//! endpoints.

#![warn(missing_docs)]

mod cli;
mod play;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use contexto::{ClientConfig, HttpRankingClient, RankingService};
use tracing::{info, instrument};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = load_config(&cli.config, cli.base_url.clone())?;

    match cli.command {
        Command::Play { log_file } => {
            initialize_file_tracing(&log_file)?;
            play::run(config).await
        }
        Command::Similar { word, top_k } => {
            initialize_stderr_tracing();
            run_similar(config, word, top_k).await
        }
        Command::Stats { game_id } => {
            initialize_stderr_tracing();
            run_stats(config, game_id).await
        }
    }
}

/// Builds the effective configuration: file, then environment, then flags.
#[instrument(skip(config_path))]
fn load_config(
    config_path: &std::path::Path,
    base_url_override: Option<String>,
) -> Result<ClientConfig> {
    let config = if config_path.exists() {
        ClientConfig::from_file(config_path)?
    } else {
        ClientConfig::default()
    };

    let mut config = config.with_env_overrides()?;

    if let Some(url) = base_url_override {
        config = config.with_base_url(url);
    }

    Ok(config)
}

/// Logs to a file so tracing output does not interleave with the game.
fn initialize_file_tracing(path: &std::path::Path) -> Result<()> {
    let log_file = std::fs::File::create(path)?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,contexto=debug")),
        )
        .with_writer(std::sync::Arc::new(log_file))
        .with_ansi(false)
        .try_init();
    info!(path = %path.display(), "File tracing initialized");
    Ok(())
}

fn initialize_stderr_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[instrument(skip(config))]
async fn run_similar(config: ClientConfig, word: String, top_k: Option<u32>) -> Result<()> {
    let client = HttpRankingClient::new(&config);
    let top_k = top_k.unwrap_or(*config.similar_top_k());
    let similar = client.similar_words(&word, top_k).await?;

    println!("Closest to \"{}\":", contexto::normalize_word(&word));
    for (i, neighbour) in similar.similar_words.iter().enumerate() {
        println!("{:>3}. {:<20} {:>5.1}%", i + 1, neighbour.word, neighbour.score * 100.0);
    }
    Ok(())
}

#[instrument(skip(config))]
async fn run_stats(config: ClientConfig, game_id: String) -> Result<()> {
    let client = HttpRankingClient::new(&config);
    let stats = client.game_stats(&game_id).await?;

    println!("Game {} ({})", stats.game_id, stats.mode);
    if let Some(difficulty) = &stats.difficulty {
        println!("Difficulty: {}", difficulty);
    }
    println!("Started:    {}", stats.started_at);
    match &stats.completed_at {
        Some(done) => println!("Completed:  {}", done),
        None => println!("Completed:  -"),
    }
    println!("Won:        {}", if stats.won { "yes" } else { "no" });
    println!("Guesses:    {}", stats.total_guesses);
    for record in &stats.guess_history {
        println!("  #{:<6} {:<20} {}", record.rank, record.word, record.timestamp);
    }
    Ok(())
}
