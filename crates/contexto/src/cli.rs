//! Command-line interface for contexto.

use clap::{Parser, Subcommand};

/// Contexto - unlimited semantic word guessing in the terminal
#[derive(Parser, Debug)]
#[command(name = "contexto")]
#[command(about = "Play an unlimited semantic word-guessing game", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, global = true, default_value = "contexto.toml")]
    pub config: std::path::PathBuf,

    /// Ranking service URL (overrides config and environment)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Play games interactively
    Play {
        /// Log file (keeps log output off the game screen)
        #[arg(long, default_value = "contexto.log")]
        log_file: std::path::PathBuf,
    },

    /// List the words closest to a word in the service's vocabulary
    Similar {
        /// Word to explore
        word: String,

        /// Number of neighbours (defaults to the configured value)
        #[arg(long)]
        top_k: Option<u32>,
    },

    /// Show server-side statistics for a game
    Stats {
        /// Game identifier
        game_id: String,
    },
}
