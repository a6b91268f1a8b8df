//! Contexto client library - session control for an unlimited semantic
//! word-guessing game.
//!
//! A remote ranking service scores each guessed word by how close it is in
//! meaning to a hidden secret and answers with a rank (1 is the secret). This
//! crate owns everything on the player's side of that exchange.
//!
//! # Architecture
//!
//! - **Ranking client**: typed wrapper around the service's HTTP/JSON API
//! - **Request gates**: at most one in-flight request per class
//! - **Ledgers**: deduplicated, per-game records of guesses and hints
//! - **Session**: the state machine tying them together and producing
//!   display state
//!
//! # Example
//!
//! ```no_run
//! use contexto::{ClientConfig, HttpRankingClient, SessionController};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ClientConfig::new("http://localhost:8000");
//! let session = SessionController::new(HttpRankingClient::new(&config), &config);
//!
//! session.start_new_game().await;
//! session.submit_guess("ocean").await;
//! println!("{}", session.display_state().message);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod config;
mod error;
mod gate;
mod ledger;
mod model;
mod ranking;
mod session;

// Crate-level exports - Configuration
pub use config::{BASE_URL_ENV, ClientConfig, DIFFICULTY_ENV, MODE_ENV};

// Crate-level exports - Errors
pub use error::{ConfigError, RankingError, RankingErrorKind};

// Crate-level exports - Request gate
pub use gate::{GateGuard, RequestGate};

// Crate-level exports - Ledgers
pub use ledger::{GuessLedger, HintLedger, LedgerAppend, SortedGuesses};

// Crate-level exports - Domain and wire types
pub use model::{
    Difficulty, Explanation, Game, GameMode, GameStats, Guess, GuessRecord, GuessRequest,
    GuessResult, Hint, NewGameRequest, Reveal, SimilarWord, SimilarWords, normalize_word,
};

// Crate-level exports - Ranking service
pub use ranking::{HttpRankingClient, RankingService};

// Crate-level exports - Session management
pub use session::{
    DisplayState, IntentOutcome, Refusal, SessionController, SessionEvent, SessionPhase,
};
