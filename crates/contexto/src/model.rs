//! Domain and wire types shared by the ranking client and the session.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::instrument;

/// Trims whitespace and lower-cases a word.
///
/// Every word is normalized before it is compared against a ledger or sent
/// to the ranking service.
pub fn normalize_word(word: &str) -> String {
    word.trim().to_lowercase()
}

/// Which pool the secret word is drawn from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GameMode {
    /// A fresh random word for every game.
    #[default]
    Practice,
    /// The shared word of the day. Difficulty is ignored by the server.
    Daily,
}

/// Size of the word pool the secret is drawn from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Difficulty {
    /// Most common words.
    Easy,
    /// Middle of the frequency list.
    #[default]
    Medium,
    /// Rare words.
    Hard,
}

/// Body of `POST /game/new`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NewGameRequest {
    /// Requested mode.
    pub mode: GameMode,
    /// Requested difficulty.
    pub difficulty: Difficulty,
}

/// A game as issued by the ranking service.
///
/// Replaced wholesale on every new game, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    /// Opaque server-issued identifier.
    pub game_id: String,
    /// Mode the game was started in.
    #[serde(default)]
    pub mode: GameMode,
    /// Difficulty the game was started with. Not echoed by every server.
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Hint shown at creation, e.g. the letter count.
    #[serde(default)]
    pub hint: String,
    /// Human-readable status message.
    #[serde(default)]
    pub message: String,
}

/// Body of `POST /game/guess`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuessRequest {
    /// Game the guess belongs to.
    pub game_id: String,
    /// Normalized guess.
    pub word: String,
}

/// Contribution of one scoring layer to a guess's similarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    /// Layer name, e.g. "semantic".
    pub layer: String,
    /// Display icon for the layer.
    #[serde(default)]
    pub icon: String,
    /// Contribution in `[0, 1]`.
    pub score: f64,
    /// Free-text explanation of the layer's verdict.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

/// Server verdict on a single guess.
///
/// Either a scored guess or a semantic rejection carrying `error`/`message`
/// and rank `-1`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GuessResult {
    /// Echo of the guessed word, when the server includes it.
    #[serde(default)]
    pub word: Option<String>,
    /// Rank of the word; 1 is the secret, -1 marks a rejection.
    #[serde(default = "rejected_rank")]
    pub rank: i64,
    /// Similarity in `[0, 1]`.
    #[serde(default)]
    pub score: f64,
    /// Whether this guess found the secret.
    #[serde(default)]
    pub won: bool,
    /// Guesses made in this game so far.
    #[serde(default)]
    pub total_guesses: Option<u32>,
    /// Size of the ranked vocabulary.
    #[serde(default)]
    pub total_words: Option<u32>,
    /// Per-layer breakdown for the detail view.
    #[serde(default)]
    pub explanations: Option<Vec<Explanation>>,
    /// Rejection reason; presence marks a semantic rejection.
    #[serde(default)]
    pub error: Option<String>,
    /// User-facing message accompanying a rejection.
    #[serde(default)]
    pub message: Option<String>,
}

fn rejected_rank() -> i64 {
    -1
}

impl GuessResult {
    /// Whether the server refused to score this word.
    ///
    /// Only an `error` field or the `-1` sentinel rank mark a rejection.
    #[instrument(skip(self), fields(rank = self.rank))]
    pub fn is_rejected(&self) -> bool {
        self.error.is_some() || self.rank == -1
    }

    /// Whether this verdict found the secret.
    ///
    /// Servers report the secret itself as rank 0 or rank 1, with `won` set.
    pub fn is_win(&self) -> bool {
        !self.is_rejected() && (self.won || (0..=1).contains(&self.rank))
    }
}

/// An accepted guess, as kept in the guess ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Guess {
    /// Normalized word.
    pub word: String,
    /// Rank, 1 being the secret.
    pub rank: u32,
    /// Similarity in `[0, 1]`.
    pub score: f64,
    /// Per-layer breakdown.
    #[serde(default)]
    pub explanations: Vec<Explanation>,
    /// Whether the detail view is open.
    #[serde(skip)]
    pub expanded: bool,
    /// Set once the secret has been revealed. Never cleared.
    #[serde(skip)]
    pub game_over: bool,
}

impl Guess {
    /// Builds a ledger entry from an accepted server verdict.
    ///
    /// Returns `None` for rejected verdicts and for negative ranks.
    /// A winning verdict is stored as rank 1.
    #[instrument(skip(result))]
    pub fn from_result(word: &str, result: &GuessResult) -> Option<Self> {
        if result.is_rejected() {
            return None;
        }
        let rank = if result.is_win() {
            1
        } else {
            u32::try_from(result.rank).ok()?
        };
        Some(Self {
            word: normalize_word(word),
            rank,
            score: result.score,
            explanations: result.explanations.clone().unwrap_or_default(),
            expanded: false,
            game_over: false,
        })
    }

    /// True iff this guess is the secret word.
    pub fn won(&self) -> bool {
        self.rank == 1
    }
}

/// A revealed hint word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hint {
    /// Normalized hint word.
    pub word: String,
    /// Similarity to the secret, 0 to 100.
    pub percent: f64,
}

/// Body of `GET /reveal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reveal {
    /// The secret word.
    pub secret: String,
}

/// One entry of a game's server-side guess history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuessRecord {
    /// Guessed word.
    pub word: String,
    /// Rank the server assigned.
    pub rank: i64,
    /// Similarity score.
    pub score: f64,
    /// ISO 8601 timestamp.
    pub timestamp: String,
}

/// Body of `GET /game/{game_id}/stats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameStats {
    /// Game identifier.
    pub game_id: String,
    /// Mode the game was started in.
    pub mode: GameMode,
    /// Difficulty, absent for daily games on some servers.
    #[serde(default)]
    pub difficulty: Option<String>,
    /// Number of scored guesses.
    pub total_guesses: u32,
    /// ISO 8601 start time.
    pub started_at: String,
    /// ISO 8601 completion time, once won.
    #[serde(default)]
    pub completed_at: Option<String>,
    /// Whether the secret was found.
    pub won: bool,
    /// Every guess the server scored.
    #[serde(default)]
    pub guess_history: Vec<GuessRecord>,
}

/// A neighbour returned by the similar-words exploration endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarWord {
    /// Neighbouring word.
    pub word: String,
    /// Similarity score.
    pub score: f64,
}

/// Body of `GET /similar/{word}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarWords {
    /// Neighbours, closest first.
    pub similar_words: Vec<SimilarWord>,
}
