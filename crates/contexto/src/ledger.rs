//! Per-game records of accepted guesses and revealed hints.
//!
//! Both ledgers are owned by the session controller and only mutated from
//! it, so neither needs internal locking.

use crate::model::{Guess, Hint, normalize_word};
use tracing::{debug, instrument};

/// Result of appending to a ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerAppend {
    /// The entry was new and has been recorded.
    Added,
    /// An entry with the same word already exists; nothing changed.
    Duplicate,
}

/// Accepted guesses for the active game, unique by normalized word.
#[derive(Debug, Clone, Default)]
pub struct GuessLedger {
    guesses: Vec<Guess>,
}

impl GuessLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a guess unless its word is already present.
    #[instrument(skip(self, guess), fields(word = %guess.word, rank = guess.rank))]
    pub fn append(&mut self, mut guess: Guess) -> LedgerAppend {
        guess.word = normalize_word(&guess.word);
        if self.contains(&guess.word) {
            debug!("Duplicate guess suppressed");
            return LedgerAppend::Duplicate;
        }
        self.guesses.push(guess);
        debug!(len = self.guesses.len(), "Guess recorded");
        LedgerAppend::Added
    }

    /// Whether `word` (after normalization) has been recorded.
    pub fn contains(&self, word: &str) -> bool {
        self.get(word).is_some()
    }

    /// Looks up a guess by word.
    pub fn get(&self, word: &str) -> Option<&Guess> {
        let word = normalize_word(word);
        self.guesses.iter().find(|g| g.word == word)
    }

    /// Guesses ordered by ascending rank, ties in insertion order.
    ///
    /// The view borrows the ledger; clone it to iterate again from the start.
    pub fn sorted_view(&self) -> SortedGuesses<'_> {
        let mut order: Vec<usize> = (0..self.guesses.len()).collect();
        // Stable sort keeps insertion order among equal ranks.
        order.sort_by_key(|&i| self.guesses[i].rank);
        SortedGuesses {
            guesses: &self.guesses,
            order,
            next: 0,
        }
    }

    /// Guesses in the order they were accepted.
    pub fn iter(&self) -> impl Iterator<Item = &Guess> {
        self.guesses.iter()
    }

    /// Flips the detail-view flag of the guess matching `word`.
    ///
    /// Returns the new flag, or `None` when no such guess exists.
    #[instrument(skip(self))]
    pub fn toggle_expand(&mut self, word: &str) -> Option<bool> {
        let word = normalize_word(word);
        let guess = self.guesses.iter_mut().find(|g| g.word == word)?;
        guess.expanded = !guess.expanded;
        Some(guess.expanded)
    }

    /// Marks every recorded guess as belonging to a finished game.
    #[instrument(skip(self), fields(len = self.guesses.len()))]
    pub fn mark_game_over(&mut self) {
        for guess in &mut self.guesses {
            guess.game_over = true;
        }
    }

    /// Whether any recorded guess found the secret.
    pub fn has_winner(&self) -> bool {
        self.guesses.iter().any(Guess::won)
    }

    /// Empties the ledger for a new game.
    #[instrument(skip(self))]
    pub fn reset(&mut self) {
        self.guesses.clear();
    }

    /// Number of distinct guesses.
    pub fn len(&self) -> usize {
        self.guesses.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.guesses.is_empty()
    }
}

/// Rank-ordered view over a [`GuessLedger`].
#[derive(Debug, Clone)]
pub struct SortedGuesses<'a> {
    guesses: &'a [Guess],
    order: Vec<usize>,
    next: usize,
}

impl<'a> Iterator for SortedGuesses<'a> {
    type Item = &'a Guess;

    fn next(&mut self) -> Option<Self::Item> {
        let index = *self.order.get(self.next)?;
        self.next += 1;
        self.guesses.get(index)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.order.len() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SortedGuesses<'_> {}

/// Hints revealed for the active game, unique by word.
#[derive(Debug, Clone, Default)]
pub struct HintLedger {
    hints: Vec<Hint>,
}

impl HintLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a hint unless its word has already been shown.
    #[instrument(skip(self, hint), fields(word = %hint.word))]
    pub fn append(&mut self, mut hint: Hint) -> LedgerAppend {
        hint.word = normalize_word(&hint.word);
        if self.hints.iter().any(|h| h.word == hint.word) {
            debug!("Duplicate hint suppressed");
            return LedgerAppend::Duplicate;
        }
        self.hints.push(hint);
        LedgerAppend::Added
    }

    /// Hints in the order they were revealed.
    pub fn iter(&self) -> impl Iterator<Item = &Hint> {
        self.hints.iter()
    }

    /// Empties the ledger for a new game.
    pub fn reset(&mut self) {
        self.hints.clear();
    }

    /// Number of distinct hints.
    pub fn len(&self) -> usize {
        self.hints.len()
    }

    /// Whether no hint has been shown.
    pub fn is_empty(&self) -> bool {
        self.hints.is_empty()
    }
}
