//! Game session controller.
//!
//! Owns the active [`Game`], the guess and hint ledgers and the status
//! message, and serializes player intents against two request gates: one for
//! game-mutating calls (new game, guess, reveal) and one for hints. A busy
//! gate refuses the intent instead of queueing it.

use crate::config::ClientConfig;
use crate::gate::RequestGate;
use crate::ledger::{GuessLedger, HintLedger, LedgerAppend};
use crate::model::{Difficulty, Game, GameMode, Guess, Hint, normalize_word};
use crate::ranking::RankingService;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument, warn};

const EVENT_CAPACITY: usize = 64;

/// Lifecycle of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// No game.
    #[default]
    Idle,
    /// A new-game request is in flight.
    Starting,
    /// A game is being played.
    Active,
    /// A reveal request is in flight.
    Revealing,
    /// The secret has been guessed.
    GameWon,
}

/// Why an intent was turned away without effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    /// A new game, guess or reveal is already in flight.
    GameRequestInFlight,
    /// A hint request is already in flight.
    HintRequestInFlight,
    /// The intent needs a game in a phase other than the current one.
    NotActive(SessionPhase),
    /// The guess was blank after trimming.
    EmptyWord,
    /// The secret has already been found, so there is nothing to give up.
    AlreadyWon,
    /// The player did not confirm giving up.
    NotConfirmed,
}

/// What an intent did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentOutcome {
    /// The server answered and the session was updated.
    Applied,
    /// The server answered with something already recorded; ledgers unchanged.
    Duplicate,
    /// The server refused the word.
    Rejected,
    /// The request failed in transport.
    Failed,
    /// The answer belonged to a game that has since been replaced.
    Stale,
    /// Nothing was sent.
    Refused(Refusal),
}

/// Notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A new game replaced the previous one.
    GameStarted {
        /// Identifier of the new game.
        game_id: String,
    },
    /// A guess request finished; input focus can return to the entry field.
    GuessSettled,
    /// The secret was guessed.
    Won {
        /// Guesses it took.
        total_guesses: u32,
    },
    /// A new hint was added to the hint ledger.
    HintRevealed(Hint),
    /// The player gave up and the secret was disclosed.
    SecretRevealed {
        /// The secret word.
        secret: String,
    },
}

/// Snapshot of everything a front end needs to draw the game.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayState {
    /// Current lifecycle phase.
    pub phase: SessionPhase,
    /// Active game, if any.
    pub game: Option<Game>,
    /// Status line.
    pub message: String,
    /// A new game, guess or reveal is in flight.
    pub loading: bool,
    /// A hint request is in flight.
    pub hint_loading: bool,
    /// Accepted guesses, closest first.
    pub guesses: Vec<Guess>,
    /// Hints in the order they were revealed.
    pub hints: Vec<Hint>,
    /// Whether giving up is still offered.
    pub can_give_up: bool,
}

#[derive(Debug, Default)]
struct SessionState {
    phase: SessionPhase,
    game: Option<Game>,
    guesses: GuessLedger,
    hints: HintLedger,
    message: String,
}

fn lock_state(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    // Ledger updates are plain field writes, so a poisoned lock still
    // holds consistent data.
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Switches to a transient phase and switches back on drop unless disarmed.
///
/// An intent future dropped while its request is in flight would otherwise
/// leave the controller in `Starting` or `Revealing` for good.
struct PhaseRestore<'a> {
    state: &'a Mutex<SessionState>,
    phase: SessionPhase,
    message: String,
    armed: bool,
}

impl<'a> PhaseRestore<'a> {
    fn enter(state: &'a Mutex<SessionState>, phase: SessionPhase, message: Option<&str>) -> Self {
        let mut guard = lock_state(state);
        let restore = Self {
            state,
            phase: guard.phase,
            message: guard.message.clone(),
            armed: true,
        };
        guard.phase = phase;
        if let Some(message) = message {
            guard.message = message.to_string();
        }
        restore
    }

    /// The answer arrived; the caller sets the next phase itself.
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PhaseRestore<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        warn!(phase = ?self.phase, "Request abandoned in flight, restoring phase");
        let mut state = lock_state(self.state);
        state.phase = self.phase;
        state.message = std::mem::take(&mut self.message);
    }
}

impl SessionState {
    fn game_id(&self) -> Option<String> {
        self.game.as_ref().map(|g| g.game_id.clone())
    }

    fn clear(&mut self) {
        self.game = None;
        self.guesses.reset();
        self.hints.reset();
    }
}

/// Drives one player's game against a [`RankingService`].
///
/// Intents take `&self` so a front end can issue them concurrently from one
/// event loop; the gates decide which ones go through.
#[derive(Debug)]
pub struct SessionController<S> {
    service: S,
    mode: GameMode,
    difficulty: Difficulty,
    state: Mutex<SessionState>,
    game_gate: RequestGate,
    hint_gate: RequestGate,
    events: broadcast::Sender<SessionEvent>,
}

impl<S: RankingService> SessionController<S> {
    /// Creates an idle controller using the game settings from `config`.
    #[instrument(skip(service, config))]
    pub fn new(service: S, config: &ClientConfig) -> Self {
        Self::with_game_settings(service, *config.mode(), *config.difficulty())
    }

    /// Creates an idle controller that starts games with `mode` and `difficulty`.
    #[instrument(skip(service))]
    pub fn with_game_settings(service: S, mode: GameMode, difficulty: Difficulty) -> Self {
        info!("Creating session controller");
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            service,
            mode,
            difficulty,
            state: Mutex::new(SessionState::default()),
            game_gate: RequestGate::new("game"),
            hint_gate: RequestGate::new("hint"),
            events,
        }
    }

    /// The ranking service this controller talks to.
    pub fn service(&self) -> &S {
        &self.service
    }

    /// Receives [`SessionEvent`]s emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        lock_state(&self.state)
    }

    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            debug!("No event subscribers");
        }
    }

    /// Starts a new game, replacing whatever was there.
    ///
    /// On failure the controller drops back to [`SessionPhase::Idle`]. If the
    /// returned future is dropped before the answer arrives, the previous
    /// phase and game are kept.
    #[instrument(skip(self), fields(mode = %self.mode, difficulty = %self.difficulty))]
    pub async fn start_new_game(&self) -> IntentOutcome {
        let Some(_gate) = self.game_gate.try_acquire() else {
            warn!("New game refused, request in flight");
            return IntentOutcome::Refused(Refusal::GameRequestInFlight);
        };

        let restore = PhaseRestore::enter(
            &self.state,
            SessionPhase::Starting,
            Some("Starting new game..."),
        );

        let result = self.service.start_game(self.mode, self.difficulty).await;
        restore.disarm();

        let mut state = self.state();
        match result {
            Ok(game) => {
                info!(game_id = %game.game_id, "New game started");
                state.guesses.reset();
                state.hints.reset();
                state.message = format!("{} | Hint: {}", game.message, game.hint);
                let game_id = game.game_id.clone();
                state.game = Some(game);
                state.phase = SessionPhase::Active;
                drop(state);
                self.emit(SessionEvent::GameStarted { game_id });
                IntentOutcome::Applied
            }
            Err(e) => {
                error!(error = %e, "Failed to start game");
                state.clear();
                state.phase = SessionPhase::Idle;
                state.message = "Failed to start game".to_string();
                IntentOutcome::Failed
            }
        }
    }

    /// Submits a guess for the active game.
    ///
    /// Blank input is refused without contacting the server.
    #[instrument(skip(self))]
    pub async fn submit_guess(&self, word: &str) -> IntentOutcome {
        let word = normalize_word(word);
        if word.is_empty() {
            debug!("Ignoring empty guess");
            return IntentOutcome::Refused(Refusal::EmptyWord);
        }

        let Some(gate) = self.game_gate.try_acquire() else {
            warn!(word = %word, "Guess refused, request in flight");
            return IntentOutcome::Refused(Refusal::GameRequestInFlight);
        };

        let outcome = self.run_guess(&word).await;
        drop(gate);

        if !matches!(outcome, IntentOutcome::Refused(_)) {
            self.emit(SessionEvent::GuessSettled);
        }
        outcome
    }

    async fn run_guess(&self, word: &str) -> IntentOutcome {
        let game_id = {
            let mut state = self.state();
            if state.phase != SessionPhase::Active {
                warn!(phase = ?state.phase, "Guess refused, no active game");
                return IntentOutcome::Refused(Refusal::NotActive(state.phase));
            }
            let Some(game_id) = state.game_id() else {
                return IntentOutcome::Refused(Refusal::NotActive(state.phase));
            };
            state.message = "Thinking...".to_string();
            game_id
        };

        let result = self.service.submit_guess(&game_id, word).await;

        let mut state = self.state();
        let result = match result {
            Ok(result) => result,
            Err(e) => {
                error!(error = %e, word, "Guess request failed");
                state.message = "Error submitting guess".to_string();
                return IntentOutcome::Failed;
            }
        };

        let Some(guess) = Guess::from_result(word, &result) else {
            warn!(word, rank = result.rank, error = ?result.error, "Guess rejected");
            state.message = result
                .message
                .clone()
                .unwrap_or_else(|| "Invalid word".to_string());
            return IntentOutcome::Rejected;
        };

        let rank = guess.rank;
        let won = guess.won();
        match state.guesses.append(guess) {
            LedgerAppend::Duplicate => {
                info!(word, rank, "Guess already recorded");
                state.message = format!("You already guessed \"{}\" (#{})", word, rank);
                IntentOutcome::Duplicate
            }
            LedgerAppend::Added if won => {
                let total_guesses = result
                    .total_guesses
                    .unwrap_or_else(|| u32::try_from(state.guesses.len()).unwrap_or(u32::MAX));
                info!(word, total_guesses, "Secret found");
                state.phase = SessionPhase::GameWon;
                state.message = format!("You won in {} guesses!", total_guesses);
                drop(state);
                self.emit(SessionEvent::Won { total_guesses });
                IntentOutcome::Applied
            }
            LedgerAppend::Added => {
                debug!(word, rank, "Guess recorded");
                state.message = match result.total_words {
                    Some(total) => format!("#{} out of {}", rank, total),
                    None => format!("#{}", rank),
                };
                IntentOutcome::Applied
            }
        }
    }

    /// Asks the server for a hint word.
    ///
    /// Runs under its own gate, so it neither waits for nor blocks guesses.
    #[instrument(skip(self))]
    pub async fn fetch_hint(&self) -> IntentOutcome {
        let Some(_gate) = self.hint_gate.try_acquire() else {
            warn!("Hint refused, request in flight");
            return IntentOutcome::Refused(Refusal::HintRequestInFlight);
        };

        let game_id = {
            let state = self.state();
            match (state.phase, state.game_id()) {
                (SessionPhase::Active | SessionPhase::GameWon, Some(id)) => id,
                (phase, _) => {
                    warn!(phase = ?phase, "Hint refused, no game");
                    return IntentOutcome::Refused(Refusal::NotActive(phase));
                }
            }
        };

        let result = self.service.fetch_hint(&game_id).await;

        let mut state = self.state();
        if state.game_id().as_deref() != Some(game_id.as_str()) {
            info!(game_id = %game_id, "Discarding hint for replaced game");
            return IntentOutcome::Stale;
        }

        match result {
            Ok(hint) => {
                let hint = Hint {
                    word: normalize_word(&hint.word),
                    ..hint
                };
                self.apply_hint(state, hint)
            }
            Err(e) => {
                error!(error = %e, "Hint request failed");
                state.message = "No more strong hints available".to_string();
                IntentOutcome::Failed
            }
        }
    }

    fn apply_hint(&self, mut state: MutexGuard<'_, SessionState>, hint: Hint) -> IntentOutcome {
        match state.hints.append(hint.clone()) {
            LedgerAppend::Added => {
                info!(word = %hint.word, percent = hint.percent, "Hint revealed");
                state.message = format!("Hint: \"{}\" is {}% similar", hint.word, hint.percent);
                drop(state);
                self.emit(SessionEvent::HintRevealed(hint));
                IntentOutcome::Applied
            }
            LedgerAppend::Duplicate => {
                info!(word = %hint.word, "Hint already shown");
                state.message = "Already showed that hint!".to_string();
                IntentOutcome::Duplicate
            }
        }
    }

    /// Gives up and reveals the secret word.
    ///
    /// `confirm` is asked only once every other precondition holds; returning
    /// `false` cancels. Refused once the secret has been guessed.
    #[instrument(skip(self, confirm))]
    pub async fn reveal<F>(&self, confirm: F) -> IntentOutcome
    where
        F: FnOnce() -> bool,
    {
        let game_id = {
            let state = self.state();
            if state.guesses.has_winner() {
                warn!("Reveal refused, game already won");
                return IntentOutcome::Refused(Refusal::AlreadyWon);
            }
            match (state.phase, state.game_id()) {
                (SessionPhase::Active, Some(id)) => id,
                (phase, _) => {
                    warn!(phase = ?phase, "Reveal refused, no active game");
                    return IntentOutcome::Refused(Refusal::NotActive(phase));
                }
            }
        };

        let Some(_gate) = self.game_gate.try_acquire() else {
            warn!("Reveal refused, request in flight");
            return IntentOutcome::Refused(Refusal::GameRequestInFlight);
        };

        if !confirm() {
            debug!("Reveal not confirmed");
            return IntentOutcome::Refused(Refusal::NotConfirmed);
        }

        let restore = PhaseRestore::enter(&self.state, SessionPhase::Revealing, None);

        let result = self.service.reveal(&game_id).await;
        restore.disarm();

        let mut state = self.state();
        state.phase = SessionPhase::Active;
        match result {
            Ok(reveal) => {
                info!(game_id = %game_id, "Secret revealed");
                state.guesses.mark_game_over();
                state.message = format!("The secret word was: {}", reveal.secret.to_uppercase());
                drop(state);
                self.emit(SessionEvent::SecretRevealed {
                    secret: reveal.secret,
                });
                IntentOutcome::Applied
            }
            Err(e) => {
                error!(error = %e, "Reveal request failed");
                state.message = "Could not reveal word".to_string();
                IntentOutcome::Failed
            }
        }
    }

    /// Whether giving up is still available: a game exists and nobody has
    /// guessed the secret.
    pub fn can_give_up(&self) -> bool {
        let state = self.state();
        state.game.is_some() && !state.guesses.has_winner()
    }

    /// Opens or closes the detail view of a guess. Returns the new flag.
    #[instrument(skip(self))]
    pub fn toggle_expand(&self, word: &str) -> Option<bool> {
        self.state().guesses.toggle_expand(word)
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SessionPhase {
        self.state().phase
    }

    /// The active game, if any.
    pub fn game(&self) -> Option<Game> {
        self.state().game.clone()
    }

    /// Current status line.
    pub fn message(&self) -> String {
        self.state().message.clone()
    }

    /// Snapshot for rendering.
    #[instrument(skip(self))]
    pub fn display_state(&self) -> DisplayState {
        let state = self.state();
        DisplayState {
            phase: state.phase,
            game: state.game.clone(),
            message: state.message.clone(),
            loading: self.game_gate.is_held(),
            hint_loading: self.hint_gate.is_held(),
            guesses: state.guesses.sorted_view().cloned().collect(),
            hints: state.hints.iter().cloned().collect(),
            can_give_up: state.game.is_some() && !state.guesses.has_winner(),
        }
    }
}
