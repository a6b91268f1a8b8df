//! Tests for the session controller against a scripted ranking service.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use contexto::{
    Difficulty, Game, GameMode, GameStats, GuessResult, Hint, IntentOutcome, RankingError,
    RankingErrorKind, RankingService, Refusal, Reveal, SessionController, SessionEvent,
    SessionPhase, SimilarWords,
};

type Script<T> = Mutex<VecDeque<Result<T, RankingError>>>;

/// Ranking service that replays queued responses.
///
/// A hold, when set, parks the next call of that kind until notified.
#[derive(Default)]
struct ScriptedRanking {
    games: Script<Game>,
    guesses: Script<GuessResult>,
    hints: Script<Hint>,
    reveals: Script<Reveal>,
    game_hold: Mutex<Option<Arc<Notify>>>,
    guess_hold: Mutex<Option<Arc<Notify>>>,
    hint_hold: Mutex<Option<Arc<Notify>>>,
    reveal_hold: Mutex<Option<Arc<Notify>>>,
    guess_calls: AtomicUsize,
    reveal_calls: AtomicUsize,
}

fn pop<T>(script: &Script<T>) -> Result<T, RankingError> {
    script
        .lock()
        .expect("script lock")
        .pop_front()
        .unwrap_or_else(|| Err(RankingError::new(RankingErrorKind::Request, "unscripted call")))
}

fn hold(slot: &Mutex<Option<Arc<Notify>>>) -> Arc<Notify> {
    let notify = Arc::new(Notify::new());
    *slot.lock().expect("hold lock") = Some(notify.clone());
    notify
}

async fn wait_if_held(hold: &Mutex<Option<Arc<Notify>>>) {
    let notify = hold.lock().expect("hold lock").take();
    if let Some(notify) = notify {
        notify.notified().await;
    }
}

impl ScriptedRanking {
    fn game(self, id: &str) -> Self {
        self.games.lock().expect("lock").push_back(Ok(Game {
            game_id: id.to_string(),
            mode: GameMode::Practice,
            difficulty: Difficulty::Medium,
            hint: "The word has 6 letters".to_string(),
            message: "Practice mode - medium difficulty".to_string(),
        }));
        self
    }

    fn game_error(self) -> Self {
        self.games
            .lock()
            .expect("lock")
            .push_back(Err(RankingError::new(RankingErrorKind::Status(500), "boom")));
        self
    }

    fn guess(self, result: GuessResult) -> Self {
        self.guesses.lock().expect("lock").push_back(Ok(result));
        self
    }

    fn guess_error(self) -> Self {
        self.guesses
            .lock()
            .expect("lock")
            .push_back(Err(RankingError::new(RankingErrorKind::Request, "connection reset")));
        self
    }

    fn hint(self, word: &str, percent: f64) -> Self {
        self.hints.lock().expect("lock").push_back(Ok(Hint {
            word: word.to_string(),
            percent,
        }));
        self
    }

    fn hint_error(self) -> Self {
        self.hints
            .lock()
            .expect("lock")
            .push_back(Err(RankingError::new(RankingErrorKind::Status(404), "none left")));
        self
    }

    fn reveal(self, secret: &str) -> Self {
        self.reveals.lock().expect("lock").push_back(Ok(Reveal {
            secret: secret.to_string(),
        }));
        self
    }

    fn reveal_error(self) -> Self {
        self.reveals
            .lock()
            .expect("lock")
            .push_back(Err(RankingError::new(RankingErrorKind::Decode, "garbled")));
        self
    }

    fn hold_next_game(&self) -> Arc<Notify> {
        hold(&self.game_hold)
    }

    fn hold_next_guess(&self) -> Arc<Notify> {
        hold(&self.guess_hold)
    }

    fn hold_next_hint(&self) -> Arc<Notify> {
        hold(&self.hint_hold)
    }

    fn hold_next_reveal(&self) -> Arc<Notify> {
        hold(&self.reveal_hold)
    }
}

#[async_trait]
impl RankingService for ScriptedRanking {
    async fn start_game(
        &self,
        _mode: GameMode,
        _difficulty: Difficulty,
    ) -> Result<Game, RankingError> {
        wait_if_held(&self.game_hold).await;
        pop(&self.games)
    }

    async fn submit_guess(&self, _game_id: &str, _word: &str) -> Result<GuessResult, RankingError> {
        self.guess_calls.fetch_add(1, Ordering::SeqCst);
        wait_if_held(&self.guess_hold).await;
        pop(&self.guesses)
    }

    async fn fetch_hint(&self, _game_id: &str) -> Result<Hint, RankingError> {
        wait_if_held(&self.hint_hold).await;
        pop(&self.hints)
    }

    async fn reveal(&self, _game_id: &str) -> Result<Reveal, RankingError> {
        self.reveal_calls.fetch_add(1, Ordering::SeqCst);
        wait_if_held(&self.reveal_hold).await;
        pop(&self.reveals)
    }

    async fn game_stats(&self, _game_id: &str) -> Result<GameStats, RankingError> {
        Err(RankingError::new(RankingErrorKind::Request, "unscripted call"))
    }

    async fn similar_words(&self, _word: &str, _top_k: u32) -> Result<SimilarWords, RankingError> {
        Err(RankingError::new(RankingErrorKind::Request, "unscripted call"))
    }
}

fn scored(rank: i64, score: f64) -> GuessResult {
    GuessResult {
        rank,
        score,
        won: rank == 1,
        total_guesses: Some(1),
        total_words: Some(5000),
        ..GuessResult::default()
    }
}

fn rejected(message: Option<&str>) -> GuessResult {
    GuessResult {
        rank: -1,
        error: Some("not_in_dictionary".to_string()),
        message: message.map(str::to_string),
        ..GuessResult::default()
    }
}

async fn started(service: ScriptedRanking) -> SessionController<ScriptedRanking> {
    let session =
        SessionController::with_game_settings(service, GameMode::Practice, Difficulty::Medium);
    assert_eq!(session.start_new_game().await, IntentOutcome::Applied);
    session
}

#[tokio::test]
async fn test_new_game_sets_message_and_phase() {
    let session = started(ScriptedRanking::default().game("g-1")).await;

    let state = session.display_state();
    assert_eq!(state.phase, SessionPhase::Active);
    assert_eq!(
        state.message,
        "Practice mode - medium difficulty | Hint: The word has 6 letters"
    );
    assert_eq!(state.game.map(|g| g.game_id), Some("g-1".to_string()));
    assert!(state.can_give_up);
}

#[tokio::test]
async fn test_new_game_failure_returns_to_idle() {
    let session = started(ScriptedRanking::default().game("g-1").game_error()).await;

    assert_eq!(session.start_new_game().await, IntentOutcome::Failed);
    assert_eq!(session.phase(), SessionPhase::Idle);
    assert_eq!(session.message(), "Failed to start game");
    assert!(session.game().is_none());
    assert!(!session.can_give_up());
}

#[tokio::test]
async fn test_guess_before_game_refused() {
    let session = SessionController::with_game_settings(
        ScriptedRanking::default(),
        GameMode::Practice,
        Difficulty::Medium,
    );
    assert_eq!(
        session.submit_guess("ocean").await,
        IntentOutcome::Refused(Refusal::NotActive(SessionPhase::Idle))
    );
    assert_eq!(session.service().guess_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_scored_guess_recorded() {
    let session = started(ScriptedRanking::default().game("g-1").guess(scored(42, 0.31))).await;

    assert_eq!(session.submit_guess("  Ocean ").await, IntentOutcome::Applied);

    let state = session.display_state();
    assert_eq!(state.guesses.len(), 1);
    assert_eq!(state.guesses[0].word, "ocean");
    assert_eq!(state.guesses[0].rank, 42);
    assert_eq!(state.message, "#42 out of 5000");
    assert!(!state.loading);
}

#[tokio::test]
async fn test_repeated_guess_recorded_once() {
    let service = ScriptedRanking::default()
        .game("g-1")
        .guess(scored(42, 0.31))
        .guess(scored(42, 0.31));
    let session = started(service).await;

    assert_eq!(session.submit_guess("ocean").await, IntentOutcome::Applied);
    assert_eq!(session.submit_guess("OCEAN").await, IntentOutcome::Duplicate);

    let state = session.display_state();
    assert_eq!(state.guesses.len(), 1);
    assert_eq!(state.message, "You already guessed \"ocean\" (#42)");
}

#[tokio::test]
async fn test_rejected_guess_not_recorded() {
    let service = ScriptedRanking::default()
        .game("g-1")
        .guess(rejected(Some("\"qwzx\" is not in the word list")))
        .guess(rejected(None));
    let session = started(service).await;

    assert_eq!(session.submit_guess("qwzx").await, IntentOutcome::Rejected);
    assert_eq!(session.message(), "\"qwzx\" is not in the word list");

    assert_eq!(session.submit_guess("zzzz").await, IntentOutcome::Rejected);
    assert_eq!(session.message(), "Invalid word");

    assert!(session.display_state().guesses.is_empty());
}

#[tokio::test]
async fn test_guess_transport_failure_releases_gate() {
    let service = ScriptedRanking::default()
        .game("g-1")
        .guess_error()
        .guess(scored(7, 0.6));
    let session = started(service).await;

    assert_eq!(session.submit_guess("ocean").await, IntentOutcome::Failed);
    assert_eq!(session.message(), "Error submitting guess");
    assert_eq!(session.phase(), SessionPhase::Active);
    assert!(session.display_state().guesses.is_empty());

    assert_eq!(session.submit_guess("sea").await, IntentOutcome::Applied);
}

#[tokio::test]
async fn test_empty_guess_never_sent() {
    let session = started(ScriptedRanking::default().game("g-1")).await;

    assert_eq!(
        session.submit_guess("   ").await,
        IntentOutcome::Refused(Refusal::EmptyWord)
    );
    assert_eq!(session.service().guess_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_winning_guess_ends_game() {
    let win = GuessResult {
        rank: 1,
        score: 1.0,
        won: true,
        total_guesses: Some(5),
        total_words: Some(5000),
        ..GuessResult::default()
    };
    let service = ScriptedRanking::default().game("g-1").guess(win);
    let session = started(service).await;
    let mut events = session.subscribe();

    assert_eq!(session.submit_guess("python").await, IntentOutcome::Applied);

    let state = session.display_state();
    assert_eq!(state.phase, SessionPhase::GameWon);
    assert_eq!(state.message, "You won in 5 guesses!");
    assert!(!state.can_give_up);

    assert_eq!(
        events.try_recv().ok(),
        Some(SessionEvent::Won { total_guesses: 5 })
    );
    assert_eq!(events.try_recv().ok(), Some(SessionEvent::GuessSettled));

    assert_eq!(
        session.reveal(|| true).await,
        IntentOutcome::Refused(Refusal::AlreadyWon)
    );
    assert_eq!(session.service().reveal_calls.load(Ordering::SeqCst), 0);

    assert_eq!(
        session.submit_guess("snake").await,
        IntentOutcome::Refused(Refusal::NotActive(SessionPhase::GameWon))
    );
}

#[tokio::test]
async fn test_secret_scored_at_rank_zero_wins() {
    let win = GuessResult {
        rank: 0,
        score: 1.0,
        won: true,
        total_guesses: Some(3),
        total_words: Some(5000),
        message: Some("Correct! The word was 'python'".to_string()),
        ..GuessResult::default()
    };
    let service = ScriptedRanking::default()
        .game("g-1")
        .guess(scored(42, 0.31))
        .guess(scored(12, 0.5))
        .guess(win);
    let session = started(service).await;
    session.submit_guess("ocean").await;
    session.submit_guess("snake").await;
    let mut events = session.subscribe();

    assert_eq!(session.submit_guess("python").await, IntentOutcome::Applied);

    let state = session.display_state();
    assert_eq!(state.phase, SessionPhase::GameWon);
    assert_eq!(state.message, "You won in 3 guesses!");
    assert!(!state.can_give_up);
    assert_eq!(state.guesses.len(), 3);
    assert_eq!(state.guesses[0].word, "python");
    assert_eq!(state.guesses[0].rank, 1);
    assert!(state.guesses[0].won());
    assert_eq!(
        events.try_recv().ok(),
        Some(SessionEvent::Won { total_guesses: 3 })
    );
}

#[tokio::test]
async fn test_display_sorted_by_rank() {
    let service = ScriptedRanking::default()
        .game("g-1")
        .guess(scored(42, 0.31))
        .guess(scored(3, 0.8))
        .guess(scored(900, 0.05))
        .guess(scored(12, 0.5));
    let session = started(service).await;

    for word in ["ocean", "wave", "desk", "sea"] {
        session.submit_guess(word).await;
    }

    let words: Vec<String> = session
        .display_state()
        .guesses
        .into_iter()
        .map(|g| g.word)
        .collect();
    assert_eq!(words, ["wave", "sea", "ocean", "desk"]);
}

#[tokio::test]
async fn test_new_game_resets_ledgers() {
    let service = ScriptedRanking::default()
        .game("g-1")
        .guess(scored(42, 0.31))
        .hint("sea", 72.0)
        .game("g-2");
    let session = started(service).await;
    session.submit_guess("ocean").await;
    session.fetch_hint().await;
    session.toggle_expand("ocean");

    assert_eq!(session.start_new_game().await, IntentOutcome::Applied);

    let state = session.display_state();
    assert!(state.guesses.is_empty());
    assert!(state.hints.is_empty());
    assert_eq!(state.game.map(|g| g.game_id), Some("g-2".to_string()));
    assert_eq!(state.phase, SessionPhase::Active);
}

#[tokio::test]
async fn test_new_game_after_win_starts_fresh() {
    let service = ScriptedRanking::default()
        .game("g-1")
        .guess(scored(42, 0.31))
        .guess(scored(1, 1.0))
        .hint("sea", 72.0)
        .game("g-2");
    let session = started(service).await;
    session.submit_guess("ocean").await;
    session.submit_guess("python").await;
    session.fetch_hint().await;
    assert_eq!(session.phase(), SessionPhase::GameWon);

    assert_eq!(session.start_new_game().await, IntentOutcome::Applied);

    let state = session.display_state();
    assert_eq!(state.phase, SessionPhase::Active);
    assert!(state.guesses.is_empty());
    assert!(state.hints.is_empty());
    assert!(state.can_give_up);
    assert_eq!(state.game.map(|g| g.game_id), Some("g-2".to_string()));
}

#[tokio::test]
async fn test_new_game_after_failed_start() {
    let service = ScriptedRanking::default()
        .game("g-1")
        .guess(scored(42, 0.31))
        .game_error()
        .game("g-2");
    let session = started(service).await;
    session.submit_guess("ocean").await;

    assert_eq!(session.start_new_game().await, IntentOutcome::Failed);
    assert_eq!(session.phase(), SessionPhase::Idle);

    assert_eq!(session.start_new_game().await, IntentOutcome::Applied);

    let state = session.display_state();
    assert_eq!(state.phase, SessionPhase::Active);
    assert!(state.guesses.is_empty());
    assert!(state.hints.is_empty());
    assert!(state.can_give_up);
    assert_eq!(state.game.map(|g| g.game_id), Some("g-2".to_string()));
}

#[tokio::test]
async fn test_abandoned_new_game_keeps_previous_game() {
    let service = ScriptedRanking::default()
        .game("g-1")
        .guess(scored(42, 0.31))
        .game("g-2");
    let session = started(service).await;
    session.submit_guess("ocean").await;
    let _hold = session.service().hold_next_game();

    let abandoned = tokio::time::timeout(Duration::from_millis(20), session.start_new_game()).await;
    assert!(abandoned.is_err());

    let state = session.display_state();
    assert_eq!(state.phase, SessionPhase::Active);
    assert_eq!(state.message, "#42 out of 5000");
    assert!(!state.loading);
    assert_eq!(state.guesses.len(), 1);
    assert_eq!(state.game.map(|g| g.game_id), Some("g-1".to_string()));

    assert_eq!(session.start_new_game().await, IntentOutcome::Applied);
    assert_eq!(session.game().map(|g| g.game_id), Some("g-2".to_string()));
}

#[tokio::test]
async fn test_abandoned_reveal_returns_to_active() {
    let service = ScriptedRanking::default()
        .game("g-1")
        .guess(scored(42, 0.31))
        .reveal("python");
    let session = started(service).await;
    let _hold = session.service().hold_next_reveal();

    let abandoned = tokio::time::timeout(Duration::from_millis(20), session.reveal(|| true)).await;
    assert!(abandoned.is_err());
    assert_eq!(session.phase(), SessionPhase::Active);
    assert!(!session.display_state().loading);

    assert_eq!(session.submit_guess("ocean").await, IntentOutcome::Applied);
    assert_eq!(session.reveal(|| true).await, IntentOutcome::Applied);
    assert_eq!(session.message(), "The secret word was: PYTHON");
}

#[tokio::test]
async fn test_second_guess_refused_while_first_in_flight() {
    let service = ScriptedRanking::default().game("g-1").guess(scored(42, 0.31));
    let hold = service.hold_next_guess();
    let session = started(service).await;

    let (first, (second, reveal, loading)) = tokio::join!(session.submit_guess("ocean"), async {
        tokio::task::yield_now().await;
        let second = session.submit_guess("river").await;
        let reveal = session.reveal(|| true).await;
        let loading = session.display_state().loading;
        hold.notify_one();
        (second, reveal, loading)
    });

    assert_eq!(first, IntentOutcome::Applied);
    assert_eq!(second, IntentOutcome::Refused(Refusal::GameRequestInFlight));
    assert_eq!(reveal, IntentOutcome::Refused(Refusal::GameRequestInFlight));
    assert!(loading);

    let state = session.display_state();
    assert_eq!(state.guesses.len(), 1);
    assert_eq!(state.guesses[0].word, "ocean");
    assert_eq!(session.service().guess_calls.load(Ordering::SeqCst), 1);
    assert_eq!(session.service().reveal_calls.load(Ordering::SeqCst), 0);
    assert!(!state.loading);
}

#[tokio::test]
async fn test_hint_not_blocked_by_guess_in_flight() {
    let service = ScriptedRanking::default()
        .game("g-1")
        .guess(scored(42, 0.31))
        .hint("sea", 72.0);
    let hold = service.hold_next_guess();
    let session = started(service).await;

    let (guess, hint) = tokio::join!(session.submit_guess("ocean"), async {
        tokio::task::yield_now().await;
        let hint = session.fetch_hint().await;
        hold.notify_one();
        hint
    });

    assert_eq!(guess, IntentOutcome::Applied);
    assert_eq!(hint, IntentOutcome::Applied);
    assert_eq!(session.display_state().hints.len(), 1);
}

#[tokio::test]
async fn test_second_hint_refused_while_first_in_flight() {
    let service = ScriptedRanking::default().game("g-1").hint("sea", 72.0);
    let hold = service.hold_next_hint();
    let session = started(service).await;

    let (first, second) = tokio::join!(session.fetch_hint(), async {
        tokio::task::yield_now().await;
        let second = session.fetch_hint().await;
        assert!(session.display_state().hint_loading);
        hold.notify_one();
        second
    });

    assert_eq!(first, IntentOutcome::Applied);
    assert_eq!(second, IntentOutcome::Refused(Refusal::HintRequestInFlight));
}

#[tokio::test]
async fn test_new_hint_reported() {
    let session = started(ScriptedRanking::default().game("g-1").hint("Sea", 72.0)).await;
    let mut events = session.subscribe();

    assert_eq!(session.fetch_hint().await, IntentOutcome::Applied);
    assert_eq!(session.message(), "Hint: \"sea\" is 72% similar");
    assert_eq!(
        events.try_recv().ok(),
        Some(SessionEvent::HintRevealed(Hint {
            word: "sea".to_string(),
            percent: 72.0,
        }))
    );
}

#[tokio::test]
async fn test_duplicate_hint_suppressed() {
    let service = ScriptedRanking::default()
        .game("g-1")
        .hint("sea", 72.0)
        .hint("sea", 72.0);
    let session = started(service).await;

    assert_eq!(session.fetch_hint().await, IntentOutcome::Applied);
    assert_eq!(session.fetch_hint().await, IntentOutcome::Duplicate);

    assert_eq!(session.display_state().hints.len(), 1);
    assert_eq!(session.message(), "Already showed that hint!");
}

#[tokio::test]
async fn test_hint_failure_reported() {
    let session = started(ScriptedRanking::default().game("g-1").hint_error()).await;

    assert_eq!(session.fetch_hint().await, IntentOutcome::Failed);
    assert_eq!(session.message(), "No more strong hints available");
    assert!(session.display_state().hints.is_empty());
}

#[tokio::test]
async fn test_hint_for_replaced_game_discarded() {
    let service = ScriptedRanking::default()
        .game("g-1")
        .game("g-2")
        .hint("sea", 72.0);
    let hold = service.hold_next_hint();
    let session = started(service).await;

    let (hint, restarted) = tokio::join!(session.fetch_hint(), async {
        tokio::task::yield_now().await;
        let restarted = session.start_new_game().await;
        hold.notify_one();
        restarted
    });

    assert_eq!(restarted, IntentOutcome::Applied);
    assert_eq!(hint, IntentOutcome::Stale);
    assert!(session.display_state().hints.is_empty());
}

#[tokio::test]
async fn test_reveal_requires_confirmation() {
    let session = started(ScriptedRanking::default().game("g-1").reveal("python")).await;

    assert_eq!(
        session.reveal(|| false).await,
        IntentOutcome::Refused(Refusal::NotConfirmed)
    );
    assert_eq!(session.service().reveal_calls.load(Ordering::SeqCst), 0);
    assert_eq!(session.phase(), SessionPhase::Active);
}

#[tokio::test]
async fn test_reveal_discloses_secret_and_marks_guesses() {
    let service = ScriptedRanking::default()
        .game("g-1")
        .guess(scored(42, 0.31))
        .guess(scored(12, 0.5))
        .reveal("python");
    let session = started(service).await;
    session.submit_guess("ocean").await;
    session.submit_guess("snake").await;

    assert_eq!(session.reveal(|| true).await, IntentOutcome::Applied);

    let state = session.display_state();
    assert_eq!(state.message, "The secret word was: PYTHON");
    assert_eq!(state.phase, SessionPhase::Active);
    assert!(state.guesses.iter().all(|g| g.game_over));
    let ranks: Vec<u32> = state.guesses.iter().map(|g| g.rank).collect();
    assert_eq!(ranks, [12, 42]);
    assert!(state.guesses.iter().all(|g| !g.won()));
}

#[tokio::test]
async fn test_reveal_failure_keeps_guesses() {
    let service = ScriptedRanking::default()
        .game("g-1")
        .guess(scored(42, 0.31))
        .reveal_error();
    let session = started(service).await;
    session.submit_guess("ocean").await;

    assert_eq!(session.reveal(|| true).await, IntentOutcome::Failed);
    assert_eq!(session.message(), "Could not reveal word");
    assert_eq!(session.phase(), SessionPhase::Active);
    assert!(session.display_state().guesses.iter().all(|g| !g.game_over));
}

#[tokio::test]
async fn test_toggle_expand_through_session() {
    let session = started(ScriptedRanking::default().game("g-1").guess(scored(42, 0.31))).await;
    session.submit_guess("ocean").await;

    assert_eq!(session.toggle_expand("ocean"), Some(true));
    assert!(session.display_state().guesses[0].expanded);
    assert_eq!(session.toggle_expand("river"), None);
}
