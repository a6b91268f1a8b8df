//! Line-oriented terminal front end.
//!
//! Reads one command per line and redraws from [`DisplayState`] after each.

use anyhow::Result;
use contexto::{
    ClientConfig, DisplayState, Guess, HttpRankingClient, IntentOutcome, Refusal,
    SessionController, SessionEvent, SessionPhase,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, instrument};

const HELP: &str = "Type a word to guess. Commands: :new  :hint  :giveup  :why <word>  :help  :quit";

/// A parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Guess(String),
    NewGame,
    Hint,
    GiveUp,
    Why(String),
    Help,
    Quit,
    Unknown(String),
}

impl Input {
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let Some(command) = line.strip_prefix(':') else {
            return Some(Self::Guess(line.to_string()));
        };
        let (name, arg) = command
            .split_once(char::is_whitespace)
            .map(|(n, a)| (n, a.trim()))
            .unwrap_or((command, ""));
        Some(match name {
            "new" => Self::NewGame,
            "hint" => Self::Hint,
            "giveup" => Self::GiveUp,
            "why" if !arg.is_empty() => Self::Why(arg.to_string()),
            "help" => Self::Help,
            "quit" | "q" => Self::Quit,
            _ => Self::Unknown(line.to_string()),
        })
    }
}

/// Runs the interactive game until `:quit` or end of input.
#[instrument(skip(config), fields(base_url = %config.base_url()))]
pub async fn run(config: ClientConfig) -> Result<()> {
    info!("Starting terminal game");

    let session = SessionController::new(HttpRankingClient::new(&config), &config);
    let mut events = session.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Contexto Unlimited");
    println!("{}", HELP);
    session.start_new_game().await;
    render(&session.display_state());

    loop {
        prompt("> ").await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let Some(input) = Input::parse(&line) else {
            continue;
        };
        debug!(?input, "Read input");

        match input {
            Input::Quit => break,
            Input::Help => {
                println!("{}", HELP);
                continue;
            }
            Input::Unknown(text) => {
                println!("Unknown command: {}", text);
                continue;
            }
            Input::NewGame => {
                session.start_new_game().await;
            }
            Input::Guess(word) => {
                if session.submit_guess(&word).await
                    == IntentOutcome::Refused(Refusal::NotActive(SessionPhase::GameWon))
                {
                    println!("You already won. Type :new for another game.");
                }
            }
            Input::Hint => {
                session.fetch_hint().await;
            }
            Input::GiveUp => {
                if !session.can_give_up() {
                    println!("Nothing to give up.");
                    continue;
                }
                let confirmed = confirm(&mut lines).await?;
                session.reveal(|| confirmed).await;
            }
            Input::Why(word) => {
                if session.toggle_expand(&word).is_none() {
                    println!("You have not guessed \"{}\".", word.trim());
                    continue;
                }
            }
        }

        announce(&mut events);
        render(&session.display_state());
    }

    info!("Terminal game finished");
    Ok(())
}

async fn prompt(text: &str) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(text.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}

async fn confirm(lines: &mut Lines<BufReader<Stdin>>) -> Result<bool> {
    prompt("Really give up? The secret word will be revealed! [y/N] ").await?;
    let answer = lines.next_line().await?.unwrap_or_default();
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// Prints celebration lines for events raised since the last call.
fn announce(events: &mut broadcast::Receiver<SessionEvent>) {
    loop {
        match events.try_recv() {
            Ok(SessionEvent::Won { total_guesses }) => {
                println!("*** Found it in {} guesses! ***", total_guesses);
            }
            Ok(SessionEvent::SecretRevealed { .. }) => println!("Better luck next time."),
            Ok(event) => debug!(?event, "Session event"),
            Err(TryRecvError::Lagged(skipped)) => debug!(skipped, "Missed session events"),
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
        }
    }
}

fn heat(guess: &Guess) -> &'static str {
    match guess.rank {
        1 => "won ",
        2..=10 => "hot ",
        11..=50 => "warm",
        _ => "cold",
    }
}

fn render(state: &DisplayState) {
    println!();
    if let Some(game) = &state.game {
        let short_id: String = game.game_id.chars().take(8).collect();
        println!("Game {}... | Mode: {}", short_id, game.mode);
    }
    println!("{}", state.message);

    if !state.hints.is_empty() {
        let hints: Vec<String> = state
            .hints
            .iter()
            .map(|h| format!("{} {}%", h.word.to_uppercase(), h.percent))
            .collect();
        println!("Hints ({}): {}", state.hints.len(), hints.join(" | "));
    }

    if state.guesses.is_empty() {
        println!("No guesses yet. Start guessing!");
        return;
    }

    for (i, guess) in state.guesses.iter().enumerate() {
        let marker = if guess.game_over { " (game over)" } else { "" };
        println!(
            "{:>3}. [{}] {:<20} #{:<6} {:>5.1}%{}",
            i + 1,
            heat(guess),
            guess.word.to_uppercase(),
            guess.rank,
            guess.score * 100.0,
            marker
        );
        if guess.expanded {
            for layer in &guess.explanations {
                let filled = (layer.score.clamp(0.0, 1.0) * 20.0).round() as usize;
                println!(
                    "       {} {:<12} {:<20} {:>3.0}%",
                    layer.icon,
                    layer.layer,
                    "#".repeat(filled),
                    layer.score * 100.0
                );
                if let Some(text) = &layer.explanation {
                    println!("         {}", text);
                }
            }
        }
    }
}
