//! Typed client for the remote ranking service.

use crate::config::ClientConfig;
use crate::error::{RankingError, RankingErrorKind};
use crate::model::{
    Difficulty, Game, GameMode, GameStats, GuessRequest, GuessResult, Hint, NewGameRequest,
    Reveal, SimilarWords, normalize_word,
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, instrument, warn};

/// Request/response operations offered by the ranking service.
///
/// Every call is fire-once: no retries, no caching.
#[async_trait]
pub trait RankingService: Send + Sync {
    /// Starts a game and returns its descriptor.
    async fn start_game(&self, mode: GameMode, difficulty: Difficulty)
    -> Result<Game, RankingError>;

    /// Scores `word` against the secret of `game_id`.
    async fn submit_guess(&self, game_id: &str, word: &str) -> Result<GuessResult, RankingError>;

    /// Asks for a word close to the secret.
    async fn fetch_hint(&self, game_id: &str) -> Result<Hint, RankingError>;

    /// Gives up and discloses the secret.
    async fn reveal(&self, game_id: &str) -> Result<Reveal, RankingError>;

    /// Server-side statistics for a game.
    async fn game_stats(&self, game_id: &str) -> Result<GameStats, RankingError>;

    /// Nearest neighbours of `word` in the service's vocabulary.
    async fn similar_words(&self, word: &str, top_k: u32) -> Result<SimilarWords, RankingError>;
}

/// [`RankingService`] over the HTTP/JSON API.
#[derive(Debug, Clone)]
pub struct HttpRankingClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRankingClient {
    /// Creates a client for the service at `config.base_url()`.
    #[instrument(skip(config), fields(base_url = %config.base_url()))]
    pub fn new(config: &ClientConfig) -> Self {
        info!("Creating ranking client");
        Self {
            base_url: config.base_url().clone(),
            client: reqwest::Client::new(),
        }
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Appends `segments` to the base URL path and `params` as the query.
    ///
    /// Each segment is percent-encoded, so words and game ids containing
    /// `/`, `?` or `#` stay inside their own segment.
    fn endpoint(
        &self,
        segments: &[&str],
        params: &[(&str, &str)],
    ) -> Result<reqwest::Url, RankingError> {
        let mut url = reqwest::Url::parse(&self.base_url).map_err(|e| {
            error!(error = %e, base_url = %self.base_url, "Invalid base URL");
            RankingError::new(RankingErrorKind::Request, e.to_string())
        })?;
        url.path_segments_mut()
            .map_err(|()| {
                error!(base_url = %self.base_url, "Base URL cannot carry a path");
                RankingError::new(
                    RankingErrorKind::Request,
                    format!("{} cannot be a base URL", self.base_url),
                )
            })?
            .pop_if_empty()
            .extend(segments);
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }

    /// Sends a prepared request and decodes a 2xx JSON body.
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, RankingError> {
        let response = request
            .send()
            .await
            .inspect_err(|e| error!(error = %e, "Request to ranking service failed"))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .inspect_err(|e| error!(error = %e, "Failed to read response body"))?;
        debug!(status = %status, body = %body, "Got response");

        if !status.is_success() {
            warn!(status = %status, "Ranking service returned error status");
            return Err(RankingError::new(
                RankingErrorKind::Status(status.as_u16()),
                body,
            ));
        }

        serde_json::from_str(&body).map_err(|e| {
            error!(error = %e, body = %body, "Failed to parse response");
            RankingError::new(RankingErrorKind::Decode, e.to_string())
        })
    }
}

#[async_trait]
impl RankingService for HttpRankingClient {
    #[instrument(skip(self))]
    async fn start_game(
        &self,
        mode: GameMode,
        difficulty: Difficulty,
    ) -> Result<Game, RankingError> {
        info!("Requesting new game");
        let request = self
            .client
            .post(self.endpoint(&["game", "new"], &[])?)
            .json(&NewGameRequest { mode, difficulty });
        let mut game: Game = self.send(request).await?;
        // The service echoes mode but not difficulty.
        game.difficulty = difficulty;
        info!(game_id = %game.game_id, "Game started");
        Ok(game)
    }

    #[instrument(skip(self))]
    async fn submit_guess(&self, game_id: &str, word: &str) -> Result<GuessResult, RankingError> {
        let body = GuessRequest {
            game_id: game_id.to_string(),
            word: normalize_word(word),
        };
        debug!(word = %body.word, "Submitting guess");
        let request = self
            .client
            .post(self.endpoint(&["game", "guess"], &[])?)
            .json(&body);
        self.send(request).await
    }

    #[instrument(skip(self))]
    async fn fetch_hint(&self, game_id: &str) -> Result<Hint, RankingError> {
        let url = self.endpoint(&["hint"], &[("game_id", game_id)])?;
        let request = self.client.get(url);
        let mut hint: Hint = self.send(request).await?;
        hint.word = normalize_word(&hint.word);
        Ok(hint)
    }

    #[instrument(skip(self))]
    async fn reveal(&self, game_id: &str) -> Result<Reveal, RankingError> {
        let url = self.endpoint(&["reveal"], &[("game_id", game_id)])?;
        let request = self.client.get(url);
        self.send(request).await
    }

    #[instrument(skip(self))]
    async fn game_stats(&self, game_id: &str) -> Result<GameStats, RankingError> {
        let url = self.endpoint(&["game", game_id, "stats"], &[])?;
        let request = self.client.get(url);
        self.send(request).await
    }

    #[instrument(skip(self))]
    async fn similar_words(&self, word: &str, top_k: u32) -> Result<SimilarWords, RankingError> {
        let word = normalize_word(word);
        let top_k = top_k.to_string();
        let url = self.endpoint(&["similar", word.as_str()], &[("top_k", top_k.as_str())])?;
        let request = self.client.get(url);
        self.send(request).await
    }
}
