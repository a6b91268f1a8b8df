//! Error types for ranking-service calls and configuration.

use derive_more::{Display, Error};
use tracing::instrument;

/// What went wrong with a ranking-service call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum RankingErrorKind {
    /// The request never produced a response (connection, DNS, IO).
    #[display("request failed")]
    Request,
    /// The server answered with a non-2xx status.
    #[display("HTTP {_0}")]
    Status(u16),
    /// The response body was not the expected JSON shape.
    #[display("malformed response")]
    Decode,
}

/// Transport-level failure talking to the ranking service.
///
/// Semantic rejections (unknown word, game already finished) are not errors;
/// they arrive as data on [`GuessResult`](crate::GuessResult).
#[derive(Debug, Clone, Display, Error)]
#[display("Ranking service error ({}): {} at {}:{}", kind, message, file, line)]
pub struct RankingError {
    /// Failure category.
    pub kind: RankingErrorKind,
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl RankingError {
    /// Creates a new ranking error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(kind: RankingErrorKind, message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

impl From<reqwest::Error> for RankingError {
    #[track_caller]
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_decode() {
            RankingErrorKind::Decode
        } else if let Some(status) = err.status() {
            RankingErrorKind::Status(status.as_u16())
        } else {
            RankingErrorKind::Request
        };
        Self::new(kind, err.to_string())
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}
