//! Error types for the persuasion-challenge orchestrator.

use thiserror::Error;
use uuid::Uuid;

/// Main error type for orchestrator operations.
#[derive(Error, Debug, Clone)]
pub enum GameError {
    /// The social collaborator errored or timed out.
    #[error("Social API unavailable: {message}")]
    SocialUnavailable { message: String },

    /// The scoring collaborator errored or timed out.
    #[error("Scoring unavailable: {message}")]
    ScoringUnavailable { message: String },

    /// The model's output could not be parsed into a 1-10 score.
    /// The reply stays unscored; no default score is ever substituted.
    #[error("Scoring output malformed: {message}")]
    ScoringMalformed { message: String },

    /// The chain collaborator errored or timed out before submission.
    #[error("Chain unavailable: {message}")]
    ChainUnavailable { message: String },

    /// The reward wallet cannot cover the transfer.
    #[error("Insufficient funds: needed {needed}")]
    InsufficientFunds { needed: String },

    /// A reward transaction was rejected at submission. Terminal for that
    /// reward attempt; the ledger records it as failed.
    #[error("Chain submission failed for challenge {challenge_id}: {message}")]
    ChainSubmission { challenge_id: Uuid, message: String },

    /// The exactly-once guarantee is broken. Fatal: the loop must halt.
    #[error("Invariant violated: {message}")]
    InvariantViolation { message: String },

    /// Durable store error.
    #[error("State store error: {message}")]
    State { message: String },

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl GameError {
    /// Returns true if this error is transient and the work should simply
    /// be deferred to a later tick or retry attempt.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            GameError::SocialUnavailable { .. }
                | GameError::ScoringUnavailable { .. }
                | GameError::ChainUnavailable { .. }
        )
    }

    /// Returns true if this error must halt the game loop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, GameError::InvariantViolation { .. })
    }
}

/// Convenience Result type for orchestrator operations.
pub type Result<T> = std::result::Result<T, GameError>;

impl From<serde_json::Error> for GameError {
    fn from(err: serde_json::Error) -> Self {
        GameError::Serialization(err.to_string())
    }
}
