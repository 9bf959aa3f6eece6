//! # Persuade Core
//!
//! Core domain types for the persuasion-challenge orchestrator.
//!
//! This crate provides the fundamental building blocks:
//! - [`Challenge`] - One posted persuasion prompt and its lifecycle
//! - [`Reply`] - A participant's response, with its evaluation once scored
//! - [`WinnerRecord`] - Durable record of the single reward slot per challenge
//! - [`GameError`] - Orchestrator error taxonomy

pub mod challenge;
pub mod error;
pub mod reply;
pub mod retry;
pub mod settings;
pub mod winner;

// Re-exports for convenience
pub use challenge::{Challenge, ChallengePhase};
pub use error::{GameError, Result};
pub use reply::{InboundReply, Reply};
pub use retry::RetryPolicy;
pub use settings::GameSettings;
pub use winner::{ClaimOutcome, WinnerRecord, WinnerStatus};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::challenge::{Challenge, ChallengePhase};
    pub use crate::error::{GameError, Result};
    pub use crate::reply::{InboundReply, Reply};
    pub use crate::retry::RetryPolicy;
    pub use crate::settings::GameSettings;
    pub use crate::winner::{ClaimOutcome, WinnerRecord, WinnerStatus};
}
