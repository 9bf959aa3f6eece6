//! # Persuade State
//!
//! Durable stores for the persuasion-challenge orchestrator:
//! - [`ReplyStore`] - tracks which replies have been seen and scored
//! - [`WinnerLedger`] - the atomic exactly-once gate for reward payment
//! - [`JsonGameStore`] - file-backed implementation of both, crash-safe
//!   via write-temp-then-rename

pub mod json;
pub mod store;

pub use json::JsonGameStore;
pub use store::{ChallengeStore, GameStore, ReplyStore, WinnerLedger};
